//! Live Feed Example - 订单实时看板
//!
//! 加载第一页订单，加入租户房间，然后持续把实时事件合并进当前页，
//! 每次变化后打印快照。Ctrl-C 退出。
//!
//! 环境变量见 `ClientConfig`，另需 `TENANT_ID`。
//!
//! 运行: TENANT_ID=t1 cargo run -p feed-client --example live_feed

use anyhow::Context;
use feed_client::{
    CacheChange, ClientConfig, HttpClient, OrderFeed, OrderQueryCache, QueryKey, WsTransport,
    logger,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ClientConfig::from_env();
    logger::init_from_config(&config);

    let tenant_id = std::env::var("TENANT_ID").context("TENANT_ID must be set")?;

    let api = Arc::new(HttpClient::new(&config)?);
    let transport = Arc::new(
        WsTransport::connect(&config.socket_url)
            .await
            .context("realtime channel unavailable")?,
    );

    let cache = OrderQueryCache::new();
    let printer = cache.clone();
    cache.subscribe(move |change| {
        if let CacheChange::Page(key) = change
            && printer.active_key().as_ref() == Some(key)
            && let Some(page) = printer.active_page()
        {
            println!("--- page {} ({} of {}) ---", key.page, page.len(), page.total);
            for order in &page.items {
                println!(
                    "{:<26} {:<5} {:<8} {:<18} {}",
                    order.id,
                    order.payment_mode.as_str(),
                    order.payment_status.as_str(),
                    order.order_status.label(),
                    order.total
                );
            }
        }
    });

    let mut feed = OrderFeed::new(api, cache, transport);
    let key = QueryKey::new(1, config.page_limit).with_tenant(&tenant_id);
    if let Err(e) = feed.load(key).await {
        tracing::warn!(error = %e, "Initial load failed, retrying once");
        feed.refetch().await?;
    }
    feed.start(&tenant_id).await?;

    let token = CancellationToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    feed.run_until_cancelled(token).await;
    feed.close().await?;
    Ok(())
}
