//! OrderQueryCache - cached order list pages and single-order views
//!
//! Pages are keyed by [`QueryKey`]. Exactly one key is *active* at a time (the
//! view on screen); live merges only ever target the active page. Every change
//! of the active key bumps the [`ViewEpoch`], and a merge stamped with an older
//! epoch is dropped instead of being applied to a view it was not meant for.
//!
//! Writers hold the internal write lock for the whole update, so readers only
//! ever see complete snapshots. Listeners are called after the lock has been
//! released and may read the cache freely.

use parking_lot::{Mutex, RwLock};
use shared::order::{Order, OrderStatus, PageSnapshot, QueryKey};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use crate::feed::merge::merge;

/// Fetch state of one list page
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState {
    /// Request in flight, nothing cached yet
    Loading,
    /// Last fetch succeeded (possibly with zero rows)
    Ready(PageSnapshot),
    /// Last fetch failed; the view should offer a retry
    Failed(String),
}

impl FetchState {
    pub fn snapshot(&self) -> Option<&PageSnapshot> {
        match self {
            FetchState::Ready(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FetchState::Failed(_))
    }
}

/// What changed, passed to listeners
#[derive(Debug, Clone, PartialEq)]
pub enum CacheChange {
    /// A list page was loaded, failed or merged into
    Page(QueryKey),
    /// A single-order view changed
    Order(String),
    /// Everything is stale and should be refetched
    Invalidated,
    /// Cache emptied (session teardown)
    Cleared,
}

/// Why a live merge was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The active view changed after the event arrived
    StaleView,
    /// The active view has no loaded page to merge into
    NotLoaded,
}

/// Result of [`OrderQueryCache::merge_admitted`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Replaced,
    Dropped(DropReason),
}

/// Shared counter identifying the active view.
///
/// Handed to the realtime channel so deliveries can be stamped on arrival.
#[derive(Debug, Clone, Default)]
pub struct ViewEpoch(Arc<AtomicU64>);

impl ViewEpoch {
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// Listener handle returned by [`OrderQueryCache::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

type Listener = Arc<dyn Fn(&CacheChange) + Send + Sync>;

#[derive(Debug)]
struct PageEntry {
    state: FetchState,
    stale: bool,
    /// A refetch is in flight for this page
    fetching: bool,
    /// Orders merged live while `fetching`, replayed onto the fetched page
    live: Vec<Order>,
}

impl PageEntry {
    fn new(state: FetchState, stale: bool) -> Self {
        Self {
            state,
            stale,
            fetching: false,
            live: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct OrderEntry {
    order: Order,
    stale: bool,
}

#[derive(Debug, Default)]
struct CacheState {
    active: Option<QueryKey>,
    pages: HashMap<QueryKey, PageEntry>,
    orders: HashMap<String, OrderEntry>,
}

/// Paginated, filtered order cache with an explicit observer interface
#[derive(Clone, Default)]
pub struct OrderQueryCache {
    state: Arc<RwLock<CacheState>>,
    epoch: ViewEpoch,
    listeners: Arc<Mutex<Vec<(ListenerId, Listener)>>>,
}

impl std::fmt::Debug for OrderQueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderQueryCache")
            .field("epoch", &self.epoch.current())
            .field("listeners", &self.listeners.lock().len())
            .finish_non_exhaustive()
    }
}

impl OrderQueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Active view ==========

    /// Handle on the view epoch, for stamping deliveries
    pub fn view_epoch(&self) -> ViewEpoch {
        self.epoch.clone()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.current()
    }

    /// Make `key` the active view and return the epoch that identifies it.
    ///
    /// Re-activating the current key keeps the epoch. Previously cached data
    /// for the key stays visible while it is refetched, and orders merged into
    /// it before the fetch lands are kept by [`store_page`].
    ///
    /// [`store_page`]: OrderQueryCache::store_page
    pub fn activate(&self, key: QueryKey) -> u64 {
        let epoch = {
            let mut state = self.state.write();
            let entry = state
                .pages
                .entry(key.clone())
                .or_insert_with(|| PageEntry::new(FetchState::Loading, false));
            entry.fetching = true;
            entry.live.clear();

            if state.active.as_ref() == Some(&key) {
                return self.epoch.current();
            }
            state.active = Some(key.clone());
            self.epoch.advance()
        };
        tracing::debug!(epoch, page = key.page, "Active order view changed");
        self.notify(&CacheChange::Page(key));
        epoch
    }

    pub fn active_key(&self) -> Option<QueryKey> {
        self.state.read().active.clone()
    }

    /// Snapshot of the active page, if it is loaded
    pub fn active_page(&self) -> Option<PageSnapshot> {
        let state = self.state.read();
        let key = state.active.as_ref()?;
        state.pages.get(key)?.state.snapshot().cloned()
    }

    // ========== Pages ==========

    pub fn page(&self, key: &QueryKey) -> Option<FetchState> {
        self.state.read().pages.get(key).map(|e| e.state.clone())
    }

    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.state
            .read()
            .pages
            .get(key)
            .map(|e| e.stale)
            .unwrap_or(true)
    }

    /// Store a fetched page; clears its stale flag.
    ///
    /// Orders merged live while the fetch was in flight and missing from the
    /// fetched rows are merged back on top, so a refetch never hides them.
    pub fn store_page(&self, key: QueryKey, snapshot: PageSnapshot) {
        {
            let mut state = self.state.write();
            let live = state
                .pages
                .get_mut(&key)
                .map(|e| std::mem::take(&mut e.live))
                .unwrap_or_default();
            let missing: Vec<Order> = live
                .into_iter()
                .filter(|order| !snapshot.contains(&order.id))
                .collect();
            if !missing.is_empty() {
                tracing::debug!(count = missing.len(), page = key.page, "Keeping live orders missing from fetch");
            }
            let snapshot = missing.into_iter().fold(snapshot, merge);
            state
                .pages
                .insert(key.clone(), PageEntry::new(FetchState::Ready(snapshot), false));
        }
        self.notify(&CacheChange::Page(key));
    }

    /// Record a failed fetch so the view can tell it apart from an empty page
    pub fn store_error(&self, key: QueryKey, message: impl Into<String>) {
        {
            let mut state = self.state.write();
            state.pages.insert(
                key.clone(),
                PageEntry::new(FetchState::Failed(message.into()), true),
            );
        }
        self.notify(&CacheChange::Page(key));
    }

    // ========== Single-order views ==========

    pub fn order(&self, order_id: &str) -> Option<Order> {
        self.state
            .read()
            .orders
            .get(order_id)
            .map(|e| e.order.clone())
    }

    pub fn store_order(&self, order: Order) {
        let id = order.id.clone();
        {
            let mut state = self.state.write();
            state.orders.insert(id.clone(), OrderEntry { order, stale: false });
        }
        self.notify(&CacheChange::Order(id));
    }

    pub fn is_order_stale(&self, order_id: &str) -> bool {
        self.state
            .read()
            .orders
            .get(order_id)
            .map(|e| e.stale)
            .unwrap_or(true)
    }

    /// Furthest status any cached copy of the order has reached, across its
    /// detail view and every loaded page
    pub fn known_status(&self, order_id: &str) -> Option<OrderStatus> {
        let state = self.state.read();
        let detail = state.orders.get(order_id).map(|e| e.order.order_status);
        state
            .pages
            .values()
            .filter_map(|e| e.state.snapshot())
            .filter_map(|s| s.get(order_id))
            .map(|o| o.order_status)
            .chain(detail)
            .max()
    }

    // ========== Writes from the live feed and status commands ==========

    /// Merge an admitted order into the active page.
    ///
    /// `epoch` is the view epoch observed when the event arrived.
    pub fn merge_admitted(&self, epoch: u64, order: Order) -> MergeOutcome {
        let order_id = order.id.clone();
        let (outcome, key) = {
            let mut guard = self.state.write();
            let state = &mut *guard;
            if epoch != self.epoch.current() {
                (MergeOutcome::Dropped(DropReason::StaleView), None)
            } else {
                match state
                    .active
                    .as_ref()
                    .and_then(|key| state.pages.get_mut(key).map(|e| (key, e)))
                {
                    Some((
                        key,
                        PageEntry {
                            state: FetchState::Ready(snapshot),
                            fetching,
                            live,
                            ..
                        },
                    )) => {
                        if *fetching {
                            live.push(order.clone());
                        }
                        let outcome = if snapshot.contains(&order.id) {
                            MergeOutcome::Replaced
                        } else {
                            MergeOutcome::Inserted
                        };
                        let current = std::mem::take(snapshot);
                        *snapshot = merge(current, order);
                        (outcome, Some(key.clone()))
                    }
                    _ => (MergeOutcome::Dropped(DropReason::NotLoaded), None),
                }
            }
        };

        match key {
            Some(key) => {
                tracing::debug!(order_id = %order_id, ?outcome, "Merged live order");
                self.notify(&CacheChange::Page(key));
            }
            None => tracing::debug!(order_id = %order_id, ?outcome, epoch, "Live order not merged"),
        }
        outcome
    }

    /// Set the status of `order_id` in every cached page and its detail view.
    ///
    /// A copy already further along keeps its status. Returns how many cached
    /// copies hold the order.
    pub fn set_order_status(&self, order_id: &str, status: OrderStatus) -> usize {
        let (updated, pages) = {
            let mut state = self.state.write();
            let mut updated = 0;
            let mut pages = Vec::new();
            for (key, entry) in state.pages.iter_mut() {
                if let FetchState::Ready(snapshot) = &mut entry.state
                    && let Some(index) = snapshot.position(order_id)
                {
                    let item = &mut snapshot.items[index];
                    item.order_status = item.order_status.max(status);
                    updated += 1;
                    pages.push(key.clone());
                }
            }
            if let Some(entry) = state.orders.get_mut(order_id) {
                entry.order.order_status = entry.order.order_status.max(status);
                updated += 1;
            }
            (updated, pages)
        };

        for key in pages {
            self.notify(&CacheChange::Page(key));
        }
        self.notify(&CacheChange::Order(order_id.to_string()));
        updated
    }

    /// Mark every page and single-order view stale
    pub fn invalidate_orders(&self) {
        {
            let mut state = self.state.write();
            state.pages.values_mut().for_each(|e| e.stale = true);
            state.orders.values_mut().for_each(|e| e.stale = true);
        }
        self.notify(&CacheChange::Invalidated);
    }

    /// Drop everything and deactivate the current view
    pub fn clear(&self) {
        {
            let mut state = self.state.write();
            *state = CacheState::default();
            self.epoch.advance();
        }
        self.notify(&CacheChange::Cleared);
    }

    // ========== Observers ==========

    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&CacheChange) + Send + Sync + 'static,
    {
        let id = ListenerId(Uuid::new_v4());
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Returns false if the listener was not registered
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    pub fn notify(&self, change: &CacheChange) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::{OrderFilters, PaymentMode, PaymentStatus};
    use std::sync::atomic::AtomicUsize;

    fn cash(id: &str) -> Order {
        Order::new(id, PaymentMode::Cash, PaymentStatus::Pending)
    }

    fn loaded(cache: &OrderQueryCache, key: &QueryKey, ids: &[&str]) -> u64 {
        let epoch = cache.activate(key.clone());
        cache.store_page(
            key.clone(),
            PageSnapshot::new(ids.iter().map(|id| cash(id)).collect(), ids.len() as u64),
        );
        epoch
    }

    #[test]
    fn test_activate_bumps_epoch_only_on_change() {
        let cache = OrderQueryCache::new();
        let key = QueryKey::default();
        let first = cache.activate(key.clone());
        assert_eq!(cache.activate(key.clone()), first);
        let second = cache.activate(key.at_page(2));
        assert!(second > first);
        assert_eq!(cache.page(&key.at_page(2)), Some(FetchState::Loading));
    }

    #[test]
    fn test_merge_into_active_page() {
        let cache = OrderQueryCache::new();
        let key = QueryKey::default();
        let epoch = loaded(&cache, &key, &["a"]);

        assert_eq!(cache.merge_admitted(epoch, cash("b")), MergeOutcome::Inserted);
        assert_eq!(cache.merge_admitted(epoch, cash("b")), MergeOutcome::Replaced);
        assert_eq!(cache.active_page().unwrap().ids(), vec!["b", "a"]);
    }

    #[test]
    fn test_merge_dropped_after_view_change() {
        let cache = OrderQueryCache::new();
        let key = QueryKey::default();
        let old_epoch = loaded(&cache, &key, &["a"]);

        let filtered =
            key.clone().with_filters(OrderFilters::default().with_payment_mode(PaymentMode::Card));
        loaded(&cache, &filtered, &[]);

        assert_eq!(
            cache.merge_admitted(old_epoch, cash("b")),
            MergeOutcome::Dropped(DropReason::StaleView)
        );
        assert!(cache.active_page().unwrap().is_empty());
        assert_eq!(cache.page(&key).unwrap().snapshot().unwrap().ids(), vec!["a"]);
    }

    #[test]
    fn test_merge_dropped_while_loading() {
        let cache = OrderQueryCache::new();
        let epoch = cache.activate(QueryKey::default());
        assert_eq!(
            cache.merge_admitted(epoch, cash("a")),
            MergeOutcome::Dropped(DropReason::NotLoaded)
        );

        let cache = OrderQueryCache::new();
        assert_eq!(
            cache.merge_admitted(cache.epoch(), cash("a")),
            MergeOutcome::Dropped(DropReason::NotLoaded)
        );
    }

    #[test]
    fn test_failure_is_not_an_empty_page() {
        let cache = OrderQueryCache::new();
        let ok = QueryKey::default();
        let broken = ok.at_page(2);

        cache.store_page(ok.clone(), PageSnapshot::empty());
        cache.store_error(broken.clone(), "503 Service Unavailable");

        let ok_state = cache.page(&ok).unwrap();
        assert_eq!(ok_state.snapshot().map(|s| s.len()), Some(0));
        assert!(!ok_state.is_failed());
        assert!(cache.page(&broken).unwrap().is_failed());
    }

    #[test]
    fn test_set_order_status_updates_every_copy() {
        let cache = OrderQueryCache::new();
        let key = QueryKey::default();
        loaded(&cache, &key, &["a", "b"]);
        cache.store_page(key.at_page(2), PageSnapshot::new(vec![cash("b")], 2));
        cache.store_order(cash("b"));

        assert_eq!(cache.set_order_status("b", OrderStatus::Preparing), 3);
        assert_eq!(cache.order("b").unwrap().order_status, OrderStatus::Preparing);
        assert_eq!(cache.known_status("b"), Some(OrderStatus::Preparing));
        assert_eq!(cache.known_status("a"), Some(OrderStatus::Received));
        assert_eq!(cache.known_status("zzz"), None);
    }

    #[test]
    fn test_known_status_is_the_furthest_copy() {
        let cache = OrderQueryCache::new();
        let key = QueryKey::default();
        let epoch = loaded(&cache, &key, &["o1"]);
        cache.store_order(cash("o1"));

        // the page moves ahead of the detail view
        cache.merge_admitted(epoch, cash("o1").with_status(OrderStatus::OutForDelivery));
        assert_eq!(cache.order("o1").unwrap().order_status, OrderStatus::Received);
        assert_eq!(cache.known_status("o1"), Some(OrderStatus::OutForDelivery));

        // and a lower write never pulls the page back
        assert_eq!(cache.set_order_status("o1", OrderStatus::Confirmed), 2);
        assert_eq!(cache.known_status("o1"), Some(OrderStatus::OutForDelivery));
        assert_eq!(cache.order("o1").unwrap().order_status, OrderStatus::Confirmed);
    }

    #[test]
    fn test_refetch_keeps_orders_merged_in_flight() {
        let cache = OrderQueryCache::new();
        let key = QueryKey::default();
        loaded(&cache, &key, &["a"]);

        // refetch of the same view starts; a live order lands before it returns
        let epoch = cache.activate(key.clone());
        assert_eq!(cache.merge_admitted(epoch, cash("o9")), MergeOutcome::Inserted);
        cache.store_page(key.clone(), PageSnapshot::new(vec![cash("a")], 1));
        assert_eq!(cache.active_page().unwrap().ids(), vec!["o9", "a"]);

        // a later fetch without an in-flight merge is taken as is
        cache.activate(key.clone());
        cache.store_page(key.clone(), PageSnapshot::new(vec![cash("a")], 1));
        assert_eq!(cache.active_page().unwrap().ids(), vec!["a"]);
    }

    #[test]
    fn test_refetch_prefers_fetched_copy_of_known_order() {
        let cache = OrderQueryCache::new();
        let key = QueryKey::default();
        loaded(&cache, &key, &["a"]);

        let epoch = cache.activate(key.clone());
        cache.merge_admitted(epoch, cash("a").with_status(OrderStatus::Confirmed));
        cache.store_page(
            key.clone(),
            PageSnapshot::new(vec![cash("a").with_status(OrderStatus::Preparing)], 1),
        );
        assert_eq!(cache.known_status("a"), Some(OrderStatus::Preparing));
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = OrderQueryCache::new();
        let key = QueryKey::default();
        loaded(&cache, &key, &["a"]);
        cache.store_order(cash("a"));
        assert!(!cache.is_stale(&key));

        cache.invalidate_orders();
        assert!(cache.is_stale(&key));
        assert!(cache.is_order_stale("a"));

        let before = cache.epoch();
        cache.clear();
        assert!(cache.active_key().is_none());
        assert!(cache.page(&key).is_none());
        assert!(cache.epoch() > before);
    }

    #[test]
    fn test_listeners_see_complete_state() {
        let cache = OrderQueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let reader = cache.clone();
        let counter = Arc::clone(&calls);
        let id = cache.subscribe(move |change| {
            if let CacheChange::Page(key) = change {
                // reading inside a listener must not deadlock
                let _ = reader.page(key);
            }
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let key = QueryKey::default();
        let epoch = loaded(&cache, &key, &[]);
        cache.merge_admitted(epoch, cash("a"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        assert!(cache.unsubscribe(id));
        assert!(!cache.unsubscribe(id));
        cache.invalidate_orders();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
