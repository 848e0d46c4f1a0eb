use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::mvi::Reducer;
use crate::remote::ApiError;

use super::key::QueryKey;
use super::page::Page;
use super::state::{
    Erased, ErasedPage, InfiniteState, QueryIntent, QueryReducer, QuerySnapshot, QueryState,
    QueryStatus, QueryView,
};

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type SingleFetcher = Arc<dyn Fn() -> BoxFuture<Result<Erased, ApiError>> + Send + Sync>;
type PageFetcher = Arc<dyn Fn(u32) -> BoxFuture<Result<ErasedPage, ApiError>> + Send + Sync>;

#[derive(Clone)]
enum Fetcher {
    Single(SingleFetcher),
    Paged(PageFetcher),
}

enum FetchJob {
    Single(SingleFetcher),
    Page(PageFetcher, u32),
    /// Refetch every listed page in order, replacing the accumulation.
    Reload(PageFetcher, Vec<u32>),
}

impl FetchJob {
    async fn run(self) -> QueryIntent {
        match self {
            FetchJob::Single(fetch) => match fetch().await {
                Ok(data) => QueryIntent::Fetched(data),
                Err(err) => QueryIntent::Failed(err),
            },
            FetchJob::Page(fetch, number) => match fetch(number).await {
                Ok(page) => QueryIntent::PageFetched(page),
                Err(err) => QueryIntent::Failed(err),
            },
            FetchJob::Reload(fetch, numbers) => {
                let mut pages = Vec::with_capacity(numbers.len());
                for number in numbers {
                    match fetch(number).await {
                        Ok(page) => {
                            let more = page.current_page < page.total_pages;
                            pages.push(page);
                            if !more {
                                break;
                            }
                        }
                        Err(err) => return QueryIntent::Failed(err),
                    }
                }
                QueryIntent::PagesReplaced(pages)
            }
        }
    }
}

struct Entry {
    tx: watch::Sender<QuerySnapshot>,
    fetcher: Fetcher,
    subscribers: usize,
    /// Generation of the fetch whose result may land; others are discarded.
    generation: u64,
}

impl Entry {
    fn new(fetcher: Fetcher) -> Self {
        let (tx, _rx) = watch::channel(QuerySnapshot::default());
        Self {
            tx,
            fetcher,
            subscribers: 0,
            generation: 0,
        }
    }

    fn status(&self) -> QueryStatus {
        self.tx.borrow().status
    }

    fn apply(&self, intent: QueryIntent) {
        self.tx.send_modify(|snapshot| {
            let current = std::mem::take(snapshot);
            *snapshot = QueryReducer::reduce(current, intent);
        });
    }
}

/// Keyed cache of remote reads with mutation-driven invalidation.
///
/// - At most one fetch per key is in flight; concurrent readers share it.
/// - Entries never expire by time, only through [`invalidate`](Self::invalidate).
/// - Each fetch carries a generation; a result only lands if the entry still
///   expects that generation, so a response issued before an invalidation
///   can never overwrite the reload that follows it.
///
/// Fetches run on spawned Tokio tasks; methods that can start one must be
/// called within a Tokio runtime.
#[derive(Clone, Default)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    generations: AtomicU64,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, fetching it if absent, errored or
    /// stale. Waits for an in-flight fetch instead of issuing another.
    pub async fn read<T, F, Fut>(&self, key: QueryKey, fetch: F) -> QueryState<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let single = erase_single(fetch);
        loop {
            let mut rx = {
                let mut entries = self.inner.entries.lock();
                let entry = entries
                    .entry(key.clone())
                    .or_insert_with(|| Entry::new(Fetcher::Single(single.clone())));
                entry.fetcher = Fetcher::Single(single.clone());

                match entry.status() {
                    QueryStatus::Success => {
                        return QueryState::from_snapshot(&entry.tx.borrow());
                    }
                    QueryStatus::Loading => {}
                    QueryStatus::Idle | QueryStatus::Error => {
                        self.start(
                            &key,
                            entry,
                            FetchJob::Single(single.clone()),
                            QueryIntent::FetchStarted,
                        );
                    }
                }
                entry.tx.subscribe()
            };

            let settled = match rx.wait_for(|s| s.status != QueryStatus::Loading).await {
                Ok(snapshot) => Some(QueryState::from_snapshot(&snapshot)),
                // Dropped by an invalidation while unobserved; fetch again.
                Err(_) => None,
            };
            if let Some(state) = settled {
                return state;
            }
        }
    }

    /// Make sure page `page` of an infinite list is accumulated and return
    /// the whole list. Pages already accumulated are not fetched again.
    pub async fn read_page<T, F, Fut>(&self, key: QueryKey, fetch: F, page: u32) -> InfiniteState<T>
    where
        T: Send + Sync + 'static,
        F: Fn(u32) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Page<T>, ApiError>> + Send + 'static,
    {
        let paged = erase_paged(fetch);
        match self.settle_page(&key, Some(paged), page).await {
            Some(snapshot) => InfiniteState::from_snapshot(&snapshot),
            None => InfiniteState::from_snapshot(&QuerySnapshot::default()),
        }
    }

    /// Append the page after the last accumulated one, using the fetcher the
    /// list was registered with. `None` when the list is unknown or complete.
    pub async fn fetch_next_page<T>(&self, key: &QueryKey) -> Option<InfiniteState<T>>
    where
        T: Send + Sync + 'static,
    {
        let next = {
            let entries = self.inner.entries.lock();
            let entry = entries.get(key)?;
            let next = entry.tx.borrow().next_page();
            next?
        };
        let snapshot = self.settle_page(key, None, next).await?;
        Some(InfiniteState::from_snapshot(&snapshot))
    }

    async fn settle_page(
        &self,
        key: &QueryKey,
        supplied: Option<PageFetcher>,
        page: u32,
    ) -> Option<QuerySnapshot> {
        let mut issued = false;
        loop {
            let mut rx = {
                let mut entries = self.inner.entries.lock();
                let entry = match &supplied {
                    Some(fetcher) => {
                        let entry = entries
                            .entry(key.clone())
                            .or_insert_with(|| Entry::new(Fetcher::Paged(fetcher.clone())));
                        entry.fetcher = Fetcher::Paged(fetcher.clone());
                        entry
                    }
                    None => entries.get_mut(key)?,
                };
                let Fetcher::Paged(fetcher) = entry.fetcher.clone() else {
                    return None;
                };

                let (status, has_page) = {
                    let snapshot = entry.tx.borrow();
                    (snapshot.status, snapshot.has_page(page))
                };
                match status {
                    QueryStatus::Loading => {}
                    _ if has_page => return Some(entry.tx.borrow().clone()),
                    QueryStatus::Error if issued => return Some(entry.tx.borrow().clone()),
                    _ => {
                        self.start(
                            key,
                            entry,
                            FetchJob::Page(fetcher, page),
                            QueryIntent::PageFetchStarted(page),
                        );
                        issued = true;
                    }
                }
                entry.tx.subscribe()
            };

            let dropped = rx
                .wait_for(|s| s.status != QueryStatus::Loading)
                .await
                .is_err();
            if dropped {
                // Invalidated while unobserved; only a caller with a fetcher
                // can recreate the entry.
                if supplied.is_none() {
                    return None;
                }
                issued = false;
            }
        }
    }

    /// Observe `key`, fetching it now if absent, errored or stale. While a
    /// subscription is alive the entry survives invalidation and is
    /// refetched immediately instead of dropped.
    pub fn subscribe<T, F, Fut>(&self, key: QueryKey, fetch: F) -> Subscription<QueryState<T>>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let single = erase_single(fetch);
        let rx = {
            let mut entries = self.inner.entries.lock();
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(Fetcher::Single(single.clone())));
            entry.fetcher = Fetcher::Single(single.clone());
            entry.subscribers += 1;

            if matches!(entry.status(), QueryStatus::Idle | QueryStatus::Error) {
                self.start(&key, entry, FetchJob::Single(single), QueryIntent::FetchStarted);
            }
            entry.tx.subscribe()
        };
        Subscription::new(self.clone(), key, rx)
    }

    /// Observe an infinite list, loading its first page if nothing is
    /// accumulated yet.
    pub fn subscribe_pages<T, F, Fut>(
        &self,
        key: QueryKey,
        fetch: F,
    ) -> Subscription<InfiniteState<T>>
    where
        T: Send + Sync + 'static,
        F: Fn(u32) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Page<T>, ApiError>> + Send + 'static,
    {
        let paged = erase_paged(fetch);
        let rx = {
            let mut entries = self.inner.entries.lock();
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(Fetcher::Paged(paged.clone())));
            entry.fetcher = Fetcher::Paged(paged.clone());
            entry.subscribers += 1;

            let (status, empty) = {
                let snapshot = entry.tx.borrow();
                (snapshot.status, snapshot.pages.is_empty())
            };
            if empty && matches!(status, QueryStatus::Idle | QueryStatus::Error) {
                self.start(
                    &key,
                    entry,
                    FetchJob::Page(paged, 1),
                    QueryIntent::PageFetchStarted(1),
                );
            }
            entry.tx.subscribe()
        };
        Subscription::new(self.clone(), key, rx)
    }

    /// Mark every entry matched by `patterns` stale. Unobserved entries are
    /// dropped; observed ones move to `Loading` and are refetched now.
    pub fn invalidate(&self, patterns: &[QueryKey]) {
        let mut entries = self.inner.entries.lock();
        let matching: Vec<QueryKey> = entries
            .keys()
            .filter(|k| patterns.iter().any(|p| p.matches(k)))
            .cloned()
            .collect();

        for key in matching {
            let Some(entry) = entries.get_mut(&key) else {
                continue;
            };

            if entry.subscribers == 0 {
                entries.remove(&key);
                tracing::debug!(key = %key, "Dropped stale query");
                continue;
            }

            let job = match &entry.fetcher {
                Fetcher::Single(fetch) => FetchJob::Single(fetch.clone()),
                Fetcher::Paged(fetch) => {
                    let mut numbers = entry.tx.borrow().page_numbers();
                    if numbers.is_empty() {
                        numbers.push(1);
                    }
                    FetchJob::Reload(fetch.clone(), numbers)
                }
            };
            tracing::debug!(key = %key, "Refetching invalidated query");
            self.start(&key, entry, job, QueryIntent::Invalidated);
        }
    }

    /// Invalidate every entry, e.g. when the identity changes.
    pub fn invalidate_all(&self) {
        let patterns: Vec<QueryKey> = {
            let entries = self.inner.entries.lock();
            entries.keys().cloned().collect()
        };
        self.invalidate(&patterns);
    }

    /// Run a write and invalidate `invalidates` once it has succeeded.
    ///
    /// A rejected write leaves the cache untouched. A write whose outcome is
    /// unknown (no response) still invalidates, since the server may have
    /// applied it.
    pub async fn mutate<T, Fut>(&self, operation: Fut, invalidates: &[QueryKey]) -> Result<T, ApiError>
    where
        Fut: Future<Output = Result<T, ApiError>>,
    {
        match operation.await {
            Ok(value) => {
                self.invalidate(invalidates);
                Ok(value)
            }
            Err(err) if err.is_ambiguous() => {
                tracing::warn!(error = %err, "Mutation outcome unknown, invalidating");
                self.invalidate(invalidates);
                Err(err)
            }
            Err(err) => {
                tracing::warn!(kind = err.kind(), error = %err, "Mutation failed");
                Err(err)
            }
        }
    }

    /// Current view of `key` without fetching.
    pub fn peek<V: QueryView>(&self, key: &QueryKey) -> Option<V> {
        let entries = self.inner.entries.lock();
        entries.get(key).map(|e| V::from_snapshot(&e.tx.borrow()))
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.inner.entries.lock().contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().is_empty()
    }

    fn start(&self, key: &QueryKey, entry: &mut Entry, job: FetchJob, intent: QueryIntent) {
        let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed) + 1;
        entry.generation = generation;
        entry.apply(intent);

        let cache = self.clone();
        let key = key.clone();
        tracing::debug!(key = %key, generation, "Fetching query");
        tokio::spawn(async move {
            let intent = job.run().await;
            cache.complete(&key, generation, intent);
        });
    }

    fn complete(&self, key: &QueryKey, generation: u64, intent: QueryIntent) {
        let entries = self.inner.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.generation == generation => {
                if let QueryIntent::Failed(err) = &intent {
                    tracing::debug!(key = %key, kind = err.kind(), "Query failed");
                }
                entry.apply(intent);
            }
            _ => tracing::debug!(key = %key, generation, "Discarding superseded fetch"),
        }
    }

    fn unsubscribe(&self, key: &QueryKey) {
        if let Some(entry) = self.inner.entries.lock().get_mut(key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
        }
    }
}

fn erase_single<T, F, Fut>(fetch: F) -> SingleFetcher
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
{
    Arc::new(move || -> BoxFuture<Result<Erased, ApiError>> {
        let fut = fetch();
        Box::pin(async move { fut.await.map(|value| Arc::new(value) as Erased) })
    })
}

fn erase_paged<T, F, Fut>(fetch: F) -> PageFetcher
where
    T: Send + Sync + 'static,
    F: Fn(u32) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Page<T>, ApiError>> + Send + 'static,
{
    Arc::new(move |number| -> BoxFuture<Result<ErasedPage, ApiError>> {
        let fut = fetch(number);
        Box::pin(async move {
            fut.await.map(|page| ErasedPage {
                number,
                current_page: page.current_page,
                total_pages: page.total_pages,
                page: Arc::new(page) as Erased,
            })
        })
    })
}

/// Live view of one cache entry. Dropping it releases the entry, which then
/// gets dropped rather than refetched on the next invalidation.
pub struct Subscription<V: QueryView> {
    cache: QueryCache,
    key: QueryKey,
    rx: watch::Receiver<QuerySnapshot>,
    _view: PhantomData<fn() -> V>,
}

impl<V: QueryView> Subscription<V> {
    fn new(cache: QueryCache, key: QueryKey, rx: watch::Receiver<QuerySnapshot>) -> Self {
        Self {
            cache,
            key,
            rx,
            _view: PhantomData,
        }
    }

    pub fn current(&self) -> V {
        V::from_snapshot(&self.rx.borrow())
    }

    /// Wait until the entry holds a result (success or error).
    pub async fn settled(&mut self) -> V {
        let settled = match self
            .rx
            .wait_for(|s| matches!(s.status, QueryStatus::Success | QueryStatus::Error))
            .await
        {
            Ok(snapshot) => Some(V::from_snapshot(&snapshot)),
            Err(_) => None,
        };
        settled.unwrap_or_else(|| self.current())
    }
}

impl<V: QueryView> Drop for Subscription<V> {
    fn drop(&mut self) {
        self.cache.unsubscribe(&self.key);
    }
}
