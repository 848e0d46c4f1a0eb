//! Query snapshots, their reducer, and the typed views handed to callers.

use std::any::Any;
use std::sync::Arc;

use crate::mvi::{Intent, Reducer, State};
use crate::remote::ApiError;

use super::page::Page;

pub(crate) type Erased = Arc<dyn Any + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStatus {
    /// Registered but never fetched.
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// A fetched page with its pagination fields lifted out of the erased data.
#[derive(Clone)]
pub(crate) struct ErasedPage {
    /// Page number that was requested.
    pub number: u32,
    pub current_page: u32,
    pub total_pages: u32,
    pub page: Erased,
}

/// Type-erased state of one cache entry. Views decode it on demand.
#[derive(Clone, Default)]
pub struct QuerySnapshot {
    pub(crate) status: QueryStatus,
    pub(crate) data: Option<Erased>,
    /// Accumulated pages, ordered by page number, for infinite lists.
    pub(crate) pages: Vec<ErasedPage>,
    pub(crate) error: Option<ApiError>,
    pub(crate) fetching_page: Option<u32>,
    /// Bumped on every transition.
    pub(crate) revision: u64,
}

impl State for QuerySnapshot {}

impl QuerySnapshot {
    pub fn status(&self) -> QueryStatus {
        self.status
    }

    pub(crate) fn has_page(&self, number: u32) -> bool {
        self.pages.iter().any(|p| p.number == number)
    }

    pub(crate) fn page_numbers(&self) -> Vec<u32> {
        self.pages.iter().map(|p| p.number).collect()
    }

    /// Next page to request, following the last accumulated page.
    pub(crate) fn next_page(&self) -> Option<u32> {
        match self.pages.last() {
            None => Some(1),
            Some(last) if last.current_page < last.total_pages => Some(last.current_page + 1),
            Some(_) => None,
        }
    }
}

pub(crate) enum QueryIntent {
    FetchStarted,
    PageFetchStarted(u32),
    /// Data is stale; drop it and reload.
    Invalidated,
    Fetched(Erased),
    PageFetched(ErasedPage),
    PagesReplaced(Vec<ErasedPage>),
    Failed(ApiError),
}

impl Intent for QueryIntent {}

pub(crate) struct QueryReducer;

impl Reducer for QueryReducer {
    type State = QuerySnapshot;
    type Intent = QueryIntent;

    fn reduce(mut state: Self::State, intent: Self::Intent) -> Self::State {
        state.revision += 1;
        match intent {
            QueryIntent::FetchStarted => {
                state.status = QueryStatus::Loading;
                state.error = None;
                state.fetching_page = None;
            }
            QueryIntent::PageFetchStarted(number) => {
                state.status = QueryStatus::Loading;
                state.error = None;
                state.fetching_page = Some(number);
            }
            QueryIntent::Invalidated => {
                state.status = QueryStatus::Loading;
                state.data = None;
                state.pages.clear();
                state.error = None;
                state.fetching_page = None;
            }
            QueryIntent::Fetched(data) => {
                state.status = QueryStatus::Success;
                state.data = Some(data);
                state.error = None;
                state.fetching_page = None;
            }
            QueryIntent::PageFetched(page) => {
                if !state.has_page(page.number) {
                    let at = state
                        .pages
                        .iter()
                        .position(|p| p.number > page.number)
                        .unwrap_or(state.pages.len());
                    state.pages.insert(at, page);
                }
                state.status = QueryStatus::Success;
                state.error = None;
                state.fetching_page = None;
            }
            QueryIntent::PagesReplaced(pages) => {
                state.pages = pages;
                state.status = QueryStatus::Success;
                state.error = None;
                state.fetching_page = None;
            }
            QueryIntent::Failed(error) => {
                state.status = QueryStatus::Error;
                state.error = Some(error);
                state.fetching_page = None;
            }
        }
        state
    }
}

/// A typed view over a [`QuerySnapshot`].
pub trait QueryView: Sized {
    fn from_snapshot(snapshot: &QuerySnapshot) -> Self;
}

/// State of a single-value query.
#[derive(Debug, PartialEq)]
pub struct QueryState<T> {
    pub status: QueryStatus,
    pub data: Option<Arc<T>>,
    pub error: Option<ApiError>,
    pub revision: u64,
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            revision: self.revision,
        }
    }
}

impl<T> QueryState<T> {
    pub fn data(&self) -> Option<&T> {
        self.data.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    /// The data on success, the error otherwise.
    pub fn into_result(self) -> Result<Arc<T>, ApiError> {
        match (self.data, self.error) {
            (_, Some(error)) => Err(error),
            (Some(data), None) => Ok(data),
            (None, None) => Err(ApiError::invalid("Query has no data")),
        }
    }
}

impl<T: Send + Sync + 'static> QueryView for QueryState<T> {
    fn from_snapshot(snapshot: &QuerySnapshot) -> Self {
        let data = snapshot.data.clone().and_then(|d| match d.downcast::<T>() {
            Ok(data) => Some(data),
            Err(_) => {
                tracing::warn!("Cached query data has an unexpected type");
                None
            }
        });
        Self {
            status: snapshot.status,
            data,
            error: snapshot.error.clone(),
            revision: snapshot.revision,
        }
    }
}

/// State of an infinite list: every page accumulated so far.
#[derive(Debug, PartialEq)]
pub struct InfiniteState<T> {
    pub status: QueryStatus,
    pub pages: Vec<Arc<Page<T>>>,
    pub error: Option<ApiError>,
    /// Page currently being appended, if any.
    pub fetching_page: Option<u32>,
    pub revision: u64,
}

impl<T> Clone for InfiniteState<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            pages: self.pages.clone(),
            error: self.error.clone(),
            fetching_page: self.fetching_page,
            revision: self.revision,
        }
    }
}

impl<T> InfiniteState<T> {
    /// All accumulated items in page order.
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.pages.iter().flat_map(|p| p.items.iter())
    }

    pub fn len(&self) -> usize {
        self.pages.iter().map(|p| p.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Recomputed from the last accumulated page.
    pub fn has_next(&self) -> bool {
        self.pages.last().is_some_and(|p| p.has_next())
    }

    pub fn current_page(&self) -> Option<u32> {
        self.pages.last().map(|p| p.current_page)
    }

    pub fn total_pages(&self) -> Option<u32> {
        self.pages.last().map(|p| p.total_pages)
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }
}

impl<T: Send + Sync + 'static> QueryView for InfiniteState<T> {
    fn from_snapshot(snapshot: &QuerySnapshot) -> Self {
        let pages = snapshot
            .pages
            .iter()
            .filter_map(|p| p.page.clone().downcast::<Page<T>>().ok())
            .collect();
        Self {
            status: snapshot.status,
            pages,
            error: snapshot.error.clone(),
            fetching_page: snapshot.fetching_page,
            revision: snapshot.revision,
        }
    }
}
