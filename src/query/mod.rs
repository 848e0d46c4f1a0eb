//! Query cache with pagination accumulation and mutation-declared
//! invalidation.

mod cache;
mod key;
mod page;
mod state;

pub use cache::{QueryCache, Subscription};
pub use key::QueryKey;
pub use page::Page;
pub use state::{InfiniteState, QuerySnapshot, QueryState, QueryStatus, QueryView};
