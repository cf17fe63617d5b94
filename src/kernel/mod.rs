//! Headless search core: engine invocation, event decoding, result trees.

pub mod services;

pub use services::adapters::{AsyncRuntime, CancelToken, SearchService, SearchTask};
pub use services::ports::{
    ResultNode, SearchError, SearchEvent, SearchOutcome, SearchRequest, SearchResults, Settings,
};
