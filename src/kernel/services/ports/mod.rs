//! Service ports: traits + data contracts.

pub mod runtime;
pub mod search;
pub mod settings;

pub use runtime::{CompletionSink, Job};
pub use search::{
    match_count, Elapsed, ResultNode, SearchError, SearchEvent, SearchOutcome, SearchRequest,
    SearchResults, Stats, Submatch, TaskState,
};
pub use settings::{EngineSettings, SavedSearch, SearchOptions, Settings};
