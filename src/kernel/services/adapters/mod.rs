//! Service adapters: OS/runtime specific implementations (processes/IO/async).

pub mod runtime;
pub mod search;
pub mod settings;

pub use runtime::AsyncRuntime;
pub use search::{
    classify, pump, CancelToken, CompiledQuery, Flow, Orchestrator, PumpEnd, QueryCompiler,
    SearchRun, SearchService, SearchTask, TreeBuilder,
};
pub use settings::{
    ensure_log_dir, get_log_dir, get_settings_path, load_settings_from, save_settings,
};
