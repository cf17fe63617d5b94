//! 外部搜索引擎驱动
//!
//! - query: SearchRequest -> 引擎参数
//! - events: JSON 行 -> SearchEvent
//! - tree: SearchEvent -> 文件/匹配两层结果树
//! - process: 子进程生命周期与取消
//! - task: 后台任务句柄，结果投递回宿主线程

mod events;
mod process;
mod query;
mod task;
mod tree;

pub use events::classify;
pub use process::{pump, CancelToken, Orchestrator, PumpEnd, SearchRun};
pub use query::{CompiledQuery, QueryCompiler};
pub use task::{SearchService, SearchTask};
pub use tree::{Flow, ProgressFn, TreeBuilder};
