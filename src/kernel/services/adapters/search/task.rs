//! 异步搜索任务
//!
//! 搜索在 tokio 的 blocking 线程上执行，结果通过 CompletionSink 投递回宿主线程，
//! 每个任务只投递一次。进度通知走同一个队列，保证先于完成回调到达。

use super::process::{CancelToken, Orchestrator};
use super::tree::TreeBuilder;
use crate::kernel::services::ports::{
    CompletionSink, SearchError, SearchOutcome, SearchRequest, SearchResults, Settings, TaskState,
};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

static SEARCH_ID: AtomicU64 = AtomicU64::new(0);

fn next_search_id() -> u64 {
    SEARCH_ID.fetch_add(1, Ordering::Relaxed)
}

type CompletionFn = Box<dyn FnOnce(SearchOutcome) + Send>;
type SharedProgress = Arc<dyn Fn(usize) + Send + Sync>;

struct TaskShared {
    state: TaskState,
    /// 回调注册之前就已到达的结果
    parked: Option<SearchOutcome>,
    callback: Option<CompletionFn>,
}

fn lock(shared: &Mutex<TaskShared>) -> MutexGuard<'_, TaskShared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 在 sink 的上下文中执行。只有第一次生效，之后的调用被忽略。
fn settle(shared: &Mutex<TaskShared>, outcome: SearchOutcome) {
    let callback = {
        let mut guard = lock(shared);
        if guard.state != TaskState::Pending {
            return;
        }
        guard.state = if outcome.is_cancelled() {
            TaskState::Cancelled
        } else {
            TaskState::Completed
        };
        match guard.callback.take() {
            Some(callback) => callback,
            None => {
                guard.parked = Some(outcome);
                return;
            }
        }
    };
    callback(outcome);
}

/// 后台任务持有的投递凭据。正常情况下由 `deliver` 投递结果；
/// 若在投递前被丢弃（例如 runtime 关闭），则取消搜索并投递空的 Cancelled。
struct Settlement {
    search_id: u64,
    shared: Option<Arc<Mutex<TaskShared>>>,
    cancel: CancelToken,
    sink: Arc<dyn CompletionSink>,
}

impl Settlement {
    fn deliver(mut self, outcome: SearchOutcome) {
        if let Some(shared) = self.shared.take() {
            self.sink.post(Box::new(move || settle(&shared, outcome)));
        }
    }
}

impl Drop for Settlement {
    fn drop(&mut self) {
        let Some(shared) = self.shared.take() else {
            return;
        };
        tracing::warn!(
            search_id = self.search_id,
            "search dropped before completion, reporting it as cancelled"
        );
        self.cancel.cancel();
        self.sink.post(Box::new(move || {
            settle(&shared, SearchOutcome::Cancelled(SearchResults::default()))
        }));
    }
}

pub struct SearchTask {
    id: u64,
    started: Instant,
    cancel: CancelToken,
    shared: Arc<Mutex<TaskShared>>,
    sink: Arc<dyn CompletionSink>,
}

impl SearchTask {
    fn new(sink: Arc<dyn CompletionSink>) -> Self {
        Self {
            id: next_search_id(),
            started: Instant::now(),
            cancel: CancelToken::new(),
            shared: Arc::new(Mutex::new(TaskShared {
                state: TaskState::Pending,
                parked: None,
                callback: None,
            })),
            sink,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> TaskState {
        lock(&self.shared).state
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// 请求取消。任务结束后调用无效。
    pub fn cancel(&self) {
        if self.state() != TaskState::Pending {
            return;
        }
        if !self.cancel.is_cancelled() {
            tracing::debug!(search_id = self.id, "search cancel requested");
        }
        self.cancel.cancel();
    }

    /// 注册完成回调。回调总在 sink 的上下文中执行，不会内联调用，每个任务最多一次。
    /// 任务未结束时重复注册，以最后一次为准。
    pub fn on_complete(&self, callback: impl FnOnce(SearchOutcome) + Send + 'static) {
        let mut guard = lock(&self.shared);
        if let Some(outcome) = guard.parked.take() {
            drop(guard);
            self.sink.post(Box::new(move || callback(outcome)));
            return;
        }
        if guard.state != TaskState::Pending {
            tracing::debug!(search_id = self.id, "outcome already delivered, callback ignored");
            return;
        }
        if guard.callback.replace(Box::new(callback)).is_some() {
            tracing::debug!(search_id = self.id, "completion callback replaced");
        }
    }
}

pub struct SearchService {
    runtime: tokio::runtime::Handle,
    settings: Settings,
    orchestrator: Orchestrator,
    sink: Arc<dyn CompletionSink>,
}

impl SearchService {
    pub fn new(
        runtime: tokio::runtime::Handle,
        settings: Settings,
        sink: Arc<dyn CompletionSink>,
    ) -> Self {
        let orchestrator = Orchestrator::new(settings.engine.clone());
        Self {
            runtime,
            settings,
            orchestrator,
            sink,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn start(&self, request: SearchRequest) -> Result<SearchTask, SearchError> {
        self.spawn(request, None)
    }

    /// 同 [`start`](Self::start)，引擎每打开一个新文件就向 sink 投递一次
    /// `on_file_started(count)`。
    pub fn start_with_progress(
        &self,
        request: SearchRequest,
        on_file_started: impl Fn(usize) + Send + Sync + 'static,
    ) -> Result<SearchTask, SearchError> {
        self.spawn(request, Some(Arc::new(on_file_started)))
    }

    fn spawn(
        &self,
        request: SearchRequest,
        progress: Option<SharedProgress>,
    ) -> Result<SearchTask, SearchError> {
        request.validate(self.settings.min_term_len)?;

        let task = SearchTask::new(self.sink.clone());
        let search_id = task.id();

        let mut builder = TreeBuilder::new();
        if let Some(progress) = progress {
            let sink = self.sink.clone();
            builder = builder.with_progress(move |count| {
                let progress = progress.clone();
                sink.post(Box::new(move || progress(count)));
            });
        }

        let orchestrator = self.orchestrator.clone();
        let cancel = task.cancel_token();
        let settlement = Settlement {
            search_id,
            shared: Some(task.shared.clone()),
            cancel: cancel.clone(),
            sink: self.sink.clone(),
        };

        tracing::debug!(search_id, term = %request.term, "search started");
        self.runtime.spawn(async move {
            let result =
                tokio::task::spawn_blocking(move || orchestrator.run(&request, &cancel, builder))
                    .await;

            let outcome = match result {
                Ok(Ok(run)) => run.into_outcome(),
                Ok(Err(e)) => SearchOutcome::Failed(e),
                Err(e) => {
                    tracing::error!(search_id, error = %e, "search task failed");
                    SearchOutcome::Failed(SearchError::Io(io::Error::new(
                        io::ErrorKind::Other,
                        format!("search task failed: {}", e),
                    )))
                }
            };

            settlement.deliver(outcome);
        });

        Ok(task)
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/search/task.rs"]
mod tests;
