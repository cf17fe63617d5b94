//! 进程编排
//!
//! 启动外部搜索引擎，逐行读取 stdout 并交给 TreeBuilder。
//! - 每读一行检查一次取消标记；取消时 kill 子进程并返回已收集的部分结果
//! - 读到 summary 立即停止读取（某些平台上管道永远不会 EOF）
//! - stderr 在独立线程中读取，只记录日志，不影响结果

use super::events::classify;
use super::query::QueryCompiler;
use super::tree::{Flow, TreeBuilder};
use crate::kernel::services::ports::{
    EngineSettings, SearchError, SearchOutcome, SearchRequest, SearchResults,
};
use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, ChildStderr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const STDERR_MAX_LINES: usize = 200;
const STDERR_LOG_WINDOW: Duration = Duration::from_secs(1);
const STDERR_LOG_PER_WINDOW: usize = 20;
const SUMMARY_EXIT_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// 共享的原始标记，供信号处理等直接写入。
    pub fn flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpEnd {
    Eof,
    Summary,
    Cancelled,
}

#[derive(Debug)]
pub struct SearchRun {
    pub results: SearchResults,
    pub end: PumpEnd,
}

impl SearchRun {
    pub fn cancelled(&self) -> bool {
        self.end == PumpEnd::Cancelled
    }

    pub fn into_outcome(self) -> SearchOutcome {
        if self.cancelled() {
            SearchOutcome::Cancelled(self.results)
        } else {
            SearchOutcome::Completed(self.results)
        }
    }
}

/// 逐行读取引擎输出交给 `builder`，直到 EOF、summary 或取消。
/// 取消标记在处理每一行之前检查。
pub fn pump<R: BufRead>(
    mut reader: R,
    builder: &mut TreeBuilder,
    cancel: &CancelToken,
) -> io::Result<PumpEnd> {
    let mut buf = Vec::with_capacity(1024);
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(PumpEnd::Eof);
        }

        if cancel.is_cancelled() {
            return Ok(PumpEnd::Cancelled);
        }

        let line = String::from_utf8_lossy(&buf);
        if builder.apply(classify(&line)) == Flow::Finished {
            return Ok(PumpEnd::Summary);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    compiler: QueryCompiler,
}

impl Orchestrator {
    pub fn new(engine: EngineSettings) -> Self {
        Self {
            compiler: QueryCompiler::new(engine),
        }
    }

    /// 在当前线程上完整执行一次搜索。
    ///
    /// 只有启动失败才返回错误；取消、非零退出码、stderr 输出都照常返回已构建的结果树。
    pub fn run(
        &self,
        request: &SearchRequest,
        cancel: &CancelToken,
        mut builder: TreeBuilder,
    ) -> Result<SearchRun, SearchError> {
        let started = Instant::now();
        let query = self.compiler.compile(request);
        let working_dir = request
            .working_dir
            .clone()
            .or_else(|| std::env::current_dir().ok());

        if cancel.is_cancelled() {
            tracing::debug!("search cancelled before the engine started");
            return Ok(SearchRun {
                results: SearchResults {
                    elapsed: started.elapsed(),
                    ..SearchResults::default()
                },
                end: PumpEnd::Cancelled,
            });
        }

        tracing::info!(
            command = %query.command_line(),
            dir = ?working_dir,
            "starting search engine"
        );

        let mut child = query
            .to_command(working_dir.as_deref())
            .spawn()
            .map_err(|source| {
                tracing::error!(program = %query.program, error = %source, "spawn search engine failed");
                SearchError::Startup {
                    program: query.program.clone(),
                    source,
                }
            })?;

        let Some(stdout) = child.stdout.take() else {
            tracing::error!("search engine stdout unavailable");
            let _ = child.kill();
            reap(&mut child, true);
            return Err(SearchError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "search engine stdout unavailable",
            )));
        };

        let stderr = child.stderr.take().and_then(spawn_stderr_reader);

        let end = match pump(BufReader::new(stdout), &mut builder, cancel) {
            Ok(end) => end,
            Err(e) => {
                tracing::warn!(error = %e, "reading search engine output failed");
                PumpEnd::Eof
            }
        };
        // 终端 Ctrl-C 会同时杀掉引擎：先读到 EOF，但结果仍然只是部分的
        let end = if end == PumpEnd::Eof && cancel.is_cancelled() {
            tracing::debug!("engine output ended after cancel was requested");
            PumpEnd::Cancelled
        } else {
            end
        };

        let killed = match end {
            PumpEnd::Cancelled => {
                tracing::info!(files = builder.file_count(), "search cancelled, killing engine");
                let _ = child.kill();
                true
            }
            PumpEnd::Summary => stop_lingering(&mut child),
            PumpEnd::Eof => false,
        };

        let diagnostics = stderr
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        let exit_code = reap(&mut child, killed);

        let (files, summary) = builder.finish();
        let results = SearchResults {
            files,
            summary,
            diagnostics,
            exit_code,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            files = results.files.len(),
            matches = results.match_count(),
            elapsed_ms = results.elapsed.as_millis() as u64,
            end = ?end,
            "search finished"
        );

        Ok(SearchRun { results, end })
    }
}

/// summary 之后引擎应当马上退出；超过宽限期仍在运行的直接 kill。
/// 返回是否执行了 kill。
fn stop_lingering(child: &mut Child) -> bool {
    let deadline = Instant::now() + SUMMARY_EXIT_GRACE;
    while Instant::now() < deadline {
        match child.try_wait() {
            Ok(Some(_)) => return false,
            Ok(None) => std::thread::sleep(Duration::from_millis(10)),
            Err(e) => {
                tracing::warn!(error = %e, "search engine status unavailable");
                break;
            }
        }
    }
    tracing::debug!("search engine still running after summary, killing it");
    let _ = child.kill();
    true
}

/// 回收子进程并返回退出码。退出码 1 表示“没有匹配”，不算错误。
/// `killed` 为 true 时子进程已被我们 kill，被信号终止属于预期。
fn reap(child: &mut Child, killed: bool) -> Option<i32> {
    match child.wait() {
        Ok(status) => {
            let code = status.code();
            match code {
                Some(0) | Some(1) => {}
                None if killed => {}
                None => tracing::warn!(status = ?status, "search engine terminated by a signal"),
                Some(_) => tracing::warn!(status = ?status, "search engine exited with an error"),
            }
            code
        }
        Err(e) => {
            tracing::warn!(error = %e, "search engine wait failed");
            None
        }
    }
}

fn spawn_stderr_reader(stderr: ChildStderr) -> Option<JoinHandle<Vec<String>>> {
    match std::thread::Builder::new()
        .name("zsearch-stderr".to_string())
        .spawn(move || stderr_loop(stderr))
    {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "spawn engine stderr thread failed");
            None
        }
    }
}

/// 收集引擎的诊断输出。日志按时间窗口限流。
pub(super) fn stderr_loop<R: Read>(stderr: R) -> Vec<String> {
    let mut reader = BufReader::new(stderr);
    let mut collected = Vec::new();
    let mut buf = Vec::new();
    let mut window_started = Instant::now();
    let mut emitted = 0usize;
    let mut dropped = 0usize;
    loop {
        if window_started.elapsed() >= STDERR_LOG_WINDOW {
            if dropped > 0 {
                tracing::warn!(dropped, "engine stderr rate-limited");
            }
            window_started = Instant::now();
            emitted = 0;
            dropped = 0;
        }

        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let trimmed = line.trim_end();
                if trimmed.is_empty() {
                    continue;
                }

                if emitted < STDERR_LOG_PER_WINDOW {
                    tracing::warn!("engine: {}", trimmed);
                    emitted += 1;
                } else {
                    dropped += 1;
                }
                if collected.len() < STDERR_MAX_LINES {
                    collected.push(trimmed.to_string());
                }
            }
            Err(_) => break,
        }
    }

    if dropped > 0 {
        tracing::warn!(dropped, "engine stderr rate-limited");
    }
    collected
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/search/process.rs"]
mod tests;
