use crate::kernel::services::ports::{ResultNode, SearchEvent, Stats};

pub type ProgressFn = Box<dyn FnMut(usize) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// A summary was seen; nothing after it belongs to this search.
    Finished,
}

/// Folds search events into file nodes with one child per matched line.
///
/// The builder keeps a cursor on the file opened by the last `Begin`.
/// `Match`/`End` without an open file are dropped, and so is a `Match`
/// without a line number.
#[derive(Default)]
pub struct TreeBuilder {
    files: Vec<ResultNode>,
    current: Option<usize>,
    summary: Option<Stats>,
    on_file_started: Option<ProgressFn>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, on_file_started: impl FnMut(usize) + Send + 'static) -> Self {
        self.on_file_started = Some(Box::new(on_file_started));
        self
    }

    pub fn apply(&mut self, event: SearchEvent) -> Flow {
        match event {
            SearchEvent::Begin { path } => {
                self.files.push(ResultNode::file(path));
                self.current = Some(self.files.len() - 1);
                let count = self.files.len();
                if let Some(notify) = self.on_file_started.as_mut() {
                    notify(count);
                }
            }
            SearchEvent::Match {
                line_number,
                line_text,
                ..
            } => match (self.current.and_then(|idx| self.files.get_mut(idx)), line_number) {
                (Some(file), Some(line)) => {
                    file.children.push(ResultNode::line(line, line_text.trim()))
                }
                (Some(_), None) => tracing::debug!("match without a line number, dropped"),
                (None, _) => tracing::debug!("match without an open file, dropped"),
            },
            SearchEvent::End { .. } => {
                if self.current.take().is_none() {
                    tracing::debug!("end without an open file, dropped");
                }
            }
            SearchEvent::Summary { stats, .. } => {
                self.summary = Some(stats);
                self.current = None;
                return Flow::Finished;
            }
            SearchEvent::Context => {}
        }
        Flow::Continue
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn summary(&self) -> Option<&Stats> {
        self.summary.as_ref()
    }

    pub fn finish(self) -> (Vec<ResultNode>, Option<Stats>) {
        (self.files, self.summary)
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/search/tree.rs"]
mod tests;
