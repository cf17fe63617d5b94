use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug)]
pub enum SearchError {
    /// The request was rejected before any process was started.
    Validation(String),
    /// The engine process could not be launched.
    Startup { program: String, source: io::Error },
    Io(io::Error),
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchError::Validation(msg) => write!(f, "Invalid search: {}", msg),
            SearchError::Startup { program, source } => {
                write!(f, "Failed to start search engine '{}': {}", program, source)
            }
            SearchError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for SearchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SearchError::Validation(_) => None,
            SearchError::Startup { source, .. } => Some(source),
            SearchError::Io(e) => Some(e),
        }
    }
}

impl From<io::Error> for SearchError {
    fn from(e: io::Error) -> Self {
        SearchError::Io(e)
    }
}

/// One search against the external engine.
///
/// Built once and treated as immutable: the `with_*` methods consume and
/// return the request so it can be assembled in a single expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub term: String,
    pub working_dir: Option<PathBuf>,
    pub literal: bool,
    pub ignore_case: bool,
    pub multiline: bool,
    pub include_globs: BTreeSet<String>,
    pub exclude_globs: BTreeSet<String>,
    pub search_roots: Vec<String>,
    pub extra_args: Vec<String>,
    pub concurrency: usize,
}

impl SearchRequest {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            working_dir: None,
            literal: false,
            ignore_case: false,
            multiline: false,
            include_globs: BTreeSet::new(),
            exclude_globs: BTreeSet::new(),
            search_roots: Vec::new(),
            extra_args: Vec::new(),
            concurrency: 1,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_literal(mut self, literal: bool) -> Self {
        self.literal = literal;
        self
    }

    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn with_multiline(mut self, multiline: bool) -> Self {
        self.multiline = multiline;
        self
    }

    pub fn with_include<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_globs.extend(exts.into_iter().map(Into::into));
        self
    }

    pub fn with_exclude<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_globs.extend(exts.into_iter().map(Into::into));
        self
    }

    /// Appends a root folder; duplicates are skipped so each root yields one
    /// scoped glob.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        let root = root.into();
        if !self.search_roots.contains(&root) {
            self.search_roots.push(root);
        }
        self
    }

    pub fn with_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Whitespace separated pattern clauses, in the order they were typed.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.term.split_whitespace()
    }

    pub fn validate(&self, min_term_len: usize) -> Result<()> {
        let meaningful = self.term.trim().chars().count();
        let required = min_term_len.max(1);
        if meaningful < required {
            return Err(SearchError::Validation(format!(
                "at least {} characters are required for a search",
                required
            )));
        }
        if self.concurrency == 0 {
            return Err(SearchError::Validation(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Elapsed {
    #[serde(default)]
    pub secs: u64,
    #[serde(default)]
    pub nanos: u32,
}

impl Elapsed {
    pub fn as_duration(&self) -> Duration {
        Duration::new(self.secs, self.nanos)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub elapsed: Elapsed,
    pub searches: u64,
    pub searches_with_match: u64,
    pub bytes_searched: u64,
    pub bytes_printed: u64,
    pub matched_lines: u64,
    pub matches: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submatch {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// A decoded line of engine output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
    Begin {
        path: String,
    },
    Match {
        path: String,
        line_number: Option<u64>,
        line_text: String,
        submatches: Vec<Submatch>,
    },
    End {
        path: String,
    },
    Summary {
        stats: Stats,
        elapsed_total: Option<Elapsed>,
    },
    /// Context lines and anything unrecognised.
    Context,
}

/// Node of the file → match tree.
///
/// Root nodes are files and carry no line number; their children are the
/// matched lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultNode {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ResultNode>,
}

impl ResultNode {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            text: path.into(),
            line_number: None,
            children: Vec::new(),
        }
    }

    pub fn line(line_number: u64, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            line_number: Some(line_number),
            children: Vec::new(),
        }
    }

    pub fn is_file(&self) -> bool {
        self.line_number.is_none()
    }
}

pub fn match_count(files: &[ResultNode]) -> usize {
    files.iter().map(|f| f.children.len()).sum()
}

#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub files: Vec<ResultNode>,
    pub summary: Option<Stats>,
    pub diagnostics: Vec<String>,
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

impl SearchResults {
    pub fn match_count(&self) -> usize {
        match_count(&self.files)
    }
}

/// Delivered exactly once per started search.
#[derive(Debug)]
pub enum SearchOutcome {
    Completed(SearchResults),
    /// Partial results gathered before the cancel was observed.
    Cancelled(SearchResults),
    Failed(SearchError),
}

impl SearchOutcome {
    pub fn results(&self) -> Option<&SearchResults> {
        match self {
            SearchOutcome::Completed(r) | SearchOutcome::Cancelled(r) => Some(r),
            SearchOutcome::Failed(_) => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SearchOutcome::Cancelled(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Cancelled,
    Completed,
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/ports/search.rs"]
mod tests;
