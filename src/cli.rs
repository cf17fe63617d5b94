use std::path::PathBuf;

use clap::{ArgAction, Parser};
use zsearch::kernel::services::ports::{SearchOptions, Settings};

/// Command-line arguments accepted by the `zsearch` binary.
#[derive(Parser, Debug)]
#[command(
    name = "zsearch",
    version,
    about = "Recursive text search through an external engine, shown as a file/match tree"
)]
pub(crate) struct CliArgs {
    #[arg(
        value_name = "TERM",
        required_unless_present_any = ["saved", "list_saved", "forget"],
        help = "Search term; whitespace separates independent patterns"
    )]
    pub(crate) term: Vec<String>,
    #[arg(
        short = 'C',
        long = "dir",
        value_name = "PATH",
        help = "Directory to search in (default: current directory)"
    )]
    pub(crate) dir: Option<PathBuf>,
    #[arg(short, long = "ignore-case", help = "Case-insensitive search (default: smart case)")]
    pub(crate) ignore_case: bool,
    #[arg(short = 'F', long = "fixed-strings", help = "Treat patterns as literal strings")]
    pub(crate) literal: bool,
    #[arg(short = 'U', long, help = "Allow matches to span lines")]
    pub(crate) multiline: bool,
    #[arg(
        short = 't',
        long = "type",
        value_name = "EXT",
        action = ArgAction::Append,
        help = "Only search files with this extension (repeatable)"
    )]
    pub(crate) include: Vec<String>,
    #[arg(
        short = 'T',
        long = "type-not",
        value_name = "EXT",
        action = ArgAction::Append,
        help = "Skip files with this extension (repeatable)"
    )]
    pub(crate) exclude: Vec<String>,
    #[arg(
        long = "root",
        value_name = "FOLDER",
        action = ArgAction::Append,
        help = "Scope the search to this folder (repeatable)"
    )]
    pub(crate) roots: Vec<String>,
    #[arg(
        short = 'j',
        long = "threads",
        value_name = "N",
        help = "Engine worker threads (default: settings value)"
    )]
    pub(crate) threads: Option<usize>,
    #[arg(
        long,
        value_name = "PROGRAM",
        env = "ZSEARCH_ENGINE",
        help = "Search engine executable (default: rg)"
    )]
    pub(crate) engine: Option<String>,
    #[arg(
        long,
        value_name = "FILE",
        env = "ZSEARCH_SETTINGS",
        help = "Settings file (default: per-user settings.json)"
    )]
    pub(crate) settings: Option<PathBuf>,
    #[arg(long, value_name = "NAME", help = "Run a saved search")]
    pub(crate) saved: Option<String>,
    #[arg(long, value_name = "NAME", help = "Save this search under NAME before running it")]
    pub(crate) save: Option<String>,
    #[arg(long, value_name = "NAME", help = "Delete a saved search and exit")]
    pub(crate) forget: Option<String>,
    #[arg(long = "list-saved", help = "List saved searches and exit")]
    pub(crate) list_saved: bool,
    #[arg(
        long,
        help = "Report the number of files found while searching (default: on when stderr is a terminal)"
    )]
    pub(crate) progress: bool,
    #[arg(long, help = "Print the result tree as JSON")]
    pub(crate) json: bool,
    #[arg(short, long, help = "Echo log output to stderr")]
    pub(crate) verbose: bool,
    #[arg(
        last = true,
        value_name = "ENGINE_ARGS",
        help = "Extra arguments passed to the engine after all others"
    )]
    pub(crate) extra_args: Vec<String>,
}

impl CliArgs {
    pub(crate) fn term(&self) -> Option<String> {
        let term = self.term.join(" ");
        if term.trim().is_empty() {
            None
        } else {
            Some(term)
        }
    }

    /// Layers the command-line flags over `base`.
    pub(crate) fn options(&self, base: &SearchOptions) -> SearchOptions {
        let mut options = base.clone();
        options.ignore_case |= self.ignore_case;
        options.literal |= self.literal;
        options.multiline |= self.multiline;
        options.include_types.extend(self.include.iter().cloned());
        options.exclude_types.extend(self.exclude.iter().cloned());
        options.extra_roots.extend(self.roots.iter().cloned());
        options
    }

    pub(crate) fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(engine) = &self.engine {
            settings.engine.program = engine.clone();
        }
        if let Some(threads) = self.threads {
            settings.thread_count = threads.max(1);
        }
    }
}
