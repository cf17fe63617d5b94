use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use clap::Parser;
use zsearch::kernel::services::adapters::{
    get_settings_path, load_settings_from, save_settings, AsyncRuntime, SearchService, SearchTask,
};
use zsearch::kernel::services::main_queue;
use zsearch::kernel::services::ports::{
    ResultNode, SavedSearch, SearchOptions, SearchOutcome, SearchResults, Settings,
};

mod cli;
mod logging;

use cli::CliArgs;

const EXIT_MATCHES: u8 = 0;
const EXIT_NO_MATCHES: u8 = 1;
const EXIT_FAILURE: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let logging = logging::init(args.verbose);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "zsearch failed");
            eprintln!("zsearch: {}", e);
            if let Some(guard) = &logging {
                eprintln!("zsearch: details in {}", guard.log_dir().display());
            }
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run(args: CliArgs) -> io::Result<ExitCode> {
    let settings_path = args.settings.clone().or_else(get_settings_path);
    let mut settings = settings_path
        .as_deref()
        .and_then(load_settings_from)
        .unwrap_or_default();
    args.apply_overrides(&mut settings);

    if args.list_saved {
        list_saved(&settings)?;
        return Ok(ExitCode::from(EXIT_MATCHES));
    }

    if let Some(name) = &args.forget {
        if !settings.remove_saved_search(name) {
            eprintln!("zsearch: no saved search named '{}'", name);
            return Ok(ExitCode::from(EXIT_FAILURE));
        }
        let path = settings_path.ok_or_else(no_settings_dir)?;
        save_settings(&path, &settings)?;
        tracing::info!(name = %name, path = %path.display(), "saved search removed");
        return Ok(ExitCode::from(EXIT_MATCHES));
    }

    let (term, options) = match &args.saved {
        Some(name) => {
            let Some(saved) = settings.find_saved(name) else {
                eprintln!("zsearch: no saved search named '{}'", name);
                return Ok(ExitCode::from(EXIT_FAILURE));
            };
            (
                args.term().unwrap_or_else(|| saved.term.clone()),
                args.options(&saved.options),
            )
        }
        None => {
            let Some(term) = args.term() else {
                eprintln!("zsearch: a search term is required");
                return Ok(ExitCode::from(EXIT_FAILURE));
            };
            (term, args.options(&settings.default_options))
        }
    };

    if let Some(name) = &args.save {
        persist_saved(&mut settings, settings_path, name, &term, &options)?;
    }

    let request = settings
        .request(term, args.dir.clone(), &options)
        .with_extra_args(args.extra_args.iter().cloned());

    let show_progress =
        args.progress || (settings.show_result_notifications && io::stderr().is_terminal());

    let runtime = AsyncRuntime::new()?;
    let (sender, mut queue) = main_queue();
    let service = SearchService::new(runtime.tokio_handle(), settings, Arc::new(sender));

    let started = if show_progress {
        service.start_with_progress(request, |count| {
            eprint!("\rfiles: {}", count);
        })
    } else {
        service.start(request)
    };
    let task = match started {
        Ok(task) => task,
        Err(e) => {
            eprintln!("zsearch: {}", e);
            return Ok(ExitCode::from(EXIT_FAILURE));
        }
    };

    install_interrupt(&task)?;

    let slot: Arc<Mutex<Option<SearchOutcome>>> = Arc::new(Mutex::new(None));
    let sink = slot.clone();
    task.on_complete(move |outcome| {
        *sink.lock().unwrap_or_else(PoisonError::into_inner) = Some(outcome);
    });

    let has_outcome = || slot.lock().unwrap_or_else(PoisonError::into_inner).is_some();
    while !queue.run_until(Duration::from_secs(1), has_outcome) {}

    if show_progress {
        eprintln!();
    }

    let outcome = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    drop(service);
    runtime.shutdown(SHUTDOWN_GRACE);

    match outcome {
        Some(SearchOutcome::Completed(results)) => {
            print_results(&results, args.json)?;
            eprintln!("{}", summary_line(&results, &task, false));
            Ok(exit_for(&results))
        }
        Some(SearchOutcome::Cancelled(results)) => {
            print_results(&results, args.json)?;
            eprintln!("{}", summary_line(&results, &task, true));
            Ok(ExitCode::from(EXIT_INTERRUPTED))
        }
        Some(SearchOutcome::Failed(e)) => {
            eprintln!("zsearch: {}", e);
            Ok(ExitCode::from(EXIT_FAILURE))
        }
        None => Ok(ExitCode::from(EXIT_FAILURE)),
    }
}

/// First Ctrl-C cancels the search and keeps partial results; a second one
/// exits immediately.
#[cfg(unix)]
fn install_interrupt(task: &SearchTask) -> io::Result<()> {
    use signal_hook::consts::signal::{SIGINT, SIGTERM};

    let flag = task.cancel_token().flag();
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register_conditional_shutdown(signal, EXIT_INTERRUPTED as i32, flag.clone())?;
        signal_hook::flag::register(signal, flag.clone())?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn install_interrupt(_task: &SearchTask) -> io::Result<()> {
    Ok(())
}

fn exit_for(results: &SearchResults) -> ExitCode {
    if results.files.is_empty() {
        ExitCode::from(EXIT_NO_MATCHES)
    } else {
        ExitCode::from(EXIT_MATCHES)
    }
}

fn list_saved(settings: &Settings) -> io::Result<()> {
    let mut out = io::stdout().lock();
    for saved in &settings.saved_searches {
        writeln!(out, "{}\t{}", saved.name, saved.term)?;
    }
    Ok(())
}

fn persist_saved(
    settings: &mut Settings,
    path: Option<PathBuf>,
    name: &str,
    term: &str,
    options: &SearchOptions,
) -> io::Result<()> {
    settings.add_saved_search(SavedSearch {
        name: name.to_string(),
        term: term.to_string(),
        options: options.clone(),
    });
    let path = path.ok_or_else(no_settings_dir)?;
    save_settings(&path, settings)?;
    tracing::info!(name, path = %path.display(), "saved search stored");
    Ok(())
}

fn no_settings_dir() -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        "cannot determine settings directory, pass --settings",
    )
}

fn print_results(results: &SearchResults, json: bool) -> io::Result<()> {
    let mut out = io::BufWriter::new(io::stdout().lock());
    if json {
        serde_json::to_writer_pretty(&mut out, &results.files).map_err(io::Error::other)?;
        writeln!(out)?;
    } else {
        for file in &results.files {
            print_node(&mut out, file)?;
        }
    }
    out.flush()
}

fn print_node(out: &mut impl Write, file: &ResultNode) -> io::Result<()> {
    writeln!(out, "{}", file.text)?;
    for child in &file.children {
        match child.line_number {
            Some(line) => writeln!(out, "  {:>6}: {}", line, child.text)?,
            None => writeln!(out, "  {}", child.text)?,
        }
    }
    Ok(())
}

fn summary_line(results: &SearchResults, task: &SearchTask, cancelled: bool) -> String {
    let mut line = format!(
        "{} matches in {} files ({:.1}s)",
        results.match_count(),
        results.files.len(),
        task.elapsed().as_secs_f64()
    );
    if cancelled {
        line.push_str(", search cancelled, only partial results returned");
    }
    for diagnostic in results.diagnostics.iter().take(3) {
        line.push_str("\n  engine: ");
        line.push_str(diagnostic);
    }
    line
}
