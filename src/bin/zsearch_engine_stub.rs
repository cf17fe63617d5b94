//! Stand-in search engine used by the integration tests.
//!
//! With `ZSEARCH_STUB_SCRIPT` set, replays that file to stdout line by line.
//! Directive lines drive the process instead of being printed:
//! `#sleep <ms>`, `#stderr <text>`, `#exit <code>`.
//!
//! Without a script it performs a naive literal search of the working
//! directory for every `-e` pattern and prints JSON events.
//!
//! `ZSEARCH_STUB_TRACE_PATH` receives the argv and working directory.

use serde_json::{json, Value};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    trace_invocation(&args);

    match std::env::var_os("ZSEARCH_STUB_SCRIPT").filter(|p| !p.is_empty()) {
        Some(script) => replay(Path::new(&script)),
        None => search(&args),
    }
}

fn trace_invocation(args: &[String]) {
    let Some(path) = std::env::var_os("ZSEARCH_STUB_TRACE_PATH").filter(|p| !p.is_empty()) else {
        return;
    };
    let cwd = std::env::current_dir()
        .map(|d| d.display().to_string())
        .unwrap_or_default();
    let trace = json!({ "args": args, "cwd": cwd });
    let _ = std::fs::write(path, trace.to_string());
}

fn replay(script: &Path) {
    let Ok(content) = std::fs::read_to_string(script) else {
        eprintln!("stub: cannot read script {}", script.display());
        std::process::exit(2);
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for line in content.lines() {
        if let Some(ms) = line.strip_prefix("#sleep ") {
            let _ = out.flush();
            std::thread::sleep(Duration::from_millis(ms.trim().parse().unwrap_or(0)));
        } else if let Some(text) = line.strip_prefix("#stderr ") {
            eprintln!("{}", text);
        } else if let Some(code) = line.strip_prefix("#exit ") {
            let _ = out.flush();
            std::process::exit(code.trim().parse().unwrap_or(0));
        } else if writeln!(out, "{}", line).is_err() {
            // Reader went away.
            return;
        }
    }
    let _ = out.flush();
}

fn search(args: &[String]) {
    let mut patterns = Vec::new();
    let mut ignore_case = false;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-e" => {
                if let Some(p) = iter.next() {
                    patterns.push(p.clone());
                }
            }
            "-i" => ignore_case = true,
            "-j" | "-g" => {
                iter.next();
            }
            _ => {}
        }
    }
    if ignore_case {
        patterns = patterns.iter().map(|p| p.to_lowercase()).collect();
    }

    let mut files = Vec::new();
    collect_files(Path::new("."), &mut files);
    files.sort();

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut searches_with_match = 0u64;
    let mut matched_lines = 0u64;

    for file in &files {
        let Ok(content) = std::fs::read_to_string(file) else {
            continue;
        };
        let path = file.strip_prefix(".").unwrap_or(file).display().to_string();
        let path = path.trim_start_matches(['/', '\\']).to_string();
        let mut opened = false;
        for (idx, line) in content.lines().enumerate() {
            let haystack = if ignore_case {
                line.to_lowercase()
            } else {
                line.to_string()
            };
            if !patterns.iter().any(|p| haystack.contains(p.as_str())) {
                continue;
            }
            if !opened {
                emit(&mut out, json!({"type": "begin", "data": {"path": {"text": path}}}));
                opened = true;
                searches_with_match += 1;
            }
            matched_lines += 1;
            emit(
                &mut out,
                json!({"type": "match", "data": {
                    "path": {"text": path},
                    "lines": {"text": format!("{}\n", line)},
                    "line_number": idx + 1,
                    "absolute_offset": 0,
                    "submatches": []
                }}),
            );
        }
        if opened {
            emit(&mut out, json!({"type": "end", "data": {"path": {"text": path}}}));
        }
    }

    emit(
        &mut out,
        json!({"type": "summary", "data": {
            "elapsed_total": {"secs": 0, "nanos": 1000, "human": "0.000001s"},
            "stats": {
                "searches": files.len(),
                "searches_with_match": searches_with_match,
                "matched_lines": matched_lines,
                "matches": matched_lines
            }
        }}),
    );
    let _ = out.flush();
    if searches_with_match == 0 {
        std::process::exit(1);
    }
}

fn emit(out: &mut impl Write, value: Value) {
    let _ = writeln!(out, "{}", value);
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        match entry.file_type() {
            Ok(ft) if ft.is_dir() => collect_files(&path, out),
            Ok(ft) if ft.is_file() => out.push(path),
            _ => {}
        }
    }
}
