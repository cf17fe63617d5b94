//! Decoding of the engine's JSON-lines output.
//!
//! Each line is decoded in two steps: only the `type` tag first, then the
//! full payload for the tags the tree builder cares about. Lines that fail
//! either step become [`SearchEvent::Context`] and are skipped.

use crate::kernel::services::ports::{Elapsed, SearchEvent, Stats, Submatch};
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Deserialize)]
struct Tag<'a> {
    #[serde(rename = "type", borrow)]
    kind: &'a str,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Engine text fields are either UTF-8 `{"text": ..}` or base64 `{"bytes": ..}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Data {
    Text { text: String },
    Bytes { bytes: String },
}

impl Data {
    fn into_string(self) -> String {
        match self {
            Data::Text { text } => text,
            Data::Bytes { bytes } => match base64::engine::general_purpose::STANDARD.decode(&bytes) {
                Ok(raw) => String::from_utf8_lossy(&raw).into_owned(),
                Err(_) => bytes,
            },
        }
    }
}

fn text_or_empty(data: Option<Data>) -> String {
    data.map(Data::into_string).unwrap_or_default()
}

#[derive(Deserialize)]
struct PathData {
    path: Option<Data>,
}

#[derive(Deserialize)]
struct MatchData {
    path: Option<Data>,
    lines: Option<Data>,
    line_number: Option<u64>,
    #[serde(default)]
    submatches: Vec<SubmatchData>,
}

#[derive(Deserialize)]
struct SubmatchData {
    #[serde(rename = "match")]
    matched: Option<Data>,
    start: usize,
    end: usize,
}

#[derive(Deserialize)]
struct SummaryData {
    #[serde(default)]
    stats: Stats,
    elapsed_total: Option<Elapsed>,
}

fn payload<T: DeserializeOwned>(line: &str, kind: &str) -> Option<T> {
    match serde_json::from_str::<Envelope<T>>(line) {
        Ok(envelope) => Some(envelope.data),
        Err(e) => {
            tracing::trace!(kind, error = %e, "undecodable engine event");
            None
        }
    }
}

/// Classifies one line of engine output. Never fails.
pub fn classify(line: &str) -> SearchEvent {
    let line = line.trim_end_matches(['\r', '\n']);
    let Ok(tag) = serde_json::from_str::<Tag<'_>>(line) else {
        return SearchEvent::Context;
    };

    let event = match tag.kind {
        "begin" => payload::<PathData>(line, tag.kind).map(|d| SearchEvent::Begin {
            path: text_or_empty(d.path),
        }),
        "match" => payload::<MatchData>(line, tag.kind).map(|d| SearchEvent::Match {
            path: text_or_empty(d.path),
            line_number: d.line_number,
            line_text: text_or_empty(d.lines),
            submatches: d
                .submatches
                .into_iter()
                .map(|s| Submatch {
                    text: text_or_empty(s.matched),
                    start: s.start,
                    end: s.end,
                })
                .collect(),
        }),
        "end" => payload::<PathData>(line, tag.kind).map(|d| SearchEvent::End {
            path: text_or_empty(d.path),
        }),
        "summary" => payload::<SummaryData>(line, tag.kind).map(|d| SearchEvent::Summary {
            stats: d.stats,
            elapsed_total: d.elapsed_total,
        }),
        _ => None,
    };

    event.unwrap_or(SearchEvent::Context)
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/search/events.rs"]
mod tests;
