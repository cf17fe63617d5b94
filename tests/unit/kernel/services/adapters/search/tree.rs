use super::*;
use std::sync::{Arc, Mutex};

fn begin(path: &str) -> SearchEvent {
    SearchEvent::Begin {
        path: path.to_string(),
    }
}

fn matched(path: &str, line: u64, text: &str) -> SearchEvent {
    SearchEvent::Match {
        path: path.to_string(),
        line_number: Some(line),
        line_text: text.to_string(),
        submatches: Vec::new(),
    }
}

fn end(path: &str) -> SearchEvent {
    SearchEvent::End {
        path: path.to_string(),
    }
}

fn summary() -> SearchEvent {
    SearchEvent::Summary {
        stats: Stats::default(),
        elapsed_total: None,
    }
}

#[test]
fn builds_two_level_tree_in_order() {
    let mut builder = TreeBuilder::new();
    let events = vec![
        begin("f1"),
        matched("f1", 3, "x"),
        matched("f1", 7, "y"),
        end("f1"),
        begin("f2"),
        end("f2"),
    ];
    for event in events {
        assert_eq!(builder.apply(event), Flow::Continue);
    }
    assert_eq!(builder.apply(summary()), Flow::Finished);

    let (files, stats) = builder.finish();
    assert!(stats.is_some());
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].text, "f1");
    assert!(files[0].is_file());
    assert_eq!(
        files[0].children,
        vec![ResultNode::line(3, "x"), ResultNode::line(7, "y")]
    );
    assert_eq!(files[1].text, "f2");
    assert!(files[1].children.is_empty());
}

#[test]
fn match_text_is_trimmed() {
    let mut builder = TreeBuilder::new();
    builder.apply(begin("f"));
    builder.apply(matched("f", 1, "\t  value = 1;\r\n"));
    let (files, _) = builder.finish();
    assert_eq!(files[0].children[0].text, "value = 1;");
}

#[test]
fn orphan_match_and_end_are_dropped() {
    let mut builder = TreeBuilder::new();
    builder.apply(matched("ghost", 1, "x"));
    builder.apply(end("ghost"));
    builder.apply(begin("f1"));
    builder.apply(matched("f1", 2, "y"));
    builder.apply(end("f1"));
    builder.apply(matched("f1", 9, "late"));
    builder.apply(end("f1"));

    let (files, _) = builder.finish();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].children, vec![ResultNode::line(2, "y")]);
}

#[test]
fn context_events_are_ignored() {
    let mut builder = TreeBuilder::new();
    builder.apply(begin("f"));
    assert_eq!(builder.apply(SearchEvent::Context), Flow::Continue);
    builder.apply(matched("f", 4, "z"));
    let (files, _) = builder.finish();
    assert_eq!(files[0].children.len(), 1);
}

#[test]
fn progress_reports_running_file_count() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let mut builder = TreeBuilder::new().with_progress(move |count| sink.lock().unwrap().push(count));

    for path in ["a", "b", "c"] {
        builder.apply(begin(path));
        builder.apply(end(path));
    }

    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    assert_eq!(builder.file_count(), 3);
}

#[test]
fn summary_closes_the_open_file() {
    let mut builder = TreeBuilder::new();
    builder.apply(begin("f"));
    assert_eq!(builder.apply(summary()), Flow::Finished);
    assert!(builder.summary().is_some());
    builder.apply(matched("f", 1, "after"));
    let (files, _) = builder.finish();
    assert!(files[0].children.is_empty());
}

#[test]
fn match_without_line_number_is_dropped() {
    let mut builder = TreeBuilder::new();
    builder.apply(begin("f1"));
    builder.apply(SearchEvent::Match {
        path: "f1".to_string(),
        line_number: None,
        line_text: "no line".to_string(),
        submatches: Vec::new(),
    });
    builder.apply(matched("f1", 4, "kept"));
    builder.apply(end("f1"));

    let (files, _) = builder.finish();
    assert_eq!(files[0].children, vec![ResultNode::line(4, "kept")]);
    assert!(files[0].children.iter().all(|c| !c.is_file()));
}
