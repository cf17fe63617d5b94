use super::*;
use crate::kernel::services::bus::{main_queue, MainQueue};
use crate::kernel::services::ports::{EngineSettings, SearchResults};
use std::sync::atomic::AtomicUsize;

const TIMEOUT: Duration = Duration::from_secs(10);

fn create_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap()
}

fn service_with(rt: &tokio::runtime::Runtime, engine: EngineSettings) -> (SearchService, MainQueue) {
    let (tx, queue) = main_queue();
    let settings = Settings {
        engine,
        min_term_len: 1,
        ..Settings::default()
    };
    (SearchService::new(rt.handle().clone(), settings, Arc::new(tx)), queue)
}

fn missing_engine() -> EngineSettings {
    EngineSettings {
        program: "zsearch-definitely-missing-engine".to_string(),
        ..EngineSettings::default()
    }
}

type Delivered = Arc<Mutex<Vec<SearchOutcome>>>;

fn collect(task: &SearchTask) -> Delivered {
    let delivered: Delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = delivered.clone();
    task.on_complete(move |outcome| sink.lock().unwrap().push(outcome));
    delivered
}

#[test]
fn validation_failure_creates_no_task() {
    let rt = create_runtime();
    let (tx, _queue) = main_queue();
    let service = SearchService::new(rt.handle().clone(), Settings::default(), Arc::new(tx));

    let err = service.start(SearchRequest::new("ab")).err().expect("too short");
    assert!(matches!(err, SearchError::Validation(_)));
}

#[test]
fn startup_failure_is_delivered_once_on_the_queue() {
    let rt = create_runtime();
    let (service, mut queue) = service_with(&rt, missing_engine());

    let task = service.start(SearchRequest::new("needle")).unwrap();
    let delivered = collect(&task);

    assert!(queue.run_until(TIMEOUT, || !delivered.lock().unwrap().is_empty()));
    assert_eq!(task.state(), TaskState::Completed);

    task.cancel();
    task.cancel();
    queue.run_for(Duration::from_millis(50));

    let delivered = delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    assert!(matches!(
        delivered[0],
        SearchOutcome::Failed(SearchError::Startup { .. })
    ));
}

#[test]
fn late_callback_is_posted_not_inlined() {
    let rt = create_runtime();
    let (service, mut queue) = service_with(&rt, missing_engine());
    let task = service.start(SearchRequest::new("needle")).unwrap();

    assert!(queue.run_until(TIMEOUT, || task.state() != TaskState::Pending));

    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    task.on_complete(move |_| {
        h.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    queue.run_pending();
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // nothing left for a second callback
    let h = hits.clone();
    task.on_complete(move |_| {
        h.fetch_add(1, Ordering::SeqCst);
    });
    queue.run_for(Duration::from_millis(50));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn settle_ignores_second_outcome() {
    let (tx, mut queue) = main_queue();
    let task = SearchTask::new(Arc::new(tx));
    let delivered = collect(&task);

    settle(&task.shared, SearchOutcome::Cancelled(SearchResults::default()));
    settle(&task.shared, SearchOutcome::Completed(SearchResults::default()));
    queue.run_pending();

    assert_eq!(task.state(), TaskState::Cancelled);
    let delivered = delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].is_cancelled());
}

#[test]
fn ids_are_unique() {
    let (tx, _queue) = main_queue();
    let sink: Arc<dyn CompletionSink> = Arc::new(tx);
    let a = SearchTask::new(sink.clone());
    let b = SearchTask::new(sink);
    assert_ne!(a.id(), b.id());
}

#[cfg(unix)]
fn sh_engine(dir: &std::path::Path, body: &str) -> EngineSettings {
    let script = dir.join("engine.sh");
    std::fs::write(&script, body).unwrap();
    EngineSettings {
        program: "sh".to_string(),
        json: script.display().to_string(),
        ..EngineSettings::default()
    }
}

#[cfg(unix)]
const TWO_FILES: &str = r#"cat <<'EOF'
{"type":"begin","data":{"path":{"text":"f1"}}}
{"type":"match","data":{"path":{"text":"f1"},"lines":{"text":"x\n"},"line_number":3,"submatches":[]}}
{"type":"match","data":{"path":{"text":"f1"},"lines":{"text":"y\n"},"line_number":7,"submatches":[]}}
{"type":"end","data":{"path":{"text":"f1"}}}
{"type":"begin","data":{"path":{"text":"f2"}}}
{"type":"end","data":{"path":{"text":"f2"}}}
{"type":"summary","data":{"stats":{"searches":2,"searches_with_match":1}}}
EOF
"#;

#[cfg(unix)]
#[test]
fn progress_precedes_completion_on_the_queue_thread() {
    #[derive(Debug, PartialEq)]
    enum Note {
        Progress(usize),
        Done(usize),
    }

    let rt = create_runtime();
    let dir = tempfile::tempdir().unwrap();
    let (service, mut queue) = service_with(&rt, sh_engine(dir.path(), TWO_FILES));
    let notes = Arc::new(Mutex::new(Vec::new()));
    let caller = std::thread::current().id();

    let progress_notes = notes.clone();
    let task = service
        .start_with_progress(SearchRequest::new("x"), move |count| {
            assert_eq!(std::thread::current().id(), caller);
            progress_notes.lock().unwrap().push(Note::Progress(count));
        })
        .unwrap();

    let done_notes = notes.clone();
    task.on_complete(move |outcome| {
        assert_eq!(std::thread::current().id(), caller);
        let files = outcome.results().map(|r| r.files.len()).unwrap_or(0);
        done_notes.lock().unwrap().push(Note::Done(files));
    });

    assert!(queue.run_until(TIMEOUT, || task.state() != TaskState::Pending));
    assert_eq!(task.state(), TaskState::Completed);
    assert_eq!(
        *notes.lock().unwrap(),
        vec![Note::Progress(1), Note::Progress(2), Note::Done(2)]
    );
}

#[cfg(unix)]
#[test]
fn cancel_mid_stream_delivers_partial_results_once() {
    let rt = create_runtime();
    let dir = tempfile::tempdir().unwrap();
    let body = r#"echo '{"type":"begin","data":{"path":{"text":"f1"}}}'
echo '{"type":"match","data":{"path":{"text":"f1"},"lines":{"text":"x"},"line_number":1,"submatches":[]}}'
sleep 1
echo '{"type":"end","data":{"path":{"text":"f1"}}}'
echo '{"type":"summary","data":{"stats":{}}}'
"#;
    let (service, mut queue) = service_with(&rt, sh_engine(dir.path(), body));

    let task = service.start(SearchRequest::new("x")).unwrap();
    let delivered = collect(&task);
    task.cancel();
    task.cancel();
    assert!(task.is_cancel_requested());

    assert!(queue.run_until(TIMEOUT, || !delivered.lock().unwrap().is_empty()));
    task.cancel();
    queue.run_for(Duration::from_millis(50));

    assert_eq!(task.state(), TaskState::Cancelled);
    let delivered = delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    let SearchOutcome::Cancelled(results) = &delivered[0] else {
        panic!("expected cancelled outcome, got {:?}", delivered[0]);
    };
    assert!(results.files.len() <= 1);
    assert!(results.match_count() <= 1);
}

#[test]
fn last_registered_callback_wins() {
    let (tx, mut queue) = main_queue();
    let task = SearchTask::new(Arc::new(tx));
    let first = collect(&task);
    let second = collect(&task);

    settle(&task.shared, SearchOutcome::Completed(SearchResults::default()));
    queue.run_pending();

    assert!(first.lock().unwrap().is_empty());
    assert_eq!(second.lock().unwrap().len(), 1);
}

#[cfg(unix)]
#[test]
fn runtime_shutdown_mid_search_still_settles_once() {
    let rt = create_runtime();
    let dir = tempfile::tempdir().unwrap();
    let (service, mut queue) = service_with(&rt, sh_engine(dir.path(), "exec sleep 2\n"));

    let task = service.start(SearchRequest::new("x")).unwrap();
    let delivered = collect(&task);
    rt.shutdown_timeout(Duration::from_millis(50));

    assert!(queue.run_until(Duration::from_secs(4), || !delivered
        .lock()
        .unwrap()
        .is_empty()));
    assert_eq!(task.state(), TaskState::Cancelled);
    assert!(task.is_cancel_requested());

    queue.run_for(Duration::from_millis(50));
    let delivered = delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    let SearchOutcome::Cancelled(results) = &delivered[0] else {
        panic!("expected cancelled outcome, got {:?}", delivered[0]);
    };
    assert!(results.files.is_empty());
}
