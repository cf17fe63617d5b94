pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Hands work to the host's own execution context (a UI loop, a main
/// thread queue). Callbacks posted here run in FIFO order on that context.
pub trait CompletionSink: Send + Sync {
    fn post(&self, job: Job);
}
