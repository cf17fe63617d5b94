use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn jobs_run_in_post_order_on_the_draining_thread() {
    let (tx, mut queue) = main_queue();
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let caller = std::thread::current().id();

    let worker = {
        let order = order.clone();
        std::thread::spawn(move || {
            for i in 0..5 {
                let order = order.clone();
                tx.post(Box::new(move || {
                    assert_eq!(std::thread::current().id(), caller);
                    order.lock().unwrap().push(i);
                }));
            }
        })
    };
    worker.join().unwrap();

    assert_eq!(queue.run_pending(), 5);
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn run_for_reports_disconnect() {
    let (tx, mut queue) = main_queue();
    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    tx.post(Box::new(move || {
        h.fetch_add(1, Ordering::SeqCst);
    }));
    drop(tx);

    assert!(queue.run_for(Duration::from_millis(10)));
    assert!(!queue.run_for(Duration::from_millis(10)));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn run_until_times_out_without_work() {
    let (_tx, mut queue) = main_queue();
    assert!(!queue.run_until(Duration::from_millis(30), || false));
}
