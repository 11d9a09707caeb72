//! Behavioural tests for the emitter façade and the cross-thread bridge

use crate::{EmitterConfig, EmitterError, Emitter, EventLoop, Listener, ListenerError};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

type Calls = Rc<RefCell<Vec<String>>>;

fn tagged(calls: &Calls, tag: &'static str) -> Listener<i32> {
    let calls = Rc::clone(calls);
    Listener::from_fn(move |payload: &i32| calls.borrow_mut().push(format!("{tag}({payload})")))
}

fn counter() -> (Listener<i32>, Rc<Cell<usize>>) {
    let hits = Rc::new(Cell::new(0));
    let seen = Rc::clone(&hits);
    (Listener::from_fn(move |_| seen.set(seen.get() + 1)), hits)
}

#[test]
fn test_on_then_off_leaves_no_listeners() {
    let emitter = Emitter::new();
    let (listener, _) = counter();

    emitter.on("e", listener.clone()).unwrap();
    assert_eq!(emitter.listener_count("e"), 1);

    assert_eq!(emitter.off("e", &listener).unwrap(), 1);
    assert_eq!(emitter.listener_count("e"), 0);
}

#[test]
fn test_once_fires_exactly_once() {
    let emitter = Emitter::new();
    let (listener, hits) = counter();

    emitter.once("e", listener).unwrap();
    emitter.emit("e", &1).unwrap();
    emitter.emit("e", &2).unwrap();

    assert_eq!(hits.get(), 1);
    assert_eq!(emitter.listener_count("e"), 0);
}

#[test]
fn test_duplicate_registration_fires_twice_in_order() {
    let emitter = Emitter::new();
    let calls: Calls = Rc::default();
    let l = tagged(&calls, "L");

    emitter.on("e", l.clone()).unwrap();
    emitter.on("e", tagged(&calls, "M")).unwrap();
    emitter.on("e", l).unwrap();
    emitter.emit("e", &5).unwrap();

    assert_eq!(*calls.borrow(), vec!["L(5)", "M(5)", "L(5)"]);
}

#[test]
fn test_self_removal_during_emission() {
    let emitter = Rc::new(Emitter::new());
    let hits = Rc::new(Cell::new(0));
    let own_handle: Rc<RefCell<Option<Listener<i32>>>> = Rc::default();

    let listener = {
        let emitter = Rc::downgrade(&emitter);
        let own_handle = Rc::clone(&own_handle);
        let hits = Rc::clone(&hits);
        Listener::from_fn(move |_| {
            hits.set(hits.get() + 1);
            let me = own_handle.borrow().clone();
            if let (Some(emitter), Some(me)) = (emitter.upgrade(), me) {
                emitter.off("e", &me).unwrap();
            }
        })
    };
    *own_handle.borrow_mut() = Some(listener.clone());

    // Registered twice: the second copy is still in the snapshot but must be
    // skipped because the first invocation removed both.
    emitter.on("e", listener.clone()).unwrap();
    emitter.on("e", listener).unwrap();

    emitter.emit("e", &0).unwrap();
    assert_eq!(hits.get(), 1);

    emitter.emit("e", &0).unwrap();
    assert_eq!(hits.get(), 1);
    assert_eq!(emitter.listener_count("e"), 0);

    own_handle.borrow_mut().take();
}

#[test]
fn test_once_removed_earlier_in_emission_is_skipped() {
    let emitter = Rc::new(Emitter::new());
    let (one_shot, one_shot_hits) = counter();

    let remover = {
        let emitter = Rc::downgrade(&emitter);
        let target = one_shot.clone();
        Listener::from_fn(move |_: &i32| {
            if let Some(emitter) = emitter.upgrade() {
                emitter.off("e", &target).unwrap();
            }
        })
    };

    // Persistent listeners run first, so the one-shot is already gone from
    // the registry by the time its snapshot entry comes up.
    emitter.on("e", remover).unwrap();
    emitter.once("e", one_shot).unwrap();

    let report = emitter.emit("e", &0).unwrap();
    assert_eq!(one_shot_hits.get(), 0);
    assert_eq!(report.invoked, 1);
    assert_eq!(emitter.listener_count("e"), 1);

    emitter.emit("e", &0).unwrap();
    assert_eq!(one_shot_hits.get(), 0);
}

#[test]
fn test_persistent_removed_by_earlier_listener_is_skipped() {
    let emitter = Rc::new(Emitter::new());
    let calls: Calls = Rc::default();
    let victim = tagged(&calls, "V");

    let remover = {
        let emitter = Rc::downgrade(&emitter);
        let target = victim.clone();
        let calls = Rc::clone(&calls);
        Listener::from_fn(move |payload: &i32| {
            calls.borrow_mut().push(format!("R({payload})"));
            if let Some(emitter) = emitter.upgrade() {
                emitter.off("e", &target).unwrap();
            }
        })
    };

    emitter.on("e", remover).unwrap();
    emitter.on("e", victim).unwrap();
    emitter.on("e", tagged(&calls, "K")).unwrap();

    let report = emitter.emit("e", &1).unwrap();
    assert_eq!(*calls.borrow(), vec!["R(1)", "K(1)"]);
    assert_eq!(report.invoked, 2);
    assert_eq!(emitter.listener_count("e"), 2);
}

#[test]
fn test_on_and_once_scenario() {
    let emitter = Emitter::new();
    let calls: Calls = Rc::default();

    emitter.on("x", tagged(&calls, "L1")).unwrap();
    emitter.once("x", tagged(&calls, "L2")).unwrap();
    let report = emitter.emit("x", &42).unwrap();

    assert_eq!(*calls.borrow(), vec!["L1(42)", "L2(42)"]);
    assert_eq!(report.invoked, 2);
    assert_eq!(emitter.listener_count("x"), 1);
}

#[test]
fn test_remove_all_listeners_without_event_clears_everything() {
    let emitter = Emitter::new();
    for event in ["a", "b", "c"] {
        emitter.on(event, counter().0).unwrap();
        emitter.once(event, counter().0).unwrap();
    }

    assert_eq!(emitter.remove_all_listeners(None), 6);
    for event in ["a", "b", "c"] {
        assert_eq!(emitter.listener_count(event), 0);
    }
    assert!(emitter.event_names().is_empty());
}

#[test]
fn test_remove_all_listeners_for_one_event() {
    let emitter = Emitter::new();
    emitter.on("a", counter().0).unwrap();
    emitter.once("a", counter().0).unwrap();
    emitter.on("b", counter().0).unwrap();

    assert_eq!(emitter.remove_all_listeners(Some("a")), 2);
    assert_eq!(emitter.listener_count("a"), 0);
    assert_eq!(emitter.listener_count("b"), 1);
}

#[test]
fn test_listener_added_during_emission_waits_for_next_one() {
    let emitter = Rc::new(Emitter::new());
    let (late, late_hits) = counter();

    let adder = {
        let emitter = Rc::downgrade(&emitter);
        Listener::from_fn(move |_: &i32| {
            if let Some(emitter) = emitter.upgrade() {
                emitter.once("e", late.clone()).unwrap();
            }
        })
    };
    emitter.once("e", adder).unwrap();

    emitter.emit("e", &0).unwrap();
    assert_eq!(late_hits.get(), 0);
    // The one-shot added mid-emission survived the eviction of the one that fired.
    assert_eq!(emitter.listener_count("e"), 1);

    emitter.emit("e", &0).unwrap();
    assert_eq!(late_hits.get(), 1);
    assert_eq!(emitter.listener_count("e"), 0);
}

#[test]
fn test_reentrant_emit_does_not_refire_once() {
    let emitter = Rc::new(Emitter::new());
    let hits = Rc::new(Cell::new(0));

    let listener = {
        let emitter = Rc::downgrade(&emitter);
        let hits = Rc::clone(&hits);
        Listener::from_fn(move |depth: &i32| {
            hits.set(hits.get() + 1);
            if *depth < 3 {
                if let Some(emitter) = emitter.upgrade() {
                    emitter.emit("e", &(depth + 1)).unwrap();
                }
            }
        })
    };
    emitter.once("e", listener).unwrap();
    emitter.emit("e", &0).unwrap();

    assert_eq!(hits.get(), 1);
}

#[test]
fn test_failing_listener_reported_not_propagated() {
    let emitter = Emitter::new();
    let (after, hits) = counter();

    emitter
        .on("e", Listener::new(|_: &i32| Err(ListenerError::failed("nope"))))
        .unwrap();
    emitter.on("e", after).unwrap();

    let report = emitter.emit("e", &0).unwrap();
    assert_eq!(hits.get(), 1);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].to_string().contains("nope"));

    let stats = emitter.stats();
    assert_eq!(stats.listener_failures, 1);
    assert_eq!(stats.listeners_invoked, 2);
}

#[test]
fn test_empty_event_name_is_invalid_argument() {
    let emitter: Emitter<i32> = Emitter::new();
    let (listener, hits) = counter();

    assert!(matches!(emitter.on("", listener.clone()), Err(EmitterError::InvalidArgument(_))));
    assert!(matches!(emitter.once("", listener.clone()), Err(EmitterError::InvalidArgument(_))));
    assert!(matches!(emitter.off("", &listener), Err(EmitterError::InvalidArgument(_))));
    assert!(matches!(emitter.emit("", &0), Err(EmitterError::InvalidArgument(_))));
    assert!(matches!(emitter.emit_async("", || 0), Err(EmitterError::InvalidArgument(_))));
    assert_eq!(hits.get(), 0);
    assert_eq!(emitter.stats().total_listeners, 0);
}

#[test]
fn test_off_unknown_is_noop() {
    let emitter = Emitter::new();
    let (listener, _) = counter();
    emitter.on("e", counter().0).unwrap();

    assert_eq!(emitter.off("e", &listener).unwrap(), 0);
    assert_eq!(emitter.off("other", &listener).unwrap(), 0);
    assert_eq!(emitter.listener_count("e"), 1);
}

#[test]
fn test_aliases_match_on_and_off() {
    let emitter = Emitter::new();
    let (listener, hits) = counter();

    emitter.add_listener("e", listener.clone()).unwrap();
    emitter.emit("e", &0).unwrap();
    emitter.remove_listener("e", &listener).unwrap();
    emitter.emit("e", &0).unwrap();

    assert_eq!(hits.get(), 1);
}

#[test]
fn test_emit_async_from_owner_waits_for_drain() {
    let emitter = Emitter::new();
    let (listener, hits) = counter();
    emitter.on("e", listener).unwrap();

    emitter.emit_async("e", || 1).unwrap();
    assert_eq!(hits.get(), 0);

    assert_eq!(emitter.drain_pending(), 1);
    assert_eq!(hits.get(), 1);
    assert_eq!(emitter.stats().async_delivered, 1);
}

#[test]
fn test_drain_respects_batch_limit() {
    let config = EmitterConfig {
        max_drain_per_wake: 2,
        ..EmitterConfig::default()
    };
    let emitter = Emitter::with_config(config);
    let (listener, hits) = counter();
    emitter.on("e", listener).unwrap();

    for i in 0..5 {
        emitter.emit_async("e", move || i).unwrap();
    }

    assert_eq!(emitter.drain_pending(), 2);
    assert_eq!(emitter.drain_pending(), 2);
    assert_eq!(emitter.drain_pending(), 1);
    assert_eq!(emitter.drain_pending(), 0);
    assert_eq!(hits.get(), 5);
}

#[test]
fn test_drain_leaves_resubmitted_jobs_for_next_wake() {
    let emitter = Emitter::new();
    let again = emitter.handle();
    let (_, hits) = counter();
    let seen = Rc::clone(&hits);
    emitter
        .on(
            "tick",
            Listener::from_fn(move |n: &i32| {
                seen.set(seen.get() + 1);
                let next = *n + 1;
                again.emit_async("tick", move || next).unwrap();
            }),
        )
        .unwrap();

    emitter.emit_async("tick", || 0).unwrap();
    assert_eq!(emitter.drain_pending(), 1);
    assert_eq!(emitter.pending(), 1);
    assert_eq!(emitter.drain_pending(), 1);
    assert_eq!(hits.get(), 2);
}

#[test]
fn test_panicking_producer_does_not_break_drain() {
    let emitter = Emitter::new();
    let (listener, hits) = counter();
    emitter.on("e", listener).unwrap();

    emitter.emit_async("e", || panic!("producer failed")).unwrap();
    emitter.emit_async("e", || 2).unwrap();

    assert_eq!(emitter.drain_pending(), 2);
    assert_eq!(hits.get(), 1);
}

#[test]
fn test_close_drops_undrained_and_rejects_new() {
    let emitter = Emitter::new();
    let (listener, hits) = counter();
    emitter.on("y", listener).unwrap();
    let handle = emitter.handle();

    handle.emit_async("y", || 1).unwrap();
    assert_eq!(emitter.close(), 1);

    assert!(matches!(
        handle.emit_async("y", || 2),
        Err(EmitterError::BridgeClosed(event)) if event == "y"
    ));
    assert_eq!(emitter.drain_pending(), 0);
    assert_eq!(hits.get(), 0);

    let stats = emitter.stats();
    assert_eq!(stats.async_dropped, 1);
    assert_eq!(stats.async_rejected, 1);
}

#[test]
fn test_submit_after_loop_teardown_is_bridge_closed() {
    let (tx, rx) = mpsc::channel::<i32>();
    let event_loop = EventLoop::spawn::<i32, _>(EmitterConfig::default(), move |emitter| {
        emitter
            .on("y", Listener::from_fn(move |v: &i32| tx.send(*v).unwrap()))
            .unwrap();
    })
    .unwrap();

    let handle = event_loop.handle();
    event_loop.shutdown().unwrap();

    let worker = thread::spawn(move || handle.emit_async("y", || 9));
    assert!(matches!(
        worker.join().unwrap(),
        Err(EmitterError::BridgeClosed(_))
    ));
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}

#[test]
fn test_concurrent_submissions_delivered_in_submission_order() {
    const WORKERS: usize = 8;
    const PER_WORKER: usize = 50;

    let (tx, rx) = mpsc::channel::<(u64, usize)>();
    let event_loop = EventLoop::spawn::<(u64, usize), _>(EmitterConfig::default(), move |emitter| {
        emitter
            .on("mark", Listener::from_fn(move |mark: &(u64, usize)| tx.send(*mark).unwrap()))
            .unwrap();
    })
    .unwrap();

    // Taking the ticket and submitting under one lock makes the ticket the
    // submission order.
    let ticket = Arc::new(Mutex::new(0u64));
    let workers: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let handle = event_loop.handle();
            let ticket = Arc::clone(&ticket);
            thread::spawn(move || {
                for _ in 0..PER_WORKER {
                    let mut next = ticket.lock().unwrap();
                    let seq = *next;
                    *next += 1;
                    handle.emit_async("mark", move || (seq, worker)).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let delivered: Vec<u64> = (0..WORKERS * PER_WORKER)
        .map(|_| rx.recv_timeout(TIMEOUT).unwrap().0)
        .collect();
    let expected: Vec<u64> = (0..(WORKERS * PER_WORKER) as u64).collect();
    assert_eq!(delivered, expected);

    let stats = event_loop.shutdown().unwrap();
    assert_eq!(stats.async_delivered, (WORKERS * PER_WORKER) as u64);
}

#[test]
fn test_producer_and_listener_run_on_owning_thread() {
    let (tx, rx) = mpsc::channel::<(thread::ThreadId, thread::ThreadId)>();
    let event_loop = EventLoop::spawn::<thread::ThreadId, _>(EmitterConfig::default(), move |emitter| {
        emitter
            .on(
                "where",
                Listener::from_fn(move |producer_thread: &thread::ThreadId| {
                    tx.send((*producer_thread, thread::current().id())).unwrap()
                }),
            )
            .unwrap();
    })
    .unwrap();

    let handle = event_loop.handle();
    let worker_id = thread::spawn(move || {
        handle.emit_async("where", || thread::current().id()).unwrap();
        thread::current().id()
    })
    .join()
    .unwrap();

    let (producer_thread, listener_thread) = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(producer_thread, event_loop.thread_id());
    assert_eq!(listener_thread, event_loop.thread_id());
    assert_ne!(producer_thread, worker_id);

    event_loop.shutdown().unwrap();
}

#[tokio::test]
async fn test_owner_woken_by_worker_submission() {
    let emitter = Emitter::new();
    let (listener, hits) = counter();
    emitter.on("tick", listener).unwrap();

    let handle = emitter.handle();
    thread::spawn(move || handle.emit_async("tick", || 1).unwrap())
        .join()
        .unwrap();

    tokio::time::timeout(TIMEOUT, emitter.notified())
        .await
        .expect("no wake-up from worker submission");
    emitter.drain_pending();
    assert_eq!(hits.get(), 1);
}
