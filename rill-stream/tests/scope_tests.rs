// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rill_stream::{BatchCursor, ExitCase, Flow};
use rill_task::Task;
use rill_test_utils::{dummy, is_dummy, run_err, run_ok, Recorder};

fn label(exit: &ExitCase) -> &'static str {
    match exit {
        ExitCase::Completed => "completed",
        ExitCase::EarlyStop => "early-stop",
        ExitCase::Error(_) => "error",
    }
}

/// A bracket around `inner` that records how it was released.
fn recorded(inner: Flow<u32>, log: &Recorder<&'static str>) -> Flow<u32> {
    let log = log.clone();
    Flow::bracket(
        Task::now(0u8),
        move |_| inner.clone(),
        move |_, exit| {
            let log = log.clone();
            Task::eval(move || log.push(label(&exit)))
        },
    )
}

#[test]
fn full_consumption_releases_with_completed() {
    let log = Recorder::new();
    let flow = recorded(Flow::of([1, 2, 3]), &log);

    assert_eq!(run_ok(&flow.to_vec_task()), vec![1, 2, 3]);
    assert_eq!(log.items(), vec!["completed"]);
}

#[test]
fn take_releases_with_early_stop_exactly_once() {
    // Arrange
    let log = Recorder::new();
    let flow = recorded(Flow::of([1, 2, 3]), &log).take(1);

    // Act
    let emitted = run_ok(&flow.to_vec_task());

    // Assert
    assert_eq!(emitted, vec![1]);
    assert_eq!(log.items(), vec!["early-stop"]);
}

#[test]
fn head_option_releases_with_early_stop() {
    let log = Recorder::new();
    let flow = recorded(Flow::of([1, 2, 3]), &log);

    assert_eq!(run_ok(&flow.head_option_task()), Some(1));
    assert_eq!(log.items(), vec!["early-stop"]);
}

#[test]
fn stream_error_releases_with_error() {
    let log = Recorder::new();
    let failing = Flow::next(1, Task::now(Flow::raise(dummy())));
    let flow = recorded(failing, &log);

    assert!(is_dummy(&run_err(&flow.to_vec_task())));
    assert_eq!(log.items(), vec!["error"]);
}

#[test]
fn broken_cursor_inside_a_scope_releases_with_error() {
    // A cursor whose iteration panics mid-stream must tear the scope down
    // with the error exit case.
    let log = Recorder::new();
    let broken = BatchCursor::from_iter((0u32..).map(|i| {
        if i == 2 {
            panic!("broken cursor")
        } else {
            i
        }
    }));
    let flow = recorded(
        Flow::next_cursor(broken, Task::now(Flow::empty())),
        &log,
    );

    let error = run_err(&flow.to_vec_task());
    assert!(error.to_string().contains("broken cursor"), "{error}");
    assert_eq!(log.items(), vec!["error"]);
}

#[test]
fn panicking_use_releases_with_error() {
    let log = Recorder::new();
    let recorder = log.clone();
    let flow: Flow<u32> = Flow::bracket(
        Task::now(0u8),
        |_| -> Flow<u32> { panic!("use blew up") },
        move |_, exit| {
            let recorder = recorder.clone();
            let tag = label(&exit);
            Task::eval(move || recorder.push(tag))
        },
    );

    let error = run_err(&flow.to_vec_task());
    assert!(error.to_string().contains("use blew up"), "{error}");
    assert_eq!(log.items(), vec!["error"]);
}

#[test]
fn failed_acquire_never_releases() {
    let log: Recorder<&'static str> = Recorder::new();
    let recorder = log.clone();
    let flow: Flow<u32> = Flow::bracket(
        Task::raise_error(dummy()),
        |_: &u8| Flow::of([1]),
        move |_, exit| {
            let recorder = recorder.clone();
            let tag = label(&exit);
            Task::eval(move || recorder.push(tag))
        },
    );

    assert!(is_dummy(&run_err(&flow.to_vec_task())));
    assert!(log.is_empty());
}

#[test]
fn acquire_and_release_balance_on_every_path() {
    // Property: acquires == releases after any of the three terminations.
    for mode in ["complete", "take", "error"] {
        let acquired = Arc::new(AtomicUsize::new(0));
        let released = Arc::new(AtomicUsize::new(0));
        let up = acquired.clone();
        let down = released.clone();

        let inner = match mode {
            "error" => Flow::next(1, Task::now(Flow::raise(dummy()))),
            _ => Flow::of([1, 2, 3]),
        };
        let flow = Flow::bracket(
            Task::eval(move || {
                up.fetch_add(1, Ordering::SeqCst);
                0u8
            }),
            move |_| inner.clone(),
            move |_, _| {
                let down = down.clone();
                Task::eval(move || {
                    down.fetch_add(1, Ordering::SeqCst);
                })
            },
        );
        let flow = if mode == "take" { flow.take(1) } else { flow };

        let _ = rill_test_utils::run_sync(&flow.to_vec_task());

        assert_eq!(
            acquired.load(Ordering::SeqCst),
            released.load(Ordering::SeqCst),
            "unbalanced in mode {mode}"
        );
        assert_eq!(acquired.load(Ordering::SeqCst), 1, "mode {mode}");
    }
}

#[test]
fn nested_scopes_release_inner_first() {
    let order = Recorder::new();
    let inner_log = order.clone();
    let outer_log = order.clone();

    let inner = Flow::bracket(
        Task::now(0u8),
        |_| Flow::of([1u32, 2]),
        move |_, _| {
            let log = inner_log.clone();
            Task::eval(move || log.push("inner"))
        },
    );
    let outer = Flow::bracket(
        Task::now(0u8),
        move |_| inner.clone(),
        move |_, _| {
            let log = outer_log.clone();
            Task::eval(move || log.push("outer"))
        },
    );

    assert_eq!(run_ok(&outer.to_vec_task()), vec![1, 2]);
    assert_eq!(order.items(), vec!["inner", "outer"]);
}

#[test]
fn inner_release_failure_still_runs_outer_release() {
    // Arrange - the inner release raises; the outer must still run and the
    // consumer must see the inner failure.
    let outer_ran = Recorder::new();
    let witness = outer_ran.clone();

    let inner = Flow::bracket(
        Task::now(0u8),
        |_| Flow::of([1u32]),
        |_, _| Task::eval_try(|| Err(dummy())),
    );
    let outer = Flow::bracket(
        Task::now(0u8),
        move |_| inner.clone(),
        move |_, _| {
            let witness = witness.clone();
            Task::eval(move || witness.push(true))
        },
    );

    // Act
    let error = run_err(&outer.to_vec_task());

    // Assert
    assert!(is_dummy(&error));
    assert_eq!(outer_ran.items(), vec![true]);
}

#[test]
fn transformations_preserve_the_scope_pairing() {
    // A map over a bracketed stream must not detach acquire from release.
    let log = Recorder::new();
    let flow = recorded(Flow::of([1, 2, 3]), &log).map(|x| x * 2);

    assert_eq!(run_ok(&flow.to_vec_task()), vec![2, 4, 6]);
    assert_eq!(log.items(), vec!["completed"]);
}
