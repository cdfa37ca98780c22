//! Behavioural tests driving the pool through its lifecycle with scripted
//! sessions.

use std::thread;
use std::time::Duration;

use crossbeam_channel::unbounded;
use rstest::rstest;

use crate::errors::{EvalError, StartupError};
use crate::pool::{KernelPool, PoolConfig};
use crate::session::EvalOptions;

use super::support::{EvalBehaviour, ScriptedFactory, SessionEvent, SessionScript};

const PROBE_WAIT: Duration = Duration::from_millis(100);
const SETTLE_WAIT: Duration = Duration::from_secs(2);

#[rstest]
fn invalid_config_fails_before_any_session_is_created() {
    let factory = ScriptedFactory::new(SessionScript::default());
    let error = KernelPool::new(&factory, PoolConfig::new(0)).expect_err("size zero is invalid");
    assert_eq!(
        error,
        crate::errors::ConfigError::InvalidPoolSize { requested: 0 }
    );
    assert_eq!(factory.created(), 0);
}

#[rstest]
fn start_fails_when_every_kernel_fails() {
    let factory = ScriptedFactory::new(SessionScript {
        fail_start: true,
        ..SessionScript::default()
    });
    let mut pool = KernelPool::new(&factory, PoolConfig::new(3)).expect("valid config");

    let error = pool.start().expect_err("no kernel can start");
    assert_eq!(error, StartupError::NoKernelStarted);
    assert_eq!(pool.status().sessions, 0, "failed sessions leave the set");

    // Failed starts are cleaned up best-effort before being dropped.
    let events = factory.events();
    for id in 0..3 {
        assert!(events.contains(&SessionEvent::Started(id)));
        assert!(events.contains(&SessionEvent::Terminated(id)));
    }
}

#[rstest]
fn evaluations_round_trip_through_a_worker() {
    let factory = ScriptedFactory::new(SessionScript::default());
    let mut pool = KernelPool::new(&factory, PoolConfig::new(1)).expect("valid config");
    pool.start().expect("kernel starts");

    let result = pool
        .evaluate("1+1", EvalOptions::default())
        .expect("echo session returns the source");
    assert_eq!(result, "1+1");

    let report = pool
        .evaluate_wrapped("2+2", EvalOptions::default())
        .expect("wrapped evaluation succeeds");
    assert!(report.success);
    assert_eq!(report.result, "2+2");

    assert_eq!(pool.status().evaluations, 2);
    pool.terminate().expect("clean shutdown");
}

#[rstest]
fn domain_failures_resolve_only_the_issuing_caller() {
    let factory = ScriptedFactory::new(SessionScript {
        eval: EvalBehaviour::Fail("deliberate failure".to_owned()),
        ..SessionScript::default()
    });
    let mut pool = KernelPool::new(&factory, PoolConfig::new(1)).expect("valid config");
    pool.start().expect("kernel starts");

    let error = pool
        .evaluate("Sqrt[-1]", EvalOptions::default())
        .expect_err("scripted failure propagates");
    match error {
        EvalError::Session(session) => assert_eq!(session.message(), "deliberate failure"),
        other => panic!("expected a session error, got {other:?}"),
    }

    // The loop keeps serving after an ordinary execution failure.
    let second = pool.evaluate("Sqrt[-4]", EvalOptions::default());
    assert!(matches!(second, Err(EvalError::Session(_))));

    pool.terminate().expect("clean shutdown");
}

#[rstest]
fn bounded_queue_blocks_the_overflowing_caller() {
    let (entered_sender, entered) = unbounded();
    let (release_sender, release) = unbounded();
    let factory = ScriptedFactory::new(SessionScript {
        eval: EvalBehaviour::Block {
            entered: entered_sender,
            release,
        },
        ..SessionScript::default()
    });
    let mut pool =
        KernelPool::new(&factory, PoolConfig::new(1).with_load_factor(1)).expect("valid config");
    pool.start().expect("kernel starts");

    // First task occupies the worker; second fills the one-slot queue.
    let first = pool
        .submit(
            crate::session::EvalRequest::Evaluate {
                source: "first".to_owned(),
            },
            EvalOptions::default(),
        )
        .expect("first submission");
    entered
        .recv_timeout(SETTLE_WAIT)
        .expect("worker picked up the first task");
    let second = pool
        .submit(
            crate::session::EvalRequest::Evaluate {
                source: "second".to_owned(),
            },
            EvalOptions::default(),
        )
        .expect("second submission fills the queue");

    // Third submission must block until the queue drains.
    let (queued_sender, queued) = unbounded();
    let third = {
        let pool = &pool;
        thread::scope(|scope| {
            let handle = scope.spawn(move || {
                let submitted = pool.submit(
                    crate::session::EvalRequest::Evaluate {
                        source: "third".to_owned(),
                    },
                    EvalOptions::default(),
                );
                let _ = queued_sender.send(());
                submitted
            });

            assert!(
                queued.recv_timeout(PROBE_WAIT).is_err(),
                "third submission should block while the queue is full"
            );

            // Releasing the gate drains the queue and unblocks the caller.
            drop(release_sender);
            queued
                .recv_timeout(SETTLE_WAIT)
                .expect("third submission unblocked");
            handle.join().expect("submitter thread")
        })
    };

    for handle in [Some(first), Some(second), third.ok()].into_iter().flatten() {
        handle.wait().expect("all tasks complete");
    }
    pool.terminate().expect("clean shutdown");
}

#[rstest]
fn a_panicking_session_fails_its_caller_but_not_the_pool() {
    let factory = ScriptedFactory::new(SessionScript {
        eval: EvalBehaviour::Panic,
        ..SessionScript::default()
    });
    let mut pool = KernelPool::new(&factory, PoolConfig::new(1)).expect("valid config");
    pool.start().expect("kernel starts");

    let error = pool
        .evaluate("BlowUp[]", EvalOptions::default())
        .expect_err("fault surfaces to the caller");
    assert!(matches!(error, EvalError::Abandoned));

    // The session is terminated even though its loop died.
    pool.terminate().expect("shutdown despite the dead loop");
    assert!(factory.events().contains(&SessionEvent::Terminated(0)));
}

#[rstest]
fn terminate_reaches_every_surviving_session_and_surfaces_the_first_error() {
    let factory = ScriptedFactory::new(SessionScript {
        fail_terminate: Some("socket already closed".to_owned()),
        ..SessionScript::default()
    });
    let mut pool = KernelPool::new(&factory, PoolConfig::new(2)).expect("valid config");
    pool.start().expect("kernels start");

    let error = pool
        .terminate()
        .expect_err("termination errors surface after all attempts");
    assert_eq!(error.message(), "socket already closed");

    let events = factory.events();
    assert!(events.contains(&SessionEvent::Terminated(0)));
    assert!(events.contains(&SessionEvent::Terminated(1)));
}

#[rstest]
fn submissions_after_terminate_are_rejected() {
    let factory = ScriptedFactory::new(SessionScript::default());
    let mut pool = KernelPool::new(&factory, PoolConfig::new(1)).expect("valid config");
    pool.start().expect("kernel starts");
    pool.terminate().expect("clean shutdown");

    let error = pool
        .evaluate("1+1", EvalOptions::default())
        .expect_err("terminated pool refuses work");
    assert!(matches!(error, EvalError::PoolClosed));
}
