//! Scripted test doubles for the pool behaviour tests.
//!
//! `ScriptedFactory` hands out `ScriptedSession`s whose lifecycle calls are
//! recorded into a shared event log, so tests can assert which sessions
//! were started, evaluated against, and terminated.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender};

use crate::errors::SessionError;
use crate::session::{EvalOptions, EvalReport, KernelSession, SessionFactory, SessionOptions};

/// Recorded lifecycle events, tagged by session id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionEvent {
    Started(usize),
    Terminated(usize),
    Evaluated(usize, String),
}

/// What a scripted session does when asked to evaluate.
#[derive(Debug, Clone, Default)]
pub(crate) enum EvalBehaviour {
    /// Return the source unchanged.
    #[default]
    Echo,
    /// Fail with the given domain error message.
    Fail(String),
    /// Unwind, simulating an unrecoverable fault in the loop.
    Panic,
    /// Announce on `entered`, then wait for `release` before echoing.
    Block {
        entered: Sender<()>,
        release: Receiver<()>,
    },
}

/// Per-session behaviour script.
#[derive(Debug, Clone, Default)]
pub(crate) struct SessionScript {
    pub(crate) fail_start: bool,
    pub(crate) fail_terminate: Option<String>,
    pub(crate) eval: EvalBehaviour,
}

pub(crate) struct ScriptedSession {
    id: usize,
    script: SessionScript,
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl ScriptedSession {
    fn record(&self, event: SessionEvent) {
        self.events.lock().expect("event log lock").push(event);
    }

    fn run(&mut self, source: &str) -> Result<String, SessionError> {
        self.record(SessionEvent::Evaluated(self.id, source.to_owned()));
        match &self.script.eval {
            EvalBehaviour::Echo => Ok(source.to_owned()),
            EvalBehaviour::Fail(message) => Err(SessionError::new(message.clone())),
            EvalBehaviour::Panic => panic!("scripted session fault"),
            EvalBehaviour::Block { entered, release } => {
                let _ = entered.send(());
                // A closed release channel releases every pending call.
                let _ = release.recv();
                Ok(source.to_owned())
            }
        }
    }
}

impl KernelSession for ScriptedSession {
    fn start(&mut self) -> Result<(), SessionError> {
        self.record(SessionEvent::Started(self.id));
        if self.script.fail_start {
            Err(SessionError::new("deliberate start failure"))
        } else {
            Ok(())
        }
    }

    fn terminate(&mut self) -> Result<(), SessionError> {
        self.record(SessionEvent::Terminated(self.id));
        match &self.script.fail_terminate {
            Some(message) => Err(SessionError::new(message.clone())),
            None => Ok(()),
        }
    }

    fn evaluate(&mut self, source: &str, _options: &EvalOptions) -> Result<String, SessionError> {
        self.run(source)
    }

    fn evaluate_wire(
        &mut self,
        source: &str,
        _options: &EvalOptions,
    ) -> Result<Vec<u8>, SessionError> {
        self.run(source).map(String::into_bytes)
    }

    fn evaluate_wrapped(
        &mut self,
        source: &str,
        _options: &EvalOptions,
    ) -> Result<EvalReport, SessionError> {
        self.run(source).map(|result| EvalReport {
            result,
            messages: Vec::new(),
            success: true,
        })
    }
}

/// Factory producing scripted sessions in creation order.
pub(crate) struct ScriptedFactory {
    scripts: Mutex<VecDeque<SessionScript>>,
    default_script: SessionScript,
    events: Arc<Mutex<Vec<SessionEvent>>>,
    created: AtomicUsize,
}

impl ScriptedFactory {
    /// Every created session runs `default_script` unless a queued script
    /// overrides it.
    pub(crate) fn new(default_script: SessionScript) -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            default_script,
            events: Arc::new(Mutex::new(Vec::new())),
            created: AtomicUsize::new(0),
        }
    }

    pub(crate) fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().expect("event log lock").clone()
    }

    pub(crate) fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl SessionFactory for ScriptedFactory {
    fn create(&self, _options: &SessionOptions) -> Box<dyn KernelSession> {
        let id = self.created.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .lock()
            .expect("script queue lock")
            .pop_front()
            .unwrap_or_else(|| self.default_script.clone());
        Box::new(ScriptedSession {
            id,
            script,
            events: Arc::clone(&self.events),
        })
    }
}
