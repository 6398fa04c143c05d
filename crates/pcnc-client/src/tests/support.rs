//! Scripted in-memory controller for dispatcher tests.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use crate::transport::Transport;

const SPIN_LIMIT: Duration = Duration::from_secs(5);

/// Manually released barrier used to hold a read open.
#[derive(Clone, Default)]
pub(crate) struct Gate(Arc<(Mutex<bool>, Condvar)>);

impl Gate {
    pub(crate) fn open(&self) {
        let (released, signal) = &*self.0;
        *released.lock().expect("gate lock") = true;
        signal.notify_all();
    }

    fn wait(&self) {
        let (released, signal) = &*self.0;
        let mut open = released.lock().expect("gate lock");
        while !*open {
            open = signal.wait(open).expect("gate wait");
        }
    }
}

#[derive(Clone)]
enum Rule {
    Respond(String),
    FailRead,
    FailWrite,
    Hold { response: String, gate: Gate },
}

#[derive(Default)]
struct Log {
    writes: Vec<String>,
    reads: usize,
    closed: bool,
}

/// What the scripted controller observed.
#[derive(Clone, Default)]
pub(crate) struct Transcript(Arc<Mutex<Log>>);

impl Transcript {
    fn log(&self) -> MutexGuard<'_, Log> {
        self.0.lock().expect("transcript lock")
    }

    pub(crate) fn writes(&self) -> Vec<String> {
        self.log().writes.clone()
    }

    pub(crate) fn reads(&self) -> usize {
        self.log().reads
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.log().closed
    }

    /// Spins until `request` has been written.
    pub(crate) fn wait_for_write(&self, request: &str) {
        spin_until(|| self.writes().iter().any(|written| written == request));
    }
}

/// Builder for a [`ScriptedTransport`].
#[derive(Default)]
pub(crate) struct Script {
    rules: HashMap<String, Rule>,
}

impl Script {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(mut self, request: &str, response: &str) -> Self {
        self.rules
            .insert(request.to_owned(), Rule::Respond(response.to_owned()));
        self
    }

    pub(crate) fn fail_read(mut self, request: &str) -> Self {
        self.rules.insert(request.to_owned(), Rule::FailRead);
        self
    }

    pub(crate) fn fail_write(mut self, request: &str) -> Self {
        self.rules.insert(request.to_owned(), Rule::FailWrite);
        self
    }

    /// The read after `request` blocks until `gate` opens, then answers.
    pub(crate) fn hold(mut self, request: &str, response: &str, gate: &Gate) -> Self {
        self.rules.insert(
            request.to_owned(),
            Rule::Hold {
                response: response.to_owned(),
                gate: gate.clone(),
            },
        );
        self
    }

    pub(crate) fn build(self) -> (ScriptedTransport, Transcript) {
        let transcript = Transcript::default();
        let transport = ScriptedTransport {
            rules: self.rules,
            transcript: transcript.clone(),
            last: None,
        };
        (transport, transcript)
    }
}

/// Transport that answers from a script and records every call.
pub(crate) struct ScriptedTransport {
    rules: HashMap<String, Rule>,
    transcript: Transcript,
    last: Option<String>,
}

impl Transport for ScriptedTransport {
    fn write_request(&mut self, request: &[u8]) -> io::Result<()> {
        let text = String::from_utf8_lossy(request).trim_end().to_owned();
        self.transcript.log().writes.push(text.clone());
        let failing = matches!(self.rules.get(&text), Some(Rule::FailWrite));
        self.last = Some(text);
        if failing {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "scripted write failure"));
        }
        Ok(())
    }

    fn read_response(&mut self) -> io::Result<Vec<u8>> {
        self.transcript.log().reads += 1;
        let rule = self
            .last
            .as_ref()
            .and_then(|request| self.rules.get(request))
            .cloned();
        match rule {
            Some(Rule::Respond(response)) => Ok(response.into_bytes()),
            Some(Rule::Hold { response, gate }) => {
                gate.wait();
                Ok(response.into_bytes())
            }
            Some(Rule::FailRead) => Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "scripted read failure",
            )),
            Some(Rule::FailWrite) | None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "no scripted response",
            )),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        self.transcript.log().closed = true;
        Ok(())
    }
}

/// Polls `condition` until it holds, panicking after a generous limit.
pub(crate) fn spin_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + SPIN_LIMIT;
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(1));
    }
}
