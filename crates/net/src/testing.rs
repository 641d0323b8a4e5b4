//! Scripted transport, connector and clock for deterministic tests

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::rc::Rc;
use std::time::{Duration, Instant};

use proptest::prelude::*;
use serde_json::Value;

use crate::clock::Clock;
use crate::protocol::{Message, Status, FRAME_TERMINATOR};
use crate::transport::{Connector, Transport};

/// Clock that only moves when told to, or when slept on
#[derive(Debug, Clone)]
pub(crate) struct ManualClock {
    base: Instant,
    offset: Rc<Cell<Duration>>,
    sleeps: Rc<RefCell<Vec<Duration>>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
            sleeps: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Every duration passed to `sleep`, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }

    pub fn elapsed(&self) -> Duration {
        self.offset.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.advance(duration);
    }
}

/// One scripted outcome of a `read` call
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Data(Vec<u8>),
    /// Advances the clock by the current read timeout, then fails with `WouldBlock`
    Timeout,
    Eof,
    Fail(io::ErrorKind),
}

impl Step {
    /// A complete frame with the given body
    pub fn frame(body: &str) -> Self {
        let mut bytes = body.as_bytes().to_vec();
        bytes.extend_from_slice(FRAME_TERMINATOR);
        Step::Data(bytes)
    }
}

/// Everything the client wrote, across all connections
#[derive(Debug, Default)]
pub(crate) struct Wire {
    /// (clock offset at write time, bytes)
    pub written: Vec<(Duration, Vec<u8>)>,
    pub read_timeouts: Vec<Option<Duration>>,
}

impl Wire {
    pub fn messages(&self) -> Vec<Message> {
        self.written
            .iter()
            .map(|(_, bytes)| Message::from_bytes(bytes).unwrap())
            .collect()
    }

    pub fn ping_times(&self) -> Vec<Duration> {
        self.written
            .iter()
            .filter(|(_, bytes)| Message::from_bytes(bytes).unwrap().status == Status::Ping)
            .map(|(at, _)| *at)
            .collect()
    }
}

pub(crate) struct ScriptedStream {
    steps: VecDeque<Step>,
    clock: ManualClock,
    timeout: Option<Duration>,
    wire: Rc<RefCell<Wire>>,
}

impl ScriptedStream {
    pub fn new(steps: Vec<Step>, clock: ManualClock, wire: Rc<RefCell<Wire>>) -> Self {
        Self {
            steps: steps.into(),
            clock,
            timeout: None,
            wire,
        }
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.steps.pop_front() {
            Some(Step::Data(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    self.steps.push_front(Step::Data(data.split_off(n)));
                }
                Ok(n)
            }
            Some(Step::Timeout) => {
                self.clock.advance(self.timeout.unwrap_or(Duration::ZERO));
                Err(io::Error::new(io::ErrorKind::WouldBlock, "scripted timeout"))
            }
            Some(Step::Fail(kind)) => Err(io::Error::new(kind, "scripted failure")),
            Some(Step::Eof) | None => Ok(0),
        }
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.wire
            .borrow_mut()
            .written
            .push((self.clock.elapsed(), buf.to_vec()));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for ScriptedStream {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.timeout = timeout;
        self.wire.borrow_mut().read_timeouts.push(timeout);
        Ok(())
    }
}

/// Hands out one scripted connection per `connect`, or the scripted failure
pub(crate) struct ScriptedConnector {
    scripts: RefCell<VecDeque<Result<Vec<Step>, io::ErrorKind>>>,
    clock: ManualClock,
    wire: Rc<RefCell<Wire>>,
    connects: Rc<Cell<usize>>,
}

impl ScriptedConnector {
    pub fn new(clock: &ManualClock) -> Self {
        Self {
            scripts: RefCell::new(VecDeque::new()),
            clock: clock.clone(),
            wire: Rc::new(RefCell::new(Wire::default())),
            connects: Rc::new(Cell::new(0)),
        }
    }

    pub fn connection(self, steps: Vec<Step>) -> Self {
        self.scripts.borrow_mut().push_back(Ok(steps));
        self
    }

    pub fn refused(self) -> Self {
        self.scripts
            .borrow_mut()
            .push_back(Err(io::ErrorKind::ConnectionRefused));
        self
    }

    pub fn wire(&self) -> Rc<RefCell<Wire>> {
        self.wire.clone()
    }

    pub fn connects(&self) -> Rc<Cell<usize>> {
        self.connects.clone()
    }
}

impl Connector for ScriptedConnector {
    type Transport = ScriptedStream;

    fn connect(
        &self,
        _host: &str,
        _port: u16,
        _timeout: Option<Duration>,
    ) -> io::Result<ScriptedStream> {
        self.connects.set(self.connects.get() + 1);
        match self.scripts.borrow_mut().pop_front() {
            Some(Ok(steps)) => Ok(ScriptedStream::new(
                steps,
                self.clock.clone(),
                self.wire.clone(),
            )),
            Some(Err(kind)) => Err(io::Error::new(kind, "scripted connect failure")),
            None => Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "no scripted connection left",
            )),
        }
    }
}

/// READY / CONNECTED handshake followed by `rest`
pub(crate) fn authenticated(rest: Vec<Step>) -> Vec<Step> {
    let mut steps = vec![Step::frame("READY"), Step::frame("CONNECTED")];
    steps.extend(rest);
    steps
}

/// Any status that survives an encode/decode round trip
pub(crate) fn arb_status() -> impl Strategy<Value = Status> {
    prop_oneof![
        Just(Status::Ready),
        Just(Status::Auth),
        Just(Status::Connected),
        Just(Status::InvalidKey),
        Just(Status::InvalidKeyFormat),
        Just(Status::DuplicateConnection),
        Just(Status::Stream),
        Just(Status::Ping),
        "[A-Z][A-Z_ ]{0,14}[A-Z]".prop_filter_map("known status", |token| {
            match Status::from(token.as_str()) {
                other @ Status::Other(_) => Some(other),
                _ => None,
            }
        }),
    ]
}

/// JSON without floats (their text form is not guaranteed to parse back bit-exact)
pub(crate) fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        ".{0,24}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z:= ]{0,8}", inner, 0..6)
                .prop_map(|fields| Value::Object(fields.into_iter().collect())),
        ]
    })
}

pub(crate) fn arb_message() -> impl Strategy<Value = Message> {
    (arb_status(), prop::option::of(arb_json()))
        .prop_map(|(status, payload)| Message::new(status, payload))
}
