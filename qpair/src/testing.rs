//! In-memory broker doubles and log capture for unit tests.

use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::{stream, StreamExt};
use tokio::time::Instant;

use crate::broker::{Broker, Deliveries, Delivery, DeliveryTag, Session};
use crate::error::{Error, Result};
use crate::shutdown::ShutdownTrigger;

/// Everything a [`MemorySession`] was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open { url: String, queue: String },
    Publish { queue: String, payload: Vec<u8>, at: Instant },
    Consume { queue: String, consumer_tag: String, prefetch: u16 },
    Ack { tag: DeliveryTag, at: Instant },
    Close,
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

/// Scripted session. Defaults to succeeding at everything.
#[derive(Default)]
pub struct MemorySession {
    events: EventLog,
    deliveries: Mutex<Vec<Result<Delivery>>>,
    hold_open: bool,
    fail_publish_at: Option<u64>,
    fail_ack: bool,
    trigger_on_publish: Option<(u64, ShutdownTrigger)>,
    trigger_on_ack: Option<(u64, ShutdownTrigger)>,
    publishes: Mutex<u64>,
    acks: Mutex<u64>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the event log, readable after the session is closed.
    pub fn events(&self) -> EventLog {
        Arc::clone(&self.events)
    }

    /// Deliveries handed out by `consume`. The stream ends after them
    /// unless [`hold_open`](Self::hold_open) is set.
    pub fn with_deliveries(self, deliveries: Vec<Result<Delivery>>) -> Self {
        *self.deliveries.lock().unwrap() = deliveries;
        self
    }

    /// Keep the delivery stream pending after the scripted deliveries.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Fail the `n`th publish (1-based).
    pub fn fail_publish_at(mut self, n: u64) -> Self {
        self.fail_publish_at = Some(n);
        self
    }

    pub fn fail_ack(mut self) -> Self {
        self.fail_ack = true;
        self
    }

    /// Request shutdown while performing the `n`th publish (1-based).
    pub fn trigger_on_publish(mut self, n: u64, trigger: ShutdownTrigger) -> Self {
        self.trigger_on_publish = Some((n, trigger));
        self
    }

    /// Request shutdown while performing the `n`th ack (1-based).
    pub fn trigger_on_ack(mut self, n: u64, trigger: ShutdownTrigger) -> Self {
        self.trigger_on_ack = Some((n, trigger));
        self
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()> {
        let n = {
            let mut publishes = self.publishes.lock().unwrap();
            *publishes += 1;
            *publishes
        };
        if self.fail_publish_at == Some(n) {
            return Err(anyhow::anyhow!("channel closed by broker").into());
        }
        if let Some((at, trigger)) = &self.trigger_on_publish {
            if *at == n {
                trigger.trigger();
            }
        }
        self.record(Event::Publish {
            queue: queue.to_string(),
            payload: payload.to_vec(),
            at: Instant::now(),
        });
        Ok(())
    }

    async fn consume(&self, queue: &str, consumer_tag: &str, prefetch: u16) -> Result<Deliveries> {
        self.record(Event::Consume {
            queue: queue.to_string(),
            consumer_tag: consumer_tag.to_string(),
            prefetch,
        });
        let scripted: Vec<Result<Delivery>> = std::mem::take(&mut *self.deliveries.lock().unwrap());
        let scripted = stream::iter(scripted);
        if self.hold_open {
            Ok(scripted.chain(stream::pending()).boxed())
        } else {
            Ok(scripted.boxed())
        }
    }

    async fn ack(&self, tag: DeliveryTag) -> Result<()> {
        if self.fail_ack {
            return Err(anyhow::anyhow!("unknown delivery tag {tag}").into());
        }
        let n = {
            let mut acks = self.acks.lock().unwrap();
            *acks += 1;
            *acks
        };
        if let Some((at, trigger)) = &self.trigger_on_ack {
            if *at == n {
                trigger.trigger();
            }
        }
        self.record(Event::Ack {
            tag,
            at: Instant::now(),
        });
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.record(Event::Close);
        Ok(())
    }
}

/// Broker that fails `failures` times with a connection error, then hands
/// out its single session.
pub struct MemoryBroker {
    session: Mutex<Option<MemorySession>>,
    failures: Mutex<u32>,
    events: EventLog,
}

impl MemoryBroker {
    pub fn new(session: MemorySession) -> Self {
        let events = session.events();
        Self {
            session: Mutex::new(Some(session)),
            failures: Mutex::new(0),
            events,
        }
    }

    pub fn failing(self, failures: u32) -> Self {
        *self.failures.lock().unwrap() = failures;
        self
    }

    pub fn events(&self) -> EventLog {
        Arc::clone(&self.events)
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    type Session = MemorySession;

    async fn open(&self, url: &str, queue: &str) -> Result<MemorySession> {
        self.events.lock().unwrap().push(Event::Open {
            url: url.to_string(),
            queue: queue.to_string(),
        });
        {
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(Error::Connection(anyhow::anyhow!("connection refused")));
            }
        }
        self.session
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| Error::Operation(anyhow::anyhow!("session already opened")))
    }
}

/// Count events matching `pred`.
pub fn count(events: &EventLog, pred: impl Fn(&Event) -> bool) -> usize {
    events.lock().unwrap().iter().filter(|e| pred(e)).count()
}

/// Buffer collecting formatted log output.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Number of captured lines containing `needle`.
    pub fn lines_containing(&self, needle: &str) -> usize {
        self.contents().lines().filter(|l| l.contains(needle)).count()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Route this thread's tracing output into a buffer until the guard drops.
pub fn capture_logs() -> (LogCapture, tracing::subscriber::DefaultGuard) {
    let capture = LogCapture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (capture, guard)
}

/// Just the queued deliveries, for readable test setup.
pub fn deliveries(bodies: &[&str]) -> Vec<Result<Delivery>> {
    bodies
        .iter()
        .enumerate()
        .map(|(i, body)| Ok(Delivery::new(i as u64 + 1, body.as_bytes().to_vec())))
        .collect()
}

