//! Event reporting toward control surfaces.
//!
//! Every report is mirrored into `tracing` and offered to a bounded event
//! channel. A full channel drops the event and counts it; the cycle never
//! blocks on a slow consumer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use tracing::{error, info, warn};

use gantry_common::event::{Event, PositionSnapshot, Severity};

use crate::error::Fault;

#[derive(Debug, Clone)]
pub struct Reporter {
    tx: Sender<Event>,
    dropped: Arc<AtomicU64>,
}

impl Reporter {
    pub fn new(tx: Sender<Event>) -> Self {
        Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Reporter plus the receiving end of a channel of `depth` events.
    pub fn channel(depth: usize) -> (Self, Receiver<Event>) {
        let (tx, rx) = bounded(depth);
        (Self::new(tx), rx)
    }

    pub fn report(&self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        match severity {
            Severity::Error => error!(target: "gantry::surface", "{message}"),
            Severity::Warning => warn!(target: "gantry::surface", "{message}"),
            Severity::Info | Severity::Success | Severity::Primary => {
                info!(target: "gantry::surface", %severity, "{message}")
            }
        }
        self.send(Event::log(severity, message));
    }

    pub fn fault(&self, fault: &Fault) {
        self.report(fault.severity(), fault.to_string());
    }

    pub fn info(&self, message: impl Into<String>) {
        self.report(Severity::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.report(Severity::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.report(Severity::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.report(Severity::Error, message);
    }

    pub fn primary(&self, message: impl Into<String>) {
        self.report(Severity::Primary, message);
    }

    pub fn publish(&self, snapshot: PositionSnapshot) {
        self.send(Event::Positions(snapshot));
    }

    /// Events lost to a full or closed channel.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn send(&self, event: Event) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
