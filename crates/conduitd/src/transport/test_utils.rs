//! Test helpers for the transport module.

use std::net::TcpStream;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::thread;
use std::time::Duration;

use super::ConnectionHandler;

pub(crate) struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            count: Arc::clone(&count),
        });
        (count, handler)
    }
}

impl ConnectionHandler for CountingHandler {
    fn handle(&self, _stream: TcpStream, _shutdown: &AtomicBool) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Holds each connection for a fixed time and records peak concurrency.
pub(crate) struct SlowHandler {
    hold: Duration,
    active: AtomicUsize,
    peak: Arc<AtomicUsize>,
    served: Arc<AtomicUsize>,
}

impl SlowHandler {
    pub(crate) fn new(hold: Duration) -> (Arc<AtomicUsize>, Arc<AtomicUsize>, Arc<Self>) {
        let peak = Arc::new(AtomicUsize::new(0));
        let served = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            hold,
            active: AtomicUsize::new(0),
            peak: Arc::clone(&peak),
            served: Arc::clone(&served),
        });
        (peak, served, handler)
    }
}

impl ConnectionHandler for SlowHandler {
    fn handle(&self, _stream: TcpStream, _shutdown: &AtomicBool) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(self.hold);
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.served.fetch_add(1, Ordering::SeqCst);
    }
}
