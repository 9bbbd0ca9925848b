//! Shutdown signal released from the test thread.

use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::process::{ShutdownError, ShutdownSignal};

/// Blocks [`ShutdownSignal::wait`] until its trigger fires or is dropped.
pub struct TestShutdownSignal {
    receiver: Mutex<Receiver<()>>,
}

/// Releases a paired [`TestShutdownSignal`].
#[derive(Clone)]
pub struct ShutdownTrigger {
    sender: Sender<()>,
}

impl TestShutdownSignal {
    pub fn new() -> (Self, ShutdownTrigger) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                receiver: Mutex::new(receiver),
            },
            ShutdownTrigger { sender },
        )
    }
}

impl ShutdownTrigger {
    pub fn fire(&self) {
        let _ = self.sender.send(());
    }
}

impl ShutdownSignal for TestShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let receiver = self
            .receiver
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // A dropped trigger also releases the wait.
        let _ = receiver.recv();
        Ok(())
    }
}
