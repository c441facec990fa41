//! # Mock Transport
//!
//! In-memory transport for exercising the session, queue and codec without
//! hardware. Tests hold a [`MockHandle`] to script inbound frames, inspect
//! what the session sent, and drop the link at a chosen moment.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::RotuloError;
use crate::transport::{Transport, TransportKind};

#[derive(Default)]
struct Shared {
    inbound: Mutex<VecDeque<Vec<u8>>>,
    sent: Mutex<Vec<Vec<u8>>>,
    open: AtomicBool,
}

/// Scriptable in-memory transport.
pub struct MockTransport {
    shared: Arc<Shared>,
    kind: TransportKind,
}

/// Test-side handle to a [`MockTransport`].
#[derive(Clone)]
pub struct MockHandle {
    shared: Arc<Shared>,
}

impl MockTransport {
    /// Create a mock transport and its scripting handle.
    pub fn new() -> (Self, MockHandle) {
        Self::with_kind(TransportKind::Bluetooth)
    }

    pub fn with_kind(kind: TransportKind) -> (Self, MockHandle) {
        let shared = Arc::new(Shared {
            open: AtomicBool::new(true),
            ..Default::default()
        });
        (
            Self {
                shared: shared.clone(),
                kind,
            },
            MockHandle { shared },
        )
    }
}

impl Transport for MockTransport {
    fn send(&mut self, data: &[u8]) -> Result<(), RotuloError> {
        if !self.shared.open.load(Ordering::SeqCst) {
            return Err(RotuloError::Transport("link closed".to_string()));
        }
        self.shared.sent.lock().unwrap().push(data.to_vec());
        Ok(())
    }

    fn try_recv(&mut self) -> Result<Option<Vec<u8>>, RotuloError> {
        if !self.shared.open.load(Ordering::SeqCst) {
            return Err(RotuloError::Transport("link closed".to_string()));
        }
        Ok(self.shared.inbound.lock().unwrap().pop_front())
    }

    fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }

    fn close(&mut self) {
        self.shared.open.store(false, Ordering::SeqCst);
    }

    fn kind(&self) -> TransportKind {
        self.kind
    }
}

impl MockHandle {
    /// Queue bytes the session will see on its next receive poll.
    pub fn push_inbound(&self, bytes: Vec<u8>) {
        self.shared.inbound.lock().unwrap().push_back(bytes);
    }

    /// Everything the session has sent so far, one entry per send call.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.shared.sent.lock().unwrap().clone()
    }

    /// Total bytes sent so far.
    pub fn sent_bytes(&self) -> usize {
        self.shared.sent.lock().unwrap().iter().map(Vec::len).sum()
    }

    /// Simulate link loss: subsequent sends and receives fail.
    pub fn drop_link(&self) {
        self.shared.open.store(false, Ordering::SeqCst);
    }

    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_recorded() {
        let (mut transport, handle) = MockTransport::new();
        transport.send(&[1, 2, 3]).unwrap();
        transport.send(&[4]).unwrap();
        assert_eq!(handle.sent(), vec![vec![1, 2, 3], vec![4]]);
        assert_eq!(handle.sent_bytes(), 4);
    }

    #[test]
    fn test_inbound_fifo() {
        let (mut transport, handle) = MockTransport::new();
        handle.push_inbound(vec![1]);
        handle.push_inbound(vec![2]);
        assert_eq!(transport.try_recv().unwrap(), Some(vec![1]));
        assert_eq!(transport.try_recv().unwrap(), Some(vec![2]));
        assert_eq!(transport.try_recv().unwrap(), None);
    }

    #[test]
    fn test_drop_link_fails_io() {
        let (mut transport, handle) = MockTransport::new();
        handle.drop_link();
        assert!(!transport.is_open());
        assert!(transport.send(&[0]).is_err());
        assert!(transport.try_recv().is_err());
    }
}
