//! Fan-out of inbound frames to every registered connection

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;

use super::registry::{ConnectionHandle, ConnectionRegistry};
use super::{Frame, GatewayError};

/// Outcome of one fan-out
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FanoutReport {
    /// Connections the frame was queued for
    pub delivered: Vec<ConnectionHandle>,
    /// Connections that could not take the frame and were removed
    pub failed: Vec<ConnectionHandle>,
}

pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
    echo_to_sender: bool,
}

impl Broadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>, echo_to_sender: bool) -> Self {
        Self {
            registry,
            echo_to_sender,
        }
    }

    /// Queue `frame` for every registered connection.
    ///
    /// The origin is included when echo is enabled. A recipient whose queue
    /// is full or closed is removed from the registry and signalled to
    /// close; the remaining recipients are unaffected.
    pub fn fanout(&self, origin: Option<ConnectionHandle>, frame: &Frame) -> FanoutReport {
        let mut report = FanoutReport::default();

        for entry in self.registry.snapshot() {
            if !self.echo_to_sender && Some(entry.handle) == origin {
                continue;
            }

            match entry.outbound.try_send(frame.clone()) {
                Ok(()) => report.delivered.push(entry.handle),
                Err(err) => {
                    let reason = match err {
                        TrySendError::Full(_) => "outbound queue full",
                        TrySendError::Closed(_) => "connection closed",
                    };
                    let error = GatewayError::Delivery {
                        handle: entry.handle,
                        reason,
                    };
                    tracing::warn!(
                        handle = entry.handle,
                        principal = ?entry.principal,
                        error = %error,
                        "Dropping recipient"
                    );
                    self.registry.remove(entry.handle);
                    report.failed.push(entry.handle);
                }
            }
        }

        tracing::debug!(
            origin = ?origin,
            bytes = frame.len(),
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "Fan-out complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    fn register(
        registry: &ConnectionRegistry,
        capacity: usize,
    ) -> (ConnectionHandle, mpsc::Receiver<Frame>, CancellationToken) {
        let (tx, rx) = mpsc::channel(capacity);
        let close = CancellationToken::new();
        let handle = registry.add(None, tx, close.clone());
        (handle, rx, close)
    }

    #[test]
    fn test_fanout_includes_origin_and_is_byte_exact() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (a, mut rx_a, _) = register(&registry, 4);
        let (b, mut rx_b, _) = register(&registry, 4);
        let broadcaster = Broadcaster::new(registry, true);

        let text = Frame::Text("{\"chat_id\":1, \"content\":\"héllo\"}  ".to_string());
        let binary = Frame::Binary(vec![0, 159, 146, 150, 255]);

        assert_eq!(broadcaster.fanout(Some(a), &text).delivered, vec![a, b]);
        broadcaster.fanout(Some(b), &binary);

        for rx in [&mut rx_a, &mut rx_b] {
            assert_eq!(rx.try_recv().unwrap(), text);
            assert_eq!(rx.try_recv().unwrap(), binary);
        }
    }

    #[test]
    fn test_fanout_without_echo_skips_origin() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (a, mut rx_a, _) = register(&registry, 4);
        let (b, mut rx_b, _) = register(&registry, 4);
        let broadcaster = Broadcaster::new(registry, false);

        let report = broadcaster.fanout(Some(a), &Frame::Text("x".to_string()));

        assert_eq!(report.delivered, vec![b]);
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn test_failed_recipient_is_isolated() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (a, mut rx_a, close_a) = register(&registry, 4);
        let (gone, rx_gone, close_gone) = register(&registry, 4);
        let (full, mut rx_full, close_full) = register(&registry, 1);
        let (c, mut rx_c, _) = register(&registry, 4);
        drop(rx_gone);
        let broadcaster = Broadcaster::new(registry.clone(), true);

        // Fill the single-slot queue first
        let first = Frame::Text("1".to_string());
        broadcaster.fanout(None, &first);
        assert!(registry.contains(full));
        assert!(!registry.contains(gone));
        assert!(close_gone.is_cancelled());

        let second = Frame::Text("2".to_string());
        let report = broadcaster.fanout(Some(a), &second);

        assert_eq!(report.delivered, vec![a, c]);
        assert_eq!(report.failed, vec![full]);
        assert!(close_full.is_cancelled());
        assert!(!close_a.is_cancelled());
        assert_eq!(registry.handles(), vec![a, c]);

        assert_eq!(rx_full.try_recv().unwrap(), first);
        for rx in [&mut rx_a, &mut rx_c] {
            assert_eq!(rx.try_recv().unwrap(), first);
            assert_eq!(rx.try_recv().unwrap(), second);
        }
    }

    #[test]
    fn test_fanout_to_empty_registry() {
        let broadcaster = Broadcaster::new(Arc::new(ConnectionRegistry::new()), true);
        assert_eq!(
            broadcaster.fanout(None, &Frame::Binary(Vec::new())),
            FanoutReport::default()
        );
    }
}
