//! Output contract: snapshot delivery with at most one in flight.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::snapshot::BiomarkerSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// Consumer busy or gone; the snapshot was discarded
    Dropped,
}

/// Receives each emitted snapshot. Must not block.
pub trait SnapshotSink {
    fn deliver(&mut self, snapshot: BiomarkerSnapshot) -> Delivery;
}

/// Bounded(1) channel sink. A snapshot offered while the previous one is
/// still unread is dropped and counted.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<BiomarkerSnapshot>,
    dropped: Arc<AtomicU64>,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<BiomarkerSnapshot>) {
        let (tx, rx) = bounded(1);
        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Shared drop counter, readable after the sink moves into a session.
    pub fn drop_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped)
    }
}

impl SnapshotSink for ChannelSink {
    fn deliver(&mut self, snapshot: BiomarkerSnapshot) -> Delivery {
        match self.tx.try_send(snapshot) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => {
                let n = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                log::debug!("snapshot channel full, dropped (total {})", n);
                Delivery::Dropped
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!("snapshot receiver disconnected, dropping");
                Delivery::Dropped
            }
        }
    }
}

/// Calls a closure for every snapshot.
pub struct CallbackSink<F>(pub F);

impl<F: FnMut(BiomarkerSnapshot)> SnapshotSink for CallbackSink<F> {
    fn deliver(&mut self, snapshot: BiomarkerSnapshot) -> Delivery {
        (self.0)(snapshot);
        Delivery::Delivered
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl SnapshotSink for NullSink {
    fn deliver(&mut self, _snapshot: BiomarkerSnapshot) -> Delivery {
        Delivery::Delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::RppgBiomarkers;
    use biosense_signals::VoiceBiomarkerSet;

    fn snapshot(ts_us: i64) -> BiomarkerSnapshot {
        BiomarkerSnapshot {
            rppg: RppgBiomarkers::default(),
            voice: VoiceBiomarkerSet::default(),
            calculated_count: 1,
            quality_score: 1.0,
            ts_us,
            frame_number: 0,
        }
    }

    #[test]
    fn test_channel_holds_one_and_drops_rest() {
        let (mut sink, rx) = ChannelSink::new();
        assert_eq!(sink.deliver(snapshot(1)), Delivery::Delivered);
        assert_eq!(sink.deliver(snapshot(2)), Delivery::Dropped);
        assert_eq!(sink.deliver(snapshot(3)), Delivery::Dropped);
        assert_eq!(sink.dropped(), 2);

        assert_eq!(rx.try_recv().unwrap().ts_us, 1);
        assert_eq!(sink.deliver(snapshot(4)), Delivery::Delivered);
        assert_eq!(rx.try_recv().unwrap().ts_us, 4);
    }

    #[test]
    fn test_disconnected_receiver_counts_drop() {
        let (mut sink, rx) = ChannelSink::new();
        let counter = sink.drop_counter();
        drop(rx);
        assert_eq!(sink.deliver(snapshot(1)), Delivery::Dropped);
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_callback_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = CallbackSink(|s: BiomarkerSnapshot| seen.push(s.ts_us));
            sink.deliver(snapshot(7));
        }
        assert_eq!(seen, vec![7]);
    }
}
