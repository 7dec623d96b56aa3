use crate::error::{Result, SimError};
use ndarray::Array2;
use std::sync::mpsc::{Receiver, Sender, SyncSender, TrySendError};

/// Receives periodic copies of the wavefield. Failures are reported back to
/// the driver, which logs them and keeps stepping.
pub trait SnapshotSink {
    fn emit(&mut self, step: usize, field: Array2<f64>) -> Result<()>;
}

/// Discards every snapshot. Used for headless runs.
pub struct NullSink;

impl SnapshotSink for NullSink {
    fn emit(&mut self, _step: usize, _field: Array2<f64>) -> Result<()> {
        Ok(())
    }
}

/// Keeps every snapshot in memory.
#[derive(Default)]
pub struct CollectingSink {
    pub frames: Vec<(usize, Array2<f64>)>,
}

impl SnapshotSink for CollectingSink {
    fn emit(&mut self, step: usize, field: Array2<f64>) -> Result<()> {
        self.frames.push((step, field));
        Ok(())
    }
}

/// A frame handed to another thread.
pub type Frame = (usize, Array2<f64>);

/// Forwards snapshots over a channel so rendering happens off the stepping thread.
pub enum ChannelSink {
    Unbounded(Sender<Frame>),
    /// Drops frames rather than blocking when the consumer falls behind.
    Bounded(SyncSender<Frame>),
}

impl ChannelSink {
    pub fn unbounded() -> (Self, Receiver<Frame>) {
        let (tx, rx) = std::sync::mpsc::channel();
        (ChannelSink::Unbounded(tx), rx)
    }

    pub fn bounded(capacity: usize) -> (Self, Receiver<Frame>) {
        let (tx, rx) = std::sync::mpsc::sync_channel(capacity);
        (ChannelSink::Bounded(tx), rx)
    }
}

impl SnapshotSink for ChannelSink {
    fn emit(&mut self, step: usize, field: Array2<f64>) -> Result<()> {
        match self {
            ChannelSink::Unbounded(tx) => tx
                .send((step, field))
                .map_err(|_| SimError::Sink("snapshot receiver disconnected".to_string())),
            ChannelSink::Bounded(tx) => match tx.try_send((step, field)) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => {
                    Err(SimError::Sink(format!("renderer busy, dropped frame {}", step)))
                }
                Err(TrySendError::Disconnected(_)) => {
                    Err(SimError::Sink("snapshot receiver disconnected".to_string()))
                }
            },
        }
    }
}

impl<S: SnapshotSink + ?Sized> SnapshotSink for Box<S> {
    fn emit(&mut self, step: usize, field: Array2<f64>) -> Result<()> {
        (**self).emit(step, field)
    }
}
