//! Latest-value sample source fed by an acquisition thread.
//!
//! The driver side pushes raw frames into a bounded channel at its own rate.
//! The pipeline side drains whatever arrived since the previous tick and keeps
//! only the newest frame, so a slow consumer never falls behind the armband.

use crate::source::types::{Sample, CHANNEL_COUNT};
use crate::source::SampleSource;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A raw driver read. May hold fewer than [`CHANNEL_COUNT`] values.
pub type RawFrame = Vec<i32>;

/// Sample source reading from a driver channel.
pub struct ChannelSource {
    receiver: Receiver<RawFrame>,
    latest: Option<RawFrame>,
    connected: bool,
}

impl ChannelSource {
    /// Create a source and the sender the driver writes to.
    pub fn new(capacity: usize) -> (Sender<RawFrame>, Self) {
        let (sender, receiver) = bounded(capacity);
        (
            sender,
            Self {
                receiver,
                latest: None,
                connected: true,
            },
        )
    }

    /// Whether the driver side is still attached.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Pull every pending frame, keeping the newest.
    fn drain(&mut self) {
        loop {
            match self.receiver.try_recv() {
                Ok(frame) => self.latest = Some(frame),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.connected {
                        tracing::debug!("acquisition channel disconnected");
                    }
                    self.connected = false;
                    break;
                }
            }
        }
    }
}

impl SampleSource for ChannelSource {
    fn latest_sample(&mut self) -> Option<Sample> {
        self.drain();
        let frame = self.latest.as_ref()?;
        let sample = Sample::from_slice(frame);
        if sample.is_none() {
            tracing::trace!(
                channels = frame.len(),
                expected = CHANNEL_COUNT,
                "incomplete frame"
            );
        }
        sample
    }
}

/// Spawn a thread that polls `read` every `period` and forwards frames.
///
/// The thread exits when `running` is cleared or the source is dropped.
/// Frames are dropped rather than queued when the channel is full.
pub fn spawn_acquisition<F>(
    mut read: F,
    sender: Sender<RawFrame>,
    period: Duration,
    running: Arc<AtomicBool>,
) -> JoinHandle<()>
where
    F: FnMut() -> Option<RawFrame> + Send + 'static,
{
    thread::spawn(move || {
        while running.load(Ordering::SeqCst) {
            if let Some(frame) = read() {
                match sender.try_send(frame) {
                    Ok(()) | Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Disconnected(_)) => break,
                }
            }
            thread::sleep(period);
        }
    })
}
