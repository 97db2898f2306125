//! Sample acquisition boundary.
//!
//! The core never talks to a device. It asks a [`SampleSource`] for the most
//! recent reading once per tick; the source may hand back the same reading
//! several times between physical updates, or nothing at all when the last
//! driver read was incomplete.

pub mod channel;
pub mod synthetic;
pub mod types;

// Re-export commonly used types
pub use channel::{spawn_acquisition, ChannelSource, RawFrame};
pub use synthetic::{ReplaySource, SyntheticArmband};
pub use types::{Sample, CHANNEL_COUNT};

/// Provider of the latest armband reading.
pub trait SampleSource {
    /// Return the most recent complete reading, if any.
    ///
    /// Implementations return `None` when fewer than [`CHANNEL_COUNT`]
    /// channels are available.
    fn latest_sample(&mut self) -> Option<Sample>;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn latest_sample(&mut self) -> Option<Sample> {
        (**self).latest_sample()
    }
}
