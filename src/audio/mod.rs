//! Audio capture sources.

#[cfg(feature = "cpal-audio")]
pub mod capture;
pub mod source;
pub mod wav;

#[cfg(feature = "cpal-audio")]
pub use capture::{list_devices, CpalAudioSource};
pub use source::{AudioSource, MockAudioSource};
pub use wav::WavAudioSource;
