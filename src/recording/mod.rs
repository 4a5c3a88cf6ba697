//! Audio capture for live recording.

pub mod audio;

pub use audio::{save_wav, AudioRecorder};
