//! Waveform engine: bar extraction, live and recorded rendering, resize
//! handling and background extraction.

pub mod bars;
pub mod blob;
pub mod geometry;
pub mod host;
pub mod live;
pub mod offload;
pub mod resize;
pub mod surface;
pub mod visualizer;

#[cfg(test)]
pub(crate) mod testing;

pub use bars::{extract_bars, Bar, BarLayout, BarSequence, ExtractOptions, Polarity};
pub use geometry::{ContainerSize, Geometry};
pub use host::{ControlState, HostEvents, RecordedBuffer, WaveformOptions};
pub use offload::OffloadCoordinator;
pub use resize::{ResizeCoordinator, ResizeEnvironment, ResizeSignal, ResizeStrategy, StrategySetting};
pub use surface::{PixelSurface, Rgba, Surface};
pub use visualizer::{RenderMode, WaveformVisualizer};
