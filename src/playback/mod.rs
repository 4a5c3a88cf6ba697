//! Loading and playing back recorded audio.

pub mod decode;
pub mod player;

pub use decode::load_wav;
pub use player::Player;
