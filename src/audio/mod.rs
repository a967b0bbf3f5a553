pub mod augment;
pub mod decoder;
pub mod encoder;
pub mod resample;

pub use decoder::{decode_audio, load_audio};
pub use encoder::write_wav;
