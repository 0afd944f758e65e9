//! Audio decoding, normalization and block reading

pub mod decoder;
pub mod scratch;
pub mod source;
pub mod transcode;

pub use scratch::{ScratchFile, ScratchSpace};
pub use source::HopReader;
pub use transcode::{FfmpegTranscoder, SymphoniaTranscoder, Transcoder};
