pub mod decoder;
pub mod extractor;
pub mod fingerprint;
pub mod sampling;

pub use decoder::{FfmpegDecoder, VideoDecoder, VideoProbe};
pub use extractor::{ExtractionConfig, FrameExtractor};
pub use fingerprint::Fingerprint;
