// ABOUTME: The external image codec and face detector capabilities, and the pipelines built on them

pub mod codec;
pub mod detector;
pub mod pipeline;

pub use codec::{CodecError, ImageCodec, JpegCodec};
pub use detector::{FaceDetector, FixedFaceDetector, Rect};
pub use pipeline::{detect_and_annotate, replace_faces, PipelineError};

#[cfg(feature = "opencv-detector")]
pub use detector::CascadeFaceDetector;
