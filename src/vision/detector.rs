// ABOUTME: FaceDetector is the opaque capability the core consumes; this file defines the
// ABOUTME: interface plus a cascade-backed production adapter and a scriptable fake for tests

use image::GrayImage;

/// Integer rectangle in primary-image pixel coordinates. `width`/`height`
/// are always positive for a value returned by a detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// The face/eye detection capability. Not safe for concurrent use — the
/// `&mut self` receiver lets the type system enforce that, so callers
/// need nothing beyond a `Mutex<Box<dyn FaceDetector>>` to get the
/// serialization the core requires (see `server::worker`).
pub trait FaceDetector: Send {
    fn detect_faces(&mut self, gray: &GrayImage) -> Vec<Rect>;
    fn detect_eyes(&mut self, gray_face_region: &GrayImage) -> Vec<Rect>;
}

/// A scriptable detector for tests: returns whatever rectangles it was
/// constructed with, regardless of input, and counts how many times each
/// method was called so tests can assert the cascade mutex actually
/// serializes access (§8: "at most one worker is inside the detector at
/// any instant, observable via an instrumented fake detector").
#[derive(Debug, Default, Clone)]
pub struct FixedFaceDetector {
    pub faces: Vec<Rect>,
    pub eyes: Vec<Rect>,
    pub face_calls: usize,
    pub eye_calls: usize,
}

impl FixedFaceDetector {
    pub fn with_faces(faces: Vec<Rect>) -> Self {
        FixedFaceDetector { faces, ..Default::default() }
    }

    pub fn none() -> Self {
        FixedFaceDetector::default()
    }
}

impl FaceDetector for FixedFaceDetector {
    fn detect_faces(&mut self, _gray: &GrayImage) -> Vec<Rect> {
        self.face_calls += 1;
        self.faces.clone()
    }

    fn detect_eyes(&mut self, _gray_face_region: &GrayImage) -> Vec<Rect> {
        self.eye_calls += 1;
        self.eyes.clone()
    }
}

#[cfg(feature = "opencv-detector")]
pub use cascade::CascadeFaceDetector;

#[cfg(feature = "opencv-detector")]
mod cascade {
    use super::{FaceDetector, Rect};
    use image::GrayImage;
    use opencv::core::{Mat, Size, Vector};
    use opencv::objdetect::CascadeClassifier;
    use opencv::prelude::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum ClassifierLoadError {
        #[error("failed to load face cascade from {0}")]
        Face(String),
        #[error("failed to load eye cascade from {0}")]
        Eye(String),
    }

    /// Wraps two Haar cascade classifiers, matching the reference
    /// implementation's pair of `cvLoad`-ed classifiers. Must only be
    /// reached through a single `&mut self` call at a time (see
    /// `server::worker`, which guards this behind the cascade mutex).
    pub struct CascadeFaceDetector {
        face_cascade: CascadeClassifier,
        eye_cascade: CascadeClassifier,
    }

    impl CascadeFaceDetector {
        pub fn load(face_cascade_path: &str, eye_cascade_path: &str) -> Result<Self, ClassifierLoadError> {
            let face_cascade = CascadeClassifier::new(face_cascade_path)
                .map_err(|_| ClassifierLoadError::Face(face_cascade_path.to_string()))?;
            let eye_cascade = CascadeClassifier::new(eye_cascade_path)
                .map_err(|_| ClassifierLoadError::Eye(eye_cascade_path.to_string()))?;
            Ok(CascadeFaceDetector { face_cascade, eye_cascade })
        }

        fn detect(classifier: &mut CascadeClassifier, gray: &GrayImage) -> Vec<Rect> {
            let (width, height) = (gray.width() as i32, gray.height() as i32);
            let mat = match unsafe {
                Mat::new_rows_cols_with_data_unsafe(
                    height,
                    width,
                    opencv::core::CV_8UC1,
                    gray.as_raw().as_ptr() as *mut std::ffi::c_void,
                    opencv::core::Mat_AUTO_STEP,
                )
            } {
                Ok(mat) => mat,
                Err(_) => return Vec::new(),
            };

            let mut detected: Vector<opencv::core::Rect> = Vector::new();
            // min_neighbors = 4 here matches facedetect.c, which reuses its
            // LINE_THICKNESS constant for this argument on both cascades.
            let result = classifier.detect_multi_scale(
                &mat,
                &mut detected,
                1.1,
                4,
                0,
                Size::new(0, 0),
                Size::new(1000, 1000),
            );
            if result.is_err() {
                return Vec::new();
            }

            detected
                .iter()
                .map(|r| Rect { x: r.x, y: r.y, width: r.width, height: r.height })
                .collect()
        }
    }

    impl FaceDetector for CascadeFaceDetector {
        fn detect_faces(&mut self, gray: &GrayImage) -> Vec<Rect> {
            Self::detect(&mut self.face_cascade, gray)
        }

        fn detect_eyes(&mut self, gray_face_region: &GrayImage) -> Vec<Rect> {
            Self::detect(&mut self.eye_cascade, gray_face_region)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_detector_returns_configured_faces_and_counts_calls() {
        let mut detector = FixedFaceDetector::with_faces(vec![Rect { x: 1, y: 2, width: 3, height: 4 }]);
        let gray = GrayImage::new(10, 10);
        let faces = detector.detect_faces(&gray);
        assert_eq!(faces.len(), 1);
        assert_eq!(detector.face_calls, 1);
        assert_eq!(detector.eye_calls, 0);
    }

    #[test]
    fn detector_with_no_faces_reports_empty() {
        let mut detector = FixedFaceDetector::none();
        let gray = GrayImage::new(4, 4);
        assert!(detector.detect_faces(&gray).is_empty());
    }
}
