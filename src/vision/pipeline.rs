// ABOUTME: The detect and replace algorithms described in the image pipeline component;
// ABOUTME: pure functions over decoded images, so they're usable without a live connection in tests

use super::codec::{CodecError, ImageCodec};
use super::detector::{FaceDetector, Rect};
use image::{DynamicImage, GenericImage, GenericImageView, Rgb, RgbImage, Rgba};
use imageproc::drawing::{draw_hollow_circle_mut, draw_hollow_ellipse_mut};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("no faces detected in image")]
    NoFaces,
}

const ELLIPSE_COLOR: Rgb<u8> = Rgb([255, 0, 255]); // BGR(255,0,255) magenta
const EYE_COLOR: Rgb<u8> = Rgb([0, 0, 255]); // BGR(255,0,0) blue
const LINE_THICKNESS: i32 = 4;

/// Decodes, detects faces, draws annotations, and re-encodes. Returns the
/// encoded bytes; a detector that finds nothing is reported as
/// [`PipelineError::NoFaces`] so the caller can map it straight to the
/// `NoFacesDetected` wire error.
pub fn detect_and_annotate(
    codec: &dyn ImageCodec,
    detector: &mut dyn FaceDetector,
    primary_bytes: &[u8],
) -> Result<Vec<u8>, PipelineError> {
    let decoded = codec.decode(primary_bytes)?;
    let gray = imageproc::contrast::equalize_histogram(&decoded.to_luma8());
    let faces = detector.detect_faces(&gray);
    if faces.is_empty() {
        return Err(PipelineError::NoFaces);
    }

    let mut canvas = decoded.to_rgb8();
    for face in &faces {
        draw_face_ellipse(&mut canvas, face);

        let region = crop_gray(&gray, face);
        let eyes = detector.detect_eyes(&region);
        if eyes.len() == 2 {
            for eye in &eyes {
                draw_eye_circle(&mut canvas, face, eye);
            }
        }
    }

    Ok(codec.encode(&DynamicImage::ImageRgb8(canvas))?)
}

/// Decodes both images, resizes the secondary into each face rectangle
/// with area interpolation, and composites its colour channels over the
/// primary (skipping transparent secondary pixels). Returns the encoded
/// result.
pub fn replace_faces(
    codec: &dyn ImageCodec,
    faces: &[Rect],
    primary_bytes: &[u8],
    secondary_bytes: &[u8],
) -> Result<Vec<u8>, PipelineError> {
    let primary = codec.decode(primary_bytes)?;
    let secondary = codec.decode(secondary_bytes)?;

    let mut canvas = primary.to_rgba8();
    let has_alpha = secondary.color().has_alpha();

    for face in faces {
        let (fw, fh) = (face.width.max(0) as u32, face.height.max(0) as u32);
        if fw == 0 || fh == 0 {
            continue;
        }

        if has_alpha {
            let source = secondary.to_rgba8();
            let resized = image::imageops::resize(&source, fw, fh, image::imageops::FilterType::Triangle);
            composite(&mut canvas, &resized, face.x, face.y, |p| p[3] == 0);
        } else {
            let source = secondary.to_rgb8();
            let resized = image::imageops::resize(&source, fw, fh, image::imageops::FilterType::Triangle);
            let resized_rgba = RgbImage::from_raw(fw, fh, resized.into_raw())
                .map(|rgb| {
                    let mut out = image::RgbaImage::new(fw, fh);
                    for (dst, src) in out.pixels_mut().zip(rgb.pixels()) {
                        *dst = Rgba([src[0], src[1], src[2], 255]);
                    }
                    out
                })
                .expect("buffer dimensions match resize output");
            composite(&mut canvas, &resized_rgba, face.x, face.y, |_| false);
        }
    }

    // JPEG output only supports L8/Rgb8; drop the alpha channel used during
    // compositing before handing the canvas to the codec.
    let canvas = DynamicImage::ImageRgba8(canvas).to_rgb8();
    Ok(codec.encode(&DynamicImage::ImageRgb8(canvas))?)
}

fn composite(
    canvas: &mut image::RgbaImage,
    source: &image::RgbaImage,
    origin_x: i32,
    origin_y: i32,
    skip: impl Fn(&Rgba<u8>) -> bool,
) {
    let (cw, ch) = canvas.dimensions();
    for (x, y, pixel) in source.enumerate_pixels() {
        if skip(pixel) {
            continue;
        }
        let (tx, ty) = (origin_x + x as i32, origin_y + y as i32);
        if tx < 0 || ty < 0 || tx as u32 >= cw || ty as u32 >= ch {
            continue;
        }
        let existing = canvas.get_pixel(tx as u32, ty as u32);
        canvas.put_pixel(tx as u32, ty as u32, Rgba([pixel[0], pixel[1], pixel[2], existing[3]]));
    }
}

fn draw_face_ellipse(canvas: &mut image::RgbImage, face: &Rect) {
    let center = (face.x + face.width / 2, face.y + face.height / 2);
    let width_radius = face.width / 2;
    let height_radius = face.height / 2;
    // imageproc only draws a 1px outline; approximate the reference's
    // 4px line thickness with concentric ellipses.
    for offset in 0..LINE_THICKNESS {
        draw_hollow_ellipse_mut(
            canvas,
            center,
            (width_radius - offset).max(1),
            (height_radius - offset).max(1),
            ELLIPSE_COLOR,
        );
    }
}

fn draw_eye_circle(canvas: &mut image::RgbImage, face: &Rect, eye: &Rect) {
    let center = (face.x + eye.x + eye.width / 2, face.y + eye.y + eye.height / 2);
    let radius = ((eye.width as f64 / 2.0 + eye.height as f64 / 2.0) / 2.0).round() as i32;
    draw_hollow_circle_mut(canvas, center, radius.max(1), EYE_COLOR);
}

fn crop_gray(gray: &image::GrayImage, face: &Rect) -> image::GrayImage {
    let (gw, gh) = gray.dimensions();
    let x = face.x.clamp(0, gw as i32) as u32;
    let y = face.y.clamp(0, gh as i32) as u32;
    let w = (face.width as u32).min(gw.saturating_sub(x));
    let h = (face.height as u32).min(gh.saturating_sub(y));
    if w == 0 || h == 0 {
        return image::GrayImage::new(0, 0);
    }
    image::imageops::crop_imm(gray, x, y, w, h).to_image()
}
