//! Letterbox / pillarbox still images onto an exact canvas.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ColorType, DynamicImage, GenericImageView, Rgb, RgbImage};
use tracing::debug;

use crate::clip::Canvas;
use crate::error::{MediaError, MediaResult};

const JPEG_QUALITY: u8 = 95;

/// Size of the scaled source inside `canvas`, preserving aspect ratio
pub fn fit_dimensions(src_width: u32, src_height: u32, canvas: Canvas) -> (u32, u32) {
    let src_ratio = src_width as f64 / src_height.max(1) as f64;

    let (width, height) = if src_ratio > canvas.aspect_ratio() {
        // Relatively wider than the canvas: fit to width
        (canvas.width, (canvas.width as f64 / src_ratio) as u32)
    } else {
        ((canvas.height as f64 * src_ratio) as u32, canvas.height)
    };

    (width.clamp(1, canvas.width), height.clamp(1, canvas.height))
}

/// Scale `image` into `canvas` and center it on black
pub fn letterbox(image: &DynamicImage, canvas: Canvas) -> RgbImage {
    let rgb = image.to_rgb8();
    let (width, height) = fit_dimensions(rgb.width(), rgb.height(), canvas);
    let scaled = imageops::resize(&rgb, width, height, FilterType::Lanczos3);

    let mut framed = RgbImage::from_pixel(canvas.width, canvas.height, Rgb([0, 0, 0]));
    let x = (canvas.width - width) / 2;
    let y = (canvas.height - height) / 2;
    imageops::overlay(&mut framed, &scaled, x as i64, y as i64);
    framed
}

/// Read `source`, letterbox it and write a JPEG to `output`
pub fn normalize_image(source: &Path, canvas: Canvas, output: &Path) -> MediaResult<()> {
    let image = image::open(source).map_err(|e| MediaError::ImageLoad {
        path: source.to_path_buf(),
        reason: e.to_string(),
    })?;

    debug!(
        "Normalizing {} ({}x{}) onto {}",
        source.display(),
        image.width(),
        image.height(),
        canvas
    );

    let framed = letterbox(&image, canvas);
    let save_error = |reason: String| MediaError::ImageSave {
        path: output.to_path_buf(),
        reason,
    };

    let file = File::create(output).map_err(|e| save_error(e.to_string()))?;
    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY)
        .encode(framed.as_raw(), framed.width(), framed.height(), ColorType::Rgb8)
        .map_err(|e| save_error(e.to_string()))?;

    Ok(())
}

/// [`normalize_image`] on the blocking pool
pub async fn normalize_image_async(source: PathBuf, canvas: Canvas, output: PathBuf) -> MediaResult<()> {
    tokio::task::spawn_blocking(move || normalize_image(&source, canvas, &output))
        .await
        .map_err(|e| MediaError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const LANDSCAPE: Canvas = Canvas::new(1920, 1080);
    const PORTRAIT: Canvas = Canvas::new(1080, 1920);

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 40, 40])))
    }

    #[test]
    fn test_fit_dimensions() {
        assert_eq!(fit_dimensions(500, 500, LANDSCAPE), (1080, 1080));
        assert_eq!(fit_dimensions(3840, 1080, LANDSCAPE), (1920, 540));
        assert_eq!(fit_dimensions(500, 500, PORTRAIT), (1080, 1080));
        assert_eq!(fit_dimensions(1000, 4000, PORTRAIT), (480, 1920));
    }

    #[test]
    fn test_letterbox_is_exact_size_for_any_aspect() {
        for (w, h) in [(400, 400), (1600, 300), (300, 1600)] {
            for canvas in [LANDSCAPE, PORTRAIT] {
                let framed = letterbox(&solid(w, h), canvas);
                assert_eq!((framed.width(), framed.height()), (canvas.width, canvas.height));
            }
        }
    }

    #[test]
    fn test_letterbox_centers_on_black() {
        // Square on 16:9 -> pillarbox: edges black, center colored
        let framed = letterbox(&solid(100, 100), LANDSCAPE);
        assert_eq!(framed.get_pixel(0, 540), &Rgb([0, 0, 0]));
        assert_eq!(framed.get_pixel(1919, 540), &Rgb([0, 0, 0]));
        let center = framed.get_pixel(960, 540);
        assert!(center[0] > 150 && center[1] < 90);

        // Wide on 9:16 -> letterbox: top and bottom black
        let framed = letterbox(&solid(1600, 300), PORTRAIT);
        assert_eq!(framed.get_pixel(540, 0), &Rgb([0, 0, 0]));
        assert_eq!(framed.get_pixel(540, 1919), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_normalize_image_writes_canvas_sized_jpeg() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("framed.jpg");

        for (name, w, h) in [("square.png", 640, 640), ("wide.png", 1200, 300), ("tall.png", 300, 1200)] {
            let source = dir.path().join(name);
            solid(w, h).save(&source).unwrap();

            normalize_image(&source, PORTRAIT, &output).unwrap();
            let written = image::open(&output).unwrap();
            assert_eq!((written.width(), written.height()), (1080, 1920), "{name}");
        }
    }

    #[test]
    fn test_unreadable_source_is_an_error() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("broken.png");
        std::fs::write(&source, b"definitely not a png").unwrap();

        let result = normalize_image(&source, LANDSCAPE, &dir.path().join("out.jpg"));
        assert!(matches!(result, Err(MediaError::ImageLoad { .. })));

        let missing = normalize_image(&dir.path().join("nope.png"), LANDSCAPE, &dir.path().join("out.jpg"));
        assert!(missing.is_err());
    }
}
