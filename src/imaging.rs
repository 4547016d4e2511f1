//! Local image handling: decoding uploads, format conversion and display sizing.

use crate::{
    error::{Result, StudioError},
    models::{ImageInput, OutputFormat},
};
use image::{imageops::FilterType, DynamicImage, GrayImage, ImageFormat, ImageOutputFormat};
use std::io::Cursor;
use std::path::Path;

/// Widest canvas the mask painter is given.
pub const CANVAS_MAX_WIDTH: u32 = 500;

/// Validates uploaded bytes. PNG, JPEG and WebP are passed through untouched,
/// anything else `image` can read is converted to PNG first.
pub fn load_image(bytes: Vec<u8>) -> Result<ImageInput> {
    if bytes.is_empty() {
        return Err(StudioError::validation("image data is empty"));
    }

    let format = image::guess_format(&bytes)?;
    let decoded = image::load_from_memory_with_format(&bytes, format)?;
    let (width, height) = (decoded.width(), decoded.height());

    let (bytes, format) = match format {
        ImageFormat::Png => (bytes, OutputFormat::Png),
        ImageFormat::Jpeg => (bytes, OutputFormat::Jpeg),
        ImageFormat::WebP => (bytes, OutputFormat::Webp),
        other => {
            log::debug!("Converting {:?} upload to PNG", other);
            (encode_png(&decoded)?, OutputFormat::Png)
        }
    };

    Ok(ImageInput {
        bytes,
        format,
        width,
        height,
    })
}

pub fn load_image_file(path: impl AsRef<Path>) -> Result<ImageInput> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| {
        StudioError::validation(format!("cannot read image {}: {}", path.display(), e))
    })?;
    load_image(bytes)
}

pub fn decode(input: &ImageInput) -> Result<DynamicImage> {
    Ok(image::load_from_memory(&input.bytes)?)
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageOutputFormat::Png)?;
    Ok(buf.into_inner())
}

pub fn encode_mask_png(mask: &GrayImage) -> Result<Vec<u8>> {
    encode_png(&DynamicImage::ImageLuma8(mask.clone()))
}

/// Canvas size for an image: at most `CANVAS_MAX_WIDTH` wide, same aspect.
pub fn display_size(width: u32, height: u32) -> (u32, u32) {
    if width == 0 {
        return (0, 0);
    }
    let canvas_width = width.min(CANVAS_MAX_WIDTH);
    let canvas_height = (canvas_width as f64 / width as f64 * height as f64) as u32;
    (canvas_width, canvas_height.max(1))
}

pub fn resize_for_display(image: &DynamicImage) -> DynamicImage {
    let (width, height) = display_size(image.width(), image.height());
    if (width, height) == (image.width(), image.height()) {
        return image.clone();
    }
    image.resize_exact(width, height, FilterType::CatmullRom)
}

/// How many times more pixels `after` has than `before`.
pub fn pixel_gain(before: u64, after: u64) -> f64 {
    if before == 0 {
        return 0.0;
    }
    after as f64 / before as f64
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([30, 60, 90]));
        encode_png(&DynamicImage::ImageRgb8(img)).unwrap()
    }

    #[test]
    fn loads_png_without_reencoding() {
        let bytes = png_bytes(12, 7);
        let input = load_image(bytes.clone()).unwrap();
        assert_eq!((input.width, input.height), (12, 7));
        assert_eq!(input.format, OutputFormat::Png);
        assert_eq!(input.bytes, bytes);
    }

    #[test]
    fn bmp_upload_is_converted_to_png() {
        let mut bmp = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(6, 3))
            .write_to(&mut bmp, ImageOutputFormat::Bmp)
            .unwrap();

        let input = load_image(bmp.into_inner()).unwrap();
        assert_eq!(input.format, OutputFormat::Png);
        assert_eq!((input.width, input.height), (6, 3));
        assert_eq!(image::guess_format(&input.bytes).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn rejects_empty_and_garbage_bytes() {
        assert!(matches!(
            load_image(vec![]).unwrap_err(),
            StudioError::ValidationError(_)
        ));
        assert!(load_image(b"definitely not an image".to_vec()).is_err());
    }

    #[test]
    fn display_size_caps_width_and_keeps_aspect() {
        assert_eq!(display_size(1000, 600), (500, 300));
        assert_eq!(display_size(320, 240), (320, 240));
        assert_eq!(display_size(2000, 1), (500, 1));
    }

    #[test]
    fn resize_for_display_shrinks_wide_images() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(1000, 400));
        let shown = resize_for_display(&img);
        assert_eq!((shown.width(), shown.height()), (500, 200));
    }

    #[test]
    fn pixel_gain_ratio() {
        assert_eq!(pixel_gain(100, 400), 4.0);
        assert_eq!(pixel_gain(0, 400), 0.0);
    }
}
