//! Mask synthesis. Every mask produced here is single-channel and strictly
//! binary: 255 marks pixels the API should regenerate, 0 pixels to keep.

use crate::error::{Result, StudioError};
use image::{imageops, imageops::FilterType, DynamicImage, GrayImage, Luma};
use std::str::FromStr;

pub const EDIT: u8 = 255;
pub const KEEP: u8 = 0;
pub const DEFAULT_THRESHOLD: u8 = 128;

/// What counts as "painted" on a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintMode {
    /// White strokes over a dark background.
    Bright,
    /// Black strokes over a light background.
    Dark,
}

impl FromStr for PaintMode {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bright" | "white" => Ok(PaintMode::Bright),
            "dark" | "black" => Ok(PaintMode::Dark),
            other => Err(StudioError::validation(format!(
                "unknown paint mode '{}' (expected bright or dark)",
                other
            ))),
        }
    }
}

fn binary(edit: bool) -> Luma<u8> {
    Luma([if edit { EDIT } else { KEEP }])
}

/// Alpha of a transparent paint layer: any stroke coverage is an edit.
pub fn mask_from_alpha(canvas: &DynamicImage) -> GrayImage {
    let rgba = canvas.to_rgba8();
    GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        binary(rgba.get_pixel(x, y).0[3] > 0)
    })
}

/// Thresholds the luma of a painted canvas.
pub fn mask_from_paint(canvas: &DynamicImage, mode: PaintMode, threshold: u8) -> GrayImage {
    let gray = canvas.to_luma8();
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let luma = gray.get_pixel(x, y).0[0];
        binary(match mode {
            PaintMode::Bright => luma > threshold,
            PaintMode::Dark => luma < threshold,
        })
    })
}

/// Marks pixels where `painted` differs from `original` by more than
/// `threshold` in any colour channel.
pub fn mask_from_diff(
    original: &DynamicImage,
    painted: &DynamicImage,
    threshold: u8,
) -> Result<GrayImage> {
    if original.width() != painted.width() || original.height() != painted.height() {
        return Err(StudioError::validation(format!(
            "painted canvas is {}x{} but the original is {}x{}",
            painted.width(),
            painted.height(),
            original.width(),
            original.height()
        )));
    }

    let before = original.to_rgb8();
    let after = painted.to_rgb8();
    Ok(GrayImage::from_fn(before.width(), before.height(), |x, y| {
        let a = before.get_pixel(x, y).0;
        let b = after.get_pixel(x, y).0;
        binary(a.iter().zip(b.iter()).any(|(p, q)| p.abs_diff(*q) > threshold))
    }))
}

/// Normalises an arbitrary user-supplied mask image.
pub fn binarize(mask: &DynamicImage, threshold: u8) -> GrayImage {
    mask_from_paint(mask, PaintMode::Bright, threshold)
}

/// Scales a mask to the image it belongs to. Nearest-neighbour keeps it binary.
pub fn fit_to(mask: &GrayImage, width: u32, height: u32) -> GrayImage {
    if mask.dimensions() == (width, height) {
        return mask.clone();
    }
    imageops::resize(mask, width, height, FilterType::Nearest)
}

pub fn coverage(mask: &GrayImage) -> f64 {
    let total = mask.width() as u64 * mask.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let painted = mask.pixels().filter(|p| p.0[0] == EDIT).count() as u64;
    painted as f64 / total as f64
}

/// Preset shapes, drawn white on black.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Rect {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    /// Ellipse inscribed in the given box.
    Ellipse {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    /// A band of `thickness` pixels along every edge.
    Border { thickness: u32 },
}

impl Shape {
    pub fn contains(&self, px: u32, py: u32, image_width: u32, image_height: u32) -> bool {
        match *self {
            Shape::Rect {
                x,
                y,
                width,
                height,
            } => {
                px >= x && py >= y && px - x < width && py - y < height
            }
            Shape::Ellipse {
                x,
                y,
                width,
                height,
            } => {
                if width == 0 || height == 0 {
                    return false;
                }
                let rx = width as f64 / 2.0;
                let ry = height as f64 / 2.0;
                let dx = (px as f64 + 0.5 - (x as f64 + rx)) / rx;
                let dy = (py as f64 + 0.5 - (y as f64 + ry)) / ry;
                dx * dx + dy * dy <= 1.0
            }
            Shape::Border { thickness } => {
                px < thickness
                    || py < thickness
                    || px + thickness >= image_width
                    || py + thickness >= image_height
            }
        }
    }

    pub fn draw(&self, width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| binary(self.contains(x, y, width, height)))
    }
}

/// Parses `rect:x,y,w,h`, `ellipse:x,y,w,h` or `border:thickness`.
impl FromStr for Shape {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, args) = s
            .split_once(':')
            .ok_or_else(|| StudioError::validation(format!("invalid shape '{}'", s)))?;
        let numbers = args
            .split(',')
            .map(|n| n.trim().parse::<u32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| StudioError::validation(format!("invalid shape numbers in '{}'", s)))?;

        match (kind.trim().to_ascii_lowercase().as_str(), numbers.as_slice()) {
            ("rect", [x, y, width, height]) => Ok(Shape::Rect {
                x: *x,
                y: *y,
                width: *width,
                height: *height,
            }),
            ("ellipse", [x, y, width, height]) => Ok(Shape::Ellipse {
                x: *x,
                y: *y,
                width: *width,
                height: *height,
            }),
            ("border", [thickness]) => Ok(Shape::Border {
                thickness: *thickness,
            }),
            _ => Err(StudioError::validation(format!(
                "invalid shape '{}' (expected rect:x,y,w,h, ellipse:x,y,w,h or border:n)",
                s
            ))),
        }
    }
}

/// Union of several shapes.
pub fn draw_shapes(shapes: &[Shape], width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        binary(shapes.iter().any(|s| s.contains(x, y, width, height)))
    })
}
