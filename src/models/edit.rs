use super::common::{check_range, check_seed, require_prompt, ImageInput};
use crate::error::{Result, StudioError};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MAX_OUTPAINT_PIXELS: u32 = 2000;
/// Pixels added per side by the direction presets.
pub const OUTPAINT_STEP: u32 = 32;
pub const MAX_GROW_MASK: u32 = 100;

#[derive(Debug, Clone)]
pub struct RemoveBackgroundRequest {
    pub image: ImageInput,
}

#[derive(Debug, Clone)]
pub struct InpaintRequest {
    pub image: ImageInput,
    /// White marks pixels to regenerate, black pixels to keep.
    pub mask: GrayImage,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub grow_mask: Option<u32>,
    pub seed: Option<u64>,
}

impl InpaintRequest {
    pub fn new(image: ImageInput, mask: GrayImage, prompt: impl Into<String>) -> Self {
        InpaintRequest {
            image,
            mask,
            prompt: prompt.into(),
            negative_prompt: None,
            grow_mask: None,
            seed: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_prompt("prompt", &self.prompt)?;
        check_mask(&self.image, &self.mask)?;
        check_grow_mask(self.grow_mask)?;
        check_seed(self.seed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutpaintDirection {
    Up,
    Down,
    Left,
    Right,
    All,
}

impl OutpaintDirection {
    /// `(left, right, up, down)` pixel counts for this preset.
    pub fn extents(&self) -> (u32, u32, u32, u32) {
        let pick = |side: OutpaintDirection| {
            if *self == side || *self == OutpaintDirection::All {
                OUTPAINT_STEP
            } else {
                0
            }
        };
        (
            pick(OutpaintDirection::Left),
            pick(OutpaintDirection::Right),
            pick(OutpaintDirection::Up),
            pick(OutpaintDirection::Down),
        )
    }
}

impl fmt::Display for OutpaintDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutpaintDirection::Up => "up",
            OutpaintDirection::Down => "down",
            OutpaintDirection::Left => "left",
            OutpaintDirection::Right => "right",
            OutpaintDirection::All => "all",
        };
        f.write_str(name)
    }
}

impl FromStr for OutpaintDirection {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(OutpaintDirection::Up),
            "down" => Ok(OutpaintDirection::Down),
            "left" => Ok(OutpaintDirection::Left),
            "right" => Ok(OutpaintDirection::Right),
            "all" => Ok(OutpaintDirection::All),
            other => Err(StudioError::validation(format!(
                "unknown outpaint direction '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutpaintRequest {
    pub image: ImageInput,
    pub prompt: String,
    pub left: u32,
    pub right: u32,
    pub up: u32,
    pub down: u32,
    pub creativity: Option<f32>,
    pub seed: Option<u64>,
}

impl OutpaintRequest {
    pub fn new(image: ImageInput, prompt: impl Into<String>) -> Self {
        OutpaintRequest {
            image,
            prompt: prompt.into(),
            left: 0,
            right: 0,
            up: 0,
            down: 0,
            creativity: None,
            seed: None,
        }
    }

    pub fn with_direction(mut self, direction: OutpaintDirection) -> Self {
        let (left, right, up, down) = direction.extents();
        self.left = left;
        self.right = right;
        self.up = up;
        self.down = down;
        self
    }

    pub fn with_extents(mut self, left: u32, right: u32, up: u32, down: u32) -> Self {
        self.left = left;
        self.right = right;
        self.up = up;
        self.down = down;
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_prompt("prompt", &self.prompt)?;
        let sides = [
            ("left", self.left),
            ("right", self.right),
            ("up", self.up),
            ("down", self.down),
        ];
        for (name, pixels) in sides {
            if pixels > MAX_OUTPAINT_PIXELS {
                return Err(StudioError::validation(format!(
                    "{} must be at most {} pixels, got {}",
                    name, MAX_OUTPAINT_PIXELS, pixels
                )));
            }
        }
        if sides.iter().all(|(_, pixels)| *pixels == 0) {
            return Err(StudioError::validation(
                "outpaint needs at least one side to extend",
            ));
        }
        check_range("creativity", self.creativity, 0.0, 1.0)?;
        check_seed(self.seed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightSource {
    Left,
    Right,
    Above,
    Below,
}

impl LightSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LightSource::Left => "left",
            LightSource::Right => "right",
            LightSource::Above => "above",
            LightSource::Below => "below",
        }
    }
}

impl FromStr for LightSource {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(LightSource::Left),
            "right" => Ok(LightSource::Right),
            "above" => Ok(LightSource::Above),
            "below" => Ok(LightSource::Below),
            other => Err(StudioError::validation(format!(
                "unknown light source direction '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReplaceBackgroundRequest {
    pub subject_image: ImageInput,
    pub background_prompt: String,
    pub foreground_prompt: Option<String>,
    pub negative_prompt: Option<String>,
    pub preserve_original_subject: Option<f32>,
    /// Use the relight endpoint, which runs as an asynchronous job.
    pub relight: bool,
    pub light_source_direction: Option<LightSource>,
    pub light_source_strength: Option<f32>,
    pub seed: Option<u64>,
}

impl ReplaceBackgroundRequest {
    pub fn new(subject_image: ImageInput, background_prompt: impl Into<String>) -> Self {
        ReplaceBackgroundRequest {
            subject_image,
            background_prompt: background_prompt.into(),
            foreground_prompt: None,
            negative_prompt: None,
            preserve_original_subject: None,
            relight: false,
            light_source_direction: None,
            light_source_strength: None,
            seed: None,
        }
    }

    pub fn path(&self) -> &'static str {
        if self.relight {
            "edit/replace-background-and-relight"
        } else {
            "edit/replace-background"
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_prompt("background_prompt", &self.background_prompt)?;
        check_range(
            "preserve_original_subject",
            self.preserve_original_subject,
            0.0,
            1.0,
        )?;
        if !self.relight
            && (self.light_source_direction.is_some() || self.light_source_strength.is_some())
        {
            return Err(StudioError::validation(
                "light source options need the relight variant",
            ));
        }
        if self.light_source_strength.is_some() && self.light_source_direction.is_none() {
            return Err(StudioError::validation(
                "light_source_strength requires light_source_direction",
            ));
        }
        check_range("light_source_strength", self.light_source_strength, 0.0, 1.0)?;
        check_seed(self.seed)
    }
}

#[derive(Debug, Clone)]
pub struct SearchReplaceRequest {
    pub image: ImageInput,
    pub search_prompt: String,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub seed: Option<u64>,
}

impl SearchReplaceRequest {
    pub fn new(
        image: ImageInput,
        search_prompt: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        SearchReplaceRequest {
            image,
            search_prompt: search_prompt.into(),
            prompt: prompt.into(),
            negative_prompt: None,
            seed: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_prompt("search_prompt", &self.search_prompt)?;
        require_prompt("prompt", &self.prompt)?;
        check_seed(self.seed)
    }
}

#[derive(Debug, Clone)]
pub struct SearchRecolorRequest {
    pub image: ImageInput,
    pub select_prompt: String,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub seed: Option<u64>,
}

impl SearchRecolorRequest {
    pub fn new(
        image: ImageInput,
        select_prompt: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        SearchRecolorRequest {
            image,
            select_prompt: select_prompt.into(),
            prompt: prompt.into(),
            negative_prompt: None,
            seed: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_prompt("select_prompt", &self.select_prompt)?;
        require_prompt("prompt", &self.prompt)?;
        check_seed(self.seed)
    }
}

#[derive(Debug, Clone)]
pub struct EraseRequest {
    pub image: ImageInput,
    pub mask: GrayImage,
    pub grow_mask: Option<u32>,
    pub seed: Option<u64>,
}

impl EraseRequest {
    pub fn new(image: ImageInput, mask: GrayImage) -> Self {
        EraseRequest {
            image,
            mask,
            grow_mask: None,
            seed: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_mask(&self.image, &self.mask)?;
        check_grow_mask(self.grow_mask)?;
        check_seed(self.seed)
    }
}

fn check_mask(image: &ImageInput, mask: &GrayImage) -> Result<()> {
    if mask.dimensions() != (image.width, image.height) {
        return Err(StudioError::validation(format!(
            "mask is {}x{} but the image is {}x{}",
            mask.width(),
            mask.height(),
            image.width,
            image.height
        )));
    }
    if mask.pixels().all(|p| p.0[0] == 0) {
        return Err(StudioError::validation(
            "mask is empty, paint the areas to edit first",
        ));
    }
    Ok(())
}

fn check_grow_mask(grow_mask: Option<u32>) -> Result<()> {
    match grow_mask {
        Some(px) if px > MAX_GROW_MASK => Err(StudioError::validation(format!(
            "grow_mask must be at most {}, got {}",
            MAX_GROW_MASK, px
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OutputFormat;
    use image::Luma;

    fn input(width: u32, height: u32) -> ImageInput {
        ImageInput {
            bytes: vec![],
            format: OutputFormat::Png,
            width,
            height,
        }
    }

    #[test]
    fn direction_presets_expand_by_step() {
        assert_eq!(OutpaintDirection::Up.extents(), (0, 0, OUTPAINT_STEP, 0));
        assert_eq!(OutpaintDirection::Left.extents(), (OUTPAINT_STEP, 0, 0, 0));
        assert_eq!(
            OutpaintDirection::All.extents(),
            (OUTPAINT_STEP, OUTPAINT_STEP, OUTPAINT_STEP, OUTPAINT_STEP)
        );
    }

    #[test]
    fn outpaint_needs_a_side() {
        let req = OutpaintRequest::new(input(8, 8), "more sea");
        assert!(req.validate().is_err());
        let req = req.with_direction(OutpaintDirection::Down);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn outpaint_side_is_capped() {
        let req = OutpaintRequest::new(input(8, 8), "more sea").with_extents(0, 2001, 0, 0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn inpaint_rejects_blank_mask_and_size_mismatch() {
        let blank = GrayImage::new(4, 4);
        let req = InpaintRequest::new(input(4, 4), blank, "a cat");
        assert!(req.validate().is_err());

        let painted = GrayImage::from_pixel(2, 2, Luma([255]));
        let req = InpaintRequest::new(input(4, 4), painted, "a cat");
        assert!(req.validate().is_err());

        let painted = GrayImage::from_pixel(4, 4, Luma([255]));
        assert!(InpaintRequest::new(input(4, 4), painted, "a cat")
            .validate()
            .is_ok());
    }

    #[test]
    fn light_options_need_relight() {
        let mut req = ReplaceBackgroundRequest::new(input(4, 4), "a beach at dusk");
        req.light_source_direction = Some(LightSource::Above);
        assert!(req.validate().is_err());
        req.relight = true;
        assert!(req.validate().is_ok());
        assert_eq!(req.path(), "edit/replace-background-and-relight");
    }

    #[test]
    fn search_recolor_requires_both_prompts() {
        let req = SearchRecolorRequest::new(input(4, 4), "the car", "");
        assert!(req.validate().is_err());
        let req = SearchRecolorRequest::new(input(4, 4), " ", "bright red");
        assert!(req.validate().is_err());
    }
}
