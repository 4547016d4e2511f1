//! Feature panels. Each one takes the collected form values, calls the API
//! (or the local mask tools) and describes the result.

use super::Page;
use crate::{
    error::{Result, StudioError},
    imaging,
    mask::{self, PaintMode, Shape},
    models::{
        EraseRequest, GenerateRequest, ImageInput, ImageResult, InpaintRequest,
        OutpaintRequest, OutputFormat, RemoveBackgroundRequest, ReplaceBackgroundRequest,
        SearchRecolorRequest, SearchReplaceRequest, UpscaleRequest,
    },
    stability::StabilityClient,
};
use image::{DynamicImage, GrayImage};

/// Where an inpaint or erase mask comes from.
#[derive(Debug, Clone)]
pub enum MaskSource {
    /// A ready-made mask image, binarized at `threshold`.
    Image { mask: DynamicImage, threshold: u8 },
    /// Strokes on a canvas, picked out by brightness or darkness.
    Paint {
        canvas: DynamicImage,
        mode: PaintMode,
        threshold: u8,
    },
    /// A transparent stroke layer; any coverage counts.
    Alpha { canvas: DynamicImage },
    /// A painted copy of the image compared against the original.
    Diff { painted: DynamicImage, threshold: u8 },
    Shapes(Vec<Shape>),
}

/// Builds a binary mask at the image's own size. Canvases may be painted at
/// display size and are scaled back up.
pub fn build_mask(image: &ImageInput, source: &MaskSource) -> Result<GrayImage> {
    let raw = match source {
        MaskSource::Image { mask, threshold } => mask::binarize(mask, *threshold),
        MaskSource::Paint {
            canvas,
            mode,
            threshold,
        } => mask::mask_from_paint(canvas, *mode, *threshold),
        MaskSource::Alpha { canvas } => mask::mask_from_alpha(canvas),
        MaskSource::Diff { painted, threshold } => {
            let original = imaging::decode(image)?;
            let reference = if (painted.width(), painted.height())
                == (original.width(), original.height())
            {
                original
            } else {
                imaging::resize_for_display(&original)
            };
            mask::mask_from_diff(&reference, painted, *threshold)?
        }
        MaskSource::Shapes(shapes) => {
            if shapes.is_empty() {
                return Err(StudioError::validation("no mask shapes given"));
            }
            mask::draw_shapes(shapes, image.width, image.height)
        }
    };
    Ok(mask::fit_to(&raw, image.width, image.height))
}

#[derive(Debug, Clone)]
pub struct InpaintForm {
    pub image: ImageInput,
    pub mask: MaskSource,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub grow_mask: Option<u32>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct EraseForm {
    pub image: ImageInput,
    pub mask: MaskSource,
    pub grow_mask: Option<u32>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone)]
pub enum PanelAction {
    Generate(GenerateRequest),
    Upscale(UpscaleRequest),
    RemoveBackground(ImageInput),
    Inpaint(InpaintForm),
    Outpaint(OutpaintRequest),
    ReplaceBackground(ReplaceBackgroundRequest),
    SearchReplace(SearchReplaceRequest),
    SearchRecolor(SearchRecolorRequest),
    Erase(EraseForm),
    /// Local only: export the mask a source would produce.
    Mask { image: ImageInput, source: MaskSource },
    /// Local only: export a display-sized copy to paint a mask on.
    Canvas(ImageInput),
}

impl PanelAction {
    pub fn page(&self) -> Page {
        match self {
            PanelAction::Generate(_) => Page::Generate,
            PanelAction::Upscale(_) => Page::Upscale,
            PanelAction::Mask { .. } | PanelAction::Canvas(_) => Page::Mask,
            _ => Page::Edit,
        }
    }

    pub fn needs_api(&self) -> bool {
        !matches!(self, PanelAction::Mask { .. } | PanelAction::Canvas(_))
    }
}

/// Result of a panel run, ready to be shown or saved.
#[derive(Debug, Clone)]
pub struct PanelOutput {
    pub page: Page,
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub file_stem: String,
    pub summary: Vec<String>,
}

impl PanelOutput {
    fn from_result(page: Page, result: ImageResult, file_stem: impl Into<String>) -> Self {
        let mut summary = vec![format!("Size: {}x{}", result.width, result.height)];
        if let Some(seed) = result.seed {
            summary.push(format!("Seed: {}", seed));
        }
        if let Some(reason) = &result.finish_reason {
            summary.push(format!("Finish reason: {}", reason));
        }
        PanelOutput {
            page,
            width: result.width,
            height: result.height,
            bytes: result.bytes,
            format: result.format,
            file_stem: file_stem.into(),
            summary,
        }
    }

    fn local(file_stem: &str, image: DynamicImage) -> Result<Self> {
        Ok(PanelOutput {
            page: Page::Mask,
            width: image.width(),
            height: image.height(),
            bytes: imaging::encode_png(&image)?,
            format: OutputFormat::Png,
            file_stem: file_stem.to_string(),
            summary: Vec::new(),
        })
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.file_stem, self.format.extension())
    }

    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

fn api(client: Option<&StabilityClient>) -> Result<&StabilityClient> {
    client.ok_or_else(|| {
        StudioError::ConfigError("STABILITY_API_KEY is required for this feature".into())
    })
}

pub async fn run(client: Option<&StabilityClient>, action: PanelAction) -> Result<PanelOutput> {
    match action {
        PanelAction::Generate(request) => generate_panel(api(client)?, request).await,
        PanelAction::Upscale(request) => upscale_panel(api(client)?, request).await,
        PanelAction::RemoveBackground(image) => {
            let result = api(client)?
                .edit()
                .remove_background(RemoveBackgroundRequest { image })
                .await?;
            Ok(PanelOutput::from_result(Page::Edit, result, "no_background"))
        }
        PanelAction::Inpaint(form) => inpaint_panel(api(client)?, form).await,
        PanelAction::Outpaint(request) => outpaint_panel(api(client)?, request).await,
        PanelAction::ReplaceBackground(request) => {
            let stem = if request.relight {
                "relit_background"
            } else {
                "replaced_background"
            };
            let result = api(client)?.edit().replace_background(request).await?;
            Ok(PanelOutput::from_result(Page::Edit, result, stem))
        }
        PanelAction::SearchReplace(request) => {
            let result = api(client)?.edit().search_and_replace(request).await?;
            Ok(PanelOutput::from_result(Page::Edit, result, "search_replaced"))
        }
        PanelAction::SearchRecolor(request) => {
            let result = api(client)?.edit().search_and_recolor(request).await?;
            Ok(PanelOutput::from_result(Page::Edit, result, "recolored"))
        }
        PanelAction::Erase(form) => {
            let mask = build_mask(&form.image, &form.mask)?;
            let mut request = EraseRequest::new(form.image, mask);
            request.grow_mask = form.grow_mask;
            request.seed = form.seed;
            let result = api(client)?.edit().erase(request).await?;
            Ok(PanelOutput::from_result(Page::Edit, result, "erased"))
        }
        PanelAction::Mask { image, source } => mask_panel(&image, &source),
        PanelAction::Canvas(image) => {
            let decoded = imaging::decode(&image)?;
            let mut output = PanelOutput::local("canvas", imaging::resize_for_display(&decoded))?;
            output.summary.push(format!(
                "Canvas {}x{} for a {}x{} image",
                output.width, output.height, image.width, image.height
            ));
            Ok(output)
        }
    }
}

async fn generate_panel(client: &StabilityClient, request: GenerateRequest) -> Result<PanelOutput> {
    let stem = format!(
        "generated_{}_{}",
        request.style,
        request.aspect_ratio.as_str().replace(':', "-")
    );
    let mut details = vec![format!(
        "Style: {} | Aspect: {} | Model: {}",
        request.style,
        request.aspect_ratio,
        request.model.as_str()
    )];
    if let Some(negative) = crate::models::non_blank(&request.negative_prompt) {
        details.push(format!("Negative prompt: {}", negative));
    }

    let result = client.generate().generate(request).await?;
    let mut output = PanelOutput::from_result(Page::Generate, result, stem);
    output.summary.push(format!("Pixels: {}", output.pixels()));
    output.summary.extend(details);
    Ok(output)
}

async fn upscale_panel(client: &StabilityClient, request: UpscaleRequest) -> Result<PanelOutput> {
    let before = request.image.pixels();
    let stem = format!("upscaled_{}", request.mode);

    let result = client.upscale().upscale(request).await?;
    let mut output = PanelOutput::from_result(Page::Upscale, result, stem);
    output.summary.push(format!(
        "Image enhanced by {:.1}x pixels",
        imaging::pixel_gain(before, output.pixels())
    ));
    Ok(output)
}

async fn inpaint_panel(client: &StabilityClient, form: InpaintForm) -> Result<PanelOutput> {
    let mask = build_mask(&form.image, &form.mask)?;
    let painted = mask::coverage(&mask);

    let mut request = InpaintRequest::new(form.image, mask, form.prompt);
    request.negative_prompt = form.negative_prompt;
    request.grow_mask = form.grow_mask;
    request.seed = form.seed;

    let result = client.edit().inpaint(request).await?;
    let mut output = PanelOutput::from_result(Page::Edit, result, "inpainted_image");
    output
        .summary
        .push(format!("Masked area: {:.1}%", painted * 100.0));
    Ok(output)
}

async fn outpaint_panel(client: &StabilityClient, request: OutpaintRequest) -> Result<PanelOutput> {
    let (was_width, was_height) = (request.image.width, request.image.height);

    let result = client.edit().outpaint(request).await?;
    let mut output = PanelOutput::from_result(Page::Edit, result, "outpainted_image");
    output.summary.push(format!(
        "New size: {}x{} (was {}x{})",
        output.width, output.height, was_width, was_height
    ));
    Ok(output)
}

fn mask_panel(image: &ImageInput, source: &MaskSource) -> Result<PanelOutput> {
    let mask = build_mask(image, source)?;
    let painted = mask::coverage(&mask);
    let mut output = PanelOutput::local("mask", DynamicImage::ImageLuma8(mask))?;
    output
        .summary
        .push(format!("Masked area: {:.1}%", painted * 100.0));
    if painted == 0.0 {
        output
            .summary
            .push("Mask is empty: nothing would be edited".to_string());
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::tests::png_bytes;
    use crate::models::{OutpaintDirection, UpscaleMode};
    use crate::stability::tests::client_with;
    use crate::stability::transport::{testing::ScriptedTransport, ApiResponse};
    use image::{Rgb, RgbImage};
    use std::sync::Arc;

    fn input(width: u32, height: u32) -> ImageInput {
        imaging::load_image(png_bytes(width, height)).unwrap()
    }

    fn png_reply(width: u32, height: u32) -> ApiResponse {
        ApiResponse::new(200, "image/png", png_bytes(width, height))
    }

    async fn run_with(reply: ApiResponse, action: PanelAction) -> PanelOutput {
        let client = client_with(Arc::new(ScriptedTransport::new(vec![reply])));
        run(Some(&client), action).await.unwrap()
    }

    #[tokio::test]
    async fn upscale_reports_the_pixel_gain() {
        let request = UpscaleRequest::new(input(8, 8), UpscaleMode::Conservative, "sharp photo");
        let output = run_with(png_reply(32, 32), PanelAction::Upscale(request)).await;

        assert_eq!(output.file_name(), "upscaled_conservative.png");
        assert_eq!(output.page, Page::Upscale);
        assert!(output
            .summary
            .contains(&"Image enhanced by 16.0x pixels".to_string()));
    }

    #[tokio::test]
    async fn outpaint_reports_old_and_new_size() {
        let request = OutpaintRequest::new(input(8, 8), "more sky")
            .with_direction(OutpaintDirection::All);
        let output = run_with(png_reply(72, 72), PanelAction::Outpaint(request)).await;

        assert_eq!(output.file_name(), "outpainted_image.png");
        assert!(output
            .summary
            .contains(&"New size: 72x72 (was 8x8)".to_string()));
    }

    #[tokio::test]
    async fn inpaint_reports_the_masked_area() {
        let form = InpaintForm {
            image: input(8, 8),
            mask: MaskSource::Shapes(vec![Shape::Rect {
                x: 0,
                y: 0,
                width: 4,
                height: 4,
            }]),
            prompt: "a red door".to_string(),
            negative_prompt: None,
            grow_mask: None,
            seed: None,
        };
        let output = run_with(png_reply(8, 8), PanelAction::Inpaint(form)).await;

        assert_eq!(output.file_name(), "inpainted_image.png");
        assert!(output.summary.contains(&"Masked area: 25.0%".to_string()));
    }

    #[tokio::test]
    async fn remove_background_keeps_the_returned_seed() {
        let reply = png_reply(8, 8).with_header("seed", "42");
        let output = run_with(reply, PanelAction::RemoveBackground(input(8, 8))).await;

        assert_eq!(output.file_name(), "no_background.png");
        assert_eq!(output.page, Page::Edit);
        assert!(output.summary.contains(&"Seed: 42".to_string()));
    }

    #[test]
    fn display_sized_canvas_is_scaled_to_the_image() {
        let image = input(1000, 500);
        let mut canvas = RgbImage::new(500, 250);
        canvas.put_pixel(10, 10, Rgb([255, 255, 255]));

        let mask = build_mask(
            &image,
            &MaskSource::Paint {
                canvas: DynamicImage::ImageRgb8(canvas),
                mode: PaintMode::Bright,
                threshold: 128,
            },
        )
        .unwrap();
        assert_eq!(mask.dimensions(), (1000, 500));
        assert_eq!(mask.get_pixel(20, 20).0[0], mask::EDIT);
        assert_eq!(mask.get_pixel(500, 250).0[0], mask::KEEP);
    }

    #[test]
    fn diff_against_display_sized_paint() {
        let image = input(1000, 500);
        let original = imaging::resize_for_display(&imaging::decode(&image).unwrap());
        let mut painted = original.to_rgb8();
        painted.put_pixel(0, 0, Rgb([255, 255, 255]));

        let mask = build_mask(
            &image,
            &MaskSource::Diff {
                painted: DynamicImage::ImageRgb8(painted),
                threshold: 20,
            },
        )
        .unwrap();
        assert_eq!(mask.dimensions(), (1000, 500));
        assert_eq!(mask.get_pixel(0, 0).0[0], mask::EDIT);
        assert_eq!(mask.get_pixel(999, 499).0[0], mask::KEEP);
    }

    #[test]
    fn empty_shape_list_is_rejected() {
        assert!(build_mask(&input(4, 4), &MaskSource::Shapes(vec![])).is_err());
    }

    #[tokio::test]
    async fn mask_and_canvas_work_without_a_client() {
        let output = run(
            None,
            PanelAction::Mask {
                image: input(8, 8),
                source: MaskSource::Shapes(vec![Shape::Border { thickness: 2 }]),
            },
        )
        .await
        .unwrap();
        assert_eq!(output.file_name(), "mask.png");
        assert_eq!((output.width, output.height), (8, 8));

        let canvas = run(None, PanelAction::Canvas(input(800, 400))).await.unwrap();
        assert_eq!((canvas.width, canvas.height), (500, 250));
    }

    #[tokio::test]
    async fn api_panels_need_a_client() {
        let err = run(None, PanelAction::RemoveBackground(input(4, 4)))
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::ConfigError(_)));
    }
}
