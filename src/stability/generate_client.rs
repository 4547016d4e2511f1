use super::{response, transport::FormData, Api, ACCEPT_IMAGE};
use crate::{
    error::{Result, StudioError},
    models::{non_blank, GenerateModel, GenerateRequest, ImageResult, StylePreset},
};

#[derive(Clone)]
pub struct GenerateClient {
    api: Api,
}

impl GenerateClient {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    /// `(id, name, description)` for each text-to-image model.
    pub fn supported_models() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            (
                GenerateModel::Ultra.as_str(),
                "Stable Image Ultra",
                "highest quality, photorealistic output",
            ),
            (
                GenerateModel::Core.as_str(),
                "Stable Image Core",
                "fast and affordable general generation",
            ),
            (
                GenerateModel::Sd3.as_str(),
                "Stable Diffusion 3",
                "open model family, no style presets",
            ),
        ]
    }

    fn build_form(&self, request: &GenerateRequest) -> FormData {
        let mut form = FormData::new()
            .text("prompt", request.prompt.trim())
            .text("aspect_ratio", request.aspect_ratio)
            .text("output_format", self.api.config().output_format);

        if let Some(negative) = non_blank(&request.negative_prompt) {
            form = form.text("negative_prompt", negative);
        }
        if let Some(style) = request.style.form_value() {
            form = form.text("style_preset", style);
        }
        if request.model == GenerateModel::Sd3 {
            form = form.text("mode", "text-to-image");
        }
        form.text_opt("seed", request.seed)
    }

    pub async fn generate(&self, request: GenerateRequest) -> Result<ImageResult> {
        request.validate()?;
        if request.model == GenerateModel::Sd3 && request.style != StylePreset::Enhance {
            return Err(StudioError::validation(
                "style presets are not available for sd3",
            ));
        }

        log::info!(
            "Generating image with model: {} (style: {}, aspect: {})",
            request.model.as_str(),
            request.style,
            request.aspect_ratio
        );

        let form = self.build_form(&request);
        let response = self
            .api
            .post_form(request.model.path(), form, ACCEPT_IMAGE)
            .await?;
        response::expect_image(response)
    }
}

#[cfg(test)]
mod tests {
    use crate::imaging::tests::png_bytes;
    use crate::models::{AspectRatio, GenerateRequest, StylePreset};
    use crate::stability::tests::client_with;
    use crate::stability::transport::{testing::ScriptedTransport, ApiResponse};
    use crate::StudioError;
    use std::sync::Arc;

    #[tokio::test]
    async fn sends_only_meaningful_optional_fields() {
        let transport = Arc::new(ScriptedTransport::new(vec![ApiResponse::new(
            200,
            "image/png",
            png_bytes(16, 9),
        )]));
        let client = client_with(transport.clone());

        let request = GenerateRequest::new("A serene mountain landscape at sunset")
            .with_negative_prompt("   ")
            .with_aspect_ratio(AspectRatio::Landscape16x9);
        let image = client.generate().generate(request).await.unwrap();
        assert_eq!((image.width, image.height), (16, 9));

        let sent = transport.request(0);
        assert!(sent.url.ends_with("/v2beta/stable-image/generate/ultra"));
        let form = sent.form.unwrap();
        assert_eq!(form.get_text("aspect_ratio"), Some("16:9"));
        assert_eq!(form.get_text("output_format"), Some("png"));
        assert!(!form.has("negative_prompt"));
        assert!(!form.has("style_preset"));
        assert!(!form.has("seed"));
    }

    #[tokio::test]
    async fn style_and_seed_are_forwarded() {
        let transport = Arc::new(ScriptedTransport::new(vec![ApiResponse::new(
            200,
            "image/png",
            png_bytes(4, 4),
        )]));
        let client = client_with(transport.clone());

        let request = GenerateRequest::new("neon city")
            .with_style(StylePreset::NeonPunk)
            .with_seed(42);
        client.generate().generate(request).await.unwrap();

        let form = transport.request(0).form.unwrap();
        assert_eq!(form.get_text("style_preset"), Some("neon-punk"));
        assert_eq!(form.get_text("seed"), Some("42"));
    }

    #[tokio::test]
    async fn empty_prompt_never_reaches_the_network() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let client = client_with(transport.clone());

        let err = client
            .generate()
            .generate(GenerateRequest::new("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::ValidationError(_)));
        assert_eq!(transport.request_count(), 0);
    }
}
