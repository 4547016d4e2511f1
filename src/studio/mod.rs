pub mod panels;

use crate::{error::Result, stability::StabilityClient};
use std::fmt;

pub use panels::{build_mask, EraseForm, InpaintForm, MaskSource, PanelAction, PanelOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    Generate,
    Upscale,
    Edit,
    Mask,
}

impl Page {
    pub const FEATURES: [Page; 4] = [Page::Generate, Page::Upscale, Page::Edit, Page::Mask];

    pub fn title(&self) -> &'static str {
        match self {
            Page::Home => "🏠 Home",
            Page::Generate => "✨ Generate",
            Page::Upscale => "📈 Upscale",
            Page::Edit => "✏️ Edit",
            Page::Mask => "🖌️ Mask",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Page::Home => "Your personal AI-powered image creation and editing suite",
            Page::Generate => "Create images from text prompts using the latest AI models",
            Page::Upscale => "Enhance image resolution and quality",
            Page::Edit => {
                "Inpaint, outpaint, erase, replace or recolor parts of an image, or remove its background"
            }
            Page::Mask => "Build inpainting masks from painted canvases or preset shapes",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    Success(String),
    Error(String),
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusMessage::Success(msg) => write!(f, "🎉 {}", msg),
            StatusMessage::Error(msg) => write!(f, "❌ {}", msg),
        }
    }
}

/// Routes panel actions and holds what the user currently sees. A failed
/// action only adds an error message; the last good output stays in place.
pub struct Studio {
    client: Option<StabilityClient>,
    current: Option<PanelOutput>,
    messages: Vec<StatusMessage>,
}

impl Studio {
    pub fn new(client: Option<StabilityClient>) -> Self {
        Self {
            client,
            current: None,
            messages: Vec::new(),
        }
    }

    pub fn overview() -> Vec<(Page, &'static str)> {
        Page::FEATURES
            .iter()
            .map(|page| (*page, page.description()))
            .collect()
    }

    pub async fn dispatch(&mut self, action: PanelAction) -> Result<&PanelOutput> {
        let page = action.page();
        log::info!("{} panel", page.title());

        match panels::run(self.client.as_ref(), action).await {
            Ok(output) => {
                self.messages.push(StatusMessage::Success(format!(
                    "{} ready ({}x{})",
                    output.file_name(),
                    output.width,
                    output.height
                )));
                let shown: &PanelOutput = self.current.insert(output);
                Ok(shown)
            }
            Err(e) => {
                log::error!("{} failed: {}", page.title(), e);
                self.messages.push(StatusMessage::Error(e.to_string()));
                Err(e)
            }
        }
    }

    pub fn current(&self) -> Option<&PanelOutput> {
        self.current.as_ref()
    }

    pub fn last_message(&self) -> Option<&StatusMessage> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{self, tests::png_bytes};
    use crate::models::GenerateRequest;
    use crate::stability::tests::client_with;
    use crate::stability::transport::{testing::ScriptedTransport, ApiResponse};
    use std::sync::Arc;

    #[tokio::test]
    async fn failed_call_keeps_previous_output() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ApiResponse::new(200, "image/png", png_bytes(10, 10)),
            ApiResponse::new(402, "application/json", r#"{"errors":["insufficient credits"]}"#),
        ]));
        let mut studio = Studio::new(Some(client_with(transport)));

        studio
            .dispatch(PanelAction::Generate(GenerateRequest::new("a red fox")))
            .await
            .unwrap();
        let before = studio.current().unwrap().bytes.clone();

        let err = studio
            .dispatch(PanelAction::Generate(GenerateRequest::new("a blue fox")))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(402));

        assert_eq!(studio.current().unwrap().bytes, before);
        match studio.last_message().unwrap() {
            StatusMessage::Error(msg) => {
                assert!(msg.contains("402"));
                assert!(msg.contains("insufficient credits"));
            }
            other => panic!("expected an error message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn generated_file_name_follows_style_and_aspect() {
        let transport = Arc::new(ScriptedTransport::new(vec![ApiResponse::new(
            200,
            "image/png",
            png_bytes(10, 10),
        )]));
        let mut studio = Studio::new(Some(client_with(transport)));

        let output = studio
            .dispatch(PanelAction::Generate(GenerateRequest::new("a red fox")))
            .await
            .unwrap();
        assert_eq!(output.file_name(), "generated_enhance_1-1.png");
        assert_eq!(output.page, Page::Generate);
    }

    #[tokio::test]
    async fn empty_prompt_is_reported_without_network() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let mut studio = Studio::new(Some(client_with(transport.clone())));

        let image = imaging::load_image(png_bytes(8, 8)).unwrap();
        let result = studio
            .dispatch(PanelAction::Outpaint(
                crate::models::OutpaintRequest::new(image, "")
                    .with_direction(crate::models::OutpaintDirection::All),
            ))
            .await;
        assert!(result.is_err());
        assert_eq!(transport.request_count(), 0);
        assert!(studio.current().is_none());
    }

    #[test]
    fn overview_lists_every_feature_page() {
        let pages: Vec<Page> = Studio::overview().into_iter().map(|(p, _)| p).collect();
        assert_eq!(pages, Page::FEATURES.to_vec());
    }
}
