use super::common::{check_seed, require_prompt, AspectRatio, StylePreset};
use crate::error::{Result, StudioError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GenerateModel {
    #[default]
    Ultra,
    Core,
    Sd3,
}

impl GenerateModel {
    pub fn path(&self) -> &'static str {
        match self {
            GenerateModel::Ultra => "generate/ultra",
            GenerateModel::Core => "generate/core",
            GenerateModel::Sd3 => "generate/sd3",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GenerateModel::Ultra => "ultra",
            GenerateModel::Core => "core",
            GenerateModel::Sd3 => "sd3",
        }
    }
}

impl FromStr for GenerateModel {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ultra" => Ok(GenerateModel::Ultra),
            "core" => Ok(GenerateModel::Core),
            "sd3" => Ok(GenerateModel::Sd3),
            other => Err(StudioError::validation(format!(
                "unknown model '{}' (expected ultra, core or sd3)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct GenerateRequest {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    #[serde(default)]
    pub style: StylePreset,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    pub seed: Option<u64>,
    #[serde(default)]
    pub model: GenerateModel,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        GenerateRequest {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_negative_prompt(mut self, negative: impl Into<String>) -> Self {
        self.negative_prompt = Some(negative.into());
        self
    }

    pub fn with_style(mut self, style: StylePreset) -> Self {
        self.style = style;
        self
    }

    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = ratio;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_model(mut self, model: GenerateModel) -> Self {
        self.model = model;
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_prompt("prompt", &self.prompt)?;
        check_seed(self.seed)
    }
}
