//! A typed client and command-line studio for the Stability AI
//! `v2beta/stable-image` API: generation, upscaling, inpainting, outpainting,
//! background and search edits, plus local mask synthesis.

pub mod cli;
pub mod config;
pub mod error;
pub mod imaging;
pub mod logger;
pub mod mask;
pub mod models;
pub mod stability;
pub mod studio;

pub use config::{Config, StabilityConfig};
pub use error::{Result, StudioError};
pub use models::*;
pub use stability::{EditClient, GenerateClient, StabilityClient, UpscaleClient};
pub use studio::{Page, PanelAction, PanelOutput, Studio};
