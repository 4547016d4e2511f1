pub mod common;
pub mod edit;
pub mod generate;
pub mod upscale;

pub use common::*;
pub use edit::*;
pub use generate::*;
pub use upscale::*;
