pub mod common;
pub mod gemini;
pub mod history;
pub mod image;
pub mod prompt;

pub use common::*;
pub use history::*;
pub use image::*;
pub use prompt::*;
