pub mod manifest;
pub mod types;

pub use manifest::ClipManifest;
pub use types::*;
