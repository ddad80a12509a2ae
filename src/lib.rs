//! # Compilation-Engine
//!
//! Turn a pool of image and GIF clips, each with optional narration, into
//! long-form (16:9) or short-form (9:16) compilation videos using ffmpeg.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use compilation_engine::{
//!     clip::{ClipManifest, VideoType},
//!     composition::CompilationEngine,
//!     config::Config,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let mut manifest = ClipManifest::load("clips.toml")?;
//! let engine = CompilationEngine::new(Config::default());
//!
//! let result = engine
//!     .compile(&manifest.available_for(VideoType::Shorts), VideoType::Shorts)
//!     .await;
//!
//! if result.success {
//!     manifest.mark_consumed(&result.used_clip_ids, VideoType::Shorts)?;
//!     manifest.save("clips.toml")?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`clip`] - Clip data model, video profiles and the TOML clip manifest
//! - [`media`] - Probing, image normalization, segment and gap rendering, concatenation
//! - [`composition`] - Clip selection, duration budgeting and the run orchestrator
//! - [`config`] - Configuration management
//!
//! Every segment of a run is encoded with the same fixed profile
//! ([`media::encoding::STANDARD`]) so the final concatenation never mixes
//! stream parameters. The engine only reports which clips it used; applying
//! that to the clip pool is the caller's job.

pub mod clip;
pub mod composition;
pub mod config;
pub mod error;
pub mod media;

#[cfg(test)]
mod test_support;

// Re-export commonly used types for convenience
pub use crate::{
    clip::{Clip, ClipManifest, CompilationResult, VideoType},
    composition::CompilationEngine,
    config::Config,
    error::{CompilerError, Result},
};
