//! Listing content generator - turns real-estate listing material into a
//! short-video script and a social post.
//!
//! Generation requests go through a model-fallback executor that walks an
//! ordered preference list of Gemini models, and model output is parsed by a
//! recovery parser that tolerates code fences and stray backslashes.

pub mod ai;
pub mod app;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod fallback;
pub mod models;
pub mod prompts;
pub mod rate_limit;
pub mod recovery;

pub use error::{Error, Result};
