//! Core use-case services.
//!
//! # Responsibility
//! - `session`: orchestrate workspace, local store, remote and timers.
//! - `markdown_export`: project a page into a markdown outline.

pub mod markdown_export;
pub mod session;
