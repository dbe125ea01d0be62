//! In-memory search entry points.
//!
//! # Responsibility
//! - Query node labels and notes across every page of a workspace.
//! - Keep result shaping (page context, notes preview) inside core.

pub mod node_search;
