//! In-memory graph model.
//!
//! # Responsibility
//! - Own the workspace context object and its structural mutations.
//! - Answer pure read queries over one page.
//!
//! # Invariants
//! - Pages are forests: single parent per node, no cycles created here.
//! - Mutations are synchronous and never expose partial state.

pub mod templates;
pub mod view;
pub mod workspace;
