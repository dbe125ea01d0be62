//! Layout algorithms for page display.
//!
//! Layout never renders; it only assigns world coordinates to nodes.

pub mod radial;

pub use radial::{compute_radial_layout, layout_page, LayoutParams, RadialLayout};
