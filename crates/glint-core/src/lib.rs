//! Glint Core - Foundational types for the Glint renderer
//!
//! This crate provides the core types that all other Glint crates depend on:
//! - `Vec3`, `Transform`, `Color` - Spatial and color types
//! - Column-major 4x4 matrix helpers
//! - Error types and Result alias

mod error;
mod types;

pub use error::{GlintError, Result};
pub use types::{mat4_inverse, mat4_mul, mat4_transform_point, Color, Transform, Vec3};
