//! Flyer generation engine
//!
//! This module contains the core compositing logic:
//! - Layout resolution (frame, overlays, text, safe zones)
//! - Overlay transform composition
//! - Text line building, word wrap, and glyph rendering
//! - Date and location formatting
//! - The compositing pipeline itself

pub mod compositor;
pub mod format;
pub mod layout;
pub mod text;
pub mod transform;

pub use compositor::{Compositor, GeneratedImage, RenderError};
pub use layout::{resolve, ResolvedGeometry};
