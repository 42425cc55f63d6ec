//! Font registry
//!
//! Glyph availability is a capability the compositor awaits before its text
//! step, so fonts live in an explicit per-instance registry instead of a
//! process-global set. Tests get isolated registries for free.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use rusttype::Font;
use thiserror::Error;
use tracing::{debug, warn};

/// Font registration errors
#[derive(Debug, Error)]
pub enum FontError {
    #[error("failed to parse font data for '{0}'")]
    Parse(String),
    #[error("no font registered under '{0}'")]
    NotRegistered(String),
}

/// Owns parsed font faces, keyed by family name.
///
/// Weight-specific faces are registered under their own names (for example
/// `"Inter"` and `"Inter 700"`); resolution tries the weighted name first,
/// then the family, then the configured fallback, then any registered face.
pub struct FontRegistry {
    faces: RwLock<BTreeMap<String, Arc<Font<'static>>>>,
    fallback: RwLock<Option<String>>,
}

impl FontRegistry {
    pub fn new() -> Self {
        FontRegistry {
            faces: RwLock::new(BTreeMap::new()),
            fallback: RwLock::new(None),
        }
    }

    /// Parse and register a face. The first registered face becomes the
    /// fallback until one is chosen explicitly.
    pub fn register(&self, name: &str, bytes: Vec<u8>) -> Result<(), FontError> {
        let font = Font::try_from_vec(bytes).ok_or_else(|| FontError::Parse(name.to_string()))?;

        let mut faces = self.faces.write();
        faces.insert(name.to_string(), Arc::new(font));

        let mut fallback = self.fallback.write();
        if fallback.is_none() {
            *fallback = Some(name.to_string());
        }

        debug!(family = name, registered = faces.len(), "Registered font face");
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.faces.read().contains_key(name)
    }

    /// Choose the face used when a requested family cannot be resolved.
    pub fn set_fallback(&self, name: &str) -> Result<(), FontError> {
        if !self.is_registered(name) {
            return Err(FontError::NotRegistered(name.to_string()));
        }
        *self.fallback.write() = Some(name.to_string());
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.faces.read().is_empty()
    }

    /// Resolve a family and weight to a face, best-effort.
    ///
    /// A slightly-wrong typeface beats aborting a bulk batch, so this walks
    /// weighted name, family name, fallback, then any registered face, and
    /// only returns `None` when the registry is empty.
    pub fn resolve(&self, family: &str, weight: u16) -> Option<Arc<Font<'static>>> {
        let faces = self.faces.read();

        let weighted = format!("{} {}", family, weight);
        if let Some(font) = faces.get(&weighted) {
            return Some(font.clone());
        }
        if let Some(font) = faces.get(family) {
            return Some(font.clone());
        }

        if let Some(name) = self.fallback.read().as_ref() {
            if let Some(font) = faces.get(name) {
                warn!(requested = family, fallback = %name, "Font family not registered, using fallback");
                return Some(font.clone());
            }
        }

        // BTreeMap iteration keeps the last resort deterministic
        faces.values().next().cloned()
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}
