//! Template data model
//!
//! A template is a reusable flyer design: a baseplate image that fixes the
//! canvas dimensions, an optional text block, and a stack of decorative
//! overlays. Runtime templates hold decoded rasters behind `Arc` so bulk
//! generation can share them across concurrent renders; the persisted form
//! (`SavedTemplate`) carries data URLs and is what the store collaborator
//! reads and writes.

use std::sync::Arc;

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

use crate::assets::{self, AssetError};

/// Default overlay width as a fraction of the baseplate width
pub const OVERLAY_DEFAULT_WIDTH_FRACTION: f32 = 0.3;

/// Rotation handle snap increment in degrees
pub const ROTATION_SNAP_STEP: f32 = 15.0;

/// Distance from a snap increment within which rotation snaps
pub const ROTATION_SNAP_TOLERANCE: f32 = 5.0;

/// Horizontal text alignment, native canvas semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

impl Default for TextAlign {
    fn default() -> Self {
        TextAlign::Center
    }
}

/// Whether an overlay paints below or above the event photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayLayer {
    Below,
    Above,
}

impl Default for OverlayLayer {
    fn default() -> Self {
        OverlayLayer::Above
    }
}

/// Corner used as the anchor for aspect-locked resize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Date line rendering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFormat {
    /// `5th Feb`
    Short,
    /// `5th February 2025`
    Long,
    /// `Wednesday, 5th February 2025`
    Full,
}

impl Default for DateFormat {
    fn default() -> Self {
        DateFormat::Long
    }
}

/// Location line rendering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocationFormat {
    /// `Austin`
    City,
    /// `Austin, TX` (falls back to country when no state code)
    CityState,
    /// `Austin, USA`
    CityCountry,
}

impl Default for LocationFormat {
    fn default() -> Self {
        LocationFormat::CityState
    }
}

/// Per-field typography override; unset fields inherit the block style
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldStyle {
    pub font_family: Option<String>,
    pub font_weight: Option<u16>,
    pub letter_spacing: f32,
    pub uppercase: bool,
}

/// Which semantic fields the text block shows, and how each is formatted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextFieldConfig {
    pub show_event_name: bool,
    pub show_date: bool,
    pub show_venue: bool,
    pub show_location: bool,

    pub event_name_style: FieldStyle,
    pub date_style: FieldStyle,
    /// Venue and location share one style when both are shown
    pub venue_location_style: FieldStyle,

    pub date_format: DateFormat,
    pub date_ordinal: bool,
    pub date_uppercase_month: bool,
    pub location_format: LocationFormat,
}

impl Default for TextFieldConfig {
    fn default() -> Self {
        TextFieldConfig {
            show_event_name: true,
            show_date: true,
            show_venue: false,
            show_location: false,
            event_name_style: FieldStyle::default(),
            date_style: FieldStyle::default(),
            venue_location_style: FieldStyle::default(),
            date_format: DateFormat::default(),
            date_ordinal: false,
            date_uppercase_month: false,
            location_format: LocationFormat::default(),
        }
    }
}

/// Event-image frame region, in percentages of the canvas.
///
/// `x_pct`/`y_pct` parametrize the frame's position within its remaining
/// travel space, so 50/50 centers the frame for any width/height. This is
/// deliberately unlike the text block, which stores absolute pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrameConfig {
    pub width_pct: f32,
    pub height_pct: f32,
    pub x_pct: f32,
    pub y_pct: f32,
    /// Corner radius in baseplate pixels; 0 = plain rectangle
    pub corner_radius: f32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        FrameConfig {
            width_pct: 80.0,
            height_pct: 50.0,
            x_pct: 50.0,
            y_pct: 30.0,
            corner_radius: 0.0,
        }
    }
}

/// Bottom shadow band configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShadowConfig {
    pub enabled: bool,
    /// Band height as a percentage of the canvas height
    pub height_pct: f32,
    /// Black opacity at the bottom edge, 0.0-1.0
    pub opacity: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        ShadowConfig {
            enabled: false,
            height_pct: 33.0,
            opacity: 0.5,
        }
    }
}

/// Text block typography and positioning.
///
/// `x`, `y` and `max_width` are baseplate pixels, not percentages; they do
/// not rescale when the baseplate is swapped. The event-image frame and
/// shadow band ride along here because the original design stored them on
/// the same record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextConfig {
    pub font_family: String,
    pub font_size: f32,
    /// CSS hex color for the whole block
    pub color: String,
    pub x: f32,
    pub y: f32,
    pub max_width: f32,
    pub text_align: TextAlign,
    /// Line height multiplier applied to each line's font size
    pub line_height: f32,
    /// Event-name line font size; other lines use `font_size`
    pub event_name_font_size: Option<f32>,

    pub fields: TextFieldConfig,
    pub frame: FrameConfig,
    pub shadow: ShadowConfig,
}

impl Default for TextConfig {
    fn default() -> Self {
        TextConfig {
            font_family: "Arial".to_string(),
            font_size: 48.0,
            color: "#ffffff".to_string(),
            x: 0.0,
            y: 0.0,
            max_width: 600.0,
            text_align: TextAlign::default(),
            line_height: 1.2,
            event_name_font_size: None,
            fields: TextFieldConfig::default(),
            frame: FrameConfig::default(),
            shadow: ShadowConfig::default(),
        }
    }
}

/// A decorative raster layered below or above the event photo
#[derive(Debug, Clone)]
pub struct Overlay {
    pub id: String,
    pub image: Arc<DynamicImage>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub layer: OverlayLayer,
    /// Degrees clockwise about the overlay center, 0-360
    pub rotation: f32,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

impl Overlay {
    /// Place a freshly uploaded overlay: ~30% of the baseplate width,
    /// aspect-locked, centered on the canvas.
    pub fn with_default_placement(
        id: String,
        image: Arc<DynamicImage>,
        canvas_width: f32,
        canvas_height: f32,
    ) -> Self {
        let src_w = image.width().max(1) as f32;
        let src_h = image.height().max(1) as f32;
        let width = canvas_width * OVERLAY_DEFAULT_WIDTH_FRACTION;
        let height = width * src_h / src_w;

        Overlay {
            id,
            image,
            x: (canvas_width - width) / 2.0,
            y: (canvas_height - height) / 2.0,
            width,
            height,
            layer: OverlayLayer::default(),
            rotation: 0.0,
            flip_horizontal: false,
            flip_vertical: false,
        }
    }

    /// Aspect-locked resize dragged from `corner`; the opposite corner stays
    /// fixed. Width is clamped to at least one pixel.
    pub fn resize_about_corner(&mut self, corner: Corner, new_width: f32) {
        let new_width = new_width.max(1.0);
        let new_height = new_width * self.height / self.width;

        match corner {
            Corner::TopLeft => {
                self.x = self.x + self.width - new_width;
                self.y = self.y + self.height - new_height;
            }
            Corner::TopRight => {
                self.y = self.y + self.height - new_height;
            }
            Corner::BottomLeft => {
                self.x = self.x + self.width - new_width;
            }
            Corner::BottomRight => {}
        }

        self.width = new_width;
        self.height = new_height;
    }
}

/// Snap a free rotation to the nearest 15-degree increment when within the
/// tolerance band, normalized to [0, 360).
pub fn snap_rotation(degrees: f32) -> f32 {
    let normalized = degrees.rem_euclid(360.0);
    let snapped = (normalized / ROTATION_SNAP_STEP).round() * ROTATION_SNAP_STEP;
    if (normalized - snapped).abs() <= ROTATION_SNAP_TOLERANCE {
        snapped.rem_euclid(360.0)
    } else {
        normalized
    }
}

/// A loaded template with all rasters decoded and shareable
#[derive(Debug, Clone)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub baseplate: Arc<DynamicImage>,
    pub text_enabled: bool,
    pub text: TextConfig,
    pub overlays: Vec<Overlay>,
}

impl Template {
    /// Canvas dimensions in pixels, defined by the baseplate
    pub fn canvas_size(&self) -> (u32, u32) {
        (self.baseplate.width(), self.baseplate.height())
    }

    /// Decode a persisted template into a renderable one.
    ///
    /// Overlay ordering is preserved; it determines paint order among
    /// siblings within a layer bucket.
    pub fn from_saved(saved: &SavedTemplate) -> Result<Self, AssetError> {
        let baseplate = Arc::new(assets::decode_data_url(&saved.baseplate_data_url)?);

        let mut overlays = Vec::with_capacity(saved.overlays.len());
        for ov in &saved.overlays {
            overlays.push(Overlay {
                id: ov.id.clone(),
                image: Arc::new(assets::decode_data_url(&ov.data_url)?),
                x: ov.x,
                y: ov.y,
                width: ov.width,
                height: ov.height,
                layer: ov.layer,
                rotation: ov.rotation,
                flip_horizontal: ov.flip_horizontal,
                flip_vertical: ov.flip_vertical,
            });
        }

        Ok(Template {
            id: saved.id.clone(),
            name: saved.name.clone(),
            baseplate,
            text_enabled: saved.text_enabled,
            text: saved.text_config.clone(),
            overlays,
        })
    }
}

/// Persisted overlay with its raster as a data URL
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedOverlay {
    pub id: String,
    pub data_url: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub layer: OverlayLayer,
    #[serde(default)]
    pub rotation: f32,
    #[serde(default)]
    pub flip_horizontal: bool,
    #[serde(default)]
    pub flip_vertical: bool,
}

/// Persisted template record as handed over by the store collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedTemplate {
    pub id: String,
    pub name: String,
    pub baseplate_data_url: String,
    pub text_config: TextConfig,
    pub text_enabled: bool,
    #[serde(default)]
    pub overlays: Vec<SavedOverlay>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbaImage};

    fn test_image(w: u32, h: u32) -> Arc<DynamicImage> {
        Arc::new(DynamicImage::ImageRgba8(RgbaImage::new(w, h)))
    }

    #[test]
    fn test_default_placement_is_centered_and_aspect_locked() {
        let ov = Overlay::with_default_placement("o1".into(), test_image(200, 100), 1000.0, 800.0);

        assert_eq!(ov.width, 300.0);
        assert_eq!(ov.height, 150.0);
        assert_eq!(ov.x, 350.0);
        assert_eq!(ov.y, 325.0);
        assert_eq!(ov.rotation, 0.0);
    }

    #[test]
    fn test_rotation_snaps_within_tolerance() {
        assert_eq!(snap_rotation(13.0), 15.0);
        assert_eq!(snap_rotation(17.5), 15.0);
        assert_eq!(snap_rotation(44.0), 45.0);
        // outside the 5-degree band, rotation stays free
        assert_eq!(snap_rotation(22.0), 22.0);
        // wraps and snaps at the 0/360 seam
        assert_eq!(snap_rotation(358.0), 0.0);
        assert_eq!(snap_rotation(-3.0), 0.0);
    }

    #[test]
    fn test_resize_about_corner_keeps_opposite_corner() {
        let mut ov = Overlay::with_default_placement("o1".into(), test_image(100, 100), 1000.0, 1000.0);
        ov.x = 100.0;
        ov.y = 100.0;
        ov.width = 200.0;
        ov.height = 200.0;

        ov.resize_about_corner(Corner::TopLeft, 100.0);
        // bottom-right corner stays at (300, 300)
        assert_eq!(ov.x + ov.width, 300.0);
        assert_eq!(ov.y + ov.height, 300.0);
        assert_eq!(ov.width, 100.0);
        assert_eq!(ov.height, 100.0);
    }

    #[test]
    fn test_frame_defaults() {
        let frame = FrameConfig::default();
        assert_eq!(frame.width_pct, 80.0);
        assert_eq!(frame.height_pct, 50.0);
        assert_eq!(frame.x_pct, 50.0);
        assert_eq!(frame.y_pct, 30.0);
        assert_eq!(frame.corner_radius, 0.0);
    }

    #[test]
    fn test_saved_template_round_trip() {
        let saved = SavedTemplate {
            id: "t1".into(),
            name: "Launch".into(),
            baseplate_data_url: "data:image/png;base64,AAAA".into(),
            text_config: TextConfig::default(),
            text_enabled: true,
            overlays: vec![],
            created_at: 1_700_000_000_000,
            updated_at: 1_700_000_000_000,
        };

        let json = serde_json::to_string(&saved).unwrap();
        assert!(json.contains("\"baseplateDataUrl\""));
        assert!(json.contains("\"textAlign\":\"center\""));
        assert!(json.contains("\"locationFormat\":\"city-state\""));

        let back: SavedTemplate = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "Launch");
        assert_eq!(back.text_config.frame.width_pct, 80.0);
    }
}
