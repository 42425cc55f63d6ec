//! Layout resolver
//!
//! Turns a template's percentage/absolute configuration into absolute pixel
//! geometry for one canvas size. Both the interactive preview and the
//! headless compositor consume this module, so every placement formula
//! lives here exactly once.

use crate::domain::{FrameConfig, Overlay, OverlayLayer, Rect, TextAlign, TextConfig};

/// Portrait social crop aspect (width : height)
const PORTRAIT_CROP_ASPECT: f32 = 4.0 / 5.0;

/// Landscape social crop aspect (height : width)
const LANDSCAPE_CROP_ASPECT: f32 = 4.0 / 5.0;

/// Event-image frame placed on the canvas
#[derive(Debug, Clone, PartialEq)]
pub struct FrameGeometry {
    pub rect: Rect,
    pub corner_radius: f32,
}

/// Overlay geometry in canvas pixels; a pass-through of the stored config
/// since overlays are stored absolute.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayGeometry {
    pub rect: Rect,
    pub rotation: f32,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub layer: OverlayLayer,
}

/// Text block anchor plus the editor's drag-box offset
#[derive(Debug, Clone, PartialEq)]
pub struct TextGeometry {
    pub x: f32,
    pub y: f32,
    pub max_width: f32,
    pub align: TextAlign,
    /// Rendered-left-edge offset from the anchor, for drag-box placement
    pub align_offset: f32,
}

/// Editor-only crop guides; never baked into exported pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafeZones {
    /// Pixels discarded on each side by a 4:5 portrait crop
    pub portrait_side_crop: f32,
    /// Pixels discarded at the bottom by a 5:4 landscape crop
    pub landscape_bottom_crop: f32,
}

/// Absolute pixel geometry for every visual element of a template
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGeometry {
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub frame: FrameGeometry,
    pub overlays: Vec<OverlayGeometry>,
    pub text: TextGeometry,
    pub safe_zones: SafeZones,
}

impl ResolvedGeometry {
    /// Degenerate geometry for an unloaded baseplate; consumers render
    /// "no template loaded" instead of dividing by zero.
    pub fn empty() -> Self {
        ResolvedGeometry {
            canvas_width: 0.0,
            canvas_height: 0.0,
            frame: FrameGeometry {
                rect: Rect::new(0.0, 0.0, 0.0, 0.0),
                corner_radius: 0.0,
            },
            overlays: Vec::new(),
            text: TextGeometry {
                x: 0.0,
                y: 0.0,
                max_width: 0.0,
                align: TextAlign::Center,
                align_offset: 0.0,
            },
            safe_zones: SafeZones {
                portrait_side_crop: 0.0,
                landscape_bottom_crop: 0.0,
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.canvas_width <= 0.0 || self.canvas_height <= 0.0
    }
}

/// Resolve a template's configuration against a canvas size.
pub fn resolve(
    canvas_width: f32,
    canvas_height: f32,
    text: &TextConfig,
    overlays: &[Overlay],
) -> ResolvedGeometry {
    if canvas_width <= 0.0 || canvas_height <= 0.0 {
        return ResolvedGeometry::empty();
    }

    ResolvedGeometry {
        canvas_width,
        canvas_height,
        frame: FrameGeometry {
            rect: frame_bounds(canvas_width, canvas_height, &text.frame),
            corner_radius: text.frame.corner_radius,
        },
        overlays: overlays
            .iter()
            .map(|ov| OverlayGeometry {
                rect: Rect::new(ov.x, ov.y, ov.width, ov.height),
                rotation: ov.rotation,
                flip_horizontal: ov.flip_horizontal,
                flip_vertical: ov.flip_vertical,
                layer: ov.layer,
            })
            .collect(),
        text: TextGeometry {
            x: text.x,
            y: text.y,
            max_width: text.max_width,
            align: text.text_align,
            align_offset: text_align_offset(text.text_align, text.max_width),
        },
        safe_zones: safe_zones(canvas_width, canvas_height),
    }
}

/// Frame bounds from percentage config.
///
/// The x/y percentages parametrize the frame's position within its possible
/// travel range, `(canvas - frame) * pct`, so 50/50 centers the frame for
/// any frame size.
pub fn frame_bounds(canvas_width: f32, canvas_height: f32, frame: &FrameConfig) -> Rect {
    let width = canvas_width * frame.width_pct / 100.0;
    let height = canvas_height * frame.height_pct / 100.0;
    Rect::new(
        (canvas_width - width) * frame.x_pct / 100.0,
        (canvas_height - height) * frame.y_pct / 100.0,
        width,
        height,
    )
}

/// Source crop rectangle that cover-fits a photo into a frame.
///
/// A source wider than the frame keeps full height and crops width; a
/// taller source keeps full width and crops height. The crop is centered
/// on the trimmed axis and always fills the frame, so no letterboxing.
pub fn cover_crop(src_width: f32, src_height: f32, frame_width: f32, frame_height: f32) -> Rect {
    let src_aspect = src_width / src_height;
    let frame_aspect = frame_width / frame_height;

    if src_aspect > frame_aspect {
        let crop_width = src_height * frame_aspect;
        Rect::new((src_width - crop_width) / 2.0, 0.0, crop_width, src_height)
    } else {
        let crop_height = src_width / frame_aspect;
        Rect::new(0.0, (src_height - crop_height) / 2.0, src_width, crop_height)
    }
}

/// Rendered-left-edge offset from the text anchor, used by the editor to
/// draw the drag box where the glyphs will land. The compositor itself
/// positions with native alignment semantics instead.
pub fn text_align_offset(align: TextAlign, max_width: f32) -> f32 {
    match align {
        TextAlign::Left => 0.0,
        TextAlign::Center => max_width / 2.0,
        TextAlign::Right => max_width,
    }
}

/// Crop guides for the 4:5 portrait and 5:4 landscape social formats.
pub fn safe_zones(canvas_width: f32, canvas_height: f32) -> SafeZones {
    let portrait_visible_width = canvas_height * PORTRAIT_CROP_ASPECT;
    let landscape_visible_height = canvas_width * LANDSCAPE_CROP_ASPECT;

    SafeZones {
        portrait_side_crop: ((canvas_width - portrait_visible_width) / 2.0).max(0.0),
        landscape_bottom_crop: (canvas_height - landscape_visible_height).max(0.0),
    }
}
