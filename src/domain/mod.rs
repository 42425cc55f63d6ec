//! Domain types and models

mod event;
mod geometry;
mod template;

pub use event::EventData;
pub use geometry::Rect;
pub use template::{
    snap_rotation, Corner, DateFormat, FieldStyle, FrameConfig, LocationFormat, Overlay,
    OverlayLayer, SavedOverlay, SavedTemplate, ShadowConfig, Template, TextAlign, TextConfig,
    TextFieldConfig, OVERLAY_DEFAULT_WIDTH_FRACTION, ROTATION_SNAP_STEP, ROTATION_SNAP_TOLERANCE,
};
