//! Text line building, word wrap, and glyph rendering
//!
//! The wrap and layout math is shared verbatim by the interactive preview
//! and the export path; measurement goes through a trait so layout can be
//! tested without font assets.

use image::{Rgba, RgbaImage};
use rusttype::{point, Font, Scale};

use crate::domain::{EventData, FieldStyle, TextAlign, TextConfig};
use crate::fonts::FontRegistry;

use super::format;

/// Font weight used when a field has no explicit override
pub const DEFAULT_FIELD_WEIGHT: u16 = 700;

/// Typography resolved for one logical line
#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub family: String,
    pub weight: u16,
    pub letter_spacing: f32,
    pub font_size: f32,
}

/// One logical field line (event name, date, or venue/location), with its
/// uppercase flag already applied to the text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub style: LineStyle,
}

/// A wrapped sub-line placed at an absolute vertical offset
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedLine {
    pub text: String,
    pub y: f32,
    pub style: LineStyle,
}

/// Text measurement capability; the production implementation consults the
/// font registry, tests substitute a fixed-advance ruler.
pub trait MeasureText {
    fn line_width(&self, text: &str, style: &LineStyle) -> f32;
}

/// Measures through registered rusttype faces, advance-summed with letter
/// spacing between glyphs, the same arithmetic the glyph renderer uses, so
/// wrap decisions and drawn pixels cannot drift apart.
pub struct RegistryMeasurer<'a> {
    registry: &'a FontRegistry,
}

impl<'a> RegistryMeasurer<'a> {
    pub fn new(registry: &'a FontRegistry) -> Self {
        RegistryMeasurer { registry }
    }
}

impl MeasureText for RegistryMeasurer<'_> {
    fn line_width(&self, text: &str, style: &LineStyle) -> f32 {
        match self.registry.resolve(&style.family, style.weight) {
            Some(font) => measure_line(&font, style.font_size, text, style.letter_spacing),
            None => 0.0,
        }
    }
}

fn resolve_style(cfg: &TextConfig, field: &FieldStyle, font_size: f32) -> LineStyle {
    LineStyle {
        family: field
            .font_family
            .clone()
            .unwrap_or_else(|| cfg.font_family.clone()),
        weight: field.font_weight.unwrap_or(DEFAULT_FIELD_WEIGHT),
        letter_spacing: field.letter_spacing,
        font_size,
    }
}

fn apply_case(text: String, uppercase: bool) -> String {
    if uppercase {
        text.to_uppercase()
    } else {
        text
    }
}

/// Build the ordered logical lines for one event.
///
/// Event name first, then the date (only when a start timestamp exists),
/// then the merged venue/location line. Fields whose flags are off, or
/// whose data is blank, emit nothing.
pub fn build_lines(event: &EventData, cfg: &TextConfig) -> Vec<TextLine> {
    let fields = &cfg.fields;
    let mut lines = Vec::new();

    if fields.show_event_name && !event.event_name.trim().is_empty() {
        let size = cfg.event_name_font_size.unwrap_or(cfg.font_size);
        lines.push(TextLine {
            text: apply_case(
                event.event_name.trim().to_string(),
                fields.event_name_style.uppercase,
            ),
            style: resolve_style(cfg, &fields.event_name_style, size),
        });
    }

    if fields.show_date && !event.starts_at.trim().is_empty() {
        let date = format::format_event_date(
            &event.starts_at,
            fields.date_format,
            fields.date_ordinal,
            fields.date_uppercase_month,
        );
        lines.push(TextLine {
            text: apply_case(date, fields.date_style.uppercase),
            style: resolve_style(cfg, &fields.date_style, cfg.font_size),
        });
    }

    if fields.show_venue || fields.show_location {
        let venue = fields.show_venue.then_some(event.venue_name.as_str());
        let location = fields.show_location.then(|| {
            format::format_location(
                &event.city_name,
                &event.state_code,
                &event.country_name,
                fields.location_format,
            )
        });

        if let Some(merged) = format::merge_venue_location(venue, location.as_deref()) {
            lines.push(TextLine {
                text: apply_case(merged, fields.venue_location_style.uppercase),
                style: resolve_style(cfg, &fields.venue_location_style, cfg.font_size),
            });
        }
    }

    lines
}

/// Greedy word wrap: accumulate space-separated words, flushing whenever the
/// candidate exceeds `max_width` and the line already holds a word. A single
/// over-wide word is emitted on its own rather than dropped.
pub fn wrap_line(
    text: &str,
    max_width: f32,
    style: &LineStyle,
    measurer: &dyn MeasureText,
) -> Vec<String> {
    let mut wrapped = Vec::new();
    let mut current = String::new();

    for word in text.split(' ').filter(|w| !w.is_empty()) {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };

        if measurer.line_width(&candidate, style) > max_width && !current.is_empty() {
            wrapped.push(current);
            current = word.to_string();
        } else {
            current = candidate;
        }
    }

    if !current.is_empty() {
        wrapped.push(current);
    }
    wrapped
}

/// Wrap every logical line and assign vertical offsets.
///
/// The cursor starts at `cfg.y` and advances by `font_size * line_height`
/// after every wrapped sub-line, then once more after each logical line.
pub fn layout_lines(
    lines: &[TextLine],
    cfg: &TextConfig,
    measurer: &dyn MeasureText,
) -> Vec<PositionedLine> {
    let mut positioned = Vec::new();
    let mut y = cfg.y;

    for line in lines {
        let advance = line.style.font_size * cfg.line_height;
        for sub in wrap_line(&line.text, cfg.max_width, &line.style, measurer) {
            positioned.push(PositionedLine {
                text: sub,
                y,
                style: line.style.clone(),
            });
            y += advance;
        }
        y += advance;
    }

    positioned
}

/// Pen x for a measured line under native alignment semantics: the anchor
/// `x` is the left edge, center, or right edge of the rendered line.
pub fn aligned_pen_x(anchor_x: f32, line_width: f32, align: TextAlign) -> f32 {
    match align {
        TextAlign::Left => anchor_x,
        TextAlign::Center => anchor_x - line_width / 2.0,
        TextAlign::Right => anchor_x - line_width,
    }
}

/// Advance-summed line width with letter spacing between glyphs.
pub fn measure_line(font: &Font<'_>, px: f32, text: &str, letter_spacing: f32) -> f32 {
    let scale = Scale::uniform(px);
    let mut width = 0.0;
    let mut count = 0usize;
    for ch in text.chars() {
        width += font.glyph(ch).scaled(scale).h_metrics().advance_width;
        count += 1;
    }
    if count > 1 {
        width += letter_spacing * (count - 1) as f32;
    }
    width
}

/// Rasterize one line glyph-by-glyph with manual letter spacing.
///
/// `y` is the top of the line (the original renders with a top baseline
/// convention); coverage is alpha-blended over the canvas.
pub fn draw_line(
    canvas: &mut RgbaImage,
    font: &Font<'_>,
    px: f32,
    pen_x: f32,
    y: f32,
    color: Rgba<u8>,
    text: &str,
    letter_spacing: f32,
) {
    let scale = Scale::uniform(px);
    let v_metrics = font.v_metrics(scale);
    let baseline_y = y + v_metrics.ascent;
    let mut caret_x = pen_x;

    for ch in text.chars() {
        let glyph = font
            .glyph(ch)
            .scaled(scale)
            .positioned(point(caret_x, baseline_y));
        if let Some(bb) = glyph.pixel_bounding_box() {
            glyph.draw(|gx, gy, v| {
                let px_x = gx as i32 + bb.min.x;
                let px_y = gy as i32 + bb.min.y;
                if px_x < 0 || px_y < 0 {
                    return;
                }
                let (px_x, px_y) = (px_x as u32, px_y as u32);
                if px_x >= canvas.width() || px_y >= canvas.height() {
                    return;
                }
                if v <= 0.0 {
                    return;
                }
                let dst = canvas.get_pixel_mut(px_x, px_y);
                let sa = v.min(1.0);
                let inv = 1.0 - sa;
                dst.0[0] = (color.0[0] as f32 * sa + dst.0[0] as f32 * inv) as u8;
                dst.0[1] = (color.0[1] as f32 * sa + dst.0[1] as f32 * inv) as u8;
                dst.0[2] = (color.0[2] as f32 * sa + dst.0[2] as f32 * inv) as u8;
                dst.0[3] = dst.0[3].max((sa * 255.0) as u8);
            });
        }
        caret_x += glyph.unpositioned().h_metrics().advance_width + letter_spacing;
    }
}
