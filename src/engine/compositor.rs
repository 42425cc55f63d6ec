//! Flyer compositing pipeline
//!
//! Combines a template's baseplate, overlays, event photo, shadow band, and
//! text block into one PNG, in a fixed back-to-front paint order:
//! baseplate, below-overlays, event photo (cover-cropped into the frame),
//! shadow gradient, above-overlays, text. The order is the load-bearing
//! invariant of the whole engine; the preview renderer reproduces it from
//! the same resolved geometry.

use std::sync::Arc;

use bytes::Bytes;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::assets;
use crate::domain::{EventData, Overlay, OverlayLayer, ShadowConfig, Template, TextConfig};
use crate::fonts::{FontError, FontRegistry};
use crate::loader::{ImageLoader, LoadError};

use super::layout::{self, FrameGeometry};
use super::text::{self, RegistryMeasurer};
use super::transform;

/// Rendering errors, one variant per failure class so bulk generation can
/// record a pair's failure and keep going.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template not ready: {0}")]
    Configuration(String),
    #[error("failed to load event photo: {0}")]
    ImageLoad(#[from] LoadError),
    #[error("font unavailable: {0}")]
    FontUnavailable(#[from] FontError),
    #[error("failed to encode output: {0}")]
    Encoding(#[from] image::ImageError),
}

/// One generated flyer: PNG bytes plus the tags the export step needs.
/// Ephemeral; nothing here is persisted by the engine.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub event_id: String,
    pub event_name: String,
    pub template_id: String,
    pub template_name: String,
    pub width: u32,
    pub height: u32,
    pub bytes: Bytes,
    pub data_url: String,
}

/// Stateless flyer compositor.
///
/// Each `render` call is a pure function of its inputs plus the photo bytes
/// the loader fetches; nothing is carried between calls, so bulk generation
/// can invoke it once per (template, event) pair without cross-talk.
pub struct Compositor {
    loader: Arc<dyn ImageLoader>,
    fonts: Arc<FontRegistry>,
}

impl Compositor {
    pub fn new(loader: Arc<dyn ImageLoader>, fonts: Arc<FontRegistry>) -> Self {
        Compositor { loader, fonts }
    }

    /// Render one (template, event) pair to a PNG at the baseplate's exact
    /// dimensions. `override_image_url` substitutes the event's photo.
    pub async fn render(
        &self,
        template: &Template,
        event: &EventData,
        override_image_url: Option<&str>,
    ) -> Result<GeneratedImage, RenderError> {
        let (width, height) = template.canvas_size();
        let geometry = layout::resolve(
            width as f32,
            height as f32,
            &template.text,
            &template.overlays,
        );
        if geometry.is_empty() {
            return Err(RenderError::Configuration(
                "baseplate has zero dimensions".to_string(),
            ));
        }

        let photo_url = override_image_url.unwrap_or(&event.event_image_large_url);
        if photo_url.is_empty() {
            return Err(RenderError::Configuration(
                "event has no photo URL".to_string(),
            ));
        }

        debug!(
            template_id = %template.id,
            event_id = %event.event_id,
            width,
            height,
            "Starting flyer render"
        );

        let photo = self.loader.load(photo_url).await?;

        // 1. Baseplate, 1:1
        let mut canvas: RgbaImage = template.baseplate.to_rgba8();

        // 2. Overlays under the photo, in insertion order
        draw_overlays(&mut canvas, &template.overlays, OverlayLayer::Below);

        // 3. Event photo, cover-cropped into the rounded frame
        draw_cover_photo(&mut canvas, &photo, &geometry.frame);

        // 4. Bottom shadow band
        if template.text.shadow.enabled {
            draw_shadow(&mut canvas, &template.text.shadow);
        }

        // 5. Overlays above the photo
        draw_overlays(&mut canvas, &template.overlays, OverlayLayer::Above);

        // 6. Text block
        if template.text_enabled {
            self.draw_text_block(&mut canvas, event, &template.text);
        }

        let png_bytes = encode_png(&canvas)?;

        info!(
            template_id = %template.id,
            event_id = %event.event_id,
            bytes = png_bytes.len(),
            "Flyer render complete"
        );

        Ok(GeneratedImage {
            event_id: event.event_id.clone(),
            event_name: event.event_name.clone(),
            template_id: template.id.clone(),
            template_name: template.name.clone(),
            width,
            height,
            data_url: assets::to_png_data_url(&png_bytes),
            bytes: Bytes::from(png_bytes),
        })
    }

    fn draw_text_block(&self, canvas: &mut RgbaImage, event: &EventData, cfg: &TextConfig) {
        let lines = text::build_lines(event, cfg);
        if lines.is_empty() {
            return;
        }
        if self.fonts.is_empty() {
            warn!("No fonts registered; skipping text layer");
            return;
        }

        let color = hex_color(&cfg.color).unwrap_or_else(|| {
            warn!(color = %cfg.color, "Unparseable text color, using white");
            Rgba([255, 255, 255, 255])
        });

        let measurer = RegistryMeasurer::new(&self.fonts);
        for positioned in text::layout_lines(&lines, cfg, &measurer) {
            let font = match self.fonts.resolve(&positioned.style.family, positioned.style.weight) {
                Some(font) => font,
                None => continue,
            };
            let line_width = text::measure_line(
                &font,
                positioned.style.font_size,
                &positioned.text,
                positioned.style.letter_spacing,
            );
            let pen_x = text::aligned_pen_x(cfg.x, line_width, cfg.text_align);
            text::draw_line(
                canvas,
                &font,
                positioned.style.font_size,
                pen_x,
                positioned.y,
                color,
                &positioned.text,
                positioned.style.letter_spacing,
            );
        }
    }
}

/// Draw every overlay in the given layer bucket, in list order.
fn draw_overlays(canvas: &mut RgbaImage, overlays: &[Overlay], layer: OverlayLayer) {
    for overlay in overlays.iter().filter(|ov| ov.layer == layer) {
        let target_w = overlay.width.round() as u32;
        let target_h = overlay.height.round() as u32;
        if target_w == 0 || target_h == 0 {
            continue;
        }

        let resized = overlay
            .image
            .resize_exact(target_w, target_h, image::imageops::FilterType::Lanczos3)
            .to_rgba8();

        if transform::is_axis_aligned(overlay) {
            transform::blit_over(
                canvas,
                &resized,
                overlay.x.round() as i32,
                overlay.y.round() as i32,
            );
        } else {
            let matrix = transform::overlay_matrix(overlay);
            transform::draw_transformed(canvas, &resized, &matrix);
        }
    }
}

/// Cover-crop the photo into the frame and blend it through the frame's
/// rounded-rect clip. Radius 0 degrades to a plain rectangle.
fn draw_cover_photo(canvas: &mut RgbaImage, photo: &DynamicImage, frame: &FrameGeometry) {
    if frame.rect.is_degenerate() {
        return;
    }

    let crop = layout::cover_crop(
        photo.width() as f32,
        photo.height() as f32,
        frame.rect.width,
        frame.rect.height,
    );

    let photo_rgba = photo.to_rgba8();
    let cropped = image::imageops::crop_imm(
        &photo_rgba,
        crop.x.round().max(0.0) as u32,
        crop.y.round().max(0.0) as u32,
        (crop.width.round() as u32).max(1),
        (crop.height.round() as u32).max(1),
    )
    .to_image();

    let frame_w = (frame.rect.width.round() as u32).max(1);
    let frame_h = (frame.rect.height.round() as u32).max(1);
    let fitted = image::imageops::resize(
        &cropped,
        frame_w,
        frame_h,
        image::imageops::FilterType::Lanczos3,
    );

    let frame_x = frame.rect.x.round() as i32;
    let frame_y = frame.rect.y.round() as i32;
    let radius = frame
        .corner_radius
        .round()
        .clamp(0.0, frame_w.min(frame_h) as f32 / 2.0) as i32;

    let (cw, ch) = canvas.dimensions();
    for y in 0..frame_h {
        let cy = frame_y + y as i32;
        if cy < 0 || cy >= ch as i32 {
            continue;
        }
        for x in 0..frame_w {
            let cx = frame_x + x as i32;
            if cx < 0 || cx >= cw as i32 {
                continue;
            }
            if radius > 0
                && !rounded_rect_contains(x as i32, y as i32, frame_w as i32, frame_h as i32, radius)
            {
                continue;
            }
            transform::blend_over(
                canvas.get_pixel_mut(cx as u32, cy as u32),
                *fitted.get_pixel(x, y),
            );
        }
    }
}

/// Point-in-rounded-rect test over integer pixel coordinates.
fn rounded_rect_contains(x: i32, y: i32, w: i32, h: i32, r: i32) -> bool {
    if x >= r && x < w - r {
        return true;
    }
    if y >= r && y < h - r {
        return true;
    }
    let (cx, cy) = if x < r {
        if y < r {
            (r - 1, r - 1)
        } else {
            (r - 1, h - r)
        }
    } else if y < r {
        (w - r, r - 1)
    } else {
        (w - r, h - r)
    };
    let dx = x - cx;
    let dy = y - cy;
    dx * dx + dy * dy <= r * r
}

/// Linear shadow gradient over the bottom band: fully transparent black at
/// the band's top edge, `opacity` black at the bottom edge of the canvas.
fn draw_shadow(canvas: &mut RgbaImage, shadow: &ShadowConfig) {
    let (width, height) = canvas.dimensions();
    let band_top = height as f32 * (1.0 - shadow.height_pct / 100.0);
    let span = height as f32 - band_top;
    if span <= 0.0 {
        return;
    }

    let start_row = band_top.floor().max(0.0) as u32;
    for y in start_row..height {
        let t = ((y as f32 + 0.5 - band_top) / span).clamp(0.0, 1.0);
        let alpha = shadow.opacity.clamp(0.0, 1.0) * t;
        if alpha <= 0.0 {
            continue;
        }
        let src_alpha = (alpha * 255.0) as u8;
        for x in 0..width {
            transform::blend_over(canvas.get_pixel_mut(x, y), Rgba([0, 0, 0, src_alpha]));
        }
    }
}

/// Parse `#rrggbb` / `#rrggbbaa` CSS hex colors.
fn hex_color(s: &str) -> Option<Rgba<u8>> {
    let s = s.trim().trim_start_matches('#');
    let bytes = hex::decode(s).ok()?;
    match bytes.len() {
        3 => Some(Rgba([bytes[0], bytes[1], bytes[2], 255])),
        4 => Some(Rgba([bytes[0], bytes[1], bytes[2], bytes[3]])),
        _ => None,
    }
}

/// Encode the canvas to PNG bytes (preserves RGBA transparency)
fn encode_png(canvas: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buffer);
    encoder.encode(
        canvas.as_raw(),
        canvas.width(),
        canvas.height(),
        image::ColorType::Rgba8,
    )?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::GenericImageView;

    struct StubLoader {
        photo: DynamicImage,
    }

    #[async_trait]
    impl ImageLoader for StubLoader {
        async fn load(&self, _src: &str) -> Result<DynamicImage, LoadError> {
            Ok(self.photo.clone())
        }
    }

    struct FailingLoader;

    #[async_trait]
    impl ImageLoader for FailingLoader {
        async fn load(&self, src: &str) -> Result<DynamicImage, LoadError> {
            Err(LoadError::Status {
                status: 404,
                url: src.to_string(),
            })
        }
    }

    fn solid(w: u32, h: u32, px: Rgba<u8>) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, px))
    }

    fn compositor(photo: DynamicImage) -> Compositor {
        Compositor::new(
            Arc::new(StubLoader { photo }),
            Arc::new(FontRegistry::new()),
        )
    }

    fn test_template() -> Template {
        let mut template = Template {
            id: "t1".into(),
            name: "Launch".into(),
            baseplate: Arc::new(solid(20, 20, Rgba([0, 0, 255, 255]))),
            text_enabled: false,
            text: TextConfig::default(),
            overlays: vec![],
        };
        // frame fills the top half of the canvas
        template.text.frame.width_pct = 100.0;
        template.text.frame.height_pct = 50.0;
        template.text.frame.x_pct = 50.0;
        template.text.frame.y_pct = 0.0;
        template
    }

    fn event_with_photo() -> EventData {
        let mut event = EventData::sample("ev-1", "Summer Jam");
        event.event_image_large_url = "https://img.example.com/ev-1.jpg".into();
        event
    }

    fn overlay_at(x: f32, y: f32, size: f32, color: Rgba<u8>, layer: OverlayLayer) -> Overlay {
        Overlay {
            id: format!("ov-{:?}", layer),
            image: Arc::new(solid(size as u32, size as u32, color)),
            x,
            y,
            width: size,
            height: size,
            layer,
            rotation: 0.0,
            flip_horizontal: false,
            flip_vertical: false,
        }
    }

    #[tokio::test]
    async fn test_paint_order_invariant() {
        let mut template = test_template();
        // below-overlay partly under the frame, partly in the shadow band
        template.overlays.push(overlay_at(0.0, 0.0, 6.0, Rgba([255, 0, 0, 255]), OverlayLayer::Below));
        template.overlays.push(overlay_at(2.0, 12.0, 4.0, Rgba([255, 0, 0, 255]), OverlayLayer::Below));
        // above-overlay inside the shadow band
        template.overlays.push(overlay_at(14.0, 14.0, 4.0, Rgba([255, 255, 255, 255]), OverlayLayer::Above));
        template.text.shadow.enabled = true;
        template.text.shadow.height_pct = 50.0;
        template.text.shadow.opacity = 1.0;

        let result = compositor(solid(10, 10, Rgba([0, 255, 0, 255])))
            .render(&template, &event_with_photo(), None)
            .await
            .unwrap();

        let out = image::load_from_memory(&result.bytes).unwrap().to_rgba8();

        // photo paints over the below-overlay inside the frame
        assert_eq!(out.get_pixel(1, 1), &Rgba([0, 255, 0, 255]));
        // shadow paints over the below-overlay outside the frame:
        // red survives but darkened, never pure
        let shaded_red = out.get_pixel(3, 13).0;
        assert!(shaded_red[0] > 100 && shaded_red[0] < 255);
        assert!(shaded_red[1] < 60 && shaded_red[2] < 60);
        // above-overlay paints after the shadow: stays pure white
        assert_eq!(out.get_pixel(15, 15), &Rgba([255, 255, 255, 255]));
        // bare baseplate near the bottom edge is heavily darkened
        let shaded_base = out.get_pixel(8, 19).0;
        assert!(shaded_base[2] < 40, "expected deep shadow, got {:?}", shaded_base);
        // photo above the shadow band is untouched
        assert_eq!(out.get_pixel(8, 9), &Rgba([0, 255, 0, 255]));
    }

    #[tokio::test]
    async fn test_output_matches_baseplate_dimensions() {
        let template = test_template();
        let result = compositor(solid(7, 13, Rgba([9, 9, 9, 255])))
            .render(&template, &event_with_photo(), None)
            .await
            .unwrap();

        assert_eq!((result.width, result.height), (20, 20));
        let decoded = image::load_from_memory(&result.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (20, 20));
        assert!(result.data_url.starts_with("data:image/png;base64,"));
        assert_eq!(result.template_name, "Launch");
        assert_eq!(result.event_id, "ev-1");
    }

    #[tokio::test]
    async fn test_corner_radius_clips_photo() {
        let mut template = test_template();
        template.text.frame.corner_radius = 5.0;

        let result = compositor(solid(10, 10, Rgba([0, 255, 0, 255])))
            .render(&template, &event_with_photo(), None)
            .await
            .unwrap();

        let out = image::load_from_memory(&result.bytes).unwrap().to_rgba8();
        // frame corner stays baseplate blue, frame center is photo green
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
        assert_eq!(out.get_pixel(10, 5), &Rgba([0, 255, 0, 255]));
    }

    #[tokio::test]
    async fn test_failed_photo_load_is_a_typed_error() {
        let template = test_template();
        let compositor = Compositor::new(Arc::new(FailingLoader), Arc::new(FontRegistry::new()));

        let err = compositor
            .render(&template, &event_with_photo(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::ImageLoad(_)));
    }

    #[tokio::test]
    async fn test_event_without_photo_url_is_configuration_error() {
        let template = test_template();
        let event = EventData::sample("ev-2", "No Photo");

        let err = compositor(solid(4, 4, Rgba([0, 0, 0, 255])))
            .render(&template, &event, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_override_url_wins_over_event_photo() {
        struct RecordingLoader {
            photo: DynamicImage,
            seen: std::sync::Mutex<Vec<String>>,
        }

        #[async_trait]
        impl ImageLoader for RecordingLoader {
            async fn load(&self, src: &str) -> Result<DynamicImage, LoadError> {
                self.seen.lock().unwrap().push(src.to_string());
                Ok(self.photo.clone())
            }
        }

        let loader = Arc::new(RecordingLoader {
            photo: solid(4, 4, Rgba([1, 2, 3, 255])),
            seen: std::sync::Mutex::new(vec![]),
        });
        let compositor = Compositor::new(loader.clone(), Arc::new(FontRegistry::new()));

        compositor
            .render(&test_template(), &event_with_photo(), Some("https://cdn.example.com/custom.png"))
            .await
            .unwrap();

        assert_eq!(
            loader.seen.lock().unwrap().as_slice(),
            &["https://cdn.example.com/custom.png".to_string()]
        );
    }

    #[tokio::test]
    async fn test_zero_size_baseplate_is_configuration_error() {
        let mut template = test_template();
        template.baseplate = Arc::new(DynamicImage::ImageRgba8(RgbaImage::new(0, 0)));

        let err = compositor(solid(4, 4, Rgba([0, 0, 0, 255])))
            .render(&template, &event_with_photo(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Configuration(_)));
    }

    #[test]
    fn test_hex_color_parsing() {
        assert_eq!(hex_color("#ff8000"), Some(Rgba([255, 128, 0, 255])));
        assert_eq!(hex_color("ff8000"), Some(Rgba([255, 128, 0, 255])));
        assert_eq!(hex_color("#ff800080"), Some(Rgba([255, 128, 0, 128])));
        assert_eq!(hex_color("#fff"), None);
        assert_eq!(hex_color("bogus"), None);
    }

    #[test]
    fn test_rounded_rect_contains_corners() {
        // 10x10 with radius 3: extreme corners are outside, center inside
        assert!(!rounded_rect_contains(0, 0, 10, 10, 3));
        assert!(rounded_rect_contains(5, 5, 10, 10, 3));
        assert!(rounded_rect_contains(0, 5, 10, 10, 3));
    }
}
