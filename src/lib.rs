//! Flyergen
//!
//! Template-based event flyer compositing and batch generation engine.
//! A template (baseplate artwork, text block, decorative overlays, and an
//! event-photo frame) is rendered against event records from a ticketing
//! feed, producing one PNG per (template, event) pair, headlessly, and
//! pixel-identical to what the interactive preview shows.
//!
//! The crate is a pure computation library: template persistence, feed
//! fetching, and all UI live in the embedding application. The pieces:
//!
//! - [`engine::layout`]: resolves percentage/absolute template config into
//!   absolute pixel geometry, shared by preview and export.
//! - [`engine::compositor`]: draws baseplate, overlays, cover-cropped
//!   event photo, shadow band, and text in a fixed paint order, and
//!   encodes PNG output.
//! - [`pipeline`]: bulk generation with bounded concurrency and
//!   deterministic result ordering.
//! - [`loader`]: rate-limited photo fetching with a CORS-proxy fallback.
//! - [`fonts`]: explicit per-instance font registry.
//!
//! ```no_run
//! use std::sync::Arc;
//! use flyergen::config::Settings;
//! use flyergen::engine::Compositor;
//! use flyergen::fonts::FontRegistry;
//! use flyergen::loader::HttpImageLoader;
//! use flyergen::pipeline::{BatchGenerator, CancelFlag};
//!
//! # async fn run(templates: Vec<Arc<flyergen::domain::Template>>, events: Vec<flyergen::domain::EventData>) {
//! let settings = Settings::default();
//! let loader = Arc::new(HttpImageLoader::new(&settings.fetch));
//! let fonts = Arc::new(FontRegistry::new());
//! let compositor = Arc::new(Compositor::new(loader, fonts));
//!
//! let batch = BatchGenerator::new(compositor, settings.pipeline.concurrency);
//! let outcome = batch
//!     .run(&templates, &events, &CancelFlag::new(), |pair| {
//!         println!("{}: {}", pair.event_name, pair.is_success());
//!     })
//!     .await;
//! println!("{} generated, {} failed", outcome.generated, outcome.failed);
//! # }
//! ```

pub mod assets;
pub mod config;
pub mod domain;
pub mod engine;
pub mod fonts;
pub mod loader;
pub mod pipeline;

pub use domain::{EventData, SavedTemplate, Template};
pub use engine::{Compositor, GeneratedImage, RenderError};
pub use fonts::FontRegistry;
pub use loader::{HttpImageLoader, ImageLoader, LoadError};
pub use pipeline::{BatchGenerator, BatchOutcome, CancelFlag, PairOutcome};
