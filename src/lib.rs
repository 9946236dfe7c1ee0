//! Double-buffered frame handoff for panel displays.
//!
//! A production thread decodes binary pixmaps ([`pixmap::decode`]) and publishes them
//! into a per-panel [`HandoffSlot`]. The render loop claims whatever is newest, composites
//! every panel onto one [`DisplaySink`] at its horizontal offset, and presents.
#![forbid(unsafe_code)]

#[cfg(feature = "camera")]
pub mod camera;
pub mod config;
pub mod error;
pub mod handoff;
pub mod pipeline;
pub mod pixmap;
pub mod producer;
pub mod render;
pub mod source;
pub mod stop;
pub mod surface;
pub mod types;
#[cfg(feature = "window")]
pub mod window;

#[cfg(feature = "camera")]
pub use camera::CameraSource;
pub use error::{ConfigError, DecodeError, DisplayError, HeaderStage, SourceError};
pub use handoff::{HandoffSlot, SlotStats};
pub use pipeline::{Pipeline, RunOptions, RunReport};
pub use producer::{FrameSource, Producer, ProducerStats};
pub use render::{Panel, RenderLoop, RenderStats, TickOutcome};
pub use source::{AvailabilitySource, PlaylistSource};
pub use stop::StopToken;
pub use surface::{DisplaySink, MemorySurface};
pub use types::{FrameBuffer, Pixel};
#[cfg(feature = "window")]
pub use window::WindowSink;
