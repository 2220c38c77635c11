//! Core library of the visual surface engine.
//!
//! A [`Surface`] is a rectangular pixel buffer plus the geometry and format
//! needed to interpret it. Everything else operates on surfaces: depth
//! conversion, blitting and composition with alpha or colorkey rules,
//! scaling, rotation and mirroring. Display backends wrap their own frame
//! memory as a surface and hand it to renderers that draw through these
//! primitives.
//!
//! All operations run synchronously on the calling thread. Distinct surfaces
//! can be processed in parallel; a surface that several threads draw into
//! must be serialized by the caller.

pub mod color;
pub mod compose;
pub mod config;
pub mod convert;
pub mod depth;
pub mod error;
pub mod geometry;
pub mod scale;
pub mod surface;
pub mod transform;

pub use color::{Color, Palette, MAX_PALETTE_ENTRIES};
pub use compose::{
    blit, blit_area, compose, compose_area, fill_alpha, fill_alpha_area, fill_alpha_color,
    fill_color, fill_color_area, resolve_compose, ComposeFn, ComposeRegistry, ComposeRule,
    CompositeStrategy,
};
pub use config::{AppConfig, DisplayConfig, PipelineConfig};
pub use convert::{convert_depth, flip_pixel_bytes};
pub use depth::{Depth, DepthSet};
pub use error::{Result, VideoError};
pub use geometry::Rectangle;
pub use scale::{
    blit_scale_area, compose_scale_area, scale, scale_with_depth_conversion, scaled, ScaleMethod,
};
pub use surface::{Ownership, PixelBuffer, PixelsMut, PixelsRef, Surface};
pub use transform::{mirror, rotate, MirrorAxis, Rotation};
