//! # bodymap-core
//!
//! Sensation extraction and aggregation for body-mapping surveys.
//!
//! Participants draw freehand strokes on outlines of the human body, each
//! stroke labeled with a felt sensation (a signed valence and an unsigned
//! intensity). This crate turns those strokes into numbers:
//!
//! - per-pixel sensation maps, with overlapping strokes resolved in drawing
//!   order
//! - drawn area per sensation category, per participant
//! - rectangular bins of drawn points across many participants
//! - a zip archive of every participant's drawn points as CSV
//!
//! ## Architecture
//!
//! The pipeline is built bottom-up:
//!
//! 1. **Geometry**: strokes become midpoint-smoothed quadratic paths
//!    ([`stroke_path`]), flattened by [`curves`] into polylines
//! 2. **Rasterization**: a [`surface::RasterSurface`] strokes one path at a
//!    time and exposes its RGBA pixels
//! 3. **Mapping**: [`sensation_map`] reads each stroke back from the surface
//!    and tags the painted pixels
//! 4. **Aggregation**: [`area`] tallies, [`bin_factory`] and [`pixel_merge`]
//!    group points spatially
//! 5. **Jobs**: [`export`] drives whole-survey runs; [`worker`] runs them on
//!    background threads

// Foundation types & math
pub mod basics;
pub mod color;
pub mod error;
pub mod math;

// Geometry & rasterization
pub mod curves;
pub mod path_storage;
pub mod rasterizer_stroke;
pub mod rendering_buffer;
pub mod surface;

// Survey model
pub mod config;
pub mod model;
pub mod participant;
pub mod survey;

// Sensation pipeline
pub mod area;
pub mod bin_factory;
pub mod footprint;
pub mod pixel_merge;
pub mod sensation_map;
pub mod stroke_path;

// Jobs
pub mod export;
pub mod progress;
pub mod tabular;
pub mod worker;

pub use error::{Error, Result};
