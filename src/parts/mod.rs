//! Typed parts of a presentation package.
//!
//! Each wrapper owns its element handle (or raw bytes) and its relationship
//! collection, and implements the [`Part`](crate::opc::part::Part) trait so
//! the graph machinery can treat all parts uniformly.

pub mod coreprops;
pub mod image;
pub mod presentation;
pub mod slides;

pub use coreprops::CoreProperties;
pub use image::{Image, ImageCollection};
pub use presentation::{Presentation, SlideCollection};
pub use slides::{PartCollection, Slide, SlideLayout, SlideMaster};
