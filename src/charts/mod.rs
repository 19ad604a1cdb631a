//! Chart-group accessors.
//!
//! A chart part can layer several chart groups (a line plot over a bar plot);
//! each group is wrapped by a [`plot::Plot`].

pub mod plot;

pub use plot::{DataLabels, Plot, PlotKind};
