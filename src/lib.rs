//! Layout optimization core for block diagrams.
//!
//! A [`Layout`] holds blocks with named input and output pins, the diagram's own boundary
//! pins and the wires between them. [`optimize`] improves a layout in place by trying
//! random block moves and pin reorders, scoring each with [`evaluate_cost`].

pub mod config;
pub mod cost;
pub mod demo;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod layout;
pub mod lib_tracing;
pub mod placement;
pub mod routing;

#[cfg(feature = "python")]
mod python;

pub use config::{Algorithm, AnnealingParams, CostParams, HillClimbingParams, LayoutConfig, LoopParams};
pub use cost::{evaluate_cost, CostBreakdown};
pub use error::{ConfigError, LayoutError, OptimizeError};
pub use geometry::{Point, Rect, Size};
pub use graph::{BlockId, Layout, PinDirection, PinId, Placement, WireId};
pub use layout::{
    optimize, AcceptanceStrategy, HillClimbing, NoopHost, Optimizer, OptimizerHost, RunOutcome, RunState,
    SimulatedAnnealing,
};
pub use placement::SpiralSearch;
pub use routing::{BezierRouter, CubicCurve, PathRouter};
