mod curve;
mod router;

pub use curve::{CubicCurve, Polyline};
pub use router::{BezierRouter, PathRouter};
