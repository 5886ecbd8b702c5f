use crate::config::RoutingConfig;
use crate::geometry::Point;
use crate::graph::PinDirection;

use super::curve::CubicCurve;

/// Computes the shape of a wire. The same curve is used for drawing and for crossing tests.
pub trait PathRouter {
    /// `end_direction` is `None` while the destination is unknown. A `provisional` route
    /// (a wire still being dragged) assumes the end faces the opposite way of the start.
    fn route(
        &self,
        start: Point,
        end: Point,
        start_direction: PinDirection,
        end_direction: Option<PinDirection>,
        provisional: bool,
    ) -> CubicCurve;
}

/// Horizontal-tangent Bézier: control points are pushed out sideways from both pins.
#[derive(Clone, Debug, Default)]
pub struct BezierRouter {
    config: RoutingConfig,
}

impl BezierRouter {
    pub fn new(config: RoutingConfig) -> Self {
        BezierRouter { config }
    }

    fn offset(&self, start: &Point, end: &Point) -> f64 {
        let dx = end.x - start.x;
        (dx.abs() * self.config.dx_factor).max(self.config.stub_length * self.config.stub_factor)
    }
}

impl PathRouter for BezierRouter {
    fn route(
        &self,
        start: Point,
        end: Point,
        start_direction: PinDirection,
        end_direction: Option<PinDirection>,
        provisional: bool,
    ) -> CubicCurve {
        let offset = self.offset(&start, &end);

        let control1 = match start_direction {
            PinDirection::Output => Point::new(start.x + offset, start.y),
            PinDirection::Input => Point::new(start.x - offset, start.y),
        };

        let effective_end = if provisional {
            start_direction.opposite()
        } else {
            end_direction.unwrap_or(PinDirection::Input)
        };
        let control2 = match effective_end {
            PinDirection::Input => Point::new(end.x - offset, end.y),
            PinDirection::Output => Point::new(end.x + offset, end.y),
        };

        CubicCurve {
            start,
            control1,
            control2,
            end,
        }
    }
}
