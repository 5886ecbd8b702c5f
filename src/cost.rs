use serde::Serialize;

use crate::config::CostParams;
use crate::graph::{BlockId, Layout, PinId};
use crate::routing::Polyline;

/// Layout quality, lower is better.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub intersection_score: f64,
    pub length_score: f64,
    pub total: f64,
}

struct RoutedWire {
    source: PinId,
    destination: PinId,
    source_block: Option<BlockId>,
    destination_block: Option<BlockId>,
    path: Polyline,
}

impl RoutedWire {
    fn shares_pin_with(&self, other: &RoutedWire) -> bool {
        self.source == other.source
            || self.source == other.destination
            || self.destination == other.source
            || self.destination == other.destination
    }

    fn touches_block(&self, block: BlockId) -> bool {
        self.source_block == Some(block) || self.destination_block == Some(block)
    }
}

fn routed_wires(layout: &Layout) -> Vec<RoutedWire> {
    let segments = layout.config().routing.flatten_segments;
    layout
        .wires()
        .filter_map(|wire| {
            let (source, destination) = layout.wire_ends(wire)?;
            let (source_block, destination_block) = layout.wire_endpoint_blocks(wire)?;
            let path = layout.wire_curve(wire)?.flatten(segments);
            Some(RoutedWire {
                source,
                destination,
                source_block,
                destination_block,
                path,
            })
        })
        .collect()
}

/// Scores the current layout. Reads geometry only, the layout is left untouched.
///
/// Wire pairs that share a pin are expected to meet there and never count as crossing.
/// A wire only counts against blocks it is not attached to.
pub fn evaluate_cost(layout: &Layout, params: &CostParams) -> CostBreakdown {
    let wires = routed_wires(layout);
    let stroke = params.wire_clickable_width;

    let length_score: f64 = wires.iter().map(|wire| wire.path.length()).sum();

    let mut wire_wire = 0.0;
    for (i, wire) in wires.iter().enumerate() {
        for other in &wires[i + 1..] {
            if wire.shares_pin_with(other) {
                continue;
            }
            wire_wire += if params.detailed_intersections {
                wire.path.stroke_overlap_area(&other.path, stroke)
            } else if wire.path.intersects(&other.path) {
                1.0
            } else {
                0.0
            };
        }
    }

    let mut wire_block = 0.0;
    for wire in &wires {
        for (id, block) in layout.blocks() {
            if wire.touches_block(id) {
                continue;
            }
            let rect = block.bounding_rect();
            wire_block += if params.detailed_intersections {
                wire.path.stroke_rect_overlap_area(&rect, stroke)
            } else if wire.path.intersects_rect(&rect) {
                1.0
            } else {
                0.0
            };
        }
    }

    let intersection_score = wire_wire + wire_block;
    let total = intersection_score * params.intersection_weight + length_score * params.wirelength_weight;
    tracing::trace!(wire_wire, wire_block, length_score, total, "cost breakdown");

    CostBreakdown {
        intersection_score,
        length_score,
        total,
    }
}
