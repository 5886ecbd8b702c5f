use indexmap::IndexMap;

use crate::config::LayoutConfig;
use crate::geometry::{snap_up_to_grid, Point, Rect, Size};

use super::ids::PinId;
use super::pin::PinDirection;

#[derive(Clone, Debug)]
pub struct Block {
    pub(crate) name: String,
    pub(crate) position: Point,
    pub(crate) size: Size,
    /// Body plus title label, relative to `position`.
    pub(crate) extent: Rect,
    pub(crate) locked: bool,
    pub(crate) inputs: IndexMap<String, PinId>,
    pub(crate) outputs: IndexMap<String, PinId>,
}

impl Block {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Top-left corner of the body.
    pub fn position(&self) -> Point {
        self.position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn inputs(&self) -> &IndexMap<String, PinId> {
        &self.inputs
    }

    pub fn outputs(&self) -> &IndexMap<String, PinId> {
        &self.outputs
    }

    pub fn pins(&self, direction: PinDirection) -> &IndexMap<String, PinId> {
        match direction {
            PinDirection::Input => &self.inputs,
            PinDirection::Output => &self.outputs,
        }
    }

    pub(crate) fn pins_mut(&mut self, direction: PinDirection) -> &mut IndexMap<String, PinId> {
        match direction {
            PinDirection::Input => &mut self.inputs,
            PinDirection::Output => &mut self.outputs,
        }
    }

    pub fn has_pin(&self, name: &str) -> bool {
        self.inputs.contains_key(name) || self.outputs.contains_key(name)
    }

    /// The rectangle used for overlap and crossing tests, title label included.
    pub fn bounding_rect(&self) -> Rect {
        self.extent.translated(self.position)
    }
}

pub(crate) struct BlockGeometry {
    pub size: Size,
    pub extent: Rect,
}

fn side_span(labels: &[&str], config: &LayoutConfig) -> f64 {
    labels
        .iter()
        .map(|label| {
            config.block_pin_radius
                + config.pin_text_padding
                + config.pin_font.width_of(label)
                + config.block_internal_padding
        })
        .fold(0.0, f64::max)
}

pub(crate) fn measure_block(
    name: &str,
    input_labels: &[&str],
    output_labels: &[&str],
    config: &LayoutConfig,
) -> BlockGeometry {
    let grid = config.grid_size;
    let max_pins = input_labels.len().max(output_labels.len());

    let height = if max_pins == 0 {
        2.0 * grid
    } else {
        config.pin_top_padding + (max_pins - 1) as f64 * config.pin_vertical_spacing + config.pin_bottom_padding
    };

    let title_size = Size::new(config.title_font.width_of(name), config.title_font.line_height);
    let pins_width = side_span(input_labels, config) + side_span(output_labels, config);
    let width = config.standard_block_width.max(title_size.width).max(pins_width);

    let size = Size::new(
        snap_up_to_grid(width, grid).max(config.min_item_dimension),
        snap_up_to_grid(height, grid).max(config.min_item_dimension),
    );

    let body = Rect::new(Point::ORIGIN, size);
    let title = Rect::new(
        Point::new(
            (size.width - title_size.width) / 2.0,
            -(title_size.height + config.block_title_top_margin),
        ),
        title_size,
    );

    BlockGeometry {
        size,
        extent: body.united(&title),
    }
}

/// Pin anchor relative to the block's top-left corner.
pub(crate) fn pin_offset(direction: PinDirection, index: usize, width: f64, config: &LayoutConfig) -> Point {
    let y = config.pin_top_padding + index as f64 * config.pin_vertical_spacing;
    match direction {
        PinDirection::Input => Point::new(0.0, y),
        PinDirection::Output => Point::new(width, y),
    }
}
