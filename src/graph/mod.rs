mod block;
mod ids;
mod pin;
pub(crate) mod spatial;

use std::collections::hash_map::DefaultHasher;
use std::hash::BuildHasherDefault;

use hashbrown::HashMap;
use indexmap::IndexMap;
use petgraph::stable_graph::{EdgeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction as EdgeDirection;
use serde::Serialize;

use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::geometry::{Point, Rect, Size};
use crate::placement::SpiralSearch;
use crate::routing::{BezierRouter, CubicCurve, PathRouter};

pub use block::Block;
pub use ids::{BlockId, ItemKind, ItemRef, PinId, WireId};
pub use pin::{DiagramPinKind, Pin, PinDirection, PinOwner, Wire};

use block::{measure_block, pin_offset};
use spatial::ObstacleIndex;

pub(crate) type FixedState = BuildHasherDefault<DefaultHasher>;

/// How a new block or diagram pin gets its position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Placement {
    /// Use this position, snapped to the grid.
    Exact(Point),
    /// Search for a free spot around the hint, or next to the existing items without one.
    Search { hint: Option<Point> },
}

impl Placement {
    pub fn auto() -> Self {
        Placement::Search { hint: None }
    }

    pub fn near(hint: Point) -> Self {
        Placement::Search { hint: Some(hint) }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PinSnapshot {
    pub name: String,
    pub index: usize,
    pub position: Point,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BlockSnapshot {
    pub name: String,
    pub position: Point,
    pub size: Size,
    pub locked: bool,
    pub inputs: Vec<PinSnapshot>,
    pub outputs: Vec<PinSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WireSnapshot {
    pub source: String,
    pub destination: String,
    pub locked: bool,
}

/// Every position, size and ordering of a layout, used to compare states and for traces.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LayoutSnapshot {
    pub blocks: Vec<BlockSnapshot>,
    pub diagram_inputs: Vec<PinSnapshot>,
    pub diagram_outputs: Vec<PinSnapshot>,
    pub wires: Vec<WireSnapshot>,
}

/// The diagram being laid out: blocks, diagram boundary pins and the wires between pins.
///
/// Pins are the nodes and wires the edges of a stable graph, so handles stay valid while
/// other items are removed. Derived geometry (block sizes, pin anchors, diagram pin
/// positions, the spatial index) is refreshed by [`Layout::recompute_block_geometry`]
/// and [`Layout::realign_diagram_pins`], which every mutating operation calls before
/// returning.
pub struct Layout {
    config: LayoutConfig,
    router: Box<dyn PathRouter>,
    graph: StableDiGraph<Pin, Wire>,
    blocks: IndexMap<BlockId, Block>,
    block_names: HashMap<String, BlockId, FixedState>,
    diagram_inputs: IndexMap<String, PinId>,
    diagram_outputs: IndexMap<String, PinId>,
    obstacles: ObstacleIndex,
    next_block_id: u32,
}

impl Default for Layout {
    fn default() -> Self {
        Layout::new(LayoutConfig::default())
    }
}

impl Layout {
    pub fn new(config: LayoutConfig) -> Self {
        let router = Box::new(BezierRouter::new(config.routing.clone()));
        Layout::with_router(config, router)
    }

    pub fn with_router(config: LayoutConfig, router: Box<dyn PathRouter>) -> Self {
        Layout {
            config,
            router,
            graph: StableDiGraph::default(),
            blocks: IndexMap::new(),
            block_names: HashMap::default(),
            diagram_inputs: IndexMap::new(),
            diagram_outputs: IndexMap::new(),
            obstacles: ObstacleIndex::default(),
            next_block_id: 0,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    // Blocks

    pub fn create_block(
        &mut self,
        name: &str,
        placement: Placement,
        inputs: &[&str],
        outputs: &[&str],
    ) -> Result<BlockId, LayoutError> {
        if self.block_names.contains_key(name) {
            return Err(LayoutError::DuplicateName {
                kind: ItemKind::Block,
                name: name.to_string(),
            });
        }
        let all_pins: Vec<&str> = inputs.iter().chain(outputs).copied().collect();
        for (i, pin) in all_pins.iter().enumerate() {
            if all_pins[..i].contains(pin) {
                return Err(LayoutError::DuplicatePin {
                    block: name.to_string(),
                    pin: pin.to_string(),
                });
            }
        }

        let geometry = measure_block(name, inputs, outputs, &self.config);
        let position = match placement {
            Placement::Exact(point) => point.snapped(self.config.grid_size),
            Placement::Search { hint } => {
                let hint = hint.unwrap_or_else(|| self.default_placement_hint());
                let extent = geometry.extent;
                self.search_position(geometry.size, hint, false, |candidate| {
                    extent.translated(candidate.top_left)
                }, None)
            }
        };

        let id = BlockId(self.next_block_id);
        self.next_block_id += 1;
        self.blocks.insert(
            id,
            Block {
                name: name.to_string(),
                position,
                size: geometry.size,
                extent: geometry.extent,
                locked: false,
                inputs: IndexMap::new(),
                outputs: IndexMap::new(),
            },
        );
        self.block_names.insert(name.to_string(), id);

        for (direction, labels) in [(PinDirection::Input, inputs), (PinDirection::Output, outputs)] {
            for label in labels {
                self.insert_block_pin(id, label, direction)?;
            }
        }

        self.recompute_block_geometry(id)?;
        self.realign_diagram_pins();
        tracing::debug!(block = name, x = position.x, y = position.y, "created block");
        Ok(id)
    }

    fn insert_block_pin(&mut self, id: BlockId, name: &str, direction: PinDirection) -> Result<PinId, LayoutError> {
        let block = self.blocks.get(&id).ok_or(LayoutError::UnknownBlock(id))?;
        let index = block.pins(direction).len();
        let position = block.position;
        let node = self.graph.add_node(Pin {
            name: name.to_string(),
            direction,
            owner: PinOwner::Block(id),
            index,
            position,
            locked: false,
        });
        let pin = PinId(node);
        if let Some(block) = self.blocks.get_mut(&id) {
            block.pins_mut(direction).insert(name.to_string(), pin);
        }
        Ok(pin)
    }

    pub fn add_block_pin(&mut self, id: BlockId, name: &str, direction: PinDirection) -> Result<PinId, LayoutError> {
        let block = self.blocks.get(&id).ok_or(LayoutError::UnknownBlock(id))?;
        if block.has_pin(name) {
            return Err(LayoutError::DuplicatePin {
                block: block.name.clone(),
                pin: name.to_string(),
            });
        }
        let pin = self.insert_block_pin(id, name, direction)?;
        self.recompute_block_geometry(id)?;
        self.realign_diagram_pins();
        Ok(pin)
    }

    pub fn rename_block(&mut self, id: BlockId, new_name: &str) -> Result<(), LayoutError> {
        let block = self.blocks.get(&id).ok_or(LayoutError::UnknownBlock(id))?;
        if block.name == new_name {
            return Ok(());
        }
        if self.block_names.contains_key(new_name) {
            return Err(LayoutError::DuplicateName {
                kind: ItemKind::Block,
                name: new_name.to_string(),
            });
        }
        let old_name = block.name.clone();
        self.block_names.remove(&old_name);
        self.block_names.insert(new_name.to_string(), id);
        if let Some(block) = self.blocks.get_mut(&id) {
            block.name = new_name.to_string();
        }
        self.recompute_block_geometry(id)?;
        self.realign_diagram_pins();
        tracing::debug!(from = %old_name, to = new_name, "renamed block");
        Ok(())
    }

    pub fn set_block_locked(&mut self, id: BlockId, locked: bool) -> Result<(), LayoutError> {
        let block = self.blocks.get_mut(&id).ok_or(LayoutError::UnknownBlock(id))?;
        block.locked = locked;
        Ok(())
    }

    /// Moves the block's top-left corner to `position` (snapped). Overlaps are not checked.
    pub fn move_block(&mut self, id: BlockId, position: Point) -> Result<(), LayoutError> {
        let position = position.snapped(self.config.grid_size);
        let block = self.blocks.get_mut(&id).ok_or(LayoutError::UnknownBlock(id))?;
        block.position = position;
        self.recompute_block_geometry(id)?;
        self.realign_diagram_pins();
        Ok(())
    }

    /// Removes the block together with its pins and every wire attached to them.
    pub fn remove_block(&mut self, id: BlockId) -> Result<(), LayoutError> {
        let block = self.blocks.get(&id).ok_or(LayoutError::UnknownBlock(id))?;
        let pins: Vec<PinId> = block.inputs.values().chain(block.outputs.values()).copied().collect();
        for pin in &pins {
            self.detach_pin(*pin);
        }
        for pin in pins {
            self.graph.remove_node(pin.0);
        }
        if let Some(block) = self.blocks.shift_remove(&id) {
            self.block_names.remove(&block.name);
            tracing::debug!(block = %block.name, "removed block");
        }
        self.obstacles.remove(ItemRef::Block(id));
        self.realign_diagram_pins();
        Ok(())
    }

    /// Names of the block's pins of one direction, in index order.
    pub fn block_pin_order(&self, id: BlockId, direction: PinDirection) -> Result<Vec<String>, LayoutError> {
        let block = self.blocks.get(&id).ok_or(LayoutError::UnknownBlock(id))?;
        Ok(self.names_by_index(block.pins(direction).values()))
    }

    pub fn set_block_pin_order<S: AsRef<str>>(
        &mut self,
        id: BlockId,
        direction: PinDirection,
        names: &[S],
    ) -> Result<(), LayoutError> {
        let block = self.blocks.get(&id).ok_or(LayoutError::UnknownBlock(id))?;
        let target = format!("{} pins of block '{}'", direction, block.name);
        let updates = ordered_pins(block.pins(direction), names, target)?;
        for (pin, index) in updates {
            self.graph[pin.0].index = index;
        }
        self.recompute_block_geometry(id)
    }

    /// Refreshes size, title extent, pin anchors and the spatial index entry of a block.
    pub fn recompute_block_geometry(&mut self, id: BlockId) -> Result<(), LayoutError> {
        let block = self.blocks.get(&id).ok_or(LayoutError::UnknownBlock(id))?;
        let input_labels: Vec<&str> = block.inputs.keys().map(String::as_str).collect();
        let output_labels: Vec<&str> = block.outputs.keys().map(String::as_str).collect();
        let geometry = measure_block(&block.name, &input_labels, &output_labels, &self.config);

        let mut anchors = Vec::with_capacity(input_labels.len() + output_labels.len());
        for direction in [PinDirection::Input, PinDirection::Output] {
            for pin in block.pins(direction).values() {
                let offset = pin_offset(direction, self.graph[pin.0].index, geometry.size.width, &self.config);
                anchors.push((*pin, block.position + offset));
            }
        }

        let block = self.blocks.get_mut(&id).ok_or(LayoutError::UnknownBlock(id))?;
        block.size = geometry.size;
        block.extent = geometry.extent;
        let bounding = block.bounding_rect();

        for (pin, position) in anchors {
            self.graph[pin.0].position = position;
        }
        self.obstacles.upsert(ItemRef::Block(id), bounding);
        Ok(())
    }

    // Diagram pins

    pub fn create_diagram_input(&mut self, name: &str, placement: Placement) -> Result<PinId, LayoutError> {
        self.create_diagram_pin(DiagramPinKind::Input, name, placement)
    }

    pub fn create_diagram_output(&mut self, name: &str, placement: Placement) -> Result<PinId, LayoutError> {
        self.create_diagram_pin(DiagramPinKind::Output, name, placement)
    }

    pub fn create_diagram_pin(
        &mut self,
        kind: DiagramPinKind,
        name: &str,
        placement: Placement,
    ) -> Result<PinId, LayoutError> {
        if self.diagram_pin_map(kind).contains_key(name) {
            return Err(LayoutError::DuplicateName {
                kind: kind.item_kind(),
                name: name.to_string(),
            });
        }

        let size = self.diagram_pin_size();
        let position = match placement {
            Placement::Exact(point) => point.snapped(self.config.grid_size),
            Placement::Search { hint } => {
                self.search_position(size, hint.unwrap_or(Point::ORIGIN), true, |candidate| *candidate, None)
            }
        };

        let index = self.diagram_pin_map(kind).len();
        let node = self.graph.add_node(Pin {
            name: name.to_string(),
            direction: kind.direction(),
            owner: PinOwner::Diagram(kind),
            index,
            position,
            locked: false,
        });
        let pin = PinId(node);
        self.diagram_pin_map_mut(kind).insert(name.to_string(), pin);
        self.obstacles
            .upsert(ItemRef::DiagramPin(pin), Rect::from_center(position, size));
        self.realign_diagram_pins();
        tracing::debug!(pin = name, ?kind, "created diagram pin");
        Ok(pin)
    }

    pub fn rename_diagram_pin(&mut self, pin: PinId, new_name: &str) -> Result<(), LayoutError> {
        let kind = self.diagram_pin_kind(pin)?;
        let old_name = self.graph[pin.0].name.clone();
        if old_name == new_name {
            return Ok(());
        }
        let map = self.diagram_pin_map_mut(kind);
        if map.contains_key(new_name) {
            return Err(LayoutError::DuplicateName {
                kind: kind.item_kind(),
                name: new_name.to_string(),
            });
        }
        map.shift_remove(&old_name);
        map.insert(new_name.to_string(), pin);
        self.graph[pin.0].name = new_name.to_string();
        Ok(())
    }

    pub fn set_diagram_pin_locked(&mut self, pin: PinId, locked: bool) -> Result<(), LayoutError> {
        self.diagram_pin_kind(pin)?;
        self.graph[pin.0].locked = locked;
        Ok(())
    }

    /// Removes the diagram pin and its wires, the remaining pins of its kind close ranks.
    pub fn remove_diagram_pin(&mut self, pin: PinId) -> Result<(), LayoutError> {
        let kind = self.diagram_pin_kind(pin)?;
        self.detach_pin(pin);
        let removed = self.graph.remove_node(pin.0);
        if let Some(removed) = removed {
            self.diagram_pin_map_mut(kind).shift_remove(&removed.name);
        }
        self.obstacles.remove(ItemRef::DiagramPin(pin));

        for (index, remaining) in self.diagram_pins(kind).into_iter().enumerate() {
            self.graph[remaining.0].index = index;
        }
        self.realign_diagram_pins();
        Ok(())
    }

    /// Diagram pins of one kind in index order.
    pub fn diagram_pins(&self, kind: DiagramPinKind) -> Vec<PinId> {
        let mut pins: Vec<PinId> = self.diagram_pin_map(kind).values().copied().collect();
        pins.sort_by_key(|pin| self.graph[pin.0].index);
        pins
    }

    pub fn diagram_pin_order(&self, kind: DiagramPinKind) -> Vec<String> {
        self.names_by_index(self.diagram_pin_map(kind).values())
    }

    pub fn set_diagram_pin_order<S: AsRef<str>>(&mut self, kind: DiagramPinKind, names: &[S]) -> Result<(), LayoutError> {
        let target = format!("{:?} diagram pins", kind);
        let updates = ordered_pins(self.diagram_pin_map(kind), names, target)?;
        for (pin, index) in updates {
            self.graph[pin.0].index = index;
        }
        self.realign_diagram_pins();
        Ok(())
    }

    /// Spreads diagram inputs along the left and outputs along the right edge of the
    /// super rectangle, in index order. Does nothing while there are no blocks.
    pub fn realign_diagram_pins(&mut self) {
        let Some(frame) = self.super_rect() else {
            return;
        };
        let size = self.diagram_pin_size();
        let grid = self.config.grid_size;

        for kind in [DiagramPinKind::Input, DiagramPinKind::Output] {
            let pins = self.diagram_pins(kind);
            let x = match kind {
                DiagramPinKind::Input => frame.left(),
                DiagramPinKind::Output => frame.right(),
            };
            let segment = frame.height() / (pins.len() + 1) as f64;
            for (i, pin) in pins.into_iter().enumerate() {
                let position = Point::new(x, frame.top() + (i + 1) as f64 * segment).snapped(grid);
                self.graph[pin.0].position = position;
                self.obstacles
                    .upsert(ItemRef::DiagramPin(pin), Rect::from_center(position, size));
            }
        }
    }

    fn diagram_pin_kind(&self, pin: PinId) -> Result<DiagramPinKind, LayoutError> {
        match self.graph.node_weight(pin.0).map(|pin| pin.owner) {
            Some(PinOwner::Diagram(kind)) => Ok(kind),
            _ => Err(LayoutError::UnknownPin(pin)),
        }
    }

    fn diagram_pin_map(&self, kind: DiagramPinKind) -> &IndexMap<String, PinId> {
        match kind {
            DiagramPinKind::Input => &self.diagram_inputs,
            DiagramPinKind::Output => &self.diagram_outputs,
        }
    }

    fn diagram_pin_map_mut(&mut self, kind: DiagramPinKind) -> &mut IndexMap<String, PinId> {
        match kind {
            DiagramPinKind::Input => &mut self.diagram_inputs,
            DiagramPinKind::Output => &mut self.diagram_outputs,
        }
    }

    pub fn diagram_pin_size(&self) -> Size {
        let side = 2.0 * self.config.diagram_pin_half_extent;
        Size::new(side, side)
    }

    // Wires

    pub fn create_wire(&mut self, source: PinId, destination: PinId) -> Result<WireId, LayoutError> {
        let source_pin = self.pin(source).ok_or(LayoutError::UnknownPin(source))?;
        let destination_pin = self.pin(destination).ok_or(LayoutError::UnknownPin(destination))?;
        if source == destination {
            return Err(LayoutError::SelfConnection(self.pin_label(source)));
        }
        if source_pin.direction != PinDirection::Output || destination_pin.direction != PinDirection::Input {
            return Err(LayoutError::InvalidConnection);
        }
        if !self.incident_wires(destination).is_empty() {
            return Err(LayoutError::InputOccupied(self.pin_label(destination)));
        }

        let edge = self.graph.add_edge(source.0, destination.0, Wire::default());
        tracing::info!(
            "Wire connected from {} to {}",
            self.pin_label(source),
            self.pin_label(destination)
        );
        Ok(WireId(edge))
    }

    pub fn remove_wire(&mut self, wire: WireId) -> Result<(), LayoutError> {
        self.graph
            .remove_edge(wire.0)
            .map(|_| ())
            .ok_or(LayoutError::UnknownWire(wire))
    }

    pub fn set_wire_locked(&mut self, wire: WireId, locked: bool) -> Result<(), LayoutError> {
        let weight = self.graph.edge_weight_mut(wire.0).ok_or(LayoutError::UnknownWire(wire))?;
        weight.locked = locked;
        Ok(())
    }

    fn detach_pin(&mut self, pin: PinId) {
        for wire in self.incident_wires(pin) {
            self.graph.remove_edge(wire.0);
        }
    }

    /// Clears every block, diagram pin and wire lock. Returns how many were set.
    pub fn unlock_all(&mut self) -> usize {
        let mut cleared = 0;
        for block in self.blocks.values_mut() {
            cleared += usize::from(std::mem::take(&mut block.locked));
        }
        for pin in self.graph.node_weights_mut() {
            cleared += usize::from(std::mem::take(&mut pin.locked));
        }
        for wire in self.graph.edge_weights_mut() {
            cleared += usize::from(std::mem::take(&mut wire.locked));
        }
        tracing::info!(cleared, "unlocked all items");
        cleared
    }

    // Queries

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> + '_ {
        self.blocks.iter().map(|(id, block)| (*id, block))
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    pub fn block_id(&self, name: &str) -> Option<BlockId> {
        self.block_names.get(name).copied()
    }

    pub fn pin(&self, pin: PinId) -> Option<&Pin> {
        self.graph.node_weight(pin.0)
    }

    /// Looks a pin up by name, on the named block or among the diagram pins.
    pub fn resolve_pin(&self, block: Option<&str>, pin: &str) -> Option<PinId> {
        match block {
            Some(block) => {
                let block = self.blocks.get(&self.block_id(block)?)?;
                block.inputs.get(pin).or_else(|| block.outputs.get(pin)).copied()
            }
            None => self
                .diagram_inputs
                .get(pin)
                .or_else(|| self.diagram_outputs.get(pin))
                .copied(),
        }
    }

    /// Creates a wire between two pins given by name, see [`Layout::resolve_pin`].
    pub fn connect(
        &mut self,
        source: (Option<&str>, &str),
        destination: (Option<&str>, &str),
    ) -> Result<WireId, LayoutError> {
        let lookup = |(block, pin): (Option<&str>, &str)| {
            self.resolve_pin(block, pin).ok_or_else(|| {
                LayoutError::PinNotFound(match block {
                    Some(block) => format!("{}:{}", block, pin),
                    None => pin.to_owned(),
                })
            })
        };
        let source = lookup(source)?;
        let destination = lookup(destination)?;
        self.create_wire(source, destination)
    }

    /// `Block:pin` for block pins, the bare name for diagram pins.
    pub fn pin_label(&self, pin: PinId) -> String {
        match self.pin(pin) {
            Some(Pin {
                name,
                owner: PinOwner::Block(block),
                ..
            }) => match self.blocks.get(block) {
                Some(block) => format!("{}:{}", block.name, name),
                None => name.clone(),
            },
            Some(pin) => pin.name.clone(),
            None => String::from("<removed>"),
        }
    }

    pub fn wires(&self) -> impl Iterator<Item = WireId> + '_ {
        self.graph.edge_indices().map(WireId)
    }

    pub fn wire_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn wire(&self, wire: WireId) -> Option<&Wire> {
        self.graph.edge_weight(wire.0)
    }

    /// Source and destination pin of a wire.
    pub fn wire_ends(&self, wire: WireId) -> Option<(PinId, PinId)> {
        self.graph
            .edge_endpoints(wire.0)
            .map(|(source, destination)| (PinId(source), PinId(destination)))
    }

    pub fn wire_endpoint_blocks(&self, wire: WireId) -> Option<(Option<BlockId>, Option<BlockId>)> {
        let (source, destination) = self.wire_ends(wire)?;
        Some((self.pin(source)?.block(), self.pin(destination)?.block()))
    }

    pub fn incident_wires(&self, pin: PinId) -> Vec<WireId> {
        let incoming = self.graph.edges_directed(pin.0, EdgeDirection::Incoming);
        let outgoing = self.graph.edges_directed(pin.0, EdgeDirection::Outgoing);
        incoming
            .chain(outgoing)
            .map(|edge| WireId(edge.id()))
            .collect()
    }

    /// A pin is locked by its own flag or by any locked wire attached to it.
    pub fn is_pin_locked(&self, pin: PinId) -> bool {
        let own = self.pin(pin).is_some_and(|pin| pin.locked);
        own || self
            .incident_wires(pin)
            .into_iter()
            .any(|wire| self.wire(wire).is_some_and(Wire::is_locked))
    }

    /// The routed shape of a wire.
    pub fn wire_curve(&self, wire: WireId) -> Option<CubicCurve> {
        let (source, destination) = self.wire_ends(wire)?;
        let source = self.pin(source)?;
        let destination = self.pin(destination)?;
        Some(self.router.route(
            source.position,
            destination.position,
            source.direction,
            Some(destination.direction),
            false,
        ))
    }

    /// The shape of a wire being dragged from `pin` to `cursor`.
    pub fn provisional_curve(&self, pin: PinId, cursor: Point) -> Option<CubicCurve> {
        let pin = self.pin(pin)?;
        Some(self.router.route(pin.position, cursor, pin.direction, None, true))
    }

    /// Union of all block rectangles, `None` without blocks.
    pub fn blocks_bounding_rect(&self) -> Option<Rect> {
        self.blocks
            .values()
            .map(Block::bounding_rect)
            .reduce(|acc, rect| acc.united(&rect))
    }

    /// The block bounds grown by the diagram margins; diagram pins sit on its left and right edges.
    pub fn super_rect(&self) -> Option<Rect> {
        self.blocks_bounding_rect()
            .map(|rect| rect.expanded(self.config.super_margin_x, self.config.super_margin_y))
    }

    /// Union of everything placed, diagram pins included.
    pub fn items_bounding_rect(&self) -> Option<Rect> {
        let size = self.diagram_pin_size();
        let pins = self
            .diagram_inputs
            .values()
            .chain(self.diagram_outputs.values())
            .filter_map(|pin| self.pin(*pin))
            .map(|pin| Rect::from_center(pin.position, size));
        self.blocks
            .values()
            .map(Block::bounding_rect)
            .chain(pins)
            .reduce(|acc, rect| acc.united(&rect))
    }

    pub fn item_rect(&self, item: ItemRef) -> Option<Rect> {
        self.obstacles.rect(item)
    }

    /// Whether `rect` overlaps any block or diagram pin other than `ignore`.
    pub fn overlaps_any(&self, rect: &Rect, ignore: Option<ItemRef>) -> bool {
        self.obstacles.overlaps_any(rect, ignore)
    }

    /// Free grid position for a `size` rectangle near `hint`, see [`SpiralSearch`].
    pub fn find_placement(&self, size: Size, hint: Point, centered: bool, ignore: Option<ItemRef>) -> Point {
        self.search_position(size, hint, centered, |candidate| *candidate, ignore)
    }

    fn search_position<F>(&self, size: Size, hint: Point, centered: bool, footprint: F, ignore: Option<ItemRef>) -> Point
    where
        F: Fn(&Rect) -> Rect,
    {
        let search = SpiralSearch::new(self.config.grid_size, self.config.placement_max_radius);
        search.find_placement(
            size.width,
            size.height,
            |candidate| self.obstacles.overlaps_any(&footprint(candidate), ignore),
            hint,
            centered,
        )
    }

    fn default_placement_hint(&self) -> Point {
        match self.items_bounding_rect() {
            Some(rect) => Point::new(rect.right() + self.config.standard_block_width, rect.center().y),
            None => Point::ORIGIN,
        }
    }

    fn names_by_index<'a>(&self, pins: impl Iterator<Item = &'a PinId>) -> Vec<String> {
        let mut pins: Vec<&Pin> = pins.filter_map(|pin| self.pin(*pin)).collect();
        pins.sort_by_key(|pin| pin.index);
        pins.into_iter().map(|pin| pin.name.clone()).collect()
    }

    fn pin_snapshots<'a>(&self, pins: impl Iterator<Item = &'a PinId>) -> Vec<PinSnapshot> {
        let mut snapshots: Vec<PinSnapshot> = pins
            .filter_map(|pin| self.pin(*pin))
            .map(|pin| PinSnapshot {
                name: pin.name.clone(),
                index: pin.index,
                position: pin.position,
            })
            .collect();
        snapshots.sort_by_key(|pin| pin.index);
        snapshots
    }

    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            blocks: self
                .blocks
                .values()
                .map(|block| BlockSnapshot {
                    name: block.name.clone(),
                    position: block.position,
                    size: block.size,
                    locked: block.locked,
                    inputs: self.pin_snapshots(block.inputs.values()),
                    outputs: self.pin_snapshots(block.outputs.values()),
                })
                .collect(),
            diagram_inputs: self.pin_snapshots(self.diagram_inputs.values()),
            diagram_outputs: self.pin_snapshots(self.diagram_outputs.values()),
            wires: self
                .graph
                .edge_indices()
                .filter_map(|edge| self.wire_snapshot(edge))
                .collect(),
        }
    }

    fn wire_snapshot(&self, edge: EdgeIndex) -> Option<WireSnapshot> {
        let (source, destination) = self.wire_ends(WireId(edge))?;
        Some(WireSnapshot {
            source: self.pin_label(source),
            destination: self.pin_label(destination),
            locked: self.wire(WireId(edge))?.locked,
        })
    }
}

/// Validates that `names` is a permutation of the keys of `pins` and pairs each pin with its new index.
fn ordered_pins<S: AsRef<str>>(
    pins: &IndexMap<String, PinId>,
    names: &[S],
    target: String,
) -> Result<Vec<(PinId, usize)>, LayoutError> {
    let mismatch = || LayoutError::OrderMismatch { target: target.clone() };
    if names.len() != pins.len() {
        return Err(mismatch());
    }
    let mut updates: Vec<(PinId, usize)> = Vec::with_capacity(names.len());
    for (index, name) in names.iter().enumerate() {
        let Some(pin) = pins.get(name.as_ref()) else {
            return Err(mismatch());
        };
        if updates.iter().any(|(seen, _)| seen == pin) {
            return Err(mismatch());
        }
        updates.push((*pin, index));
    }
    Ok(updates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blocks() -> (Layout, BlockId, BlockId) {
        let mut layout = Layout::default();
        let source = layout
            .create_block("Source", Placement::Exact(Point::new(0.0, 0.0)), &["Control"], &["Out1", "Out2"])
            .unwrap();
        let sink = layout
            .create_block("Sink", Placement::Exact(Point::new(400.0, 0.0)), &["A", "B"], &["Status"])
            .unwrap();
        (layout, source, sink)
    }

    #[test]
    fn block_names_are_unique() {
        let (mut layout, _, _) = two_blocks();
        let err = layout.create_block("Sink", Placement::auto(), &[], &[]).unwrap_err();
        assert!(matches!(err, LayoutError::DuplicateName { kind: ItemKind::Block, .. }));
        assert_eq!(layout.block_count(), 2);
    }

    #[test]
    fn duplicate_pins_are_rejected_before_anything_is_created() {
        let mut layout = Layout::default();
        let err = layout.create_block("B", Placement::auto(), &["x"], &["x"]).unwrap_err();
        assert!(matches!(err, LayoutError::DuplicatePin { .. }));
        assert_eq!(layout.block_count(), 0);
        assert!(layout.block_id("B").is_none());
    }

    #[test]
    fn wires_must_run_from_output_to_free_input() {
        let (mut layout, source, sink) = two_blocks();
        let out1 = layout.block(source).unwrap().outputs()["Out1"];
        let out2 = layout.block(source).unwrap().outputs()["Out2"];
        let a = layout.block(sink).unwrap().inputs()["A"];
        let control = layout.block(source).unwrap().inputs()["Control"];

        assert_eq!(layout.create_wire(a, out1), Err(LayoutError::InvalidConnection));
        assert!(matches!(layout.create_wire(out1, out1), Err(LayoutError::SelfConnection(_))));
        assert_eq!(layout.create_wire(out1, out2), Err(LayoutError::InvalidConnection));

        layout.create_wire(out1, a).unwrap();
        assert_eq!(
            layout.create_wire(out2, a),
            Err(LayoutError::InputOccupied("Sink:A".to_string()))
        );
        // outputs fan out freely
        layout.create_wire(out1, control).unwrap();
        assert_eq!(layout.wire_count(), 2);
        assert_eq!(layout.incident_wires(out1).len(), 2);
    }

    #[test]
    fn pin_anchors_follow_the_block() {
        let (mut layout, source, _) = two_blocks();
        let out2 = layout.block(source).unwrap().outputs()["Out2"];
        let width = layout.block(source).unwrap().size().width;
        assert_eq!(layout.pin(out2).unwrap().position(), Point::new(width, 40.0));

        layout.move_block(source, Point::new(-97.0, 203.0)).unwrap();
        assert_eq!(layout.block(source).unwrap().position(), Point::new(-100.0, 200.0));
        assert_eq!(layout.pin(out2).unwrap().position(), Point::new(width - 100.0, 240.0));
    }

    #[test]
    fn diagram_pins_sit_on_the_super_rectangle() {
        let (mut layout, _, _) = two_blocks();
        let first = layout.create_diagram_input("In1", Placement::auto()).unwrap();
        let second = layout.create_diagram_input("In2", Placement::auto()).unwrap();
        let output = layout.create_diagram_output("Out", Placement::auto()).unwrap();

        let frame = layout.super_rect().unwrap();
        let grid = layout.config().grid_size;
        for pin in [first, second] {
            let position = layout.pin(pin).unwrap().position();
            assert_eq!(position.x, crate::geometry::snap_to_grid(frame.left(), grid));
            assert!(position.is_on_grid(grid));
        }
        assert!(layout.pin(first).unwrap().position().y < layout.pin(second).unwrap().position().y);
        assert_eq!(
            layout.pin(output).unwrap().position().x,
            crate::geometry::snap_to_grid(frame.right(), grid)
        );

        layout
            .set_diagram_pin_order(DiagramPinKind::Input, &["In2", "In1"])
            .unwrap();
        assert!(layout.pin(first).unwrap().position().y > layout.pin(second).unwrap().position().y);
        assert_eq!(layout.diagram_pin_order(DiagramPinKind::Input), vec!["In2", "In1"]);
    }

    #[test]
    fn diagram_pins_are_unique_per_kind() {
        let mut layout = Layout::default();
        layout.create_diagram_input("X", Placement::auto()).unwrap();
        layout.create_diagram_output("X", Placement::auto()).unwrap();
        let err = layout.create_diagram_input("X", Placement::auto()).unwrap_err();
        assert!(matches!(err, LayoutError::DuplicateName { kind: ItemKind::DiagramInput, .. }));
    }

    #[test]
    fn removing_a_block_drops_its_wires() {
        let (mut layout, source, sink) = two_blocks();
        let out1 = layout.resolve_pin(Some("Source"), "Out1").unwrap();
        let a = layout.resolve_pin(Some("Sink"), "A").unwrap();
        layout.create_wire(out1, a).unwrap();

        layout.remove_block(source).unwrap();
        assert_eq!(layout.wire_count(), 0);
        assert!(layout.incident_wires(a).is_empty());
        assert!(layout.pin(out1).is_none());
        assert!(layout.block_id("Source").is_none());
        assert_eq!(layout.blocks().map(|(id, _)| id).collect::<Vec<_>>(), vec![sink]);
    }

    #[test]
    fn pin_order_must_name_every_pin_once() {
        let (mut layout, _, sink) = two_blocks();
        assert!(matches!(
            layout.set_block_pin_order(sink, PinDirection::Input, &["A", "A"]),
            Err(LayoutError::OrderMismatch { .. })
        ));
        assert!(matches!(
            layout.set_block_pin_order(sink, PinDirection::Input, &["A"]),
            Err(LayoutError::OrderMismatch { .. })
        ));
        assert_eq!(layout.block_pin_order(sink, PinDirection::Input).unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn locked_wires_lock_their_pins() {
        let (mut layout, source, sink) = two_blocks();
        let out1 = layout.resolve_pin(Some("Source"), "Out1").unwrap();
        let a = layout.resolve_pin(Some("Sink"), "A").unwrap();
        let wire = layout.create_wire(out1, a).unwrap();
        layout.set_wire_locked(wire, true).unwrap();
        layout.set_block_locked(source, true).unwrap();
        layout.set_block_locked(sink, true).unwrap();

        assert!(layout.is_pin_locked(out1));
        assert!(layout.is_pin_locked(a));
        assert_eq!(layout.unlock_all(), 3);
        assert!(!layout.is_pin_locked(a));
        assert!(!layout.block(source).unwrap().is_locked());
    }

    #[test]
    fn searched_blocks_do_not_overlap() {
        let mut layout = Layout::default();
        let a = layout.create_block("A", Placement::near(Point::ORIGIN), &["in"], &["out"]).unwrap();
        let b = layout.create_block("B", Placement::near(Point::ORIGIN), &["in"], &["out"]).unwrap();
        let c = layout.create_block("C", Placement::auto(), &[], &[]).unwrap();

        let rects: Vec<Rect> = [a, b, c]
            .iter()
            .map(|id| layout.block(*id).unwrap().bounding_rect())
            .collect();
        for (i, rect) in rects.iter().enumerate() {
            for other in &rects[i + 1..] {
                assert!(!rect.overlaps(other));
            }
        }
        for id in [a, b, c] {
            assert!(layout.block(id).unwrap().position().is_on_grid(20.0));
        }
    }

    #[test]
    fn renaming_keeps_the_name_index_current() {
        let (mut layout, source, _) = two_blocks();
        assert!(layout.rename_block(source, "Sink").is_err());
        layout.rename_block(source, "A much longer block title than before").unwrap();
        assert_eq!(layout.block_id("A much longer block title than before"), Some(source));
        assert!(layout.block_id("Source").is_none());
        assert!(layout.block(source).unwrap().size().width > 160.0);
    }

    #[test]
    fn empty_layout_has_no_bounds() {
        let layout = Layout::default();
        assert!(layout.blocks_bounding_rect().is_none());
        assert!(layout.super_rect().is_none());
    }

    #[test]
    fn adding_pins_grows_the_block() {
        let mut layout = Layout::default();
        let id = layout
            .create_block("Filter", Placement::Exact(Point::new(0.0, 0.0)), &["in"], &["out"])
            .unwrap();
        assert_eq!(layout.block(id).unwrap().size().height, 40.0);

        layout.add_block_pin(id, "gain", PinDirection::Input).unwrap();
        let bias = layout.add_block_pin(id, "bias", PinDirection::Input).unwrap();

        let block = layout.block(id).unwrap();
        assert_eq!(block.size().height, 80.0);
        assert_eq!(layout.pin(bias).unwrap().index(), 2);
        assert_eq!(layout.pin(bias).unwrap().position(), Point::new(0.0, 60.0));
        assert_eq!(layout.item_rect(ItemRef::Block(id)), Some(block.bounding_rect()));
        assert!(matches!(
            layout.add_block_pin(id, "out", PinDirection::Input),
            Err(LayoutError::DuplicatePin { .. })
        ));
    }

    #[test]
    fn removing_a_diagram_pin_closes_the_gap() {
        let (mut layout, source, _) = two_blocks();
        layout.create_diagram_input("I1", Placement::auto()).unwrap();
        let i2 = layout.create_diagram_input("I2", Placement::auto()).unwrap();
        let i3 = layout.create_diagram_input("I3", Placement::auto()).unwrap();
        let control = layout.block(source).unwrap().inputs()["Control"];
        layout.create_wire(i2, control).unwrap();

        layout.remove_diagram_pin(i2).unwrap();

        assert_eq!(layout.diagram_pin_order(DiagramPinKind::Input), ["I1", "I3"]);
        let indices: Vec<usize> = layout
            .diagram_pins(DiagramPinKind::Input)
            .into_iter()
            .map(|pin| layout.pin(pin).unwrap().index())
            .collect();
        assert_eq!(indices, [0, 1]);
        assert_eq!(layout.pin(i3).unwrap().index(), 1);
        assert_eq!(layout.wire_count(), 0);
        assert!(layout.incident_wires(control).is_empty());
        assert!(layout.resolve_pin(None, "I2").is_none());
    }

    #[test]
    fn renaming_a_diagram_pin_checks_its_kind() {
        let (mut layout, _, _) = two_blocks();
        let first = layout.create_diagram_input("I1", Placement::auto()).unwrap();
        layout.create_diagram_input("I2", Placement::auto()).unwrap();
        layout.create_diagram_output("O1", Placement::auto()).unwrap();

        assert!(matches!(
            layout.rename_diagram_pin(first, "I2"),
            Err(LayoutError::DuplicateName {
                kind: ItemKind::DiagramInput,
                ..
            })
        ));
        assert_eq!(layout.resolve_pin(None, "I1"), Some(first));

        // outputs live in their own namespace
        layout.rename_diagram_pin(first, "O1").unwrap();
        assert_eq!(layout.resolve_pin(None, "I1"), None);
        assert_eq!(layout.diagram_pin_order(DiagramPinKind::Input), ["O1", "I2"]);
        assert_eq!(layout.pin(first).unwrap().name(), "O1");
    }
}
