//! A small reference scene: three blocks between two diagram inputs and two outputs.

use crate::config::{Algorithm, AnnealingParams, LayoutConfig};
use crate::error::LayoutError;
use crate::graph::{Layout, Placement};

pub fn build_demo_layout() -> Result<Layout, LayoutError> {
    build_demo_layout_with(LayoutConfig::default())
}

pub fn build_demo_layout_with(config: LayoutConfig) -> Result<Layout, LayoutError> {
    let mut layout = Layout::new(config);

    layout.create_block("Source Block", Placement::auto(), &["Control"], &["Out1", "Another Output"])?;
    layout.create_block("Processor", Placement::auto(), &["InA", "InB"], &["Result", "Status"])?;
    layout.create_block("Sink", Placement::auto(), &["Data"], &["Status"])?;

    layout.create_diagram_input("System Input 1", Placement::auto())?;
    layout.create_diagram_input("System Input 2", Placement::auto())?;
    layout.create_diagram_output("Final Result", Placement::auto())?;
    layout.create_diagram_output("Final Status", Placement::auto())?;

    layout.connect((Some("Source Block"), "Out1"), (Some("Processor"), "InA"))?;
    layout.connect((Some("Source Block"), "Another Output"), (Some("Sink"), "Data"))?;
    layout.connect((None, "System Input 1"), (Some("Source Block"), "Control"))?;
    layout.connect((None, "System Input 2"), (Some("Processor"), "InB"))?;
    layout.connect((Some("Processor"), "Result"), (None, "Final Result"))?;
    layout.connect((Some("Sink"), "Status"), (None, "Final Status"))?;

    tracing::info!(
        blocks = layout.block_count(),
        wires = layout.wire_count(),
        "demo scene ready"
    );
    Ok(layout)
}

/// The annealing schedule the demo scene is tuned for.
pub fn demo_algorithm() -> Algorithm {
    Algorithm::SimulatedAnnealing(AnnealingParams::demo())
}
