use blockdiag_core::config::{HillClimbingParams, LoopParams};
use blockdiag_core::demo::build_demo_layout;
use blockdiag_core::geometry::snap_to_grid;
use blockdiag_core::graph::DiagramPinKind;
use blockdiag_core::layout::legal_moves;
use blockdiag_core::{
    evaluate_cost, optimize, Algorithm, CostParams, HillClimbing, Layout, NoopHost, OptimizeError, Optimizer, Placement,
    Point, RunState, SimulatedAnnealing,
};

/// Three blocks in a row between one diagram input and one diagram output.
fn line_of_three() -> Layout {
    let mut layout = Layout::default();
    layout
        .create_block("First", Placement::Exact(Point::new(0.0, 0.0)), &["in"], &["out"])
        .unwrap();
    layout
        .create_block("Second", Placement::Exact(Point::new(300.0, 100.0)), &["in"], &["out"])
        .unwrap();
    layout
        .create_block("Third", Placement::Exact(Point::new(600.0, -60.0)), &["in"], &["out"])
        .unwrap();
    layout.create_diagram_input("Start", Placement::auto()).unwrap();
    layout.create_diagram_output("End", Placement::auto()).unwrap();

    layout.connect((None, "Start"), (Some("First"), "in")).unwrap();
    layout.connect((Some("First"), "out"), (Some("Second"), "in")).unwrap();
    layout.connect((Some("Second"), "out"), (Some("Third"), "in")).unwrap();
    layout.connect((Some("Third"), "out"), (None, "End")).unwrap();
    layout
}

fn loop_params(iterations: usize) -> LoopParams {
    LoopParams {
        iterations,
        ..LoopParams::default()
    }
}

#[test]
fn frozen_annealing_matches_hill_climbing() {
    for iterations in [1, 60] {
        let mut climbed = line_of_three();
        let moves = legal_moves(&climbed);
        let climbing = Optimizer::seeded(Some(17))
            .run(&mut climbed, &moves, &mut HillClimbing, &loop_params(iterations), &mut NoopHost)
            .unwrap();

        let mut annealed = line_of_three();
        let annealing = Optimizer::seeded(Some(17))
            .run(
                &mut annealed,
                &moves,
                &mut SimulatedAnnealing::new(0.0, 0.995),
                &loop_params(iterations),
                &mut NoopHost,
            )
            .unwrap();

        assert_eq!(climbing, annealing);
        assert_eq!(climbed.snapshot(), annealed.snapshot());
    }
}

#[test]
fn single_locked_block_has_nothing_to_optimize() {
    let mut layout = Layout::default();
    let id = layout.create_block("Only", Placement::auto(), &["in"], &["out"]).unwrap();
    layout.set_block_locked(id, true).unwrap();

    assert!(legal_moves(&layout).is_empty());
    let result = optimize(
        &mut layout,
        &Algorithm::HillClimbing(HillClimbingParams::default()),
        &mut NoopHost,
    );
    assert!(matches!(result, Err(OptimizeError::NoMoves)));
}

#[test]
fn single_unlocked_block_can_still_move() {
    let mut layout = Layout::default();
    layout.create_block("Only", Placement::auto(), &[], &[]).unwrap();
    assert_eq!(legal_moves(&layout).len(), 1);
}

#[test]
fn unlock_all_restores_the_move_set() {
    let mut layout = line_of_three();
    for name in ["First", "Second", "Third"] {
        let id = layout.block_id(name).unwrap();
        layout.set_block_locked(id, true).unwrap();
    }
    assert!(legal_moves(&layout).is_empty());

    assert_eq!(layout.unlock_all(), 3);
    assert_eq!(legal_moves(&layout).len(), 3);
}

#[test]
fn demo_scene_improves_under_hill_climbing() {
    let mut layout = build_demo_layout().unwrap();
    let algorithm = Algorithm::HillClimbing(HillClimbingParams {
        seed: Some(2024),
        ..HillClimbingParams::default()
    });
    let outcome = optimize(&mut layout, &algorithm, &mut NoopHost).unwrap();

    assert_eq!(outcome.state, RunState::Completed);
    assert!(outcome.final_cost <= outcome.initial_cost);
    assert_eq!(outcome.best_cost, outcome.final_cost);
    let recomputed = evaluate_cost(&layout, &CostParams::default()).total;
    assert!((recomputed - outcome.final_cost).abs() < 1e-9);
}

#[test]
fn seeded_runs_are_reproducible() {
    let algorithm = Algorithm::SimulatedAnnealing(blockdiag_core::AnnealingParams {
        iterations: 200,
        seed: Some(99),
        ..blockdiag_core::AnnealingParams::default()
    });
    let mut first = build_demo_layout().unwrap();
    let mut second = build_demo_layout().unwrap();
    let a = optimize(&mut first, &algorithm, &mut NoopHost).unwrap();
    let b = optimize(&mut second, &algorithm, &mut NoopHost).unwrap();
    assert_eq!(a, b);
    assert_eq!(first.snapshot(), second.snapshot());
}

#[test]
fn diagram_pins_stay_on_the_frame_after_optimizing() {
    let mut layout = build_demo_layout().unwrap();
    let algorithm = Algorithm::HillClimbing(HillClimbingParams {
        iterations: 100,
        seed: Some(5),
        ..HillClimbingParams::default()
    });
    optimize(&mut layout, &algorithm, &mut NoopHost).unwrap();

    let frame = layout.super_rect().unwrap();
    let grid = layout.config().grid_size;
    for (kind, edge) in [(DiagramPinKind::Input, frame.left()), (DiagramPinKind::Output, frame.right())] {
        let mut previous_y = f64::NEG_INFINITY;
        for pin in layout.diagram_pins(kind) {
            let position = layout.pin(pin).unwrap().position();
            assert_eq!(position.x, snap_to_grid(edge, grid));
            assert!(position.y >= previous_y);
            previous_y = position.y;
        }
    }
}
