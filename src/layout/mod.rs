//! The optimization engine: a single-threaded trial-and-revert loop over legal moves.
//!
//! Each iteration picks a move uniformly at random, applies it, scores the layout and lets
//! an [`AcceptanceStrategy`] decide whether to keep it. Rejected moves are reverted before
//! the next one is chosen, so the layout is never left with a half-applied move.

mod annealing;
mod hill_climbing;
pub mod moves;
mod trace;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use serde::Serialize;

use crate::config::{Algorithm, LoopParams};
use crate::cost::evaluate_cost;
use crate::error::OptimizeError;
use crate::graph::Layout;

pub use annealing::SimulatedAnnealing;
pub use hill_climbing::HillClimbing;
pub use moves::{apply_move, legal_moves, Move, Revert};

use trace::TraceRecorder;

/// Accept/reject policy consulted once per applied move.
pub trait AcceptanceStrategy {
    fn accept(&mut self, current: f64, new: f64, rng: &mut dyn RngCore) -> bool;

    /// Runs after every decided iteration, accepted or not.
    fn on_iteration_end(&mut self) {}

    fn temperature(&self) -> Option<f64> {
        None
    }

    fn name(&self) -> &'static str;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Idle,
    Initializing,
    Iterating,
    Cancelled,
    Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IterationOutcome {
    /// The move could not be applied, e.g. the block would collide.
    Skipped,
    Accepted,
    Rejected,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IterationReport {
    pub iteration: usize,
    pub move_kind: &'static str,
    pub outcome: IterationOutcome,
    /// Cost after the decision.
    pub current_cost: f64,
    pub candidate_cost: f64,
    pub temperature: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunOutcome {
    pub state: RunState,
    pub initial_cost: f64,
    /// Cost of the layout as it was left.
    pub final_cost: f64,
    pub best_cost: f64,
    /// Iterations started, skipped ones included.
    pub iterations: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub skipped: usize,
}

/// Callbacks into whatever drives the optimizer. Every method defaults to doing nothing.
pub trait OptimizerHost {
    fn show_progress(&mut self, _max: usize) {}

    fn update_progress(&mut self, _value: usize) {}

    fn hide_progress(&mut self) {}

    /// Polled at the start of every iteration.
    fn is_cancelled(&mut self) -> bool {
        false
    }

    /// User-facing status messages.
    fn log(&mut self, _message: &str) {}

    /// Called at every reporting interval so an event loop can catch up.
    fn yield_now(&mut self) {}

    fn on_iteration(&mut self, _report: &IterationReport) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHost;

impl OptimizerHost for NoopHost {}

/// Hides the progress indicator however the run ends.
struct ProgressGuard<'a> {
    host: &'a mut dyn OptimizerHost,
}

impl<'a> ProgressGuard<'a> {
    fn show(host: &'a mut dyn OptimizerHost, max: usize) -> Self {
        host.show_progress(max);
        ProgressGuard { host }
    }
}

impl Drop for ProgressGuard<'_> {
    fn drop(&mut self) {
        self.host.hide_progress();
    }
}

fn status(host: &mut dyn OptimizerHost, message: String) {
    tracing::info!("{}", message);
    host.log(&message);
}

pub struct Optimizer<R: RngCore = StdRng> {
    rng: R,
    state: RunState,
}

impl Optimizer<StdRng> {
    /// Deterministic with a seed, seeded from the OS otherwise.
    pub fn seeded(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Optimizer::with_rng(rng)
    }
}

impl<R: RngCore> Optimizer<R> {
    pub fn with_rng(rng: R) -> Self {
        Optimizer {
            rng,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, RunState::Initializing | RunState::Iterating)
    }

    /// Runs `params.iterations` trial moves drawn from `moves` against `layout`.
    ///
    /// Fails up front when there are no blocks or no moves. On cancellation the outcome
    /// carries [`RunState::Cancelled`] and the cost of the layout as it stands; cancelling
    /// is not an error.
    pub fn run(
        &mut self,
        layout: &mut Layout,
        moves: &[Move],
        strategy: &mut dyn AcceptanceStrategy,
        params: &LoopParams,
        host: &mut dyn OptimizerHost,
    ) -> Result<RunOutcome, OptimizeError> {
        self.state = RunState::Initializing;
        if layout.block_count() == 0 {
            self.state = RunState::Idle;
            return Err(OptimizeError::NoBlocks);
        }
        if moves.is_empty() {
            self.state = RunState::Idle;
            return Err(OptimizeError::NoMoves);
        }

        let progress = ProgressGuard::show(host, params.iterations);
        let result = self.iterate(layout, moves, strategy, params, &mut *progress.host);
        drop(progress);

        self.state = match &result {
            Ok(outcome) => outcome.state,
            Err(_) => RunState::Idle,
        };
        result
    }

    fn iterate(
        &mut self,
        layout: &mut Layout,
        moves: &[Move],
        strategy: &mut dyn AcceptanceStrategy,
        params: &LoopParams,
        host: &mut dyn OptimizerHost,
    ) -> Result<RunOutcome, OptimizeError> {
        let mut trace = TraceRecorder::from_env();
        let step = params.move_step(layout.config().grid_size);

        let initial_cost = evaluate_cost(layout, &params.cost).total;
        if !initial_cost.is_finite() {
            return Err(OptimizeError::NonFiniteCost {
                iteration: 0,
                cost: initial_cost,
            });
        }
        status(host, format!("Initial cost: {:.2}", initial_cost));
        trace.record_start(layout, strategy.name(), initial_cost);

        self.state = RunState::Iterating;
        let mut outcome = RunOutcome {
            state: RunState::Completed,
            initial_cost,
            final_cost: initial_cost,
            best_cost: initial_cost,
            iterations: 0,
            accepted: 0,
            rejected: 0,
            skipped: 0,
        };
        let mut current = initial_cost;

        for iteration in 0..params.iterations {
            if host.is_cancelled() {
                status(host, "Optimization cancelled by user.".to_owned());
                outcome.state = RunState::Cancelled;
                break;
            }
            outcome.iterations = iteration + 1;

            let Some(mv) = moves.choose(&mut self.rng) else {
                break;
            };
            let applied = apply_move(layout, mv, step, &mut self.rng).map_err(OptimizeError::Failed)?;
            let Some(revert) = applied else {
                outcome.skipped += 1;
                trace.record_iteration(&IterationReport {
                    iteration,
                    move_kind: mv.kind(),
                    outcome: IterationOutcome::Skipped,
                    current_cost: current,
                    candidate_cost: current,
                    temperature: strategy.temperature(),
                });
                continue;
            };

            let candidate = evaluate_cost(layout, &params.cost).total;
            if !candidate.is_finite() {
                revert.apply(layout).map_err(OptimizeError::RevertFailed)?;
                return Err(OptimizeError::NonFiniteCost {
                    iteration,
                    cost: candidate,
                });
            }

            let temperature = strategy.temperature();
            let decision = if strategy.accept(current, candidate, &mut self.rng) {
                if candidate >= current {
                    status(
                        host,
                        format!(
                            "Accepted non-improving move with cost {:.2} (delta {:.2}) at temp {:.4}",
                            candidate,
                            candidate - current,
                            temperature.unwrap_or(0.0)
                        ),
                    );
                }
                current = candidate;
                outcome.accepted += 1;
                outcome.best_cost = outcome.best_cost.min(current);
                IterationOutcome::Accepted
            } else {
                revert.apply(layout).map_err(OptimizeError::RevertFailed)?;
                outcome.rejected += 1;
                IterationOutcome::Rejected
            };
            strategy.on_iteration_end();

            let report = IterationReport {
                iteration,
                move_kind: mv.kind(),
                outcome: decision,
                current_cost: current,
                candidate_cost: candidate,
                temperature,
            };
            tracing::debug!(iteration, move_kind = report.move_kind, ?decision, current, candidate);
            host.on_iteration(&report);
            trace.record_iteration(&report);

            host.update_progress(iteration + 1);
            if params.reporting_interval > 0 && (iteration + 1) % params.reporting_interval == 0 {
                status(
                    host,
                    format!(
                        "Iteration {}/{}... Current cost: {:.2}",
                        iteration + 1,
                        params.iterations,
                        current
                    ),
                );
                host.yield_now();
            }
        }

        outcome.final_cost = current;
        trace.finish(layout, &outcome);
        Ok(outcome)
    }

    /// Builds the move set for `algorithm`, runs it and posts status messages for every
    /// way the run can end.
    pub fn optimize(
        &mut self,
        layout: &mut Layout,
        algorithm: &Algorithm,
        host: &mut dyn OptimizerHost,
    ) -> Result<RunOutcome, OptimizeError> {
        let moves = legal_moves(layout);
        let params = algorithm.loop_params();

        status(host, format!("Starting {} optimization...", algorithm.name()));
        let result = match algorithm {
            Algorithm::HillClimbing(hill_climbing) => {
                status(
                    host,
                    format!(
                        "Randomized Hill Climbing parameters: iterations={}, move_step_grid_units={}",
                        hill_climbing.iterations, hill_climbing.move_step_grid_units
                    ),
                );
                self.run(layout, &moves, &mut HillClimbing, &params, host)
            }
            Algorithm::SimulatedAnnealing(annealing) => {
                status(
                    host,
                    format!(
                        "Simulated Annealing parameters: initial_temp={}, cooling_rate={}, iterations={}, move_step_grid_units={}",
                        annealing.initial_temp,
                        annealing.cooling_rate,
                        annealing.iterations,
                        annealing.move_step_grid_units
                    ),
                );
                let mut strategy = SimulatedAnnealing::from_params(annealing);
                self.run(layout, &moves, &mut strategy, &params, host)
            }
        };

        match &result {
            Ok(outcome) if outcome.state == RunState::Completed => {
                status(host, format!("Optimization complete. Final cost: {:.2}", outcome.final_cost));
            }
            Ok(_) => {}
            Err(OptimizeError::NoBlocks) => status(host, "No blocks to optimize.".to_owned()),
            Err(OptimizeError::NoMoves) => status(
                host,
                "No optimizable moves available (e.g., only one block, no pins to reorder).".to_owned(),
            ),
            Err(error) => {
                tracing::error!(%error, "optimization failed");
                host.log(&format!("Optimization failed: {}", error));
            }
        }
        result
    }
}

/// Optimizes `layout` in place with a fresh optimizer seeded from the algorithm parameters.
pub fn optimize(
    layout: &mut Layout,
    algorithm: &Algorithm,
    host: &mut dyn OptimizerHost,
) -> Result<RunOutcome, OptimizeError> {
    Optimizer::seeded(algorithm.loop_params().seed).optimize(layout, algorithm, host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnnealingParams, CostParams, HillClimbingParams};
    use crate::geometry::Point;
    use crate::graph::Placement;

    #[derive(Default)]
    struct RecordingHost {
        messages: Vec<String>,
        progress: Vec<usize>,
        shown: Option<usize>,
        hidden: bool,
        yields: usize,
        cancel_after: Option<usize>,
        polls: usize,
        reports: Vec<IterationReport>,
    }

    impl OptimizerHost for RecordingHost {
        fn show_progress(&mut self, max: usize) {
            self.shown = Some(max);
        }

        fn update_progress(&mut self, value: usize) {
            self.progress.push(value);
        }

        fn hide_progress(&mut self) {
            self.hidden = true;
        }

        fn is_cancelled(&mut self) -> bool {
            self.polls += 1;
            self.cancel_after.is_some_and(|limit| self.polls > limit)
        }

        fn log(&mut self, message: &str) {
            self.messages.push(message.to_owned());
        }

        fn yield_now(&mut self) {
            self.yields += 1;
        }

        fn on_iteration(&mut self, report: &IterationReport) {
            self.reports.push(report.clone());
        }
    }

    fn connected_pair() -> Layout {
        let mut layout = Layout::default();
        layout
            .create_block("A", Placement::Exact(Point::new(0.0, 0.0)), &["a1", "a2"], &["out"])
            .unwrap();
        layout
            .create_block("B", Placement::Exact(Point::new(600.0, 200.0)), &["in"], &[])
            .unwrap();
        let out = layout.resolve_pin(Some("A"), "out").unwrap();
        let input = layout.resolve_pin(Some("B"), "in").unwrap();
        layout.create_wire(out, input).unwrap();
        layout
    }

    fn hill_climbing(iterations: usize, seed: u64) -> Algorithm {
        Algorithm::HillClimbing(HillClimbingParams {
            iterations,
            reporting_interval: 10,
            seed: Some(seed),
            ..HillClimbingParams::default()
        })
    }

    #[test]
    fn empty_layout_reports_no_blocks() {
        let mut layout = Layout::default();
        let mut host = RecordingHost::default();
        let result = optimize(&mut layout, &hill_climbing(10, 1), &mut host);
        assert!(matches!(result, Err(OptimizeError::NoBlocks)));
        assert_eq!(host.messages.last().map(String::as_str), Some("No blocks to optimize."));
        assert_eq!(host.shown, None);
    }

    #[test]
    fn single_locked_block_reports_no_moves() {
        let mut layout = Layout::default();
        let id = layout.create_block("Solo", Placement::auto(), &[], &[]).unwrap();
        layout.set_block_locked(id, true).unwrap();
        let mut optimizer = Optimizer::seeded(Some(1));
        let result = optimizer.optimize(&mut layout, &hill_climbing(10, 1), &mut NoopHost);
        assert!(matches!(result, Err(OptimizeError::NoMoves)));
        assert_eq!(optimizer.state(), RunState::Idle);
    }

    #[test]
    fn hill_climbing_never_increases_cost() {
        let mut layout = connected_pair();
        let mut host = RecordingHost::default();
        let outcome = optimize(&mut layout, &hill_climbing(100, 42), &mut host).unwrap();

        assert_eq!(outcome.state, RunState::Completed);
        assert!(outcome.final_cost <= outcome.initial_cost);
        let mut previous = outcome.initial_cost;
        for report in &host.reports {
            assert!(report.current_cost <= previous);
            previous = report.current_cost;
        }
        let evaluated = evaluate_cost(&layout, &CostParams::default()).total;
        assert!((evaluated - outcome.final_cost).abs() < 1e-9);
        assert_eq!(outcome.accepted + outcome.rejected + outcome.skipped, 100);
    }

    #[test]
    fn progress_and_status_follow_the_run() {
        let mut layout = connected_pair();
        let mut host = RecordingHost::default();
        let outcome = optimize(&mut layout, &hill_climbing(40, 3), &mut host).unwrap();

        assert_eq!(host.shown, Some(40));
        assert!(host.hidden);
        assert_eq!(host.progress.len(), outcome.accepted + outcome.rejected);
        assert!(host.messages[0].starts_with("Starting Randomized Hill Climbing"));
        assert!(host.messages.iter().any(|m| m.starts_with("Initial cost: ")));
        assert!(host
            .messages
            .last()
            .is_some_and(|m| m.starts_with("Optimization complete. Final cost: ")));
    }

    #[test]
    fn cancellation_stops_at_an_iteration_boundary() {
        let mut layout = connected_pair();
        let mut host = RecordingHost {
            cancel_after: Some(5),
            ..RecordingHost::default()
        };
        let mut optimizer = Optimizer::seeded(Some(9));
        let outcome = optimizer
            .optimize(&mut layout, &hill_climbing(100, 9), &mut host)
            .unwrap();

        assert_eq!(outcome.state, RunState::Cancelled);
        assert_eq!(optimizer.state(), RunState::Cancelled);
        assert_eq!(outcome.iterations, 5);
        assert!(host.hidden);
        assert!(host.messages.iter().any(|m| m == "Optimization cancelled by user."));
        let evaluated = evaluate_cost(&layout, &CostParams::default()).total;
        assert!((evaluated - outcome.final_cost).abs() < 1e-9);
    }

    #[test]
    fn non_finite_cost_fails_and_resets_progress() {
        let mut layout = connected_pair();
        let before = layout.snapshot();
        let mut host = RecordingHost::default();
        let algorithm = Algorithm::SimulatedAnnealing(AnnealingParams {
            iterations: 10,
            cost: CostParams {
                intersection_weight: f64::NAN,
                ..CostParams::default()
            },
            seed: Some(1),
            ..AnnealingParams::default()
        });
        let mut optimizer = Optimizer::seeded(Some(1));
        let result = optimizer.optimize(&mut layout, &algorithm, &mut host);

        assert!(matches!(result, Err(OptimizeError::NonFiniteCost { iteration: 0, .. })));
        assert!(host.hidden);
        assert!(!optimizer.is_busy());
        assert!(host.messages.last().is_some_and(|m| m.starts_with("Optimization failed")));
        assert_eq!(layout.snapshot(), before);
    }

    #[test]
    fn annealing_cools_once_per_decision() {
        let mut layout = connected_pair();
        let mut host = RecordingHost::default();
        let algorithm = Algorithm::SimulatedAnnealing(AnnealingParams {
            initial_temp: 10.0,
            cooling_rate: 0.5,
            iterations: 20,
            seed: Some(4),
            ..AnnealingParams::default()
        });
        optimize(&mut layout, &algorithm, &mut host).unwrap();

        let temperatures: Vec<f64> = host.reports.iter().filter_map(|r| r.temperature).collect();
        assert_eq!(temperatures.first().copied(), Some(10.0));
        for pair in temperatures.windows(2) {
            assert!((pair[1] - pair[0] * 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn failing_move_hides_progress_and_frees_the_optimizer() {
        let mut layout = connected_pair();
        let b = layout.block_id("B").unwrap();
        let moves = vec![Move::MoveBlock(b)];
        layout.remove_block(b).unwrap();

        let mut host = RecordingHost::default();
        let mut optimizer = Optimizer::seeded(Some(1));
        let result = optimizer.run(&mut layout, &moves, &mut HillClimbing, &LoopParams::default(), &mut host);

        assert!(matches!(
            result,
            Err(OptimizeError::Failed(crate::error::LayoutError::UnknownBlock(id))) if id == b
        ));
        assert_eq!(host.shown, Some(LoopParams::default().iterations));
        assert!(host.hidden);
        assert!(!optimizer.is_busy());
        assert_eq!(optimizer.state(), RunState::Idle);
    }
}
