use rand::RngCore;

use super::AcceptanceStrategy;

/// Greedy acceptance: only strict improvements are kept.
#[derive(Clone, Copy, Debug, Default)]
pub struct HillClimbing;

impl AcceptanceStrategy for HillClimbing {
    fn accept(&mut self, current: f64, new: f64, _rng: &mut dyn RngCore) -> bool {
        new < current
    }

    fn name(&self) -> &'static str {
        "Randomized Hill Climbing"
    }
}
