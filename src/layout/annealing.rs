use rand::{Rng, RngCore};

use crate::config::{AnnealingParams, MIN_ANNEALING_TEMPERATURE};

use super::AcceptanceStrategy;

/// Metropolis acceptance with a geometric cooling schedule.
///
/// Improvements are always taken. A worse candidate is taken with probability
/// `exp(-delta / temperature)`; once the temperature has decayed below
/// [`MIN_ANNEALING_TEMPERATURE`] the strategy behaves like hill climbing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulatedAnnealing {
    temperature: f64,
    cooling_rate: f64,
}

impl SimulatedAnnealing {
    pub fn new(initial_temperature: f64, cooling_rate: f64) -> Self {
        SimulatedAnnealing {
            temperature: initial_temperature,
            cooling_rate,
        }
    }

    pub fn from_params(params: &AnnealingParams) -> Self {
        SimulatedAnnealing::new(params.initial_temp, params.cooling_rate)
    }
}

impl AcceptanceStrategy for SimulatedAnnealing {
    fn accept(&mut self, current: f64, new: f64, rng: &mut dyn RngCore) -> bool {
        let delta = new - current;
        if delta < 0.0 {
            return true;
        }
        if self.temperature < MIN_ANNEALING_TEMPERATURE {
            return false;
        }
        rng.gen::<f64>() < (-delta / self.temperature).exp()
    }

    fn on_iteration_end(&mut self) {
        self.temperature *= self.cooling_rate;
    }

    fn temperature(&self) -> Option<f64> {
        Some(self.temperature)
    }

    fn name(&self) -> &'static str {
        "Simulated Annealing"
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn cools_geometrically() {
        let mut strategy = SimulatedAnnealing::new(10.0, 0.5);
        strategy.on_iteration_end();
        strategy.on_iteration_end();
        assert!(approx_eq!(f64, strategy.temperature().unwrap(), 2.5, ulps = 2));
    }

    #[test]
    fn frozen_schedule_only_takes_improvements() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut strategy = SimulatedAnnealing::new(0.0, 0.9);
        assert!(strategy.accept(5.0, 4.0, &mut rng));
        for _ in 0..100 {
            assert!(!strategy.accept(5.0, 5.0, &mut rng));
            assert!(!strategy.accept(5.0, 5.001, &mut rng));
        }
    }

    #[test]
    fn hot_schedule_takes_most_small_regressions() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut strategy = SimulatedAnnealing::new(1000.0, 1.0);
        let accepted = (0..1000).filter(|_| strategy.accept(10.0, 11.0, &mut rng)).count();
        // exp(-1/1000) is just under one
        assert!(accepted > 950);
    }

    #[test]
    fn equal_cost_is_always_taken_while_warm() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut strategy = SimulatedAnnealing::new(1.0, 1.0);
        assert!((0..100).all(|_| strategy.accept(3.0, 3.0, &mut rng)));
    }
}
