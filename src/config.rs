use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Grid unit all positions snap to.
pub const GRID_SIZE: f64 = 20.0;

pub const SUPER_BLOCK_MARGIN_X: f64 = 120.0;
pub const SUPER_BLOCK_MARGIN_Y: f64 = 40.0;

pub const MIN_ANNEALING_TEMPERATURE: f64 = 1e-9;

/// Fixed-pitch text measurement, used in place of real font metrics.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextMetrics {
    pub char_width: f64,
    pub line_height: f64,
}

impl TextMetrics {
    pub fn width_of(&self, text: &str) -> f64 {
        text.chars().count() as f64 * self.char_width
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub stub_length: f64,
    pub dx_factor: f64,
    pub stub_factor: f64,
    /// Number of straight segments a curve is flattened into for length and crossing tests.
    pub flatten_segments: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        RoutingConfig {
            stub_length: GRID_SIZE,
            dx_factor: 0.5,
            stub_factor: 3.0,
            flatten_segments: 32,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub grid_size: f64,
    pub standard_block_width: f64,
    pub min_item_dimension: f64,
    pub block_pin_radius: f64,
    pub pin_text_padding: f64,
    pub block_internal_padding: f64,
    pub block_title_top_margin: f64,
    pub pin_top_padding: f64,
    pub pin_bottom_padding: f64,
    pub pin_vertical_spacing: f64,
    /// Half the side of the square a diagram pin occupies.
    pub diagram_pin_half_extent: f64,
    pub super_margin_x: f64,
    pub super_margin_y: f64,
    pub placement_max_radius: f64,
    pub title_font: TextMetrics,
    pub pin_font: TextMetrics,
    pub routing: RoutingConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            grid_size: GRID_SIZE,
            standard_block_width: 8.0 * GRID_SIZE,
            min_item_dimension: GRID_SIZE,
            block_pin_radius: 6.0,
            pin_text_padding: 4.0,
            block_internal_padding: 5.0,
            block_title_top_margin: 4.0,
            pin_top_padding: GRID_SIZE,
            pin_bottom_padding: GRID_SIZE,
            pin_vertical_spacing: GRID_SIZE,
            diagram_pin_half_extent: 6.0 * 1.5,
            super_margin_x: SUPER_BLOCK_MARGIN_X,
            super_margin_y: SUPER_BLOCK_MARGIN_Y,
            placement_max_radius: 500.0 * GRID_SIZE,
            title_font: TextMetrics {
                char_width: 8.0,
                line_height: 16.0,
            },
            pin_font: TextMetrics {
                char_width: 6.0,
                line_height: 12.0,
            },
            routing: RoutingConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostParams {
    pub intersection_weight: f64,
    pub wirelength_weight: f64,
    /// Score crossings by overlap area instead of counting them.
    pub detailed_intersections: bool,
    pub wire_clickable_width: f64,
}

impl Default for CostParams {
    fn default() -> Self {
        CostParams {
            intersection_weight: 100.0,
            wirelength_weight: 0.1,
            detailed_intersections: false,
            wire_clickable_width: 10.0,
        }
    }
}

/// Parameters shared by every strategy driven through the iteration loop.
#[derive(Clone, Debug, PartialEq)]
pub struct LoopParams {
    pub iterations: usize,
    pub move_step_grid_units: u32,
    pub reporting_interval: usize,
    pub cost: CostParams,
    pub seed: Option<u64>,
}

impl LoopParams {
    pub fn move_step(&self, grid_size: f64) -> f64 {
        f64::from(self.move_step_grid_units) * grid_size
    }
}

impl Default for LoopParams {
    fn default() -> Self {
        HillClimbingParams::default().loop_params()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HillClimbingParams {
    pub iterations: usize,
    pub move_step_grid_units: u32,
    pub reporting_interval: usize,
    #[serde(flatten)]
    pub cost: CostParams,
    pub seed: Option<u64>,
}

impl HillClimbingParams {
    pub fn loop_params(&self) -> LoopParams {
        LoopParams {
            iterations: self.iterations,
            move_step_grid_units: self.move_step_grid_units,
            reporting_interval: self.reporting_interval,
            cost: self.cost.clone(),
            seed: self.seed,
        }
    }
}

impl Default for HillClimbingParams {
    fn default() -> Self {
        HillClimbingParams {
            iterations: 200,
            move_step_grid_units: 8,
            reporting_interval: 20,
            cost: CostParams::default(),
            seed: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealingParams {
    pub initial_temp: f64,
    pub cooling_rate: f64,
    pub iterations: usize,
    pub move_step_grid_units: u32,
    pub reporting_interval: usize,
    #[serde(flatten)]
    pub cost: CostParams,
    pub seed: Option<u64>,
}

impl AnnealingParams {
    /// The parameter set the demo scene is tuned for.
    pub fn demo() -> Self {
        AnnealingParams {
            initial_temp: 15.0,
            cooling_rate: 0.996,
            move_step_grid_units: 15,
            ..AnnealingParams::default()
        }
    }

    pub fn loop_params(&self) -> LoopParams {
        LoopParams {
            iterations: self.iterations,
            move_step_grid_units: self.move_step_grid_units,
            reporting_interval: self.reporting_interval,
            cost: self.cost.clone(),
            seed: self.seed,
        }
    }
}

impl Default for AnnealingParams {
    fn default() -> Self {
        AnnealingParams {
            initial_temp: 10.0,
            cooling_rate: 0.995,
            iterations: 1500,
            move_step_grid_units: 8,
            reporting_interval: 50,
            cost: CostParams::default(),
            seed: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum Algorithm {
    HillClimbing(HillClimbingParams),
    SimulatedAnnealing(AnnealingParams),
}

impl Algorithm {
    pub fn loop_params(&self) -> LoopParams {
        match self {
            Algorithm::HillClimbing(params) => params.loop_params(),
            Algorithm::SimulatedAnnealing(params) => params.loop_params(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::HillClimbing(_) => "Randomized Hill Climbing",
            Algorithm::SimulatedAnnealing(_) => "Simulated Annealing",
        }
    }

    /// Parameters for the algorithm tagged `name` (`hill_climbing` or
    /// `simulated_annealing`), read from an optional JSON object of overrides.
    pub fn from_name(name: &str, params_json: Option<&str>) -> Result<Algorithm, ConfigError> {
        let mut params: serde_json::Value = serde_json::from_str(params_json.unwrap_or("{}"))?;
        if let Some(fields) = params.as_object_mut() {
            fields.insert("algorithm".to_owned(), serde_json::Value::from(name));
        }
        Ok(serde_json::from_value(params)?)
    }
}

pub fn parse_params<T: DeserializeOwned>(json: &str) -> Result<T, ConfigError> {
    Ok(serde_json::from_str(json)?)
}
