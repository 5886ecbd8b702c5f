use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::config::{Algorithm, CostParams, parse_params};
use crate::error::{ConfigError, LayoutError, OptimizeError};
use crate::geometry::Point;
use crate::graph::{Layout, PinDirection, Placement};
use crate::layout::{Optimizer, OptimizerHost};
use crate::lib_tracing::LibTracer;

impl From<LayoutError> for PyErr {
    fn from(error: LayoutError) -> Self {
        PyValueError::new_err(error.to_string())
    }
}

impl From<OptimizeError> for PyErr {
    fn from(error: OptimizeError) -> Self {
        PyValueError::new_err(error.to_string())
    }
}

impl From<ConfigError> for PyErr {
    fn from(error: ConfigError) -> Self {
        PyValueError::new_err(error.to_string())
    }
}

fn placement(position: Option<(f64, f64)>) -> Placement {
    match position {
        Some((x, y)) => Placement::Exact(Point::new(x, y)),
        None => Placement::auto(),
    }
}

/// Forwards optimizer callbacks to Python callables. The first exception raised by a
/// callable cancels the run and is re-raised once the optimizer returns.
struct PyHost<'a, 'py> {
    py: Python<'py>,
    on_progress: Option<&'a Bound<'py, PyAny>>,
    is_cancelled: Option<&'a Bound<'py, PyAny>>,
    log: Option<&'a Bound<'py, PyAny>>,
    maximum: usize,
    error: Option<PyErr>,
}

impl PyHost<'_, '_> {
    fn keep_first_error(&mut self, result: PyResult<()>) {
        if let Err(error) = result {
            self.error.get_or_insert(error);
        }
    }
}

impl OptimizerHost for PyHost<'_, '_> {
    fn show_progress(&mut self, max: usize) {
        self.maximum = max;
        self.update_progress(0);
    }

    fn update_progress(&mut self, value: usize) {
        if let Some(callback) = self.on_progress {
            let result = callback.call1((value, self.maximum)).map(drop);
            self.keep_first_error(result);
        }
    }

    fn is_cancelled(&mut self) -> bool {
        if self.error.is_some() {
            return true;
        }
        let Some(callback) = self.is_cancelled else {
            return false;
        };
        match callback.call0().and_then(|value| value.is_truthy()) {
            Ok(cancelled) => cancelled,
            Err(error) => {
                self.error = Some(error);
                true
            }
        }
    }

    fn log(&mut self, message: &str) {
        if let Some(callback) = self.log {
            let result = callback.call1((message,)).map(drop);
            self.keep_first_error(result);
        }
    }

    fn yield_now(&mut self) {
        let result = self.py.check_signals();
        self.keep_first_error(result);
    }
}

#[pyclass(name = "Layout", unsendable)]
pub struct PyLayout {
    inner: Layout,
}

#[pymethods]
impl PyLayout {
    #[new]
    fn new() -> Self {
        PyLayout { inner: Layout::default() }
    }

    #[pyo3(signature = (name, inputs = Vec::new(), outputs = Vec::new(), position = None))]
    fn create_block(
        &mut self,
        name: &str,
        inputs: Vec<String>,
        outputs: Vec<String>,
        position: Option<(f64, f64)>,
    ) -> PyResult<(f64, f64)> {
        let inputs: Vec<&str> = inputs.iter().map(String::as_str).collect();
        let outputs: Vec<&str> = outputs.iter().map(String::as_str).collect();
        let id = self.inner.create_block(name, placement(position), &inputs, &outputs)?;
        let position = self.block_position(id)?;
        Ok((position.x, position.y))
    }

    fn add_block_pin(&mut self, block: &str, name: &str, output: bool) -> PyResult<()> {
        let id = self.block_id(block)?;
        let direction = if output { PinDirection::Output } else { PinDirection::Input };
        self.inner.add_block_pin(id, name, direction)?;
        Ok(())
    }

    fn rename_block(&mut self, block: &str, new_name: &str) -> PyResult<()> {
        let id = self.block_id(block)?;
        Ok(self.inner.rename_block(id, new_name)?)
    }

    fn move_block(&mut self, block: &str, x: f64, y: f64) -> PyResult<()> {
        let id = self.block_id(block)?;
        Ok(self.inner.move_block(id, Point::new(x, y))?)
    }

    fn remove_block(&mut self, block: &str) -> PyResult<()> {
        let id = self.block_id(block)?;
        Ok(self.inner.remove_block(id)?)
    }

    fn set_block_locked(&mut self, block: &str, locked: bool) -> PyResult<()> {
        let id = self.block_id(block)?;
        Ok(self.inner.set_block_locked(id, locked)?)
    }

    fn create_diagram_input(&mut self, name: &str) -> PyResult<()> {
        self.inner.create_diagram_input(name, Placement::auto())?;
        Ok(())
    }

    fn create_diagram_output(&mut self, name: &str) -> PyResult<()> {
        self.inner.create_diagram_output(name, Placement::auto())?;
        Ok(())
    }

    /// Block names of `None` refer to diagram pins.
    #[pyo3(signature = (source_block, source_pin, destination_block, destination_pin))]
    fn create_wire(
        &mut self,
        source_block: Option<&str>,
        source_pin: &str,
        destination_block: Option<&str>,
        destination_pin: &str,
    ) -> PyResult<()> {
        self.inner
            .connect((source_block, source_pin), (destination_block, destination_pin))?;
        Ok(())
    }

    fn unlock_all(&mut self) -> usize {
        self.inner.unlock_all()
    }

    /// Returns `(intersection_score, length_score, total)`.
    #[pyo3(signature = (params_json = None))]
    fn evaluate_cost(&self, params_json: Option<&str>) -> PyResult<(f64, f64, f64)> {
        let params: CostParams = match params_json {
            Some(json) => parse_params(json)?,
            None => CostParams::default(),
        };
        let cost = crate::cost::evaluate_cost(&self.inner, &params);
        Ok((cost.intersection_score, cost.length_score, cost.total))
    }

    /// Runs `algorithm` in place and returns the final cost, or `None` when there was
    /// nothing to optimize.
    #[pyo3(signature = (algorithm, params_json = None, on_progress = None, is_cancelled = None, log = None))]
    fn optimize(
        &mut self,
        py: Python<'_>,
        algorithm: &str,
        params_json: Option<&str>,
        on_progress: Option<Bound<'_, PyAny>>,
        is_cancelled: Option<Bound<'_, PyAny>>,
        log: Option<Bound<'_, PyAny>>,
    ) -> PyResult<Option<f64>> {
        let algorithm = Algorithm::from_name(algorithm, params_json)?;
        let mut host = PyHost {
            py,
            on_progress: on_progress.as_ref(),
            is_cancelled: is_cancelled.as_ref(),
            log: log.as_ref(),
            maximum: 0,
            error: None,
        };
        let result = Optimizer::seeded(algorithm.loop_params().seed).optimize(&mut self.inner, &algorithm, &mut host);
        if let Some(error) = host.error {
            return Err(error);
        }
        match result {
            Ok(outcome) => Ok(Some(outcome.final_cost)),
            Err(error) if error.is_nothing_to_do() => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn snapshot_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.inner.snapshot()).map_err(|e| PyValueError::new_err(e.to_string()))
    }
}

impl PyLayout {
    fn block_id(&self, name: &str) -> PyResult<crate::graph::BlockId> {
        self.inner
            .block_id(name)
            .ok_or_else(|| PyValueError::new_err(format!("no block named '{}'", name)))
    }

    fn block_position(&self, id: crate::graph::BlockId) -> PyResult<Point> {
        self.inner
            .block(id)
            .map(|block| block.position())
            .ok_or_else(|| LayoutError::UnknownBlock(id).into())
    }
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyLayout>()?;
    m.add_class::<LibTracer>()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wires_connect_blocks_to_diagram_pins() {
        let mut layout = PyLayout::new();
        layout.create_block("A", vec![], vec!["out".into()], Some((0.0, 0.0))).unwrap();
        layout.create_diagram_output("O").unwrap();
        layout.create_diagram_input("I").unwrap();
        layout.create_block("B", vec!["in".into()], vec![], Some((400.0, 0.0))).unwrap();

        layout.create_wire(Some("A"), "out", None, "O").unwrap();
        layout.create_wire(None, "I", Some("B"), "in").unwrap();

        assert_eq!(layout.inner.wire_count(), 2);
    }
}
