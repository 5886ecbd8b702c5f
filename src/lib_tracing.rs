use std::{fs::File, io, path::Path, sync::Arc};

use thiserror::Error;
use tracing_subscriber::{filter::LevelFilter, prelude::*, util::TryInitError};

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("could not create the debug log: {0}")]
    Io(#[from] io::Error),
    #[error("a global tracing subscriber is already installed: {0}")]
    Init(#[from] TryInitError),
}

/// Installs the global subscriber: pretty INFO output on stdout, plus every event in
/// `debug_log` when a path is given.
pub fn init_tracing(debug_log: Option<&Path>) -> Result<(), TracingError> {
    let stdout_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_filter(LevelFilter::INFO);

    let debug_log = match debug_log {
        Some(path) => {
            let file = File::create(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stdout_log)
        .with(debug_log)
        .try_init()?;
    Ok(())
}

#[cfg(feature = "python")]
mod python {
    use std::path::PathBuf;

    use pyo3::exceptions::PyRuntimeError;
    use pyo3::prelude::*;

    #[pyclass]
    pub struct LibTracer {}

    #[pymethods]
    impl LibTracer {
        #[new]
        #[pyo3(signature = (debug_log = None))]
        pub fn new(debug_log: Option<PathBuf>) -> PyResult<Self> {
            super::init_tracing(debug_log.as_deref()).map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
            Ok(LibTracer {})
        }
    }
}

#[cfg(feature = "python")]
pub use python::LibTracer;
