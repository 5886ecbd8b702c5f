use std::fs;

use serde_json::json;

use crate::graph::Layout;

use super::{IterationReport, RunOutcome};

pub(crate) const TRACE_ENV_VAR: &str = "BLOCKDIAG_OPTIMIZER_TRACE_JSON";

/// Collects a JSON record of one optimizer run when the trace variable names a file.
pub(crate) struct TraceRecorder {
    path: Option<String>,
    initial: serde_json::Value,
    iterations: Vec<serde_json::Value>,
}

impl TraceRecorder {
    pub(crate) fn from_env() -> Self {
        TraceRecorder::new(std::env::var(TRACE_ENV_VAR).ok())
    }

    pub(crate) fn new(path: Option<String>) -> Self {
        TraceRecorder {
            path,
            initial: serde_json::Value::Null,
            iterations: Vec::new(),
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    pub(crate) fn record_start(&mut self, layout: &Layout, strategy: &str, initial_cost: f64) {
        if !self.is_enabled() {
            return;
        }
        self.initial = json!({
            "strategy": strategy,
            "cost": initial_cost,
            "layout": layout.snapshot(),
        });
    }

    pub(crate) fn record_iteration(&mut self, report: &IterationReport) {
        if !self.is_enabled() {
            return;
        }
        self.iterations.push(json!({
            "iteration": report.iteration,
            "move": report.move_kind,
            "outcome": report.outcome,
            "cost": report.current_cost,
            "candidate_cost": report.candidate_cost,
            "temperature": report.temperature,
        }));
    }

    /// Writes the trace. Failures are logged, a broken trace never fails the run.
    pub(crate) fn finish(self, layout: &Layout, outcome: &RunOutcome) {
        let Some(path) = self.path else {
            return;
        };
        let trace_json = json!({
            "initial": self.initial,
            "final": {
                "state": outcome.state,
                "cost": outcome.final_cost,
                "best_cost": outcome.best_cost,
                "accepted": outcome.accepted,
                "rejected": outcome.rejected,
                "skipped": outcome.skipped,
                "layout": layout.snapshot(),
            },
            "iterations": self.iterations,
        });
        let serialized = match serde_json::to_string_pretty(&trace_json) {
            Ok(serialized) => serialized,
            Err(error) => {
                tracing::warn!(%error, "failed to serialize optimizer trace");
                return;
            }
        };
        if let Err(error) = fs::write(&path, serialized) {
            tracing::warn!(%error, path = %path, "failed to write optimizer trace");
        }
    }
}
