//! Execution context
//!
//! One context per execution. Each cursor publishes its current row into
//! the slot of its range position; expressions read column values from
//! those slots.

use std::cell::RefCell;
use std::sync::Arc;

use uuid::Uuid;

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::expression::{EvalContext, EvalError, EvalResult};
use crate::observability::{log_event, Event, MetricsRegistry, Severity};
use crate::types::Value;

/// Logging and metrics handle kept by cursors, which release scans
/// outside of any `next` call
#[derive(Debug, Clone)]
pub(crate) struct Telemetry {
    execution_id: String,
    metrics: Arc<MetricsRegistry>,
    threshold: Severity,
}

impl Telemetry {
    pub(crate) fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Logs `event` if it meets the threshold, tagged with the execution id
    pub(crate) fn log(&self, event: Event, fields: &[(&str, &str)]) {
        if event.severity() < self.threshold {
            return;
        }
        let mut all = Vec::with_capacity(fields.len() + 1);
        all.push(("execution_id", self.execution_id.as_str()));
        all.extend_from_slice(fields);
        log_event(self.threshold, event, &all);
    }
}

/// Per-execution state shared by the cursors of one cursor tree
#[derive(Debug)]
pub struct ExecutionContext {
    execution_id: Uuid,
    catalog: Arc<Catalog>,
    config: EngineConfig,
    telemetry: Telemetry,
    parameters: Vec<Value>,
    slots: RefCell<Vec<Option<Arc<[Value]>>>>,
}

impl ExecutionContext {
    pub fn new(catalog: Arc<Catalog>, config: EngineConfig) -> Self {
        Self::with_metrics(catalog, config, Arc::new(MetricsRegistry::new()))
    }

    /// Context reporting into a shared metrics registry
    pub fn with_metrics(
        catalog: Arc<Catalog>,
        config: EngineConfig,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        let execution_id = Uuid::new_v4();
        let telemetry = Telemetry {
            execution_id: execution_id.to_string(),
            metrics,
            threshold: config.log_threshold(),
        };
        Self {
            execution_id,
            catalog,
            config,
            telemetry,
            parameters: Vec::new(),
            slots: RefCell::new(Vec::new()),
        }
    }

    /// Binds dynamic parameter values, `?0` first
    pub fn with_parameters(mut self, parameters: Vec<Value>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.telemetry.metrics
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Effective log threshold
    pub fn log_threshold(&self) -> Severity {
        self.telemetry.threshold
    }

    pub(crate) fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Publishes the current row of range `range`
    pub fn bind_row(&self, range: usize, row: Arc<[Value]>) {
        let mut slots = self.slots.borrow_mut();
        if slots.len() <= range {
            slots.resize(range + 1, None);
        }
        slots[range] = Some(row);
    }

    /// Withdraws the current row of range `range`
    pub fn clear_row(&self, range: usize) {
        if let Some(slot) = self.slots.borrow_mut().get_mut(range) {
            *slot = None;
        }
    }

    /// Current row of range `range`
    pub fn row(&self, range: usize) -> Option<Arc<[Value]>> {
        self.slots.borrow().get(range).cloned().flatten()
    }

    /// Logs `event` if it meets the configured threshold. The execution id
    /// is attached to every line.
    pub fn log(&self, event: Event, fields: &[(&str, &str)]) {
        self.telemetry.log(event, fields);
    }
}

impl EvalContext for ExecutionContext {
    fn column_value(&self, range: usize, column: usize) -> EvalResult<Value> {
        let slots = self.slots.borrow();
        let row = slots
            .get(range)
            .and_then(Option::as_ref)
            .ok_or(EvalError::RangeNotBound(range))?;
        row.get(column)
            .cloned()
            .ok_or(EvalError::ColumnOutOfRange { range, column })
    }

    fn parameter(&self, index: usize) -> EvalResult<Value> {
        self.parameters
            .get(index)
            .cloned()
            .ok_or(EvalError::UnboundParameter(index))
    }
}
