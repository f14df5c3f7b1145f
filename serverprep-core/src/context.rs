use crate::{Interrupt, TimerTask};
use std::time::Duration;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ResultSetType {
    #[default]
    ForwardOnly,
    ScrollInsensitive,
    ScrollSensitive,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ResultSetConcurrency {
    #[default]
    ReadOnly,
    Updatable,
}

/// Per statement execution settings.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatementOptions {
    pub result_set_type: ResultSetType,
    pub concurrency: ResultSetConcurrency,
    /// Rows fetched per round trip, 0 reads the whole result at once.
    pub fetch_size: u32,
    pub auto_generated_keys: bool,
    pub query_timeout: Option<Duration>,
    /// 0 means no limit.
    pub max_rows: u64,
}

impl StatementOptions {
    pub fn with_result_set_type(mut self, value: ResultSetType) -> Self {
        self.result_set_type = value;
        self
    }
    pub fn with_concurrency(mut self, value: ResultSetConcurrency) -> Self {
        self.concurrency = value;
        self
    }
    pub fn with_fetch_size(mut self, value: u32) -> Self {
        self.fetch_size = value;
        self
    }
    pub fn with_auto_generated_keys(mut self, value: bool) -> Self {
        self.auto_generated_keys = value;
        self
    }
    /// A zero duration disables the timeout. Executions with a timeout must run inside a
    /// Tokio runtime.
    pub fn with_query_timeout(mut self, value: Duration) -> Self {
        self.query_timeout = (!value.is_zero()).then_some(value);
        self
    }
    pub fn with_max_rows(mut self, value: u64) -> Self {
        self.max_rows = value;
        self
    }
}

/// Execution state of a statement: configuration plus the flags that live across one
/// execution.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    pub options: StatementOptions,
    executing: bool,
    closed: bool,
    timer: Option<TimerTask>,
}

impl ExecutionContext {
    pub fn new(options: StatementOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn is_executing(&self) -> bool {
        self.executing
    }

    pub fn set_executing(&mut self) {
        self.executing = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn mark_closed(&mut self) {
        self.closed = true;
    }

    pub fn is_timer_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Arm the query timeout, when one is configured, against `interrupt`.
    pub fn arm_timer(&mut self, interrupt: &Interrupt) {
        if let Some(timeout) = self.options.query_timeout {
            if let Some(previous) = self.timer.take() {
                previous.cancel();
            }
            self.timer = Some(TimerTask::arm(interrupt.clone(), timeout));
        }
    }

    /// Whether the armed timer fired during this execution.
    pub fn timed_out(&self) -> bool {
        self.timer.as_ref().is_some_and(TimerTask::has_fired)
    }

    /// Reset the per execution flags and stop the timer.
    pub fn end_execution(&mut self, interrupt: &Interrupt) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        interrupt.reset();
        self.executing = false;
    }
}
