use crate::{Error, truncate_long};
use std::{borrow::Cow, fmt::Display};

/// Update count recorded for a batch row that failed.
pub const EXECUTE_FAILED: i64 = -3;

pub const SQLSTATE_MISSING_PARAMETER: &str = "07004";
pub const SQLSTATE_INVALID_PARAMETER_INDEX: &str = "07009";
pub const SQLSTATE_CONNECTION_FAILURE: &str = "08000";
pub const SQLSTATE_FEATURE_NOT_SUPPORTED: &str = "0A000";
pub const SQLSTATE_INTERRUPTED: &str = "70100";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A parameter position was not bound before execution.
    MissingParameter,
    InvalidParameterIndex,
    Prepare,
    Execute,
    /// A batch failed, possibly after some rows succeeded.
    Batch,
    Clone,
    /// The query timeout elapsed before the server answered.
    Timeout,
    Interrupted,
    /// The connection is no longer usable.
    Connection,
    Closed,
    Unsupported,
}

/// Structured error leaving the statement engine.
///
/// Carried inside [`Error`], retrieve it with [`SqlError::find`] or
/// `error.downcast_ref::<SqlError>()`.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct SqlError {
    pub kind: ErrorKind,
    pub message: String,
    pub sql_state: Option<Cow<'static, str>>,
    /// Server error number, 0 when the error was raised locally.
    pub error_code: u16,
    /// Update counts known when a batch failed.
    pub update_counts: Option<Vec<i64>>,
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl SqlError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            sql_state: None,
            error_code: 0,
            update_counts: None,
            cause: None,
        }
    }

    pub fn with_sql_state(mut self, sql_state: impl Into<Cow<'static, str>>) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }

    pub fn with_error_code(mut self, error_code: u16) -> Self {
        self.error_code = error_code;
        self
    }

    pub fn with_update_counts(mut self, update_counts: Vec<i64>) -> Self {
        self.update_counts = Some(update_counts);
        self
    }

    pub fn with_cause(mut self, cause: Error) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn sql_state(&self) -> Option<&str> {
        self.sql_state.as_deref()
    }

    /// Find the structured error inside an error chain.
    pub fn find(error: &Error) -> Option<&SqlError> {
        error.chain().find_map(|e| e.downcast_ref::<SqlError>())
    }
}

/// Turns local conditions and collaborator failures into [`SqlError`]s.
///
/// Errors already carrying a [`SqlError`] keep their SQLSTATE and error code, the
/// message gets the connection thread id and, when enabled, the query.
#[derive(Debug, Clone)]
pub struct ExceptionTranslator {
    thread_id: i64,
    dump_queries: bool,
}

impl ExceptionTranslator {
    pub fn new(thread_id: i64, dump_queries: bool) -> Self {
        Self {
            thread_id,
            dump_queries,
        }
    }

    pub fn thread_id(&self) -> i64 {
        self.thread_id
    }

    fn decorate(&self, message: impl Display) -> String {
        if self.thread_id >= 0 {
            format!("(conn={}) {}", self.thread_id, message)
        } else {
            message.to_string()
        }
    }

    /// Error raised locally, never reached the wire.
    pub fn create(
        &self,
        kind: ErrorKind,
        message: impl Display,
        sql_state: Option<&'static str>,
    ) -> SqlError {
        let mut error = SqlError::new(kind, self.decorate(message));
        error.sql_state = sql_state.map(Into::into);
        error
    }

    /// Wrap a failure coming from the protocol session.
    ///
    /// `fallback_state` is used when the cause does not carry a SQLSTATE.
    pub fn translate(
        &self,
        kind: ErrorKind,
        cause: Error,
        query: Option<&str>,
        fallback_state: Option<&'static str>,
    ) -> SqlError {
        let (mut message, sql_state, error_code) = match SqlError::find(&cause) {
            Some(inner) => (
                inner.message.clone(),
                inner.sql_state.clone(),
                inner.error_code,
            ),
            None => (format!("{:#}", cause), None, 0),
        };
        if self.dump_queries
            && let Some(query) = query
        {
            message = format!("{}\nQuery is: {}", message, truncate_long!(query));
        }
        let mut error = SqlError::new(kind, self.decorate(message)).with_cause(cause);
        error.sql_state = sql_state.or(fallback_state.map(Into::into));
        error.error_code = error_code;
        error
    }
}

impl Default for ExceptionTranslator {
    fn default() -> Self {
        Self::new(-1, false)
    }
}
