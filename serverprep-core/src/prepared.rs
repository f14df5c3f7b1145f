use crate::{AsValue, Result};
use std::fmt::Display;

/// A parameterized, backend-prepared statement handle.
///
/// # Binding Semantics
/// * `bind` sets the parameter after the last one bound through `bind` or `bind_index`.
/// * `bind_index` sets the parameter at `index` (from 0), replacing any previous value.
///
/// Methods return `&mut Self` for fluent chaining:
/// ```rust,ignore
/// prepared.bind(42)?.bind("hello")?;
/// ```
pub trait Prepared: Send + Sync + Display {
    /// Remove all the previously bound values.
    fn clear_bindings(&mut self) -> Result<&mut Self>;
    /// Append a parameter value.
    fn bind(&mut self, value: impl AsValue) -> Result<&mut Self>;
    /// Bind a value at a specific index.
    fn bind_index(&mut self, value: impl AsValue, index: u64) -> Result<&mut Self>;
}
