use crate::{
    ErrorKind, ExceptionTranslator, Result, SQLSTATE_MISSING_PARAMETER, Value, separated_by,
};
use std::{
    collections::BTreeMap,
    fmt::{self, Display},
    ops::Deref,
    sync::Arc,
};

/// One bound value at a 0-based parameter position.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBinding {
    pub position: usize,
    pub value: Value,
}

/// Parameters bound since the last clear.
///
/// Storage is sparse: positions may be bound in any order and rebinding a position
/// replaces the previous value.
#[derive(Debug, Default, Clone)]
pub struct Bindings {
    values: BTreeMap<usize, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn set(&mut self, position: usize, value: Value) -> Option<Value> {
        self.values.insert(position, value)
    }

    pub fn get(&self, position: usize) -> Option<&Value> {
        self.values.get(&position)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ParameterBinding> + '_ {
        self.values.iter().map(|(k, v)| ParameterBinding {
            position: *k,
            value: v.clone(),
        })
    }

    /// First position in `[0, parameter_count)` without a value.
    pub fn first_missing(&self, parameter_count: usize) -> Option<usize> {
        (0..parameter_count).find(|i| !self.values.contains_key(i))
    }

    /// Fails when any position in `[0, parameter_count)` is unbound.
    pub fn validate(&self, parameter_count: usize, translator: &ExceptionTranslator) -> Result<()> {
        if let Some(missing) = self.first_missing(parameter_count) {
            let error = translator.create(
                ErrorKind::MissingParameter,
                format!("Parameter at position {} is not set", missing + 1),
                Some(SQLSTATE_MISSING_PARAMETER),
            );
            log::error!("{:#}", error);
            return Err(error.into());
        }
        Ok(())
    }

    /// Copy the first `parameter_count` values in position order.
    ///
    /// Call after [`Bindings::validate`], unbound positions are sent as NULL.
    pub fn snapshot(&self, parameter_count: usize) -> ParameterSet {
        (0..parameter_count)
            .map(|i| self.values.get(&i).cloned().unwrap_or_default())
            .collect()
    }
}

/// A full row of values for one execution, in position order.
///
/// Cloning shares the values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet(Arc<[Value]>);

impl ParameterSet {
    pub fn new(values: impl Into<Arc<[Value]>>) -> Self {
        Self(values.into())
    }

    pub fn has_long_data(&self) -> bool {
        self.0.iter().any(Value::is_long_data)
    }
}

impl Deref for ParameterSet {
    type Target = [Value];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromIterator<Value> for ParameterSet {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        out.push('[');
        separated_by(&mut out, self.0.iter(), |out, v| out.push_str(&v.to_string()), ",");
        out.push(']');
        f.write_str(&out)
    }
}
