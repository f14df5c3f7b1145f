use crate::ParameterSet;

/// Parameter rows waiting for a batched dispatch, in execution order.
#[derive(Debug, Default, Clone)]
pub struct BatchQueue {
    rows: Vec<ParameterSet>,
    has_long_data: bool,
}

impl BatchQueue {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn push(&mut self, row: ParameterSet) {
        self.has_long_data |= row.has_long_data();
        self.rows.push(row);
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.has_long_data = false;
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether any queued value is long data, which rules out some bulk send paths.
    pub fn has_long_data(&self) -> bool {
        self.has_long_data
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterSet> {
        self.rows.iter()
    }

    pub fn as_slice(&self) -> &[ParameterSet] {
        &self.rows
    }
}
