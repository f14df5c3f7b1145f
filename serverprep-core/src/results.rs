use crate::{
    EXECUTE_FAILED, ParameterSet, ResultSetConcurrency, ResultSetType, StatementOptions, Value,
};
use std::sync::Arc;

/// Shared column name list.
pub type RowNames = Arc<[String]>;
/// Row values aligned with `RowNames`.
pub type Row = Box<[Value]>;

/// A result row with its corresponding column labels.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLabeled {
    pub labels: RowNames,
    pub values: Row,
}

impl RowLabeled {
    pub fn new(labels: RowNames, values: Row) -> Self {
        Self { labels, values }
    }
    pub fn names(&self) -> &[String] {
        &self.labels
    }
    pub fn values(&self) -> &[Value] {
        &self.values
    }
    pub fn get_column(&self, name: &str) -> Option<&Value> {
        self.labels
            .iter()
            .position(|v| v == name)
            .map(|i| &self.values[i])
    }
}

/// Materialized rows of one result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    labels: RowNames,
    rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(labels: RowNames) -> Self {
        Self {
            labels,
            rows: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Default::default()
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = RowLabeled> + '_ {
        self.rows
            .iter()
            .map(|v| RowLabeled::new(self.labels.clone(), v.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CommandStats {
    update_count: i64,
    insert_id: i64,
}

/// Holder of everything one execution produced.
///
/// The protocol session feeds it while reading the server answers, the statement
/// finalizes it with [`Results::command_end`] and callers read from it afterwards,
/// also when a batch failed midway.
#[derive(Debug)]
pub struct Results {
    fetch_size: u32,
    is_batch: bool,
    expected_size: usize,
    binary_protocol: bool,
    result_set_type: ResultSetType,
    concurrency: ResultSetConcurrency,
    auto_generated_keys: bool,
    auto_increment_increment: i64,
    sql: Option<String>,
    parameters: ParameterSet,
    stats: Vec<CommandStats>,
    pending: Vec<ResultSet>,
    result_sets: Vec<ResultSet>,
    current: Option<ResultSet>,
    has_more_results: bool,
    closed: bool,
}

impl Results {
    /// Holder of a single statement execution.
    pub fn single(
        options: &StatementOptions,
        fetch_size: u32,
        auto_increment_increment: i64,
        sql: impl Into<String>,
        parameters: ParameterSet,
    ) -> Self {
        Self::new(
            options,
            fetch_size,
            false,
            1,
            auto_increment_increment,
            Some(sql.into()),
            parameters,
        )
    }

    /// Holder of a batch of `size` rows.
    pub fn batch(options: &StatementOptions, size: usize, auto_increment_increment: i64) -> Self {
        Self::new(
            options,
            0,
            true,
            size,
            auto_increment_increment,
            None,
            ParameterSet::default(),
        )
    }

    fn new(
        options: &StatementOptions,
        fetch_size: u32,
        is_batch: bool,
        expected_size: usize,
        auto_increment_increment: i64,
        sql: Option<String>,
        parameters: ParameterSet,
    ) -> Self {
        Self {
            fetch_size,
            is_batch,
            expected_size,
            binary_protocol: true,
            result_set_type: options.result_set_type,
            concurrency: options.concurrency,
            auto_generated_keys: options.auto_generated_keys,
            auto_increment_increment,
            sql,
            parameters,
            stats: Vec::with_capacity(expected_size),
            pending: Vec::new(),
            result_sets: Vec::new(),
            current: None,
            has_more_results: false,
            closed: false,
        }
    }

    pub fn fetch_size(&self) -> u32 {
        self.fetch_size
    }
    pub fn is_batch(&self) -> bool {
        self.is_batch
    }
    pub fn expected_size(&self) -> usize {
        self.expected_size
    }
    pub fn is_binary_protocol(&self) -> bool {
        self.binary_protocol
    }
    pub fn result_set_type(&self) -> ResultSetType {
        self.result_set_type
    }
    pub fn concurrency(&self) -> ResultSetConcurrency {
        self.concurrency
    }
    pub fn auto_generated_keys(&self) -> bool {
        self.auto_generated_keys
    }
    pub fn sql(&self) -> Option<&str> {
        self.sql.as_deref()
    }
    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    /// Called by the session for every result set read.
    pub fn add_result_set(&mut self, result_set: ResultSet) {
        self.stats.push(CommandStats {
            update_count: -1,
            insert_id: 0,
        });
        self.pending.push(result_set);
    }

    /// Called by the session for every OK packet read.
    pub fn add_stats(&mut self, update_count: i64, insert_id: i64) {
        self.stats.push(CommandStats {
            update_count,
            insert_id,
        });
    }

    /// Record a failed batch row.
    pub fn add_stats_error(&mut self) {
        self.stats.push(CommandStats {
            update_count: EXECUTE_FAILED,
            insert_id: 0,
        });
    }

    /// The session signals that more results follow on the wire.
    pub fn set_has_more_results(&mut self, value: bool) {
        self.has_more_results = value;
    }

    pub fn has_more_results(&self) -> bool {
        self.has_more_results
    }

    /// End of the command: result sets read so far become visible.
    pub fn command_end(&mut self) {
        let mut pending = std::mem::take(&mut self.pending).into_iter();
        if self.current.is_none() {
            self.current = pending.next();
        }
        self.result_sets.extend(pending);
    }

    pub fn result_set(&self) -> Option<&ResultSet> {
        self.current.as_ref()
    }

    /// Hand the current result set over to the caller.
    pub fn release_result_set(&mut self) -> Option<ResultSet> {
        self.current.take()
    }

    /// Move to the next result set, if any.
    pub fn next_result_set(&mut self) -> bool {
        if self.result_sets.is_empty() {
            self.current = None;
            return false;
        }
        self.current = Some(self.result_sets.remove(0));
        true
    }

    pub fn large_update_counts(&self) -> Vec<i64> {
        self.stats.iter().map(|v| v.update_count).collect()
    }

    pub fn update_counts(&self) -> Vec<i32> {
        self.stats
            .iter()
            .map(|v| v.update_count.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
            .collect()
    }

    /// Update count of the first command, -1 when it produced a result set.
    pub fn update_count(&self) -> i64 {
        self.stats.first().map_or(-1, |v| v.update_count)
    }

    pub fn executed_count(&self) -> usize {
        self.stats.len()
    }

    pub fn succeeded_count(&self) -> usize {
        self.stats
            .iter()
            .filter(|v| v.update_count != EXECUTE_FAILED)
            .count()
    }

    /// Keys generated by the commands, an insert id expanded over the affected rows.
    pub fn generated_keys(&self) -> Vec<i64> {
        if !self.auto_generated_keys {
            return Vec::new();
        }
        self.stats
            .iter()
            .filter(|v| v.insert_id != 0 && v.update_count > 0)
            .flat_map(|v| {
                (0..v.update_count).map(move |i| v.insert_id + i * self.auto_increment_increment)
            })
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn close(&mut self) {
        self.closed = true;
        self.current = None;
        self.result_sets.clear();
        self.pending.clear();
    }
}
