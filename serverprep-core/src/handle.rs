use crate::ColumnType;
use std::sync::Arc;

/// Description of a result column or of a statement parameter, as sent by the server
/// in the prepare response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub table: String,
    pub column_type: ColumnType,
    pub length: u32,
    pub decimals: u8,
    pub nullable: bool,
    pub unsigned: bool,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            table: String::new(),
            column_type,
            length: 0,
            decimals: 0,
            nullable: true,
            unsigned: false,
        }
    }
}

/// Server allocated prepared statement.
#[derive(Debug, Clone)]
pub struct StatementHandle {
    pub statement_id: u32,
    pub sql: String,
    pub parameters: Vec<ColumnDefinition>,
    pub columns: Vec<ColumnDefinition>,
    /// Thread id of the connection that owns the handle on the server.
    pub server_thread_id: i64,
    parameter_type_header: Option<Box<[ColumnType]>>,
}

impl StatementHandle {
    pub fn new(
        statement_id: u32,
        sql: impl Into<String>,
        parameters: Vec<ColumnDefinition>,
        columns: Vec<ColumnDefinition>,
    ) -> Self {
        Self {
            statement_id,
            sql: sql.into(),
            parameters,
            columns,
            server_thread_id: -1,
            parameter_type_header: None,
        }
    }

    pub fn with_server_thread_id(mut self, server_thread_id: i64) -> Self {
        self.server_thread_id = server_thread_id;
        self
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Types last sent for the parameters, `None` when they must be sent again.
    pub fn parameter_type_header(&self) -> Option<&[ColumnType]> {
        self.parameter_type_header.as_deref()
    }

    pub fn set_parameter_type_header(&mut self, types: impl Into<Box<[ColumnType]>>) {
        self.parameter_type_header = Some(types.into());
    }

    /// Parameter types may change between executions of the same handle.
    pub fn reset_parameter_type_header(&mut self) {
        self.parameter_type_header = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSetMetaData {
    columns: Arc<[ColumnDefinition]>,
}

impl ResultSetMetaData {
    pub fn new(columns: impl Into<Arc<[ColumnDefinition]>>) -> Self {
        Self {
            columns: columns.into(),
        }
    }
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
    pub fn column(&self, index: usize) -> Option<&ColumnDefinition> {
        self.columns.get(index)
    }
    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterMetaData {
    parameters: Arc<[ColumnDefinition]>,
}

impl ParameterMetaData {
    pub fn new(parameters: impl Into<Arc<[ColumnDefinition]>>) -> Self {
        Self {
            parameters: parameters.into(),
        }
    }
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }
    pub fn parameter(&self, index: usize) -> Option<&ColumnDefinition> {
        self.parameters.get(index)
    }
    pub fn parameter_type(&self, index: usize) -> Option<ColumnType> {
        self.parameters.get(index).map(|p| p.column_type)
    }
    pub fn is_nullable(&self, index: usize) -> Option<bool> {
        self.parameters.get(index).map(|p| p.nullable)
    }
}
