//! JSON request files: the tables involved, the columns to select, the conditions and the
//! dialect to render them with.
//!
//! ```json
//! {
//!   "dialect": "jet",
//!   "tables": [{ "name": "incidents", "columns": [{ "name": "status", "value_type": "string" }] }],
//!   "select": ["incidents.status"],
//!   "conditions": [
//!     { "table": "incidents", "column": "status", "operator": "=", "value": "open" },
//!     { "boolean_operator": "OR", "table": "incidents", "column": "status", "value": "pending" }
//!   ]
//! }
//! ```
use crate::dialect::DialectDescriptor;
use crate::engine::{BooleanOperator, FilterCondition, Operator, Parentheses};
use crate::error::RequestError;
use crate::structure::{ColumnRef, Table, ValueType};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRequest {
    #[serde(default)]
    pub dialect: DialectChoice,
    pub tables: Vec<Table>,
    /// `table.column` references.
    #[serde(default)]
    pub select: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<ConditionInput>,
    #[serde(default)]
    pub quote_identifiers: bool,
    pub chunk_size: Option<usize>,
    pub hard_max_chunk_size: Option<usize>,
}

/// Either the name of a built-in dialect, or a full description of one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DialectChoice {
    Named(String),
    Custom(DialectDescriptor),
}

/// A condition the way a UI would hand it over: everything is text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionInput {
    #[serde(default = "default_boolean_operator")]
    pub boolean_operator: String,
    #[serde(default)]
    pub open_parentheses: String,
    pub table: String,
    pub column: String,
    #[serde(default = "default_operator")]
    pub operator: String,
    #[serde(default)]
    pub value: String,
    /// `table.column` on the other side of a join predicate. Replaces `value`.
    pub related_column: Option<String>,
    /// Overrides the declared type of the column.
    pub column_type: Option<ValueType>,
    #[serde(default)]
    pub close_parentheses: String,
}

/// A request with every name resolved against its tables.
#[derive(Debug, Clone)]
pub struct Request {
    pub dialect: DialectDescriptor,
    pub columns: Vec<ColumnRef>,
    pub conditions: Vec<FilterCondition>,
    pub quote_identifiers: bool,
    pub chunk_size: Option<usize>,
    pub hard_max_chunk_size: Option<usize>,
}

pub fn read_request<P: AsRef<Path>>(path: P) -> Result<Request, crate::Error> {
    info!("Reading request from file: {:?}", path.as_ref());

    let contents = std::fs::read_to_string(path)?;
    let request: FilterRequest = serde_json::from_str(&contents)?;

    request.resolve()
}

pub fn read_dialect<P: AsRef<Path>>(path: P) -> Result<DialectDescriptor, crate::Error> {
    info!("Reading dialect from file: {:?}", path.as_ref());

    let contents = std::fs::read_to_string(path)?;

    Ok(serde_json::from_str(&contents)?)
}

impl FilterRequest {
    pub fn resolve(self) -> Result<Request, crate::Error> {
        let dialect = self.dialect.resolve()?;
        let tables: HashMap<String, Arc<Table>> = self
            .tables
            .into_iter()
            .map(|table| (table.name.0.clone(), Arc::new(table)))
            .collect();

        let columns = self
            .select
            .iter()
            .map(|reference| qualified_column(&tables, reference))
            .collect::<Result<Vec<_>, _>>()?;

        let conditions = self
            .conditions
            .iter()
            .map(|input| input.resolve(&tables))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Request {
            dialect,
            columns,
            conditions,
            quote_identifiers: self.quote_identifiers,
            chunk_size: self.chunk_size,
            hard_max_chunk_size: self.hard_max_chunk_size,
        })
    }
}

impl DialectChoice {
    pub fn resolve(self) -> Result<DialectDescriptor, RequestError> {
        match self {
            DialectChoice::Named(name) => {
                DialectDescriptor::by_name(&name).ok_or(RequestError::UnknownDialect(name))
            }
            DialectChoice::Custom(descriptor) => Ok(descriptor),
        }
    }
}

impl Default for DialectChoice {
    fn default() -> Self {
        DialectChoice::Named("ansi".to_string())
    }
}

impl ConditionInput {
    fn resolve(&self, tables: &HashMap<String, Arc<Table>>) -> Result<FilterCondition, crate::Error> {
        let column = column(tables, &self.table, &self.column)?;
        let boolean_operator: BooleanOperator = self.boolean_operator.parse()?;
        let open = Parentheses::parse(&self.open_parentheses, '(')?;
        let close = Parentheses::parse(&self.close_parentheses, ')')?;

        let condition = match &self.related_column {
            Some(reference) => {
                FilterCondition::relation(column, qualified_column(tables, reference)?)?
            }
            None => {
                let operator: Operator = self.operator.parse()?;
                let condition = FilterCondition::new(column, operator, self.value.as_str());

                match self.column_type {
                    Some(column_type) => condition.with_column_type(column_type),
                    None => condition,
                }
            }
        };

        Ok(condition
            .with_boolean_operator(boolean_operator)
            .with_parentheses(open.0, close.0))
    }
}

fn qualified_column(
    tables: &HashMap<String, Arc<Table>>,
    reference: &str,
) -> Result<ColumnRef, RequestError> {
    match reference.split_once('.') {
        Some((table, column_name)) => column(tables, table, column_name),
        None => Err(RequestError::UnknownColumn {
            table: String::new(),
            column: reference.to_string(),
        }),
    }
}

fn column(
    tables: &HashMap<String, Arc<Table>>,
    table: &str,
    column: &str,
) -> Result<ColumnRef, RequestError> {
    let table = tables
        .get(table)
        .ok_or_else(|| RequestError::UnknownTable(table.to_string()))?;

    ColumnRef::new(table, column).map_err(|_| RequestError::UnknownColumn {
        table: table.name.0.clone(),
        column: column.to_string(),
    })
}

fn default_boolean_operator() -> String {
    "AND".to_string()
}

fn default_operator() -> String {
    "=".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::ConditionValue;
    use std::path::PathBuf;

    const REQUEST: &str = r#"{
        "dialect": "jet",
        "quote_identifiers": true,
        "chunk_size": 2,
        "tables": [
            {
                "name": "incidents",
                "columns": [
                    { "name": "id", "value_type": "integer" },
                    { "name": "status", "value_type": "string" },
                    { "name": "district_id", "value_type": "integer" }
                ],
                "relations": [
                    {
                        "parent": { "table": "districts", "columns": ["id"] },
                        "child": { "table": "incidents", "columns": ["district_id"] }
                    }
                ]
            },
            {
                "name": "districts",
                "columns": [
                    { "name": "id", "value_type": "integer" },
                    { "name": "name", "value_type": "string" }
                ]
            }
        ],
        "select": ["incidents.id"],
        "conditions": [
            { "table": "incidents", "column": "status", "value": "open" },
            {
                "boolean_operator": "or",
                "open_parentheses": "(",
                "table": "districts",
                "column": "name",
                "operator": "BEGINS WITH",
                "value": "North",
                "close_parentheses": ")"
            }
        ]
    }"#;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("rusty-clause-tests");
        std::fs::create_dir_all(&dir).unwrap();

        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();

        path
    }

    #[test]
    fn reads_and_resolves_requests() {
        let path = write_temp("request.json", REQUEST);

        let request = read_request(&path).unwrap();

        assert_eq!(request.dialect.name, "jet");
        assert!(request.quote_identifiers);
        assert_eq!(request.chunk_size, Some(2));
        assert_eq!(request.columns[0].to_string(), "incidents.id");
        assert_eq!(request.conditions.len(), 2);

        let second = &request.conditions[1];
        assert_eq!(second.boolean_operator, BooleanOperator::Or);
        assert_eq!(second.operator, Operator::BeginsWith);
        assert_eq!((second.open_parentheses, second.close_parentheses), (1, 1));
    }

    #[test]
    fn related_columns_become_relations() {
        let request: FilterRequest = serde_json::from_str(REQUEST).unwrap();
        let mut request = request;
        request.conditions = vec![ConditionInput {
            boolean_operator: "AND".to_string(),
            open_parentheses: String::new(),
            table: "districts".to_string(),
            column: "id".to_string(),
            operator: "=".to_string(),
            value: String::new(),
            related_column: Some("incidents.district_id".to_string()),
            column_type: None,
            close_parentheses: String::new(),
        }];

        let resolved = request.resolve().unwrap();
        let relation = &resolved.conditions[0];

        assert!(relation.is_relation());
        assert!(matches!(&relation.value, ConditionValue::Column(c) if c.to_string() == "incidents.district_id"));
    }

    #[test]
    fn unknown_names_are_reported() {
        let broken = REQUEST.replace("\"select\": [\"incidents.id\"]", "\"select\": [\"incidents.nope\"]");
        let request: FilterRequest = serde_json::from_str(&broken).unwrap();

        let error = request.resolve().unwrap_err().into_inner();

        assert!(matches!(
            error,
            ErrorKind::RequestError(RequestError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn unknown_dialects_are_reported() {
        let broken = REQUEST.replace("\"jet\"", "\"oracle\"");
        let request: FilterRequest = serde_json::from_str(&broken).unwrap();

        let error = request.resolve().unwrap_err().into_inner();

        assert!(matches!(
            error,
            ErrorKind::RequestError(RequestError::UnknownDialect(name)) if name == "oracle"
        ));
    }

    #[test]
    fn bad_operators_are_reported() {
        let broken = REQUEST.replace("BEGINS WITH", "RESEMBLES");
        let request: FilterRequest = serde_json::from_str(&broken).unwrap();

        let error = request.resolve().unwrap_err().into_inner();

        assert!(matches!(error, ErrorKind::ClauseBuildError(_)));
    }

    #[test]
    fn custom_dialects_are_read_from_files() {
        let json = serde_json::to_string(&DialectDescriptor::sql_server()).unwrap();
        let path = write_temp("dialect.json", &json);

        let dialect = read_dialect(&path).unwrap();

        assert_eq!(dialect, DialectDescriptor::sql_server());
    }

    #[test]
    fn missing_files_are_io_errors() {
        let path = std::env::temp_dir().join("rusty-clause-tests").join("missing.json");
        let _making_sure_file_doesnt_exist = std::fs::remove_file(&path);

        let error = read_request(&path).unwrap_err().into_inner();

        assert!(matches!(error, ErrorKind::IoError(_)));
    }
}
