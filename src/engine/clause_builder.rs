use crate::engine::chunking::chunk_clause_top_level;
use crate::engine::condition::{ConditionValue, FilterCondition, Operator};
use crate::engine::dialect::Dialect;
use crate::engine::rendering::ConditionRenderer;
use crate::engine::structure::{ColumnName, ColumnRef, Table, TableName, ValueType};
use log::{debug, info};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use thiserror::Error;

mod join_inference;

/// Renders target lists, FROM lists and WHERE clauses using a dialect.
pub struct ClauseBuilder<'a, D: Dialect> {
    dialect: &'a D,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClauseBuildError {
    UnsupportedOperator(String),
    UnsupportedBooleanOperator(String),
    InvalidParentheses(String),
    ColumnNotFound {
        table: TableName,
        column: ColumnName,
    },
    InvalidRelation {
        left: String,
        right: String,
    },
    MalformedRelation {
        parent: TableName,
        child: TableName,
    },
    OperatorNotApplicable {
        column: String,
        operator: Operator,
        value_type: ValueType,
    },
    MissingValue {
        column: String,
        operator: Operator,
    },
    UnrenderableValue {
        column: String,
        value_type: ValueType,
    },
    EmptyInList {
        column: String,
    },
    UnbalancedParentheses {
        opened: usize,
        closed: usize,
    },
}

#[derive(Debug, Clone)]
pub struct TargetList {
    pub sql: String,
    /// Columns were written as `table.column`. Pass this on when rendering the WHERE clause.
    pub qualified: bool,
    pub result: ResultTable,
}

/// Describes the rows a SELECT using the target list will return.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultTable {
    pub columns: Vec<ResultColumn>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultColumn {
    pub name: String,
    pub value_type: ValueType,
    pub native_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FromList {
    pub sql: String,
    pub tables: Vec<TableName>,
    /// Inferred join predicates, followed by the WHERE conditions that were passed in.
    pub conditions: Vec<FilterCondition>,
    /// Some tables are only there because a WHERE condition mentions them.
    pub additional_tables: bool,
}

impl<'a, D: Dialect> ClauseBuilder<'a, D> {
    pub fn new(dialect: &'a D) -> Self {
        ClauseBuilder { dialect }
    }

    /// Builds the projection, like `name, age` or `people.name, pets.name`.
    ///
    /// When `check_qualify` is set and the columns come from more than one table, every column is
    /// qualified with its table name. No columns means `*`.
    pub fn target_list(
        &self,
        columns: &[ColumnRef],
        quote_identifiers: bool,
        check_qualify: bool,
    ) -> TargetList {
        let qualified = check_qualify && distinct_tables(columns.iter()).len() > 1;

        self.render_target_list(columns, quote_identifiers, qualified)
    }

    fn render_target_list(
        &self,
        columns: &[ColumnRef],
        quote_identifiers: bool,
        qualified: bool,
    ) -> TargetList {
        if columns.is_empty() {
            return TargetList {
                sql: "*".to_string(),
                qualified,
                result: ResultTable::default(),
            };
        }

        let renderer = self.renderer(quote_identifiers, qualified);
        let sql = columns
            .iter()
            .map(|column| renderer.column_reference(column, qualified))
            .collect::<Vec<_>>()
            .join(", ");

        let result = ResultTable {
            columns: columns
                .iter()
                .map(|column| ResultColumn {
                    name: if qualified {
                        column.to_string()
                    } else {
                        column.column_name().to_string()
                    },
                    value_type: column.column.value_type,
                    native_type: self
                        .dialect
                        .native_type_for(column.column.value_type)
                        .map(str::to_string),
                })
                .collect(),
        };

        TargetList {
            sql,
            qualified,
            result,
        }
    }

    /// Figures out every table a query needs and how they are joined.
    ///
    /// Tables come from the target columns first, then from the WHERE conditions. Join predicates
    /// are inferred from the relations declared on those tables and put in front of the WHERE
    /// conditions.
    pub fn from_list(
        &self,
        include_from_keyword: bool,
        quote_identifiers: bool,
        target_columns: &[ColumnRef],
        where_conditions: &[FilterCondition],
    ) -> Result<FromList, ClauseBuildError> {
        let mut tables = distinct_tables(target_columns.iter());
        let mut additional_tables = false;

        for table in where_conditions.iter().flat_map(referenced_tables) {
            if !tables.iter().any(|known| known.name == table.name) {
                debug!("Table {} is only used by the WHERE clause", table.name);

                tables.push(table);
                additional_tables = true;
            }
        }

        let joins = join_inference::join_conditions(&tables, where_conditions)?;
        let conditions = join_inference::merge(joins, where_conditions);

        let renderer = self.renderer(quote_identifiers, false);
        let table_list = tables
            .iter()
            .map(|table| renderer.identifier(table.name.as_str()))
            .collect::<Vec<_>>()
            .join(", ");

        let sql = match (include_from_keyword, table_list.is_empty()) {
            (_, true) => String::new(),
            (true, false) => format!(" FROM {table_list}"),
            (false, false) => table_list,
        };

        Ok(FromList {
            sql,
            tables: tables.iter().map(|table| table.name.clone()).collect(),
            conditions,
            additional_tables,
        })
    }

    /// Renders conditions as a WHERE clause. An empty list renders as an empty string.
    ///
    /// Conditions that are all equality tests of the same column are collapsed into a single
    /// `column = value` or `column IN (...)` predicate.
    pub fn where_clause(
        &self,
        include_where_keyword: bool,
        quote_identifiers: bool,
        qualify_columns: bool,
        conditions: &[FilterCondition],
    ) -> Result<String, ClauseBuildError> {
        if conditions.is_empty() {
            return Ok(String::new());
        }

        debug!("Rendering {} conditions", conditions.len());

        let renderer = self.renderer(quote_identifiers, qualify_columns);
        let body = match renderer.collapse(conditions)? {
            Some(collapsed) => collapsed,
            None => renderer.render_all(conditions)?,
        };

        if include_where_keyword {
            Ok(format!(" WHERE {body}"))
        } else {
            Ok(body)
        }
    }

    /// A complete `SELECT ... FROM ... WHERE ...` statement.
    pub fn select(
        &self,
        columns: &[ColumnRef],
        conditions: &[FilterCondition],
        quote_identifiers: bool,
    ) -> Result<String, ClauseBuildError> {
        let from = self.from_list(true, quote_identifiers, columns, conditions)?;

        // With several tables in the FROM list, every column has to say where it's from.
        let qualify = from.tables.len() > 1;
        let target = self.render_target_list(columns, quote_identifiers, qualify);
        let filter = self.where_clause(true, quote_identifiers, qualify, &from.conditions)?;

        Ok(format!("SELECT {}{}{}", target.sql, from.sql, filter))
    }

    /// Splits the conditions at top-level boundaries and renders one statement per chunk.
    ///
    /// Running all the statements and putting the rows together gives the same rows as running
    /// a single statement with every condition.
    pub fn select_chunked(
        &self,
        columns: &[ColumnRef],
        conditions: &[FilterCondition],
        chunk_size: usize,
        hard_max_chunk_size: Option<usize>,
        quote_identifiers: bool,
    ) -> Result<Vec<String>, crate::Error> {
        let chunks = chunk_clause_top_level(conditions, chunk_size, hard_max_chunk_size)?;

        let statements = chunks
            .map(|chunk| self.select(columns, chunk, quote_identifiers))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            "Rendered {} conditions as {} statements",
            conditions.len(),
            statements.len()
        );

        if statements.is_empty() {
            // No conditions at all still means one (unfiltered) query.
            return Ok(vec![self.select(columns, &[], quote_identifiers)?]);
        }

        Ok(statements)
    }

    fn renderer(&self, quote_identifiers: bool, qualify_columns: bool) -> ConditionRenderer<'_, D> {
        ConditionRenderer::new(self.dialect, quote_identifiers, qualify_columns)
    }
}

/// Tables in order of first appearance.
fn distinct_tables<'c>(columns: impl Iterator<Item = &'c ColumnRef>) -> Vec<Arc<Table>> {
    let mut tables: Vec<Arc<Table>> = Vec::new();

    for column in columns {
        if !tables.iter().any(|table| table.name == column.table.name) {
            tables.push(Arc::clone(&column.table));
        }
    }

    tables
}

fn referenced_tables(condition: &FilterCondition) -> Vec<Arc<Table>> {
    let mut tables = vec![Arc::clone(&condition.column.table)];

    if let ConditionValue::Column(other) = &condition.value {
        tables.push(Arc::clone(&other.table));
    }

    tables
}

impl Display for ClauseBuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ClauseBuildError::UnsupportedOperator(operator) => {
                write!(f, "'{operator}' is not a supported operator")
            }
            ClauseBuildError::UnsupportedBooleanOperator(operator) => {
                write!(f, "'{operator}' is not a boolean operator, use AND or OR")
            }
            ClauseBuildError::InvalidParentheses(input) => {
                write!(f, "'{input}' is not a valid run of parentheses")
            }
            ClauseBuildError::ColumnNotFound { table, column } => {
                write!(f, "Table {table} has no column named {column}")
            }
            ClauseBuildError::InvalidRelation { left, right } => write!(
                f,
                "Cannot relate {left} to {right}, a relation needs columns of two different tables"
            ),
            ClauseBuildError::MalformedRelation { parent, child } => write!(
                f,
                "The relation between {parent} and {child} does not pair up its key columns"
            ),
            ClauseBuildError::OperatorNotApplicable {
                column,
                operator,
                value_type,
            } => write!(
                f,
                "Cannot use {operator} on {column}, it holds {value_type} values"
            ),
            ClauseBuildError::MissingValue { column, operator } => {
                write!(f, "The {operator} condition on {column} has no value to compare to")
            }
            ClauseBuildError::UnrenderableValue { column, value_type } => write!(
                f,
                "Cannot write a {value_type} literal for {column}"
            ),
            ClauseBuildError::EmptyInList { column } => {
                write!(f, "The value list for {column} is empty")
            }
            ClauseBuildError::UnbalancedParentheses { opened, closed } => write!(
                f,
                "Parentheses don't match up: {opened} opened and {closed} closed"
            ),
        }
    }
}
