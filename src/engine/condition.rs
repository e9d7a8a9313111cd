//! The building blocks of a WHERE clause: one [FilterCondition] per atomic test, each carrying
//! its own connective and parenthesis markers.
use crate::engine::structure::{ColumnRef, ValueType};
use crate::engine::ClauseBuildError;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// One atomic test in a WHERE clause.
///
/// Cloning shares the table metadata (it's behind an `Arc`) and copies everything else.
#[derive(Debug, Clone)]
pub struct FilterCondition {
    /// Joins this condition to the previous one. Ignored for the first condition in a list.
    pub boolean_operator: BooleanOperator,
    pub open_parentheses: usize,
    pub close_parentheses: usize,
    pub column: ColumnRef,
    /// Decides quoting. Starts out as the column's declared type.
    pub column_type: ValueType,
    pub operator: Operator,
    pub value: ConditionValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BooleanOperator {
    #[default]
    And,
    Or,
    /// No connective was given. Rendered as AND.
    Implicit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterOrEqual,
    LesserThan,
    LesserOrEqual,
    Like,
    NotLike,
    In,
    NotIn,
    BeginsWith,
    EndsWith,
    Contains,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone)]
pub enum ConditionValue {
    Literal(String),
    /// The right hand side of a join predicate.
    Column(ColumnRef),
    /// Used by operators that don't take a value, like IS NULL.
    None,
}

/// A run of identical parenthesis characters, like `((`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parentheses(pub usize);

impl FilterCondition {
    /// A literal comparison, `column operator value`.
    pub fn new<V: Into<String>>(column: ColumnRef, operator: Operator, value: V) -> Self {
        let value = if operator.takes_value() {
            ConditionValue::Literal(value.into())
        } else {
            ConditionValue::None
        };

        FilterCondition {
            boolean_operator: BooleanOperator::default(),
            open_parentheses: 0,
            close_parentheses: 0,
            column_type: column.column.value_type,
            column,
            operator,
            value,
        }
    }

    /// A join predicate, `left = right`, where both sides are columns of different tables.
    pub fn relation(left: ColumnRef, right: ColumnRef) -> Result<Self, ClauseBuildError> {
        if left.table_name() == right.table_name() {
            return Err(ClauseBuildError::InvalidRelation {
                left: left.to_string(),
                right: right.to_string(),
            });
        }

        Ok(FilterCondition {
            boolean_operator: BooleanOperator::Implicit,
            open_parentheses: 0,
            close_parentheses: 0,
            column: left,
            column_type: ValueType::TableRelation,
            operator: Operator::Equals,
            value: ConditionValue::Column(right),
        })
    }

    pub fn with_boolean_operator(mut self, boolean_operator: BooleanOperator) -> Self {
        self.boolean_operator = boolean_operator;
        self
    }

    pub fn or(self) -> Self {
        self.with_boolean_operator(BooleanOperator::Or)
    }

    pub fn and(self) -> Self {
        self.with_boolean_operator(BooleanOperator::And)
    }

    pub fn with_parentheses(mut self, open: usize, close: usize) -> Self {
        self.open_parentheses = open;
        self.close_parentheses = close;
        self
    }

    pub fn with_column_type(mut self, column_type: ValueType) -> Self {
        self.column_type = column_type;
        self
    }

    pub fn is_relation(&self) -> bool {
        self.column_type == ValueType::TableRelation
    }

    pub fn has_parentheses(&self) -> bool {
        self.open_parentheses > 0 || self.close_parentheses > 0
    }

    pub fn literal(&self) -> Option<&str> {
        match &self.value {
            ConditionValue::Literal(literal) => Some(literal.as_str()),
            _ => None,
        }
    }
}

impl Operator {
    pub fn takes_value(self) -> bool {
        !matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    /// Operators that get lowered to LIKE and only make sense for text.
    pub fn is_pattern(self) -> bool {
        matches!(
            self,
            Operator::BeginsWith | Operator::EndsWith | Operator::Contains
        )
    }

    pub fn is_list(self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }
}

impl BooleanOperator {
    pub fn is_or(self) -> bool {
        self == BooleanOperator::Or
    }
}

impl Parentheses {
    /// Reads a string made only of `bracket` characters. Anything else is rejected.
    pub fn parse(input: &str, bracket: char) -> Result<Self, ClauseBuildError> {
        let trimmed = input.trim();

        if trimmed.chars().any(|c| c != bracket) {
            return Err(ClauseBuildError::InvalidParentheses(input.to_string()));
        }

        Ok(Parentheses(trimmed.chars().count()))
    }
}

impl FromStr for Operator {
    type Err = ClauseBuildError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        // "IN ()", "IN ( )" and "IN" are all fine, and so is any amount of whitespace.
        let collapsed = input
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();

        let normalized = collapsed
            .strip_suffix(')')
            .map(str::trim_end)
            .and_then(|rest| rest.strip_suffix('('))
            .map(str::trim_end)
            .unwrap_or(&collapsed);

        let operator = match normalized {
            "=" => Operator::Equals,
            "!=" | "<>" => Operator::NotEquals,
            ">" => Operator::GreaterThan,
            ">=" => Operator::GreaterOrEqual,
            "<" => Operator::LesserThan,
            "<=" => Operator::LesserOrEqual,
            "LIKE" => Operator::Like,
            "NOT LIKE" => Operator::NotLike,
            "IN" => Operator::In,
            "NOT IN" => Operator::NotIn,
            "BEGINS WITH" => Operator::BeginsWith,
            "ENDS WITH" => Operator::EndsWith,
            "CONTAINS" => Operator::Contains,
            "IS NULL" => Operator::IsNull,
            "IS NOT NULL" => Operator::IsNotNull,
            _ => return Err(ClauseBuildError::UnsupportedOperator(input.to_string())),
        };

        Ok(operator)
    }
}

impl FromStr for BooleanOperator {
    type Err = ClauseBuildError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_uppercase().as_str() {
            "" => Ok(BooleanOperator::Implicit),
            "AND" => Ok(BooleanOperator::And),
            "OR" => Ok(BooleanOperator::Or),
            _ => Err(ClauseBuildError::UnsupportedBooleanOperator(
                input.to_string(),
            )),
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Operator::Equals => "=",
            Operator::NotEquals => "<>",
            Operator::GreaterThan => ">",
            Operator::GreaterOrEqual => ">=",
            Operator::LesserThan => "<",
            Operator::LesserOrEqual => "<=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::BeginsWith => "BEGINS WITH",
            Operator::EndsWith => "ENDS WITH",
            Operator::Contains => "CONTAINS",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        };

        write!(f, "{symbol}")
    }
}

impl Display for BooleanOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BooleanOperator::And | BooleanOperator::Implicit => write!(f, "AND"),
            BooleanOperator::Or => write!(f, "OR"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::structure::{Column, Table};
    use std::sync::Arc;

    fn incidents() -> Arc<Table> {
        Arc::new(Table::new(
            "incidents",
            vec![
                Column::new("status", ValueType::String),
                Column::new("id", ValueType::Integer),
            ],
        ))
    }

    #[test]
    fn operators_parse_loosely() {
        assert_eq!("in ()".parse::<Operator>().unwrap(), Operator::In);
        assert_eq!("NOT  IN ()".parse::<Operator>().unwrap(), Operator::NotIn);
        assert_eq!("IN ( )".parse::<Operator>().unwrap(), Operator::In);
        assert_eq!(" not in(  ) ".parse::<Operator>().unwrap(), Operator::NotIn);
        assert_eq!("!=".parse::<Operator>().unwrap(), Operator::NotEquals);
        assert_eq!("<>".parse::<Operator>().unwrap(), Operator::NotEquals);
        assert_eq!(
            "begins with".parse::<Operator>().unwrap(),
            Operator::BeginsWith
        );
        assert_eq!("Is Null".parse::<Operator>().unwrap(), Operator::IsNull);
    }

    #[test]
    fn unknown_operators_are_rejected() {
        let result = "SOUNDS LIKE".parse::<Operator>();

        assert!(matches!(
            result,
            Err(ClauseBuildError::UnsupportedOperator(op)) if op == "SOUNDS LIKE"
        ));
    }

    #[test]
    fn boolean_operators() {
        assert_eq!("or".parse::<BooleanOperator>().unwrap(), BooleanOperator::Or);
        assert_eq!(" AND ".parse::<BooleanOperator>().unwrap(), BooleanOperator::And);
        assert_eq!("".parse::<BooleanOperator>().unwrap(), BooleanOperator::Implicit);
        assert!("XOR".parse::<BooleanOperator>().is_err());
        assert_eq!(BooleanOperator::Implicit.to_string(), "AND");
    }

    #[test]
    fn parentheses_only_accept_brackets() {
        assert_eq!(Parentheses::parse("((", '(').unwrap(), Parentheses(2));
        assert_eq!(Parentheses::parse("", ')').unwrap(), Parentheses(0));
        assert!(Parentheses::parse("(x", '(').is_err());
        assert!(Parentheses::parse(")", '(').is_err());
    }

    #[test]
    fn unary_operators_have_no_value() {
        let table = incidents();
        let condition = FilterCondition::new(
            ColumnRef::new(&table, "status").unwrap(),
            Operator::IsNull,
            "ignored",
        );

        assert!(matches!(condition.value, ConditionValue::None));
    }

    #[test]
    fn relations_need_two_tables() {
        let table = incidents();
        let left = ColumnRef::new(&table, "id").unwrap();
        let right = ColumnRef::new(&table, "status").unwrap();

        assert!(matches!(
            FilterCondition::relation(left, right),
            Err(ClauseBuildError::InvalidRelation { .. })
        ));
    }

    #[test]
    fn clones_share_table_metadata() {
        let table = incidents();
        let original = FilterCondition::new(
            ColumnRef::new(&table, "status").unwrap(),
            Operator::Equals,
            "open",
        );

        let copy = original.clone().or().with_parentheses(1, 0);

        assert!(Arc::ptr_eq(&original.column.table, &copy.column.table));
        assert_eq!(original.boolean_operator, BooleanOperator::And);
        assert_eq!(original.open_parentheses, 0);
        assert_eq!(original.literal(), Some("open"));
    }
}
