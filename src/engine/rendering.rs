use crate::engine::coercion::coerce;
use crate::engine::condition::{BooleanOperator, ConditionValue, FilterCondition, Operator};
use crate::engine::dialect::Dialect;
use crate::engine::structure::{ColumnRef, ValueType};
use crate::engine::ClauseBuildError;
use log::debug;

mod in_list;

type Result<T> = std::result::Result<T, ClauseBuildError>;

/// Turns conditions into SQL text for one dialect.
pub struct ConditionRenderer<'a, D: Dialect> {
    dialect: &'a D,
    quote_identifiers: bool,
    qualify_columns: bool,
}

impl<'a, D: Dialect> ConditionRenderer<'a, D> {
    pub fn new(dialect: &'a D, quote_identifiers: bool, qualify_columns: bool) -> Self {
        ConditionRenderer {
            dialect,
            quote_identifiers,
            qualify_columns,
        }
    }

    pub fn identifier(&self, name: &str) -> String {
        if self.quote_identifiers {
            self.dialect.quote_identifier(name)
        } else {
            name.to_string()
        }
    }

    pub fn column_reference(&self, column: &ColumnRef, qualify: bool) -> String {
        let name = self.identifier(column.column_name().as_str());

        if qualify {
            format!("{}.{}", self.identifier(column.table_name().as_str()), name)
        } else {
            name
        }
    }

    /// Renders `x = 1 OR x = 2 OR x = 2` as `x IN (1,2)`, if the conditions allow it.
    ///
    /// Only plain equality tests of one and the same column, without parentheses, qualify. With
    /// a single distinct value the connectives don't matter; with several, they all have to be
    /// OR. Returns `None` when the conditions have to be rendered one by one.
    pub fn collapse(&self, conditions: &[FilterCondition]) -> Result<Option<String>> {
        let Some(first) = conditions.first() else {
            return Ok(None);
        };

        let collapsible = conditions.iter().all(|condition| {
            condition.operator == Operator::Equals
                && !condition.is_relation()
                && !condition.has_parentheses()
                && condition.literal().is_some()
                && condition.column_type != ValueType::Binary
                && condition.column.same_column(&first.column)
        });

        if !collapsible {
            return Ok(None);
        }

        let mut values: Vec<String> = Vec::new();
        for condition in conditions {
            let literal = condition.literal().unwrap_or_default();

            if literal.trim().is_empty() {
                continue;
            }

            let value = self.literal(condition, literal)?;
            if !values.contains(&value) {
                values.push(value);
            }
        }

        let all_or = conditions
            .iter()
            .skip(1)
            .all(|condition| condition.boolean_operator == BooleanOperator::Or);

        let column = self.column_reference(&first.column, self.qualify_columns);

        let collapsed = match values.as_slice() {
            [] => None,
            [single] => Some(format!("{column} = {single}")),
            _ if all_or => Some(format!("{column} IN ({})", values.join(","))),
            // x = 1 AND x = 2 is not x IN (1, 2)
            _ => None,
        };

        if collapsed.is_some() {
            debug!("Collapsed {} conditions on {}", conditions.len(), first.column);
        }

        Ok(collapsed)
    }

    /// Renders every condition with its connective and parentheses.
    ///
    /// Parentheses have to balance across the whole list, and never close before they open.
    pub fn render_all(&self, conditions: &[FilterCondition]) -> Result<String> {
        check_balance(conditions)?;

        let mut buffer = String::new();

        for (index, condition) in conditions.iter().enumerate() {
            if index > 0 {
                // Implicit renders as AND.
                buffer.push_str(&format!(" {} ", condition.boolean_operator));
            }

            buffer.push_str(&self.render(condition)?);
        }

        Ok(buffer)
    }

    pub fn render(&self, condition: &FilterCondition) -> Result<String> {
        // Relations always mention two tables, so they are always qualified.
        let qualify = self.qualify_columns || condition.is_relation();

        Ok(format!(
            "{open}{column} {predicate}{close}",
            open = "(".repeat(condition.open_parentheses),
            column = self.column_reference(&condition.column, qualify),
            predicate = self.predicate(condition)?,
            close = ")".repeat(condition.close_parentheses),
        ))
    }

    /// Everything after the column: operator and value.
    fn predicate(&self, condition: &FilterCondition) -> Result<String> {
        let operator = condition.operator;

        if !operator.takes_value() {
            return Ok(operator.to_string());
        }

        if condition.column_type == ValueType::Binary {
            return Err(ClauseBuildError::UnrenderableValue {
                column: condition.column.to_string(),
                value_type: ValueType::Binary,
            });
        }

        match &condition.value {
            ConditionValue::Column(other) if is_comparison(operator) => Ok(format!(
                "{operator} {}",
                self.column_reference(other, true)
            )),
            ConditionValue::Column(_) => Err(self.not_applicable(condition)),
            ConditionValue::Literal(_) if condition.is_relation() => {
                Err(self.missing_value(condition))
            }
            ConditionValue::Literal(literal) if operator.is_pattern() => {
                self.pattern(condition, literal)
            }
            ConditionValue::Literal(literal) if operator.is_list() => {
                self.list(condition, literal)
            }
            ConditionValue::Literal(literal) => {
                let value = match operator {
                    // The user wrote the pattern, wildcards and all.
                    Operator::Like | Operator::NotLike => self.dialect.quote_string(literal),
                    _ => self.literal(condition, literal)?,
                };

                Ok(format!("{operator} {value}"))
            }
            ConditionValue::None => Err(self.missing_value(condition)),
        }
    }

    /// BEGINS WITH, ENDS WITH and CONTAINS all become a LIKE.
    fn pattern(&self, condition: &FilterCondition, literal: &str) -> Result<String> {
        if condition.column_type != ValueType::String {
            return Err(self.not_applicable(condition));
        }

        let wildcard = self.dialect.wildcard_many();
        let pattern = match condition.operator {
            Operator::BeginsWith => format!("{literal}{wildcard}"),
            Operator::EndsWith => format!("{wildcard}{literal}"),
            _ => format!("{wildcard}{literal}{wildcard}"),
        };

        Ok(format!("LIKE {}", self.dialect.quote_string(&pattern)))
    }

    fn list(&self, condition: &FilterCondition, literal: &str) -> Result<String> {
        let items = in_list::parse(literal);

        if items.is_empty() {
            return Err(ClauseBuildError::EmptyInList {
                column: condition.column.to_string(),
            });
        }

        let values = items
            .iter()
            .map(|item| self.literal(condition, item))
            .collect::<Result<Vec<_>>>()?;

        Ok(format!("{} ({})", condition.operator, values.join(",")))
    }

    fn literal(&self, condition: &FilterCondition, literal: &str) -> Result<String> {
        if matches!(
            condition.column_type,
            ValueType::Binary | ValueType::TableRelation
        ) {
            return Err(ClauseBuildError::UnrenderableValue {
                column: condition.column.to_string(),
                value_type: condition.column_type,
            });
        }

        Ok(self
            .dialect
            .quote_value(&coerce(literal, condition.column_type)))
    }

    fn not_applicable(&self, condition: &FilterCondition) -> ClauseBuildError {
        ClauseBuildError::OperatorNotApplicable {
            column: condition.column.to_string(),
            operator: condition.operator,
            value_type: condition.column_type,
        }
    }

    fn missing_value(&self, condition: &FilterCondition) -> ClauseBuildError {
        ClauseBuildError::MissingValue {
            column: condition.column.to_string(),
            operator: condition.operator,
        }
    }
}

fn check_balance(conditions: &[FilterCondition]) -> Result<()> {
    let opened: usize = conditions.iter().map(|c| c.open_parentheses).sum();
    let closed: usize = conditions.iter().map(|c| c.close_parentheses).sum();

    let mut depth = 0usize;
    let mut closes_early = false;

    for condition in conditions {
        depth += condition.open_parentheses;

        match depth.checked_sub(condition.close_parentheses) {
            Some(remaining) => depth = remaining,
            None => {
                closes_early = true;
                break;
            }
        }
    }

    if closes_early || opened != closed {
        return Err(ClauseBuildError::UnbalancedParentheses { opened, closed });
    }

    Ok(())
}

fn is_comparison(operator: Operator) -> bool {
    matches!(
        operator,
        Operator::Equals
            | Operator::NotEquals
            | Operator::GreaterThan
            | Operator::GreaterOrEqual
            | Operator::LesserThan
            | Operator::LesserOrEqual
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::dialect::DialectDescriptor;
    use crate::engine::structure::{Column, Table};
    use std::sync::Arc;

    fn inspections() -> Arc<Table> {
        Arc::new(Table::new(
            "inspections",
            vec![
                Column::new("id", ValueType::Integer),
                Column::new("inspector", ValueType::String),
                Column::new("score", ValueType::Float),
                Column::new("visited", ValueType::Date),
                Column::new("photo", ValueType::Binary),
            ],
        ))
    }

    fn condition(column: &str, operator: &str, value: &str) -> FilterCondition {
        FilterCondition::new(
            ColumnRef::new(&inspections(), column).unwrap(),
            operator.parse().unwrap(),
            value,
        )
    }

    fn render_with(dialect: &DialectDescriptor, condition: &FilterCondition) -> Result<String> {
        ConditionRenderer::new(dialect, false, false).render(condition)
    }

    fn render(condition: &FilterCondition) -> Result<String> {
        render_with(&DialectDescriptor::ansi(), condition)
    }

    #[test]
    fn comparisons_coerce_values() {
        assert_eq!(render(&condition("id", ">=", " 10 ")).unwrap(), "id >= 10");
        assert_eq!(render(&condition("score", "<", "2.5")).unwrap(), "score < 2.5");
        assert_eq!(
            render(&condition("inspector", "!=", "O'Hara")).unwrap(),
            "inspector <> 'O''Hara'"
        );
        assert_eq!(
            render(&condition("visited", "=", "2024-01-31")).unwrap(),
            "visited = TIMESTAMP '2024-01-31 00:00:00'"
        );
    }

    #[test]
    fn failed_coercion_falls_back_to_the_raw_value() {
        assert_eq!(render(&condition("id", "=", "abc")).unwrap(), "id = 'abc'");
    }

    #[test]
    fn null_checks_have_no_value() {
        assert_eq!(render(&condition("inspector", "IS NULL", "")).unwrap(), "inspector IS NULL");
        assert_eq!(
            render(&condition("visited", "is not null", "x")).unwrap(),
            "visited IS NOT NULL"
        );
    }

    #[test]
    fn patterns_use_the_dialect_wildcard() {
        assert_eq!(
            render(&condition("inspector", "BEGINS WITH", "Mc")).unwrap(),
            "inspector LIKE 'Mc%'"
        );
        assert_eq!(
            render(&condition("inspector", "ENDS WITH", "son")).unwrap(),
            "inspector LIKE '%son'"
        );
        assert_eq!(
            render_with(
                &DialectDescriptor::jet(),
                &condition("inspector", "CONTAINS", "ann")
            )
            .unwrap(),
            "inspector LIKE '*ann*'"
        );
        assert_eq!(
            render(&condition("inspector", "LIKE", "A_b%")).unwrap(),
            "inspector LIKE 'A_b%'"
        );
    }

    #[test]
    fn patterns_need_text_columns() {
        assert!(matches!(
            render(&condition("id", "CONTAINS", "1")),
            Err(ClauseBuildError::OperatorNotApplicable { .. })
        ));
    }

    #[test]
    fn in_lists() {
        assert_eq!(
            render(&condition("inspector", "IN ()", "'Smith, J', Doe,'O''Neil'")).unwrap(),
            "inspector IN ('Smith, J','Doe','O''Neil')"
        );
        assert_eq!(
            render(&condition("id", "NOT IN ()", "(1, 2,3)")).unwrap(),
            "id NOT IN (1,2,3)"
        );
        assert_eq!(
            render(&condition("inspector", "IN ()", "Smith, O'Neil")).unwrap(),
            "inspector IN ('Smith','O''Neil')"
        );
        assert!(matches!(
            render(&condition("id", "IN ()", " , ")),
            Err(ClauseBuildError::EmptyInList { .. })
        ));
    }

    #[test]
    fn binary_values_cannot_be_written() {
        assert!(matches!(
            render(&condition("photo", "=", "0xFF")),
            Err(ClauseBuildError::UnrenderableValue { .. })
        ));
    }

    #[test]
    fn relation_type_needs_a_column_value() {
        let broken = condition("id", "=", "5").with_column_type(ValueType::TableRelation);

        assert!(matches!(
            render(&broken),
            Err(ClauseBuildError::MissingValue { .. })
        ));
    }

    #[test]
    fn parentheses_and_quoting() {
        let dialect = DialectDescriptor::sql_server();
        let renderer = ConditionRenderer::new(&dialect, true, true);
        let quoted = condition("id", "=", "1").with_parentheses(2, 1);

        assert_eq!(renderer.render(&quoted).unwrap(), "(([inspections].[id] = 1)");
    }

    #[test]
    fn render_all_rejects_unbalanced_parentheses() {
        let dialect = DialectDescriptor::ansi();
        let renderer = ConditionRenderer::new(&dialect, false, false);

        let balanced = vec![
            condition("id", "=", "1").with_parentheses(1, 0),
            condition("id", "=", "2").or().with_parentheses(0, 1),
        ];
        assert_eq!(renderer.render_all(&balanced).unwrap(), "(id = 1 OR id = 2)");

        let unclosed = vec![
            condition("id", "=", "1").with_parentheses(1, 0),
            condition("id", "=", "2"),
        ];
        assert_eq!(
            renderer.render_all(&unclosed),
            Err(ClauseBuildError::UnbalancedParentheses {
                opened: 1,
                closed: 0
            })
        );

        // Same count, wrong order.
        let backwards = vec![
            condition("id", "=", "1").with_parentheses(0, 1),
            condition("id", "=", "2").with_parentheses(1, 0),
        ];
        assert_eq!(
            renderer.render_all(&backwards),
            Err(ClauseBuildError::UnbalancedParentheses {
                opened: 1,
                closed: 1
            })
        );
    }

    #[test]
    fn collapse_requires_one_column() {
        let dialect = DialectDescriptor::ansi();
        let renderer = ConditionRenderer::new(&dialect, false, false);

        let mixed = vec![condition("id", "=", "1"), condition("score", "=", "1").or()];
        assert_eq!(renderer.collapse(&mixed).unwrap(), None);

        let anded = vec![condition("id", "=", "1"), condition("id", "=", "2")];
        assert_eq!(renderer.collapse(&anded).unwrap(), None);

        let same_value = vec![condition("id", "=", "1"), condition("id", "=", "1.0")];
        assert_eq!(renderer.collapse(&same_value).unwrap(), Some("id = 1".to_string()));

        let empty = vec![condition("inspector", "=", " "), condition("inspector", "=", "").or()];
        assert_eq!(renderer.collapse(&empty).unwrap(), None);
    }
}
