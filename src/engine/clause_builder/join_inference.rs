use crate::engine::condition::{BooleanOperator, ConditionValue, FilterCondition};
use crate::engine::structure::{ColumnRef, Relation, Table};
use crate::engine::ClauseBuildError;
use log::{debug, info};
use std::sync::Arc;

type Result<T> = std::result::Result<T, ClauseBuildError>;

/// Join predicates for every pair of tables linked by a declared relation.
///
/// Pairs the caller already links through a relation condition are left alone. Each relation
/// becomes one group of predicates:
/// ```text
/// single column:   (parent.id = child.parent_id)
/// compound key:    ((parent.a = child.pa) AND (parent.b = child.pb))
/// ```
pub fn join_conditions(
    tables: &[Arc<Table>],
    existing: &[FilterCondition],
) -> Result<Vec<FilterCondition>> {
    let mut joins = Vec::new();

    for (index, first) in tables.iter().enumerate() {
        for second in &tables[index + 1..] {
            let Some(relation) = find_relation(first, second) else {
                continue;
            };

            if already_joined(existing, first, second) {
                debug!("{} and {} are already joined", first.name, second.name);
                continue;
            }

            info!("Joining {} to {}", relation.parent.table, relation.child.table);

            // Exactly one of the two is the parent, that's what find_relation looked for.
            let (parent, child) = if relation.parent.table == first.name {
                (first, second)
            } else {
                (second, first)
            };

            joins.extend(relation_predicates(relation, parent, child)?);
        }
    }

    Ok(joins)
}

/// Puts join predicates in front of the caller's conditions.
///
/// The first of the caller's conditions now follows a join, so it gets an explicit AND. If the
/// caller's conditions contain an OR, they're wrapped in one more pair of parentheses, otherwise
/// `join AND a OR b` would let `b` match rows from unrelated tables.
pub fn merge(joins: Vec<FilterCondition>, conditions: &[FilterCondition]) -> Vec<FilterCondition> {
    if joins.is_empty() {
        return conditions.to_vec();
    }

    let mut conditions = conditions.to_vec();
    let needs_grouping = conditions
        .iter()
        .skip(1)
        .any(|condition| condition.boolean_operator.is_or());

    if let Some(first) = conditions.first_mut() {
        first.boolean_operator = BooleanOperator::And;

        if needs_grouping {
            first.open_parentheses += 1;
        }
    }

    if let (true, Some(last)) = (needs_grouping, conditions.last_mut()) {
        last.close_parentheses += 1;
    }

    joins.into_iter().chain(conditions).collect()
}

fn find_relation<'t>(first: &'t Table, second: &'t Table) -> Option<&'t Relation> {
    // auto joins use the first relation found, even if several are declared
    first
        .relation_with(&second.name)
        .or_else(|| second.relation_with(&first.name))
}

fn already_joined(existing: &[FilterCondition], first: &Table, second: &Table) -> bool {
    existing.iter().filter(|c| c.is_relation()).any(|condition| {
        let ConditionValue::Column(other) = &condition.value else {
            return false;
        };

        let left = condition.column.table_name();
        let right = other.table_name();

        (*left == first.name && *right == second.name)
            || (*left == second.name && *right == first.name)
    })
}

fn relation_predicates(
    relation: &Relation,
    parent: &Arc<Table>,
    child: &Arc<Table>,
) -> Result<Vec<FilterCondition>> {
    if !relation.is_well_formed() {
        // This should never happen with metadata read from a real schema.
        return Err(ClauseBuildError::MalformedRelation {
            parent: relation.parent.table.clone(),
            child: relation.child.table.clone(),
        });
    }

    let pairs = relation.key_pairs();
    let compound = pairs.len() > 1;
    let last = pairs.len() - 1;

    pairs
        .into_iter()
        .enumerate()
        .map(|(index, (parent_column, child_column))| {
            let left = ColumnRef::new(parent, parent_column.as_str())?;
            let right = ColumnRef::new(child, child_column.as_str())?;

            let open = if compound && index == 0 { 2 } else { 1 };
            let close = if compound && index == last { 2 } else { 1 };

            Ok(FilterCondition::relation(left, right)?.with_parentheses(open, close))
        })
        .collect()
}
