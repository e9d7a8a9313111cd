//! Structures used to describe the tables conditions are written against. Relations between
//! tables are used to infer joins.
use crate::engine::ClauseBuildError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: TableName,
    pub columns: Vec<Column>,
    /// Parent/child relations this table takes part in, on either side.
    #[serde(default)]
    pub relations: Vec<Relation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: ColumnName,
    pub value_type: ValueType,
}

/// The semantic type of a value, used to decide how literals get quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueType {
    String,
    Integer,
    Float,
    Date,
    Guid,
    Binary,
    /// Marks a condition whose value is another column, i.e. a join predicate.
    TableRelation,
}

/// A declared parent -> child relation, like a foreign key seen from the parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub parent: KeyReference,
    pub child: KeyReference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyReference {
    pub table: TableName,
    pub columns: Vec<ColumnName>,
}

/// A column together with the table it belongs to.
#[derive(Debug, Clone)]
pub struct ColumnRef {
    pub table: Arc<Table>,
    pub column: Column,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Ord, PartialOrd, Hash)]
pub struct ColumnName(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Ord, PartialOrd, Hash)]
pub struct TableName(pub String);

impl Table {
    pub fn new<N: Into<TableName>>(name: N, columns: Vec<Column>) -> Self {
        Table {
            name: name.into(),
            columns,
            relations: Vec::new(),
        }
    }

    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Finds the first relation linking this table and `other`, regardless of which one is the
    /// parent.
    pub fn relation_with(&self, other: &TableName) -> Option<&Relation> {
        self.relations.iter().find(|relation| relation.links(&self.name, other))
    }
}

impl Column {
    pub fn new<N: Into<ColumnName>>(name: N, value_type: ValueType) -> Self {
        Column {
            name: name.into(),
            value_type,
        }
    }
}

impl Relation {
    pub fn new(parent: KeyReference, child: KeyReference) -> Self {
        Relation { parent, child }
    }

    /// Pairs of (parent column, child column).
    pub fn key_pairs(&self) -> Vec<(&ColumnName, &ColumnName)> {
        self.parent.columns.iter().zip(&self.child.columns).collect()
    }

    pub fn links(&self, a: &TableName, b: &TableName) -> bool {
        (self.parent.table == *a && self.child.table == *b)
            || (self.parent.table == *b && self.child.table == *a)
    }

    pub fn is_well_formed(&self) -> bool {
        !self.parent.columns.is_empty() && self.parent.columns.len() == self.child.columns.len()
    }
}

impl KeyReference {
    pub fn new<T, C>(table: T, columns: &[C]) -> Self
    where
        T: Into<TableName>,
        C: AsRef<str>,
    {
        KeyReference {
            table: table.into(),
            columns: columns.iter().map(|c| ColumnName::from(c.as_ref())).collect(),
        }
    }
}

impl ColumnRef {
    pub fn new(table: &Arc<Table>, column: &str) -> Result<Self, ClauseBuildError> {
        let found = table
            .column(column)
            .ok_or_else(|| ClauseBuildError::ColumnNotFound {
                table: table.name.clone(),
                column: column.into(),
            })?;

        Ok(ColumnRef {
            table: Arc::clone(table),
            column: found.clone(),
        })
    }

    pub fn table_name(&self) -> &TableName {
        &self.table.name
    }

    pub fn column_name(&self) -> &ColumnName {
        &self.column.name
    }

    /// Both columns are the same column of the same table.
    pub fn same_column(&self, other: &ColumnRef) -> bool {
        self.table.name == other.table.name && self.column.name == other.column.name
    }
}

impl TableName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ColumnName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for ColumnName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<&str> for TableName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl From<&str> for ColumnName {
    fn from(name: &str) -> ColumnName {
        ColumnName(name.to_string())
    }
}

impl From<String> for ColumnName {
    fn from(name: String) -> ColumnName {
        ColumnName(name)
    }
}

impl From<&str> for TableName {
    fn from(name: &str) -> TableName {
        TableName(name.to_string())
    }
}

impl From<String> for TableName {
    fn from(name: String) -> TableName {
        TableName(name)
    }
}

impl AsRef<str> for ColumnName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for TableName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for ColumnName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for ColumnRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.table.name, self.column.name)
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::Date => "date",
            ValueType::Guid => "guid",
            ValueType::Binary => "binary",
            ValueType::TableRelation => "table relation",
        };

        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent_child() -> (Table, Table) {
        let relation = Relation::new(
            KeyReference::new("parent", &["id"]),
            KeyReference::new("child", &["parent_id"]),
        );

        let parent = Table::new("parent", vec![Column::new("id", ValueType::Integer)])
            .with_relation(relation.clone());
        let child = Table::new(
            "child",
            vec![
                Column::new("id", ValueType::Integer),
                Column::new("parent_id", ValueType::Integer),
            ],
        )
        .with_relation(relation);

        (parent, child)
    }

    #[test]
    fn relations_are_found_from_both_sides() {
        let (parent, child) = parent_child();

        assert!(parent.relation_with(&"child".into()).is_some());
        assert!(child.relation_with(&"parent".into()).is_some());
        assert!(child.relation_with(&"other".into()).is_none());
    }

    #[test]
    fn column_refs_need_existing_columns() {
        let (_, child) = parent_child();
        let child = Arc::new(child);

        let column = ColumnRef::new(&child, "parent_id").unwrap();
        assert_eq!(column.to_string(), "child.parent_id");

        let missing = ColumnRef::new(&child, "nope");
        assert!(matches!(
            missing,
            Err(ClauseBuildError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn key_pairs_zip_parent_and_child() {
        let relation = Relation::new(
            KeyReference::new("orders", &["region", "number"]),
            KeyReference::new("lines", &["order_region", "order_number"]),
        );

        let pairs: Vec<_> = relation
            .key_pairs()
            .into_iter()
            .map(|(p, c)| (p.as_str(), c.as_str()))
            .collect();

        assert_eq!(
            pairs,
            vec![("region", "order_region"), ("number", "order_number")]
        );
        assert!(relation.is_well_formed());
    }
}
