//! SQL dialect support.
//!
//! Backends disagree on how identifiers are quoted, how dates are written and which characters
//! are wildcards. [Dialect] is the small surface the clause builder needs; [DialectDescriptor] is
//! a table of constants implementing it, loadable from JSON.
use crate::engine::coercion::Coerced;
use crate::engine::structure::ValueType;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub trait Dialect {
    fn name(&self) -> &str;

    fn quote_identifier(&self, name: &str) -> String;

    /// Wraps text in the string delimiter, doubling any delimiter found inside.
    fn quote_string(&self, value: &str) -> String;

    fn quote_date(&self, value: &NaiveDateTime) -> String;

    /// Matches any run of characters in a LIKE pattern.
    fn wildcard_many(&self) -> &str;

    /// Matches exactly one character in a LIKE pattern.
    fn wildcard_single(&self) -> &str;

    fn concat_operator(&self) -> &str;

    /// Translates a backend type name (like `VARCHAR`) to the type used for quoting.
    fn value_type_for(&self, native: &str) -> Option<ValueType>;

    /// The preferred backend type name for a value type.
    fn native_type_for(&self, value_type: ValueType) -> Option<&str>;

    /// Renders an already coerced value as a literal.
    fn quote_value(&self, value: &Coerced) -> String {
        match value {
            Coerced::Integer(integer) => integer.to_string(),
            Coerced::Float(float) => float.to_string(),
            Coerced::Date(date) => self.quote_date(date),
            Coerced::Text(text) | Coerced::Guid(text) | Coerced::Raw(text) => {
                self.quote_string(text)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialectDescriptor {
    pub name: String,
    pub identifier_prefix: String,
    pub identifier_suffix: String,
    pub string_delimiter: String,
    pub date_prefix: String,
    pub date_suffix: String,
    /// A chrono format string.
    pub date_format: String,
    pub wildcard_single: String,
    pub wildcard_many: String,
    pub concat_operator: String,
    #[serde(default)]
    pub types: Vec<TypeMapping>,
}

/// One entry of the native type <-> value type table. The first entry for a value type is the
/// preferred native type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMapping {
    pub native: String,
    pub value_type: ValueType,
}

impl DialectDescriptor {
    pub const NAMES: &'static [&'static str] = &["ansi", "jet", "sql-server", "postgres"];

    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "ansi" | "generic" => Some(Self::ansi()),
            "jet" | "access" => Some(Self::jet()),
            "sql-server" | "sqlserver" | "mssql" => Some(Self::sql_server()),
            "postgres" | "postgresql" => Some(Self::postgres()),
            _ => None,
        }
    }

    /// Plain ANSI SQL.
    pub fn ansi() -> Self {
        DialectDescriptor {
            name: "ansi".to_string(),
            identifier_prefix: "\"".to_string(),
            identifier_suffix: "\"".to_string(),
            string_delimiter: "'".to_string(),
            date_prefix: "TIMESTAMP '".to_string(),
            date_suffix: "'".to_string(),
            date_format: "%Y-%m-%d %H:%M:%S".to_string(),
            wildcard_single: "_".to_string(),
            wildcard_many: "%".to_string(),
            concat_operator: "||".to_string(),
            types: mappings(&[
                ("VARCHAR", ValueType::String),
                ("CHAR", ValueType::String),
                ("INTEGER", ValueType::Integer),
                ("SMALLINT", ValueType::Integer),
                ("BIGINT", ValueType::Integer),
                ("DOUBLE PRECISION", ValueType::Float),
                ("REAL", ValueType::Float),
                ("NUMERIC", ValueType::Float),
                ("TIMESTAMP", ValueType::Date),
                ("DATE", ValueType::Date),
                ("CHAR(38)", ValueType::Guid),
                ("BLOB", ValueType::Binary),
            ]),
        }
    }

    /// Access style SQL, as used by personal geodatabases.
    pub fn jet() -> Self {
        DialectDescriptor {
            name: "jet".to_string(),
            identifier_prefix: "[".to_string(),
            identifier_suffix: "]".to_string(),
            string_delimiter: "'".to_string(),
            date_prefix: "#".to_string(),
            date_suffix: "#".to_string(),
            date_format: "%m/%d/%Y %H:%M:%S".to_string(),
            wildcard_single: "?".to_string(),
            wildcard_many: "*".to_string(),
            concat_operator: "&".to_string(),
            types: mappings(&[
                ("TEXT", ValueType::String),
                ("MEMO", ValueType::String),
                ("LONG", ValueType::Integer),
                ("SHORT", ValueType::Integer),
                ("DOUBLE", ValueType::Float),
                ("SINGLE", ValueType::Float),
                ("DATETIME", ValueType::Date),
                ("GUID", ValueType::Guid),
                ("LONGBINARY", ValueType::Binary),
            ]),
        }
    }

    pub fn sql_server() -> Self {
        DialectDescriptor {
            name: "sql-server".to_string(),
            identifier_prefix: "[".to_string(),
            identifier_suffix: "]".to_string(),
            string_delimiter: "'".to_string(),
            date_prefix: "'".to_string(),
            date_suffix: "'".to_string(),
            date_format: "%Y-%m-%d %H:%M:%S".to_string(),
            wildcard_single: "_".to_string(),
            wildcard_many: "%".to_string(),
            concat_operator: "+".to_string(),
            types: mappings(&[
                ("nvarchar", ValueType::String),
                ("varchar", ValueType::String),
                ("int", ValueType::Integer),
                ("smallint", ValueType::Integer),
                ("bigint", ValueType::Integer),
                ("float", ValueType::Float),
                ("real", ValueType::Float),
                ("numeric", ValueType::Float),
                ("datetime2", ValueType::Date),
                ("datetime", ValueType::Date),
                ("uniqueidentifier", ValueType::Guid),
                ("varbinary", ValueType::Binary),
            ]),
        }
    }

    pub fn postgres() -> Self {
        DialectDescriptor {
            name: "postgres".to_string(),
            date_prefix: "TIMESTAMP '".to_string(),
            types: mappings(&[
                ("text", ValueType::String),
                ("varchar", ValueType::String),
                ("integer", ValueType::Integer),
                ("bigint", ValueType::Integer),
                ("smallint", ValueType::Integer),
                ("double precision", ValueType::Float),
                ("real", ValueType::Float),
                ("numeric", ValueType::Float),
                ("timestamp", ValueType::Date),
                ("date", ValueType::Date),
                ("uuid", ValueType::Guid),
                ("bytea", ValueType::Binary),
            ]),
            ..Self::ansi()
        }
    }
}

impl Dialect for DialectDescriptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn quote_identifier(&self, name: &str) -> String {
        // A closing quote inside the name has to be doubled, just like a string delimiter.
        let escaped = if self.identifier_suffix.is_empty() {
            name.to_string()
        } else {
            name.replace(
                &self.identifier_suffix,
                &self.identifier_suffix.repeat(2),
            )
        };

        format!(
            "{}{}{}",
            self.identifier_prefix, escaped, self.identifier_suffix
        )
    }

    fn quote_string(&self, value: &str) -> String {
        let delimiter = &self.string_delimiter;
        let escaped = if delimiter.is_empty() {
            value.to_string()
        } else {
            value.replace(delimiter, &delimiter.repeat(2))
        };

        format!("{delimiter}{escaped}{delimiter}")
    }

    fn quote_date(&self, value: &NaiveDateTime) -> String {
        format!(
            "{}{}{}",
            self.date_prefix,
            value.format(&self.date_format),
            self.date_suffix
        )
    }

    fn wildcard_many(&self) -> &str {
        &self.wildcard_many
    }

    fn wildcard_single(&self) -> &str {
        &self.wildcard_single
    }

    fn concat_operator(&self) -> &str {
        &self.concat_operator
    }

    fn value_type_for(&self, native: &str) -> Option<ValueType> {
        self.types
            .iter()
            .find(|mapping| mapping.native.eq_ignore_ascii_case(native.trim()))
            .map(|mapping| mapping.value_type)
    }

    fn native_type_for(&self, value_type: ValueType) -> Option<&str> {
        self.types
            .iter()
            .find(|mapping| mapping.value_type == value_type)
            .map(|mapping| mapping.native.as_str())
    }
}

fn mappings(pairs: &[(&str, ValueType)]) -> Vec<TypeMapping> {
    pairs
        .iter()
        .map(|(native, value_type)| TypeMapping {
            native: native.to_string(),
            value_type: *value_type,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 11, 5)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn identifiers() {
        assert_eq!(DialectDescriptor::ansi().quote_identifier("name"), "\"name\"");
        assert_eq!(DialectDescriptor::jet().quote_identifier("name"), "[name]");
        assert_eq!(
            DialectDescriptor::sql_server().quote_identifier("odd]name"),
            "[odd]]name]"
        );
    }

    #[test]
    fn strings_escape_their_delimiter() {
        let dialect = DialectDescriptor::ansi();

        assert_eq!(dialect.quote_string("O'Brien"), "'O''Brien'");
        assert_eq!(
            dialect.quote_value(&Coerced::Raw("abc".to_string())),
            "'abc'"
        );
    }

    #[test]
    fn dates_use_dialect_markers() {
        assert_eq!(
            DialectDescriptor::jet().quote_date(&noon()),
            "#11/05/2023 12:00:00#"
        );
        assert_eq!(
            DialectDescriptor::ansi().quote_date(&noon()),
            "TIMESTAMP '2023-11-05 12:00:00'"
        );
        assert_eq!(
            DialectDescriptor::sql_server().quote_value(&Coerced::Date(noon())),
            "'2023-11-05 12:00:00'"
        );
    }

    #[test]
    fn numbers_are_not_quoted() {
        let dialect = DialectDescriptor::ansi();

        assert_eq!(dialect.quote_value(&Coerced::Integer(-7)), "-7");
        assert_eq!(dialect.quote_value(&Coerced::Float(1.5)), "1.5");
    }

    #[test]
    fn type_maps_go_both_ways() {
        let dialect = DialectDescriptor::sql_server();

        assert_eq!(dialect.value_type_for("NVARCHAR"), Some(ValueType::String));
        assert_eq!(dialect.value_type_for("geometry"), None);
        assert_eq!(dialect.native_type_for(ValueType::Guid), Some("uniqueidentifier"));
        assert_eq!(dialect.native_type_for(ValueType::TableRelation), None);
    }

    #[test]
    fn presets_by_name() {
        for name in DialectDescriptor::NAMES {
            let dialect = DialectDescriptor::by_name(name).unwrap();
            assert_eq!(dialect.name(), *name);
        }

        assert_eq!(DialectDescriptor::by_name("Access").unwrap().wildcard_many(), "*");
        assert!(DialectDescriptor::by_name("oracle").is_none());
    }

    #[test]
    fn descriptors_load_from_json() {
        let json = serde_json::to_string(&DialectDescriptor::jet()).unwrap();
        let dialect: DialectDescriptor = serde_json::from_str(&json).unwrap();

        assert_eq!(dialect, DialectDescriptor::jet());
        assert_eq!(dialect.value_type_for("long"), Some(ValueType::Integer));
    }
}
