//! Reinterprets user supplied literals as the declared type of the column they are compared to.
//!
//! Coercion never fails: anything that can't be read as the target type is kept as
//! [Coerced::Raw], and the dialect renders it as a plain string literal.
use crate::engine::structure::ValueType;
use chrono::{NaiveDate, NaiveDateTime};
use log::warn;

#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    Integer(i64),
    Float(f64),
    Date(NaiveDateTime),
    Text(String),
    Guid(String),
    /// The literal didn't match the declared type.
    Raw(String),
}

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

pub fn coerce(raw: &str, value_type: ValueType) -> Coerced {
    let trimmed = raw.trim();

    let coerced = match value_type {
        ValueType::String => return Coerced::Text(raw.to_string()),
        ValueType::Integer => coerce_integer(trimmed),
        ValueType::Float => trimmed.parse::<f64>().ok().filter(|f| f.is_finite()).map(Coerced::Float),
        ValueType::Date => coerce_date(trimmed),
        ValueType::Guid => coerce_guid(trimmed),
        ValueType::Binary | ValueType::TableRelation => None,
    };

    coerced.unwrap_or_else(|| {
        warn!("Could not read '{raw}' as {value_type}, using it as is");

        Coerced::Raw(raw.to_string())
    })
}

fn coerce_integer(input: &str) -> Option<Coerced> {
    if let Ok(integer) = input.parse::<i64>() {
        return Some(Coerced::Integer(integer));
    }

    // "3.0" is still a perfectly good integer.
    let float = input.parse::<f64>().ok()?;

    if float.is_finite() && float.fract() == 0.0 && float.abs() < i64::MAX as f64 {
        Some(Coerced::Integer(float as i64))
    } else {
        None
    }
}

fn coerce_date(input: &str) -> Option<Coerced> {
    let date_time = DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok());

    let date_time = date_time.or_else(|| {
        DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(input, format).ok())
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    })?;

    Some(Coerced::Date(date_time))
}

fn coerce_guid(input: &str) -> Option<Coerced> {
    let bare = input.trim_start_matches('{').trim_end_matches('}');
    let groups: Vec<_> = bare.split('-').collect();
    let lengths = [8, 4, 4, 4, 12];

    let well_formed = groups.len() == lengths.len()
        && groups
            .iter()
            .zip(lengths)
            .all(|(group, length)| group.len() == length && group.chars().all(|c| c.is_ascii_hexdigit()));

    if well_formed {
        Some(Coerced::Guid(format!("{{{}}}", bare.to_uppercase())))
    } else {
        None
    }
}
