//! Builds SQL target lists, FROM lists and WHERE clauses out of filter conditions, for any
//! dialect.
//!
//! Conditions are a flat list: each one carries its connective (AND/OR) and the parentheses
//! around it. Long lists can be cut into chunks at top-level ORs, and each chunk rendered as its
//! own statement, so no single statement gets too big for the backend.
//!
//! ```text
//! status = open  OR  status = pending  OR  status = closed
//!                        |
//!         WHERE status IN ('open','pending','closed')
//! ```
pub mod config;
mod engine;
mod error;

pub use engine::{
    BooleanOperator, ClauseBuildError, ClauseBuilder, ConditionValue, FilterCondition, FromList,
    Operator, Parentheses, ResultColumn, ResultTable, TargetList,
};

pub use engine::{chunking, coercion, dialect, structure};

pub use error::{Error, ErrorKind, RequestError};
