/// Splits condition lists at safe points
pub mod chunking;
mod clause_builder;
/// Reads literals as the type of the column they're compared to
pub mod coercion;
mod condition;
pub mod dialect;
mod rendering;
/// Describes tables, columns and the relations between them
pub mod structure;


pub use chunking::ChunkingError;
pub use clause_builder::{
    ClauseBuildError, ClauseBuilder, FromList, ResultColumn, ResultTable, TargetList,
};
pub use condition::{BooleanOperator, ConditionValue, FilterCondition, Operator, Parentheses};
