// sheetcore/src/error.rs
// Error taxonomy: structural errors raised out of the core, and evaluation
// errors that travel as `CellValue::Error(..)` data instead.

use thiserror::Error;

use crate::position::Position;

// Raised synchronously from mutating Sheet operations; the targeted cell's
// content and edges are left exactly as they were.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SheetError {
    #[error("invalid position: {0}")]
    InvalidPosition(String),

    #[error("formula syntax error in {0:?}")]
    FormulaSyntax(String),

    #[error("circular dependency: {0}")]
    CircularDependency(String),
}

impl SheetError {
    pub(crate) fn invalid_position(pos: Position) -> Self {
        SheetError::InvalidPosition(pos.to_string())
    }
}

// Carried as a value (CellValue::Error) rather than raised out of the core.
// Reading a cell whose value is Error(e) re-raises e inside the reading
// formula's evaluation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormulaError {
    #[error("#REF!")]
    Ref,
    #[error("#VALUE!")]
    Value,
    #[error("#DIV/0!")]
    Div0,
    #[error("#ARITHM!")]
    Arithmetic,
}
