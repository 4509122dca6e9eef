// sheetcore
// An in-memory spreadsheet evaluation core: a two-dimensional grid of
// cells holding empty content, literal text, or an arithmetic formula that
// may reference other cells.

pub mod cell;
pub mod error;
pub mod formula;
mod numeric;
pub mod position;
pub mod sheet;

pub use cell::{Cell, CellContent, CellHandle, CellValue};
pub use error::{FormulaError, SheetError};
pub use formula::Formula;
pub use position::{Position, Size, MAX_COLS, MAX_ROWS};
pub use sheet::Sheet;
