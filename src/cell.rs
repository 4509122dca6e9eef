// sheetcore/src/cell.rs
// One grid entry: content (Empty/Text/Formula), the lazily-filled formula
// cache, and the two edge sets that make up the dependency graph.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;

use crate::error::FormulaError;
use crate::formula::Formula;
use crate::position::Position;

pub const FORMULA_SIGN: char = '=';
pub const ESCAPE_SIGN: char = '\'';

// Opaque handle into the sheet's cell arena. Never reused while any other
// cell's refs_out/refs_in still points at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellHandle(pub(crate) u32);

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Error(FormulaError),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{}", crate::numeric::format_number(*n)),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Error(e) => write!(f, "{e}"),
        }
    }
}

#[derive(Debug)]
pub enum CellContent {
    Empty,
    // Invariant: non-empty (empty text is represented as Empty).
    Text(String),
    // The cache is populated on first read and cleared on any upstream
    // change. RefCell lets a `&self` read fill it in.
    Formula(Formula, RefCell<Option<CellValue>>),
}

impl CellContent {
    pub fn is_formula(&self) -> bool {
        matches!(self, CellContent::Formula(..))
    }

    // Raw, unfiltered positions referenced by a formula; empty otherwise.
    // Usable on proposed content before it's installed on a cell, since the
    // cycle check runs before commit.
    pub(crate) fn raw_referenced_cells(&self) -> Vec<Position> {
        match self {
            CellContent::Formula(formula, _) => formula.referenced_cells(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct Cell {
    pub(crate) content: CellContent,
    pub(crate) refs_out: HashSet<CellHandle>,
    pub(crate) refs_in: HashSet<CellHandle>,
}

impl Cell {
    pub(crate) fn empty() -> Self {
        Cell { content: CellContent::Empty, refs_out: HashSet::new(), refs_in: HashSet::new() }
    }

    // Raw stored text, leading `'` retained, or "=" + expression() for a
    // formula.
    pub fn text(&self) -> String {
        match &self.content {
            CellContent::Empty => String::new(),
            CellContent::Text(raw) => raw.clone(),
            CellContent::Formula(formula, _) => format!("{FORMULA_SIGN}{}", formula.expression()),
        }
    }

    // The formula slow path (evaluating and filling the cache) needs the
    // owning sheet and lives there; this only covers the non-formula cases
    // plus the cache fast path.
    pub(crate) fn cached_value(&self) -> Option<CellValue> {
        match &self.content {
            CellContent::Empty => Some(CellValue::Text(String::new())),
            CellContent::Text(raw) => Some(CellValue::Text(display_text_value(raw))),
            CellContent::Formula(_, cache) => cache.borrow().clone(),
        }
    }

    pub(crate) fn fill_formula_cache(&self, value: CellValue) {
        if let CellContent::Formula(_, cache) = &self.content {
            *cache.borrow_mut() = Some(value);
        }
    }

    pub(crate) fn invalidate(&self) {
        if let CellContent::Formula(_, cache) = &self.content {
            *cache.borrow_mut() = None;
        }
    }

    pub fn referenced_cells(&self) -> Vec<Position> {
        self.content.raw_referenced_cells().into_iter().filter(Position::is_valid).collect()
    }

    pub fn is_referenced(&self) -> bool {
        !self.refs_in.is_empty()
    }

    pub fn is_formula(&self) -> bool {
        self.content.is_formula()
    }
}

// Strips the leading apostrophe from the value only; the display text
// keeps it.
fn display_text_value(raw: &str) -> String {
    if let Some(rest) = raw.strip_prefix(ESCAPE_SIGN) {
        rest.to_string()
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cell_reads_as_empty_text() {
        let cell = Cell::empty();
        assert_eq!(cell.cached_value(), Some(CellValue::Text(String::new())));
        assert_eq!(cell.text(), "");
    }

    #[test]
    fn escaped_text_strips_leading_apostrophe_from_value_only() {
        let cell = Cell { content: CellContent::Text("'123".to_string()), refs_out: HashSet::new(), refs_in: HashSet::new() };
        assert_eq!(cell.cached_value(), Some(CellValue::Text("123".to_string())));
        assert_eq!(cell.text(), "'123");
    }

    #[test]
    fn plain_text_is_not_coerced_at_read_time() {
        let cell = Cell { content: CellContent::Text("3.14".to_string()), refs_out: HashSet::new(), refs_in: HashSet::new() };
        assert_eq!(cell.cached_value(), Some(CellValue::Text("3.14".to_string())));
    }
}
