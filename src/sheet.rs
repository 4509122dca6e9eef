// sheetcore/src/sheet.rs
// Owns the sparse 2-D cell storage, orchestrates set_cell/clear_cell/get_cell,
// and implements the dependency engine: cycle check on proposed edits,
// bidirectional edge maintenance, and transitive cache invalidation.
//
// Cells are kept in a slab (`Vec<Option<CellSlot>>` + a free list) indexed
// by `CellHandle`, with a `Position -> CellHandle` index for sparse lookup.
// No cell ever owns another directly, so there is nothing to alias.

use std::cell::RefCell;
use std::collections::HashSet;
use std::io::{self, Write};

use hashbrown::HashMap;

use crate::cell::{Cell, CellContent, CellHandle};
use crate::error::{FormulaError, SheetError};
use crate::formula::Formula;
use crate::position::{Position, Size};

pub use crate::cell::CellValue;

struct CellSlot {
    pos: Position,
    cell: Cell,
}

// Sparse cell storage plus the dependency graph implicit in each cell's
// refs_out/refs_in edge sets.
#[derive(Default)]
pub struct Sheet {
    slots: Vec<Option<CellSlot>>,
    free: Vec<u32>,
    index: HashMap<Position, CellHandle>,
}

impl Sheet {
    pub fn new() -> Self {
        Sheet { slots: Vec::new(), free: Vec::new(), index: HashMap::new() }
    }

    fn cell(&self, h: CellHandle) -> &Cell {
        &self.slots[h.0 as usize].as_ref().expect("handle always names a live slot").cell
    }

    fn cell_mut(&mut self, h: CellHandle) -> &mut Cell {
        &mut self.slots[h.0 as usize].as_mut().expect("handle always names a live slot").cell
    }

    fn handle_at(&self, pos: Position) -> Option<CellHandle> {
        self.index.get(&pos).copied()
    }

    // Creates an Empty cell at `pos` if one doesn't already exist. Storage
    // growth from this call is permanent, even if the cell later becomes
    // Empty again.
    fn get_or_create(&mut self, pos: Position) -> CellHandle {
        if let Some(h) = self.handle_at(pos) {
            return h;
        }
        let handle = if let Some(idx) = self.free.pop() {
            self.slots[idx as usize] = Some(CellSlot { pos, cell: Cell::empty() });
            CellHandle(idx)
        } else {
            self.slots.push(Some(CellSlot { pos, cell: Cell::empty() }));
            CellHandle((self.slots.len() - 1) as u32)
        };
        self.index.insert(pos, handle);
        handle
    }

    fn remove_cell(&mut self, handle: CellHandle, pos: Position) {
        self.slots[handle.0 as usize] = None;
        self.free.push(handle.0);
        self.index.remove(&pos);
    }

    // ---- mutation -------------------------------------------------------

    /// Fails with `InvalidPosition` if `pos` is invalid. On
    /// `CircularDependency`/`FormulaSyntax`, storage growth from
    /// materializing referenced cells persists, but the target cell itself
    /// keeps its prior content.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<(), SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::invalid_position(pos));
        }
        let target = self.get_or_create(pos);

        let content = parse_content(text).map_err(|e| SheetError::FormulaSyntax(e.0))?;

        // A direct self-reference is left in: `would_cycle` below starts its
        // walk at `target` itself, so a formula referencing its own cell is
        // caught as a (trivial) cycle rather than silently dropped.
        let mut proposed_positions = content.raw_referenced_cells();
        proposed_positions.retain(|q| q.is_valid());

        let mut proposed_refs = HashSet::new();
        for q in proposed_positions {
            proposed_refs.insert(self.get_or_create(q));
        }

        if self.would_cycle(target, &proposed_refs) {
            log::debug!("rejecting edit at {pos}: would introduce a circular reference");
            return Err(SheetError::CircularDependency(format!(
                "setting {pos} would create a circular reference"
            )));
        }

        self.rewire(target, &proposed_refs);
        self.cell_mut(target).content = content;
        self.invalidate_transitive(target);
        Ok(())
    }

    // A no-op if no cell exists at `pos`. Otherwise the cell becomes Empty
    // and is only dropped from storage if nothing else references it.
    pub fn clear_cell(&mut self, pos: Position) -> Result<(), SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::invalid_position(pos));
        }
        let Some(handle) = self.handle_at(pos) else { return Ok(()) };

        self.rewire(handle, &HashSet::new());
        self.cell_mut(handle).content = CellContent::Empty;
        self.invalidate_transitive(handle);

        if !self.cell(handle).is_referenced() {
            self.remove_cell(handle, pos);
        }
        Ok(())
    }

    // Remove `target`'s outbound edges and install `new_refs`, mirroring
    // every change onto the neighbors' refs_in/refs_out. Never called with
    // `target` in `new_refs`: `would_cycle` rejects self-references first.
    fn rewire(&mut self, target: CellHandle, new_refs: &HashSet<CellHandle>) {
        let old_refs_out: Vec<CellHandle> = self.cell(target).refs_out.iter().copied().collect();
        for b in old_refs_out {
            self.cell_mut(b).refs_in.remove(&target);
        }
        self.cell_mut(target).refs_out.clear();

        for &b in new_refs {
            self.cell_mut(target).refs_out.insert(b);
            self.cell_mut(b).refs_in.insert(target);
        }
    }

    // Would installing edges target -> proposed_refs close a cycle? Walk
    // refs_in (upward, through dependents) from `target`; hitting a cell in
    // `proposed_refs` means committing would close a path back to `target`.
    fn would_cycle(&self, target: CellHandle, proposed_refs: &HashSet<CellHandle>) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![target];
        while let Some(h) = stack.pop() {
            if !seen.insert(h) {
                continue;
            }
            if proposed_refs.contains(&h) {
                return true;
            }
            stack.extend(self.cell(h).refs_in.iter().copied());
        }
        false
    }

    // Clears the formula cache on `start` and every cell reachable from it
    // via refs_in. An explicit worklist rather than recursion.
    fn invalidate_transitive(&mut self, start: CellHandle) {
        let mut seen = HashSet::new();
        let mut stack = vec![start];
        while let Some(h) = stack.pop() {
            if !seen.insert(h) {
                continue;
            }
            self.cell(h).invalidate();
            stack.extend(self.cell(h).refs_in.iter().copied());
        }
        log::trace!("invalidated {} cell(s) transitively", seen.len());
    }

    // ---- reads ------------------------------------------------------------

    // A cell that structurally exists but whose text is empty is reported
    // as absent.
    pub fn get_cell(&self, pos: Position) -> Result<Option<&Cell>, SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::invalid_position(pos));
        }
        Ok(self.handle_at(pos).map(|h| self.cell(h)).filter(|c| !c.text().is_empty()))
    }

    pub fn get_value(&self, pos: Position) -> Result<CellValue, SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::invalid_position(pos));
        }
        let Some(handle) = self.handle_at(pos) else { return Ok(CellValue::Text(String::new())) };
        let cell = self.cell(handle);
        if let Some(value) = cell.cached_value() {
            return Ok(value);
        }
        let value = self.evaluate_formula(cell);
        cell.fill_formula_cache(value.clone());
        Ok(value)
    }

    pub fn get_text(&self, pos: Position) -> Result<String, SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::invalid_position(pos));
        }
        Ok(self.handle_at(pos).map(|h| self.cell(h).text()).unwrap_or_default())
    }

    fn evaluate_formula(&self, cell: &Cell) -> CellValue {
        let CellContent::Formula(formula, _) = &cell.content else {
            unreachable!("evaluate_formula only called when the cache was empty on a Formula cell")
        };
        let mut lookup = |q: Position| self.lookup_number(q);
        match formula.evaluate(&mut lookup) {
            Ok(x) => CellValue::Number(x),
            Err(e) => CellValue::Error(e),
        }
    }

    // Invalid position -> Ref; absent cell -> 0.0; number -> itself; text
    // -> parsed as a decimal, empty text as 0.0, unparsable as Value; error
    // -> propagated as the same kind.
    fn lookup_number(&self, pos: Position) -> Result<f64, FormulaError> {
        if !pos.is_valid() {
            return Err(FormulaError::Ref);
        }
        let Some(handle) = self.handle_at(pos) else { return Ok(0.0) };
        let cell = self.cell(handle);
        if cell.text().is_empty() {
            // Same gating as get_cell: a structurally present but
            // text-empty cell reads as absent.
            return Ok(0.0);
        }
        let value = match cell.cached_value() {
            Some(v) => v,
            None => {
                let v = self.evaluate_formula(cell);
                cell.fill_formula_cache(v.clone());
                v
            }
        };
        match value {
            CellValue::Number(x) => Ok(x),
            CellValue::Text(s) if s.is_empty() => Ok(0.0),
            CellValue::Text(s) => s.trim().parse::<f64>().map_err(|_| FormulaError::Value),
            CellValue::Error(e) => Err(e),
        }
    }

    pub fn get_printable_size(&self) -> Size {
        let mut rows = 0u32;
        let mut cols = 0u32;
        for slot in self.slots.iter().flatten() {
            if !slot.cell.text().is_empty() {
                rows = rows.max(slot.pos.row + 1);
                cols = cols.max(slot.pos.col + 1);
            }
        }
        Size { rows, cols }
    }

    pub fn print_values(&self, out: &mut dyn Write) -> io::Result<()> {
        let size = self.get_printable_size();
        for row in 0..size.rows {
            for col in 0..size.cols {
                if col > 0 {
                    write!(out, "\t")?;
                }
                let pos = Position::new(row, col);
                if self.handle_at(pos).is_some_and(|h| !self.cell(h).text().is_empty()) {
                    let value = self.get_value(pos).expect("position within printable size is always valid");
                    write!(out, "{value}")?;
                }
            }
            writeln!(out)?;
        }
        Ok(())
    }

    pub fn print_texts(&self, out: &mut dyn Write) -> io::Result<()> {
        let size = self.get_printable_size();
        for row in 0..size.rows {
            for col in 0..size.cols {
                if col > 0 {
                    write!(out, "\t")?;
                }
                let pos = Position::new(row, col);
                if let Some(handle) = self.handle_at(pos) {
                    let text = self.cell(handle).text();
                    if !text.is_empty() {
                        write!(out, "{text}")?;
                    }
                }
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

fn parse_content(text: &str) -> Result<CellContent, crate::formula::FormulaSyntaxError> {
    if text.is_empty() {
        return Ok(CellContent::Empty);
    }
    if text.starts_with(crate::cell::FORMULA_SIGN) && text.len() >= 2 {
        let formula = Formula::parse(&text[1..])?;
        return Ok(CellContent::Formula(formula, RefCell::new(None)));
    }
    Ok(CellContent::Text(text.to_string()))
}
