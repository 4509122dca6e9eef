// sheetcore/src/numeric.rs
// Shortest decimal form for an f64, round-trippable back to the same value.
// Shared by formula pretty-printing (number literals) and Sheet::print_values
// (computed results) so both surfaces agree on how a number looks.

/// Whole-valued doubles print without a trailing `.0` (so a formula literal
/// typed as `2` re-prints as `2`, not `2.0`); everything else uses `ryu`'s
/// shortest round-trip representation.
pub fn format_number(n: f64) -> String {
    if n.is_nan() || n.is_infinite() {
        // Never reached through the public API: arithmetic that would
        // produce these is caught and turned into a FormulaError before a
        // CellValue::Number is ever constructed.
        return n.to_string();
    }
    if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        let mut buf = ryu::Buffer::new();
        buf.format(n).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_numbers_print_without_decimal() {
        assert_eq!(format_number(7.0), "7");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.0), "0");
    }

    #[test]
    fn fractional_numbers_round_trip() {
        assert_eq!(format_number(3.14), "3.14");
        assert_eq!(format_number(6.28), "6.28");
        let n = 1.0 / 3.0;
        assert_eq!(format_number(n).parse::<f64>().unwrap(), n);
    }
}
