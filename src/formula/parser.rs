// sheetcore/src/formula/parser.rs
// Parses formula text into an `Expr` tree using the grammar in grammar.pest.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use super::ast::Expr;
use crate::position::Position;

#[derive(Parser)]
#[grammar = "formula/grammar.pest"]
struct FormulaParser;

/// A malformed formula. Carries the offending text for the `FormulaSyntax`
/// error message the core surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaSyntaxError(pub String);

pub fn parse(text: &str) -> Result<Expr, FormulaSyntaxError> {
    let mut pairs = FormulaParser::parse(Rule::formula, text)
        .map_err(|e| FormulaSyntaxError(e.to_string()))?;
    let formula = pairs.next().expect("formula rule always produced on success");
    let expr_pair = formula
        .into_inner()
        .next()
        .expect("formula = { expr ~ EOI }, expr always present");
    build_expr(expr_pair)
}

fn build_expr(pair: Pair<Rule>) -> Result<Expr, FormulaSyntaxError> {
    match pair.as_rule() {
        Rule::expr => {
            let mut inner = pair.into_inner();
            let mut acc = build_expr(inner.next().unwrap())?;
            let mut rest = inner.peekable();
            while let Some(op) = rest.next() {
                let rhs = build_expr(rest.next().expect("add_op always paired with a term"))?;
                acc = match op.as_str() {
                    "+" => Expr::Add(Box::new(acc), Box::new(rhs)),
                    "-" => Expr::Sub(Box::new(acc), Box::new(rhs)),
                    other => unreachable!("unexpected add_op {other:?}"),
                };
            }
            Ok(acc)
        }
        Rule::term => {
            let mut inner = pair.into_inner();
            let mut acc = build_expr(inner.next().unwrap())?;
            let mut rest = inner.peekable();
            while let Some(op) = rest.next() {
                let rhs = build_expr(rest.next().expect("mul_op always paired with a factor"))?;
                acc = match op.as_str() {
                    "*" => Expr::Mul(Box::new(acc), Box::new(rhs)),
                    "/" => Expr::Div(Box::new(acc), Box::new(rhs)),
                    other => unreachable!("unexpected mul_op {other:?}"),
                };
            }
            Ok(acc)
        }
        Rule::factor => {
            let mut inner = pair.into_inner();
            let first = inner.next().unwrap();
            match first.as_rule() {
                Rule::unary_op => {
                    let atom = build_expr(inner.next().expect("unary_op always paired with an atom"))?;
                    Ok(match first.as_str() {
                        "-" => Expr::Neg(Box::new(atom)),
                        "+" => atom,
                        other => unreachable!("unexpected unary_op {other:?}"),
                    })
                }
                Rule::atom => build_expr(first),
                other => unreachable!("unexpected factor child {other:?}"),
            }
        }
        Rule::atom => build_expr(pair.into_inner().next().unwrap()),
        Rule::number => {
            let text = pair.as_str();
            text.parse::<f64>()
                .map(Expr::Number)
                .map_err(|_| FormulaSyntaxError(text.to_string()))
        }
        Rule::cell_ref => text_as_cell(pair.as_str()),
        Rule::expr | Rule::formula => unreachable!("handled above"),
        _ => unreachable!("grammar produced an unexpected rule"),
    }
}

fn text_as_cell(text: &str) -> Result<Expr, FormulaSyntaxError> {
    text.parse::<Position>()
        .map(Expr::Cell)
        .map_err(|_| FormulaSyntaxError(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_arithmetic() {
        let e = parse("1+2*3").unwrap();
        assert_eq!(e, Expr::Add(Box::new(Expr::Number(1.0)), Box::new(Expr::Mul(Box::new(Expr::Number(2.0)), Box::new(Expr::Number(3.0))))));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("1 + + ").is_err());
        assert!(parse("").is_err());
        assert!(parse("1 2").is_err());
    }

    #[test]
    fn rejects_leading_zero_cell_row() {
        assert!(parse("A01").is_err());
    }

    #[test]
    fn parses_cell_reference() {
        let e = parse("A1").unwrap();
        assert_eq!(e, Expr::Cell(Position::new(0, 0)));
    }
}
