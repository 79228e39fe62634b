//! # Calculator Expressions
//!
//! Restricted arithmetic for catalog-authored preview formulas such as
//! `"amount / days"`.
//!
//! ## Grammar
//! ```text
//! expr    := term   (('+' | '-') term)*
//! term    := factor (('*' | '/') factor)*
//! factor  := ('+' | '-') factor
//!          | NUMBER
//!          | IDENT            (amount | days)
//!          | '(' expr ')'
//! ```
//!
//! Nothing else exists: no function calls, no assignment, no other names.
//! Input longer than [`crate::MAX_EXPRESSION_LEN`] or nesting deeper than
//! [`crate::MAX_EXPRESSION_DEPTH`] is rejected before it can cost anything.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::ExpressionError;
use crate::{MAX_EXPRESSION_DEPTH, MAX_EXPRESSION_LEN};

/// The whitelisted identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    Amount,
    Days,
}

impl Variable {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "amount" => Some(Variable::Amount),
            "days" => Some(Variable::Days),
            _ => None,
        }
    }
}

/// Values bound to the identifiers at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bindings {
    pub amount: Decimal,
    pub days: Decimal,
}

impl Bindings {
    fn get(&self, var: Variable) -> Decimal {
        match var {
            Variable::Amount => self.amount,
            Variable::Days => self.days,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(Decimal),
    Var(Variable),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

/// A parsed, validated expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatorExpression {
    source: String,
    root: Expr,
}

impl CalculatorExpression {
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        if source.trim().is_empty() {
            return Err(ExpressionError::Empty);
        }
        if source.chars().count() > MAX_EXPRESSION_LEN {
            return Err(ExpressionError::TooLong {
                max: MAX_EXPRESSION_LEN,
            });
        }

        let mut parser = Parser::new(source);
        let root = parser.parse_expr()?;
        parser.skip_whitespace();
        if let Some(ch) = parser.peek_char() {
            return Err(ExpressionError::UnexpectedToken {
                found: format!("'{ch}'"),
                pos: parser.current_pos,
            });
        }

        Ok(CalculatorExpression {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate(&self, bindings: &Bindings) -> Result<Decimal, ExpressionError> {
        eval(&self.root, bindings)
    }
}

impl fmt::Display for CalculatorExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parses and evaluates in one step.
pub fn evaluate(source: &str, bindings: &Bindings) -> Result<Decimal, ExpressionError> {
    CalculatorExpression::parse(source)?.evaluate(bindings)
}

fn eval(expr: &Expr, bindings: &Bindings) -> Result<Decimal, ExpressionError> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Var(var) => Ok(bindings.get(*var)),
        Expr::Neg(inner) => Ok(-eval(inner, bindings)?),
        Expr::Binary(op, lhs, rhs) => {
            let l = eval(lhs, bindings)?;
            let r = eval(rhs, bindings)?;
            let result = match op {
                BinaryOp::Add => l.checked_add(r),
                BinaryOp::Sub => l.checked_sub(r),
                BinaryOp::Mul => l.checked_mul(r),
                BinaryOp::Div => {
                    if r.is_zero() {
                        return Err(ExpressionError::DivisionByZero);
                    }
                    l.checked_div(r)
                }
            };
            result.ok_or(ExpressionError::Overflow)
        }
    }
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Parser {
            input,
            chars: input.char_indices().peekable(),
            current_pos: 0,
            depth: 0,
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.parse_term()?;
        loop {
            self.skip_whitespace();
            let op = match self.peek_char() {
                Some('+') => BinaryOp::Add,
                Some('-') => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_term(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.parse_factor()?;
        loop {
            self.skip_whitespace();
            let op = match self.peek_char() {
                Some('*') => BinaryOp::Mul,
                Some('/') => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_factor()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_factor(&mut self) -> Result<Expr, ExpressionError> {
        self.skip_whitespace();
        let Some(ch) = self.peek_char() else {
            return Err(ExpressionError::UnexpectedEnd);
        };

        match ch {
            '+' | '-' => {
                self.advance();
                self.enter()?;
                let inner = self.parse_factor()?;
                self.depth -= 1;
                Ok(if ch == '-' {
                    Expr::Neg(Box::new(inner))
                } else {
                    inner
                })
            }
            '(' => {
                self.advance();
                self.enter()?;
                let inner = self.parse_expr()?;
                self.expect_close()?;
                self.depth -= 1;
                Ok(inner)
            }
            c if c.is_ascii_digit() || c == '.' => self.parse_number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.parse_identifier(),
            ')' | '*' | '/' => Err(ExpressionError::UnexpectedToken {
                found: format!("'{ch}'"),
                pos: self.current_pos,
            }),
            other => Err(ExpressionError::UnexpectedChar {
                ch: other,
                pos: self.current_pos,
            }),
        }
    }

    fn parse_number(&mut self) -> Result<Expr, ExpressionError> {
        let start = self.current_pos;
        while let Some(ch) = self.peek_char() {
            if !(ch.is_ascii_digit() || ch == '.') {
                break;
            }
            self.advance();
        }
        let literal = &self.input[start..self.current_pos];
        Decimal::from_str(literal)
            .map(Expr::Number)
            .map_err(|_| ExpressionError::InvalidNumber(literal.to_string()))
    }

    fn parse_identifier(&mut self) -> Result<Expr, ExpressionError> {
        let start = self.current_pos;
        while let Some(ch) = self.peek_char() {
            if !(ch.is_ascii_alphanumeric() || ch == '_') {
                break;
            }
            self.advance();
        }
        let name = &self.input[start..self.current_pos];
        Variable::from_name(name)
            .map(Expr::Var)
            .ok_or_else(|| ExpressionError::UnknownIdentifier(name.to_string()))
    }

    fn enter(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_EXPRESSION_DEPTH {
            return Err(ExpressionError::TooDeep {
                max: MAX_EXPRESSION_DEPTH,
            });
        }
        Ok(())
    }

    fn expect_close(&mut self) -> Result<(), ExpressionError> {
        self.skip_whitespace();
        match self.peek_char() {
            Some(')') => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(ExpressionError::UnexpectedToken {
                found: format!("'{ch}'"),
                pos: self.current_pos,
            }),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if !ch.is_whitespace() {
                break;
            }
            self.advance();
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn advance(&mut self) {
        if let Some((pos, ch)) = self.chars.next() {
            self.current_pos = pos + ch.len_utf8();
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bindings() -> Bindings {
        Bindings {
            amount: dec!(3000),
            days: dec!(10),
        }
    }

    #[test]
    fn test_precedence_and_parentheses() {
        assert_eq!(evaluate("amount / days", &bindings()), Ok(dec!(300)));
        assert_eq!(evaluate("1 + 2 * 3", &bindings()), Ok(dec!(7)));
        assert_eq!(evaluate("(1 + 2) * 3", &bindings()), Ok(dec!(9)));
        assert_eq!(evaluate("10 - 4 - 3", &bindings()), Ok(dec!(3)));
        assert_eq!(evaluate("-days + 2.5", &bindings()), Ok(dec!(-7.5)));
    }

    #[test]
    fn test_unknown_identifier_rejected() {
        assert_eq!(
            evaluate("amount * price", &bindings()),
            Err(ExpressionError::UnknownIdentifier("price".to_string()))
        );
        assert!(matches!(
            evaluate("process.exit(1)", &bindings()),
            Err(ExpressionError::UnknownIdentifier(_))
        ));
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(evaluate("   ", &bindings()), Err(ExpressionError::Empty));
        assert_eq!(evaluate("(amount", &bindings()), Err(ExpressionError::UnexpectedEnd));
        assert_eq!(evaluate("amount +", &bindings()), Err(ExpressionError::UnexpectedEnd));
        assert!(matches!(
            evaluate("amount days", &bindings()),
            Err(ExpressionError::UnexpectedToken { pos: 7, .. })
        ));
        assert!(matches!(
            evaluate("amount ^ 2", &bindings()),
            Err(ExpressionError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            evaluate("amount; 1", &bindings()),
            Err(ExpressionError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            evaluate("$amount", &bindings()),
            Err(ExpressionError::UnexpectedChar { ch: '$', pos: 0 })
        ));
        assert_eq!(
            evaluate("1.2.3", &bindings()),
            Err(ExpressionError::InvalidNumber("1.2.3".to_string()))
        );
    }

    #[test]
    fn test_division_by_zero() {
        let zero_days = Bindings {
            days: Decimal::ZERO,
            ..bindings()
        };
        assert_eq!(
            evaluate("amount / days", &zero_days),
            Err(ExpressionError::DivisionByZero)
        );
    }

    #[test]
    fn test_limits() {
        let long = "1+".repeat(200) + "1";
        assert_eq!(
            evaluate(&long, &bindings()),
            Err(ExpressionError::TooLong {
                max: MAX_EXPRESSION_LEN
            })
        );

        let deep = "(".repeat(40) + "1" + &")".repeat(40);
        assert_eq!(
            evaluate(&deep, &bindings()),
            Err(ExpressionError::TooDeep {
                max: MAX_EXPRESSION_DEPTH
            })
        );

        let ok = "(".repeat(10) + "amount" + &")".repeat(10);
        assert_eq!(evaluate(&ok, &bindings()), Ok(dec!(3000)));
    }

    #[test]
    fn test_parsed_expression_reuse() {
        let expr = CalculatorExpression::parse("amount / days").unwrap();
        assert_eq!(expr.to_string(), "amount / days");
        assert_eq!(
            expr.evaluate(&Bindings {
                amount: dec!(100),
                days: dec!(4)
            }),
            Ok(dec!(25))
        );
    }
}
