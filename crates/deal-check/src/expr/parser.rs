//! Recursive-descent parser for contract expressions.
//!
//! Precedence, loosest first: ternary, `||`/`or`, `&&`/`and`, equality,
//! relational, additive (`+ - .`), multiplicative, unary, postfix.
//!
//! Bracketing and prefix operators may nest at most [`MAX_NESTING`] levels,
//! and the tree built is at most [`MAX_DEPTH`] nodes high, so evaluating or
//! dropping a parsed expression never recurses deeper than that.

use deal_core::Value;

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::lexer::{tokenize, Spanned, Token};
use crate::interpreter::error::EvalError;

/// Deepest nesting of parentheses, brackets, calls, ternaries and prefix
/// operators.
pub const MAX_NESTING: usize = 64;

/// Greatest height of a parsed expression tree.
pub const MAX_DEPTH: usize = 256;

/// Parses a complete contract expression.
pub fn parse(src: &str) -> Result<Expr, EvalError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        height: 0,
    };
    let expr = parser.ternary()?;
    match parser.peek() {
        Token::Eof => Ok(expr),
        other => Err(parser.error(format!("unexpected {:?} after expression", other))),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Active nested `ternary`/`unary` calls.
    depth: usize,
    /// Height of the expression most recently returned.
    height: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // tokenize always ends with Eof, and Eof is never consumed.
        &self.tokens[self.pos].token
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos].offset
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].token.clone();
        if token != Token::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), EvalError> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected {}, found {:?}", what, self.peek())))
        }
    }

    fn error(&self, message: String) -> EvalError {
        EvalError::Syntax {
            offset: self.offset(),
            message,
        }
    }

    fn too_deep(&self, limit: usize) -> EvalError {
        self.error(format!("expression nested more than {} levels deep", limit))
    }

    /// Runs `f` one recursion level deeper.
    fn descend<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, EvalError>,
    ) -> Result<T, EvalError> {
        if self.depth >= MAX_NESTING {
            return Err(self.too_deep(MAX_NESTING));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Records the height of the node about to be returned.
    fn grow(&mut self, height: usize) -> Result<(), EvalError> {
        if height > MAX_DEPTH {
            return Err(self.too_deep(MAX_DEPTH));
        }
        self.height = height;
        Ok(())
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Token::Ident(name) if name.eq_ignore_ascii_case(keyword))
    }

    fn ternary(&mut self) -> Result<Expr, EvalError> {
        self.descend(|p| {
            let cond = p.or()?;
            if !p.eat(&Token::Question) {
                return Ok(cond);
            }
            let cond_height = p.height;
            let then = p.ternary()?;
            let then_height = p.height;
            p.expect(Token::Colon, "':' in ternary")?;
            let otherwise = p.ternary()?;
            p.grow(cond_height.max(then_height).max(p.height) + 1)?;
            Ok(Expr::Ternary {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            })
        })
    }

    /// Left-folds `lhs op rhs` while `next_op` matches.
    fn fold(
        &mut self,
        operand: fn(&mut Self) -> Result<Expr, EvalError>,
        next_op: fn(&Self) -> Option<BinaryOp>,
    ) -> Result<Expr, EvalError> {
        let mut lhs = operand(self)?;
        while let Some(op) = next_op(self) {
            self.advance();
            let lhs_height = self.height;
            let rhs = operand(self)?;
            self.grow(lhs_height.max(self.height) + 1)?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn or(&mut self) -> Result<Expr, EvalError> {
        self.fold(Self::and, |p| {
            (*p.peek() == Token::OrOr || p.is_keyword("or")).then_some(BinaryOp::Or)
        })
    }

    fn and(&mut self) -> Result<Expr, EvalError> {
        self.fold(Self::equality, |p| {
            (*p.peek() == Token::AndAnd || p.is_keyword("and")).then_some(BinaryOp::And)
        })
    }

    fn equality(&mut self) -> Result<Expr, EvalError> {
        self.fold(Self::relational, |p| match p.peek() {
            Token::EqEq => Some(BinaryOp::Eq),
            Token::NotEq => Some(BinaryOp::Ne),
            Token::EqEqEq => Some(BinaryOp::Identical),
            Token::NotEqEq => Some(BinaryOp::NotIdentical),
            _ => None,
        })
    }

    fn relational(&mut self) -> Result<Expr, EvalError> {
        self.fold(Self::additive, |p| match p.peek() {
            Token::Lt => Some(BinaryOp::Lt),
            Token::Le => Some(BinaryOp::Le),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Ge => Some(BinaryOp::Ge),
            _ => None,
        })
    }

    fn additive(&mut self) -> Result<Expr, EvalError> {
        self.fold(Self::multiplicative, |p| match p.peek() {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            Token::Dot => Some(BinaryOp::Concat),
            _ => None,
        })
    }

    fn multiplicative(&mut self) -> Result<Expr, EvalError> {
        self.fold(Self::unary, |p| match p.peek() {
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            Token::Percent => Some(BinaryOp::Rem),
            _ => None,
        })
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        let op = match self.peek() {
            Token::Bang => UnaryOp::Not,
            Token::Minus => UnaryOp::Neg,
            Token::Ident(name) if name.eq_ignore_ascii_case("not") => UnaryOp::Not,
            _ => return self.postfix(),
        };
        self.advance();
        let operand = self.descend(Self::unary)?;
        // Fold negated integer literals.
        if let (UnaryOp::Neg, Expr::Literal(Value::Int(i))) = (op, &operand) {
            if let Some(negated) = i.checked_neg() {
                return Ok(Expr::Literal(Value::Int(negated)));
            }
        }
        self.grow(self.height + 1)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::Arrow) {
                let field = match self.advance() {
                    Token::Ident(name) => name,
                    other => {
                        return Err(self.error(format!(
                            "expected field name after '->', found {:?}",
                            other
                        )))
                    }
                };
                self.grow(self.height + 1)?;
                expr = Expr::Field {
                    target: Box::new(expr),
                    field,
                };
            } else if self.eat(&Token::LBracket) {
                let target_height = self.height;
                let index = self.ternary()?;
                self.expect(Token::RBracket, "']'")?;
                self.grow(target_height.max(self.height) + 1)?;
                expr = Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        let offset = self.offset();
        let leaf = match self.advance() {
            Token::Int(i) => Expr::Literal(Value::Int(i)),
            Token::Float(f) => Expr::Literal(Value::Float(f)),
            Token::Str(s) => Expr::Literal(Value::Str(s)),
            Token::Variable(name) => Expr::Variable(name),
            Token::LParen => {
                let inner = self.ternary()?;
                self.expect(Token::RParen, "')'")?;
                return Ok(inner);
            }
            Token::LBracket => {
                let items = self.arguments(Token::RBracket, "']'")?;
                return Ok(Expr::List(items));
            }
            Token::Ident(name) => {
                if self.eat(&Token::LParen) {
                    let args = self.arguments(Token::RParen, "')'")?;
                    return Ok(Expr::Call {
                        name: name.to_ascii_lowercase(),
                        args,
                    });
                }
                match name.to_ascii_lowercase().as_str() {
                    "true" => Expr::Literal(Value::Bool(true)),
                    "false" => Expr::Literal(Value::Bool(false)),
                    "null" => Expr::Literal(Value::Null),
                    _ => {
                        return Err(EvalError::Syntax {
                            offset,
                            message: format!(
                                "bare identifier '{}' (variables start with '$')",
                                name
                            ),
                        })
                    }
                }
            }
            Token::Eof => {
                return Err(EvalError::Syntax {
                    offset,
                    message: "unexpected end of expression".into(),
                })
            }
            other => {
                return Err(EvalError::Syntax {
                    offset,
                    message: format!("unexpected {:?}", other),
                })
            }
        };
        self.height = 1;
        Ok(leaf)
    }

    /// Comma-separated expressions up to `close`; the opening token is
    /// already consumed. A trailing comma is allowed. Leaves `height` set
    /// for the enclosing list or call node.
    fn arguments(&mut self, close: Token, what: &str) -> Result<Vec<Expr>, EvalError> {
        let mut items = Vec::new();
        let mut tallest = 0;
        loop {
            if self.eat(&close) {
                break;
            }
            items.push(self.ternary()?);
            tallest = tallest.max(self.height);
            if !self.eat(&Token::Comma) {
                self.expect(close, what)?;
                break;
            }
        }
        self.grow(tallest + 1)?;
        Ok(items)
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}
