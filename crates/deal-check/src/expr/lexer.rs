//! Tokenizer for contract expressions.

use crate::interpreter::error::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `$name` without the sigil.
    Variable(String),
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Arrow,
    Question,
    Colon,
    Bang,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Dot,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    EqEqEq,
    NotEqEq,
    AndAnd,
    OrOr,
    Eof,
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

fn syntax(offset: usize, message: impl Into<String>) -> EvalError {
    EvalError::Syntax {
        offset,
        message: message.into(),
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// Splits `src` into tokens, always ending with [`Token::Eof`].
pub fn tokenize(src: &str) -> Result<Vec<Spanned>, EvalError> {
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let peek = |i: usize| chars.get(i).map(|(_, c)| *c);

    while i < chars.len() {
        let (offset, c) = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let (token, len) = match c {
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            '[' => (Token::LBracket, 1),
            ']' => (Token::RBracket, 1),
            ',' => (Token::Comma, 1),
            '?' => (Token::Question, 1),
            ':' => (Token::Colon, 1),
            '+' => (Token::Plus, 1),
            '*' => (Token::Star, 1),
            '/' => (Token::Slash, 1),
            '%' => (Token::Percent, 1),
            '.' => (Token::Dot, 1),
            '-' if peek(i + 1) == Some('>') => (Token::Arrow, 2),
            '-' => (Token::Minus, 1),
            '<' if peek(i + 1) == Some('=') => (Token::Le, 2),
            '<' if peek(i + 1) == Some('>') => (Token::NotEq, 2),
            '<' => (Token::Lt, 1),
            '>' if peek(i + 1) == Some('=') => (Token::Ge, 2),
            '>' => (Token::Gt, 1),
            '=' if peek(i + 1) == Some('=') && peek(i + 2) == Some('=') => (Token::EqEqEq, 3),
            '=' if peek(i + 1) == Some('=') => (Token::EqEq, 2),
            '=' => return Err(syntax(offset, "assignment is not allowed in contracts")),
            '!' if peek(i + 1) == Some('=') && peek(i + 2) == Some('=') => (Token::NotEqEq, 3),
            '!' if peek(i + 1) == Some('=') => (Token::NotEq, 2),
            '!' => (Token::Bang, 1),
            '&' if peek(i + 1) == Some('&') => (Token::AndAnd, 2),
            '|' if peek(i + 1) == Some('|') => (Token::OrOr, 2),
            '$' => {
                let mut j = i + 1;
                match peek(j) {
                    Some(c) if is_ident_start(c) => {}
                    _ => return Err(syntax(offset, "expected variable name after '$'")),
                }
                while peek(j).is_some_and(is_ident_continue) {
                    j += 1;
                }
                let name: String = chars[i + 1..j].iter().map(|(_, c)| *c).collect();
                (Token::Variable(name), j - i)
            }
            '\'' | '"' => {
                let (s, len) = lex_string(&chars, i)?;
                (Token::Str(s), len)
            }
            c if c.is_ascii_digit() => lex_number(&chars, i)?,
            c if is_ident_start(c) => {
                let mut j = i;
                while peek(j).is_some_and(is_ident_continue) {
                    j += 1;
                }
                let name: String = chars[i..j].iter().map(|(_, c)| *c).collect();
                (Token::Ident(name), j - i)
            }
            other => return Err(syntax(offset, format!("unexpected character '{}'", other))),
        };

        tokens.push(Spanned { token, offset });
        i += len;
    }

    tokens.push(Spanned {
        token: Token::Eof,
        offset: src.len(),
    });
    Ok(tokens)
}

/// Lexes a quoted string starting at `start`; returns the text and the number
/// of chars consumed including both quotes.
fn lex_string(chars: &[(usize, char)], start: usize) -> Result<(String, usize), EvalError> {
    let (offset, quote) = chars[start];
    let mut out = String::new();
    let mut j = start + 1;
    loop {
        let Some(&(_, c)) = chars.get(j) else {
            return Err(syntax(offset, "unterminated string literal"));
        };
        j += 1;
        if c == quote {
            return Ok((out, j - start));
        }
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(&(_, escaped)) = chars.get(j) else {
            return Err(syntax(offset, "unterminated string literal"));
        };
        j += 1;
        match (quote, escaped) {
            (_, '\\') => out.push('\\'),
            (q, e) if e == q => out.push(e),
            ('"', 'n') => out.push('\n'),
            ('"', 't') => out.push('\t'),
            ('"', 'r') => out.push('\r'),
            ('"', '$') => out.push('$'),
            (_, other) => {
                // Unknown escapes are kept verbatim.
                out.push('\\');
                out.push(other);
            }
        }
    }
}

fn lex_number(chars: &[(usize, char)], start: usize) -> Result<(Token, usize), EvalError> {
    let offset = chars[start].0;
    let digit_at = |j: usize| chars.get(j).is_some_and(|(_, c)| c.is_ascii_digit());

    let mut j = start;
    while digit_at(j) {
        j += 1;
    }
    let mut is_float = false;
    if chars.get(j).is_some_and(|(_, c)| *c == '.') && digit_at(j + 1) {
        is_float = true;
        j += 1;
        while digit_at(j) {
            j += 1;
        }
    }
    if chars.get(j).is_some_and(|(_, c)| *c == 'e' || *c == 'E') {
        let mut k = j + 1;
        if chars.get(k).is_some_and(|(_, c)| *c == '+' || *c == '-') {
            k += 1;
        }
        if digit_at(k) {
            is_float = true;
            j = k;
            while digit_at(j) {
                j += 1;
            }
        }
    }

    let text: String = chars[start..j].iter().map(|(_, c)| *c).collect();
    let token = if is_float {
        Token::Float(
            text.parse()
                .map_err(|_| syntax(offset, format!("invalid number '{}'", text)))?,
        )
    } else {
        Token::Int(
            text.parse()
                .map_err(|_| syntax(offset, format!("integer literal '{}' is too large", text)))?,
        )
    };
    Ok((token, j - start))
}
