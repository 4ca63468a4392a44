//! Block-structured plan text.
//!
//! ```text
//! # comment to end of line
//! name {
//!     key = "text", "more text";
//!     other = 1.5;
//!     inner { ... }
//! }
//! ```
//!
//! A statement holds either strings or reals, never both.  Keys and block
//! names may repeat; every occurrence is kept in declaration order.  The
//! text is parsed into a root [`Block`] named `""` holding the top-level
//! statements and blocks.

use crate::{DecisionError, DecisionResult};

/// One parsed block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Block {
    pub name:    String,
    pub strings: Vec<(String, String)>,
    pub reals:   Vec<(String, f64)>,
    pub blocks:  Vec<Block>,
}

impl Block {
    /// First string bound to `key`.
    pub fn string(&self, key: &str) -> Option<&str> {
        self.strings.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Every string bound to `key`, in order.
    pub fn strings_of<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.strings
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First real bound to `key`.
    pub fn real(&self, key: &str) -> Option<f64> {
        self.reals.iter().find(|(k, _)| k == key).map(|&(_, v)| v)
    }

    /// Child blocks named `name`, in order.
    pub fn blocks_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.blocks.iter().filter(move |b| b.name == name)
    }
}

/// Parse plan text into its root block.
pub fn parse(text: &str) -> DecisionResult<Block> {
    let mut parser = Parser { lexer: Lexer::new(text) };
    let mut root = Block::default();
    parser.body(&mut root, false)?;
    Ok(root)
}

// ── Lexer ─────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Real(f64),
    Open,
    Close,
    Equal,
    Comma,
    Semicolon,
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(s) => format!("identifier {s:?}"),
            Token::Str(s) => format!("string {s:?}"),
            Token::Real(v) => format!("number {v}"),
            Token::Open => "'{'".to_owned(),
            Token::Close => "'}'".to_owned(),
            Token::Equal => "'='".to_owned(),
            Token::Comma => "','".to_owned(),
            Token::Semicolon => "';'".to_owned(),
            Token::Eof => "end of input".to_owned(),
        }
    }
}

struct Lexer<'a> {
    source:   &'a [u8],
    position: usize,
    line:     usize,
    column:   usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self { source: text.as_bytes(), position: 0, line: 1, column: 1 }
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.position).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.position += 1;
        if ch == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>) -> DecisionError {
        DecisionError::Syntax { line, column, message: message.into() }
    }

    fn skip_blanks(&mut self) {
        while let Some(ch) = self.peek() {
            match ch {
                b'#' => {
                    while self.advance().is_some_and(|c| c != b'\n') {}
                }
                c if c.is_ascii_whitespace() => {
                    self.advance();
                }
                _ => break,
            }
        }
    }

    /// Next token with the position it starts at.
    fn next_token(&mut self) -> DecisionResult<(Token, usize, usize)> {
        self.skip_blanks();
        let (line, column) = (self.line, self.column);
        let Some(ch) = self.peek() else {
            return Ok((Token::Eof, line, column));
        };
        let token = match ch {
            b'{' | b'}' | b'=' | b',' | b';' => {
                self.advance();
                match ch {
                    b'{' => Token::Open,
                    b'}' => Token::Close,
                    b'=' => Token::Equal,
                    b',' => Token::Comma,
                    _ => Token::Semicolon,
                }
            }
            b'"' => self.string(line, column)?,
            b'-' | b'+' | b'.' | b'0'..=b'9' => self.real(line, column)?,
            c if c.is_ascii_alphabetic() || c == b'_' => self.ident(),
            other => {
                return Err(self.error(line, column, format!("unexpected character {:?}", other as char)));
            }
        };
        Ok((token, line, column))
    }

    fn string(&mut self, line: usize, column: usize) -> DecisionResult<Token> {
        self.advance();
        let mut bytes = Vec::new();
        loop {
            match self.advance() {
                Some(b'"') => break,
                Some(b'\\') => match self.advance() {
                    Some(b'n') => bytes.push(b'\n'),
                    Some(b't') => bytes.push(b'\t'),
                    Some(c) => bytes.push(c),
                    None => return Err(self.error(line, column, "unterminated string")),
                },
                Some(c) => bytes.push(c),
                None => return Err(self.error(line, column, "unterminated string")),
            }
        }
        String::from_utf8(bytes)
            .map(Token::Str)
            .map_err(|_| self.error(line, column, "string is not valid UTF-8"))
    }

    fn real(&mut self, line: usize, column: usize) -> DecisionResult<Token> {
        let start = self.position;
        if matches!(self.peek(), Some(b'-' | b'+')) {
            self.advance();
        }
        while let Some(c) = self.peek() {
            let exponent_sign = matches!(c, b'-' | b'+')
                && matches!(self.source.get(self.position - 1), Some(b'e' | b'E'));
            if c.is_ascii_digit() || matches!(c, b'.' | b'e' | b'E') || exponent_sign {
                self.advance();
            } else {
                break;
            }
        }
        let text = String::from_utf8_lossy(&self.source[start..self.position]);
        text.parse::<f64>()
            .map(Token::Real)
            .map_err(|_| self.error(line, column, format!("invalid number {text:?}")))
    }

    fn ident(&mut self) -> Token {
        let start = self.position;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' || c == b'-' {
                self.advance();
            } else {
                break;
            }
        }
        Token::Ident(String::from_utf8_lossy(&self.source[start..self.position]).into_owned())
    }
}

// ── Parser ────────────────────────────────────────────────────────────────────

struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl Parser<'_> {
    fn token(&mut self) -> DecisionResult<(Token, usize, usize)> {
        self.lexer.next_token()
    }

    fn unexpected(token: &Token, line: usize, column: usize, wanted: &str) -> DecisionError {
        DecisionError::Syntax {
            line,
            column,
            message: format!("expected {wanted}, found {}", token.describe()),
        }
    }

    /// Statements and child blocks until `}` (nested) or end of input (root).
    fn body(&mut self, block: &mut Block, nested: bool) -> DecisionResult<()> {
        loop {
            let (token, line, column) = self.token()?;
            let name = match token {
                Token::Close if nested => return Ok(()),
                Token::Eof if !nested => return Ok(()),
                Token::Ident(name) => name,
                other => {
                    let wanted = if nested { "identifier or '}'" } else { "identifier" };
                    return Err(Self::unexpected(&other, line, column, wanted));
                }
            };
            match self.token()? {
                (Token::Open, _, _) => {
                    let mut child = Block { name, ..Block::default() };
                    self.body(&mut child, true)?;
                    block.blocks.push(child);
                }
                (Token::Equal, _, _) => self.statement(block, name)?,
                (other, line, column) => {
                    return Err(Self::unexpected(&other, line, column, "'{' or '='"));
                }
            }
        }
    }

    /// `value (, value)* ;` after `key =`.
    fn statement(&mut self, block: &mut Block, key: String) -> DecisionResult<()> {
        let mut strings = Vec::new();
        let mut reals = Vec::new();
        loop {
            match self.token()? {
                (Token::Str(s), line, column) => {
                    if !reals.is_empty() {
                        return Err(Self::unexpected(&Token::Str(s), line, column, "number"));
                    }
                    strings.push(s);
                }
                (Token::Real(v), line, column) => {
                    if !strings.is_empty() {
                        return Err(Self::unexpected(&Token::Real(v), line, column, "string"));
                    }
                    reals.push(v);
                }
                (other, line, column) => {
                    return Err(Self::unexpected(&other, line, column, "string or number"));
                }
            }
            match self.token()? {
                (Token::Comma, _, _) => continue,
                (Token::Semicolon, _, _) => break,
                (other, line, column) => {
                    return Err(Self::unexpected(&other, line, column, "',' or ';'"));
                }
            }
        }
        block.strings.extend(strings.into_iter().map(|s| (key.clone(), s)));
        block.reals.extend(reals.into_iter().map(|v| (key.clone(), v)));
        Ok(())
    }
}
