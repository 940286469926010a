//! Lexical analysis: turns the raw input string into a vector of tokens.
//!
//! The tokenizer is a small state machine. It starts in `Initial`, moves to
//! `Integer` on a digit, is promoted to `Float` by a decimal point, and drops
//! back to `Initial` once the literal ends. Everything else is a single
//! character punctuator.

use std::fmt;

use tracing::debug;

use crate::error::{CompileError, CompileResult};

/// Longest numeric literal the scratch buffer accepts, in characters.
pub const MAX_LITERAL_LEN: usize = 99;

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
  Integer(i64),
  Float(f64),
  Plus,
  Minus,
  Star,
  Slash,
  LParen,
  RParen,
  Semicolon,
  Eof,
}

impl TokenKind {
  fn punctuator(c: char) -> Option<Self> {
    let kind = match c {
      '+' => Self::Plus,
      '-' => Self::Minus,
      '*' => Self::Star,
      '/' => Self::Slash,
      '(' => Self::LParen,
      ')' => Self::RParen,
      ';' => Self::Semicolon,
      _ => return None,
    };
    Some(kind)
  }
}

impl fmt::Display for TokenKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Integer(value) => write!(f, "{value}"),
      Self::Float(value) => write!(f, "{value:?}"),
      Self::Plus => f.write_str("+"),
      Self::Minus => f.write_str("-"),
      Self::Star => f.write_str("*"),
      Self::Slash => f.write_str("/"),
      Self::LParen => f.write_str("("),
      Self::RParen => f.write_str(")"),
      Self::Semicolon => f.write_str(";"),
      Self::Eof => f.write_str("EOF"),
    }
  }
}

/// Thin wrapper for lexical information needed by later stages.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
  pub kind: TokenKind,
  pub loc: usize,
  pub len: usize,
}

impl Token {
  pub fn new(kind: TokenKind, loc: usize, len: usize) -> Self {
    Self { kind, loc, len }
  }

  pub fn is_eof(&self) -> bool {
    self.kind == TokenKind::Eof
  }
}

impl fmt::Display for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(&self.kind, f)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
  Initial,
  Integer,
  Float,
}

struct Lexer<'a> {
  source: &'a str,
  tokens: Vec<Token>,
  scratch: String,
  start: usize,
  state: State,
}

impl<'a> Lexer<'a> {
  fn new(source: &'a str) -> Self {
    Self {
      source,
      tokens: Vec::new(),
      scratch: String::new(),
      start: 0,
      state: State::Initial,
    }
  }

  fn run(mut self) -> CompileResult<Vec<Token>> {
    let source = self.source;
    for (i, c) in source.char_indices() {
      self.step(i, c)?;
    }
    self.finish_literal(source.len())?;
    self.tokens.push(Token::new(TokenKind::Eof, source.len(), 0));
    Ok(self.tokens)
  }

  fn step(&mut self, i: usize, c: char) -> CompileResult<()> {
    match self.state {
      State::Integer | State::Float if c.is_ascii_digit() => return self.accumulate(c),
      State::Integer if c == '.' => {
        self.state = State::Float;
        return self.accumulate(c);
      }
      State::Float if c == '.' => {
        return Err(CompileError::lex(
          self.source,
          i,
          "numeric literal has more than one decimal point",
        ));
      }
      State::Integer | State::Float => self.finish_literal(i)?,
      State::Initial => {}
    }

    if c.is_whitespace() {
      return Ok(());
    }

    if c.is_ascii_digit() {
      self.state = State::Integer;
      self.start = i;
      self.scratch.clear();
      return self.accumulate(c);
    }

    match TokenKind::punctuator(c) {
      Some(kind) => {
        self.tokens.push(Token::new(kind, i, c.len_utf8()));
        Ok(())
      }
      None => Err(CompileError::lex(self.source, i, invalid_char_message(c))),
    }
  }

  fn accumulate(&mut self, c: char) -> CompileResult<()> {
    if self.scratch.len() >= MAX_LITERAL_LEN {
      return Err(CompileError::lex(
        self.source,
        self.start,
        format!("numeric literal exceeds {MAX_LITERAL_LEN} characters"),
      ));
    }
    self.scratch.push(c);
    Ok(())
  }

  /// Close the literal in progress, if any, ending at byte offset `end`.
  fn finish_literal(&mut self, end: usize) -> CompileResult<()> {
    let kind = match self.state {
      State::Initial => return Ok(()),
      State::Integer => {
        let value = self.scratch.parse::<i64>().map_err(|err| {
          CompileError::lex(self.source, self.start, format!("invalid number: {err}"))
        })?;
        TokenKind::Integer(value)
      }
      State::Float => {
        if self.scratch.ends_with('.') {
          return Err(CompileError::lex(
            self.source,
            end,
            "expected a digit after the decimal point",
          ));
        }
        let value = self.scratch.parse::<f64>().map_err(|err| {
          CompileError::lex(self.source, self.start, format!("invalid number: {err}"))
        })?;
        TokenKind::Float(value)
      }
    };

    self.tokens.push(Token::new(kind, self.start, end - self.start));
    self.state = State::Initial;
    Ok(())
  }
}

fn invalid_char_message(c: char) -> String {
  if c.is_alphabetic() || c == '_' {
    format!("unexpected identifier character '{c}': variables are not supported")
  } else {
    format!("invalid token: '{c}'")
  }
}

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
pub fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
  let tokens = Lexer::new(input).run()?;
  debug!(count = tokens.len(), "tokenized source");
  Ok(tokens)
}

/// Space-separated rendering of a token stream, used for diagnostic dumps.
pub fn dump_tokens(tokens: &[Token]) -> String {
  tokens
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join(" ")
}
