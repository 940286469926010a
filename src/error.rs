//! Shared error utilities used across the compilation pipeline.
//!
//! Lexical and syntax diagnostics are formatted in a style reminiscent of
//! chibicc: a `line:column` header, the offending source line, and a caret
//! under the offending byte. File errors wrap the underlying I/O failure.

use std::path::PathBuf;

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
pub enum CompileError {
  #[snafu(display("{line}:{column}: lex error: {message}\n{source_line}\n{marker}"))]
  Lex {
    offset: usize,
    line: usize,
    column: usize,
    source_line: String,
    marker: String,
    message: String,
  },

  #[snafu(display("{line}:{column}: syntax error: {message}\n{source_line}\n{marker}"))]
  Syntax {
    offset: usize,
    line: usize,
    column: usize,
    source_line: String,
    marker: String,
    message: String,
  },

  #[snafu(visibility(pub(crate)), display("failed to read {}: {source}", path.display()))]
  ReadSource {
    path: PathBuf,
    source: std::io::Error,
  },

  #[snafu(visibility(pub(crate)), display("failed to write {}: {source}", path.display()))]
  WriteOutput {
    path: PathBuf,
    source: std::io::Error,
  },
}

impl CompileError {
  /// A lexical error anchored at a byte offset in `source`.
  pub fn lex(source: &str, offset: usize, message: impl Into<String>) -> Self {
    let pos = Position::locate(source, offset);
    LexSnafu {
      offset: pos.offset,
      line: pos.line,
      column: pos.column,
      source_line: pos.source_line,
      marker: pos.marker,
      message: message.into(),
    }
    .build()
  }

  /// A syntax error anchored at a byte offset in `source`.
  pub fn syntax(source: &str, offset: usize, message: impl Into<String>) -> Self {
    let pos = Position::locate(source, offset);
    SyntaxSnafu {
      offset: pos.offset,
      line: pos.line,
      column: pos.column,
      source_line: pos.source_line,
      marker: pos.marker,
      message: message.into(),
    }
    .build()
  }

  /// Byte offset of the offending input, if the error points into the source.
  pub fn offset(&self) -> Option<usize> {
    match self {
      Self::Lex { offset, .. } | Self::Syntax { offset, .. } => Some(*offset),
      Self::ReadSource { .. } | Self::WriteOutput { .. } => None,
    }
  }

  /// The bare diagnostic message without location decoration.
  pub fn message(&self) -> Option<&str> {
    match self {
      Self::Lex { message, .. } | Self::Syntax { message, .. } => Some(message),
      Self::ReadSource { .. } | Self::WriteOutput { .. } => None,
    }
  }

  pub fn is_lex(&self) -> bool {
    matches!(self, Self::Lex { .. })
  }

  pub fn is_syntax(&self) -> bool {
    matches!(self, Self::Syntax { .. })
  }
}

struct Position {
  offset: usize,
  line: usize,
  column: usize,
  source_line: String,
  marker: String,
}

impl Position {
  fn locate(source: &str, offset: usize) -> Self {
    let mut offset = offset.min(source.len());
    while !source.is_char_boundary(offset) {
      offset -= 1;
    }

    let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    let line_end = source[offset..]
      .find('\n')
      .map_or(source.len(), |i| offset + i);
    let line = source[..line_start].matches('\n').count() + 1;
    let column = source[line_start..offset].chars().count() + 1;
    let source_line = source[line_start..line_end]
      .trim_end_matches('\r')
      .to_string();
    let marker = format!("{}^", " ".repeat(column - 1));

    Self {
      offset,
      line,
      column,
      source_line,
      marker,
    }
  }
}
