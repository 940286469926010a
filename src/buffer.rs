//! Ordered, append-only sequence of assembly lines.
//!
//! The code generator keeps two of these: a header whose contents depend on
//! facts only known once the body is finished, and the body itself. They
//! are concatenated in that fixed order at the end.

use std::fmt;

const INDENT: &str = "    ";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBuffer {
  lines: Vec<String>,
}

impl CodeBuffer {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append an indented instruction or directive.
  pub fn insn(&mut self, text: impl AsRef<str>) {
    self.lines.push(format!("{INDENT}{}", text.as_ref()));
  }

  pub fn label(&mut self, name: &str) {
    self.lines.push(format!("{name}:"));
  }

  /// Move every line of `other` to the end of this buffer.
  pub fn append(&mut self, mut other: CodeBuffer) {
    self.lines.append(&mut other.lines);
  }

  pub fn lines(&self) -> &[String] {
    &self.lines
  }

  pub fn is_empty(&self) -> bool {
    self.lines.is_empty()
  }

  pub fn into_string(self) -> String {
    self.to_string()
  }
}

impl fmt::Display for CodeBuffer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for line in &self.lines {
      writeln!(f, "{line}")?;
    }
    Ok(())
  }
}
