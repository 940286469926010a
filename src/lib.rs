//! Crate root: wires together the compilation pipeline.
//!
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` owns all syntactic knowledge and returns a typed statement list;
//!   `ty` holds the two numeric types and their promotion rule.
//! - `codegen` lowers the program into x86-64 AT&T assembly, composing the
//!   output from `buffer::CodeBuffer`s.
//! - `error` centralises reporting utilities shared by the other modules.
//! - `selftest` is the suite run by the binary when given no paths.

pub mod buffer;
pub mod codegen;
pub mod error;
pub mod parser;
pub mod selftest;
pub mod tokenizer;
pub mod ty;

use std::fs;
use std::path::Path;

use snafu::ResultExt;
use tracing::{debug, info};

pub use error::{CompileError, CompileResult};
pub use parser::{AstNode, BinaryOp, Program, Value};
pub use tokenizer::{Token, TokenKind, tokenize};
pub use ty::Type;

/// What a compilation writes out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Emit {
  #[default]
  Asm,
  Tokens,
  Ast,
}

/// Tokenize and parse a source string into a typed program.
pub fn parse_source(source: &str) -> CompileResult<Program> {
  let tokens = tokenizer::tokenize(source)?;
  parser::parse(tokens, source)
}

/// Compile a source string into AT&T assembly.
pub fn generate_assembly(source: &str) -> CompileResult<String> {
  let program = parse_source(source)?;
  Ok(codegen::generate(&program))
}

/// Render `source` as the requested output kind.
pub fn render(source: &str, emit: Emit) -> CompileResult<String> {
  match emit {
    Emit::Asm => generate_assembly(source),
    Emit::Tokens => {
      let tokens = tokenizer::tokenize(source)?;
      Ok(format!("{}\n", tokenizer::dump_tokens(&tokens)))
    }
    Emit::Ast => Ok(parse_source(source)?.to_string()),
  }
}

/// Read `input`, compile it, and write the result to `output`.
///
/// Nothing is written unless compilation succeeds.
pub fn compile_file(input: &Path, output: &Path, emit: Emit) -> CompileResult<()> {
  debug!(input = %input.display(), ?emit, "compiling");
  let source = fs::read_to_string(input).context(error::ReadSourceSnafu { path: input })?;
  let rendered = render(&source, emit)?;
  fs::write(output, &rendered).context(error::WriteOutputSnafu { path: output })?;
  info!(
    output = %output.display(),
    bytes = rendered.len(),
    "wrote output"
  );
  Ok(())
}
