//! Built-in self-checks run when the binary is invoked without arguments.
//!
//! Each case pins the token stream and, when the source is a valid program,
//! the typed AST dump. Every valid case is also compiled twice to make sure
//! the emitted assembly is byte-identical.

use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::error::CompileError;
use crate::tokenizer::{dump_tokens, tokenize};

#[derive(Debug, Snafu)]
pub enum SelfTestError {
  #[snafu(display("self-test `{name}` failed to compile: {source}"))]
  Compile {
    name: &'static str,
    source: CompileError,
  },

  #[snafu(display("self-test `{name}`: {stage} mismatch\n  expected: {expected}\n    actual: {actual}"))]
  Mismatch {
    name: &'static str,
    stage: &'static str,
    expected: String,
    actual: String,
  },
}

struct Case {
  name: &'static str,
  source: &'static str,
  tokens: &'static str,
  ast: Option<&'static str>,
}

const CASES: &[Case] = &[
  Case {
    name: "numeric literals",
    source: "0 1 23 4.5 0.125",
    tokens: "0 1 23 4.5 0.125 EOF",
    ast: None,
  },
  Case {
    name: "addition",
    source: "1+2;\n3.5+4;",
    tokens: "1 + 2 ; 3.5 + 4 ; EOF",
    ast: Some("(+:long 1 2)\n(+:double 3.5 4)\n"),
  },
  Case {
    name: "precedence",
    source: "1+2*3;",
    tokens: "1 + 2 * 3 ; EOF",
    ast: Some("(+:long 1 (*:long 2 3))\n"),
  },
  Case {
    name: "left associativity",
    source: "1+2+3;",
    tokens: "1 + 2 + 3 ; EOF",
    ast: Some("(+:long (+:long 1 2) 3)\n"),
  },
  Case {
    name: "parentheses",
    source: "(0+0)*0+0-0;",
    tokens: "( 0 + 0 ) * 0 + 0 - 0 ; EOF",
    ast: Some("(-:long (+:long (*:long (+:long 0 0) 0) 0) 0)\n"),
  },
  Case {
    name: "negative literals",
    source: "-1; -2.5*2;",
    tokens: "- 1 ; - 2.5 * 2 ; EOF",
    ast: Some("-1\n(*:double -2.5 2)\n"),
  },
  Case {
    name: "division",
    source: "3/2; 3.0/2;",
    tokens: "3 / 2 ; 3.0 / 2 ; EOF",
    ast: Some("(/:long 3 2)\n(/:double 3.0 2)\n"),
  },
];

/// Run every case, returning how many passed or the first failure.
pub fn run() -> Result<usize, SelfTestError> {
  for case in CASES {
    check(case)?;
    debug!(name = case.name, "self-test passed");
  }
  Ok(CASES.len())
}

fn check(case: &Case) -> Result<(), SelfTestError> {
  let name = case.name;
  let tokens = tokenize(case.source).context(CompileSnafu { name })?;
  compare(name, "tokens", case.tokens, &dump_tokens(&tokens))?;

  let Some(ast) = case.ast else {
    return Ok(());
  };

  let program = crate::parser::parse(tokens, case.source).context(CompileSnafu { name })?;
  compare(name, "ast", ast, &program.to_string())?;

  let first = crate::generate_assembly(case.source).context(CompileSnafu { name })?;
  let second = crate::generate_assembly(case.source).context(CompileSnafu { name })?;
  if first != second {
    return MismatchSnafu {
      name,
      stage: "determinism",
      expected: "identical assembly",
      actual: "assembly differs between runs",
    }
    .fail();
  }
  Ok(())
}

fn compare(
  name: &'static str,
  stage: &'static str,
  expected: &str,
  actual: &str,
) -> Result<(), SelfTestError> {
  if expected == actual {
    return Ok(());
  }
  MismatchSnafu {
    name,
    stage,
    expected,
    actual,
  }
  .fail()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn all_cases_pass() {
    assert_eq!(run().expect("self-tests"), CASES.len());
  }

  #[test]
  fn mismatch_names_the_stage() {
    let err = compare("demo", "ast", "1\n", "2\n").unwrap_err();
    let text = err.to_string();
    assert!(text.contains("`demo`: ast mismatch"), "{text}");
  }
}
