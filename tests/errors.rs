use numcc::{CompileError, generate_assembly, parse_source, tokenize};

fn syntax_error(source: &str) -> CompileError {
  let err = parse_source(source).unwrap_err();
  assert!(err.is_syntax(), "expected syntax error for {source:?}, got {err}");
  err
}

#[test]
fn unmatched_paren_reports_at_eof() {
  let tokens = tokenize("(0+0").expect("tokens ok");
  assert_eq!(tokens.len(), 5);
  let err = syntax_error("(0+0");
  assert_eq!(err.offset(), Some(4));
}

#[test]
fn missing_terminator() {
  let err = syntax_error("1+2\n3;");
  assert_eq!(err.message(), Some("expected \";\", but got \"3\""));
  assert!(err.to_string().starts_with("2:1: syntax error"));
}

#[test]
fn operator_without_operand() {
  let err = syntax_error("4 * ;");
  assert_eq!(err.offset(), Some(4));
  syntax_error("4 -");
  syntax_error("(1+)");
}

#[test]
fn lex_errors_carry_position() {
  let err = generate_assembly("1;\n  2 @ 3;").unwrap_err();
  assert!(err.is_lex());
  assert_eq!(err.offset(), Some(7));
  let rendered = err.to_string();
  assert!(rendered.starts_with("2:5: lex error: invalid token: '@'"), "{rendered}");
  assert!(rendered.ends_with("  2 @ 3;\n    ^"), "{rendered}");
}

#[test]
fn variables_are_not_supported() {
  let err = generate_assembly("a + 1;").unwrap_err();
  assert!(err.is_lex());
  assert_eq!(err.offset(), Some(0));
}
