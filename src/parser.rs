//! Recursive-descent parser producing a typed statement list.
//!
//! Grammar:
//!
//! ```text
//! program := statement* EOF
//! statement := expr ';'
//! expr   := term (('+'|'-') term)*
//! term   := factor (('*'|'/') factor)*
//! factor := '(' expr ')' | ['-'] (INTEGER | FLOAT)
//! ```
//!
//! Each helper returns `Ok(None)` when its production does not apply, after
//! rewinding the cursor, so the caller can try something else. Once an
//! operator has been consumed its right operand is mandatory and a missing
//! one is reported as a syntax error instead.
//!
//! Types are resolved while the tree is built: literals carry the type of
//! their lexical form and binary nodes take the promotion of their children.

use std::fmt;

use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::tokenizer::{Token, TokenKind};
use crate::ty::Type;

/// Parentheses open at once; bounds the parser's own recursion.
pub const MAX_PAREN_DEPTH: usize = 256;
/// Height of a statement's tree; bounds codegen, printing and drop recursion.
pub const MAX_TREE_HEIGHT: usize = 1000;

/// Binary operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
}

impl BinaryOp {
  pub fn symbol(self) -> &'static str {
    match self {
      BinaryOp::Add => "+",
      BinaryOp::Sub => "-",
      BinaryOp::Mul => "*",
      BinaryOp::Div => "/",
    }
  }
}

/// Constant payload of a literal; the variant fixes the literal's type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
  Long(i64),
  Double(f64),
}

impl Value {
  pub fn ty(self) -> Type {
    match self {
      Value::Long(_) => Type::Long,
      Value::Double(_) => Type::Double,
    }
  }
}

/// Expression tree produced by the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
  Literal {
    value: Value,
  },
  Binary {
    op: BinaryOp,
    ty: Type,
    lhs: Box<AstNode>,
    rhs: Box<AstNode>,
  },
}

impl AstNode {
  pub fn long(value: i64) -> Self {
    Self::Literal {
      value: Value::Long(value),
    }
  }

  pub fn double(value: f64) -> Self {
    Self::Literal {
      value: Value::Double(value),
    }
  }

  /// Build a binary node; its type is computed here and never revisited.
  pub fn binary(op: BinaryOp, lhs: AstNode, rhs: AstNode) -> Self {
    Self::Binary {
      op,
      ty: Type::promote(lhs.ty(), rhs.ty()),
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    }
  }

  pub fn ty(&self) -> Type {
    match self {
      AstNode::Literal { value } => value.ty(),
      AstNode::Binary { ty, .. } => *ty,
    }
  }

  /// Number of simultaneously live spill slots needed to evaluate this node.
  pub fn spill_depth(&self) -> usize {
    match self {
      AstNode::Literal { .. } => 0,
      AstNode::Binary { lhs, rhs, .. } => rhs.spill_depth().max(1 + lhs.spill_depth()),
    }
  }
}

impl fmt::Display for AstNode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AstNode::Literal {
        value: Value::Long(value),
      } => write!(f, "{value}"),
      AstNode::Literal {
        value: Value::Double(value),
      } => write!(f, "{value:?}"),
      AstNode::Binary { op, ty, lhs, rhs } => {
        write!(f, "({}:{ty} {lhs} {rhs})", op.symbol())
      }
    }
  }
}

/// A whole source file: statements in evaluation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
  pub stmts: Vec<AstNode>,
}

impl Program {
  pub fn iter(&self) -> std::slice::Iter<'_, AstNode> {
    self.stmts.iter()
  }

  pub fn len(&self) -> usize {
    self.stmts.len()
  }

  pub fn is_empty(&self) -> bool {
    self.stmts.is_empty()
  }
}

impl<'a> IntoIterator for &'a Program {
  type Item = &'a AstNode;
  type IntoIter = std::slice::Iter<'a, AstNode>;

  fn into_iter(self) -> Self::IntoIter {
    self.iter()
  }
}

/// One statement per line, each as an S-expression annotated with its type.
impl fmt::Display for Program {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for stmt in &self.stmts {
      writeln!(f, "{stmt}")?;
    }
    Ok(())
  }
}

/// Parse a sequence of statements from the token stream.
pub fn parse(tokens: Vec<Token>, source: &str) -> CompileResult<Program> {
  let mut stream = TokenStream::new(tokens, source);
  let mut stmts = Vec::new();

  while !stream.is_eof() {
    match parse_stmt(&mut stream)? {
      Some(stmt) => stmts.push(stmt),
      None => {
        let got = stream.describe_current();
        return Err(stream.error_here(format!("expected an expression, but got \"{got}\"")));
      }
    }
  }

  debug!(statements = stmts.len(), "parsed program");
  Ok(Program { stmts })
}

fn parse_stmt(stream: &mut TokenStream) -> CompileResult<Option<AstNode>> {
  let Some(expr) = parse_expr(stream)? else {
    return Ok(None);
  };
  stream.skip(TokenKind::Semicolon)?;
  Ok(Some(expr.node))
}

fn parse_expr(stream: &mut TokenStream) -> CompileResult<Option<Parsed>> {
  let mark = stream.snapshot();
  let Some(mut node) = parse_term(stream)? else {
    stream.restore(mark);
    return Ok(None);
  };

  loop {
    let op = if stream.equal(TokenKind::Plus) {
      BinaryOp::Add
    } else if stream.equal(TokenKind::Minus) {
      BinaryOp::Sub
    } else {
      break;
    };

    let rhs = parse_term(stream)?.ok_or_else(|| stream.missing_operand(op))?;
    node = stream.fold(op, node, rhs)?;
  }

  Ok(Some(node))
}

fn parse_term(stream: &mut TokenStream) -> CompileResult<Option<Parsed>> {
  let mark = stream.snapshot();
  let Some(mut node) = parse_factor(stream)? else {
    stream.restore(mark);
    return Ok(None);
  };

  loop {
    let op = if stream.equal(TokenKind::Star) {
      BinaryOp::Mul
    } else if stream.equal(TokenKind::Slash) {
      BinaryOp::Div
    } else {
      break;
    };

    let rhs = parse_factor(stream)?.ok_or_else(|| stream.missing_operand(op))?;
    node = stream.fold(op, node, rhs)?;
  }

  Ok(Some(node))
}

fn parse_factor(stream: &mut TokenStream) -> CompileResult<Option<Parsed>> {
  if let Some(node) = parse_parenthesized(stream)? {
    return Ok(Some(node));
  }
  parse_literal(stream)
}

fn parse_parenthesized(stream: &mut TokenStream) -> CompileResult<Option<Parsed>> {
  let mark = stream.snapshot();
  if !stream.equal(TokenKind::LParen) {
    return Ok(None);
  }

  stream.paren_depth += 1;
  if stream.paren_depth > MAX_PAREN_DEPTH {
    return Err(stream.error_here(format!(
      "expression nested too deeply (more than {MAX_PAREN_DEPTH} parentheses)"
    )));
  }
  let inner = parse_expr(stream)?;
  stream.paren_depth -= 1;

  let Some(node) = inner else {
    stream.restore(mark);
    return Ok(None);
  };

  // An expression after '(' commits us to this production.
  stream.skip(TokenKind::RParen)?;
  Ok(Some(node))
}

/// A numeric literal with an optional leading minus folded into its value.
fn parse_literal(stream: &mut TokenStream) -> CompileResult<Option<Parsed>> {
  let mark = stream.snapshot();
  let negate = stream.equal(TokenKind::Minus);

  let node = match stream.peek().map(|token| token.kind) {
    Some(TokenKind::Integer(value)) => AstNode::long(if negate { -value } else { value }),
    Some(TokenKind::Float(value)) => AstNode::double(if negate { -value } else { value }),
    _ => {
      stream.restore(mark);
      return Ok(None);
    }
  };

  stream.advance();
  Ok(Some(Parsed { node, height: 0 }))
}

/// A subtree together with its height, so folds can be bounded without
/// walking the tree again.
struct Parsed {
  node: AstNode,
  height: usize,
}

/// Lightweight cursor over the token vector.
struct TokenStream<'a> {
  tokens: Vec<Token>,
  source: &'a str,
  pos: usize,
  paren_depth: usize,
}

impl<'a> TokenStream<'a> {
  fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self {
      tokens,
      source,
      pos: 0,
      paren_depth: 0,
    }
  }

  /// Combine two operands into a binary node, rejecting trees that grow too tall.
  fn fold(&self, op: BinaryOp, lhs: Parsed, rhs: Parsed) -> CompileResult<Parsed> {
    let height = lhs.height.max(rhs.height) + 1;
    if height > MAX_TREE_HEIGHT {
      return Err(self.error_here(format!(
        "expression nested too deeply (more than {MAX_TREE_HEIGHT} operators)"
      )));
    }
    Ok(Parsed {
      node: AstNode::binary(op, lhs.node, rhs.node),
      height,
    })
  }

  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  fn advance(&mut self) {
    if self.pos < self.tokens.len() {
      self.pos += 1;
    }
  }

  fn snapshot(&self) -> usize {
    self.pos
  }

  fn restore(&mut self, mark: usize) {
    self.pos = mark;
  }

  /// Consume the current token if it is the given punctuator.
  fn equal(&mut self, kind: TokenKind) -> bool {
    if self.peek().is_some_and(|token| token.kind == kind) {
      self.pos += 1;
      return true;
    }
    false
  }

  fn skip(&mut self, kind: TokenKind) -> CompileResult<()> {
    if self.equal(kind) {
      return Ok(());
    }
    let got = self.describe_current();
    Err(self.error_here(format!("expected \"{kind}\", but got \"{got}\"")))
  }

  fn missing_operand(&self, op: BinaryOp) -> CompileError {
    let got = self.describe_current();
    self.error_here(format!(
      "expected an operand after \"{}\", but got \"{got}\"",
      op.symbol()
    ))
  }

  fn describe_current(&self) -> String {
    self
      .peek()
      .map_or_else(|| "EOF".to_string(), |token| token.to_string())
  }

  fn error_here(&self, message: String) -> CompileError {
    let loc = self.peek().map_or(self.source.len(), |token| token.loc);
    CompileError::syntax(self.source, loc, message)
  }

  fn is_eof(&self) -> bool {
    self.peek().is_some_and(Token::is_eof)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tokenizer::tokenize;

  fn parse_str(source: &str) -> CompileResult<Program> {
    parse(tokenize(source)?, source)
  }

  fn single(source: &str) -> AstNode {
    let program = parse_str(source).expect("parse");
    assert_eq!(program.len(), 1, "expected one statement in {source:?}");
    program.stmts.into_iter().next().expect("statement")
  }

  #[test]
  fn multiplication_binds_tighter() {
    assert_eq!(
      single("1+2*3;"),
      AstNode::binary(
        BinaryOp::Add,
        AstNode::long(1),
        AstNode::binary(BinaryOp::Mul, AstNode::long(2), AstNode::long(3)),
      )
    );
  }

  #[test]
  fn operators_fold_left() {
    assert_eq!(
      single("1+2+3;"),
      AstNode::binary(
        BinaryOp::Add,
        AstNode::binary(BinaryOp::Add, AstNode::long(1), AstNode::long(2)),
        AstNode::long(3),
      )
    );
    assert_eq!(single("8/4/2;").to_string(), "(/:long (/:long 8 4) 2)");
    assert_eq!(single("8-4-2;").to_string(), "(-:long (-:long 8 4) 2)");
  }

  #[test]
  fn parentheses_override_precedence() {
    assert_eq!(single("(1+2)*3;").to_string(), "(*:long (+:long 1 2) 3)");
    assert_eq!(
      single("(0+0)*0+0-0;").to_string(),
      "(-:long (+:long (*:long (+:long 0 0) 0) 0) 0)"
    );
    assert_eq!(single("((7));"), AstNode::long(7));
  }

  #[test]
  fn minus_folds_into_literal() {
    assert_eq!(single("-1;"), AstNode::long(-1));
    assert_eq!(single("-2.5;"), AstNode::double(-2.5));
    assert_eq!(single("1--1;").to_string(), "(-:long 1 -1)");
  }

  #[test]
  fn minus_before_parenthesis_is_rejected() {
    let err = parse_str("-(1);").unwrap_err();
    assert!(err.is_syntax());
    assert_eq!(err.offset(), Some(0));
  }

  #[test]
  fn types_are_promoted() {
    assert_eq!(single("1+2.5;").ty(), Type::Double);
    assert_eq!(single("1+2;").ty(), Type::Long);
    assert_eq!(single("(1*2)-(3/0.5);").to_string(), "(-:double (*:long 1 2) (/:double 3 0.5))");
  }

  #[test]
  fn statements_keep_source_order() {
    let program = parse_str("1; 2.0; 3+4;").expect("parse");
    assert_eq!(program.to_string(), "1\n2.0\n(+:long 3 4)\n");
  }

  #[test]
  fn empty_program_is_allowed() {
    assert!(parse_str("").expect("parse").is_empty());
  }

  #[test]
  fn unmatched_paren_is_syntax_error() {
    let err = parse_str("(0+0").unwrap_err();
    assert!(err.is_syntax());
    assert_eq!(err.offset(), Some(4));
    assert!(err.message().unwrap().contains("\")\""));
  }

  #[test]
  fn missing_semicolon_is_syntax_error() {
    let err = parse_str("1+2").unwrap_err();
    assert!(err.is_syntax());
    assert_eq!(err.message(), Some("expected \";\", but got \"EOF\""));
  }

  #[test]
  fn dangling_operator_is_fatal() {
    let err = parse_str("1+;").unwrap_err();
    assert_eq!(
      err.message(),
      Some("expected an operand after \"+\", but got \";\"")
    );
    assert_eq!(err.offset(), Some(2));

    let err = parse_str("2*(;").unwrap_err();
    assert!(err.message().unwrap().starts_with("expected an operand after \"*\""));
  }

  #[test]
  fn stray_token_cannot_start_statement() {
    let err = parse_str("1; );").unwrap_err();
    assert_eq!(err.message(), Some("expected an expression, but got \")\""));
    assert_eq!(err.offset(), Some(3));
  }

  #[test]
  fn missing_eof_does_not_hang() {
    let tokens = vec![Token::new(TokenKind::Integer(1), 0, 1)];
    let err = parse(tokens, "1").unwrap_err();
    assert!(err.is_syntax());
  }

  #[test]
  fn spill_depth_grows_with_left_nesting() {
    // The right operand is evaluated first, so a left-leaning chain keeps
    // every intermediate right operand spilled.
    assert_eq!(single("1;").spill_depth(), 0);
    assert_eq!(single("1+2;").spill_depth(), 1);
    assert_eq!(single("1+2+3+4;").spill_depth(), 3);
    assert_eq!(single("1+(2+(3+4));").spill_depth(), 1);
  }

  #[test]
  fn deep_parentheses_are_rejected() {
    let err = parse_str(&"(".repeat(10_000)).unwrap_err();
    assert!(err.is_syntax());
    assert!(err.message().unwrap().contains("nested too deeply"));
    assert_eq!(err.offset(), Some(MAX_PAREN_DEPTH + 1));

    let depth = MAX_PAREN_DEPTH;
    let source = format!("{}1{};", "(".repeat(depth), ")".repeat(depth));
    assert_eq!(single(&source), AstNode::long(1));
  }

  #[test]
  fn long_operator_chains_are_rejected() {
    let within = format!("{}1;", "1+".repeat(MAX_TREE_HEIGHT));
    assert!(parse_str(&within).is_ok());

    let beyond = format!("{}1;", "1+".repeat(200_000));
    let err = parse_str(&beyond).unwrap_err();
    assert!(err.is_syntax());
    assert!(err.message().unwrap().contains("nested too deeply"));
  }

  #[test]
  fn parsing_is_deterministic() {
    let source = "(1 + 2.5) * -3 / 4; 7 - 1;";
    assert_eq!(parse_str(source).unwrap(), parse_str(source).unwrap());
  }
}
