//! Code generation: lower the typed AST into AT&T x86-64 assembly.
//!
//! Every expression leaves its value in `%rax` (long) or `%xmm0` (double).
//! A binary node evaluates its right operand first and spills it to a stack
//! slot addressed relative to `%rbp`, then evaluates the left operand into
//! the result register and combines the two. The deepest spill seen sizes the
//! frame, so the prologue can only be written once the body is done: the body
//! is emitted into its own buffer and the header is composed afterwards.

use tracing::{debug, trace};

use crate::buffer::CodeBuffer;
use crate::parser::{AstNode, BinaryOp, Program, Value};
use crate::ty::Type;

pub const LONG_FORMAT_LABEL: &str = ".Lfmt_long";
pub const DOUBLE_FORMAT_LABEL: &str = ".Lfmt_double";

/// printf formats, already escaped for a `.string` directive.
const LONG_FORMAT: &str = r#""%ld\n""#;
const DOUBLE_FORMAT: &str = r#""%f\n""#;

const SLOT_SIZE: usize = 8;
const STACK_ALIGN: usize = 16;

/// Emit assembly for a whole program.
pub fn generate(program: &Program) -> String {
  let mut env = CodegenEnv::new();
  env.emit_program(program);
  let frame_size = env.frame_size();
  let output = env.finish();
  debug!(
    statements = program.len(),
    frame_size,
    bytes = output.len(),
    "generated assembly"
  );
  output
}

/// Mutable state for one compilation. Never shared between compilations.
#[derive(Debug, Default)]
pub struct CodegenEnv {
  header: CodeBuffer,
  body: CodeBuffer,
  stack_slot: usize,
  high_water: usize,
  label_counter: usize,
}

impl CodegenEnv {
  pub fn new() -> Self {
    Self::default()
  }

  /// Maximum number of spill slots live at once so far.
  pub fn high_water_mark(&self) -> usize {
    self.high_water
  }

  /// Bytes reserved below `%rbp`, rounded up to keep calls 16-byte aligned.
  pub fn frame_size(&self) -> usize {
    (self.high_water * SLOT_SIZE).next_multiple_of(STACK_ALIGN)
  }

  pub fn emit_program(&mut self, program: &Program) {
    for (index, stmt) in program.iter().enumerate() {
      trace!(index, ty = %stmt.ty(), "emitting statement");
      self.emit_expr(stmt);
      self.emit_print(stmt.ty());
    }
    self.emit_epilogue();
  }

  /// Compose the header now that the frame size is known and concatenate.
  pub fn finish(mut self) -> String {
    self.emit_header();
    let mut output = self.header;
    output.append(self.body);
    output.into_string()
  }

  fn emit_expr(&mut self, node: &AstNode) {
    match node {
      AstNode::Literal {
        value: Value::Long(value),
      } => self.load_long(*value),
      AstNode::Literal {
        value: Value::Double(value),
      } => {
        let label = self.double_constant(*value);
        self.body.insn(format!("movsd {label}(%rip), %xmm0"));
      }
      AstNode::Binary { op, ty, lhs, rhs } => {
        self.emit_expr(rhs);
        let offset = self.push_slot(rhs.ty());
        self.emit_expr(lhs);
        match ty {
          Type::Long => self.emit_long_op(*op, offset),
          Type::Double => self.emit_double_op(*op, lhs.ty(), rhs.ty(), offset),
        }
        self.pop_slot();
      }
    }
  }

  fn load_long(&mut self, value: i64) {
    if i32::try_from(value).is_ok() {
      self.body.insn(format!("mov ${value}, %rax"));
    } else {
      self.body.insn(format!("movabs ${value}, %rax"));
    }
  }

  /// Place `value` in the data section under a fresh label.
  fn double_constant(&mut self, value: f64) -> String {
    let label = format!(".LC{}", self.label_counter);
    self.label_counter += 1;
    self.body.insn(".data");
    self.body.insn(".balign 8");
    self.body.label(&label);
    self.body.insn(format!(".quad {:#018x}", value.to_bits()));
    self.body.insn(".text");
    label
  }

  /// Spill the current result to a new slot; returns its offset below `%rbp`.
  fn push_slot(&mut self, ty: Type) -> usize {
    self.stack_slot += 1;
    self.high_water = self.high_water.max(self.stack_slot);
    let offset = self.stack_slot * SLOT_SIZE;
    trace!(slot = self.stack_slot, %ty, "spill");
    match ty {
      Type::Long => self.body.insn(format!("mov %rax, -{offset}(%rbp)")),
      Type::Double => self.body.insn(format!("movsd %xmm0, -{offset}(%rbp)")),
    }
    offset
  }

  fn pop_slot(&mut self) {
    self.stack_slot -= 1;
  }

  /// Both operands are long: lhs in `%rax`, rhs spilled at `offset`.
  fn emit_long_op(&mut self, op: BinaryOp, offset: usize) {
    self.body.insn(format!("mov -{offset}(%rbp), %rdi"));
    match op {
      BinaryOp::Add => self.body.insn("add %rdi, %rax"),
      BinaryOp::Sub => self.body.insn("sub %rdi, %rax"),
      BinaryOp::Mul => self.body.insn("imul %rdi, %rax"),
      BinaryOp::Div => {
        self.body.insn("cqo");
        self.body.insn("idiv %rdi");
      }
    }
  }

  /// At least one operand is double; promote whichever side is long.
  fn emit_double_op(&mut self, op: BinaryOp, lhs: Type, rhs: Type, offset: usize) {
    if lhs == Type::Long {
      self.body.insn("cvtsi2sd %rax, %xmm0");
    }
    match rhs {
      Type::Long => self.body.insn(format!("cvtsi2sdq -{offset}(%rbp), %xmm1")),
      Type::Double => self.body.insn(format!("movsd -{offset}(%rbp), %xmm1")),
    }
    let mnemonic = match op {
      BinaryOp::Add => "addsd",
      BinaryOp::Sub => "subsd",
      BinaryOp::Mul => "mulsd",
      BinaryOp::Div => "divsd",
    };
    self.body.insn(format!("{mnemonic} %xmm1, %xmm0"));
  }

  fn emit_print(&mut self, ty: Type) {
    match ty {
      Type::Long => {
        self.body.insn("mov %rax, %rsi");
        self.body.insn(format!("lea {LONG_FORMAT_LABEL}(%rip), %rdi"));
        self.body.insn("mov $0, %eax");
      }
      Type::Double => {
        self.body.insn(format!("lea {DOUBLE_FORMAT_LABEL}(%rip), %rdi"));
        self.body.insn("mov $1, %eax");
      }
    }
    self.body.insn("call printf@PLT");
  }

  fn emit_epilogue(&mut self) {
    self.body.insn("mov $0, %eax");
    self.body.insn("mov %rbp, %rsp");
    self.body.insn("pop %rbp");
    self.body.insn("ret");
    self.body.insn(r#".section .note.GNU-stack,"",@progbits"#);
  }

  fn emit_header(&mut self) {
    let frame_size = self.frame_size();
    let header = &mut self.header;
    header.insn(".data");
    header.label(LONG_FORMAT_LABEL);
    header.insn(format!(".string {LONG_FORMAT}"));
    header.label(DOUBLE_FORMAT_LABEL);
    header.insn(format!(".string {DOUBLE_FORMAT}"));
    header.insn(".text");
    header.insn(".globl main");
    header.label("main");
    header.insn("push %rbp");
    header.insn("mov %rsp, %rbp");
    if frame_size > 0 {
      header.insn(format!("sub ${frame_size}, %rsp"));
    }
  }
}
