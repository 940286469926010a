use std::fs;
use std::path::PathBuf;

use numcc::{CompileError, Emit, compile_file};

fn scratch_dir(name: &str) -> PathBuf {
  let dir = std::env::temp_dir().join(format!("numcc-{}-{name}", std::process::id()));
  fs::create_dir_all(&dir).expect("create scratch dir");
  dir
}

#[test]
fn writes_assembly_for_valid_source() {
  let dir = scratch_dir("valid");
  let input = dir.join("prog.txt");
  let output = dir.join("prog.s");
  fs::write(&input, "1 + 2;\n3.0 / 2;\n").unwrap();

  compile_file(&input, &output, Emit::Asm).expect("compile ok");
  let asm = fs::read_to_string(&output).unwrap();
  assert!(asm.contains("main:"));
  assert_eq!(asm.matches("call printf@PLT").count(), 2);
  fs::remove_dir_all(dir).ok();
}

#[test]
fn leaves_output_untouched_on_error() {
  let dir = scratch_dir("invalid");
  let input = dir.join("bad.txt");
  let output = dir.join("bad.s");
  fs::write(&input, "1 + ;").unwrap();

  let err = compile_file(&input, &output, Emit::Asm).unwrap_err();
  assert!(err.is_syntax());
  assert!(!output.exists());
  fs::remove_dir_all(dir).ok();
}

#[test]
fn missing_input_is_a_read_error() {
  let dir = scratch_dir("missing");
  let err = compile_file(&dir.join("nope.txt"), &dir.join("out.s"), Emit::Asm).unwrap_err();
  assert!(matches!(err, CompileError::ReadSource { .. }));
  assert_eq!(err.offset(), None);
  fs::remove_dir_all(dir).ok();
}

#[test]
fn emits_ast_dump() {
  let dir = scratch_dir("ast");
  let input = dir.join("prog.txt");
  let output = dir.join("prog.ast");
  fs::write(&input, "1+2*3;").unwrap();

  compile_file(&input, &output, Emit::Ast).expect("compile ok");
  assert_eq!(fs::read_to_string(&output).unwrap(), "(+:long 1 (*:long 2 3))\n");
  fs::remove_dir_all(dir).ok();
}
