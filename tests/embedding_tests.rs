//! Host-facing API: foreign methods, output and error callbacks.

use std::cell::RefCell;

use wrenvm::{Configuration, ContractViolation, ErrorKind, InterpretResult, Value, Vm, VmError};

thread_local! {
    static OUTPUT: RefCell<String> = const { RefCell::new(String::new()) };
    static ERRORS: RefCell<Vec<(ErrorKind, String, usize, String)>> = const { RefCell::new(Vec::new()) };
}

fn capture_output(text: &str) {
    OUTPUT.with(|o| o.borrow_mut().push_str(text));
}

fn capture_error(kind: ErrorKind, module: &str, line: usize, message: &str) {
    ERRORS.with(|e| {
        e.borrow_mut()
            .push((kind, module.to_string(), line, message.to_string()))
    });
}

fn vm() -> Vm {
    OUTPUT.with(|o| o.borrow_mut().clear());
    ERRORS.with(|e| e.borrow_mut().clear());
    Vm::new(Configuration {
        write_fn: Some(capture_output),
        error_fn: Some(capture_error),
        ..Default::default()
    })
    .unwrap()
}

fn output() -> String {
    OUTPUT.with(|o| o.borrow().clone())
}

fn errors() -> Vec<(ErrorKind, String, usize, String)> {
    ERRORS.with(|e| e.borrow().clone())
}

// ============================================================================
// Host functions
// ============================================================================

fn vec_length(vm: &mut Vm) {
    let x = vm.get_argument_double(1);
    let y = vm.get_argument_double(2);
    vm.return_double((x * x + y * y).sqrt());
}

fn describe(vm: &mut Vm) {
    let name = vm.get_argument_string(1).unwrap_or_default();
    let loud = vm.get_argument_bool(2);
    let text = if loud { name.to_uppercase() } else { name };
    vm.return_string(&text);
}

fn square_index(vm: &mut Vm) {
    let n = vm.get_argument_double(1);
    vm.return_double(n * n);
}

fn reenter(vm: &mut Vm) {
    let result = vm.interpret("inner", "1 + 1");
    vm.return_bool(result == InterpretResult::Success);
}

fn slot_count(vm: &mut Vm) {
    let count = vm.slot_count();
    vm.return_double(count as f64);
}

fn is_zero(vm: &mut Vm) {
    let receiver = vm.get_argument_double(0);
    vm.return_bool(receiver == 0.0);
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_static_foreign_method() {
    let mut vm = vm();
    vm.define_static_method("Geometry", "length", 2, vec_length).unwrap();
    assert_eq!(
        vm.interpret("main", "System.print(Geometry.length(3, 4))"),
        InterpretResult::Success
    );
    assert_eq!(output(), "5\n");
}

#[test]
fn test_string_and_bool_arguments() {
    let mut vm = vm();
    vm.define_static_method("Text", "describe", 2, describe).unwrap();
    let source = "System.print(Text.describe(\"wren\", true))\nSystem.print(Text.describe(\"wren\", false))";
    assert_eq!(vm.interpret("main", source), InterpretResult::Success);
    assert_eq!(output(), "WREN\nwren\n");
}

#[test]
fn test_explicit_signature_is_used_verbatim() {
    let mut vm = vm();
    vm.define_static_method("Squares", "[_]", 1, square_index).unwrap();
    assert_eq!(vm.interpret("main", "var r = Squares[7]"), InterpretResult::Success);
    assert_eq!(vm.get_variable("r"), Some(Value::Num(49.0)));
}

#[test]
fn test_instance_method_on_host_class_is_inherited() {
    let mut vm = vm();
    vm.define_method("Shape", "size", 0, slot_count).unwrap();
    let source = r#"
class Square is Shape {
  construct new() {}
}
System.print(Square.new().size)
System.print(Square.new() is Shape)
"#;
    assert_eq!(vm.interpret("main", source), InterpretResult::Success);
    assert_eq!(output(), "1\ntrue\n");
}

#[test]
fn test_receiver_is_slot_zero() {
    let mut vm = vm();
    vm.define_method("Num", "isZero", 0, is_zero).unwrap();
    assert_eq!(
        vm.interpret("main", "var a = 0.isZero\nvar b = 5.isZero"),
        InterpretResult::Success
    );
    assert_eq!(vm.get_variable("a"), Some(Value::Bool(true)));
    assert_eq!(vm.get_variable("b"), Some(Value::Bool(false)));
}

#[test]
fn test_define_on_non_class_fails() {
    let mut vm = vm();
    assert_eq!(vm.interpret("main", "var Config = 3"), InterpretResult::Success);
    let err = vm.define_static_method("Config", "load", 0, slot_count).unwrap_err();
    assert_eq!(err, VmError::Host("'Config' is not a class.".to_string()));
}

#[test]
fn test_reentrant_interpret_is_a_violation() {
    let mut vm = vm();
    vm.define_static_method("Host", "reenter", 0, reenter).unwrap();
    let source = "var f = Fiber.new { Host.reenter }\nvar e = f.try()";
    assert_eq!(vm.interpret("main", source), InterpretResult::RuntimeError);
    assert_eq!(vm.last_contract_violation(), Some(&ContractViolation::Reentrant));
    let (kind, _, _, message) = &errors()[0];
    assert_eq!(*kind, ErrorKind::Runtime);
    assert!(message.contains("cannot be re-entered"), "{}", message);
}

#[test]
fn test_vm_usable_after_runtime_error() {
    let mut vm = vm();
    assert_eq!(vm.interpret("main", "null.nope"), InterpretResult::RuntimeError);
    assert_eq!(vm.interpret("main", "System.print(\"again\")"), InterpretResult::Success);
    assert_eq!(output(), "again\n");
}

#[test]
fn test_module_variables_persist_between_calls() {
    let mut vm = vm();
    assert_eq!(vm.interpret("main", "var counter = 1"), InterpretResult::Success);
    assert_eq!(vm.interpret("main", "counter = counter + 1"), InterpretResult::Success);
    assert_eq!(vm.get_variable("counter"), Some(Value::Num(2.0)));
}

#[test]
fn test_compile_error_goes_to_error_fn() {
    let mut vm = vm();
    assert_eq!(
        vm.interpret("script", "System.print(1)\nvar 3 = x"),
        InterpretResult::CompileError
    );
    assert!(output().is_empty());
    let errors = errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, ErrorKind::Compile);
    assert_eq!(errors[0].1, "script");
    assert_eq!(errors[0].2, 2);
    assert!(vm.last_error().unwrap().starts_with("[script line 2]"));
}

#[test]
fn test_undefined_variable_is_compile_error() {
    let mut vm = vm();
    assert_eq!(vm.interpret("main", "System.print(missing)"), InterpretResult::CompileError);
    assert!(errors()[0].3.contains("missing"));
}

#[test]
fn test_output_without_write_fn_is_discarded() {
    let mut vm = Vm::new(Configuration::default()).unwrap();
    assert_eq!(vm.interpret("main", "System.print(\"quiet\")"), InterpretResult::Success);
}

#[test]
fn test_print_uses_to_string() {
    let mut vm = vm();
    let source = r#"
class Point {
  construct new(x, y) {
    _x = x
    _y = y
  }
  toString { "(" + _x.toString + ", " + _y.toString + ")" }
}
System.print(Point.new(1, 2))
System.print([Point.new(1, 2)])
class Bad {
  construct new() {}
  toString { 3 }
}
System.print(Bad.new())
"#;
    assert_eq!(vm.interpret("main", source), InterpretResult::Success);
    assert_eq!(output(), "(1, 2)\n[instance of Point]\n[invalid toString]\n");
}

fn answer_one(vm: &mut Vm) {
    vm.return_double(1.0);
}

fn answer_two(vm: &mut Vm) {
    vm.return_double(2.0);
}

#[test]
fn test_redefining_a_method_replaces_it() {
    let mut vm = vm();
    vm.define_static_method("Answer", "get", 0, answer_one).unwrap();
    vm.define_static_method("Answer", "get", 0, answer_two).unwrap();
    assert_eq!(vm.interpret("main", "var r = Answer.get"), InterpretResult::Success);
    assert_eq!(vm.get_variable("r"), Some(Value::Num(2.0)));
}

#[test]
fn test_empty_module_name_has_no_attribution() {
    let mut vm = vm();
    assert_eq!(vm.interpret("", "var x = (1"), InterpretResult::CompileError);
    assert!(!vm.last_error().unwrap().starts_with('['));

    let source = "class A {\n  static go() { null.nope }\n}\nA.go()";
    assert_eq!(vm.interpret("", source), InterpretResult::RuntimeError);
    let errors = errors();
    let last = errors.last().unwrap();
    assert_eq!(last.0, ErrorKind::Runtime);
    assert_eq!(last.1, "");
    assert_eq!(last.3, "Null does not implement 'nope'.");
}

fn forty_two(vm: &mut Vm) {
    vm.return_double(42.0);
}

#[test]
fn test_arity_zero_binds_a_getter() {
    let mut vm = vm();
    vm.define_static_method("Host", "value", 0, forty_two).unwrap();
    vm.define_static_method("Host", "now()", 0, answer_one).unwrap();
    assert_eq!(
        vm.interpret("main", "var v = Host.value\nvar c = Host.now()"),
        InterpretResult::Success
    );
    assert_eq!(vm.get_variable("v"), Some(Value::Num(42.0)));
    assert_eq!(vm.get_variable("c"), Some(Value::Num(1.0)));
}

#[test]
fn test_compile_error_allocates_nothing() {
    let mut vm = vm();
    vm.collect_garbage();
    let bytes = vm.bytes_allocated();
    let objects = vm.object_count();
    assert_eq!(
        vm.interpret("main", "var list = [1, 2]\nvar s = \"text\"\nclass {"),
        InterpretResult::CompileError
    );
    assert_eq!(vm.bytes_allocated(), bytes);
    assert_eq!(vm.object_count(), objects);
    assert_eq!(vm.get_variable("list"), None);
}
