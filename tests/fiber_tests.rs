use std::cell::RefCell;

use wrenvm::{Configuration, ErrorKind, InterpretResult, Value, Vm};

thread_local! {
    static OUTPUT: RefCell<String> = const { RefCell::new(String::new()) };
    static ERRORS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

fn capture_output(text: &str) {
    OUTPUT.with(|o| o.borrow_mut().push_str(text));
}

fn capture_error(kind: ErrorKind, module: &str, line: usize, message: &str) {
    ERRORS.with(|e| {
        e.borrow_mut()
            .push(format!("{:?} {} {} {}", kind, module, line, message))
    });
}

fn run(source: &str) -> (InterpretResult, String, Vec<String>) {
    OUTPUT.with(|o| o.borrow_mut().clear());
    ERRORS.with(|e| e.borrow_mut().clear());
    let mut vm = Vm::new(Configuration {
        write_fn: Some(capture_output),
        error_fn: Some(capture_error),
        ..Default::default()
    })
    .unwrap();
    let result = vm.interpret("main", source);
    (
        result,
        OUTPUT.with(|o| o.borrow().clone()),
        ERRORS.with(|e| e.borrow().clone()),
    )
}

#[test]
fn test_yield_returns_to_caller() {
    let source = r#"
var fiber = Fiber.new {
  System.print("in fiber")
  Fiber.yield()
  System.print("resumed")
}
System.print("before")
fiber.call()
System.print("between")
fiber.call()
System.print("after")
"#;
    let (result, output, _) = run(source);
    assert_eq!(result, InterpretResult::Success);
    assert_eq!(output, "before\nin fiber\nbetween\nresumed\nafter\n");
}

#[test]
fn test_each_fiber_keeps_its_own_stack() {
    let source = r#"
var counter = Fn.new {|name|
  var i = 0
  while (true) {
    i = i + 1
    Fiber.yield(name + i.toString)
  }
}
var a = Fiber.new { counter.call("a") }
var b = Fiber.new { counter.call("b") }
System.print(a.call())
System.print(b.call())
System.print(a.call())
System.print(a.call())
System.print(b.call())
"#;
    let (result, output, _) = run(source);
    assert_eq!(result, InterpretResult::Success);
    assert_eq!(output, "a1\nb1\na2\na3\nb2\n");
}

#[test]
fn test_transfer_does_not_return_to_caller() {
    let source = r#"
var main = Fiber.current
var worker = Fiber.new {
  System.print("worker")
  main.transfer("back")
  System.print("never")
}
var value = worker.transfer()
System.print(value)
"#;
    let (result, output, _) = run(source);
    assert_eq!(result, InterpretResult::Success);
    assert_eq!(output, "worker\nback\n");
}

#[test]
fn test_calling_a_running_fiber_is_an_error() {
    let source = r#"
var main = Fiber.current
var inner = Fiber.new { main.call() }
var error = inner.try()
System.print(error)
"#;
    let (result, output, _) = run(source);
    assert_eq!(result, InterpretResult::Success);
    assert_eq!(output, "Fiber has already been called.\n");
}

#[test]
fn test_try_catches_nested_errors() {
    let source = r#"
var deep = Fiber.new {
  var inner = Fiber.new { Fiber.abort("deep failure") }
  inner.call()
  System.print("unreachable")
}
System.print(deep.try())
System.print(deep.isDone)
"#;
    let (result, output, _) = run(source);
    assert_eq!(result, InterpretResult::Success);
    assert_eq!(output, "deep failure\ntrue\n");
}

#[test]
fn test_error_object_can_be_any_value() {
    let (result, output, _) = run("var f = Fiber.new { Fiber.abort(42) }\nSystem.print(f.try() + 1)");
    assert_eq!(result, InterpretResult::Success);
    assert_eq!(output, "43\n");
}

#[test]
fn test_abort_with_null_does_nothing() {
    let (result, output, _) = run("Fiber.abort(null)\nSystem.print(\"fine\")");
    assert_eq!(result, InterpretResult::Success);
    assert_eq!(output, "fine\n");
}

#[test]
fn test_uncaught_error_reports_stack_trace() {
    let source = "class A {\n  static go() {\n    Fiber.abort(\"bad\")\n  }\n}\nA.go()";
    let (result, _, errors) = run(source);
    assert_eq!(result, InterpretResult::RuntimeError);
    assert_eq!(
        errors,
        vec![
            "Runtime main 3 bad".to_string(),
            "StackTrace main 3 A.go()".to_string(),
            "StackTrace main 6 (script)".to_string(),
        ]
    );
}

#[test]
fn test_error_in_called_fiber_fails_the_caller() {
    let source = "var f = Fiber.new { null.boom }\nf.call()\nSystem.print(\"not reached\")";
    let (result, output, errors) = run(source);
    assert_eq!(result, InterpretResult::RuntimeError);
    assert!(output.is_empty());
    assert_eq!(errors[0], "Runtime main 1 Null does not implement 'boom'.");
}

#[test]
fn test_yield_from_root_ends_interpret() {
    let source = "System.print(\"start\")\nFiber.yield()\nSystem.print(\"never\")";
    let (result, output, _) = run(source);
    assert_eq!(result, InterpretResult::Success);
    assert_eq!(output, "start\n");
}

#[test]
fn test_suspend_stops_execution() {
    let (result, output, _) = run("System.print(1)\nFiber.suspend()\nSystem.print(2)");
    assert_eq!(result, InterpretResult::Success);
    assert_eq!(output, "1\n");
}

#[test]
fn test_deep_recursion_overflows() {
    let source = "class R {\n  static down(n) { down(n + 1) }\n}\nvar f = Fiber.new { R.down(0) }\nSystem.print(f.try())";
    let (result, output, _) = run(source);
    assert_eq!(result, InterpretResult::Success);
    assert_eq!(output, "Stack overflow.\n");
}

#[test]
fn test_fiber_result_is_stored_in_module() {
    let mut vm = Vm::new(Configuration::default()).unwrap();
    assert_eq!(
        vm.interpret("main", "var f = Fiber.new {|x| x * 2 }\nvar r = f.call(21)"),
        InterpretResult::Success
    );
    assert_eq!(vm.get_variable("r"), Some(Value::Num(42.0)));
}
