use std::ffi::{CString, c_int};
use std::time::Instant;

use serde::Serialize;

use crate::compiler::{self, Constant, FnProto};
use crate::config::{Configuration, ErrorKind};
use crate::ffi::types::{CHooks, WrenVM};

use super::Value;
use super::builtins::{self, CoreClasses};
use super::class::{ForeignMethod, ForeignMethodFn, Method, ObjClass, SymbolTable, call_signature};
use super::error::{ContractViolation, VmError};
use super::fiber::{FiberState, ObjFiber, RunSource};
use super::foreign::ForeignCall;
use super::format::num_to_string;
use super::heap::{CollectStats, GcRef, Heap};
use super::module::Module;
use super::object::{ObjClosure, ObjFn, ObjInstance, ObjList, ObjMap, ObjRange, ObjString, Object, ObjectType};

/// Source of the core library classes written in script.
const CORE_SOURCE: &str = include_str!("core.wren");

/// Name of the module the core library runs in. Its frames are left out of
/// stack traces.
pub(crate) const CORE_MODULE: &str = "core";

/// How deep `toString` of nested collections goes before eliding.
const MAX_STRINGIFY_DEPTH: usize = 16;

/// Result of [`Vm::interpret`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretResult {
    Success,
    CompileError,
    RuntimeError,
}

/// GC statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GcStats {
    pub cycles: usize,
    pub total_pause_us: u64,
    pub max_pause_us: u64,
    pub bytes_freed: usize,
    pub objects_freed: usize,
}

impl GcStats {
    fn record(&mut self, stats: &CollectStats, pause_us: u64) {
        self.cycles += 1;
        self.total_pause_us += pause_us;
        self.max_pause_us = self.max_pause_us.max(pause_us);
        self.bytes_freed += stats.bytes_freed();
        self.objects_freed += stats.objects_freed;
    }
}

/// The virtual machine.
///
/// A `Vm` is single-threaded. Everything it allocates is owned by its heap
/// and released when it is dropped.
pub struct Vm {
    pub(crate) heap: Heap,
    pub(crate) config: Configuration,
    /// The running fiber; `None` between calls to `interpret`.
    pub(crate) fiber: Option<GcRef>,
    pub(crate) module: Module,
    pub(crate) symbols: SymbolTable,
    pub(crate) classes: CoreClasses,
    /// State of the foreign method currently executing.
    pub(crate) foreign: Option<ForeignCall>,
    pub(crate) last_violation: Option<ContractViolation>,
    /// Preallocated so that reporting out-of-memory never allocates.
    pub(crate) oom_message: GcRef,
    pub(crate) dnu_symbol: usize,
    pub(crate) start_time: Instant,
    /// Output and error callbacks installed through the C API.
    pub(crate) c_hooks: CHooks,
    gc_stats: GcStats,
    last_error: Option<CString>,
}

impl Vm {
    /// Create a VM and load the core library.
    pub fn new(config: Configuration) -> Result<Self, VmError> {
        let config = config.resolved();
        let mut heap = Heap::new(&config);
        let mut module = Module::new();
        let mut symbols = SymbolTable::new();

        let classes = builtins::bootstrap(&mut heap, &mut module, &mut symbols)?;
        let oom_message = heap.allocate(
            Some(classes.string),
            Object::String(ObjString::new(VmError::OutOfMemory.to_string().as_bytes())),
        )?;
        let dnu_symbol = symbols.ensure("doesNotUnderstand(_,_)");

        let mut vm = Self {
            heap,
            config,
            fiber: None,
            module,
            symbols,
            classes,
            foreign: None,
            last_violation: None,
            oom_message,
            dnu_symbol,
            start_time: Instant::now(),
            c_hooks: CHooks::default(),
            gc_stats: GcStats::default(),
            last_error: None,
        };

        match vm.interpret(CORE_MODULE, CORE_SOURCE) {
            InterpretResult::Success => {}
            result => {
                return Err(VmError::Host(format!(
                    "core library failed to load: {:?}",
                    result
                )));
            }
        }
        builtins::bind_system(&mut vm)?;

        log::debug!(
            "vm ready: {} bytes in {} objects, next gc at {}",
            vm.heap.bytes_allocated(),
            vm.heap.object_count(),
            vm.heap.next_gc()
        );
        Ok(vm)
    }

    // ========================================================================
    // Interpretation
    // ========================================================================

    /// Compile `source` as module `module_name` and run it to completion.
    pub fn interpret(&mut self, module_name: &str, source: &str) -> InterpretResult {
        if self.foreign.is_some() || self.fiber.is_some() {
            self.violate(ContractViolation::Reentrant);
            return InterpretResult::RuntimeError;
        }

        let compiled = match compiler::compile(source, &self.module, &mut self.symbols) {
            Ok(compiled) => compiled,
            Err(e) => {
                log::debug!("compile error in {}: {}", module_name, e);
                self.emit_error(ErrorKind::Compile, module_name, e.line as usize, &e.message);
                if module_name.is_empty() {
                    self.set_last_error(&e.message);
                } else {
                    self.set_last_error(&format!("[{} line {}] {}", module_name, e.line, e.message));
                }
                return InterpretResult::CompileError;
            }
        };

        for name in &compiled.new_variables {
            self.module.define(name, Value::Null);
        }

        let fiber = match self.load_module(module_name, &compiled.main) {
            Ok(fiber) => fiber,
            Err(e) => {
                self.report_host_error(module_name, &e);
                return InterpretResult::RuntimeError;
            }
        };

        {
            let f = self.heap.fiber_mut(fiber);
            f.state = FiberState::Running;
            f.run_source = RunSource::Root;
        }
        self.fiber = Some(fiber);
        self.run_interpreter()
    }

    /// Turn a compiled module into a fiber ready to run it.
    fn load_module(&mut self, module_name: &str, main: &FnProto) -> Result<GcRef, VmError> {
        let function = self.materialize(main, module_name)?;
        let closure = self.new_closure(function, 0)?;
        self.new_fiber(closure)
    }

    /// Allocate heap functions for `proto` and everything nested in it.
    fn materialize(&mut self, proto: &FnProto, module_name: &str) -> Result<GcRef, VmError> {
        let base = self.heap.root_count();
        let result = self.materialize_rooted(proto, module_name);
        self.heap.truncate_roots(base);
        result
    }

    fn materialize_rooted(&mut self, proto: &FnProto, module_name: &str) -> Result<GcRef, VmError> {
        let mut constants = Vec::with_capacity(proto.constants.len());
        for constant in &proto.constants {
            let value = match constant {
                Constant::Num(n) => Value::Num(*n),
                Constant::Str(bytes) => Value::Obj(self.new_string_bytes(bytes)?),
                Constant::Fn(nested) => Value::Obj(self.materialize(nested, module_name)?),
            };
            if let Value::Obj(r) = value {
                self.heap.push_root(r);
            }
            constants.push(value);
        }

        let function = ObjFn {
            name: proto.name.clone(),
            module: module_name.to_string(),
            arity: proto.arity,
            code: proto.code.clone(),
            lines: proto.lines.clone(),
            constants,
            upvalues: proto.upvalues.clone(),
            max_slots: proto.max_slots,
            bound_class: None,
            fields_bound: false,
        };
        self.allocate(Some(self.classes.fn_), Object::Fn(function))
    }

    // ========================================================================
    // Host-defined methods
    // ========================================================================

    /// Bind a foreign instance method. See [`Vm::define_static_method`].
    pub fn define_method(
        &mut self,
        class_name: &str,
        method_name: &str,
        arity: usize,
        method: ForeignMethodFn,
    ) -> Result<(), VmError> {
        self.define_foreign(class_name, method_name, arity, ForeignMethod::Rust(method), false)
    }

    /// Bind a foreign static method.
    ///
    /// The class is created as a subclass of `Object` if no module variable
    /// named `class_name` exists. A plain `method_name` is combined with
    /// `arity` into a signature such as `add(_,_)`, and with arity 0 names a
    /// getter. A name that already contains `(`, `[` or `=` is used as the
    /// signature verbatim, so `now()` binds an empty-parameter method.
    pub fn define_static_method(
        &mut self,
        class_name: &str,
        method_name: &str,
        arity: usize,
        method: ForeignMethodFn,
    ) -> Result<(), VmError> {
        self.define_foreign(class_name, method_name, arity, ForeignMethod::Rust(method), true)
    }

    pub(crate) fn define_foreign(
        &mut self,
        class_name: &str,
        method_name: &str,
        arity: usize,
        method: ForeignMethod,
        is_static: bool,
    ) -> Result<(), VmError> {
        let class = match self.module.lookup(class_name) {
            Some(Value::Obj(r)) if self.heap.object_type(r) == ObjectType::Class => r,
            Some(_) => {
                return Err(VmError::Host(format!("'{}' is not a class.", class_name)));
            }
            None => {
                let class = self.new_class(class_name, self.classes.object, 0)?;
                self.module.define(class_name, Value::Obj(class));
                class
            }
        };

        let target = if is_static {
            self.heap.class_of(class).unwrap_or(class)
        } else {
            class
        };
        let signature = foreign_signature(method_name, arity);
        let symbol = self.symbols.ensure(&signature);
        self.heap.class_mut(target).set_method(symbol, Method::Foreign(method));
        log::debug!(
            "defined foreign {}method {}.{}",
            if is_static { "static " } else { "" },
            class_name,
            signature
        );
        self.grow(target)
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    /// Allocate an object, collecting first if the threshold would be
    /// crossed. The new object's own references are kept alive.
    pub(crate) fn allocate(&mut self, class: Option<GcRef>, object: Object) -> Result<GcRef, VmError> {
        let size = Heap::entry_size(&object);
        if self.heap.would_exceed(size) {
            let mut pending = Vec::new();
            object.trace(&mut pending);
            pending.extend(class);
            self.collect_with(&pending);
        }
        self.heap.allocate(class, object)
    }

    /// Re-account `r` after one of its buffers grew.
    pub(crate) fn grow(&mut self, r: GcRef) -> Result<(), VmError> {
        let growth = self.heap.pending_growth(r);
        if growth > 0 && self.heap.would_exceed(growth) {
            self.collect_with(&[r]);
        }
        self.heap.resize(r)
    }

    pub(crate) fn new_string(&mut self, text: &str) -> Result<GcRef, VmError> {
        self.new_string_bytes(text.as_bytes())
    }

    pub(crate) fn new_string_bytes(&mut self, bytes: &[u8]) -> Result<GcRef, VmError> {
        self.allocate(Some(self.classes.string), Object::String(ObjString::new(bytes)))
    }

    pub(crate) fn new_list(&mut self, elements: Vec<Value>) -> Result<GcRef, VmError> {
        self.allocate(Some(self.classes.list), Object::List(ObjList { elements }))
    }

    pub(crate) fn new_map(&mut self) -> Result<GcRef, VmError> {
        self.allocate(Some(self.classes.map), Object::Map(ObjMap::default()))
    }

    pub(crate) fn new_range(&mut self, from: f64, to: f64, is_inclusive: bool) -> Result<GcRef, VmError> {
        self.allocate(
            Some(self.classes.range),
            Object::Range(ObjRange {
                from,
                to,
                is_inclusive,
            }),
        )
    }

    /// A closure with room for `num_upvalues` captures, initially empty.
    pub(crate) fn new_closure(&mut self, function: GcRef, num_upvalues: usize) -> Result<GcRef, VmError> {
        self.allocate(
            Some(self.classes.fn_),
            Object::Closure(ObjClosure {
                function,
                upvalues: Vec::with_capacity(num_upvalues),
            }),
        )
    }

    pub(crate) fn new_fiber(&mut self, closure: GcRef) -> Result<GcRef, VmError> {
        let function = self.heap.closure(closure).function;
        let max_slots = self.heap.func(function).max_slots;
        self.allocate(
            Some(self.classes.fiber),
            Object::Fiber(ObjFiber::new(closure, max_slots)),
        )
    }

    pub(crate) fn new_instance(&mut self, class: GcRef) -> Result<GcRef, VmError> {
        let num_fields = self.heap.class(class).num_fields;
        self.allocate(
            Some(class),
            Object::Instance(ObjInstance {
                fields: vec![Value::Null; num_fields],
            }),
        )
    }

    /// Create a class and its metaclass.
    ///
    /// `own_fields` is added to the fields inherited from `superclass`.
    pub(crate) fn new_class(&mut self, name: &str, superclass: GcRef, own_fields: usize) -> Result<GcRef, VmError> {
        let class_class = self.classes.class;
        self.heap.push_root(superclass);
        let metaclass = self.allocate(
            Some(class_class),
            Object::Class(ObjClass::new(
                format!("{} metaclass", name),
                Some(class_class),
                0,
            )),
        );
        self.heap.pop_root();

        let num_fields = self.heap.class(superclass).num_fields + own_fields;
        self.allocate(
            Some(metaclass?),
            Object::Class(ObjClass::new(name, Some(superclass), num_fields)),
        )
    }

    // ========================================================================
    // Garbage collection
    // ========================================================================

    /// Run a full collection now.
    pub fn collect_garbage(&mut self) {
        self.collect_with(&[]);
    }

    fn collect_with(&mut self, extra: &[GcRef]) {
        let start = Instant::now();
        let mut roots = self.gather_roots();
        roots.extend_from_slice(extra);

        let stats = self.heap.collect(&roots);
        let pause_us = start.elapsed().as_micros() as u64;
        self.gc_stats.record(&stats, pause_us);

        log::debug!(
            "gc #{}: freed {} bytes in {} objects, {} live, next at {} ({}us)",
            self.gc_stats.cycles,
            stats.bytes_freed(),
            stats.objects_freed,
            stats.bytes_after,
            self.heap.next_gc(),
            pause_us
        );
    }

    /// Everything reachable without going through another object.
    fn gather_roots(&self) -> Vec<GcRef> {
        let mut roots: Vec<GcRef> = self.classes.all().to_vec();
        roots.push(self.oom_message);
        roots.extend(self.fiber);
        roots.extend(self.module.values().iter().filter_map(Value::as_obj));
        if let Some(call) = &self.foreign {
            roots.extend(call.slots.iter().filter_map(Value::as_obj));
            roots.extend(call.returned.and_then(|v| v.as_obj()));
        }
        roots
    }

    pub fn bytes_allocated(&self) -> usize {
        self.heap.bytes_allocated()
    }

    pub fn next_gc(&self) -> usize {
        self.heap.next_gc()
    }

    pub fn object_count(&self) -> usize {
        self.heap.object_count()
    }

    pub fn gc_stats(&self) -> &GcStats {
        &self.gc_stats
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// The most recent host contract violation, if any.
    pub fn last_contract_violation(&self) -> Option<&ContractViolation> {
        self.last_violation.as_ref()
    }

    /// The most recent compile or runtime error message.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref().and_then(|s| s.to_str().ok())
    }

    pub(crate) fn last_error_cstr(&self) -> Option<&std::ffi::CStr> {
        self.last_error.as_deref()
    }

    pub(crate) fn clear_last_error(&mut self) {
        self.last_error = None;
    }

    pub(crate) fn set_last_error(&mut self, message: &str) {
        self.last_error = CString::new(message.replace('\0', "\\0")).ok();
    }

    /// Value of a module variable.
    pub fn get_variable(&self, name: &str) -> Option<Value> {
        self.module.lookup(name)
    }

    /// Text of a string value.
    pub fn string_value(&self, value: Value) -> Option<String> {
        let r = value.as_obj()?;
        self.heap
            .try_string(r)
            .map(|s| s.to_str_lossy().into_owned())
    }

    pub(crate) fn class_of_value(&self, value: Value) -> GcRef {
        match value {
            Value::Null => self.classes.null,
            Value::Bool(_) => self.classes.bool_,
            Value::Num(_) => self.classes.num,
            Value::Obj(r) => self.heap.class_of(r).unwrap_or(self.classes.object),
        }
    }

    pub(crate) fn class_name(&self, class: GcRef) -> &str {
        &self.heap.class(class).name
    }

    /// Text form used by `toString` on built-in values and by error
    /// reporting. User `toString` overrides are not consulted.
    pub(crate) fn stringify(&self, value: Value) -> String {
        let mut out = String::new();
        self.stringify_into(value, 0, &mut out);
        out
    }

    fn stringify_into(&self, value: Value, depth: usize, out: &mut String) {
        let r = match value {
            Value::Null => return out.push_str("null"),
            Value::Bool(b) => return out.push_str(if b { "true" } else { "false" }),
            Value::Num(n) => return out.push_str(&num_to_string(n)),
            Value::Obj(r) => r,
        };

        match self.heap.get(r) {
            Object::String(s) => out.push_str(&s.to_str_lossy()),
            Object::List(list) => {
                if depth >= MAX_STRINGIFY_DEPTH {
                    return out.push_str("[...]");
                }
                out.push('[');
                for (i, element) in list.elements.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.stringify_into(*element, depth + 1, out);
                }
                out.push(']');
            }
            Object::Map(map) => {
                if depth >= MAX_STRINGIFY_DEPTH {
                    return out.push_str("{...}");
                }
                out.push('{');
                for (i, entry) in map.entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.stringify_into(entry.key, depth + 1, out);
                    out.push_str(": ");
                    self.stringify_into(entry.value, depth + 1, out);
                }
                out.push('}');
            }
            Object::Range(range) => {
                out.push_str(&num_to_string(range.from));
                out.push_str(if range.is_inclusive { ".." } else { "..." });
                out.push_str(&num_to_string(range.to));
            }
            Object::Class(class) => out.push_str(&class.name),
            _ => {
                out.push_str("instance of ");
                out.push_str(self.class_name(self.class_of_value(value)));
            }
        }
    }

    // ========================================================================
    // Error reporting
    // ========================================================================

    /// A string value for `message`, or the preallocated out-of-memory
    /// message if it cannot be allocated.
    pub(crate) fn error_value(&mut self, message: &str) -> Value {
        match self.new_string(message) {
            Ok(r) => Value::Obj(r),
            Err(_) => Value::Obj(self.oom_message),
        }
    }

    /// Deliver an uncaught runtime error and its stack trace to the host.
    pub(crate) fn report_runtime_error(&mut self, error: Value, trace: &[(String, u32, String)]) {
        let message = match self.string_value(error) {
            Some(s) => s,
            None => self.stringify(error),
        };
        let (module, line) = trace
            .first()
            .map(|(module, line, _)| (module.as_str(), *line))
            .unwrap_or(("", 0));

        log::warn!("runtime error: {}", message);
        self.emit_error(ErrorKind::Runtime, module, line as usize, &message);
        for (module, line, function) in trace {
            self.emit_error(ErrorKind::StackTrace, module, *line as usize, function);
        }
        self.set_last_error(&message);
    }

    fn report_host_error(&mut self, module_name: &str, error: &VmError) {
        log::warn!("runtime error in {}: {}", module_name, error);
        self.emit_error(ErrorKind::Runtime, module_name, 0, &error.to_string());
        self.set_last_error(&error.to_string());
    }

    /// Send script output to the host. Without a write callback it is dropped.
    pub(crate) fn emit_write(&mut self, text: &str) {
        if let Some(write_fn) = self.config.write_fn {
            write_fn(text);
        }
        if let Some(write_fn) = self.c_hooks.write_fn {
            let text = c_text(text);
            unsafe { write_fn(self as *mut Vm as *mut WrenVM, text.as_ptr()) };
        }
    }

    pub(crate) fn emit_error(&mut self, kind: ErrorKind, module: &str, line: usize, message: &str) {
        if let Some(error_fn) = self.config.error_fn {
            error_fn(kind, module, line, message);
        }
        if let Some(error_fn) = self.c_hooks.error_fn {
            let module = c_text(module);
            let message = c_text(message);
            unsafe {
                error_fn(
                    self as *mut Vm as *mut WrenVM,
                    kind.into(),
                    module.as_ptr(),
                    line as c_int,
                    message.as_ptr(),
                )
            };
        }
    }
}

/// `text` as a C string, with any embedded NULs dropped.
fn c_text(text: &str) -> CString {
    CString::new(text.replace('\0', "")).unwrap_or_default()
}

/// Signature for a host method: verbatim when `name` already spells one out,
/// a getter for arity 0, otherwise `name(_,...)` with `arity` parameters.
/// An empty-parameter method is bound by passing `name()` explicitly.
pub(crate) fn foreign_signature(name: &str, arity: usize) -> String {
    if name.contains(['(', '[', '=']) || arity == 0 {
        name.to_string()
    } else {
        call_signature(name, arity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vm() -> Vm {
        Vm::new(Configuration::default()).unwrap()
    }

    #[test]
    fn test_new_vm_defines_core_classes() {
        let vm = vm();
        for name in ["Object", "Class", "Num", "String", "List", "Map", "Fiber", "System"] {
            let value = vm.get_variable(name).unwrap();
            assert_eq!(vm.heap.object_type(value.as_obj().unwrap()), ObjectType::Class);
        }
    }

    #[test]
    fn test_foreign_signature() {
        assert_eq!(foreign_signature("add", 2), "add(_,_)");
        assert_eq!(foreign_signature("value", 0), "value");
        assert_eq!(foreign_signature("now()", 0), "now()");
        assert_eq!(foreign_signature("[_]", 1), "[_]");
        assert_eq!(foreign_signature("x=(_)", 1), "x=(_)");
    }

    #[test]
    fn test_define_method_creates_class() {
        let mut vm = vm();
        fn noop(_: &mut Vm) {}
        vm.define_static_method("Host", "ping", 0, noop).unwrap();
        let host = vm.get_variable("Host").unwrap().as_obj().unwrap();
        let metaclass = vm.heap.class_of(host).unwrap();
        let symbol = vm.symbols.find("ping").unwrap();
        assert!(vm.heap.class(metaclass).method(symbol).is_some());
        assert!(vm.heap.class(host).method(symbol).is_none());
    }

    #[test]
    fn test_define_method_on_non_class_fails() {
        let mut vm = vm();
        fn noop(_: &mut Vm) {}
        assert_eq!(vm.interpret("main", "var Thing = 1"), InterpretResult::Success);
        let err = vm.define_method("Thing", "x", 0, noop).unwrap_err();
        assert_eq!(err, VmError::Host("'Thing' is not a class.".to_string()));
    }

    #[test]
    fn test_stringify() {
        let mut vm = vm();
        let s = vm.new_string("hi").unwrap();
        let list = vm
            .new_list(vec![Value::Num(1.0), Value::Obj(s), Value::Null])
            .unwrap();
        assert_eq!(vm.stringify(Value::Obj(list)), "[1, hi, null]");
        let range = vm.new_range(1.0, 3.0, false).unwrap();
        assert_eq!(vm.stringify(Value::Obj(range)), "1...3");
        assert_eq!(vm.stringify(Value::Num(0.5)), "0.5");
    }

    #[test]
    fn test_collect_keeps_module_variables() {
        let mut vm = vm();
        assert_eq!(
            vm.interpret("main", "var keep = [1, 2, 3]"),
            InterpretResult::Success
        );
        vm.collect_garbage();
        let keep = vm.get_variable("keep").unwrap().as_obj().unwrap();
        assert!(vm.heap.contains(keep));
        assert_eq!(vm.heap.list(keep).elements.len(), 3);
        assert_eq!(vm.gc_stats().cycles, 1);
    }

    fn failed_fiber(vm: &Vm, name: &str) -> GcRef {
        let fiber = vm.get_variable(name).and_then(|v| v.as_obj()).unwrap();
        let f = vm.heap.fiber(fiber);
        assert_eq!(f.state, FiberState::Failed);
        assert!(f.frames.is_empty());
        assert!(f.stack.is_empty());
        assert!(f.open_upvalues.is_empty());
        fiber
    }

    #[test]
    fn test_undefined_method_unwinds_caught_fiber() {
        let mut vm = vm();
        let source = "class A {\n  static go(n) { n.boom }\n}\nvar f = Fiber.new { A.go(1) }\nvar e = f.try()";
        assert_eq!(vm.interpret("main", source), InterpretResult::Success);
        let fiber = failed_fiber(&vm, "f");
        let error = vm.heap.fiber(fiber).error;
        assert_eq!(
            vm.string_value(error).as_deref(),
            Some("Num does not implement 'boom'.")
        );
        assert_eq!(vm.fiber, None);
    }

    #[test]
    fn test_undefined_method_unwinds_whole_caller_chain() {
        let mut vm = vm();
        let source = "var inner = Fiber.new { null.boom }\nvar outer = Fiber.new { inner.call() }\nouter.call()";
        assert_eq!(vm.interpret("main", source), InterpretResult::RuntimeError);
        for name in ["inner", "outer"] {
            let fiber = failed_fiber(&vm, name);
            let error = vm.heap.fiber(fiber).error;
            assert_eq!(
                vm.string_value(error).as_deref(),
                Some("Null does not implement 'boom'.")
            );
        }
        assert_eq!(vm.fiber, None);
    }

    #[test]
    fn test_new_class_inherits_field_count() {
        let mut vm = vm();
        let object = vm.classes.object;
        let base = vm.new_class("Base", object, 2).unwrap();
        let derived = vm.new_class("Derived", base, 1).unwrap();
        assert_eq!(vm.heap.class(derived).num_fields, 3);
        let metaclass = vm.heap.class_of(derived).unwrap();
        assert_eq!(vm.heap.class(metaclass).name, "Derived metaclass");
        assert_eq!(vm.heap.class(metaclass).superclass, Some(vm.classes.class));
    }
}
