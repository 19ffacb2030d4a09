//! Classes, method tables and the global method-signature table.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::ffi::types::WrenVM;

use super::Value;
use super::error::VmError;
use super::heap::{GcRef, Heap};
use super::vm::Vm;

/// A host method written in Rust. Reads its arguments and returns its
/// result through the foreign-call API on [`Vm`].
pub type ForeignMethodFn = fn(vm: &mut Vm);

/// A host method written in C, called through the `wren*` functions.
pub type CForeignMethodFn = unsafe extern "C" fn(vm: *mut WrenVM);

#[derive(Clone, Copy)]
pub enum ForeignMethod {
    Rust(ForeignMethodFn),
    C(CForeignMethodFn),
}

/// What a primitive asks the interpreter to do next.
#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    /// Replace the receiver and arguments with this value.
    Value(Value),
    /// Raise a runtime error in the current fiber.
    Error(Value),
    /// The primitive changed the current fiber and arranged its stack.
    FiberSwitch,
    /// Invoke this closure with the receiver and arguments already in place.
    RunClosure(GcRef),
}

/// A built-in method. `args[0]` is the receiver.
pub type PrimitiveFn = fn(vm: &mut Vm, args: &[Value]) -> Result<Outcome, VmError>;

#[derive(Clone, Copy)]
pub enum Method {
    None,
    Primitive(PrimitiveFn),
    Foreign(ForeignMethod),
    /// A method compiled from script: a closure over its function.
    Block(GcRef),
}

impl Method {
    pub fn is_none(&self) -> bool {
        matches!(self, Method::None)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::None => write!(f, "None"),
            Method::Primitive(_) => write!(f, "Primitive"),
            Method::Foreign(ForeignMethod::Rust(_)) => write!(f, "Foreign(Rust)"),
            Method::Foreign(ForeignMethod::C(_)) => write!(f, "Foreign(C)"),
            Method::Block(closure) => write!(f, "Block({})", closure.index()),
        }
    }
}

/// A class. Its metaclass is the class in its heap header.
#[derive(Debug)]
pub struct ObjClass {
    pub name: String,
    pub superclass: Option<GcRef>,
    /// Total fields of an instance, inherited ones included.
    pub num_fields: usize,
    /// Method table indexed by global symbol.
    pub methods: Vec<Method>,
    /// Built-in classes with a native layout cannot be subclassed.
    pub is_sealed: bool,
}

impl ObjClass {
    pub fn new(name: impl Into<String>, superclass: Option<GcRef>, num_fields: usize) -> Self {
        Self {
            name: name.into(),
            superclass,
            num_fields,
            methods: Vec::new(),
            is_sealed: false,
        }
    }

    /// Method defined directly on this class.
    pub fn method(&self, symbol: usize) -> Option<Method> {
        match self.methods.get(symbol) {
            Some(Method::None) | None => None,
            Some(method) => Some(*method),
        }
    }

    /// Insert or replace the method for `symbol`.
    pub fn set_method(&mut self, symbol: usize, method: Method) {
        if symbol >= self.methods.len() {
            self.methods.resize(symbol + 1, Method::None);
        }
        self.methods[symbol] = method;
    }
}

/// Find the method for `symbol`, walking up from `class`.
pub fn find_method(heap: &Heap, class: GcRef, symbol: usize) -> Option<Method> {
    let mut current = Some(class);
    while let Some(class) = current {
        let obj = heap.class(class);
        if let Some(method) = obj.method(symbol) {
            return Some(method);
        }
        current = obj.superclass;
    }
    None
}

/// Whether `class` is `ancestor` or inherits from it.
pub fn is_subclass(heap: &Heap, class: GcRef, ancestor: GcRef) -> bool {
    let mut current = Some(class);
    while let Some(class) = current {
        if class == ancestor {
            return true;
        }
        current = heap.class(class).superclass;
    }
    false
}

/// Signature of a method called with parentheses, e.g. `add(_,_)`.
pub fn call_signature(name: &str, arity: usize) -> String {
    let params = vec!["_"; arity].join(",");
    format!("{}({})", name, params)
}

// ============================================================================
// Symbol table
// ============================================================================

/// Interns method signatures into dense symbols shared by all classes.
#[derive(Debug, Default)]
pub struct SymbolTable {
    names: Vec<String>,
    lookup: FxHashMap<String, usize>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Symbol for `name`, adding it if needed.
    pub fn ensure(&mut self, name: &str) -> usize {
        if let Some(&symbol) = self.lookup.get(name) {
            return symbol;
        }
        let symbol = self.names.len();
        self.names.push(name.to_string());
        self.lookup.insert(name.to_string(), symbol);
        symbol
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    pub fn name(&self, symbol: usize) -> &str {
        self.names.get(symbol).map(String::as_str).unwrap_or("<unknown>")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
