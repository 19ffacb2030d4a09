//! Built-in classes and their primitive methods.
//!
//! `bootstrap` builds the class graph before any script runs. The rest of
//! the core library is `core.wren`, and `bind_system` attaches primitives to
//! the classes it declares.

use super::Value;
use super::class::{Method, ObjClass, Outcome, PrimitiveFn, SymbolTable, call_signature, is_subclass};
use super::error::VmError;
use super::format::num_to_string;
use super::heap::{GcRef, Heap};
use super::interpreter::FiberRun;
use super::module::Module;
use super::object::{ObjRange, Object, ObjectType};
use super::vm::Vm;

type PrimitiveResult = Result<Outcome, VmError>;

/// The classes the VM needs direct access to.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CoreClasses {
    pub object: GcRef,
    pub class: GcRef,
    pub bool_: GcRef,
    pub null: GcRef,
    pub num: GcRef,
    pub string: GcRef,
    pub list: GcRef,
    pub map: GcRef,
    pub range: GcRef,
    pub fn_: GcRef,
    pub fiber: GcRef,
}

impl CoreClasses {
    pub fn all(&self) -> [GcRef; 11] {
        [
            self.object,
            self.class,
            self.bool_,
            self.null,
            self.num,
            self.string,
            self.list,
            self.map,
            self.range,
            self.fn_,
            self.fiber,
        ]
    }
}

// ============================================================================
// Bootstrap
// ============================================================================

/// Create the built-in classes and bind their primitives.
///
/// `Object` and `Class` are tied in a knot: `Class` inherits from `Object`,
/// `Object`'s metaclass inherits from `Class`, and `Class` is its own
/// metaclass.
pub(crate) fn bootstrap(heap: &mut Heap, module: &mut Module, symbols: &mut SymbolTable) -> Result<CoreClasses, VmError> {
    let object = heap.allocate(None, Object::Class(ObjClass::new("Object", None, 0)))?;
    let class = heap.allocate(None, Object::Class(ObjClass::new("Class", Some(object), 0)))?;
    heap.set_class(class, class);
    heap.class_mut(class).is_sealed = true;
    let object_metaclass = heap.allocate(
        Some(class),
        Object::Class(ObjClass::new("Object metaclass", Some(class), 0)),
    )?;
    heap.set_class(object, object_metaclass);
    module.define("Object", Value::Obj(object));
    module.define("Class", Value::Obj(class));

    let mut define = |name: &str| define_sealed_class(heap, module, class, object, name);
    let classes = CoreClasses {
        object,
        class,
        bool_: define("Bool")?,
        null: define("Null")?,
        num: define("Num")?,
        string: define("String")?,
        list: define("List")?,
        map: define("Map")?,
        range: define("Range")?,
        fn_: define("Fn")?,
        fiber: define("Fiber")?,
    };

    bind_all(heap, symbols, classes.object, OBJECT)?;
    bind_all_static(heap, symbols, classes.object, OBJECT_STATIC)?;
    bind_all(heap, symbols, classes.class, CLASS)?;
    bind_all(heap, symbols, classes.bool_, BOOL)?;
    bind_all(heap, symbols, classes.null, NULL)?;
    bind_all(heap, symbols, classes.num, NUM)?;
    bind_all_static(heap, symbols, classes.num, NUM_STATIC)?;
    bind_all(heap, symbols, classes.string, STRING)?;
    bind_all_static(heap, symbols, classes.string, STRING_STATIC)?;
    bind_all(heap, symbols, classes.list, LIST)?;
    bind_all_static(heap, symbols, classes.list, LIST_STATIC)?;
    bind_all(heap, symbols, classes.map, MAP)?;
    bind_all_static(heap, symbols, classes.map, MAP_STATIC)?;
    bind_all(heap, symbols, classes.range, RANGE)?;
    bind_all(heap, symbols, classes.fn_, FN)?;
    bind_all_static(heap, symbols, classes.fn_, FN_STATIC)?;
    for arity in 0..=MAX_CALL_ARGS {
        let signature = call_signature("call", arity);
        bind(heap, symbols, classes.fn_, &signature, fn_call)?;
    }
    bind_all(heap, symbols, classes.fiber, FIBER)?;
    bind_all_static(heap, symbols, classes.fiber, FIBER_STATIC)?;

    Ok(classes)
}

/// Attach primitives to classes declared in `core.wren`.
pub(crate) fn bind_system(vm: &mut Vm) -> Result<(), VmError> {
    let system = core_class(vm, "System")?;
    bind_all_static(&mut vm.heap, &mut vm.symbols, system, SYSTEM_STATIC)
}

fn core_class(vm: &Vm, name: &str) -> Result<GcRef, VmError> {
    vm.module
        .lookup(name)
        .and_then(|v| v.as_obj())
        .filter(|&r| vm.heap.object_type(r) == ObjectType::Class)
        .ok_or_else(|| VmError::Host(format!("core class '{}' is missing", name)))
}

fn define_sealed_class(
    heap: &mut Heap,
    module: &mut Module,
    class_class: GcRef,
    object: GcRef,
    name: &str,
) -> Result<GcRef, VmError> {
    let metaclass = heap.allocate(
        Some(class_class),
        Object::Class(ObjClass::new(
            format!("{} metaclass", name),
            Some(class_class),
            0,
        )),
    )?;
    let mut class = ObjClass::new(name, Some(object), 0);
    class.is_sealed = true;
    let class = heap.allocate(Some(metaclass), Object::Class(class))?;
    module.define(name, Value::Obj(class));
    Ok(class)
}

fn bind(heap: &mut Heap, symbols: &mut SymbolTable, class: GcRef, signature: &str, primitive: PrimitiveFn) -> Result<(), VmError> {
    let symbol = symbols.ensure(signature);
    heap.class_mut(class)
        .set_method(symbol, Method::Primitive(primitive));
    heap.resize(class)
}

fn bind_all(
    heap: &mut Heap,
    symbols: &mut SymbolTable,
    class: GcRef,
    table: &[(&str, PrimitiveFn)],
) -> Result<(), VmError> {
    for (signature, primitive) in table {
        bind(heap, symbols, class, signature, *primitive)?;
    }
    Ok(())
}

fn bind_all_static(
    heap: &mut Heap,
    symbols: &mut SymbolTable,
    class: GcRef,
    table: &[(&str, PrimitiveFn)],
) -> Result<(), VmError> {
    let metaclass = heap.class_of(class).unwrap_or(class);
    bind_all(heap, symbols, metaclass, table)
}

// ============================================================================
// Helpers
// ============================================================================

/// Most arguments `Fn.call` accepts.
const MAX_CALL_ARGS: usize = 16;

fn value(v: impl Into<Value>) -> PrimitiveResult {
    Ok(Outcome::Value(v.into()))
}

fn receiver(args: &[Value]) -> GcRef {
    match args[0] {
        Value::Obj(r) => r,
        other => unreachable!("primitive receiver is not an object: {:?}", other),
    }
}

fn receiver_num(args: &[Value]) -> f64 {
    args[0].as_num().unwrap_or_default()
}

fn is_type(vm: &Vm, value: Value, ty: ObjectType) -> Option<GcRef> {
    value.as_obj().filter(|&r| vm.heap.object_type(r) == ty)
}

/// Resolve a possibly negative index into `0..count`.
fn checked_index(value: Value, count: usize, noun: &str) -> Result<usize, String> {
    let Some(n) = value.as_num() else {
        return Err(format!("{} must be a number.", noun));
    };
    if n.trunc() != n {
        return Err(format!("{} must be an integer.", noun));
    }
    let index = if n < 0.0 { n + count as f64 } else { n };
    if index >= 0.0 && index < count as f64 {
        Ok(index as usize)
    } else {
        Err(format!("{} out of bounds.", noun))
    }
}

/// Indices a range subscript selects from a sequence of `count` elements.
/// A range may run backwards; one starting just past the end is empty.
fn range_indices(range: &ObjRange, count: usize) -> Result<Vec<usize>, String> {
    let len = count as f64;
    let empty_end = if range.is_inclusive { -1.0 } else { len };
    if range.from == len && range.to == empty_end {
        return Ok(Vec::new());
    }

    let from = checked_index(Value::Num(range.from), count, "Range start")?;
    if range.to.trunc() != range.to {
        return Err("Range end must be an integer.".to_string());
    }
    let mut to = if range.to < 0.0 { range.to + len } else { range.to };
    if !range.is_inclusive {
        if to == from as f64 {
            return Ok(Vec::new());
        }
        to += if to >= from as f64 { -1.0 } else { 1.0 };
    }
    if to < 0.0 || to >= len {
        return Err("Range end out of bounds.".to_string());
    }

    let to = to as usize;
    Ok(if from <= to {
        (from..=to).collect()
    } else {
        (to..=from).rev().collect()
    })
}

fn is_continuation(byte: u8) -> bool {
    byte & 0xc0 == 0x80
}

/// End of the UTF-8 sequence starting at `start`.
fn char_end(bytes: &[u8], start: usize) -> usize {
    let mut end = start + 1;
    while end < bytes.len() && is_continuation(bytes[end]) {
        end += 1;
    }
    end
}

// ============================================================================
// Object and Class
// ============================================================================

const OBJECT: &[(&str, PrimitiveFn)] = &[
    ("!", object_not),
    ("==(_)", object_eq),
    ("!=(_)", object_ne),
    ("is(_)", object_is),
    ("toString", object_to_string),
    ("type", object_type),
];

const OBJECT_STATIC: &[(&str, PrimitiveFn)] = &[("same(_,_)", object_same)];

fn object_not(_vm: &mut Vm, _args: &[Value]) -> PrimitiveResult {
    value(false)
}

fn object_eq(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    value(vm.heap.values_equal(args[0], args[1]))
}

fn object_ne(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    value(!vm.heap.values_equal(args[0], args[1]))
}

fn object_is(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let Some(class) = is_type(vm, args[1], ObjectType::Class) else {
        return vm.fail("Right operand must be a class.");
    };
    let actual = vm.class_of_value(args[0]);
    value(is_subclass(&vm.heap, actual, class))
}

fn object_to_string(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let text = vm.stringify(args[0]);
    value(vm.new_string(&text)?)
}

fn object_type(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    value(vm.class_of_value(args[0]))
}

fn object_same(_vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    value(args[1].same(&args[2]))
}

const CLASS: &[(&str, PrimitiveFn)] = &[
    ("name", class_name),
    ("supertype", class_supertype),
    ("toString", class_name),
];

fn class_name(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let name = vm.class_name(receiver(args)).to_string();
    value(vm.new_string(&name)?)
}

fn class_supertype(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    Ok(Outcome::Value(
        vm.heap
            .class(receiver(args))
            .superclass
            .map_or(Value::Null, Value::Obj),
    ))
}

// ============================================================================
// Bool and Null
// ============================================================================

const BOOL: &[(&str, PrimitiveFn)] = &[("!", bool_not), ("toString", object_to_string)];

fn bool_not(_vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    value(!args[0].as_bool().unwrap_or_default())
}

const NULL: &[(&str, PrimitiveFn)] = &[("!", null_not), ("toString", object_to_string)];

fn null_not(_vm: &mut Vm, _args: &[Value]) -> PrimitiveResult {
    value(true)
}

// ============================================================================
// Num
// ============================================================================

macro_rules! num_unary {
    ($name:ident, |$n:ident| $body:expr) => {
        fn $name(_vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
            let $n = receiver_num(args);
            value($body)
        }
    };
}

macro_rules! num_infix {
    ($name:ident, |$a:ident, $b:ident| $body:expr) => {
        fn $name(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
            let $a = receiver_num(args);
            let Some($b) = args[1].as_num() else {
                return vm.fail("Right operand must be a number.");
            };
            value($body)
        }
    };
}

/// Bitwise operators work on the low 32 bits, as unsigned.
fn bits(n: f64) -> u32 {
    n as i64 as u32
}

num_infix!(num_add, |a, b| a + b);
num_infix!(num_sub, |a, b| a - b);
num_infix!(num_mul, |a, b| a * b);
num_infix!(num_div, |a, b| a / b);
num_infix!(num_mod, |a, b| a % b);
num_infix!(num_lt, |a, b| a < b);
num_infix!(num_le, |a, b| a <= b);
num_infix!(num_gt, |a, b| a > b);
num_infix!(num_ge, |a, b| a >= b);
num_infix!(num_and, |a, b| (bits(a) & bits(b)) as f64);
num_infix!(num_or, |a, b| (bits(a) | bits(b)) as f64);
num_infix!(num_xor, |a, b| (bits(a) ^ bits(b)) as f64);
num_infix!(num_shl, |a, b| bits(a).wrapping_shl(bits(b)) as f64);
num_infix!(num_shr, |a, b| bits(a).wrapping_shr(bits(b)) as f64);
num_infix!(num_min, |a, b| a.min(b));
num_infix!(num_max, |a, b| a.max(b));
num_infix!(num_pow, |a, b| a.powf(b));
num_infix!(num_atan2, |a, b| a.atan2(b));

num_unary!(num_negate, |n| -n);
num_unary!(num_bit_not, |n| !bits(n) as f64);
num_unary!(num_abs, |n| n.abs());
num_unary!(num_ceil, |n| n.ceil());
num_unary!(num_floor, |n| n.floor());
num_unary!(num_round, |n| n.round());
num_unary!(num_truncate, |n| n.trunc());
num_unary!(num_fraction, |n| n.fract());
num_unary!(num_sqrt, |n| n.sqrt());
num_unary!(num_sin, |n| n.sin());
num_unary!(num_cos, |n| n.cos());
num_unary!(num_tan, |n| n.tan());
num_unary!(num_log, |n| n.ln());
num_unary!(num_exp, |n| n.exp());
num_unary!(num_sign, |n| if n > 0.0 {
    1.0
} else if n < 0.0 {
    -1.0
} else {
    0.0
});
num_unary!(num_is_integer, |n| n.is_finite() && n.trunc() == n);
num_unary!(num_is_nan, |n| n.is_nan());
num_unary!(num_is_infinity, |n| n.is_infinite());

fn num_range(vm: &mut Vm, args: &[Value], is_inclusive: bool) -> PrimitiveResult {
    let from = receiver_num(args);
    let Some(to) = args[1].as_num() else {
        return vm.fail("Right hand side of range must be a number.");
    };
    value(vm.new_range(from, to, is_inclusive)?)
}

fn num_range_inclusive(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    num_range(vm, args, true)
}

fn num_range_exclusive(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    num_range(vm, args, false)
}

fn num_to_string_primitive(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    value(vm.new_string(&num_to_string(receiver_num(args)))?)
}

fn num_from_string(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let Some(text) = vm.string_value(args[1]) else {
        return vm.fail("Argument must be a string.");
    };
    let text = text.trim();
    let numeric = !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    let parsed = match text.strip_prefix("0x") {
        Some(hex) => i64::from_str_radix(hex, 16).ok().map(|n| n as f64),
        None if numeric => text.parse::<f64>().ok(),
        None => None,
    };
    Ok(Outcome::Value(parsed.map_or(Value::Null, Value::Num)))
}

fn num_pi(_vm: &mut Vm, _args: &[Value]) -> PrimitiveResult {
    value(std::f64::consts::PI)
}

fn num_infinity(_vm: &mut Vm, _args: &[Value]) -> PrimitiveResult {
    value(f64::INFINITY)
}

fn num_nan(_vm: &mut Vm, _args: &[Value]) -> PrimitiveResult {
    value(f64::NAN)
}

fn num_largest(_vm: &mut Vm, _args: &[Value]) -> PrimitiveResult {
    value(f64::MAX)
}

fn num_smallest(_vm: &mut Vm, _args: &[Value]) -> PrimitiveResult {
    value(f64::MIN_POSITIVE)
}

const NUM: &[(&str, PrimitiveFn)] = &[
    ("-", num_negate),
    ("~", num_bit_not),
    ("+(_)", num_add),
    ("-(_)", num_sub),
    ("*(_)", num_mul),
    ("/(_)", num_div),
    ("%(_)", num_mod),
    ("<(_)", num_lt),
    ("<=(_)", num_le),
    (">(_)", num_gt),
    (">=(_)", num_ge),
    ("&(_)", num_and),
    ("|(_)", num_or),
    ("^(_)", num_xor),
    ("<<(_)", num_shl),
    (">>(_)", num_shr),
    ("..(_)", num_range_inclusive),
    ("...(_)", num_range_exclusive),
    ("abs", num_abs),
    ("ceil", num_ceil),
    ("floor", num_floor),
    ("round", num_round),
    ("truncate", num_truncate),
    ("fraction", num_fraction),
    ("sqrt", num_sqrt),
    ("sin", num_sin),
    ("cos", num_cos),
    ("tan", num_tan),
    ("log", num_log),
    ("exp", num_exp),
    ("sign", num_sign),
    ("isInteger", num_is_integer),
    ("isNan", num_is_nan),
    ("isInfinity", num_is_infinity),
    ("min(_)", num_min),
    ("max(_)", num_max),
    ("pow(_)", num_pow),
    ("atan(_)", num_atan2),
    ("toString", num_to_string_primitive),
];

const NUM_STATIC: &[(&str, PrimitiveFn)] = &[
    ("fromString(_)", num_from_string),
    ("pi", num_pi),
    ("infinity", num_infinity),
    ("nan", num_nan),
    ("largest", num_largest),
    ("smallest", num_smallest),
];

// ============================================================================
// String
// ============================================================================

const STRING: &[(&str, PrimitiveFn)] = &[
    ("+(_)", string_plus),
    ("[_]", string_subscript),
    ("byteAt(_)", string_byte_at),
    ("byteCount", string_byte_count),
    ("count", string_count),
    ("contains(_)", string_contains),
    ("startsWith(_)", string_starts_with),
    ("endsWith(_)", string_ends_with),
    ("indexOf(_)", string_index_of),
    ("iterate(_)", string_iterate),
    ("iteratorValue(_)", string_iterator_value),
    ("toString", string_to_string),
];

const STRING_STATIC: &[(&str, PrimitiveFn)] = &[("fromCodePoint(_)", string_from_code_point)];

fn string_bytes(vm: &Vm, args: &[Value]) -> Vec<u8> {
    vm.heap.string(receiver(args)).as_bytes().to_vec()
}

/// The string argument's bytes, or an error outcome.
fn string_arg(vm: &mut Vm, arg: Value, message: &str) -> Result<Vec<u8>, PrimitiveResult> {
    match arg.as_obj().and_then(|r| vm.heap.try_string(r)) {
        Some(s) => Ok(s.as_bytes().to_vec()),
        None => Err(vm.fail(message)),
    }
}

fn string_plus(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let right = match string_arg(vm, args[1], "Right operand must be a string.") {
        Ok(bytes) => bytes,
        Err(outcome) => return outcome,
    };
    let mut bytes = string_bytes(vm, args);
    bytes.extend_from_slice(&right);
    value(vm.new_string_bytes(&bytes)?)
}

fn string_subscript(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let bytes = string_bytes(vm, args);
    if let Some(range) = is_type(vm, args[1], ObjectType::Range) {
        let range = *vm.heap.range(range);
        let indices = match range_indices(&range, bytes.len()) {
            Ok(indices) => indices,
            Err(message) => return vm.fail(&message),
        };
        let slice: Vec<u8> = indices.into_iter().map(|i| bytes[i]).collect();
        return value(vm.new_string_bytes(&slice)?);
    }
    if !args[1].is_num() {
        return vm.fail("Subscript must be a number or a range.");
    }
    match checked_index(args[1], bytes.len(), "Subscript") {
        Ok(index) => {
            let end = char_end(&bytes, index);
            value(vm.new_string_bytes(&bytes[index..end])?)
        }
        Err(message) => vm.fail(&message),
    }
}

fn string_byte_at(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let bytes = string_bytes(vm, args);
    match checked_index(args[1], bytes.len(), "Index") {
        Ok(index) => value(bytes[index] as f64),
        Err(message) => vm.fail(&message),
    }
}

fn string_byte_count(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    value(vm.heap.string(receiver(args)).len() as f64)
}

fn string_count(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let count = vm
        .heap
        .string(receiver(args))
        .as_bytes()
        .iter()
        .filter(|&&b| !is_continuation(b))
        .count();
    value(count as f64)
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn string_contains(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let needle = match string_arg(vm, args[1], "Argument must be a string.") {
        Ok(bytes) => bytes,
        Err(outcome) => return outcome,
    };
    value(find_bytes(&string_bytes(vm, args), &needle).is_some())
}

fn string_starts_with(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let prefix = match string_arg(vm, args[1], "Argument must be a string.") {
        Ok(bytes) => bytes,
        Err(outcome) => return outcome,
    };
    value(string_bytes(vm, args).starts_with(&prefix))
}

fn string_ends_with(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let suffix = match string_arg(vm, args[1], "Argument must be a string.") {
        Ok(bytes) => bytes,
        Err(outcome) => return outcome,
    };
    value(string_bytes(vm, args).ends_with(&suffix))
}

fn string_index_of(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let needle = match string_arg(vm, args[1], "Argument must be a string.") {
        Ok(bytes) => bytes,
        Err(outcome) => return outcome,
    };
    let index = find_bytes(&string_bytes(vm, args), &needle).map_or(-1.0, |i| i as f64);
    value(index)
}

/// Iterates by byte offset, stepping over whole UTF-8 sequences.
fn string_iterate(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let bytes = string_bytes(vm, args);
    if args[1].is_null() {
        return if bytes.is_empty() { value(false) } else { value(0.0) };
    }
    let Some(n) = args[1].as_num() else {
        return vm.fail("Iterator must be a number.");
    };
    if n < 0.0 || n.trunc() != n {
        return value(false);
    }
    let index = n as usize;
    if index >= bytes.len() {
        return value(false);
    }
    let next = char_end(&bytes, index);
    if next >= bytes.len() {
        value(false)
    } else {
        value(next as f64)
    }
}

fn string_iterator_value(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let bytes = string_bytes(vm, args);
    match checked_index(args[1], bytes.len(), "Iterator") {
        Ok(index) => {
            let end = char_end(&bytes, index);
            value(vm.new_string_bytes(&bytes[index..end])?)
        }
        Err(message) => vm.fail(&message),
    }
}

fn string_to_string(_vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    Ok(Outcome::Value(args[0]))
}

fn string_from_code_point(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let Some(n) = args[1].as_num() else {
        return vm.fail("Code point must be a number.");
    };
    let Some(c) = (n.trunc() == n && n >= 0.0)
        .then(|| char::from_u32(n as u32))
        .flatten()
    else {
        return vm.fail("Code point is not valid.");
    };
    let mut buffer = [0u8; 4];
    value(vm.new_string(c.encode_utf8(&mut buffer))?)
}

// ============================================================================
// List
// ============================================================================

const LIST: &[(&str, PrimitiveFn)] = &[
    ("add(_)", list_add),
    ("addCore_(_)", list_add_core),
    ("insert(_,_)", list_insert),
    ("removeAt(_)", list_remove_at),
    ("clear()", list_clear),
    ("count", list_count),
    ("contains(_)", list_contains),
    ("indexOf(_)", list_index_of),
    ("[_]", list_subscript),
    ("[_]=(_)", list_subscript_set),
    ("iterate(_)", list_iterate),
    ("iteratorValue(_)", list_iterator_value),
    ("toString", object_to_string),
];

const LIST_STATIC: &[(&str, PrimitiveFn)] = &[("new()", list_new), ("filled(_,_)", list_filled)];

fn list_new(vm: &mut Vm, _args: &[Value]) -> PrimitiveResult {
    value(vm.new_list(Vec::new())?)
}

fn list_filled(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let Some(size) = args[1]
        .as_num()
        .filter(|n| *n >= 0.0 && n.trunc() == *n)
    else {
        return vm.fail("Size must be a non-negative integer.");
    };
    let size = size as usize;
    let mut elements = vm.heap.value_buffer(size)?;
    elements.resize(size, args[2]);
    value(vm.new_list(elements)?)
}

fn push_element(vm: &mut Vm, list: GcRef, element: Value) -> Result<(), VmError> {
    vm.heap.list_mut(list).elements.push(element);
    vm.grow(list)
}

fn list_add(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    push_element(vm, receiver(args), args[1])?;
    Ok(Outcome::Value(args[1]))
}

/// Used by list literals; returns the list so elements can be chained.
fn list_add_core(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    push_element(vm, receiver(args), args[1])?;
    Ok(Outcome::Value(args[0]))
}

fn list_insert(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let list = receiver(args);
    let count = vm.heap.list(list).elements.len();
    // One past the end appends.
    let index = match checked_index(args[1], count + 1, "Index") {
        Ok(index) => index,
        Err(message) => return vm.fail(&message),
    };
    vm.heap.list_mut(list).elements.insert(index, args[2]);
    vm.grow(list)?;
    Ok(Outcome::Value(args[2]))
}

fn list_remove_at(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let list = receiver(args);
    let count = vm.heap.list(list).elements.len();
    match checked_index(args[1], count, "Index") {
        Ok(index) => Ok(Outcome::Value(vm.heap.list_mut(list).elements.remove(index))),
        Err(message) => vm.fail(&message),
    }
}

fn list_clear(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    vm.heap.list_mut(receiver(args)).elements.clear();
    value(Value::Null)
}

fn list_count(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    value(vm.heap.list(receiver(args)).elements.len() as f64)
}

fn list_position(vm: &Vm, args: &[Value]) -> Option<usize> {
    vm.heap
        .list(receiver(args))
        .elements
        .iter()
        .position(|e| vm.heap.values_equal(*e, args[1]))
}

fn list_contains(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    value(list_position(vm, args).is_some())
}

fn list_index_of(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    value(list_position(vm, args).map_or(-1.0, |i| i as f64))
}

fn list_subscript(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let list = receiver(args);
    let count = vm.heap.list(list).elements.len();
    if let Some(range) = is_type(vm, args[1], ObjectType::Range) {
        let range = *vm.heap.range(range);
        let indices = match range_indices(&range, count) {
            Ok(indices) => indices,
            Err(message) => return vm.fail(&message),
        };
        let elements = vm.heap.list(list).elements.clone();
        let slice = indices.into_iter().map(|i| elements[i]).collect();
        return value(vm.new_list(slice)?);
    }
    if !args[1].is_num() {
        return vm.fail("Subscript must be a number or a range.");
    }
    match checked_index(args[1], count, "Subscript") {
        Ok(index) => Ok(Outcome::Value(vm.heap.list(list).elements[index])),
        Err(message) => vm.fail(&message),
    }
}

fn list_subscript_set(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let list = receiver(args);
    let count = vm.heap.list(list).elements.len();
    match checked_index(args[1], count, "Subscript") {
        Ok(index) => {
            vm.heap.list_mut(list).elements[index] = args[2];
            Ok(Outcome::Value(args[2]))
        }
        Err(message) => vm.fail(&message),
    }
}

fn list_iterate(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let count = vm.heap.list(receiver(args)).elements.len();
    if args[1].is_null() {
        return if count == 0 { value(false) } else { value(0.0) };
    }
    let Some(n) = args[1].as_num() else {
        return vm.fail("Iterator must be a number.");
    };
    if n < 0.0 || n + 1.0 >= count as f64 {
        return value(false);
    }
    value(n.trunc() + 1.0)
}

fn list_iterator_value(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let list = receiver(args);
    let count = vm.heap.list(list).elements.len();
    match checked_index(args[1], count, "Iterator") {
        Ok(index) => Ok(Outcome::Value(vm.heap.list(list).elements[index])),
        Err(message) => vm.fail(&message),
    }
}

// ============================================================================
// Map
// ============================================================================

const MAP: &[(&str, PrimitiveFn)] = &[
    ("[_]", map_subscript),
    ("[_]=(_)", map_subscript_set),
    ("addCore_(_,_)", map_add_core),
    ("containsKey(_)", map_contains_key),
    ("remove(_)", map_remove),
    ("clear()", map_clear),
    ("count", map_count),
    ("keys", map_keys),
    ("values", map_values),
    ("iterate_(_)", map_iterate),
    ("keyIteratorValue_(_)", map_key_iterator_value),
    ("valueIteratorValue_(_)", map_value_iterator_value),
    ("toString", object_to_string),
];

const MAP_STATIC: &[(&str, PrimitiveFn)] = &[("new()", map_new)];

const KEY_TYPE_ERROR: &str = "Key must be a value type.";

fn map_new(vm: &mut Vm, _args: &[Value]) -> PrimitiveResult {
    value(vm.new_map()?)
}

fn map_subscript(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let Some(key) = vm.heap.map_key(args[1]) else {
        return vm.fail(KEY_TYPE_ERROR);
    };
    Ok(Outcome::Value(
        vm.heap.map(receiver(args)).get(&key).unwrap_or(Value::Null),
    ))
}

fn map_insert(vm: &mut Vm, map: GcRef, key: Value, item: Value) -> Result<bool, VmError> {
    let Some(hash_key) = vm.heap.map_key(key) else {
        return Ok(false);
    };
    vm.heap.map_mut(map).insert(hash_key, key, item);
    vm.grow(map)?;
    Ok(true)
}

fn map_subscript_set(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    if !map_insert(vm, receiver(args), args[1], args[2])? {
        return vm.fail(KEY_TYPE_ERROR);
    }
    Ok(Outcome::Value(args[2]))
}

/// Used by map literals; returns the map.
fn map_add_core(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    if !map_insert(vm, receiver(args), args[1], args[2])? {
        return vm.fail(KEY_TYPE_ERROR);
    }
    Ok(Outcome::Value(args[0]))
}

fn map_contains_key(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let Some(key) = vm.heap.map_key(args[1]) else {
        return vm.fail(KEY_TYPE_ERROR);
    };
    value(vm.heap.map(receiver(args)).contains_key(&key))
}

fn map_remove(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let Some(key) = vm.heap.map_key(args[1]) else {
        return vm.fail(KEY_TYPE_ERROR);
    };
    Ok(Outcome::Value(
        vm.heap
            .map_mut(receiver(args))
            .remove(&key)
            .unwrap_or(Value::Null),
    ))
}

fn map_clear(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    vm.heap.map_mut(receiver(args)).clear();
    value(Value::Null)
}

fn map_count(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    value(vm.heap.map(receiver(args)).len() as f64)
}

/// An instance of the core sequence class `name` viewing `map`.
fn map_view(vm: &mut Vm, map: Value, name: &str) -> PrimitiveResult {
    let class = core_class(vm, name)?;
    let view = vm.new_instance(class)?;
    if let Some(field) = vm.heap.instance_mut(view).fields.first_mut() {
        *field = map;
    }
    value(view)
}

fn map_keys(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    map_view(vm, args[0], "MapKeySequence")
}

fn map_values(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    map_view(vm, args[0], "MapValueSequence")
}

fn map_iterate(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let count = vm.heap.map(receiver(args)).len();
    if args[1].is_null() {
        return if count == 0 { value(false) } else { value(0.0) };
    }
    let Some(n) = args[1].as_num() else {
        return vm.fail("Iterator must be a number.");
    };
    if n < 0.0 || n + 1.0 >= count as f64 {
        return value(false);
    }
    value(n.trunc() + 1.0)
}

fn map_entry(vm: &mut Vm, args: &[Value], key: bool) -> PrimitiveResult {
    let map = receiver(args);
    let count = vm.heap.map(map).len();
    match checked_index(args[1], count, "Iterator") {
        Ok(index) => {
            let entry = &vm.heap.map(map).entries[index];
            Ok(Outcome::Value(if key { entry.key } else { entry.value }))
        }
        Err(message) => vm.fail(&message),
    }
}

fn map_key_iterator_value(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    map_entry(vm, args, true)
}

fn map_value_iterator_value(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    map_entry(vm, args, false)
}

// ============================================================================
// Range
// ============================================================================

const RANGE: &[(&str, PrimitiveFn)] = &[
    ("from", range_from),
    ("to", range_to),
    ("min", range_min),
    ("max", range_max),
    ("isInclusive", range_is_inclusive),
    ("iterate(_)", range_iterate),
    ("iteratorValue(_)", range_iterator_value),
    ("toString", object_to_string),
];

fn range_of(vm: &Vm, args: &[Value]) -> ObjRange {
    *vm.heap.range(receiver(args))
}

fn range_from(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    value(range_of(vm, args).from)
}

fn range_to(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    value(range_of(vm, args).to)
}

fn range_min(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let range = range_of(vm, args);
    value(range.from.min(range.to))
}

fn range_max(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let range = range_of(vm, args);
    value(range.from.max(range.to))
}

fn range_is_inclusive(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    value(range_of(vm, args).is_inclusive)
}

/// Steps by one towards `to`, in either direction.
fn range_iterate(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let range = range_of(vm, args);
    if range.from == range.to && !range.is_inclusive {
        return value(false);
    }
    if args[1].is_null() {
        return value(range.from);
    }
    let Some(mut n) = args[1].as_num() else {
        return vm.fail("Iterator must be a number.");
    };

    if range.from < range.to {
        n += 1.0;
        if n > range.to || (!range.is_inclusive && n == range.to) {
            return value(false);
        }
    } else {
        n -= 1.0;
        if n < range.to || (!range.is_inclusive && n == range.to) {
            return value(false);
        }
    }
    value(n)
}

fn range_iterator_value(_vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    Ok(Outcome::Value(args[1]))
}

// ============================================================================
// Fn
// ============================================================================

const FN: &[(&str, PrimitiveFn)] = &[("arity", fn_arity), ("toString", fn_to_string)];

const FN_STATIC: &[(&str, PrimitiveFn)] = &[("new(_)", fn_new)];

fn fn_new(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    if is_type(vm, args[1], ObjectType::Closure).is_none() {
        return vm.fail("Argument must be a function.");
    }
    Ok(Outcome::Value(args[1]))
}

fn fn_arity(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let function = vm.heap.closure(receiver(args)).function;
    value(vm.heap.func(function).arity as f64)
}

fn fn_to_string(vm: &mut Vm, _args: &[Value]) -> PrimitiveResult {
    value(vm.new_string("<fn>")?)
}

/// Every `call(...)` arity shares this; the interpreter drops extra
/// arguments and rejects missing ones.
fn fn_call(_vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    Ok(Outcome::RunClosure(receiver(args)))
}

// ============================================================================
// Fiber
// ============================================================================

const FIBER: &[(&str, PrimitiveFn)] = &[
    ("call()", fiber_call),
    ("call(_)", fiber_call),
    ("try()", fiber_try),
    ("try(_)", fiber_try),
    ("transfer()", fiber_transfer),
    ("transfer(_)", fiber_transfer),
    ("isDone", fiber_is_done),
    ("error", fiber_error),
];

const FIBER_STATIC: &[(&str, PrimitiveFn)] = &[
    ("new(_)", fiber_new),
    ("yield()", fiber_yield),
    ("yield(_)", fiber_yield),
    ("current", fiber_current),
    ("suspend()", fiber_suspend),
    ("abort(_)", fiber_abort),
];

fn fiber_new(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    let Some(closure) = is_type(vm, args[1], ObjectType::Closure) else {
        return vm.fail("Argument must be a function.");
    };
    let function = vm.heap.closure(closure).function;
    if vm.heap.func(function).arity > 1 {
        return vm.fail("Function cannot take more than one parameter.");
    }
    value(vm.new_fiber(closure)?)
}

fn fiber_call(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    vm.run_fiber(receiver(args), args, FiberRun::Call)
}

fn fiber_try(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    vm.run_fiber(receiver(args), args, FiberRun::Try)
}

fn fiber_transfer(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    vm.run_fiber(receiver(args), args, FiberRun::Transfer)
}

fn fiber_is_done(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    value(vm.heap.fiber(receiver(args)).is_done())
}

fn fiber_error(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    Ok(Outcome::Value(vm.heap.fiber(receiver(args)).error))
}

fn fiber_yield(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    vm.yield_fiber(args)
}

fn fiber_current(vm: &mut Vm, _args: &[Value]) -> PrimitiveResult {
    Ok(Outcome::Value(vm.fiber.map_or(Value::Null, Value::Obj)))
}

fn fiber_suspend(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    vm.suspend_fiber(args)
}

/// Raise `args[1]` as a runtime error. Aborting with null does nothing.
fn fiber_abort(_vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    if args[1].is_null() {
        return Ok(Outcome::Value(Value::Null));
    }
    Ok(Outcome::Error(args[1]))
}

// ============================================================================
// System
// ============================================================================

const SYSTEM_STATIC: &[(&str, PrimitiveFn)] = &[
    ("clock", system_clock),
    ("gc()", system_gc),
    ("writeString_(_)", system_write_string),
];

fn system_clock(vm: &mut Vm, _args: &[Value]) -> PrimitiveResult {
    value(vm.start_time.elapsed().as_secs_f64())
}

fn system_gc(vm: &mut Vm, _args: &[Value]) -> PrimitiveResult {
    vm.collect_garbage();
    value(Value::Null)
}

fn system_write_string(vm: &mut Vm, args: &[Value]) -> PrimitiveResult {
    if let Some(text) = vm.string_value(args[1]) {
        vm.emit_write(&text);
    }
    Ok(Outcome::Value(args[1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;

    #[test]
    fn test_checked_index() {
        assert_eq!(checked_index(Value::Num(1.0), 3, "Index"), Ok(1));
        assert_eq!(checked_index(Value::Num(-1.0), 3, "Index"), Ok(2));
        assert_eq!(
            checked_index(Value::Num(3.0), 3, "Index"),
            Err("Index out of bounds.".to_string())
        );
        assert_eq!(
            checked_index(Value::Num(0.5), 3, "Subscript"),
            Err("Subscript must be an integer.".to_string())
        );
        assert_eq!(
            checked_index(Value::Null, 3, "Index"),
            Err("Index must be a number.".to_string())
        );
    }

    #[test]
    fn test_range_indices() {
        let range = |from, to, is_inclusive| ObjRange {
            from,
            to,
            is_inclusive,
        };
        assert_eq!(range_indices(&range(1.0, 3.0, true), 5), Ok(vec![1, 2, 3]));
        assert_eq!(range_indices(&range(1.0, 3.0, false), 5), Ok(vec![1, 2]));
        assert_eq!(range_indices(&range(3.0, 1.0, true), 5), Ok(vec![3, 2, 1]));
        assert_eq!(range_indices(&range(0.0, -1.0, true), 3), Ok(vec![0, 1, 2]));
        assert_eq!(range_indices(&range(3.0, 3.0, false), 3), Ok(vec![]));
        assert_eq!(
            range_indices(&range(0.0, 9.0, true), 3),
            Err("Range end out of bounds.".to_string())
        );
    }

    #[test]
    fn test_char_end_spans_utf8_sequence() {
        let bytes = "aé".as_bytes();
        assert_eq!(char_end(bytes, 0), 1);
        assert_eq!(char_end(bytes, 1), 3);
    }

    #[test]
    fn test_bootstrap_knot() {
        let vm = Vm::new(Configuration::default()).unwrap();
        let classes = vm.classes;
        assert_eq!(vm.heap.class_of(classes.class), Some(classes.class));
        let object_meta = vm.heap.class_of(classes.object).unwrap();
        assert_eq!(vm.heap.class(object_meta).superclass, Some(classes.class));
        assert!(vm.heap.class(classes.list).is_sealed);
        assert!(!vm.heap.class(classes.object).is_sealed);
    }

    #[test]
    fn test_primitives_bound() {
        let vm = Vm::new(Configuration::default()).unwrap();
        let symbol = vm.symbols.find("iterate(_)").unwrap();
        for class in [vm.classes.list, vm.classes.range, vm.classes.string] {
            assert!(vm.heap.class(class).method(symbol).is_some());
        }
        let call16 = vm.symbols.find(&call_signature("call", 16));
        assert!(call16.is_some());
    }
}
