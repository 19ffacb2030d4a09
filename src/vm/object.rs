//! Heap object variants.

use std::borrow::Cow;
use std::mem::size_of;

use rustc_hash::FxHashMap;

use super::class::{Method, ObjClass};
use super::fiber::{CallFrame, ObjFiber};
use super::heap::GcRef;
use super::ops::{Op, UpvalueDesc};
use super::Value;

/// Type tag of a heap object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    String,
    List,
    Map,
    Range,
    Fn,
    Closure,
    Upvalue,
    Class,
    Instance,
    Fiber,
}

#[derive(Debug)]
pub enum Object {
    String(ObjString),
    List(ObjList),
    Map(ObjMap),
    Range(ObjRange),
    Fn(ObjFn),
    Closure(ObjClosure),
    Upvalue(ObjUpvalue),
    Class(ObjClass),
    Instance(ObjInstance),
    Fiber(ObjFiber),
}

impl Object {
    pub fn object_type(&self) -> ObjectType {
        match self {
            Object::String(_) => ObjectType::String,
            Object::List(_) => ObjectType::List,
            Object::Map(_) => ObjectType::Map,
            Object::Range(_) => ObjectType::Range,
            Object::Fn(_) => ObjectType::Fn,
            Object::Closure(_) => ObjectType::Closure,
            Object::Upvalue(_) => ObjectType::Upvalue,
            Object::Class(_) => ObjectType::Class,
            Object::Instance(_) => ObjectType::Instance,
            Object::Fiber(_) => ObjectType::Fiber,
        }
    }

    /// Bytes owned by the object outside its heap entry.
    ///
    /// Growable buffers are measured by capacity so that growth shows up in
    /// the heap's accounting.
    pub fn payload_size(&self) -> usize {
        const VALUE: usize = size_of::<Value>();
        match self {
            Object::String(s) => s.bytes.capacity(),
            Object::List(l) => l.elements.capacity() * VALUE,
            Object::Map(m) => {
                m.entries.capacity() * size_of::<MapEntry>()
                    + m.index.capacity() * (size_of::<MapKey>() + size_of::<usize>())
            }
            Object::Range(_) | Object::Upvalue(_) => 0,
            Object::Fn(f) => {
                f.code.len() * size_of::<Op>()
                    + f.constants.len() * VALUE
                    + f.upvalues.len() * size_of::<UpvalueDesc>()
                    + f.lines.len() * size_of::<u32>()
                    + f.name.len()
            }
            Object::Closure(c) => c.upvalues.capacity() * size_of::<GcRef>(),
            Object::Class(c) => c.methods.capacity() * size_of::<Method>() + c.name.len(),
            Object::Instance(i) => i.fields.len() * VALUE,
            Object::Fiber(f) => {
                f.stack_capacity() * VALUE + f.frames.capacity() * size_of::<CallFrame>()
            }
        }
    }

    /// Push every object this one references onto `out`.
    pub fn trace(&self, out: &mut Vec<GcRef>) {
        fn value(out: &mut Vec<GcRef>, v: &Value) {
            if let Value::Obj(r) = v {
                out.push(*r);
            }
        }

        match self {
            Object::String(_) | Object::Range(_) => {
                // Range endpoints are numbers.
            }
            Object::List(l) => l.elements.iter().for_each(|v| value(out, v)),
            Object::Map(m) => {
                for entry in &m.entries {
                    value(out, &entry.key);
                    value(out, &entry.value);
                }
            }
            Object::Fn(f) => {
                f.constants.iter().for_each(|v| value(out, v));
                out.extend(f.bound_class);
            }
            Object::Closure(c) => {
                out.push(c.function);
                out.extend(c.upvalues.iter().copied());
            }
            Object::Upvalue(u) => match u {
                ObjUpvalue::Open { fiber, .. } => out.push(*fiber),
                ObjUpvalue::Closed(v) => value(out, v),
            },
            Object::Class(c) => {
                out.extend(c.superclass);
                for method in &c.methods {
                    if let Method::Block(closure) = method {
                        out.push(*closure);
                    }
                }
            }
            Object::Instance(i) => i.fields.iter().for_each(|v| value(out, v)),
            Object::Fiber(f) => f.trace(out),
        }
    }
}

// ============================================================================
// String
// ============================================================================

/// An immutable byte string.
///
/// The buffer always ends with a NUL that is not part of the content, so a
/// pointer to it can be handed to C for as long as the string is alive.
#[derive(Debug, Clone)]
pub struct ObjString {
    bytes: Vec<u8>,
}

impl ObjString {
    pub fn new(content: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(content.len() + 1);
        bytes.extend_from_slice(content);
        bytes.push(0);
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.bytes.len() - 1]
    }

    /// Content including the trailing NUL.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }
}

// ============================================================================
// List / Map / Range
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ObjList {
    pub elements: Vec<Value>,
}

/// Hashable projection of a map key.
///
/// Only immutable values can be keys: null, bools, numbers, strings, ranges
/// and classes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Null,
    Bool(bool),
    Num(u64),
    Str(Box<[u8]>),
    Range(u64, u64, bool),
    Class(GcRef),
}

impl MapKey {
    /// Normalised bit pattern so that `0` and `-0` hash alike.
    pub fn num_bits(n: f64) -> u64 {
        if n == 0.0 { 0 } else { n.to_bits() }
    }
}

#[derive(Debug, Clone)]
pub struct MapEntry {
    pub hash_key: MapKey,
    pub key: Value,
    pub value: Value,
}

#[derive(Debug, Clone, Default)]
pub struct ObjMap {
    pub entries: Vec<MapEntry>,
    index: FxHashMap<MapKey, usize>,
}

impl ObjMap {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &MapKey) -> Option<Value> {
        self.index.get(key).map(|&i| self.entries[i].value)
    }

    pub fn contains_key(&self, key: &MapKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn insert(&mut self, hash_key: MapKey, key: Value, value: Value) {
        if let Some(&i) = self.index.get(&hash_key) {
            self.entries[i].value = value;
            return;
        }
        self.index.insert(hash_key.clone(), self.entries.len());
        self.entries.push(MapEntry { hash_key, key, value });
    }

    /// Remove `key`, returning its value. The last entry takes its place.
    pub fn remove(&mut self, key: &MapKey) -> Option<Value> {
        let i = self.index.remove(key)?;
        let removed = self.entries.swap_remove(i);
        if let Some(moved) = self.entries.get(i) {
            self.index.insert(moved.hash_key.clone(), i);
        }
        Some(removed.value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjRange {
    pub from: f64,
    pub to: f64,
    pub is_inclusive: bool,
}

// ============================================================================
// Functions, closures and upvalues
// ============================================================================

/// A compiled function: bytecode, constants and debug lines.
#[derive(Debug, Clone)]
pub struct ObjFn {
    pub name: String,
    pub module: String,
    pub arity: usize,
    pub code: Vec<Op>,
    /// Source line of each op, parallel to `code`.
    pub lines: Vec<u32>,
    pub constants: Vec<Value>,
    pub upvalues: Vec<UpvalueDesc>,
    /// Stack slots the function needs, including its receiver and params.
    pub max_slots: usize,
    /// Class the method was bound to; `super` dispatch starts above it.
    pub bound_class: Option<GcRef>,
    pub fields_bound: bool,
}

impl ObjFn {
    pub fn line_at(&self, ip: usize) -> u32 {
        self.lines.get(ip).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct ObjClosure {
    pub function: GcRef,
    pub upvalues: Vec<GcRef>,
}

/// A captured variable.
///
/// While the declaring frame is live the upvalue points at a slot on the
/// fiber stack it was created on; once that slot goes out of scope the value
/// is moved into the upvalue.
#[derive(Debug, Clone, Copy)]
pub enum ObjUpvalue {
    Open { fiber: GcRef, slot: usize },
    Closed(Value),
}

#[derive(Debug, Clone)]
pub struct ObjInstance {
    pub fields: Vec<Value>,
}
