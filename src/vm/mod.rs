//! The virtual machine: values, the garbage-collected heap, the object
//! model, fibers and the interpreter.

mod builtins;
mod class;
pub mod debug;
mod error;
mod fiber;
mod foreign;
mod format;
mod heap;
mod interpreter;
mod module;
mod object;
mod ops;
mod value;
#[allow(clippy::module_inception)]
mod vm;

pub use class::{CForeignMethodFn, ForeignMethod, ForeignMethodFn, SymbolTable, call_signature};
pub use error::{ContractViolation, VmError};
pub use fiber::FiberState;
pub use format::num_to_string;
pub use heap::{CollectStats, GcRef, Heap, next_threshold};
pub use module::Module;
pub use object::ObjectType;
pub use ops::{Op, UpvalueDesc};
pub use value::Value;
pub use vm::{GcStats, InterpretResult, Vm};
