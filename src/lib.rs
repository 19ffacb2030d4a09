//! wrenvm - an embeddable scripting VM for a Wren-style class-based language
//!
//! This library provides the virtual machine, its compiler and core library.
//! Rust hosts drive it through [`Vm`]; C and C++ hosts use the `wren*`
//! functions in the FFI module.

pub mod compiler;
pub mod config;
pub mod ffi;
pub mod vm;

// Re-export commonly used types
pub use config::{Configuration, ErrorFn, ErrorKind, ReallocateFn, WriteFn};
pub use vm::{
    ContractViolation, ForeignMethodFn, GcStats, InterpretResult, Value, Vm, VmError,
};

// Re-export FFI types for C bindings
pub use ffi::*;
