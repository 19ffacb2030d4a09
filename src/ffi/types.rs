//! FFI type definitions for the C API.

use std::ffi::{c_char, c_int};

use crate::config::{Configuration, ErrorKind, ReallocateFn};
use crate::vm::InterpretResult;

/// Opaque VM handle.
///
/// Every `wren*` function takes a pointer returned by `wrenNewVM()`.
#[repr(C)]
pub struct WrenVM {
    _private: [u8; 0],
}

/// Result of `wrenInterpret`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrenInterpretResult {
    Success = 0,
    CompileError = 1,
    RuntimeError = 2,
}

impl From<InterpretResult> for WrenInterpretResult {
    fn from(result: InterpretResult) -> Self {
        match result {
            InterpretResult::Success => WrenInterpretResult::Success,
            InterpretResult::CompileError => WrenInterpretResult::CompileError,
            InterpretResult::RuntimeError => WrenInterpretResult::RuntimeError,
        }
    }
}

/// Kind of diagnostic passed to a [`WrenErrorFn`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrenErrorType {
    Compile = 0,
    Runtime = 1,
    StackTrace = 2,
}

impl From<ErrorKind> for WrenErrorType {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Compile => WrenErrorType::Compile,
            ErrorKind::Runtime => WrenErrorType::Runtime,
            ErrorKind::StackTrace => WrenErrorType::StackTrace,
        }
    }
}

/// A host method. Reads arguments with `wrenGetArgument*` and answers with
/// one `wrenReturn*` call.
pub type WrenForeignMethodFn = unsafe extern "C" fn(vm: *mut WrenVM);

/// Receives text written by `System.print` and `System.write`.
pub type WrenWriteFn = unsafe extern "C" fn(vm: *mut WrenVM, text: *const c_char);

/// Receives compile errors, runtime errors and stack trace lines.
pub type WrenErrorFn = unsafe extern "C" fn(
    vm: *mut WrenVM,
    kind: WrenErrorType,
    module: *const c_char,
    line: c_int,
    message: *const c_char,
);

/// VM configuration as seen from C. Zero sizes and null callbacks select
/// the defaults.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct WrenConfiguration {
    pub reallocate_fn: Option<ReallocateFn>,
    pub initial_heap_size: usize,
    pub min_heap_size: usize,
    pub heap_growth_percent: c_int,
    pub write_fn: Option<WrenWriteFn>,
    pub error_fn: Option<WrenErrorFn>,
}

impl WrenConfiguration {
    /// The Rust configuration plus the C callbacks to install on the VM.
    pub(crate) fn split(&self) -> (Configuration, CHooks) {
        let config = Configuration {
            reallocate_fn: self.reallocate_fn,
            initial_heap_size: self.initial_heap_size,
            min_heap_size: self.min_heap_size,
            heap_growth_percent: usize::try_from(self.heap_growth_percent).unwrap_or(0),
            write_fn: None,
            error_fn: None,
        };
        let hooks = CHooks {
            write_fn: self.write_fn,
            error_fn: self.error_fn,
        };
        (config, hooks)
    }
}

/// C callbacks held by a VM created through `wrenNewVM`.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CHooks {
    pub write_fn: Option<WrenWriteFn>,
    pub error_fn: Option<WrenErrorFn>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_codes() {
        assert_eq!(
            WrenInterpretResult::from(InterpretResult::Success) as i32,
            0
        );
        assert_eq!(
            WrenInterpretResult::from(InterpretResult::CompileError) as i32,
            1
        );
        assert_eq!(
            WrenInterpretResult::from(InterpretResult::RuntimeError) as i32,
            2
        );
    }

    #[test]
    fn test_split_keeps_sizes_and_hooks() {
        unsafe extern "C" fn write(_vm: *mut WrenVM, _text: *const c_char) {}

        let config = WrenConfiguration {
            initial_heap_size: 4096,
            heap_growth_percent: -5,
            write_fn: Some(write),
            ..Default::default()
        };
        let (rust, hooks) = config.split();
        assert_eq!(rust.initial_heap_size, 4096);
        assert_eq!(rust.heap_growth_percent, 0);
        assert!(rust.write_fn.is_none());
        assert!(hooks.write_fn.is_some());
        assert!(hooks.error_fn.is_none());
    }
}
