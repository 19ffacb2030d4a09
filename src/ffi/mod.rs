//! C API for embedding the VM.
//!
//! Every function uses the `extern "C"` ABI and is exported unmangled;
//! `build.rs` writes the matching `include/wrenvm.h`.
//!
//! # Safety
//!
//! All FFI functions that take raw pointers require:
//! - Null or valid VM instances created by `wrenNewVM()`; null is ignored
//! - NUL-terminated strings unless a length is passed
//! - No use of a VM after `wrenFreeVM()`

mod call;
mod error;
mod stack;
pub(crate) mod types;
mod vm_ffi;

// Re-export all FFI types and functions for public use
#[allow(unused_imports)]
pub use call::*;
#[allow(unused_imports)]
pub use error::*;
#[allow(unused_imports)]
pub use stack::*;
pub use types::{
    WrenConfiguration, WrenErrorFn, WrenErrorType, WrenForeignMethodFn, WrenInterpretResult,
    WrenVM, WrenWriteFn,
};
#[allow(unused_imports)]
pub use vm_ffi::{wrenCollectGarbage, wrenFreeVM, wrenInterpret, wrenNewVM};

pub const WREN_VERSION_MAJOR: u32 = 0;
pub const WREN_VERSION_MINOR: u32 = 1;
pub const WREN_VERSION_PATCH: u32 = 0;

/// Get the version string
#[unsafe(no_mangle)]
pub extern "C" fn wrenGetVersion() -> *const std::ffi::c_char {
    static VERSION: &[u8] = b"0.1.0\0";
    VERSION.as_ptr() as *const std::ffi::c_char
}
