//! Error reporting FFI functions.

#![allow(unsafe_op_in_unsafe_fn)]

use std::ffi::c_char;

use super::types::WrenVM;
use super::vm_ffi::{get_vm, get_vm_mut};

/// Get the message of the last failed call.
///
/// Returns a pointer to the message, or NULL if there is none. Compile
/// errors, uncaught runtime errors and rejected API calls all set it.
/// The pointer is valid until the next call into the VM.
///
/// # Example (C)
/// ```c
/// if (wrenInterpret(vm, "main", source) != WREN_RESULT_SUCCESS) {
///     printf("Error: %s\n", wrenGetError(vm));
/// }
/// ```
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wrenGetError(vm: *const WrenVM) -> *const c_char {
    get_vm(vm)
        .and_then(|vm| vm.last_error_cstr())
        .map_or(std::ptr::null(), |message| message.as_ptr())
}

/// Clear the last error.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wrenClearError(vm: *mut WrenVM) {
    if let Some(vm) = get_vm_mut(vm) {
        vm.clear_last_error();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::vm_ffi::{wrenFreeVM, wrenInterpret, wrenNewVM};
    use std::ffi::CStr;

    #[test]
    fn test_get_error() {
        unsafe {
            let vm = wrenNewVM(std::ptr::null());

            // No error initially
            assert!(wrenGetError(vm).is_null());

            wrenInterpret(vm, c"main".as_ptr(), c"Fiber.abort(\"boom\")".as_ptr());
            let error = wrenGetError(vm);
            assert!(!error.is_null());
            assert_eq!(CStr::from_ptr(error).to_str().unwrap(), "boom");

            wrenClearError(vm);
            assert!(wrenGetError(vm).is_null());

            wrenFreeVM(vm);
        }
    }

    #[test]
    fn test_compile_error_message_names_line() {
        unsafe {
            let vm = wrenNewVM(std::ptr::null());
            wrenInterpret(vm, c"main".as_ptr(), c"\nvar = 1".as_ptr());
            let error = CStr::from_ptr(wrenGetError(vm)).to_str().unwrap().to_string();
            assert!(error.starts_with("[main line 2]"), "{}", error);
            wrenFreeVM(vm);
        }
    }

    #[test]
    fn test_error_null_vm() {
        unsafe {
            assert!(wrenGetError(std::ptr::null()).is_null());
            // Should not crash
            wrenClearError(std::ptr::null_mut());
        }
    }
}
