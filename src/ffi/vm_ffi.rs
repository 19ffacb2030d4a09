//! VM lifecycle FFI functions.

#![allow(unsafe_op_in_unsafe_fn)]

use std::ffi::{CStr, c_char};

use super::types::{WrenConfiguration, WrenInterpretResult, WrenVM};
use crate::vm::{InterpretResult, Vm};

/// Create a new VM instance.
///
/// A null `config` selects the defaults. Returns NULL if the VM could not
/// be created, e.g. because the allocator refused the core library.
/// The returned VM must be freed with `wrenFreeVM()`.
///
/// # Example (C)
/// ```c
/// WrenVM *vm = wrenNewVM(NULL);
/// if (vm == NULL) {
///     // Handle allocation failure
/// }
/// // ... use vm ...
/// wrenFreeVM(vm);
/// ```
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wrenNewVM(config: *const WrenConfiguration) -> *mut WrenVM {
    let c_config = if config.is_null() {
        WrenConfiguration::default()
    } else {
        *config
    };
    let (config, hooks) = c_config.split();

    match Vm::new(config) {
        Ok(mut vm) => {
            vm.c_hooks = hooks;
            Box::into_raw(Box::new(vm)) as *mut WrenVM
        }
        Err(e) => {
            log::error!("wrenNewVM failed: {}", e);
            std::ptr::null_mut()
        }
    }
}

/// Free a VM instance and everything it allocated.
///
/// # Safety
///
/// - `vm` must be null or a pointer returned by `wrenNewVM()`
/// - `vm` must not have been freed already
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wrenFreeVM(vm: *mut WrenVM) {
    if vm.is_null() {
        return;
    }
    drop(Box::from_raw(vm as *mut Vm));
}

/// Compile and run `source` as the module named `module`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wrenInterpret(
    vm: *mut WrenVM,
    module: *const c_char,
    source: *const c_char,
) -> WrenInterpretResult {
    let Some(vm) = get_vm_mut(vm) else {
        return WrenInterpretResult::RuntimeError;
    };
    let module = if module.is_null() {
        "main".into()
    } else {
        CStr::from_ptr(module).to_string_lossy()
    };
    if source.is_null() {
        vm.set_last_error("source is null");
        return WrenInterpretResult::CompileError;
    }
    let source = match CStr::from_ptr(source).to_str() {
        Ok(s) => s,
        Err(_) => {
            vm.set_last_error("source is not valid UTF-8");
            return WrenInterpretResult::CompileError;
        }
    };
    let result: InterpretResult = vm.interpret(&module, source);
    result.into()
}

/// Run a full collection now.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wrenCollectGarbage(vm: *mut WrenVM) {
    if let Some(vm) = get_vm_mut(vm) {
        vm.collect_garbage();
    }
}

/// Helper to get a mutable reference to the VM from a raw pointer.
///
/// Returns None if the pointer is null.
pub(crate) unsafe fn get_vm_mut<'a>(vm: *mut WrenVM) -> Option<&'a mut Vm> {
    if vm.is_null() {
        None
    } else {
        Some(&mut *(vm as *mut Vm))
    }
}

/// Helper to get a shared reference to the VM from a raw pointer.
pub(crate) unsafe fn get_vm<'a>(vm: *const WrenVM) -> Option<&'a Vm> {
    if vm.is_null() {
        None
    } else {
        Some(&*(vm as *const Vm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static OUTPUT: Mutex<String> = Mutex::new(String::new());

    unsafe extern "C" fn capture(_vm: *mut WrenVM, text: *const c_char) {
        let text = unsafe { CStr::from_ptr(text) }.to_string_lossy();
        OUTPUT.lock().unwrap().push_str(&text);
    }

    #[test]
    fn test_vm_new_free() {
        unsafe {
            let vm = wrenNewVM(std::ptr::null());
            assert!(!vm.is_null());
            wrenFreeVM(vm);
        }
    }

    #[test]
    fn test_vm_free_null() {
        // Should not crash
        unsafe {
            wrenFreeVM(std::ptr::null_mut());
        }
    }

    #[test]
    fn test_interpret_writes_through_c_callback() {
        let config = WrenConfiguration {
            write_fn: Some(capture),
            ..Default::default()
        };
        unsafe {
            let vm = wrenNewVM(&config);
            let result = wrenInterpret(vm, c"main".as_ptr(), c"System.print(40 + 2)".as_ptr());
            assert_eq!(result, WrenInterpretResult::Success);
            wrenCollectGarbage(vm);
            wrenFreeVM(vm);
        }
        assert_eq!(OUTPUT.lock().unwrap().as_str(), "42\n");
    }

    #[test]
    fn test_interpret_null_vm() {
        unsafe {
            let result = wrenInterpret(std::ptr::null_mut(), c"main".as_ptr(), c"1".as_ptr());
            assert_eq!(result, WrenInterpretResult::RuntimeError);
            wrenCollectGarbage(std::ptr::null_mut());
        }
    }

    #[test]
    fn test_interpret_reports_compile_error() {
        unsafe {
            let vm = wrenNewVM(std::ptr::null());
            let result = wrenInterpret(vm, c"main".as_ptr(), c"var = 1".as_ptr());
            assert_eq!(result, WrenInterpretResult::CompileError);
            wrenFreeVM(vm);
        }
    }
}
