//! Argument and return-value FFI functions.
//!
//! Valid only inside a foreign method. Slot 0 is the receiver and the
//! arguments follow it. Misuse is recorded as a contract violation and
//! aborts the calling fiber once the foreign method returns.

#![allow(unsafe_op_in_unsafe_fn)]

use std::ffi::{c_char, c_int};

use super::types::WrenVM;
use super::vm_ffi::get_vm_mut;
use crate::vm::ContractViolation;

/// Get slot `index` as a boolean.
///
/// Returns false if the value is not `true`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wrenGetArgumentBool(vm: *mut WrenVM, index: c_int) -> bool {
    match get_vm_mut(vm) {
        Some(vm) => vm.slot(index as i64).is_some_and(|v| v.as_bool() == Some(true)),
        None => false,
    }
}

/// Get slot `index` as a number.
///
/// Returns 0.0 if the value is not a number.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wrenGetArgumentDouble(vm: *mut WrenVM, index: c_int) -> f64 {
    match get_vm_mut(vm) {
        Some(vm) => vm.slot(index as i64).and_then(|v| v.as_num()).unwrap_or(0.0),
        None => 0.0,
    }
}

/// Get slot `index` as a NUL-terminated string.
///
/// Returns NULL if the value is not a string. The pointer is owned by the
/// VM and stays valid until the foreign method returns.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wrenGetArgumentString(vm: *mut WrenVM, index: c_int) -> *const c_char {
    match get_vm_mut(vm) {
        Some(vm) => vm.argument_c_string(index as i64),
        None => std::ptr::null(),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wrenReturnBool(vm: *mut WrenVM, value: bool) {
    if let Some(vm) = get_vm_mut(vm) {
        vm.return_bool(value);
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wrenReturnDouble(vm: *mut WrenVM, value: f64) {
    if let Some(vm) = get_vm_mut(vm) {
        vm.return_double(value);
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wrenReturnNull(vm: *mut WrenVM) {
    if let Some(vm) = get_vm_mut(vm) {
        vm.return_null();
    }
}

/// Return a copy of `text` as a string.
///
/// # Arguments
/// - `text`: String data
/// - `length`: Length in bytes, or -1 to read up to the first NUL
///
/// A null `text` returns null. Any other negative length is a contract
/// violation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wrenReturnString(vm: *mut WrenVM, text: *const c_char, length: c_int) {
    let Some(vm) = get_vm_mut(vm) else {
        return;
    };
    if text.is_null() {
        vm.return_null();
        return;
    }
    let bytes = match usize::try_from(length) {
        Ok(length) => std::slice::from_raw_parts(text as *const u8, length),
        Err(_) if length == -1 => std::slice::from_raw_parts(text as *const u8, libc::strlen(text)),
        Err(_) => {
            vm.violate(ContractViolation::InvalidLength {
                length: length as i64,
            });
            return;
        }
    };
    vm.return_bytes(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;
    use crate::ffi::call::wrenDefineStaticMethod;
    use crate::ffi::types::WrenInterpretResult;
    use crate::ffi::vm_ffi::{get_vm, wrenFreeVM, wrenInterpret, wrenNewVM};
    use crate::vm::{ContractViolation, Value};

    unsafe extern "C" fn greet(vm: *mut WrenVM) {
        let name = CStr::from_ptr(wrenGetArgumentString(vm, 1)).to_string_lossy().into_owned();
        let greeting = format!("hello, {}", name);
        wrenReturnString(vm, greeting.as_ptr() as *const c_char, greeting.len() as c_int);
    }

    unsafe extern "C" fn prefix(vm: *mut WrenVM) {
        wrenReturnString(vm, c"abcdef".as_ptr(), 3);
    }

    unsafe extern "C" fn terminated(vm: *mut WrenVM) {
        wrenReturnString(vm, c"whole".as_ptr(), -1);
    }

    unsafe extern "C" fn bad_length(vm: *mut WrenVM) {
        wrenReturnString(vm, c"text".as_ptr(), -2);
    }

    unsafe extern "C" fn negate(vm: *mut WrenVM) {
        let b = wrenGetArgumentBool(vm, 1);
        wrenReturnBool(vm, !b);
    }

    unsafe extern "C" fn not_a_string(vm: *mut WrenVM) {
        let ptr = wrenGetArgumentString(vm, 1);
        wrenReturnBool(vm, ptr.is_null());
    }

    unsafe extern "C" fn twice(vm: *mut WrenVM) {
        wrenReturnNull(vm);
        wrenReturnNull(vm);
    }

    unsafe fn run(
        source: &CStr,
        name: &CStr,
        arity: usize,
        f: unsafe extern "C" fn(*mut WrenVM),
    ) -> (*mut WrenVM, WrenInterpretResult) {
        let vm = wrenNewVM(std::ptr::null());
        wrenDefineStaticMethod(vm, c"Host".as_ptr(), name.as_ptr(), arity, Some(f));
        let result = wrenInterpret(vm, c"main".as_ptr(), source.as_ptr());
        (vm, result)
    }

    #[test]
    fn test_string_argument_and_return() {
        unsafe {
            let (vm, result) = run(c"var r = Host.greet(\"wren\")", c"greet", 1, greet);
            assert_eq!(result, WrenInterpretResult::Success);
            let vm_ref = get_vm(vm).unwrap();
            let r = vm_ref.get_variable("r").unwrap();
            assert_eq!(vm_ref.string_value(r).as_deref(), Some("hello, wren"));
            wrenFreeVM(vm);
        }
    }

    #[test]
    fn test_return_string_respects_length() {
        unsafe {
            let (vm, result) = run(c"var r = Host.prefix", c"prefix", 0, prefix);
            assert_eq!(result, WrenInterpretResult::Success);
            let vm_ref = get_vm(vm).unwrap();
            let r = vm_ref.get_variable("r").unwrap();
            assert_eq!(vm_ref.string_value(r).as_deref(), Some("abc"));
            wrenFreeVM(vm);
        }
    }

    #[test]
    fn test_return_string_minus_one_reads_to_nul() {
        unsafe {
            let (vm, result) = run(c"var r = Host.whole", c"whole", 0, terminated);
            assert_eq!(result, WrenInterpretResult::Success);
            let vm_ref = get_vm(vm).unwrap();
            let r = vm_ref.get_variable("r").unwrap();
            assert_eq!(vm_ref.string_value(r).as_deref(), Some("whole"));
            wrenFreeVM(vm);
        }
    }

    #[test]
    fn test_return_string_other_negative_length_is_violation() {
        unsafe {
            let (vm, result) = run(c"var r = Host.bad", c"bad", 0, bad_length);
            assert_eq!(result, WrenInterpretResult::RuntimeError);
            assert_eq!(
                get_vm(vm).unwrap().last_contract_violation(),
                Some(&ContractViolation::InvalidLength { length: -2 })
            );
            wrenFreeVM(vm);
        }
    }

    #[test]
    fn test_bool_round_trip() {
        unsafe {
            let (vm, result) = run(c"var r = Host.negate(false)", c"negate", 1, negate);
            assert_eq!(result, WrenInterpretResult::Success);
            assert_eq!(get_vm(vm).unwrap().get_variable("r"), Some(Value::Bool(true)));
            wrenFreeVM(vm);
        }
    }

    #[test]
    fn test_non_string_argument_reads_null() {
        unsafe {
            let (vm, result) = run(c"var r = Host.check(12)", c"check", 1, not_a_string);
            assert_eq!(result, WrenInterpretResult::Success);
            assert_eq!(get_vm(vm).unwrap().get_variable("r"), Some(Value::Bool(true)));
            wrenFreeVM(vm);
        }
    }

    #[test]
    fn test_double_return_aborts() {
        unsafe {
            let (vm, result) = run(c"Host.twice", c"twice", 0, twice);
            assert_eq!(result, WrenInterpretResult::RuntimeError);
            assert_eq!(
                get_vm(vm).unwrap().last_contract_violation(),
                Some(&ContractViolation::DoubleReturn)
            );
            wrenFreeVM(vm);
        }
    }

    #[test]
    fn test_null_vm_reads_defaults() {
        unsafe {
            assert!(!wrenGetArgumentBool(std::ptr::null_mut(), 0));
            assert_eq!(wrenGetArgumentDouble(std::ptr::null_mut(), 0), 0.0);
            assert!(wrenGetArgumentString(std::ptr::null_mut(), 0).is_null());
            wrenReturnNull(std::ptr::null_mut());
        }
    }
}
