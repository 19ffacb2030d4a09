//! Foreign method registration FFI functions.

#![allow(unsafe_op_in_unsafe_fn)]
#![allow(clippy::missing_safety_doc)]

use std::ffi::{CStr, c_char};

use super::types::{WrenForeignMethodFn, WrenVM};
use super::vm_ffi::get_vm_mut;
use crate::vm::ForeignMethod;

unsafe fn define(
    vm: *mut WrenVM,
    class_name: *const c_char,
    name: *const c_char,
    arity: usize,
    method: Option<WrenForeignMethodFn>,
    is_static: bool,
) {
    let Some(vm) = get_vm_mut(vm) else {
        return;
    };
    let Some(method) = method else {
        vm.set_last_error("method is null");
        return;
    };
    if class_name.is_null() || name.is_null() {
        vm.set_last_error("class or method name is null");
        return;
    }

    let class_name = CStr::from_ptr(class_name).to_string_lossy();
    let name = CStr::from_ptr(name).to_string_lossy();
    if let Err(e) = vm.define_foreign(&class_name, &name, arity, ForeignMethod::C(method), is_static) {
        vm.set_last_error(&e.to_string());
    }
}

/// Bind a host function as an instance method of `class_name`.
///
/// The class is created if no module variable of that name exists yet.
/// `name` is either a plain method name, combined with `arity` into a
/// signature, or a full signature such as `"[_]"` or `"name=(_)"`.
///
/// # Arguments
/// - `vm`: Valid VM instance
/// - `class_name`: Class name (null-terminated)
/// - `name`: Method name or signature (null-terminated)
/// - `arity`: Number of arguments the method takes
/// - `method`: Host function
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wrenDefineMethod(
    vm: *mut WrenVM,
    class_name: *const c_char,
    name: *const c_char,
    arity: usize,
    method: Option<WrenForeignMethodFn>,
) {
    define(vm, class_name, name, arity, method, false);
}

/// Bind a host function as a static method of `class_name`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wrenDefineStaticMethod(
    vm: *mut WrenVM,
    class_name: *const c_char,
    name: *const c_char,
    arity: usize,
    method: Option<WrenForeignMethodFn>,
) {
    define(vm, class_name, name, arity, method, true);
}
