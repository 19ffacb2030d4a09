//! The foreign-call boundary: argument slots and the single return value
//! of a host method.
//!
//! While a host method runs, its receiver and arguments sit in a slot
//! snapshot owned by the VM. The snapshot and any pending return value are
//! GC roots until the host method returns.

use std::ffi::c_char;

use crate::ffi::types::WrenVM;

use super::Value;
use super::class::ForeignMethod;
use super::error::{ContractViolation, VmError};
use super::interpreter::Interrupt;
use super::vm::Vm;

/// State of the host method currently executing.
#[derive(Debug, Default)]
pub(crate) struct ForeignCall {
    /// Receiver in slot 0, then the arguments.
    pub slots: Vec<Value>,
    pub returned: Option<Value>,
    /// First contract violation made during the call.
    pub violation: Option<ContractViolation>,
    /// An allocation failure while returning a value.
    pub error: Option<VmError>,
}

impl ForeignCall {
    fn new(slots: Vec<Value>) -> Self {
        Self {
            slots,
            ..Default::default()
        }
    }
}

impl Vm {
    /// Run a host method over `slots` and collect its return value.
    pub(crate) fn call_foreign(&mut self, method: ForeignMethod, slots: Vec<Value>) -> Result<Value, Interrupt> {
        self.foreign = Some(ForeignCall::new(slots));
        match method {
            ForeignMethod::Rust(f) => f(self),
            ForeignMethod::C(f) => unsafe { f(self as *mut Vm as *mut WrenVM) },
        }
        let call = self.foreign.take().unwrap_or_default();

        if let Some(violation) = call.violation {
            return Err(self.interrupt(VmError::ContractViolation(violation)));
        }
        if let Some(error) = call.error {
            return Err(self.interrupt(error));
        }
        Ok(call.returned.unwrap_or(Value::Null))
    }

    /// Record a misuse of the foreign-call API.
    pub(crate) fn violate(&mut self, violation: ContractViolation) {
        log::error!("host contract violation: {}", violation);
        if let Some(call) = self.foreign.as_mut()
            && call.violation.is_none()
        {
            call.violation = Some(violation.clone());
        }
        self.last_violation = Some(violation);
    }

    /// Number of slots in the current foreign call, or 0 outside one.
    pub fn slot_count(&self) -> usize {
        self.foreign.as_ref().map_or(0, |call| call.slots.len())
    }

    /// Value in slot `index`, or `None` after recording a violation.
    pub(crate) fn slot(&mut self, index: i64) -> Option<Value> {
        let violation = match &self.foreign {
            None => ContractViolation::NoForeignCall,
            Some(call) if call.returned.is_some() => ContractViolation::ReadAfterReturn { index },
            Some(call) => match usize::try_from(index).ok().and_then(|i| call.slots.get(i)) {
                Some(value) => return Some(*value),
                None => ContractViolation::InvalidSlot {
                    index,
                    count: call.slots.len(),
                },
            },
        };
        self.violate(violation);
        None
    }

    /// Slot `index` as a bool; anything but `true` reads as `false`.
    pub fn get_argument_bool(&mut self, index: usize) -> bool {
        matches!(self.slot(index as i64), Some(Value::Bool(true)))
    }

    /// Slot `index` as a number; non-numbers read as `0.0`.
    pub fn get_argument_double(&mut self, index: usize) -> f64 {
        self.slot(index as i64).and_then(|v| v.as_num()).unwrap_or(0.0)
    }

    /// Slot `index` as a string; non-strings read as `None`.
    pub fn get_argument_string(&mut self, index: usize) -> Option<String> {
        let value = self.slot(index as i64)?;
        self.string_value(value)
    }

    /// Raw bytes of a string slot, embedded NULs included.
    pub fn get_argument_bytes(&mut self, index: usize) -> Option<Vec<u8>> {
        let r = self.slot(index as i64)?.as_obj()?;
        self.heap.try_string(r).map(|s| s.as_bytes().to_vec())
    }

    /// NUL-terminated view of a string slot for C callers. The pointer
    /// stays valid until the foreign method returns.
    pub(crate) fn argument_c_string(&mut self, index: i64) -> *const c_char {
        let Some(r) = self.slot(index).and_then(|v| v.as_obj()) else {
            return std::ptr::null();
        };
        match self.heap.try_string(r) {
            Some(s) => s.as_bytes_with_nul().as_ptr() as *const c_char,
            None => std::ptr::null(),
        }
    }

    /// Whether a return is allowed now; records a violation if not.
    fn begin_return(&mut self) -> bool {
        let violation = match &self.foreign {
            None => ContractViolation::NoForeignCall,
            Some(call) if call.returned.is_some() => ContractViolation::DoubleReturn,
            Some(_) => return true,
        };
        self.violate(violation);
        false
    }

    fn finish_return(&mut self, value: Value) {
        if let Some(call) = self.foreign.as_mut() {
            call.returned = Some(value);
        }
    }

    pub fn return_bool(&mut self, value: bool) {
        if self.begin_return() {
            self.finish_return(Value::Bool(value));
        }
    }

    pub fn return_double(&mut self, value: f64) {
        if self.begin_return() {
            self.finish_return(Value::Num(value));
        }
    }

    pub fn return_null(&mut self) {
        if self.begin_return() {
            self.finish_return(Value::Null);
        }
    }

    pub fn return_string(&mut self, text: &str) {
        self.return_bytes(text.as_bytes());
    }

    /// Return a string copied from `bytes` into VM memory.
    pub fn return_bytes(&mut self, bytes: &[u8]) {
        if !self.begin_return() {
            return;
        }
        match self.new_string_bytes(bytes) {
            Ok(r) => self.finish_return(Value::Obj(r)),
            Err(error) => {
                self.finish_return(Value::Null);
                if let Some(call) = self.foreign.as_mut() {
                    call.error = Some(error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Configuration;
    use crate::vm::{ContractViolation, InterpretResult, Value, Vm};

    fn vm() -> Vm {
        Vm::new(Configuration::default()).unwrap()
    }

    fn add(vm: &mut Vm) {
        let a = vm.get_argument_double(1);
        let b = vm.get_argument_double(2);
        vm.return_double(a + b);
    }

    fn silent(_: &mut Vm) {}

    fn twice(vm: &mut Vm) {
        vm.return_bool(true);
        vm.return_bool(false);
    }

    fn read_after_return(vm: &mut Vm) {
        vm.return_null();
        vm.get_argument_double(0);
    }

    fn bad_slot(vm: &mut Vm) {
        vm.get_argument_double(5);
    }

    fn lenient(vm: &mut Vm) {
        let b = vm.get_argument_bool(1);
        let d = vm.get_argument_double(2);
        let s = vm.get_argument_string(1);
        vm.return_bool(!b && d == 0.0 && s.is_none());
    }

    fn nul_bytes(vm: &mut Vm) {
        vm.return_bytes(b"a\0b");
    }

    fn byte_length(vm: &mut Vm) {
        let bytes = vm.get_argument_bytes(1);
        vm.return_double(bytes.map_or(-1.0, |b| b.len() as f64));
    }

    fn collect_then_read(vm: &mut Vm) {
        vm.collect_garbage();
        let text = vm.get_argument_string(1).unwrap_or_default();
        vm.return_string(&text.to_uppercase());
    }

    #[test]
    fn test_foreign_static_method_returns_value() {
        let mut vm = vm();
        vm.define_static_method("Math", "add", 2, add).unwrap();
        assert_eq!(vm.interpret("main", "var r = Math.add(1, 2)"), InterpretResult::Success);
        assert_eq!(vm.get_variable("r"), Some(Value::Num(3.0)));
    }

    #[test]
    fn test_no_return_yields_null() {
        let mut vm = vm();
        vm.define_static_method("Host", "silent", 0, silent).unwrap();
        assert_eq!(vm.interpret("main", "var r = Host.silent"), InterpretResult::Success);
        assert_eq!(vm.get_variable("r"), Some(Value::Null));
    }

    #[test]
    fn test_double_return_is_violation() {
        let mut vm = vm();
        vm.define_static_method("Host", "twice", 0, twice).unwrap();
        assert_eq!(vm.interpret("main", "Host.twice"), InterpretResult::RuntimeError);
        assert_eq!(vm.last_contract_violation(), Some(&ContractViolation::DoubleReturn));
    }

    #[test]
    fn test_read_after_return_is_violation() {
        let mut vm = vm();
        vm.define_static_method("Host", "late", 0, read_after_return).unwrap();
        assert_eq!(vm.interpret("main", "Host.late"), InterpretResult::RuntimeError);
        assert_eq!(
            vm.last_contract_violation(),
            Some(&ContractViolation::ReadAfterReturn { index: 0 })
        );
    }

    #[test]
    fn test_invalid_slot_is_violation() {
        let mut vm = vm();
        vm.define_static_method("Host", "bad", 0, bad_slot).unwrap();
        assert_eq!(vm.interpret("main", "Host.bad"), InterpretResult::RuntimeError);
        assert_eq!(
            vm.last_contract_violation(),
            Some(&ContractViolation::InvalidSlot { index: 5, count: 1 })
        );
    }

    #[test]
    fn test_violation_is_not_caught_by_try() {
        let mut vm = vm();
        vm.define_static_method("Host", "twice", 0, twice).unwrap();
        let source = "var f = Fiber.new { Host.twice }\nvar e = f.try()";
        assert_eq!(vm.interpret("main", source), InterpretResult::RuntimeError);
    }

    #[test]
    fn test_type_mismatch_reads_defaults() {
        let mut vm = vm();
        vm.define_static_method("Host", "lenient", 2, lenient).unwrap();
        assert_eq!(
            vm.interpret("main", "var r = Host.lenient(1, \"text\")"),
            InterpretResult::Success
        );
        assert_eq!(vm.get_variable("r"), Some(Value::Bool(true)));
        assert_eq!(vm.last_contract_violation(), None);
    }

    #[test]
    fn test_returned_bytes_keep_embedded_nul() {
        let mut vm = vm();
        vm.define_static_method("Host", "bytes", 0, nul_bytes).unwrap();
        assert_eq!(
            vm.interpret("main", "var n = Host.bytes.count"),
            InterpretResult::Success
        );
        assert_eq!(vm.get_variable("n"), Some(Value::Num(3.0)));
    }

    #[test]
    fn test_argument_bytes_keep_embedded_nul() {
        let mut vm = vm();
        vm.define_static_method("Host", "bytes", 0, nul_bytes).unwrap();
        vm.define_static_method("Host", "length", 1, byte_length).unwrap();
        assert_eq!(
            vm.interpret("main", "var n = Host.length(Host.bytes)\nvar m = Host.length(7)"),
            InterpretResult::Success
        );
        assert_eq!(vm.get_variable("n"), Some(Value::Num(3.0)));
        assert_eq!(vm.get_variable("m"), Some(Value::Num(-1.0)));
    }

    #[test]
    fn test_slots_survive_collection_during_call() {
        let mut vm = vm();
        vm.define_static_method("Host", "shout", 1, collect_then_read).unwrap();
        assert_eq!(
            vm.interpret("main", "var r = Host.shout(\"a\" + \"b\")"),
            InterpretResult::Success
        );
        let r = vm.get_variable("r").unwrap();
        assert_eq!(vm.string_value(r).as_deref(), Some("AB"));
    }

    #[test]
    fn test_api_outside_foreign_call_is_ignored() {
        let mut vm = vm();
        assert!(!vm.get_argument_bool(0));
        vm.return_double(1.0);
        assert_eq!(vm.slot_count(), 0);
        assert_eq!(vm.last_contract_violation(), Some(&ContractViolation::NoForeignCall));
    }
}
