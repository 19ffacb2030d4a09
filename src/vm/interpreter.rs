//! The bytecode interpreter: the dispatch loop, method calls, upvalues and
//! switching between fibers.

use super::Value;
use super::class::{Method, Outcome, find_method};
use super::error::VmError;
use super::fiber::{CallFrame, FiberState, RunSource};
use super::heap::GcRef;
use super::object::{ObjUpvalue, Object, ObjectType};
use super::ops::Op;
use super::vm::{CORE_MODULE, InterpretResult, Vm};

/// Calls nested deeper than this raise a runtime error.
const MAX_CALL_DEPTH: usize = 65_536;

/// Most fields an instance may have, inherited ones included.
const MAX_FIELDS: usize = 255;

/// Why the current instruction stopped the fiber.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Interrupt {
    /// A runtime error. A fiber entered with `try` hands it to its caller.
    Error(Value),
    /// An error no fiber can catch, such as a host contract violation.
    Fatal(Value),
}

/// How one fiber enters another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FiberRun {
    Call,
    Try,
    Transfer,
}

impl Vm {
    /// Run until no fiber is current.
    pub(crate) fn run_interpreter(&mut self) -> InterpretResult {
        while let Some(fiber) = self.fiber {
            if let Err(interrupt) = self.step(fiber)
                && !self.handle_interrupt(interrupt)
            {
                return InterpretResult::RuntimeError;
            }
        }
        InterpretResult::Success
    }

    /// Execute one instruction of `fiber`.
    fn step(&mut self, fiber: GcRef) -> Result<(), Interrupt> {
        let (ip, closure, base) = match self.heap.fiber_mut(fiber).frames.last_mut() {
            Some(frame) => {
                frame.ip += 1;
                (frame.ip - 1, frame.closure, frame.stack_start)
            }
            None => {
                self.fiber = None;
                return Ok(());
            }
        };
        let function = self.heap.closure(closure).function;
        let op = self.heap.func(function).code[ip];

        match op {
            Op::Constant(index) => {
                let value = self.heap.func(function).constants[index];
                self.push(fiber, value);
            }
            Op::Null => self.push(fiber, Value::Null),
            Op::False => self.push(fiber, Value::Bool(false)),
            Op::True => self.push(fiber, Value::Bool(true)),

            Op::LoadLocal(slot) => {
                let value = self.heap.fiber(fiber).stack[base + slot];
                self.push(fiber, value);
            }
            Op::StoreLocal(slot) => {
                let f = self.heap.fiber_mut(fiber);
                let value = f.peek(0);
                f.stack[base + slot] = value;
            }
            Op::LoadUpvalue(index) => {
                let upvalue = self.heap.closure(closure).upvalues[index];
                let value = self.read_upvalue(upvalue);
                self.push(fiber, value);
            }
            Op::StoreUpvalue(index) => {
                let upvalue = self.heap.closure(closure).upvalues[index];
                let value = self.heap.fiber(fiber).peek(0);
                self.write_upvalue(upvalue, value);
            }
            Op::LoadModuleVar(slot) => {
                let value = self.module.get(slot);
                self.push(fiber, value);
            }
            Op::StoreModuleVar(slot) => {
                let value = self.heap.fiber(fiber).peek(0);
                self.module.set(slot, value);
            }
            Op::LoadFieldThis(index) => {
                let receiver = self.heap.fiber(fiber).stack[base];
                let value = self.field(receiver, index)?;
                self.push(fiber, value);
            }
            Op::StoreFieldThis(index) => {
                let receiver = self.heap.fiber(fiber).stack[base];
                let value = self.heap.fiber(fiber).peek(0);
                self.set_field(receiver, index, value)?;
            }
            Op::LoadField(index) => {
                let instance = self.pop(fiber);
                let value = self.field(instance, index)?;
                self.push(fiber, value);
            }
            Op::StoreField(index) => {
                let instance = self.pop(fiber);
                let value = self.heap.fiber(fiber).peek(0);
                self.set_field(instance, index, value)?;
            }

            Op::Pop => {
                self.pop(fiber);
            }
            Op::CloseUpvalue => {
                let top = self.heap.fiber(fiber).stack.len() - 1;
                self.close_upvalues(fiber, top);
                self.pop(fiber);
            }

            Op::Jump(target) | Op::Loop(target) => self.jump(fiber, target),
            Op::JumpIfFalse(target) => {
                if self.pop(fiber).is_falsey() {
                    self.jump(fiber, target);
                }
            }
            Op::And(target) => {
                if self.heap.fiber(fiber).peek(0).is_falsey() {
                    self.jump(fiber, target);
                } else {
                    self.pop(fiber);
                }
            }
            Op::Or(target) => {
                if self.heap.fiber(fiber).peek(0).is_truthy() {
                    self.jump(fiber, target);
                } else {
                    self.pop(fiber);
                }
            }

            Op::Call { symbol, arity } => {
                let receiver = self.heap.fiber(fiber).peek(arity);
                let class = self.class_of_value(receiver);
                self.dispatch(fiber, class, symbol, arity)?;
            }
            Op::Super { symbol, arity } => {
                let superclass = self
                    .heap
                    .func(function)
                    .bound_class
                    .and_then(|class| self.heap.class(class).superclass);
                match superclass {
                    Some(class) => self.dispatch(fiber, class, symbol, arity)?,
                    None => return Err(self.runtime_message("Cannot call super here.")),
                }
            }
            Op::Return => self.return_from(fiber),

            Op::Closure(index) => self.make_closure(fiber, closure, function, index, base)?,
            Op::Construct => {
                let receiver = self.heap.fiber(fiber).stack[base];
                let Some(class) = receiver
                    .as_obj()
                    .filter(|&r| self.heap.object_type(r) == ObjectType::Class)
                else {
                    return Err(self.runtime_message("Only classes can be constructed."));
                };
                let instance = self.new_instance(class).map_err(|e| self.interrupt(e))?;
                self.heap.fiber_mut(fiber).stack[base] = Value::Obj(instance);
            }
            Op::Class { num_fields } => self.create_class(fiber, num_fields)?,
            Op::MethodInstance(symbol) => self.bind_method(fiber, symbol, false)?,
            Op::MethodStatic(symbol) => self.bind_method(fiber, symbol, true)?,
            Op::EndModule => {}
        }
        Ok(())
    }

    // ========================================================================
    // Stack helpers
    // ========================================================================

    fn push(&mut self, fiber: GcRef, value: Value) {
        self.heap.fiber_mut(fiber).push(value);
    }

    fn pop(&mut self, fiber: GcRef) -> Value {
        self.heap.fiber_mut(fiber).pop()
    }

    fn jump(&mut self, fiber: GcRef, target: usize) {
        if let Some(frame) = self.heap.fiber_mut(fiber).frames.last_mut() {
            frame.ip = target;
        }
    }

    fn field(&mut self, instance: Value, index: usize) -> Result<Value, Interrupt> {
        if let Some(instance) = instance.as_obj().and_then(|r| self.heap.try_instance(r)) {
            return Ok(instance.fields.get(index).copied().unwrap_or(Value::Null));
        }
        Err(self.runtime_message("Only instances have fields."))
    }

    fn set_field(&mut self, instance: Value, index: usize, value: Value) -> Result<(), Interrupt> {
        let Some(r) = instance
            .as_obj()
            .filter(|&r| self.heap.object_type(r) == ObjectType::Instance)
        else {
            return Err(self.runtime_message("Only instances have fields."));
        };
        if let Some(slot) = self.heap.instance_mut(r).fields.get_mut(index) {
            *slot = value;
        }
        Ok(())
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Call the method for `symbol` on the receiver `arity` slots below the
    /// top, starting the lookup at `class`.
    fn dispatch(&mut self, fiber: GcRef, class: GcRef, symbol: usize, arity: usize) -> Result<(), Interrupt> {
        if let Some(method) = find_method(&self.heap, class, symbol) {
            return self.invoke(fiber, method, arity);
        }

        if let Some(handler) = find_method(&self.heap, class, self.dnu_symbol) {
            self.forward_to_handler(fiber, symbol, arity)
                .map_err(|e| self.interrupt(e))?;
            return self.invoke(fiber, handler, 2);
        }

        let message = format!(
            "{} does not implement '{}'.",
            self.class_name(class),
            self.symbols.name(symbol)
        );
        Err(self.runtime_message(&message))
    }

    /// Rewrite `[receiver, args...]` as `[receiver, signature, [args]]` for
    /// `doesNotUnderstand(_,_)`.
    fn forward_to_handler(&mut self, fiber: GcRef, symbol: usize, arity: usize) -> Result<(), VmError> {
        let signature = self.symbols.name(symbol).to_string();
        let name = self.new_string(&signature)?;
        self.heap.push_root(name);
        let len = self.heap.fiber(fiber).stack.len();
        let args = self.heap.fiber(fiber).stack[len - arity..].to_vec();
        let list = self.new_list(args);
        self.heap.pop_root();
        let list = list?;

        let f = self.heap.fiber_mut(fiber);
        f.stack.truncate(len - arity);
        f.push(Value::Obj(name));
        f.push(Value::Obj(list));
        Ok(())
    }

    fn invoke(&mut self, fiber: GcRef, method: Method, arity: usize) -> Result<(), Interrupt> {
        match method {
            Method::Primitive(primitive) => {
                let start = self.heap.fiber(fiber).stack.len() - arity - 1;
                let args = self.heap.fiber(fiber).stack[start..].to_vec();
                match primitive(self, &args) {
                    Ok(Outcome::Value(value)) => {
                        let f = self.heap.fiber_mut(fiber);
                        f.stack.truncate(start);
                        f.push(value);
                        Ok(())
                    }
                    Ok(Outcome::Error(error)) => Err(Interrupt::Error(error)),
                    Ok(Outcome::FiberSwitch) => Ok(()),
                    Ok(Outcome::RunClosure(closure)) => self.call_closure(fiber, closure, arity),
                    Err(e) => Err(self.interrupt(e)),
                }
            }
            Method::Foreign(foreign) => {
                let start = self.heap.fiber(fiber).stack.len() - arity - 1;
                let args = self.heap.fiber(fiber).stack[start..].to_vec();
                let value = self.call_foreign(foreign, args)?;
                let f = self.heap.fiber_mut(fiber);
                f.stack.truncate(start);
                f.push(value);
                Ok(())
            }
            Method::Block(closure) => self.call_closure(fiber, closure, arity),
            Method::None => Err(self.runtime_message("Method is not defined.")),
        }
    }

    /// Push a frame for `closure` over the receiver and `arity` arguments on
    /// top of the stack. Extra arguments are dropped.
    pub(crate) fn call_closure(&mut self, fiber: GcRef, closure: GcRef, arity: usize) -> Result<(), Interrupt> {
        let function = self.heap.closure(closure).function;
        let (expected, max_slots) = {
            let f = self.heap.func(function);
            (f.arity, f.max_slots)
        };
        if arity < expected {
            return Err(self.runtime_message("Function expects more arguments."));
        }
        if self.heap.fiber(fiber).frames.len() >= MAX_CALL_DEPTH {
            return Err(self.runtime_message("Stack overflow."));
        }

        let f = self.heap.fiber_mut(fiber);
        let stack_start = f.stack.len() - arity - 1;
        f.stack.truncate(stack_start + expected + 1);
        let grew = f.ensure_stack(stack_start + max_slots + 1).is_some();
        f.frames.push(CallFrame {
            ip: 0,
            closure,
            stack_start,
        });
        if grew {
            log::trace!("fiber {} stack grew to {}", fiber.index(), f.stack_capacity());
            self.grow(fiber).map_err(|e| self.interrupt(e))?;
        }
        Ok(())
    }

    fn return_from(&mut self, fiber: GcRef) {
        let result = self.pop(fiber);
        let Some(frame) = self.heap.fiber_mut(fiber).frames.pop() else {
            return;
        };
        self.close_upvalues(fiber, frame.stack_start);

        let f = self.heap.fiber_mut(fiber);
        if !f.frames.is_empty() {
            f.stack.truncate(frame.stack_start);
            f.push(result);
            return;
        }

        // The fiber's entry function returned.
        f.stack.clear();
        f.state = FiberState::Done;
        let caller = f.caller.take();
        self.resume(caller, result);
    }

    /// Make `fiber` current and deliver `value` into its waiting slot.
    fn resume(&mut self, fiber: Option<GcRef>, value: Value) {
        self.fiber = fiber;
        if let Some(fiber) = fiber {
            let f = self.heap.fiber_mut(fiber);
            f.state = FiberState::Running;
            f.set_top(value);
        }
    }

    // ========================================================================
    // Closures and upvalues
    // ========================================================================

    fn make_closure(
        &mut self,
        fiber: GcRef,
        enclosing: GcRef,
        function: GcRef,
        index: usize,
        base: usize,
    ) -> Result<(), Interrupt> {
        let Some(proto) = self.heap.func(function).constants[index].as_obj() else {
            return Err(self.runtime_message("Closure constant is not a function."));
        };
        let descs = self.heap.func(proto).upvalues.clone();
        let closure = self
            .new_closure(proto, descs.len())
            .map_err(|e| self.interrupt(e))?;
        self.push(fiber, Value::Obj(closure));

        for desc in descs {
            let upvalue = if desc.is_local {
                self.capture_upvalue(fiber, base + desc.index)
                    .map_err(|e| self.interrupt(e))?
            } else {
                self.heap.closure(enclosing).upvalues[desc.index]
            };
            self.heap.closure_mut(closure).upvalues.push(upvalue);
        }
        Ok(())
    }

    /// The open upvalue for `slot`, creating it if needed. Two closures that
    /// capture the same variable share one upvalue.
    fn capture_upvalue(&mut self, fiber: GcRef, slot: usize) -> Result<GcRef, VmError> {
        let position = match self
            .heap
            .fiber(fiber)
            .open_upvalues
            .binary_search_by_key(&slot, |&(s, _)| s)
        {
            Ok(i) => return Ok(self.heap.fiber(fiber).open_upvalues[i].1),
            Err(i) => i,
        };
        let upvalue = self.allocate(None, Object::Upvalue(ObjUpvalue::Open { fiber, slot }))?;
        self.heap
            .fiber_mut(fiber)
            .open_upvalues
            .insert(position, (slot, upvalue));
        Ok(upvalue)
    }

    /// Close every open upvalue at or above `from`.
    pub(crate) fn close_upvalues(&mut self, fiber: GcRef, from: usize) {
        let f = self.heap.fiber_mut(fiber);
        let split = f.open_upvalues.partition_point(|&(slot, _)| slot < from);
        let closing = f.open_upvalues.split_off(split);
        for (slot, upvalue) in closing {
            let value = self
                .heap
                .fiber(fiber)
                .stack
                .get(slot)
                .copied()
                .unwrap_or(Value::Null);
            *self.heap.upvalue_mut(upvalue) = ObjUpvalue::Closed(value);
        }
    }

    fn read_upvalue(&self, upvalue: GcRef) -> Value {
        match *self.heap.upvalue(upvalue) {
            ObjUpvalue::Open { fiber, slot } => self
                .heap
                .fiber(fiber)
                .stack
                .get(slot)
                .copied()
                .unwrap_or(Value::Null),
            ObjUpvalue::Closed(value) => value,
        }
    }

    fn write_upvalue(&mut self, upvalue: GcRef, value: Value) {
        match *self.heap.upvalue(upvalue) {
            ObjUpvalue::Open { fiber, slot } => {
                if let Some(target) = self.heap.fiber_mut(fiber).stack.get_mut(slot) {
                    *target = value;
                }
            }
            ObjUpvalue::Closed(_) => {
                *self.heap.upvalue_mut(upvalue) = ObjUpvalue::Closed(value);
            }
        }
    }

    // ========================================================================
    // Classes
    // ========================================================================

    /// `[name, superclass]` → new class.
    fn create_class(&mut self, fiber: GcRef, own_fields: usize) -> Result<(), Interrupt> {
        let name_value = self.heap.fiber(fiber).peek(1);
        let superclass = self.heap.fiber(fiber).peek(0);
        let name = self.string_value(name_value).unwrap_or_default();

        let Some(superclass) = superclass
            .as_obj()
            .filter(|&r| self.heap.object_type(r) == ObjectType::Class)
        else {
            let message = format!("Class '{}' cannot inherit from a non-class object.", name);
            return Err(self.runtime_message(&message));
        };
        if self.heap.class(superclass).is_sealed {
            let message = format!(
                "Class '{}' cannot inherit from built-in class '{}'.",
                name,
                self.class_name(superclass)
            );
            return Err(self.runtime_message(&message));
        }
        if self.heap.class(superclass).num_fields + own_fields > MAX_FIELDS {
            let message = format!(
                "Class '{}' may not have more than {} fields, including inherited ones.",
                name, MAX_FIELDS
            );
            return Err(self.runtime_message(&message));
        }

        let class = self
            .new_class(&name, superclass, own_fields)
            .map_err(|e| self.interrupt(e))?;
        let f = self.heap.fiber_mut(fiber);
        f.pop();
        f.set_top(Value::Obj(class));
        Ok(())
    }

    /// `[class, closure]` → class, with the closure installed as a method.
    fn bind_method(&mut self, fiber: GcRef, symbol: usize, is_static: bool) -> Result<(), Interrupt> {
        let (Some(closure), Some(class)) = (
            self.heap.fiber(fiber).peek(0).as_obj(),
            self.heap.fiber(fiber).peek(1).as_obj(),
        ) else {
            return Err(self.runtime_message("Invalid method definition."));
        };

        let (target, field_offset) = if is_static {
            (self.heap.class_of(class).unwrap_or(class), 0)
        } else {
            let inherited = self
                .heap
                .class(class)
                .superclass
                .map_or(0, |superclass| self.heap.class(superclass).num_fields);
            (class, inherited)
        };

        let function = self.heap.closure(closure).function;
        self.bind_method_code(function, target, field_offset);
        self.heap
            .class_mut(target)
            .set_method(symbol, Method::Block(closure));
        self.grow(target).map_err(|e| self.interrupt(e))?;
        self.pop(fiber);
        Ok(())
    }

    /// Record the method's class and shift its field indices past the
    /// fields of its superclasses, in nested functions too.
    fn bind_method_code(&mut self, function: GcRef, class: GcRef, field_offset: usize) {
        let f = self.heap.func_mut(function);
        if f.fields_bound {
            return;
        }
        f.fields_bound = true;
        f.bound_class = Some(class);
        if field_offset > 0 {
            for op in f.code.iter_mut() {
                *op = op.with_field_offset(field_offset);
            }
        }

        let nested: Vec<GcRef> = f.constants.iter().filter_map(Value::as_obj).collect();
        for r in nested {
            if self.heap.object_type(r) == ObjectType::Fn {
                self.bind_method_code(r, class, field_offset);
            }
        }
    }

    // ========================================================================
    // Fibers
    // ========================================================================

    /// Switch from the current fiber into `target`. `args` are the
    /// primitive's receiver and optional value.
    pub(crate) fn run_fiber(&mut self, target: GcRef, args: &[Value], mode: FiberRun) -> Result<Outcome, VmError> {
        let Some(current) = self.fiber else {
            return Ok(Outcome::Value(Value::Null));
        };
        let value = args.get(1).copied().unwrap_or(Value::Null);
        let verb = if mode == FiberRun::Transfer {
            "transfer to"
        } else {
            "call"
        };

        let t = self.heap.fiber(target);
        if t.state == FiberState::Failed {
            return self.fail(&format!("Cannot {} an aborted fiber.", verb));
        }
        if t.is_done() {
            return self.fail(&format!("Cannot {} a finished fiber.", verb));
        }
        if mode == FiberRun::Transfer && target == current {
            return Ok(Outcome::Value(value));
        }
        if mode != FiberRun::Transfer && (t.caller.is_some() || self.in_caller_chain(current, target)) {
            return self.fail("Fiber has already been called.");
        }

        {
            let c = self.heap.fiber_mut(current);
            let len = c.stack.len();
            c.stack.truncate(len + 1 - args.len());
            c.state = FiberState::Suspended;
        }

        let entry_arity = {
            let t = self.heap.fiber(target);
            let closure = t.frames[0].closure;
            self.heap.func(self.heap.closure(closure).function).arity
        };
        let t = self.heap.fiber_mut(target);
        if mode != FiberRun::Transfer {
            t.caller = Some(current);
        }
        t.run_source = if mode == FiberRun::Try {
            RunSource::Try
        } else {
            RunSource::Other
        };
        t.state = FiberState::Running;
        if t.is_fresh() {
            if entry_arity == 1 {
                t.push(value);
            }
        } else {
            t.set_top(value);
        }

        log::debug!(
            "fiber {} -> {} ({:?})",
            current.index(),
            target.index(),
            mode
        );
        self.fiber = Some(target);
        Ok(Outcome::FiberSwitch)
    }

    fn in_caller_chain(&self, from: GcRef, target: GcRef) -> bool {
        let mut current = Some(from);
        while let Some(fiber) = current {
            if fiber == target {
                return true;
            }
            current = self.heap.fiber(fiber).caller;
        }
        false
    }

    /// Suspend the current fiber and hand `args[1]` to its caller. With no
    /// caller the VM stops running.
    pub(crate) fn yield_fiber(&mut self, args: &[Value]) -> Result<Outcome, VmError> {
        let Some(current) = self.fiber else {
            return Ok(Outcome::Value(Value::Null));
        };
        let value = args.get(1).copied().unwrap_or(Value::Null);
        let c = self.heap.fiber_mut(current);
        let len = c.stack.len();
        c.stack.truncate(len + 1 - args.len());
        c.state = FiberState::Suspended;
        let caller = c.caller.take();
        if caller.is_none() {
            log::debug!("fiber {} yielded with no caller", current.index());
        }
        self.resume(caller, value);
        Ok(Outcome::FiberSwitch)
    }

    /// Stop running fibers; `interpret` returns with the current fiber
    /// left suspended.
    pub(crate) fn suspend_fiber(&mut self, args: &[Value]) -> Result<Outcome, VmError> {
        if let Some(current) = self.fiber.take() {
            let c = self.heap.fiber_mut(current);
            let len = c.stack.len();
            c.stack.truncate(len + 1 - args.len());
            c.state = FiberState::Suspended;
        }
        Ok(Outcome::FiberSwitch)
    }

    // ========================================================================
    // Runtime errors
    // ========================================================================

    pub(crate) fn runtime_message(&mut self, message: &str) -> Interrupt {
        Interrupt::Error(self.error_value(message))
    }

    /// An error outcome for a primitive.
    pub(crate) fn fail(&mut self, message: &str) -> Result<Outcome, VmError> {
        Ok(Outcome::Error(self.error_value(message)))
    }

    pub(crate) fn interrupt(&mut self, error: VmError) -> Interrupt {
        match error {
            VmError::OutOfMemory => Interrupt::Error(Value::Obj(self.oom_message)),
            VmError::ContractViolation(violation) => {
                let message = VmError::ContractViolation(violation).to_string();
                Interrupt::Fatal(self.error_value(&message))
            }
            VmError::Host(message) => Interrupt::Error(self.error_value(&message)),
        }
    }

    /// Fail the current fiber and unwind to the nearest `try`. Returns
    /// false if nothing caught the error; it has then been reported.
    fn handle_interrupt(&mut self, interrupt: Interrupt) -> bool {
        let (error, catchable) = match interrupt {
            Interrupt::Error(error) => (error, true),
            Interrupt::Fatal(error) => (error, false),
        };
        let Some(failing) = self.fiber else {
            return false;
        };
        let trace = self.stack_trace(failing);

        let mut current = failing;
        loop {
            self.close_upvalues(current, 0);
            let f = self.heap.fiber_mut(current);
            f.error = error;
            f.state = FiberState::Failed;
            f.frames.clear();
            f.stack.clear();
            let caller = f.caller.take();
            let source = f.run_source;

            match caller {
                Some(caller) if catchable && source == RunSource::Try => {
                    log::debug!("error in fiber {} caught by try", current.index());
                    self.resume(Some(caller), error);
                    return true;
                }
                Some(caller) => current = caller,
                None => break,
            }
        }

        self.fiber = None;
        self.report_runtime_error(error, &trace);
        false
    }

    /// `(module, line, function)` for each frame of `fiber`, innermost
    /// first. Core library frames and frames of unnamed modules are skipped.
    fn stack_trace(&self, fiber: GcRef) -> Vec<(String, u32, String)> {
        self.heap
            .fiber(fiber)
            .frames
            .iter()
            .rev()
            .filter_map(|frame| {
                let function = self.heap.func(self.heap.closure(frame.closure).function);
                if function.module == CORE_MODULE || function.module.is_empty() {
                    return None;
                }
                Some((
                    function.module.clone(),
                    function.line_at(frame.ip.saturating_sub(1)),
                    function.name.clone(),
                ))
            })
            .collect()
    }
}
