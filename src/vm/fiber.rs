//! Fibers: independent value stacks and call-frame stacks.
//!
//! Control passes between fibers only through explicit `call`, `yield`,
//! `transfer` and `try`. The switching itself lives in the interpreter; this
//! module owns the per-fiber state.

use super::Value;
use super::heap::GcRef;

/// Smallest stack a fiber is created with.
const INITIAL_STACK_CAPACITY: usize = 16;

/// One active function invocation.
///
/// `stack_start` is an index rather than a pointer, so frames stay valid
/// when the stack buffer is reallocated.
#[derive(Debug, Clone, Copy)]
pub struct CallFrame {
    pub ip: usize,
    pub closure: GcRef,
    pub stack_start: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiberState {
    Running,
    Suspended,
    Done,
    Failed,
}

/// How a fiber was last entered. A fiber entered with `try` hands its
/// runtime errors to its caller instead of propagating them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunSource {
    Root,
    Other,
    Try,
}

#[derive(Debug)]
pub struct ObjFiber {
    pub stack: Vec<Value>,
    stack_capacity: usize,
    pub frames: Vec<CallFrame>,
    /// Open upvalues as `(slot, upvalue)`, sorted by slot.
    pub open_upvalues: Vec<(usize, GcRef)>,
    /// The fiber that resumes when this one returns or yields.
    pub caller: Option<GcRef>,
    /// Error value once the fiber has failed, null otherwise.
    pub error: Value,
    pub state: FiberState,
    pub run_source: RunSource,
}

impl ObjFiber {
    /// A suspended fiber that will run `closure` from its first instruction.
    pub fn new(closure: GcRef, max_slots: usize) -> Self {
        let stack_capacity = (max_slots + 1)
            .next_power_of_two()
            .max(INITIAL_STACK_CAPACITY);
        let mut stack = Vec::with_capacity(stack_capacity);
        stack.push(Value::Obj(closure));
        Self {
            stack,
            stack_capacity,
            frames: vec![CallFrame {
                ip: 0,
                closure,
                stack_start: 0,
            }],
            open_upvalues: Vec::new(),
            caller: None,
            error: Value::Null,
            state: FiberState::Suspended,
            run_source: RunSource::Other,
        }
    }

    pub fn stack_capacity(&self) -> usize {
        self.stack_capacity
    }

    /// Grow the stack by doubling until it holds `needed` slots.
    /// Returns the new capacity if it changed.
    pub fn ensure_stack(&mut self, needed: usize) -> Option<usize> {
        if needed <= self.stack_capacity {
            return None;
        }
        let mut capacity = self.stack_capacity;
        while capacity < needed {
            capacity *= 2;
        }
        self.stack.reserve_exact(capacity - self.stack.len());
        self.stack_capacity = capacity;
        Some(capacity)
    }

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or(Value::Null)
    }

    /// Value `distance` slots below the top; 0 is the top.
    pub fn peek(&self, distance: usize) -> Value {
        self.stack
            .len()
            .checked_sub(distance + 1)
            .map(|i| self.stack[i])
            .unwrap_or(Value::Null)
    }

    /// Overwrite the top slot; used to deliver a resume value.
    pub fn set_top(&mut self, value: Value) {
        if let Some(top) = self.stack.last_mut() {
            *top = value;
        } else {
            self.stack.push(value);
        }
    }

    /// True until the first instruction of the entry function runs.
    pub fn is_fresh(&self) -> bool {
        self.frames.len() == 1 && self.frames[0].ip == 0
    }

    pub fn is_done(&self) -> bool {
        self.frames.is_empty() || matches!(self.state, FiberState::Done | FiberState::Failed)
    }

    pub(crate) fn trace(&self, out: &mut Vec<GcRef>) {
        for value in &self.stack {
            if let Value::Obj(r) = value {
                out.push(*r);
            }
        }
        out.extend(self.frames.iter().map(|frame| frame.closure));
        out.extend(self.open_upvalues.iter().map(|(_, upvalue)| *upvalue));
        out.extend(self.caller);
        if let Value::Obj(r) = self.error {
            out.push(r);
        }
    }
}
