/// Bytecode operations.
///
/// The VM is stack based. Method calls name their target by a global symbol
/// (an index into the VM's method-signature table) and an argument count;
/// the receiver sits below the arguments on the stack.
///
/// Jump operands are absolute instruction indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    // ========================================
    // Constants
    // ========================================
    Constant(usize),
    Null,
    False,
    True,

    // ========================================
    // Variables
    // ========================================
    LoadLocal(usize),
    StoreLocal(usize),
    LoadUpvalue(usize),
    StoreUpvalue(usize),
    LoadModuleVar(usize),
    StoreModuleVar(usize),
    /// Field of the receiver in slot 0.
    LoadFieldThis(usize),
    StoreFieldThis(usize),
    /// Field of the instance on top of the stack.
    LoadField(usize),
    StoreField(usize),

    // ========================================
    // Stack
    // ========================================
    Pop,
    /// Close the upvalue for the top slot, then pop it.
    CloseUpvalue,

    // ========================================
    // Control flow
    // ========================================
    Jump(usize),
    Loop(usize),
    /// Pop the condition; jump when it is falsey.
    JumpIfFalse(usize),
    /// Short-circuit `&&`: keep a falsey left operand and jump, else pop it.
    And(usize),
    /// Short-circuit `||`: keep a truthy left operand and jump, else pop it.
    Or(usize),

    // ========================================
    // Calls
    // ========================================
    Call { symbol: usize, arity: usize },
    /// Dispatch starting at the superclass of the method's bound class.
    Super { symbol: usize, arity: usize },
    Return,

    // ========================================
    // Objects
    // ========================================
    /// Wrap the function constant in a closure, capturing upvalues.
    Closure(usize),
    /// Replace the class in slot 0 with a fresh instance of it.
    Construct,
    /// `[name, superclass]` → class with the given number of own fields.
    Class { num_fields: usize },
    /// `[class, closure]` → class. Binds an instance method.
    MethodInstance(usize),
    /// `[class, closure]` → class. Binds a method on the metaclass.
    MethodStatic(usize),
    EndModule,
}

/// Where a closure finds an upvalue when it is created: a local slot of the
/// enclosing function, or one of the enclosing function's own upvalues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpvalueDesc {
    pub is_local: bool,
    pub index: usize,
}

impl Op {
    /// Net change in stack height.
    pub fn stack_effect(&self) -> isize {
        match self {
            Op::Constant(_) | Op::Null | Op::False | Op::True => 1,
            Op::LoadLocal(_)
            | Op::LoadUpvalue(_)
            | Op::LoadModuleVar(_)
            | Op::LoadFieldThis(_) => 1,
            Op::StoreLocal(_)
            | Op::StoreUpvalue(_)
            | Op::StoreModuleVar(_)
            | Op::StoreFieldThis(_) => 0,
            Op::LoadField(_) => 0,
            Op::StoreField(_) => -1,
            Op::Pop | Op::CloseUpvalue => -1,
            Op::Jump(_) | Op::Loop(_) => 0,
            Op::JumpIfFalse(_) | Op::And(_) | Op::Or(_) => -1,
            Op::Call { arity, .. } | Op::Super { arity, .. } => -(*arity as isize),
            Op::Return => 0,
            Op::Closure(_) => 1,
            Op::Construct => 0,
            Op::Class { .. } => -1,
            Op::MethodInstance(_) | Op::MethodStatic(_) => -1,
            Op::EndModule => 0,
        }
    }

    /// Get the operation name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            Op::Constant(_) => "Constant",
            Op::Null => "Null",
            Op::False => "False",
            Op::True => "True",
            Op::LoadLocal(_) => "LoadLocal",
            Op::StoreLocal(_) => "StoreLocal",
            Op::LoadUpvalue(_) => "LoadUpvalue",
            Op::StoreUpvalue(_) => "StoreUpvalue",
            Op::LoadModuleVar(_) => "LoadModuleVar",
            Op::StoreModuleVar(_) => "StoreModuleVar",
            Op::LoadFieldThis(_) => "LoadFieldThis",
            Op::StoreFieldThis(_) => "StoreFieldThis",
            Op::LoadField(_) => "LoadField",
            Op::StoreField(_) => "StoreField",
            Op::Pop => "Pop",
            Op::CloseUpvalue => "CloseUpvalue",
            Op::Jump(_) => "Jump",
            Op::Loop(_) => "Loop",
            Op::JumpIfFalse(_) => "JumpIfFalse",
            Op::And(_) => "And",
            Op::Or(_) => "Or",
            Op::Call { .. } => "Call",
            Op::Super { .. } => "Super",
            Op::Return => "Return",
            Op::Closure(_) => "Closure",
            Op::Construct => "Construct",
            Op::Class { .. } => "Class",
            Op::MethodInstance(_) => "MethodInstance",
            Op::MethodStatic(_) => "MethodStatic",
            Op::EndModule => "EndModule",
        }
    }

    /// Shift a field operand by `offset`. Other ops are returned unchanged.
    pub fn with_field_offset(self, offset: usize) -> Op {
        match self {
            Op::LoadFieldThis(i) => Op::LoadFieldThis(i + offset),
            Op::StoreFieldThis(i) => Op::StoreFieldThis(i + offset),
            Op::LoadField(i) => Op::LoadField(i + offset),
            Op::StoreField(i) => Op::StoreField(i + offset),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_consumes_arguments() {
        assert_eq!(Op::Call { symbol: 0, arity: 2 }.stack_effect(), -2);
        assert_eq!(Op::Call { symbol: 0, arity: 0 }.stack_effect(), 0);
    }

    #[test]
    fn test_field_offset_only_touches_field_ops() {
        assert_eq!(Op::LoadFieldThis(1).with_field_offset(2), Op::LoadFieldThis(3));
        assert_eq!(Op::StoreField(0).with_field_offset(4), Op::StoreField(4));
        assert_eq!(Op::LoadLocal(1).with_field_offset(2), Op::LoadLocal(1));
    }
}
