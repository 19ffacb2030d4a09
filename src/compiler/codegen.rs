use super::ast::*;
use super::{CompileError, CompiledModule, Constant, FnProto};
use crate::vm::{Module, Op, SymbolTable, UpvalueDesc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FnKind {
    Module,
    Method,
    Constructor,
    Block,
}

#[derive(Debug)]
struct Local {
    name: String,
    depth: usize,
    is_captured: bool,
}

#[derive(Debug)]
struct LoopState {
    start: usize,
    scope_depth: usize,
    breaks: Vec<usize>,
}

/// Per-function compilation state.
#[derive(Debug)]
struct FnState {
    proto: FnProto,
    kind: FnKind,
    locals: Vec<Local>,
    upvalues: Vec<UpvalueDesc>,
    scope_depth: usize,
    loops: Vec<LoopState>,
    /// Current stack height relative to the frame.
    height: usize,
}

impl FnState {
    /// `receiver` names slot 0. Blocks and the module body have an unnamed
    /// slot 0 holding the closure itself.
    fn new(name: String, kind: FnKind, receiver: &str, params: &[String]) -> Self {
        let mut locals = vec![Local {
            name: receiver.to_string(),
            depth: 0,
            is_captured: false,
        }];
        locals.extend(params.iter().map(|p| Local {
            name: p.clone(),
            depth: 0,
            is_captured: false,
        }));
        let height = locals.len();
        Self {
            proto: FnProto {
                name,
                arity: params.len(),
                max_slots: height,
                ..Default::default()
            },
            kind,
            locals,
            upvalues: Vec::new(),
            scope_depth: 0,
            loops: Vec::new(),
            height,
        }
    }
}

/// The class whose methods are being compiled.
#[derive(Debug)]
struct ClassState {
    name: String,
    /// Own fields, in declaration order.
    fields: Vec<String>,
    in_static: bool,
    /// Name of the method being compiled, without its parameter list.
    method_name: String,
    in_constructor: bool,
}

#[derive(Debug, Clone, Copy)]
enum Variable {
    Local(usize),
    Upvalue(usize),
    Module(usize),
}

/// Lowers statements into a [`FnProto`] tree.
pub struct Codegen<'a> {
    module: &'a Module,
    symbols: &'a mut SymbolTable,
    new_variables: Vec<String>,
    /// Variables used before their definition, with the line of first use.
    forward: Vec<(String, u32)>,
    fns: Vec<FnState>,
    class: Option<ClassState>,
    line: u32,
}

impl<'a> Codegen<'a> {
    pub fn new(module: &'a Module, symbols: &'a mut SymbolTable) -> Self {
        Self {
            module,
            symbols,
            new_variables: Vec::new(),
            forward: Vec::new(),
            fns: Vec::new(),
            class: None,
            line: 1,
        }
    }

    pub fn compile_module(mut self, stmts: &[Stmt]) -> Result<CompiledModule, CompileError> {
        self.fns
            .push(FnState::new("(script)".to_string(), FnKind::Module, "", &[]));

        for stmt in stmts {
            self.stmt(stmt)?;
        }

        if let Some((name, line)) = self.forward.first() {
            return Err(CompileError::new(
                *line,
                format!("Variable '{}' is used but not defined.", name),
            ));
        }

        self.emit(Op::EndModule);
        self.emit(Op::Null);
        self.emit(Op::Return);

        let state = self.fns.pop().ok_or_else(|| CompileError::new(self.line, "No module body."))?;
        Ok(CompiledModule {
            main: state.proto,
            new_variables: self.new_variables,
        })
    }

    // ========================================================================
    // Emission
    // ========================================================================

    fn current(&mut self) -> &mut FnState {
        let last = self.fns.len() - 1;
        &mut self.fns[last]
    }

    fn emit(&mut self, op: Op) -> usize {
        let line = self.line;
        let f = self.current();
        f.proto.code.push(op);
        f.proto.lines.push(line);
        f.height = (f.height as isize + op.stack_effect()).max(0) as usize;
        f.proto.max_slots = f.proto.max_slots.max(f.height);
        f.proto.code.len() - 1
    }

    fn here(&mut self) -> usize {
        self.current().proto.code.len()
    }

    fn patch_jump(&mut self, at: usize, target: usize) {
        let code = &mut self.current().proto.code;
        code[at] = match code[at] {
            Op::Jump(_) => Op::Jump(target),
            Op::JumpIfFalse(_) => Op::JumpIfFalse(target),
            Op::And(_) => Op::And(target),
            Op::Or(_) => Op::Or(target),
            other => other,
        };
    }

    fn add_constant(&mut self, constant: Constant) -> usize {
        let constants = &mut self.current().proto.constants;
        let existing = constants.iter().position(|c| match (c, &constant) {
            (Constant::Num(a), Constant::Num(b)) => a.to_bits() == b.to_bits(),
            (Constant::Str(a), Constant::Str(b)) => a == b,
            _ => false,
        });
        existing.unwrap_or_else(|| {
            constants.push(constant);
            constants.len() - 1
        })
    }

    fn call(&mut self, signature: &str, arity: usize) {
        let symbol = self.symbols.ensure(signature);
        self.emit(Op::Call { symbol, arity });
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::new(self.line, message)
    }

    // ========================================================================
    // Scopes and variables
    // ========================================================================

    fn begin_scope(&mut self) {
        self.current().scope_depth += 1;
    }

    fn end_scope(&mut self) {
        let f = self.current();
        f.scope_depth -= 1;
        let depth = f.scope_depth;
        while let Some(local) = self.current().locals.last() {
            if local.depth <= depth {
                break;
            }
            let captured = local.is_captured;
            self.current().locals.pop();
            self.emit(if captured { Op::CloseUpvalue } else { Op::Pop });
        }
    }

    /// Pop locals deeper than `depth` without forgetting them; used by
    /// `break`, whose code path skips the normal scope exit.
    fn discard_locals(&mut self, depth: usize) {
        let height = self.current().height;
        let ops: Vec<Op> = self
            .current()
            .locals
            .iter()
            .rev()
            .take_while(|local| local.depth > depth)
            .map(|local| if local.is_captured { Op::CloseUpvalue } else { Op::Pop })
            .collect();
        for op in ops {
            self.emit(op);
        }
        self.current().height = height;
    }

    fn declare_local(&mut self, name: &str) -> Result<(), CompileError> {
        let f = self.current();
        let depth = f.scope_depth;
        let duplicate = f
            .locals
            .iter()
            .rev()
            .take_while(|local| local.depth == depth)
            .any(|local| local.name == name);
        if duplicate {
            return Err(self.error("Variable is already declared in this scope."));
        }
        self.current().locals.push(Local {
            name: name.to_string(),
            depth,
            is_captured: false,
        });
        Ok(())
    }

    fn resolve_local(&self, fn_index: usize, name: &str) -> Option<usize> {
        self.fns[fn_index]
            .locals
            .iter()
            .rposition(|local| local.name == name)
    }

    /// Captures do not cross a method boundary.
    fn resolve_upvalue(&mut self, fn_index: usize, name: &str) -> Option<usize> {
        if fn_index == 0
            || matches!(
                self.fns[fn_index].kind,
                FnKind::Method | FnKind::Constructor
            )
        {
            return None;
        }
        let enclosing = fn_index - 1;
        if let Some(local) = self.resolve_local(enclosing, name) {
            self.fns[enclosing].locals[local].is_captured = true;
            return Some(self.add_upvalue(fn_index, true, local));
        }
        let index = self.resolve_upvalue(enclosing, name)?;
        Some(self.add_upvalue(fn_index, false, index))
    }

    fn add_upvalue(&mut self, fn_index: usize, is_local: bool, index: usize) -> usize {
        let desc = UpvalueDesc { is_local, index };
        let upvalues = &mut self.fns[fn_index].upvalues;
        if let Some(existing) = upvalues.iter().position(|u| *u == desc) {
            return existing;
        }
        upvalues.push(desc);
        upvalues.len() - 1
    }

    fn module_variable(&self, name: &str) -> Option<usize> {
        self.module.find(name).or_else(|| {
            self.new_variables
                .iter()
                .position(|v| v == name)
                .map(|i| self.module.len() + i)
        })
    }

    fn find_variable(&mut self, name: &str) -> Option<Variable> {
        let current = self.fns.len() - 1;
        if let Some(slot) = self.resolve_local(current, name) {
            return Some(Variable::Local(slot));
        }
        if let Some(index) = self.resolve_upvalue(current, name) {
            return Some(Variable::Upvalue(index));
        }
        self.module_variable(name).map(Variable::Module)
    }

    /// Define a top-level variable, completing a forward declaration if one
    /// exists.
    fn define_module_variable(&mut self, name: &str) -> Result<usize, CompileError> {
        if self.module.find(name).is_some() {
            return Err(self.error("Module variable is already defined."));
        }
        if let Some(position) = self.new_variables.iter().position(|v| v == name) {
            let Some(forward) = self.forward.iter().position(|(n, _)| n == name) else {
                return Err(self.error("Module variable is already defined."));
            };
            self.forward.remove(forward);
            return Ok(self.module.len() + position);
        }
        self.new_variables.push(name.to_string());
        Ok(self.module.len() + self.new_variables.len() - 1)
    }

    fn forward_declare(&mut self, name: &str) -> usize {
        self.new_variables.push(name.to_string());
        self.forward.push((name.to_string(), self.line));
        self.module.len() + self.new_variables.len() - 1
    }

    fn load_variable(&mut self, variable: Variable) {
        self.emit(match variable {
            Variable::Local(slot) => Op::LoadLocal(slot),
            Variable::Upvalue(index) => Op::LoadUpvalue(index),
            Variable::Module(index) => Op::LoadModuleVar(index),
        });
    }

    fn store_variable(&mut self, variable: Variable) {
        self.emit(match variable {
            Variable::Local(slot) => Op::StoreLocal(slot),
            Variable::Upvalue(index) => Op::StoreUpvalue(index),
            Variable::Module(index) => Op::StoreModuleVar(index),
        });
    }

    fn load_core(&mut self, name: &str) -> Result<(), CompileError> {
        let index = self
            .module
            .find(name)
            .ok_or_else(|| self.error(format!("Core class '{}' is not defined.", name)))?;
        self.emit(Op::LoadModuleVar(index));
        Ok(())
    }

    fn load_this(&mut self) -> Result<(), CompileError> {
        let current = self.fns.len() - 1;
        let in_method = self.class.is_some();
        let this = if in_method {
            match self.resolve_local(current, "this") {
                Some(slot) => Some(Variable::Local(slot)),
                None => self.resolve_upvalue(current, "this").map(Variable::Upvalue),
            }
        } else {
            None
        };
        match this {
            Some(variable) => {
                self.load_variable(variable);
                Ok(())
            }
            None => Err(self.error("Cannot use 'this' outside of a method.")),
        }
    }

    fn in_method_body(&self) -> bool {
        self.fns
            .last()
            .is_some_and(|f| matches!(f.kind, FnKind::Method | FnKind::Constructor))
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Expr(expr) => {
                self.expr(expr)?;
                self.emit(Op::Pop);
            }
            Stmt::Var { name, init, line } => {
                self.line = *line;
                match init {
                    Some(init) => self.expr(init)?,
                    None => {
                        self.emit(Op::Null);
                    }
                }
                self.line = *line;
                let at_top_level = self.fns.len() == 1 && self.current().scope_depth == 0;
                if at_top_level {
                    let index = self.define_module_variable(name)?;
                    self.emit(Op::StoreModuleVar(index));
                    self.emit(Op::Pop);
                } else {
                    self.declare_local(name)?;
                }
            }
            Stmt::Class(class) => self.class_decl(class)?,
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expr(condition)?;
                let jump_else = self.emit(Op::JumpIfFalse(0));
                self.scoped_stmt(then_branch)?;
                match else_branch {
                    Some(else_branch) => {
                        let jump_end = self.emit(Op::Jump(0));
                        let else_start = self.here();
                        self.patch_jump(jump_else, else_start);
                        self.scoped_stmt(else_branch)?;
                        let end = self.here();
                        self.patch_jump(jump_end, end);
                    }
                    None => {
                        let end = self.here();
                        self.patch_jump(jump_else, end);
                    }
                }
            }
            Stmt::While { condition, body } => {
                let start = self.here();
                self.expr(condition)?;
                let exit = self.emit(Op::JumpIfFalse(0));
                self.loop_body(start, body)?;
                self.emit(Op::Loop(start));
                self.end_loop(exit);
            }
            Stmt::For {
                name,
                sequence,
                body,
                line,
            } => self.for_stmt(name, sequence, body, *line)?,
            Stmt::Block(stmts) => {
                self.begin_scope();
                for stmt in stmts {
                    self.stmt(stmt)?;
                }
                self.end_scope();
            }
            Stmt::Break(line) => {
                self.line = *line;
                let Some(depth) = self.current().loops.last().map(|l| l.scope_depth) else {
                    return Err(self.error("Cannot use 'break' outside of a loop."));
                };
                self.discard_locals(depth);
                let jump = self.emit(Op::Jump(0));
                if let Some(loop_state) = self.current().loops.last_mut() {
                    loop_state.breaks.push(jump);
                }
            }
            Stmt::Return(value, line) => {
                self.line = *line;
                if self.current().kind == FnKind::Constructor {
                    if value.is_some() {
                        return Err(self.error("A constructor cannot return a value."));
                    }
                    self.emit(Op::LoadLocal(0));
                } else {
                    match value {
                        Some(value) => self.expr(value)?,
                        None => {
                            self.emit(Op::Null);
                        }
                    }
                }
                self.emit(Op::Return);
                // Code after a return is unreachable; keep the height honest.
                let f = self.current();
                f.height = f.height.saturating_sub(1);
            }
        }
        Ok(())
    }

    fn scoped_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        self.begin_scope();
        self.stmt(stmt)?;
        self.end_scope();
        Ok(())
    }

    fn loop_body(&mut self, start: usize, body: &Stmt) -> Result<(), CompileError> {
        let scope_depth = self.current().scope_depth;
        self.current().loops.push(LoopState {
            start,
            scope_depth,
            breaks: Vec::new(),
        });
        self.scoped_stmt(body)
    }

    fn end_loop(&mut self, exit: usize) {
        let end = self.here();
        self.patch_jump(exit, end);
        if let Some(loop_state) = self.current().loops.pop() {
            debug_assert!(loop_state.start < end);
            for jump in loop_state.breaks {
                self.patch_jump(jump, end);
            }
        }
    }

    /// `for (x in seq) body` runs the iterator protocol:
    ///
    /// ```text
    /// var seq_ = seq
    /// var iter_ = null
    /// while (iter_ = seq_.iterate(iter_)) {
    ///   var x = seq_.iteratorValue(iter_)
    ///   body
    /// }
    /// ```
    fn for_stmt(&mut self, name: &str, sequence: &Expr, body: &Stmt, line: u32) -> Result<(), CompileError> {
        self.begin_scope();
        self.expr(sequence)?;
        self.line = line;
        self.declare_local("seq ")?;
        let seq_slot = self.current().locals.len() - 1;
        self.emit(Op::Null);
        self.declare_local("iter ")?;
        let iter_slot = seq_slot + 1;

        let start = self.here();
        self.line = line;
        self.emit(Op::LoadLocal(seq_slot));
        self.emit(Op::LoadLocal(iter_slot));
        self.call("iterate(_)", 1);
        self.emit(Op::StoreLocal(iter_slot));
        let exit = self.emit(Op::JumpIfFalse(0));

        let scope_depth = self.current().scope_depth;
        self.current().loops.push(LoopState {
            start,
            scope_depth,
            breaks: Vec::new(),
        });

        self.begin_scope();
        self.emit(Op::LoadLocal(seq_slot));
        self.emit(Op::LoadLocal(iter_slot));
        self.call("iteratorValue(_)", 1);
        self.declare_local(name)?;
        self.scoped_stmt(body)?;
        self.end_scope();

        self.line = line;
        self.emit(Op::Loop(start));
        self.end_loop(exit);
        self.end_scope();
        Ok(())
    }

    // ========================================================================
    // Classes
    // ========================================================================

    fn class_decl(&mut self, class: &ClassDecl) -> Result<(), CompileError> {
        self.line = class.line;
        if self.fns.len() != 1 || self.current().scope_depth != 0 {
            return Err(self.error("Class definitions must be at the top level."));
        }

        let variable = self.define_module_variable(&class.name)?;
        let name = self.add_constant(Constant::Str(class.name.as_bytes().to_vec()));
        self.emit(Op::Constant(name));
        match &class.superclass {
            Some(superclass) => self.expr(superclass)?,
            None => self.load_core("Object")?,
        }
        self.line = class.line;
        let class_op = self.emit(Op::Class { num_fields: 0 });

        self.class = Some(ClassState {
            name: class.name.clone(),
            fields: Vec::new(),
            in_static: false,
            method_name: String::new(),
            in_constructor: false,
        });

        let result = class
            .methods
            .iter()
            .try_for_each(|method| self.method(method));
        let state = self.class.take();
        result?;

        let num_fields = state.map_or(0, |s| s.fields.len());
        self.current().proto.code[class_op] = Op::Class { num_fields };

        self.line = class.line;
        self.emit(Op::StoreModuleVar(variable));
        self.emit(Op::Pop);
        Ok(())
    }

    fn method(&mut self, method: &MethodDecl) -> Result<(), CompileError> {
        self.line = method.body.line;
        let base_name = method
            .signature
            .split(['(', '='])
            .next()
            .unwrap_or_default()
            .to_string();
        if self.class.is_none() {
            return Err(self.error("Method outside of a class."));
        }
        let mut class_name = String::new();
        if let Some(state) = &mut self.class {
            state.in_static = method.is_static;
            state.in_constructor = method.is_constructor;
            state.method_name = base_name;
            class_name = state.name.clone();
        }

        if method.is_constructor {
            let init_signature = format!("init {}", method.signature);
            let init = self.function(
                format!("{}.{}", class_name, init_signature),
                FnKind::Constructor,
                "this",
                &method.body,
            )?;
            self.closure(init);
            let symbol = self.symbols.ensure(&init_signature);
            self.emit(Op::MethodInstance(symbol));

            // The static `new` allocates the instance in slot 0 and runs the
            // initializer on the receiver and arguments already in place.
            let arity = method.body.params.len();
            let init_symbol = symbol;
            let line = self.line;
            let stub = FnProto {
                name: format!("{}.{}", class_name, method.signature),
                arity,
                code: vec![
                    Op::Construct,
                    Op::Call {
                        symbol: init_symbol,
                        arity,
                    },
                    Op::Return,
                ],
                lines: vec![line; 3],
                constants: Vec::new(),
                upvalues: Vec::new(),
                max_slots: arity + 1,
            };
            self.closure(stub);
            let symbol = self.symbols.ensure(&method.signature);
            self.emit(Op::MethodStatic(symbol));
            return Ok(());
        }

        let proto = self.function(
            format!("{}.{}", class_name, method.signature),
            FnKind::Method,
            "this",
            &method.body,
        )?;
        self.closure(proto);
        let symbol = self.symbols.ensure(&method.signature);
        self.emit(if method.is_static {
            Op::MethodStatic(symbol)
        } else {
            Op::MethodInstance(symbol)
        });
        Ok(())
    }

    fn closure(&mut self, proto: FnProto) {
        let index = self.add_constant(Constant::Fn(Box::new(proto)));
        self.emit(Op::Closure(index));
    }

    /// Compile a nested function and return its prototype.
    fn function(
        &mut self,
        name: String,
        kind: FnKind,
        receiver: &str,
        body: &FnBody,
    ) -> Result<FnProto, CompileError> {
        let outer_line = self.line;
        self.fns.push(FnState::new(name, kind, receiver, &body.params));
        self.line = body.line;

        let result = self.function_body(kind, &body.body);
        let state = self.fns.pop();
        result?;
        self.line = outer_line;

        let Some(state) = state else {
            return Err(self.error("Function state underflow."));
        };
        let mut proto = state.proto;
        proto.upvalues = state.upvalues;
        Ok(proto)
    }

    fn function_body(&mut self, kind: FnKind, body: &Body) -> Result<(), CompileError> {
        match body {
            Body::Expr(expr) => {
                self.expr(expr)?;
                if kind == FnKind::Constructor {
                    self.emit(Op::Pop);
                    self.emit(Op::LoadLocal(0));
                }
            }
            Body::Stmts(stmts) => {
                for stmt in stmts {
                    self.stmt(stmt)?;
                }
                if kind == FnKind::Constructor {
                    self.emit(Op::LoadLocal(0));
                } else {
                    self.emit(Op::Null);
                }
            }
        }
        self.emit(Op::Return);
        Ok(())
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        self.line = expr.line;
        match &expr.kind {
            ExprKind::Null => {
                self.emit(Op::Null);
            }
            ExprKind::Bool(true) => {
                self.emit(Op::True);
            }
            ExprKind::Bool(false) => {
                self.emit(Op::False);
            }
            ExprKind::Num(n) => {
                let index = self.add_constant(Constant::Num(*n));
                self.emit(Op::Constant(index));
            }
            ExprKind::Str(s) => {
                let index = self.add_constant(Constant::Str(s.clone()));
                self.emit(Op::Constant(index));
            }
            ExprKind::List(elements) => {
                self.load_core("List")?;
                self.call("new()", 0);
                for element in elements {
                    self.expr(element)?;
                    self.line = expr.line;
                    self.call("addCore_(_)", 1);
                }
            }
            ExprKind::Map(entries) => {
                self.load_core("Map")?;
                self.call("new()", 0);
                for (key, value) in entries {
                    self.expr(key)?;
                    self.expr(value)?;
                    self.line = expr.line;
                    self.call("addCore_(_,_)", 2);
                }
            }
            ExprKind::Name(name) => self.name(name)?,
            ExprKind::Field(name) => {
                let index = self.field(name)?;
                if self.in_method_body() {
                    self.emit(Op::LoadFieldThis(index));
                } else {
                    self.load_this()?;
                    self.emit(Op::LoadField(index));
                }
            }
            ExprKind::This => self.load_this()?,
            ExprKind::Assign { name, value } => self.assign(name, value)?,
            ExprKind::AssignField { name, value } => {
                let index = self.field(name)?;
                self.expr(value)?;
                self.line = expr.line;
                if self.in_method_body() {
                    self.emit(Op::StoreFieldThis(index));
                } else {
                    self.load_this()?;
                    self.emit(Op::StoreField(index));
                }
            }
            ExprKind::Call {
                receiver,
                name,
                args,
            } => {
                self.expr(receiver)?;
                self.call_with_args(name, args, expr.line)?;
            }
            ExprKind::BareCall { name, args } => {
                if self.class.is_none() {
                    return Err(self.error(format!(
                        "Method '{}' must be called on a receiver.",
                        args.signature(name)
                    )));
                }
                self.load_this()?;
                self.call_with_args(name, args, expr.line)?;
            }
            ExprKind::Setter {
                receiver,
                name,
                value,
            } => {
                self.expr(receiver)?;
                self.expr(value)?;
                self.line = expr.line;
                self.call(&setter_signature(name), 1);
            }
            ExprKind::Subscript { receiver, args } => {
                self.expr(receiver)?;
                for arg in args {
                    self.expr(arg)?;
                }
                self.line = expr.line;
                self.call(&subscript_signature(args.len()), args.len());
            }
            ExprKind::SubscriptSet {
                receiver,
                args,
                value,
            } => {
                self.expr(receiver)?;
                for arg in args {
                    self.expr(arg)?;
                }
                self.expr(value)?;
                self.line = expr.line;
                self.call(&subscript_setter_signature(args.len()), args.len() + 1);
            }
            ExprKind::Super { name, args } => self.super_call(name.as_deref(), args, expr.line)?,
            ExprKind::Unary { op, operand } => {
                self.expr(operand)?;
                self.line = expr.line;
                self.call(op, 0);
            }
            ExprKind::Binary { op, left, right } => {
                self.expr(left)?;
                self.expr(right)?;
                self.line = expr.line;
                self.call(&infix_signature(op), 1);
            }
            ExprKind::And(left, right) => {
                self.expr(left)?;
                let jump = self.emit(Op::And(0));
                self.expr(right)?;
                let end = self.here();
                self.patch_jump(jump, end);
            }
            ExprKind::Or(left, right) => {
                self.expr(left)?;
                let jump = self.emit(Op::Or(0));
                self.expr(right)?;
                let end = self.here();
                self.patch_jump(jump, end);
            }
            ExprKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expr(condition)?;
                let jump_else = self.emit(Op::JumpIfFalse(0));
                self.expr(then_branch)?;
                let jump_end = self.emit(Op::Jump(0));
                // Only one branch runs.
                let f = self.current();
                f.height = f.height.saturating_sub(1);
                let else_start = self.here();
                self.patch_jump(jump_else, else_start);
                self.expr(else_branch)?;
                let end = self.here();
                self.patch_jump(jump_end, end);
            }
        }
        Ok(())
    }

    fn name(&mut self, name: &str) -> Result<(), CompileError> {
        let current = self.fns.len() - 1;
        if let Some(slot) = self.resolve_local(current, name) {
            self.emit(Op::LoadLocal(slot));
            return Ok(());
        }
        if let Some(index) = self.resolve_upvalue(current, name) {
            self.emit(Op::LoadUpvalue(index));
            return Ok(());
        }
        if self.class.is_some() && starts_lowercase(name) {
            self.load_this()?;
            self.call(name, 0);
            return Ok(());
        }
        let index = match self.module_variable(name) {
            Some(index) => index,
            None => self.forward_declare(name),
        };
        self.emit(Op::LoadModuleVar(index));
        Ok(())
    }

    fn assign(&mut self, name: &str, value: &Expr) -> Result<(), CompileError> {
        let line = self.line;
        let current = self.fns.len() - 1;
        let local = self.resolve_local(current, name).map(Variable::Local);
        let variable = match local {
            Some(variable) => Some(variable),
            None => self.resolve_upvalue(current, name).map(Variable::Upvalue),
        };

        if variable.is_none() && self.class.is_some() && starts_lowercase(name) {
            self.load_this()?;
            self.expr(value)?;
            self.line = line;
            self.call(&setter_signature(name), 1);
            return Ok(());
        }

        let variable = match variable {
            Some(variable) => variable,
            None => match self.find_variable(name) {
                Some(variable) => variable,
                None => return Err(self.error(format!("Undefined variable '{}'.", name))),
            },
        };
        self.expr(value)?;
        self.line = line;
        self.store_variable(variable);
        Ok(())
    }

    fn field(&mut self, name: &str) -> Result<usize, CompileError> {
        let line = self.line;
        let Some(class) = &mut self.class else {
            return Err(CompileError::new(
                line,
                "Cannot reference a field outside of a class definition.",
            ));
        };
        if class.in_static {
            return Err(CompileError::new(
                line,
                "Cannot use an instance field in a static method.",
            ));
        }
        if let Some(index) = class.fields.iter().position(|f| f == name) {
            return Ok(index);
        }
        class.fields.push(name.to_string());
        Ok(class.fields.len() - 1)
    }

    fn call_with_args(&mut self, name: &str, args: &CallArgs, line: u32) -> Result<(), CompileError> {
        let signature = args.signature(name);
        self.arguments(&signature, args)?;
        self.line = line;
        self.call(&signature, args.arity());
        Ok(())
    }

    /// Push the arguments of a call, block argument last.
    fn arguments(&mut self, signature: &str, args: &CallArgs) -> Result<(), CompileError> {
        for arg in args.args.iter().flatten() {
            self.expr(arg)?;
        }
        if let Some(block) = &args.block {
            let proto = self.function(
                format!("{} block argument", signature),
                FnKind::Block,
                "",
                block,
            )?;
            self.closure(proto);
        }
        Ok(())
    }

    fn super_call(&mut self, name: Option<&str>, args: &CallArgs, line: u32) -> Result<(), CompileError> {
        let Some(class) = &self.class else {
            return Err(self.error("Cannot use 'super' outside of a method."));
        };
        let signature = match name {
            Some(name) => args.signature(name),
            None if class.in_constructor => format!("init {}", args.signature(&class.method_name)),
            None => args.signature(&class.method_name),
        };

        self.load_this()?;
        self.arguments(&signature, args)?;
        self.line = line;
        let symbol = self.symbols.ensure(&signature);
        self.emit(Op::Super {
            symbol,
            arity: args.arity(),
        });
        Ok(())
    }
}

fn starts_lowercase(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;

    fn module_with(names: &[&str]) -> Module {
        let mut module = Module::default();
        for name in names {
            module.define(name, crate::vm::Value::Null);
        }
        module
    }

    fn core_module() -> Module {
        module_with(&["Object", "List", "Map"])
    }

    #[test]
    fn test_top_level_vars_become_module_variables() {
        let module = core_module();
        let mut symbols = SymbolTable::new();
        let compiled = compile("var a = 1\nvar b = a", &module, &mut symbols).unwrap();
        assert_eq!(compiled.new_variables, vec!["a", "b"]);
        assert!(compiled.main.code.contains(&Op::StoreModuleVar(3)));
        assert!(compiled.main.code.contains(&Op::LoadModuleVar(3)));
        assert_eq!(compiled.main.code.last(), Some(&Op::Return));
    }

    #[test]
    fn test_redefinition_is_an_error() {
        let module = core_module();
        let mut symbols = SymbolTable::new();
        let err = compile("var a = 1\nvar a = 2", &module, &mut symbols).unwrap_err();
        assert_eq!(err.message, "Module variable is already defined.");
        assert_eq!(err.line, 2);

        let err = compile("var List = 1", &module, &mut symbols).unwrap_err();
        assert_eq!(err.message, "Module variable is already defined.");
    }

    #[test]
    fn test_forward_reference_must_be_defined() {
        let module = core_module();
        let mut symbols = SymbolTable::new();
        assert!(compile("var f = Fn2\nclass Fn2 {}", &module, &mut symbols).is_ok());

        let err = compile("System2.print(1)", &module, &mut symbols).unwrap_err();
        assert_eq!(err.message, "Variable 'System2' is used but not defined.");
    }

    #[test]
    fn test_block_captures_local_as_upvalue() {
        let module = core_module();
        let mut symbols = SymbolTable::new();
        let compiled = compile(
            "{\n  var x = 1\n  var f = Object.new { x }\n}",
            &module,
            &mut symbols,
        )
        .unwrap();

        let block = compiled
            .main
            .constants
            .iter()
            .find_map(|c| match c {
                Constant::Fn(f) => Some(f),
                _ => None,
            })
            .unwrap();
        assert_eq!(block.upvalues, vec![UpvalueDesc { is_local: true, index: 1 }]);
        assert!(block.code.contains(&Op::LoadUpvalue(0)));
        assert!(compiled.main.code.contains(&Op::CloseUpvalue));
    }

    #[test]
    fn test_fields_in_methods() {
        let module = core_module();
        let mut symbols = SymbolTable::new();
        let compiled = compile(
            "class P {\n  construct new(x) { _x = x }\n  x { _x }\n}",
            &module,
            &mut symbols,
        )
        .unwrap();
        assert!(compiled.main.code.contains(&Op::Class { num_fields: 1 }));
        assert!(symbols.find("init new(_)").is_some());
        assert!(symbols.find("new(_)").is_some());
    }

    #[test]
    fn test_break_outside_loop() {
        let module = core_module();
        let mut symbols = SymbolTable::new();
        let err = compile("break", &module, &mut symbols).unwrap_err();
        assert_eq!(err.message, "Cannot use 'break' outside of a loop.");
    }

    #[test]
    fn test_field_outside_class() {
        let module = core_module();
        let mut symbols = SymbolTable::new();
        let err = compile("_x = 1", &module, &mut symbols).unwrap_err();
        assert_eq!(
            err.message,
            "Cannot reference a field outside of a class definition."
        );
    }

    #[test]
    fn test_max_slots_covers_call_arguments() {
        let module = core_module();
        let mut symbols = SymbolTable::new();
        let compiled = compile("Object.foo(1, 2, 3)", &module, &mut symbols).unwrap();
        assert!(compiled.main.max_slots >= 5);
    }
}
