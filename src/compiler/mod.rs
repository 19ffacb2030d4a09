//! Source to bytecode: lexer → parser → codegen.
//!
//! Compilation is pure. It produces a [`FnProto`] tree that the VM turns
//! into heap functions, so a compile error leaves the heap untouched.

pub mod ast;
mod codegen;
pub mod lexer;
mod parser;

pub use codegen::Codegen;
pub use lexer::Lexer;
pub use parser::Parser;

use thiserror::Error;

use crate::vm::{Module, Op, SymbolTable, UpvalueDesc};

/// The first error found while compiling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[line {line}] Error: {message}")]
pub struct CompileError {
    pub line: u32,
    pub message: String,
}

impl CompileError {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// A compiled function before it is loaded into a VM.
#[derive(Debug, Clone, Default)]
pub struct FnProto {
    pub name: String,
    pub arity: usize,
    pub code: Vec<Op>,
    pub lines: Vec<u32>,
    pub constants: Vec<Constant>,
    pub upvalues: Vec<UpvalueDesc>,
    pub max_slots: usize,
}

#[derive(Debug, Clone)]
pub enum Constant {
    Num(f64),
    Str(Vec<u8>),
    Fn(Box<FnProto>),
}

/// The module body plus the module variables it introduces, in slot order
/// after the module's existing variables.
#[derive(Debug, Clone)]
pub struct CompiledModule {
    pub main: FnProto,
    pub new_variables: Vec<String>,
}

/// Compile `source` against the variables already defined in `module`.
///
/// New method signatures are interned into `symbols`.
pub fn compile(
    source: &str,
    module: &Module,
    symbols: &mut SymbolTable,
) -> Result<CompiledModule, CompileError> {
    let tokens = Lexer::new(source).scan_tokens()?;
    let stmts = Parser::new(tokens).parse()?;
    Codegen::new(module, symbols).compile_module(&stmts)
}
