//! Bytecode disassembler, used by `wrenvm run --dump-bytecode`.

use crate::compiler::{self, CompileError, Constant, FnProto};

use super::class::SymbolTable;
use super::ops::Op;
use super::vm::Vm;

/// Renders a compiled function tree as text, one function after another.
pub struct Disassembler<'a> {
    symbols: &'a SymbolTable,
    output: String,
}

impl<'a> Disassembler<'a> {
    pub fn new(symbols: &'a SymbolTable) -> Self {
        Self {
            symbols,
            output: String::new(),
        }
    }

    pub fn disassemble(mut self, main: &FnProto) -> String {
        self.function(main);
        self.output
    }

    fn function(&mut self, proto: &FnProto) {
        self.output.push_str(&format!(
            "== {} (arity: {}, slots: {}, upvalues: {}) ==\n",
            proto.name,
            proto.arity,
            proto.max_slots,
            proto.upvalues.len()
        ));

        let mut last_line = None;
        for (pc, op) in proto.code.iter().enumerate() {
            let line = proto.lines.get(pc).copied();
            if line == last_line {
                self.output.push_str(&format!("{:04}    | ", pc));
            } else {
                self.output
                    .push_str(&format!("{:04} {:4} ", pc, line.unwrap_or(0)));
                last_line = line;
            }
            self.op(proto, op);
            self.output.push('\n');
        }
        self.output.push('\n');

        for constant in &proto.constants {
            if let Constant::Fn(nested) = constant {
                self.function(nested);
            }
        }
    }

    fn op(&mut self, proto: &FnProto, op: &Op) {
        let text = match op {
            Op::Constant(index) => {
                format!("{:<16} {:4} ; {}", op.name(), index, constant(proto, *index))
            }
            Op::Closure(index) => {
                format!("{:<16} {:4} ; {}", op.name(), index, constant(proto, *index))
            }
            Op::LoadLocal(n)
            | Op::StoreLocal(n)
            | Op::LoadUpvalue(n)
            | Op::StoreUpvalue(n)
            | Op::LoadModuleVar(n)
            | Op::StoreModuleVar(n)
            | Op::LoadFieldThis(n)
            | Op::StoreFieldThis(n)
            | Op::LoadField(n)
            | Op::StoreField(n) => format!("{:<16} {:4}", op.name(), n),
            Op::Jump(target)
            | Op::Loop(target)
            | Op::JumpIfFalse(target)
            | Op::And(target)
            | Op::Or(target) => format!("{:<16} -> {:04}", op.name(), target),
            Op::Call { symbol, arity } | Op::Super { symbol, arity } => format!(
                "{:<16} {:4} ; {} ({} args)",
                op.name(),
                symbol,
                self.symbols.name(*symbol),
                arity
            ),
            Op::MethodInstance(symbol) | Op::MethodStatic(symbol) => format!(
                "{:<16} {:4} ; {}",
                op.name(),
                symbol,
                self.symbols.name(*symbol)
            ),
            Op::Class { num_fields } => format!("{:<16} {:4} fields", op.name(), num_fields),
            _ => op.name().to_string(),
        };
        self.output.push_str(&text);
    }
}

fn constant(proto: &FnProto, index: usize) -> String {
    match proto.constants.get(index) {
        Some(Constant::Num(n)) => super::format::num_to_string(*n),
        Some(Constant::Str(bytes)) => {
            let text = String::from_utf8_lossy(bytes);
            format!("\"{}\"", text.replace('\n', "\\n").replace('\t', "\\t"))
        }
        Some(Constant::Fn(nested)) => format!("<fn {}>", nested.name),
        None => "<?>".to_string(),
    }
}

impl Vm {
    /// Compile `source` against this VM's module and disassemble it without
    /// running anything.
    pub fn disassemble(&mut self, source: &str) -> Result<String, CompileError> {
        let compiled = compiler::compile(source, &self.module, &mut self.symbols)?;
        Ok(Disassembler::new(&self.symbols).disassemble(&compiled.main))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Configuration;
    use crate::vm::Vm;

    #[test]
    fn test_disassemble_names_symbols() {
        let mut vm = Vm::new(Configuration::default()).unwrap();
        let text = vm.disassemble("System.print(1 + 2)").unwrap();
        assert!(text.starts_with("== (script)"));
        assert!(text.contains("; print(_) (1 args)"));
        assert!(text.contains("; +(_) (1 args)"));
        assert!(text.contains("EndModule"));
    }

    #[test]
    fn test_disassemble_includes_nested_functions() {
        let mut vm = Vm::new(Configuration::default()).unwrap();
        let text = vm
            .disassemble("class Point {\n  construct new(x) { _x = x }\n  x { _x }\n}")
            .unwrap();
        assert!(text.contains("== Point.x "));
        assert!(text.contains("== Point.init new(_) "));
        assert!(text.contains("Construct"));
    }

    #[test]
    fn test_disassemble_reports_compile_errors() {
        let mut vm = Vm::new(Configuration::default()).unwrap();
        assert!(vm.disassemble("var = 1").is_err());
    }
}
