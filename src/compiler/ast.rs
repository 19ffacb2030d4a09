use crate::vm::call_signature;

/// A statement. Lines are carried by expressions and by the statements that
/// emit code without one.
#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Expr),
    Var {
        name: String,
        init: Option<Expr>,
        line: u32,
    },
    Class(ClassDecl),
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    For {
        name: String,
        sequence: Expr,
        body: Box<Stmt>,
        line: u32,
    },
    Block(Vec<Stmt>),
    Break(u32),
    Return(Option<Expr>, u32),
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: u32,
}

impl Expr {
    pub fn new(kind: ExprKind, line: u32) -> Self {
        Self { kind, line }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Null,
    Bool(bool),
    Num(f64),
    Str(Vec<u8>),
    List(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),

    /// A bare identifier: a variable, or an implicit getter on `this`.
    Name(String),
    Field(String),
    This,

    Assign {
        name: String,
        value: Box<Expr>,
    },
    AssignField {
        name: String,
        value: Box<Expr>,
    },

    /// `receiver.name`, `receiver.name(args)`, `receiver.name { block }`
    Call {
        receiver: Box<Expr>,
        name: String,
        args: CallArgs,
    },
    /// `name(args)` with no receiver; an implicit call on `this`.
    BareCall {
        name: String,
        args: CallArgs,
    },
    /// `receiver.name = value`
    Setter {
        receiver: Box<Expr>,
        name: String,
        value: Box<Expr>,
    },
    Subscript {
        receiver: Box<Expr>,
        args: Vec<Expr>,
    },
    SubscriptSet {
        receiver: Box<Expr>,
        args: Vec<Expr>,
        value: Box<Expr>,
    },
    /// `super.name(args)`, or `super(args)` for the enclosing method's name.
    Super {
        name: Option<String>,
        args: CallArgs,
    },

    Unary {
        op: &'static str,
        operand: Box<Expr>,
    },
    Binary {
        op: &'static str,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Conditional {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
}

/// Arguments of a method call.
///
/// `args` is `None` for a getter-style call without parentheses.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    pub args: Option<Vec<Expr>>,
    pub block: Option<Box<FnBody>>,
}

impl CallArgs {
    pub fn arity(&self) -> usize {
        self.args.as_ref().map_or(0, Vec::len) + usize::from(self.block.is_some())
    }

    pub fn is_getter(&self) -> bool {
        self.args.is_none() && self.block.is_none()
    }

    /// Method signature for calling `name` with these arguments.
    pub fn signature(&self, name: &str) -> String {
        if self.is_getter() {
            name.to_string()
        } else {
            call_signature(name, self.arity())
        }
    }
}

/// A function body: a block argument or a method.
#[derive(Debug, Clone)]
pub struct FnBody {
    pub params: Vec<String>,
    pub body: Body,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub enum Body {
    /// `{ expr }` on one line; the value is returned.
    Expr(Box<Expr>),
    Stmts(Vec<Stmt>),
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub superclass: Option<Expr>,
    pub methods: Vec<MethodDecl>,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    /// Full signature, e.g. `add(_,_)`, `count`, `[_]=(_)`.
    pub signature: String,
    pub body: FnBody,
    pub is_static: bool,
    pub is_constructor: bool,
}

/// Signature of a subscript getter with `arity` indices.
pub fn subscript_signature(arity: usize) -> String {
    format!("[{}]", vec!["_"; arity].join(","))
}

/// Signature of a subscript setter with `arity` indices.
pub fn subscript_setter_signature(arity: usize) -> String {
    format!("{}=(_)", subscript_signature(arity))
}

pub fn setter_signature(name: &str) -> String {
    format!("{}=(_)", name)
}

pub fn infix_signature(op: &str) -> String {
    format!("{}(_)", op)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_args_signature() {
        let getter = CallArgs::default();
        assert_eq!(getter.signature("count"), "count");

        let empty_parens = CallArgs {
            args: Some(vec![]),
            block: None,
        };
        assert_eq!(empty_parens.signature("call"), "call()");

        let with_block = CallArgs {
            args: Some(vec![Expr::new(ExprKind::Num(1.0), 1)]),
            block: Some(Box::new(FnBody {
                params: vec![],
                body: Body::Stmts(vec![]),
                line: 1,
            })),
        };
        assert_eq!(with_block.arity(), 2);
        assert_eq!(with_block.signature("map"), "map(_,_)");
    }

    #[test]
    fn test_operator_signatures() {
        assert_eq!(subscript_signature(1), "[_]");
        assert_eq!(subscript_setter_signature(2), "[_,_]=(_)");
        assert_eq!(setter_signature("x"), "x=(_)");
        assert_eq!(infix_signature("+"), "+(_)");
    }
}
