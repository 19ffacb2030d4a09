use super::CompileError;
use super::ast::*;
use super::lexer::{Token, TokenKind};
use crate::vm::call_signature;

/// Most parameters or arguments a method may take.
pub const MAX_PARAMETERS: usize = 16;

/// Recursive-descent parser producing statements.
///
/// Newlines end statements. They are skipped after binary operators, commas
/// and opening brackets, so expressions can span lines there.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    pub fn parse(&mut self) -> Result<Vec<Stmt>, CompileError> {
        let mut stmts = Vec::new();
        loop {
            self.skip_lines();
            if self.is_at_end() {
                break;
            }
            stmts.push(self.statement()?);
            self.statement_end()?;
        }
        Ok(stmts)
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn statement(&mut self) -> Result<Stmt, CompileError> {
        match self.peek_kind() {
            TokenKind::Class => self.class_decl(),
            TokenKind::Var => self.var_decl(),
            TokenKind::If => self.if_stmt(),
            TokenKind::While => self.while_stmt(),
            TokenKind::For => self.for_stmt(),
            TokenKind::Break => {
                let line = self.advance().line;
                Ok(Stmt::Break(line))
            }
            TokenKind::Return => {
                let line = self.advance().line;
                let value = if matches!(
                    self.peek_kind(),
                    TokenKind::Line | TokenKind::RBrace | TokenKind::Eof
                ) {
                    None
                } else {
                    Some(self.expression()?)
                };
                Ok(Stmt::Return(value, line))
            }
            TokenKind::LBrace => {
                self.advance();
                Ok(Stmt::Block(self.block_stmts()?))
            }
            _ => Ok(Stmt::Expr(self.expression()?)),
        }
    }

    /// A statement must be followed by a newline, a closing brace or the end
    /// of input.
    fn statement_end(&mut self) -> Result<(), CompileError> {
        match self.peek_kind() {
            TokenKind::Line => {
                self.advance();
                Ok(())
            }
            TokenKind::RBrace | TokenKind::Eof => Ok(()),
            _ => Err(self.error("Expect newline after statement.")),
        }
    }

    /// Statements up to and including the closing `}`.
    fn block_stmts(&mut self) -> Result<Vec<Stmt>, CompileError> {
        let mut stmts = Vec::new();
        loop {
            self.skip_lines();
            if self.match_token(&TokenKind::RBrace) {
                return Ok(stmts);
            }
            if self.is_at_end() {
                return Err(self.error("Expect '}' after block."));
            }
            stmts.push(self.statement()?);
            self.statement_end()?;
        }
    }

    fn var_decl(&mut self) -> Result<Stmt, CompileError> {
        let line = self.advance().line;
        let name = self.expect_name("Expect variable name.")?;
        let init = if self.match_token(&TokenKind::Eq) {
            self.skip_lines();
            Some(self.expression()?)
        } else {
            None
        };
        Ok(Stmt::Var { name, init, line })
    }

    fn if_stmt(&mut self) -> Result<Stmt, CompileError> {
        self.advance();
        self.expect(&TokenKind::LParen, "Expect '(' after 'if'.")?;
        self.skip_lines();
        let condition = self.expression()?;
        self.skip_lines();
        self.expect(&TokenKind::RParen, "Expect ')' after if condition.")?;
        let then_branch = Box::new(self.statement()?);

        // `else` may start the next line.
        let saved = self.current;
        self.skip_lines();
        let else_branch = if self.match_token(&TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            self.current = saved;
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_stmt(&mut self) -> Result<Stmt, CompileError> {
        self.advance();
        self.expect(&TokenKind::LParen, "Expect '(' after 'while'.")?;
        self.skip_lines();
        let condition = self.expression()?;
        self.skip_lines();
        self.expect(&TokenKind::RParen, "Expect ')' after while condition.")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    fn for_stmt(&mut self) -> Result<Stmt, CompileError> {
        let line = self.advance().line;
        self.expect(&TokenKind::LParen, "Expect '(' after 'for'.")?;
        let name = self.expect_name("Expect for loop variable name.")?;
        self.expect(&TokenKind::In, "Expect 'in' after loop variable.")?;
        self.skip_lines();
        let sequence = self.expression()?;
        self.skip_lines();
        self.expect(&TokenKind::RParen, "Expect ')' after loop expression.")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::For {
            name,
            sequence,
            body,
            line,
        })
    }

    // ========================================================================
    // Classes
    // ========================================================================

    fn class_decl(&mut self) -> Result<Stmt, CompileError> {
        let line = self.advance().line;
        let name = self.expect_name("Expect class name.")?;
        let superclass = if self.match_token(&TokenKind::Is) {
            let line = self.peek().line;
            let superclass = self.expect_name("Expect superclass name after 'is'.")?;
            Some(Expr::new(ExprKind::Name(superclass), line))
        } else {
            None
        };
        self.expect(&TokenKind::LBrace, "Expect '{' after class declaration.")?;

        let mut methods = Vec::new();
        loop {
            self.skip_lines();
            if self.match_token(&TokenKind::RBrace) {
                break;
            }
            if self.is_at_end() {
                return Err(self.error("Expect '}' after class body."));
            }
            methods.push(self.method_decl()?);
            match self.peek_kind() {
                TokenKind::Line => {
                    self.advance();
                }
                TokenKind::RBrace => {}
                _ => return Err(self.error("Expect newline after definition in class.")),
            }
        }

        Ok(Stmt::Class(ClassDecl {
            name,
            superclass,
            methods,
            line,
        }))
    }

    fn method_decl(&mut self) -> Result<MethodDecl, CompileError> {
        let is_static = self.match_token(&TokenKind::Static);
        let is_constructor = self.match_token(&TokenKind::Construct);
        if is_static && is_constructor {
            return Err(self.error("A constructor cannot be static."));
        }

        let line = self.peek().line;
        let (signature, params) = match self.peek_kind().clone() {
            TokenKind::Name(name) => {
                self.advance();
                if !is_constructor && self.match_token(&TokenKind::Eq) {
                    let params = self.single_param()?;
                    (setter_signature(&name), params)
                } else if self.check(&TokenKind::LParen) {
                    let params = self.param_list(&TokenKind::LParen, &TokenKind::RParen)?;
                    (call_signature(&name, params.len()), params)
                } else if is_constructor {
                    return Err(self.error("A constructor cannot be a getter."));
                } else {
                    (name, Vec::new())
                }
            }
            TokenKind::LBracket if !is_constructor => {
                let params = self.param_list(&TokenKind::LBracket, &TokenKind::RBracket)?;
                if params.is_empty() {
                    return Err(self.error("Expect at least one subscript parameter."));
                }
                if self.match_token(&TokenKind::Eq) {
                    let mut all = params;
                    all.extend(self.single_param()?);
                    (subscript_setter_signature(all.len() - 1), all)
                } else {
                    (subscript_signature(params.len()), params)
                }
            }
            kind if !is_constructor && kind.operator_name().is_some() => {
                self.advance();
                let op = kind.operator_name().unwrap_or_default();
                let prefix_capable = matches!(
                    kind,
                    TokenKind::Minus | TokenKind::Bang | TokenKind::Tilde
                );
                if self.check(&TokenKind::LParen) && kind != TokenKind::Bang && kind != TokenKind::Tilde {
                    let params = self.single_param()?;
                    (infix_signature(op), params)
                } else if prefix_capable {
                    (op.to_string(), Vec::new())
                } else {
                    return Err(self.error(&format!("Expect parameter after operator '{}'.", op)));
                }
            }
            _ => return Err(self.error("Expect method definition.")),
        };

        self.expect(&TokenKind::LBrace, "Expect '{' to begin method body.")?;
        let body = self.fn_body(params, line)?;

        Ok(MethodDecl {
            signature,
            body,
            is_static,
            is_constructor,
        })
    }

    /// `(name)` for setters and infix operators.
    fn single_param(&mut self) -> Result<Vec<String>, CompileError> {
        let params = self.param_list(&TokenKind::LParen, &TokenKind::RParen)?;
        if params.len() != 1 {
            return Err(self.error("Expect a single parameter."));
        }
        Ok(params)
    }

    fn param_list(&mut self, open: &TokenKind, close: &TokenKind) -> Result<Vec<String>, CompileError> {
        self.expect(open, "Expect parameter list.")?;
        let mut params = Vec::new();
        self.skip_lines();
        if self.match_token(close) {
            return Ok(params);
        }
        loop {
            self.skip_lines();
            params.push(self.expect_name("Expect parameter name.")?);
            if params.len() > MAX_PARAMETERS {
                return Err(self.error("Methods cannot have more than 16 parameters."));
            }
            self.skip_lines();
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(close, "Expect closing delimiter after parameters.")?;
        Ok(params)
    }

    /// Body after the opening `{`, through the closing `}`.
    fn fn_body(&mut self, params: Vec<String>, line: u32) -> Result<FnBody, CompileError> {
        if self.match_token(&TokenKind::RBrace) {
            return Ok(FnBody {
                params,
                body: Body::Stmts(Vec::new()),
                line,
            });
        }

        let starts_statement = matches!(
            self.peek_kind(),
            TokenKind::Line
                | TokenKind::Var
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Return
                | TokenKind::Break
                | TokenKind::Class
        );
        if starts_statement {
            return Ok(FnBody {
                params,
                body: Body::Stmts(self.block_stmts()?),
                line,
            });
        }

        let expr = self.expression()?;
        if self.match_token(&TokenKind::RBrace) {
            return Ok(FnBody {
                params,
                body: Body::Expr(Box::new(expr)),
                line,
            });
        }

        self.statement_end()?;
        let mut stmts = vec![Stmt::Expr(expr)];
        stmts.extend(self.block_stmts()?);
        Ok(FnBody {
            params,
            body: Body::Stmts(stmts),
            line,
        })
    }

    /// `{ |a, b| ... }` after the opening brace has been consumed.
    fn block_argument(&mut self, line: u32) -> Result<FnBody, CompileError> {
        let mut params = Vec::new();
        if self.match_token(&TokenKind::Pipe) {
            loop {
                params.push(self.expect_name("Expect parameter name.")?);
                if params.len() > MAX_PARAMETERS {
                    return Err(self.error("Methods cannot have more than 16 parameters."));
                }
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::Pipe, "Expect '|' after function parameters.")?;
        }
        self.fn_body(params, line)
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    pub fn expression(&mut self) -> Result<Expr, CompileError> {
        let target = self.conditional()?;
        if !self.check(&TokenKind::Eq) {
            return Ok(target);
        }
        self.advance();
        self.skip_lines();
        let value = Box::new(self.expression()?);
        let line = target.line;

        let kind = match target.kind {
            ExprKind::Name(name) => ExprKind::Assign { name, value },
            ExprKind::Field(name) => ExprKind::AssignField { name, value },
            ExprKind::Call {
                receiver,
                name,
                args,
            } if args.is_getter() => ExprKind::Setter {
                receiver,
                name,
                value,
            },
            ExprKind::Subscript { receiver, args } => ExprKind::SubscriptSet {
                receiver,
                args,
                value,
            },
            _ => return Err(CompileError::new(line, "Invalid assignment target.")),
        };
        Ok(Expr::new(kind, line))
    }

    fn conditional(&mut self) -> Result<Expr, CompileError> {
        let condition = self.binary(0)?;
        if !self.match_token(&TokenKind::Question) {
            return Ok(condition);
        }
        self.skip_lines();
        let then_branch = self.conditional()?;
        self.skip_lines();
        self.expect(&TokenKind::Colon, "Expect ':' after then branch of conditional operator.")?;
        self.skip_lines();
        let else_branch = self.conditional()?;
        let line = condition.line;
        Ok(Expr::new(
            ExprKind::Conditional {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            line,
        ))
    }

    /// Precedence climbing over the infix operators.
    fn binary(&mut self, min_precedence: u8) -> Result<Expr, CompileError> {
        let mut left = self.unary()?;

        loop {
            let kind = self.peek_kind().clone();
            let Some(precedence) = infix_precedence(&kind) else {
                break;
            };
            if precedence < min_precedence {
                break;
            }
            let line = self.advance().line;
            self.skip_lines();
            let right = self.binary(precedence + 1)?;

            let expr_kind = match kind {
                TokenKind::OrOr => ExprKind::Or(Box::new(left), Box::new(right)),
                TokenKind::AndAnd => ExprKind::And(Box::new(left), Box::new(right)),
                other => ExprKind::Binary {
                    op: other.operator_name().unwrap_or_default(),
                    left: Box::new(left),
                    right: Box::new(right),
                },
            };
            left = Expr::new(expr_kind, line);
        }

        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, CompileError> {
        let kind = self.peek_kind().clone();
        if !matches!(kind, TokenKind::Minus | TokenKind::Bang | TokenKind::Tilde) {
            return self.call();
        }
        let line = self.advance().line;
        let operand = self.unary()?;

        if kind == TokenKind::Minus
            && let ExprKind::Num(n) = operand.kind
        {
            return Ok(Expr::new(ExprKind::Num(-n), line));
        }

        Ok(Expr::new(
            ExprKind::Unary {
                op: kind.operator_name().unwrap_or_default(),
                operand: Box::new(operand),
            },
            line,
        ))
    }

    fn call(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.primary()?;

        loop {
            if self.match_token(&TokenKind::Dot) {
                let line = self.peek().line;
                let name = self.expect_method_name()?;
                let args = self.call_args()?;
                expr = Expr::new(
                    ExprKind::Call {
                        receiver: Box::new(expr),
                        name,
                        args,
                    },
                    line,
                );
            } else if self.check(&TokenKind::LBracket) {
                let line = self.advance().line;
                let args = self.arguments(&TokenKind::RBracket)?;
                if args.is_empty() {
                    return Err(self.error("Expect at least one subscript argument."));
                }
                expr = Expr::new(
                    ExprKind::Subscript {
                        receiver: Box::new(expr),
                        args,
                    },
                    line,
                );
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Optional `(args)` and optional block argument after a method name.
    fn call_args(&mut self) -> Result<CallArgs, CompileError> {
        let args = if self.match_token(&TokenKind::LParen) {
            Some(self.arguments(&TokenKind::RParen)?)
        } else {
            None
        };
        let block = if self.check(&TokenKind::LBrace) {
            let line = self.advance().line;
            Some(Box::new(self.block_argument(line)?))
        } else {
            None
        };
        let call = CallArgs { args, block };
        if call.arity() > MAX_PARAMETERS {
            return Err(self.error("Methods cannot have more than 16 parameters."));
        }
        Ok(call)
    }

    /// Comma-separated expressions up to `close`. The opener is consumed.
    fn arguments(&mut self, close: &TokenKind) -> Result<Vec<Expr>, CompileError> {
        let mut args = Vec::new();
        self.skip_lines();
        if self.match_token(close) {
            return Ok(args);
        }
        loop {
            self.skip_lines();
            args.push(self.expression()?);
            self.skip_lines();
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(close, "Expect closing delimiter after arguments.")?;
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, CompileError> {
        let token = self.advance().clone();
        let line = token.line;

        let kind = match token.kind {
            TokenKind::Null => ExprKind::Null,
            TokenKind::True => ExprKind::Bool(true),
            TokenKind::False => ExprKind::Bool(false),
            TokenKind::Num(n) => ExprKind::Num(n),
            TokenKind::Str(s) => ExprKind::Str(s),
            TokenKind::This => ExprKind::This,
            TokenKind::Field(name) => ExprKind::Field(name),
            TokenKind::Name(name) => {
                if self.check(&TokenKind::LParen) || self.check(&TokenKind::LBrace) {
                    ExprKind::BareCall {
                        name,
                        args: self.call_args()?,
                    }
                } else {
                    ExprKind::Name(name)
                }
            }
            TokenKind::Super => {
                let name = if self.match_token(&TokenKind::Dot) {
                    Some(self.expect_method_name()?)
                } else {
                    None
                };
                let args = self.call_args()?;
                if name.is_none() && args.is_getter() {
                    return Err(CompileError::new(line, "Expect '.' or '(' after 'super'."));
                }
                ExprKind::Super { name, args }
            }
            TokenKind::LParen => {
                self.skip_lines();
                let expr = self.expression()?;
                self.skip_lines();
                self.expect(&TokenKind::RParen, "Expect ')' after expression.")?;
                return Ok(expr);
            }
            TokenKind::LBracket => ExprKind::List(self.list_elements()?),
            TokenKind::LBrace => ExprKind::Map(self.map_entries()?),
            _ => return Err(CompileError::new(line, "Expect expression.")),
        };

        Ok(Expr::new(kind, line))
    }

    fn list_elements(&mut self) -> Result<Vec<Expr>, CompileError> {
        let mut elements = Vec::new();
        loop {
            self.skip_lines();
            if self.match_token(&TokenKind::RBracket) {
                return Ok(elements);
            }
            elements.push(self.expression()?);
            self.skip_lines();
            if !self.match_token(&TokenKind::Comma) {
                self.skip_lines();
                self.expect(&TokenKind::RBracket, "Expect ']' after list elements.")?;
                return Ok(elements);
            }
        }
    }

    fn map_entries(&mut self) -> Result<Vec<(Expr, Expr)>, CompileError> {
        let mut entries = Vec::new();
        loop {
            self.skip_lines();
            if self.match_token(&TokenKind::RBrace) {
                return Ok(entries);
            }
            let key = self.binary(0)?;
            self.expect(&TokenKind::Colon, "Expect ':' after map key.")?;
            self.skip_lines();
            let value = self.expression()?;
            entries.push((key, value));
            self.skip_lines();
            if !self.match_token(&TokenKind::Comma) {
                self.skip_lines();
                self.expect(&TokenKind::RBrace, "Expect '}' after map entries.")?;
                return Ok(entries);
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        &self.tokens[self.current - 1]
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, message: &str) -> Result<(), CompileError> {
        if self.match_token(kind) {
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn expect_name(&mut self, message: &str) -> Result<String, CompileError> {
        if let TokenKind::Name(name) = self.peek_kind() {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error(message))
        }
    }

    /// Method names after `.`; `is` and keywords are not allowed.
    fn expect_method_name(&mut self) -> Result<String, CompileError> {
        self.expect_name("Expect method name after '.'.")
    }

    fn skip_lines(&mut self) {
        while self.check(&TokenKind::Line) {
            self.advance();
        }
    }

    fn error(&self, message: &str) -> CompileError {
        CompileError::new(self.peek().line, message)
    }
}

/// Binding power of an infix operator; higher binds tighter.
fn infix_precedence(kind: &TokenKind) -> Option<u8> {
    Some(match kind {
        TokenKind::OrOr => 1,
        TokenKind::AndAnd => 2,
        TokenKind::EqEq | TokenKind::NotEq => 3,
        TokenKind::Is => 4,
        TokenKind::Lt | TokenKind::Le | TokenKind::Gt | TokenKind::Ge => 5,
        TokenKind::Pipe => 6,
        TokenKind::Caret => 7,
        TokenKind::Amp => 8,
        TokenKind::Shl | TokenKind::Shr => 9,
        TokenKind::DotDot | TokenKind::DotDotDot => 10,
        TokenKind::Plus | TokenKind::Minus => 11,
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => 12,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::lexer::Lexer;

    fn parse(source: &str) -> Vec<Stmt> {
        let tokens = Lexer::new(source).scan_tokens().unwrap();
        Parser::new(tokens).parse().unwrap()
    }

    fn parse_err(source: &str) -> CompileError {
        let tokens = Lexer::new(source).scan_tokens().unwrap();
        Parser::new(tokens).parse().unwrap_err()
    }

    fn expr(source: &str) -> Expr {
        match parse(source).pop() {
            Some(Stmt::Expr(e)) => e,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let e = expr("1 + 2 * 3");
        let ExprKind::Binary { op, right, .. } = e.kind else {
            panic!("expected binary");
        };
        assert_eq!(op, "+");
        assert!(matches!(right.kind, ExprKind::Binary { op: "*", .. }));
    }

    #[test]
    fn test_range_binds_looser_than_term() {
        let e = expr("0..n-1");
        assert!(matches!(e.kind, ExprKind::Binary { op: "..", .. }));
    }

    #[test]
    fn test_negative_literal_folds() {
        assert!(matches!(expr("-3").kind, ExprKind::Num(n) if n == -3.0));
    }

    #[test]
    fn test_setter_and_subscript_assignment() {
        assert!(matches!(expr("a.b = 1").kind, ExprKind::Setter { .. }));
        assert!(matches!(expr("a[0] = 1").kind, ExprKind::SubscriptSet { .. }));
        assert!(matches!(expr("_x = 1").kind, ExprKind::AssignField { .. }));
    }

    #[test]
    fn test_block_argument() {
        let e = expr("Fn.new { |a, b| a + b }");
        let ExprKind::Call { name, args, .. } = e.kind else {
            panic!("expected call");
        };
        assert_eq!(name, "new");
        let block = args.block.expect("block");
        assert_eq!(block.params, vec!["a", "b"]);
        assert!(matches!(block.body, Body::Expr(_)));
    }

    #[test]
    fn test_else_on_next_line() {
        let stmts = parse("if (a) {\n  b\n}\nelse c");
        assert!(matches!(
            &stmts[0],
            Stmt::If {
                else_branch: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn test_class_signatures() {
        let stmts = parse(
            "class Point is Base {\n  construct new(x, y) {}\n  x { _x }\n  x=(v) { _x = v }\n  +(o) { o }\n  - { this }\n  [i] { i }\n  [i]=(v) { v }\n  static origin { 0 }\n}",
        );
        let Stmt::Class(class) = &stmts[0] else {
            panic!("expected class");
        };
        let sigs: Vec<&str> = class.methods.iter().map(|m| m.signature.as_str()).collect();
        assert_eq!(
            sigs,
            vec!["new(_,_)", "x", "x=(_)", "+(_)", "-", "[_]", "[_]=(_)", "origin"]
        );
        assert!(class.methods[0].is_constructor);
        assert!(class.methods[7].is_static);
        assert!(class.superclass.is_some());
    }

    #[test]
    fn test_multiline_list_and_map() {
        let e = expr("[\n  1,\n  2,\n]");
        assert!(matches!(e.kind, ExprKind::List(ref items) if items.len() == 2));
        let e = expr("{\n \"a\": 1,\n \"b\": 2\n}.count");
        assert!(matches!(e.kind, ExprKind::Call { .. }));
    }

    #[test]
    fn test_missing_newline_between_statements() {
        let err = parse_err("var a = 1 var b = 2");
        assert_eq!(err.message, "Expect newline after statement.");
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse_err("1 = 2");
        assert_eq!(err.message, "Invalid assignment target.");
    }
}
