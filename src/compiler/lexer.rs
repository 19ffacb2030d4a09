use super::CompileError;

/// Token kinds. Newlines are significant and produce [`TokenKind::Line`].
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    Break,
    Class,
    Construct,
    Else,
    False,
    For,
    If,
    In,
    Is,
    Null,
    Return,
    Static,
    Super,
    This,
    True,
    Var,
    While,

    // Literals
    Num(f64),
    Str(Vec<u8>),
    Name(String),
    /// `_name`
    Field(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,
    Bang,
    Eq,
    Dot,
    DotDot,
    DotDotDot,
    Question,

    // Delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,

    // Special
    Line,
    Eof,
}

impl TokenKind {
    /// Method name of an operator token, if it is one.
    pub fn operator_name(&self) -> Option<&'static str> {
        Some(match self {
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::Le => "<=",
            TokenKind::Gt => ">",
            TokenKind::Ge => ">=",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::Tilde => "~",
            TokenKind::Shl => "<<",
            TokenKind::Shr => ">>",
            TokenKind::Bang => "!",
            TokenKind::DotDot => "..",
            TokenKind::DotDotDot => "...",
            TokenKind::Is => "is",
            _ => return None,
        })
    }
}

/// A token with the line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
}

impl Token {
    pub fn new(kind: TokenKind, line: u32) -> Self {
        Self { kind, line }
    }
}

/// The lexer for script source code.
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    line: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
        }
    }

    pub fn scan_tokens(&mut self) -> Result<Vec<Token>, CompileError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments()?;

            let line = self.line;
            let Some((_, ch)) = self.peek() else {
                tokens.push(Token::new(TokenKind::Eof, line));
                break;
            };

            let kind = match ch {
                '\n' => {
                    self.advance();
                    TokenKind::Line
                }
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                '{' => self.single(TokenKind::LBrace),
                '}' => self.single(TokenKind::RBrace),
                '[' => self.single(TokenKind::LBracket),
                ']' => self.single(TokenKind::RBracket),
                ',' => self.single(TokenKind::Comma),
                ':' => self.single(TokenKind::Colon),
                '+' => self.single(TokenKind::Plus),
                '-' => self.single(TokenKind::Minus),
                '*' => self.single(TokenKind::Star),
                '/' => self.single(TokenKind::Slash),
                '%' => self.single(TokenKind::Percent),
                '^' => self.single(TokenKind::Caret),
                '~' => self.single(TokenKind::Tilde),
                '?' => self.single(TokenKind::Question),
                '.' => {
                    self.advance();
                    if self.match_char('.') {
                        if self.match_char('.') {
                            TokenKind::DotDotDot
                        } else {
                            TokenKind::DotDot
                        }
                    } else {
                        TokenKind::Dot
                    }
                }
                '!' => self.one_or_two('=', TokenKind::NotEq, TokenKind::Bang),
                '=' => self.one_or_two('=', TokenKind::EqEq, TokenKind::Eq),
                '&' => self.one_or_two('&', TokenKind::AndAnd, TokenKind::Amp),
                '|' => self.one_or_two('|', TokenKind::OrOr, TokenKind::Pipe),
                '<' => {
                    self.advance();
                    if self.match_char('=') {
                        TokenKind::Le
                    } else if self.match_char('<') {
                        TokenKind::Shl
                    } else {
                        TokenKind::Lt
                    }
                }
                '>' => {
                    self.advance();
                    if self.match_char('=') {
                        TokenKind::Ge
                    } else if self.match_char('>') {
                        TokenKind::Shr
                    } else {
                        TokenKind::Gt
                    }
                }
                '"' => self.scan_string()?,
                '0'..='9' => self.scan_number()?,
                '_' => self.scan_field()?,
                'a'..='z' | 'A'..='Z' => self.scan_identifier(),
                _ => return Err(self.error(&format!("Invalid character '{}'.", ch))),
            };

            tokens.push(Token::new(kind, line));
        }

        Ok(tokens)
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        self.chars.peek().copied()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.chars.clone();
        chars.next();
        chars.next().map(|(_, c)| c)
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((_, '\n')) = result {
            self.line += 1;
        }
        result
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek().map(|(_, c)| c) == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn one_or_two(&mut self, second: char, two: TokenKind, one: TokenKind) -> TokenKind {
        self.advance();
        if self.match_char(second) { two } else { one }
    }

    fn offset(&mut self) -> usize {
        self.peek().map(|(i, _)| i).unwrap_or(self.source.len())
    }

    /// Skip spaces and comments, but not newlines.
    fn skip_whitespace_and_comments(&mut self) -> Result<(), CompileError> {
        loop {
            match self.peek() {
                Some((_, ' ' | '\t' | '\r')) => {
                    self.advance();
                }
                Some((_, '/')) if self.peek_next() == Some('/') => {
                    while let Some((_, ch)) = self.peek() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some((_, '/')) if self.peek_next() == Some('*') => {
                    self.block_comment()?;
                }
                _ => return Ok(()),
            }
        }
    }

    /// Block comments nest.
    fn block_comment(&mut self) -> Result<(), CompileError> {
        self.advance();
        self.advance();
        let mut depth = 1;
        while depth > 0 {
            match self.advance() {
                None => return Err(self.error("Unterminated block comment.")),
                Some((_, '/')) if self.match_char('*') => depth += 1,
                Some((_, '*')) if self.match_char('/') => depth -= 1,
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn scan_number(&mut self) -> Result<TokenKind, CompileError> {
        let start = self.offset();

        if self.peek().map(|(_, c)| c) == Some('0') && matches!(self.peek_next(), Some('x' | 'X')) {
            self.advance();
            self.advance();
            let digits_start = self.offset();
            while let Some((_, ch)) = self.peek() {
                if !ch.is_ascii_hexdigit() {
                    break;
                }
                self.advance();
            }
            let end = self.offset();
            let digits = &self.source[digits_start..end];
            return u64::from_str_radix(digits, 16)
                .map(|n| TokenKind::Num(n as f64))
                .map_err(|_| self.error(&format!("Invalid number literal '0x{}'.", digits)));
        }

        self.digits();

        // A '.' only continues the number when a digit follows; otherwise it
        // is a method call such as `1.abs`.
        if self.peek().map(|(_, c)| c) == Some('.')
            && self.peek_next().is_some_and(|c| c.is_ascii_digit())
        {
            self.advance();
            self.digits();
        }

        if matches!(self.peek(), Some((_, 'e' | 'E'))) {
            self.advance();
            if matches!(self.peek(), Some((_, '+' | '-'))) {
                self.advance();
            }
            if !self.peek().is_some_and(|(_, c)| c.is_ascii_digit()) {
                return Err(self.error("Unterminated scientific notation."));
            }
            self.digits();
        }

        let end = self.offset();
        let text = &self.source[start..end];
        text.parse::<f64>()
            .map(TokenKind::Num)
            .map_err(|_| self.error(&format!("Invalid number literal '{}'.", text)))
    }

    fn digits(&mut self) {
        while let Some((_, ch)) = self.peek() {
            if !ch.is_ascii_digit() {
                break;
            }
            self.advance();
        }
    }

    fn scan_string(&mut self) -> Result<TokenKind, CompileError> {
        self.advance(); // consume opening quote

        let mut value = Vec::new();
        let mut utf8 = [0u8; 4];

        loop {
            match self.advance() {
                None => return Err(self.error("Unterminated string.")),
                Some((_, '"')) => break,
                Some((_, '%')) if self.peek().map(|(_, c)| c) == Some('(') => {
                    return Err(self.error("String interpolation is not supported."));
                }
                Some((_, '\\')) => {
                    let Some((_, escape)) = self.advance() else {
                        return Err(self.error("Unterminated string."));
                    };
                    match escape {
                        '"' => value.push(b'"'),
                        '\\' => value.push(b'\\'),
                        '%' => value.push(b'%'),
                        '0' => value.push(0),
                        'n' => value.push(b'\n'),
                        't' => value.push(b'\t'),
                        'r' => value.push(b'\r'),
                        'x' => value.push(self.hex_escape()?),
                        other => {
                            return Err(
                                self.error(&format!("Invalid escape character '{}'.", other))
                            );
                        }
                    }
                }
                Some((_, ch)) => value.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes()),
            }
        }

        Ok(TokenKind::Str(value))
    }

    fn hex_escape(&mut self) -> Result<u8, CompileError> {
        let mut byte = 0u8;
        for _ in 0..2 {
            let digit = self
                .advance()
                .and_then(|(_, c)| c.to_digit(16))
                .ok_or_else(|| self.error("Incomplete byte escape sequence."))?;
            byte = byte * 16 + digit as u8;
        }
        Ok(byte)
    }

    fn scan_field(&mut self) -> Result<TokenKind, CompileError> {
        self.advance(); // leading '_'
        if self.peek().map(|(_, c)| c) == Some('_') {
            return Err(self.error("Static fields are not supported."));
        }
        let start = self.offset();
        self.identifier_chars();
        let end = self.offset();
        Ok(TokenKind::Field(self.source[start..end].to_string()))
    }

    fn identifier_chars(&mut self) {
        while let Some((_, ch)) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.offset();
        self.identifier_chars();
        let end = self.offset();
        let ident = &self.source[start..end];

        match ident {
            "break" => TokenKind::Break,
            "class" => TokenKind::Class,
            "construct" => TokenKind::Construct,
            "else" => TokenKind::Else,
            "false" => TokenKind::False,
            "for" => TokenKind::For,
            "if" => TokenKind::If,
            "in" => TokenKind::In,
            "is" => TokenKind::Is,
            "null" => TokenKind::Null,
            "return" => TokenKind::Return,
            "static" => TokenKind::Static,
            "super" => TokenKind::Super,
            "this" => TokenKind::This,
            "true" => TokenKind::True,
            "var" => TokenKind::Var,
            "while" => TokenKind::While,
            _ => TokenKind::Name(ident.to_string()),
        }
    }

    fn error(&self, message: &str) -> CompileError {
        CompileError::new(self.line, message)
    }
}
