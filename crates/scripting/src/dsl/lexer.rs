//! DSL Lexer and Tokenizer
//!
//! Lexical analysis for the behavior scripting language. Unlike most
//! lexers, trivia is kept in the stream: line breaks are statement
//! separators and the parser decides per region whether whitespace-like
//! tokens matter.

use crate::error::{ErrorCode, Result, ScriptError};
use serde::Serialize;
use std::iter::Peekable;
use std::str::CharIndices;

/// DSL token kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // Trivia
    Whitespace,
    Eol,
    Eos,
    Comment,

    // Comparison
    Equal,          // = ==
    NotEqual,       // <> !=
    Less,           // <
    Greater,        // >
    LessEqual,      // <=
    GreaterEqual,   // >=

    // Boolean
    And,            // and &&
    Or,             // or ||
    Not,            // not !

    // Arithmetic
    Plus,           // +
    Minus,          // -
    Star,           // *
    Slash,          // /
    Percent,        // %

    // Type test
    Is,

    // Punctuation
    LParen,         // (
    RParen,         // )
    LBrace,         // {
    RBrace,         // }
    LBracket,       // [
    RBracket,       // ]
    Comma,          // ,
    Semi,           // ;
    Colon,          // :
    Assign,         // :=

    // Literals
    Number,
    String,
    True,
    False,

    // Keywords
    Break,
    For,
    Foreach,
    Forever,
    In,
    To,
    By,
    Do,
    While,
    If,
    Then,
    Else,
    Elif,
    End,
    Begin,
    Function,
    Var,
    Return,
    On,
    Event,

    Identifier,

    // Produced by the structural editor for incomplete nodes
    LinePlaceholder,
    IdPlaceholder,
    ExpressionPlaceholder,
    ParamPlaceholder,
    BodyPlaceholder,
}

impl TokenKind {
    /// Binary or unary operator
    pub fn is_operator(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Equal | NotEqual | Less | Greater | LessEqual | GreaterEqual | And | Or | Not | Plus
                | Minus | Star | Slash | Percent | Is
        )
    }

    /// Operator allowed in prefix position
    pub fn is_unary_operator(self) -> bool {
        matches!(self, TokenKind::Not | TokenKind::Minus)
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::Number | TokenKind::String | TokenKind::True | TokenKind::False
        )
    }

    pub fn is_placeholder(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            LinePlaceholder | IdPlaceholder | ExpressionPlaceholder | ParamPlaceholder | BodyPlaceholder
        )
    }

    /// Placeholder that stands for a value inside an expression
    pub fn is_value_placeholder(self) -> bool {
        matches!(self, TokenKind::IdPlaceholder | TokenKind::ExpressionPlaceholder)
    }
}

/// A lexed token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the token. For strings this is the raw content
    /// between the quotes, escapes untouched.
    pub value: String,
    /// Byte offset in the source
    pub position: usize,
    /// 1-based source line
    pub line: usize,
    /// Ordinal of the token in its stream
    pub index: usize,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, position: usize, line: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            position,
            line,
            index: 0,
        }
    }

    /// Token that does not come from source text (native declarations)
    pub fn synthetic(kind: TokenKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            position: 0,
            line: 0,
            index: usize::MAX,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.index == usize::MAX
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

/// Flat, indexed token stream
///
/// Always terminated by exactly one `Eos` token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    /// Build a stream from tokens produced elsewhere (the block editor).
    ///
    /// Indices are reassigned and a trailing `Eos` is added if missing.
    pub fn from_tokens(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map_or(true, |t| t.kind != TokenKind::Eos) {
            let position = tokens.last().map_or(0, |t| t.position + t.value.len());
            let line = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token::new(TokenKind::Eos, "", position, line));
        }
        for (index, token) in tokens.iter_mut().enumerate() {
            token.index = index;
        }
        Self { tokens }
    }

    /// Token at `index`; indices past the end resolve to `Eos`
    pub fn get(&self, index: usize) -> &Token {
        self.tokens
            .get(index)
            .unwrap_or_else(|| &self.tokens[self.tokens.len() - 1])
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.len() <= 1
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Tokens without whitespace, for diagnostics and tests
    pub fn significant(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| t.kind != TokenKind::Whitespace)
    }
}

/// Lex a whole source text
pub fn load(source: &str) -> Result<TokenStream> {
    Lexer::new(source).tokenize()
}

/// DSL lexer
pub struct Lexer<'a> {
    source: &'a str,
    input: Peekable<CharIndices<'a>>,
    position: usize,
    line: usize,
    ch: Option<char>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer
    pub fn new(source: &'a str) -> Self {
        let mut input = source.char_indices().peekable();
        let (position, ch) = match input.next() {
            Some((pos, ch)) => (pos, Some(ch)),
            None => (0, None),
        };
        Self {
            source,
            input,
            position,
            line: 1,
            ch,
            tokens: Vec::new(),
        }
    }

    /// Scan the whole input
    pub fn tokenize(mut self) -> Result<TokenStream> {
        loop {
            let token = self.next_token()?;
            let is_eos = token.kind == TokenKind::Eos;
            self.produce(token);
            if is_eos {
                break;
            }
        }
        Ok(TokenStream { tokens: self.tokens })
    }

    fn produce(&mut self, mut token: Token) {
        token.index = self.tokens.len();
        self.tokens.push(token);
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token> {
        let start = self.position;
        let line = self.line;

        let Some(ch) = self.ch else {
            return Ok(Token::new(TokenKind::Eos, "", self.source.len(), line));
        };

        let kind = match ch {
            '\n' => {
                self.advance();
                self.line += 1;
                TokenKind::Eol
            }
            '\r' if self.peek_char() == Some('\n') => {
                self.advance();
                self.advance();
                self.line += 1;
                TokenKind::Eol
            }
            c if c.is_whitespace() => {
                while let Some(c) = self.ch {
                    if !c.is_whitespace() || c == '\n' || self.at_crlf() {
                        break;
                    }
                    self.advance();
                }
                TokenKind::Whitespace
            }
            '0'..='9' => self.read_number(),
            '"' => return self.read_string(start, line),

            '/' if self.peek_char() == Some('/') => {
                while self.ch.is_some() && self.ch != Some('\n') && !self.at_crlf() {
                    self.advance();
                }
                TokenKind::Comment
            }

            '=' => {
                self.advance();
                self.advance_if('=');
                TokenKind::Equal
            }
            '<' => {
                self.advance();
                if self.advance_if('=') {
                    TokenKind::LessEqual
                } else if self.advance_if('>') {
                    TokenKind::NotEqual
                } else {
                    TokenKind::Less
                }
            }
            '>' => {
                self.advance();
                if self.advance_if('=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                }
            }
            '!' => {
                self.advance();
                if self.advance_if('=') {
                    TokenKind::NotEqual
                } else {
                    TokenKind::Not
                }
            }
            ':' => {
                self.advance();
                if self.advance_if('=') {
                    TokenKind::Assign
                } else {
                    TokenKind::Colon
                }
            }
            '&' if self.peek_char() == Some('&') => {
                self.advance();
                self.advance();
                TokenKind::And
            }
            '|' if self.peek_char() == Some('|') => {
                self.advance();
                self.advance();
                TokenKind::Or
            }

            '+' => self.single(TokenKind::Plus),
            '-' => self.single(TokenKind::Minus),
            '*' => self.single(TokenKind::Star),
            '/' => self.single(TokenKind::Slash),
            '%' => self.single(TokenKind::Percent),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '{' => self.single(TokenKind::LBrace),
            '}' => self.single(TokenKind::RBrace),
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            ',' => self.single(TokenKind::Comma),
            ';' => self.single(TokenKind::Semi),

            // Letters, underscores and anything unrecognized
            _ => self.read_identifier(),
        };

        Ok(Token::new(kind, &self.source[start..self.position], start, line))
    }

    /// Read a number literal: a digit run with at most one internal '.'
    fn read_number(&mut self) -> TokenKind {
        self.skip_digits();
        if self.ch == Some('.') && matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
            self.advance();
            self.skip_digits();
        }
        TokenKind::Number
    }

    fn skip_digits(&mut self) {
        while matches!(self.ch, Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
    }

    /// Read an identifier or keyword
    ///
    /// Dots join segments into one qualified name (`Sprite.moveTo`).
    fn read_identifier(&mut self) -> TokenKind {
        let start = self.position;
        self.advance();

        while let Some(c) = self.ch {
            let continues = c.is_alphanumeric()
                || c == '_'
                || (c == '.' && matches!(self.peek_char(), Some(n) if n.is_alphabetic() || n == '_'));
            if !continues {
                break;
            }
            self.advance();
        }

        match &self.source[start..self.position] {
            "break" => TokenKind::Break,
            "for" => TokenKind::For,
            "foreach" => TokenKind::Foreach,
            "forever" => TokenKind::Forever,
            "in" => TokenKind::In,
            "to" => TokenKind::To,
            "by" => TokenKind::By,
            "do" => TokenKind::Do,
            "while" => TokenKind::While,
            "if" => TokenKind::If,
            "then" => TokenKind::Then,
            "else" => TokenKind::Else,
            "elif" => TokenKind::Elif,
            "end" => TokenKind::End,
            "begin" => TokenKind::Begin,
            "function" | "proc" => TokenKind::Function,
            "var" => TokenKind::Var,
            "return" => TokenKind::Return,
            "on" => TokenKind::On,
            "event" => TokenKind::Event,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "is" => TokenKind::Is,
            _ => TokenKind::Identifier,
        }
    }

    /// Read a string literal. Escapes are passed through verbatim; a raw
    /// line break leaves the string unterminated.
    fn read_string(&mut self, start: usize, line: usize) -> Result<Token> {
        self.advance(); // Skip opening quote
        let content_start = self.position;

        while let Some(ch) = self.ch {
            match ch {
                '"' => {
                    let value = &self.source[content_start..self.position];
                    self.advance();
                    return Ok(Token::new(TokenKind::String, value, start, line));
                }
                '\\' => {
                    self.advance();
                    if self.at_crlf() {
                        self.advance();
                    }
                    if self.ch == Some('\n') {
                        self.line += 1;
                    }
                    self.advance();
                }
                '\n' | '\r' => break,
                _ => self.advance(),
            }
        }

        Err(ScriptError::Lex {
            code: ErrorCode::NoStringEnding,
            position: start,
            line,
            message: "Unterminated string".into(),
        })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn at_crlf(&mut self) -> bool {
        self.ch == Some('\r') && self.peek_char() == Some('\n')
    }

    fn peek_char(&mut self) -> Option<char> {
        self.input.peek().map(|&(_, c)| c)
    }

    fn advance_if(&mut self, expected: char) -> bool {
        if self.ch == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advance to the next character
    fn advance(&mut self) {
        match self.input.next() {
            Some((pos, ch)) => {
                self.position = pos;
                self.ch = Some(ch);
            }
            None => {
                self.position = self.source.len();
                self.ch = None;
            }
        }
    }
}
