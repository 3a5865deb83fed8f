//! DSL Parser
//!
//! Cursor over a [`TokenStream`] plus the stack of active parsing regions.
//! The grammar productions live in [`crate::dsl::grammar`]; this type only
//! knows how to move through tokens and classify them.

use crate::dsl::ast::{Module, Node, NodeId};
use crate::dsl::context::{ContextStack, ParserContext, TokenClass};
use crate::dsl::grammar;
use crate::dsl::lexer::{self, Token, TokenKind, TokenStream};
use crate::error::{ErrorCode, Result, ScriptError};
use blockcode_core::ModuleKind;

/// Parse a token stream into a user module
pub fn parse(name: &str, tokens: &TokenStream) -> Result<Module> {
    let mut parser = Parser::new(tokens, Module::new(name, ModuleKind::User));
    grammar::parse_module(&mut parser)?;
    Ok(parser.into_module())
}

/// Lex and parse source text
pub fn parse_source(name: &str, source: &str) -> Result<Module> {
    let tokens = lexer::load(source)?;
    parse(name, &tokens)
}

/// DSL parser
pub struct Parser<'a> {
    tokens: &'a TokenStream,
    /// Index of the next unread token
    cursor: usize,
    /// Last token read, or the terminator that stopped the last read
    token: Token,
    contexts: ContextStack,
    module: Module,
}

impl<'a> Parser<'a> {
    /// Create a new parser writing into `module`
    pub fn new(tokens: &'a TokenStream, module: Module) -> Self {
        Self {
            tokens,
            cursor: 0,
            token: tokens.get(0).clone(),
            contexts: ContextStack::new(ParserContext::root()),
            module,
        }
    }

    pub fn into_module(self) -> Module {
        self.module
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn module_mut(&mut self) -> &mut Module {
        &mut self.module
    }

    /// Current token
    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn context(&self) -> &ParserContext {
        self.contexts.current()
    }

    pub fn add(&mut self, node: Node, start_token: Token) -> NodeId {
        self.module.add(node, start_token)
    }

    /// Run `f` inside a nested region
    pub fn within<T>(
        &mut self,
        context: ParserContext,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.contexts.push(context);
        let result = f(self);
        self.contexts.pop();
        result
    }

    /// Position and class of the next non-trivia token
    fn scan(&self) -> Result<(TokenClass, usize)> {
        let mut pos = self.cursor;
        loop {
            let token = self.tokens.get(pos);
            match self.contexts.classify(token)? {
                TokenClass::Trivia => pos += 1,
                class => return Ok((class, pos.min(self.tokens.len() - 1))),
            }
        }
    }

    /// Advance past trivia to the next token.
    ///
    /// Returns false without consuming anything when the next token ends
    /// the active region; `token()` then holds that terminator.
    pub fn try_read(&mut self) -> Result<bool> {
        let (class, pos) = self.scan()?;
        self.token = self.tokens.get(pos).clone();

        match class {
            TokenClass::Content => {
                self.cursor = pos + 1;
                Ok(true)
            }
            _ => {
                // A skipped comment stays unread: the enclosing block keeps
                // comments as statements
                self.cursor = (self.cursor..pos)
                    .find(|&i| self.tokens.get(i).kind == TokenKind::Comment)
                    .unwrap_or(pos);
                if self.token.kind == TokenKind::Eos {
                    self.contexts.mark_reached_end();
                }
                Ok(false)
            }
        }
    }

    /// Read the next token or fail
    pub fn read(&mut self) -> Result<Token> {
        if !self.try_read()? {
            let message = match self.token.kind {
                TokenKind::Eos => "unexpected end of script".to_string(),
                _ => format!("unexpected '{}'", self.token.value.trim()),
            };
            return Err(ScriptError::parse(ErrorCode::ReadPastEnd, Some(&self.token), message));
        }
        Ok(self.token.clone())
    }

    /// Read the next token and require its kind
    pub fn read_kind(&mut self, kind: TokenKind) -> Result<Token> {
        let token = self.read()?;
        if token.kind != kind {
            return Err(ScriptError::parse(
                ErrorCode::WrongToken,
                Some(&token),
                format!("expected {:?}, found {:?}", kind, token.kind),
            ));
        }
        Ok(token)
    }

    /// Next token if it is ordinary content in the active region
    pub fn peek(&self) -> Result<Option<&Token>> {
        let (class, pos) = self.scan()?;
        Ok(match class {
            TokenClass::Content => Some(self.tokens.get(pos)),
            _ => None,
        })
    }

    pub fn peek_kind(&self, kind: TokenKind) -> Result<bool> {
        Ok(self.peek()?.is_some_and(|t| t.kind == kind))
    }

    /// Consume the terminator the last read stopped at (or the next
    /// non-trivia token), regardless of how the region classifies it
    pub fn expect_terminator(&mut self, kind: TokenKind) -> Result<Token> {
        let (_, pos) = self.scan()?;
        let token = self.tokens.get(pos);
        if token.kind != kind {
            let code = match token.kind {
                TokenKind::Eos => ErrorCode::ReadPastEnd,
                _ => ErrorCode::WrongToken,
            };
            return Err(ScriptError::parse(
                code,
                Some(token),
                format!("expected {:?}, found {:?}", kind, token.kind),
            ));
        }
        self.token = token.clone();
        self.cursor = pos + 1;
        Ok(self.token.clone())
    }

    /// Require that nothing but a separator or end token follows
    pub fn expect_statement_end(&self) -> Result<()> {
        let (class, pos) = self.scan()?;
        match class {
            TokenClass::Content => Err(ScriptError::parse(
                ErrorCode::InvalidToken,
                Some(self.tokens.get(pos)),
                "expected end of statement",
            )),
            _ => Ok(()),
        }
    }

    /// Reposition so that the next read returns `token` again
    pub fn move_to(&mut self, token: &Token) {
        self.cursor = token.index.min(self.tokens.len() - 1);
        self.token = token.clone();
    }

    /// Whether the raw token right after `token` (no trivia between) has
    /// the given kind
    pub fn is_adjacent(&self, token: &Token, kind: TokenKind) -> bool {
        token
            .index
            .checked_add(1)
            .is_some_and(|next| next < self.tokens.len() && self.tokens.get(next).kind == kind)
    }

    /// Build an error pointing at the current token
    pub fn error(&self, code: ErrorCode, message: impl Into<String>) -> ScriptError {
        ScriptError::parse(code, Some(&self.token), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser_for(tokens: &TokenStream) -> Parser<'_> {
        Parser::new(tokens, Module::new("test", ModuleKind::User))
    }

    #[test]
    fn test_try_read_skips_trivia() {
        let tokens = lexer::load("  foo \n\n bar").unwrap();
        let mut parser = parser_for(&tokens);

        assert!(parser.try_read().unwrap());
        assert_eq!(parser.token().value, "foo");
        assert!(parser.try_read().unwrap());
        assert_eq!(parser.token().value, "bar");
        assert!(!parser.try_read().unwrap());
        assert_eq!(parser.token().kind, TokenKind::Eos);
        assert!(parser.context().reached_end);
    }

    #[test]
    fn test_end_token_is_not_consumed() {
        let tokens = lexer::load("a then b").unwrap();
        let mut parser = parser_for(&tokens);

        parser
            .within(ParserContext::header(&[TokenKind::Then]), |p| {
                assert!(p.try_read()?);
                assert!(!p.try_read()?);
                assert_eq!(p.token().kind, TokenKind::Then);
                // Still not consumed
                assert!(!p.try_read()?);
                p.expect_terminator(TokenKind::Then)?;
                assert!(p.try_read()?);
                assert_eq!(p.token().value, "b");
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_peek_does_not_move() {
        let tokens = lexer::load("x := 1").unwrap();
        let mut parser = parser_for(&tokens);

        assert!(parser.peek_kind(TokenKind::Identifier).unwrap());
        assert!(parser.peek_kind(TokenKind::Identifier).unwrap());
        parser.read().unwrap();
        assert!(parser.peek_kind(TokenKind::Assign).unwrap());
    }

    #[test]
    fn test_move_to_rewinds() {
        let tokens = lexer::load("a b c").unwrap();
        let mut parser = parser_for(&tokens);

        let a = parser.read().unwrap();
        parser.read().unwrap();
        parser.read().unwrap();
        parser.move_to(&a);
        assert_eq!(parser.read().unwrap().value, "a");
    }

    #[test]
    fn test_read_kind_mismatch() {
        let tokens = lexer::load("foo").unwrap();
        let mut parser = parser_for(&tokens);

        let err = parser.read_kind(TokenKind::Number).unwrap_err();
        assert_eq!(err.code(), ErrorCode::WrongToken);

        let err = parser.read().unwrap_err();
        assert_eq!(err.code(), ErrorCode::ReadPastEnd);
    }

    #[test]
    fn test_adjacency() {
        let tokens = lexer::load("foo(1) bar (2)").unwrap();
        let parser = parser_for(&tokens);

        let foo = tokens.get(0);
        let bar = tokens.iter().find(|t| t.value == "bar").unwrap();
        assert!(parser.is_adjacent(foo, TokenKind::LParen));
        assert!(!parser.is_adjacent(bar, TokenKind::LParen));
    }
}
