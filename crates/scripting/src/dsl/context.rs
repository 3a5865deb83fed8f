//! Parser regions
//!
//! Every nested grammar production runs inside a [`ParserContext`] that
//! decides which tokens end it. Rules marked `Inherit` are resolved by
//! asking the enclosing region, so an expression inside a block picks up
//! the block's line-break handling while adding its own end keywords.

use crate::dsl::lexer::{Token, TokenKind};
use crate::error::{ErrorCode, Result, ScriptError};

/// How a line break is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EolRule {
    Inherit,
    Whitespace,
    Terminator,
}

/// How a `;` is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemiRule {
    Inherit,
    Terminator,
    Disallow,
}

/// Classification of a token under the active region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    /// Skipped silently
    Trivia,
    /// Statement separator that ends a non-greedy region
    Separator,
    /// End token of the region (or end of stream)
    End,
    /// Ordinary token
    Content,
}

/// One parsing region
#[derive(Debug, Clone)]
pub struct ParserContext {
    pub eol: EolRule,
    pub semi: SemiRule,
    pub end_tokens: Vec<TokenKind>,
    /// Consult the enclosing region's end tokens too
    pub inherit_end: bool,
    /// Skips statement separators instead of stopping at them
    pub greedy: bool,
    /// Comments are statements here rather than trivia
    pub comments: bool,
    pub reached_end: bool,
}

impl ParserContext {
    /// Module level: declarations separated by lines or `;`
    pub fn root() -> Self {
        Self {
            eol: EolRule::Terminator,
            semi: SemiRule::Terminator,
            end_tokens: Vec::new(),
            inherit_end: false,
            greedy: true,
            comments: false,
            reached_end: false,
        }
    }

    /// Statement list ended by one of `end_tokens`
    pub fn block(end_tokens: &[TokenKind]) -> Self {
        Self {
            eol: EolRule::Terminator,
            semi: SemiRule::Terminator,
            end_tokens: end_tokens.to_vec(),
            inherit_end: false,
            greedy: true,
            comments: true,
            reached_end: false,
        }
    }

    /// A single simple statement. Stops at the enclosing block's
    /// separators and end tokens.
    pub fn statement() -> Self {
        Self {
            eol: EolRule::Inherit,
            semi: SemiRule::Inherit,
            end_tokens: Vec::new(),
            inherit_end: true,
            greedy: false,
            comments: false,
            reached_end: false,
        }
    }

    /// A control structure. Its closing keywords are consumed as content,
    /// so it must not see the enclosing block's end tokens.
    pub fn structure() -> Self {
        Self {
            inherit_end: false,
            ..Self::statement()
        }
    }

    /// Declaration or control-structure header, free to span lines
    pub fn header(end_tokens: &[TokenKind]) -> Self {
        Self {
            eol: EolRule::Whitespace,
            semi: SemiRule::Disallow,
            end_tokens: end_tokens.to_vec(),
            inherit_end: false,
            greedy: false,
            comments: false,
            reached_end: false,
        }
    }

    /// Parenthesized list or sub-expression
    pub fn group(end_tokens: &[TokenKind]) -> Self {
        Self::header(end_tokens)
    }

    /// Expression: adds nothing, inherits everything
    pub fn expression() -> Self {
        Self::statement()
    }
}

/// The chain of active regions, innermost last
#[derive(Debug, Clone)]
pub struct ContextStack {
    frames: Vec<ParserContext>,
}

impl ContextStack {
    pub fn new(root: ParserContext) -> Self {
        Self { frames: vec![root] }
    }

    pub fn push(&mut self, context: ParserContext) {
        self.frames.push(context);
    }

    pub fn pop(&mut self) -> Option<ParserContext> {
        // The root frame stays for the lifetime of the parse
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current(&self) -> &ParserContext {
        &self.frames[self.frames.len() - 1]
    }

    pub fn mark_reached_end(&mut self) {
        let last = self.frames.len() - 1;
        self.frames[last].reached_end = true;
    }

    fn eol_rule(&self, depth: usize) -> EolRule {
        match self.frames[depth].eol {
            EolRule::Inherit if depth > 0 => self.eol_rule(depth - 1),
            EolRule::Inherit => EolRule::Whitespace,
            rule => rule,
        }
    }

    fn semi_rule(&self, depth: usize) -> SemiRule {
        match self.frames[depth].semi {
            SemiRule::Inherit if depth > 0 => self.semi_rule(depth - 1),
            SemiRule::Inherit => SemiRule::Terminator,
            rule => rule,
        }
    }

    fn is_end_kind(&self, depth: usize, kind: TokenKind) -> bool {
        let frame = &self.frames[depth];
        if frame.end_tokens.contains(&kind) {
            return true;
        }
        frame.inherit_end && depth > 0 && self.is_end_kind(depth - 1, kind)
    }

    /// Decide what `token` means in the innermost region
    pub fn classify(&self, token: &Token) -> Result<TokenClass> {
        let top = self.frames.len() - 1;
        let frame = &self.frames[top];

        let class = match token.kind {
            TokenKind::Whitespace => TokenClass::Trivia,
            TokenKind::Eos => TokenClass::End,
            TokenKind::Comment if frame.comments => TokenClass::Content,
            TokenKind::Comment => TokenClass::Trivia,
            TokenKind::Eol => match self.eol_rule(top) {
                EolRule::Terminator => TokenClass::Separator,
                _ => TokenClass::Trivia,
            },
            TokenKind::Semi => match self.semi_rule(top) {
                SemiRule::Disallow => {
                    return Err(ScriptError::parse(
                        ErrorCode::InvalidToken,
                        Some(token),
                        "';' is not allowed here",
                    ))
                }
                _ => TokenClass::Separator,
            },
            kind if self.is_end_kind(top, kind) => TokenClass::End,
            _ => TokenClass::Content,
        };

        Ok(match class {
            TokenClass::Separator if frame.greedy => TokenClass::Trivia,
            class => class,
        })
    }
}
