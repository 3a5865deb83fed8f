//! BlockCode DSL
//!
//! Text flows through four stages: the lexer produces a [`TokenStream`],
//! the parser builds an arena [`Module`], the validator binds calls and
//! infers async functions, and the code generator emits JavaScript.

pub mod lexer;
pub mod ast;
pub mod context;
pub mod parser;
pub mod grammar;
pub mod validator;
pub mod codegen;

pub use lexer::{Lexer, Token, TokenKind, TokenStream};
pub use ast::*;
pub use parser::{parse, parse_source, Parser};
pub use validator::validate;
pub use codegen::{generate, CodegenOptions};
