//! # BlockCode Scripting
//!
//! Compiler for the BlockCode block-scripting language.
//!
//! ## Features
//! - Context-sensitive lexer and parser
//! - Call binding and async inference
//! - JavaScript generation for an event-driven host
//! - Built-in system modules (`Sprite`, `Math`, `Text`, `Game`)
//!
//! ## Pipeline
//!
//! ```text
//! source -> lexer -> parser -> validator -> codegen -> JavaScript
//! ```
//!
//! The generated text is the body of an async function taking
//! `(loader, runner)`; the host compiles and runs it.

pub mod error;
pub mod dsl;
pub mod builtins;
pub mod loader;

pub use error::{ErrorCode, ScriptError, Result};
pub use dsl::{CodegenOptions, Module, NodeId, Token, TokenKind, TokenStream};
pub use loader::{CodeLoader, ModuleItem, ModuleLoader};
