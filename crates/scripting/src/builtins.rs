//! Built-in system modules
//!
//! Native function tables the host hands out through
//! `loader.getModule(name)`. Scripts call them by qualified name
//! (`Sprite.say "hi"`); only their signatures and async flags live here.

use crate::dsl::ast::{FuncBody, FuncDef, Module, NativeFn, Node, NodeId, ParamDef, TypeDef};
use crate::dsl::lexer::{Token, TokenKind};
use blockcode_core::ModuleKind;

type RegisterFn = fn(&mut SystemModuleBuilder);

/// Every system module, in binding order
const SYSTEM_MODULES: &[(&str, RegisterFn)] = &[
    ("Sprite", register_sprite_functions),
    ("Math", register_math_functions),
    ("Text", register_text_functions),
    ("Game", register_game_functions),
];

/// Build all system modules
pub fn system_modules() -> Vec<Module> {
    SYSTEM_MODULES
        .iter()
        .map(|(name, register)| build(name, *register))
        .collect()
}

/// Build one system module by name
pub fn system_module(name: &str) -> Option<Module> {
    SYSTEM_MODULES
        .iter()
        .find(|(module, _)| *module == name)
        .map(|(name, register)| build(name, *register))
}

pub fn system_module_names() -> impl Iterator<Item = &'static str> {
    SYSTEM_MODULES.iter().map(|(name, _)| *name)
}

fn build(name: &str, register: RegisterFn) -> Module {
    let mut builder = SystemModuleBuilder::new(name);
    register(&mut builder);
    builder.build()
}

/// Assembles a native module with synthetic tokens
pub struct SystemModuleBuilder {
    module: Module,
}

impl SystemModuleBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            module: Module::new(name, ModuleKind::System),
        }
    }

    /// Register a synchronous function; `params` are `(name, type)` pairs
    pub fn function(&mut self, name: &str, params: &[(&str, &str)]) -> &mut Self {
        self.add_function(name, params, false);
        self
    }

    /// Register a function the host implements with a promise
    pub fn async_function(&mut self, name: &str, params: &[(&str, &str)]) -> &mut Self {
        self.add_function(name, params, true);
        self
    }

    pub fn type_def(&mut self, name: &str, native: &str) -> &mut Self {
        let token = Token::synthetic(TokenKind::Identifier, name);
        let node = Node::TypeDef(TypeDef {
            name: token.clone(),
            native: native.to_string(),
            fields: Vec::new(),
        });
        let id = self.module.add(node, token);
        self.module.set_parent(id, Module::ROOT);
        self.module.type_defs.push(id);
        self
    }

    fn add_function(&mut self, name: &str, params: &[(&str, &str)], is_async: bool) -> NodeId {
        let param_ids: Vec<NodeId> = params
            .iter()
            .map(|(param, ty)| {
                let token = Token::synthetic(TokenKind::Identifier, *param);
                let node = Node::ParamDef(ParamDef {
                    name: token.clone(),
                    ty: Token::synthetic(TokenKind::Identifier, *ty),
                });
                self.module.add(node, token)
            })
            .collect();

        let token = Token::synthetic(TokenKind::Identifier, name);
        let func = FuncDef {
            name: token.clone(),
            params: param_ids.clone(),
            return_type: None,
            is_async,
            body: FuncBody::Native(NativeFn {
                symbol: self.module.qualified_name(name),
            }),
        };
        let id = self.module.add(Node::FuncDef(func), token);

        for param in param_ids {
            self.module.set_parent(param, id);
        }
        self.module.set_parent(id, Module::ROOT);
        self.module.func_defs.push(id);
        id
    }

    pub fn build(self) -> Module {
        self.module
    }
}

/// Movement, speech and visibility of the script's sprite
fn register_sprite_functions(m: &mut SystemModuleBuilder) {
    m.type_def("Sprite", "Sprite");

    // Movement
    m.function("moveTo", &[("x", "number"), ("y", "number")]);
    m.function("moveBy", &[("dx", "number"), ("dy", "number")]);
    m.function("turn", &[("degrees", "number")]);
    m.async_function("glide", &[("x", "number"), ("y", "number"), ("seconds", "number")]);

    // Looks
    m.function("say", &[("text", "text")]);
    m.function("show", &[]);
    m.function("hide", &[]);

    m.async_function("wait", &[("seconds", "number")]);
}

fn register_math_functions(m: &mut SystemModuleBuilder) {
    m.function("abs", &[("value", "number")]);
    m.function("min", &[("a", "number"), ("b", "number")]);
    m.function("max", &[("a", "number"), ("b", "number")]);
    m.function("random", &[("from", "number"), ("to", "number")]);
    m.function("sqrt", &[("value", "number")]);
    m.function("pow", &[("base", "number"), ("exponent", "number")]);
    m.function("floor", &[("value", "number")]);
    m.function("round", &[("value", "number")]);
}

fn register_text_functions(m: &mut SystemModuleBuilder) {
    m.function("length", &[("text", "text")]);
    m.function("upper", &[("text", "text")]);
    m.function("lower", &[("text", "text")]);
    m.function("concat", &[("a", "text"), ("b", "text")]);
    m.function("contains", &[("text", "text"), ("part", "text")]);
}

/// Messaging between scripts and host services
fn register_game_functions(m: &mut SystemModuleBuilder) {
    m.function("send", &[("name", "text")]);
    m.function("time", &[]);
    m.function("log", &[("value", "any")]);
    m.async_function("sleep", &[("seconds", "number")]);
    m.function("spawn", &[("name", "text")]);
}
