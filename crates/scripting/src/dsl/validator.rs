//! Semantic validation
//!
//! Binds every call to its function definition and works out which
//! functions must be emitted as `async`. A function is async when it
//! contains a `forever` loop or calls an async function, transitively.

use crate::dsl::ast::{FuncBody, FuncRef, Module, Node, NodeId};
use crate::dsl::lexer::{Token, TokenKind};
use crate::error::{ErrorCode, Result, ScriptError};
use crate::loader::CodeLoader;
use std::collections::{HashMap, HashSet};
use std::mem;
use tracing::debug;

/// Validate `module` in place.
///
/// Without a loader only the module's own functions are callable. With
/// one, every system function is callable by its qualified name
/// (`Sprite.say`) as well.
pub fn validate(module: &mut Module, loader: Option<&dyn CodeLoader>) -> Result<()> {
    let bindings = Bindings::build(module, loader)?;
    let mut validator = Validator {
        module,
        bindings,
        scopes: Vec::new(),
        visited: HashSet::new(),
        callers: HashMap::new(),
    };
    validator.run()
}

/// What a call name resolves to
#[derive(Debug, Clone)]
enum Binding {
    System {
        func: FuncRef,
        is_async: bool,
        params: Vec<String>,
    },
    /// Function of the module being validated. Its async flag may still
    /// change, so it is read from the module when needed.
    User(NodeId),
}

#[derive(Debug, Default)]
struct Bindings {
    names: HashMap<String, Binding>,
}

impl Bindings {
    fn build(module: &Module, loader: Option<&dyn CodeLoader>) -> Result<Self> {
        let mut names = HashMap::new();

        if let Some(loader) = loader {
            for system in loader.system_modules() {
                for &id in &system.func_defs {
                    let Some(func) = system.func_def(id) else {
                        continue;
                    };
                    let binding = Binding::System {
                        func: FuncRef {
                            module: system.id,
                            node: id,
                        },
                        is_async: func.is_async,
                        params: system.param_names(id).into_iter().map(String::from).collect(),
                    };
                    names.insert(system.qualified_name(&func.name.value), binding);
                }
            }
        }

        let mut declared = HashSet::new();
        for &id in &module.func_defs {
            let Some(func) = module.func_def(id) else {
                continue;
            };
            if !declared.insert(func.name.value.as_str()) {
                return Err(ScriptError::semantic(
                    ErrorCode::InvalidArgument,
                    Some(&func.name),
                    format!("function '{}' is declared twice", func.name.value),
                ));
            }
            names.insert(func.name.value.clone(), Binding::User(id));
            if !module.name.is_empty() {
                names.insert(module.qualified_name(&func.name.value), Binding::User(id));
            }
        }

        Ok(Self { names })
    }

    fn get(&self, name: &str) -> Option<&Binding> {
        self.names.get(name)
    }
}

/// Scope frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Function(NodeId),
    Call(NodeId),
}

struct Validator<'a> {
    module: &'a mut Module,
    bindings: Bindings,
    scopes: Vec<Scope>,
    visited: HashSet<NodeId>,
    /// Callee -> functions that call it
    callers: HashMap<NodeId, Vec<NodeId>>,
}

impl Validator<'_> {
    fn run(&mut self) -> Result<()> {
        for id in self.module.var_defs.clone() {
            self.validate_node(id, Module::ROOT)?;
        }
        for id in self.module.on_defs.clone() {
            self.module.set_parent(id, Module::ROOT);
            self.validate_function(id)?;
        }
        for id in self.module.func_defs.clone() {
            self.module.set_parent(id, Module::ROOT);
            self.validate_function(id)?;
        }

        let async_count = self
            .module
            .func_defs
            .iter()
            .chain(&self.module.on_defs)
            .filter(|&&id| self.module.is_async(id))
            .count();
        debug!(
            "Validated module '{}': {} nodes, {} async functions",
            self.module.name,
            self.module.len(),
            async_count
        );
        Ok(())
    }

    /// Validate a function or handler once
    fn validate_function(&mut self, id: NodeId) -> Result<()> {
        if !self.visited.insert(id) {
            return Ok(());
        }
        if let Node::OnDef(_) = self.module.node(id) {
            self.check_handler(id)?;
        }

        let Some(func) = self.module.func_def(id).cloned() else {
            return Err(self.error(id, ErrorCode::NotImplemented, "not a function"));
        };

        for &param in &func.params {
            self.module.set_parent(param, id);
        }

        self.scopes.push(Scope::Function(id));
        let result = match func.body {
            FuncBody::Block(body) => self.validate_node(body, id),
            FuncBody::Native(_) => Ok(()),
        };
        self.scopes.pop();
        result
    }

    fn check_handler(&self, id: NodeId) -> Result<()> {
        let Some(on) = self.module.on_def(id) else {
            return Ok(());
        };

        if on.event.kind == TokenKind::Event {
            return Ok(());
        }
        match on.event.value.as_str() {
            "start" | "load" => match (&on.filter, on.func.params.first()) {
                (Some(filter), _) => Err(ScriptError::semantic(
                    ErrorCode::InvalidArgument,
                    Some(filter),
                    format!("'on {}' does not take a filter", on.event.value),
                )),
                (None, Some(&param)) => Err(ScriptError::semantic(
                    ErrorCode::InvalidArgument,
                    Some(&self.module.data(param).start_token),
                    format!("'on {}' does not take parameters", on.event.value),
                )),
                (None, None) => Ok(()),
            },
            "message" if on.filter.is_none() && on.func.params.is_empty() => Err(ScriptError::semantic(
                ErrorCode::InvalidArgument,
                Some(&on.event),
                "'on message' needs a message name or a parameter",
            )),
            "message" => Ok(()),
            other => Err(ScriptError::semantic(
                ErrorCode::UnknownEventName,
                Some(&on.event),
                format!("unknown event '{}'", other),
            )),
        }
    }

    fn validate_node(&mut self, id: NodeId, parent: NodeId) -> Result<()> {
        self.module.set_parent(id, parent);

        match self.module.node(id).clone() {
            Node::VarDef(var) => self.validate_opt(var.value, id),
            Node::Return { value } => self.validate_opt(value, id),
            Node::Assignment { value, .. } | Node::CallParam { value, .. } => self.validate_node(value, id),
            Node::Call(_) => self.validate_call(id),
            Node::Expression { items } => self.validate_all(&items, id),
            Node::Block { statements } => self.validate_all(&statements, id),
            Node::If(node) => {
                self.validate_node(node.condition, id)?;
                self.validate_node(node.then_block, id)?;
                for elif in &node.elifs {
                    self.validate_node(elif.condition, id)?;
                    self.validate_node(elif.block, id)?;
                }
                self.validate_opt(node.else_block, id)
            }
            Node::For(node) => {
                self.validate_node(node.start, id)?;
                self.validate_node(node.end, id)?;
                self.validate_opt(node.step, id)?;
                self.validate_node(node.body, id)
            }
            Node::Forever { body } => {
                self.mark_enclosing_async();
                self.validate_node(body, id)
            }
            Node::Foreach { source, body, .. } => {
                self.validate_node(source, id)?;
                self.validate_node(body, id)
            }
            Node::While { condition, body } => {
                self.validate_node(condition, id)?;
                self.validate_node(body, id)
            }
            Node::Break | Node::Const(_) | Node::Id(_) | Node::Op(_) | Node::Comment(_) | Node::Placeholder(_) => {
                Ok(())
            }
            other => Err(self.error(
                id,
                ErrorCode::NotImplemented,
                format!("{} is not allowed here", other.kind_name()),
            )),
        }
    }

    fn validate_all(&mut self, ids: &[NodeId], parent: NodeId) -> Result<()> {
        for &id in ids {
            self.validate_node(id, parent)?;
        }
        Ok(())
    }

    fn validate_opt(&mut self, id: Option<NodeId>, parent: NodeId) -> Result<()> {
        match id {
            Some(id) => self.validate_node(id, parent),
            None => Ok(()),
        }
    }

    fn validate_call(&mut self, id: NodeId) -> Result<()> {
        let Some(call) = self.module.call(id).cloned() else {
            return Ok(());
        };
        let Some(binding) = self.bindings.get(&call.name.value).cloned() else {
            return Err(ScriptError::semantic(
                ErrorCode::UnknownFunctionName,
                Some(&call.name),
                format!("unknown function '{}'", call.name.value),
            ));
        };

        self.scopes.push(Scope::Call(id));
        let result = self.validate_all(&call.params, id);
        self.scopes.pop();
        result?;

        let (func, is_async, params) = match binding {
            Binding::System { func, is_async, params } => (func, is_async, params),
            Binding::User(callee) => {
                if let Some(caller) = self.current_function() {
                    self.callers.entry(callee).or_default().push(caller);
                }
                if !self.visited.contains(&callee) {
                    // Validate the callee from the module root, not nested in this call
                    let saved = mem::take(&mut self.scopes);
                    let result = self.validate_function(callee);
                    self.scopes = saved;
                    result?;
                }
                let params = self.module.param_names(callee).into_iter().map(String::from).collect();
                let func = FuncRef {
                    module: self.module.id,
                    node: callee,
                };
                (func, self.module.is_async(callee), params)
            }
        };

        self.check_arguments(&call.name, &call.params, &params)?;

        if let Node::Call(call) = self.module.node_mut(id) {
            call.func_def = Some(func);
        }
        if is_async {
            self.propagate_async();
        }
        Ok(())
    }

    /// Positional arguments fill parameters in order; named ones must name
    /// a parameter not already filled
    fn check_arguments(&self, name: &Token, args: &[NodeId], params: &[String]) -> Result<()> {
        if args.len() > params.len() {
            return Err(ScriptError::semantic(
                ErrorCode::InvalidArgument,
                Some(name),
                format!(
                    "'{}' takes {} arguments but {} were given",
                    name.value,
                    params.len(),
                    args.len()
                ),
            ));
        }

        let mut filled = HashSet::new();
        for (index, &arg) in args.iter().enumerate() {
            let slot = match self.module.node(arg) {
                Node::CallParam { name: Some(arg_name), .. } => {
                    match params.iter().position(|p| *p == arg_name.value) {
                        Some(slot) => (slot, arg_name),
                        None => {
                            return Err(ScriptError::semantic(
                                ErrorCode::InvalidArgument,
                                Some(arg_name),
                                format!("'{}' has no parameter '{}'", name.value, arg_name.value),
                            ))
                        }
                    }
                }
                _ => (index, name),
            };
            if !filled.insert(slot.0) {
                return Err(ScriptError::semantic(
                    ErrorCode::InvalidArgument,
                    Some(slot.1),
                    format!("parameter '{}' is given twice", params[slot.0]),
                ));
            }
        }
        Ok(())
    }

    fn current_function(&self) -> Option<NodeId> {
        self.scopes.iter().rev().find_map(|scope| match scope {
            Scope::Function(id) => Some(*id),
            Scope::Call(_) => None,
        })
    }

    /// `forever` makes only its nearest function async
    fn mark_enclosing_async(&mut self) {
        if let Some(func) = self.current_function() {
            self.mark_async(func);
        }
    }

    /// Walk outward marking functions async until one already is
    fn propagate_async(&mut self) {
        let functions: Vec<NodeId> = self
            .scopes
            .iter()
            .rev()
            .filter_map(|scope| match scope {
                Scope::Function(id) => Some(*id),
                Scope::Call(_) => None,
            })
            .collect();

        for func in functions {
            if self.module.is_async(func) {
                break;
            }
            self.mark_async(func);
        }
    }

    /// Set the flag and push it to every known caller
    fn mark_async(&mut self, func: NodeId) {
        let mut pending = vec![func];
        while let Some(id) = pending.pop() {
            let Some(def) = self.module.func_def_mut(id) else {
                continue;
            };
            if def.is_async {
                continue;
            }
            def.is_async = true;
            debug!("'{}' is async", def.name.value);

            if let Some(callers) = self.callers.get(&id) {
                pending.extend(callers.iter().copied());
            }
        }
    }

    fn error(&self, id: NodeId, code: ErrorCode, message: impl Into<String>) -> ScriptError {
        ScriptError::semantic(code, Some(&self.module.data(id).start_token), message)
    }
}
