//! JavaScript generation
//!
//! Produces the body of an async function taking `(loader, runner)`. The
//! host compiles and runs it; nothing here evaluates code.

use crate::dsl::ast::{FuncBody, FuncDef, FuncRef, Module, Node, NodeId, OnDef};
use crate::dsl::lexer::{Token, TokenKind};
use crate::error::{ErrorCode, Result, ScriptError};
use crate::loader::{find_duplicate_name, CodeLoader};
use blockcode_core::ModuleKind;
use std::fmt::Write;

/// Output knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenOptions {
    pub indent: String,
    /// Name of the module loader parameter
    pub loader_param: String,
    /// Name of the event runner parameter
    pub runner_param: String,
    /// Statement emitted at the top of every `forever` iteration
    pub yield_statement: String,
    pub emit_comments: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            loader_param: "loader".to_string(),
            runner_param: "runner".to_string(),
            yield_statement: "await new Promise((resolve) => setTimeout(resolve, 0));".to_string(),
            emit_comments: true,
        }
    }
}

/// Generate program text for every module the loader holds.
///
/// User modules must have been validated: an unbound call is an error.
pub fn generate(loader: &dyn CodeLoader, options: &CodegenOptions) -> Result<String> {
    let mut gen = Generator {
        loader,
        options,
        out: String::new(),
        depth: 0,
    };
    gen.program()?;
    Ok(gen.out)
}

/// JSON string literal, which is also a valid JS string literal
fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

/// JS spelling of an operator
fn operator(token: &Token) -> &str {
    match token.kind {
        TokenKind::Equal => "===",
        TokenKind::NotEqual => "!==",
        TokenKind::Is => "instanceof",
        TokenKind::And => "&&",
        TokenKind::Or => "||",
        TokenKind::Not => "!",
        _ => &token.value,
    }
}

fn invalid(token: &Token, message: impl Into<String>) -> ScriptError {
    ScriptError::semantic(ErrorCode::InvalidToken, Some(token), message)
}

struct Generator<'a> {
    loader: &'a dyn CodeLoader,
    options: &'a CodegenOptions,
    out: String,
    depth: usize,
}

impl Generator<'_> {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(&self.options.indent);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn program(&mut self) -> Result<()> {
        let loader = self.loader;

        // User declarations share one scope in the output
        if let Some((name, owner)) = find_duplicate_name(loader.user_modules()) {
            return Err(ScriptError::semantic(
                ErrorCode::InvalidArgument,
                Some(name),
                format!("'{}' is already declared in module '{}'", name.value, owner),
            ));
        }

        let mut bound = false;
        for system in loader.system_modules() {
            let text = format!(
                "const {} = {}.getModule({});",
                system.name,
                self.options.loader_param,
                quote(&system.name)
            );
            self.line(&text);
            bound = true;
        }
        if bound {
            self.out.push('\n');
        }

        for item in loader.vars() {
            self.statement(item.module, item.node)?;
        }
        for item in loader.user_ons() {
            if let Some(on) = item.module.on_def(item.node) {
                self.handler(item.module, on)?;
            }
        }
        for item in loader.functions() {
            if let Some(func) = item.module.func_def(item.node) {
                self.function(item.module, func)?;
            }
        }
        Ok(())
    }

    fn handler(&mut self, module: &Module, on: &OnDef) -> Result<()> {
        let runner = &self.options.runner_param;
        let params = self.params(module, &on.func)?;
        let arrow = if on.func.is_async { "async " } else { "" };

        let head = match on.event.value.as_str() {
            "start" => format!("{runner}.onStart({arrow}() => {{"),
            "load" => format!("{runner}.onLoad({arrow}() => {{"),
            _ => {
                let key = match (&on.filter, params.first()) {
                    (Some(filter), _) => filter.value.clone(),
                    (None, Some(first)) => first.clone(),
                    (None, None) => {
                        return Err(ScriptError::semantic(
                            ErrorCode::InvalidArgument,
                            Some(&on.event),
                            "message handler has no name to route on",
                        ))
                    }
                };
                format!(
                    "{runner}.onMessage({}, {arrow}({}) => {{",
                    quote(&key),
                    params.join(", ")
                )
            }
        };

        self.line(&head);
        self.body(module, &on.func)?;
        self.line("});");
        self.out.push('\n');
        Ok(())
    }

    fn function(&mut self, module: &Module, func: &FuncDef) -> Result<()> {
        let params = self.params(module, func)?;
        let keyword = if func.is_async { "async function" } else { "function" };

        self.line(&format!("{} {}({}) {{", keyword, func.name.value, params.join(", ")));
        self.body(module, func)?;
        self.line("}");
        self.out.push('\n');
        Ok(())
    }

    fn params(&self, module: &Module, func: &FuncDef) -> Result<Vec<String>> {
        func.params
            .iter()
            .map(|&id| match module.node(id) {
                Node::ParamDef(param) => Ok(param.name.value.clone()),
                _ => Err(invalid(
                    &module.data(id).start_token,
                    "incomplete parameter list",
                )),
            })
            .collect()
    }

    fn body(&mut self, module: &Module, func: &FuncDef) -> Result<()> {
        match func.body {
            FuncBody::Block(block) => self.block(module, block),
            FuncBody::Native(_) => Ok(()),
        }
    }

    fn block(&mut self, module: &Module, block: NodeId) -> Result<()> {
        self.depth += 1;
        let result = module
            .statements(block)
            .iter()
            .try_for_each(|&statement| self.statement(module, statement));
        self.depth -= 1;
        result
    }

    fn statement(&mut self, module: &Module, id: NodeId) -> Result<()> {
        match module.node(id) {
            Node::VarDef(var) => {
                if var.name.kind != TokenKind::Identifier {
                    return Err(invalid(&var.name, "incomplete variable name"));
                }
                let text = match var.value {
                    Some(value) => format!("let {} = {};", var.name.value, self.expression(module, value)?),
                    None => format!("let {};", var.name.value),
                };
                self.line(&text);
            }
            Node::Assignment { target, value } => {
                let text = format!("{} = {};", target.value, self.expression(module, *value)?);
                self.line(&text);
            }
            Node::Call(_) => {
                let text = format!("{};", self.call(module, id, false)?);
                self.line(&text);
            }
            Node::Return { value } => {
                let text = match value {
                    Some(value) => format!("return {};", self.expression(module, *value)?),
                    None => "return;".to_string(),
                };
                self.line(&text);
            }
            Node::Break => self.line("break;"),
            Node::If(node) => {
                let head = format!("if ({}) {{", self.expression(module, node.condition)?);
                self.line(&head);
                self.block(module, node.then_block)?;
                for elif in &node.elifs {
                    let head = format!("}} else if ({}) {{", self.expression(module, elif.condition)?);
                    self.line(&head);
                    self.block(module, elif.block)?;
                }
                if let Some(else_block) = node.else_block {
                    self.line("} else {");
                    self.block(module, else_block)?;
                }
                self.line("}");
            }
            Node::For(node) => {
                let var = &node.var.value;
                let end = self.expression(module, node.end)?;
                let step = match node.step {
                    Some(step) => self.expression(module, step)?,
                    None => "1".to_string(),
                };
                // A step only known at run time picks the direction then
                let condition = match step.parse::<f64>() {
                    Ok(value) if value < 0.0 => format!("{var} >= {end}"),
                    Ok(_) => format!("{var} <= {end}"),
                    Err(_) => format!("({step} >= 0 ? {var} <= {end} : {var} >= {end})"),
                };
                let head = format!(
                    "for (let {var} = {}; {condition}; {var} += {step}) {{",
                    self.expression(module, node.start)?,
                );
                self.line(&head);
                self.block(module, node.body)?;
                self.line("}");
            }
            Node::Foreach { var, source, body } => {
                let head = format!("for (const {} of {}) {{", var.value, self.expression(module, *source)?);
                self.line(&head);
                self.block(module, *body)?;
                self.line("}");
            }
            Node::While { condition, body } => {
                let head = format!("while ({}) {{", self.expression(module, *condition)?);
                self.line(&head);
                self.block(module, *body)?;
                self.line("}");
            }
            Node::Forever { body } => {
                self.line("while (true) {");
                self.depth += 1;
                let yield_statement = self.options.yield_statement.clone();
                self.line(&yield_statement);
                self.depth -= 1;
                self.block(module, *body)?;
                self.line("}");
            }
            Node::Comment(token) => {
                if self.options.emit_comments {
                    self.line(token.value.trim_end());
                }
            }
            Node::Placeholder(token) => match token.kind {
                TokenKind::LinePlaceholder | TokenKind::BodyPlaceholder => {}
                _ => return Err(invalid(token, "incomplete statement")),
            },
            other => {
                return Err(ScriptError::semantic(
                    ErrorCode::NotImplemented,
                    Some(&module.data(id).start_token),
                    format!("cannot generate {} as a statement", other.kind_name()),
                ))
            }
        }
        Ok(())
    }

    fn expression(&self, module: &Module, id: NodeId) -> Result<String> {
        match module.node(id) {
            Node::Expression { items } => {
                let mut text = String::new();
                // A unary operator sits where an operand is expected
                let mut operand_next = true;
                for &item in items {
                    match module.node(item) {
                        Node::Op(token) if operand_next => {
                            text.push_str(operator(token));
                        }
                        Node::Op(token) => {
                            let _ = write!(text, " {} ", operator(token));
                            operand_next = true;
                        }
                        Node::Expression { .. } => {
                            let _ = write!(text, "({})", self.expression(module, item)?);
                            operand_next = false;
                        }
                        _ => {
                            text.push_str(&self.expression(module, item)?);
                            operand_next = false;
                        }
                    }
                }
                Ok(text)
            }
            Node::Const(token) => Ok(match token.kind {
                TokenKind::String => format!("\"{}\"", token.value),
                TokenKind::True => "true".to_string(),
                TokenKind::False => "false".to_string(),
                _ => token.value.clone(),
            }),
            Node::Id(token) => Ok(token.value.clone()),
            Node::Call(_) => self.call(module, id, true),
            Node::CallParam { value, .. } => self.expression(module, *value),
            Node::Placeholder(token) => Err(invalid(token, "incomplete expression")),
            other => Err(ScriptError::semantic(
                ErrorCode::NotImplemented,
                Some(&module.data(id).start_token),
                format!("cannot generate {} as an expression", other.kind_name()),
            )),
        }
    }

    /// Callee as written in output, its async flag and parameter names
    fn callee(&self, func: FuncRef) -> Option<(String, bool, Vec<String>)> {
        let module = self.loader.module(func.module)?;
        let def = module.func_def(func.node)?;
        let name = match module.kind {
            ModuleKind::System => module.qualified_name(&def.name.value),
            ModuleKind::User => def.name.value.clone(),
        };
        let params = module.param_names(func.node).into_iter().map(String::from).collect();
        Some((name, def.is_async, params))
    }

    fn call(&self, module: &Module, id: NodeId, in_expression: bool) -> Result<String> {
        let Some(call) = module.call(id) else {
            return Err(invalid(&module.data(id).start_token, "not a call"));
        };
        let Some((name, is_async, params)) = call.func_def.and_then(|func| self.callee(func)) else {
            return Err(ScriptError::semantic(
                ErrorCode::UnknownFunctionName,
                Some(&call.name),
                format!("call to '{}' is not bound to a function", call.name.value),
            ));
        };

        let args = self.arguments(module, &call.params, &params)?;
        let text = format!("{}({})", name, args.join(", "));
        Ok(match (is_async, in_expression) {
            (true, true) => format!("(await {text})"),
            (true, false) => format!("await {text}"),
            (false, _) => text,
        })
    }

    /// Arguments in parameter order. Named arguments move to their slot;
    /// unfilled slots before the last given one become `undefined`.
    fn arguments(&self, module: &Module, args: &[NodeId], params: &[String]) -> Result<Vec<String>> {
        let mut slots: Vec<Option<String>> = Vec::new();

        for (index, &arg) in args.iter().enumerate() {
            let (slot, value) = match module.node(arg) {
                Node::CallParam { name: Some(name), value } => {
                    let slot = params
                        .iter()
                        .position(|p| *p == name.value)
                        .ok_or_else(|| invalid(name, format!("no parameter named '{}'", name.value)))?;
                    (slot, *value)
                }
                Node::CallParam { name: None, value } => (index, *value),
                _ => (index, arg),
            };

            if slots.len() <= slot {
                slots.resize(slot + 1, None);
            }
            slots[slot] = Some(self.expression(module, value)?);
        }

        Ok(slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| "undefined".to_string()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;
    use crate::dsl::lexer::{self, TokenStream};
    use crate::dsl::parser::{parse, parse_source};
    use crate::dsl::validator::validate;
    use crate::loader::ModuleLoader;

    fn compile(source: &str) -> String {
        let mut loader = ModuleLoader::with_system_modules(builtins::system_modules());
        loader.load_source("main", source).unwrap();
        generate(&loader, &CodegenOptions::default()).unwrap()
    }

    fn compile_user_only(source: &str) -> String {
        let mut loader = ModuleLoader::new();
        loader.load_source("main", source).unwrap();
        generate(&loader, &CodegenOptions::default()).unwrap()
    }

    #[test]
    fn test_module_bindings_come_first() {
        let js = compile("var x := 1");

        assert!(js.starts_with("const Sprite = loader.getModule(\"Sprite\");\n"));
        assert!(js.contains("const Math = loader.getModule(\"Math\");"));
        assert!(js.contains("let x = 1;"));
    }

    #[test]
    fn test_operators_are_rewritten() {
        let js = compile_user_only(
            "function f(a: number, b: number) begin\n\
             return a = b and not (a <> b) or a is b\n\
             end",
        );

        assert!(js.contains("return a === b && !(a !== b) || a instanceof b;"), "{js}");
    }

    #[test]
    fn test_forever_yields_and_awaits() {
        let js = compile_user_only(
            "function bar() begin end\n\
             function foo() begin forever bar() end end\n\
             function baz() begin foo() end",
        );

        assert!(js.contains("function bar() {"));
        assert!(!js.contains("async function bar"));
        assert!(js.contains(
            "async function foo() {\n  while (true) {\n    await new Promise((resolve) => setTimeout(resolve, 0));\n    bar();\n  }\n}"
        ), "{js}");
        assert!(js.contains("async function baz() {\n  await foo();\n}"), "{js}");
    }

    #[test]
    fn test_async_call_in_expression() {
        let js = compile("function f() begin var t := Sprite.wait(1) + 1 end");
        assert!(js.contains("let t = (await Sprite.wait(1)) + 1;"), "{js}");
    }

    #[test]
    fn test_handlers() {
        let js = compile(
            "on start begin Sprite.show() end\n\
             on load begin end\n\
             on message \"jump\" begin Sprite.moveBy 0 10 end\n\
             on message (ping: text) begin end\n\
             on message \"rest\" begin Sprite.wait 1 end",
        );

        assert!(js.contains("runner.onStart(() => {\n  Sprite.show();\n});"), "{js}");
        assert!(js.contains("runner.onLoad(() => {\n});"), "{js}");
        assert!(js.contains("runner.onMessage(\"jump\", () => {\n  Sprite.moveBy(0, 10);\n});"), "{js}");
        assert!(js.contains("runner.onMessage(\"ping\", (ping) => {"), "{js}");
        assert!(js.contains("runner.onMessage(\"rest\", async () => {\n  await Sprite.wait(1);\n});"), "{js}");
    }

    #[test]
    fn test_control_flow() {
        let js = compile_user_only(
            "function f(items: list, step: number) begin\n\
             for i := 1 to 10 do break end\n\
             for j := 10 to 0 by -2 do end\n\
             for k := 1 to 9 by step do end\n\
             foreach item in items do end\n\
             while i < 3 do i := i + 1 end\n\
             if i > 1 then return 1 elif i = 1 then return 0 else return end\n\
             end",
        );

        assert!(js.contains("for (let i = 1; i <= 10; i += 1) {\n    break;\n  }"), "{js}");
        assert!(js.contains("for (let j = 10; j >= 0; j += -2) {"), "{js}");
        assert!(js.contains("for (let k = 1; (step >= 0 ? k <= 9 : k >= 9); k += step) {"), "{js}");
        assert!(js.contains("for (const item of items) {"), "{js}");
        assert!(js.contains("while (i < 3) {\n    i = i + 1;\n  }"), "{js}");
        assert!(js.contains(
            "if (i > 1) {\n    return 1;\n  } else if (i === 1) {\n    return 0;\n  } else {\n    return;\n  }"
        ), "{js}");
    }

    #[test]
    fn test_named_arguments_are_reordered() {
        let js = compile("function f() begin Sprite.glide(seconds := 2, x := 5) end");
        assert!(js.contains("await Sprite.glide(5, undefined, 2);"), "{js}");
    }

    #[test]
    fn test_strings_and_comments() {
        let js = compile("function f() begin\n  // greet\n  Sprite.say \"hello \\\"you\\\"\"\nend");

        assert!(js.contains("  // greet\n"), "{js}");
        assert!(js.contains("Sprite.say(\"hello \\\"you\\\"\");"), "{js}");

        let mut loader = ModuleLoader::new();
        loader.load_source("main", "function f() begin\n  // greet\nend").unwrap();
        let options = CodegenOptions {
            emit_comments: false,
            ..CodegenOptions::default()
        };
        let js = generate(&loader, &options).unwrap();
        assert!(!js.contains("greet"));
    }

    #[test]
    fn test_countdown_loop() {
        let js = compile_user_only("function f() begin for i := 5 to 1 by -1 do end end");
        assert!(js.contains("for (let i = 5; i >= 1; i += -1) {"), "{js}");
    }

    #[test]
    fn test_names_shared_across_modules_are_rejected() {
        let mut first = parse_source("a", "var score := 0\nfunction helper() begin end").unwrap();
        let mut second = parse_source("b", "var score := 1\nfunction other() begin end").unwrap();
        validate(&mut first, None).unwrap();
        validate(&mut second, None).unwrap();

        let mut loader = ModuleLoader::new();
        loader.insert_user_module(first);
        loader.insert_user_module(second);

        let err = generate(&loader, &CodegenOptions::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert!(err.to_string().contains("score"), "{err}");
    }

    #[test]
    fn test_unbound_call_is_fatal() {
        let module = parse_source("main", "function f() begin g() end\nfunction g() begin end").unwrap();
        let mut loader = ModuleLoader::new();
        loader.insert_user_module(module);

        let err = generate(&loader, &CodegenOptions::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownFunctionName);
    }

    /// Parse `source` with the identifier `HOLE` turned into a placeholder
    fn with_placeholder(source: &str, kind: TokenKind) -> ModuleLoader {
        let tokens = lexer::load(source)
            .unwrap()
            .tokens()
            .iter()
            .cloned()
            .map(|mut token| {
                if token.value == "HOLE" {
                    token.kind = kind;
                }
                token
            })
            .collect();
        let mut module = parse("main", &TokenStream::from_tokens(tokens)).unwrap();
        validate(&mut module, None).unwrap();

        let mut loader = ModuleLoader::new();
        loader.insert_user_module(module);
        loader
    }

    #[test]
    fn test_placeholders() {
        let loader = with_placeholder("function f() begin\n  HOLE\nend", TokenKind::LinePlaceholder);
        let js = generate(&loader, &CodegenOptions::default()).unwrap();
        assert!(js.contains("function f() {\n}"), "{js}");

        let loader = with_placeholder("function f() begin\n  x := 1 + HOLE\nend", TokenKind::ExpressionPlaceholder);
        let err = generate(&loader, &CodegenOptions::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidToken);
    }

    #[test]
    fn test_custom_parameter_names() {
        let mut loader = ModuleLoader::with_system_modules(builtins::system_modules());
        loader.load_source("main", "on start begin end").unwrap();
        let options = CodegenOptions {
            loader_param: "modules".to_string(),
            runner_param: "events".to_string(),
            indent: "\t".to_string(),
            ..CodegenOptions::default()
        };

        let js = generate(&loader, &options).unwrap();
        assert!(js.contains("const Game = modules.getModule(\"Game\");"));
        assert!(js.contains("events.onStart(() => {"));
    }
}
