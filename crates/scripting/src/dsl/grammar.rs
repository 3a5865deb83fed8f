//! Grammar productions
//!
//! Declaration and statement productions are entered with their leading
//! keyword already read (`p.token()`); expression productions read their
//! own tokens.

use crate::dsl::ast::{Call, ElifClause, For, FuncBody, FuncDef, If, Node, NodeId, OnDef, ParamDef, VarDef};
use crate::dsl::context::ParserContext;
use crate::dsl::lexer::{Token, TokenKind};
use crate::dsl::parser::Parser;
use crate::error::{ErrorCode, Result};

/// Top-level declarations until end of stream
pub fn parse_module(p: &mut Parser) -> Result<()> {
    while p.try_read()? {
        p.within(ParserContext::statement(), |p| {
            match p.token().kind {
                TokenKind::Function => {
                    let id = parse_func_def(p)?;
                    p.module_mut().func_defs.push(id);
                }
                TokenKind::On => {
                    let id = parse_on_def(p)?;
                    p.module_mut().on_defs.push(id);
                }
                TokenKind::Var => {
                    let id = parse_var_def(p)?;
                    p.module_mut().var_defs.push(id);
                }
                _ => {
                    return Err(p.error(
                        ErrorCode::WrongToken,
                        format!("expected 'function', 'on' or 'var', found '{}'", p.token().value),
                    ))
                }
            }
            p.expect_statement_end()
        })?;
    }
    Ok(())
}

/// `function name(params) [: type] begin ... end`
pub fn parse_func_def(p: &mut Parser) -> Result<NodeId> {
    let start = p.token().clone();

    p.within(ParserContext::structure(), |p| {
        let (name, params, return_type) = p.within(ParserContext::header(&[TokenKind::Begin]), |p| {
            let name = p.read_kind(TokenKind::Identifier)?;
            let params = if p.peek_kind(TokenKind::LParen)? {
                p.read()?;
                parse_func_params(p)?
            } else {
                Vec::new()
            };
            let return_type = if p.peek_kind(TokenKind::Colon)? {
                p.read()?;
                Some(p.read_kind(TokenKind::Identifier)?)
            } else {
                None
            };
            finish_header(p, TokenKind::Begin)?;
            Ok((name, params, return_type))
        })?;

        let body = parse_block(p, &[TokenKind::End])?;
        p.expect_terminator(TokenKind::End)?;

        let func = FuncDef {
            name,
            params,
            return_type,
            is_async: false,
            body: FuncBody::Block(body),
        };
        Ok(p.add(Node::FuncDef(func), start))
    })
}

/// Parameter list after `(`, through the closing `)`
pub fn parse_func_params(p: &mut Parser) -> Result<Vec<NodeId>> {
    p.within(ParserContext::group(&[TokenKind::RParen]), |p| {
        let mut params = Vec::new();
        if !p.try_read()? {
            p.expect_terminator(TokenKind::RParen)?;
            return Ok(params);
        }

        loop {
            let name = p.token().clone();
            let param = match name.kind {
                TokenKind::Identifier => {
                    p.read_kind(TokenKind::Colon)
                        .map_err(|_| p.error(ErrorCode::InvalidFunctionParams, "expected ':' after parameter name"))?;
                    let ty = p.read()?;
                    if ty.kind != TokenKind::Identifier {
                        return Err(p.error(ErrorCode::InvalidFunctionParams, "expected parameter type"));
                    }
                    Node::ParamDef(ParamDef { name: name.clone(), ty })
                }
                TokenKind::ParamPlaceholder => Node::Placeholder(name.clone()),
                _ => return Err(p.error(ErrorCode::InvalidFunctionParams, "expected parameter name")),
            };
            params.push(p.add(param, name));

            if !p.try_read()? {
                break;
            }
            if p.token().kind != TokenKind::Comma {
                return Err(p.error(ErrorCode::InvalidFunctionParams, "expected ',' or ')'"));
            }
            if !p.try_read()? {
                return Err(p.error(ErrorCode::InvalidFunctionParams, "expected parameter after ','"));
            }
        }

        p.expect_terminator(TokenKind::RParen)?;
        Ok(params)
    })
}

/// `on [event] name [filter] [(params)] begin ... end`
pub fn parse_on_def(p: &mut Parser) -> Result<NodeId> {
    let start = p.token().clone();

    p.within(ParserContext::structure(), |p| {
        let (event, filter, params) = p.within(ParserContext::header(&[TokenKind::Begin]), |p| {
            let event = p.read()?;
            let filter = match event.kind {
                TokenKind::Event => {
                    let filter = p.read()?;
                    if !is_filter(filter.kind) {
                        return Err(p.error(ErrorCode::InvalidArgument, "'on event' needs a message name"));
                    }
                    Some(filter)
                }
                TokenKind::Identifier => {
                    if p.peek()?.is_some_and(|next| is_filter(next.kind)) {
                        Some(p.read()?)
                    } else {
                        None
                    }
                }
                _ => return Err(p.error(ErrorCode::WrongToken, "expected an event name")),
            };
            let params = if p.peek_kind(TokenKind::LParen)? {
                p.read()?;
                parse_func_params(p)?
            } else {
                Vec::new()
            };
            finish_header(p, TokenKind::Begin)?;
            Ok((event, filter, params))
        })?;

        let body = parse_block(p, &[TokenKind::End])?;
        p.expect_terminator(TokenKind::End)?;

        let on = OnDef {
            func: FuncDef {
                name: event.clone(),
                params,
                return_type: None,
                is_async: false,
                body: FuncBody::Block(body),
            },
            event,
            filter,
        };
        Ok(p.add(Node::OnDef(on), start))
    })
}

fn is_filter(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::String | TokenKind::Identifier | TokenKind::Number)
}

/// Require that the header ends exactly at `kind`, then consume it
fn finish_header(p: &mut Parser, kind: TokenKind) -> Result<Token> {
    if p.try_read()? {
        return Err(p.error(
            ErrorCode::WrongToken,
            format!("expected {:?}, found '{}'", kind, p.token().value),
        ));
    }
    p.expect_terminator(kind)
}

/// `var name [:= expr]`
pub fn parse_var_def(p: &mut Parser) -> Result<NodeId> {
    let start = p.token().clone();
    let name = p.read()?;
    if !matches!(name.kind, TokenKind::Identifier | TokenKind::IdPlaceholder) {
        return Err(p.error(ErrorCode::WrongToken, "expected variable name"));
    }

    let value = if p.peek_kind(TokenKind::Assign)? {
        p.read()?;
        Some(parse_expression(p)?)
    } else {
        None
    };

    Ok(p.add(Node::VarDef(VarDef { name, value }), start))
}

/// Statement list up to (not including) one of `ends`
pub fn parse_block(p: &mut Parser, ends: &[TokenKind]) -> Result<NodeId> {
    let start = p.token().clone();

    let statements = p.within(ParserContext::block(ends), |p| {
        let mut statements = Vec::new();
        while p.try_read()? {
            let statement = p.within(ParserContext::statement(), |p| {
                let id = parse_statement(p)?;
                p.expect_statement_end()?;
                Ok(id)
            })?;
            statements.push(statement);
        }

        if p.token().kind == TokenKind::Eos {
            return Err(p.error(
                ErrorCode::ReadPastEnd,
                format!("block starting at line {} is never closed", start.line),
            ));
        }
        Ok(statements)
    })?;

    Ok(p.add(Node::Block { statements }, start))
}

/// One statement, leading token already read
pub fn parse_statement(p: &mut Parser) -> Result<NodeId> {
    let start = p.token().clone();

    match start.kind {
        TokenKind::If => parse_if(p),
        TokenKind::For => parse_for(p),
        TokenKind::Foreach => parse_foreach(p),
        TokenKind::While => parse_while(p),
        TokenKind::Forever => parse_forever(p),
        TokenKind::Var => parse_var_def(p),
        TokenKind::Return => {
            let value = if p.peek()?.is_some() {
                Some(parse_expression(p)?)
            } else {
                None
            };
            Ok(p.add(Node::Return { value }, start))
        }
        TokenKind::Break => Ok(p.add(Node::Break, start)),
        TokenKind::Comment => Ok(p.add(Node::Comment(start.clone()), start)),
        TokenKind::Identifier => {
            if p.peek_kind(TokenKind::Assign)? {
                p.read()?;
                let value = parse_expression(p)?;
                Ok(p.add(Node::Assignment { target: start.clone(), value }, start))
            } else {
                parse_call(p)
            }
        }
        kind if kind.is_placeholder() => Ok(p.add(Node::Placeholder(start.clone()), start)),
        TokenKind::Function | TokenKind::On => Err(p.error(
            ErrorCode::NotImplemented,
            "nested declarations are not supported",
        )),
        _ => Err(p.error(
            ErrorCode::WrongToken,
            format!("unexpected '{}' at start of statement", start.value),
        )),
    }
}

/// Expression running up to `end`, which is consumed
fn parse_header_expression(p: &mut Parser, end: TokenKind) -> Result<NodeId> {
    p.within(ParserContext::header(&[end]), |p| {
        let expression = parse_expression(p)?;
        p.expect_terminator(end)?;
        Ok(expression)
    })
}

/// `if c then ... [elif c then ...] [else ...] end`
pub fn parse_if(p: &mut Parser) -> Result<NodeId> {
    let start = p.token().clone();
    let branch_ends = [TokenKind::Elif, TokenKind::Else, TokenKind::End];

    p.within(ParserContext::structure(), |p| {
        let condition = parse_header_expression(p, TokenKind::Then)?;
        let then_block = parse_block(p, &branch_ends)?;
        let mut elifs = Vec::new();
        let mut else_block = None;

        loop {
            match p.token().kind {
                TokenKind::Elif => {
                    p.expect_terminator(TokenKind::Elif)?;
                    let condition = parse_header_expression(p, TokenKind::Then)?;
                    let block = parse_block(p, &branch_ends)?;
                    elifs.push(ElifClause { condition, block });
                }
                TokenKind::Else => {
                    p.expect_terminator(TokenKind::Else)?;
                    else_block = Some(parse_block(p, &[TokenKind::End])?);
                    p.expect_terminator(TokenKind::End)?;
                    break;
                }
                _ => {
                    p.expect_terminator(TokenKind::End)?;
                    break;
                }
            }
        }

        let node = If {
            condition,
            then_block,
            elifs,
            else_block,
        };
        Ok(p.add(Node::If(node), start))
    })
}

/// `for x := a to b [by c] do ... end`
pub fn parse_for(p: &mut Parser) -> Result<NodeId> {
    let start = p.token().clone();

    p.within(ParserContext::structure(), |p| {
        let var = p.read_kind(TokenKind::Identifier)?;
        p.read_kind(TokenKind::Assign)?;
        let range_start = parse_header_expression(p, TokenKind::To)?;

        let (range_end, has_step) = p.within(ParserContext::header(&[TokenKind::By, TokenKind::Do]), |p| {
            let expression = parse_expression(p)?;
            let has_step = p.token().kind == TokenKind::By;
            p.expect_terminator(if has_step { TokenKind::By } else { TokenKind::Do })?;
            Ok((expression, has_step))
        })?;

        let step = if has_step {
            Some(parse_header_expression(p, TokenKind::Do)?)
        } else {
            None
        };

        let body = parse_block(p, &[TokenKind::End])?;
        p.expect_terminator(TokenKind::End)?;

        let node = For {
            var,
            start: range_start,
            end: range_end,
            step,
            body,
        };
        Ok(p.add(Node::For(node), start))
    })
}

/// `foreach x in source do ... end`
pub fn parse_foreach(p: &mut Parser) -> Result<NodeId> {
    let start = p.token().clone();

    p.within(ParserContext::structure(), |p| {
        let var = p.read_kind(TokenKind::Identifier)?;
        p.read_kind(TokenKind::In)?;
        let source = parse_header_expression(p, TokenKind::Do)?;
        let body = parse_block(p, &[TokenKind::End])?;
        p.expect_terminator(TokenKind::End)?;
        Ok(p.add(Node::Foreach { var, source, body }, start))
    })
}

/// `while c do ... end`
pub fn parse_while(p: &mut Parser) -> Result<NodeId> {
    let start = p.token().clone();

    p.within(ParserContext::structure(), |p| {
        let condition = parse_header_expression(p, TokenKind::Do)?;
        let body = parse_block(p, &[TokenKind::End])?;
        p.expect_terminator(TokenKind::End)?;
        Ok(p.add(Node::While { condition, body }, start))
    })
}

/// `forever [do] ... end`
pub fn parse_forever(p: &mut Parser) -> Result<NodeId> {
    let start = p.token().clone();

    p.within(ParserContext::structure(), |p| {
        if p.peek_kind(TokenKind::Do)? {
            p.read()?;
        }
        let body = parse_block(p, &[TokenKind::End])?;
        p.expect_terminator(TokenKind::End)?;
        Ok(p.add(Node::Forever { body }, start))
    })
}

/// Call whose name is the current token. `name(a, b)` when the
/// parenthesis touches the name, `name a b` otherwise.
pub fn parse_call(p: &mut Parser) -> Result<NodeId> {
    let name = p.token().clone();
    let params = if p.is_adjacent(&name, TokenKind::LParen) {
        p.read_kind(TokenKind::LParen)?;
        parse_call_list(p)?
    } else {
        parse_bare_args(p)?
    };

    let call = Call {
        name: name.clone(),
        params,
        func_def: None,
    };
    Ok(p.add(Node::Call(call), name))
}

fn parse_call_list(p: &mut Parser) -> Result<Vec<NodeId>> {
    p.within(ParserContext::group(&[TokenKind::Comma, TokenKind::RParen]), |p| {
        let mut params = Vec::new();
        while p.peek()?.is_some() {
            params.push(parse_call_param(p, parse_expression)?);
            if p.token().kind != TokenKind::Comma {
                break;
            }
            p.expect_terminator(TokenKind::Comma)?;
            if p.peek()?.is_none() {
                return Err(p.error(ErrorCode::InvalidArgument, "expected argument after ','"));
            }
        }
        p.expect_terminator(TokenKind::RParen)?;
        Ok(params)
    })
}

fn parse_bare_args(p: &mut Parser) -> Result<Vec<NodeId>> {
    let mut params = Vec::new();
    while let Some(kind) = p.peek()?.map(|next| next.kind) {
        if !starts_term(kind) {
            break;
        }
        params.push(parse_call_param(p, parse_term)?);
    }
    Ok(params)
}

fn starts_term(kind: TokenKind) -> bool {
    kind.is_literal()
        || kind.is_unary_operator()
        || kind.is_value_placeholder()
        || matches!(kind, TokenKind::Identifier | TokenKind::LParen)
}

/// Argument, optionally written `name := value`
fn parse_call_param(p: &mut Parser, value: fn(&mut Parser) -> Result<NodeId>) -> Result<NodeId> {
    let start = match p.peek()? {
        Some(token) => token.clone(),
        None => return Err(p.error(ErrorCode::InvalidArgument, "expected argument")),
    };

    if start.kind == TokenKind::Identifier {
        p.read()?;
        if p.peek_kind(TokenKind::Assign)? {
            p.read()?;
            let value = value(p)?;
            let param = Node::CallParam {
                name: Some(start.clone()),
                value,
            };
            return Ok(p.add(param, start));
        }
        p.move_to(&start);
    }

    let value = value(p)?;
    Ok(p.add(Node::CallParam { name: None, value }, start))
}

/// Single operand of a bare call
pub fn parse_term(p: &mut Parser) -> Result<NodeId> {
    if !p.try_read()? {
        return Err(p.error(ErrorCode::InvalidArgument, "expected argument"));
    }
    let token = p.token().clone();

    match token.kind {
        kind if kind.is_literal() => Ok(p.add(Node::Const(token.clone()), token)),
        TokenKind::Identifier if p.is_adjacent(&token, TokenKind::LParen) => parse_call(p),
        TokenKind::Identifier => Ok(p.add(Node::Id(token.clone()), token)),
        TokenKind::LParen => parse_group(p),
        kind if kind.is_unary_operator() => {
            let op = p.add(Node::Op(token.clone()), token.clone());
            let operand = parse_term(p)?;
            Ok(p.add(Node::Expression { items: vec![op, operand] }, token))
        }
        kind if kind.is_value_placeholder() => Ok(p.add(Node::Placeholder(token.clone()), token)),
        _ => Err(p.error(
            ErrorCode::InvalidArgument,
            format!("unexpected '{}' in argument list", token.value),
        )),
    }
}

/// Parenthesized sub-expression, `(` already read
fn parse_group(p: &mut Parser) -> Result<NodeId> {
    p.within(ParserContext::group(&[TokenKind::RParen]), |p| {
        let expression = parse_expression(p)?;
        p.expect_terminator(TokenKind::RParen)?;
        Ok(expression)
    })
}

/// Flat expression: operands and binary operators alternate, evaluated
/// left to right. Always yields an `Expression` node.
pub fn parse_expression(p: &mut Parser) -> Result<NodeId> {
    p.within(ParserContext::expression(), |p| {
        let start = p.peek()?.cloned().unwrap_or_else(|| p.token().clone());
        let mut items = Vec::new();
        let mut expect_operand = true;

        while p.try_read()? {
            let token = p.token().clone();

            if !expect_operand {
                if !token.kind.is_operator() || token.kind == TokenKind::Not {
                    return Err(p.error(
                        ErrorCode::InvalidExpression,
                        format!("expected operator, found '{}'", token.value),
                    ));
                }
                items.push(p.add(Node::Op(token.clone()), token));
                expect_operand = true;
                continue;
            }

            let operand = match token.kind {
                kind if kind.is_unary_operator() => {
                    items.push(p.add(Node::Op(token.clone()), token));
                    continue;
                }
                kind if kind.is_literal() => p.add(Node::Const(token.clone()), token),
                TokenKind::Identifier => parse_identifier_operand(p)?,
                TokenKind::LParen => parse_group(p)?,
                kind if kind.is_value_placeholder() => p.add(Node::Placeholder(token.clone()), token),
                _ => {
                    return Err(p.error(
                        ErrorCode::InvalidExpression,
                        format!("unexpected '{}' in expression", token.value),
                    ))
                }
            };
            items.push(operand);
            expect_operand = false;
        }

        if expect_operand {
            let message = if items.is_empty() {
                "expected expression"
            } else {
                "expression ends with an operator"
            };
            return Err(p.error(ErrorCode::InvalidExpression, message));
        }

        Ok(p.add(Node::Expression { items }, start))
    })
}

/// Identifier in operand position: a variable, or a call when followed
/// by `(` or by something that is not an operator
fn parse_identifier_operand(p: &mut Parser) -> Result<NodeId> {
    let name = p.token().clone();
    if p.is_adjacent(&name, TokenKind::LParen) {
        return parse_call(p);
    }

    if p.peek()?.is_some_and(|next| !next.kind.is_operator()) {
        parse_call(p)
    } else {
        Ok(p.add(Node::Id(name.clone()), name))
    }
}

#[cfg(test)]
mod tests {
    use crate::dsl::ast::{Module, Node, NodeId};
    use crate::dsl::parser::parse_source;
    use crate::error::ErrorCode;

    fn parse(source: &str) -> Module {
        parse_source("test", source).unwrap()
    }

    fn body(module: &Module, func: NodeId) -> Vec<NodeId> {
        match &module.func_def(func).unwrap().body {
            crate::dsl::ast::FuncBody::Block(block) => module.statements(*block).to_vec(),
            _ => panic!("native body"),
        }
    }

    #[test]
    fn test_function_with_local_var() {
        let module = parse("proc foo() begin var x := 3 end");

        assert_eq!(module.func_defs.len(), 1);
        let foo = module.func_defs[0];
        assert_eq!(module.func_def(foo).unwrap().name.value, "foo");

        let statements = body(&module, foo);
        assert_eq!(statements.len(), 1);
        match module.node(statements[0]) {
            Node::VarDef(var) => {
                assert_eq!(var.name.value, "x");
                assert_eq!(module.source_text(var.value.unwrap()), "3");
            }
            other => panic!("expected var, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_for_range_parts() {
        let module = parse("function foo() begin\n  for x := 1 to 5 by 4 do\n    log x\n  end\nend");
        let statements = body(&module, module.func_defs[0]);

        match module.node(statements[0]) {
            Node::For(node) => {
                assert_eq!(node.var.value, "x");
                assert_eq!(module.source_text(node.start), "1");
                assert_eq!(module.source_text(node.end), "5");
                assert_eq!(module.source_text(node.step.unwrap()), "4");
                assert_eq!(module.statements(node.body).len(), 1);
            }
            other => panic!("expected for, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_for_without_step() {
        let module = parse("function f() begin for i := 0 to n - 1 do end end");
        let statements = body(&module, module.func_defs[0]);

        match module.node(statements[0]) {
            Node::For(node) => {
                assert_eq!(module.source_text(node.end), "n - 1");
                assert!(node.step.is_none());
            }
            other => panic!("expected for, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_nested_structures_on_one_line() {
        let module = parse("function f() begin if a then if b then x end end end");
        let statements = body(&module, module.func_defs[0]);

        assert_eq!(statements.len(), 1);
        match module.node(statements[0]) {
            Node::If(outer) => {
                let inner = module.statements(outer.then_block);
                assert_eq!(inner.len(), 1);
                assert!(matches!(module.node(inner[0]), Node::If(_)));
            }
            other => panic!("expected if, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_if_elif_else() {
        let source = "function f(a: number) begin\n\
                      if a > 1 then\n  say \"big\"\n\
                      elif a = 1 then\n  say \"one\"\n\
                      else\n  say \"small\"\n\
                      end\nend";
        let module = parse(source);
        let statements = body(&module, module.func_defs[0]);

        match module.node(statements[0]) {
            Node::If(node) => {
                assert_eq!(module.source_text(node.condition), "a > 1");
                assert_eq!(node.elifs.len(), 1);
                assert_eq!(module.source_text(node.elifs[0].condition), "a = 1");
                assert!(node.else_block.is_some());
            }
            other => panic!("expected if, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_call_forms() {
        let module = parse("function f() begin\n  moveTo(1, y := 2)\n  say \"hi\" 3\n  glide\nend");
        let statements = body(&module, module.func_defs[0]);
        assert_eq!(statements.len(), 3);

        let call = module.call(statements[0]).unwrap();
        assert_eq!(call.name.value, "moveTo");
        assert_eq!(call.params.len(), 2);
        match module.node(call.params[1]) {
            Node::CallParam { name, .. } => assert_eq!(name.as_ref().unwrap().value, "y"),
            other => panic!("expected param, got {}", other.kind_name()),
        }

        assert_eq!(module.call(statements[1]).unwrap().params.len(), 2);
        assert!(module.call(statements[2]).unwrap().params.is_empty());
    }

    #[test]
    fn test_call_inside_expression() {
        let module = parse("var x := abs(-3) + random 1 10");
        let var = match module.node(module.var_defs[0]) {
            Node::VarDef(var) => var.value.unwrap(),
            other => panic!("expected var, got {}", other.kind_name()),
        };

        assert_eq!(module.source_text(var), "abs(- 3) + random(1, 10)");
    }

    #[test]
    fn test_semicolons_separate_statements() {
        let module = parse("function f() begin a := 1; b := 2 end");
        assert_eq!(body(&module, module.func_defs[0]).len(), 2);
    }

    #[test]
    fn test_on_handlers() {
        let module = parse(
            "on start begin end\n\
             on message \"jump\" begin end\n\
             on event hit (who: Sprite) begin end",
        );

        assert_eq!(module.on_defs.len(), 3);
        let jump = module.on_def(module.on_defs[1]).unwrap();
        assert_eq!(jump.event.value, "message");
        assert_eq!(jump.filter.as_ref().unwrap().value, "jump");

        let hit = module.on_def(module.on_defs[2]).unwrap();
        assert_eq!(hit.filter.as_ref().unwrap().value, "hit");
        assert_eq!(module.param_names(module.on_defs[2]), vec!["who"]);
    }

    #[test]
    fn test_comments_in_blocks() {
        let module = parse("// header\nfunction f() begin\n  // note\n  x := 1 // trailing\nend");
        let statements = body(&module, module.func_defs[0]);

        assert_eq!(statements.len(), 3);
        assert!(matches!(module.node(statements[0]), Node::Comment(_)));
        assert!(matches!(module.node(statements[2]), Node::Comment(_)));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let source = "var n := 2\nfunction f(a: number): number begin return a * n end";
        let a = parse(source);
        let b = parse(source);

        assert_eq!(a.nodes(), b.nodes());
        assert_eq!(a.func_defs, b.func_defs);
    }

    #[test]
    fn test_errors() {
        let cases = [
            ("function f( begin end", ErrorCode::InvalidFunctionParams),
            ("function f() begin x := end", ErrorCode::InvalidExpression),
            ("function f() begin x := 1 + end", ErrorCode::InvalidExpression),
            ("function f() begin if a then end", ErrorCode::ReadPastEnd),
            ("function f() begin foo(1) 2 end", ErrorCode::InvalidToken),
            ("function f() begin x := [1] end", ErrorCode::InvalidExpression),
            ("function f() begin g(1,) end", ErrorCode::InvalidArgument),
            ("function f() begin g(1, , 2) end", ErrorCode::InvalidArgument),
            ("if a then end", ErrorCode::WrongToken),
        ];

        for (source, code) in cases {
            let err = parse_source("test", source).unwrap_err();
            assert_eq!(err.code(), code, "{source}");
        }
    }
}
