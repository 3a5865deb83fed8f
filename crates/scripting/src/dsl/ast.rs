//! DSL Abstract Syntax Tree
//!
//! Nodes of one module live in a flat arena owned by [`Module`] and refer
//! to each other by [`NodeId`]. Parent links are ids too, so the tree has
//! no ownership cycles. Slot 0 always holds the module root.

use crate::dsl::lexer::{Token, TokenKind};
use blockcode_core::{ModuleId, ModuleKind};
use serde::Serialize;
use std::fmt;

/// Index of a node in its module's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Reference to a function declared in any module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FuncRef {
    pub module: ModuleId,
    pub node: NodeId,
}

/// Function definition (also the core of an `on` handler)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuncDef {
    pub name: Token,
    /// `ParamDef` nodes
    pub params: Vec<NodeId>,
    pub return_type: Option<Token>,
    /// Monotonic: set by validation, never cleared
    pub is_async: bool,
    pub body: FuncBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FuncBody {
    /// `Block` node
    Block(NodeId),
    /// Supplied by a system module
    Native(NativeFn),
}

/// Host-implemented function
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NativeFn {
    /// Name of the function in the host's module table
    pub symbol: String,
}

/// `on <event> [filter] (...) begin ... end`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnDef {
    pub func: FuncDef,
    pub event: Token,
    pub filter: Option<Token>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamDef {
    pub name: Token,
    pub ty: Token,
}

/// Record type mapped to a host type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDef {
    pub name: Token,
    pub native: String,
    /// `ParamDef` nodes
    pub fields: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarDef {
    pub name: Token,
    pub value: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Call {
    pub name: Token,
    /// `CallParam` nodes, in source order
    pub params: Vec<NodeId>,
    /// Bound declaration; `None` until validated
    pub func_def: Option<FuncRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElifClause {
    pub condition: NodeId,
    pub block: NodeId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct If {
    pub condition: NodeId,
    pub then_block: NodeId,
    pub elifs: Vec<ElifClause>,
    pub else_block: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct For {
    pub var: Token,
    pub start: NodeId,
    pub end: NodeId,
    pub step: Option<NodeId>,
    pub body: NodeId,
}

/// AST node variants
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Node {
    /// Root marker; the declarations live on [`Module`]
    Module,
    FuncDef(FuncDef),
    OnDef(OnDef),
    ParamDef(ParamDef),
    TypeDef(TypeDef),
    VarDef(VarDef),
    Return {
        value: Option<NodeId>,
    },
    Break,
    Assignment {
        target: Token,
        value: NodeId,
    },
    Call(Call),
    /// Call argument, optionally named (`name := expr`)
    CallParam {
        name: Option<Token>,
        value: NodeId,
    },
    Op(Token),
    Const(Token),
    Id(Token),
    /// Flat left-to-right sequence of operands and operators
    Expression {
        items: Vec<NodeId>,
    },
    Block {
        statements: Vec<NodeId>,
    },
    If(If),
    For(For),
    /// Implicitly asynchronous: every iteration yields to the host
    Forever {
        body: NodeId,
    },
    Foreach {
        var: Token,
        source: NodeId,
        body: NodeId,
    },
    While {
        condition: NodeId,
        body: NodeId,
    },
    Comment(Token),
    /// Incomplete node rendered by the block editor
    Placeholder(Token),
}

impl Node {
    /// Short kind name for diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Module => "module",
            Node::FuncDef(_) => "function",
            Node::OnDef(_) => "on-handler",
            Node::ParamDef(_) => "parameter",
            Node::TypeDef(_) => "type",
            Node::VarDef(_) => "var",
            Node::Return { .. } => "return",
            Node::Break => "break",
            Node::Assignment { .. } => "assignment",
            Node::Call(_) => "call",
            Node::CallParam { .. } => "call-parameter",
            Node::Op(_) => "operator",
            Node::Const(_) => "constant",
            Node::Id(_) => "identifier",
            Node::Expression { .. } => "expression",
            Node::Block { .. } => "block",
            Node::If(_) => "if",
            Node::For(_) => "for",
            Node::Forever { .. } => "forever",
            Node::Foreach { .. } => "foreach",
            Node::While { .. } => "while",
            Node::Comment(_) => "comment",
            Node::Placeholder(_) => "placeholder",
        }
    }
}

/// Arena slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeData {
    pub id: NodeId,
    pub start_token: Token,
    /// Owning node; assigned once by validation
    pub parent: Option<NodeId>,
    pub node: Node,
}

/// A compiled unit: a user script or a system module
#[derive(Debug, Clone, Serialize)]
pub struct Module {
    pub id: ModuleId,
    pub name: String,
    pub kind: ModuleKind,
    pub type_defs: Vec<NodeId>,
    pub func_defs: Vec<NodeId>,
    pub var_defs: Vec<NodeId>,
    pub on_defs: Vec<NodeId>,
    nodes: Vec<NodeData>,
}

impl Module {
    pub const ROOT: NodeId = NodeId(0);

    pub fn new(name: impl Into<String>, kind: ModuleKind) -> Self {
        let name = name.into();
        let root = NodeData {
            id: Self::ROOT,
            start_token: Token::synthetic(TokenKind::Identifier, name.clone()),
            parent: None,
            node: Node::Module,
        };
        Self {
            id: ModuleId::next(),
            name,
            kind,
            type_defs: Vec::new(),
            func_defs: Vec::new(),
            var_defs: Vec::new(),
            on_defs: Vec::new(),
            nodes: vec![root],
        }
    }

    /// Append a node to the arena
    pub fn add(&mut self, node: Node, start_token: Token) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            id,
            start_token,
            parent: None,
            node,
        });
        id
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()].node
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()].node
    }

    pub fn nodes(&self) -> &[NodeData] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    /// Record the owner of `id`. The first assignment wins; returns
    /// whether this call set it.
    pub fn set_parent(&mut self, id: NodeId, parent: NodeId) -> bool {
        let slot = &mut self.nodes[id.index()].parent;
        if slot.is_some() || id == Self::ROOT {
            return false;
        }
        *slot = Some(parent);
        true
    }

    /// Function part of a `FuncDef` or `OnDef`
    pub fn func_def(&self, id: NodeId) -> Option<&FuncDef> {
        match self.node(id) {
            Node::FuncDef(func) => Some(func),
            Node::OnDef(on) => Some(&on.func),
            _ => None,
        }
    }

    pub fn func_def_mut(&mut self, id: NodeId) -> Option<&mut FuncDef> {
        match self.node_mut(id) {
            Node::FuncDef(func) => Some(func),
            Node::OnDef(on) => Some(&mut on.func),
            _ => None,
        }
    }

    pub fn on_def(&self, id: NodeId) -> Option<&OnDef> {
        match self.node(id) {
            Node::OnDef(on) => Some(on),
            _ => None,
        }
    }

    pub fn call(&self, id: NodeId) -> Option<&Call> {
        match self.node(id) {
            Node::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn is_async(&self, id: NodeId) -> bool {
        self.func_def(id).is_some_and(|func| func.is_async)
    }

    /// Declared parameter names of a function
    pub fn param_names(&self, func: NodeId) -> Vec<&str> {
        self.func_def(func)
            .map(|f| {
                f.params
                    .iter()
                    .filter_map(|&p| match self.node(p) {
                        Node::ParamDef(param) => Some(param.name.value.as_str()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Look up a top-level function by its unqualified name
    pub fn find_function(&self, name: &str) -> Option<NodeId> {
        self.func_defs
            .iter()
            .copied()
            .find(|&id| self.func_def(id).is_some_and(|f| f.name.value == name))
    }

    /// Names of top-level variables and functions, variables first
    pub fn declared_names(&self) -> Vec<&Token> {
        let vars = self.var_defs.iter().filter_map(|&id| match self.node(id) {
            Node::VarDef(var) => Some(&var.name),
            _ => None,
        });
        let funcs = self.func_defs.iter().filter_map(|&id| self.func_def(id).map(|f| &f.name));
        vars.chain(funcs).collect()
    }

    /// Name under which a function of this module is bound by callers
    /// outside it
    pub fn qualified_name(&self, func: &str) -> String {
        if self.name.is_empty() {
            func.to_string()
        } else {
            format!("{}.{}", self.name, func)
        }
    }

    /// Statements of a `Block` node
    pub fn statements(&self, block: NodeId) -> &[NodeId] {
        match self.node(block) {
            Node::Block { statements } => statements,
            _ => &[],
        }
    }

    /// Source-like rendering of a subtree, tokens joined by spaces
    pub fn source_text(&self, id: NodeId) -> String {
        match self.node(id) {
            Node::Const(t) if t.kind == TokenKind::String => format!("\"{}\"", t.value),
            Node::Const(t) | Node::Id(t) | Node::Op(t) | Node::Comment(t) | Node::Placeholder(t) => {
                t.value.clone()
            }
            Node::Expression { items } => {
                let inner = items
                    .iter()
                    .map(|&item| match self.node(item) {
                        Node::Expression { .. } => format!("({})", self.source_text(item)),
                        _ => self.source_text(item),
                    })
                    .collect::<Vec<_>>();
                inner.join(" ")
            }
            Node::CallParam { name, value } => match name {
                Some(name) => format!("{} := {}", name.value, self.source_text(*value)),
                None => self.source_text(*value),
            },
            Node::Call(call) => {
                let args = call
                    .params
                    .iter()
                    .map(|&p| self.source_text(p))
                    .collect::<Vec<_>>();
                format!("{}({})", call.name.value, args.join(", "))
            }
            other => other.kind_name().to_string(),
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} module '{}' ({} functions, {} handlers, {} vars)",
            self.kind.as_str(),
            self.name,
            self.func_defs.len(),
            self.on_defs.len(),
            self.var_defs.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Token {
        Token::synthetic(TokenKind::Identifier, name)
    }

    #[test]
    fn test_parent_is_set_once() {
        let mut module = Module::new("m", ModuleKind::User);
        let a = module.add(Node::Break, ident("a"));
        let b = module.add(Node::Break, ident("b"));

        assert!(module.set_parent(a, Module::ROOT));
        assert!(!module.set_parent(a, b));
        assert_eq!(module.parent(a), Some(Module::ROOT));
        assert!(!module.set_parent(Module::ROOT, b));
    }

    #[test]
    fn test_qualified_name() {
        let named = Module::new("Sprite", ModuleKind::System);
        let unnamed = Module::new("", ModuleKind::User);

        assert_eq!(named.qualified_name("moveTo"), "Sprite.moveTo");
        assert_eq!(unnamed.qualified_name("foo"), "foo");
    }

    #[test]
    fn test_source_text_nests_expressions() {
        let mut module = Module::new("m", ModuleKind::User);
        let one = module.add(Node::Const(Token::synthetic(TokenKind::Number, "1")), ident("1"));
        let plus = module.add(Node::Op(Token::synthetic(TokenKind::Plus, "+")), ident("+"));
        let x = module.add(Node::Id(ident("x")), ident("x"));
        let inner = module.add(Node::Expression { items: vec![one, plus, x] }, ident("("));
        let star = module.add(Node::Op(Token::synthetic(TokenKind::Star, "*")), ident("*"));
        let two = module.add(Node::Const(Token::synthetic(TokenKind::Number, "2")), ident("2"));
        let outer = module.add(Node::Expression { items: vec![inner, star, two] }, ident("("));

        assert_eq!(module.source_text(outer), "(1 + x) * 2");
    }
}
