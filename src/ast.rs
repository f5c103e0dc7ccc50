use crate::location::Span;
use crate::macros::{self, MacroDef, Pattern};
use crate::token::Token;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Stable handle of a node inside an [`Ast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// The whole unit; no opening syntax, ends at end of input.
    Root,
    Default,
    /// Body of an anonymous function.
    Lambda,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Normal,
    /// `*name`
    List,
    /// `**name`
    Map,
}

/// One matched element of a macro application.
#[derive(Debug, Clone, PartialEq)]
pub enum MacroPart {
    Node(NodeId),
    Token(Token),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // == Blocks and statements ==
    Block {
        kind: BlockKind,
        items: Vec<NodeId>,
    },
    /// `pass` or a lone `;`.
    Empty,
    If {
        condition: NodeId,
        then_block: NodeId,
        else_block: Option<NodeId>,
    },
    While {
        condition: NodeId,
        block: NodeId,
        nobreak: Option<NodeId>,
    },
    Break {
        label: Option<NodeId>,
    },
    Continue {
        label: Option<NodeId>,
    },
    Return {
        value: Option<NodeId>,
    },
    Yield {
        value: Option<NodeId>,
        from: bool,
    },

    // == Definitions ==
    VarDef {
        name: NodeId,
        value_type: Option<NodeId>,
        value: Option<NodeId>,
        immutable: bool,
    },
    FuncDef {
        name: Option<NodeId>,
        params: Vec<NodeId>,
        return_type: Option<NodeId>,
        block: NodeId,
    },
    Param {
        name: NodeId,
        value_type: Option<NodeId>,
        default: Option<NodeId>,
        kind: ParamKind,
    },
    ClassDef {
        name: NodeId,
        members: Vec<NodeId>,
        bases: Vec<NodeId>,
        block: NodeId,
    },
    ModuleDef {
        name: NodeId,
        block: NodeId,
    },
    EnumDef {
        name: NodeId,
        bases: Vec<NodeId>,
        items: Vec<NodeId>,
    },
    EnumItem {
        name: NodeId,
        value: Option<NodeId>,
    },
    /// `macro name (syntax) block`. The syntax is registered with the tree as
    /// soon as it is read.
    MacroDefinition {
        name: NodeId,
        syntax: Vec<Pattern>,
        block: NodeId,
    },

    // == Atoms ==
    /// Possibly qualified name, `a.b.c`.
    Name {
        parts: Vec<String>,
    },
    Constant {
        token: Token,
    },
    Tuple {
        items: Vec<NodeId>,
    },
    Paren {
        value: NodeId,
    },
    CodeQuote {
        block: NodeId,
    },
    Await {
        value: NodeId,
    },
    Generator {
        comprehension: NodeId,
    },
    /// `head` is the opening keyword of a prefix macro.
    MacroApplication {
        name: String,
        head: Option<Token>,
        parts: Vec<MacroPart>,
    },
    /// Tokens that could not be parsed.
    Invalid {
        tokens: Vec<Token>,
    },

    // == Operators and postfix forms ==
    Unary {
        operator: Token,
        operand: NodeId,
    },
    Binary {
        left: NodeId,
        operator: Token,
        right: NodeId,
    },
    /// `then if condition [else otherwise]`, `then unless condition`.
    ConditionalInfix {
        condition: NodeId,
        then_value: NodeId,
        else_value: Option<NodeId>,
        negated: bool,
    },
    ForComprehension {
        target: NodeId,
        item: NodeId,
        iterable: NodeId,
        condition: Option<NodeId>,
    },
    MemberAccess {
        target: NodeId,
        member: NodeId,
    },
    Call {
        target: NodeId,
        args: Vec<NodeId>,
    },
    CallArg {
        name: Option<NodeId>,
        value: NodeId,
    },
    Index {
        target: NodeId,
        index: NodeId,
    },
    Slice {
        start: Option<NodeId>,
        stop: Option<NodeId>,
        step: Option<NodeId>,
    },

    // == Type names ==
    SimpleType {
        name: NodeId,
    },
    TupleType {
        types: Vec<NodeId>,
    },
    GenericType {
        target: NodeId,
        args: Vec<NodeId>,
    },
    ArrayType {
        target: NodeId,
    },
    UnionType {
        left: NodeId,
        right: NodeId,
    },
    FuncType {
        args: NodeId,
        result: NodeId,
    },
}

fn visit_opt(slot: &Option<NodeId>, f: &mut dyn FnMut(NodeId)) {
    if let Some(id) = slot {
        f(*id);
    }
}

fn visit_opt_mut(slot: &mut Option<NodeId>, f: &mut dyn FnMut(&mut NodeId)) {
    if let Some(id) = slot {
        f(id);
    }
}

impl NodeKind {
    /// Visits every owned child in field order.
    pub fn visit_children(&self, f: &mut dyn FnMut(NodeId)) {
        use NodeKind::*;
        match self {
            Empty | Name { .. } | Constant { .. } | Invalid { .. } => {}
            Block { items, .. } | Tuple { items } => items.iter().for_each(|id| f(*id)),
            If {
                condition,
                then_block,
                else_block,
            } => {
                f(*condition);
                f(*then_block);
                visit_opt(else_block, f);
            }
            While {
                condition,
                block,
                nobreak,
            } => {
                f(*condition);
                f(*block);
                visit_opt(nobreak, f);
            }
            Break { label } | Continue { label } => visit_opt(label, f),
            Return { value } | Yield { value, .. } => visit_opt(value, f),
            VarDef {
                name,
                value_type,
                value,
                ..
            } => {
                f(*name);
                visit_opt(value_type, f);
                visit_opt(value, f);
            }
            FuncDef {
                name,
                params,
                return_type,
                block,
            } => {
                visit_opt(name, f);
                params.iter().for_each(|id| f(*id));
                visit_opt(return_type, f);
                f(*block);
            }
            Param {
                name,
                value_type,
                default,
                ..
            } => {
                f(*name);
                visit_opt(value_type, f);
                visit_opt(default, f);
            }
            ClassDef {
                name,
                members,
                bases,
                block,
            } => {
                f(*name);
                members.iter().chain(bases).for_each(|id| f(*id));
                f(*block);
            }
            ModuleDef { name, block } | MacroDefinition { name, block, .. } => {
                f(*name);
                f(*block);
            }
            EnumDef { name, bases, items } => {
                f(*name);
                bases.iter().chain(items).for_each(|id| f(*id));
            }
            EnumItem { name, value } => {
                f(*name);
                visit_opt(value, f);
            }
            Paren { value } | Await { value } => f(*value),
            CodeQuote { block } => f(*block),
            Generator { comprehension } => f(*comprehension),
            MacroApplication { parts, .. } => {
                for part in parts {
                    if let MacroPart::Node(id) = part {
                        f(*id);
                    }
                }
            }
            Unary { operand, .. } => f(*operand),
            Binary { left, right, .. } | UnionType { left, right } => {
                f(*left);
                f(*right);
            }
            ConditionalInfix {
                condition,
                then_value,
                else_value,
                ..
            } => {
                f(*then_value);
                f(*condition);
                visit_opt(else_value, f);
            }
            ForComprehension {
                target,
                item,
                iterable,
                condition,
            } => {
                f(*target);
                f(*item);
                f(*iterable);
                visit_opt(condition, f);
            }
            MemberAccess { target, member } => {
                f(*target);
                f(*member);
            }
            Call { target, args } | GenericType { target, args } => {
                f(*target);
                args.iter().for_each(|id| f(*id));
            }
            CallArg { name, value } => {
                visit_opt(name, f);
                f(*value);
            }
            Index { target, index } => {
                f(*target);
                f(*index);
            }
            Slice { start, stop, step } => {
                visit_opt(start, f);
                visit_opt(stop, f);
                visit_opt(step, f);
            }
            SimpleType { name } => f(*name),
            TupleType { types } => types.iter().for_each(|id| f(*id)),
            ArrayType { target } => f(*target),
            FuncType { args, result } => {
                f(*args);
                f(*result);
            }
        }
    }

    /// Mutable counterpart of [`visit_children`](Self::visit_children).
    pub fn visit_children_mut(&mut self, f: &mut dyn FnMut(&mut NodeId)) {
        use NodeKind::*;
        match self {
            Empty | Name { .. } | Constant { .. } | Invalid { .. } => {}
            Block { items, .. } | Tuple { items } | TupleType { types: items } => {
                items.iter_mut().for_each(|id| f(id));
            }
            If {
                condition,
                then_block,
                else_block,
            } => {
                f(condition);
                f(then_block);
                visit_opt_mut(else_block, f);
            }
            While {
                condition,
                block,
                nobreak,
            } => {
                f(condition);
                f(block);
                visit_opt_mut(nobreak, f);
            }
            Break { label } | Continue { label } => visit_opt_mut(label, f),
            Return { value } | Yield { value, .. } => visit_opt_mut(value, f),
            VarDef {
                name,
                value_type,
                value,
                ..
            } => {
                f(name);
                visit_opt_mut(value_type, f);
                visit_opt_mut(value, f);
            }
            FuncDef {
                name,
                params,
                return_type,
                block,
            } => {
                visit_opt_mut(name, f);
                params.iter_mut().for_each(|id| f(id));
                visit_opt_mut(return_type, f);
                f(block);
            }
            Param {
                name,
                value_type,
                default,
                ..
            } => {
                f(name);
                visit_opt_mut(value_type, f);
                visit_opt_mut(default, f);
            }
            ClassDef {
                name,
                members,
                bases,
                block,
            } => {
                f(name);
                members.iter_mut().chain(bases.iter_mut()).for_each(|id| f(id));
                f(block);
            }
            ModuleDef { name, block } | MacroDefinition { name, block, .. } => {
                f(name);
                f(block);
            }
            EnumDef { name, bases, items } => {
                f(name);
                bases.iter_mut().chain(items.iter_mut()).for_each(|id| f(id));
            }
            EnumItem { name, value } => {
                f(name);
                visit_opt_mut(value, f);
            }
            Paren { value } | Await { value } => f(value),
            CodeQuote { block } => f(block),
            Generator { comprehension } => f(comprehension),
            MacroApplication { parts, .. } => {
                for part in parts {
                    if let MacroPart::Node(id) = part {
                        f(id);
                    }
                }
            }
            Unary { operand, .. } => f(operand),
            Binary { left, right, .. } | UnionType { left, right } => {
                f(left);
                f(right);
            }
            ConditionalInfix {
                condition,
                then_value,
                else_value,
                ..
            } => {
                f(then_value);
                f(condition);
                visit_opt_mut(else_value, f);
            }
            ForComprehension {
                target,
                item,
                iterable,
                condition,
            } => {
                f(target);
                f(item);
                f(iterable);
                visit_opt_mut(condition, f);
            }
            MemberAccess { target, member } => {
                f(target);
                f(member);
            }
            Call { target, args } | GenericType { target, args } => {
                f(target);
                args.iter_mut().for_each(|id| f(id));
            }
            CallArg { name, value } => {
                visit_opt_mut(name, f);
                f(value);
            }
            Index { target, index } => {
                f(target);
                f(index);
            }
            Slice { start, stop, step } => {
                visit_opt_mut(start, f);
                visit_opt_mut(stop, f);
                visit_opt_mut(step, f);
            }
            SimpleType { name } => f(name),
            ArrayType { target } => f(target),
            FuncType { args, result } => {
                f(args);
                f(result);
            }
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        use NodeKind::*;
        match self {
            Block { .. } => "Block",
            Empty => "Empty",
            If { .. } => "If",
            While { .. } => "While",
            Break { .. } => "Break",
            Continue { .. } => "Continue",
            Return { .. } => "Return",
            Yield { .. } => "Yield",
            VarDef { .. } => "VarDef",
            FuncDef { .. } => "FuncDef",
            Param { .. } => "Param",
            ClassDef { .. } => "ClassDef",
            ModuleDef { .. } => "ModuleDef",
            EnumDef { .. } => "EnumDef",
            EnumItem { .. } => "EnumItem",
            MacroDefinition { .. } => "MacroDefinition",
            Name { .. } => "Name",
            Constant { .. } => "Constant",
            Tuple { .. } => "Tuple",
            Paren { .. } => "Paren",
            CodeQuote { .. } => "CodeQuote",
            Await { .. } => "Await",
            Generator { .. } => "Generator",
            MacroApplication { .. } => "MacroApplication",
            Invalid { .. } => "Invalid",
            Unary { .. } => "Unary",
            Binary { .. } => "Binary",
            ConditionalInfix { .. } => "ConditionalInfix",
            ForComprehension { .. } => "ForComprehension",
            MemberAccess { .. } => "MemberAccess",
            Call { .. } => "Call",
            CallArg { .. } => "CallArg",
            Index { .. } => "Index",
            Slice { .. } => "Slice",
            SimpleType { .. } => "SimpleType",
            TupleType { .. } => "TupleType",
            GenericType { .. } => "GenericType",
            ArrayType { .. } => "ArrayType",
            UnionType { .. } => "UnionType",
            FuncType { .. } => "FuncType",
        }
    }

    // === Capability categories ===

    /// Nodes that introduce a name into their block.
    #[must_use]
    pub fn is_definition(&self) -> bool {
        matches!(
            self,
            NodeKind::VarDef { .. }
                | NodeKind::FuncDef { name: Some(_), .. }
                | NodeKind::ClassDef { .. }
                | NodeKind::ModuleDef { .. }
                | NodeKind::EnumDef { .. }
                | NodeKind::Param { .. }
        )
    }

    /// Nodes that may stand as an item of a block.
    #[must_use]
    pub fn is_statement(&self) -> bool {
        !(self.is_type()
            || matches!(
                self,
                NodeKind::Param { .. }
                    | NodeKind::CallArg { .. }
                    | NodeKind::Slice { .. }
                    | NodeKind::EnumItem { .. }
                    | NodeKind::Block { .. }
            ))
    }

    /// Nodes that may be the left operand of an infix operator or infix macro.
    #[must_use]
    pub fn is_infix_eligible(&self) -> bool {
        self.is_statement()
            && !self.is_definition()
            && !matches!(
                self,
                NodeKind::Empty
                    | NodeKind::MacroDefinition { .. }
                    | NodeKind::If { .. }
                    | NodeKind::While { .. }
                    | NodeKind::Break { .. }
                    | NodeKind::Continue { .. }
                    | NodeKind::Return { .. }
                    | NodeKind::Yield { .. }
            )
    }

    #[must_use]
    pub fn is_atom(&self) -> bool {
        matches!(
            self,
            NodeKind::Name { .. }
                | NodeKind::Constant { .. }
                | NodeKind::Tuple { .. }
                | NodeKind::Paren { .. }
                | NodeKind::CodeQuote { .. }
                | NodeKind::Await { .. }
                | NodeKind::Generator { .. }
                | NodeKind::MacroApplication { .. }
                | NodeKind::FuncDef { name: None, .. }
                | NodeKind::Invalid { .. }
        )
    }

    /// Nodes allowed on the left of `=`. Tuples are checked item by item.
    #[must_use]
    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            NodeKind::Name { .. }
                | NodeKind::Tuple { .. }
                | NodeKind::MemberAccess { .. }
                | NodeKind::Index { .. }
        )
    }

    #[must_use]
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            NodeKind::SimpleType { .. }
                | NodeKind::TupleType { .. }
                | NodeKind::GenericType { .. }
                | NodeKind::ArrayType { .. }
                | NodeKind::UnionType { .. }
                | NodeKind::FuncType { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    parent: Option<NodeId>,
}

impl Node {
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// Syntax tree of one source unit, stored as an arena.
///
/// Every node has at most one owner. Building a node takes ownership of the
/// children named in its fields; handing the same child to a second owner is
/// a programming error and panics.
#[derive(Debug, Clone)]
pub struct Ast {
    nodes: Vec<Node>,
    root: NodeId,
    macros: Vec<MacroDef>,
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

impl Ast {
    /// An empty tree with the built-in macros registered.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Block {
                    kind: BlockKind::Root,
                    items: Vec::new(),
                },
                span: Span::zero(),
                parent: None,
            }],
            root: NodeId(0),
            macros: macros::builtin_macros(),
        }
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Macros known to the tree, in matching order.
    #[must_use]
    pub fn macros(&self) -> &[MacroDef] {
        &self.macros
    }

    /// Adds a macro after the ones already known, so built-in forms keep
    /// their priority.
    pub fn register_macro(&mut self, def: MacroDef) {
        self.macros.push(def);
    }

    /// Total number of nodes, abandoned ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root_items().is_empty()
    }

    pub fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        let mut children = Vec::new();
        kind.visit_children(&mut |child| children.push(child));
        self.nodes.push(Node {
            kind,
            span,
            parent: None,
        });
        for child in children {
            self.reparent(child, id);
        }
        id
    }

    /// Records `parent` as the owner of `child`.
    pub fn reparent(&mut self, child: NodeId, parent: NodeId) {
        let node = &mut self.nodes[child.index()];
        assert!(
            node.parent.is_none() || node.parent == Some(parent),
            "node {child:?} is already owned by {:?}",
            node.parent
        );
        node.parent = Some(parent);
    }

    /// Releases `child` from its owner so that it can be handed to another one.
    pub fn detach(&mut self, child: NodeId) {
        self.nodes[child.index()].parent = None;
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    #[must_use]
    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut children = Vec::new();
        self.kind(id).visit_children(&mut |child| children.push(child));
        children
    }

    #[must_use]
    pub fn root_items(&self) -> &[NodeId] {
        match self.kind(self.root) {
            NodeKind::Block { items, .. } => items,
            _ => &[],
        }
    }

    /// Installs the statements of the whole unit under the root block.
    pub fn set_root_items(&mut self, items: Vec<NodeId>, span: Span) {
        for item in &items {
            self.reparent(*item, self.root);
        }
        let root = &mut self.nodes[self.root.index()];
        root.span = span;
        if let NodeKind::Block { items: slot, .. } = &mut root.kind {
            *slot = items;
        }
    }

    /// Swaps the child `old` of `parent` for `new`, moving ownership.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        let mut replaced = false;
        self.nodes[parent.index()]
            .kind
            .visit_children_mut(&mut |slot| {
                if *slot == old && !replaced {
                    *slot = new;
                    replaced = true;
                }
            });
        if replaced {
            self.detach(old);
            self.reparent(new, parent);
        }
    }

    /// Copies a whole subtree; the copy has no owner.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let mut kind = self.kind(id).clone();
        let span = self.span(id);
        let mut originals = Vec::new();
        kind.visit_children(&mut |child| originals.push(child));
        let copies: Vec<NodeId> = originals
            .into_iter()
            .map(|child| self.deep_copy(child))
            .collect();
        let mut copies = copies.into_iter();
        kind.visit_children_mut(&mut |slot| {
            if let Some(copy) = copies.next() {
                *slot = copy;
            }
        });
        self.alloc(kind, span)
    }

    /// The node and all of its descendants, parents before children.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            let mut children = self.children(next);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    /// Text of a simple or qualified name node.
    #[must_use]
    pub fn name_text(&self, id: NodeId) -> Option<String> {
        match self.kind(id) {
            NodeKind::Name { parts } => Some(parts.join(".")),
            NodeKind::SimpleType { name } => self.name_text(*name),
            _ => None,
        }
    }

    /// Names introduced by a definition node. Tuple targets give several.
    #[must_use]
    pub fn defined_names(&self, id: NodeId) -> Vec<String> {
        let name = match self.kind(id) {
            NodeKind::VarDef { name, .. }
            | NodeKind::FuncDef { name: Some(name), .. }
            | NodeKind::ClassDef { name, .. }
            | NodeKind::ModuleDef { name, .. }
            | NodeKind::EnumDef { name, .. }
            | NodeKind::Param { name, .. } => *name,
            _ => return Vec::new(),
        };
        match self.kind(name) {
            NodeKind::Tuple { items } => items.iter().filter_map(|i| self.name_text(*i)).collect(),
            _ => self.name_text(name).into_iter().collect(),
        }
    }

    /// Whether `name` is visible from `from`: first in the enclosing blocks,
    /// then among the innermost enclosing function's name and parameters.
    #[must_use]
    pub fn is_defined(&self, from: NodeId, name: &str) -> bool {
        let in_blocks = self
            .ancestors(from)
            .filter(|id| matches!(self.kind(*id), NodeKind::Block { .. }))
            .any(|block| {
                self.children(block)
                    .into_iter()
                    .any(|item| self.defined_names(item).iter().any(|n| n == name))
            });
        if in_blocks {
            return true;
        }
        let function = self
            .ancestors(from)
            .find(|id| matches!(self.kind(*id), NodeKind::FuncDef { .. }));
        match function.map(|id| self.kind(id)) {
            Some(NodeKind::FuncDef {
                name: fn_name,
                params,
                ..
            }) => {
                fn_name.and_then(|n| self.name_text(n)).as_deref() == Some(name)
                    || params
                        .iter()
                        .any(|p| self.defined_names(*p).iter().any(|n| n == name))
            }
            _ => false,
        }
    }

    /// Serializable view of a subtree.
    #[must_use]
    pub fn view(&self, id: NodeId) -> NodeView<'_> {
        NodeView { ast: self, id }
    }
}

/// Borrowed subtree rendered by serde as nested maps.
pub struct NodeView<'a> {
    ast: &'a Ast,
    id: NodeId,
}

impl Serialize for NodeView<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let node = self.ast.node(self.id);
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("node", node.kind.name())?;
        map.serialize_entry("span", &node.span)?;
        match &node.kind {
            NodeKind::Name { parts } => map.serialize_entry("text", &parts.join("."))?,
            NodeKind::Constant { token } => map.serialize_entry("text", &token.value)?,
            NodeKind::Unary { operator, .. } | NodeKind::Binary { operator, .. } => {
                map.serialize_entry("text", &operator.value)?;
            }
            NodeKind::MacroApplication { name, head, parts } => {
                map.serialize_entry("text", name)?;
                let tokens: Vec<&str> = head
                    .iter()
                    .chain(parts.iter().filter_map(|part| match part {
                        MacroPart::Token(token) => Some(token),
                        MacroPart::Node(_) => None,
                    }))
                    .map(|token| token.value.as_str())
                    .collect();
                map.serialize_entry("tokens", &tokens)?;
            }
            NodeKind::Invalid { tokens } => {
                let text: Vec<&str> = tokens.iter().map(|t| t.value.as_str()).collect();
                map.serialize_entry("tokens", &text)?;
            }
            NodeKind::Block { kind, .. } => map.serialize_entry("block", kind)?,
            NodeKind::Param { kind, .. } => map.serialize_entry("param", kind)?,
            NodeKind::VarDef { immutable, .. } => map.serialize_entry("immutable", immutable)?,
            NodeKind::MacroDefinition { syntax, .. } => {
                let syntax: Vec<String> = syntax.iter().map(ToString::to_string).collect();
                map.serialize_entry("syntax", &syntax)?;
            }
            _ => {}
        }
        let children: Vec<NodeView<'_>> = self
            .ast
            .children(self.id)
            .into_iter()
            .map(|id| self.ast.view(id))
            .collect();
        if !children.is_empty() {
            map.serialize_entry("children", &children)?;
        }
        map.end()
    }
}
