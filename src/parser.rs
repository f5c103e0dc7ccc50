use crate::ast::{Ast, BlockKind, NodeId, NodeKind};
use crate::cursor::TokenCursor;
use crate::error::{Blame, BlameKind};
use crate::location::{Location, Span};
use crate::macros::MacroDef;
use crate::source::ProcessingOptions;
use crate::token::{Keyword, Operator, Punctuation, Token, TokenKind};
use log::debug;
use std::collections::HashSet;

mod definitions;
mod expressions;
mod statements;
mod types;

pub(crate) const fn punct(punctuation: Punctuation) -> TokenKind {
    TokenKind::Punctuation(punctuation)
}

pub(crate) const fn kw(keyword: Keyword) -> TokenKind {
    TokenKind::Keyword(keyword)
}

pub(crate) fn is_closing(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Punctuation(p) if p.is_closing())
}

/// The tree and the blames produced by [`parse`].
#[derive(Debug)]
pub struct ParseOutput {
    pub ast: Ast,
    pub blames: Vec<Blame>,
}

/// Names visible while parsing. Function frames hold the function's own name
/// and its parameters; they are only consulted for the innermost function.
#[derive(Debug, Default)]
struct Scope {
    names: Vec<String>,
    function: bool,
}

/// A recursive descent parser with precedence climbing for binary operators.
///
/// The parser never fails: malformed code becomes `Invalid` nodes and blames.
#[derive(Debug)]
pub struct Parser<'t> {
    pub(crate) cursor: TokenCursor<'t>,
    pub(crate) ast: Ast,
    options: &'t ProcessingOptions,
    scopes: Vec<Scope>,
    /// Depth of enclosing `()`, `[]` groups, where line breaks do not end expressions.
    pub(crate) nesting: usize,
    /// Leading keywords of prefix macros.
    prefix_macros: HashSet<String>,
    /// Keywords following the left operand of infix macros.
    infix_macros: HashSet<String>,
}

/// Parses a whole unit.
pub fn parse(tokens: &[Token], options: &ProcessingOptions) -> ParseOutput {
    parse_with_macros(tokens, options, &[])
}

/// Parses a whole unit with `macros` registered after the built-in ones.
pub fn parse_with_macros(
    tokens: &[Token],
    options: &ProcessingOptions,
    macros: &[MacroDef],
) -> ParseOutput {
    let mut parser = Parser::new(tokens, options);
    for def in macros {
        parser.register_macro(def.clone());
    }
    parser.parse_root();
    debug!(
        "Parsed {} top-level items, {} blames",
        parser.ast.root_items().len(),
        parser.cursor.blames().len()
    );
    ParseOutput {
        ast: parser.ast,
        blames: parser.cursor.into_blames(),
    }
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Token], options: &'t ProcessingOptions) -> Self {
        let mut parser = Self {
            cursor: TokenCursor::new(tokens),
            ast: Ast::new(),
            options,
            scopes: Vec::new(),
            nesting: 0,
            prefix_macros: HashSet::new(),
            infix_macros: HashSet::new(),
        };
        let builtins = parser.ast.macros().to_vec();
        for def in &builtins {
            parser.index_macro(def);
        }
        parser
    }

    /// Makes `def` available to everything parsed from now on.
    pub fn register_macro(&mut self, def: MacroDef) {
        debug!("Registering macro '{}'", def.name);
        self.index_macro(&def);
        self.ast.register_macro(def);
    }

    fn index_macro(&mut self, def: &MacroDef) {
        if let Some(token) = def.leading_token() {
            self.prefix_macros.insert(token.to_string());
        }
        if let Some(token) = def.infix_token() {
            self.infix_macros.insert(token.to_string());
        }
    }

    // === Node construction ===

    pub(crate) fn node(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.ast.alloc(kind, span)
    }

    /// Runs a production and positions its node from the first token it
    /// reads to the last one.
    pub(crate) fn spanned(&mut self, production: impl FnOnce(&mut Self) -> NodeKind) -> NodeId {
        let start = self.cursor.start_location();
        let kind = production(self);
        let span = self.span_from(start);
        self.ast.alloc(kind, span)
    }

    pub(crate) fn span_from(&self, start: Location) -> Span {
        Span::new(start, self.cursor.end_location().max(start))
    }

    pub(crate) fn span_of(&self, id: NodeId) -> Span {
        self.ast.span(id)
    }

    pub(crate) fn is_prefix_macro(&self, text: &str) -> bool {
        self.prefix_macros.contains(text)
    }

    pub(crate) fn is_infix_macro(&self, text: &str) -> bool {
        self.infix_macros.contains(text)
    }

    pub(crate) fn options(&self) -> &ProcessingOptions {
        self.options
    }

    // === Scopes ===

    pub(crate) fn define(&mut self, name: impl Into<String>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.names.push(name.into());
        }
    }

    /// Defines every name introduced by a target (`x` or `x, y`).
    pub(crate) fn define_target(&mut self, target: NodeId) {
        let names: Vec<String> = match self.ast.kind(target) {
            NodeKind::Tuple { items } => items
                .iter()
                .filter_map(|i| self.ast.name_text(*i))
                .collect(),
            _ => self.ast.name_text(target).into_iter().collect(),
        };
        for name in names {
            self.define(name);
        }
    }

    /// Walks the enclosing blocks to the root, then the innermost function.
    pub(crate) fn is_defined(&self, name: &str) -> bool {
        let in_blocks = self
            .scopes
            .iter()
            .filter(|s| !s.function)
            .any(|s| s.names.iter().any(|n| n == name));
        in_blocks
            || self
                .scopes
                .iter()
                .rev()
                .find(|s| s.function)
                .is_some_and(|s| s.names.iter().any(|n| n == name))
    }

    pub(crate) fn enter_function(&mut self, names: Vec<String>) {
        self.scopes.push(Scope {
            names,
            function: true,
        });
    }

    pub(crate) fn exit_scope(&mut self) {
        self.scopes.pop();
    }

    // === Lines and groups ===

    /// Whether the expression being read goes on past the next token.
    /// A line break ends it, unless we are inside a group or the next line
    /// starts with a binary operator.
    pub(crate) fn continues_line(&self) -> bool {
        if self.nesting > 0 || !self.cursor.peek_line().is(TokenKind::Newline) {
            return true;
        }
        self.cursor
            .peek()
            .operator_info()
            .is_some_and(|info| info.side == crate::token::InputSide::Both)
    }

    /// Runs `f` inside a `()`/`[]` group.
    pub(crate) fn grouped<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.nesting += 1;
        let result = f(self);
        self.nesting -= 1;
        result
    }

    /// Runs `f` with line breaks significant again, as in a block body.
    fn ungrouped<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.nesting, 0);
        let result = f(self);
        self.nesting = saved;
        result
    }

    // === Blocks ===

    fn parse_root(&mut self) {
        self.scopes.push(Scope::default());
        let items = self.parse_statements(&[]);
        self.exit_scope();
        let span = Span::new(Location::new(1, 1), self.cursor.end_location());
        self.ast.set_root_items(items, span);
    }

    /// Block ::= ":" InlineStatements
    ///         | [":"] "{" Statements "}"
    ///         | [":"] NEWLINE INDENT Statements OUTDENT
    pub(crate) fn parse_block(&mut self, kind: BlockKind) -> NodeId {
        let start = self.cursor.start_location();
        let colon = self.cursor.consume(&[punct(Punctuation::Colon)]);
        self.scopes.push(Scope::default());
        let items = self.ungrouped(|p| {
            if p.cursor.peek_line_is(&[punct(Punctuation::OpenBrace)]) {
                if let Some(colon) = &colon {
                    p.cursor.blame(BlameKind::RedundantColonWithBraces, colon.span);
                }
                p.cursor.advance();
                let items = p.parse_statements(&[punct(Punctuation::CloseBrace)]);
                p.cursor.expect(&[punct(Punctuation::CloseBrace)]);
                items
            } else if p.cursor.peek_line_is(&[TokenKind::Newline, TokenKind::Indent]) {
                while p.cursor.consume_newline() {}
                match p.cursor.consume(&[TokenKind::Indent]) {
                    Some(indent) => {
                        if kind == BlockKind::Lambda {
                            p.cursor.blame(BlameKind::LambdaCannotHaveIndentedBody, indent.span);
                        }
                        let items = p.parse_statements(&[TokenKind::Outdent]);
                        // the end of input closes every level, so the outdent is there
                        p.cursor.consume_if(&[TokenKind::Outdent]);
                        items
                    }
                    None => {
                        p.cursor.blame(BlameKind::ExpectedBlockDeclaration, Span::zero());
                        Vec::new()
                    }
                }
            } else if colon.is_some() {
                p.parse_inline_statements()
            } else {
                p.cursor.blame(BlameKind::ExpectedBlockDeclaration, Span::zero());
                Vec::new()
            }
        });
        self.exit_scope();
        let span = self.span_from(start);
        self.node(NodeKind::Block { kind, items }, span)
    }

    /// Statements ::= { Statement ( NEWLINE | ";" ) }
    ///
    /// Stops before any of `terminators`, or at the end of input.
    pub(crate) fn parse_statements(&mut self, terminators: &[TokenKind]) -> Vec<NodeId> {
        let mut items = Vec::new();
        loop {
            while self.cursor.consume_newline() {}
            let next = self.cursor.peek().clone();
            if next.is(TokenKind::End) || next.is_any(terminators) {
                break;
            }
            if next.is(TokenKind::Outdent) {
                self.cursor.advance();
                continue;
            }
            if next.is(punct(Punctuation::Semicolon)) {
                self.cursor.advance();
                items.push(self.node(NodeKind::Empty, next.span));
                continue;
            }

            let before = self.cursor.mark();
            items.push(self.parse_any());
            if self.cursor.mark() == before {
                self.cursor.advance();
            }

            if self.cursor.consume_if(&[punct(Punctuation::Semicolon)])
                || self.cursor.peek_line_is(&[TokenKind::Newline])
                || self.cursor.current().is_any(&[
                    TokenKind::Newline,
                    TokenKind::Outdent,
                    punct(Punctuation::CloseBrace),
                    punct(Punctuation::CloseDoubleBrace),
                ])
            {
                continue;
            }
            let next = self.cursor.peek().clone();
            if !next.is(TokenKind::End) && !next.is_any(terminators) {
                self.cursor.blame_message(
                    BlameKind::ExpectedToken,
                    format!("Expected newline or ';', got {next}."),
                    next.span,
                );
            }
        }
        items
    }

    /// Statements of a block written on its header line, joined by `;`.
    fn parse_inline_statements(&mut self) -> Vec<NodeId> {
        let mut items = vec![self.parse_any()];
        while self.cursor.peek_line_is(&[punct(Punctuation::Semicolon)]) {
            self.cursor.advance();
            if self.cursor.peek_line_is(&[TokenKind::Newline, TokenKind::End, TokenKind::Outdent])
                || is_closing(self.cursor.peek().kind)
            {
                break;
            }
            items.push(self.parse_any());
        }
        items
    }

    // === Statements ===

    /// Any ::= "let" Let
    ///       | Identifier ":" Type [ "=" Any ]
    ///       | ExpressionList [ AssignOperator Any ]
    ///
    /// `name = value` with a name not visible yet defines a variable.
    pub(crate) fn parse_any(&mut self) -> NodeId {
        let next = self.cursor.peek().clone();
        if next.is(kw(Keyword::Let)) {
            return self.parse_let();
        }
        if next.is(TokenKind::Identifier)
            && !self.is_prefix_macro(&next.value)
            && self.cursor.peek_at(1).is(punct(Punctuation::Colon))
        {
            return self.parse_typed_variable();
        }

        let left = self.parse_expression_list();
        let assignment = self
            .cursor
            .peek()
            .operator()
            .filter(|op| op.is_assignment());
        let Some(op) = assignment else {
            return left;
        };
        if !self.continues_line() {
            return left;
        }
        let operator = self.cursor.advance();
        let value = self.parse_any();
        let span = self.span_of(left).merge(self.span_of(value));

        if !self.is_assignable(left) {
            let target = self.span_of(left);
            self.cursor.blame(BlameKind::NotAssignable, target);
        } else if op == Operator::Assign && self.is_new_target(left) {
            self.define_target(left);
            return self.node(
                NodeKind::VarDef {
                    name: left,
                    value_type: None,
                    value: Some(value),
                    immutable: false,
                },
                span,
            );
        }
        self.node(
            NodeKind::Binary {
                left,
                operator,
                right: value,
            },
            span,
        )
    }

    /// Identifier ":" Type [ "=" Any ]
    fn parse_typed_variable(&mut self) -> NodeId {
        self.spanned(|p| {
            let name = p.parse_simple_name();
            p.cursor.expect(&[punct(Punctuation::Colon)]);
            let value_type = p.parse_type();
            let value = p
                .cursor
                .consume_if(&[TokenKind::Operator(Operator::Assign)])
                .then(|| p.parse_any());
            p.define_target(name);
            NodeKind::VarDef {
                name,
                value_type: Some(value_type),
                value,
                immutable: false,
            }
        })
    }

    fn is_assignable(&self, target: NodeId) -> bool {
        match self.ast.kind(target) {
            NodeKind::Tuple { items } => {
                !items.is_empty() && items.iter().all(|i| self.is_assignable(*i))
            }
            kind => kind.is_assignable(),
        }
    }

    /// A simple name, or a tuple of them, none of which is visible yet.
    fn is_new_target(&self, target: NodeId) -> bool {
        let is_new_name = |id: NodeId| match self.ast.kind(id) {
            NodeKind::Name { parts } => parts.len() == 1 && !self.is_defined(&parts[0]),
            _ => false,
        };
        match self.ast.kind(target) {
            NodeKind::Tuple { items } => items.iter().all(|i| is_new_name(*i)),
            _ => is_new_name(target),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ast::ParamKind;
    use crate::lexer::tokenize;

    pub(crate) fn parse_code(input: &str) -> ParseOutput {
        let options = ProcessingOptions::default();
        let tokens = tokenize(input, &options).tokens;
        parse(&tokens, &options)
    }

    /// Parses code that must produce no blames at all.
    pub(crate) fn parse_ok(input: &str) -> Ast {
        let output = parse_code(input);
        assert!(output.blames.is_empty(), "{input:?}: {:?}", output.blames);
        output.ast
    }

    pub(crate) fn blame_kinds(input: &str) -> Vec<BlameKind> {
        parse_code(input).blames.into_iter().map(|b| b.kind).collect()
    }

    fn only_item(ast: &Ast) -> NodeId {
        assert_eq!(ast.root_items().len(), 1, "{:?}", ast.root_items());
        ast.root_items()[0]
    }

    #[test]
    fn test_function_definition() {
        let ast = parse_ok("fn add(a: int, b: int) -> int:\n    return a + b\n");
        let NodeKind::FuncDef {
            name,
            params,
            return_type,
            block,
        } = ast.kind(only_item(&ast))
        else {
            panic!("expected a function");
        };
        assert_eq!(name.and_then(|n| ast.name_text(n)).as_deref(), Some("add"));
        assert_eq!(params.len(), 2);
        assert!(return_type.is_some());
        let NodeKind::Block { items, .. } = ast.kind(*block) else {
            panic!("expected a block");
        };
        assert_eq!(items.len(), 1);
        assert!(matches!(ast.kind(items[0]), NodeKind::Return { value: Some(_) }));
    }

    #[test]
    fn test_assignment_defines_then_assigns() {
        let ast = parse_ok("x = 1\nx = 2\n");
        let items = ast.root_items();
        assert!(matches!(ast.kind(items[0]), NodeKind::VarDef { .. }));
        assert!(matches!(ast.kind(items[1]), NodeKind::Binary { .. }));
    }

    #[test]
    fn test_parameter_names_are_visible_in_body() {
        let ast = parse_ok("fn f(n):\n    n = 2\n    m = 3\n");
        let NodeKind::FuncDef { block, .. } = ast.kind(only_item(&ast)) else {
            panic!("expected a function");
        };
        let NodeKind::Block { items, .. } = ast.kind(*block) else {
            panic!("expected a block");
        };
        assert!(matches!(ast.kind(items[0]), NodeKind::Binary { .. }));
        assert!(matches!(ast.kind(items[1]), NodeKind::VarDef { .. }));
    }

    #[test]
    fn test_typed_variable_and_let() {
        let ast = parse_ok("count: int = 0\nlet name = 'x'\n");
        let items = ast.root_items();
        assert!(matches!(
            ast.kind(items[0]),
            NodeKind::VarDef {
                value_type: Some(_),
                value: Some(_),
                immutable: false,
                ..
            }
        ));
        assert!(matches!(
            ast.kind(items[1]),
            NodeKind::VarDef { immutable: true, .. }
        ));
    }

    #[test]
    fn test_let_without_type_or_value_is_a_warning() {
        assert_eq!(blame_kinds("let x\n"), vec![BlameKind::ImpossibleToInferType]);
    }

    #[test]
    fn test_not_assignable() {
        assert_eq!(blame_kinds("1 = x\n"), vec![BlameKind::NotAssignable]);
    }

    #[test]
    fn test_semicolons_join_statements() {
        let ast = parse_ok("a = 1; b = 2;\nc = 3\n");
        assert_eq!(ast.root_items().len(), 3);
    }

    #[test]
    fn test_missing_separator() {
        assert_eq!(blame_kinds("a = 1 2\n").first(), Some(&BlameKind::ExpectedToken));
    }

    #[test]
    fn test_brace_block_and_redundant_colon() {
        parse_ok("if a { b }\n");
        assert_eq!(
            blame_kinds("if a: { b }\n"),
            vec![BlameKind::RedundantColonWithBraces]
        );
    }

    #[test]
    fn test_missing_block() {
        assert_eq!(
            blame_kinds("while x\ny\n"),
            vec![BlameKind::ExpectedBlockDeclaration]
        );
    }

    #[test]
    fn test_nested_blocks_close_incrementally() {
        let ast = parse_ok("if a:\n    if b:\n        c\n    d\ne\n");
        assert_eq!(ast.root_items().len(), 2);
        let NodeKind::If { then_block, .. } = ast.kind(ast.root_items()[0]) else {
            panic!("expected if");
        };
        let NodeKind::Block { items, .. } = ast.kind(*then_block) else {
            panic!("expected a block");
        };
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_invalid_input_is_kept_and_reported() {
        let output = parse_code("a = 1\n) ) )\nb = 2\n");
        assert_eq!(output.ast.root_items().len(), 3);
        let invalid = output.ast.root_items()[1];
        assert!(matches!(
            output.ast.kind(invalid),
            NodeKind::Invalid { tokens } if tokens.len() == 3
        ));
        assert_eq!(
            output.blames.iter().map(|b| b.kind).collect::<Vec<_>>(),
            vec![BlameKind::InvalidSyntax]
        );
    }

    #[test]
    fn test_parameter_checks() {
        assert_eq!(
            blame_kinds("fn f(a, a):\n    pass\n"),
            vec![BlameKind::DuplicatedParameterInFunction]
        );
        assert_eq!(
            blame_kinds("fn f(a = 1, b):\n    pass\n"),
            vec![BlameKind::ExpectedDefaultParameterValue]
        );
        assert_eq!(
            blame_kinds("fn f(*a, *b):\n    pass\n"),
            vec![BlameKind::CannotHaveMoreThan1ListParameter]
        );
        let ast = parse_ok("fn f(a, *rest, **options): pass\n");
        let NodeKind::FuncDef { params, .. } = ast.kind(only_item(&ast)) else {
            panic!("expected a function");
        };
        let kinds: Vec<ParamKind> = params
            .iter()
            .filter_map(|p| match ast.kind(*p) {
                NodeKind::Param { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, vec![ParamKind::Normal, ParamKind::List, ParamKind::Map]);
    }

    #[test]
    fn test_every_node_has_a_position() {
        let ast = parse_ok("fn f(x):\n    while x > 0:\n        x -= 1\n    return x\n");
        for id in ast.descendants(ast.root()) {
            assert!(!ast.span(id).is_zero(), "{:?}", ast.kind(id));
        }
    }

    #[test]
    fn test_tree_lookup_agrees_with_parser_scopes() {
        let ast = parse_ok("x = 1\nfn f(p):\n    x = p\n    q = x\n");
        let NodeKind::FuncDef { block, .. } = ast.kind(ast.root_items()[1]) else {
            panic!("expected a function");
        };
        let NodeKind::Block { items, .. } = ast.kind(*block) else {
            panic!("expected a block");
        };
        // `x` was visible, so the first line assigns instead of defining
        assert!(matches!(ast.kind(items[0]), NodeKind::Binary { .. }));
        assert!(matches!(ast.kind(items[1]), NodeKind::VarDef { .. }));
        assert!(ast.is_defined(items[0], "x"));
        assert!(ast.is_defined(items[0], "p"));
        assert!(ast.is_defined(items[0], "f"));
        assert!(!ast.is_defined(items[0], "r"));
        assert!(!ast.is_defined(ast.root_items()[0], "p"));
    }
}
