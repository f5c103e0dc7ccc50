use super::{is_closing, kw, punct, Parser};
use crate::ast::{BlockKind, NodeId, NodeKind};
use crate::error::BlameKind;
use crate::language::{self, PREFIX_OPERATORS};
use crate::location::Span;
use crate::macros;
use crate::token::{InputSide, Keyword, Operator, Punctuation, Token, TokenKind};
use std::collections::HashSet;

/// Precedence of an identifier used as a binary operator (`a max b`).
const INFIX_CALL_PRECEDENCE: u8 = 4;

impl Parser<'_> {
    // === Infix ===

    /// ExpressionList ::= Infix { "," Infix } [","]
    pub(crate) fn parse_expression_list(&mut self) -> NodeId {
        let first = self.parse_infix();
        if !self.cursor.peek_line_is(&[punct(Punctuation::Comma)]) {
            return first;
        }
        let start = self.span_of(first).start;
        let mut items = vec![first];
        while self.cursor.peek_line_is(&[punct(Punctuation::Comma)]) {
            self.cursor.advance();
            if language::never_starts_expression(self.cursor.peek_line().kind) {
                break;
            }
            items.push(self.parse_infix());
        }
        let span = self.span_from(start);
        self.node(NodeKind::Tuple { items }, span)
    }

    /// Infix ::= Binary [ ( "if" | "unless" ) Binary [ "else" Binary ] ]
    pub(crate) fn parse_infix(&mut self) -> NodeId {
        let value = self.parse_binary(1);
        if self
            .cursor
            .peek_line_is(&[kw(Keyword::If), kw(Keyword::Unless)])
        {
            return self.parse_conditional(value);
        }
        value
    }

    /// Binary ::= Prefix [ InfixMacro ] { Operator Binary }
    ///
    /// Precedence climbing: an operator is taken while its precedence is at
    /// least `min_precedence`; its right operand binds one level tighter.
    pub(crate) fn parse_binary(&mut self, min_precedence: u8) -> NodeId {
        let mut left = self.parse_prefix();
        if let Some(application) = self.try_infix_macro(left) {
            left = application;
        }
        loop {
            if !self.continues_line() {
                break;
            }
            let Some(precedence) = self.infix_precedence(self.cursor.peek()) else {
                break;
            };
            if precedence < min_precedence {
                break;
            }
            let before = self.cursor.mark();
            let mut operator = self.cursor.advance();
            if operator.is(TokenKind::Identifier)
                && language::never_starts_expression(self.cursor.peek_line().kind)
            {
                // a trailing name is not an infix call
                self.cursor.rewind(before);
                break;
            }
            operator.set_input_side(InputSide::Both);
            let right = self.parse_binary(precedence + 1);
            let span = self.span_of(left).merge(self.span_of(right));
            left = self.node(
                NodeKind::Binary {
                    left,
                    operator,
                    right,
                },
                span,
            );
        }
        left
    }

    fn infix_precedence(&self, token: &Token) -> Option<u8> {
        if let (Some(op), Some(info)) = (token.operator(), token.operator_info()) {
            let binary = !op.is_assignment()
                && info.side != InputSide::Prefix
                && !matches!(op, Operator::Increment | Operator::Decrement | Operator::Dot);
            return binary.then_some(info.precedence);
        }
        let infix_call = token.is(TokenKind::Identifier)
            && !self.is_prefix_macro(&token.value)
            && !self.is_infix_macro(&token.value);
        infix_call.then_some(INFIX_CALL_PRECEDENCE)
    }

    fn try_infix_macro(&mut self, left: NodeId) -> Option<NodeId> {
        let next = self.cursor.peek_line();
        if next.is(TokenKind::Newline) || !self.is_infix_macro(&next.value) {
            return None;
        }
        if !self.ast.kind(left).is_infix_eligible() {
            return None;
        }
        macros::try_infix(self, left)
    }

    /// then_value ("if" | "unless") condition ["else" else_value]
    fn parse_conditional(&mut self, then_value: NodeId) -> NodeId {
        let start = self.span_of(then_value).start;
        let keyword = self.cursor.advance();
        let condition = self.parse_binary(1);
        let else_value = self
            .cursor
            .peek_line_is(&[kw(Keyword::Else)])
            .then(|| {
                self.cursor.advance();
                self.parse_binary(1)
            });
        let span = self.span_from(start);
        self.node(
            NodeKind::ConditionalInfix {
                condition,
                then_value,
                else_value,
                negated: keyword.is(kw(Keyword::Unless)),
            },
            span,
        )
    }

    // === Prefix and postfix ===

    /// Prefix ::= ( "++" | "--" | "+" | "-" | "not" | "~" ) Prefix | Postfix
    pub(crate) fn parse_prefix(&mut self) -> NodeId {
        let is_prefix = self
            .cursor
            .peek()
            .operator()
            .is_some_and(|op| PREFIX_OPERATORS.contains(&op));
        if !is_prefix {
            return self.parse_postfix();
        }
        let mut operator = self.cursor.advance();
        operator.set_input_side(InputSide::Prefix);
        let start = operator.span.start;
        let operand = self.parse_prefix();
        let span = self.span_from(start);
        self.node(NodeKind::Unary { operator, operand }, span)
    }

    /// Postfix ::= Atom { "." Name | Arguments | Index | "|>" Atom [Arguments] } [ "++" | "--" ]
    pub(crate) fn parse_postfix(&mut self) -> NodeId {
        let mut value = self.parse_atom();
        loop {
            let next = self.cursor.peek_line().kind;
            value = match next {
                TokenKind::Operator(Operator::Dot) => self.parse_member(value),
                TokenKind::Punctuation(Punctuation::OpenParenthesis) => {
                    self.parse_call(value, None)
                }
                TokenKind::Punctuation(Punctuation::OpenBracket) => self.parse_index(value),
                TokenKind::Punctuation(Punctuation::RightPipeline) => self.parse_pipeline(value),
                TokenKind::Newline
                    if self.continues_line()
                        && self.cursor.peek().is(TokenKind::Operator(Operator::Dot)) =>
                {
                    self.parse_member(value)
                }
                _ => break,
            };
        }

        let postfix = self
            .cursor
            .peek_line()
            .operator()
            .is_some_and(|op| matches!(op, Operator::Increment | Operator::Decrement));
        if postfix {
            let mut operator = self.cursor.advance();
            operator.set_input_side(InputSide::Postfix);
            let span = self.span_of(value).merge(operator.span);
            value = self.node(
                NodeKind::Unary {
                    operator,
                    operand: value,
                },
                span,
            );
        }
        value
    }

    fn parse_member(&mut self, target: NodeId) -> NodeId {
        let start = self.span_of(target).start;
        self.cursor.advance();
        let member = self.parse_simple_name();
        let span = self.span_from(start);
        self.node(NodeKind::MemberAccess { target, member }, span)
    }

    /// `value |> f(args)` is `f(value, args)`.
    fn parse_pipeline(&mut self, value: NodeId) -> NodeId {
        self.cursor.advance();
        let target = self.parse_atom();
        if self.cursor.peek_line_is(&[punct(Punctuation::OpenParenthesis)]) {
            return self.parse_call(target, Some(value));
        }
        let span = self.span_of(value).merge(self.span_of(target));
        let argument = self.node(NodeKind::CallArg { name: None, value }, self.span_of(value));
        self.node(
            NodeKind::Call {
                target,
                args: vec![argument],
            },
            span,
        )
    }

    /// Arguments ::= "(" [ Argument { "," Argument } [","] ] ")"
    /// Argument ::= [ Identifier "=" ] Infix | Infix Comprehension
    fn parse_call(&mut self, target: NodeId, piped: Option<NodeId>) -> NodeId {
        let start = piped.map_or_else(|| self.span_of(target).start, |p| self.span_of(p).start);
        let mut args = Vec::new();
        if let Some(value) = piped {
            let span = self.span_of(value);
            args.push(self.node(NodeKind::CallArg { name: None, value }, span));
        }
        self.cursor.advance();
        self.grouped(|p| {
            let mut names = HashSet::new();
            while !p.cursor.peek_is(&[punct(Punctuation::CloseParenthesis), TokenKind::End]) {
                args.push(p.parse_argument(&mut names));
                if !p.cursor.consume_if(&[punct(Punctuation::Comma)]) {
                    break;
                }
            }
            p.cursor.expect(&[punct(Punctuation::CloseParenthesis)]);
        });
        let span = self.span_from(start);
        self.node(NodeKind::Call { target, args }, span)
    }

    fn parse_argument(&mut self, names: &mut HashSet<String>) -> NodeId {
        self.spanned(|p| {
            let named = p.cursor.peek().is(TokenKind::Identifier)
                && p.cursor.peek_at(1).is(TokenKind::Operator(Operator::Assign));
            if named {
                let name = p.parse_simple_name();
                p.cursor.advance();
                if let Some(text) = p.ast.name_text(name) {
                    if !names.insert(text) {
                        let span = p.span_of(name);
                        p.cursor.blame(BlameKind::DuplicatedNamedArgument, span);
                    }
                }
                let value = p.parse_infix();
                return NodeKind::CallArg {
                    name: Some(name),
                    value,
                };
            }
            let mut value = p.parse_infix();
            if p.cursor.peek_is(&[kw(Keyword::For)]) {
                value = p.parse_generator(value);
            }
            NodeKind::CallArg { name: None, value }
        })
    }

    /// Index ::= "[" ( Slice | Infix { "," Infix } ) "]"
    /// Slice ::= [Infix] ":" [Infix] [ ":" [Infix] ]
    fn parse_index(&mut self, target: NodeId) -> NodeId {
        let start = self.span_of(target).start;
        let open = self.cursor.advance();
        let index = self.grouped(|p| {
            if p.cursor.peek_is(&[punct(Punctuation::CloseBracket)]) {
                p.cursor.blame(BlameKind::InvalidIndexerExpression, open.span);
                let span = p.cursor.peek().span;
                p.cursor.advance();
                return p.node(NodeKind::Tuple { items: Vec::new() }, span);
            }
            let slice_start = p.cursor.start_location();
            let first = p.parse_slice_part();
            let index = if p.cursor.consume_if(&[punct(Punctuation::Colon)]) {
                let stop = p.parse_slice_part();
                let step = if p.cursor.consume_if(&[punct(Punctuation::Colon)]) {
                    p.parse_slice_part()
                } else {
                    None
                };
                let span = p.span_from(slice_start);
                p.node(
                    NodeKind::Slice {
                        start: first,
                        stop,
                        step,
                    },
                    span,
                )
            } else {
                let mut items: Vec<NodeId> = first.into_iter().collect();
                while p.cursor.consume_if(&[punct(Punctuation::Comma)]) {
                    if p.cursor.peek_is(&[punct(Punctuation::CloseBracket)]) {
                        break;
                    }
                    items.push(p.parse_infix());
                }
                if items.len() == 1 {
                    items[0]
                } else {
                    let span = p.span_from(slice_start);
                    p.node(NodeKind::Tuple { items }, span)
                }
            };
            p.cursor.expect(&[punct(Punctuation::CloseBracket)]);
            index
        });
        let span = self.span_from(start);
        self.node(NodeKind::Index { target, index }, span)
    }

    fn parse_slice_part(&mut self) -> Option<NodeId> {
        let empty = self.cursor.peek_is(&[
            punct(Punctuation::Colon),
            punct(Punctuation::CloseBracket),
            punct(Punctuation::Comma),
        ]);
        (!empty).then(|| self.parse_infix())
    }

    // === Atoms ===

    /// Atom ::= Name | Constant | "await" Infix | Break | Continue | Return | Yield
    ///        | CodeQuote | Paren | If | While | Definition | MacroApplication
    pub(crate) fn parse_atom(&mut self) -> NodeId {
        let token = self.cursor.peek().clone();
        match token.kind {
            TokenKind::Identifier => {
                let assigned = self
                    .cursor
                    .peek_at(1)
                    .operator()
                    .is_some_and(Operator::is_assignment);
                if self.is_prefix_macro(&token.value) && !assigned {
                    if let Some(application) = macros::try_prefix(self) {
                        return application;
                    }
                }
                self.parse_name()
            }
            kind if language::is_constant(kind) => {
                let token = self.cursor.advance();
                let span = token.span;
                self.node(NodeKind::Constant { token }, span)
            }
            TokenKind::Keyword(Keyword::Pass) => {
                self.cursor.advance();
                self.node(NodeKind::Empty, token.span)
            }
            TokenKind::Keyword(Keyword::Await) => self.spanned(|p| {
                p.cursor.advance();
                let value = p.parse_infix();
                NodeKind::Await { value }
            }),
            TokenKind::Keyword(Keyword::Break | Keyword::Continue) => self.parse_loop_jump(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return(),
            TokenKind::Keyword(Keyword::Yield) => self.parse_yield(),
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::While) => self.parse_while(),
            TokenKind::Keyword(Keyword::Let) => self.parse_let(),
            TokenKind::Keyword(Keyword::Fn) => self.parse_function(),
            TokenKind::Keyword(Keyword::Class) => self.parse_class(),
            TokenKind::Keyword(Keyword::Module) => self.parse_module(),
            TokenKind::Keyword(Keyword::Enum) => self.parse_enum(),
            TokenKind::Keyword(Keyword::Macro) => self.parse_macro(),
            TokenKind::Punctuation(Punctuation::OpenParenthesis) => self.parse_paren(),
            TokenKind::Punctuation(Punctuation::OpenDoubleBrace) => self.parse_code_quote(),
            _ => macros::try_prefix(self).unwrap_or_else(|| self.parse_invalid()),
        }
    }

    /// Name ::= Identifier { "." Identifier }
    pub(crate) fn parse_name(&mut self) -> NodeId {
        let first = self.cursor.advance();
        let start = first.span.start;
        let mut parts = vec![first.value];
        while self.cursor.peek_line_is(&[TokenKind::Operator(Operator::Dot)])
            && self.cursor.peek_at(1).is(TokenKind::Identifier)
        {
            self.cursor.advance();
            parts.push(self.cursor.advance().value);
        }
        let span = self.span_from(start);
        self.node(NodeKind::Name { parts }, span)
    }

    /// A single identifier, as required by definitions and member access.
    pub(crate) fn parse_simple_name(&mut self) -> NodeId {
        let token = self
            .cursor
            .expect_or(&[TokenKind::Identifier], BlameKind::ExpectedSimpleName);
        let span = token.span;
        self.node(
            NodeKind::Name {
                parts: vec![token.value],
            },
            span,
        )
    }

    /// Targets ::= Postfix { "," Postfix }
    pub(crate) fn parse_targets(&mut self) -> NodeId {
        let first = self.parse_postfix();
        if !self.cursor.peek_line_is(&[punct(Punctuation::Comma)]) {
            return first;
        }
        let start = self.span_of(first).start;
        let mut items = vec![first];
        while self.cursor.peek_line_is(&[punct(Punctuation::Comma)]) {
            self.cursor.advance();
            items.push(self.parse_postfix());
        }
        let span = self.span_from(start);
        self.node(NodeKind::Tuple { items }, span)
    }

    /// Paren ::= "(" ")" | "(" Infix ")" | "(" Infix Comprehension ")"
    ///         | "(" Infix "," [ Infix { "," Infix } ] [","] ")"
    fn parse_paren(&mut self) -> NodeId {
        self.spanned(|p| {
            p.cursor.advance();
            p.grouped(|p| {
                if p.cursor.consume_if(&[punct(Punctuation::CloseParenthesis)]) {
                    return NodeKind::Tuple { items: Vec::new() };
                }
                let first = p.parse_infix();
                let kind = if p.cursor.peek_is(&[kw(Keyword::For)]) {
                    let comprehension = p.parse_comprehension(first);
                    NodeKind::Generator { comprehension }
                } else if p.cursor.peek_is(&[punct(Punctuation::Comma)]) {
                    let mut items = vec![first];
                    while p.cursor.consume_if(&[punct(Punctuation::Comma)]) {
                        if p.cursor.peek_is(&[punct(Punctuation::CloseParenthesis)]) {
                            break;
                        }
                        items.push(p.parse_infix());
                    }
                    NodeKind::Tuple { items }
                } else {
                    NodeKind::Paren { value: first }
                };
                p.cursor.expect(&[punct(Punctuation::CloseParenthesis)]);
                kind
            })
        })
    }

    fn parse_generator(&mut self, target: NodeId) -> NodeId {
        let comprehension = self.parse_comprehension(target);
        let span = self.span_of(comprehension);
        self.node(NodeKind::Generator { comprehension }, span)
    }

    /// Comprehension ::= "for" Targets "in" Binary [ "if" Binary ]
    fn parse_comprehension(&mut self, target: NodeId) -> NodeId {
        let start = self.span_of(target).start;
        self.cursor.advance();
        let item = self.parse_targets();
        self.cursor.expect(&[TokenKind::Operator(Operator::In)]);
        let iterable = self.parse_binary(1);
        let condition = self
            .cursor
            .consume_if(&[kw(Keyword::If)])
            .then(|| self.parse_binary(1));
        let span = self.span_from(start);
        self.node(
            NodeKind::ForComprehension {
                target,
                item,
                iterable,
                condition,
            },
            span,
        )
    }

    /// CodeQuote ::= "{{" Statements "}}"
    fn parse_code_quote(&mut self) -> NodeId {
        self.spanned(|p| {
            let start = p.cursor.advance().span.start;
            let items = p.parse_statements(&[punct(Punctuation::CloseDoubleBrace)]);
            p.cursor.expect(&[punct(Punctuation::CloseDoubleBrace)]);
            let span = p.span_from(start);
            let block = p.node(
                NodeKind::Block {
                    kind: BlockKind::Default,
                    items,
                },
                span,
            );
            NodeKind::CodeQuote { block }
        })
    }

    /// Consumes the rest of the line as an `Invalid` node and reports it.
    pub(crate) fn parse_invalid(&mut self) -> NodeId {
        let first = self.cursor.peek().clone();
        let mut tokens = Vec::new();
        let layout = [TokenKind::Newline, TokenKind::End, TokenKind::Outdent];
        if !first.is_any(&layout) && !(self.nesting > 0 && is_closing(first.kind)) {
            tokens.push(self.cursor.advance());
        }
        while !self.cursor.peek_line_is(&layout)
            && !(self.nesting > 0 && is_closing(self.cursor.peek_line().kind))
            && !tokens.is_empty()
        {
            tokens.push(self.cursor.advance());
        }
        let span = match (tokens.first(), tokens.last()) {
            (Some(a), Some(b)) => Span::new(a.span.start, b.span.end),
            _ => first.span,
        };
        let kind = if first.is(TokenKind::End) {
            BlameKind::UnexpectedEndOfCode
        } else {
            BlameKind::InvalidSyntax
        };
        self.cursor.blame(kind, span);
        self.node(NodeKind::Invalid { tokens }, span)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Ast, NodeId, NodeKind};
    use crate::error::BlameKind;
    use crate::parser::tests::{blame_kinds, parse_code, parse_ok};
    use crate::token::Operator;

    fn first(ast: &Ast) -> NodeId {
        ast.root_items()[0]
    }

    fn operator_of(ast: &Ast, id: NodeId) -> Option<Operator> {
        match ast.kind(id) {
            NodeKind::Binary { operator, .. } | NodeKind::Unary { operator, .. } => {
                operator.operator()
            }
            _ => None,
        }
    }

    fn binary_parts(ast: &Ast, id: NodeId) -> (NodeId, Operator, NodeId) {
        match ast.kind(id) {
            NodeKind::Binary {
                left,
                operator,
                right,
            } => (*left, operator.operator().unwrap(), *right),
            other => panic!("expected a binary node, got {other:?}"),
        }
    }

    #[test]
    fn test_precedence() {
        let ast = parse_ok("a + b * c ** d\n");
        let (left, op, right) = binary_parts(&ast, first(&ast));
        assert_eq!(op, Operator::Plus);
        assert_eq!(ast.name_text(left).as_deref(), Some("a"));
        let (_, op, right) = binary_parts(&ast, right);
        assert_eq!(op, Operator::Multiply);
        assert_eq!(operator_of(&ast, right), Some(Operator::Power));
    }

    #[test]
    fn test_left_associativity() {
        let ast = parse_ok("a - b - c\n");
        let (left, op, right) = binary_parts(&ast, first(&ast));
        assert_eq!(op, Operator::Minus);
        assert_eq!(operator_of(&ast, left), Some(Operator::Minus));
        assert_eq!(ast.name_text(right).as_deref(), Some("c"));
    }

    #[test]
    fn test_identifier_as_infix_call() {
        let ast = parse_ok("a max b + c\n");
        let NodeKind::Binary {
            left,
            operator,
            right,
        } = ast.kind(first(&ast))
        else {
            panic!("expected binary");
        };
        assert_eq!(operator.value, "max");
        assert_eq!(ast.name_text(*left).as_deref(), Some("a"));
        assert_eq!(operator_of(&ast, *right), Some(Operator::Plus));
    }

    #[test]
    fn test_prefix_and_postfix() {
        let ast = parse_ok("-x++\n");
        let NodeKind::Unary { operand, .. } = ast.kind(first(&ast)) else {
            panic!("expected unary");
        };
        assert_eq!(operator_of(&ast, first(&ast)), Some(Operator::Minus));
        assert_eq!(operator_of(&ast, *operand), Some(Operator::Increment));
        let ast = parse_ok("not a and b\n");
        let (left, op, _) = binary_parts(&ast, first(&ast));
        assert_eq!(op, Operator::And);
        assert_eq!(operator_of(&ast, left), Some(Operator::Not));
    }

    #[test]
    fn test_qualified_names_calls_and_members() {
        let ast = parse_ok("a.b.c(1, key = 2).d[0]\n");
        let NodeKind::Index { target, .. } = ast.kind(first(&ast)) else {
            panic!("expected index");
        };
        let NodeKind::MemberAccess { target, .. } = ast.kind(*target) else {
            panic!("expected member access");
        };
        let NodeKind::Call { target, args } = ast.kind(*target) else {
            panic!("expected call");
        };
        assert_eq!(ast.name_text(*target).as_deref(), Some("a.b.c"));
        assert_eq!(args.len(), 2);
        assert!(matches!(ast.kind(args[1]), NodeKind::CallArg { name: Some(_), .. }));
    }

    #[test]
    fn test_duplicated_named_argument() {
        assert_eq!(
            blame_kinds("f(a = 1, a = 2)\n"),
            vec![BlameKind::DuplicatedNamedArgument]
        );
    }

    #[test]
    fn test_slices() {
        let ast = parse_ok("x[1:2]\nx[::2]\nx[:]\n");
        for item in ast.root_items() {
            let NodeKind::Index { index, .. } = ast.kind(*item) else {
                panic!("expected index");
            };
            assert!(matches!(ast.kind(*index), NodeKind::Slice { .. }));
        }
        let NodeKind::Index { index, .. } = ast.kind(ast.root_items()[1]) else {
            unreachable!();
        };
        assert!(matches!(
            ast.kind(*index),
            NodeKind::Slice {
                start: None,
                stop: None,
                step: Some(_)
            }
        ));
        assert_eq!(blame_kinds("x[]\n"), vec![BlameKind::InvalidIndexerExpression]);
    }

    #[test]
    fn test_pipeline_prepends_argument() {
        let ast = parse_ok("x |> f(y) |> g\n");
        let NodeKind::Call { target, args } = ast.kind(first(&ast)) else {
            panic!("expected call");
        };
        assert_eq!(ast.name_text(*target).as_deref(), Some("g"));
        let NodeKind::CallArg { value, .. } = ast.kind(args[0]) else {
            panic!("expected argument");
        };
        let NodeKind::Call { target, args } = ast.kind(*value) else {
            panic!("expected inner call");
        };
        assert_eq!(ast.name_text(*target).as_deref(), Some("f"));
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_tuples_parens_and_generators() {
        let ast = parse_ok("()\n(a)\n(a, b)\n(x for x in xs if x)\n");
        let kinds: Vec<&str> = ast.root_items().iter().map(|i| ast.kind(*i).name()).collect();
        assert_eq!(kinds, vec!["Tuple", "Paren", "Tuple", "Generator"]);
    }

    #[test]
    fn test_conditional_infix() {
        let ast = parse_ok("y = a if c else b\nz = a unless c\n");
        let NodeKind::VarDef {
            value: Some(value),
            ..
        } = ast.kind(ast.root_items()[0]) else {
            panic!("expected definition");
        };
        assert!(matches!(
            ast.kind(*value),
            NodeKind::ConditionalInfix {
                else_value: Some(_),
                negated: false,
                ..
            }
        ));
        let NodeKind::VarDef {
            value: Some(value),
            ..
        } = ast.kind(ast.root_items()[1]) else {
            panic!("expected definition");
        };
        assert!(matches!(ast.kind(*value), NodeKind::ConditionalInfix { negated: true, .. }));
    }

    #[test]
    fn test_line_continuation() {
        let ast = parse_ok("x = a *\n    b\ny = c\n    .d\n");
        assert_eq!(ast.root_items().len(), 2);
        let ast = parse_ok("f(a,\n  b)\n");
        assert_eq!(ast.root_items().len(), 1);
    }

    #[test]
    fn test_code_quote_and_await() {
        let ast = parse_ok("q = {{ a + b }}\nawait f()\n");
        let NodeKind::VarDef {
            value: Some(value),
            ..
        } = ast.kind(ast.root_items()[0]) else {
            panic!("expected definition");
        };
        assert!(matches!(ast.kind(*value), NodeKind::CodeQuote { .. }));
        assert!(matches!(ast.kind(ast.root_items()[1]), NodeKind::Await { .. }));
    }

    #[test]
    fn test_unexpected_end() {
        let output = parse_code("x = ");
        assert!(output
            .blames
            .iter()
            .any(|b| b.kind == BlameKind::UnexpectedEndOfCode));
    }
}
