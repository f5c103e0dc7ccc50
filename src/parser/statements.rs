use super::{kw, punct, Parser};
use crate::ast::{BlockKind, NodeId, NodeKind};
use crate::error::BlameKind;
use crate::language;
use crate::token::{Keyword, Operator, Punctuation, TokenKind};

impl Parser<'_> {
    /// If ::= "if" Infix Block { "elif" Infix Block } [ "else" Block ]
    ///
    /// An `elif` branch becomes a nested `If` in the else slot.
    pub(crate) fn parse_if(&mut self) -> NodeId {
        self.spanned(|p| {
            p.cursor.advance();
            p.parse_if_rest()
        })
    }

    fn parse_if_rest(&mut self) -> NodeKind {
        let condition = self.parse_infix();
        let then_block = self.parse_block(BlockKind::Default);
        let else_block = if self.cursor.peek_is(&[kw(Keyword::Elif)]) {
            Some(self.spanned(|p| {
                p.cursor.advance();
                p.parse_if_rest()
            }))
        } else if self.cursor.consume_if(&[kw(Keyword::Else)]) {
            Some(self.parse_block(BlockKind::Default))
        } else {
            None
        };
        NodeKind::If {
            condition,
            then_block,
            else_block,
        }
    }

    /// While ::= "while" Infix Block [ "nobreak" Block ]
    pub(crate) fn parse_while(&mut self) -> NodeId {
        self.spanned(|p| {
            p.cursor.advance();
            let condition = p.parse_infix();
            let block = p.parse_block(BlockKind::Default);
            let nobreak = p
                .cursor
                .consume_if(&[kw(Keyword::Nobreak)])
                .then(|| p.parse_block(BlockKind::Default));
            NodeKind::While {
                condition,
                block,
                nobreak,
            }
        })
    }

    /// ("break" | "continue") [ Identifier ]
    pub(crate) fn parse_loop_jump(&mut self) -> NodeId {
        self.spanned(|p| {
            let keyword = p.cursor.advance();
            let label = p
                .cursor
                .peek_line_is(&[TokenKind::Identifier])
                .then(|| p.parse_simple_name());
            if keyword.is(kw(Keyword::Break)) {
                NodeKind::Break { label }
            } else {
                NodeKind::Continue { label }
            }
        })
    }

    /// Return ::= "return" [ ExpressionList ]
    pub(crate) fn parse_return(&mut self) -> NodeId {
        self.spanned(|p| {
            p.cursor.advance();
            let value = p.parse_optional_value();
            NodeKind::Return { value }
        })
    }

    /// Yield ::= "yield" [ "from" ] [ ExpressionList ]
    pub(crate) fn parse_yield(&mut self) -> NodeId {
        self.spanned(|p| {
            p.cursor.advance();
            let from = p.cursor.peek_line_is(&[kw(Keyword::From)]);
            if from {
                p.cursor.advance();
            }
            let value = p.parse_optional_value();
            NodeKind::Yield { value, from }
        })
    }

    fn parse_optional_value(&mut self) -> Option<NodeId> {
        let next = self.cursor.peek_line().kind;
        let absent = language::never_starts_expression(next)
            || matches!(next, TokenKind::Punctuation(Punctuation::CloseDoubleBrace));
        (!absent).then(|| self.parse_expression_list())
    }

    /// Let ::= "let" Targets [ ":" Type ] [ "=" ExpressionList ]
    pub(crate) fn parse_let(&mut self) -> NodeId {
        self.spanned(|p| {
            let keyword = p.cursor.advance();
            let name = p.parse_targets();
            let value_type = p
                .cursor
                .consume_if(&[punct(Punctuation::Colon)])
                .then(|| p.parse_type());
            let value = p
                .cursor
                .consume_if(&[TokenKind::Operator(Operator::Assign)])
                .then(|| p.parse_expression_list());
            if value_type.is_none() && value.is_none() {
                let span = keyword.span.merge(p.span_of(name));
                p.cursor.blame(BlameKind::ImpossibleToInferType, span);
            }
            p.define_target(name);
            NodeKind::VarDef {
                name,
                value_type,
                value,
                immutable: true,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::NodeKind;
    use crate::error::BlameKind;
    use crate::parser::tests::{blame_kinds, parse_ok};

    #[test]
    fn test_if_elif_else_chain() {
        let ast = parse_ok("if a:\n    x\nelif b:\n    y\nelse:\n    z\n");
        assert_eq!(ast.root_items().len(), 1);
        let NodeKind::If {
            else_block: Some(elif),
            ..
        } = ast.kind(ast.root_items()[0])
        else {
            panic!("expected if with else");
        };
        let NodeKind::If {
            else_block: Some(otherwise),
            ..
        } = ast.kind(*elif)
        else {
            panic!("expected nested if");
        };
        assert!(matches!(ast.kind(*otherwise), NodeKind::Block { .. }));
    }

    #[test]
    fn test_inline_if_and_else_on_next_line() {
        let ast = parse_ok("if a: b\nelse: c\nd\n");
        assert_eq!(ast.root_items().len(), 2);
    }

    #[test]
    fn test_while_with_nobreak() {
        let ast = parse_ok("while i < 3:\n    i += 1\nnobreak:\n    done()\n");
        assert!(matches!(
            ast.kind(ast.root_items()[0]),
            NodeKind::While { nobreak: Some(_), .. }
        ));
    }

    #[test]
    fn test_jumps_and_returns() {
        let ast = parse_ok(concat!(
            "while x:\n    break outer\n    continue\n",
            "fn f():\n    return\n",
            "fn g(): yield from xs\n",
        ));
        let NodeKind::While { block, .. } = ast.kind(ast.root_items()[0]) else {
            panic!("expected while");
        };
        let NodeKind::Block { items, .. } = ast.kind(*block) else {
            panic!("expected block");
        };
        assert!(matches!(ast.kind(items[0]), NodeKind::Break { label: Some(_) }));
        assert!(matches!(ast.kind(items[1]), NodeKind::Continue { label: None }));
        let NodeKind::FuncDef { block, .. } = ast.kind(ast.root_items()[2]) else {
            panic!("expected function");
        };
        let NodeKind::Block { items, .. } = ast.kind(*block) else {
            panic!("expected block");
        };
        assert!(matches!(
            ast.kind(items[0]),
            NodeKind::Yield {
                value: Some(_),
                from: true
            }
        ));
    }

    #[test]
    fn test_let_tuple_defines_all_names() {
        let ast = parse_ok("let a, b = 1, 2\na = 3\n");
        assert!(matches!(ast.kind(ast.root_items()[0]), NodeKind::VarDef { immutable: true, .. }));
        assert!(matches!(ast.kind(ast.root_items()[1]), NodeKind::Binary { .. }));
    }

    #[test]
    fn test_let_with_type_only() {
        assert!(blame_kinds("let a: int\n").is_empty());
        assert_eq!(blame_kinds("let a\n"), vec![BlameKind::ImpossibleToInferType]);
    }
}
