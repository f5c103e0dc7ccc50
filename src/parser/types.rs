use super::{is_closing, punct, Parser};
use crate::ast::{NodeId, NodeKind};
use crate::error::BlameKind;
use crate::language;
use crate::token::{Operator, Punctuation, TokenKind};

impl Parser<'_> {
    /// Type ::= Union [ "->" Type ]
    pub(crate) fn parse_type(&mut self) -> NodeId {
        let args = self.parse_union_type();
        if !self.cursor.peek_line_is(&[punct(Punctuation::RightArrow)]) {
            return args;
        }
        self.cursor.advance();
        let result = self.parse_type();
        let span = self.span_of(args).merge(self.span_of(result));
        self.node(NodeKind::FuncType { args, result }, span)
    }

    /// Union ::= TypePostfix { "|" TypePostfix }
    fn parse_union_type(&mut self) -> NodeId {
        let mut left = self.parse_type_postfix();
        while self
            .cursor
            .peek_line_is(&[TokenKind::Operator(Operator::BitOr)])
        {
            self.cursor.advance();
            let right = self.parse_type_postfix();
            let span = self.span_of(left).merge(self.span_of(right));
            left = self.node(NodeKind::UnionType { left, right }, span);
        }
        left
    }

    /// TypePostfix ::= TypePrimary { "[" "]" | "[" Type { "," Type } "]" }
    fn parse_type_postfix(&mut self) -> NodeId {
        let mut target = self.parse_type_primary();
        while self.cursor.peek_line_is(&[punct(Punctuation::OpenBracket)]) {
            let start = self.span_of(target).start;
            self.cursor.advance();
            let args = self.grouped(|p| {
                let mut args = Vec::new();
                while !p.cursor.peek_is(&[punct(Punctuation::CloseBracket), TokenKind::End]) {
                    args.push(p.parse_type());
                    if !p.cursor.consume_if(&[punct(Punctuation::Comma)]) {
                        break;
                    }
                }
                p.cursor.expect(&[punct(Punctuation::CloseBracket)]);
                args
            });
            let span = self.span_from(start);
            let kind = if args.is_empty() {
                NodeKind::ArrayType { target }
            } else {
                NodeKind::GenericType { target, args }
            };
            target = self.node(kind, span);
        }
        target
    }

    /// TypePrimary ::= Name | "(" [ Type { "," Type } [","] ] ")"
    fn parse_type_primary(&mut self) -> NodeId {
        let next = self.cursor.peek().clone();
        match next.kind {
            TokenKind::Identifier => {
                let name = self.parse_name();
                let span = self.span_of(name);
                self.node(NodeKind::SimpleType { name }, span)
            }
            TokenKind::Punctuation(Punctuation::OpenParenthesis) => {
                let start = next.span.start;
                self.cursor.advance();
                let (mut types, trailing_comma) = self.grouped(|p| {
                    let mut types = Vec::new();
                    let mut trailing_comma = false;
                    while !p
                        .cursor
                        .peek_is(&[punct(Punctuation::CloseParenthesis), TokenKind::End])
                    {
                        types.push(p.parse_type());
                        trailing_comma = p.cursor.consume_if(&[punct(Punctuation::Comma)]);
                        if !trailing_comma {
                            break;
                        }
                    }
                    p.cursor.expect(&[punct(Punctuation::CloseParenthesis)]);
                    (types, trailing_comma)
                });
                if types.len() == 1 && !trailing_comma {
                    // a parenthesized type is the type itself
                    return types.remove(0);
                }
                let span = self.span_from(start);
                self.node(NodeKind::TupleType { types }, span)
            }
            _ => {
                let mut tokens = Vec::new();
                let consumable = !language::never_starts_expression(next.kind)
                    && !is_closing(next.kind)
                    && !next.is_any(&[punct(Punctuation::Colon), TokenKind::Indent]);
                if consumable {
                    tokens.push(self.cursor.advance());
                }
                self.cursor.blame_message(
                    BlameKind::InvalidSyntax,
                    format!("Expected a type, got {next}."),
                    next.span,
                );
                self.node(NodeKind::Invalid { tokens }, next.span)
            }
        }
    }
}
