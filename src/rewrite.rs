//! Lowering passes run over a parsed tree.
//!
//! * Chained comparisons: `a < b < c` becomes `a < b and b < c`.
//! * Membership over a connective: `x in (a or b)` becomes `x in a or x in b`.
//!
//! Operands that end up on both sides are deep-copied, so the result stays a tree.
//! Membership is distributed one level only: the tests it produces are never
//! distributed again, though their operands are still visited.

use crate::ast::{Ast, NodeId, NodeKind};
use crate::language;
use crate::location::Span;
use crate::token::{InputSide, Operator, OperatorInfo, Payload, Token, TokenKind};
use log::debug;
use std::collections::HashSet;

/// Applies every rewrite to the tree, parents before children, and answers
/// how many were made.
pub fn reduce(ast: &mut Ast) -> usize {
    let mut count = 0;
    let mut lowered = HashSet::new();
    let mut stack = vec![ast.root()];
    while let Some(id) = stack.pop() {
        let mut current = id;
        while let Some(replacement) = rewrite(ast, current, &mut lowered) {
            count += 1;
            current = replacement;
        }
        let mut children = ast.children(current);
        children.reverse();
        stack.extend(children);
    }
    debug!("Applied {count} rewrites");
    count
}

fn rewrite(ast: &mut Ast, id: NodeId, lowered: &mut HashSet<NodeId>) -> Option<NodeId> {
    let replacement = split_chained_comparison(ast, id)
        .or_else(|| distribute_membership(ast, id, lowered))?;
    if let Some(parent) = ast.parent(id) {
        ast.replace_child(parent, id, replacement);
    }
    Some(replacement)
}

/// Operands of a comparison node.
fn comparison(ast: &Ast, id: NodeId) -> Option<(NodeId, NodeId)> {
    match ast.kind(id) {
        NodeKind::Binary {
            left,
            operator,
            right,
        } if operator.operator().is_some_and(Operator::is_comparison) => Some((*left, *right)),
        _ => None,
    }
}

fn split_chained_comparison(ast: &mut Ast, id: NodeId) -> Option<NodeId> {
    let NodeKind::Binary {
        left,
        operator,
        right,
    } = ast.kind(id).clone()
    else {
        return None;
    };
    if !operator.operator().is_some_and(Operator::is_comparison) {
        return None;
    }
    let span = ast.span(id);

    // (a < b) < c
    if let Some((_, middle)) = comparison(ast, left) {
        ast.detach(left);
        ast.detach(right);
        let middle = ast.deep_copy(middle);
        let second_span = ast.span(middle).merge(ast.span(right));
        let second = ast.alloc(
            NodeKind::Binary {
                left: middle,
                operator,
                right,
            },
            second_span,
        );
        return Some(connect(ast, left, Operator::And, second, span));
    }

    // a == (b < c), as parsed when the second operator binds tighter
    if let Some((middle, _)) = comparison(ast, right) {
        ast.detach(left);
        ast.detach(right);
        let middle = ast.deep_copy(middle);
        let first_span = ast.span(left).merge(ast.span(middle));
        let first = ast.alloc(
            NodeKind::Binary {
                left,
                operator,
                right: middle,
            },
            first_span,
        );
        return Some(connect(ast, first, Operator::And, right, span));
    }
    None
}

/// `lowered` holds the membership tests made by earlier calls.
fn distribute_membership(
    ast: &mut Ast,
    id: NodeId,
    lowered: &mut HashSet<NodeId>,
) -> Option<NodeId> {
    if lowered.contains(&id) {
        return None;
    }
    let NodeKind::Binary {
        left: item,
        operator,
        right,
    } = ast.kind(id).clone()
    else {
        return None;
    };
    if !matches!(operator.operator(), Some(Operator::In | Operator::NotIn)) {
        return None;
    }
    let NodeKind::Paren { value } = *ast.kind(right) else {
        return None;
    };
    let NodeKind::Binary {
        left: first,
        operator: connective,
        right: second,
    } = ast.kind(value).clone()
    else {
        return None;
    };
    let connective = connective.operator()?;
    if !matches!(connective, Operator::Or | Operator::And) {
        return None;
    }

    ast.detach(item);
    ast.detach(first);
    ast.detach(second);
    let item_copy = ast.deep_copy(item);
    let first_span = ast.span(item).merge(ast.span(first));
    let first = ast.alloc(
        NodeKind::Binary {
            left: item,
            operator: operator.clone(),
            right: first,
        },
        first_span,
    );
    let second_span = ast.span(item_copy).merge(ast.span(second));
    let second = ast.alloc(
        NodeKind::Binary {
            left: item_copy,
            operator,
            right: second,
        },
        second_span,
    );
    lowered.insert(first);
    lowered.insert(second);
    let span = ast.span(id);
    Some(connect(ast, first, connective, second, span))
}

fn connect(ast: &mut Ast, left: NodeId, connective: Operator, right: NodeId, span: Span) -> NodeId {
    let at = ast.span(left).end;
    let operator = operator_token(connective, Span::new(at, at));
    ast.alloc(
        NodeKind::Binary {
            left,
            operator,
            right,
        },
        span,
    )
}

/// A token for an operator that does not appear in the source.
fn operator_token(operator: Operator, span: Span) -> Token {
    let kind = TokenKind::Operator(operator);
    match language::operator_spec(operator) {
        Some(spec) => {
            let info = OperatorInfo {
                precedence: spec.precedence,
                side: InputSide::Both,
            };
            Token::new(kind, spec.text, span).with_payload(Payload::Operator(info))
        }
        None => Token::new(kind, "", span),
    }
}
