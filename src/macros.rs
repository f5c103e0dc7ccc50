//! Syntax macros: grammar patterns matched against the token stream with
//! backtracking, so new statement forms can be added without touching the
//! recursive descent grammar.
//!
//! A *prefix* macro starts with a fixed token (`for`, `unless`, `[`). An
//! *infix* macro starts with an expression followed by a fixed token
//! (`value match ...`); the already parsed expression becomes its first part.

use crate::ast::{BlockKind, MacroPart, NodeId, NodeKind};
use crate::cursor::Mark;
use crate::language;
use crate::parser::Parser;
use crate::token::{Token, TokenKind};
use log::trace;
use std::fmt;

/// Parser entry point used by [`Pattern::Expression`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Atom,
    Postfix,
    Infix,
    /// A full statement, assignments included.
    Any,
    Block,
    Type,
    /// Assignment targets, `a` or `a, b`.
    Targets,
}

impl Syntax {
    /// Reads the syntax named in a `macro` description, `Infix` or
    /// `InfixExpr` alike.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.strip_suffix("Expr").unwrap_or(name);
        match name {
            "Atom" => Some(Syntax::Atom),
            "Postfix" => Some(Syntax::Postfix),
            "Infix" => Some(Syntax::Infix),
            "" | "Any" => Some(Syntax::Any),
            "Block" | "Scope" => Some(Syntax::Block),
            "Type" | "TypeName" => Some(Syntax::Type),
            "Target" | "Targets" => Some(Syntax::Targets),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// A token with exactly this text.
    Token(String),
    /// A structural token such as an indent.
    Layout(TokenKind),
    /// A node parsed with the given entry point. Facing a token that never
    /// starts an expression, it matches nothing and succeeds.
    Expression(Syntax),
    /// All of the patterns, in order.
    Cascade(Vec<Pattern>),
    /// The cascade, once or more.
    Multiple(Vec<Pattern>),
    /// The cascade, if it matches.
    Optional(Vec<Pattern>),
    Or(Box<Pattern>, Box<Pattern>),
}

impl Pattern {
    pub fn token(text: impl Into<String>) -> Self {
        Pattern::Token(text.into())
    }

    pub fn or(first: Pattern, second: Pattern) -> Self {
        Pattern::Or(Box::new(first), Box::new(second))
    }
}

fn write_patterns(f: &mut fmt::Formatter<'_>, patterns: &[Pattern]) -> fmt::Result {
    for (i, pattern) in patterns.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{pattern}")?;
    }
    Ok(())
}

/// Renders the pattern the way a `macro` description writes it.
impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Token(text) => write!(f, "'{text}'"),
            Pattern::Layout(kind) => write!(f, "<{kind}>"),
            Pattern::Expression(syntax) => write!(f, "{syntax:?}"),
            Pattern::Cascade(patterns) => {
                write!(f, "(")?;
                write_patterns(f, patterns)?;
                write!(f, ")")
            }
            Pattern::Multiple(patterns) => {
                write!(f, "{{")?;
                write_patterns(f, patterns)?;
                write!(f, "}}")
            }
            Pattern::Optional(patterns) => {
                write!(f, "[")?;
                write_patterns(f, patterns)?;
                write!(f, "]")
            }
            Pattern::Or(first, second) => write!(f, "{first} | {second}"),
        }
    }
}

/// A named macro. Definitions are immutable once registered.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroDef {
    pub name: String,
    pub patterns: Vec<Pattern>,
}

impl MacroDef {
    pub fn new(name: impl Into<String>, patterns: Vec<Pattern>) -> Self {
        Self {
            name: name.into(),
            patterns,
        }
    }

    /// The opening token of a prefix macro.
    #[must_use]
    pub fn leading_token(&self) -> Option<&str> {
        match self.patterns.first() {
            Some(Pattern::Token(text)) => Some(text),
            _ => None,
        }
    }

    /// The token following the left operand of an infix macro.
    #[must_use]
    pub fn infix_token(&self) -> Option<&str> {
        match self.patterns.as_slice() {
            [Pattern::Expression(_), Pattern::Token(text), ..] => Some(text),
            _ => None,
        }
    }
}

/// The macros every unit starts with.
#[must_use]
pub fn builtin_macros() -> Vec<MacroDef> {
    use Pattern::{Cascade, Expression, Layout, Multiple, Optional};
    let token = Pattern::token;
    let infix = || Expression(Syntax::Infix);
    let block = || Expression(Syntax::Block);
    let infix_list = || {
        vec![
            infix(),
            Optional(vec![Multiple(vec![token(","), infix()])]),
            Optional(vec![token(",")]),
        ]
    };
    let arm = || vec![infix(), token("=>"), infix()];

    vec![
        MacroDef::new(
            "do-while",
            vec![
                token("do"),
                block(),
                Pattern::or(token("while"), token("until")),
                infix(),
            ],
        ),
        MacroDef::new("until", vec![token("until"), infix(), block()]),
        MacroDef::new(
            "for-in",
            vec![
                token("for"),
                Expression(Syntax::Targets),
                token("in"),
                infix(),
                block(),
            ],
        ),
        MacroDef::new(
            "unless",
            vec![
                token("unless"),
                infix(),
                block(),
                Optional(vec![Multiple(vec![token("elif"), infix(), block()])]),
                Optional(vec![token("else"), block()]),
            ],
        ),
        MacroDef::new(
            "list",
            [vec![token("[")], infix_list(), vec![token("]")]].concat(),
        ),
        MacroDef::new(
            "map",
            vec![
                token("{"),
                Optional(vec![
                    infix(),
                    token(":"),
                    infix(),
                    Optional(vec![Multiple(vec![token(","), infix(), token(":"), infix()])]),
                ]),
                Optional(vec![token(",")]),
                token("}"),
            ],
        ),
        MacroDef::new(
            "set",
            [vec![token("{")], infix_list(), vec![token("}")]].concat(),
        ),
        MacroDef::new(
            "new",
            vec![
                token("new"),
                Expression(Syntax::Type),
                Optional([vec![token("(")], infix_list(), vec![token(")")]].concat()),
                Optional([vec![token("{")], infix_list(), vec![token("}")]].concat()),
            ],
        ),
        MacroDef::new(
            "match",
            vec![
                infix(),
                token("match"),
                Optional(vec![token(":")]),
                Pattern::or(
                    Cascade(
                        [
                            vec![Layout(TokenKind::Indent), Multiple(arm())],
                            vec![Layout(TokenKind::Outdent)],
                        ]
                        .concat(),
                    ),
                    Multiple(arm()),
                ),
            ],
        ),
    ]
}

/// Position to come back to when a pattern fails.
#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    mark: Mark,
    parts: usize,
    nesting: usize,
}

/// Matches patterns for one macro attempt, collecting the produced parts.
struct Matcher<'p, 't> {
    parser: &'p mut Parser<'t>,
    parts: Vec<MacroPart>,
}

impl<'p, 't> Matcher<'p, 't> {
    fn new(parser: &'p mut Parser<'t>) -> Self {
        Self {
            parser,
            parts: Vec::new(),
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            mark: self.parser.cursor.mark(),
            parts: self.parts.len(),
            nesting: self.parser.nesting,
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.parser.cursor.rewind(checkpoint.mark);
        self.parts.truncate(checkpoint.parts);
        self.parser.nesting = checkpoint.nesting;
    }

    fn match_pattern(&mut self, pattern: &Pattern) -> bool {
        match pattern {
            Pattern::Token(text) => self.match_token(text),
            Pattern::Layout(kind) => {
                if !self.parser.cursor.peek().is(*kind) {
                    return false;
                }
                let token = self.parser.cursor.advance();
                self.parts.push(MacroPart::Token(token));
                true
            }
            Pattern::Expression(syntax) => self.match_expression(*syntax),
            Pattern::Cascade(patterns) => self.match_cascade(patterns),
            Pattern::Multiple(patterns) => {
                let mut matched = false;
                loop {
                    let before = self.parser.cursor.mark();
                    if !self.match_cascade(patterns) {
                        break;
                    }
                    matched = true;
                    if self.parser.cursor.mark() == before {
                        break;
                    }
                }
                matched
            }
            Pattern::Optional(patterns) => {
                self.match_cascade(patterns);
                true
            }
            Pattern::Or(first, second) => self.match_pattern(first) || self.match_pattern(second),
        }
    }

    fn match_cascade(&mut self, patterns: &[Pattern]) -> bool {
        let start = self.checkpoint();
        for pattern in patterns {
            if !self.match_pattern(pattern) {
                self.restore(start);
                return false;
            }
        }
        true
    }

    fn match_token(&mut self, text: &str) -> bool {
        let next = self.parser.cursor.peek();
        if next.is(TokenKind::End) || next.value != text {
            return false;
        }
        let token = self.parser.cursor.advance();
        self.track_group(&token);
        self.parts.push(MacroPart::Token(token));
        true
    }

    /// Brackets opened by a macro let its expressions span several lines
    /// until they are closed.
    fn track_group(&mut self, token: &Token) {
        if let TokenKind::Punctuation(punctuation) = token.kind {
            if punctuation.closing().is_some() {
                self.parser.nesting += 1;
            } else if punctuation.is_closing() {
                self.parser.nesting = self.parser.nesting.saturating_sub(1);
            }
        }
    }

    fn match_expression(&mut self, syntax: Syntax) -> bool {
        let start = self.checkpoint();
        if syntax == Syntax::Block {
            if !language::starts_block(self.parser.cursor.peek_line().kind) {
                return false;
            }
        } else if language::never_starts_expression(self.parser.cursor.peek().kind) {
            return true;
        }

        let parser = &mut *self.parser;
        let node = match syntax {
            Syntax::Atom => parser.parse_atom(),
            Syntax::Postfix => parser.parse_postfix(),
            Syntax::Infix => parser.parse_infix(),
            Syntax::Any => parser.parse_any(),
            Syntax::Block => parser.parse_block(BlockKind::Default),
            Syntax::Type => parser.parse_type(),
            Syntax::Targets => parser.parse_targets(),
        };
        let kind = self.parser.ast.kind(node);
        let accepted = match syntax {
            Syntax::Block => matches!(kind, NodeKind::Block { .. }),
            Syntax::Type => kind.is_type(),
            Syntax::Targets => kind.is_assignable(),
            _ => !matches!(kind, NodeKind::Invalid { .. }),
        };
        if accepted {
            self.parts.push(MacroPart::Node(node));
        } else {
            trace!("{syntax:?} pattern rejected a {} node", kind.name());
            self.restore(start);
        }
        accepted
    }
}

fn candidates(parser: &Parser<'_>, select: impl Fn(&MacroDef) -> bool) -> Vec<MacroDef> {
    parser
        .ast
        .macros()
        .iter()
        .filter(|def| select(def))
        .cloned()
        .collect()
}

/// Tries the prefix macros opening with the next token, in registration
/// order. On failure the cursor is left where it was.
pub(crate) fn try_prefix(parser: &mut Parser<'_>) -> Option<NodeId> {
    let head = parser.cursor.peek().clone();
    if head.is(TokenKind::End) {
        return None;
    }
    let definitions = candidates(parser, |def| def.leading_token() == Some(head.value.as_str()));
    for def in &definitions {
        trace!("Trying macro '{}' at {}", def.name, head.span.start);
        let nesting = parser.nesting;
        let mut matcher = Matcher::new(parser);
        let start = matcher.checkpoint();
        let token = matcher.parser.cursor.advance();
        matcher.track_group(&token);
        if matcher.match_cascade(&def.patterns[1..]) {
            let parts = matcher.parts;
            parser.nesting = nesting;
            let span = parser.span_from(head.span.start);
            return Some(parser.node(
                NodeKind::MacroApplication {
                    name: def.name.clone(),
                    head: Some(token),
                    parts,
                },
                span,
            ));
        }
        matcher.restore(start);
        trace!("Macro '{}' did not match", def.name);
    }
    None
}

/// Tries the infix macros whose keyword follows `left`.
pub(crate) fn try_infix(parser: &mut Parser<'_>, left: NodeId) -> Option<NodeId> {
    let keyword = parser.cursor.peek_line().value.clone();
    let definitions = candidates(parser, |def| def.infix_token() == Some(keyword.as_str()));
    let start_location = parser.span_of(left).start;
    for def in &definitions {
        trace!("Trying infix macro '{}' at {start_location}", def.name);
        let nesting = parser.nesting;
        let mut matcher = Matcher::new(parser);
        let start = matcher.checkpoint();
        matcher.parts.push(MacroPart::Node(left));
        let token = matcher.parser.cursor.advance();
        matcher.track_group(&token);
        matcher.parts.push(MacroPart::Token(token));
        if matcher.match_cascade(&def.patterns[2..]) {
            let parts = matcher.parts;
            parser.nesting = nesting;
            let span = parser.span_from(start_location);
            return Some(parser.node(
                NodeKind::MacroApplication {
                    name: def.name.clone(),
                    head: None,
                    parts,
                },
                span,
            ));
        }
        matcher.restore(start);
        trace!("Infix macro '{}' did not match", def.name);
    }
    None
}
