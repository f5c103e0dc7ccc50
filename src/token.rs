use crate::language;
use crate::location::Span;
use serde::Serialize;
use std::fmt::Display;

/// Represents the different kinds of tokens that the lexer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum TokenKind {
    // == Special Tokens ==
    /// Represents the end of the input.
    End,
    /// A run of spaces and tabs that did not change the indentation.
    Whitespace,
    /// One or more end-of-line characters.
    Newline,
    /// Entering one more indentation level.
    Indent,
    /// Leaving one indentation level. Several levels give several tokens.
    Outdent,
    /// A single-line (`#`) or multiline (`###`) comment.
    Comment,
    /// A character that could not be recognized.
    Invalid,

    // == Literals ==
    Identifier,
    String,
    Character,
    Number,

    // == Fixed words and signs ==
    Keyword(Keyword),
    Operator(Operator),
    Punctuation(Punctuation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Keyword {
    Await,
    Break,
    Class,
    Continue,
    Elif,
    Else,
    Enum,
    False,
    Fn,
    For,
    From,
    If,
    Let,
    Macro,
    Module,
    Nil,
    Nobreak,
    Object,
    Pass,
    Return,
    True,
    Unless,
    While,
    Yield,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Of,
    Dot,
    Increment,
    Decrement,
    Power,
    Not,
    BitNot,
    Multiply,
    TrueDivide,
    FloorDivide,
    Remainder,
    Plus,
    Minus,
    LeftShift,
    RightShift,
    ThreeWayCompare,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
    BitAnd,
    BitXor,
    BitOr,
    Is,
    IsNot,
    In,
    NotIn,
    And,
    Or,
    Coalesce,
    Assign,
    PlusAssign,
    MinusAssign,
    PowerAssign,
    MultiplyAssign,
    TrueDivideAssign,
    FloorDivideAssign,
    RemainderAssign,
    CoalesceAssign,
    LeftShiftAssign,
    RightShiftAssign,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
}

impl Operator {
    #[must_use]
    pub fn is_assignment(self) -> bool {
        language::operator_spec(self).is_some_and(|spec| spec.precedence == 0)
    }

    /// Relational operators that may be chained (`a < b <= c`).
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Operator::Less
                | Operator::LessOrEqual
                | Operator::Greater
                | Operator::GreaterOrEqual
                | Operator::Equal
                | Operator::NotEqual
        )
    }

    #[must_use]
    pub fn text(self) -> &'static str {
        language::operator_spec(self).map_or("?", |spec| spec.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Punctuation {
    RightArrow,
    LeftArrow,
    RightPipeline,
    LeftPipeline,
    RightFatArrow,
    At,
    Question,
    DoubleColon,
    OpenParenthesis,
    CloseParenthesis,
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    OpenDoubleBrace,
    CloseDoubleBrace,
    Comma,
    Colon,
    Semicolon,
}

impl Punctuation {
    /// The closing counterpart of an opening bracket.
    #[must_use]
    pub const fn closing(self) -> Option<Punctuation> {
        match self {
            Punctuation::OpenParenthesis => Some(Punctuation::CloseParenthesis),
            Punctuation::OpenBracket => Some(Punctuation::CloseBracket),
            Punctuation::OpenBrace => Some(Punctuation::CloseBrace),
            Punctuation::OpenDoubleBrace => Some(Punctuation::CloseDoubleBrace),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_closing(self) -> bool {
        matches!(
            self,
            Punctuation::CloseParenthesis
                | Punctuation::CloseBracket
                | Punctuation::CloseBrace
                | Punctuation::CloseDoubleBrace
        )
    }
}

/// Which side(s) of an operator take an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSide {
    /// Not known until the parser sees the context (`+`, `-`, `++`, `--`).
    Unknown,
    Prefix,
    Postfix,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OperatorInfo {
    pub precedence: u8,
    pub side: InputSide,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NumberValue {
    Integer(u128),
    Float(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumberInfo {
    pub radix: u32,
    /// `None` when the literal is malformed or does not fit.
    pub value: Option<NumberValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStyle {
    Single,
    Double,
    TripleSingle,
    TripleDouble,
}

impl QuoteStyle {
    #[must_use]
    pub const fn is_triple(self) -> bool {
        matches!(self, QuoteStyle::TripleSingle | QuoteStyle::TripleDouble)
    }
}

/// One `{...}` fragment of a format string, re-lexed as its own unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interpolation {
    pub span: Span,
    pub tokens: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StringInfo {
    pub prefixes: String,
    pub quote: QuoteStyle,
    pub unclosed: bool,
    /// Quotes found right before the closing quote run of a triple-quoted string.
    pub ending_quotes: String,
    pub interpolations: Vec<Interpolation>,
}

impl StringInfo {
    #[must_use]
    pub fn is_raw(&self) -> bool {
        self.prefixes.contains(['r', 'R'])
    }

    #[must_use]
    pub fn is_format(&self) -> bool {
        self.prefixes.contains(['f', 'F'])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    None,
    Operator(OperatorInfo),
    Number(NumberInfo),
    String(StringInfo),
}

impl Payload {
    fn is_none(&self) -> bool {
        matches!(self, Payload::None)
    }
}

/// A token with its kind, text and position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Raw text as written in the source.
    pub value: String,
    /// Decoded payload, e.g. the unescaped body of a string.
    pub content: String,
    /// Whitespace that followed the token on the same line.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ending_white: String,
    pub span: Span,
    #[serde(skip_serializing_if = "Payload::is_none")]
    pub payload: Payload,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, span: Span) -> Token {
        let value = value.into();
        Token {
            kind,
            content: value.clone(),
            value,
            ending_white: String::new(),
            span,
            payload: Payload::None,
        }
    }

    /// Stand-in returned where a required token was missing.
    #[must_use]
    pub fn placeholder(span: Span) -> Token {
        Token::new(TokenKind::Invalid, "", span)
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Token {
        self.content = content.into();
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Token {
        self.payload = payload;
        self
    }

    #[must_use]
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    #[must_use]
    pub fn is_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.kind)
    }

    #[must_use]
    pub fn operator(&self) -> Option<Operator> {
        match self.kind {
            TokenKind::Operator(op) => Some(op),
            _ => None,
        }
    }

    #[must_use]
    pub fn operator_info(&self) -> Option<OperatorInfo> {
        match self.payload {
            Payload::Operator(info) => Some(info),
            _ => None,
        }
    }

    #[must_use]
    pub fn number(&self) -> Option<&NumberInfo> {
        match &self.payload {
            Payload::Number(info) => Some(info),
            _ => None,
        }
    }

    #[must_use]
    pub fn string(&self) -> Option<&StringInfo> {
        match &self.payload {
            Payload::String(info) => Some(info),
            _ => None,
        }
    }

    /// Refines the operand side of an operator whose side depends on context.
    pub fn set_input_side(&mut self, side: InputSide) {
        if let Payload::Operator(info) = &mut self.payload {
            info.side = side;
        }
    }

    /// Source text of the token including its trailing whitespace.
    #[must_use]
    pub fn to_source(&self) -> String {
        format!("{}{}", self.value, self.ending_white)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::End => write!(f, "end of code"),
            TokenKind::Whitespace => write!(f, "whitespace"),
            TokenKind::Newline => write!(f, "newline"),
            TokenKind::Indent => write!(f, "indentation"),
            TokenKind::Outdent => write!(f, "end of indented block"),
            TokenKind::Comment => write!(f, "comment"),
            TokenKind::Invalid => write!(f, "invalid token"),
            TokenKind::Identifier => write!(f, "identifier"),
            TokenKind::String => write!(f, "string"),
            TokenKind::Character => write!(f, "character"),
            TokenKind::Number => write!(f, "number"),
            TokenKind::Keyword(k) => write!(f, "'{}'", language::keyword_text(*k)),
            TokenKind::Operator(op) => write!(f, "'{}'", op.text()),
            TokenKind::Punctuation(p) => write!(f, "'{}'", language::punctuation_text(*p)),
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::Identifier
            | TokenKind::Number
            | TokenKind::String
            | TokenKind::Character => {
                write!(f, "{} '{}'", self.kind, self.value)
            }
            kind => write!(f, "{kind}"),
        }
    }
}
