//! Fixed tables of the Axion language: characters, keywords, operators and punctuation.

use crate::token::{InputSide, Keyword, Operator, Punctuation, TokenKind};

pub const EOC: char = '\0';
pub const EOLS: [char; 2] = ['\r', '\n'];
pub const WHITE: [char; 2] = [' ', '\t'];

pub const COMMENT_START: &str = "#";
pub const MULTILINE_COMMENT: &str = "###";
pub const CHARACTER_QUOTE: char = '`';
pub const STRING_QUOTES: [char; 2] = ['"', '\''];
pub const STRING_PREFIXES: [char; 4] = ['f', 'F', 'r', 'R'];
pub const RADIX_DELIMITER: &str = "::";
pub const DEFAULT_TAB_WIDTH: usize = 8;

#[must_use]
pub fn is_id_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

#[must_use]
pub fn is_id_part(c: char) -> bool {
    is_id_start(c) || c.is_ascii_digit()
}

/// May appear inside an identifier, never at its end.
pub const ID_NOT_END: char = '-';
/// May only appear at the end of an identifier.
pub const ID_END: [char; 2] = ['?', '!'];

/// Characters that may continue a number literal once it started.
#[must_use]
pub fn is_number_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Decodes the character after a backslash for the single-character escapes.
#[must_use]
pub fn escape(c: char) -> Option<char> {
    Some(match c {
        '0' => '\0',
        'a' => '\u{07}',
        'b' => '\u{08}',
        'f' => '\u{0C}',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\u{0B}',
        '\\' => '\\',
        '"' => '"',
        '\'' => '\'',
        '`' => '`',
        _ => return None,
    })
}

pub const KEYWORDS: &[(&str, Keyword)] = &[
    ("await", Keyword::Await),
    ("break", Keyword::Break),
    ("class", Keyword::Class),
    ("continue", Keyword::Continue),
    ("elif", Keyword::Elif),
    ("else", Keyword::Else),
    ("enum", Keyword::Enum),
    ("false", Keyword::False),
    ("fn", Keyword::Fn),
    ("for", Keyword::For),
    ("from", Keyword::From),
    ("if", Keyword::If),
    ("let", Keyword::Let),
    ("macro", Keyword::Macro),
    ("module", Keyword::Module),
    ("nil", Keyword::Nil),
    ("nobreak", Keyword::Nobreak),
    ("object", Keyword::Object),
    ("pass", Keyword::Pass),
    ("return", Keyword::Return),
    ("true", Keyword::True),
    ("unless", Keyword::Unless),
    ("while", Keyword::While),
    ("yield", Keyword::Yield),
];

#[must_use]
pub fn keyword(text: &str) -> Option<Keyword> {
    KEYWORDS.iter().find(|(t, _)| *t == text).map(|(_, k)| *k)
}

#[must_use]
pub fn keyword_text(keyword: Keyword) -> &'static str {
    KEYWORDS
        .iter()
        .find(|(_, k)| *k == keyword)
        .map_or("?", |(t, _)| t)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorSpec {
    pub text: &'static str,
    pub operator: Operator,
    pub precedence: u8,
    pub side: InputSide,
}

const fn op(
    text: &'static str,
    operator: Operator,
    precedence: u8,
    side: InputSide,
) -> OperatorSpec {
    OperatorSpec {
        text,
        operator,
        precedence,
        side,
    }
}

/// Operators, longest text first so that a prefix scan finds the longest match.
pub const OPERATORS: &[OperatorSpec] = &[
    op("is-not", Operator::IsNot, 4, InputSide::Both),
    op("not-in", Operator::NotIn, 4, InputSide::Both),
    op("and", Operator::And, 3, InputSide::Both),
    op("not", Operator::Not, 14, InputSide::Prefix),
    op("<=>", Operator::ThreeWayCompare, 10, InputSide::Both),
    op("**=", Operator::PowerAssign, 0, InputSide::Both),
    op("//=", Operator::FloorDivideAssign, 0, InputSide::Both),
    op("<<=", Operator::LeftShiftAssign, 0, InputSide::Both),
    op(">>=", Operator::RightShiftAssign, 0, InputSide::Both),
    op("of", Operator::Of, 17, InputSide::Both),
    op("++", Operator::Increment, 16, InputSide::Unknown),
    op("--", Operator::Decrement, 16, InputSide::Unknown),
    op("**", Operator::Power, 15, InputSide::Both),
    op("//", Operator::FloorDivide, 13, InputSide::Both),
    op("<<", Operator::LeftShift, 11, InputSide::Both),
    op(">>", Operator::RightShift, 11, InputSide::Both),
    op("<=", Operator::LessOrEqual, 9, InputSide::Both),
    op(">=", Operator::GreaterOrEqual, 9, InputSide::Both),
    op("==", Operator::Equal, 8, InputSide::Both),
    op("!=", Operator::NotEqual, 8, InputSide::Both),
    op("is", Operator::Is, 4, InputSide::Both),
    op("in", Operator::In, 4, InputSide::Both),
    op("&&", Operator::And, 3, InputSide::Both),
    op("or", Operator::Or, 2, InputSide::Both),
    op("||", Operator::Or, 2, InputSide::Both),
    op("??", Operator::Coalesce, 1, InputSide::Both),
    op("+=", Operator::PlusAssign, 0, InputSide::Both),
    op("-=", Operator::MinusAssign, 0, InputSide::Both),
    op("*=", Operator::MultiplyAssign, 0, InputSide::Both),
    op("/=", Operator::TrueDivideAssign, 0, InputSide::Both),
    op("%=", Operator::RemainderAssign, 0, InputSide::Both),
    op("?=", Operator::CoalesceAssign, 0, InputSide::Both),
    op("&=", Operator::BitAndAssign, 0, InputSide::Both),
    op("|=", Operator::BitOrAssign, 0, InputSide::Both),
    op("^=", Operator::BitXorAssign, 0, InputSide::Both),
    op(".", Operator::Dot, 17, InputSide::Both),
    op("~", Operator::BitNot, 14, InputSide::Prefix),
    op("*", Operator::Multiply, 13, InputSide::Both),
    op("/", Operator::TrueDivide, 13, InputSide::Both),
    op("%", Operator::Remainder, 13, InputSide::Both),
    op("+", Operator::Plus, 12, InputSide::Unknown),
    op("-", Operator::Minus, 12, InputSide::Unknown),
    op("<", Operator::Less, 9, InputSide::Both),
    op(">", Operator::Greater, 9, InputSide::Both),
    op("&", Operator::BitAnd, 7, InputSide::Both),
    op("^", Operator::BitXor, 6, InputSide::Both),
    op("|", Operator::BitOr, 5, InputSide::Both),
    op("=", Operator::Assign, 0, InputSide::Both),
];

/// Operators written with signs rather than letters.
pub fn operator_signs() -> impl Iterator<Item = &'static OperatorSpec> {
    OPERATORS
        .iter()
        .filter(|spec| !spec.text.starts_with(is_id_start))
}

/// Word operators (`and`, `is-not`, ...) as read by the identifier reader.
#[must_use]
pub fn word_operator(text: &str) -> Option<&'static OperatorSpec> {
    OPERATORS
        .iter()
        .find(|spec| spec.text == text && spec.text.starts_with(is_id_start))
}

/// The canonical spelling of an operator (the first listed one for aliases).
#[must_use]
pub fn operator_spec(operator: Operator) -> Option<&'static OperatorSpec> {
    OPERATORS.iter().find(|spec| spec.operator == operator)
}

/// Punctuation, longest text first.
pub const PUNCTUATION: &[(&str, Punctuation)] = &[
    ("{{", Punctuation::OpenDoubleBrace),
    ("}}", Punctuation::CloseDoubleBrace),
    ("->", Punctuation::RightArrow),
    ("<-", Punctuation::LeftArrow),
    ("|>", Punctuation::RightPipeline),
    ("<|", Punctuation::LeftPipeline),
    ("=>", Punctuation::RightFatArrow),
    ("::", Punctuation::DoubleColon),
    ("@", Punctuation::At),
    ("?", Punctuation::Question),
    ("(", Punctuation::OpenParenthesis),
    (")", Punctuation::CloseParenthesis),
    ("[", Punctuation::OpenBracket),
    ("]", Punctuation::CloseBracket),
    ("{", Punctuation::OpenBrace),
    ("}", Punctuation::CloseBrace),
    (",", Punctuation::Comma),
    (":", Punctuation::Colon),
    (";", Punctuation::Semicolon),
];

#[must_use]
pub fn punctuation_text(punctuation: Punctuation) -> &'static str {
    PUNCTUATION
        .iter()
        .find(|(_, p)| *p == punctuation)
        .map_or("?", |(t, _)| t)
}

/// Operators accepted in prefix position.
pub const PREFIX_OPERATORS: [Operator; 6] = [
    Operator::Increment,
    Operator::Decrement,
    Operator::Plus,
    Operator::Minus,
    Operator::Not,
    Operator::BitNot,
];

#[must_use]
pub fn is_constant(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::String
            | TokenKind::Character
            | TokenKind::Number
            | TokenKind::Keyword(Keyword::True | Keyword::False | Keyword::Nil)
    )
}

/// Tokens that can never begin an expression. An optional expression slot
/// facing one of these is simply left empty.
#[must_use]
pub fn never_starts_expression(kind: TokenKind) -> bool {
    match kind {
        TokenKind::Operator(op) => op.is_assignment() || op == Operator::In,
        TokenKind::Punctuation(p) => {
            p.is_closing() || matches!(p, Punctuation::Comma | Punctuation::Semicolon)
        }
        TokenKind::Keyword(k) => matches!(k, Keyword::For | Keyword::If),
        TokenKind::Outdent | TokenKind::Newline | TokenKind::End => true,
        _ => false,
    }
}

/// Tokens that may open a block.
#[must_use]
pub fn starts_block(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Indent
            | TokenKind::Newline
            | TokenKind::Punctuation(Punctuation::Colon | Punctuation::OpenBrace)
    )
}
