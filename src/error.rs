use crate::location::Span;
use crate::utils::span_to_source_span;
use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode, SourceSpan};
use serde::Serialize;
use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that stop the processing of a unit altogether.
/// Defects in the processed code itself are never reported this way, see [`Blame`].
#[derive(Error, Debug, Diagnostic)]
pub enum AxionError {
    #[error("Cannot read source file '{}'", path.display())]
    #[diagnostic(
        code(axion::io),
        help("Check that the file exists and is readable.")
    )]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Expected a '.{expected}' extension of '{}'", path.display())]
    #[diagnostic(code(axion::invalid_extension))]
    InvalidExtension { path: PathBuf, expected: &'static str },

    #[error("Failed to serialize the debug output as JSON")]
    #[diagnostic(code(axion::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to serialize the debug output as YAML")]
    #[diagnostic(code(axion::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl From<Severity> for miette::Severity {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Info => miette::Severity::Advice,
            Severity::Warning => miette::Severity::Warning,
            Severity::Error => miette::Severity::Error,
        }
    }
}

/// Every kind of defect the lexer and parser know how to describe.
/// The `Display` text is the default message of the kind.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlameKind {
    // == Lexical ==
    #[error("Unknown character.")]
    InvalidCharacter,
    #[error("Mismatched parenthesis.")]
    MismatchedParenthesis,
    #[error("Mismatched bracket.")]
    MismatchedBracket,
    #[error("Mismatched brace.")]
    MismatchedBrace,
    #[error("Mismatched double brace.")]
    MismatchedDoubleBrace,
    #[error("Multiline comment is not closed.")]
    UnclosedMultilineComment,
    #[error("String literal is not closed.")]
    UnclosedString,
    #[error("String literal contains an unescaped quote.")]
    UnescapedQuoteInStringLiteral,
    #[error("Character literal is not closed.")]
    UnclosedCharacterLiteral,
    #[error("Character literal must contain exactly one character.")]
    CharacterLiteralTooLong,
    #[error("Character literal cannot be empty.")]
    EmptyCharacterLiteral,
    #[error("Invalid escape sequence.")]
    InvalidEscapeSequence,
    #[error("Illegal unicode character.")]
    IllegalUnicodeCharacter,
    #[error("Invalid \\x escape format.")]
    InvalidXEscapeFormat,
    #[error("Truncated escape sequence.")]
    TruncatedEscapeSequence,
    #[error("Number's base must be a number in range from 1 to 36 inclusive.")]
    InvalidNumberRadix,
    #[error("Expected a number value after the number base specifier.")]
    ExpectedNumberValueAfterNumberBase,
    #[error("Digit value is above the number radix.")]
    DigitValueIsAboveNumberRadix,
    #[error("String interpolation is nested too deeply.")]
    InterpolationTooDeep,
    #[error("Mixed indentation (spaces and tabs).")]
    InconsistentIndentation,
    #[error("Radix 10 is redundant, numbers are decimal by default.")]
    Redundant10Radix,
    #[error("String has a format prefix but no interpolations.")]
    RedundantStringFormat,
    #[error("Empty string does not need prefixes.")]
    RedundantPrefixesForEmptyString,

    // == Syntactic ==
    #[error("Invalid syntax.")]
    InvalidSyntax,
    #[error("Unexpected token.")]
    ExpectedToken,
    #[error("Expected a simple name.")]
    ExpectedSimpleName,
    #[error("Expression cannot be assigned to.")]
    NotAssignable,
    #[error("Duplicated parameter in function definition.")]
    DuplicatedParameterInFunction,
    #[error("Unexpected end of code.")]
    UnexpectedEndOfCode,
    #[error("Duplicated named argument.")]
    DuplicatedNamedArgument,
    #[error("Expected a default value for the parameter.")]
    ExpectedDefaultParameterValue,
    #[error("Block expected.")]
    ExpectedBlockDeclaration,
    #[error("Colon is not needed with braces.")]
    RedundantColonWithBraces,
    #[error("Lambda cannot have an indented body.")]
    LambdaCannotHaveIndentedBody,
    #[error("Function cannot have more than one list parameter.")]
    CannotHaveMoreThan1ListParameter,
    #[error("Invalid indexer expression.")]
    InvalidIndexerExpression,
    #[error("Modules are not supported in interpretation mode.")]
    ModuleNotSupportedInInterpretationMode,
    #[error("Impossible to infer the type, specify it explicitly.")]
    ImpossibleToInferType,
    #[error("Invalid macro parameter.")]
    InvalidMacroParameter,
    #[error("Name is already defined.")]
    NameIsAlreadyDefined,
}

impl BlameKind {
    #[must_use]
    pub const fn severity(self) -> Severity {
        use BlameKind::*;
        match self {
            InconsistentIndentation
            | Redundant10Radix
            | RedundantStringFormat
            | RedundantPrefixesForEmptyString
            | RedundantColonWithBraces
            | LambdaCannotHaveIndentedBody
            | CannotHaveMoreThan1ListParameter
            | InvalidIndexerExpression
            | ModuleNotSupportedInInterpretationMode
            | ImpossibleToInferType => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Stable snake_case identifier, used as the diagnostic code.
    #[must_use]
    pub fn code(self) -> String {
        let name = format!("{self:?}");
        let mut code = String::with_capacity(name.len() + 4);
        for (i, c) in name.chars().enumerate() {
            if c.is_ascii_uppercase() {
                if i > 0 {
                    code.push('_');
                }
                code.push(c.to_ascii_lowercase());
            } else if c.is_ascii_digit() && !code.ends_with(|p: char| p.is_ascii_digit()) {
                code.push('_');
                code.push(c);
            } else {
                code.push(c);
            }
        }
        code
    }
}

/// A single finding attached to a region of the processed code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Blame {
    pub kind: BlameKind,
    pub severity: Severity,
    pub message: String,
    pub span: Span,
}

impl Blame {
    #[must_use]
    pub fn new(kind: BlameKind, span: Span) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            message: kind.to_string(),
            span,
        }
    }

    #[must_use]
    pub fn with_message(kind: BlameKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            message: message.into(),
            span,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Binds the blame to the text it was produced from, so it can be rendered.
    #[must_use]
    pub fn to_report(&self, source_name: &str, source: &str) -> BlameReport {
        BlameReport {
            message: self.message.clone(),
            code: self.kind.code(),
            severity: self.severity,
            src: NamedSource::new(source_name, source.to_string()),
            span: span_to_source_span(source, self.span),
        }
    }
}

impl Display for Blame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {} at {}", self.severity, self.message, self.span)
    }
}

/// A [`Blame`] paired with its source text, renderable by `miette` report handlers.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct BlameReport {
    message: String,
    code: String,
    severity: Severity,
    src: NamedSource<String>,
    span: SourceSpan,
}

impl Diagnostic for BlameReport {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        Some(Box::new(format!("axion::{}", self.code)))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(self.severity.into())
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&self.src)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some(self.message.clone()),
            self.span,
        ))))
    }
}
