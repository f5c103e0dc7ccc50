use serde::Serialize;
use std::fmt::Display;

/// A 1-based line and column pair. `(0, 0)` is reserved for "not positioned yet".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub const ZERO: Location = Location { line: 0, column: 0 };

    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.line == 0 && self.column == 0
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A region of the source text. The end location is exclusive.
///
/// Every token and every AST node carries one. A span whose both ends are
/// [`Location::ZERO`] has not been positioned yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: Location,
    pub end: Location,
}

impl Span {
    #[must_use]
    pub const fn new(start: Location, end: Location) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self {
            start: Location::ZERO,
            end: Location::ZERO,
        }
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.start.is_zero() && self.end.is_zero()
    }

    /// Smallest span covering both. Zero spans are ignored.
    #[must_use]
    pub fn merge(self, other: Span) -> Span {
        if self.is_zero() {
            return other;
        }
        if other.is_zero() {
            return self;
        }
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    #[must_use]
    pub fn contains(self, location: Location) -> bool {
        self.start <= location && location < self.end
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
