use crate::error::{Blame, BlameKind};
use crate::location::{Location, Span};
use crate::token::{Token, TokenKind};
use log::trace;

/// Snapshot of a cursor position, see [`TokenCursor::mark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(usize);

/// Read cursor over a lexed token list.
///
/// Comments are always skipped by lookahead. Newlines are skipped too unless
/// a `*_line` method is used. The cursor also collects the blames of the
/// parsing layers built on top of it.
#[derive(Debug)]
pub struct TokenCursor<'t> {
    tokens: &'t [Token],
    /// Index of the next unread token.
    position: usize,
    end: Token,
    blames: Vec<Blame>,
}

impl<'t> TokenCursor<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        let end_at = tokens.last().map_or(Location::new(1, 1), |t| t.span.end);
        Self {
            tokens,
            position: 0,
            end: Token::new(TokenKind::End, "", Span::new(end_at, end_at)),
            blames: Vec::new(),
        }
    }

    fn token_at(&self, index: usize) -> &Token {
        self.tokens.get(index).unwrap_or(&self.end)
    }

    fn skip_trivia(&self, mut index: usize, newlines: bool) -> usize {
        while let Some(token) = self.tokens.get(index) {
            let trivia = matches!(token.kind, TokenKind::Comment | TokenKind::Whitespace)
                || (newlines && token.is(TokenKind::Newline));
            if !trivia {
                break;
            }
            index += 1;
        }
        index
    }

    /// The most recently consumed token.
    #[must_use]
    pub fn current(&self) -> &Token {
        self.token_at(self.position.saturating_sub(1))
    }

    /// The next significant token.
    #[must_use]
    pub fn peek(&self) -> &Token {
        self.token_at(self.skip_trivia(self.position, true))
    }

    /// The next token, newlines included.
    #[must_use]
    pub fn peek_line(&self) -> &Token {
        self.token_at(self.skip_trivia(self.position, false))
    }

    /// The significant token `n` places after [`peek`](Self::peek).
    #[must_use]
    pub fn peek_at(&self, n: usize) -> &Token {
        let mut index = self.skip_trivia(self.position, true);
        for _ in 0..n {
            index = self.skip_trivia(index + 1, true);
        }
        self.token_at(index)
    }

    #[must_use]
    pub fn peek_is(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.peek().kind)
    }

    #[must_use]
    pub fn peek_line_is(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.peek_line().kind)
    }

    /// Consumes the next significant token. The end token is never passed.
    pub fn advance(&mut self) -> Token {
        let index = self.skip_trivia(self.position, true);
        if index < self.tokens.len() && !self.tokens[index].is(TokenKind::End) {
            self.position = index + 1;
        } else {
            self.position = index.min(self.tokens.len());
        }
        self.token_at(index).clone()
    }

    /// Consumes the next significant token if it is one of `kinds`.
    pub fn consume_if(&mut self, kinds: &[TokenKind]) -> bool {
        self.consume(kinds).is_some()
    }

    pub fn consume(&mut self, kinds: &[TokenKind]) -> Option<Token> {
        if self.peek_is(kinds) {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Consumes a newline right ahead, if there is one.
    pub fn consume_newline(&mut self) -> bool {
        let index = self.skip_trivia(self.position, false);
        if self.token_at(index).is(TokenKind::Newline) {
            self.position = index + 1;
            true
        } else {
            false
        }
    }

    /// Consumes the next token whatever it is, then checks it against `kinds`.
    /// On mismatch an "expected X, got Y" blame is recorded and a placeholder
    /// token is answered.
    pub fn expect(&mut self, kinds: &[TokenKind]) -> Token {
        let token = self.advance();
        if kinds.contains(&token.kind) {
            return token;
        }
        let expected = kinds
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" or ");
        let message = format!("Expected {expected}, got {token}.");
        self.blames
            .push(Blame::with_message(BlameKind::ExpectedToken, message, token.span));
        Token::placeholder(token.span)
    }

    /// Like [`expect`](Self::expect), reporting `fallback` on mismatch.
    pub fn expect_or(&mut self, kinds: &[TokenKind], fallback: BlameKind) -> Token {
        let token = self.advance();
        if kinds.contains(&token.kind) {
            return token;
        }
        self.blames.push(Blame::new(fallback, token.span));
        Token::placeholder(token.span)
    }

    #[must_use]
    pub fn mark(&self) -> Mark {
        Mark(self.position)
    }

    pub fn rewind(&mut self, mark: Mark) {
        assert!(
            mark.0 <= self.tokens.len(),
            "cursor rewound out of bounds: {} > {}",
            mark.0,
            self.tokens.len()
        );
        if mark.0 != self.position {
            trace!("Rewinding from {} to {}", self.position, mark.0);
        }
        self.position = mark.0;
    }

    /// Where the next significant token starts.
    #[must_use]
    pub fn start_location(&self) -> Location {
        self.peek().span.start
    }

    /// Where the last consumed code token ends. Layout and trivia are passed over.
    #[must_use]
    pub fn end_location(&self) -> Location {
        self.tokens[..self.position.min(self.tokens.len())]
            .iter()
            .rev()
            .find(|t| {
                !t.is_any(&[
                    TokenKind::Comment,
                    TokenKind::Whitespace,
                    TokenKind::Newline,
                    TokenKind::Indent,
                    TokenKind::Outdent,
                ])
            })
            .map_or_else(|| self.start_location(), |t| t.span.end)
    }

    /// Records a blame. A zero span is replaced by the span of the next token.
    pub fn blame(&mut self, kind: BlameKind, span: Span) {
        let span = self.resolve(span);
        self.blames.push(Blame::new(kind, span));
    }

    pub fn blame_message(&mut self, kind: BlameKind, message: impl Into<String>, span: Span) {
        let span = self.resolve(span);
        self.blames.push(Blame::with_message(kind, message, span));
    }

    fn resolve(&self, span: Span) -> Span {
        if span.is_zero() {
            self.peek().span
        } else {
            span
        }
    }

    #[must_use]
    pub fn blames(&self) -> &[Blame] {
        &self.blames
    }

    pub fn into_blames(self) -> Vec<Blame> {
        self.blames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::source::ProcessingOptions;
    use crate::token::Punctuation;

    fn tokens(input: &str) -> Vec<Token> {
        tokenize(input, &ProcessingOptions::default()).tokens
    }

    #[test]
    fn test_peek_skips_comments_and_newlines() {
        let tokens = tokens("a # note\n\nb");
        let mut cursor = TokenCursor::new(&tokens);
        assert_eq!(cursor.advance().value, "a");
        assert!(cursor.peek_line().is(TokenKind::Newline));
        assert_eq!(cursor.peek().value, "b");
        assert!(cursor.consume_newline());
        assert_eq!(cursor.peek_at(1).kind, TokenKind::End);
    }

    #[test]
    fn test_consume_if_commits_only_on_match() {
        let tokens = tokens("( a");
        let mut cursor = TokenCursor::new(&tokens);
        assert!(!cursor.consume_if(&[TokenKind::Identifier]));
        assert!(cursor.consume_if(&[TokenKind::Punctuation(Punctuation::OpenParenthesis)]));
        assert_eq!(cursor.peek().value, "a");
    }

    #[test]
    fn test_expect_commits_and_reports() {
        let tokens = tokens("a b");
        let mut cursor = TokenCursor::new(&tokens);
        let token = cursor.expect(&[TokenKind::Punctuation(Punctuation::Colon)]);
        assert_eq!(token.kind, TokenKind::Invalid);
        assert_eq!(cursor.peek().value, "b");
        assert_eq!(cursor.blames().len(), 1);
        assert_eq!(cursor.blames()[0].message, "Expected ':', got identifier 'a'.");
    }

    #[test]
    fn test_mark_and_rewind() {
        let tokens = tokens("a b c");
        let mut cursor = TokenCursor::new(&tokens);
        cursor.advance();
        let mark = cursor.mark();
        let before = cursor.peek().clone();
        cursor.advance();
        cursor.advance();
        assert!(cursor.peek().is(TokenKind::End));
        cursor.rewind(mark);
        assert_eq!(cursor.peek(), &before);
    }

    #[test]
    fn test_never_moves_past_end() {
        let tokens = tokens("a");
        let mut cursor = TokenCursor::new(&tokens);
        for _ in 0..5 {
            cursor.advance();
        }
        assert!(cursor.peek().is(TokenKind::End));
        assert!(cursor.advance().is(TokenKind::End));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_rewind_out_of_bounds_panics() {
        let tokens = tokens("a");
        let mut cursor = TokenCursor::new(&tokens);
        cursor.rewind(Mark(10));
    }

    #[test]
    fn test_zero_span_blame_uses_next_token() {
        let tokens = tokens("a b");
        let mut cursor = TokenCursor::new(&tokens);
        cursor.advance();
        cursor.blame(BlameKind::InvalidSyntax, Span::zero());
        assert_eq!(cursor.blames()[0].span, tokens[1].span);
    }
}
