use crate::error::{Blame, BlameKind};
use crate::language::{self, EOC, EOLS, WHITE};
use crate::location::{Location, Span};
use crate::source::ProcessingOptions;
use crate::text_stream::TextStream;
use crate::token::{InputSide, OperatorInfo, Payload, Punctuation, Token, TokenKind};
use log::{debug, trace};

mod literals;

/// Tokens and findings produced by lexing one unit.
#[derive(Debug, Clone, Default)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub blames: Vec<Blame>,
}

#[derive(Debug, Default)]
struct Indentation {
    /// Width of one level, decided by the first consistent indented line.
    size: usize,
    /// First indentation character seen in the unit.
    character: Option<char>,
    /// Width of the current line's indentation.
    last_width: usize,
    /// Widths of the enclosing levels, innermost last.
    enclosing: Vec<usize>,
}

/// Turns the text of one unit into tokens.
///
/// Lexing never fails: every malformed construct produces a best-effort
/// token and a [`Blame`].
pub struct Lexer<'s> {
    stream: &'s mut TextStream,
    options: &'s ProcessingOptions,
    tokens: Vec<Token>,
    blames: Vec<Blame>,
    indentation: Indentation,
    open_brackets: Vec<Token>,
    stray_brackets: Vec<Token>,
    terminators: Vec<TokenKind>,
    depth: usize,
    /// Set for fragments of a single-line string, which end with their line.
    single_line: bool,
}

impl<'s> Lexer<'s> {
    pub fn new(stream: &'s mut TextStream, options: &'s ProcessingOptions) -> Self {
        Self {
            stream,
            options,
            tokens: Vec::new(),
            blames: Vec::new(),
            indentation: Indentation::default(),
            open_brackets: Vec::new(),
            stray_brackets: Vec::new(),
            terminators: vec![TokenKind::End],
            depth: 0,
            single_line: false,
        }
    }

    /// A lexer for a `{...}` fragment of a format string, stopping at the
    /// brace that closes the fragment. A `single_line` fragment also stops
    /// before the end of its line.
    fn nested<'n>(
        stream: &'n mut TextStream,
        options: &'n ProcessingOptions,
        depth: usize,
        single_line: bool,
    ) -> Lexer<'n> {
        let mut lexer = Lexer::new(stream, options);
        lexer
            .terminators
            .push(TokenKind::Punctuation(Punctuation::CloseBrace));
        lexer.depth = depth;
        lexer.single_line = single_line;
        lexer
    }

    pub fn lex(mut self) -> LexOutput {
        debug!("Lexing started at {}", self.stream.location());
        loop {
            if self.single_line && EOLS.contains(&self.stream.peek()) {
                break;
            }
            self.read_token();
            if self.is_terminated() {
                break;
            }
        }
        self.report_mismatches();
        debug!(
            "Lexing finished with {} tokens and {} blames",
            self.tokens.len(),
            self.blames.len()
        );
        LexOutput {
            tokens: self.tokens,
            blames: self.blames,
        }
    }

    fn is_terminated(&self) -> bool {
        match self.tokens.last() {
            Some(token) if token.is(TokenKind::End) => true,
            Some(token) => self.terminators.contains(&token.kind) && self.open_brackets.is_empty(),
            None => false,
        }
    }

    // === Dispatch ===

    fn read_token(&mut self) {
        let c = self.stream.peek();
        if WHITE.contains(&c) {
            self.read_white();
        } else if let Some((text, kind)) = self.match_sign() {
            self.read_sign(text, kind);
        } else if language::is_id_start(c) {
            self.read_id();
        } else if c.is_ascii_digit() {
            let token = self.read_number();
            self.push(token);
        } else if self.stream.peek_is(language::MULTILINE_COMMENT) {
            let token = self.read_multiline_comment();
            self.push(token);
        } else if self.stream.peek_is(language::COMMENT_START) {
            let token = self.read_comment();
            self.push(token);
        } else if c == language::CHARACTER_QUOTE {
            let token = self.read_character();
            self.push(token);
        } else if language::STRING_QUOTES.contains(&c) {
            let start = self.stream.location();
            let position = self.stream.position();
            let token = self.read_string(String::new(), start, position);
            self.push(token);
        } else if EOLS.contains(&c) {
            self.read_newline();
        } else if c == EOC {
            self.read_end();
        } else {
            let start = self.stream.location();
            let position = self.stream.position();
            self.stream.advance();
            let token = self.finish(TokenKind::Invalid, start, position);
            self.blame(BlameKind::InvalidCharacter, token.span);
            self.push(token);
        }
    }

    fn push(&mut self, token: Token) {
        trace!("{:?} {:?} at {}", token.kind, token.value, token.span);
        self.tokens.push(token);
    }

    fn blame(&mut self, kind: BlameKind, span: Span) {
        self.blames.push(Blame::new(kind, span));
    }

    /// Builds a token from everything consumed since `position`.
    fn finish(&self, kind: TokenKind, start: Location, position: usize) -> Token {
        Token::new(
            kind,
            self.stream.slice(position, self.stream.position()),
            Span::new(start, self.stream.location()),
        )
    }

    /// Longest punctuation or operator sign at the cursor.
    /// Punctuation wins a tie.
    fn match_sign(&self) -> Option<(&'static str, TokenKind)> {
        let punctuation = language::PUNCTUATION
            .iter()
            .filter(|(text, p)| {
                // `}}` closes a code quote only; elsewhere it is two braces
                self.stream.peek_is(text)
                    && (*p != Punctuation::CloseDoubleBrace
                        || self.open_brackets.last().is_some_and(|open| {
                            open.is(TokenKind::Punctuation(Punctuation::OpenDoubleBrace))
                        }))
            })
            .map(|(text, p)| (*text, TokenKind::Punctuation(*p)))
            .next();
        let operator = language::operator_signs()
            .find(|spec| self.stream.peek_is(spec.text))
            .map(|spec| (spec.text, TokenKind::Operator(spec.operator)));
        match (punctuation, operator) {
            (Some(p), Some(o)) if o.0.len() > p.0.len() => Some(o),
            (Some(p), _) => Some(p),
            (None, o) => o,
        }
    }

    fn read_sign(&mut self, text: &str, kind: TokenKind) {
        let start = self.stream.location();
        let position = self.stream.position();
        self.stream.eat(text);
        let mut token = self.finish(kind, start, position);
        match kind {
            TokenKind::Operator(_) => {
                if let Some(spec) = language::operator_signs().find(|spec| spec.text == text) {
                    token = token.with_payload(operator_payload(spec));
                }
            }
            TokenKind::Punctuation(p) => self.track_bracket(p, &token),
            _ => {}
        }
        self.push(token);
    }

    fn track_bracket(&mut self, punctuation: Punctuation, token: &Token) {
        if punctuation.closing().is_some() {
            self.open_brackets.push(token.clone());
        } else if punctuation.is_closing() {
            let matches_top = self.open_brackets.last().is_some_and(|open| match open.kind {
                TokenKind::Punctuation(p) => p.closing() == Some(punctuation),
                _ => false,
            });
            if matches_top {
                self.open_brackets.pop();
            } else {
                self.stray_brackets.push(token.clone());
            }
        }
    }

    fn report_mismatches(&mut self) {
        let mut mismatches: Vec<Token> = self.open_brackets.drain(..).collect();
        mismatches.append(&mut self.stray_brackets);
        mismatches.sort_by_key(|token| token.span.start);
        for token in mismatches {
            let kind = match token.kind {
                TokenKind::Punctuation(
                    Punctuation::OpenParenthesis | Punctuation::CloseParenthesis,
                ) => BlameKind::MismatchedParenthesis,
                TokenKind::Punctuation(Punctuation::OpenBracket | Punctuation::CloseBracket) => {
                    BlameKind::MismatchedBracket
                }
                TokenKind::Punctuation(Punctuation::OpenBrace | Punctuation::CloseBrace) => {
                    BlameKind::MismatchedBrace
                }
                _ => BlameKind::MismatchedDoubleBrace,
            };
            self.blame(kind, token.span);
        }
    }

    /// Identifier ::= IdStart { IdPart | "-" IdPart } [ "?" | "!" ]
    ///
    /// Also produces keywords, word operators, and prefixed strings (`f"..."`).
    fn read_id(&mut self) {
        let start = self.stream.location();
        let position = self.stream.position();
        let mut id = String::new();
        id.push(self.stream.advance());
        loop {
            let c = self.stream.peek();
            if language::is_id_part(c)
                || (c == language::ID_NOT_END && language::is_id_part(self.stream.peek_at(1)))
            {
                id.push(self.stream.advance());
            } else {
                break;
            }
        }
        if self.stream.peek_any(&language::ID_END) {
            id.push(self.stream.advance());
        }

        if self.stream.peek_any(&language::STRING_QUOTES)
            && id.chars().all(|c| language::STRING_PREFIXES.contains(&c))
        {
            let token = self.read_string(id, start, position);
            self.push(token);
            return;
        }

        let token = if let Some(keyword) = language::keyword(&id) {
            self.finish(TokenKind::Keyword(keyword), start, position)
        } else if let Some(spec) = language::word_operator(&id) {
            self.finish(TokenKind::Operator(spec.operator), start, position)
                .with_payload(operator_payload(spec))
        } else {
            self.finish(TokenKind::Identifier, start, position)
        };
        self.push(token);
    }

    // === Lines and indentation ===

    fn read_newline(&mut self) {
        let start = self.stream.location();
        let position = self.stream.position();
        let mut value = String::new();
        self.stream.eat_while(&mut value, |c| EOLS.contains(&c));
        let token = self.finish(TokenKind::Newline, start, position);
        self.push(token);

        // a code line starting at column 1 closes every indented block
        if !self.stream.peek_any(&WHITE) && self.line_is_significant() {
            let location = self.stream.location();
            self.close_levels(0, location);
        }
    }

    fn read_white(&mut self) {
        let start = self.stream.location();
        let position = self.stream.position();
        let mut white = String::new();
        self.stream.eat_while(&mut white, |c| WHITE.contains(&c));

        let at_line_start = self.tokens.last().is_some_and(|t| t.is(TokenKind::Newline));
        if at_line_start && self.line_is_significant() {
            let span = Span::new(start, self.stream.location());
            self.change_indentation(&white, span);
            return;
        }
        match self.tokens.last_mut() {
            Some(previous) => previous.ending_white.push_str(&white),
            None => {
                // leading indentation of the whole unit is its base level
                self.indentation.last_width = self.indentation_width(&white);
                let token = self.finish(TokenKind::Whitespace, start, position);
                self.push(token);
            }
        }
    }

    /// Whether the line about to be read may change indentation.
    fn line_is_significant(&self) -> bool {
        if !self.open_brackets.is_empty() {
            return false;
        }
        let rest = self.stream.rest_of_line();
        if rest.trim().is_empty() || rest.starts_with(language::COMMENT_START) {
            return false;
        }
        let continues_operator = self
            .tokens
            .iter()
            .rev()
            .find(|t| !t.is(TokenKind::Newline))
            .and_then(Token::operator_info)
            .is_some_and(|info| info.side == InputSide::Both);
        !continues_operator && !starts_with_infix_operator(&rest)
    }

    fn indentation_width(&self, white: &str) -> usize {
        let tab = if self.indentation.size > 0 {
            self.indentation.size
        } else {
            self.options.tab_width
        };
        white.chars().map(|c| if c == '\t' { tab } else { 1 }).sum()
    }

    fn change_indentation(&mut self, white: &str, span: Span) {
        let first = white.chars().next();
        let expected = *self.indentation.character.get_or_insert(first.unwrap_or(' '));
        let width = self.indentation_width(white);
        if white.chars().all(|c| c == expected) {
            if self.indentation.size == 0 {
                self.indentation.size = width;
            }
        } else {
            self.blame(BlameKind::InconsistentIndentation, span);
        }

        if width > self.indentation.last_width {
            let last = self.indentation.last_width;
            self.indentation.enclosing.push(last);
            self.indentation.last_width = width;
            let token = Token::new(TokenKind::Indent, white, span);
            self.push(token);
        } else {
            if let Some(previous) = self.tokens.last_mut() {
                previous.ending_white.push_str(white);
            }
            self.close_levels(width, span.end);
        }
    }

    /// Emits one outdent per level deeper than `width`.
    fn close_levels(&mut self, width: usize, at: Location) {
        while width < self.indentation.last_width {
            match self.indentation.enclosing.pop() {
                Some(outer) => {
                    self.indentation.last_width = outer;
                    self.push(Token::new(TokenKind::Outdent, "", Span::new(at, at)));
                }
                None => {
                    self.indentation.last_width = width;
                }
            }
        }
    }

    fn read_end(&mut self) {
        let at = self.stream.location();
        self.close_levels(0, at);
        self.stream.advance();
        self.push(Token::new(TokenKind::End, "", Span::new(at, at)));
    }

    /// Lexes a `{...}` fragment of a format string as a separate unit.
    fn read_interpolation(&mut self, single_line: bool) -> Option<(Span, Vec<Token>)> {
        if self.depth >= self.options.max_interpolation_depth {
            let at = self.stream.location();
            self.blame(BlameKind::InterpolationTooDeep, Span::new(at, at));
            return None;
        }
        let start = self.stream.location();
        let output =
            Lexer::nested(&mut *self.stream, self.options, self.depth + 1, single_line).lex();
        self.blames.extend(output.blames);
        let mut tokens = output.tokens;
        if tokens
            .first()
            .is_some_and(|t| t.is(TokenKind::Punctuation(Punctuation::OpenBrace)))
        {
            tokens.remove(0);
        }
        if tokens.last().is_some_and(|t| {
            t.is_any(&[TokenKind::Punctuation(Punctuation::CloseBrace), TokenKind::End])
        }) {
            tokens.pop();
        }
        Some((Span::new(start, self.stream.location()), tokens))
    }
}

fn operator_payload(spec: &language::OperatorSpec) -> Payload {
    Payload::Operator(OperatorInfo {
        precedence: spec.precedence,
        side: spec.side,
    })
}

/// A line like `.method()` or `and other` continues the previous one.
fn starts_with_infix_operator(line: &str) -> bool {
    let line = line.trim_start();
    language::OPERATORS
        .iter()
        .filter(|spec| spec.side == InputSide::Both)
        .any(|spec| {
            line.starts_with(spec.text)
                && (!spec.text.starts_with(language::is_id_start)
                    || !line[spec.text.len()..].starts_with(language::is_id_part))
        })
}

/// Lexes a whole text with the given options.
pub fn tokenize(text: &str, options: &ProcessingOptions) -> LexOutput {
    let mut stream = TextStream::new(text);
    Lexer::new(&mut stream, options).lex()
}
