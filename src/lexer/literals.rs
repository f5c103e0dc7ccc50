use super::Lexer;
use crate::error::BlameKind;
use crate::language::{self, EOC, EOLS};
use crate::location::{Location, Span};
use crate::token::{
    Interpolation, NumberInfo, NumberValue, Payload, QuoteStyle, StringInfo, Token, TokenKind,
};

impl Lexer<'_> {
    /// Number ::= Digits [ "::" Digits ]
    ///
    /// With the `radix::digits` form the first part is the base (1 to 36).
    pub(super) fn read_number(&mut self) -> Token {
        let start = self.stream.location();
        let position = self.stream.position();
        let head = self.read_number_part();
        let mut radix = 10;
        let mut valid = true;
        let body = if self.stream.eat(language::RADIX_DELIMITER) {
            let head_span = Span::new(start, shift(start, head.chars().count()));
            match head.replace('_', "").parse::<u32>() {
                Ok(base) if (1..=36).contains(&base) => {
                    radix = base;
                    if base == 10 {
                        self.blame(BlameKind::Redundant10Radix, head_span);
                    }
                }
                _ => {
                    self.blame(BlameKind::InvalidNumberRadix, head_span);
                    valid = false;
                }
            }
            let body_start = self.stream.location();
            let body = self.read_number_part();
            if body.is_empty() {
                let at = Span::new(body_start, body_start);
                self.blame(BlameKind::ExpectedNumberValueAfterNumberBase, at);
                valid = false;
            }
            (body, body_start)
        } else {
            (head, start)
        };

        let (digits, digits_start) = body;
        let value = if valid {
            self.number_value(&digits, digits_start, radix)
        } else {
            None
        };
        let content = match value {
            Some(NumberValue::Integer(n)) => n.to_string(),
            Some(NumberValue::Float(f)) => f.to_string(),
            None => digits,
        };
        self.finish(TokenKind::Number, start, position)
            .with_content(content)
            .with_payload(Payload::Number(NumberInfo { radix, value }))
    }

    fn read_number_part(&mut self) -> String {
        let mut part = String::new();
        loop {
            let c = self.stream.peek();
            let fraction =
                c == '.' && self.stream.peek_at(1).is_ascii_digit() && !part.contains('.');
            if c.is_ascii_alphanumeric() || c == '_' || fraction {
                part.push(self.stream.advance());
            } else {
                return part;
            }
        }
    }

    /// Decodes the digits, reporting the first one that does not fit the radix.
    fn number_value(&mut self, digits: &str, start: Location, radix: u32) -> Option<NumberValue> {
        for (i, c) in digits.chars().enumerate() {
            if c == '_' || (c == '.' && radix == 10) {
                continue;
            }
            if !c.to_digit(36).is_some_and(|d| d < radix) {
                let at = shift(start, i);
                self.blame(BlameKind::DigitValueIsAboveNumberRadix, Span::new(at, shift(at, 1)));
                return None;
            }
        }
        let clean = digits.replace('_', "");
        if clean.contains('.') {
            return clean.parse::<f64>().ok().map(NumberValue::Float);
        }
        clean
            .chars()
            .filter_map(|c| c.to_digit(36))
            .try_fold(0u128, |acc, d| {
                acc.checked_mul(u128::from(radix))?.checked_add(u128::from(d))
            })
            .map(NumberValue::Integer)
    }

    /// Reads a string literal whose prefixes, if any, were already consumed.
    pub(super) fn read_string(
        &mut self,
        prefixes: String,
        start: Location,
        position: usize,
    ) -> Token {
        let quote_char = self.stream.advance();
        let triple_text: String = [quote_char; 3].iter().collect();
        let mut info = StringInfo {
            prefixes,
            quote: match quote_char {
                '\'' => QuoteStyle::Single,
                _ => QuoteStyle::Double,
            },
            unclosed: false,
            ending_quotes: String::new(),
            interpolations: Vec::new(),
        };
        if self.stream.eat(&triple_text[1..]) {
            info.quote = match info.quote {
                QuoteStyle::Single => QuoteStyle::TripleSingle,
                _ => QuoteStyle::TripleDouble,
            };
        } else if self.stream.peek() == quote_char {
            self.stream.advance();
            let token = self.finish(TokenKind::String, start, position);
            if !info.prefixes.is_empty() {
                self.blame(BlameKind::RedundantPrefixesForEmptyString, token.span);
            }
            return token.with_content("").with_payload(Payload::String(info));
        }

        let triple = info.quote.is_triple();
        let mut content = String::new();
        loop {
            let c = self.stream.peek();
            if triple && self.stream.eat(&triple_text) {
                let quotes_start = self.stream.location();
                while self.stream.peek() == quote_char {
                    info.ending_quotes.push(self.stream.advance());
                }
                if !info.ending_quotes.is_empty() {
                    self.blame(
                        BlameKind::UnescapedQuoteInStringLiteral,
                        Span::new(quotes_start, self.stream.location()),
                    );
                }
                break;
            }
            if !triple && c == quote_char {
                self.stream.advance();
                break;
            }
            if c == EOC || (!triple && EOLS.contains(&c)) {
                info.unclosed = true;
                let span = Span::new(start, self.stream.location());
                self.blame(BlameKind::UnclosedString, span);
                break;
            }
            if c == '\\' && !info.is_raw() {
                self.read_escape(&mut content);
            } else if c == '{' && info.is_format() {
                let from = self.stream.position();
                match self.read_interpolation(!triple) {
                    Some((span, tokens)) => {
                        info.interpolations.push(Interpolation { span, tokens });
                        content.push_str(&self.stream.slice(from, self.stream.position()));
                    }
                    None => content.push(self.stream.advance()),
                }
            } else {
                content.push(self.stream.advance());
            }
        }

        let token = self.finish(TokenKind::String, start, position);
        if info.is_format() && info.interpolations.is_empty() {
            self.blame(BlameKind::RedundantStringFormat, token.span);
        }
        token.with_content(content).with_payload(Payload::String(info))
    }

    /// Character ::= "`" Char "`"
    pub(super) fn read_character(&mut self) -> Token {
        let start = self.stream.location();
        let position = self.stream.position();
        self.stream.advance();
        let mut content = String::new();
        let mut closed = false;
        loop {
            let c = self.stream.peek();
            if c == language::CHARACTER_QUOTE {
                self.stream.advance();
                closed = true;
                break;
            }
            if c == EOC || EOLS.contains(&c) {
                break;
            }
            if c == '\\' {
                self.read_escape(&mut content);
            } else {
                content.push(self.stream.advance());
            }
        }
        let token = self.finish(TokenKind::Character, start, position);
        if !closed {
            self.blame(BlameKind::UnclosedCharacterLiteral, token.span);
        } else if content.is_empty() {
            self.blame(BlameKind::EmptyCharacterLiteral, token.span);
        } else if content.chars().count() > 1 {
            self.blame(BlameKind::CharacterLiteralTooLong, token.span);
        }
        token.with_content(content)
    }

    /// Decodes one escape sequence into `content`.
    /// On malformed input the raw text is kept instead.
    fn read_escape(&mut self, content: &mut String) {
        let start = self.stream.location();
        let from = self.stream.position();
        self.stream.advance();
        let c = self.stream.peek();
        if c == EOC || EOLS.contains(&c) {
            let span = Span::new(start, self.stream.location());
            self.blame(BlameKind::TruncatedEscapeSequence, span);
            content.push('\\');
            return;
        }
        self.stream.advance();
        let hex_len = match c {
            'x' => 2,
            'u' => 4,
            'U' => 8,
            _ => {
                match language::escape(c) {
                    Some(decoded) => content.push(decoded),
                    None => {
                        let span = Span::new(start, self.stream.location());
                        self.blame(BlameKind::InvalidEscapeSequence, span);
                        content.push('\\');
                        content.push(c);
                    }
                }
                return;
            }
        };

        let mut hex = String::new();
        while hex.len() < hex_len && self.stream.peek().is_ascii_hexdigit() {
            hex.push(self.stream.advance());
        }
        let span = Span::new(start, self.stream.location());
        let raw = self.stream.slice(from, self.stream.position());
        if hex.len() < hex_len {
            let kind = if c == 'x' {
                BlameKind::InvalidXEscapeFormat
            } else {
                BlameKind::TruncatedEscapeSequence
            };
            self.blame(kind, span);
            content.push_str(&raw);
            return;
        }
        match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
            Some(decoded) => content.push(decoded),
            None => {
                self.blame(BlameKind::IllegalUnicodeCharacter, span);
                content.push_str(&raw);
            }
        }
    }

    /// Comment ::= "#" { any character but end of line }
    pub(super) fn read_comment(&mut self) -> Token {
        let start = self.stream.location();
        let position = self.stream.position();
        self.stream.eat(language::COMMENT_START);
        let mut content = String::new();
        self.stream.eat_while(&mut content, |c| !EOLS.contains(&c));
        self.finish(TokenKind::Comment, start, position)
            .with_content(content)
    }

    /// MultilineComment ::= "###" { any character } "###"
    pub(super) fn read_multiline_comment(&mut self) -> Token {
        let start = self.stream.location();
        let position = self.stream.position();
        self.stream.eat(language::MULTILINE_COMMENT);
        let mut content = String::new();
        let mut closed = false;
        while !self.stream.at_end() {
            if self.stream.eat(language::MULTILINE_COMMENT) {
                closed = true;
                break;
            }
            content.push(self.stream.advance());
        }
        let token = self.finish(TokenKind::Comment, start, position);
        if !closed {
            self.blame(BlameKind::UnclosedMultilineComment, token.span);
        }
        token.with_content(content)
    }
}

/// Location `n` characters further on the same line.
fn shift(location: Location, n: usize) -> Location {
    Location::new(location.line, location.column + n)
}

#[cfg(test)]
mod tests {
    use crate::error::BlameKind;
    use crate::lexer::{tokenize, LexOutput};
    use crate::source::ProcessingOptions;
    use crate::token::{NumberValue, QuoteStyle, Token, TokenKind};

    fn lex(input: &str) -> LexOutput {
        tokenize(input, &ProcessingOptions::default())
    }

    fn first(input: &str) -> (Token, Vec<BlameKind>) {
        let output = lex(input);
        let token = output.tokens[0].clone();
        (token, output.blames.into_iter().map(|b| b.kind).collect())
    }

    fn number_value(input: &str) -> Option<NumberValue> {
        first(input).0.number().and_then(|n| n.value)
    }

    #[test]
    fn test_decimal_numbers() {
        assert_eq!(number_value("1_000"), Some(NumberValue::Integer(1000)));
        assert_eq!(number_value("2.5"), Some(NumberValue::Float(2.5)));
        let tokens = lex("1.method").tokens;
        assert_eq!(tokens[0].value, "1");
    }

    #[test]
    fn test_radix_numbers() {
        let (token, blames) = first("16::ff");
        let info = token.number().unwrap();
        assert_eq!(info.radix, 16);
        assert_eq!(info.value, Some(NumberValue::Integer(255)));
        assert_eq!(token.content, "255");
        assert!(blames.is_empty());

        let (token, blames) = first("2::1011");
        assert_eq!(token.number().unwrap().value, Some(NumberValue::Integer(11)));
        assert!(blames.is_empty());
    }

    #[test]
    fn test_redundant_decimal_radix() {
        let (token, blames) = first("10::5");
        assert_eq!(token.number().unwrap().value, Some(NumberValue::Integer(5)));
        assert_eq!(blames, vec![BlameKind::Redundant10Radix]);
    }

    #[test]
    fn test_invalid_radix() {
        let (token, blames) = first("37::1");
        assert_eq!(blames, vec![BlameKind::InvalidNumberRadix]);
        assert_eq!(token.kind, TokenKind::Number);
        assert_eq!(token.value, "37::1");
        assert_eq!(first("0::1").1, vec![BlameKind::InvalidNumberRadix]);
    }

    #[test]
    fn test_radix_without_value() {
        assert_eq!(first("8::").1, vec![BlameKind::ExpectedNumberValueAfterNumberBase]);
    }

    #[test]
    fn test_digit_above_radix() {
        let (token, blames) = first("8::19");
        assert_eq!(blames, vec![BlameKind::DigitValueIsAboveNumberRadix]);
        assert_eq!(token.number().unwrap().value, None);
        assert_eq!(first("12ab").1, vec![BlameKind::DigitValueIsAboveNumberRadix]);
    }

    #[test]
    fn test_simple_strings() {
        let (token, blames) = first("'abc'");
        assert!(blames.is_empty());
        assert_eq!(token.content, "abc");
        assert_eq!(token.string().unwrap().quote, QuoteStyle::Single);
        let (token, _) = first(r#""a\tbA\x42""#);
        assert_eq!(token.content, "a\tbAB");
    }

    #[test]
    fn test_raw_string_keeps_backslashes() {
        let (token, blames) = first(r#"r"a\nb""#);
        assert!(blames.is_empty());
        assert_eq!(token.content, r"a\nb");
        assert!(token.string().unwrap().is_raw());
    }

    #[test]
    fn test_triple_quoted_string() {
        let (token, blames) = first("\"\"\"line 1\nsaid \"hi\"\n\"\"\"");
        assert!(blames.is_empty());
        assert_eq!(token.content, "line 1\nsaid \"hi\"\n");
        assert_eq!(token.string().unwrap().quote, QuoteStyle::TripleDouble);
    }

    #[test]
    fn test_unescaped_trailing_quote() {
        let (token, blames) = first("'''abc''''");
        assert_eq!(blames, vec![BlameKind::UnescapedQuoteInStringLiteral]);
        assert_eq!(token.string().unwrap().ending_quotes, "'");
    }

    #[test]
    fn test_unclosed_string() {
        for input in ["'abc", "\"abc\nd", "'''abc"] {
            let output = lex(input);
            let unclosed = output
                .blames
                .iter()
                .filter(|b| b.kind == BlameKind::UnclosedString)
                .count();
            assert_eq!(unclosed, 1, "{input}");
            assert!(output.tokens[0].string().unwrap().unclosed, "{input}");
        }
    }

    #[test]
    fn test_empty_strings_with_prefixes() {
        let output = lex("x = f''\ny = r\"\"\nz = ''");
        let kinds: Vec<BlameKind> = output.blames.into_iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BlameKind::RedundantPrefixesForEmptyString,
                BlameKind::RedundantPrefixesForEmptyString
            ]
        );
    }

    #[test]
    fn test_format_string_interpolation() {
        let (token, blames) = first("f\"sum {a + b}!\"");
        assert!(blames.is_empty(), "{blames:?}");
        let info = token.string().unwrap();
        assert_eq!(info.interpolations.len(), 1);
        let kinds: Vec<TokenKind> = info.interpolations[0].tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds.len(), 3);
        assert_eq!(info.interpolations[0].tokens[0].value, "a");
        assert_eq!(token.content, "sum {a + b}!");
        assert_eq!(token.value, "f\"sum {a + b}!\"");
    }

    #[test]
    fn test_nested_braces_in_interpolation() {
        let (token, blames) = first("f'{ {a: 1}[a] }'");
        assert!(blames.is_empty(), "{blames:?}");
        let tokens = &token.string().unwrap().interpolations[0].tokens;
        assert_eq!(tokens.first().unwrap().value, "{");
        assert_eq!(tokens.last().unwrap().value, "]");
    }

    #[test]
    fn test_interpolation_ends_with_its_line() {
        let output = lex("x = f\"{a\ny = 1\n");
        let kinds: Vec<BlameKind> = output.blames.iter().map(|b| b.kind).collect();
        assert!(kinds.contains(&BlameKind::UnclosedString), "{kinds:?}");
        assert!(kinds.contains(&BlameKind::MismatchedBrace), "{kinds:?}");
        let string = &output.tokens[2];
        assert_eq!(string.value, "f\"{a");
        assert_eq!(string.span.end.line, 1);
        let rest: Vec<&str> = output.tokens[3..].iter().map(|t| t.value.as_str()).collect();
        assert_eq!(rest, vec!["\n", "y", "=", "1", "\n", ""]);
    }

    #[test]
    fn test_triple_quoted_interpolation_spans_lines() {
        let (token, blames) = first("f'''{a +\nb}'''");
        assert!(blames.is_empty(), "{blames:?}");
        let tokens = &token.string().unwrap().interpolations[0].tokens;
        let values: Vec<&str> = tokens.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values[..2], ["a", "+"]);
        assert_eq!(values.last(), Some(&"b"));
        assert_eq!(token.span.end.line, 2);
    }

    #[test]
    fn test_format_without_interpolation() {
        assert_eq!(first("f'plain'").1, vec![BlameKind::RedundantStringFormat]);
    }

    #[test]
    fn test_interpolation_depth_limit() {
        let options = ProcessingOptions {
            max_interpolation_depth: 1,
            ..ProcessingOptions::default()
        };
        let output = tokenize("f'{f\"{x}\"}'", &options);
        assert!(output.blames.iter().any(|b| b.kind == BlameKind::InterpolationTooDeep));
        assert!(output.tokens.last().unwrap().is(TokenKind::End));
    }

    #[test]
    fn test_escape_errors() {
        assert_eq!(first(r"'\q'").1, vec![BlameKind::InvalidEscapeSequence]);
        assert_eq!(first(r"'\x4'").1, vec![BlameKind::InvalidXEscapeFormat]);
        assert_eq!(first(r"'\u12'").1, vec![BlameKind::TruncatedEscapeSequence]);
        assert_eq!(first(r"'\UFFFFFFFF'").1, vec![BlameKind::IllegalUnicodeCharacter]);
        let (token, _) = first(r"'\q'");
        assert_eq!(token.content, r"\q");
    }

    #[test]
    fn test_characters() {
        let (token, blames) = first("`a`");
        assert!(blames.is_empty());
        assert_eq!(token.content, "a");
        assert_eq!(first("`\\n`").0.content, "\n");
        assert_eq!(first("``").1, vec![BlameKind::EmptyCharacterLiteral]);
        assert_eq!(first("`ab`").1, vec![BlameKind::CharacterLiteralTooLong]);
        assert_eq!(first("`a").1, vec![BlameKind::UnclosedCharacterLiteral]);
    }
}
