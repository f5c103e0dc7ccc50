use crate::location::{Location, Span};
use miette::SourceSpan;

/// Byte offset of a 1-based line and column.
/// Locations past the end of a line or of the text are clamped.
pub fn byte_offset_of(source: &str, location: Location) -> usize {
    let mut line = 1;
    let mut column = 1;
    let mut chars = source.char_indices().peekable();
    while let Some((offset, c)) = chars.next() {
        if (line == location.line && column >= location.column) || line > location.line {
            return offset;
        }
        let line_break = c == '\n' || c == '\r';
        if line_break && line == location.line {
            return offset;
        }
        let crlf = c == '\r' && chars.peek().is_some_and(|(_, next)| *next == '\n');
        if line_break && !crlf {
            line += 1;
            column = 1;
        } else if !line_break {
            column += 1;
        }
    }
    source.len()
}

/// Converts a line/column span into the byte range `miette` labels expect.
pub fn span_to_source_span(source: &str, span: Span) -> SourceSpan {
    if span.is_zero() {
        return (0, 0).into();
    }
    let start = byte_offset_of(source, span.start);
    let end = byte_offset_of(source, span.end).max(start);
    (start, end - start).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_of_locations() {
        let source = "fn f:\n    pass\n";
        assert_eq!(byte_offset_of(source, Location::new(1, 1)), 0);
        assert_eq!(byte_offset_of(source, Location::new(1, 40)), 5);
        assert_eq!(byte_offset_of(source, Location::new(2, 5)), 10);
        assert_eq!(byte_offset_of(source, Location::new(9, 1)), source.len());
    }

    #[test]
    fn test_offsets_after_carriage_returns() {
        let source = "a\rb\r\nc";
        assert_eq!(byte_offset_of(source, Location::new(2, 1)), 2);
        assert_eq!(byte_offset_of(source, Location::new(2, 9)), 3);
        assert_eq!(byte_offset_of(source, Location::new(3, 1)), 5);
    }

    #[test]
    fn test_zero_span_maps_to_start() {
        let span = span_to_source_span("abc", Span::zero());
        assert_eq!(span.offset(), 0);
        assert_eq!(span.len(), 0);
    }
}
