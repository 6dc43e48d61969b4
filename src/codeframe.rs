//! Renders a two-line source excerpt for a diagnostic location.
//!
//! Spec'd at the crate boundary as `codeFrameFromSource(source, loc)`: every
//! `ParseError` message is prefixed with the output of this function when a
//! location is available.

use crate::ast::Loc;

/// Renders the source line `loc.start` falls on, followed by a caret line
/// pointing at the offending column. Out-of-range locations degrade to an
/// empty frame rather than panicking — a malformed `Loc` should never stop
/// a diagnostic from being reported.
pub fn code_frame_from_source(source: &str, loc: Loc) -> String {
    let line_number = loc.start.line as usize;
    let Some(line) = source.lines().nth(line_number.saturating_sub(1)) else {
        return String::new();
    };

    let column = loc.start.column.max(1) as usize;
    let gutter = format!("{line_number} | ");
    let pointer_indent = " ".repeat(gutter.len() + column.saturating_sub(1));

    format!("{gutter}{line}\n{pointer_indent}^")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Position;

    #[test]
    fn points_at_the_requested_column() {
        let source = "(module\n  (func))";
        let loc = Loc::new(Position::new(2, 3), Position::new(2, 7));

        let frame = code_frame_from_source(source, loc);

        assert!(frame.contains("(func))"));
        assert!(frame.ends_with('^'));
    }

    #[test]
    fn out_of_range_line_yields_empty_frame() {
        let frame = code_frame_from_source("(module)", Loc::new(Position::new(50, 1), Position::new(50, 1)));
        assert_eq!(frame, "");
    }
}
