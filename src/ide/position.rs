//! Cursor offsets to ycmd line/column numbers.

/// 1-based line and column as ycmd expects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAndColumn {
    pub line: usize,
    pub column: usize,
}

/// Counts the newlines before `offset` in `body`.
///
/// The column is `offset` minus the index of the last newline before it, or
/// `offset` itself on the first line. Offsets past the end are clamped.
pub fn line_and_column(body: &[u8], offset: usize) -> LineAndColumn {
    let offset = offset.min(body.len());
    let mut last_newline = 0;
    let mut line = 1;
    for (i, byte) in body[..offset].iter().enumerate() {
        if *byte == b'\n' {
            last_newline = i;
            line += 1;
        }
    }
    LineAndColumn {
        line,
        column: offset - last_newline,
    }
}

/// Converts an Acme rune offset into a byte offset within `body`.
pub fn rune_to_byte_offset(body: &str, runes: usize) -> usize {
    body.char_indices()
        .nth(runes)
        .map(|(i, _)| i)
        .unwrap_or(body.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive(body: &[u8], q0: usize) -> LineAndColumn {
        let newlines: Vec<usize> = (0..q0).filter(|&i| body[i] == b'\n').collect();
        LineAndColumn {
            line: 1 + newlines.len(),
            column: q0 - newlines.last().copied().unwrap_or(0),
        }
    }

    #[test]
    fn test_first_line() {
        assert_eq!(line_and_column(b"import os\n", 0), LineAndColumn { line: 1, column: 0 });
        assert_eq!(line_and_column(b"import os\n", 7), LineAndColumn { line: 1, column: 7 });
    }

    #[test]
    fn test_later_lines() {
        let body = b"import os\nos.path\n\nx = 1\n";
        // 'o' of os.path, just after the first newline at index 9.
        assert_eq!(line_and_column(body, 10), LineAndColumn { line: 2, column: 1 });
        assert_eq!(line_and_column(body, 13), LineAndColumn { line: 2, column: 4 });
        // 'x' after the blank line.
        assert_eq!(line_and_column(body, 19), LineAndColumn { line: 4, column: 1 });
    }

    #[test]
    fn test_matches_definition_everywhere() {
        let body = b"a\nbc\n\ndef f():\n    return 1\n";
        for q0 in 0..=body.len() {
            assert_eq!(line_and_column(body, q0), naive(body, q0), "offset {}", q0);
        }
    }

    #[test]
    fn test_offset_is_clamped() {
        assert_eq!(line_and_column(b"ab\n", 99), line_and_column(b"ab\n", 3));
    }

    #[test]
    fn test_rune_to_byte_offset() {
        let body = "é = 1\nx";
        assert_eq!(rune_to_byte_offset(body, 0), 0);
        assert_eq!(rune_to_byte_offset(body, 1), 2);
        assert_eq!(rune_to_byte_offset(body, 6), 7);
        assert_eq!(rune_to_byte_offset(body, 100), body.len());
    }
}
