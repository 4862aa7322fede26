use unicode_segmentation::UnicodeSegmentation;

use super::ansi::extract_ansi_code;
use super::width::{grapheme_width, visible_width};

const ANSI_RESET: &str = "\x1b[0m";

/// Truncates `text` to at most `max_width` visible columns, appending `ellipsis`
/// when anything was cut. Escape sequences are kept and a reset is emitted
/// before the ellipsis so styling never bleeds past the cut.
pub fn truncate_to_width(text: &str, max_width: usize, ellipsis: &str) -> String {
    if max_width == 0 {
        return String::new();
    }
    if visible_width(text) <= max_width {
        return text.to_string();
    }

    let target = max_width.saturating_sub(visible_width(ellipsis));
    if target == 0 {
        return ellipsis.chars().take(max_width).collect();
    }

    let mut out = String::with_capacity(text.len().min(max_width * 4) + ellipsis.len());
    let mut width = 0;
    let mut styled = false;
    let mut idx = 0;
    'scan: while idx < text.len() {
        if let Some(code) = extract_ansi_code(text, idx) {
            out.push_str(code.code);
            styled = true;
            idx += code.len();
            continue;
        }

        let run_end = next_escape_or_end(text, idx);
        for grapheme in text[idx..run_end].graphemes(true) {
            let w = grapheme_width(grapheme);
            if width + w > target {
                break 'scan;
            }
            out.push_str(grapheme);
            width += w;
        }
        idx = run_end;
    }

    if styled {
        out.push_str(ANSI_RESET);
    }
    out.push_str(ellipsis);
    out
}

/// Returns the first line of `text`, truncated to `max_width` columns.
pub fn first_line(text: &str, max_width: usize) -> String {
    let line = text.lines().next().unwrap_or("").trim_end();
    truncate_to_width(line, max_width, "…")
}

fn next_escape_or_end(input: &str, start: usize) -> usize {
    input[start..]
        .char_indices()
        .find(|(offset, _)| extract_ansi_code(input, start + offset).is_some())
        .map(|(offset, _)| start + offset)
        .unwrap_or(input.len())
}
