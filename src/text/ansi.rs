//! ANSI escape sequence scanning.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnsiCodeKind {
    Csi,
    Osc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnsiCode<'a> {
    pub code: &'a str,
    pub kind: AnsiCodeKind,
}

impl AnsiCode<'_> {
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

/// Returns the escape sequence starting at byte offset `pos`, if any.
///
/// Only CSI (`ESC [`) and OSC (`ESC ]`) sequences are recognized; those are
/// the only ones the renderers emit or pass through from tool output.
pub fn extract_ansi_code(input: &str, pos: usize) -> Option<AnsiCode<'_>> {
    let bytes = input.as_bytes();
    if bytes.get(pos) != Some(&0x1b) {
        return None;
    }

    match bytes.get(pos + 1)? {
        b'[' => {
            let end = bytes[pos + 2..]
                .iter()
                .position(|b| (0x40..=0x7e).contains(b))
                .map(|offset| pos + 2 + offset + 1)?;
            Some(AnsiCode {
                code: &input[pos..end],
                kind: AnsiCodeKind::Csi,
            })
        }
        b']' => {
            let mut idx = pos + 2;
            while idx < bytes.len() {
                match bytes[idx] {
                    0x07 => {
                        return Some(AnsiCode {
                            code: &input[pos..idx + 1],
                            kind: AnsiCodeKind::Osc,
                        })
                    }
                    0x1b if bytes.get(idx + 1) == Some(&b'\\') => {
                        return Some(AnsiCode {
                            code: &input[pos..idx + 2],
                            kind: AnsiCodeKind::Osc,
                        })
                    }
                    _ => idx += 1,
                }
            }
            None
        }
        _ => None,
    }
}

/// Removes every recognized escape sequence from `input`.
pub fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut idx = 0;
    while idx < input.len() {
        if let Some(code) = extract_ansi_code(input, idx) {
            idx += code.len();
            continue;
        }
        let Some(ch) = input[idx..].chars().next() else {
            break;
        };
        out.push(ch);
        idx += ch.len_utf8();
    }
    out
}
