//! Reformats model prose into lightly annotated HTML text.
//!
//! `format_text` applies the structural rules to an already complete block.
//! Streamed replies go through [`ParagraphBuffer`], which only releases
//! text ending on a paragraph boundary so no rule ever sees half a
//! construct, and escapes model output before any markup is added.

use std::sync::OnceLock;

use regex::Regex;

const BULLET: &str = "• ";

macro_rules! cached_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect("formatter regex is valid"))
        }
    };
}

cached_regex!(leading_ws, r"(?m)^[ \t]+");
cached_regex!(extra_newlines, r"\n{3,}");
cached_regex!(numbered_item, r"(?m)^(\d+\.)[ \t]+(.*)$");
cached_regex!(sentence_before_capital, r"([.?!])\n(\p{Lu})");
cached_regex!(bold, r"\*\*([^*\n]+)\*\*");
cached_regex!(bullet_marker, r"(?m)^[*-][ \t]+");
cached_regex!(trailing_ws, r"(?m)[ \t]+$");
cached_regex!(numbered_start, r"^\d+\.");

/// Applies the formatting rules, in order. Idempotent.
pub fn format_text(input: &str) -> String {
    let text = leading_ws().replace_all(input, "");
    let text = extra_newlines().replace_all(&text, "\n\n");
    let text = space_between_lines(&text, |prev, line| {
        numbered_start().is_match(prev) && numbered_start().is_match(line)
    });
    let text = numbered_item()
        .replace_all(&text, r#"<strong class="numbered-topic">${1} ${2}</strong>"#);
    let text = sentence_before_capital().replace_all(&text, "${1}\n\n${2}");
    let text = bold().replace_all(&text, "<strong>${1}</strong>");
    let text = break_after_sentences(&text);
    let text = bullet_marker().replace_all(&text, BULLET);
    let text = space_between_lines(&text, |prev, line| {
        line.starts_with(BULLET) && !prev.trim().is_empty() && !prev.starts_with(BULLET)
    });
    trailing_ws().replace_all(&text, "").into_owned()
}

/// Escapes the characters that would let model output inject markup.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape then format; the form every streamed block is rendered in.
pub fn render_block(raw: &str) -> String {
    format_text(&escape_html(raw))
}

/// Inserts an empty line between two adjacent lines when `needs_gap`
/// holds for (previous, current).
fn space_between_lines<F>(text: &str, needs_gap: F) -> String
where
    F: Fn(&str, &str) -> bool,
{
    let mut out = String::with_capacity(text.len());
    let mut prev: Option<&str> = None;
    for line in text.split('\n') {
        if let Some(p) = prev {
            out.push('\n');
            if needs_gap(p, line) {
                out.push('\n');
            }
        }
        out.push_str(line);
        prev = Some(line);
    }
    out
}

/// A newline after `.`, `?` or `!` (ignoring trailing blanks) that is not
/// already followed by another newline becomes a blank line.
fn break_after_sentences(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut chars = text.chars().peekable();
    let mut last_visible: Option<char> = None;

    while let Some(c) = chars.next() {
        out.push(c);
        match c {
            '\n' => {
                if matches!(last_visible, Some('.' | '?' | '!')) && chars.peek() != Some(&'\n') {
                    out.push('\n');
                }
                last_visible = None;
            }
            ' ' | '\t' => {}
            other => last_visible = Some(other),
        }
    }
    out
}

/// Accumulates streamed fragments and releases rendered text only at
/// paragraph boundaries.
#[derive(Debug, Default)]
pub struct ParagraphBuffer {
    pending: String,
}

impl ParagraphBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a raw fragment. Returns rendered text if a full paragraph
    /// became available.
    pub fn push(&mut self, fragment: &str) -> Option<String> {
        self.pending.push_str(fragment);
        let split = self.boundary()?;
        let ready: String = self.pending.drain(..split).collect();
        Some(render_block(&ready))
    }

    /// Renders whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(render_block(&rest))
    }

    /// End of the last blank run holding two or more newlines that is
    /// followed by other text. Spaces and tabs inside the run belong to
    /// it. The run must be closed or it could still grow.
    fn boundary(&self) -> Option<usize> {
        let bytes = self.pending.as_bytes();
        let blank = |b: u8| matches!(b, b'\n' | b' ' | b'\t');
        (1..bytes.len()).rev().find(|&i| {
            if blank(bytes[i]) || !blank(bytes[i - 1]) {
                return false;
            }
            let newlines = bytes[..i]
                .iter()
                .rev()
                .take_while(|&&b| blank(b))
                .filter(|&&b| b == b'\n')
                .count();
            newlines >= 2
        })
    }
}
