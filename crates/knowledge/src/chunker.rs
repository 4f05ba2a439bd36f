//! Chunking strategies.
//!
//! - [`chunk_text`] — paragraph chunks for uploaded documents and style
//!   samples, bounded by a character cap
//! - [`chunk_lines`] — line-range chunks for manuscript chapters, so every
//!   chunk can be cited back to `start_line..=end_line`
//!
//! All lengths are counted in characters, not bytes.

use regex_lite::Regex;
use std::sync::LazyLock;

static PARAGRAPH_BREAK: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\n\s*\n").ok());

const SENTENCE_TERMINATORS: [char; 5] = ['。', '！', '？', '!', '?'];

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn paragraphs(text: &str) -> Vec<&str> {
    match PARAGRAPH_BREAK.as_ref() {
        Some(re) => re.split(text).collect(),
        None => text.split("\n\n").collect(),
    }
}

/// Split text into chunks of at most `max_chars` characters.
///
/// Paragraphs (separated by blank lines) that fit are kept whole. Longer
/// paragraphs are cut after sentence terminators and at newlines, and the
/// pieces are packed greedily. A single sentence longer than the cap is cut
/// at whitespace, then at character boundaries. Every non-whitespace
/// character of the input ends up, in order, in exactly one chunk.
/// Whitespace-only input yields no chunks.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();

    for paragraph in paragraphs(text) {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        if char_len(paragraph) <= max_chars {
            chunks.push(paragraph.to_string());
            continue;
        }

        let mut packer = Packer::new(max_chars);
        for piece in sentence_pieces(paragraph) {
            if char_len(piece) > max_chars {
                packer.flush_into(&mut chunks);
                chunks.extend(split_oversized(piece, max_chars));
            } else {
                packer.push(piece, &mut chunks);
            }
        }
        packer.flush_into(&mut chunks);
    }

    chunks
}

/// Greedy buffer that closes a chunk when the next piece would overflow.
struct Packer {
    max_chars: usize,
    buf: String,
    len: usize,
}

impl Packer {
    fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            buf: String::new(),
            len: 0,
        }
    }

    fn push(&mut self, piece: &str, out: &mut Vec<String>) {
        let piece_len = char_len(piece);
        let sep = separator(&self.buf, piece);
        if self.len + sep.len() + piece_len > self.max_chars {
            self.flush_into(out);
            self.buf.push_str(piece);
            self.len = piece_len;
        } else {
            self.buf.push_str(sep);
            self.buf.push_str(piece);
            self.len += sep.len() + piece_len;
        }
    }

    fn flush_into(&mut self, out: &mut Vec<String>) {
        if !self.buf.is_empty() {
            out.push(std::mem::take(&mut self.buf));
        }
        self.len = 0;
    }
}

/// Latin words need a space when two pieces are packed together; CJK text
/// does not.
fn separator(buf: &str, next: &str) -> &'static str {
    match (buf.chars().last(), next.chars().next()) {
        (Some(a), Some(b)) if a.is_ascii() && b.is_ascii() => " ",
        _ => "",
    }
}

/// Pieces ending at a sentence terminator (kept) or a newline (dropped),
/// trimmed, empty pieces skipped.
fn sentence_pieces(paragraph: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (i, ch) in paragraph.char_indices() {
        let end = if SENTENCE_TERMINATORS.contains(&ch) {
            Some((i + ch.len_utf8(), i + ch.len_utf8()))
        } else if ch == '\n' {
            Some((i, i + 1))
        } else {
            None
        };
        if let Some((piece_end, next_start)) = end {
            let piece = paragraph[start..piece_end].trim();
            if !piece.is_empty() {
                pieces.push(piece);
            }
            start = next_start;
        }
    }
    let tail = paragraph[start..].trim();
    if !tail.is_empty() {
        pieces.push(tail);
    }
    pieces
}

/// Cut an over-long sentence at whitespace, then at character boundaries.
fn split_oversized(piece: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut packer = Packer::new(max_chars);
    for word in piece.split_whitespace() {
        if char_len(word) <= max_chars {
            packer.push(word, &mut out);
            continue;
        }
        packer.flush_into(&mut out);
        let chars: Vec<char> = word.chars().collect();
        out.extend(chars.chunks(max_chars).map(|c| c.iter().collect::<String>()));
    }
    packer.flush_into(&mut out);
    out
}

/// A manuscript chunk covering a contiguous range of lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineChunk {
    pub text: String,
    /// 1-based, inclusive.
    pub start_line: usize,
    /// 1-based, inclusive.
    pub end_line: usize,
}

/// Accumulate whole lines until the joined text reaches `threshold`
/// characters or the document ends. Blank groups are skipped but still
/// advance the line counter.
pub fn chunk_lines(text: &str, threshold: usize) -> Vec<LineChunk> {
    let lines: Vec<&str> = text.lines().collect();
    let mut out = Vec::new();
    let mut buf: Vec<&str> = Vec::new();
    let mut joined_len = 0;
    let mut start = 1;

    for (i, line) in lines.iter().copied().enumerate() {
        let line_no = i + 1;
        joined_len += char_len(line) + usize::from(!buf.is_empty());
        buf.push(line);

        if joined_len >= threshold || line_no == lines.len() {
            let joined = buf.join("\n");
            let trimmed = joined.trim();
            if !trimmed.is_empty() {
                out.push(LineChunk {
                    text: trimmed.to_string(),
                    start_line: start,
                    end_line: line_no,
                });
            }
            start = line_no + 1;
            buf.clear();
            joined_len = 0;
        }
    }
    out
}
