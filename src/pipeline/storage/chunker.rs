use super::types::{Chunker, TextChunk};
use crate::pipeline::extraction::parse_heading_line;

/// Section-aware chunker for source documents.
/// Splits at numbered headings first, then by paragraphs for large sections.
/// All budgets are in characters, so Hangul text never splits inside a code point.
pub struct SourceChunker {
    max_chunk_chars: usize,
    min_chunk_chars: usize,
    overlap_chars: usize,
}

impl SourceChunker {
    pub fn new() -> Self {
        Self {
            max_chunk_chars: 1000,
            min_chunk_chars: 20,
            overlap_chars: 100,
        }
    }
}

impl Default for SourceChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for SourceChunker {
    fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let mut chunks = Vec::new();
        let mut chunk_index = 0;

        for section in split_by_headings(text) {
            if char_len(&section.content) <= self.max_chunk_chars {
                chunks.push(TextChunk {
                    content: section.content,
                    chunk_index,
                    section_title: section.title,
                    char_offset: section.offset,
                });
                chunk_index += 1;
            } else {
                let sub_chunks = split_section_by_paragraphs(
                    &section.content,
                    &section.title,
                    section.offset,
                    self.max_chunk_chars,
                    self.overlap_chars,
                    &mut chunk_index,
                );
                chunks.extend(sub_chunks);
            }
        }

        merge_tiny_chunks(&mut chunks, self.min_chunk_chars);
        chunks
    }
}

struct SourceSection {
    title: Option<String>,
    content: String,
    offset: usize,
}

fn is_heading(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with("## ") || trimmed.starts_with("### ") || parse_heading_line(trimmed).is_some()
}

/// Headings stay at the top of their section so the chunk text carries its number.
fn split_by_headings(text: &str) -> Vec<SourceSection> {
    let mut sections = Vec::new();
    let mut current_title: Option<String> = None;
    let mut current_content = String::new();
    let mut current_offset = 0;
    let mut char_pos = 0;

    for line in text.lines() {
        if is_heading(line) {
            if !current_content.trim().is_empty() {
                sections.push(SourceSection {
                    title: current_title.take(),
                    content: current_content.trim().to_string(),
                    offset: current_offset,
                });
            }
            current_title = Some(line.trim().trim_start_matches('#').trim().to_string());
            current_content = String::new();
            current_offset = char_pos;
        }
        current_content.push_str(line);
        current_content.push('\n');
        char_pos += char_len(line) + 1;
    }

    if !current_content.trim().is_empty() {
        sections.push(SourceSection {
            title: current_title,
            content: current_content.trim().to_string(),
            offset: current_offset,
        });
    }

    sections
}

fn split_section_by_paragraphs(
    content: &str,
    title: &Option<String>,
    base_offset: usize,
    max_chars: usize,
    overlap: usize,
    chunk_index: &mut usize,
) -> Vec<TextChunk> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut char_offset = base_offset;

    for para in content.split("\n\n") {
        let para_len = char_len(para);

        // A single paragraph over budget is split at sentence boundaries
        if para_len > max_chars {
            if !current.trim().is_empty() {
                chunks.push(TextChunk {
                    content: current.trim().to_string(),
                    chunk_index: *chunk_index,
                    section_title: title.clone(),
                    char_offset,
                });
                *chunk_index += 1;
            }
            char_offset += char_len(&current);
            current.clear();

            let sub_chunks =
                split_long_paragraph(para, title, char_offset, max_chars, overlap, chunk_index);
            chunks.extend(sub_chunks);
            char_offset += para_len + 2;
            continue;
        }

        let current_len = char_len(&current);
        if current_len + para_len > max_chars && !current.trim().is_empty() {
            chunks.push(TextChunk {
                content: current.trim().to_string(),
                chunk_index: *chunk_index,
                section_title: title.clone(),
                char_offset,
            });
            *chunk_index += 1;

            if current_len > overlap {
                let overlap_start = current_len - overlap;
                current = current[byte_index(&current, overlap_start)..].to_string();
                char_offset += overlap_start;
            } else {
                char_offset += current_len;
                current.clear();
            }
        }

        current.push_str(para);
        current.push_str("\n\n");
    }

    if !current.trim().is_empty() {
        chunks.push(TextChunk {
            content: current.trim().to_string(),
            chunk_index: *chunk_index,
            section_title: title.clone(),
            char_offset,
        });
        *chunk_index += 1;
    }

    chunks
}

fn split_long_paragraph(
    para: &str,
    title: &Option<String>,
    base_offset: usize,
    max_chars: usize,
    overlap: usize,
    chunk_index: &mut usize,
) -> Vec<TextChunk> {
    let chars: Vec<char> = para.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + max_chars).min(chars.len());

        // Prefer a sentence end within the last 20% of the window
        let break_at = if end < chars.len() {
            let search_start = start + (max_chars * 4 / 5);
            (search_start..end.saturating_sub(1))
                .rev()
                .find(|&i| is_sentence_end(chars[i]) && chars[i + 1] == ' ')
                .map(|i| i + 2)
                .unwrap_or(end)
        } else {
            end
        };

        let piece: String = chars[start..break_at].iter().collect();
        chunks.push(TextChunk {
            content: piece.trim().to_string(),
            chunk_index: *chunk_index,
            section_title: title.clone(),
            char_offset: base_offset + start,
        });
        *chunk_index += 1;

        if break_at >= chars.len() {
            break;
        }

        start = if break_at > start + overlap {
            break_at - overlap
        } else {
            break_at
        };
    }

    chunks
}

fn is_sentence_end(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '。')
}

fn merge_tiny_chunks(chunks: &mut Vec<TextChunk>, min_chars: usize) {
    let mut i = 0;
    while i < chunks.len() {
        if char_len(&chunks[i].content) < min_chars && i + 1 < chunks.len() {
            let next = chunks.remove(i + 1);
            chunks[i].content.push_str("\n\n");
            chunks[i].content.push_str(&next.content);
            if chunks[i].section_title.is_none() {
                chunks[i].section_title = next.section_title;
            }
        } else {
            i += 1;
        }
    }

    for (i, chunk) in chunks.iter_mut().enumerate() {
        chunk.chunk_index = i;
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte index of the `n`th character (or the end of the string).
fn byte_index(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}
