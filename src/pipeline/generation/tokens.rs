/// Latin-script text averages ~4 chars/token for BPE tokenizers.
const CHARS_PER_TOKEN_LATIN: usize = 4;
/// Hangul syllables split into far more tokens per character.
const CHARS_PER_TOKEN_HANGUL: usize = 2;

fn is_hangul(c: char) -> bool {
    matches!(c, '\u{AC00}'..='\u{D7A3}' | '\u{1100}'..='\u{11FF}' | '\u{3130}'..='\u{318F}')
}

/// True when at least 30% of the visible characters are Hangul.
pub fn is_hangul_heavy(text: &str) -> bool {
    let (hangul, visible) = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .fold((0usize, 0usize), |(h, v), c| (h + is_hangul(c) as usize, v + 1));
    visible > 0 && hangul * 10 >= visible * 3
}

/// Estimate the token count of `text`.
pub fn count_tokens(text: &str) -> usize {
    let ratio = if is_hangul_heavy(text) {
        CHARS_PER_TOKEN_HANGUL
    } else {
        CHARS_PER_TOKEN_LATIN
    };
    text.chars().count().div_ceil(ratio)
}

/// Accumulated tokens may reach this share of the ceiling before generation pauses.
pub fn token_budget(max_token_limit: usize) -> usize {
    max_token_limit * 9 / 10
}
