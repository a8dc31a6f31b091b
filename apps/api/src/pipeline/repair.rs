//! Text Repair — fixes character-level damage left behind by PDF text
//! extraction: glyphs spaced out into single-letter tokens and stray
//! whitespace in front of punctuation. Pure and idempotent; line breaks are
//! preserved for the structurer.

const PUNCTUATION: &[char] = &[',', '.', ';', ':', '!', '?'];

/// Repairs raw extracted text line by line.
pub fn repair(raw: &str) -> String {
    raw.lines()
        .map(repair_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn repair_line(line: &str) -> String {
    let mut current = merge_spaced_glyphs(line);
    // Fixed-point iteration: a merge can put two single glyphs next to a gap
    // that was not mergeable before.
    loop {
        let next = merge_spaced_glyphs(&current);
        if next == current {
            break;
        }
        current = next;
    }
    strip_space_before_punctuation(&current)
}

/// Collapses a whitespace run when the token on each side of it is a single
/// alphanumeric character. `"H e l l o"` becomes `"Hello"`; `"Hello world"`
/// is left alone because both neighbours are multi-character words.
fn merge_spaced_glyphs(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_whitespace() {
            let start = i;
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            if !(single_glyph_ends_at(&chars, start) && single_glyph_starts_at(&chars, i)) {
                out.extend(chars[start..i].iter());
            }
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }

    out
}

/// True when the character just before `idx` is alphanumeric and stands alone.
fn single_glyph_ends_at(chars: &[char], idx: usize) -> bool {
    if idx == 0 || !chars[idx - 1].is_alphanumeric() {
        return false;
    }
    idx < 2 || !chars[idx - 2].is_alphanumeric()
}

/// True when the character at `idx` is alphanumeric and stands alone.
fn single_glyph_starts_at(chars: &[char], idx: usize) -> bool {
    if idx >= chars.len() || !chars[idx].is_alphanumeric() {
        return false;
    }
    idx + 1 >= chars.len() || !chars[idx + 1].is_alphanumeric()
}

fn strip_space_before_punctuation(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_whitespace() {
            let start = i;
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            let before_punctuation = i < chars.len() && PUNCTUATION.contains(&chars[i]);
            if !before_punctuation {
                out.extend(chars[start..i].iter());
            }
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merges_spaced_out_glyphs() {
        assert_eq!(repair("H e l l o   w o r l d"), "Helloworld");
        assert_eq!(repair("J o h n   D o e"), "JohnDoe");
        assert_eq!(repair("2 0 1 9 - 2 0 2 3"), "2019 - 2023");
    }

    #[test]
    fn test_leaves_normal_prose_intact() {
        assert_eq!(repair("Hello world, friend."), "Hello world, friend.");
        assert_eq!(
            repair("Senior Engineer at Acme since 2019"),
            "Senior Engineer at Acme since 2019"
        );
    }

    #[test]
    fn test_strips_whitespace_before_punctuation() {
        assert_eq!(repair("Hello world , friend ."), "Hello world, friend.");
        assert_eq!(repair("Skills : Rust ; Go"), "Skills: Rust; Go");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "H e l l o   w o r l d",
            "Hello world , friend .",
            "EXPERIENCE\nSenior Engineer  2019 - 2023\nAcme Inc",
            "",
            "a b cd e f",
        ];
        for sample in samples {
            let once = repair(sample);
            assert_eq!(repair(&once), once, "repair not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_preserves_line_breaks() {
        let text = "J o h n   D o e\nEXPERIENCE\n- Built things";
        assert_eq!(repair(text), "JohnDoe\nEXPERIENCE\n- Built things");
    }

    #[test]
    fn test_mixed_glyph_and_word_gaps() {
        // Only the single-glyph gaps merge; the word gaps survive.
        assert_eq!(repair("ab c d ef"), "ab cd ef");
    }
}
