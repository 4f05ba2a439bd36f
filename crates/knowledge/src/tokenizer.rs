//! Lexical tokenization for indexing and querying.

/// Turns text into index terms. The same tokenizer must be used to build an
/// index and to query it.
pub trait Tokenizer: Send + Sync {
    fn name(&self) -> &str;

    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Overlapping CJK bigrams plus whole ASCII alphanumeric words.
///
/// Input is lowercased. A run of ideographs yields every adjacent pair
/// (`临港城` → `临港`, `港城`); a lone ideograph yields nothing. ASCII runs of
/// two or more alphanumerics are kept whole. Anything else separates tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct CjkBigramTokenizer;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Class {
    Ideograph,
    Ascii,
    Other,
}

fn classify(c: char) -> Class {
    match c as u32 {
        0x4E00..=0x9FFF | 0x3400..=0x4DBF => Class::Ideograph,
        _ if c.is_ascii_alphanumeric() => Class::Ascii,
        _ => Class::Other,
    }
}

fn emit(class: Class, run: &[char], out: &mut Vec<String>) {
    match class {
        Class::Ideograph => out.extend(run.windows(2).map(|pair| pair.iter().collect::<String>())),
        Class::Ascii if run.len() >= 2 => out.push(run.iter().collect()),
        _ => {}
    }
}

impl Tokenizer for CjkBigramTokenizer {
    fn name(&self) -> &str {
        "cjk_bigram"
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut run: Vec<char> = Vec::new();
        let mut current = Class::Other;

        for c in text.to_lowercase().chars() {
            let class = classify(c);
            if class != current {
                emit(current, &run, &mut out);
                run.clear();
                current = class;
            }
            if class != Class::Other {
                run.push(c);
            }
        }
        emit(current, &run, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(text: &str) -> Vec<String> {
        CjkBigramTokenizer.tokenize(text)
    }

    #[test]
    fn cjk_runs_become_bigrams() {
        assert_eq!(tok("临港城"), vec!["临港", "港城"]);
        assert_eq!(tok("港区 补给"), vec!["港区", "补给"]);
    }

    #[test]
    fn single_ideographs_are_dropped() {
        assert!(tok("雨").is_empty());
        assert_eq!(tok("雨，港区"), vec!["港区"]);
    }

    #[test]
    fn ascii_words_are_lowercased_and_kept_whole() {
        assert_eq!(tok("Harbor-District 7 B2"), vec!["harbor", "district", "b2"]);
    }

    #[test]
    fn mixed_scripts_split_at_boundaries() {
        assert_eq!(tok("林秋ab港区"), vec!["林秋", "ab", "港区"]);
    }

    #[test]
    fn extension_a_ideographs_count() {
        assert_eq!(tok("\u{3400}\u{3401}"), vec!["\u{3400}\u{3401}"]);
    }
}
