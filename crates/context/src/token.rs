//! Token estimation.
//!
//! A deliberately cheap proxy: one token per two characters, never less
//! than one. It is not a tokenizer count and is only used to compare
//! buckets against their budget.

use serde::Serialize;

pub fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() / 2).max(1)
}

/// Estimate over the compact JSON rendering of a value.
pub fn estimate_json_tokens<T: Serialize + ?Sized>(value: &T) -> usize {
    let json = serde_json::to_string(value).unwrap_or_default();
    estimate_tokens(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_string_is_one_token() {
        assert_eq!(estimate_tokens(""), 1);
    }

    #[test]
    fn counts_characters_not_bytes() {
        // 10 CJK characters, 30 bytes
        assert_eq!(estimate_tokens("临港城有三层港区雨季"), 5);
    }

    #[test]
    fn odd_lengths_round_down() {
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn json_rendering_is_measured() {
        // `[]` is two characters
        assert_eq!(estimate_json_tokens(&json!([])), 1);
        // `{"a":"bcdefgh"}` is 15 characters
        assert_eq!(estimate_json_tokens(&json!({"a": "bcdefgh"})), 7);
    }
}
