// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Token estimation used to gate requests before they hit the network.

/// Average characters per token for English-heavy text and code.
pub const CHARS_PER_TOKEN: usize = 4;

/// Approximate token count for `text`: `ceil(chars / 4)`.
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count();
    chars.div_ceil(CHARS_PER_TOKEN).min(u32::MAX as usize) as u32
}

/// Whether `text` fits under a token ceiling.
pub fn fits_budget(text: &str, max_tokens: u32) -> bool {
    estimate_tokens(text) <= max_tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_string_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn test_rounds_up() {
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
        assert_eq!(estimate_tokens("abcdefghi"), 3);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // 4 chars, 8 bytes
        assert_eq!(estimate_tokens("éééé"), 1);
    }

    #[test]
    fn test_fits_budget_boundary() {
        let text = "x".repeat(40);
        assert!(fits_budget(&text, 10));
        assert!(!fits_budget(&text, 9));
    }

    #[test]
    fn test_matches_formula() {
        for len in 0..64 {
            let text = "y".repeat(len);
            let expected = (len as f64 / 4.0).ceil() as u32;
            assert_eq!(estimate_tokens(&text), expected, "len = {}", len);
        }
    }
}
