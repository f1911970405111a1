//! Query and document text normalization
//!
//! Normalization is part of the embedding contract: the same logical text
//! must always map to the same vector and the same cache key. The pipeline
//! applies NFKC, lowercases, collapses internal whitespace and trims.

use unicode_normalization::UnicodeNormalization;

/// Normalize a piece of text for embedding and cache-key purposes.
///
/// Idempotent: `normalize_text(normalize_text(t)) == normalize_text(t)`.
pub fn normalize_text(text: &str) -> String {
    let nfkc: String = text.nfkc().collect();
    let lowered = nfkc.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_space = false;
    for part in lowered.split_whitespace() {
        if pending_space {
            out.push(' ');
        }
        out.push_str(part);
        pending_space = true;
    }
    out
}

/// Split normalized text into scoring tokens.
///
/// Expects already-normalized input; keeps alphanumeric runs only.
pub fn tokenize(normalized: &str) -> Vec<String> {
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_lowercases() {
        assert_eq!(normalize_text("  Hello   World \t"), "hello world");
    }

    #[test]
    fn applies_nfkc() {
        // Fullwidth "ＡＢＣ" folds to ascii under NFKC
        assert_eq!(normalize_text("ＡＢＣ"), "abc");
    }

    #[test]
    fn normalization_is_idempotent() {
        let raw = "  Ｐayment\u{00A0}Processing  SERVICE ";
        let once = normalize_text(raw);
        assert_eq!(normalize_text(&once), once);
    }

    #[test]
    fn tokenize_splits_on_non_alphanumeric() {
        assert_eq!(
            tokenize("process-payment v2"),
            vec!["process", "payment", "v2"]
        );
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(normalize_text(""), "");
        assert!(tokenize("").is_empty());
    }
}
