//! Character vocabularies used by the docTR recognition models.
//!
//! The recognition heads predict one class per vocabulary character plus the
//! extra tokens of their decoding scheme, so the vocabulary order must match
//! the one the weights were trained with.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

const DIGITS: &str = "0123456789";
const ASCII_LETTERS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const PUNCTUATION: &str = r##"!"#$%&'()*+,-./:;<=>?@[\]^_`{|}~"##;
const CURRENCY: &str = "£€¥¢฿";

/// Name of the vocabulary every pretrained recognition model uses.
pub const DEFAULT_VOCAB: &str = "french";

static VOCABS: Lazy<BTreeMap<&'static str, String>> = Lazy::new(|| {
    let latin = format!("{DIGITS}{ASCII_LETTERS}{PUNCTUATION}");
    let english = format!("{latin}°{CURRENCY}");
    let legacy_french = format!("{latin}°àâéèêôûùçÀÂÉÈËÎÏÔÙÇ{CURRENCY}");
    let french = format!("{english}àâéèêëîïôùûüçÀÂÉÈÊËÎÏÔÙÛÜÇ");

    let mut vocabs = BTreeMap::new();
    vocabs.insert("digits", DIGITS.to_string());
    vocabs.insert("ascii_letters", ASCII_LETTERS.to_string());
    vocabs.insert("punctuation", PUNCTUATION.to_string());
    vocabs.insert("currency", CURRENCY.to_string());
    vocabs.insert("latin", latin);
    vocabs.insert("english", english);
    vocabs.insert("legacy_french", legacy_french);
    vocabs.insert("french", french);
    vocabs
});

/// Looks up a named vocabulary.
pub fn vocab(name: &str) -> Option<&'static str> {
    VOCABS.get(name).map(String::as_str)
}

/// Names of all known vocabularies.
pub fn vocab_names() -> impl Iterator<Item = &'static str> {
    VOCABS.keys().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin_is_digits_letters_punctuation() {
        let latin = vocab("latin").unwrap();
        assert_eq!(latin.chars().count(), 10 + 52 + 32);
        assert!(latin.starts_with("0123456789abc"));
    }

    #[test]
    fn test_french_extends_english() {
        let english = vocab("english").unwrap();
        let french = vocab("french").unwrap();
        assert!(french.starts_with(english));
        assert_eq!(english.chars().count(), 94 + 1 + 5);
        assert_eq!(french.chars().count(), 100 + 26);
        assert!(french.contains('€'));
        assert!(french.contains('Ü'));
    }

    #[test]
    fn test_unknown_vocab() {
        assert!(vocab("klingon").is_none());
        assert!(vocab_names().any(|n| n == DEFAULT_VOCAB));
    }
}
