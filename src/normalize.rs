//! Plate-text normalization.
//!
//! OCR backends return raw strings with whatever spacing, punctuation and
//! separator noise the engine saw. Every consumer downstream of OCR (the
//! dedup throttle, the registry lookup, log lines, image file names) works
//! on the normalized form, so the same physical plate read as "AB-12 C3" or
//! "AB12C3" collapses to one identity.

/// Strip a raw OCR string down to its alphanumeric characters.
///
/// Order and case are preserved; everything else (whitespace, punctuation,
/// symbols) is dropped. Applying the function twice returns the same string
/// as applying it once. An input with no alphanumeric characters yields the
/// empty string, which callers treat as "no plate read".
pub fn normalize(raw: &str) -> String {
    raw.chars().filter(|c| c.is_alphanumeric()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_separators_and_whitespace() {
        assert_eq!(normalize("AB-12 C3!"), "AB12C3");
        assert_eq!(normalize("  kn 07 kh 1122  "), "kn07kh1122");
    }

    #[test]
    fn preserves_order_and_case() {
        assert_eq!(normalize("aA1-bB2"), "aA1bB2");
    }

    #[test]
    fn idempotent() {
        let once = normalize("PL-8\tT E*S+T");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn non_alphanumeric_input_yields_empty() {
        assert_eq!(normalize("--- ~!! .."), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn keeps_unicode_letters_and_digits() {
        // Matches the semantics of char::is_alphanumeric rather than ASCII-only.
        assert_eq!(normalize("ÅB-12"), "ÅB12");
    }
}
