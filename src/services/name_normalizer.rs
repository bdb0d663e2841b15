use unicode_normalization::UnicodeNormalization;

const PATH_SEPARATORS: &[char] = &['/', '\\'];

/// Maps a folder label to the key used for all folder equality decisions.
///
/// Two labels name the same folder iff their keys are equal. Decorative
/// prefixes (emoji, bullets, arrows) and whitespace noise do not affect the key.
pub fn normalize(label: &str) -> String {
    let folded: String = label.nfkc().collect::<String>().to_lowercase();
    let trimmed = folded.trim().trim_matches(PATH_SEPARATORS);
    let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .trim_end_matches(PATH_SEPARATORS)
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decorated_variants_share_a_key() {
        assert_eq!(normalize("💻 Technology"), normalize("🧑‍💻 technology "));
        assert_eq!(normalize("💻 Technology"), "technology");
        assert_eq!(normalize("  Web   Dev "), normalize("web dev"));
        assert_eq!(normalize("/News/"), "news");
        assert_eq!(normalize("→ Recipes"), normalize("• recipes"));
    }

    #[test]
    fn different_words_stay_distinct() {
        assert_ne!(normalize("💻 Technology"), normalize("tech nology"));
        assert_ne!(normalize("C++"), normalize("C"));
    }

    #[test]
    fn compatibility_forms_fold() {
        // Fullwidth letters and ligatures.
        assert_eq!(normalize("ＲＵＳＴ"), "rust");
        assert_eq!(normalize("ﬁnance"), "finance");
    }

    #[test]
    fn is_deterministic_and_total() {
        for label in ["", "   ", "🎉", "Coding", "über Straße", "123 Numbers"] {
            assert_eq!(normalize(label), normalize(label));
        }
        assert_eq!(normalize("🎉🎉"), "");
        assert_eq!(normalize("123 Numbers"), "123 numbers");
    }
}
