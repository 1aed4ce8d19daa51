//! Numeric literal tokenizer.
//!
//! A literal such as `12,500` becomes `<ONE_TEN_THOUSAND>`: the word for its
//! most significant digit followed by its magnitude bucket. Only the leading
//! digit survives. Downstream text models see the scale of a figure, never
//! its exact value.

use crate::error::{Result, ScrapeError};

/// Word for each decimal digit, indexed by the digit.
const DIGIT_WORDS: [&str; 10] = [
    "ZERO", "ONE", "TWO", "THREE", "FOUR", "FIVE", "SIX", "SEVEN", "EIGHT", "NINE",
];

/// Magnitude thresholds, largest first. The scan stops at the first
/// threshold not exceeding the value.
const MAGNITUDES: [(u64, &str); 12] = [
    (1_000_000_000_000, "TRILLION"),
    (100_000_000_000, "HUNDRED_BILLION"),
    (10_000_000_000, "TEN_BILLION"),
    (1_000_000_000, "BILLION"),
    (100_000_000, "HUNDRED_MILLION"),
    (10_000_000, "TEN_MILLION"),
    (1_000_000, "MILLION"),
    (100_000, "HUNDRED_THOUSAND"),
    (10_000, "TEN_THOUSAND"),
    (1_000, "THOUSAND"),
    (100, "HUNDRED"),
    (10, "TEN"),
];

/// Turns numeric literals into bucket tokens.
///
/// The digit and magnitude tables are fixed at construction; a single
/// instance is shared by every normalization in a run.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    digits: [&'static str; 10],
    magnitudes: Vec<(u64, &'static str)>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self {
            digits: DIGIT_WORDS,
            magnitudes: MAGNITUDES.to_vec(),
        }
    }
}

impl Tokenizer {
    /// Tokenize `literal`, a number with optional `,` grouping and at most
    /// one decimal point. The fractional part is truncated toward zero.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::Tokenize`] when the literal is not a finite number.
    pub fn tokenize(&self, literal: &str, is_percentage: bool) -> Result<String> {
        let stripped = literal.replace(',', "");
        let value: f64 = stripped.trim().parse().map_err(|e: std::num::ParseFloatError| {
            ScrapeError::Tokenize {
                literal: literal.to_string(),
                reason: e.to_string(),
            }
        })?;
        if !value.is_finite() {
            return Err(ScrapeError::Tokenize {
                literal: literal.to_string(),
                reason: "not a finite number".to_string(),
            });
        }

        let whole = value.trunc();
        let mut token = String::new();
        if whole < 0.0 {
            token.push_str("NEGATIVE_");
        }

        // Read the leading digit off the decimal rendering so literals
        // beyond the integer range keep their real first digit.
        let leading = format!("{:.0}", whole.abs())
            .bytes()
            .next()
            .map_or(0, |b| usize::from(b - b'0'));
        token.push_str(self.digits[leading]);
        token.push('_');

        // Saturates above u64::MAX, which is still past the top threshold.
        if let Some(word) = self.magnitude(whole.abs() as u64) {
            token.push_str(word);
            if is_percentage {
                token.push('_');
            }
        }

        if is_percentage {
            token.push_str("PERCENT");
        }

        Ok(format!("<{}>", token.trim()))
    }

    fn magnitude(&self, abs: u64) -> Option<&'static str> {
        self.magnitudes
            .iter()
            .find(|(threshold, _)| abs >= *threshold)
            .map(|(_, word)| *word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(literal: &str, pct: bool) -> String {
        Tokenizer::default().tokenize(literal, pct).unwrap()
    }

    #[test]
    fn test_grouped_number() {
        assert_eq!(tok("12,500", false), "<ONE_TEN_THOUSAND>");
        assert_eq!(tok("1,00,000", false), "<ONE_HUNDRED_THOUSAND>");
    }

    #[test]
    fn test_percentage_with_fraction() {
        assert_eq!(tok("65.5", true), "<SIX_TEN_PERCENT>");
        assert_eq!(tok("0.4", true), "<ZERO_PERCENT>");
    }

    #[test]
    fn test_single_digit_has_no_magnitude() {
        assert_eq!(tok("5", false), "<FIVE_>");
        assert_eq!(tok("5", true), "<FIVE_PERCENT>");
        assert_eq!(tok("9.99", false), "<NINE_>");
    }

    #[test]
    fn test_thresholds_resolve_to_larger_bucket() {
        assert_eq!(tok("10", false), "<ONE_TEN>");
        assert_eq!(tok("99", false), "<NINE_TEN>");
        assert_eq!(tok("100", false), "<ONE_HUNDRED>");
        assert_eq!(tok("1000000", false), "<ONE_MILLION>");
        assert_eq!(tok("1,000,000,000,000", false), "<ONE_TRILLION>");
        assert_eq!(tok("45,000,000,000,000", false), "<FOUR_TRILLION>");
    }

    #[test]
    fn test_huge_literal_keeps_leading_digit() {
        assert_eq!(tok("12,345,678,901,234,567,890,123", false), "<ONE_TRILLION>");
        assert_eq!(tok("98765432109876543210987654321", true), "<NINE_TRILLION_PERCENT>");
    }

    #[test]
    fn test_negative_number() {
        assert_eq!(tok("-2500", false), "<NEGATIVE_TWO_THOUSAND>");
        assert_eq!(tok("-3", true), "<NEGATIVE_THREE_PERCENT>");
    }

    #[test]
    fn test_trailing_separators_are_tolerated() {
        assert_eq!(tok("12,", false), "<ONE_TEN>");
        assert_eq!(tok("12.", false), "<ONE_TEN>");
    }

    #[test]
    fn test_token_depends_only_on_bucket() {
        assert_eq!(tok("3,141", false), tok("3999.9", false));
        assert_ne!(tok("3,141", false), tok("4,141", false));
        assert_ne!(tok("3,141", false), tok("31,410", false));
    }

    #[test]
    fn test_tokens_contain_no_digits() {
        for literal in ["0", "7", "42", "12,500", "65.5", "1,234,567,890"] {
            let token = tok(literal, false);
            assert!(!token.chars().any(|c| c.is_ascii_digit()), "{token}");
        }
    }

    #[test]
    fn test_invalid_literal_is_an_error() {
        let tokenizer = Tokenizer::default();
        assert!(matches!(
            tokenizer.tokenize("abc", false),
            Err(ScrapeError::Tokenize { .. })
        ));
        assert!(tokenizer.tokenize(",", false).is_err());
        assert!(tokenizer.tokenize("inf", true).is_err());
    }
}
