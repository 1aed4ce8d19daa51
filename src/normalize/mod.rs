//! Article text normalization.
//!
//! [`Normalizer::clean`] turns raw article text into the lower-cased,
//! punctuation-free form written to `cleaned_content`. Numeric and
//! percentage mentions are replaced by [`Tokenizer`] tokens.
//!
//! The passes run in this order:
//!
//! 1. Collapse anything outside ASCII letters, digits, `%` `,` `.` `'` and
//!    space into a single space, then lower-case.
//! 2. Replace percentages (`65.5%`, `12 percent`, `3 per cent`).
//! 3. Replace the remaining bare numbers.
//! 4. Turn leftover `,` and `.` into spaces and drop `'`.
//! 5. Collapse whitespace and trim.
//!
//! Percentages must be handled before bare numbers, otherwise the number in
//! front of the `%` would be tokenized on its own and the suffix lost.

pub mod tokenizer;

pub use tokenizer::Tokenizer;

use crate::error::Result;
use once_cell::sync::Lazy;
use regex::Regex;

static NON_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9%,.' ]+").expect("valid regex"));

static PERCENTAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+(\d[\d,]*\.?[\d,]*)\s*(%|percent|per\s*cent)").expect("valid regex")
});

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+(\d[\d,]*\.?[\d,]*)").expect("valid regex"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Cleans article text using an injected [`Tokenizer`].
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    tokenizer: Tokenizer,
}

impl Normalizer {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self { tokenizer }
    }

    /// Produce the cleaned form of `raw`.
    ///
    /// # Errors
    ///
    /// Propagates [`crate::error::ScrapeError::Tokenize`] if a matched
    /// literal fails to parse. The number grammar makes that unreachable
    /// for well-formed input, so callers treat it as fatal.
    pub fn clean(&self, raw: &str) -> Result<String> {
        let text = NON_TEXT.replace_all(raw, " ").to_lowercase();
        let text = self.replace_literals(&PERCENTAGE, &text, true)?;
        let text = self.replace_literals(&NUMBER, &text, false)?;

        let text = text.replace([',', '.'], " ").replace('\'', "");
        Ok(WHITESPACE.replace_all(text.trim(), " ").into_owned())
    }

    /// Replace every match of `pattern` with its token, padded by spaces.
    /// Capture group 1 holds the numeric literal.
    fn replace_literals(&self, pattern: &Regex, text: &str, is_percentage: bool) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in pattern.captures_iter(text) {
            let (Some(whole), Some(literal)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&text[last..whole.start()]);
            out.push(' ');
            out.push_str(&self.tokenizer.tokenize(literal.as_str(), is_percentage)?);
            out.push(' ');
            last = whole.end();
        }
        out.push_str(&text[last..]);
        Ok(out)
    }
}
