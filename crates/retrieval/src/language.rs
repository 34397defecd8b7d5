//! Query language detection.

/// Language a query was asked in, which the answer must follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryLanguage {
    Arabic,
    English,
}

impl QueryLanguage {
    /// Detects the language from the letter mix: Arabic wins when more
    /// than half of the counted letters fall in the Arabic block.
    pub fn detect(text: &str) -> Self {
        let mut arabic = 0usize;
        let mut total = 0usize;
        for c in text.chars() {
            let in_arabic_block = ('\u{0600}'..='\u{06FF}').contains(&c);
            if in_arabic_block {
                arabic += 1;
                total += 1;
            } else if c.is_ascii_alphabetic() {
                total += 1;
            }
        }
        if total > 0 && arabic * 2 > total {
            QueryLanguage::Arabic
        } else {
            QueryLanguage::English
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            QueryLanguage::Arabic => "Arabic",
            QueryLanguage::English => "English",
        }
    }

    /// The stock reply for questions the statute does not cover.
    pub fn no_information_message(&self) -> &'static str {
        match self {
            QueryLanguage::Arabic => "لا تحتوي المستندات المتوفرة على هذه المعلومات.",
            QueryLanguage::English => "The provided documents do not contain this information.",
        }
    }
}
