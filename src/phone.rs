const MAX_PHONE_DIGITS: usize = 15;

/// Canonicalizes free-form phone strings into a digits-only,
/// country-code-prefixed form. Directory rows and incoming contacts go
/// through the same instance, so both sides agree on the equality key.
#[derive(Debug, Clone)]
pub struct PhoneNormalizer {
    country_code: String,
    trunk_prefix: String,
    subscriber_len: usize,
}

impl PhoneNormalizer {
    pub fn new(country_code: &str, trunk_prefix: &str, subscriber_len: usize) -> Self {
        Self {
            country_code: country_code.to_string(),
            trunk_prefix: trunk_prefix.to_string(),
            subscriber_len,
        }
    }

    /// Returns the canonical form, or None for strings that are not
    /// plausible phone numbers (too few or too many digits, row indices).
    pub fn normalize(&self, input: &str) -> Option<String> {
        let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();

        if digits.len() < self.subscriber_len || digits.len() > MAX_PHONE_DIGITS {
            return None;
        }

        let full_len = self.country_code.len() + self.subscriber_len;

        // Already has the country code: keep it plus the subscriber block.
        if digits.starts_with(&self.country_code) && digits.len() >= full_len {
            return Some(digits[..full_len].to_string());
        }

        // Domestic trunk prefix: drop it and substitute the country code.
        if digits.starts_with(&self.trunk_prefix)
            && digits.len() >= self.trunk_prefix.len() + self.subscriber_len
        {
            let rest = &digits[self.trunk_prefix.len()..];
            return Some(format!(
                "{}{}",
                self.country_code,
                &rest[..self.subscriber_len]
            ));
        }

        // Bare local subscriber number.
        if digits.len() == self.subscriber_len {
            return Some(format!("{}{}", self.country_code, digits));
        }

        // Anything longer in an unknown shape: keep the trailing subscriber
        // block, which survives hand-entered prefix variations.
        Some(format!(
            "{}{}",
            self.country_code,
            &digits[digits.len() - self.subscriber_len..]
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uz() -> PhoneNormalizer {
        PhoneNormalizer::new("998", "8", 9)
    }

    #[test]
    fn equivalent_spellings_share_one_canonical_form() {
        let normalizer = uz();
        let expected = Some("998901234567".to_string());

        assert_eq!(normalizer.normalize("+998 90 123-45-67"), expected);
        assert_eq!(normalizer.normalize("998901234567"), expected);
        assert_eq!(normalizer.normalize("8 (90) 123 45 67"), expected);
        assert_eq!(normalizer.normalize("901234567"), expected);
        assert_eq!(normalizer.normalize("(90) 123-45-67"), expected);
    }

    #[test]
    fn country_prefixed_numbers_are_truncated_to_the_subscriber_block() {
        let normalizer = uz();
        assert_eq!(
            normalizer.normalize("998901234567890"),
            Some("998901234567".to_string())
        );
    }

    #[test]
    fn trunk_prefix_is_replaced_by_the_country_code() {
        let normalizer = uz();
        assert_eq!(
            normalizer.normalize("8901234567"),
            Some("998901234567".to_string())
        );
    }

    #[test]
    fn unknown_long_shapes_keep_the_trailing_subscriber_digits() {
        let normalizer = uz();
        assert_eq!(
            normalizer.normalize("7901234567"),
            Some("998901234567".to_string())
        );
    }

    #[test]
    fn implausible_digit_counts_are_rejected() {
        let normalizer = uz();
        assert_eq!(normalizer.normalize(""), None);
        assert_eq!(normalizer.normalize("7"), None);
        assert_eq!(normalizer.normalize("123"), None);
        assert_eq!(normalizer.normalize("12345678"), None);
        assert_eq!(normalizer.normalize("1234567890123456"), None);
    }

    #[test]
    fn non_digit_noise_is_ignored() {
        let normalizer = uz();
        assert_eq!(
            normalizer.normalize("tel: +998-90-123-45-67 (office)"),
            Some("998901234567".to_string())
        );
    }
}
