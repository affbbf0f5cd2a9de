use base64::{engine::general_purpose, Engine as _};
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::config::LoggerConfig;

mod patterns {
    #![allow(clippy::expect_used)]

    use lazy_static::lazy_static;
    use regex::Regex;

    lazy_static! {
        pub(super) static ref EMAIL_REGEX: Regex =
            Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("email pattern");
        // +254712345678, +254 712 345 678, 0712345678
        pub(super) static ref PHONE_REGEX: Regex =
            Regex::new(r"\+\d{1,3}(?:[\s-]?\d{2,4}){2,4}\b|\b0\d{9}\b").expect("phone pattern");
    }
}

use patterns::{EMAIL_REGEX, PHONE_REGEX};

/// PII redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub hash_for_correlation: bool,
    pub custom_patterns: Vec<(Regex, String)>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_phones: true,
            hash_for_correlation: true,
            custom_patterns: Vec::new(),
        }
    }
}

impl RedactionConfig {
    /// Configuration that leaves text untouched
    pub fn disabled() -> Self {
        Self {
            redact_emails: false,
            redact_phones: false,
            hash_for_correlation: false,
            custom_patterns: Vec::new(),
        }
    }
}

impl From<&LoggerConfig> for RedactionConfig {
    fn from(config: &LoggerConfig) -> Self {
        if config.redaction_enabled {
            Self {
                hash_for_correlation: config.hash_for_correlation,
                ..Self::default()
            }
        } else {
            Self::disabled()
        }
    }
}

/// PII redactor for log messages
#[derive(Debug, Clone, Default)]
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_emails {
            result = self.redact_emails(&result);
        }

        if self.config.redact_phones {
            result = self.redact_phones(&result);
        }

        for (pattern, replacement) in &self.config.custom_patterns {
            result = pattern.replace_all(&result, replacement.as_str()).to_string();
        }

        result
    }

    /// Redact an optional contact field, rendering absent values as `-`
    pub fn redact_contact(&self, value: Option<&str>) -> String {
        value.map_or_else(|| "-".to_string(), |v| self.redact(v))
    }

    fn redact_emails(&self, text: &str) -> String {
        EMAIL_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                let email = caps.get(0).map_or("", |m| m.as_str());
                if self.config.hash_for_correlation {
                    format!("EMAIL[{}]", Self::hash_value(email))
                } else {
                    match email.split_once('@') {
                        Some((local, domain)) => {
                            format!("{}***@{}***", first_char(local), first_char(domain))
                        }
                        None => "***@***".to_string(),
                    }
                }
            })
            .to_string()
    }

    fn redact_phones(&self, text: &str) -> String {
        PHONE_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                let phone = caps.get(0).map_or("", |m| m.as_str());
                if self.config.hash_for_correlation {
                    format!("PHONE[{}]", Self::hash_value(phone))
                } else {
                    let digits: Vec<char> = phone.chars().filter(char::is_ascii_digit).collect();
                    let tail: String = digits.iter().rev().take(3).rev().collect();
                    format!("***{tail}")
                }
            })
            .to_string()
    }

    fn hash_value(value: &str) -> String {
        let digest = Sha256::digest(value.as_bytes());
        // first 8 bytes keep the tag short
        general_purpose::STANDARD.encode(digest.iter().take(8).copied().collect::<Vec<u8>>())
    }
}

fn first_char(value: &str) -> String {
    value.chars().next().map(String::from).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn masking_redactor() -> PiiRedactor {
        PiiRedactor::new(RedactionConfig {
            hash_for_correlation: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_email_redaction() {
        let redacted = masking_redactor().redact("Member jane.wanjiku@example.co.ke enrolled");
        assert!(redacted.contains("j***@e***"));
        assert!(!redacted.contains("wanjiku"));
    }

    #[test]
    fn test_phone_redaction() {
        let redactor = masking_redactor();
        assert_eq!(redactor.redact("call 0712345678"), "call ***678");
        assert!(!redactor.redact("call +254 712 345 678").contains("712 345"));
    }

    #[test]
    fn test_dates_and_member_numbers_are_kept() {
        let text = "member LCT/2024/0001 from 2024-01-01 to 2024-12-31";
        assert_eq!(masking_redactor().redact(text), text);
    }

    #[test]
    fn test_hash_is_stable_for_correlation() {
        let redactor = PiiRedactor::default();
        let first = redactor.redact("jane@example.com");
        let second = redactor.redact("jane@example.com");
        assert!(first.starts_with("EMAIL["));
        assert_eq!(first, second);
    }

    #[test]
    fn test_disabled_config_is_passthrough() {
        let redactor = PiiRedactor::new(RedactionConfig::disabled());
        assert_eq!(redactor.redact("jane@example.com"), "jane@example.com");
        assert_eq!(redactor.redact_contact(None), "-");
    }
}
