//! Password strength scoring.

use serde::Serialize;

use super::MIN_PASSWORD_LENGTH;

const ALL_MET_MESSAGE: &str = "Password meets all requirements";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum StrengthLabel {
    Weak,
    Fair,
    Good,
    Strong,
    #[serde(rename = "Very Strong")]
    VeryStrong,
}

impl StrengthLabel {
    pub fn from_score(score: u8) -> Self {
        match score {
            0 | 1 => StrengthLabel::Weak,
            2 => StrengthLabel::Fair,
            3 => StrengthLabel::Good,
            4 => StrengthLabel::Strong,
            _ => StrengthLabel::VeryStrong,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrengthLabel::Weak => "Weak",
            StrengthLabel::Fair => "Fair",
            StrengthLabel::Good => "Good",
            StrengthLabel::Strong => "Strong",
            StrengthLabel::VeryStrong => "Very Strong",
        }
    }
}

/// Derived strength of a password. Never cached; recompute from the field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PasswordStrength {
    pub score: u8,
    pub label: StrengthLabel,
    pub feedback: Vec<String>,
    pub has_min_length: bool,
    pub has_uppercase: bool,
    pub has_lowercase: bool,
    pub has_digit: bool,
    pub has_symbol: bool,
}

/// Score a password against the five criteria, in fixed order:
/// length, uppercase, lowercase, digit, symbol.
pub fn password_strength(password: &str) -> PasswordStrength {
    let has_min_length = password.chars().count() >= MIN_PASSWORD_LENGTH;
    let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lowercase = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace());

    let criteria = [
        (has_min_length, "At least 8 characters"),
        (has_uppercase, "One uppercase letter"),
        (has_lowercase, "One lowercase letter"),
        (has_digit, "One number"),
        (has_symbol, "One special character"),
    ];

    let score = criteria.iter().filter(|(met, _)| *met).count() as u8;
    let mut feedback: Vec<String> = criteria
        .iter()
        .filter(|(met, _)| !*met)
        .map(|(_, name)| (*name).to_string())
        .collect();
    if feedback.is_empty() {
        feedback.push(ALL_MET_MESSAGE.to_string());
    }

    PasswordStrength {
        score,
        label: StrengthLabel::from_score(score),
        feedback,
        has_min_length,
        has_uppercase,
        has_lowercase,
        has_digit,
        has_symbol,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected_score(p: &str) -> u8 {
        let s = password_strength(p);
        [s.has_min_length, s.has_uppercase, s.has_lowercase, s.has_digit, s.has_symbol]
            .iter()
            .filter(|b| **b)
            .count() as u8
    }

    #[test]
    fn test_score_counts_criteria() {
        for p in ["", "a", "A", "1", "!", "abcdefgh", "Abcdefg1", "Abcdef1!", "ÄÖÜ äöü", "pass word"] {
            let s = password_strength(p);
            assert_eq!(s.score, expected_score(p), "password {:?}", p);
            assert_eq!(s, password_strength(p), "stable for {:?}", p);
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(password_strength("").label, StrengthLabel::Weak);
        assert_eq!(password_strength("a").label, StrengthLabel::Weak);
        assert_eq!(password_strength("aB").label, StrengthLabel::Fair);
        assert_eq!(password_strength("aB1").label, StrengthLabel::Good);
        assert_eq!(password_strength("aB1!").label, StrengthLabel::Strong);
        assert_eq!(password_strength("aB1!aB1!").label, StrengthLabel::VeryStrong);
        assert_eq!(StrengthLabel::VeryStrong.as_str(), "Very Strong");
    }

    #[test]
    fn test_feedback_order_and_all_met() {
        let weak = password_strength("a");
        assert_eq!(
            weak.feedback,
            vec![
                "At least 8 characters",
                "One uppercase letter",
                "One number",
                "One special character",
            ]
        );

        let strong = password_strength("Sup3r$ecret");
        assert_eq!(strong.score, 5);
        assert_eq!(strong.feedback, vec![ALL_MET_MESSAGE]);
    }

    #[test]
    fn test_whitespace_is_not_a_symbol() {
        assert!(!password_strength("pass word").has_symbol);
        assert!(password_strength("pass_word").has_symbol);
    }

    #[test]
    fn test_accented_letters_are_not_symbols() {
        let s = password_strength("Passwörd1");
        assert!(!s.has_symbol);
        assert_eq!(s.score, 4);
        assert_eq!(s.label, StrengthLabel::Strong);
        assert_eq!(s.feedback, vec!["One special character"]);
        assert!(!password_strength("ÄÖÜéè").has_symbol);
    }
}
