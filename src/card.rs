//! Card validity checker.
//! Pure functions over the raw card fields: Luhn check, brand detection,
//! CVV and expiry validation, masking. No state, no persistence.

use chrono::{Datelike, Utc};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Visa,
    Mastercard,
    Amex,
    Discover,
    Unknown,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Visa => "visa",
            CardType::Mastercard => "mastercard",
            CardType::Amex => "amex",
            CardType::Discover => "discover",
            CardType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct CardInput<'a> {
    pub number: &'a str,
    pub cvv: &'a str,
    pub expiry_month: u32,
    pub expiry_year: i32,
}

#[derive(Debug)]
pub struct CardValidation {
    pub valid: bool,
    pub card_type: CardType,
    pub masked_number: String,
    pub errors: Vec<String>,
}

impl CardValidation {
    /// Last four digits of the card, taken from the masked form.
    pub fn last_four(&self) -> &str {
        let len = self.masked_number.len();
        &self.masked_number[len.saturating_sub(4)..]
    }
}

fn digits(value: &str) -> String {
    value.chars().filter(|ch| ch.is_ascii_digit()).collect()
}

/// Luhn check over the card number; also rejects out-of-range lengths.
pub fn validate_card_number(number: &str) -> Result<(), String> {
    let cleaned = digits(number);

    if cleaned.len() < 13 || cleaned.len() > 19 {
        return Err("Invalid card length".to_string());
    }

    let mut sum = 0u32;
    let mut double = false;
    for ch in cleaned.chars().rev() {
        let mut digit = ch.to_digit(10).unwrap_or(0);
        if double {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
        double = !double;
    }

    if sum % 10 == 0 {
        Ok(())
    } else {
        Err("Invalid card number (Luhn check failed)".to_string())
    }
}

pub fn card_type(number: &str) -> CardType {
    let cleaned = digits(number);

    if cleaned.starts_with('4') {
        return CardType::Visa;
    }
    if matches!(cleaned.get(..2), Some("51" | "52" | "53" | "54" | "55")) {
        return CardType::Mastercard;
    }
    if matches!(cleaned.get(..2), Some("34" | "37")) {
        return CardType::Amex;
    }
    if cleaned.starts_with("6011")
        || (cleaned.starts_with("65") && cleaned.len() >= 4)
    {
        return CardType::Discover;
    }

    CardType::Unknown
}

/// Amex carries a 4-digit CVV, everything else 3.
pub fn validate_cvv(cvv: &str, card_type: CardType) -> Result<(), String> {
    let cleaned = digits(cvv);

    if card_type == CardType::Amex {
        if cleaned.len() == 4 {
            return Ok(());
        }
        return Err("Amex CVV must be 4 digits".to_string());
    }

    if cleaned.len() == 3 {
        Ok(())
    } else {
        Err("CVV must be 3 digits".to_string())
    }
}

pub fn validate_expiry(month: u32, year: i32) -> Result<(), String> {
    let now = Utc::now();
    validate_expiry_at(month, year, now.year(), now.month())
}

fn validate_expiry_at(
    month: u32,
    year: i32,
    current_year: i32,
    current_month: u32,
) -> Result<(), String> {
    if !(1..=12).contains(&month) {
        return Err("Invalid month".to_string());
    }

    if year < current_year || (year == current_year && month < current_month) {
        return Err("Card has expired".to_string());
    }

    Ok(())
}

/// Masks everything but the trailing four digits.
pub fn mask_number(number: &str) -> String {
    let cleaned = digits(number);
    let split = cleaned.len().saturating_sub(4);
    let masked: String = std::iter::repeat('*').take(split).collect();
    format!("{}{}", masked, &cleaned[split..])
}

pub fn validate_card(input: &CardInput<'_>) -> CardValidation {
    let card_type = card_type(input.number);
    let mut errors = Vec::new();

    if let Err(e) = validate_card_number(input.number) {
        errors.push(e);
    }
    if let Err(e) = validate_cvv(input.cvv, card_type) {
        errors.push(e);
    }
    if let Err(e) = validate_expiry(input.expiry_month, input.expiry_year) {
        errors.push(e);
    }

    CardValidation {
        valid: errors.is_empty(),
        card_type,
        masked_number: mask_number(input.number),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Standard test numbers, all Luhn-valid.
    const VISA: &str = "4111111111111111";
    const MASTERCARD: &str = "5500005555555559";
    const AMEX: &str = "378282246310005";
    const DISCOVER: &str = "6011111111111117";

    #[test]
    fn luhn_accepts_valid_numbers() {
        assert!(validate_card_number(VISA).is_ok());
        assert!(validate_card_number(MASTERCARD).is_ok());
        assert!(validate_card_number(AMEX).is_ok());
        assert!(validate_card_number("4111 1111 1111 1111").is_ok());
    }

    #[test]
    fn luhn_rejects_invalid_numbers() {
        assert_eq!(
            validate_card_number("4111111111111112"),
            Err("Invalid card number (Luhn check failed)".to_string())
        );
        assert_eq!(
            validate_card_number("411111"),
            Err("Invalid card length".to_string())
        );
        assert_eq!(
            validate_card_number("41111111111111111111"),
            Err("Invalid card length".to_string())
        );
    }

    #[test]
    fn detects_card_types() {
        assert_eq!(card_type(VISA), CardType::Visa);
        assert_eq!(card_type(MASTERCARD), CardType::Mastercard);
        assert_eq!(card_type(AMEX), CardType::Amex);
        assert_eq!(card_type(DISCOVER), CardType::Discover);
        assert_eq!(card_type("9999999999999999"), CardType::Unknown);
    }

    #[test]
    fn validates_cvv_length_per_brand() {
        assert!(validate_cvv("123", CardType::Visa).is_ok());
        assert!(validate_cvv("1234", CardType::Visa).is_err());
        assert!(validate_cvv("1234", CardType::Amex).is_ok());
        assert!(validate_cvv("123", CardType::Amex).is_err());
    }

    #[test]
    fn validates_expiry() {
        assert_eq!(
            validate_expiry_at(13, 2030, 2026, 8),
            Err("Invalid month".to_string())
        );
        assert_eq!(
            validate_expiry_at(0, 2030, 2026, 8),
            Err("Invalid month".to_string())
        );
        assert_eq!(
            validate_expiry_at(7, 2026, 2026, 8),
            Err("Card has expired".to_string())
        );
        assert_eq!(
            validate_expiry_at(12, 2025, 2026, 8),
            Err("Card has expired".to_string())
        );
        assert!(validate_expiry_at(8, 2026, 2026, 8).is_ok());
        assert!(validate_expiry_at(1, 2030, 2026, 8).is_ok());
    }

    #[test]
    fn masks_all_but_last_four() {
        assert_eq!(mask_number(VISA), "************1111");
        assert_eq!(mask_number("4111 1111 1111 1111"), "************1111");
    }

    #[test]
    fn full_validation_collects_errors() {
        let result = validate_card(&CardInput {
            number: "4111111111111112",
            cvv: "12",
            expiry_month: 13,
            expiry_year: 2030,
        });

        assert!(!result.valid);
        assert_eq!(result.card_type, CardType::Visa);
        assert_eq!(result.errors.len(), 3);
    }

    #[test]
    fn full_validation_passes_clean_card() {
        let result = validate_card(&CardInput {
            number: VISA,
            cvv: "123",
            expiry_month: 12,
            expiry_year: 2099,
        });

        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert_eq!(result.last_four(), "1111");
    }
}
