//! Regex fragments shared by the statement field rules.

use lazy_static::lazy_static;
use regex::Regex;

/// Optional separator between a label and its value: `:`, `-` or `–`.
pub const SEPARATOR: &str = r"\s*[:\-–]?\s*";

/// Same as [`SEPARATOR`] but lazy, so a following sign binds to the numeral.
pub const LAZY_SEPARATOR: &str = r"\s*[:\-–]??\s*";

/// Maximal run of digits and grouping characters.
pub const NUMERAL: &str = r"([0-9.,]+)";

/// [`NUMERAL`] with one optional leading sign.
pub const SIGNED_NUMERAL: &str = r"([+-]?[0-9.,]+)";

/// Whatever token follows a label, numeral or not.
pub const ANY_TOKEN: &str = r"(\S*)";

lazy_static! {
    // Spanish numeral once thousands separators are gone: 1234567,89
    pub static ref ES_NUMERAL_SHAPE: Regex = Regex::new(
        r"^[+-]?[0-9]*(?:,[0-9]*)?$"
    ).unwrap();
}

/// Case-insensitive regex source for `label` followed by `tail`.
pub fn labeled(label: &str, separator: &str, tail: &str) -> String {
    format!("(?i)(?:{}){}{}", label, separator, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeral_shape() {
        assert!(ES_NUMERAL_SHAPE.is_match("1234567,89"));
        assert!(ES_NUMERAL_SHAPE.is_match("-120,5"));
        assert!(ES_NUMERAL_SHAPE.is_match("0"));
        assert!(!ES_NUMERAL_SHAPE.is_match("1,2,3"));
        assert!(!ES_NUMERAL_SHAPE.is_match("12a"));
        assert!(!ES_NUMERAL_SHAPE.is_match("--1"));
    }

    #[test]
    fn test_signed_value_prefers_sign_over_separator() {
        let re = Regex::new(&labeled("Resultado", LAZY_SEPARATOR, SIGNED_NUMERAL)).unwrap();
        assert_eq!(&re.captures("Resultado -1.000").unwrap()[1], "-1.000");
        assert_eq!(&re.captures("Resultado - 1.000").unwrap()[1], "1.000");
        assert_eq!(&re.captures("resultado: -5,00").unwrap()[1], "-5,00");
    }
}
