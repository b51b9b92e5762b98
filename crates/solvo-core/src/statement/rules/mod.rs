//! Rule-based building blocks for statement field extraction.

pub mod numeral;
pub mod patterns;

pub use numeral::{format_spanish_amount, parse_spanish_amount, NumeralNormalizer, SpanishNumerals};
pub use patterns::*;
