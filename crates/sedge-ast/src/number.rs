//! Numeric literal data model.
//!
//! Literals keep the exact digits the frontend saw. Whether a literal can be
//! emitted as a target integer is a property of its exact rational value, so
//! the decision is derived here from digits, base, and exponent without ever
//! rounding through a float.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Radix of a numeric literal as written in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Base {
    Dec,
    Hex,
    Bin,
}

impl Base {
    /// Bits contributed by one fractional digit, for the power-of-two bases.
    /// Zero for decimal, whose digits carry no fixed bit width.
    pub fn bits_per_digit(self) -> u32 {
        match self {
            Base::Dec => 0,
            Base::Hex => 4,
            Base::Bin => 1,
        }
    }

    fn digit_value(self, c: char) -> Option<u32> {
        let radix = match self {
            Base::Dec => 10,
            Base::Hex => 16,
            Base::Bin => 2,
        };
        c.to_digit(radix)
    }
}

/// A numeric literal, decomposed but not yet converted.
///
/// `int_digits` and `frac_digits` are the digit runs around the radix point,
/// lowercase, with no prefix and no sign. The exponent scales by a power of
/// ten for decimal literals and a power of two for hex and binary literals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberLiteral {
    pub negative: bool,
    pub base: Base,
    pub int_digits: String,
    pub frac_digits: String,
    pub exponent: Option<i32>,
}

/// Failure to decompose a literal's text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NumberError {
    #[error("numeric literal has no digits")]
    NoDigits,
    #[error("invalid character {0:?} in numeric literal")]
    InvalidChar(char),
    #[error("numeric literal exponent has no digits")]
    EmptyExponent,
    #[error("numeric literal exponent out of range")]
    ExponentOverflow,
}

impl NumberLiteral {
    /// True when every digit is zero.
    pub fn is_zero(&self) -> bool {
        self.int_digits
            .bytes()
            .chain(self.frac_digits.bytes())
            .all(|b| b == b'0')
    }

    /// True when the literal's exact value is an integer.
    ///
    /// Derived by trimming trailing zero digits (or zero bits, for the
    /// power-of-two bases) against the exponent scale.
    pub fn is_integral(&self) -> bool {
        if self.is_zero() {
            return true;
        }
        let exp = i64::from(self.exponent.unwrap_or(0));
        match self.base {
            Base::Dec => {
                // value = digits * 10^(exp - frac.len())
                let mut scale = exp - self.frac_digits.len() as i64;
                for b in self
                    .int_digits
                    .bytes()
                    .chain(self.frac_digits.bytes())
                    .rev()
                {
                    if b != b'0' {
                        break;
                    }
                    scale += 1;
                }
                scale >= 0
            }
            Base::Hex | Base::Bin => {
                // value = digits * 2^(exp - k * frac.len())
                let k = self.base.bits_per_digit();
                let mut scale = exp - i64::from(k) * self.frac_digits.len() as i64;
                for b in self
                    .int_digits
                    .bytes()
                    .chain(self.frac_digits.bytes())
                    .rev()
                {
                    if b == b'0' {
                        scale += i64::from(k);
                    } else {
                        let digit = (b as char).to_digit(16).unwrap_or(0);
                        scale += i64::from(digit.trailing_zeros().min(k));
                        break;
                    }
                }
                scale >= 0
            }
        }
    }
}

impl FromStr for NumberLiteral {
    type Err = NumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rest = s;
        let negative = match rest.strip_prefix('-') {
            Some(r) => {
                rest = r;
                true
            }
            None => false,
        };
        let base = if let Some(r) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
            rest = r;
            Base::Hex
        } else if let Some(r) = rest.strip_prefix("0b").or_else(|| rest.strip_prefix("0B")) {
            rest = r;
            Base::Bin
        } else {
            Base::Dec
        };

        let mut chars = rest.chars().peekable();
        let mut int_digits = String::new();
        let mut frac_digits = String::new();
        while let Some(&c) = chars.peek() {
            if base.digit_value(c).is_some() {
                int_digits.push(c.to_ascii_lowercase());
                chars.next();
            } else {
                break;
            }
        }
        if chars.peek() == Some(&'.') {
            chars.next();
            while let Some(&c) = chars.peek() {
                if base.digit_value(c).is_some() {
                    frac_digits.push(c.to_ascii_lowercase());
                    chars.next();
                } else {
                    break;
                }
            }
        }
        if int_digits.is_empty() && frac_digits.is_empty() {
            return Err(match chars.next() {
                Some(c) => NumberError::InvalidChar(c),
                None => NumberError::NoDigits,
            });
        }

        let marker = match base {
            Base::Dec => ['e', 'E'],
            Base::Hex | Base::Bin => ['p', 'P'],
        };
        let mut exponent = None;
        if chars.peek().is_some_and(|c| marker.contains(c)) {
            chars.next();
            let mut text = String::new();
            if let Some(&c) = chars.peek() {
                if c == '+' || c == '-' {
                    if c == '-' {
                        text.push('-');
                    }
                    chars.next();
                }
            }
            while let Some(&c) = chars.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            if text.is_empty() || text == "-" {
                return Err(NumberError::EmptyExponent);
            }
            let value: i32 = text.parse().map_err(|_| NumberError::ExponentOverflow)?;
            exponent = Some(value);
        }

        if let Some(c) = chars.next() {
            return Err(NumberError::InvalidChar(c));
        }
        Ok(NumberLiteral {
            negative,
            base,
            int_digits,
            frac_digits,
            exponent,
        })
    }
}

impl fmt::Display for NumberLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-")?;
        }
        match self.base {
            Base::Dec => {}
            Base::Hex => write!(f, "0x")?,
            Base::Bin => write!(f, "0b")?,
        }
        write!(f, "{}", self.int_digits)?;
        if !self.frac_digits.is_empty() {
            write!(f, ".{}", self.frac_digits)?;
        }
        if let Some(e) = self.exponent {
            let marker = match self.base {
                Base::Dec => 'e',
                Base::Hex | Base::Bin => 'p',
            };
            write!(f, "{marker}{e}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(s: &str) -> NumberLiteral {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_decimal() {
        let n = lit("42");
        assert_eq!(n.base, Base::Dec);
        assert_eq!(n.int_digits, "42");
        assert_eq!(n.frac_digits, "");
        assert_eq!(n.exponent, None);
        assert!(!n.negative);

        let n = lit("-3.25e-2");
        assert!(n.negative);
        assert_eq!(n.int_digits, "3");
        assert_eq!(n.frac_digits, "25");
        assert_eq!(n.exponent, Some(-2));
    }

    #[test]
    fn test_parse_hex_and_bin() {
        let n = lit("0xFF");
        assert_eq!(n.base, Base::Hex);
        assert_eq!(n.int_digits, "ff");

        let n = lit("0x1.8p1");
        assert_eq!(n.frac_digits, "8");
        assert_eq!(n.exponent, Some(1));

        let n = lit("0b11.11p2");
        assert_eq!(n.base, Base::Bin);
        assert_eq!(n.int_digits, "11");
        assert_eq!(n.frac_digits, "11");
        assert_eq!(n.exponent, Some(2));
    }

    #[test]
    fn test_parse_bare_fraction() {
        let n = lit(".5");
        assert_eq!(n.int_digits, "");
        assert_eq!(n.frac_digits, "5");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<NumberLiteral>(), Err(NumberError::NoDigits));
        assert_eq!("0x".parse::<NumberLiteral>(), Err(NumberError::NoDigits));
        assert_eq!(
            "12q".parse::<NumberLiteral>(),
            Err(NumberError::InvalidChar('q'))
        );
        assert_eq!(
            "1e".parse::<NumberLiteral>(),
            Err(NumberError::EmptyExponent)
        );
        assert_eq!(
            "1e99999999999".parse::<NumberLiteral>(),
            Err(NumberError::ExponentOverflow)
        );
    }

    #[test]
    fn test_integral_decimal() {
        assert!(lit("3").is_integral());
        assert!(lit("3.0").is_integral());
        assert!(lit("3.000").is_integral());
        assert!(lit("1e2").is_integral());
        assert!(lit("1.5e1").is_integral());
        assert!(lit("0.0").is_integral());
        assert!(!lit("0.1").is_integral());
        assert!(!lit("1e-1").is_integral());
        assert!(!lit("3.5").is_integral());
    }

    #[test]
    fn test_integral_power_of_two() {
        assert!(lit("0x10").is_integral());
        assert!(lit("0x1.8p1").is_integral()); // 3
        assert!(lit("0b11.11p2").is_integral()); // 15
        assert!(lit("0x1.8p3").is_integral()); // 12
        assert!(!lit("0x1.8").is_integral()); // 1.5
        assert!(!lit("0x3.5").is_integral());
        assert!(!lit("0xffffffffffffffff.001").is_integral());
        assert!(!lit("0b1p-1").is_integral()); // 0.5
        assert!(lit("0b10p-1").is_integral()); // 1
    }

    #[test]
    fn test_display_round_trip() {
        for s in ["42", "-3.25e-2", "0x1.8p1", "0b11.11p2", "0xff"] {
            assert_eq!(lit(s).to_string().parse::<NumberLiteral>(), Ok(lit(s)));
        }
    }
}
