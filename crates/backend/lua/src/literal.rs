//! Canonical literal formatting.
//!
//! Numbers are decided from their exact rational value, never from the
//! source text: an integral value inside the target's integer range keeps
//! its base family (binary normalizes to hex, which every target version
//! reads), everything else becomes the shortest decimal text that parses
//! back to the nearest IEEE-754 binary64. Strings are re-escaped into one
//! canonical double-quoted form that round-trips the exact byte sequence
//! through the target's own string grammar.

use rhizome_sedge_ast::{Base, Config, NumberLiteral};

/// Canonical text of a numeric literal for the configured target.
pub(crate) fn number(lit: &NumberLiteral, config: &Config) -> String {
    if lit.is_integral() {
        if let Some(text) = integer_text(lit, config) {
            return text;
        }
    }
    // LiteralRangeFallback: out-of-range and fractional values silently
    // reformat as floats.
    let value = match lit.base {
        Base::Dec => decimal_value(lit),
        Base::Hex | Base::Bin => binary_value(lit),
    };
    let text = double_text(value);
    if lit.negative && value != 0.0 {
        format!("-{text}")
    } else {
        text
    }
}

/// Largest magnitude the target still reads back as the written integer.
///
/// From 5.3 on, decimal constants beyond `i64::MAX` read as floats while hex
/// constants wrap within the 64-bit pattern. Older versions only have the
/// contiguous integer range of doubles.
fn integer_limit(base: Base, config: &Config) -> u128 {
    if config.has_native_integers() {
        match base {
            Base::Dec => i64::MAX as u128,
            Base::Hex | Base::Bin => u64::MAX as u128,
        }
    } else {
        1 << 53
    }
}

fn integer_text(lit: &NumberLiteral, config: &Config) -> Option<String> {
    let magnitude = exact_integer(lit)?;
    if magnitude > integer_limit(lit.base, config) {
        return None;
    }
    let sign = if lit.negative && magnitude != 0 { "-" } else { "" };
    let text = match lit.base {
        Base::Dec => format!("{sign}{magnitude}"),
        Base::Hex | Base::Bin => format!("{sign}0x{magnitude:x}"),
    };
    Some(text)
}

/// Exact magnitude of an integral literal, or None when it exceeds u128.
fn exact_integer(lit: &NumberLiteral) -> Option<u128> {
    let radix = match lit.base {
        Base::Dec => 10u128,
        Base::Hex => 16,
        Base::Bin => 2,
    };
    let mut value: u128 = 0;
    for c in lit.int_digits.chars().chain(lit.frac_digits.chars()) {
        let d = c.to_digit(radix as u32)?;
        value = value.checked_mul(radix)?.checked_add(u128::from(d))?;
    }
    if value == 0 {
        return Some(0);
    }

    // Undo the fractional shift, then apply the exponent. The division side
    // is exact because the caller established integrality.
    let step = match lit.base {
        Base::Dec => 10u128,
        Base::Hex | Base::Bin => 2,
    };
    let per_digit = i64::from(lit.base.bits_per_digit().max(1));
    let scale = i64::from(lit.exponent.unwrap_or(0))
        - per_digit * lit.frac_digits.chars().count() as i64;
    if scale >= 0 {
        for _ in 0..scale {
            value = value.checked_mul(step)?;
        }
    } else {
        for _ in 0..-scale {
            if value % step != 0 {
                return None;
            }
            value /= step;
        }
    }
    Some(value)
}

/// Nearest double of a decimal literal. The standard library parser is
/// correctly rounded, so the reassembled text goes straight through it.
fn decimal_value(lit: &NumberLiteral) -> f64 {
    let int = if lit.int_digits.is_empty() {
        "0"
    } else {
        &lit.int_digits
    };
    let frac = if lit.frac_digits.is_empty() {
        "0"
    } else {
        &lit.frac_digits
    };
    let exp = lit.exponent.unwrap_or(0);
    let text = format!("{int}.{frac}e{exp}");
    // The text is well formed by construction; overflow parses as infinity.
    text.parse().unwrap_or(f64::INFINITY)
}

/// Nearest double of a hex or binary literal, computed exactly: collect the
/// significant bits, round to 53 (fewer near the subnormal floor) with a
/// sticky bit and half-to-even, then assemble the bit pattern.
fn binary_value(lit: &NumberLiteral) -> f64 {
    let k = lit.base.bits_per_digit();
    let mut bits = Vec::with_capacity(
        (lit.int_digits.len() + lit.frac_digits.len()) * k as usize,
    );
    for c in lit.int_digits.chars().chain(lit.frac_digits.chars()) {
        let d = c.to_digit(16).unwrap_or(0);
        for i in (0..k).rev() {
            bits.push(d >> i & 1 == 1);
        }
    }
    let Some(first) = bits.iter().position(|&b| b) else {
        return 0.0;
    };
    let lsb_weight = i64::from(lit.exponent.unwrap_or(0))
        - i64::from(k) * lit.frac_digits.chars().count() as i64;
    let msb_exp = lsb_weight + (bits.len() - 1 - first) as i64;
    round_bits(&bits[first..], msb_exp)
}

/// Round a significand (leading bit set, weight `2^msb_exp`) to binary64.
fn round_bits(sig: &[bool], mut msb_exp: i64) -> f64 {
    if msb_exp > 1023 {
        return f64::INFINITY;
    }
    if msb_exp < -1075 {
        return 0.0;
    }
    // Subnormals keep fewer bits; at -1075 none survive and only the round
    // and sticky bits decide between zero and the smallest subnormal.
    let p = if msb_exp >= -1022 {
        53
    } else {
        (msb_exp + 1075) as usize
    };
    let mut mant: u64 = 0;
    for i in 0..p {
        mant = (mant << 1) | u64::from(sig.get(i).copied().unwrap_or(false));
    }
    let round = sig.get(p).copied().unwrap_or(false);
    let sticky = sig.len() > p + 1 && sig[p + 1..].iter().any(|&b| b);
    if round && (sticky || mant & 1 == 1) {
        mant += 1;
        if p == 53 && mant == 1 << 53 {
            mant >>= 1;
            msb_exp += 1;
            if msb_exp > 1023 {
                return f64::INFINITY;
            }
        }
    }
    let bits = if msb_exp >= -1022 {
        ((msb_exp + 1023) as u64) << 52 | (mant & ((1u64 << 52) - 1))
    } else {
        // Subnormal pattern; a carry into bit 52 is exactly the smallest
        // normal, which the encoding absorbs on its own.
        mant
    };
    f64::from_bits(bits)
}

/// Shortest decimal text that parses back to exactly `value` (non-negative).
///
/// Plain notation inside the `[-4, 16)` decimal-exponent window, scientific
/// with a signed two-digit-minimum exponent outside it. Values past the
/// binary64 range print as `1e+999`, which every target reads as infinity.
fn double_text(value: f64) -> String {
    if value.is_infinite() {
        return "1e+999".to_string();
    }
    if value == 0.0 {
        return "0.0".to_string();
    }
    let sci = format!("{value:e}");
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    if (-4..16).contains(&exp) {
        let digits: String = mantissa.chars().filter(|&c| c != '.').collect();
        plain_text(&digits, exp)
    } else {
        format!("{mantissa}e{exp:+03}")
    }
}

fn plain_text(digits: &str, exp: i32) -> String {
    if exp < 0 {
        let zeros = "0".repeat((-exp - 1) as usize);
        return format!("0.{zeros}{digits}");
    }
    let point = exp as usize + 1;
    if digits.len() <= point {
        let zeros = "0".repeat(point - digits.len());
        // Keep the literal a float: the digits alone would read back as an
        // integer on 5.3+.
        format!("{digits}{zeros}.0")
    } else {
        format!("{}.{}", &digits[..point], &digits[point..])
    }
}

/// Canonical double-quoted form of a string literal's exact bytes.
///
/// Printable ASCII stays literal, the named escapes cover the usual control
/// characters, and everything else becomes a fixed-width decimal escape so
/// the output is ASCII-clean and version-independent.
pub(crate) fn string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');
    for &b in bytes {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            0x07 => out.push_str("\\a"),
            0x08 => out.push_str("\\b"),
            b'\t' => out.push_str("\\t"),
            b'\n' => out.push_str("\\n"),
            0x0b => out.push_str("\\v"),
            0x0c => out.push_str("\\f"),
            b'\r' => out.push_str("\\r"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\{b:03}")),
        }
    }
    out.push('"');
    out
}
