// src/codec/bigint.rs
//! Decimal / `0x`-hex integer strings, the numeric interchange format.

use ark_ff::PrimeField;
use num_bigint::BigUint;

use crate::error::{Error, ParseErrorKind, Result};

/// Parse a non-negative integer. Strings starting with exactly `0x` are read
/// as base 16, everything else as base 10.
pub fn parse_integer(s: &str) -> Result<BigUint> {
    let (digits, radix, kind) = match s.strip_prefix("0x") {
        Some(hex) => (hex, 16, ParseErrorKind::InvalidHex),
        None => (s, 10, ParseErrorKind::InvalidDecimal),
    };
    let err = || Error::Parse { kind, input: s.to_string() };

    // num-bigint tolerates `+` and `_`; the interchange format does not.
    let well_formed = !digits.is_empty()
        && digits.bytes().all(|b| match radix {
            16 => b.is_ascii_hexdigit(),
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return Err(err());
    }
    BigUint::parse_bytes(digits.as_bytes(), radix).ok_or_else(err)
}

/// Parse and reduce modulo the field prime.
pub fn parse_field<F: PrimeField>(s: &str) -> Result<F> {
    parse_integer(s).map(F::from)
}

/// Parse an ordered list; the error names the index of the first bad entry.
pub fn parse_field_vec<F: PrimeField>(values: &[String]) -> Result<Vec<F>> {
    values
        .iter()
        .enumerate()
        .map(|(i, s)| {
            parse_field(s).map_err(|e| match e {
                Error::Parse { kind, input } => {
                    Error::Parse { kind, input: format!("[{i}] {input}") }
                }
                other => other,
            })
        })
        .collect()
}

/// Canonical base-10 rendering.
pub fn format_integer(n: &BigUint) -> String {
    n.to_str_radix(10)
}

pub fn format_field<F: PrimeField>(f: &F) -> String {
    let n: BigUint = (*f).into();
    format_integer(&n)
}
