// src/codec/points.rs
//! Curve points <-> interchange arrays.
//!
//! G1 is written as `[x, y, "1"]` and G2 as `[[x0, x1], [y0, y1], ["1", "0"]]`.
//! The homogeneous slot is fixed: only affine, non-identity points travel
//! through this format.

use ark_ec::short_weierstrass::{Affine, SWCurveConfig};
use ark_ff::{Field, Zero};
use num_bigint::BigUint;

use super::bigint::{format_integer, parse_field, parse_integer};
use crate::error::{Error, Result};

type BasePrime<P> = <<P as ark_ec::CurveConfig>::BaseField as Field>::BasePrimeField;

/// The only view of a curve point the encoder relies on.
pub trait AffineCoordinates {
    /// Base-prime-field components of `x` and `y`, real part first.
    /// `None` for the identity.
    fn affine_coordinates(&self) -> Option<(Vec<BigUint>, Vec<BigUint>)>;

    fn is_identity(&self) -> bool;
}

impl<P: SWCurveConfig> AffineCoordinates for Affine<P> {
    fn affine_coordinates(&self) -> Option<(Vec<BigUint>, Vec<BigUint>)> {
        if self.infinity {
            return None;
        }
        let components = |f: &P::BaseField| -> Vec<BigUint> {
            f.to_base_prime_field_elements().map(|c| c.into()).collect()
        };
        Some((components(&self.x), components(&self.y)))
    }

    fn is_identity(&self) -> bool {
        self.infinity
    }
}

pub fn encode_g1<A: AffineCoordinates>(p: &A) -> Result<Vec<String>> {
    let (x, y) = p.affine_coordinates().ok_or(Error::NilPoint("G1"))?;
    if x.len() != 1 || y.len() != 1 {
        return Err(Error::InvalidArguments(format!(
            "G1 point over an extension of degree {}",
            x.len()
        )));
    }
    Ok(vec![format_integer(&x[0]), format_integer(&y[0]), "1".to_string()])
}

pub fn encode_g2<A: AffineCoordinates>(p: &A) -> Result<Vec<Vec<String>>> {
    let (x, y) = p.affine_coordinates().ok_or(Error::NilPoint("G2"))?;
    if x.len() > 2 || y.len() != x.len() {
        return Err(Error::InvalidArguments(format!(
            "G2 point over an extension of degree {}",
            x.len()
        )));
    }
    // A G2 over the prime field still occupies two slots.
    let pair = |c: &[BigUint]| -> Vec<String> {
        let mut out: Vec<String> = c.iter().map(format_integer).collect();
        out.resize(2, "0".to_string());
        out
    };
    Ok(vec![pair(&x), pair(&y), vec!["1".to_string(), "0".to_string()]])
}

fn is_one(s: &str) -> bool {
    parse_integer(s).is_ok_and(|n| n == BigUint::from(1u8))
}

fn is_zero(s: &str) -> bool {
    parse_integer(s).is_ok_and(|n| n == BigUint::zero())
}

fn decode_coordinate<P: SWCurveConfig>(parts: &[String], field: &str) -> Result<P::BaseField> {
    let degree = <P::BaseField as Field>::extension_degree() as usize;
    if parts.len() < degree || parts[degree..].iter().any(|s| !is_zero(s)) {
        return Err(Error::malformed(field));
    }
    let elems = parts[..degree]
        .iter()
        .map(|s| parse_field::<BasePrime<P>>(s).map_err(|_| Error::malformed(field)))
        .collect::<Result<Vec<_>>>()?;
    <P::BaseField as Field>::from_base_prime_field_elems(elems)
        .ok_or_else(|| Error::malformed(field))
}

fn checked_point<P: SWCurveConfig>(
    x: P::BaseField,
    y: P::BaseField,
    field: &str,
) -> Result<Affine<P>> {
    let p = Affine::<P>::new_unchecked(x, y);
    if !p.is_on_curve() || !p.is_in_correct_subgroup_assuming_on_curve() {
        return Err(Error::malformed(field));
    }
    Ok(p)
}

pub fn decode_g1<P: SWCurveConfig>(v: &[String], field: &str) -> Result<Affine<P>> {
    if v.len() != 3 || !is_one(&v[2]) {
        return Err(Error::malformed(field));
    }
    let x = decode_coordinate::<P>(&v[0..1], field)?;
    let y = decode_coordinate::<P>(&v[1..2], field)?;
    checked_point(x, y, field)
}

pub fn decode_g2<P: SWCurveConfig>(v: &[Vec<String>], field: &str) -> Result<Affine<P>> {
    if v.len() != 3 || v[2].len() != 2 || !is_one(&v[2][0]) || !is_zero(&v[2][1]) {
        return Err(Error::malformed(field));
    }
    if v[0].len() != 2 || v[1].len() != 2 {
        return Err(Error::malformed(field));
    }
    let x = decode_coordinate::<P>(&v[0], field)?;
    let y = decode_coordinate::<P>(&v[1], field)?;
    checked_point(x, y, field)
}
