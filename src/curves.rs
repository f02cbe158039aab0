// src/curves.rs
//! The 2-chain used for composition: Groth16 over BLS12-377 is verified
//! inside a Groth16 circuit over BW6-761, whose scalar field is BLS12-377's
//! base field.

use ark_bls12_377::Bls12_377;
use ark_bw6_761::BW6_761;
use ark_ec::pairing::Pairing;
use ark_ec::short_weierstrass::{Affine, SWCurveConfig};

pub type InnerCurve = Bls12_377;
pub type InnerFr = ark_bls12_377::Fr;

pub type OuterCurve = BW6_761;
pub type OuterFr = ark_bw6_761::Fr;

/// A pairing engine as seen by the JSON interchange format.
pub trait InterchangeCurve {
    type Engine: Pairing<G1Affine = Affine<Self::G1>, G2Affine = Affine<Self::G2>>;
    type G1: SWCurveConfig;
    type G2: SWCurveConfig;

    /// Name used in the `curve` field and in output file names.
    const NAME: &'static str;
}

pub struct Bls12_377Curve;

impl InterchangeCurve for Bls12_377Curve {
    type Engine = Bls12_377;
    type G1 = ark_bls12_377::g1::Config;
    type G2 = ark_bls12_377::g2::Config;
    const NAME: &'static str = "bls12377";
}

pub struct Bw6_761Curve;

impl InterchangeCurve for Bw6_761Curve {
    type Engine = BW6_761;
    type G1 = ark_bw6_761::g1::Config;
    type G2 = ark_bw6_761::g2::Config;
    const NAME: &'static str = "bw6761";
}

pub type Inner = Bls12_377Curve;
pub type Outer = Bw6_761Curve;
