// src/codec/bundle.rs
//! Groth16 proof / verifying key / public inputs in the portable JSON format
//! (`pi_a`, `vk_alpha_1`, `IC`, `vk_alphabeta_12`, ...).

use ark_ec::pairing::Pairing;
use ark_ff::{Field, PrimeField};
use ark_groth16::{Proof, VerifyingKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::bigint::{format_field, format_integer, parse_field_vec, parse_integer};
use super::points::{decode_g1, decode_g2, encode_g1, encode_g2};
use crate::curves::InterchangeCurve;
use crate::error::{Error, Result};

pub const PROTOCOL: &str = "groth16";

/// Inner proof, the key it verifies against, and its public inputs.
#[derive(Clone, Debug, PartialEq)]
pub struct ProofBundle<E: Pairing> {
    pub proof: Proof<E>,
    pub verifying_key: VerifyingKey<E>,
    pub public_inputs: Vec<E::ScalarField>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofJson {
    #[serde(rename = "piA", alias = "pi_a")]
    pub pi_a: Vec<String>,
    #[serde(rename = "piB", alias = "pi_b")]
    pub pi_b: Vec<Vec<String>>,
    #[serde(rename = "piC", alias = "pi_c")]
    pub pi_c: Vec<String>,
    pub protocol: String,
    pub curve: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyingKeyJson {
    pub protocol: String,
    pub curve: String,
    #[serde(rename = "nPublic")]
    pub n_public: usize,
    pub vk_alpha_1: Vec<String>,
    pub vk_beta_2: Vec<Vec<String>>,
    pub vk_gamma_2: Vec<Vec<String>>,
    pub vk_delta_2: Vec<Vec<String>>,
    #[serde(rename = "IC")]
    pub ic: Vec<Vec<String>>,
    /// e(alpha, beta); consumers may ignore it, but it is always exact.
    pub vk_alphabeta_12: Vec<Vec<Vec<String>>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleJson {
    pub proof: ProofJson,
    pub verifying_key: VerifyingKeyJson,
    pub public_inputs: Vec<String>,
}

// ---------------------------------------------------------------------------
// encoding

pub fn encode_public_inputs<F: PrimeField>(inputs: &[F]) -> Vec<String> {
    inputs.iter().map(format_field).collect()
}

pub fn encode_proof<C: InterchangeCurve>(proof: &Proof<C::Engine>) -> Result<ProofJson> {
    Ok(ProofJson {
        pi_a: encode_g1(&proof.a)?,
        pi_b: encode_g2(&proof.b)?,
        pi_c: encode_g1(&proof.c)?,
        protocol: PROTOCOL.to_string(),
        curve: C::NAME.to_string(),
    })
}

/// Encode `vk` for a statement with `n_public` public inputs.
///
/// With no public inputs the IC vector is cut down to its constant term,
/// even if the key carries more entries.
pub fn encode_verifying_key<C: InterchangeCurve>(
    vk: &VerifyingKey<C::Engine>,
    n_public: usize,
) -> Result<VerifyingKeyJson> {
    let mut ic = vk
        .gamma_abc_g1
        .iter()
        .map(encode_g1)
        .collect::<Result<Vec<_>>>()?;
    if n_public == 0 && ic.len() > 1 {
        ic.truncate(1);
    }
    if ic.len() != n_public + 1 {
        return Err(Error::InvalidArguments(format!(
            "verifying key has {} IC entries for {n_public} public inputs",
            ic.len()
        )));
    }

    Ok(VerifyingKeyJson {
        protocol: PROTOCOL.to_string(),
        curve: C::NAME.to_string(),
        n_public,
        vk_alpha_1: encode_g1(&vk.alpha_g1)?,
        vk_beta_2: encode_g2(&vk.beta_g2)?,
        vk_gamma_2: encode_g2(&vk.gamma_g2)?,
        vk_delta_2: encode_g2(&vk.delta_g2)?,
        ic,
        vk_alphabeta_12: compute_pairing_product::<C::Engine>(vk.alpha_g1, vk.beta_g2),
    })
}

pub fn encode_bundle<C: InterchangeCurve>(bundle: &ProofBundle<C::Engine>) -> Result<BundleJson> {
    Ok(BundleJson {
        proof: encode_proof::<C>(&bundle.proof)?,
        verifying_key: encode_verifying_key::<C>(
            &bundle.verifying_key,
            bundle.public_inputs.len(),
        )?,
        public_inputs: encode_public_inputs(&bundle.public_inputs),
    })
}

/// `e(alpha, beta)` laid out as `[2][3][k]` decimal strings.
///
/// The target field is a quadratic extension of a cubic extension of a
/// field of degree `k` over the base prime field: `k = 2` for BLS12 curves,
/// `k = 1` for BW6-761.
pub fn compute_pairing_product<E: Pairing>(
    alpha: E::G1Affine,
    beta: E::G2Affine,
) -> Vec<Vec<Vec<String>>> {
    let gt = E::pairing(alpha, beta).0;
    let coeffs: Vec<String> = gt
        .to_base_prime_field_elements()
        .map(|c| format_field(&c))
        .collect();
    let k = coeffs.len() / 6;
    coeffs
        .chunks(3 * k)
        .map(|half| half.chunks(k).map(|c| c.to_vec()).collect())
        .collect()
}

// ---------------------------------------------------------------------------
// decoding

fn parse_document(json: &str, what: &str) -> Result<Value> {
    serde_json::from_str(json).map_err(|_| Error::malformed(what))
}

/// Fetch `names[0]` (or one of its aliases) with the expected nested shape.
fn field<T: DeserializeOwned>(obj: &Value, names: &[&str]) -> Result<T> {
    let v = names
        .iter()
        .find_map(|n| obj.get(*n))
        .ok_or_else(|| Error::malformed(names[0]))?;
    serde_json::from_value(v.clone()).map_err(|_| Error::malformed(names[0]))
}

fn check_protocol(obj: &Value) -> Result<()> {
    match obj.get("protocol") {
        None => Ok(()),
        Some(Value::String(p)) if p == PROTOCOL => Ok(()),
        Some(_) => Err(Error::malformed("protocol")),
    }
}

fn decode_proof_value<C: InterchangeCurve>(obj: &Value) -> Result<Proof<C::Engine>> {
    check_protocol(obj)?;
    let a: Vec<String> = field(obj, &["pi_a", "piA"])?;
    let b: Vec<Vec<String>> = field(obj, &["pi_b", "piB"])?;
    let c: Vec<String> = field(obj, &["pi_c", "piC"])?;
    Ok(Proof {
        a: decode_g1::<C::G1>(&a, "pi_a")?,
        b: decode_g2::<C::G2>(&b, "pi_b")?,
        c: decode_g1::<C::G1>(&c, "pi_c")?,
    })
}

fn decode_verifying_key_value<C: InterchangeCurve>(
    obj: &Value,
) -> Result<(VerifyingKey<C::Engine>, Option<usize>)> {
    check_protocol(obj)?;
    let alpha: Vec<String> = field(obj, &["vk_alpha_1"])?;
    let beta: Vec<Vec<String>> = field(obj, &["vk_beta_2"])?;
    let gamma: Vec<Vec<String>> = field(obj, &["vk_gamma_2"])?;
    let delta: Vec<Vec<String>> = field(obj, &["vk_delta_2"])?;
    let ic: Vec<Vec<String>> = field(obj, &["IC"])?;
    let n_public: Option<usize> = match obj.get("nPublic") {
        None => None,
        Some(_) => Some(field(obj, &["nPublic"])?),
    };

    if ic.is_empty() || n_public.is_some_and(|n| ic.len() != n + 1) {
        return Err(Error::malformed("IC"));
    }

    let vk = VerifyingKey {
        alpha_g1: decode_g1::<C::G1>(&alpha, "vk_alpha_1")?,
        beta_g2: decode_g2::<C::G2>(&beta, "vk_beta_2")?,
        gamma_g2: decode_g2::<C::G2>(&gamma, "vk_gamma_2")?,
        delta_g2: decode_g2::<C::G2>(&delta, "vk_delta_2")?,
        gamma_abc_g1: ic
            .iter()
            .map(|p| decode_g1::<C::G1>(p, "IC"))
            .collect::<Result<Vec<_>>>()?,
    };

    if obj.get("vk_alphabeta_12").is_some() {
        let given: Vec<Vec<Vec<String>>> = field(obj, &["vk_alphabeta_12"])?;
        let expected = compute_pairing_product::<C::Engine>(vk.alpha_g1, vk.beta_g2);
        if canonical_gt(&given)? != expected {
            return Err(Error::malformed("vk_alphabeta_12"));
        }
    }

    Ok((vk, n_public))
}

fn canonical_gt(v: &[Vec<Vec<String>>]) -> Result<Vec<Vec<Vec<String>>>> {
    v.iter()
        .map(|row| {
            row.iter()
                .map(|cell| {
                    cell.iter()
                        .map(|s| {
                            parse_integer(s)
                                .map(|n| format_integer(&n))
                                .map_err(|_| Error::malformed("vk_alphabeta_12"))
                        })
                        .collect()
                })
                .collect()
        })
        .collect()
}

fn decode_public_inputs_value<F: PrimeField>(v: &Value) -> Result<Vec<F>> {
    let values: Vec<String> =
        serde_json::from_value(v.clone()).map_err(|_| Error::malformed("public_inputs"))?;
    parse_field_vec(&values)
}

pub fn decode_proof<C: InterchangeCurve>(json: &str) -> Result<Proof<C::Engine>> {
    decode_proof_value::<C>(&parse_document(json, "proof")?)
}

/// Returns the key and the declared `nPublic`, if any.
pub fn decode_verifying_key<C: InterchangeCurve>(
    json: &str,
) -> Result<(VerifyingKey<C::Engine>, Option<usize>)> {
    decode_verifying_key_value::<C>(&parse_document(json, "verifying_key")?)
}

/// A JSON array of decimal or `0x`-hex strings.
pub fn decode_public_inputs<F: PrimeField>(json: &str) -> Result<Vec<F>> {
    decode_public_inputs_value(&parse_document(json, "public_inputs")?)
}

pub fn decode_bundle<C: InterchangeCurve>(json: &str) -> Result<ProofBundle<C::Engine>> {
    let doc = parse_document(json, "bundle")?;
    let proof_obj = doc.get("proof").ok_or_else(|| Error::malformed("proof"))?;
    let vk_obj = doc
        .get("verifying_key")
        .ok_or_else(|| Error::malformed("verifying_key"))?;
    let inputs = doc
        .get("public_inputs")
        .ok_or_else(|| Error::malformed("public_inputs"))?;

    let proof = decode_proof_value::<C>(proof_obj)?;
    let (verifying_key, _) = decode_verifying_key_value::<C>(vk_obj)?;
    let public_inputs = decode_public_inputs_value(inputs)?;

    if verifying_key.gamma_abc_g1.len() != public_inputs.len() + 1 {
        return Err(Error::malformed("IC"));
    }
    Ok(ProofBundle { proof, verifying_key, public_inputs })
}
