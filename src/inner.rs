// src/inner.rs
//! Native Groth16 over the inner curve.

use ark_groth16::{Groth16, Proof, ProvingKey, VerifyingKey};
use ark_relations::r1cs::ConstraintSynthesizer;
use ark_snark::SNARK;
use ark_std::rand::{CryptoRng, RngCore};

use crate::curves::{InnerCurve, InnerFr};
use crate::error::{Error, Result};

pub fn setup<C: ConstraintSynthesizer<InnerFr>, R: RngCore + CryptoRng>(
    circuit: C,
    rng: &mut R,
) -> Result<(ProvingKey<InnerCurve>, VerifyingKey<InnerCurve>)> {
    Groth16::<InnerCurve>::circuit_specific_setup(circuit, rng).map_err(Error::SetupFailed)
}

pub fn prove<C: ConstraintSynthesizer<InnerFr>, R: RngCore + CryptoRng>(
    pk: &ProvingKey<InnerCurve>,
    circuit: C,
    rng: &mut R,
) -> Result<Proof<InnerCurve>> {
    Groth16::<InnerCurve>::prove(pk, circuit, rng).map_err(Error::ProveFailed)
}

/// Native verification. The key must carry one IC point per input plus one.
pub fn verify(
    vk: &VerifyingKey<InnerCurve>,
    public_inputs: &[InnerFr],
    proof: &Proof<InnerCurve>,
) -> Result<bool> {
    if vk.gamma_abc_g1.len() != public_inputs.len() + 1 {
        return Err(Error::InvalidArguments(format!(
            "verifying key has {} IC points for {} public inputs",
            vk.gamma_abc_g1.len(),
            public_inputs.len()
        )));
    }
    Groth16::<InnerCurve>::verify(vk, public_inputs, proof)
        .map_err(|e| Error::InvalidArguments(e.to_string()))
}
