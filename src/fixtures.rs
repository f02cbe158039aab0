// src/fixtures.rs
//! A small inner statement on disk, for the CLI and tests.

use std::path::Path;

use ark_serialize::CanonicalSerialize;
use ark_std::rand::{CryptoRng, RngCore};
use tracing::info;

use crate::circuits::MulCircuit;
use crate::config::{INNER_PUBLIC_INPUTS_FILE, INNER_VK_FILE, PublicInputsFormat};
use crate::curves::InnerFr;
use crate::error::{Error, Result};
use crate::inner;
use crate::persistence::{encode_proof_hex, format_public_inputs, write_files_atomically};

/// Prove `p * q == n` on the inner curve, write `groth16_vk.bin` and
/// `public_inputs.json` to `dir`, and return the proof as hex.
pub fn write_inner_fixture<R: RngCore + CryptoRng>(
    dir: impl AsRef<Path>,
    p: u64,
    q: u64,
    rng: &mut R,
) -> Result<String> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

    let (pk, vk) = inner::setup(MulCircuit::<InnerFr>::default(), rng)?;
    let circuit = MulCircuit::new(InnerFr::from(p), InnerFr::from(q));
    let public_inputs = circuit.public_inputs();
    let proof = inner::prove(&pk, circuit, rng)?;

    let mut vk_bytes = Vec::new();
    vk.serialize_compressed(&mut vk_bytes)?;
    write_files_atomically(&[
        (dir.join(INNER_VK_FILE), vk_bytes),
        (
            dir.join(INNER_PUBLIC_INPUTS_FILE),
            format_public_inputs(&public_inputs, PublicInputsFormat::Json)?,
        ),
    ])?;

    info!(dir = %dir.display(), p, q, "wrote inner fixture");
    encode_proof_hex(&proof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::read_inner_inputs;
    use ark_std::rand::SeedableRng;
    use ark_std::rand::rngs::StdRng;

    #[test]
    fn fixture_reads_back_and_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let proof_hex = write_inner_fixture(dir.path(), 3, 5, &mut rng).unwrap();

        let text = std::fs::read_to_string(dir.path().join(INNER_PUBLIC_INPUTS_FILE)).unwrap();
        let values: Vec<String> = serde_json::from_str(&text).unwrap();
        assert_eq!(values, vec!["15".to_string()]);

        let bundle = read_inner_inputs(dir.path(), &proof_hex).unwrap();
        let verified =
            inner::verify(&bundle.verifying_key, &bundle.public_inputs, &bundle.proof).unwrap();
        assert!(verified);
    }
}
