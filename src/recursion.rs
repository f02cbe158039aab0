// src/recursion.rs
//! Outer Groth16 over BW6-761 for the recursive verifier circuit.

use std::sync::Arc;

use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, ProvingKey, VerifyingKey};
use ark_relations::r1cs::SynthesisMode;
use ark_snark::SNARK;
use ark_std::rand::{CryptoRng, RngCore};
use tracing::{debug, info, warn};

use crate::circuits::recursive_verifier::{
    CircuitShape, RecursiveVerifierCircuit, Stage, StageTracker, check_circuit, synthesize,
};
use crate::codec::ProofBundle;
use crate::curves::{OuterCurve, OuterFr};
use crate::error::{Error, Result};
use crate::placeholders::{RecursionAssignment, RecursionPlaceholders};

/// Outer proof, the key that checks it, and its public inputs.
pub type OuterArtifact = ProofBundle<OuterCurve>;

/// Keys for one placeholder shape; proves any assignment of that shape.
pub struct CompiledRecursion {
    placeholders: RecursionPlaceholders,
    shape: CircuitShape,
    proving_key: Arc<ProvingKey<OuterCurve>>,
    verifying_key: VerifyingKey<OuterCurve>,
    prepared_vk: PreparedVerifyingKey<OuterCurve>,
}

/// Setup-mode synthesis of the placeholder circuit.
pub fn compile(placeholders: &RecursionPlaceholders) -> Result<CircuitShape> {
    let (_, shape) =
        synthesize(placeholders.circuit(), SynthesisMode::Setup).map_err(Error::CompileFailed)?;
    info!(
        constraints = shape.num_constraints,
        instance = shape.num_instance_variables,
        "compiled recursive verifier"
    );
    Ok(shape)
}

impl CompiledRecursion {
    /// Compile and run key generation.
    pub fn compile<R: RngCore + CryptoRng>(
        placeholders: RecursionPlaceholders,
        rng: &mut R,
    ) -> Result<Self> {
        let shape = compile(&placeholders)?;
        Self::setup(placeholders, shape, rng)
    }

    /// Key generation for an already compiled shape.
    pub fn setup<R: RngCore + CryptoRng>(
        placeholders: RecursionPlaceholders,
        shape: CircuitShape,
        rng: &mut R,
    ) -> Result<Self> {
        warn!("outer keys come from a single-party setup; the toxic waste is not destroyed");
        let (pk, vk) = Groth16::<OuterCurve>::circuit_specific_setup(placeholders.circuit(), rng)
            .map_err(Error::SetupFailed)?;
        let prepared_vk = Groth16::<OuterCurve>::process_vk(&vk).map_err(Error::SetupFailed)?;
        debug!(ic = vk.gamma_abc_g1.len(), "outer verifying key ready");
        Ok(Self {
            placeholders,
            shape,
            proving_key: Arc::new(pk),
            verifying_key: vk,
            prepared_vk,
        })
    }

    pub fn placeholders(&self) -> &RecursionPlaceholders {
        &self.placeholders
    }

    pub fn shape(&self) -> CircuitShape {
        self.shape
    }

    pub fn proving_key(&self) -> Arc<ProvingKey<OuterCurve>> {
        Arc::clone(&self.proving_key)
    }

    pub fn verifying_key(&self) -> &VerifyingKey<OuterCurve> {
        &self.verifying_key
    }

    /// Pre-check, prove and self-verify one assignment.
    pub fn prove<R: RngCore + CryptoRng>(
        &self,
        assignment: RecursionAssignment,
        rng: &mut R,
    ) -> Result<OuterArtifact> {
        let mut tracker = StageTracker::starting_at(Stage::KeysGenerated);
        let circuit = self.witness(assignment).map_err(|e| tracker.abort(e))?;
        self.prove_checked(circuit, rng, &mut tracker)
    }

    /// Prove a circuit that already passed the pre-check against this shape.
    pub(crate) fn prove_checked<R: RngCore + CryptoRng>(
        &self,
        circuit: RecursiveVerifierCircuit,
        rng: &mut R,
        tracker: &mut StageTracker,
    ) -> Result<OuterArtifact> {
        let public_inputs = circuit.outer_public_inputs();
        tracker.advance(Stage::WitnessBuilt)?;

        let proof = Groth16::<OuterCurve>::prove(&self.proving_key, circuit, rng)
            .map_err(|e| tracker.abort(Error::ProveFailed(e)))?;
        tracker.advance(Stage::Proved)?;

        self.verify(&proof, &public_inputs).map_err(|e| tracker.abort(e))?;
        tracker.advance(Stage::Verified)?;

        Ok(ProofBundle {
            proof,
            verifying_key: self.verifying_key.clone(),
            public_inputs,
        })
    }

    fn witness(&self, assignment: RecursionAssignment) -> Result<RecursiveVerifierCircuit> {
        let circuit = self.placeholders.bind(assignment)?;
        check_circuit(circuit.clone(), &self.shape)?;
        Ok(circuit)
    }

    pub fn verify(&self, proof: &Proof<OuterCurve>, public_inputs: &[OuterFr]) -> Result<()> {
        let verified = Groth16::<OuterCurve>::verify_with_processed_vk(
            &self.prepared_vk,
            public_inputs,
            proof,
        );
        match verified {
            Ok(true) => Ok(()),
            _ => Err(Error::OuterVerificationFailed),
        }
    }
}

/// Check an outer proof against its own key.
pub fn verify_outer(artifact: &OuterArtifact) -> Result<()> {
    if artifact.verifying_key.gamma_abc_g1.len() != artifact.public_inputs.len() + 1 {
        return Err(Error::OuterVerificationFailed);
    }
    let verified = Groth16::<OuterCurve>::verify(
        &artifact.verifying_key,
        &artifact.public_inputs,
        &artifact.proof,
    );
    match verified {
        Ok(true) => Ok(()),
        _ => Err(Error::OuterVerificationFailed),
    }
}
