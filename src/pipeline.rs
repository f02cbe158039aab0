// src/pipeline.rs
//! End-to-end composition: inner statement on disk -> outer artifact on disk.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::cache::{CircuitCache, CircuitFingerprint};
use crate::circuits::recursive_verifier::{Stage, StageTracker, check_circuit};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::inner;
use crate::persistence::{read_inner_inputs, write_artifact};
use crate::placeholders::{RecursionAssignment, RecursionPlaceholders};
use crate::recursion::{self, CompiledRecursion, OuterArtifact};

pub struct CompositionPipeline {
    config: PipelineConfig,
}

impl CompositionPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Compose the inner proof given as hex with the statement in the data
    /// directory, compiling the outer circuit from scratch.
    #[instrument(
        skip_all,
        fields(data_dir = %self.config.data_dir.display(), vk_mode = ?self.config.vk_mode)
    )]
    pub fn run(&self, proof_hex: &str) -> Result<OuterArtifact> {
        self.execute(proof_hex, None)
    }

    /// Like [`run`](Self::run), reusing compiled circuits from `cache`.
    #[instrument(
        skip_all,
        fields(data_dir = %self.config.data_dir.display(), vk_mode = ?self.config.vk_mode)
    )]
    pub fn run_with_cache(&self, cache: &CircuitCache, proof_hex: &str) -> Result<OuterArtifact> {
        self.execute(proof_hex, Some(cache))
    }

    fn execute(&self, proof_hex: &str, cache: Option<&CircuitCache>) -> Result<OuterArtifact> {
        let mode = self.config.vk_mode;
        let mut tracker = StageTracker::default();

        // 1. Inner statement
        let bundle = read_inner_inputs(&self.config.data_dir, proof_hex)
            .map_err(|e| tracker.abort(e))?;
        let n_public = bundle.public_inputs.len();

        // 2. Native inner verification before any outer work
        match inner::verify(&bundle.verifying_key, &bundle.public_inputs, &bundle.proof) {
            Ok(true) => info!(n_public, "inner proof verifies"),
            Ok(false) => return Err(tracker.abort(Error::InnerVerificationFailed)),
            Err(e) => return Err(tracker.abort(e)),
        }

        // 3. Placeholders and assignment
        let placeholders = RecursionPlaceholders::new(mode, &bundle.verifying_key, n_public)
            .map_err(|e| tracker.abort(e))?;
        tracker.advance(Stage::PlaceholderReady)?;
        let assignment = RecursionAssignment::from_bundle(mode, &bundle);
        let circuit = placeholders.bind(assignment).map_err(|e| tracker.abort(e))?;
        tracker.advance(Stage::AssignmentReady)?;

        // 4. Satisfiability pre-check against the compiled shape
        let fingerprint = match cache {
            Some(_) => Some(
                CircuitFingerprint::new(mode, &bundle.verifying_key, n_public)
                    .map_err(|e| tracker.abort(e))?,
            ),
            None => None,
        };
        let cached = cache.zip(fingerprint.as_ref()).and_then(|(c, key)| c.get(key));
        let shape = match &cached {
            Some(compiled) => compiled.shape(),
            None => recursion::compile(&placeholders).map_err(|e| tracker.abort(e))?,
        };
        check_circuit(circuit.clone(), &shape).map_err(|e| tracker.abort(e))?;
        tracker.advance(Stage::Compiled)?;

        // 5. Generate keys, or reuse them
        let mut rng = rand::thread_rng();
        let compiled = match (cached, cache.zip(fingerprint)) {
            (Some(compiled), _) => {
                info!("reusing cached outer keys");
                Ok(compiled)
            }
            (None, Some((cache, key))) => cache.get_or_try_insert_with(key, || {
                CompiledRecursion::setup(placeholders, shape, &mut rng)
            }),
            (None, None) => CompiledRecursion::setup(placeholders, shape, &mut rng).map(Arc::new),
        }
        .map_err(|e| tracker.abort(e))?;
        tracker.advance(Stage::KeysGenerated)?;

        // 6. Proof and self-verification
        let artifact = compiled.prove_checked(circuit, &mut rng, &mut tracker)?;

        // 7. Persist
        write_artifact(&self.config, &artifact).map_err(|e| tracker.abort(e))?;
        Ok(artifact)
    }
}

/// Compose with the default configuration for `data_dir`.
pub fn build_groth16(data_dir: impl AsRef<Path>, proof_hex: &str) -> Result<OuterArtifact> {
    CompositionPipeline::new(PipelineConfig::new(data_dir)).run(proof_hex)
}
