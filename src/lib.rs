// src/lib.rs
//! Groth16 proof composition: a Groth16 proof over BLS12-377 is verified
//! inside a Groth16 circuit over BW6-761, producing a single outer proof
//! whose public inputs are the inner ones.

pub mod cache;
pub mod circuits;
pub mod codec;
pub mod config;
pub mod curves;
pub mod error;
pub mod ffi;
pub mod fixtures;
pub mod inner;
pub mod logging;
pub mod persistence;
pub mod pipeline;
pub mod placeholders;
pub mod recursion;

pub use cache::{CircuitCache, CircuitFingerprint};
pub use circuits::recursive_verifier::{CircuitShape, Stage, check_satisfied};
pub use config::{PipelineConfig, PublicInputsFormat, VkModeKind};
pub use error::{Error, Result};
pub use pipeline::{CompositionPipeline, build_groth16};
pub use placeholders::{RecursionAssignment, RecursionPlaceholders};
pub use recursion::{CompiledRecursion, OuterArtifact};
