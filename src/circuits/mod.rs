// src/circuits/mod.rs
pub mod mul;
pub mod recursive_verifier;

pub use mul::MulCircuit;
pub use recursive_verifier::{RecursiveVerifierCircuit, VkMode};
