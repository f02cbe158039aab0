// src/codec/mod.rs

pub mod bigint;
pub mod bundle;
pub mod points;

pub use bigint::{format_field, format_integer, parse_field, parse_integer};
pub use bundle::{
    BundleJson, ProofBundle, ProofJson, VerifyingKeyJson, compute_pairing_product, decode_bundle,
    decode_proof, decode_public_inputs, decode_verifying_key, encode_bundle, encode_proof,
    encode_public_inputs, encode_verifying_key,
};
pub use points::{AffineCoordinates, decode_g1, decode_g2, encode_g1, encode_g2};
