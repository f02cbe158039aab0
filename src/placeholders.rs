// src/placeholders.rs
//! Shape-only circuit instances for compilation, and per-proof assignments
//! bound against them.

use ark_ec::AffineRepr;
use ark_ff::Zero;
use ark_groth16::{Proof, VerifyingKey};
use num_bigint::BigUint;

use crate::circuits::recursive_verifier::{RecursiveVerifierCircuit, VkMode};
use crate::codec::ProofBundle;
use crate::config::VkModeKind;
use crate::curves::{InnerCurve, InnerFr, OuterFr};
use crate::error::{Error, Result};

/// Carry an inner scalar into the outer field as the same integer.
///
/// BLS12-377's scalar modulus is smaller than BW6-761's, so this never
/// reduces.
pub fn emulate_input(x: &InnerFr) -> OuterFr {
    let n: BigUint = (*x).into();
    OuterFr::from(n)
}

/// Affine coordinates of a dynamic verifying key, in the order the circuit
/// publishes them.
pub fn vk_public_inputs(vk: &VerifyingKey<InnerCurve>) -> Vec<OuterFr> {
    let mut out = Vec::with_capacity(14 + 2 * vk.gamma_abc_g1.len());
    out.extend([vk.alpha_g1.x, vk.alpha_g1.y]);
    for g2 in [&vk.beta_g2, &vk.gamma_g2, &vk.delta_g2] {
        out.extend([g2.x.c0, g2.x.c1, g2.y.c0, g2.y.c1]);
    }
    for ic in &vk.gamma_abc_g1 {
        out.extend([ic.x, ic.y]);
    }
    out
}

fn has_identity(vk: &VerifyingKey<InnerCurve>) -> bool {
    vk.alpha_g1.is_zero()
        || vk.beta_g2.is_zero()
        || vk.gamma_g2.is_zero()
        || vk.delta_g2.is_zero()
        || vk.gamma_abc_g1.iter().any(|g| g.is_zero())
}

#[derive(Clone, Debug)]
pub struct RecursionPlaceholders {
    pub vk: VkMode,
    pub proof: Proof<InnerCurve>,
    pub witness: Vec<InnerFr>,
}

impl RecursionPlaceholders {
    /// The key becomes part of the circuit; only proof and inputs vary.
    pub fn fixed(vk: &VerifyingKey<InnerCurve>, n_public_inputs: usize) -> Result<Self> {
        check_arity(vk, n_public_inputs)?;
        Ok(Self::with_vk(VkMode::Fixed(vk.clone()), n_public_inputs))
    }

    /// Only the key's shape is kept; its points arrive with each assignment.
    pub fn dynamic(vk: &VerifyingKey<InnerCurve>, n_public_inputs: usize) -> Result<Self> {
        check_arity(vk, n_public_inputs)?;
        let shape = VerifyingKey {
            alpha_g1: AffineRepr::zero(),
            beta_g2: AffineRepr::zero(),
            gamma_g2: AffineRepr::zero(),
            delta_g2: AffineRepr::zero(),
            gamma_abc_g1: vec![AffineRepr::zero(); vk.gamma_abc_g1.len()],
        };
        Ok(Self::with_vk(VkMode::Dynamic(shape), n_public_inputs))
    }

    pub fn new(
        mode: VkModeKind,
        vk: &VerifyingKey<InnerCurve>,
        n_public_inputs: usize,
    ) -> Result<Self> {
        match mode {
            VkModeKind::Fixed => Self::fixed(vk, n_public_inputs),
            VkModeKind::Dynamic => Self::dynamic(vk, n_public_inputs),
        }
    }

    fn with_vk(vk: VkMode, n_public_inputs: usize) -> Self {
        Self {
            vk,
            proof: Proof::default(),
            witness: vec![InnerFr::zero(); n_public_inputs],
        }
    }

    pub fn mode(&self) -> VkModeKind {
        self.vk.kind()
    }

    pub fn n_public_inputs(&self) -> usize {
        self.witness.len()
    }

    /// Circuit used for key generation; its values are never checked.
    pub fn circuit(&self) -> RecursiveVerifierCircuit {
        RecursiveVerifierCircuit {
            vk: self.vk.clone(),
            proof: self.proof.clone(),
            public_inputs: self.witness.clone(),
        }
    }

    /// Fill the placeholder shape with real values.
    pub fn bind(&self, assignment: RecursionAssignment) -> Result<RecursiveVerifierCircuit> {
        if assignment.mode() != self.mode() {
            return Err(Error::InvalidArguments(format!(
                "{:?} assignment for {:?} placeholders",
                assignment.mode(),
                self.mode()
            )));
        }
        if assignment.public_inputs().len() != self.n_public_inputs() {
            return Err(Error::InvalidArguments(format!(
                "expected {} public inputs, got {}",
                self.n_public_inputs(),
                assignment.public_inputs().len()
            )));
        }
        let circuit = match assignment {
            RecursionAssignment::FixedVk { proof, public_inputs } => RecursiveVerifierCircuit {
                vk: self.vk.clone(),
                proof,
                public_inputs,
            },
            RecursionAssignment::DynamicVk { vk, proof, public_inputs } => {
                if vk.gamma_abc_g1.len() != self.vk.key().gamma_abc_g1.len() {
                    return Err(Error::InvalidArguments(format!(
                        "verifying key has {} IC points, circuit expects {}",
                        vk.gamma_abc_g1.len(),
                        self.vk.key().gamma_abc_g1.len()
                    )));
                }
                if has_identity(&vk) {
                    return Err(Error::InvalidArguments(
                        "verifying key has a point at infinity".to_string(),
                    ));
                }
                RecursiveVerifierCircuit { vk: VkMode::Dynamic(vk), proof, public_inputs }
            }
        };
        Ok(circuit)
    }
}

fn check_arity(vk: &VerifyingKey<InnerCurve>, n_public_inputs: usize) -> Result<()> {
    if vk.gamma_abc_g1.len() != n_public_inputs + 1 {
        return Err(Error::InvalidArguments(format!(
            "verifying key has {} IC points for {} public inputs",
            vk.gamma_abc_g1.len(),
            n_public_inputs
        )));
    }
    Ok(())
}

/// Concrete values for one recursion.
#[derive(Clone, Debug)]
pub enum RecursionAssignment {
    FixedVk {
        proof: Proof<InnerCurve>,
        public_inputs: Vec<InnerFr>,
    },
    DynamicVk {
        vk: VerifyingKey<InnerCurve>,
        proof: Proof<InnerCurve>,
        public_inputs: Vec<InnerFr>,
    },
}

impl RecursionAssignment {
    pub fn from_bundle(mode: VkModeKind, bundle: &ProofBundle<InnerCurve>) -> Self {
        match mode {
            VkModeKind::Fixed => RecursionAssignment::FixedVk {
                proof: bundle.proof.clone(),
                public_inputs: bundle.public_inputs.clone(),
            },
            VkModeKind::Dynamic => RecursionAssignment::DynamicVk {
                vk: bundle.verifying_key.clone(),
                proof: bundle.proof.clone(),
                public_inputs: bundle.public_inputs.clone(),
            },
        }
    }

    pub fn mode(&self) -> VkModeKind {
        match self {
            RecursionAssignment::FixedVk { .. } => VkModeKind::Fixed,
            RecursionAssignment::DynamicVk { .. } => VkModeKind::Dynamic,
        }
    }

    pub fn public_inputs(&self) -> &[InnerFr] {
        match self {
            RecursionAssignment::FixedVk { public_inputs, .. }
            | RecursionAssignment::DynamicVk { public_inputs, .. } => public_inputs,
        }
    }

    /// Public inputs of the outer proof this assignment produces.
    ///
    /// A dynamic key's coordinates follow the emulated inputs.
    pub fn outer_public_inputs(&self) -> Vec<OuterFr> {
        let mut inputs: Vec<OuterFr> = self.public_inputs().iter().map(emulate_input).collect();
        if let RecursionAssignment::DynamicVk { vk, .. } = self {
            inputs.extend(vk_public_inputs(vk));
        }
        inputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::{One, PrimeField};

    fn vk_with_ic(len: usize) -> VerifyingKey<InnerCurve> {
        let g1 = ark_bls12_377::G1Affine::generator();
        let g2 = ark_bls12_377::G2Affine::generator();
        VerifyingKey {
            alpha_g1: g1,
            beta_g2: g2,
            gamma_g2: g2,
            delta_g2: g2,
            gamma_abc_g1: vec![g1; len],
        }
    }

    #[test]
    fn fixed_keeps_key_and_zero_witness() {
        let vk = vk_with_ic(3);
        let p = RecursionPlaceholders::fixed(&vk, 2).unwrap();
        assert_eq!(p.mode(), VkModeKind::Fixed);
        assert_eq!(p.vk.key(), &vk);
        assert_eq!(p.witness, vec![InnerFr::zero(); 2]);
    }

    #[test]
    fn dynamic_keeps_only_shape() {
        let vk = vk_with_ic(2);
        let p = RecursionPlaceholders::dynamic(&vk, 1).unwrap();
        assert_eq!(p.mode(), VkModeKind::Dynamic);
        assert_eq!(p.vk.key().gamma_abc_g1.len(), 2);
        assert!(p.vk.key().gamma_abc_g1.iter().all(|g| g.is_zero()));
        assert!(p.vk.key().alpha_g1.is_zero());
    }

    #[test]
    fn arity_mismatch_is_invalid() {
        let vk = vk_with_ic(2);
        assert!(matches!(RecursionPlaceholders::fixed(&vk, 2), Err(Error::InvalidArguments(_))));
        assert!(matches!(RecursionPlaceholders::dynamic(&vk, 0), Err(Error::InvalidArguments(_))));
    }

    #[test]
    fn bind_rejects_mode_and_arity_mismatch() {
        let vk = vk_with_ic(2);
        let fixed = RecursionPlaceholders::fixed(&vk, 1).unwrap();

        let dynamic_assignment = RecursionAssignment::DynamicVk {
            vk: vk.clone(),
            proof: Proof::default(),
            public_inputs: vec![InnerFr::one()],
        };
        assert!(matches!(fixed.bind(dynamic_assignment), Err(Error::InvalidArguments(_))));

        let short = RecursionAssignment::FixedVk { proof: Proof::default(), public_inputs: vec![] };
        assert!(matches!(fixed.bind(short), Err(Error::InvalidArguments(_))));

        let ok = RecursionAssignment::FixedVk {
            proof: Proof::default(),
            public_inputs: vec![InnerFr::one()],
        };
        let circuit = fixed.bind(ok).unwrap();
        assert_eq!(circuit.vk, VkMode::Fixed(vk));
    }

    #[test]
    fn dynamic_outer_inputs_carry_key_coordinates() {
        let vk = vk_with_ic(2);
        let assignment = RecursionAssignment::DynamicVk {
            vk: vk.clone(),
            proof: Proof::default(),
            public_inputs: vec![InnerFr::from(7u64)],
        };
        let outer = assignment.outer_public_inputs();
        assert_eq!(outer.len(), 1 + 2 + 12 + 4);
        assert_eq!(outer[0], OuterFr::from(7u64));
        assert_eq!(&outer[1..], &vk_public_inputs(&vk)[..]);
        assert_eq!(outer[1], vk.alpha_g1.x);
        assert_eq!(outer[3], vk.beta_g2.x.c0);

        let fixed = RecursionAssignment::FixedVk {
            proof: Proof::default(),
            public_inputs: vec![InnerFr::from(7u64)],
        };
        assert_eq!(fixed.outer_public_inputs(), vec![OuterFr::from(7u64)]);
    }

    #[test]
    fn dynamic_bind_rejects_identity_points() {
        let mut vk = vk_with_ic(2);
        let placeholders = RecursionPlaceholders::dynamic(&vk, 1).unwrap();
        vk.gamma_abc_g1[1] = AffineRepr::zero();
        let assignment = RecursionAssignment::DynamicVk {
            vk,
            proof: Proof::default(),
            public_inputs: vec![InnerFr::one()],
        };
        assert!(matches!(placeholders.bind(assignment), Err(Error::InvalidArguments(_))));
    }

    #[test]
    fn emulation_preserves_integer() {
        let x = -InnerFr::one();
        let y = emulate_input(&x);
        let xi: BigUint = x.into_bigint().into();
        let yi: BigUint = y.into_bigint().into();
        assert_eq!(xi, yi);
        assert_eq!(emulate_input(&InnerFr::from(15u64)), OuterFr::from(15u64));
    }
}
