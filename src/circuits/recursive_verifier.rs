// src/circuits/recursive_verifier.rs
//! Groth16 (BLS12-377) verification expressed as constraints over BW6-761.

use ark_bls12_377::constraints::{Fq2Var, FqVar};
use ark_bls12_377::{G1Affine, G2Affine};
use ark_ec::pairing::Pairing;
use ark_ff::{One, PrimeField};
use ark_groth16::constraints::{ProofVar, VerifyingKeyVar};
use ark_groth16::{Proof, VerifyingKey};
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::ns;
use ark_relations::r1cs::{
    ConstraintSynthesizer, ConstraintSystem, ConstraintSystemRef, OptimizationGoal, SynthesisError,
    SynthesisMode,
};
use tracing::{debug, error, info};

use crate::config::VkModeKind;
use crate::curves::{InnerCurve, InnerFr, OuterFr};
use crate::error::Error;
use crate::placeholders::{
    RecursionAssignment, RecursionPlaceholders, emulate_input, vk_public_inputs,
};

// Pairing variable for the inner curve (BLS12-377)
pub type InnerPairingVar = ark_r1cs_std::pairing::bls12::PairingVar<ark_bls12_377::Config>;

type InnerG1Var = <InnerPairingVar as PairingVar<InnerCurve>>::G1Var;
type InnerG2Var = <InnerPairingVar as PairingVar<InnerCurve>>::G2Var;
type InnerGtVar = <InnerPairingVar as PairingVar<InnerCurve>>::GTVar;
type InnerVkVar = VerifyingKeyVar<InnerCurve, InnerPairingVar>;
type InnerProofVar = ProofVar<InnerCurve, InnerPairingVar>;

/// How the inner verifying key is bound into the circuit.
#[derive(Clone, Debug, PartialEq)]
pub enum VkMode {
    /// Circuit constants; one compiled circuit per key.
    Fixed(VerifyingKey<InnerCurve>),
    /// Witness values; one compiled circuit per public-input count.
    ///
    /// The key's affine coordinates are also outer public inputs, placed
    /// after the inner inputs: alpha (x, y), then beta, gamma and delta
    /// (x.c0, x.c1, y.c0, y.c1), then each IC point (x, y). An outer proof
    /// therefore only verifies against the key it was made for. See
    /// [`vk_public_inputs`].
    Dynamic(VerifyingKey<InnerCurve>),
}

impl VkMode {
    pub fn kind(&self) -> VkModeKind {
        match self {
            VkMode::Fixed(_) => VkModeKind::Fixed,
            VkMode::Dynamic(_) => VkModeKind::Dynamic,
        }
    }

    pub fn key(&self) -> &VerifyingKey<InnerCurve> {
        match self {
            VkMode::Fixed(vk) | VkMode::Dynamic(vk) => vk,
        }
    }
}

/// Asserts that `proof` verifies against `vk` for `public_inputs`.
///
/// The inner public inputs are the outer circuit's public inputs, one outer
/// field element each, holding the same integer.
#[derive(Clone, Debug)]
pub struct RecursiveVerifierCircuit {
    pub vk: VkMode,
    pub proof: Proof<InnerCurve>,
    pub public_inputs: Vec<InnerFr>,
}

impl RecursiveVerifierCircuit {
    /// The outer public witness matching this circuit's input allocation.
    pub fn outer_public_inputs(&self) -> Vec<OuterFr> {
        let mut inputs: Vec<OuterFr> = self.public_inputs.iter().map(emulate_input).collect();
        if let VkMode::Dynamic(vk) = &self.vk {
            inputs.extend(vk_public_inputs(vk));
        }
        inputs
    }
}

/// Allocate an inner scalar as an outer public input and return its
/// `InnerFr::MODULUS_BIT_SIZE` little-endian bits.
fn alloc_emulated_input(
    cs: ConstraintSystemRef<OuterFr>,
    x: &InnerFr,
) -> Result<Vec<Boolean<OuterFr>>, SynthesisError> {
    let value = emulate_input(x);
    let fp = FpVar::<OuterFr>::new_input(ns!(cs, "inner_input"), || Ok(value))?;
    let bits = fp.to_bits_le()?;

    // canonical inner scalar: value <= r - 1
    let r_minus_one = (-InnerFr::one()).into_bigint();
    Boolean::enforce_smaller_or_equal_than_le(&bits, r_minus_one)?;

    Ok(bits[..InnerFr::MODULUS_BIT_SIZE as usize].to_vec())
}

/// Expose a witness G1 point as public affine coordinates.
fn bind_g1_public(
    cs: ConstraintSystemRef<OuterFr>,
    var: &InnerG1Var,
    point: &G1Affine,
) -> Result<(), SynthesisError> {
    let affine = var.to_affine()?;
    affine.infinity.enforce_equal(&Boolean::FALSE)?;
    let x = FqVar::new_input(ns!(cs, "vk_x"), || Ok(point.x))?;
    let y = FqVar::new_input(ns!(cs, "vk_y"), || Ok(point.y))?;
    affine.x.enforce_equal(&x)?;
    affine.y.enforce_equal(&y)
}

fn bind_g2_public(
    cs: ConstraintSystemRef<OuterFr>,
    var: &InnerG2Var,
    point: &G2Affine,
) -> Result<(), SynthesisError> {
    let affine = var.to_affine()?;
    affine.infinity.enforce_equal(&Boolean::FALSE)?;
    let x = Fq2Var::new_input(ns!(cs, "vk_x"), || Ok(point.x))?;
    let y = Fq2Var::new_input(ns!(cs, "vk_y"), || Ok(point.y))?;
    affine.x.enforce_equal(&x)?;
    affine.y.enforce_equal(&y)
}

/// Double-and-add using only complete projective formulas.
///
/// Slower than the mixed-addition path of `scalar_mul_le`, but has no
/// exceptional inputs.
fn complete_scalar_mul_le(
    base: &InnerG1Var,
    bits: &[Boolean<OuterFr>],
) -> Result<InnerG1Var, SynthesisError> {
    let mut acc = InnerG1Var::zero();
    let mut power = base.clone();
    for bit in bits {
        let sum = &acc + &power;
        acc = bit.select(&sum, &acc)?;
        power.double_in_place()?;
    }
    Ok(acc)
}

impl ConstraintSynthesizer<OuterFr> for RecursiveVerifierCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<OuterFr>) -> Result<(), SynthesisError> {
        // 1. Verifying key: constants or witness
        let vk_var = match &self.vk {
            VkMode::Fixed(vk) => InnerVkVar::new_constant(ns!(cs, "vk"), vk)?,
            VkMode::Dynamic(vk) => InnerVkVar::new_witness(ns!(cs, "vk"), || Ok(vk))?,
        };
        if vk_var.gamma_abc_g1.len() != self.public_inputs.len() + 1 {
            return Err(SynthesisError::MalformedVerifyingKey);
        }

        // 2. Proof as witness
        let proof_var = InnerProofVar::new_witness(ns!(cs, "proof"), || Ok(&self.proof))?;

        // 3. Public inputs, emulated
        let input_bits = self
            .public_inputs
            .iter()
            .map(|x| alloc_emulated_input(cs.clone(), x))
            .collect::<Result<Vec<_>, _>>()?;

        // 3b. A witness key is published after the inputs
        if let VkMode::Dynamic(vk) = &self.vk {
            bind_g1_public(cs.clone(), &vk_var.alpha_g1, &vk.alpha_g1)?;
            for (var, point) in [
                (&vk_var.beta_g2, &vk.beta_g2),
                (&vk_var.gamma_g2, &vk.gamma_g2),
                (&vk_var.delta_g2, &vk.delta_g2),
            ] {
                bind_g2_public(cs.clone(), var, point)?;
            }
            for (var, point) in vk_var.gamma_abc_g1.iter().zip(&vk.gamma_abc_g1) {
                bind_g1_public(cs.clone(), var, point)?;
            }
        }

        // 4. L = IC[0] + Σ x_i * IC[i+1]
        let mut prepared_inputs = vk_var.gamma_abc_g1[0].clone();
        for (bits, base) in input_bits.iter().zip(&vk_var.gamma_abc_g1[1..]) {
            let scaled = complete_scalar_mul_le(base, bits)?;
            prepared_inputs += &scaled;
        }

        // 5. e(A, B) · e(-L, γ) · e(-C, δ) in one Miller loop
        let g1s = [
            InnerPairingVar::prepare_g1(&proof_var.a)?,
            InnerPairingVar::prepare_g1(&prepared_inputs.negate()?)?,
            InnerPairingVar::prepare_g1(&proof_var.c.negate()?)?,
        ];
        let g2s = [
            InnerPairingVar::prepare_g2(&proof_var.b)?,
            InnerPairingVar::prepare_g2(&vk_var.gamma_g2)?,
            InnerPairingVar::prepare_g2(&vk_var.delta_g2)?,
        ];
        let ml = InnerPairingVar::miller_loop(&g1s, &g2s)?;
        let lhs = InnerPairingVar::final_exponentiation(&ml)?;

        // 6. e(α, β): precomputed for a fixed key, in-circuit otherwise
        let alpha_beta = match &self.vk {
            VkMode::Fixed(vk) => {
                InnerGtVar::constant(InnerCurve::pairing(vk.alpha_g1, vk.beta_g2).0)
            }
            VkMode::Dynamic(_) => InnerPairingVar::pairing(
                InnerPairingVar::prepare_g1(&vk_var.alpha_g1)?,
                InnerPairingVar::prepare_g2(&vk_var.beta_g2)?,
            )?,
        };

        // 7. Enforce the verification equation
        lhs.enforce_equal(&alpha_beta)?;

        Ok(())
    }
}

/// Progress of one recursion. Stages only move forward, one at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Unbuilt,
    PlaceholderReady,
    AssignmentReady,
    Compiled,
    KeysGenerated,
    WitnessBuilt,
    Proved,
    Verified,
}

impl Stage {
    pub fn next(self) -> Option<Stage> {
        use Stage::*;
        match self {
            Unbuilt => Some(PlaceholderReady),
            PlaceholderReady => Some(AssignmentReady),
            AssignmentReady => Some(Compiled),
            Compiled => Some(KeysGenerated),
            KeysGenerated => Some(WitnessBuilt),
            WitnessBuilt => Some(Proved),
            Proved => Some(Verified),
            Verified => None,
        }
    }
}

/// Tracks a run through [`Stage`]; a failed run stays where it stopped.
#[derive(Debug)]
pub struct StageTracker {
    current: Stage,
    failed: bool,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::starting_at(Stage::Unbuilt)
    }
}

impl StageTracker {
    pub fn starting_at(stage: Stage) -> Self {
        Self { current: stage, failed: false }
    }

    pub fn current(&self) -> Stage {
        self.current
    }

    pub fn advance(&mut self, to: Stage) -> crate::error::Result<()> {
        if self.failed || self.current.next() != Some(to) {
            return Err(Error::InvalidArguments(format!(
                "stage {:?} cannot follow {:?}",
                to, self.current
            )));
        }
        info!(from = ?self.current, to = ?to, "recursion stage");
        self.current = to;
        Ok(())
    }

    /// Record `err` as terminal for this run and hand it back.
    pub fn abort(&mut self, err: Error) -> Error {
        error!(stage = ?self.current, error = %err, "recursion aborted");
        self.failed = true;
        err
    }
}

/// Size of a synthesized circuit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CircuitShape {
    pub num_constraints: usize,
    pub num_instance_variables: usize,
    pub num_witness_variables: usize,
}

pub(crate) fn synthesize(
    circuit: RecursiveVerifierCircuit,
    mode: SynthesisMode,
) -> Result<(ConstraintSystemRef<OuterFr>, CircuitShape), SynthesisError> {
    let cs = ConstraintSystem::<OuterFr>::new_ref();
    cs.set_optimization_goal(OptimizationGoal::Constraints);
    cs.set_mode(mode);
    circuit.generate_constraints(cs.clone())?;
    let shape = CircuitShape {
        num_constraints: cs.num_constraints(),
        num_instance_variables: cs.num_instance_variables(),
        num_witness_variables: cs.num_witness_variables(),
    };
    debug!(?shape, "synthesized recursive verifier");
    Ok((cs, shape))
}

/// Synthesize the bound circuit without any keys and check every constraint,
/// and that it has the placeholder circuit's shape.
pub fn check_satisfied(
    placeholders: &RecursionPlaceholders,
    assignment: RecursionAssignment,
) -> crate::error::Result<CircuitShape> {
    let circuit = placeholders.bind(assignment)?;
    let (_, expected) = synthesize(placeholders.circuit(), SynthesisMode::Setup)
        .map_err(|e| Error::UnsatisfiableCircuit(e.to_string()))?;
    check_circuit(circuit, &expected)
}

/// Check a bound circuit against an already known placeholder shape.
pub(crate) fn check_circuit(
    circuit: RecursiveVerifierCircuit,
    expected: &CircuitShape,
) -> crate::error::Result<CircuitShape> {
    let (cs, shape) = synthesize(circuit, SynthesisMode::Prove { construct_matrices: true })
        .map_err(|e| Error::UnsatisfiableCircuit(e.to_string()))?;

    let satisfied = cs
        .is_satisfied()
        .map_err(|e| Error::UnsatisfiableCircuit(e.to_string()))?;
    if !satisfied {
        let which = cs
            .which_is_unsatisfied()
            .ok()
            .flatten()
            .unwrap_or_else(|| "unknown constraint".to_string());
        return Err(Error::UnsatisfiableCircuit(which));
    }

    if shape.num_constraints != expected.num_constraints
        || shape.num_instance_variables != expected.num_instance_variables
    {
        return Err(Error::UnsatisfiableCircuit(format!(
            "assignment shape {shape:?} differs from placeholder shape {expected:?}"
        )));
    }
    Ok(shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuits::mul::MulCircuit;
    use crate::inner;
    use ark_relations::r1cs::ConstraintSystem;
    use ark_std::rand::SeedableRng;
    use ark_std::rand::rngs::StdRng;

    type InnerTriple = (VerifyingKey<InnerCurve>, Proof<InnerCurve>, Vec<InnerFr>);

    fn inner_triple_seeded(seed: u64) -> InnerTriple {
        let mut rng = StdRng::seed_from_u64(seed);
        let (pk, vk) = inner::setup(MulCircuit::<InnerFr>::default(), &mut rng).unwrap();
        let circuit = MulCircuit::new(InnerFr::from(3u64), InnerFr::from(5u64));
        let proof = inner::prove(&pk, circuit, &mut rng).unwrap();
        (vk, proof, vec![InnerFr::from(15u64)])
    }

    fn inner_triple() -> InnerTriple {
        inner_triple_seeded(0)
    }

    fn satisfied(circuit: RecursiveVerifierCircuit) -> bool {
        let cs = ConstraintSystem::<OuterFr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        cs.is_satisfied().unwrap()
    }

    #[test]
    fn valid_proof_satisfies_both_modes() {
        let (vk, proof, inputs) = inner_triple();
        for binding in [VkMode::Fixed(vk.clone()), VkMode::Dynamic(vk.clone())] {
            let circuit = RecursiveVerifierCircuit {
                vk: binding,
                proof: proof.clone(),
                public_inputs: inputs.clone(),
            };
            assert!(satisfied(circuit));
        }
    }

    #[test]
    fn wrong_public_input_is_unsatisfied() {
        let (vk, proof, _) = inner_triple();
        let circuit = RecursiveVerifierCircuit {
            vk: VkMode::Fixed(vk),
            proof,
            public_inputs: vec![InnerFr::from(16u64)],
        };
        assert!(!satisfied(circuit));
    }

    #[test]
    fn outer_public_inputs_keep_integer_value() {
        let (vk, proof, inputs) = inner_triple();
        let circuit =
            RecursiveVerifierCircuit { vk: VkMode::Fixed(vk), proof, public_inputs: inputs };
        assert_eq!(circuit.outer_public_inputs(), vec![OuterFr::from(15u64)]);
    }

    #[test]
    fn check_satisfied_reports_bad_inputs() {
        let (vk, proof, inputs) = inner_triple();
        let placeholders = RecursionPlaceholders::fixed(&vk, 1).unwrap();

        let good = RecursionAssignment::FixedVk { proof: proof.clone(), public_inputs: inputs };
        let shape = check_satisfied(&placeholders, good).unwrap();
        assert_eq!(shape.num_instance_variables, 2);

        let bad = RecursionAssignment::FixedVk { proof, public_inputs: vec![InnerFr::from(14u64)] };
        assert!(matches!(
            check_satisfied(&placeholders, bad),
            Err(Error::UnsatisfiableCircuit(_))
        ));
    }

    #[test]
    fn valid_assignment_passes_precheck() {
        let (vk, proof, inputs) = inner_triple();

        let fixed = RecursionPlaceholders::fixed(&vk, 1).unwrap();
        let assignment =
            RecursionAssignment::FixedVk { proof: proof.clone(), public_inputs: inputs.clone() };
        assert!(check_satisfied(&fixed, assignment).is_ok());

        let dynamic = RecursionPlaceholders::dynamic(&vk, 1).unwrap();
        let assignment = RecursionAssignment::DynamicVk { vk, proof, public_inputs: inputs };
        let shape = check_satisfied(&dynamic, assignment).unwrap();
        // one input, then 2 + 3 * 4 + 2 * 2 key coordinates
        assert_eq!(shape.num_instance_variables, 1 + 1 + 18);
    }

    #[test]
    fn precheck_rejects_foreign_shape() {
        let (vk, proof, inputs) = inner_triple();
        let placeholders = RecursionPlaceholders::fixed(&vk, 1).unwrap();
        let circuit = placeholders
            .bind(RecursionAssignment::FixedVk { proof, public_inputs: inputs })
            .unwrap();
        let (_, expected) = synthesize(placeholders.circuit(), SynthesisMode::Setup).unwrap();
        let foreign = CircuitShape { num_constraints: expected.num_constraints + 1, ..expected };

        assert_eq!(check_circuit(circuit.clone(), &expected).unwrap(), expected);
        assert!(matches!(
            check_circuit(circuit, &foreign),
            Err(Error::UnsatisfiableCircuit(_))
        ));
    }

    #[test]
    fn dynamic_key_is_bound_to_public_inputs() {
        let (vk_a, _, _) = inner_triple_seeded(1);
        let (vk_b, proof_b, inputs) = inner_triple_seeded(2);
        assert_ne!(vk_public_inputs(&vk_a), vk_public_inputs(&vk_b));

        let circuit = RecursiveVerifierCircuit {
            vk: VkMode::Dynamic(vk_b.clone()),
            proof: proof_b,
            public_inputs: inputs,
        };
        let expected = circuit.outer_public_inputs();
        let cs = ConstraintSystem::<OuterFr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        assert!(cs.is_satisfied().unwrap());

        // instance = [1, inner input, key coordinates...]
        let instance = cs.borrow().unwrap().instance_assignment.clone();
        assert_eq!(&instance[1..], &expected[..]);
        assert_eq!(&instance[2..], &vk_public_inputs(&vk_b)[..]);

        // claiming another key for the same witness breaks the circuit
        for (slot, value) in vk_public_inputs(&vk_a).into_iter().enumerate() {
            cs.borrow_mut().unwrap().instance_assignment[2 + slot] = value;
        }
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn stages_advance_one_at_a_time() {
        let mut tracker = StageTracker::default();
        tracker.advance(Stage::PlaceholderReady).unwrap();
        assert!(tracker.advance(Stage::Compiled).is_err());
        tracker.advance(Stage::AssignmentReady).unwrap();

        let err = tracker.abort(Error::InnerVerificationFailed);
        assert!(matches!(err, Error::InnerVerificationFailed));
        assert!(tracker.advance(Stage::Compiled).is_err());
        assert_eq!(tracker.current(), Stage::AssignmentReady);
        assert_eq!(Stage::Verified.next(), None);
    }

    #[test]
    fn arity_mismatch_is_rejected() {
        let (vk, proof, _) = inner_triple();
        let circuit =
            RecursiveVerifierCircuit { vk: VkMode::Fixed(vk), proof, public_inputs: vec![] };
        let cs = ConstraintSystem::<OuterFr>::new_ref();
        assert!(matches!(
            circuit.generate_constraints(cs),
            Err(SynthesisError::MalformedVerifyingKey)
        ));
    }
}
