// src/circuits/mul.rs
use ark_ff::PrimeField;
use ark_relations::lc;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

/// Knowledge of a factorisation: private `p`, `q` with public `n = p * q`.
#[derive(Clone, Debug, Default)]
pub struct MulCircuit<F: PrimeField> {
    pub p: Option<F>,
    pub q: Option<F>,
    pub n: Option<F>,
}

impl<F: PrimeField> MulCircuit<F> {
    pub fn new(p: F, q: F) -> Self {
        Self { p: Some(p), q: Some(q), n: Some(p * q) }
    }

    /// Public inputs in allocation order.
    pub fn public_inputs(&self) -> Vec<F> {
        self.n.into_iter().collect()
    }
}

impl<F: PrimeField> ConstraintSynthesizer<F> for MulCircuit<F> {
    fn generate_constraints(self, cs: ConstraintSystemRef<F>) -> Result<(), SynthesisError> {
        // Witness variables p, q
        let p = cs.new_witness_variable(|| self.p.ok_or(SynthesisError::AssignmentMissing))?;
        let q = cs.new_witness_variable(|| self.q.ok_or(SynthesisError::AssignmentMissing))?;

        // Public input n
        let n = cs.new_input_variable(|| self.n.ok_or(SynthesisError::AssignmentMissing))?;

        // (p) * (q) = n
        cs.enforce_constraint(lc!() + p, lc!() + q, lc!() + n)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bls12_377::Fr;
    use ark_relations::r1cs::ConstraintSystem;

    #[test]
    fn product_satisfies() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        MulCircuit::new(Fr::from(3u64), Fr::from(5u64))
            .generate_constraints(cs.clone())
            .unwrap();
        assert!(cs.is_satisfied().unwrap());
        assert_eq!(cs.num_instance_variables(), 2);
    }

    #[test]
    fn wrong_product_fails() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let circuit = MulCircuit {
            n: Some(Fr::from(16u64)),
            ..MulCircuit::new(Fr::from(3u64), Fr::from(5u64))
        };
        circuit.generate_constraints(cs.clone()).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }
}
