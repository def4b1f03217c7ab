//! Seeded coin flip (§4.2.1). No dedicated teacher file exists for
//! `boolean`; grounded on the same `identity_distribution.next_i64() % 2`
//! technique the teacher uses inline in `java_generate/values/boolean.rs`,
//! generalized to a configurable `p` (default 0.5) instead of a fixed 50/50
//! split.

use scylla::value::CqlValue;

use super::{arg_f64, ColumnGenerator};
use crate::error::LoadgenError;
use crate::model::GeneratorArgs;
use crate::rng::Seeded;

pub struct BooleanGenerator;

impl ColumnGenerator for BooleanGenerator {
    fn generate(
        &self,
        seed: u64,
        args: &GeneratorArgs,
        _registry: &super::GeneratorRegistry,
    ) -> Result<CqlValue, LoadgenError> {
        let p = arg_f64(args, "p", 0.5);
        let mut rng = Seeded::new(seed);
        Ok(CqlValue::Boolean(rng.uniform() < p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let reg = super::super::GeneratorRegistry::with_defaults();
        let gen = BooleanGenerator;
        let args = GeneratorArgs::new();
        assert_eq!(
            gen.generate(1, &args, &reg).unwrap(),
            gen.generate(1, &args, &reg).unwrap()
        );
    }

    #[test]
    fn p_zero_is_always_false() {
        let reg = super::super::GeneratorRegistry::with_defaults();
        let gen = BooleanGenerator;
        let mut args = GeneratorArgs::new();
        args.insert("p".into(), serde_yaml::Value::from(0.0));
        for seed in 0..200u64 {
            assert_eq!(gen.generate(seed, &args, &reg).unwrap(), CqlValue::Boolean(false));
        }
    }
}
