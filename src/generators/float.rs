//! Seeded `float`/`double` (§4.2.1). Grounded on the teacher's
//! `java_generate/values/float.rs`, which draws a raw identity value and
//! casts it straight to `f32`/`f64`; generalized here to scale the seeded
//! `[0, 1)` draw into a `min`/`max` range (default `0.0..1.0`) instead of
//! passing the raw integer seed through unscaled.

use scylla::value::CqlValue;

use super::{arg_f64, ColumnGenerator};
use crate::error::LoadgenError;
use crate::model::GeneratorArgs;
use crate::rng::Seeded;

#[derive(Debug, Clone, Copy)]
pub enum FloatGenerator {
    Single,
    Double,
}

impl ColumnGenerator for FloatGenerator {
    fn generate(
        &self,
        seed: u64,
        args: &GeneratorArgs,
        _registry: &super::GeneratorRegistry,
    ) -> Result<CqlValue, LoadgenError> {
        let min = arg_f64(args, "min", 0.0);
        let max = arg_f64(args, "max", 1.0);
        let mut rng = Seeded::new(seed);
        let value = min + rng.uniform() * (max - min);

        Ok(match self {
            FloatGenerator::Single => CqlValue::Float(value as f32),
            FloatGenerator::Double => CqlValue::Double(value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_in_range() {
        let reg = super::super::GeneratorRegistry::with_defaults();
        let gen = FloatGenerator::Double;
        let mut args = GeneratorArgs::new();
        args.insert("min".into(), serde_yaml::Value::from(10.0));
        args.insert("max".into(), serde_yaml::Value::from(20.0));
        for seed in 0..500u64 {
            if let CqlValue::Double(v) = gen.generate(seed, &args, &reg).unwrap() {
                assert!((10.0..20.0).contains(&v));
            }
        }
    }
}
