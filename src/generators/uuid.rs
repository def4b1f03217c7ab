//! Seeded `uuid` (§4.2.1). Grounded on the teacher's
//! `java_generate/values/uuid.rs`: fold a 64-bit draw into a 128-bit UUID by
//! reusing the same `u64` for both halves (`Uuid::from_u64_pair(v, v)`).

use scylla::value::CqlValue;

use super::ColumnGenerator;
use crate::error::LoadgenError;
use crate::model::GeneratorArgs;
use crate::rng::Seeded;

pub struct UuidGenerator;

impl ColumnGenerator for UuidGenerator {
    fn generate(
        &self,
        seed: u64,
        _args: &GeneratorArgs,
        _registry: &super::GeneratorRegistry,
    ) -> Result<CqlValue, LoadgenError> {
        let mut rng = Seeded::new(seed);
        let v = rng.next_u64();
        Ok(CqlValue::Uuid(uuid::Uuid::from_u64_pair(v, v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let reg = super::super::GeneratorRegistry::with_defaults();
        let gen = UuidGenerator;
        let args = GeneratorArgs::new();
        assert_eq!(
            gen.generate(0, &args, &reg).unwrap(),
            gen.generate(0, &args, &reg).unwrap()
        );
    }

    #[test]
    fn distinct_seeds_usually_differ() {
        let reg = super::super::GeneratorRegistry::with_defaults();
        let gen = UuidGenerator;
        let args = GeneratorArgs::new();
        assert_ne!(
            gen.generate(1, &args, &reg).unwrap(),
            gen.generate(2, &args, &reg).unwrap()
        );
    }
}
