//! Seeded `decimal` (§4.2.1). Grounded on the teacher's
//! `java_generate/values/decimal.rs`: an unscaled big-endian `i64` plus a
//! scale/exponent, here taken from a `scale` arg (default 0) instead of
//! always zero.

use scylla::value::{CqlDecimal, CqlValue};

use super::{arg_i64, ColumnGenerator};
use crate::error::LoadgenError;
use crate::model::GeneratorArgs;
use crate::rng::Seeded;

pub struct DecimalGenerator;

impl ColumnGenerator for DecimalGenerator {
    fn generate(
        &self,
        seed: u64,
        args: &GeneratorArgs,
        _registry: &super::GeneratorRegistry,
    ) -> Result<CqlValue, LoadgenError> {
        let scale = arg_i64(args, "scale", 0) as i32;
        let mut rng = Seeded::new(seed);
        let unscaled = rng.next_i64();
        Ok(CqlValue::Decimal(
            CqlDecimal::from_signed_be_bytes_slice_and_exponent(&unscaled.to_be_bytes(), scale),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let reg = super::super::GeneratorRegistry::with_defaults();
        let gen = DecimalGenerator;
        let args = GeneratorArgs::new();
        assert_eq!(
            gen.generate(0, &args, &reg).unwrap(),
            gen.generate(0, &args, &reg).unwrap()
        );
    }
}
