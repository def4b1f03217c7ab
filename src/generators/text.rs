//! Seeded `text` (§4.2.1). Grounded on the teacher's
//! `java_generate/values/text.rs`: fill a byte buffer from a seeded stream,
//! masking each byte into the 7-bit range before building the `String`
//! (the same masking formula the teacher uses, `(byte & 127) + 32) & 127`).

use scylla::value::CqlValue;

use super::{arg_range, ColumnGenerator};
use crate::error::LoadgenError;
use crate::model::GeneratorArgs;
use crate::rng::Seeded;

pub struct TextGenerator;

impl ColumnGenerator for TextGenerator {
    fn generate(
        &self,
        seed: u64,
        args: &GeneratorArgs,
        _registry: &super::GeneratorRegistry,
    ) -> Result<CqlValue, LoadgenError> {
        let (min, max) = arg_range(args, "size", (4, 8));
        let mut size_rng = Seeded::new(seed);
        let size = if max > min {
            size_rng.uniform_int(min, max) as usize
        } else {
            min as usize
        };

        let mut rng = Seeded::new(!seed);
        let mut result = Vec::with_capacity(size);
        while result.len() < size {
            let chunk = rng
                .next_u64()
                .to_le_bytes()
                .map(|byte| ((byte & 127) + 32) & 127);
            let take = (size - result.len()).min(chunk.len());
            result.extend_from_slice(&chunk[..take]);
        }

        let text = result.into_iter().map(|b| b as char).collect::<String>();
        Ok(CqlValue::Text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let reg = super::super::GeneratorRegistry::with_defaults();
        let gen = TextGenerator;
        let args = GeneratorArgs::new();
        assert_eq!(
            gen.generate(77, &args, &reg).unwrap(),
            gen.generate(77, &args, &reg).unwrap()
        );
    }

    #[test]
    fn respects_fixed_size() {
        let reg = super::super::GeneratorRegistry::with_defaults();
        let gen = TextGenerator;
        let mut args = GeneratorArgs::new();
        args.insert(
            "size".into(),
            serde_yaml::Value::Sequence(vec![serde_yaml::Value::from(6), serde_yaml::Value::from(6)]),
        );
        if let CqlValue::Text(s) = gen.generate(1, &args, &reg).unwrap() {
            assert_eq!(s.chars().count(), 6);
        } else {
            panic!("expected text");
        }
    }
}
