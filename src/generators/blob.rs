//! Seeded `blob`/`hex_blob` (§4.2.1). Grounded on the teacher's
//! `java_generate/values/blob.rs`: reseed a second stream from the value
//! seed and pull raw little-endian bytes off of it until the target length
//! is filled. `hex_blob` is the same byte stream, hex-encoded and stored as
//! text rather than as a CQL blob.

use scylla::value::CqlValue;

use super::{arg_range, ColumnGenerator};
use crate::error::LoadgenError;
use crate::model::GeneratorArgs;
use crate::rng::Seeded;

pub struct BlobGenerator {
    pub hex: bool,
}

fn fill_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = Seeded::new(seed);
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        let chunk = rng.next_u64().to_le_bytes();
        let take = (len - out.len()).min(chunk.len());
        out.extend_from_slice(&chunk[..take]);
    }
    out
}

impl ColumnGenerator for BlobGenerator {
    fn generate(
        &self,
        seed: u64,
        args: &GeneratorArgs,
        _registry: &super::GeneratorRegistry,
    ) -> Result<CqlValue, LoadgenError> {
        let (min, max) = arg_range(args, "size", (4, 8));
        let mut size_rng = Seeded::new(seed);
        let len = if max > min {
            size_rng.uniform_int(min, max) as usize
        } else {
            min as usize
        };

        let bytes = fill_bytes(seed.rotate_left(1), len);

        Ok(if self.hex {
            CqlValue::Text(bytes.iter().map(|b| format!("{b:02x}")).collect())
        } else {
            CqlValue::Blob(bytes)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let reg = super::super::GeneratorRegistry::with_defaults();
        let gen = BlobGenerator { hex: false };
        let args = GeneratorArgs::new();
        assert_eq!(
            gen.generate(123, &args, &reg).unwrap(),
            gen.generate(123, &args, &reg).unwrap()
        );
    }

    #[test]
    fn respects_fixed_size() {
        let reg = super::super::GeneratorRegistry::with_defaults();
        let gen = BlobGenerator { hex: false };
        let mut args = GeneratorArgs::new();
        args.insert(
            "size".into(),
            serde_yaml::Value::Sequence(vec![serde_yaml::Value::from(5), serde_yaml::Value::from(5)]),
        );
        if let CqlValue::Blob(bytes) = gen.generate(1, &args, &reg).unwrap() {
            assert_eq!(bytes.len(), 5);
        } else {
            panic!("expected blob");
        }
    }

    #[test]
    fn hex_blob_is_text() {
        let reg = super::super::GeneratorRegistry::with_defaults();
        let gen = BlobGenerator { hex: true };
        let args = GeneratorArgs::new();
        assert!(matches!(gen.generate(1, &args, &reg).unwrap(), CqlValue::Text(_)));
    }
}
