//! Generator registry and the common generator contract (§4.2, §4.2.1).
//!
//! Every generator is a pure function of `(seed, args)`: the DataFabricator
//! has already resolved the seed (table-state level seed + column hash), so
//! generators must not draw any entropy of their own beyond what `seed`
//! feeds into a freshly-constructed `Seeded`.

pub mod blob;
pub mod boolean;
pub mod collections;
pub mod decimal;
pub mod float;
pub mod inet;
pub mod int;
pub mod text;
pub mod uuid;

use std::collections::HashMap;
use std::sync::Arc;

use scylla::value::CqlValue;

use crate::error::LoadgenError;
use crate::model::GeneratorArgs;
use crate::rng::Seeded;

/// Implemented by every column type generator. `generate` must be a pure
/// function of `seed` and `args` - no hidden state, no extra entropy. The
/// registry is threaded through purely so composite types (`list`/`set`/
/// `map`) can recurse into their element/key sub-generators by type tag;
/// scalar generators ignore it.
pub trait ColumnGenerator: Send + Sync {
    fn generate(
        &self,
        seed: u64,
        args: &GeneratorArgs,
        registry: &GeneratorRegistry,
    ) -> Result<CqlValue, LoadgenError>;
}

/// `type_tag -> generator` map populated once at process startup (§4.2.1).
#[derive(Clone)]
pub struct GeneratorRegistry {
    generators: HashMap<String, Arc<dyn ColumnGenerator>>,
}

impl GeneratorRegistry {
    /// Builds the registry with the full built-in catalogue (§4.2.1).
    pub fn with_defaults() -> Self {
        let mut generators: HashMap<String, Arc<dyn ColumnGenerator>> = HashMap::new();

        generators.insert("uuid".into(), Arc::new(uuid::UuidGenerator));

        generators.insert("bigint".into(), Arc::new(int::IntGenerator::BigInt));
        generators.insert("int".into(), Arc::new(int::IntGenerator::Int));
        generators.insert("smallint".into(), Arc::new(int::IntGenerator::SmallInt));
        generators.insert("tinyint".into(), Arc::new(int::IntGenerator::TinyInt));
        generators.insert("varint".into(), Arc::new(int::IntGenerator::Varint));

        generators.insert("boolean".into(), Arc::new(boolean::BooleanGenerator));
        generators.insert("decimal".into(), Arc::new(decimal::DecimalGenerator));
        generators.insert("float".into(), Arc::new(float::FloatGenerator::Single));
        generators.insert("double".into(), Arc::new(float::FloatGenerator::Double));
        generators.insert("inet".into(), Arc::new(inet::InetGenerator));
        generators.insert("blob".into(), Arc::new(blob::BlobGenerator { hex: false }));
        generators.insert("hex_blob".into(), Arc::new(blob::BlobGenerator { hex: true }));
        generators.insert("text".into(), Arc::new(text::TextGenerator));

        let mut registry = GeneratorRegistry { generators };
        registry.register("list", Arc::new(collections::ListGenerator));
        registry.register("set", Arc::new(collections::SetGenerator));
        registry.register("map", Arc::new(collections::MapGenerator));
        registry
    }

    pub fn register(&mut self, type_tag: &str, generator: Arc<dyn ColumnGenerator>) {
        self.generators.insert(type_tag.to_string(), generator);
    }

    pub fn contains(&self, type_tag: &str) -> bool {
        self.generators.contains_key(type_tag)
    }

    pub fn get(&self, type_tag: &str) -> Option<&Arc<dyn ColumnGenerator>> {
        self.generators.get(type_tag)
    }

    pub fn generate(
        &self,
        type_tag: &str,
        seed: u64,
        args: &GeneratorArgs,
    ) -> Result<CqlValue, LoadgenError> {
        // `collections.rs`'s element/key sub-generators recurse back through
        // this same registry, so composite types resolve their nested type
        // tags the same way top-level attributes do.
        let generator = self
            .generators
            .get(type_tag)
            .ok_or_else(|| LoadgenError::UnknownGeneratorType {
                attribute: String::new(),
                type_tag: type_tag.to_string(),
            })?
            .clone();
        generator.generate(seed, args, self)
    }
}

/// Reads a `u64` arg by key, falling back to `default`.
pub fn arg_u64(args: &GeneratorArgs, key: &str, default: u64) -> u64 {
    args.get(key)
        .and_then(|v| v.as_u64())
        .unwrap_or(default)
}

/// Reads an `i64` arg by key, falling back to `default`.
pub fn arg_i64(args: &GeneratorArgs, key: &str, default: i64) -> i64 {
    args.get(key).and_then(|v| v.as_i64()).unwrap_or(default)
}

/// Reads an `f64` arg by key, falling back to `default`.
pub fn arg_f64(args: &GeneratorArgs, key: &str, default: f64) -> f64 {
    args.get(key).and_then(|v| v.as_f64()).unwrap_or(default)
}

/// Reads a `[min, max)` size-style arg pair (`"size"` by convention, but the
/// key is parameterized so `collections.rs` can reuse this for nested specs).
/// Accepts either `{min: _, max: _}` or a two-element sequence `[min, max]`.
pub fn arg_range(args: &GeneratorArgs, key: &str, default: (u64, u64)) -> (u64, u64) {
    match args.get(key) {
        Some(serde_yaml::Value::Sequence(seq)) if seq.len() == 2 => {
            let lo = seq[0].as_u64().unwrap_or(default.0);
            let hi = seq[1].as_u64().unwrap_or(default.1);
            (lo, hi)
        }
        Some(serde_yaml::Value::Mapping(map)) => {
            let lo = map
                .get(serde_yaml::Value::String("min".into()))
                .and_then(|v| v.as_u64())
                .unwrap_or(default.0);
            let hi = map
                .get(serde_yaml::Value::String("max".into()))
                .and_then(|v| v.as_u64())
                .unwrap_or(default.1);
            (lo, hi)
        }
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_full_catalogue() {
        let reg = GeneratorRegistry::with_defaults();
        for tag in [
            "uuid", "bigint", "int", "smallint", "tinyint", "varint", "boolean", "decimal",
            "float", "double", "inet", "blob", "hex_blob", "text", "list", "set", "map",
        ] {
            assert!(reg.contains(tag), "missing generator {tag}");
        }
    }

    #[test]
    fn unknown_type_is_an_error() {
        let reg = GeneratorRegistry::with_defaults();
        let err = reg.generate("nope", 0, &GeneratorArgs::new());
        assert!(matches!(err, Err(LoadgenError::UnknownGeneratorType { .. })));
    }
}
