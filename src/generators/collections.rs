//! Composite generators: `list`/`set`/`map` (§4.2.1).
//!
//! Grounded on the expansion's explicit fix for the source's unbounded
//! retry loop (§9(b)): `set` and map keys must be pairwise distinct, and a
//! bounded retry budget turns an infinite loop into a `GeneratorExhausted`
//! error instead.

use std::collections::HashSet;

use scylla::value::CqlValue;

use super::{arg_range, ColumnGenerator, GeneratorRegistry};
use crate::error::LoadgenError;
use crate::model::GeneratorArgs;
use crate::rng::Seeded;

/// Every element draw is deterministically re-seeded from the outer seed and
/// the element's index, rather than advancing a shared stream, so an
/// element's value depends only on its position - never on how many
/// elements were drawn before it.
fn element_seed(outer_seed: u64, index: u64) -> u64 {
    outer_seed.rotate_left(17) ^ index.wrapping_mul(0x9E3779B97F4A7C15)
}

fn sub_spec<'a>(args: &'a GeneratorArgs, key: &str) -> (&'a str, GeneratorArgs) {
    match args.get(key) {
        Some(serde_yaml::Value::Mapping(map)) => {
            let type_tag = map
                .get(serde_yaml::Value::String("type".into()))
                .and_then(|v| v.as_str())
                .unwrap_or("bigint");
            let nested_args = map
                .get(serde_yaml::Value::String("args".into()))
                .and_then(|v| v.as_mapping())
                .map(|m| {
                    m.iter()
                        .filter_map(|(k, v)| k.as_str().map(|k| (k.to_string(), v.clone())))
                        .collect()
                })
                .unwrap_or_default();
            (type_tag, nested_args)
        }
        _ => ("bigint", GeneratorArgs::new()),
    }
}

fn draw_length(args: &GeneratorArgs, seed: u64) -> usize {
    let (min, max) = arg_range(args, "size", (1, 5));
    if max > min {
        Seeded::new(seed).uniform_int(min, max) as usize
    } else {
        min.max(1) as usize
    }
}

const RETRY_BUDGET_MULTIPLIER: usize = 20;

pub struct ListGenerator;

impl ColumnGenerator for ListGenerator {
    fn generate(
        &self,
        seed: u64,
        args: &GeneratorArgs,
        registry: &GeneratorRegistry,
    ) -> Result<CqlValue, LoadgenError> {
        let len = draw_length(args, seed);
        let (element_type, element_args) = sub_spec(args, "element");

        let values = (0..len as u64)
            .map(|i| registry.generate(element_type, element_seed(seed, i), &element_args))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CqlValue::List(values))
    }
}

pub struct SetGenerator;

impl ColumnGenerator for SetGenerator {
    fn generate(
        &self,
        seed: u64,
        args: &GeneratorArgs,
        registry: &GeneratorRegistry,
    ) -> Result<CqlValue, LoadgenError> {
        let len = draw_length(args, seed);
        let (element_type, element_args) = sub_spec(args, "element");
        let budget = len * RETRY_BUDGET_MULTIPLIER;

        let mut seen = HashSet::new();
        let mut values = Vec::with_capacity(len);
        let mut attempts = 0usize;
        let mut draw = 0u64;

        while values.len() < len {
            if attempts >= budget {
                return Err(LoadgenError::GeneratorExhausted {
                    requested: len,
                    attempts,
                });
            }
            let value = registry.generate(element_type, element_seed(seed, draw), &element_args)?;
            draw += 1;
            attempts += 1;
            if seen.insert(format!("{value:?}")) {
                values.push(value);
            }
        }

        Ok(CqlValue::Set(values))
    }
}

pub struct MapGenerator;

impl ColumnGenerator for MapGenerator {
    fn generate(
        &self,
        seed: u64,
        args: &GeneratorArgs,
        registry: &GeneratorRegistry,
    ) -> Result<CqlValue, LoadgenError> {
        let len = draw_length(args, seed);
        let (key_type, key_args) = sub_spec(args, "key");
        let (value_type, value_args) = sub_spec(args, "element");
        let budget = len * RETRY_BUDGET_MULTIPLIER;

        let mut seen_keys = HashSet::new();
        let mut pairs = Vec::with_capacity(len);
        let mut attempts = 0usize;
        let mut draw = 0u64;

        while pairs.len() < len {
            if attempts >= budget {
                return Err(LoadgenError::GeneratorExhausted {
                    requested: len,
                    attempts,
                });
            }
            let key_seed = element_seed(seed, draw);
            let key = registry.generate(key_type, key_seed, &key_args)?;
            draw += 1;
            attempts += 1;
            if seen_keys.insert(format!("{key:?}")) {
                // The value seed is derived one step further so it never
                // coincides with the key's own seed.
                let value = registry.generate(value_type, element_seed(key_seed, 1), &value_args)?;
                pairs.push((key, value));
            }
        }

        Ok(CqlValue::Map(pairs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_has_requested_length_range() {
        let reg = GeneratorRegistry::with_defaults();
        let gen = ListGenerator;
        let mut args = GeneratorArgs::new();
        args.insert(
            "size".into(),
            serde_yaml::Value::Sequence(vec![serde_yaml::Value::from(3), serde_yaml::Value::from(4)]),
        );
        if let CqlValue::List(values) = gen.generate(1, &args, &reg).unwrap() {
            assert_eq!(values.len(), 3);
        } else {
            panic!("expected list");
        }
    }

    #[test]
    fn set_elements_are_distinct() {
        let reg = GeneratorRegistry::with_defaults();
        let gen = SetGenerator;
        let mut args = GeneratorArgs::new();
        args.insert(
            "size".into(),
            serde_yaml::Value::Sequence(vec![serde_yaml::Value::from(5), serde_yaml::Value::from(6)]),
        );
        args.insert(
            "element".into(),
            serde_yaml::Value::Mapping({
                let mut m = serde_yaml::Mapping::new();
                m.insert("type".into(), "int".into());
                m.insert(
                    "args".into(),
                    serde_yaml::Value::Mapping({
                        let mut a = serde_yaml::Mapping::new();
                        a.insert("min".into(), 0.into());
                        a.insert("max".into(), 1000.into());
                        a
                    }),
                );
                m
            }),
        );
        if let CqlValue::Set(values) = gen.generate(2, &args, &reg).unwrap() {
            let unique: HashSet<String> = values.iter().map(|v| format!("{v:?}")).collect();
            assert_eq!(unique.len(), values.len());
        } else {
            panic!("expected set");
        }
    }

    #[test]
    fn set_exhausts_when_domain_too_small() {
        let reg = GeneratorRegistry::with_defaults();
        let gen = SetGenerator;
        let mut args = GeneratorArgs::new();
        args.insert(
            "size".into(),
            serde_yaml::Value::Sequence(vec![serde_yaml::Value::from(50), serde_yaml::Value::from(51)]),
        );
        args.insert(
            "element".into(),
            serde_yaml::Value::Mapping({
                let mut m = serde_yaml::Mapping::new();
                m.insert("type".into(), "boolean".into());
                m
            }),
        );
        let err = gen.generate(3, &args, &reg);
        assert!(matches!(err, Err(LoadgenError::GeneratorExhausted { .. })));
    }

    #[test]
    fn map_keys_are_distinct() {
        let reg = GeneratorRegistry::with_defaults();
        let gen = MapGenerator;
        let mut args = GeneratorArgs::new();
        args.insert(
            "size".into(),
            serde_yaml::Value::Sequence(vec![serde_yaml::Value::from(4), serde_yaml::Value::from(5)]),
        );
        if let CqlValue::Map(pairs) = gen.generate(9, &args, &reg).unwrap() {
            let unique: HashSet<String> = pairs.iter().map(|(k, _)| format!("{k:?}")).collect();
            assert_eq!(unique.len(), pairs.len());
        } else {
            panic!("expected map");
        }
    }
}
