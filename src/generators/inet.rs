//! Seeded `inet` (§4.2.1). Grounded on the teacher's
//! `java_generate/values/inet.rs`, which folds a seed into IPv4 octets;
//! extended here with an optional `version` arg (`4` default, or `6`) since
//! the teacher's generator is IPv4-only.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use scylla::value::CqlValue;

use super::{arg_u64, ColumnGenerator};
use crate::error::LoadgenError;
use crate::model::GeneratorArgs;
use crate::rng::Seeded;

pub struct InetGenerator;

impl ColumnGenerator for InetGenerator {
    fn generate(
        &self,
        seed: u64,
        args: &GeneratorArgs,
        _registry: &super::GeneratorRegistry,
    ) -> Result<CqlValue, LoadgenError> {
        let version = arg_u64(args, "version", 4);
        let mut rng = Seeded::new(seed);

        let addr = if version == 6 {
            let hi = rng.next_u64();
            let lo = rng.next_u64();
            let mut bytes = [0u8; 16];
            bytes[..8].copy_from_slice(&hi.to_be_bytes());
            bytes[8..].copy_from_slice(&lo.to_be_bytes());
            IpAddr::V6(Ipv6Addr::from(bytes))
        } else {
            let v = rng.next_i64() as u32;
            let octets = v.to_be_bytes();
            IpAddr::V4(Ipv4Addr::from(octets))
        };

        Ok(CqlValue::Inet(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let reg = super::super::GeneratorRegistry::with_defaults();
        let gen = InetGenerator;
        let args = GeneratorArgs::new();
        assert_eq!(
            gen.generate(5, &args, &reg).unwrap(),
            gen.generate(5, &args, &reg).unwrap()
        );
    }

    #[test]
    fn v6_opt_in() {
        let reg = super::super::GeneratorRegistry::with_defaults();
        let gen = InetGenerator;
        let mut args = GeneratorArgs::new();
        args.insert("version".into(), serde_yaml::Value::from(6));
        match gen.generate(1, &args, &reg).unwrap() {
            CqlValue::Inet(IpAddr::V6(_)) => {}
            other => panic!("expected v6, got {other:?}"),
        }
    }
}
