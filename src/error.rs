//! Fatal error kinds callers must be able to match on (§7).
//!
//! Everything else in this crate uses `anyhow::Result`, following the
//! teacher's split between typed errors at a few well-known seams and
//! `anyhow` everywhere else.
//!
//! §7 also names `UnknownQueryKind` as a distinct fatal kind. In this crate a
//! query's kind is a closed Rust enum (`model::QueryKind`) rather than an
//! open string, so an "unknown" kind can only ever be observed once, while
//! inferring it from CQL text at config-validation time
//! (`model::QueryKind::infer_from_cql`) - which already reports it as
//! `ConfigInvalid`, not as a separate pipeline-time fatal kind.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadgenError {
    #[error("invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: String, reason: String },

    #[error("unknown generator type {type_tag:?} for attribute {attribute}")]
    UnknownGeneratorType {
        attribute: String,
        type_tag: String,
    },

    #[error("could not draw {requested} distinct values within {attempts} attempts")]
    GeneratorExhausted { requested: usize, attempts: usize },
}
