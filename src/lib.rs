#[macro_use]
extern crate async_trait;

pub mod config;
pub mod db;
pub mod error;
pub mod generators;
pub mod hashutil;
pub mod keystate;
pub mod model;
pub mod pipeline;
pub mod rng;
pub mod scheduler;
pub mod schema;
pub mod stats;
