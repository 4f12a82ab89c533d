//! Deterministic terrain synthesis and chunk geometry generation.
#![warn(missing_docs)]

mod biome;
mod error;
mod field;
mod mesh;
pub mod noise;
mod worker;

pub use biome::*;
pub use error::*;
pub use field::*;
pub use mesh::*;
pub use worker::*;
