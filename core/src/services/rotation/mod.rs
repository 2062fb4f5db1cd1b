//! Single-use refresh token rotation with reuse detection.

mod engine;

pub use engine::RotationEngine;

#[cfg(test)]
pub(crate) mod tests;
