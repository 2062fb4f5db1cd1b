mod memory;
mod traits;

pub use memory::InMemoryRevocationStore;
pub use traits::RevocationStore;

#[cfg(test)]
mod tests;
