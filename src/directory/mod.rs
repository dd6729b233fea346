//! Email directory backing the "email available" check

mod availability;
mod memory;
mod traits;

pub use availability::EmailAvailable;
pub use memory::InMemoryDirectory;
pub use traits::EmailDirectory;

#[cfg(test)]
pub use traits::MockEmailDirectory;
