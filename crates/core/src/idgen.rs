//! Process-wide id generation

use std::marker::PhantomData;
use std::sync::atomic::{self, AtomicU64};

/// Thread-safe monotonic ID generator
///
/// Ids are never reused for the lifetime of the generator. Values that do
/// not fit the target type are skipped.
pub struct IdGenerator<T: TryFrom<u64>> {
    next_id: AtomicU64,
    phantom: PhantomData<fn() -> T>,
}

impl<T: TryFrom<u64>> IdGenerator<T> {
    pub const fn new() -> Self {
        Self::starting_at(0)
    }

    /// Create a generator whose first id is `first`
    pub const fn starting_at(first: u64) -> Self {
        Self {
            next_id: AtomicU64::new(first),
            phantom: PhantomData,
        }
    }

    /// Get the next available ID
    pub fn get_available_id(&self) -> T {
        loop {
            let id = self.next_id.fetch_add(1, atomic::Ordering::Relaxed);
            if let Ok(id) = T::try_from(id) {
                return id;
            }
        }
    }
}

impl<T: TryFrom<u64>> Default for IdGenerator<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_generation() {
        let gen = IdGenerator::<u16>::new();
        let id1 = gen.get_available_id();
        let id2 = gen.get_available_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_starting_at() {
        let gen = IdGenerator::<u32>::starting_at(100);
        assert_eq!(gen.get_available_id(), 100);
        assert_eq!(gen.get_available_id(), 101);
    }
}
