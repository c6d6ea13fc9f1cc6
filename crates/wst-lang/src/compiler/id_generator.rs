//! Unique name sources for synthesized functions.
//!
//! Names must stay unique within a package for as long as its functions are
//! registered, so one generator serves every compilation into it. Tests use
//! [`SequentialIdGenerator`] to assert exact function names; seeded runs use
//! [`SeededIdGenerator`] so that the same seed always yields the same IR.
use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::time::SystemTime;

pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

#[derive(Debug, Default, Clone)]
pub struct SequentialIdGenerator {
    next: u64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&mut self) -> String {
        let id = self.next;
        self.next += 1;
        id.to_string()
    }
}

/// Emits UUID-shaped hex identifiers from a splitmix64 stream.
#[derive(Debug, Clone)]
pub struct SeededIdGenerator {
    state: u64,
}

impl SeededIdGenerator {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn random() -> Self {
        Self::new(RandomState::new().hash_one(SystemTime::now()))
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

impl IdGenerator for SeededIdGenerator {
    fn next_id(&mut self) -> String {
        let (hi, lo) = (self.next_u64(), self.next_u64());
        format!(
            "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
            hi >> 32,
            (hi >> 16) & 0xffff,
            hi & 0xffff,
            lo >> 48,
            lo & 0xffff_ffff_ffff
        )
    }
}
