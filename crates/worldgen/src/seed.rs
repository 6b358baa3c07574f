use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// World seed: a number and the noise permutation derived from it.
///
/// Immutable once built and cheap to share between threads.
#[derive(Clone, PartialEq, Eq)]
pub struct Seed {
    number: u64,
    perm: [u8; 256],
}

impl Seed {
    pub const DEFAULT: u64 = 2;

    pub fn new(number: u64) -> Self {
        let mut perm: [u8; 256] = std::array::from_fn(|i| i as u8);
        fastrand::Rng::with_seed(number).shuffle(&mut perm);
        Self { number, perm }
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn permutation(&self) -> &[u8; 256] {
        &self.perm
    }
}

impl Default for Seed {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed").field("number", &self.number).finish_non_exhaustive()
    }
}

impl Serialize for Seed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.number)
    }
}

impl<'de> Deserialize<'de> for Seed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::new(u64::deserialize(deserializer)?))
    }
}
