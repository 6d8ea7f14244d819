/// Deterministic RNG based on splitmix64. Every component owns its own
/// salted stream; there is no process-global generator, so tiles can be
/// produced in any order on any thread with identical results.

#[inline]
pub fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive a component seed from the master seed and a salt constant.
#[inline]
pub fn sub_seed(seed: u64, salt: u64) -> u64 {
    splitmix64(seed ^ salt)
}

/// Incremental mixer for building stable cache keys: fold each field of the
/// generation parameters into the running hash. Floats are folded as raw
/// bits so any parameter change, however small, changes the key.
#[inline]
pub fn mix(h: u64, v: u64) -> u64 {
    splitmix64(h ^ v)
}

#[inline]
pub fn mix_f32(h: u64, v: f32) -> u64 {
    mix(h, v.to_bits() as u64)
}

/// Simple sequential RNG for world-scoped model generation (plates,
/// ranges, basins). Not used in per-cell inner loops.
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = splitmix64(self.state);
        self.state
    }

    pub fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / 16777216.0
    }

    pub fn range_f32(&mut self, lo: f32, hi: f32) -> f32 {
        lo + self.next_f32() * (hi - lo)
    }

    pub fn range_usize(&mut self, lo: usize, hi: usize) -> usize {
        lo + (self.next_u64() % (hi - lo) as u64) as usize
    }
}
