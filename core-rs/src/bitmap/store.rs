/**
 * store.rs
 * One bit per TCP port number, 0-65535
 *
 * bit = 1 means "unavailable". The store is a plain data structure:
 * it performs no locking and no range validation. Ports are validated
 * by the allocator before this layer is touched, and all mutation
 * happens under the allocator's shared lock.
 */

/// Number of addressable port states (ports 0-65535)
pub const PORT_SPACE_SIZE: usize = 65536;

const WORD_BITS: usize = 64;
const WORD_COUNT: usize = PORT_SPACE_SIZE / WORD_BITS;

/// Fixed-capacity bit vector over the whole port space
#[derive(Clone)]
pub struct PortBitmap {
    words: Box<[u64; WORD_COUNT]>,
}

impl Default for PortBitmap {
    fn default() -> Self {
        Self::new()
    }
}

impl PortBitmap {
    /// Create an empty bitmap (every port available)
    pub fn new() -> Self {
        PortBitmap {
            words: Box::new([0u64; WORD_COUNT]),
        }
    }

    /// Mark a port unavailable
    pub fn set(&mut self, port: u16) {
        let idx = port as usize;
        self.words[idx / WORD_BITS] |= 1u64 << (idx % WORD_BITS);
    }

    /// Mark a port available
    pub fn clear(&mut self, port: u16) {
        let idx = port as usize;
        self.words[idx / WORD_BITS] &= !(1u64 << (idx % WORD_BITS));
    }

    /// Test whether a port is unavailable
    pub fn test(&self, port: u16) -> bool {
        let idx = port as usize;
        self.words[idx / WORD_BITS] & (1u64 << (idx % WORD_BITS)) != 0
    }

    /// Whether every port in the inclusive range is unavailable
    pub fn all_set(&self, min: u16, max: u16) -> bool {
        (min..=max).all(|p| self.test(p))
    }

    /// Count of unavailable ports across the whole space
    pub fn count_set(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Count of unavailable ports in the inclusive range
    pub fn count_set_in(&self, min: u16, max: u16) -> usize {
        (min..=max).filter(|&p| self.test(p)).count()
    }
}

impl std::fmt::Debug for PortBitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortBitmap")
            .field("set", &self.count_set())
            .finish()
    }
}
