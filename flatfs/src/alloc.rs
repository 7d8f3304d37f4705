#[derive(Debug, PartialEq)]
pub enum State {
    Free,
    Used,
}

/// A bit-vector laid over a borrowed byte region, one bit per id. Bit `n` lives in byte `n / 8`
/// at position `n % 8`, so the encoding is independent of host endianness.
///
/// The bitmap block stores two of these side by side; see [`crate::layout`].
pub struct Bitmap<B> {
    bits: B,
}

impl<B: AsRef<[u8]>> Bitmap<B> {
    pub fn new(bits: B) -> Self {
        Self { bits }
    }

    /// The number of ids the region can track.
    pub fn capacity(&self) -> usize {
        self.bits.as_ref().len() * 8
    }

    pub fn get(&self, nr: usize) -> State {
        assert!(nr < self.capacity(), "bit {} out of bitmap range", nr);
        let byte = self.bits.as_ref()[nr / 8];
        match (byte >> (nr % 8)) & 0b1 {
            0 => State::Free,
            _ => State::Used,
        }
    }

    /// Implements a naive first-fit allocation policy: returns the lowest free id below `cap`.
    ///
    /// ## Other Allocation Policies
    ///
    /// 1. Allocation that remembers where the last search ended so repeated allocations don't
    ///    rescan the front of the map.
    /// 2. Allocation that attempts to spread randomly over blocks to prevent wear of physical
    ///    devices in the front section.
    pub fn first_free(&self, cap: usize) -> Option<usize> {
        let cap = std::cmp::min(cap, self.capacity());
        (0..cap).find(|&nr| self.get(nr) == State::Free)
    }

    pub fn count_used(&self, cap: usize) -> usize {
        let cap = std::cmp::min(cap, self.capacity());
        (0..cap).filter(|&nr| self.get(nr) == State::Used).count()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Bitmap<B> {
    pub fn set_reserved(&mut self, nr: usize) {
        assert!(nr < self.capacity(), "bit {} out of bitmap range", nr);
        self.bits.as_mut()[nr / 8] |= 0b1 << (nr % 8);
    }

    pub fn set_free(&mut self, nr: usize) {
        assert!(nr < self.capacity(), "bit {} out of bitmap range", nr);
        self.bits.as_mut()[nr / 8] &= !(0b1 << (nr % 8));
    }
}
