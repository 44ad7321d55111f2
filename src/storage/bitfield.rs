/// A fixed-length set of flags packed eight to a byte.
///
/// Bits are numbered from the high bit of the first byte, the same order
/// peers use on the wire, so [`Bitfield::as_bytes`] can be sent unchanged.
/// The tracker uses one per piece for received blocks and one for the whole
/// torrent for verified pieces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitfield {
    bits: Vec<u8>,
    len: usize,
}

impl Bitfield {
    /// Creates a bitfield of `len` cleared bits.
    pub fn new(len: usize) -> Self {
        Self {
            bits: vec![0; len.div_ceil(8)],
            len,
        }
    }

    /// Returns true if bit `index` is set. Out-of-range indices read as unset.
    pub fn has(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        let byte_index = index / 8;
        let bit_index = 7 - (index % 8);
        (self.bits[byte_index] >> bit_index) & 1 == 1
    }

    pub fn set(&mut self, index: usize) {
        if index >= self.len {
            return;
        }
        let byte_index = index / 8;
        let bit_index = 7 - (index % 8);
        self.bits[byte_index] |= 1 << bit_index;
    }

    pub fn clear(&mut self, index: usize) {
        if index >= self.len {
            return;
        }
        let byte_index = index / 8;
        let bit_index = 7 - (index % 8);
        self.bits[byte_index] &= !(1 << bit_index);
    }

    /// Unsets every bit.
    pub fn clear_all(&mut self) {
        self.bits.fill(0);
    }

    /// Number of set bits.
    pub fn count(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.count() == self.len
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&b| b == 0)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    /// Indices of all unset bits, in order.
    pub fn missing(&self) -> Vec<usize> {
        (0..self.len).filter(|&i| !self.has(i)).collect()
    }
}
