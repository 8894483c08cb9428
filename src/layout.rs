//! Declarative byte layouts
//!
//! Wire and offload layouts are described as tables of [`BitField`]s and
//! [`WordField`]s instead of hand-indexed byte writes. Every layout is checked
//! at compile time with [`fits`] (all fields inside the buffer, no two fields
//! sharing a bit), and enum conversions go through [`lookup`] on static
//! mapping tables.
//!
//! ## Usage
//!
//! ```rust
//! use birdsong::layout::{BitField, fits};
//!
//! const FREQ: BitField = BitField::new(3, 0xF0);
//! const MODE: BitField = BitField::new(3, 0x0F);
//! const _: () = assert!(fits(&[FREQ, MODE], 4));
//!
//! let mut buf = [0u8; 4];
//! FREQ.set(&mut buf, 0x20);
//! MODE.set(&mut buf, 0x02);
//! assert_eq!(buf[3], 0x22);
//! assert_eq!(FREQ.get(&buf), 0x20);
//! ```

/// A masked bit range within one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    /// Byte offset
    pub offset: usize,
    /// Bit mask within the byte
    pub mask: u8,
}

impl BitField {
    /// Create a field covering `mask` at `offset`
    #[must_use]
    pub const fn new(offset: usize, mask: u8) -> Self {
        Self { offset, mask }
    }

    /// Create a field covering a whole byte
    #[must_use]
    pub const fn byte(offset: usize) -> Self {
        Self::new(offset, 0xFF)
    }

    /// Read the masked value (bits stay in place)
    ///
    /// Out-of-range offsets read as zero.
    #[must_use]
    pub fn get(&self, buf: &[u8]) -> u8 {
        buf.get(self.offset).map_or(0, |b| b & self.mask)
    }

    /// Write the masked value, leaving the other bits of the byte untouched
    pub fn set(&self, buf: &mut [u8], value: u8) {
        if let Some(b) = buf.get_mut(self.offset) {
            *b = (*b & !self.mask) | (value & self.mask);
        }
    }

    /// Set extra bits of the field without clearing the ones already set
    pub fn insert(&self, buf: &mut [u8], value: u8) {
        if let Some(b) = buf.get_mut(self.offset) {
            *b |= value & self.mask;
        }
    }

    /// Check if two fields share a bit
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.offset == other.offset && (self.mask & other.mask) != 0
    }
}

/// A little-endian 16-bit field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordField {
    /// Byte offset of the low byte
    pub offset: usize,
}

impl WordField {
    /// Create a field at `offset` (low byte) and `offset + 1` (high byte)
    #[must_use]
    pub const fn new(offset: usize) -> Self {
        Self { offset }
    }

    /// Read the value, zero if out of range
    #[must_use]
    pub fn get(&self, buf: &[u8]) -> u16 {
        match buf.get(self.offset..self.offset + 2) {
            Some(b) => u16::from_le_bytes([b[0], b[1]]),
            None => 0,
        }
    }

    /// Write the value
    pub fn set(&self, buf: &mut [u8], value: u16) {
        if let Some(b) = buf.get_mut(self.offset..self.offset + 2) {
            b.copy_from_slice(&value.to_le_bytes());
        }
    }

    /// Byte-level view of this field
    #[must_use]
    pub const fn bytes(&self) -> [BitField; 2] {
        [BitField::byte(self.offset), BitField::byte(self.offset + 1)]
    }
}

/// Check that every field lies inside a buffer of `size` bytes and that no
/// two fields share a bit
#[must_use]
pub const fn fits(fields: &[BitField], size: usize) -> bool {
    let mut i = 0;
    while i < fields.len() {
        if fields[i].offset >= size || fields[i].mask == 0 {
            return false;
        }
        let mut j = i + 1;
        while j < fields.len() {
            if fields[i].overlaps(&fields[j]) {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

/// Find the value mapped to `key` in a static mapping table
#[must_use]
pub fn lookup<K: PartialEq + Copy, V: Copy>(table: &[(K, V)], key: K) -> Option<V> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Find the key mapped to `value` in a static mapping table
#[must_use]
pub fn reverse_lookup<K: Copy, V: PartialEq + Copy>(table: &[(K, V)], value: V) -> Option<K> {
    table.iter().find(|(_, v)| *v == value).map(|(k, _)| *k)
}

/// Check that the keys of a wire flag table are distinct single bits inside `mask`
#[must_use]
pub const fn flags_within<V>(table: &[(u8, V)], mask: u8) -> bool {
    let mut seen = 0u8;
    let mut i = 0;
    while i < table.len() {
        let flag = table[i].0;
        if flag.count_ones() != 1 || (flag & !mask) != 0 || (seen & flag) != 0 {
            return false;
        }
        seen |= flag;
        i += 1;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitfield_masking() {
        let field = BitField::new(1, 0x30);
        let mut buf = [0xFFu8; 3];
        field.set(&mut buf, 0x10);
        assert_eq!(buf[1], 0xDF);
        assert_eq!(field.get(&buf), 0x10);

        field.insert(&mut buf, 0x20);
        assert_eq!(field.get(&buf), 0x30);
    }

    #[test]
    fn test_bitfield_out_of_range() {
        let field = BitField::new(8, 0xFF);
        let mut buf = [0u8; 4];
        field.set(&mut buf, 0xAA);
        assert_eq!(buf, [0; 4]);
        assert_eq!(field.get(&buf), 0);
    }

    #[test]
    fn test_word_field_little_endian() {
        let field = WordField::new(2);
        let mut buf = [0u8; 4];
        field.set(&mut buf, 0x8000);
        assert_eq!(buf, [0x00, 0x00, 0x00, 0x80]);
        assert_eq!(field.get(&buf), 0x8000);
    }

    #[test]
    fn test_fits_detects_overlap_and_range() {
        let a = BitField::new(0, 0xF0);
        let b = BitField::new(0, 0x0F);
        let c = BitField::new(0, 0x18);
        assert!(fits(&[a, b], 1));
        assert!(!fits(&[a, c], 1));
        assert!(!fits(&[a, b], 0));
        let w = WordField::new(0).bytes();
        assert!(!fits(&[w[0], a], 2));
    }

    #[test]
    fn test_lookup_tables() {
        const TABLE: [(u8, u16); 3] = [(0x01, 10), (0x02, 20), (0x04, 40)];
        assert_eq!(lookup(&TABLE, 0x02), Some(20));
        assert_eq!(lookup(&TABLE, 0x08), None);
        assert_eq!(reverse_lookup(&TABLE, 40), Some(0x04));
        assert!(flags_within(&TABLE, 0x07));
        assert!(!flags_within(&TABLE, 0x03));
        assert!(!flags_within(&[(0x03u8, 1u8)], 0xFF));
    }
}
