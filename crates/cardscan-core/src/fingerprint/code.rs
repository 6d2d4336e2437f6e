//! Bit strings packed big-endian into bytes.
//!
//! A code of `bit_len` bits is right-aligned in `ceil(bit_len / 8)` bytes, so
//! the unused leading bits of the first byte are always zero. That keeps the
//! hex form identical to a zero-filled big integer and lets Hamming distance
//! run as XOR + popcount over whole bytes.

use super::HashError;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HashCode {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl HashCode {
    /// Pack bits given most-significant first.
    pub fn from_bits(bits: &[bool]) -> Self {
        let bit_len = bits.len();
        let byte_len = bit_len.div_ceil(8);
        let pad = byte_len * 8 - bit_len;
        let mut bytes = vec![0u8; byte_len];

        for (i, _) in bits.iter().enumerate().filter(|(_, set)| **set) {
            let pos = pad + i;
            bytes[pos / 8] |= 0x80 >> (pos % 8);
        }

        Self { bytes, bit_len }
    }

    /// Decode a hex string. The width is four bits per digit; use
    /// [`HashCode::resized`] to bring it to a scheme's width.
    pub fn from_hex(hex: &str) -> Result<Self, HashError> {
        let hex = hex.trim();
        if hex.is_empty() {
            return Err(HashError::Empty);
        }

        let mut nibbles = Vec::with_capacity(hex.len() + 1);
        if hex.len() % 2 == 1 {
            nibbles.push(0u8);
        }
        for (position, digit) in hex.chars().enumerate() {
            let value = digit
                .to_digit(16)
                .ok_or(HashError::InvalidDigit { digit, position })?;
            nibbles.push(value as u8);
        }

        let bytes = nibbles
            .chunks_exact(2)
            .map(|pair| (pair[0] << 4) | pair[1])
            .collect();

        Ok(Self {
            bytes,
            bit_len: hex.len() * 4,
        })
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Bit `index`, counted from the most significant end.
    pub fn bit(&self, index: usize) -> bool {
        debug_assert!(index < self.bit_len);
        let pos = self.bytes.len() * 8 - self.bit_len + index;
        self.bytes[pos / 8] & (0x80 >> (pos % 8)) != 0
    }

    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.bit_len).map(|i| self.bit(i))
    }

    /// Lowercase hex, `ceil(bit_len / 4)` digits, zero filled.
    pub fn to_hex(&self) -> String {
        let full: String = self.bytes.iter().map(|b| format!("{:02x}", b)).collect();
        let digits = self.bit_len.div_ceil(4);
        full[full.len() - digits..].to_string()
    }

    /// Re-express the code with exactly `bit_len` bits.
    ///
    /// Widening prepends zero bits, which recovers codes whose leading zero
    /// digits were dropped. Narrowing only succeeds when every dropped leading
    /// bit is zero; otherwise the code does not fit and `None` is returned.
    pub fn resized(&self, bit_len: usize) -> Option<HashCode> {
        if bit_len == self.bit_len {
            return Some(self.clone());
        }

        let bits: Vec<bool> = if bit_len > self.bit_len {
            std::iter::repeat_n(false, bit_len - self.bit_len)
                .chain(self.bits())
                .collect()
        } else {
            let excess = self.bit_len - bit_len;
            if self.bits().take(excess).any(|b| b) {
                return None;
            }
            self.bits().skip(excess).collect()
        };

        Some(Self::from_bits(&bits))
    }

    /// Number of differing bits, or `None` when the widths differ.
    pub fn hamming(&self, other: &HashCode) -> Option<u32> {
        if self.bit_len != other.bit_len {
            return None;
        }
        Some(
            self.bytes
                .iter()
                .zip(&other.bytes)
                .map(|(a, b)| (a ^ b).count_ones())
                .sum(),
        )
    }
}

impl fmt::Display for HashCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for HashCode {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_msb_first() {
        let mut bits = vec![false; 64];
        bits[0] = true;
        bits[63] = true;
        let code = HashCode::from_bits(&bits);
        assert_eq!(code.to_hex(), "8000000000000001");
        assert!(code.bit(0));
        assert!(!code.bit(1));
        assert!(code.bit(63));
    }

    #[test]
    fn hex_keeps_leading_zeros() {
        let mut bits = vec![false; 64];
        bits[60] = true;
        let code = HashCode::from_bits(&bits);
        assert_eq!(code.to_hex(), "0000000000000008");
        assert_eq!(HashCode::from_hex("0000000000000008").unwrap(), code);
    }

    #[test]
    fn odd_widths_round_through_hex() {
        // 36 bits -> 9 hex digits, the top nibble of the first byte is padding
        let bits: Vec<bool> = (0..36).map(|i| i % 3 == 0).collect();
        let code = HashCode::from_bits(&bits);
        let hex = code.to_hex();
        assert_eq!(hex.len(), 9);
        let back = HashCode::from_hex(&hex).unwrap();
        assert_eq!(back.bits().collect::<Vec<_>>(), bits);
    }

    #[test]
    fn rejects_bad_digits() {
        assert_eq!(HashCode::from_hex(""), Err(HashError::Empty));
        assert_eq!(
            HashCode::from_hex("00zz"),
            Err(HashError::InvalidDigit {
                digit: 'z',
                position: 2
            })
        );
    }

    #[test]
    fn truncated_leading_zeros_are_restored() {
        let short = HashCode::from_hex("ff").unwrap();
        let full = short.resized(64).unwrap();
        assert_eq!(full.to_hex(), "00000000000000ff");
        assert_eq!(full, HashCode::from_hex("00000000000000ff").unwrap());
    }

    #[test]
    fn narrowing_refuses_significant_bits() {
        let wide = HashCode::from_hex("1ffffffffffffffff").unwrap();
        assert!(wide.resized(64).is_none());
        let padded = HashCode::from_hex("0ffffffffffffffff").unwrap();
        assert_eq!(padded.resized(64).unwrap().to_hex(), "ffffffffffffffff");
    }

    #[test]
    fn hamming_counts_differing_bits() {
        let a = HashCode::from_hex("ffff000000000000").unwrap();
        let b = HashCode::from_hex("0fff000000000001").unwrap();
        assert_eq!(a.hamming(&b), Some(5));
        assert_eq!(b.hamming(&a), Some(5));
        assert_eq!(a.hamming(&a), Some(0));
    }

    #[test]
    fn hamming_requires_equal_width() {
        let a = HashCode::from_hex("ffff").unwrap();
        let b = HashCode::from_hex("ffffff").unwrap();
        assert_eq!(a.hamming(&b), None);
    }
}
