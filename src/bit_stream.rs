use std::io;

/// Append-only writer of bit streams.
///
/// Bits are packed LSB-first: bit `i` of the stream lives in
/// `bytes[i / 8] >> (i % 8)`, which is the order [`BitVector`](crate::BitVector) reads.
#[derive(Clone, Default, Debug)]
pub struct BitStreamBuilder {
    bytes: Vec<u8>,
    num_bits: usize,
}

impl BitStreamBuilder {
    /// Makes an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a single bit.
    pub fn push_bit(&mut self, bit: bool) {
        let (q, m) = decompose(self.num_bits);
        if m == 0 {
            self.bytes.push(0);
        }
        if bit {
            self.bytes[q] |= 1 << m;
        }
        self.num_bits += 1;
    }

    /// Appends the lowest `width` bits of `value`, least significant first.
    pub fn push_bits(&mut self, value: u64, width: usize) {
        debug_assert!(width <= 64);
        for i in 0..width {
            self.push_bit((value >> i) & 1 == 1);
        }
    }

    /// Appends a run of raw bytes.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        if self.num_bits % 8 == 0 {
            self.bytes.extend_from_slice(bytes);
            self.num_bits += bytes.len() * 8;
        } else {
            for &b in bytes {
                self.push_bits(b as u64, 8);
            }
        }
    }

    /// Pads the stream with zero bits up to the next 32-bit boundary.
    pub fn pad32(&mut self) {
        let padded = words_for(self.num_bits) * 4;
        self.bytes.resize(padded, 0);
        self.num_bits = padded * 8;
    }

    /// Returns the number of bits written so far.
    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    /// Returns the number of bytes written so far, counting a partial byte.
    pub fn size_in_bytes(&self) -> usize {
        self.bytes.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn serialize_into<W: io::Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.bytes)
    }
}

fn words_for(bits: usize) -> usize {
    (bits + 31) / 32
}

fn decompose(x: usize) -> (usize, usize) {
    (x / 8, x % 8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits() {
        let mut bs = BitStreamBuilder::new();
        for &b in &[true, false, true, true, false, false, false, false, true] {
            bs.push_bit(b);
        }
        assert_eq!(bs.num_bits(), 9);
        assert_eq!(bs.as_bytes(), &[0b0000_1101, 0b0000_0001]);

        bs.pad32();
        assert_eq!(bs.num_bits(), 32);
        assert_eq!(bs.as_bytes(), &[0b0000_1101, 0b0000_0001, 0, 0]);

        // Already aligned.
        bs.pad32();
        assert_eq!(bs.size_in_bytes(), 4);
    }

    #[test]
    fn test_bytes() {
        let mut bs = BitStreamBuilder::new();
        bs.push_bytes(b"ab");
        assert_eq!(bs.as_bytes(), b"ab");

        bs.push_bit(true);
        bs.push_bytes(&[0xFF]);
        assert_eq!(bs.num_bits(), 25);
        assert_eq!(&bs.as_bytes()[2..], &[0xFF, 0x01]);

        let mut bs = BitStreamBuilder::new();
        bs.push_bits(0b101, 3);
        bs.push_bits(0b11, 2);
        assert_eq!(bs.as_bytes(), &[0b11101]);
    }

    #[test]
    fn test_empty_pad() {
        let mut bs = BitStreamBuilder::new();
        bs.pad32();
        assert_eq!(bs.num_bits(), 0);
        assert!(bs.into_bytes().is_empty());
    }
}
