use byteorder::{ByteOrder, LittleEndian};

/// Number of bits covered by one entry of the rank index.
pub const CHUNK_BITS: usize = 256;

const WORD_BITS: usize = 32;
const WORDS_PER_CHUNK: usize = CHUNK_BITS / WORD_BITS;

/// Bit vector over a borrowed byte buffer, supporting rank and select queries.
///
/// Bits are read LSB-first within each byte. An index of cumulative one-bit
/// counts is kept per 256-bit chunk: `index[i]` is the number of ones in
/// chunks `0..=i`. Rank is answered from the index plus a scan of at most
/// eight 32-bit words; select binary-searches the index and then scans the
/// words of a single chunk.
///
/// # Example
///
/// ```
/// use lsdict::BitVector;
///
/// let bv = BitVector::build(&[0b0110_0101]);
/// assert_eq!(bv.num_bits(), 8);
/// assert_eq!(bv.rank1(3), 2);
/// assert_eq!(bv.rank0(3), 1);
/// assert_eq!(bv.select1(2), Some(5));
/// assert_eq!(bv.select0(0), Some(1));
/// assert_eq!(bv.select1(4), None);
/// ```
#[derive(Clone, Debug)]
pub struct BitVector<'a> {
    bytes: &'a [u8],
    index: Vec<u64>,
    num_bits: usize,
}

impl<'a> BitVector<'a> {
    /// Builds the rank index over `bytes`. The logical length is `8 * bytes.len()`.
    pub fn build(bytes: &'a [u8]) -> Self {
        let num_bits = bytes.len() * 8;
        let num_chunks = (num_bits + CHUNK_BITS - 1) / CHUNK_BITS;
        let mut index = Vec::with_capacity(num_chunks);
        let mut ones = 0;
        for ci in 0..num_chunks {
            for wi in 0..WORDS_PER_CHUNK {
                ones += word_at(bytes, ci * WORDS_PER_CHUNK + wi).count_ones() as u64;
            }
            index.push(ones);
        }
        Self {
            bytes,
            index,
            num_bits,
        }
    }

    /// Gets the `pos`-th bit, or `false` if `pos` is out of bounds.
    #[inline(always)]
    pub fn get(&self, pos: usize) -> bool {
        match self.bytes.get(pos / 8) {
            Some(&b) => (b >> (pos % 8)) & 1 == 1,
            None => false,
        }
    }

    /// Returns the number of ones in `[0, pos)`. `pos` is clamped to [`Self::num_bits`].
    pub fn rank1(&self, pos: usize) -> usize {
        let pos = pos.min(self.num_bits);
        let ci = pos / CHUNK_BITS;
        let mut ones = if ci == 0 {
            0
        } else {
            self.index[ci - 1] as usize
        };
        let first = ci * WORDS_PER_CHUNK;
        let last = pos / WORD_BITS;
        for wi in first..last {
            ones += word_at(self.bytes, wi).count_ones() as usize;
        }
        let rem = pos % WORD_BITS;
        if rem != 0 {
            let mask = (1u32 << rem) - 1;
            ones += (word_at(self.bytes, last) & mask).count_ones() as usize;
        }
        ones
    }

    /// Returns the number of zeros in `[0, pos)`. `pos` is clamped to [`Self::num_bits`].
    #[inline(always)]
    pub fn rank0(&self, pos: usize) -> usize {
        pos.min(self.num_bits) - self.rank1(pos)
    }

    /// Returns the number of ones (if `ones`) or zeros in `[0, pos)`.
    #[inline(always)]
    pub fn rank(&self, pos: usize, ones: bool) -> usize {
        if ones {
            self.rank1(pos)
        } else {
            self.rank0(pos)
        }
    }

    /// Returns the position of the `n`-th one (0-indexed), or [`None`] if
    /// there are not that many ones.
    pub fn select1(&self, n: usize) -> Option<usize> {
        self.select(n, true)
    }

    /// Returns the position of the `n`-th zero (0-indexed), or [`None`] if
    /// there are not that many zeros.
    pub fn select0(&self, n: usize) -> Option<usize> {
        self.select(n, false)
    }

    /// Returns the position of the `n`-th one (if `ones`) or zero.
    pub fn select(&self, n: usize, ones: bool) -> Option<usize> {
        let (mut lo, mut hi) = (0, self.index.len());
        while lo < hi {
            let mi = (lo + hi) / 2;
            if self.count_through(mi, ones) <= n {
                lo = mi + 1;
            } else {
                hi = mi;
            }
        }
        if lo == self.index.len() {
            return None;
        }

        let ci = lo;
        let mut rem = if ci == 0 {
            n
        } else {
            n - self.count_through(ci - 1, ones)
        };
        for wi in ci * WORDS_PER_CHUNK..(ci + 1) * WORDS_PER_CHUNK {
            let mut word = word_at(self.bytes, wi);
            if !ones {
                word = !word;
            }
            let cnt = word.count_ones() as usize;
            if rem < cnt {
                let pos = wi * WORD_BITS + select_in_word(word, rem);
                return if pos < self.num_bits { Some(pos) } else { None };
            }
            rem -= cnt;
        }
        None
    }

    /// Number of matching bits in chunks `0..=ci`, not counting bits past the end.
    #[inline(always)]
    fn count_through(&self, ci: usize, ones: bool) -> usize {
        let num_ones = self.index[ci] as usize;
        if ones {
            num_ones
        } else {
            ((ci + 1) * CHUNK_BITS).min(self.num_bits) - num_ones
        }
    }

    /// Returns the number of bits.
    #[inline(always)]
    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    /// Returns the number of ones.
    #[inline(always)]
    pub fn num_ones(&self) -> usize {
        self.index.last().map_or(0, |&x| x as usize)
    }

    /// Returns the number of zeros.
    #[inline(always)]
    pub fn num_zeros(&self) -> usize {
        self.num_bits - self.num_ones()
    }

    /// Returns the underlying bytes.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Returns the heap size of the rank index in bytes.
    pub fn index_size_in_bytes(&self) -> usize {
        self.index.len() * std::mem::size_of::<u64>()
    }
}

/// Reads the `wi`-th little-endian 32-bit word, zero-padding past the end.
#[inline(always)]
fn word_at(bytes: &[u8], wi: usize) -> u32 {
    let beg = wi * 4;
    if beg + 4 <= bytes.len() {
        LittleEndian::read_u32(&bytes[beg..beg + 4])
    } else if beg < bytes.len() {
        let mut buf = [0; 4];
        buf[..bytes.len() - beg].copy_from_slice(&bytes[beg..]);
        LittleEndian::read_u32(&buf)
    } else {
        0
    }
}

/// Position of the `k`-th one in `word`. The caller guarantees `k < popcount(word)`.
#[inline(always)]
fn select_in_word(mut word: u32, k: usize) -> usize {
    for _ in 0..k {
        word &= word - 1;
    }
    word.trailing_zeros() as usize
}
