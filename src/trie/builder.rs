use std::io;

use anyhow::{anyhow, Result};
use byteorder::{LittleEndian, WriteBytesExt};

use crate::bit_stream::BitStreamBuilder;
use crate::utils;
use crate::DEFAULT_TRANSITION_BITS;

/// Builder of a LOUDS-encoded trie image.
///
/// Keys can be added in any order; duplicates collapse into one entry.
/// [`TrieBuilder::build`] sorts the keys, lays the trie out in level order
/// and assigns identifiers in the order terminal edges are discovered: all
/// keys of length 1 first, then keys of length 2, and so on, in
/// lexicographic order within each length.
///
/// # Example
///
/// ```
/// use lsdict::TrieBuilder;
///
/// let mut builder = TrieBuilder::new();
/// for key in ["abc", "a", "abd", "b", "a"] {
///     builder.add(key).unwrap();
/// }
/// builder.build().unwrap();
///
/// assert_eq!(builder.num_keys(), 4);
/// assert_eq!(builder.key_index("a"), Some(0));
/// assert_eq!(builder.key_index("b"), Some(1));
/// assert_eq!(builder.key_index("abd"), Some(3));
/// assert_eq!(builder.key_index("ab"), None);
/// ```
#[derive(Clone, Debug)]
pub struct TrieBuilder {
    keys: Vec<Vec<u8>>,
    ids: Vec<usize>,
    transition_bits: usize,
    image: Vec<u8>,
    built: bool,
}

impl Default for TrieBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrieBuilder {
    /// Makes the builder with 8-bit transitions.
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            ids: Vec::new(),
            transition_bits: DEFAULT_TRANSITION_BITS,
            image: Vec::new(),
            built: false,
        }
    }

    /// Makes the builder with the given transition width.
    ///
    /// # Arguments
    ///
    ///  - `bits`: Number of bits per edge label, in `1..=8`. Every key byte
    ///    must be less than `2^bits`.
    pub fn with_transition_bits(bits: usize) -> Result<Self> {
        let mut builder = Self::new();
        builder.set_transition_bits(bits)?;
        Ok(builder)
    }

    /// Sets the transition width. It cannot be changed after [`TrieBuilder::build`].
    pub fn set_transition_bits(&mut self, bits: usize) -> Result<()> {
        if self.built {
            return Err(anyhow!("the trie is already built."));
        }
        if !(1..=8).contains(&bits) {
            return Err(anyhow!("transition_bits must be in 1..=8, got {}.", bits));
        }
        self.transition_bits = bits;
        Ok(())
    }

    /// Builds and returns the builder holding all the given keys.
    ///
    /// # Example
    ///
    /// ```
    /// use lsdict::TrieBuilder;
    ///
    /// let builder = TrieBuilder::from_keys(["tea", "ten", "to"]).unwrap();
    /// assert_eq!(builder.key_index("to"), Some(0));
    /// ```
    pub fn from_keys<I, P>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        let mut builder = Self::new();
        for key in keys {
            builder.add(key)?;
        }
        builder.build()?;
        Ok(builder)
    }

    /// Adds the given key. The key must not be empty.
    pub fn add<P>(&mut self, key: P) -> Result<()>
    where
        P: AsRef<[u8]>,
    {
        let key = key.as_ref();
        if self.built {
            return Err(anyhow!("the trie is already built."));
        }
        if key.is_empty() {
            return Err(anyhow!("the input key is empty."));
        }
        self.keys.push(key.to_vec());
        Ok(())
    }

    /// Encodes the added keys into the image.
    ///
    /// Fails if a key byte does not fit in the transition width.
    /// With no keys, a root-only image is produced.
    pub fn build(&mut self) -> Result<()> {
        if self.built {
            return Err(anyhow!("the trie is already built."));
        }
        self.keys.sort_unstable();
        self.keys.dedup();

        let limit = 1usize << self.transition_bits;
        for key in &self.keys {
            if let Some(&c) = key.iter().find(|&&c| limit <= c as usize) {
                return Err(anyhow!(
                    "the input key contains {:#04x}, exceeding {} transition bits.",
                    c,
                    self.transition_bits
                ));
            }
        }

        let keys = &self.keys;
        let mut ids = vec![0; keys.len()];
        let mut next_id = 0;

        let mut edges = BitStreamBuilder::new();
        let mut terminals = BitStreamBuilder::new();
        let mut labels = Vec::new();

        // Synthetic edge into the root, closed by the super-root's terminator.
        edges.push_bit(true);
        edges.push_bit(false);
        terminals.push_bit(false);
        labels.push(0);

        if keys.is_empty() {
            edges.push_bit(false);
        }

        // Keys with length >= depth, in sorted order.
        let mut alive: Vec<usize> = (0..keys.len()).collect();
        let mut depth = 0;
        while !alive.is_empty() {
            let num_edges = labels.len();
            let mut i = 0;
            while i < alive.len() {
                // The node spelled by the first `depth` bytes of keys[alive[i]].
                let node = &keys[alive[i]][..depth];
                let mut j = i + 1;
                while j < alive.len() && &keys[alive[j]][..depth] == node {
                    j += 1;
                }

                let mut k = i;
                while k < j {
                    let key = &keys[alive[k]];
                    if key.len() == depth {
                        k += 1;
                        continue;
                    }
                    let c = key[depth];
                    let terminal = key.len() == depth + 1;
                    edges.push_bit(true);
                    terminals.push_bit(terminal);
                    labels.push(c);
                    if terminal {
                        ids[alive[k]] = next_id;
                        next_id += 1;
                    }
                    k += 1;
                    while k < j && keys[alive[k]][depth] == c {
                        k += 1;
                    }
                }
                edges.push_bit(false);
                i = j;
            }
            log::trace!(
                "depth {}: {} keys alive, {} edges",
                depth,
                alive.len(),
                labels.len() - num_edges
            );
            alive.retain(|&ki| keys[ki].len() > depth);
            depth += 1;
        }
        debug_assert_eq!(next_id, keys.len());

        let transitions = self.encode_transitions(&labels);
        edges.pad32();
        terminals.pad32();

        let num_planes = if self.transition_bits == 8 {
            1
        } else {
            self.transition_bits
        };
        let mut image = Vec::with_capacity(
            utils::HEADER_BYTES
                + edges.size_in_bytes()
                + terminals.size_in_bytes()
                + transitions.len(),
        );
        image.write_u32::<LittleEndian>(utils::to_u32(edges.size_in_bytes())?)?;
        image.write_u32::<LittleEndian>(utils::to_u32(terminals.size_in_bytes())?)?;
        image.write_u32::<LittleEndian>(utils::to_u32(self.transition_bits)?)?;
        image.write_u32::<LittleEndian>(utils::to_u32(transitions.len() / num_planes)?)?;
        edges.serialize_into(&mut image)?;
        terminals.serialize_into(&mut image)?;
        image.extend_from_slice(&transitions);

        log::debug!(
            "built trie: {} keys, {} edges, depth {}, {} transition bits, {} bytes",
            keys.len(),
            labels.len(),
            depth,
            self.transition_bits,
            image.len()
        );

        self.ids = ids;
        self.image = image;
        self.built = true;
        Ok(())
    }

    /// Encodes edge labels as raw bytes, or as `transition_bits` bit planes
    /// each padded to 32 bits.
    fn encode_transitions(&self, labels: &[u8]) -> Vec<u8> {
        let mut transitions = Vec::new();
        if self.transition_bits == 8 {
            let mut plane = BitStreamBuilder::new();
            plane.push_bytes(labels);
            plane.pad32();
            transitions.extend_from_slice(plane.as_bytes());
        } else {
            for k in 0..self.transition_bits {
                let mut plane = BitStreamBuilder::new();
                for &c in labels {
                    plane.push_bit((c >> k) & 1 == 1);
                }
                plane.pad32();
                transitions.extend_from_slice(plane.as_bytes());
            }
        }
        transitions
    }

    /// Returns the identifier assigned to `key`, or [`None`] if it was not
    /// added or the trie is not built yet.
    pub fn key_index<P>(&self, key: P) -> Option<usize>
    where
        P: AsRef<[u8]>,
    {
        if !self.built {
            return None;
        }
        let key = key.as_ref();
        self.keys
            .binary_search_by(|k| k.as_slice().cmp(key))
            .ok()
            .map(|i| self.ids[i])
    }

    /// Returns the image. It is empty until [`TrieBuilder::build`] succeeds.
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    /// Returns the image, consuming the builder.
    pub fn into_image(self) -> Vec<u8> {
        self.image
    }

    /// Returns the number of bytes of the image.
    pub fn size_in_bytes(&self) -> usize {
        self.image.len()
    }

    /// Returns the number of distinct keys, available after [`TrieBuilder::build`].
    pub fn num_keys(&self) -> usize {
        if self.built {
            self.keys.len()
        } else {
            0
        }
    }

    /// Returns the configured transition width.
    pub fn transition_bits(&self) -> usize {
        self.transition_bits
    }

    /// Returns true once [`TrieBuilder::build`] has succeeded.
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Writes the image into a writer.
    pub fn serialize_into<W: io::Write>(&self, mut writer: W) -> Result<()> {
        if !self.built {
            return Err(anyhow!("the trie is not built yet."));
        }
        writer.write_all(&self.image)?;
        Ok(())
    }
}
