use crate::TrieReader;

/// Decoder class to get the key string associated with an ID.
#[derive(Clone)]
pub struct Decoder<'a> {
    trie: &'a TrieReader<'a>,
    dec: Vec<u8>,
    max_len: usize,
}

impl<'a> Decoder<'a> {
    /// Makes a [`Decoder`] without a length limit.
    ///
    /// # Arguments
    ///
    ///  - `trie`: Trie reader.
    pub fn new(trie: &'a TrieReader<'a>) -> Self {
        Self {
            trie,
            dec: Vec::new(),
            max_len: usize::MAX,
        }
    }

    /// Limits decoded keys to `max_len` bytes; longer keys decode to [`None`].
    pub fn with_max_length(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Returns the string associated with the given ID.
    ///
    /// # Arguments
    ///
    ///  - `id`: Key identifier.
    ///
    /// # Complexity
    ///
    ///  - Linear over the key length, with a select per byte.
    pub fn run(&mut self, id: usize) -> Option<&[u8]> {
        self.trie.reverse_into(id, self.max_len, &mut self.dec)?;
        Some(&self.dec)
    }
}
