pub mod builder;
pub mod decoder;
pub mod predictive_iter;

use std::ops::ControlFlow;

use anyhow::{anyhow, Result};

use crate::utils;
use crate::BitVector;

use decoder::Decoder;
use predictive_iter::PredictiveIter;

/// Edge id of the synthetic edge into the root; also the node id of the root.
const ROOT: usize = 0;

/// Query mode of [`TrieReader::search`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchMode {
    /// Reports the key itself if it is stored.
    Exact,
    /// Reports every stored key starting with the key, in lexicographic order.
    Predictive,
}

/// Reader of a LOUDS-encoded trie image produced by [`TrieBuilder`](crate::TrieBuilder).
///
/// The reader borrows the image and never writes through it, so it can be
/// shared across threads freely. Node `v` is identified with the edge that
/// enters it; edge 0 is a synthetic edge into the root.
///
/// # Example
///
/// ```
/// use lsdict::{SearchMode, TrieBuilder, TrieReader};
/// use std::ops::ControlFlow;
///
/// let builder = TrieBuilder::from_keys(["abc", "a", "abd", "b"]).unwrap();
/// let trie = TrieReader::open(builder.image()).unwrap();
///
/// // Exact match
/// let id = trie.exact_match("abd").unwrap();
/// assert_eq!(Some(id), builder.key_index("abd"));
/// assert_eq!(trie.exact_match("ab"), None);
///
/// // Predictive search
/// let mut found = vec![];
/// trie.search("a", SearchMode::Predictive, |key, _| {
///     found.push(key.to_vec());
///     ControlFlow::Continue(())
/// });
/// assert_eq!(found, vec![b"a".to_vec(), b"abc".to_vec(), b"abd".to_vec()]);
///
/// // Reverse lookup
/// assert_eq!(trie.reverse(id, 16), Some(b"abd".to_vec()));
/// ```
#[derive(Clone, Debug)]
pub struct TrieReader<'a> {
    edges: BitVector<'a>,
    terminals: BitVector<'a>,
    transitions: &'a [u8],
    transition_bits: usize,
    plane_len: usize,
    num_edges: usize,
    num_keys: usize,
    size_in_bytes: usize,
}

impl<'a> TrieReader<'a> {
    /// Opens an image, validating that every region fits within `bytes`.
    ///
    /// # Errors
    ///
    /// An error is returned if the image is truncated or structurally malformed.
    pub fn open(bytes: &'a [u8]) -> Result<Self> {
        let [edge_len, terminal_len, transition_bits, transition_len] =
            utils::read_header(bytes, "trie")?;
        let (edge_len, terminal_len) = (edge_len as usize, terminal_len as usize);
        let (transition_bits, plane_len) = (transition_bits as usize, transition_len as usize);
        if !(1..=8).contains(&transition_bits) {
            return Err(anyhow!(
                "transition_bits must be in 1..=8, got {}.",
                transition_bits
            ));
        }
        let num_planes = if transition_bits == 8 {
            1
        } else {
            transition_bits
        };

        let pos = utils::HEADER_BYTES;
        let (edges, pos) = utils::take_region(bytes, pos, edge_len, "edges")?;
        let (terminals, pos) = utils::take_region(bytes, pos, terminal_len, "terminals")?;
        let transitions_len = plane_len
            .checked_mul(num_planes)
            .ok_or_else(|| anyhow!("transitions region overflows."))?;
        let (transitions, pos) =
            utils::take_region(bytes, pos, transitions_len, "transitions")?;

        let edges = BitVector::build(edges);
        if !edges.get(0) || edges.get(1) {
            return Err(anyhow!("edges do not start with the root edge."));
        }
        let num_edges = edges.num_ones();
        if edges.num_zeros() <= num_edges {
            return Err(anyhow!(
                "edges hold {} ones but only {} zeros.",
                num_edges,
                edges.num_zeros()
            ));
        }

        let terminals = BitVector::build(terminals);
        if terminals.num_bits() < num_edges {
            return Err(anyhow!(
                "terminals hold {} bits for {} edges.",
                terminals.num_bits(),
                num_edges
            ));
        }
        if terminals.get(ROOT) {
            return Err(anyhow!("the root edge is marked terminal."));
        }
        let plane_capacity = if transition_bits == 8 {
            plane_len
        } else {
            plane_len * 8
        };
        if plane_capacity < num_edges {
            return Err(anyhow!(
                "transitions hold {} labels for {} edges.",
                plane_capacity,
                num_edges
            ));
        }
        let num_keys = terminals.rank1(num_edges);

        Ok(Self {
            edges,
            terminals,
            transitions,
            transition_bits,
            plane_len,
            num_edges,
            num_keys,
            size_in_bytes: pos,
        })
    }

    /// Searches the trie for `key`, calling `visit(found_key, id)` for every hit.
    ///
    /// Returning [`ControlFlow::Break`] from `visit` stops the search before
    /// the next candidate is examined. Returns the number of visits.
    ///
    /// # Arguments
    ///
    ///  - `key`: Query string; in [`SearchMode::Predictive`], the prefix.
    ///  - `mode`: Exact or predictive.
    ///  - `visit`: Callback receiving each matched key and its identifier.
    pub fn search<P, F>(&self, key: P, mode: SearchMode, mut visit: F) -> usize
    where
        P: AsRef<[u8]>,
        F: FnMut(&[u8], usize) -> ControlFlow<()>,
    {
        let key = key.as_ref();
        match mode {
            SearchMode::Exact => match self.exact_match(key) {
                Some(id) => {
                    let _ = visit(key, id);
                    1
                }
                None => 0,
            },
            SearchMode::Predictive => {
                let mut num = 0;
                for (id, dec) in self.predictive_iter(key) {
                    num += 1;
                    if visit(&dec, id).is_break() {
                        break;
                    }
                }
                num
            }
        }
    }

    /// Reports every stored key that is a prefix of `key`, shortest first.
    ///
    /// Returning [`ControlFlow::Break`] from `visit` stops the search.
    /// Returns the number of visits.
    ///
    /// # Example
    ///
    /// ```
    /// use lsdict::{TrieBuilder, TrieReader};
    /// use std::ops::ControlFlow;
    ///
    /// let builder = TrieBuilder::from_keys(["a", "ab", "abcd"]).unwrap();
    /// let trie = TrieReader::open(builder.image()).unwrap();
    ///
    /// let mut lens = vec![];
    /// trie.common_prefix_search("abcde", |key, _| {
    ///     lens.push(key.len());
    ///     ControlFlow::Continue(())
    /// });
    /// assert_eq!(lens, vec![1, 2, 4]);
    /// ```
    pub fn common_prefix_search<P, F>(&self, key: P, mut visit: F) -> usize
    where
        P: AsRef<[u8]>,
        F: FnMut(&[u8], usize) -> ControlFlow<()>,
    {
        let key = key.as_ref();
        let mut num = 0;
        let mut node = ROOT;
        for (i, &c) in key.iter().enumerate() {
            node = match self.find_child(node, c) {
                Some(child) => child,
                None => break,
            };
            if let Some(id) = self.terminal_id(node) {
                num += 1;
                if visit(&key[..i + 1], id).is_break() {
                    break;
                }
            }
        }
        num
    }

    /// Returns the identifier of `key`, or [`None`] if it is not stored.
    pub fn exact_match<P>(&self, key: P) -> Option<usize>
    where
        P: AsRef<[u8]>,
    {
        self.walk(key.as_ref())
            .and_then(|node| self.terminal_id(node))
    }

    /// Reconstructs the key with identifier `id`.
    ///
    /// Returns [`None`] if `id` is out of range or the key is longer than `max_len`.
    pub fn reverse(&self, id: usize, max_len: usize) -> Option<Vec<u8>> {
        let mut dec = Vec::new();
        self.reverse_into(id, max_len, &mut dec)?;
        Some(dec)
    }

    /// Makes a decoder reusing its buffer across [`TrieReader::reverse`] calls.
    pub fn decoder(&self) -> Decoder {
        Decoder::new(self)
    }

    /// Makes an iterator over `(id, key)` of keys starting with `prefix`, in
    /// lexicographic order.
    ///
    /// # Example
    ///
    /// ```
    /// use lsdict::{TrieBuilder, TrieReader};
    ///
    /// let builder = TrieBuilder::from_keys(["tea", "ten", "to", "i"]).unwrap();
    /// let trie = TrieReader::open(builder.image()).unwrap();
    ///
    /// let keys: Vec<_> = trie.predictive_iter("te").map(|(_, key)| key).collect();
    /// assert_eq!(keys, vec![b"tea".to_vec(), b"ten".to_vec()]);
    /// ```
    pub fn predictive_iter<P>(&self, prefix: P) -> PredictiveIter
    where
        P: AsRef<[u8]>,
    {
        PredictiveIter::new(self, prefix.as_ref())
    }

    /// Makes an iterator over all `(id, key)` in lexicographic order.
    pub fn iter(&self) -> PredictiveIter {
        PredictiveIter::new(self, &[])
    }

    /// Gets the number of stored keys.
    #[inline(always)]
    pub fn num_keys(&self) -> usize {
        self.num_keys
    }

    /// Gets the number of edges, including the synthetic root edge.
    #[inline(always)]
    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// Gets the bit width of edge labels.
    #[inline(always)]
    pub fn transition_bits(&self) -> usize {
        self.transition_bits
    }

    /// Gets the number of image bytes covered by the header and its regions.
    #[inline(always)]
    pub fn size_in_bytes(&self) -> usize {
        self.size_in_bytes
    }

    fn reverse_into(&self, id: usize, max_len: usize, dec: &mut Vec<u8>) -> Option<()> {
        dec.clear();
        if self.num_keys <= id {
            return None;
        }
        let mut edge = self.terminals.select1(id)?;
        while edge != ROOT {
            if dec.len() == max_len {
                return None;
            }
            dec.push(self.label(edge));
            edge = self.parent(edge)?;
        }
        dec.reverse();
        Some(())
    }

    /// Returns the label of edge `e`.
    #[inline(always)]
    fn label(&self, e: usize) -> u8 {
        if self.transition_bits == 8 {
            return self.transitions.get(e).copied().unwrap_or(0);
        }
        let (q, m) = (e / 8, e % 8);
        let mut c = 0;
        for k in 0..self.transition_bits {
            if let Some(&b) = self.transitions.get(k * self.plane_len + q) {
                c |= ((b >> m) & 1) << k;
            }
        }
        c
    }

    /// Returns the position in `edges` of the first child edge of `node`,
    /// along with its edge id. Child ids always exceed the parent's.
    #[inline(always)]
    fn first_child(&self, node: usize) -> Option<(usize, usize)> {
        let pos = self.edges.select0(node)? + 1;
        let e = pos - node - 1;
        if e <= node {
            return None;
        }
        Some((pos, e))
    }

    #[inline(always)]
    fn find_child(&self, node: usize, c: u8) -> Option<usize> {
        let (mut pos, mut e) = self.first_child(node)?;
        while self.edges.get(pos) {
            if self.label(e) == c {
                return Some(e);
            }
            pos += 1;
            e += 1;
        }
        None
    }

    /// Returns the parent of `node`, or [`None`] on a link that cannot occur
    /// in a well-formed image.
    #[inline(always)]
    fn parent(&self, node: usize) -> Option<usize> {
        let pos = self.edges.select1(node)?;
        let zeros = self.edges.rank0(pos);
        if zeros == 0 || node < zeros {
            return None;
        }
        Some(zeros - 1)
    }

    /// Returns the node reached by consuming all of `key`.
    fn walk(&self, key: &[u8]) -> Option<usize> {
        key.iter()
            .try_fold(ROOT, |node, &c| self.find_child(node, c))
    }

    #[inline(always)]
    fn terminal_id(&self, node: usize) -> Option<usize> {
        if self.terminals.get(node) {
            Some(self.terminals.rank1(node))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TrieBuilder;
    use test_log::test;

    fn build(keys: &[&str]) -> TrieBuilder {
        TrieBuilder::from_keys(keys).unwrap()
    }

    fn collect(trie: &TrieReader, key: &str, mode: SearchMode) -> Vec<(String, usize)> {
        let mut found = vec![];
        trie.search(key, mode, |k, id| {
            found.push((String::from_utf8(k.to_vec()).unwrap(), id));
            ControlFlow::Continue(())
        });
        found
    }

    #[test]
    fn test_scenario() {
        let builder = build(&["abc", "a", "abd", "b"]);
        let trie = TrieReader::open(builder.image()).unwrap();
        assert_eq!(trie.num_keys(), 4);
        assert_eq!(trie.num_edges(), 6);

        let a = builder.key_index("a").unwrap();
        let abd = builder.key_index("abd").unwrap();
        assert_ne!(a, abd);

        assert_eq!(
            collect(&trie, "abd", SearchMode::Exact),
            vec![("abd".to_string(), abd)]
        );
        assert!(collect(&trie, "ab", SearchMode::Exact).is_empty());
        assert!(collect(&trie, "abdd", SearchMode::Exact).is_empty());
        assert!(collect(&trie, "", SearchMode::Exact).is_empty());

        let found: Vec<_> = collect(&trie, "a", SearchMode::Predictive)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(found, vec!["a", "abc", "abd"]);

        assert_eq!(trie.reverse(abd, 3), Some(b"abd".to_vec()));
        assert_eq!(trie.reverse(abd, 2), None);
        assert_eq!(trie.reverse(4, 100), None);
    }

    #[test]
    fn test_predictive() {
        let keys = [
            "deal", "idea", "ideal", "ideas", "ideology", "tea", "techie", "technology", "tie",
            "trie",
        ];
        let builder = build(&keys);
        let trie = TrieReader::open(builder.image()).unwrap();

        let found = collect(&trie, "idea", SearchMode::Predictive);
        let expected: Vec<_> = ["idea", "ideal", "ideas"]
            .iter()
            .map(|k| (k.to_string(), builder.key_index(k).unwrap()))
            .collect();
        assert_eq!(found, expected);

        let found = collect(&trie, "", SearchMode::Predictive);
        let all: Vec<_> = found.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(all, keys.to_vec());

        assert!(collect(&trie, "x", SearchMode::Predictive).is_empty());
        assert!(collect(&trie, "ideals", SearchMode::Predictive).is_empty());
        assert_eq!(collect(&trie, "technology", SearchMode::Predictive).len(), 1);
    }

    #[test]
    fn test_early_stop() {
        let builder = build(&["t", "tea", "ten", "to"]);
        let trie = TrieReader::open(builder.image()).unwrap();

        let mut found = vec![];
        let num = trie.search("t", SearchMode::Predictive, |k, _| {
            found.push(k.to_vec());
            if found.len() == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(num, 2);
        assert_eq!(found, vec![b"t".to_vec(), b"tea".to_vec()]);

        let mut lens = vec![];
        trie.common_prefix_search("tea", |k, _| {
            lens.push(k.len());
            ControlFlow::Break(())
        });
        assert_eq!(lens, vec![1]);
    }

    #[test]
    fn test_common_prefix() {
        let builder = build(&["a", "ab", "abc", "b", "bcd"]);
        let trie = TrieReader::open(builder.image()).unwrap();

        let mut found = vec![];
        let num = trie.common_prefix_search("abcd", |k, id| {
            found.push((k.to_vec(), id));
            ControlFlow::Continue(())
        });
        assert_eq!(num, 3);
        let expected: Vec<_> = ["a", "ab", "abc"]
            .iter()
            .map(|k| (k.as_bytes().to_vec(), builder.key_index(k).unwrap()))
            .collect();
        assert_eq!(found, expected);

        assert_eq!(trie.common_prefix_search("bc", |_, _| ControlFlow::Continue(())), 1);
        assert_eq!(trie.common_prefix_search("c", |_, _| ControlFlow::Continue(())), 0);
    }

    #[test]
    fn test_empty() {
        let builder = build(&[]);
        let trie = TrieReader::open(builder.image()).unwrap();
        assert_eq!(trie.num_keys(), 0);
        assert_eq!(trie.num_edges(), 1);
        assert_eq!(trie.exact_match("a"), None);
        assert_eq!(trie.exact_match(""), None);
        assert_eq!(trie.iter().count(), 0);
        assert_eq!(trie.reverse(0, 10), None);
    }

    #[test]
    fn test_transition_bits() {
        let keys: Vec<Vec<u8>> = vec![vec![1, 2, 3], vec![1, 2], vec![3], vec![0, 3, 3, 1], vec![2, 2]];
        for bits in 2..=8 {
            let mut builder = TrieBuilder::with_transition_bits(bits).unwrap();
            for key in &keys {
                builder.add(key).unwrap();
            }
            builder.build().unwrap();

            let trie = TrieReader::open(builder.image()).unwrap();
            assert_eq!(trie.transition_bits(), bits);
            assert_eq!(trie.num_keys(), keys.len());
            for key in &keys {
                let id = trie.exact_match(key).unwrap();
                assert_eq!(Some(id), builder.key_index(key));
                assert_eq!(trie.reverse(id, 8).as_ref(), Some(key));
            }
            assert_eq!(trie.exact_match([1u8]), None);
            assert_eq!(trie.predictive_iter([1u8]).count(), 2);
        }
    }

    #[test]
    fn test_single_bit_transitions() {
        let keys: Vec<Vec<u8>> = vec![vec![0], vec![1, 0, 1], vec![1, 1], vec![0, 0, 0, 0]];
        let mut builder = TrieBuilder::with_transition_bits(1).unwrap();
        for key in &keys {
            builder.add(key).unwrap();
        }
        builder.build().unwrap();

        let trie = TrieReader::open(builder.image()).unwrap();
        let mut sorted = keys.clone();
        sorted.sort();
        let all: Vec<_> = trie.iter().map(|(_, k)| k).collect();
        assert_eq!(all, sorted);
    }

    #[test]
    fn test_malformed() {
        let builder = build(&["abc", "a", "abd", "b"]);
        let image = builder.image();

        for len in 0..image.len() {
            assert!(TrieReader::open(&image[..len]).is_err(), "len = {}", len);
        }
        // Trailing bytes are ignored.
        let mut longer = image.to_vec();
        longer.extend_from_slice(&[0xAA; 7]);
        let trie = TrieReader::open(&longer).unwrap();
        assert_eq!(trie.size_in_bytes(), image.len());

        let mut bad = image.to_vec();
        bad[8] = 0; // transition_bits
        assert!(TrieReader::open(&bad).is_err());

        let mut bad = image.to_vec();
        bad[8] = 9;
        assert!(TrieReader::open(&bad).is_err());

        let mut bad = image.to_vec();
        bad[0..4].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(TrieReader::open(&bad).is_err());

        let mut bad = image.to_vec();
        bad[16] = 0xFF; // edges without a root prefix
        assert!(TrieReader::open(&bad).is_err());

        let mut bad = image.to_vec();
        bad[20] |= 1; // terminal root
        assert!(TrieReader::open(&bad).is_err());
    }

    #[test]
    fn test_corrupted_labels() {
        // A damaged body that still passes open() must not panic or loop.
        let builder = build(&["abc", "a", "abd", "b", "bcd", "zz"]);
        let image = builder.image();

        for pos in utils::HEADER_BYTES..image.len() {
            for &flip in &[0x01u8, 0x10, 0xFF] {
                let mut bad = image.to_vec();
                bad[pos] ^= flip;
                if let Ok(trie) = TrieReader::open(&bad) {
                    for id in 0..trie.num_keys() {
                        let _ = trie.reverse(id, 64);
                    }
                    let _ = trie.iter().count();
                    let _ = trie.exact_match("abd");
                }
            }
        }
    }
}
