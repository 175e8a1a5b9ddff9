use crate::TrieReader;

/// Iterator to enumerate keys starting from a given string, in lexicographic order.
///
/// The subtree below the prefix is traversed depth first; each stack frame
/// holds the position in `edges` and the id of the next sibling to visit.
#[derive(Clone)]
pub struct PredictiveIter<'a> {
    trie: &'a TrieReader<'a>,
    dec: Vec<u8>,
    prefix_len: usize,
    stack: Vec<(usize, usize)>,
    pending: Option<usize>,
}

impl<'a> PredictiveIter<'a> {
    /// Makes an iterator [`PredictiveIter`].
    ///
    /// # Arguments
    ///
    ///  - `trie`: Trie reader.
    ///  - `prefix`: Prefix key.
    pub fn new(trie: &'a TrieReader<'a>, prefix: &[u8]) -> Self {
        let mut iter = Self {
            trie,
            dec: prefix.to_vec(),
            prefix_len: prefix.len(),
            stack: Vec::new(),
            pending: None,
        };
        if let Some(node) = trie.walk(prefix) {
            iter.pending = trie.terminal_id(node);
            iter.stack.extend(trie.first_child(node));
        }
        iter
    }
}

impl<'a> Iterator for PredictiveIter<'a> {
    type Item = (usize, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(id) = self.pending.take() {
            return Some((id, self.dec.clone()));
        }
        while let Some(frame) = self.stack.last_mut() {
            let (pos, e) = *frame;
            if !self.trie.edges.get(pos) {
                self.stack.pop();
                continue;
            }
            *frame = (pos + 1, e + 1);

            let depth = self.stack.len() - 1;
            self.dec.truncate(self.prefix_len + depth);
            self.dec.push(self.trie.label(e));
            self.stack.extend(self.trie.first_child(e));
            if let Some(id) = self.trie.terminal_id(e) {
                return Some((id, self.dec.clone()));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.trie.num_keys()))
    }
}
