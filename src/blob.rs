pub mod builder;

use anyhow::{anyhow, Result};

use crate::utils;
use crate::BitVector;

/// Reader of a blob store image produced by [`BlobBuilder`](crate::BlobBuilder).
///
/// Record `idx` starts at `idx * min_len + len_step * ones`, where `ones`
/// counts the length marks set before the `idx`-th group, so no earlier
/// record is scanned.
#[derive(Clone, Debug)]
pub struct BlobReader<'a> {
    marks: BitVector<'a>,
    body: &'a [u8],
    min_len: usize,
    len_step: usize,
    num_records: usize,
}

impl<'a> BlobReader<'a> {
    /// Opens an image, validating that every record fits within `bytes`.
    ///
    /// # Errors
    ///
    /// An error is returned if the image is truncated or malformed.
    pub fn open(bytes: &'a [u8]) -> Result<Self> {
        let [mark_len, min_len, len_step, num_records] = utils::read_header(bytes, "blob")?;
        if len_step == 0 {
            return Err(anyhow!("len_step is zero."));
        }
        let (marks, pos) =
            utils::take_region(bytes, utils::HEADER_BYTES, mark_len as usize, "marks")?;
        let reader = Self {
            marks: BitVector::build(marks),
            body: &bytes[pos..],
            min_len: min_len as usize,
            len_step: len_step as usize,
            num_records: num_records as usize,
        };

        // Offsets grow with idx, so the sentinel bounds every record.
        let (offset, len) = reader
            .record_range(reader.num_records)
            .ok_or_else(|| anyhow!("marks hold fewer than {} records.", num_records))?;
        match offset.checked_add(len) {
            Some(end) if end <= reader.body.len() => Ok(reader),
            _ => Err(anyhow!(
                "records need {}+{} body bytes, but {} are given.",
                offset,
                len,
                reader.body.len()
            )),
        }
    }

    /// Returns the `idx`-th record.
    ///
    /// # Errors
    ///
    /// An error is returned if `idx` is not less than [`BlobReader::num_records`].
    pub fn get(&self, idx: usize) -> Result<&'a [u8]> {
        if self.num_records <= idx {
            return Err(anyhow!(
                "record {} is out of range for {} records.",
                idx,
                self.num_records
            ));
        }
        let (offset, len) = self
            .record_range(idx)
            .ok_or_else(|| anyhow!("marks for record {} are missing.", idx))?;
        let body = self.body;
        offset
            .checked_add(len)
            .and_then(|end| body.get(offset..end))
            .ok_or_else(|| anyhow!("record {} runs past the body.", idx))
    }

    /// Makes an iterator over all records.
    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        (0..self.num_records).map_while(move |idx| self.get(idx).ok())
    }

    /// Returns `(offset, len)` in the body of the `idx`-th record.
    fn record_range(&self, idx: usize) -> Option<(usize, usize)> {
        let beg = if idx == 0 {
            0
        } else {
            self.marks.select0(idx - 1)? + 1
        };
        let end = self.marks.select0(idx)?;
        // `beg` is preceded by exactly `idx` zeros.
        let ones = beg - idx;
        let offset = idx
            .checked_mul(self.min_len)?
            .checked_add(ones.checked_mul(self.len_step)?)?;
        let len = (end - beg)
            .checked_mul(self.len_step)?
            .checked_add(self.min_len)?;
        Some((offset, len))
    }

    /// Gets the number of records, excluding the sentinel.
    #[inline(always)]
    pub fn num_records(&self) -> usize {
        self.num_records
    }

    /// Gets the minimum record length.
    #[inline(always)]
    pub fn min_length(&self) -> usize {
        self.min_len
    }

    /// Gets the record length granularity.
    #[inline(always)]
    pub fn length_step(&self) -> usize {
        self.len_step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BlobBuilder;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;
    use test_log::test;

    fn gen_random_records(num: usize, max_len: usize, seed: u64) -> Vec<Vec<u8>> {
        let mut rng = ChaChaRng::seed_from_u64(seed);
        (0..num)
            .map(|_| {
                let len = rng.gen::<usize>() % (max_len + 1);
                (0..len).map(|_| rng.gen::<u8>()).collect()
            })
            .collect()
    }

    #[test]
    fn test_random() {
        let records = gen_random_records(3000, 40, 13);
        let builder = BlobBuilder::from_records(&records).unwrap();
        let store = BlobReader::open(builder.image()).unwrap();

        assert_eq!(store.num_records(), records.len());
        for (idx, record) in records.iter().enumerate() {
            assert_eq!(store.get(idx).unwrap(), record.as_slice());
        }
        assert!(store.get(records.len()).is_err());
        assert!(store.iter().eq(records.iter().map(|r| r.as_slice())));
    }

    #[test]
    fn test_length_coding() {
        let records = gen_random_records(500, 30, 17);
        for &(min_len, len_step) in &[(0, 4), (4, 4), (8, 1), (3, 5), (64, 2)] {
            let mut builder = BlobBuilder::with_length_coding(min_len, len_step).unwrap();
            for record in &records {
                builder.push(record).unwrap();
            }
            builder.build().unwrap();

            let store = BlobReader::open(builder.image()).unwrap();
            assert_eq!(store.min_length(), min_len);
            assert_eq!(store.length_step(), len_step);
            for (idx, record) in records.iter().enumerate() {
                let got = store.get(idx).unwrap();
                assert!(min_len <= got.len());
                assert_eq!((got.len() - min_len) % len_step, 0);
                assert!(got.len() < record.len().max(min_len) + len_step);
                assert_eq!(&got[..record.len()], record.as_slice());
                assert!(got[record.len()..].iter().all(|&b| b == 0));
            }
        }
    }

    #[test]
    fn test_declared_len() {
        let mut builder = BlobBuilder::new();
        builder.push_with_len(b"ab", 5).unwrap();
        builder.push(b"c").unwrap();
        builder.build().unwrap();

        let store = BlobReader::open(builder.image()).unwrap();
        assert_eq!(store.get(0).unwrap(), b"ab\0\0\0");
        assert_eq!(store.get(1).unwrap(), b"c");
    }

    #[test]
    fn test_empty() {
        let builder = BlobBuilder::from_records(Vec::<Vec<u8>>::new()).unwrap();
        let store = BlobReader::open(builder.image()).unwrap();
        assert_eq!(store.num_records(), 0);
        assert!(store.get(0).is_err());
        assert_eq!(store.iter().count(), 0);
    }

    #[test]
    fn test_malformed() {
        let builder = BlobBuilder::from_records(&["alpha", "", "gamma"]).unwrap();
        let image = builder.image();

        for len in 0..image.len() {
            // Only the body padding may be cut off.
            if len < image.len() - 2 {
                assert!(BlobReader::open(&image[..len]).is_err(), "len = {}", len);
            }
        }

        let mut bad = image.to_vec();
        bad[8] = 0; // len_step
        assert!(BlobReader::open(&bad).is_err());

        let mut bad = image.to_vec();
        bad[12] = 40; // num_records beyond the marks
        assert!(BlobReader::open(&bad).is_err());

        let mut bad = image.to_vec();
        bad[4..8].copy_from_slice(&u32::MAX.to_le_bytes()); // min_len
        assert!(BlobReader::open(&bad).is_err());
    }
}
