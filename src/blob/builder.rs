use std::io;

use anyhow::{anyhow, Result};
use byteorder::{LittleEndian, WriteBytesExt};

use crate::bit_stream::BitStreamBuilder;
use crate::utils;
use crate::{DEFAULT_LENGTH_STEP, DEFAULT_MIN_LENGTH};

/// Builder of a blob store image.
///
/// Each record is padded to `min_len + k * len_step` bytes for the smallest
/// such `k`, and `k` is written to the length marks in unary (`k` ones and
/// a zero). With the default coding (`min_len = 0`, `len_step = 1`) records
/// are stored without padding.
///
/// # Example
///
/// ```
/// use lsdict::{BlobBuilder, BlobReader};
///
/// let mut builder = BlobBuilder::new();
/// builder.push(b"apple").unwrap();
/// builder.push(b"").unwrap();
/// builder.push(b"kiwi").unwrap();
/// builder.build().unwrap();
///
/// let store = BlobReader::open(builder.image()).unwrap();
/// assert_eq!(store.num_records(), 3);
/// assert_eq!(store.get(0).unwrap(), b"apple");
/// assert_eq!(store.get(1).unwrap(), b"");
/// assert_eq!(store.get(2).unwrap(), b"kiwi");
/// assert!(store.get(3).is_err());
/// ```
#[derive(Clone, Debug)]
pub struct BlobBuilder {
    marks: BitStreamBuilder,
    body: Vec<u8>,
    min_len: usize,
    len_step: usize,
    num_records: usize,
    image: Vec<u8>,
    built: bool,
}

impl Default for BlobBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobBuilder {
    /// Makes the builder with the default length coding.
    pub fn new() -> Self {
        Self {
            marks: BitStreamBuilder::new(),
            body: Vec::new(),
            min_len: DEFAULT_MIN_LENGTH,
            len_step: DEFAULT_LENGTH_STEP,
            num_records: 0,
            image: Vec::new(),
            built: false,
        }
    }

    /// Makes the builder with the given length coding.
    ///
    /// # Arguments
    ///
    ///  - `min_len`: Length every record is padded to at least.
    ///  - `len_step`: Granularity of lengths beyond `min_len`, which must be positive.
    pub fn with_length_coding(min_len: usize, len_step: usize) -> Result<Self> {
        let mut builder = Self::new();
        builder.set_length_coding(min_len, len_step)?;
        Ok(builder)
    }

    /// Sets the length coding. It must be called before the first push.
    pub fn set_length_coding(&mut self, min_len: usize, len_step: usize) -> Result<()> {
        if self.num_records != 0 || self.built {
            return Err(anyhow!("the length coding must be set before any push."));
        }
        if len_step == 0 {
            return Err(anyhow!("len_step is zero."));
        }
        utils::to_u32(min_len)?;
        utils::to_u32(len_step)?;
        self.min_len = min_len;
        self.len_step = len_step;
        Ok(())
    }

    /// Builds and returns the builder holding all the given records.
    pub fn from_records<I, P>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        let mut builder = Self::new();
        for record in records {
            builder.push(record)?;
        }
        builder.build()?;
        Ok(builder)
    }

    /// Appends a record.
    pub fn push<P>(&mut self, record: P) -> Result<()>
    where
        P: AsRef<[u8]>,
    {
        let record = record.as_ref();
        self.push_with_len(record, record.len())
    }

    /// Appends a record occupying `len` bytes, of which `record` is the head;
    /// the rest is zero-filled.
    pub fn push_with_len<P>(&mut self, record: P, len: usize) -> Result<()>
    where
        P: AsRef<[u8]>,
    {
        let record = record.as_ref();
        if self.built {
            return Err(anyhow!("the blob store is already built."));
        }
        if len < record.len() {
            return Err(anyhow!(
                "the record of {} bytes exceeds its declared length {}.",
                record.len(),
                len
            ));
        }
        self.append(record, len);
        self.num_records += 1;
        Ok(())
    }

    fn append(&mut self, record: &[u8], len: usize) {
        let k = if len <= self.min_len {
            0
        } else {
            (len - self.min_len + self.len_step - 1) / self.len_step
        };
        let start = self.body.len();
        self.body.extend_from_slice(record);
        self.body.resize(start + self.min_len + k * self.len_step, 0);
        for _ in 0..k {
            self.marks.push_bit(true);
        }
        self.marks.push_bit(false);
    }

    /// Appends the sentinel and encodes the records into the image.
    pub fn build(&mut self) -> Result<()> {
        if self.built {
            return Err(anyhow!("the blob store is already built."));
        }
        self.append(&[], 0);
        self.marks.pad32();
        let body_len = (self.body.len() + 3) / 4 * 4;
        self.body.resize(body_len, 0);

        let mut image =
            Vec::with_capacity(utils::HEADER_BYTES + self.marks.size_in_bytes() + body_len);
        image.write_u32::<LittleEndian>(utils::to_u32(self.marks.size_in_bytes())?)?;
        image.write_u32::<LittleEndian>(utils::to_u32(self.min_len)?)?;
        image.write_u32::<LittleEndian>(utils::to_u32(self.len_step)?)?;
        image.write_u32::<LittleEndian>(utils::to_u32(self.num_records)?)?;
        self.marks.serialize_into(&mut image)?;
        image.extend_from_slice(&self.body);

        log::debug!(
            "built blob store: {} records, min_len {}, len_step {}, {} bytes",
            self.num_records,
            self.min_len,
            self.len_step,
            image.len()
        );

        self.image = image;
        self.built = true;
        Ok(())
    }

    /// Returns the image. It is empty until [`BlobBuilder::build`] succeeds.
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

    /// Returns the number of pushed records.
    pub fn num_records(&self) -> usize {
        self.num_records
    }

    /// Writes the image into a writer.
    pub fn serialize_into<W: io::Write>(&self, mut writer: W) -> Result<()> {
        if !self.built {
            return Err(anyhow!("the blob store is not built yet."));
        }
        writer.write_all(&self.image)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let mut builder = BlobBuilder::with_length_coding(2, 3).unwrap();
        builder.push(b"a").unwrap();
        builder.push(b"abcd").unwrap();
        builder.push(b"abcdefghi").unwrap();
        builder.build().unwrap();

        let image = builder.image();
        assert_eq!(utils::read_header(image, "blob").unwrap(), [4, 2, 3, 3]);
        // 0 | 10 | 1110 | 0 (sentinel)
        assert_eq!(image[16], 0b0011_1010);
        assert_eq!(image[17], 0);
        // 2 + 5 + 11 + 2 (sentinel) = 20 bytes of body
        assert_eq!(image.len(), utils::HEADER_BYTES + 4 + 20);
        assert_eq!(&image[20..22], b"a\0");
        assert_eq!(&image[22..27], b"abcd\0");
    }

    #[test]
    fn test_invalid() {
        assert!(BlobBuilder::with_length_coding(4, 0).is_err());

        let mut builder = BlobBuilder::new();
        builder.push(b"x").unwrap();
        assert!(builder.set_length_coding(4, 4).is_err());
        assert!(builder.push_with_len(b"xyz", 2).is_err());
        assert!(builder.serialize_into(Vec::new()).is_err());
        builder.build().unwrap();
        assert!(builder.push(b"y").is_err());
        assert!(builder.build().is_err());

        let mut data = vec![];
        builder.serialize_into(&mut data).unwrap();
        assert_eq!(data.len(), builder.size_in_bytes());
    }
}
