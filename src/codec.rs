//! Binary representation of a [`Filter`].
//!
//! All fields use the host byte order:
//!
//! | field | type |
//! |---|---|
//! | version | u32 |
//! | probes | u32 |
//! | count | i64 |
//! | number of words | u64 |
//! | words | u64 * number of words |

use std::io::{self, Cursor};

use byteorder::{ByteOrder, NativeEndian, ReadBytesExt};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Filter};

const FORMAT_VERSION: u32 = 0;
const HEADER_SIZE: usize = 4 + 4 + 8 + 8;

impl Filter {
    /// Encodes the filter in the host byte order.
    ///
    /// Filters cannot be moved between little-endian and big-endian machines.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; HEADER_SIZE + self.words.len() * 8];
        let (header, body) = bytes.split_at_mut(HEADER_SIZE);
        NativeEndian::write_u32(&mut header[0..4], FORMAT_VERSION);
        NativeEndian::write_u32(&mut header[4..8], self.probes.get() as u32);
        NativeEndian::write_i64(&mut header[8..16], self.count);
        NativeEndian::write_u64(&mut header[16..24], self.words.len() as u64);
        NativeEndian::write_u64_into(&self.words, body);
        bytes
    }

    /// Decodes a filter created by [`Filter::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut cursor = Cursor::new(bytes);
        let version = cursor.read_u32::<NativeEndian>().map_err(truncated)?;
        if version != FORMAT_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        let probes = cursor.read_u32::<NativeEndian>().map_err(truncated)?;
        let count = cursor.read_i64::<NativeEndian>().map_err(truncated)?;
        let num_words = cursor.read_u64::<NativeEndian>().map_err(truncated)?;

        let remaining = (bytes.len() - HEADER_SIZE) as u64;
        if num_words.checked_mul(8) != Some(remaining) {
            return Err(Error::InvalidData(format!(
                "expected {num_words} words, found {remaining} bytes"
            )));
        }
        let mut words = vec![0u64; num_words as usize];
        cursor
            .read_u64_into::<NativeEndian>(&mut words)
            .map_err(truncated)?;

        let probes = u8::try_from(probes)
            .map_err(|_| Error::InvalidData(format!("too many probes: {probes}")))?;
        Self::from_parts(words, probes, count)
    }

    /// Replaces the whole state of this filter with the one encoded in `bytes`.
    ///
    /// On error the filter is left untouched.
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        *self = Self::from_bytes(bytes)?;
        Ok(())
    }
}

fn truncated(err: io::Error) -> Error {
    Error::InvalidData(format!("truncated input: {err}"))
}

/// Versioned serde representation, with the words stored as host-order bytes.
#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
pub(crate) struct FilterRecord {
    #[serde(rename = "v")]
    version: u32,
    #[serde(rename = "w", with = "native_words")]
    words: Vec<u64>,
    #[serde(rename = "k")]
    probes: u8,
    #[serde(rename = "n")]
    count: i64,
}

#[cfg(feature = "serde")]
impl From<Filter> for FilterRecord {
    fn from(filter: Filter) -> Self {
        let (words, probes, count) = filter.into_parts();
        Self {
            version: FORMAT_VERSION,
            words,
            probes,
            count,
        }
    }
}

#[cfg(feature = "serde")]
impl TryFrom<FilterRecord> for Filter {
    type Error = Error;

    fn try_from(record: FilterRecord) -> Result<Self, Error> {
        if record.version != FORMAT_VERSION {
            return Err(Error::UnsupportedVersion(record.version));
        }
        Filter::from_parts(record.words, record.probes, record.count)
    }
}

#[cfg(feature = "serde")]
mod native_words {
    use byteorder::{ByteOrder, NativeEndian};
    use serde::{de::Error as _, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(words: &[u64], serializer: S) -> Result<S::Ok, S::Error> {
        let mut bytes = vec![0u8; words.len() * 8];
        NativeEndian::write_u64_into(words, &mut bytes);
        serde_bytes::serialize(&bytes, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u64>, D::Error> {
        let bytes: Vec<u8> = serde_bytes::deserialize(deserializer)?;
        if bytes.len() % 8 != 0 {
            return Err(D::Error::custom(format!(
                "word buffer of {} bytes",
                bytes.len()
            )));
        }
        let mut words = vec![0u64; bytes.len() / 8];
        NativeEndian::read_u64_into(&bytes, &mut words);
        Ok(words)
    }
}
