//! Explicit, hand-written versioned binary codecs.
//!
//! Every persisted value goes through a [`Codec`]: a deterministic
//! little-endian encoding with no runtime reflection and no schema
//! embedded in the payload beyond an explicit version tag (see
//! [`Versioned`]). Decoding a version other than the expected one is a
//! fatal [`CodecError::UnsupportedVersion`].

mod composite;
mod core_types;
mod primitive;

pub use composite::{
    BTreeMapCodec, BTreeSetCodec, HashMapCodec, HashSetCodec, OptionCodec, PairCodec, VecCodec,
};
pub use core_types::{EdgeIdCodec, Hash128Codec, LabelCodec, PathCodec, TargetTagsCodec, VertexIdCodec};
pub use primitive::{BoolCodec, BytesCodec, StringCodec, U8Codec, U16Codec, U32Codec, U64Codec};

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::CodecError;

/// Upper bound on any single decoded collection or byte-array length.
///
/// Guards replay of a corrupted store file from ballooning allocations
/// before the content-hash check would have caught it.
pub(crate) const MAX_COLLECTION_LEN: u64 = 1 << 28;

/// A binary encoder/decoder for values of type `T`.
pub trait Codec<T>: Send + Sync {
    fn encode(&self, w: &mut dyn Write, value: &T) -> Result<(), CodecError>;
    fn decode(&self, r: &mut dyn Read) -> Result<T, CodecError>;
}

impl<T, C: Codec<T> + ?Sized> Codec<T> for Box<C> {
    fn encode(&self, w: &mut dyn Write, value: &T) -> Result<(), CodecError> {
        (**self).encode(w, value)
    }

    fn decode(&self, r: &mut dyn Read) -> Result<T, CodecError> {
        (**self).decode(r)
    }
}

/// Wraps a codec so the payload is preceded by an explicit `u16` version.
///
/// Decoding any other version fails; evolution means bumping the version
/// and teaching the new codec to speak only the new format. There is no
/// in-place migration at this layer.
pub struct Versioned<C> {
    version: u16,
    inner: C,
}

impl<C> Versioned<C> {
    pub fn version(&self) -> u16 {
        self.version
    }
}

pub fn versioned<C>(version: u16, inner: C) -> Versioned<C> {
    Versioned { version, inner }
}

impl<T, C: Codec<T>> Codec<T> for Versioned<C> {
    fn encode(&self, w: &mut dyn Write, value: &T) -> Result<(), CodecError> {
        w.write_u16::<LittleEndian>(self.version)?;
        self.inner.encode(w, value)
    }

    fn decode(&self, r: &mut dyn Read) -> Result<T, CodecError> {
        let found = r.read_u16::<LittleEndian>()?;
        if found != self.version {
            return Err(CodecError::UnsupportedVersion {
                expected: self.version,
                found,
            });
        }
        self.inner.decode(r)
    }
}

pub(crate) fn write_len(w: &mut dyn Write, len: usize) -> Result<(), CodecError> {
    w.write_u64::<LittleEndian>(len as u64)?;
    Ok(())
}

pub(crate) fn read_len(r: &mut dyn Read) -> Result<usize, CodecError> {
    let len = r.read_u64::<LittleEndian>()?;
    if len > MAX_COLLECTION_LEN {
        return Err(CodecError::LengthOverflow {
            len,
            limit: MAX_COLLECTION_LEN,
        });
    }
    Ok(len as usize)
}

#[cfg(test)]
pub(crate) fn round_trip<T, C: Codec<T>>(codec: &C, value: &T) -> T {
    let mut buf = Vec::new();
    codec.encode(&mut buf, value).expect("encode");
    let mut cursor = std::io::Cursor::new(buf);
    let decoded = codec.decode(&mut cursor).expect("decode");
    assert_eq!(
        cursor.position() as usize,
        cursor.get_ref().len(),
        "codec left trailing bytes"
    );
    decoded
}
