use std::io::{Read, Write};
use std::path::PathBuf;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use trellis_core::{EdgeId, Label, TargetTags, VertexId};

use super::{Codec, OptionCodec, StringCodec};
use crate::error::CodecError;
use crate::hash::Hash128;

pub struct VertexIdCodec;

impl Codec<VertexId> for VertexIdCodec {
    fn encode(&self, w: &mut dyn Write, value: &VertexId) -> Result<(), CodecError> {
        w.write_u32::<LittleEndian>(value.as_u32())?;
        Ok(())
    }

    fn decode(&self, r: &mut dyn Read) -> Result<VertexId, CodecError> {
        Ok(VertexId::new(r.read_u32::<LittleEndian>()?))
    }
}

pub struct EdgeIdCodec;

impl Codec<EdgeId> for EdgeIdCodec {
    fn encode(&self, w: &mut dyn Write, value: &EdgeId) -> Result<(), CodecError> {
        w.write_u32::<LittleEndian>(value.as_u32())?;
        Ok(())
    }

    fn decode(&self, r: &mut dyn Read) -> Result<EdgeId, CodecError> {
        Ok(EdgeId::new(r.read_u32::<LittleEndian>()?))
    }
}

pub struct TargetTagsCodec;

impl Codec<TargetTags> for TargetTagsCodec {
    fn encode(&self, w: &mut dyn Write, value: &TargetTags) -> Result<(), CodecError> {
        w.write_u16::<LittleEndian>(value.bits())?;
        Ok(())
    }

    fn decode(&self, r: &mut dyn Read) -> Result<TargetTags, CodecError> {
        Ok(TargetTags::from_bits(r.read_u16::<LittleEndian>()?))
    }
}

pub struct Hash128Codec;

impl Codec<Hash128> for Hash128Codec {
    fn encode(&self, w: &mut dyn Write, value: &Hash128) -> Result<(), CodecError> {
        w.write_all(value.as_bytes())?;
        Ok(())
    }

    fn decode(&self, r: &mut dyn Read) -> Result<Hash128, CodecError> {
        let mut buf = [0u8; Hash128::LEN];
        r.read_exact(&mut buf)?;
        Ok(Hash128(buf))
    }
}

pub struct LabelCodec;

impl Codec<Label> for LabelCodec {
    fn encode(&self, w: &mut dyn Write, value: &Label) -> Result<(), CodecError> {
        let repo = value.repo().map(str::to_string);
        OptionCodec(StringCodec).encode(w, &repo)?;
        StringCodec.encode(w, &value.package().to_string())?;
        StringCodec.encode(w, &value.name().to_string())
    }

    fn decode(&self, r: &mut dyn Read) -> Result<Label, CodecError> {
        let repo = OptionCodec(StringCodec).decode(r)?;
        let package = StringCodec.decode(r)?;
        let name = StringCodec.decode(r)?;
        Ok(Label::new(repo, package, name))
    }
}

/// Paths are persisted as UTF-8 text; non-UTF-8 paths are stored lossily.
pub struct PathCodec;

impl Codec<PathBuf> for PathCodec {
    fn encode(&self, w: &mut dyn Write, value: &PathBuf) -> Result<(), CodecError> {
        StringCodec.encode(w, &value.to_string_lossy().into_owned())
    }

    fn decode(&self, r: &mut dyn Read) -> Result<PathBuf, CodecError> {
        Ok(PathBuf::from(StringCodec.decode(r)?))
    }
}
