use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{read_len, write_len, Codec};
use crate::error::CodecError;

pub struct U8Codec;

impl Codec<u8> for U8Codec {
    fn encode(&self, w: &mut dyn Write, value: &u8) -> Result<(), CodecError> {
        w.write_u8(*value)?;
        Ok(())
    }

    fn decode(&self, r: &mut dyn Read) -> Result<u8, CodecError> {
        Ok(r.read_u8()?)
    }
}

pub struct U16Codec;

impl Codec<u16> for U16Codec {
    fn encode(&self, w: &mut dyn Write, value: &u16) -> Result<(), CodecError> {
        w.write_u16::<LittleEndian>(*value)?;
        Ok(())
    }

    fn decode(&self, r: &mut dyn Read) -> Result<u16, CodecError> {
        Ok(r.read_u16::<LittleEndian>()?)
    }
}

pub struct U32Codec;

impl Codec<u32> for U32Codec {
    fn encode(&self, w: &mut dyn Write, value: &u32) -> Result<(), CodecError> {
        w.write_u32::<LittleEndian>(*value)?;
        Ok(())
    }

    fn decode(&self, r: &mut dyn Read) -> Result<u32, CodecError> {
        Ok(r.read_u32::<LittleEndian>()?)
    }
}

pub struct U64Codec;

impl Codec<u64> for U64Codec {
    fn encode(&self, w: &mut dyn Write, value: &u64) -> Result<(), CodecError> {
        w.write_u64::<LittleEndian>(*value)?;
        Ok(())
    }

    fn decode(&self, r: &mut dyn Read) -> Result<u64, CodecError> {
        Ok(r.read_u64::<LittleEndian>()?)
    }
}

pub struct BoolCodec;

impl Codec<bool> for BoolCodec {
    fn encode(&self, w: &mut dyn Write, value: &bool) -> Result<(), CodecError> {
        w.write_u8(u8::from(*value))?;
        Ok(())
    }

    fn decode(&self, r: &mut dyn Read) -> Result<bool, CodecError> {
        match r.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            tag => Err(CodecError::InvalidTag {
                tag,
                type_name: "bool",
            }),
        }
    }
}

pub struct BytesCodec;

impl Codec<Vec<u8>> for BytesCodec {
    fn encode(&self, w: &mut dyn Write, value: &Vec<u8>) -> Result<(), CodecError> {
        write_len(w, value.len())?;
        w.write_all(value)?;
        Ok(())
    }

    fn decode(&self, r: &mut dyn Read) -> Result<Vec<u8>, CodecError> {
        let len = read_len(r)?;
        let mut buf = vec![0u8; len];
        r.read_exact(&mut buf)?;
        Ok(buf)
    }
}

pub struct StringCodec;

impl Codec<String> for StringCodec {
    fn encode(&self, w: &mut dyn Write, value: &String) -> Result<(), CodecError> {
        write_len(w, value.len())?;
        w.write_all(value.as_bytes())?;
        Ok(())
    }

    fn decode(&self, r: &mut dyn Read) -> Result<String, CodecError> {
        let len = read_len(r)?;
        let mut buf = vec![0u8; len];
        r.read_exact(&mut buf)?;
        String::from_utf8(buf).map_err(|_| CodecError::InvalidUtf8)
    }
}
