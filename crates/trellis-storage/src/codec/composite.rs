use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};

use super::{read_len, write_len, Codec};
use crate::error::CodecError;

pub struct OptionCodec<C>(pub C);

impl<T, C: Codec<T>> Codec<Option<T>> for OptionCodec<C> {
    fn encode(&self, w: &mut dyn Write, value: &Option<T>) -> Result<(), CodecError> {
        match value {
            None => {
                w.write_u8(0)?;
                Ok(())
            }
            Some(inner) => {
                w.write_u8(1)?;
                self.0.encode(w, inner)
            }
        }
    }

    fn decode(&self, r: &mut dyn Read) -> Result<Option<T>, CodecError> {
        match r.read_u8()? {
            0 => Ok(None),
            1 => Ok(Some(self.0.decode(r)?)),
            tag => Err(CodecError::InvalidTag {
                tag,
                type_name: "Option",
            }),
        }
    }
}

pub struct VecCodec<C>(pub C);

impl<T, C: Codec<T>> Codec<Vec<T>> for VecCodec<C> {
    fn encode(&self, w: &mut dyn Write, value: &Vec<T>) -> Result<(), CodecError> {
        write_len(w, value.len())?;
        for item in value {
            self.0.encode(w, item)?;
        }
        Ok(())
    }

    fn decode(&self, r: &mut dyn Read) -> Result<Vec<T>, CodecError> {
        let len = read_len(r)?;
        let mut out = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            out.push(self.0.decode(r)?);
        }
        Ok(out)
    }
}

pub struct PairCodec<A, B>(pub A, pub B);

impl<T, U, A: Codec<T>, B: Codec<U>> Codec<(T, U)> for PairCodec<A, B> {
    fn encode(&self, w: &mut dyn Write, value: &(T, U)) -> Result<(), CodecError> {
        self.0.encode(w, &value.0)?;
        self.1.encode(w, &value.1)
    }

    fn decode(&self, r: &mut dyn Read) -> Result<(T, U), CodecError> {
        let first = self.0.decode(r)?;
        let second = self.1.decode(r)?;
        Ok((first, second))
    }
}

pub struct BTreeSetCodec<C>(pub C);

impl<T: Ord, C: Codec<T>> Codec<BTreeSet<T>> for BTreeSetCodec<C> {
    fn encode(&self, w: &mut dyn Write, value: &BTreeSet<T>) -> Result<(), CodecError> {
        write_len(w, value.len())?;
        for item in value {
            self.0.encode(w, item)?;
        }
        Ok(())
    }

    fn decode(&self, r: &mut dyn Read) -> Result<BTreeSet<T>, CodecError> {
        let len = read_len(r)?;
        let mut out = BTreeSet::new();
        for _ in 0..len {
            out.insert(self.0.decode(r)?);
        }
        Ok(out)
    }
}

/// Codec for a hash set; entries are written in sorted order so the
/// encoding is deterministic.
pub struct HashSetCodec<C>(pub C);

impl<T, C> Codec<hashbrown::HashSet<T>> for HashSetCodec<C>
where
    T: Ord + std::hash::Hash + Eq,
    C: Codec<T>,
{
    fn encode(&self, w: &mut dyn Write, value: &hashbrown::HashSet<T>) -> Result<(), CodecError> {
        write_len(w, value.len())?;
        let mut sorted: Vec<&T> = value.iter().collect();
        sorted.sort();
        for item in sorted {
            self.0.encode(w, item)?;
        }
        Ok(())
    }

    fn decode(&self, r: &mut dyn Read) -> Result<hashbrown::HashSet<T>, CodecError> {
        let len = read_len(r)?;
        let mut out = hashbrown::HashSet::with_capacity(len.min(1024));
        for _ in 0..len {
            out.insert(self.0.decode(r)?);
        }
        Ok(out)
    }
}

pub struct BTreeMapCodec<KC, VC>(pub KC, pub VC);

impl<K: Ord, V, KC: Codec<K>, VC: Codec<V>> Codec<BTreeMap<K, V>> for BTreeMapCodec<KC, VC> {
    fn encode(&self, w: &mut dyn Write, value: &BTreeMap<K, V>) -> Result<(), CodecError> {
        write_len(w, value.len())?;
        for (key, item) in value {
            self.0.encode(w, key)?;
            self.1.encode(w, item)?;
        }
        Ok(())
    }

    fn decode(&self, r: &mut dyn Read) -> Result<BTreeMap<K, V>, CodecError> {
        let len = read_len(r)?;
        let mut out = BTreeMap::new();
        for _ in 0..len {
            let key = self.0.decode(r)?;
            let item = self.1.decode(r)?;
            out.insert(key, item);
        }
        Ok(out)
    }
}

/// Codec for a hash map; entries are written in key order so the encoding
/// is deterministic.
pub struct HashMapCodec<KC, VC>(pub KC, pub VC);

impl<K, V, KC, VC> Codec<hashbrown::HashMap<K, V>> for HashMapCodec<KC, VC>
where
    K: Ord + std::hash::Hash + Eq,
    KC: Codec<K>,
    VC: Codec<V>,
{
    fn encode(&self, w: &mut dyn Write, value: &hashbrown::HashMap<K, V>) -> Result<(), CodecError> {
        write_len(w, value.len())?;
        let mut sorted: Vec<(&K, &V)> = value.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        for (key, item) in sorted {
            self.0.encode(w, key)?;
            self.1.encode(w, item)?;
        }
        Ok(())
    }

    fn decode(&self, r: &mut dyn Read) -> Result<hashbrown::HashMap<K, V>, CodecError> {
        let len = read_len(r)?;
        let mut out = hashbrown::HashMap::with_capacity(len.min(1024));
        for _ in 0..len {
            let key = self.0.decode(r)?;
            let item = self.1.decode(r)?;
            out.insert(key, item);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{round_trip, StringCodec, U32Codec};

    #[test]
    fn composite_round_trips() {
        assert_eq!(round_trip(&OptionCodec(U32Codec), &None::<u32>), None);
        assert_eq!(round_trip(&OptionCodec(U32Codec), &Some(9)), Some(9));
        assert_eq!(
            round_trip(&VecCodec(StringCodec), &vec!["a".to_string(), String::new()]),
            vec!["a".to_string(), String::new()]
        );

        let set: BTreeSet<u32> = [3, 1, 2].into_iter().collect();
        assert_eq!(round_trip(&BTreeSetCodec(U32Codec), &set), set);
        assert_eq!(
            round_trip(&BTreeSetCodec(U32Codec), &BTreeSet::new()),
            BTreeSet::new()
        );

        let mut map = hashbrown::HashMap::new();
        map.insert(4u32, "d".to_string());
        map.insert(1u32, "a".to_string());
        assert_eq!(round_trip(&HashMapCodec(U32Codec, StringCodec), &map), map);
    }

    #[test]
    fn hash_set_encoding_is_deterministic() {
        let mut set = hashbrown::HashSet::new();
        for n in 0..64u32 {
            set.insert(n * 7 % 64);
        }

        let codec = HashSetCodec(U32Codec);
        let mut first = Vec::new();
        codec.encode(&mut first, &set).unwrap();
        let mut second = Vec::new();
        codec.encode(&mut second, &set).unwrap();
        assert_eq!(first, second);
    }
}
