//! Adaptive bit-set over a compact integer universe.
//!
//! Many vertices carry empty or tiny reachable-executable sets while a few
//! fan-in vertices carry huge ones; a single representation wastes memory
//! or CPU at one end of that distribution. [`BitStore`] picks a dense
//! bitmap for small universes and a sparse hash-set for large ones, behind
//! one interface. The representation is fixed at construction; no
//! operation changes it, so behavior is identical either way.

use std::io::{Read, Write};

use thiserror::Error;

use trellis_storage::codec::{Codec, U64Codec, VecCodec};
use trellis_storage::CodecError;

/// Universe size at or below which the dense bitmap is used.
pub const DENSE_THRESHOLD: usize = 512;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BitStoreError {
    /// The two operands use different internal representations.
    ///
    /// Callers must not rely on crossing this boundary; operands derived
    /// from the same universe always share a representation.
    #[error("bit store representation mismatch")]
    RepresentationMismatch,
    #[error("bit store universe mismatch: {left} vs {right}")]
    UniverseMismatch { left: usize, right: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Repr {
    Dense { universe: usize, words: Vec<u64> },
    Sparse { universe: usize, bits: hashbrown::HashSet<u32> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitStore {
    repr: Repr,
}

impl BitStore {
    /// Creates a store for bits in `0..universe` with the default
    /// representation threshold.
    pub fn with_universe(universe: usize) -> Self {
        Self::with_universe_and_threshold(universe, DENSE_THRESHOLD)
    }

    pub fn with_universe_and_threshold(universe: usize, threshold: usize) -> Self {
        let repr = if universe <= threshold {
            Repr::Dense {
                universe,
                words: vec![0u64; universe.div_ceil(64)],
            }
        } else {
            Repr::Sparse {
                universe,
                bits: hashbrown::HashSet::new(),
            }
        };
        Self { repr }
    }

    pub fn universe(&self) -> usize {
        match &self.repr {
            Repr::Dense { universe, .. } => *universe,
            Repr::Sparse { universe, .. } => *universe,
        }
    }

    pub fn is_dense(&self) -> bool {
        matches!(self.repr, Repr::Dense { .. })
    }

    pub fn insert(&mut self, bit: u32) {
        match &mut self.repr {
            Repr::Dense { universe, words } => {
                assert!((bit as usize) < *universe, "bit {bit} outside universe {universe}");
                words[bit as usize / 64] |= 1u64 << (bit % 64);
            }
            Repr::Sparse { universe, bits } => {
                assert!((bit as usize) < *universe, "bit {bit} outside universe {universe}");
                bits.insert(bit);
            }
        }
    }

    pub fn remove(&mut self, bit: u32) {
        match &mut self.repr {
            Repr::Dense { universe, words } => {
                if (bit as usize) < *universe {
                    words[bit as usize / 64] &= !(1u64 << (bit % 64));
                }
            }
            Repr::Sparse { bits, .. } => {
                bits.remove(&bit);
            }
        }
    }

    pub fn contains(&self, bit: u32) -> bool {
        match &self.repr {
            Repr::Dense { universe, words } => {
                (bit as usize) < *universe && words[bit as usize / 64] & (1u64 << (bit % 64)) != 0
            }
            Repr::Sparse { bits, .. } => bits.contains(&bit),
        }
    }

    /// In-place union. Fails when `other` uses a different representation
    /// or universe; it never switches representation to compensate.
    pub fn union_in_place(&mut self, other: &BitStore) -> Result<(), BitStoreError> {
        match (&mut self.repr, &other.repr) {
            (
                Repr::Dense { universe, words },
                Repr::Dense {
                    universe: other_universe,
                    words: other_words,
                },
            ) => {
                if universe != other_universe {
                    return Err(BitStoreError::UniverseMismatch {
                        left: *universe,
                        right: *other_universe,
                    });
                }
                for (word, other_word) in words.iter_mut().zip(other_words) {
                    *word |= other_word;
                }
                Ok(())
            }
            (
                Repr::Sparse { universe, bits },
                Repr::Sparse {
                    universe: other_universe,
                    bits: other_bits,
                },
            ) => {
                if universe != other_universe {
                    return Err(BitStoreError::UniverseMismatch {
                        left: *universe,
                        right: *other_universe,
                    });
                }
                bits.extend(other_bits);
                Ok(())
            }
            _ => Err(BitStoreError::RepresentationMismatch),
        }
    }

    /// Visits set bits in ascending order.
    pub fn for_each(&self, mut f: impl FnMut(u32)) {
        match &self.repr {
            Repr::Dense { words, .. } => {
                for (word_idx, word) in words.iter().enumerate() {
                    let mut word = *word;
                    while word != 0 {
                        let bit = word.trailing_zeros();
                        f(word_idx as u32 * 64 + bit);
                        word &= word - 1;
                    }
                }
            }
            Repr::Sparse { bits, .. } => {
                let mut sorted: Vec<u32> = bits.iter().copied().collect();
                sorted.sort_unstable();
                for bit in sorted {
                    f(bit);
                }
            }
        }
    }

    /// Set bits in ascending order.
    pub fn ascending(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.len());
        self.for_each(|bit| out.push(bit));
        out
    }

    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Dense { words, .. } => words.iter().map(|w| w.count_ones() as usize).sum(),
            Repr::Sparse { bits, .. } => bits.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.repr {
            Repr::Dense { words, .. } => words.iter().all(|w| *w == 0),
            Repr::Sparse { bits, .. } => bits.is_empty(),
        }
    }
}

/// Codec for [`BitStore`]: dense stores its word array, sparse its sorted
/// members; both record the universe so the representation reconstructs
/// identically.
pub struct BitStoreCodec;

const TAG_DENSE: u8 = 0;
const TAG_SPARSE: u8 = 1;

impl Codec<BitStore> for BitStoreCodec {
    fn encode(&self, w: &mut dyn Write, value: &BitStore) -> Result<(), CodecError> {
        match &value.repr {
            Repr::Dense { universe, words } => {
                w.write_all(&[TAG_DENSE])?;
                U64Codec.encode(w, &(*universe as u64))?;
                VecCodec(U64Codec).encode(w, words)?;
            }
            Repr::Sparse { universe, bits } => {
                w.write_all(&[TAG_SPARSE])?;
                U64Codec.encode(w, &(*universe as u64))?;
                let mut sorted: Vec<u64> = bits.iter().map(|b| *b as u64).collect();
                sorted.sort_unstable();
                VecCodec(U64Codec).encode(w, &sorted)?;
            }
        }
        Ok(())
    }

    fn decode(&self, r: &mut dyn Read) -> Result<BitStore, CodecError> {
        let mut tag = [0u8; 1];
        r.read_exact(&mut tag)?;
        let universe = U64Codec.decode(r)? as usize;
        let payload = VecCodec(U64Codec).decode(r)?;

        match tag[0] {
            TAG_DENSE => Ok(BitStore {
                repr: Repr::Dense {
                    universe,
                    words: payload,
                },
            }),
            TAG_SPARSE => Ok(BitStore {
                repr: Repr::Sparse {
                    universe,
                    bits: payload.into_iter().map(|b| b as u32).collect(),
                },
            }),
            tag => Err(CodecError::InvalidTag {
                tag,
                type_name: "BitStore",
            }),
        }
    }
}
