//! Vector codecs.
//!
//! A codec turns one float vector into one fixed-size code and back. The
//! storage engine only ever sees codes; it never interprets them.

use bytemuck::Pod;

/// Fixed-size encoding of float vectors.
pub trait VectorCodec {
    /// Element type of the code buffer.
    type Code: Pod + Default;

    /// Dimensionality of the vectors this codec accepts.
    fn dimension(&self) -> usize;

    /// Code elements per vector.
    fn code_len(&self) -> usize;

    /// Whether the codec can encode yet. Codecs that learn parameters
    /// from data report false until trained; raw codecs always can.
    fn is_trained(&self) -> bool {
        true
    }

    /// Bytes per vector.
    fn code_size(&self) -> usize {
        self.code_len() * std::mem::size_of::<Self::Code>()
    }

    /// Encode one vector. `x.len() == dimension()`, `out.len() == code_len()`.
    fn encode(&self, x: &[f32], out: &mut [Self::Code]);

    /// Decode one code. `code.len() == code_len()`, `out.len() == dimension()`.
    fn decode(&self, code: &[Self::Code], out: &mut [f32]);
}

/// Raw floats, stored as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatCodec {
    dim: usize,
}

impl FlatCodec {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl VectorCodec for FlatCodec {
    type Code = f32;

    fn dimension(&self) -> usize {
        self.dim
    }

    fn code_len(&self) -> usize {
        self.dim
    }

    fn encode(&self, x: &[f32], out: &mut [f32]) {
        out.copy_from_slice(x);
    }

    fn decode(&self, code: &[f32], out: &mut [f32]) {
        out.copy_from_slice(code);
    }
}
