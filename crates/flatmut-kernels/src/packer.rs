//! Code packers.
//!
//! A packer moves fixed-size codes between a flat array (one code after the
//! other) and blocks that hold `nvec` codes each. Block layouts other than
//! the flat one interleave codes; the flat packer is a straight copy.

use thiserror::Error;

/// Errors raised when buffers do not match the packer geometry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PackError {
    /// A buffer has the wrong length
    #[error("Buffer size mismatch: expected {expected} bytes, got {actual}")]
    Size { expected: usize, actual: usize },

    /// Offset past the codes a block holds
    #[error("Offset {offset} out of range for block of {nvec} codes")]
    Offset { offset: usize, nvec: usize },
}

/// Moves codes in and out of blocks.
pub trait CodePacker {
    /// Bytes per code.
    fn code_size(&self) -> usize;

    /// Codes per block.
    fn nvec(&self) -> usize;

    /// Bytes per block.
    fn block_size(&self) -> usize;

    /// Write one code at position `offset` of `block`.
    fn pack_1(&self, flat_code: &[u8], offset: usize, block: &mut [u8]) -> Result<(), PackError>;

    /// Read the code at position `offset` of `block`.
    fn unpack_1(&self, block: &[u8], offset: usize, flat_code: &mut [u8])
        -> Result<(), PackError>;

    /// Pack `nvec` consecutive codes into one block.
    fn pack_all(&self, flat_codes: &[u8], block: &mut [u8]) -> Result<(), PackError> {
        check_len(self.code_size() * self.nvec(), flat_codes.len())?;
        for (offset, code) in flat_codes.chunks_exact(self.code_size()).enumerate() {
            self.pack_1(code, offset, block)?;
        }
        Ok(())
    }

    /// Unpack one block into `nvec` consecutive codes.
    fn unpack_all(&self, block: &[u8], flat_codes: &mut [u8]) -> Result<(), PackError> {
        check_len(self.code_size() * self.nvec(), flat_codes.len())?;
        let code_size = self.code_size();
        for (offset, code) in flat_codes.chunks_exact_mut(code_size).enumerate() {
            self.unpack_1(block, offset, code)?;
        }
        Ok(())
    }
}

fn check_len(expected: usize, actual: usize) -> Result<(), PackError> {
    if expected != actual {
        return Err(PackError::Size { expected, actual });
    }
    Ok(())
}

/// One code per block, stored as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodePackerFlat {
    code_size: usize,
}

impl CodePackerFlat {
    pub fn new(code_size: usize) -> Self {
        Self { code_size }
    }
}

impl CodePacker for CodePackerFlat {
    fn code_size(&self) -> usize {
        self.code_size
    }

    fn nvec(&self) -> usize {
        1
    }

    fn block_size(&self) -> usize {
        self.code_size
    }

    fn pack_1(&self, flat_code: &[u8], offset: usize, block: &mut [u8]) -> Result<(), PackError> {
        if offset != 0 {
            return Err(PackError::Offset { offset, nvec: 1 });
        }
        check_len(self.code_size, flat_code.len())?;
        check_len(self.block_size(), block.len())?;
        block.copy_from_slice(flat_code);
        Ok(())
    }

    fn unpack_1(
        &self,
        block: &[u8],
        offset: usize,
        flat_code: &mut [u8],
    ) -> Result<(), PackError> {
        if offset != 0 {
            return Err(PackError::Offset { offset, nvec: 1 });
        }
        check_len(self.block_size(), block.len())?;
        check_len(self.code_size, flat_code.len())?;
        flat_code.copy_from_slice(block);
        Ok(())
    }
}
