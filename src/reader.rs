use crate::{DecodeError, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;
use std::io::{Cursor, Read};

fn to_decode(e: std::io::Error) -> DecodeError {
    e.into()
}

/// Little-endian cursor over an in-memory byte buffer.
///
/// All decoding goes through this type. The read methods are named after the
/// field vocabulary of the file format (`byte`, `word`, `short`, `dword`),
/// so parser code reads like the format description.
pub(crate) struct AseReader<'a> {
    input: Cursor<&'a [u8]>,
}

impl<'a> AseReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> AseReader<'a> {
        let input = Cursor::new(data);
        AseReader { input }
    }

    /// Bytes left between the cursor and the end of the input.
    pub(crate) fn remaining(&self) -> usize {
        let len = self.input.get_ref().len() as u64;
        len.saturating_sub(self.input.position()) as usize
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.remaining() == 0
    }

    pub(crate) fn byte(&mut self) -> Result<u8> {
        self.input.read_u8().map_err(to_decode)
    }

    pub(crate) fn word(&mut self) -> Result<u16> {
        self.input.read_u16::<LittleEndian>().map_err(to_decode)
    }

    pub(crate) fn short(&mut self) -> Result<i16> {
        self.input.read_i16::<LittleEndian>().map_err(to_decode)
    }

    pub(crate) fn dword(&mut self) -> Result<u32> {
        self.input.read_u32::<LittleEndian>().map_err(to_decode)
    }

    /// A length-prefixed UTF-8 string (word length, then that many bytes).
    pub(crate) fn string(&mut self) -> Result<String> {
        let str_len = self.word()?;
        let mut str_bytes = vec![0_u8; str_len as usize];
        self.input.read_exact(&mut str_bytes).map_err(to_decode)?;
        let s = String::from_utf8(str_bytes)?;
        Ok(s)
    }

    pub(crate) fn read_exact(&mut self, buffer: &mut [u8]) -> Result<()> {
        self.input.read_exact(buffer).map_err(to_decode)
    }

    pub(crate) fn skip_reserved(&mut self, count: usize) -> Result<()> {
        let mut ignored = vec![0_u8; count];
        self.input.read_exact(&mut ignored).map_err(to_decode)
    }

    /// Consumes the reader and returns exactly `limit` bytes, or an error if
    /// fewer are available.
    pub(crate) fn take_bytes(self, limit: usize) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(limit);
        self.input.take(limit as u64).read_to_end(&mut output)?;
        if output.len() != limit {
            Err(DecodeError::Format(format!(
                "Invalid data size. Expected: {}, Actual: {}",
                limit,
                output.len()
            )))
        } else {
            Ok(output)
        }
    }

    /// Consumes the reader and inflates the rest of the input as a zlib
    /// stream.
    pub(crate) fn unzip(self, expected_output_size: usize) -> Result<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(self.input);
        let mut buffer = Vec::with_capacity(expected_output_size);
        decoder.read_to_end(&mut buffer)?;
        Ok(buffer)
    }
}
