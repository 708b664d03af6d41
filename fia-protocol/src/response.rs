//! Response encoding
//!
//! Every request is answered with a frame `START, n + 1, data, checksum`,
//! even when the command returns no data.

use crate::frame::{checksum, FrameError, FRAME_START, MAX_FRAME_SIZE, MAX_RESPONSE_SIZE};
use heapless::Vec;

/// Response data returned for one command
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Response {
    pub data: Vec<u8, MAX_RESPONSE_SIZE>,
}

impl Response {
    /// Response without data
    pub fn empty() -> Self {
        Self::default()
    }

    /// Single-byte response (status codes, ids, flags)
    pub fn byte(value: u8) -> Self {
        let mut response = Self::default();
        // Capacity is far above one byte
        let _ = response.data.push(value);
        response
    }

    /// Sequence of big-endian unsigned 16-bit words
    pub fn words(values: &[u16]) -> Self {
        let mut response = Self::default();
        for value in values {
            let _ = response.data.extend_from_slice(&value.to_be_bytes());
        }
        response
    }

    /// Sequence of big-endian signed 16-bit words
    pub fn signed_words(values: &[i16]) -> Self {
        let mut response = Self::default();
        for value in values {
            let _ = response.data.extend_from_slice(&value.to_be_bytes());
        }
        response
    }

    /// Encode into `buffer`, returning the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let n = self.data.len();
        let frame_len = n + 3;
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        buffer[0] = FRAME_START;
        buffer[1] = (n + 1) as u8;
        buffer[2..2 + n].copy_from_slice(&self.data);
        buffer[2 + n] = checksum(&self.data);
        Ok(frame_len)
    }

    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        Vec::from_slice(&buffer[..len]).map_err(|_| FrameError::BufferTooSmall)
    }

    /// Decode a complete response frame (host side)
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < 3 {
            return Err(FrameError::Incomplete);
        }
        if bytes[0] != FRAME_START || bytes[1] == 0 {
            return Err(FrameError::InvalidFrame);
        }
        let n = bytes[1] as usize - 1;
        if bytes.len() < n + 3 {
            return Err(FrameError::Incomplete);
        }
        let data = &bytes[2..2 + n];
        if checksum(data) != bytes[2 + n] {
            return Err(FrameError::InvalidChecksum);
        }
        Ok(Self {
            data: Vec::from_slice(data).map_err(|_| FrameError::PayloadTooLarge)?,
        })
    }
}
