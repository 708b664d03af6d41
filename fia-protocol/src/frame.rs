//! Frame encoding and decoding for the control channel.
//!
//! Request frame format:
//! - START (1 byte): 0xFF synchronization byte
//! - LENGTH (1 byte): number of bytes that follow (command + params + checksum)
//! - COMMAND (1 byte): command code
//! - PARAMS (0-253 bytes): command-specific data
//! - CHECKSUM (1 byte): 0x7F XOR COMMAND XOR all PARAMS bytes
//!
//! Responses reuse the same envelope without a command byte:
//! `START, n + 1, data[0..n], checksum(data)`.

use heapless::Vec;

/// Frame synchronization byte
pub const FRAME_START: u8 = 0xFF;

/// Initial value of the running XOR checksum
pub const CHECKSUM_SEED: u8 = 0x7F;

/// Maximum value of the LENGTH byte
pub const MAX_LENGTH: usize = 255;

/// Maximum number of parameter bytes in a request
pub const MAX_PARAMS_SIZE: usize = MAX_LENGTH - 2;

/// Maximum number of data bytes in a response
pub const MAX_RESPONSE_SIZE: usize = MAX_LENGTH - 1;

/// Maximum complete frame size (START + LENGTH + MAX_LENGTH)
pub const MAX_FRAME_SIZE: usize = 2 + MAX_LENGTH;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Checksum mismatch
    InvalidChecksum,
    /// Frame is incomplete (need more bytes)
    Incomplete,
    /// Invalid frame structure
    InvalidFrame,
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// Calculate the XOR checksum over `data`, seeded with [`CHECKSUM_SEED`]
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(CHECKSUM_SEED, |acc, &b| acc ^ b)
}

/// A parsed or constructed request frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command code
    pub command: u8,
    /// Parameter bytes
    pub params: Vec<u8, MAX_PARAMS_SIZE>,
}

impl Frame {
    /// Create a new frame with the given command and parameters
    pub fn new(command: u8, params: &[u8]) -> Result<Self, FrameError> {
        let mut vec = Vec::new();
        vec.extend_from_slice(params)
            .map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Self {
            command,
            params: vec,
        })
    }

    /// Create a frame with no parameters
    pub fn empty(command: u8) -> Self {
        Self {
            command,
            params: Vec::new(),
        }
    }

    fn checksum(&self) -> u8 {
        checksum(&self.params) ^ self.command
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let n = self.params.len();
        let frame_len = 4 + n; // START + LENGTH + COMMAND + params + CHECKSUM
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        buffer[0] = FRAME_START;
        buffer[1] = (n + 2) as u8;
        buffer[2] = self.command;
        buffer[3..3 + n].copy_from_slice(&self.params);
        buffer[3 + n] = self.checksum();

        Ok(frame_len)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        Vec::from_slice(&buffer[..len]).map_err(|_| FrameError::BufferTooSmall)
    }
}

/// State machine for parsing incoming request frames
#[derive(Debug, Clone)]
pub struct FrameParser {
    state: ParseState,
    buffer: Vec<u8, MAX_PARAMS_SIZE>,
    expected_params: usize,
    command: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Waiting for START byte
    WaitingForStart,
    /// Got START, waiting for LENGTH
    WaitingForLength,
    /// Got LENGTH, waiting for COMMAND
    WaitingForCommand,
    /// Reading parameter bytes
    ReadingParams,
    /// Waiting for CHECKSUM
    WaitingForChecksum,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    /// Create a new frame parser
    pub fn new() -> Self {
        Self {
            state: ParseState::WaitingForStart,
            buffer: Vec::new(),
            expected_params: 0,
            command: 0,
        }
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.state = ParseState::WaitingForStart;
        self.buffer.clear();
        self.expected_params = 0;
        self.command = 0;
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(frame))` when a complete valid frame is parsed,
    /// `Ok(None)` when more bytes are needed, or `Err` on parse error.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        match self.state {
            ParseState::WaitingForStart => {
                if byte == FRAME_START {
                    self.state = ParseState::WaitingForLength;
                }
                Ok(None)
            }
            ParseState::WaitingForLength => {
                // A frame carries at least a command and a checksum
                if byte < 2 {
                    self.reset();
                    return Err(FrameError::InvalidFrame);
                }
                self.expected_params = byte as usize - 2;
                self.state = ParseState::WaitingForCommand;
                Ok(None)
            }
            ParseState::WaitingForCommand => {
                self.command = byte;
                self.buffer.clear();
                self.state = if self.expected_params == 0 {
                    ParseState::WaitingForChecksum
                } else {
                    ParseState::ReadingParams
                };
                Ok(None)
            }
            ParseState::ReadingParams => {
                // Cannot overflow: expected_params <= MAX_PARAMS_SIZE
                let _ = self.buffer.push(byte);
                if self.buffer.len() == self.expected_params {
                    self.state = ParseState::WaitingForChecksum;
                }
                Ok(None)
            }
            ParseState::WaitingForChecksum => {
                let frame = Frame {
                    command: self.command,
                    params: self.buffer.clone(),
                };
                self.reset();

                if byte != frame.checksum() {
                    return Err(FrameError::InvalidChecksum);
                }
                Ok(Some(frame))
            }
        }
    }

    /// Feed multiple bytes to the parser
    ///
    /// Returns the first complete frame found, if any.
    /// Remaining bytes after a complete frame are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<Frame>, FrameError> {
        for &byte in bytes {
            if let Some(frame) = self.feed(byte)? {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_encode_empty_params() {
        let frame = Frame::empty(0x11);
        let mut buffer = [0u8; 10];
        let len = frame.encode(&mut buffer).unwrap();

        assert_eq!(len, 4);
        assert_eq!(buffer[0], FRAME_START);
        assert_eq!(buffer[1], 2); // command + checksum
        assert_eq!(buffer[2], 0x11);
        assert_eq!(buffer[3], 0x7F ^ 0x11);
    }

    #[test]
    fn test_frame_encode_with_params() {
        let frame = Frame::new(0x50, &[0x08, 0x00, 0x07, 0xD0]).unwrap();
        let encoded = frame.encode_to_vec().unwrap();

        assert_eq!(encoded.len(), 8);
        assert_eq!(encoded[1], 6);
        assert_eq!(encoded[2], 0x50);
        assert_eq!(&encoded[3..7], &[0x08, 0x00, 0x07, 0xD0]);
        assert_eq!(encoded[7], 0x7F ^ 0x50 ^ 0x08 ^ 0x00 ^ 0x07 ^ 0xD0);
    }

    #[test]
    fn test_frame_roundtrip() {
        let original = Frame::new(0x62, &[0x80, 0xFF, 1, 2, 3]).unwrap();
        let encoded = original.encode_to_vec().unwrap();

        let mut parser = FrameParser::new();
        let parsed = parser.feed_bytes(&encoded).unwrap().unwrap();

        assert_eq!(parsed, original);
    }

    #[test]
    fn test_parser_invalid_checksum() {
        let mut encoded = Frame::empty(0x30).encode_to_vec().unwrap();
        let last_idx = encoded.len() - 1;
        encoded[last_idx] ^= 0x01;

        let mut parser = FrameParser::new();
        assert_eq!(parser.feed_bytes(&encoded), Err(FrameError::InvalidChecksum));

        // Parser is usable again after a bad frame
        let good = Frame::empty(0x30).encode_to_vec().unwrap();
        assert!(parser.feed_bytes(&good).unwrap().is_some());
    }

    #[test]
    fn test_parser_rejects_short_length() {
        let mut parser = FrameParser::new();
        assert_eq!(parser.feed_bytes(&[FRAME_START, 1]), Err(FrameError::InvalidFrame));
    }

    #[test]
    fn test_parser_resync_after_garbage() {
        let encoded = Frame::empty(0x64).encode_to_vec().unwrap();

        let mut data = Vec::<u8, 20>::new();
        data.extend_from_slice(&[0x00, 0x12, 0x34]).unwrap();
        data.extend_from_slice(&encoded).unwrap();

        let mut parser = FrameParser::new();
        let parsed = parser.feed_bytes(&data).unwrap().unwrap();

        assert_eq!(parsed.command, 0x64);
    }

    #[test]
    fn test_params_too_large() {
        let large = [0u8; MAX_PARAMS_SIZE + 1];
        assert_eq!(Frame::new(0x60, &large), Err(FrameError::PayloadTooLarge));
    }

    #[test]
    fn test_checksum_seed() {
        assert_eq!(checksum(&[]), 0x7F);
        assert_eq!(checksum(&[0xFF]), 0x80);
    }
}
