//! Inter-task communication channels
//!
//! The UART tasks and the frame task only meet here. Requests flow from
//! `control_rx` to the frame task, responses flow back to `control_tx` in
//! the same order. Bitmap bytes flow from `bitmap_rx` through a pipe.

use defmt::*;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::pipe::Pipe;
use embassy_sync::signal::Signal;

use fia_core::control::ControlLink;
use fia_core::receive::ByteQueue;
use fia_protocol::{Command, CommandError, Response};

/// Channel capacity for decoded requests
const COMMAND_CHANNEL_SIZE: usize = 8;

/// Channel capacity for responses awaiting transmission
const RESPONSE_CHANNEL_SIZE: usize = 8;

/// Bitmap bytes buffered between two frame ticks
const BITMAP_PIPE_SIZE: usize = 4096;

/// Decoded control requests, including ones that failed to decode
pub static COMMAND_CHANNEL: Channel<
    CriticalSectionRawMutex,
    Result<Command, CommandError>,
    COMMAND_CHANNEL_SIZE,
> = Channel::new();

/// Responses, one per request
pub static RESPONSE_CHANNEL: Channel<CriticalSectionRawMutex, Response, RESPONSE_CHANNEL_SIZE> =
    Channel::new();

/// Reset requested by the host; performed once the acknowledgement is sent
pub static RESET_REQUEST: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Raw bitmap stream from the bulk UART
pub static BITMAP_PIPE: Pipe<CriticalSectionRawMutex, BITMAP_PIPE_SIZE> = Pipe::new();

/// Control link backed by the static channels
pub struct ChannelControl;

impl ControlLink for ChannelControl {
    fn poll_command(&mut self) -> Option<Result<Command, CommandError>> {
        COMMAND_CHANNEL.try_receive().ok()
    }

    fn send_response(&mut self, response: &Response) {
        if RESPONSE_CHANNEL.try_send(response.clone()).is_err() {
            warn!("Response channel full, dropping response");
        }
    }
}

/// Bitmap byte queue backed by [`BITMAP_PIPE`]
pub struct PipeQueue;

impl ByteQueue for PipeQueue {
    fn pop_into(&mut self, buf: &mut [u8]) -> usize {
        BITMAP_PIPE.try_read(buf).unwrap_or(0)
    }

    fn clear(&mut self) {
        BITMAP_PIPE.clear();
    }
}
