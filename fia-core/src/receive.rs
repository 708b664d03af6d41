//! Bulk bitmap ingestion
//!
//! The host pushes raw bitmaps over a separate high-speed link. The
//! destination is chosen beforehand with a selector byte; a receive is
//! re-armed into the current destination whenever the link is idle.

use crate::compositor::{Compositor, Layer, ScrollBufferId};
use crate::config::SideId;
use fia_protocol::Side;

/// Selector flag for mask layers
pub const MASK_SELECTOR: u8 = 0x40;

/// Selector flag for dynamic layers
pub const DYNAMIC_SELECTOR: u8 = 0x20;

/// Hardware link delivering bitmap bytes
pub trait BitmapLink {
    type Error;

    /// Arm a receive of exactly `len` bytes
    fn start(&mut self, len: usize) -> Result<(), Self::Error>;

    /// Copy bytes received since the last call into `buf`, returning the count
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Cancel the armed receive
    fn abort(&mut self) -> Result<(), Self::Error>;
}

/// Byte stream filled by a receive interrupt or task
pub trait ByteQueue {
    /// Move up to `buf.len()` queued bytes into `buf`, returning the count
    fn pop_into(&mut self, buf: &mut [u8]) -> usize;

    /// Drop everything queued
    fn clear(&mut self);
}

/// [`BitmapLink`] over a continuous byte stream
///
/// Bytes past the end of the armed bitmap stay queued and start the next
/// one, so back-to-back bitmaps survive the gap until the receive is
/// re-armed. Nothing is consumed while no receive is armed.
#[derive(Debug)]
pub struct StreamLink<Q> {
    queue: Q,
    remaining: usize,
}

impl<Q: ByteQueue> StreamLink<Q> {
    pub fn new(queue: Q) -> Self {
        Self { queue, remaining: 0 }
    }

    /// Bytes still expected by the armed receive
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }
}

impl<Q: ByteQueue> BitmapLink for StreamLink<Q> {
    type Error = core::convert::Infallible;

    fn start(&mut self, len: usize) -> Result<(), Self::Error> {
        self.remaining = len;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let end = buf.len().min(self.remaining);
        if end == 0 {
            return 0;
        }
        let n = self.queue.pop_into(&mut buf[..end]);
        self.remaining -= n;
        n
    }

    fn abort(&mut self) -> Result<(), Self::Error> {
        // A partial bitmap would misalign the next one
        self.queue.clear();
        self.remaining = 0;
        Ok(())
    }
}

/// Where received bitmap bytes are stored
///
/// Layer destinations with [`Side::Both`] receive into side A and are
/// mirrored to side B on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Destination {
    Static(Side),
    Mask(Side),
    Dynamic(Side),
    Scroll(ScrollBufferId),
}

impl Default for Destination {
    fn default() -> Self {
        Destination::Static(Side::Both)
    }
}

fn selector_side(bits: u8) -> Option<Side> {
    match Side::from_byte(bits)? {
        Side::None => None,
        side => Some(side),
    }
}

impl Destination {
    /// Decode a selector byte
    ///
    /// `0x80 | slot` scroll buffer, `0x40 | side` mask, `0x20 | side`
    /// dynamic, plain side byte for the static layer.
    pub fn from_selector(selector: u8) -> Option<Self> {
        if let Some(id) = ScrollBufferId::from_wire(selector) {
            return Some(Destination::Scroll(id));
        }
        if selector & MASK_SELECTOR != 0 {
            return selector_side(selector & !MASK_SELECTOR).map(Destination::Mask);
        }
        if selector & DYNAMIC_SELECTOR != 0 {
            return selector_side(selector & !DYNAMIC_SELECTOR).map(Destination::Dynamic);
        }
        selector_side(selector).map(Destination::Static)
    }

    pub fn to_selector(self) -> u8 {
        match self {
            Destination::Static(side) => side.to_byte(),
            Destination::Mask(side) => MASK_SELECTOR | side.to_byte(),
            Destination::Dynamic(side) => DYNAMIC_SELECTOR | side.to_byte(),
            Destination::Scroll(id) => id.to_wire(),
        }
    }

    fn layer(self) -> Option<(Layer, Side)> {
        match self {
            Destination::Static(side) => Some((Layer::Static, side)),
            Destination::Mask(side) => Some((Layer::Mask, side)),
            Destination::Dynamic(side) => Some((Layer::Dynamic, side)),
            Destination::Scroll(_) => None,
        }
    }

    /// Storage the bytes go to, or None if the scroll buffer is gone
    fn buffer_mut(self, compositor: &mut Compositor) -> Option<&mut [u8]> {
        match self.layer() {
            Some((layer, Side::B)) => Some(compositor.layer_mut(SideId::B, layer)),
            Some((layer, _)) => Some(compositor.layer_mut(SideId::A, layer)),
            None => match self {
                Destination::Scroll(id) => compositor.pool_mut().data_mut(id),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    Idle,
    Active { received: usize, len: usize },
}

/// Receive state for the bitmap link
#[derive(Debug)]
pub struct BitmapReceiver {
    destination: Destination,
    state: RxState,
}

impl Default for BitmapReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl BitmapReceiver {
    pub fn new() -> Self {
        Self {
            destination: Destination::default(),
            state: RxState::Idle,
        }
    }

    pub fn destination(&self) -> Destination {
        self.destination
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, RxState::Active { .. })
    }

    /// Switch destination, cancelling a receive in progress
    ///
    /// Fails, keeping the old destination, if the cancel fails.
    pub fn set_destination<L: BitmapLink>(&mut self, link: &mut L, destination: Destination) -> bool {
        if self.is_active() && !self.abort(link) {
            return false;
        }
        self.destination = destination;
        true
    }

    /// Start a receive into the current destination if none is running
    pub fn arm<L: BitmapLink>(&mut self, link: &mut L, compositor: &mut Compositor) {
        if self.is_active() {
            return;
        }
        let Some(len) = self.destination.buffer_mut(compositor).map(|b| b.len()) else {
            return;
        };
        match link.start(len) {
            Ok(()) => self.state = RxState::Active { received: 0, len },
            Err(_) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("bitmap receive could not be armed");
            }
        }
    }

    /// Move received bytes into place
    ///
    /// Returns true when the bitmap is complete.
    pub fn poll<L: BitmapLink>(&mut self, link: &mut L, compositor: &mut Compositor) -> bool {
        let RxState::Active { received, len } = self.state else {
            return false;
        };
        let Some(buffer) = self.destination.buffer_mut(compositor) else {
            return false;
        };

        let end = len.min(buffer.len());
        let received = received + link.read(&mut buffer[received..end]);
        if received < end {
            self.state = RxState::Active { received, len };
            return false;
        }

        self.state = RxState::Idle;
        if let Some((layer, Side::Both)) = self.destination.layer() {
            compositor.mirror(layer);
        }
        #[cfg(feature = "defmt")]
        defmt::debug!("bitmap received into {}", self.destination);
        true
    }

    /// Best-effort cancel
    ///
    /// Returns false if nothing was running or the link refused, in which
    /// case the receive is still considered active.
    pub fn abort<L: BitmapLink>(&mut self, link: &mut L) -> bool {
        if !self.is_active() {
            return false;
        }
        match link.abort() {
            Ok(()) => {
                self.state = RxState::Idle;
                true
            }
            Err(_) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("bitmap receive abort failed");
                false
            }
        }
    }
}
