//! Cooperative frame scheduler
//!
//! One call to [`FrameScheduler::tick`] runs a full main-loop pass:
//!
//! 1. execute queued control commands, answering each
//! 2. move received bitmap bytes into place, re-arming the receive
//! 3. write pending contrast values
//! 4. recompute backlight levels from ambient light and doors
//! 5. advance scroll positions
//! 6. render scroll buffers and compose the display buffers
//! 7. convert and start a frame on every idle bus
//!
//! Nothing here waits on hardware. A bus that is still sending its last
//! frame is skipped and picks up the newest content on a later tick.

use crate::compositor::Compositor;
use crate::config::DisplayConfig;
use crate::control::{ControlLink, Controller};
use crate::lcd::{convert, BusEvent, BusId, LcdOutput, TransmitEngine};
use crate::panel::{PanelIo, PanelState};
use crate::receive::{BitmapLink, BitmapReceiver};

/// Upper bound on commands executed per tick so rendering keeps pace
pub const MAX_COMMANDS_PER_TICK: usize = 8;

/// Owns the display state and drives every per-tick step
pub struct FrameScheduler<O, C, P, L> {
    compositor: Compositor,
    engine: TransmitEngine<O>,
    receiver: BitmapReceiver,
    panel: PanelState,
    control: C,
    io: P,
    link: L,
}

impl<O, C, P, L> FrameScheduler<O, C, P, L>
where
    O: LcdOutput,
    C: ControlLink,
    P: PanelIo,
    L: BitmapLink,
{
    pub fn new(config: &DisplayConfig, output: O, control: C, io: P, link: L) -> Self {
        Self {
            compositor: Compositor::new(config.layout, config.mask_enabled),
            engine: TransmitEngine::new(output),
            receiver: BitmapReceiver::new(),
            panel: PanelState::new(config),
            control,
            io,
            link,
        }
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn compositor_mut(&mut self) -> &mut Compositor {
        &mut self.compositor
    }

    pub fn engine(&self) -> &TransmitEngine<O> {
        &self.engine
    }

    pub fn receiver(&self) -> &BitmapReceiver {
        &self.receiver
    }

    pub fn panel(&self) -> &PanelState {
        &self.panel
    }

    pub fn io(&self) -> &P {
        &self.io
    }

    pub fn control(&self) -> &C {
        &self.control
    }

    /// Forward an output hardware event to the transmit engine
    pub fn handle_event(&mut self, event: BusEvent) {
        self.engine.handle_event(event);
    }

    /// Run one main-loop pass
    pub fn tick(&mut self) {
        self.service_control();
        self.service_bitmap();
        self.panel.apply_contrast(&mut self.io);
        self.panel.update_brightness(&mut self.io);
        self.compositor.advance_scroll_positions();
        self.compositor.update_display_buffers();
        self.update_buses();
    }

    fn service_control(&mut self) {
        for _ in 0..MAX_COMMANDS_PER_TICK {
            let Some(request) = self.control.poll_command() else {
                return;
            };
            let response = Controller {
                compositor: &mut self.compositor,
                receiver: &mut self.receiver,
                panel: &mut self.panel,
                io: &mut self.io,
                link: &mut self.link,
            }
            .respond(request);
            self.control.send_response(&response);
        }
    }

    fn service_bitmap(&mut self) {
        self.receiver.arm(&mut self.link, &mut self.compositor);
        self.receiver.poll(&mut self.link, &mut self.compositor);
    }

    /// Convert each idle bus's half of the display and send it
    fn update_buses(&mut self) {
        let layout = *self.compositor.layout();

        for bus in BusId::ALL {
            if bus.panel_row() >= layout.panel_rows() || self.engine.is_transmitting(bus) {
                continue;
            }

            let ram = self.engine.ram(bus);
            let bitmap = self.compositor.display(bus.side());
            convert(self.engine.frame_mut(bus), bitmap, &layout, bus.panel_row(), ram);

            if self.engine.start_transmit(bus, layout.half_panels_per_bus()) {
                self.engine.flip_ram(bus);
            }
        }
    }
}
