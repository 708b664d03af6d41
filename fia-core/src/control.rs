//! Control channel command execution
//!
//! Every decoded command produces exactly one response. Commands that
//! fail to decode are still answered, with an empty response.

use crate::compositor::{Compositor, ScrollBufferId};
use crate::config::SideId;
use crate::panel::{PanelIo, PanelState};
use crate::receive::{BitmapLink, BitmapReceiver, Destination};
use fia_protocol::{Command, CommandError, Response};

/// Status byte for a successful operation
pub const STATUS_OK: u8 = 1;

/// Status byte for a rejected operation
pub const STATUS_FAILED: u8 = 0;

/// Reply to Null and McuReset
pub const ACK: u8 = 0xFF;

/// Host side of the control channel
pub trait ControlLink {
    /// Next decoded request, if one is waiting
    fn poll_command(&mut self) -> Option<Result<Command, CommandError>>;

    fn send_response(&mut self, response: &Response);
}

fn status(ok: bool) -> Response {
    Response::byte(if ok { STATUS_OK } else { STATUS_FAILED })
}

/// Borrowed view of everything a command can touch
pub struct Controller<'a, P, L> {
    pub compositor: &'a mut Compositor,
    pub receiver: &'a mut BitmapReceiver,
    pub panel: &'a mut PanelState,
    pub io: &'a mut P,
    pub link: &'a mut L,
}

impl<P: PanelIo, L: BitmapLink> Controller<'_, P, L> {
    /// Execute a decoded request, or answer a malformed one
    pub fn respond(&mut self, request: Result<Command, CommandError>) -> Response {
        match request {
            Ok(command) => self.execute(command),
            Err(_err) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("malformed command: {}", _err);
                Response::empty()
            }
        }
    }

    pub fn execute(&mut self, command: Command) -> Response {
        #[cfg(feature = "defmt")]
        defmt::trace!("command {}", command);

        match command {
            Command::Null => Response::byte(ACK),
            Command::McuReset => {
                self.io.request_reset();
                Response::byte(ACK)
            }

            Command::SetBacklightState(on) => {
                self.io.set_backlight_enabled(on);
                Response::empty()
            }
            Command::GetBacklightState => Response::byte(self.io.backlight_enabled() as u8),
            Command::SetBacklightBaseBrightness { side_a, side_b } => {
                self.panel.set_base_brightness(side_a, side_b);
                Response::empty()
            }
            Command::GetBacklightBaseBrightness => Response::signed_words(&[
                self.panel.base_brightness(SideId::A),
                self.panel.base_brightness(SideId::B),
            ]),
            Command::GetBacklightBrightness => Response::words(&[
                self.panel.brightness(SideId::A),
                self.panel.brightness(SideId::B),
            ]),

            Command::SetActuator(actuator, level) => {
                self.io.set_actuator(actuator, level);
                Response::empty()
            }
            Command::GetActuator(actuator) => Response::byte(self.io.actuator(actuator)),

            Command::GetDoorStates => Response::byte(self.io.doors_open().to_byte()),
            Command::GetTemperatures => Response::signed_words(&self.io.temperatures()),
            Command::GetHumidity => Response::signed_words(&[self.io.humidity()]),
            Command::GetEnvBrightness => Response::words(&[
                self.io.env_brightness(SideId::A),
                self.io.env_brightness(SideId::B),
            ]),

            Command::SetLcdContrast { side_a, side_b } => {
                self.panel.set_contrast(side_a, side_b);
                Response::empty()
            }
            Command::GetLcdContrast => Response::words(&[
                self.panel.contrast(SideId::A),
                self.panel.contrast(SideId::B),
            ]),

            Command::CreateScrollBuffer(spec) => match self.compositor.create_scroll_buffer(&spec) {
                Ok(id) => Response::byte(id.to_wire()),
                Err(err) => Response::byte(err.status_code()),
            },
            Command::DeleteScrollBuffer { id } => status(self.delete_scroll_buffer(id)),
            Command::UpdateScrollBuffer { id, update } => {
                let ok = ScrollBufferId::from_wire(id)
                    .is_some_and(|id| self.compositor.update_scroll_buffer(id, &update).is_ok());
                status(ok)
            }

            Command::SetDestinationBuffer { selector } => status(self.set_destination(selector)),
            Command::GetDestinationBuffer => {
                Response::byte(self.receiver.destination().to_selector())
            }

            Command::SetMaskEnabled(enabled) => {
                self.compositor.set_mask_enabled(enabled);
                Response::empty()
            }
            Command::GetMaskEnabled => Response::byte(self.compositor.mask_enabled() as u8),
        }
    }

    /// The buffer bitmaps are currently received into cannot be deleted
    fn delete_scroll_buffer(&mut self, wire_id: u8) -> bool {
        let Some(id) = ScrollBufferId::from_wire(wire_id) else {
            return false;
        };
        if self.receiver.destination() == Destination::Scroll(id) {
            return false;
        }
        self.compositor.delete_scroll_buffer(id).is_ok()
    }

    fn set_destination(&mut self, selector: u8) -> bool {
        let Some(destination) = Destination::from_selector(selector) else {
            return false;
        };
        if let Destination::Scroll(id) = destination {
            if !self.compositor.pool().contains(id) {
                return false;
            }
        }
        self.receiver.set_destination(&mut *self.link, destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DisplayConfig, PanelLayout, Topology};
    use crate::panel::mock::MockPanel;
    use fia_protocol::{Actuator, ScrollBufferSpec, ScrollBufferUpdate, Side};

    struct NullLink;

    impl BitmapLink for NullLink {
        type Error = ();

        fn start(&mut self, _len: usize) -> Result<(), ()> {
            Ok(())
        }

        fn read(&mut self, _buf: &mut [u8]) -> usize {
            0
        }

        fn abort(&mut self) -> Result<(), ()> {
            Ok(())
        }
    }

    struct Fixture {
        compositor: Compositor,
        receiver: BitmapReceiver,
        panel: PanelState,
        io: MockPanel,
        link: NullLink,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                compositor: Compositor::new(PanelLayout::new(2, 1, Topology::ULoop).unwrap(), true),
                receiver: BitmapReceiver::new(),
                panel: PanelState::new(&DisplayConfig::default()),
                io: MockPanel::default(),
                link: NullLink,
            }
        }

        fn run(&mut self, command: Command) -> Response {
            Controller {
                compositor: &mut self.compositor,
                receiver: &mut self.receiver,
                panel: &mut self.panel,
                io: &mut self.io,
                link: &mut self.link,
            }
            .execute(command)
        }
    }

    fn spec() -> ScrollBufferSpec {
        ScrollBufferSpec {
            side: Side::A,
            disp_w: 20,
            disp_h: 8,
            int_w: 40,
            int_h: 8,
            ..Default::default()
        }
    }

    #[test]
    fn test_null_and_reset() {
        let mut f = Fixture::new();
        assert_eq!(f.run(Command::Null), Response::byte(0xFF));
        assert_eq!(f.run(Command::McuReset), Response::byte(0xFF));
        assert_eq!(f.io.resets, 1);
    }

    #[test]
    fn test_malformed_gets_empty_response() {
        let mut f = Fixture::new();
        let response = Controller {
            compositor: &mut f.compositor,
            receiver: &mut f.receiver,
            panel: &mut f.panel,
            io: &mut f.io,
            link: &mut f.link,
        }
        .respond(Err(CommandError::UnknownCommand(0x99)));
        assert_eq!(response, Response::empty());
    }

    #[test]
    fn test_contrast_and_brightness_roundtrip() {
        let mut f = Fixture::new();
        assert_eq!(
            f.run(Command::SetLcdContrast { side_a: 0x0123, side_b: 0x0456 }),
            Response::empty()
        );
        assert_eq!(f.run(Command::GetLcdContrast), Response::words(&[0x0123, 0x0456]));

        f.run(Command::SetBacklightBaseBrightness { side_a: -5, side_b: 3000 });
        assert_eq!(
            f.run(Command::GetBacklightBaseBrightness),
            Response::signed_words(&[-5, 3000])
        );
    }

    #[test]
    fn test_peripherals() {
        let mut f = Fixture::new();
        f.run(Command::SetBacklightState(true));
        assert_eq!(f.run(Command::GetBacklightState), Response::byte(1));

        f.run(Command::SetActuator(Actuator::Heaters, 2));
        assert_eq!(f.run(Command::GetActuator(Actuator::Heaters)), Response::byte(2));
        assert_eq!(f.run(Command::GetActuator(Actuator::CirculationFans)), Response::byte(0));

        f.io.doors = Side::Both;
        assert_eq!(f.run(Command::GetDoorStates), Response::byte(0x03));

        f.io.env = [10, 20];
        assert_eq!(f.run(Command::GetEnvBrightness), Response::words(&[10, 20]));
        assert_eq!(
            f.run(Command::GetTemperatures),
            Response::signed_words(&[2150, 2375, 3000, -512])
        );
        assert_eq!(f.run(Command::GetHumidity), Response::signed_words(&[4550]));
    }

    #[test]
    fn test_scroll_buffer_lifecycle() {
        let mut f = Fixture::new();
        assert_eq!(f.run(Command::CreateScrollBuffer(spec())), Response::byte(0x80));
        assert_eq!(f.run(Command::CreateScrollBuffer(spec())), Response::byte(0x81));

        let update = ScrollBufferUpdate {
            speed_x: Some(2),
            ..Default::default()
        };
        assert_eq!(f.run(Command::UpdateScrollBuffer { id: 0x81, update }), Response::byte(1));
        assert_eq!(f.run(Command::UpdateScrollBuffer { id: 0x85, update }), Response::byte(0));
        assert_eq!(f.run(Command::UpdateScrollBuffer { id: 0x01, update }), Response::byte(0));

        assert_eq!(f.run(Command::DeleteScrollBuffer { id: 0x80 }), Response::byte(1));
        assert_eq!(f.run(Command::DeleteScrollBuffer { id: 0x80 }), Response::byte(0));
        assert_eq!(f.run(Command::CreateScrollBuffer(spec())), Response::byte(0x80));
    }

    #[test]
    fn test_create_errors() {
        let mut f = Fixture::new();
        let mut bad = spec();
        bad.int_h = 0;
        assert_eq!(f.run(Command::CreateScrollBuffer(bad)), Response::byte(0x11));

        for _ in 0..16 {
            f.run(Command::CreateScrollBuffer(spec()));
        }
        assert_eq!(f.run(Command::CreateScrollBuffer(spec())), Response::byte(0x12));
    }

    #[test]
    fn test_destination_selection() {
        let mut f = Fixture::new();
        assert_eq!(f.run(Command::GetDestinationBuffer), Response::byte(0x03));

        assert_eq!(f.run(Command::SetDestinationBuffer { selector: 0x41 }), Response::byte(1));
        assert_eq!(f.run(Command::GetDestinationBuffer), Response::byte(0x41));

        // Unallocated scroll buffer and unknown selectors are rejected
        assert_eq!(f.run(Command::SetDestinationBuffer { selector: 0x80 }), Response::byte(0));
        assert_eq!(f.run(Command::SetDestinationBuffer { selector: 0x00 }), Response::byte(0));
        assert_eq!(f.run(Command::GetDestinationBuffer), Response::byte(0x41));
    }

    #[test]
    fn test_active_destination_cannot_be_deleted() {
        let mut f = Fixture::new();
        f.run(Command::CreateScrollBuffer(spec()));
        assert_eq!(f.run(Command::SetDestinationBuffer { selector: 0x80 }), Response::byte(1));
        assert_eq!(f.run(Command::DeleteScrollBuffer { id: 0x80 }), Response::byte(0));

        f.run(Command::SetDestinationBuffer { selector: 0x03 });
        assert_eq!(f.run(Command::DeleteScrollBuffer { id: 0x80 }), Response::byte(1));
    }

    #[test]
    fn test_mask_flag() {
        let mut f = Fixture::new();
        f.run(Command::SetMaskEnabled(false));
        assert_eq!(f.run(Command::GetMaskEnabled), Response::byte(0));
        assert!(!f.compositor.mask_enabled());
    }
}
