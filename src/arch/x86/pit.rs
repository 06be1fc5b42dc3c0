//! Channel 0 of the 8253/8254 Programmable Interval Timer, wired to IRQ0.

use crate::arch::PortIo;

const CHANNEL_0: u16 = 0x40;
const COMMAND: u16 = 0x43;

/// Channel 0, lobyte/hibyte access, mode 3 (square wave), binary counting.
const SQUARE_WAVE_CHANNEL_0: u8 = 0x36;

pub const BASE_FREQUENCY_HZ: u32 = 1_193_182;

/// Reload value that makes the PIT fire `hz` times a second, as close as 16 bits allow.
pub fn divisor(hz: u32) -> u16 {
    let divisor = BASE_FREQUENCY_HZ / hz.max(1);
    divisor.max(1).min(u16::MAX as u32) as u16
}

pub struct Pit<P: PortIo> {
    io: P,
}

impl<P: PortIo> Pit<P> {
    pub fn new(io: P) -> Pit<P> {
        Pit { io }
    }

    pub fn set_frequency(&mut self, hz: u32) {
        let [low, high] = divisor(hz).to_le_bytes();

        // SAFETY: reprogramming channel 0 only changes the IRQ0 rate.
        unsafe {
            self.io.write_u8(COMMAND, SQUARE_WAVE_CHANNEL_0);
            self.io.write_u8(CHANNEL_0, low);
            self.io.write_u8(CHANNEL_0, high);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::arch::test::RecordingPorts;

    #[test]
    fn divisor_is_clamped() {
        assert_eq!(divisor(100), 11931);
        assert_eq!(divisor(0), u16::MAX);
        assert_eq!(divisor(1), u16::MAX);
        assert_eq!(divisor(BASE_FREQUENCY_HZ * 2), 1);
    }

    #[test]
    fn programs_channel_0() {
        let mut pit = Pit::new(RecordingPorts::new());
        pit.set_frequency(100);
        assert_eq!(
            pit.io.writes(),
            &[(COMMAND, 0x36), (CHANNEL_0, 0x9B), (CHANNEL_0, 0x2E)]
        );
    }
}
