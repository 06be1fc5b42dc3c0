//! The PS/2 keyboard, as far as the interrupt core needs it: the IRQ handler moves raw scan codes
//! into a queue, and code running in a task decodes them later.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::arch::PortIo;

const DATA_PORT: u16 = 0x60;

const QUEUE_SIZE: usize = 256;

/// Set on a scan code when the key is released.
const RELEASE: u8 = 0x80;

pub static KEYBOARD: Ps2Keyboard = Ps2Keyboard::new();

/// Single-producer (the IRQ handler), single-consumer (the reading task) ring of scan codes.
/// When full, new scan codes are dropped.
pub struct ScancodeQueue {
    buffer: UnsafeCell<[u8; QUEUE_SIZE]>,
    head: AtomicUsize,
    tail: AtomicUsize,
}

// SAFETY: the producer only writes the slot at `head` before publishing it, and the consumer only
// reads the slot at `tail` after observing it published.
unsafe impl Sync for ScancodeQueue {}

impl ScancodeQueue {
    pub const fn new() -> ScancodeQueue {
        ScancodeQueue {
            buffer: UnsafeCell::new([0; QUEUE_SIZE]),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Returns false if the queue was full and the scan code was dropped.
    pub fn push(&self, scancode: u8) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let next = (head + 1) % QUEUE_SIZE;
        if next == self.tail.load(Ordering::Acquire) {
            return false;
        }

        unsafe { (*self.buffer.get())[head] = scancode };
        self.head.store(next, Ordering::Release);
        true
    }

    pub fn pop(&self) -> Option<u8> {
        let tail = self.tail.load(Ordering::Relaxed);
        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }

        let scancode = unsafe { (*self.buffer.get())[tail] };
        self.tail.store((tail + 1) % QUEUE_SIZE, Ordering::Release);
        Some(scancode)
    }
}

/// Scan code set 1, US layout, unshifted. Index is the make code.
static US_LAYOUT: [u8; 0x3A] = [
    0, 0x1B, b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'0', b'-', b'=', 0x08, b'\t',
    b'q', b'w', b'e', b'r', b't', b'y', b'u', b'i', b'o', b'p', b'[', b']', b'\n', 0, b'a', b's',
    b'd', b'f', b'g', b'h', b'j', b'k', b'l', b';', b'\'', b'`', 0, b'\\', b'z', b'x', b'c', b'v',
    b'b', b'n', b'm', b',', b'.', b'/', 0, b'*', 0, b' ',
];

/// Maps a scan code to a character. Releases and keys without a character map to `None`.
pub fn decode(scancode: u8) -> Option<char> {
    if scancode & RELEASE != 0 {
        return None;
    }

    match US_LAYOUT.get(scancode as usize) {
        Some(&0) | None => None,
        Some(&byte) => Some(byte as char),
    }
}

pub struct Ps2Keyboard {
    queue: ScancodeQueue,
}

impl Ps2Keyboard {
    pub const fn new() -> Ps2Keyboard {
        Ps2Keyboard {
            queue: ScancodeQueue::new(),
        }
    }

    /// Moves the pending scan code from the controller into the queue.
    pub fn receive<P: PortIo>(&self, io: &mut P) {
        // SAFETY: reading the data port consumes the byte the controller raised IRQ1 for.
        let scancode = unsafe { io.read_u8(DATA_PORT) };
        if !self.queue.push(scancode) {
            crate::ktrace!("keyboard: queue full, dropped {:#x}", scancode);
        }
    }

    /// The next decoded character, if one is waiting.
    pub fn try_read_key(&self) -> Option<char> {
        while let Some(scancode) = self.queue.pop() {
            if let Some(key) = decode(scancode) {
                return Some(key);
            }
        }
        None
    }

    /// Blocks until a key is pressed, halting between interrupts.
    #[cfg(target_arch = "x86")]
    pub fn read_key(&self) -> char {
        loop {
            if let Some(key) = self.try_read_key() {
                return key;
            }
            crate::arch::x86::instructions::interrupts::hlt();
        }
    }
}

#[cfg(target_arch = "x86")]
impl crate::dispatch::KeyboardSink for Ps2Keyboard {
    fn handle_interrupt(&self) {
        self.receive(&mut crate::arch::x86::HardwarePorts);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::arch::test::RecordingPorts;

    #[test]
    fn queue_is_fifo() {
        let queue = ScancodeQueue::new();
        assert_eq!(queue.pop(), None);

        for code in 1..=10 {
            assert!(queue.push(code));
        }
        for code in 1..=10 {
            assert_eq!(queue.pop(), Some(code));
        }
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn full_queue_drops_new_codes() {
        let queue = ScancodeQueue::new();
        for code in 0..QUEUE_SIZE - 1 {
            assert!(queue.push(code as u8));
        }
        assert!(!queue.push(0xFF));

        assert_eq!(queue.pop(), Some(0));
        assert!(queue.push(0xFF));
    }

    #[test]
    fn decodes_make_codes_only() {
        assert_eq!(decode(0x23), Some('h'));
        assert_eq!(decode(0x1C), Some('\n'));
        assert_eq!(decode(0x39), Some(' '));
        assert_eq!(decode(0x23 | RELEASE), None);
        assert_eq!(decode(0x2A), None); // left shift
        assert_eq!(decode(0x58), None); // F12, outside the table
    }

    #[test]
    fn interrupt_data_becomes_keys() {
        let keyboard = Ps2Keyboard::new();
        // "hi": press h, release h, press i
        let mut ports = RecordingPorts::with_reads(&[0x23, 0xA3, 0x17]);
        for _ in 0..3 {
            keyboard.receive(&mut ports);
        }

        assert_eq!(keyboard.try_read_key(), Some('h'));
        assert_eq!(keyboard.try_read_key(), Some('i'));
        assert_eq!(keyboard.try_read_key(), None);
    }
}
