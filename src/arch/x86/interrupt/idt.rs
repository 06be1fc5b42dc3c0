use core::mem::size_of;

use super::super::PrivilegeLevel;
use crate::arch::Cpu;

/// Number of vectors the CPU can deliver.
pub const IDT_ENTRIES: usize = 256;

/// The Interrupt Descriptor Table: one gate per vector, laid out exactly as the CPU reads it.
#[repr(C)]
pub struct Idt {
    entries: [GateDescriptor; IDT_ENTRIES],
}

impl Idt {
    /// A table in which no vector is present.
    pub const fn new() -> Self {
        Self {
            entries: [GateDescriptor::missing(); IDT_ENTRIES],
        }
    }

    /// Writes the gate for `vector`, replacing whatever was there.
    ///
    /// Only call this during boot or with interrupts disabled: the CPU may read the entry at any
    /// moment once the table is loaded.
    pub fn install(&mut self, vector: u8, handler: u32, selector: u16, flags: GateFlags) {
        self.entries[vector as usize].set(handler, selector, flags);
    }

    pub fn entry(&self, vector: u8) -> &GateDescriptor {
        &self.entries[vector as usize]
    }

    /// The descriptor `lidt` expects for this table at its current address.
    pub fn pointer(&self) -> IdtPointer {
        IdtPointer::new(
            (size_of::<Self>() - 1) as u16,
            self as *const _ as usize as u32,
        )
    }

    /// ## Safety: The caller must ensure that `self` is valid, and that it will continue to live
    ///            as long as it is needed (i.e. it may not live on the stack).
    pub unsafe fn load<C: Cpu>(&self, cpu: &C) {
        cpu.load_idt(&self.pointer());
    }
}

/// Represents a pseudo-descriptor to an IDT, that is used in the lidt instruction.
/// In protected mode this is a 16-bit limit followed by a 32-bit linear base, 6 bytes in total.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(C, packed)]
pub struct IdtPointer {
    limit: u16,
    base: u32,
}

impl IdtPointer {
    pub const fn new(limit: u16, base: u32) -> Self {
        Self { limit, base }
    }

    pub fn limit(&self) -> u16 {
        self.limit
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    /// The little-endian operand image of `lidt`/`sidt`.
    pub fn pack(&self) -> [u8; 6] {
        let limit = self.limit.to_le_bytes();
        let base = self.base.to_le_bytes();
        [limit[0], limit[1], base[0], base[1], base[2], base[3]]
    }

    pub fn unpack(bytes: [u8; 6]) -> Self {
        Self {
            limit: u16::from_le_bytes([bytes[0], bytes[1]]),
            base: u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum GateType {
    Task32 = 0x5,
    Interrupt32 = 0xE,
    Trap32 = 0xF,
}

// BitFlags cannot represent the multi-bit gate type field, so this is a plain wrapper.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(transparent)]
pub struct GateFlags(u8);

impl GateFlags {
    pub const fn new() -> GateFlags {
        GateFlags(0)
    }

    /// Present, ring 0, 32-bit interrupt gate (`0x8E`). The CPU clears IF on entry.
    pub const fn interrupt() -> GateFlags {
        GateFlags(0x80 | GateType::Interrupt32 as u8)
    }

    /// Present, ring 0, 32-bit trap gate (`0x8F`). IF is left untouched.
    pub const fn trap() -> GateFlags {
        GateFlags(0x80 | GateType::Trap32 as u8)
    }

    pub const fn from_bits(bits: u8) -> GateFlags {
        GateFlags(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn set_privilege(mut self, ring: PrivilegeLevel) -> Self {
        // clears the current privilege bits
        self.0 &= 0b1001_1111;

        // sets them to the passed in ring
        self.0 |= (ring as u8) << 5;

        self
    }

    pub fn set_type(mut self, gate_type: GateType) -> Self {
        // clears the current type bits
        self.0 &= 0b1111_0000;
        self.0 |= gate_type as u8;

        self
    }

    pub fn set_present(mut self) -> Self {
        self.0 |= 1 << 7;

        self
    }

    pub fn is_present(self) -> bool {
        self.0 & (1 << 7) != 0
    }

    pub fn privilege(self) -> PrivilegeLevel {
        PrivilegeLevel::from_bits((self.0 >> 5) & 0b11)
    }
}

/// Represents an entry into the Interrupt Descriptor Table.
/// The format is specified as:
/// ```text
///    3                   2                   1
///  1 0 9 8 7 6 5 4 3 2 1 0 9 8 7 6 5 4 3 2 1 0 9 8 7 6 5 4 3 2 1 0
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |        Target Selector        |      Target Offset[15:0]      |  +0
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Target Offset[31:16]      |     Flags     |     Zero      |  +4
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(C)]
pub struct GateDescriptor {
    /// Bits 0-15 of the target offset
    offset_low: u16,

    /// Selector in the GDT of the code segment the handler runs in
    selector: u16,

    /// Always 0
    zero: u8,

    /// Gate flags:
    /// ```text
    ///   7                           0
    /// +---+---+---+---+---+---+---+---+
    /// | P |  DPL  | 0 |    GateType   |
    /// +---+---+---+---+---+---+---+---+
    /// ```
    /// A clear P bit makes delivery on this vector fault.
    flags: GateFlags,

    /// Bits 16-31 of the target offset
    offset_high: u16,
}

impl GateDescriptor {
    pub const fn missing() -> Self {
        Self {
            offset_low: 0,
            selector: 0,
            zero: 0,
            flags: GateFlags::new(),
            offset_high: 0,
        }
    }

    pub fn new(handler: u32, selector: u16, flags: GateFlags) -> Self {
        let mut entry = Self::missing();
        entry.set(handler, selector, flags);
        entry
    }

    fn set(&mut self, handler: u32, selector: u16, flags: GateFlags) {
        self.offset_low = handler as u16;
        self.selector = selector;
        self.zero = 0;
        self.flags = flags;
        self.offset_high = (handler >> 16) as u16;
    }

    pub fn offset_low(&self) -> u16 {
        self.offset_low
    }

    pub fn offset_high(&self) -> u16 {
        self.offset_high
    }

    /// The handler address the CPU reconstructs from both offset halves.
    pub fn offset(&self) -> u32 {
        (self.offset_high as u32) << 16 | self.offset_low as u32
    }

    pub fn selector(&self) -> u16 {
        self.selector
    }

    pub fn zero(&self) -> u8 {
        self.zero
    }

    pub fn flags(&self) -> GateFlags {
        self.flags
    }

    pub fn is_present(&self) -> bool {
        self.flags.is_present()
    }

    /// The 8 bytes exactly as they sit in memory.
    pub fn to_bytes(&self) -> [u8; 8] {
        let low = self.offset_low.to_le_bytes();
        let selector = self.selector.to_le_bytes();
        let high = self.offset_high.to_le_bytes();
        [
            low[0],
            low[1],
            selector[0],
            selector[1],
            self.zero,
            self.flags.0,
            high[0],
            high[1],
        ]
    }
}
