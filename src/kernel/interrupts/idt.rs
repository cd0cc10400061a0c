/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: idt                                                             ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: Interrupt descriptor table for 32-bit protected mode.           ║
   ║                                                                         ║
   ║         The table is described with plain 'Gate' values in an           ║
   ║         'IdtBuilder'. 'build' consumes the builder and encodes every    ║
   ║         gate into the 8 byte format of the processor, the resulting     ║
   ║         'Idt' can no longer be changed.                                 ║
   ║                                                                         ║
   ║         Gate layout (8 bytes):                                          ║
   ║            base_lo   bits 0..15 of the handler address                  ║
   ║            selector  code segment of the handler                        ║
   ║            always0   reserved                                           ║
   ║            flags     present | dpl | gate type                          ║
   ║            base_hi   bits 16..31 of the handler address                 ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/

use core::mem::size_of;
use x86::dtables::DescriptorTablePointer;

use crate::consts::{KERNEL_CODE_SELECTOR, MAX_VEC_NUM};

// Type and attribute byte of a gate
bitflags::bitflags! {
    pub struct GateFlags: u8 {
        const INTERRUPT_GATE_32 = 0x0e;
        const TRAP_GATE_32 = 0x0f;
        const DPL_RING3 = 0b11 << 5;
        const PRESENT = 1 << 7;

        // present, ring 0, 32-bit interrupt gate
        const KERNEL_INTERRUPT = Self::PRESENT.bits | Self::INTERRUPT_GATE_32.bits;
    }
}

/**
 Description:
    One vector of the table as the rest of the kernel sees it. A gate with
    `handler` 0 and empty flags is not present, the cpu raises a fault if
    such a vector is ever triggered.
*/
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Gate {
    pub handler: u32,
    pub selector: u16,
    pub flags: GateFlags,
}

impl Gate {
    pub const fn missing() -> Self {
        Gate {
            handler: 0,
            selector: KERNEL_CODE_SELECTOR,
            flags: GateFlags::empty(),
        }
    }

    pub fn is_present(&self) -> bool {
        self.flags.contains(GateFlags::PRESENT)
    }
}

// One entry of the IDT in the format the cpu expects
#[repr(C, packed)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IdtEntry {
    base_lo: u16,
    selector: u16,
    always0: u8,
    flags: u8,
    base_hi: u16,
}

const _: () = assert!(size_of::<IdtEntry>() == 8);

impl IdtEntry {
    /**
     Description: The only place where a gate is turned into its binary form
    */
    pub const fn encode(gate: &Gate) -> Self {
        IdtEntry {
            base_lo: (gate.handler & 0xffff) as u16,
            selector: gate.selector,
            always0: 0,
            flags: gate.flags.bits(),
            base_hi: ((gate.handler >> 16) & 0xffff) as u16,
        }
    }

    pub fn decode(&self) -> Gate {
        let (lo, hi) = (self.base_lo, self.base_hi);
        Gate {
            handler: (hi as u32) << 16 | lo as u32,
            selector: self.selector,
            flags: GateFlags::from_bits_truncate(self.flags),
        }
    }

    pub fn to_bytes(&self) -> [u8; 8] {
        let (lo, sel, hi) = (self.base_lo, self.selector, self.base_hi);
        let lo = lo.to_le_bytes();
        let sel = sel.to_le_bytes();
        let hi = hi.to_le_bytes();
        [lo[0], lo[1], sel[0], sel[1], self.always0, self.flags, hi[0], hi[1]]
    }
}

/**
 Description:
    Collects the gates of all 256 vectors. Every vector starts as a
    missing gate.
*/
#[derive(Clone)]
pub struct IdtBuilder {
    gates: [Gate; MAX_VEC_NUM],
}

impl IdtBuilder {
    pub const fn new() -> Self {
        IdtBuilder {
            gates: [Gate::missing(); MAX_VEC_NUM],
        }
    }

    /**
     Description: Set the gate of one vector

     Parameters: \
       `vector` vector number, 0-255 \
       `handler` address of the trampoline \
       `selector` code segment of the trampoline \
       `flags` type and attributes
    */
    pub fn install_vector(
        &mut self,
        vector: u8,
        handler: u32,
        selector: u16,
        flags: GateFlags,
    ) -> &mut Self {
        self.gates[vector as usize] = Gate {
            handler,
            selector,
            flags,
        };
        self
    }

    /**
     Description: Install kernel interrupt gates for all `(vector, address)` pairs
    */
    pub fn install_all(&mut self, entry_points: &[(u8, u32)]) -> &mut Self {
        for &(vector, handler) in entry_points {
            self.install_vector(
                vector,
                handler,
                KERNEL_CODE_SELECTOR,
                GateFlags::KERNEL_INTERRUPT,
            );
        }
        self
    }

    pub fn gate(&self, vector: u8) -> Gate {
        self.gates[vector as usize]
    }

    pub fn build(self) -> Idt {
        let mut entries = [IdtEntry::encode(&Gate::missing()); MAX_VEC_NUM];
        for (entry, gate) in entries.iter_mut().zip(self.gates.iter()) {
            *entry = IdtEntry::encode(gate);
        }
        Idt { entries }
    }
}

// The encoded table handed to the cpu
#[repr(C, align(8))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Idt {
    entries: [IdtEntry; MAX_VEC_NUM],
}

impl Idt {
    pub fn gate(&self, vector: u8) -> Gate {
        self.entries[vector as usize].decode()
    }

    pub fn entry(&self, vector: u8) -> &IdtEntry {
        &self.entries[vector as usize]
    }

    pub fn pointer(&self) -> DescriptorTablePointer<IdtEntry> {
        DescriptorTablePointer::new_from_slice(&self.entries)
    }

    /**
     Description:
        Make the cpu use this table. Requires a `'static` table since the
        cpu keeps using it until reset.
    */
    pub fn load(&'static self) {
        let ie = crate::kernel::cpu::disable_int_nested();
        unsafe {
            crate::kernel::cpu::load_idt(&self.pointer());
        }
        crate::kernel::cpu::enable_int_nested(ie);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_interrupt_flags_are_0x8e() {
        assert_eq!(GateFlags::KERNEL_INTERRUPT.bits(), 0x8e);
    }

    #[test]
    fn entry_encoding_splits_address() {
        let gate = Gate {
            handler: 0x0010_2a40,
            selector: 0x08,
            flags: GateFlags::KERNEL_INTERRUPT,
        };

        let entry = IdtEntry::encode(&gate);

        assert_eq!(
            entry.to_bytes(),
            [0x40, 0x2a, 0x08, 0x00, 0x00, 0x8e, 0x10, 0x00]
        );
        assert_eq!(entry.decode(), gate);
    }

    #[test]
    fn new_table_has_no_present_gate() {
        let idt = IdtBuilder::new().build();

        for vector in 0..=255u8 {
            let gate = idt.gate(vector);
            assert_eq!(gate.handler, 0);
            assert!(gate.flags.is_empty());
            assert_eq!(idt.entry(vector).to_bytes()[4], 0);
        }
    }

    #[test]
    fn installed_vector_reads_back() {
        let mut builder = IdtBuilder::new();
        let user_trap = GateFlags::PRESENT | GateFlags::TRAP_GATE_32 | GateFlags::DPL_RING3;
        builder.install_vector(0x80, 0xdead_beef, 0x18, user_trap);

        let idt = builder.build();

        let gate = idt.gate(0x80);
        assert_eq!(gate.handler, 0xdead_beef);
        assert_eq!(gate.selector, 0x18);
        assert_eq!(gate.flags.bits(), 0xef);
        assert!(!idt.gate(0x7f).is_present());
    }

    #[test]
    fn later_install_wins() {
        let mut builder = IdtBuilder::new();
        builder
            .install_vector(3, 0x1000, 0x08, GateFlags::KERNEL_INTERRUPT)
            .install_vector(3, 0x2000, 0x08, GateFlags::KERNEL_INTERRUPT);

        assert_eq!(builder.gate(3).handler, 0x2000);
    }

    #[test]
    fn pointer_covers_whole_table() {
        let idt = IdtBuilder::new().build();

        let pointer = idt.pointer();
        let limit = pointer.limit;

        assert_eq!(limit as usize, 256 * 8 - 1);
    }
}
