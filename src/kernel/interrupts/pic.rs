/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: pic                                                             ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: The two cascaded 8259 PICs. After power-on their vectors        ║
   ║         overlap the cpu exceptions (0-31), so they have to be remapped  ║
   ║         with 'remap' before interrupts are enabled. Every serviced IRQ  ║
   ║         must be acknowledged with 'end_of_interrupt', otherwise the line║
   ║         and all lower priority lines of that PIC stay blocked.          ║
   ║                                                                         ║
   ║         The PIC also allows to enable or disable single IRQs. Even then,║
   ║         the interrupt routine is only activated if the IF bit in EFLAGS ║
   ║         is set, see 'cpu.rs'.                                           ║
   ║                                                                         ║
   ║         Nothing written here is ever read back or verified.             ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/
use crate::consts::{PIC_LINES, PIC_MASTER_OFFSET, PIC_SLAVE_OFFSET};
use crate::kernel::cpu::PortIo;

// IRQ-Nummern von Geraeten
pub const IRQ_TIMER: u8 = 0; // Programmable Interrupt Timer (PIT)
pub const IRQ_KEYBOARD: u8 = 1; // Tastatur
pub const IRQ_CASCADE: u8 = 2; // Slave PIC
pub const IRQ_RTC: u8 = 8;
pub const IRQ_MOUSE: u8 = 12;

pub const PIC_MASTER_CMD: u16 = 0x20;
pub const PIC_MASTER_DATA: u16 = 0x21; // interrupt mask register von PIC 1
pub const PIC_SLAVE_CMD: u16 = 0xa0;
pub const PIC_SLAVE_DATA: u16 = 0xa1; // interrupt mask register von PIC 2

// Initialization command words
const ICW1_INIT: u8 = 0x11; // edge triggered, cascade, ICW4 follows
const ICW3_MASTER: u8 = 1 << IRQ_CASCADE; // slave sits on IRQ2
const ICW3_SLAVE: u8 = IRQ_CASCADE; // cascade identity of the slave
const ICW4_8086: u8 = 0x01;

const CMD_EOI: u8 = 0x20;

// IRQ0 .. IRQ15
const IRQ_LINES: u8 = 2 * PIC_LINES;

/**
 Description:
    Vector layout of the chained PICs. Holds no hardware state, all
    operations go through the `PortIo` they are given.
*/
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChainedPics {
    master_offset: u8,
    slave_offset: u8,
}

// Layout used by the kernel, IRQ0-7 -> 32-39, IRQ8-15 -> 40-47
pub const PICS: ChainedPics = ChainedPics::new(PIC_MASTER_OFFSET, PIC_SLAVE_OFFSET);

impl ChainedPics {
    pub const fn new(master_offset: u8, slave_offset: u8) -> Self {
        ChainedPics {
            master_offset,
            slave_offset,
        }
    }

    /**
     Description:
        Reprogram both PICs with the four initialization command words and
        unmask all lines afterwards.

     Parameters: \
       `ports` I/O address space
    */
    pub fn remap<P: PortIo>(&self, ports: &mut P) {
        kprintln!(
            "pic: remap master -> {}, slave -> {}",
            self.master_offset,
            self.slave_offset
        );

        // ICW1: start initialization sequence
        ports.write_port(PIC_MASTER_CMD, ICW1_INIT);
        ports.write_port(PIC_SLAVE_CMD, ICW1_INIT);

        // ICW2: vector offsets
        ports.write_port(PIC_MASTER_DATA, self.master_offset);
        ports.write_port(PIC_SLAVE_DATA, self.slave_offset);

        // ICW3: master has a slave at IRQ2, slave gets its cascade identity
        ports.write_port(PIC_MASTER_DATA, ICW3_MASTER);
        ports.write_port(PIC_SLAVE_DATA, ICW3_SLAVE);

        // ICW4: 8086 mode
        ports.write_port(PIC_MASTER_DATA, ICW4_8086);
        ports.write_port(PIC_SLAVE_DATA, ICW4_8086);

        // Enable all IRQs
        ports.write_port(PIC_MASTER_DATA, 0x00);
        ports.write_port(PIC_SLAVE_DATA, 0x00);
    }

    fn is_master_vector(&self, vector: u8) -> bool {
        vector >= self.master_offset && vector < self.master_offset.saturating_add(PIC_LINES)
    }

    fn is_slave_vector(&self, vector: u8) -> bool {
        vector >= self.slave_offset && vector < self.slave_offset.saturating_add(PIC_LINES)
    }

    /**
     Description: `true` if `vector` is raised by one of the two PICs
    */
    pub fn handles_vector(&self, vector: u8) -> bool {
        self.is_master_vector(vector) || self.is_slave_vector(vector)
    }

    /**
     Description: Vector on which `irq` arrives, `None` for lines above 15
    */
    pub fn vector_of(&self, irq: u8) -> Option<u8> {
        if irq < PIC_LINES {
            Some(self.master_offset + irq)
        } else if irq < IRQ_LINES {
            Some(self.slave_offset + (irq - PIC_LINES))
        } else {
            None
        }
    }

    /**
     Description:
        Acknowledge `vector`. Slave owned vectors are acknowledged at the
        slave first, the master is always acknowledged since the slave is
        cascaded through it. Vectors not owned by a PIC are left alone.

     Return: \
       `true` if an EOI was sent
    */
    pub fn end_of_interrupt<P: PortIo>(&self, ports: &mut P, vector: u8) -> bool {
        if !self.handles_vector(vector) {
            return false;
        }
        if self.is_slave_vector(vector) {
            ports.write_port(PIC_SLAVE_CMD, CMD_EOI);
        }
        ports.write_port(PIC_MASTER_CMD, CMD_EOI);
        true
    }
}

/**
 Description:
    Enables an IRQ to be to be forwarded to the processor by the PIC.
    To enable interrupt handling, additionally call `cpu::enable_int()`

 Parameters: \
   `irq` irq to be enabled
*/
pub fn allow<P: PortIo>(ports: &mut P, irq: u8) {
    if let Some((port, bit)) = mask_bit(irq) {
        let mask = ports.read_port(port);
        ports.write_port(port, mask & !bit);
    }
}

/**
 Description:
    Disables an IRQ to be to be forwarded to the processor by the PIC.

 Parameters: \
   `irq` irq to be disabled
*/
pub fn forbid<P: PortIo>(ports: &mut P, irq: u8) {
    if let Some((port, bit)) = mask_bit(irq) {
        let mask = ports.read_port(port);
        ports.write_port(port, mask | bit);
    }
}

/**
 Description:
    Returns the state (enabled/disabled) in the PIC for the given `irq`

 Return: \
   `true` irq is disabled or does not exist \
   `false` irq is enabled
*/
pub fn is_masked<P: PortIo>(ports: &mut P, irq: u8) -> bool {
    match mask_bit(irq) {
        Some((port, bit)) => (ports.read_port(port) & bit) != 0,
        None => true,
    }
}

// Mask register and bit of `irq`
fn mask_bit(irq: u8) -> Option<(u16, u8)> {
    if irq < PIC_LINES {
        Some((PIC_MASTER_DATA, 1 << irq))
    } else if irq < IRQ_LINES {
        Some((PIC_SLAVE_DATA, 1 << (irq - PIC_LINES)))
    } else {
        None
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::vec::Vec;

    /**
     Description:
        Fake I/O space. Records every write, reads return the last value
        written to the port or a scripted value.
    */
    #[derive(Default)]
    pub struct RecordingPorts {
        pub writes: Vec<(u16, u8)>,
        pub reads: Vec<u16>,
        pub values: HashMap<u16, u8>,
    }

    impl RecordingPorts {
        pub fn with_value(port: u16, value: u8) -> Self {
            let mut ports = RecordingPorts::default();
            ports.values.insert(port, value);
            ports
        }

        pub fn writes_to(&self, port: u16) -> usize {
            self.writes.iter().filter(|(p, _)| *p == port).count()
        }
    }

    impl PortIo for RecordingPorts {
        fn write_port(&mut self, port: u16, value: u8) {
            self.writes.push((port, value));
            self.values.insert(port, value);
        }

        fn read_port(&mut self, port: u16) -> u8 {
            self.reads.push(port);
            *self.values.get(&port).unwrap_or(&0)
        }
    }

    #[test]
    fn remap_issues_icw_sequence_in_order() {
        let mut ports = RecordingPorts::default();

        ChainedPics::new(32, 40).remap(&mut ports);

        assert_eq!(
            ports.writes,
            vec![
                (0x20, 0x11),
                (0xa0, 0x11),
                (0x21, 32),
                (0xa1, 40),
                (0x21, 4),
                (0xa1, 2),
                (0x21, 1),
                (0xa1, 1),
                (0x21, 0),
                (0xa1, 0),
            ]
        );
        assert!(ports.reads.is_empty());
    }

    #[test]
    fn remap_uses_given_offsets() {
        let mut ports = RecordingPorts::default();

        ChainedPics::new(0x50, 0x70).remap(&mut ports);

        assert_eq!(ports.writes[2], (PIC_MASTER_DATA, 0x50));
        assert_eq!(ports.writes[3], (PIC_SLAVE_DATA, 0x70));
    }

    #[test]
    fn eoi_for_master_line_goes_to_master_only() {
        for vector in 32..40 {
            let mut ports = RecordingPorts::default();

            assert!(PICS.end_of_interrupt(&mut ports, vector));
            assert_eq!(ports.writes, vec![(PIC_MASTER_CMD, 0x20)]);
        }
    }

    #[test]
    fn eoi_for_slave_line_goes_to_slave_then_master() {
        for vector in 40..48 {
            let mut ports = RecordingPorts::default();

            assert!(PICS.end_of_interrupt(&mut ports, vector));
            assert_eq!(
                ports.writes,
                vec![(PIC_SLAVE_CMD, 0x20), (PIC_MASTER_CMD, 0x20)]
            );
        }
    }

    #[test]
    fn no_eoi_outside_irq_range() {
        for vector in (0..32).chain(48..=255) {
            let mut ports = RecordingPorts::default();

            assert!(!PICS.end_of_interrupt(&mut ports, vector));
            assert!(ports.writes.is_empty());
        }
    }

    #[test]
    fn vector_of_irq() {
        assert_eq!(PICS.vector_of(IRQ_TIMER), Some(32));
        assert_eq!(PICS.vector_of(IRQ_KEYBOARD), Some(33));
        assert_eq!(PICS.vector_of(IRQ_RTC), Some(40));
        assert_eq!(PICS.vector_of(15), Some(47));
    }

    #[test]
    fn lines_above_15_do_not_exist() {
        let mut ports = RecordingPorts::default();

        assert_eq!(PICS.vector_of(16), None);
        assert_eq!(PICS.vector_of(255), None);

        allow(&mut ports, 16);
        forbid(&mut ports, 255);

        assert!(is_masked(&mut ports, 24));
        assert!(ports.writes.is_empty());
        assert!(ports.reads.is_empty());
    }

    #[test]
    fn allow_and_forbid_touch_only_their_bit() {
        let mut ports = RecordingPorts::with_value(PIC_MASTER_DATA, 0xff);

        allow(&mut ports, IRQ_KEYBOARD);
        assert_eq!(ports.values[&PIC_MASTER_DATA], 0xfd);
        assert!(!is_masked(&mut ports, IRQ_KEYBOARD));
        assert!(is_masked(&mut ports, IRQ_TIMER));

        forbid(&mut ports, IRQ_KEYBOARD);
        assert_eq!(ports.values[&PIC_MASTER_DATA], 0xff);
    }

    #[test]
    fn slave_irqs_use_slave_mask_register() {
        let mut ports = RecordingPorts::default();

        forbid(&mut ports, IRQ_MOUSE);

        assert_eq!(ports.writes, vec![(PIC_SLAVE_DATA, 1 << 4)]);
        assert!(is_masked(&mut ports, IRQ_MOUSE));
        assert_eq!(ports.writes_to(PIC_MASTER_DATA), 0);
    }
}
