pub mod context;
pub mod idt;
pub mod int_dispatcher;
pub mod isr;
pub mod pic;
#[cfg(target_arch = "x86")]
pub mod trampolines;

use spin::Once;

use crate::kernel::cpu::HardwarePorts;
use idt::{Idt, IdtBuilder};
use pic::PICS;

static IDT: Once<Idt> = Once::new();

/**
 Description:
    The table for the given trampolines. All other vectors stay missing.
*/
pub fn build_idt(entry_points: &[(u8, u32)]) -> Idt {
    let mut builder = IdtBuilder::new();
    builder.install_all(entry_points);
    builder.build()
}

/**
 Description:
    Init everything related to interrupt handling: empty the ISR map,
    remap the PICs, build and load the IDT. Must run with interrupts
    disabled, which is the case right after boot. A second call finds the
    table already loaded and leaves it alone.
*/
#[cfg(target_arch = "x86")]
pub fn init() {
    kprintln!("interrupts::init");

    int_dispatcher::init();
    PICS.remap(&mut HardwarePorts);

    let mut loaded_now = false;
    let idt: &'static Idt = IDT.call_once(|| {
        loaded_now = true;
        build_idt(&trampolines::entry_points())
    });
    if loaded_now {
        idt.load();
        kprintln!(
            "interrupts: IDT loaded, {} vectors wired",
            trampolines::TRAMPOLINE_COUNT
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::KERNEL_CODE_SELECTOR;
    use idt::GateFlags;
    use std::vec::Vec;

    // what the trampoline table looks like, with made up addresses
    fn fake_entry_points() -> Vec<(u8, u32)> {
        (0..20u8)
            .chain(32..48)
            .map(|vector| (vector, 0x0010_0000 + vector as u32 * 0x10))
            .collect()
    }

    #[test]
    fn wired_vectors_point_to_their_trampoline() {
        let points = fake_entry_points();

        let idt = build_idt(&points);

        for &(vector, address) in &points {
            let gate = idt.gate(vector);
            assert_eq!(gate.handler, address, "vector {}", vector);
            assert_eq!(gate.selector, KERNEL_CODE_SELECTOR);
            assert_eq!(gate.flags, GateFlags::KERNEL_INTERRUPT);
        }
    }

    #[test]
    fn unwired_vectors_stay_missing() {
        let idt = build_idt(&fake_entry_points());

        for vector in (20..32u8).chain(48..=255) {
            let gate = idt.gate(vector);
            assert_eq!(gate.handler, 0, "vector {}", vector);
            assert!(gate.flags.is_empty(), "vector {}", vector);
        }
    }

    #[test]
    fn building_twice_gives_the_same_table() {
        let points = fake_entry_points();

        assert_eq!(build_idt(&points), build_idt(&points));
    }
}
