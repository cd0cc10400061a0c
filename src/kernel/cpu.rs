/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: cpu                                                             ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: The privileged cpu primitives: port I/O, the interrupt enable   ║
   ║         flag, loading the IDT and halting. Nothing else in the kernel   ║
   ║         executes these instructions directly. Each primitive has no     ║
   ║         software visible failure mode.                                  ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/

use core::arch::asm;
use x86::dtables::DescriptorTablePointer;

// IF bit in EFLAGS
const EFLAGS_IF: usize = 1 << 9;

/**
 Description:
    Byte wide access to the I/O address space. Device code (PIC, PIT,
    keyboard) only talks to hardware through this trait, so it can be
    driven by a recording fake in the unit tests.
*/
pub trait PortIo {
    /**
     Description: Write one byte to a port

     Parameters: \
       `port` port address, 16 bit \
       `value` data to be written, 8 bit
    */
    fn write_port(&mut self, port: u16, value: u8);

    /**
     Description: Read one byte from a port

     Parameters: \
       `port` port address, 16 bit
    */
    fn read_port(&mut self, port: u16) -> u8;
}

/**
 Description:
    The real I/O address space, using `in`/`out`.
*/
#[derive(Copy, Clone, Default)]
pub struct HardwarePorts;

impl PortIo for HardwarePorts {
    #[inline]
    fn write_port(&mut self, port: u16, value: u8) {
        outb(port, value);
    }

    #[inline]
    fn read_port(&mut self, port: u16) -> u8 {
        inb(port)
    }
}

/**
 Description:
    Write one byte to a port. Precondition: the caller knows what the
    device behind `port` does with `data`.
*/
#[inline]
pub fn outb(port: u16, data: u8) {
    unsafe {
        x86::io::outb(port, data);
    }
}

/**
 Description: Read one byte from a port
*/
#[inline]
pub fn inb(port: u16) -> u8 {
    unsafe { x86::io::inb(port) }
}

/**
 Description: Check if IF bit is set in EFLAGS \

 Return: \
   `true` if IF is set, `false` otherwise
*/
#[cfg(not(test))]
#[inline]
pub fn is_int_enabled() -> bool {
    (getflags() & EFLAGS_IF) != 0
}

// unit tests run in user mode on the host, 'cli'/'sti' would fault there
#[cfg(test)]
static HOST_IF: core::sync::atomic::AtomicBool = core::sync::atomic::AtomicBool::new(false);

#[cfg(test)]
pub fn is_int_enabled() -> bool {
    HOST_IF.load(core::sync::atomic::Ordering::SeqCst)
}

/**
 Description: return EFLAGS
*/
#[cfg(target_arch = "x86")]
#[inline]
pub fn getflags() -> usize {
    let eflags: usize;
    unsafe {
        asm!("pushfd; pop {}", out(reg) eflags, options(nomem, preserves_flags));
    }
    eflags
}

#[cfg(target_arch = "x86_64")]
#[inline]
pub fn getflags() -> usize {
    let rflags: usize;
    unsafe {
        asm!("pushfq; pop {}", out(reg) rflags, options(nomem, preserves_flags));
    }
    rflags
}

/**
 Description: clear IF bit in EFLAGS \

 Return: \
   `true` if IF was set already, `false` otherwise
*/
#[inline]
pub fn disable_int_nested() -> bool {
    let was_enabled = is_int_enabled();
    disable_int();
    was_enabled
}

/**
 Description: set IF bit in EFLAGS only iff `was_enabled`
   is `true` otherwise do nothing.
*/
#[inline]
pub fn enable_int_nested(was_enabled: bool) {
    if was_enabled {
        enable_int();
    }
}

/**
 Description: set IF bit in EFLAGS. Must be called exactly once, after
   all handlers are registered.
*/
#[cfg(not(test))]
#[inline]
pub fn enable_int() {
    unsafe { x86::irq::enable() }
}

#[cfg(test)]
pub fn enable_int() {
    HOST_IF.store(true, core::sync::atomic::Ordering::SeqCst);
}

/**
 Description: clear IF bit in EFLAGS
*/
#[cfg(not(test))]
#[inline]
pub fn disable_int() {
    unsafe { x86::irq::disable() }
}

#[cfg(test)]
pub fn disable_int() {
    HOST_IF.store(false, core::sync::atomic::Ordering::SeqCst);
}

/**
 Description:
    Load the interrupt descriptor table register. From now on the
    processor consults the table behind `pointer` for every vector.

 Safety: \
    The table must stay valid and unchanged for the lifetime of the
    system, and interrupts must be disabled while loading it.
*/
#[inline]
pub unsafe fn load_idt<T>(pointer: &DescriptorTablePointer<T>) {
    x86::dtables::lidt(pointer);
}

/**
 Description: stop CPU, will be waked up by next interrupt
*/
#[inline]
pub fn halt() -> ! {
    loop {
        unsafe { x86::halt() }
    }
}

/**
 Description: stop CPU for good
*/
pub fn halt_forever() -> ! {
    disable_int();
    halt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_disable_restores_previous_state() {
        disable_int();

        let outer = disable_int_nested();
        let inner = disable_int_nested();
        assert!(!outer);
        assert!(!inner);
        enable_int_nested(inner);
        assert!(!is_int_enabled());
        enable_int_nested(outer);
        assert!(!is_int_enabled());
    }
}
