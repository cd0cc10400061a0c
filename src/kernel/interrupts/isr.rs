/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: isr                                                             ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: Definition of the interface for an Interrupt Service Routine.   ║
   ║         Must be implemented by a device driver if it needs to handle    ║
   ║         interrupts. The ISR is registered using 'register' in           ║
   ║         'int_dispatcher.rs'.                                            ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/

use crate::kernel::interrupts::context::InterruptContext;

// Definition of Interrupt Service Routine
pub trait ISR: Sync {
    /**
     Description:
        Called from the dispatcher with interrupts disabled. For IRQ vectors
        the PIC has already been acknowledged. `ctx` may be modified, it is
        what the trampoline restores. The fault code of an exception is in
        `ctx.error_code`, interpreting it is up to the ISR.
    */
    fn trigger(&self, ctx: &mut InterruptContext);
}
