/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: int_dispatcher                                                  ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: Interrupt dispatching in Rust. The main function is 'int_disp'  ║
   ║         which is called for any interrupt and calls a registered ISR    ║
   ║         of device driver, e.g. the keyboard.                            ║
   ║                                                                         ║
   ║         'int_disp' is called from 'trampolines.rs' where all the x86    ║
   ║         low-level stuff is handled.                                     ║
   ║                                                                         ║
   ║         ISRs are registered before interrupts are enabled. Afterwards   ║
   ║         the map is only read, from interrupt context.                   ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/

use core::fmt;
use core::fmt::Write;
use spin::Mutex;

use crate::consts::MAX_VEC_NUM;
use crate::devices::cga_print;
use crate::kernel::cpu;
use crate::kernel::cpu::{HardwarePorts, PortIo};
use crate::kernel::interrupts::context::InterruptContext;
use crate::kernel::interrupts::isr;
use crate::kernel::interrupts::pic::{ChainedPics, PICS};

// Vektor-Nummern der Ausnahmen
pub const INT_VEC_DIVIDE_ERROR: u8 = 0;
pub const INT_VEC_DEBUG: u8 = 1;
pub const INT_VEC_NMI: u8 = 2;
pub const INT_VEC_BREAKPOINT: u8 = 3;
pub const INT_VEC_OVERFLOW: u8 = 4;
pub const INT_VEC_BOUND_RANGE: u8 = 5;
pub const INT_VEC_INVALID_OPCODE: u8 = 6;
pub const INT_VEC_DEVICE_NOT_AVAILABLE: u8 = 7;
pub const INT_VEC_DOUBLE_FAULT: u8 = 8; // fault code
pub const INT_VEC_COPROCESSOR_SEGMENT: u8 = 9;
pub const INT_VEC_INVALID_TSS: u8 = 10; // fault code
pub const INT_VEC_SEGMENT_NOT_PRESENT: u8 = 11; // fault code
pub const INT_VEC_STACK_FAULT: u8 = 12; // fault code
pub const INT_VEC_GENERAL_PROTECTION: u8 = 13; // fault code
pub const INT_VEC_PAGE_FAULT: u8 = 14; // fault code
pub const INT_VEC_RESERVED: u8 = 15;
pub const INT_VEC_X87_FLOATING_POINT: u8 = 16;
pub const INT_VEC_ALIGNMENT_CHECK: u8 = 17; // fault code
pub const INT_VEC_MACHINE_CHECK: u8 = 18;
pub const INT_VEC_SIMD_FLOATING_POINT: u8 = 19;

// Vektor-Nummern der Geraete, IRQ0 .. IRQ15 -> 32 .. 47
pub const INT_VEC_TIMER: u8 = 32;
pub const INT_VEC_KEYBOARD: u8 = 33;
pub const INT_VEC_RTC: u8 = 40;
pub const INT_VEC_IRQ_LAST: u8 = 47;

/**
 Description:
    This function is the main interrupt dispatcher in Rust.
    It is called from `int_common` in `trampolines.rs`

 Parameters: \
   `ctx` context saved by the trampoline on the interrupted stack
*/
#[no_mangle]
pub extern "C" fn int_disp(ctx: *mut InterruptContext) {
    // the trampoline always passes its own stack frame
    let ctx = unsafe { &mut *ctx };

    // Only held for the lookup, so an ISR may register another ISR.
    // If an exception hits 'register' while it holds the lock, the vector
    // is treated as unhandled.
    let isr = INT_VECTORS
        .try_lock()
        .and_then(|vectors| vectors.lookup(ctx.vector()));

    dispatch(
        isr,
        &PICS,
        &mut HardwarePorts,
        &mut cga_print::InterruptWriter,
        ctx,
    );
}

// What happened to an interrupt
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Dispatched {
    Handled,
    Unhandled,
}

/**
 Description:
    Handle one interrupt:
    1. IRQ vectors are acknowledged at the PIC(s) first
    2. a registered ISR is called with the context
    3. otherwise "Unhandled interrupt: 0x.." is written to `diag`
    The interrupt enable flag is never touched.

 Parameters: \
   `isr` ISR registered for `ctx.vector`, if any \
   `pics` vector layout of the PICs \
   `ports` used for the EOI \
   `diag` diagnostic output \
   `ctx` context of the interrupted code
*/
pub fn dispatch<P: PortIo, W: fmt::Write>(
    isr: Option<&dyn isr::ISR>,
    pics: &ChainedPics,
    ports: &mut P,
    diag: &mut W,
    ctx: &mut InterruptContext,
) -> Dispatched {
    let vector = ctx.vector();

    pics.end_of_interrupt(ports, vector);

    match isr {
        Some(isr) => {
            isr.trigger(ctx);
            Dispatched::Handled
        }
        None => {
            // nobody to report a failed screen write to
            let _ = writeln!(diag, "Unhandled interrupt: {:#x}", vector);
            Dispatched::Unhandled
        }
    }
}

static INT_VECTORS: Mutex<IntVectors> = Mutex::new(IntVectors::new());

/**
 Description:
    Interrupt vector map, at most one ISR for each of the 256 vectors.
*/
pub struct IntVectors {
    map: [Option<&'static dyn isr::ISR>; MAX_VEC_NUM],
}

impl IntVectors {
    pub const fn new() -> Self {
        IntVectors {
            map: [None; MAX_VEC_NUM],
        }
    }

    /**
     Description:
        Put `isr` into the slot of `vector`. An ISR already in that slot is
        replaced.

     Return: \
        the replaced ISR
    */
    pub fn register(
        &mut self,
        vector: u8,
        isr: &'static dyn isr::ISR,
    ) -> Option<&'static dyn isr::ISR> {
        self.map[vector as usize].replace(isr)
    }

    pub fn lookup(&self, vector: u8) -> Option<&'static dyn isr::ISR> {
        self.map[vector as usize]
    }

    pub fn clear(&mut self) {
        self.map = [None; MAX_VEC_NUM];
    }
}

/**
 Description:
    Remove all ISRs. Called once from `interrupts::init`.
*/
pub fn init() {
    kprintln!("int_dispatcher::init");
    let ie = cpu::disable_int_nested();
    INT_VECTORS.lock().clear();
    cpu::enable_int_nested(ie);
}

/**
 Description:
    Register an ISR. Must be synchronized agains interrupts, so they are
    disabled while the map is locked. Meant to be called before
    interrupts are enabled.

 Parameters: \
    `vector` vector number of interrupt
    `isr` the isr to be registered

 Return: \
    the ISR previously registered for `vector`
*/
pub fn register(vector: u8, isr: &'static dyn isr::ISR) -> Option<&'static dyn isr::ISR> {
    let ie = cpu::disable_int_nested();
    let previous = INT_VECTORS.lock().register(vector, isr);
    cpu::enable_int_nested(ie);

    if previous.is_some() {
        kprintln!("int_dispatcher: ISR for vector {} replaced", vector);
    } else {
        kprintln!("int_dispatcher: ISR for vector {} registered", vector);
    }
    previous
}
