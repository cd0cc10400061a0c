/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: startup                                                         ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: Here is the function 'kmain' called from the boot code in       ║
   ║         32-bit protected mode and the panic handler. All features are   ║
   ║         set and all modules are imported.                               ║
   ║                                                                         ║
   ║         Bring-up order: screen, interrupt structures (ISR map, PIC,     ║
   ║         IDT), device ISRs, then a single 'sti'.                         ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/
#![cfg_attr(not(test), no_std)]
#![allow(dead_code)] // avoid warnings
#![allow(unused_imports)]
#![allow(unused_macros)]

#[cfg(target_os = "none")]
extern crate rlibc;

// insert other modules
#[macro_use] // import macros, too
mod devices;
mod consts;
mod kernel;

use core::panic::PanicInfo;

use devices::cga;
use devices::cga::Color;
use devices::cga_print; // used to import code needed by println!
use devices::keyboard; // keyboard
use devices::kprint; // used to import code needed by kprintln!
use devices::pit; // timer

use kernel::cpu;
use kernel::interrupts;

#[cfg(target_arch = "x86")]
#[no_mangle]
pub extern "C" fn kmain() -> ! {
    kprintln!("kmain");

    cga_print::clear_screen();
    cga_print::set_color(cga::attribute(Color::Black, Color::LightGreen, false));
    println!("Welcome to Quasar-OS Kernel!");
    println!("=============================");
    println!();

    cga_print::set_color(cga::attribute(Color::Black, Color::White, false));
    println!("Kernel loaded successfully in 32-bit protected mode");

    // Interrupt-Strukturen initialisieren
    interrupts::init();

    // Zeitgeber-Unterbrechungsroutine 'einstoepseln'
    pit::plugin(consts::TIMER_FREQUENCY);

    // Tastatur-Unterbrechungsroutine 'einstoepseln'
    keyboard::plugin();

    cga_print::set_color(cga::attribute(Color::Black, Color::Yellow, false));
    println!("System Status: Running");
    println!("Architecture: x86 32-bit");
    println!();
    cga_print::set_color(cga::CGA_STD_ATTR);

    // all ISRs are in place, from here on interrupts may arrive
    cpu::enable_int();
    kprintln!("kmain: interrupts enabled");

    cpu::halt()
}

#[cfg(not(test))]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    cpu::disable_int();

    // force unlock, just to be sure
    // anyway we do not return
    unsafe {
        cga_print::WRITER.force_unlock();
        kprint::SERIAL.force_unlock();
    }
    println!("Panic: {}", info);
    kprintln!("Panic: {}", info);
    cpu::halt_forever()
}
