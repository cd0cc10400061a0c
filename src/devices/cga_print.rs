/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: cga_print                                                       ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: Implements the macros print! and println! using cga. The macro  ║
   ║         implementation uses a mutex, so they should not be used         ║
   ║         outside of an ISR while interrupts are enabled and an ISR may   ║
   ║         print, too. Interrupt code uses 'InterruptWriter'.              ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Author: Philipp Oppermann, see here:                                    ║
   ║            https://os.phil-opp.com/vga-text-mode/                       ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/
use core::fmt;
use core::fmt::Write;
use core::sync::atomic::{AtomicUsize, Ordering};
use spin::Mutex;

use crate::devices::cga;

// The global writer that can used as an interface from other modules
// It is threadsafe by using 'Mutex'
pub static WRITER: Mutex<Writer> = Mutex::new(Writer {
    x: 0,
    y: 0,
    attrib: cga::CGA_STD_ATTR,
});

// Interrupt output lost because the writer was locked
static DROPPED_WRITES: AtomicUsize = AtomicUsize::new(0);

// Defining a Writer for writing formatted strings to the CGA screen
pub struct Writer {
    x: u32,
    y: u32,
    attrib: u8,
}

impl Writer {
    pub fn set_attribute(&mut self, attrib: u8) {
        self.attrib = attrib;
    }

    pub fn clear(&mut self) {
        cga::clear(self.attrib);
        self.x = 0;
        self.y = 0;
    }
}

// Implementation of the 'core::fmt::Write' trait for our Writer
// Required to output formatted strings
// Requires only one function 'write_str'
impl fmt::Write for Writer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            match byte {
                // printable ASCII byte, newline or backspace
                0x20..=0x7e | b'\n' | 0x08 => {
                    (self.x, self.y) = cga::print_byte(self.x, self.y, byte, self.attrib)
                }

                // not part of printable ASCII range
                _ => (self.x, self.y) = cga::print_byte(self.x, self.y, 0xfe, self.attrib),
            }
        }
        Ok(())
    }
}

/**
 Description:
    Screen output for interrupt context. If the interrupted code holds
    `WRITER`, spinning would never end, so the text is dropped and counted
    instead.
*/
pub struct InterruptWriter;

impl fmt::Write for InterruptWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        match WRITER.try_lock() {
            Some(mut writer) => writer.write_str(s),
            None => {
                DROPPED_WRITES.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
        }
    }
}

pub fn dropped_writes() -> usize {
    DROPPED_WRITES.load(Ordering::Relaxed)
}

// Provide macros like in the 'io' module of Rust
// The $crate variable ensures that the macro also works
// from outside the 'std' crate.
macro_rules! print {
    ($($arg:tt)*) => ({
        $crate::devices::cga_print::print(format_args!($($arg)*));
    });
}

macro_rules! println {
    () => (print!("\n"));
    ($fmt:expr) => (print!(concat!($fmt, "\n")));
    ($fmt:expr, $($arg:tt)*) => (print!(concat!($fmt, "\n"), $($arg)*));
}

// Helper function of print macros (must be public)
#[cfg(not(test))]
pub fn print(args: fmt::Arguments) {
    // the screen cannot fail
    let _ = WRITER.lock().write_fmt(args);
}

// unit tests run on the host, there is no screen at 0xb8000
#[cfg(test)]
pub fn print(args: fmt::Arguments) {
    std::print!("{}", args);
}

/**
 Description: Set colour for all following output
*/
pub fn set_color(attrib: u8) {
    WRITER.lock().set_attribute(attrib);
}

pub fn clear_screen() {
    WRITER.lock().clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::cga::{char_at, HOST_SCREEN_USERS};

    #[test]
    fn interrupt_writer_drops_text_while_writer_is_locked() {
        let _screen = HOST_SCREEN_USERS.lock().unwrap_or_else(|e| e.into_inner());
        let before = dropped_writes();

        let held = WRITER.lock();
        let result = write!(InterruptWriter, "Timer tick: 1 seconds");
        drop(held);

        assert!(result.is_ok());
        assert_eq!(dropped_writes(), before + 1);
    }

    #[test]
    fn interrupt_writer_draws_when_writer_is_free() {
        let _screen = HOST_SCREEN_USERS.lock().unwrap_or_else(|e| e.into_inner());
        WRITER.lock().clear();
        let before = dropped_writes();

        write!(InterruptWriter, "ok\x01").unwrap();

        assert_eq!(dropped_writes(), before);
        assert_eq!(char_at(0, 0), b'o');
        assert_eq!(char_at(1, 0), b'k');
        assert_eq!(char_at(2, 0), 0xfe);
    }
}
