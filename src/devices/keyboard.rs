/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: keyboard                                                        ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: PS/2 keyboard on IRQ1. The ISR reads one scancode (set 1) per   ║
   ║         interrupt, tracks the modifier keys and echoes the decoded      ║
   ║         character on the screen. US QWERTY layout.                      ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/

use core::fmt;
use core::fmt::Write;
use core::sync::atomic::{AtomicU8, Ordering};
use spin::Mutex;

use crate::devices::cga_print;
use crate::kernel::cpu::{HardwarePorts, PortIo};
use crate::kernel::interrupts::context::InterruptContext;
use crate::kernel::interrupts::int_dispatcher;
use crate::kernel::interrupts::isr;

// Benutzte Ports des Tastaturcontrollers
const KBD_DATA_PORT: u16 = 0x60; // Ausgabe- (R) u. Eingabepuffer (W)

// Konstanten fuer die Tastaturdekodierung
const BREAK_BIT: u8 = 0x80;
const SCAN_LSHIFT: u8 = 42;
const SCAN_RSHIFT: u8 = 54;
const SCAN_CTRL: u8 = 29;
const SCAN_ALT: u8 = 56;
const SCAN_C: u8 = 46;

// scancode -> ASCII, 0 means no character
static US_MAP: [u8; 128] = us_map();

const fn us_map() -> [u8; 128] {
    let main: &[u8] = b"\0\x1b1234567890-=\x08\tqwertyuiop[]\n\0asdfghjkl;'`\0\\zxcvbnm,./\0*\0 ";
    let mut map = [0u8; 128];
    let mut i = 0;
    while i < main.len() {
        map[i] = main[i];
        i += 1;
    }
    // keypad
    map[74] = b'-';
    map[78] = b'+';
    map
}

fn shifted(key: u8) -> u8 {
    match key {
        b'a'..=b'z' => key.to_ascii_uppercase(),
        b'1' => b'!',
        b'2' => b'@',
        b'3' => b'#',
        b'4' => b'$',
        b'5' => b'%',
        b'6' => b'^',
        b'7' => b'&',
        b'8' => b'*',
        b'9' => b'(',
        b'0' => b')',
        b'-' => b'_',
        b'=' => b'+',
        b'[' => b'{',
        b']' => b'}',
        b'\\' => b'|',
        b';' => b':',
        b'\'' => b'"',
        b'`' => b'~',
        b',' => b'<',
        b'.' => b'>',
        b'/' => b'?',
        _ => key,
    }
}

// accessed by ISR, storing last read ASCII code
// and by get_lastkey, see below
static LAST_KEY: AtomicU8 = AtomicU8::new(0);

pub fn get_lastkey() -> u8 {
    LAST_KEY.swap(0, Ordering::SeqCst)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KeyEvent {
    Char(u8),
    CtrlC,
}

// Modifier state
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Keyboard {
    shift: bool,
    ctrl: bool,
    alt: bool,
}

impl Keyboard {
    pub const fn new() -> Self {
        Keyboard {
            shift: false,
            ctrl: false,
            alt: false,
        }
    }

    /**
     Description:
        Interpret one make or break code. Modifier keys only change the
        state and never produce an event.
    */
    pub fn decode(&mut self, scancode: u8) -> Option<KeyEvent> {
        if (scancode & BREAK_BIT) != 0 {
            match scancode & !BREAK_BIT {
                SCAN_LSHIFT | SCAN_RSHIFT => self.shift = false,
                SCAN_CTRL => self.ctrl = false,
                SCAN_ALT => self.alt = false,
                _ => {}
            }
            return None;
        }

        match scancode {
            SCAN_LSHIFT | SCAN_RSHIFT => {
                self.shift = true;
                return None;
            }
            SCAN_CTRL => {
                self.ctrl = true;
                return None;
            }
            SCAN_ALT => {
                self.alt = true;
                return None;
            }
            _ => {}
        }

        if self.ctrl && scancode == SCAN_C {
            return Some(KeyEvent::CtrlC);
        }

        match US_MAP[scancode as usize] {
            0 => None,
            key if self.shift => Some(KeyEvent::Char(shifted(key))),
            key => Some(KeyEvent::Char(key)),
        }
    }
}

/**
 Description: Screen echo of a decoded key
*/
pub fn echo<W: Write>(out: &mut W, event: KeyEvent) -> fmt::Result {
    match event {
        KeyEvent::CtrlC => out.write_str("\n^C (Ctrl+C detected)\n"),
        KeyEvent::Char(0x08) => out.write_str("\x08 \x08"),
        KeyEvent::Char(b'\t') => out.write_str("    "),
        KeyEvent::Char(c) => out.write_char(c as char),
    }
}

pub struct KeyboardISR {
    state: Mutex<Keyboard>,
}

static KB: KeyboardISR = KeyboardISR {
    state: Mutex::new(Keyboard::new()),
};

/**
 Description: Register the keyboard ISR. Must be called before interrupts are enabled.
*/
pub fn plugin() {
    int_dispatcher::register(int_dispatcher::INT_VEC_KEYBOARD, &KB);
    println!("Keyboard driver initialized");
    println!("You can now type! Try pressing some keys...");
}

impl isr::ISR for KeyboardISR {
    fn trigger(&self, _ctx: &mut InterruptContext) {
        let scancode = HardwarePorts.read_port(KBD_DATA_PORT);

        // only the ISR locks the state, interrupts are off while it runs
        let event = match self.state.try_lock() {
            Some(mut kb) => kb.decode(scancode),
            None => None,
        };

        if let Some(event) = event {
            if let KeyEvent::Char(c) = event {
                LAST_KEY.store(c, Ordering::SeqCst);
            }
            let _ = echo(&mut cga_print::InterruptWriter, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::String;
    use std::vec::Vec;

    fn decode_all(kb: &mut Keyboard, codes: &[u8]) -> Vec<KeyEvent> {
        codes.iter().filter_map(|&c| kb.decode(c)).collect()
    }

    #[test]
    fn plain_keys() {
        let mut kb = Keyboard::new();

        let events = decode_all(&mut kb, &[0x23, 0xa3, 0x17, 0x97, 0x1c, 0x39]);

        assert_eq!(
            events,
            vec![
                KeyEvent::Char(b'h'),
                KeyEvent::Char(b'i'),
                KeyEvent::Char(b'\n'),
                KeyEvent::Char(b' ')
            ]
        );
    }

    #[test]
    fn shift_is_held_until_release() {
        let mut kb = Keyboard::new();

        let codes = [SCAN_LSHIFT, 0x1e, 0x02, SCAN_LSHIFT | BREAK_BIT, 0x1e];

        let events = decode_all(&mut kb, &codes);

        assert_eq!(
            events,
            vec![
                KeyEvent::Char(b'A'),
                KeyEvent::Char(b'!'),
                KeyEvent::Char(b'a')
            ]
        );
    }

    #[test]
    fn right_shift_maps_symbols() {
        let mut kb = Keyboard::new();

        let events = decode_all(&mut kb, &[SCAN_RSHIFT, 0x35, 0x28, 0x0d]);

        assert_eq!(
            events,
            vec![
                KeyEvent::Char(b'?'),
                KeyEvent::Char(b'"'),
                KeyEvent::Char(b'+')
            ]
        );
    }

    #[test]
    fn ctrl_c_is_reported_once_per_press() {
        let mut kb = Keyboard::new();

        let codes = [
            SCAN_CTRL,
            SCAN_C,
            SCAN_C | BREAK_BIT,
            SCAN_CTRL | BREAK_BIT,
            SCAN_C,
        ];

        let events = decode_all(&mut kb, &codes);

        assert_eq!(events, vec![KeyEvent::CtrlC, KeyEvent::Char(b'c')]);
    }

    #[test]
    fn modifiers_and_unmapped_keys_give_nothing() {
        let mut kb = Keyboard::new();

        // alt, caps lock, F1, up arrow
        assert!(decode_all(&mut kb, &[SCAN_ALT, 58, 59, 72]).is_empty());
        assert!(kb.alt);
        kb.decode(SCAN_ALT | BREAK_BIT);
        assert!(!kb.alt);
    }

    #[test]
    fn keypad_and_escape() {
        let mut kb = Keyboard::new();

        assert_eq!(kb.decode(74), Some(KeyEvent::Char(b'-')));
        assert_eq!(kb.decode(78), Some(KeyEvent::Char(b'+')));
        assert_eq!(kb.decode(1), Some(KeyEvent::Char(0x1b)));
    }

    #[test]
    fn echo_of_special_keys() {
        let mut out = String::new();

        echo(&mut out, KeyEvent::Char(b'x')).unwrap();
        echo(&mut out, KeyEvent::Char(0x08)).unwrap();
        echo(&mut out, KeyEvent::Char(b'\t')).unwrap();
        echo(&mut out, KeyEvent::CtrlC).unwrap();

        assert_eq!(out, "x\x08 \x08    \n^C (Ctrl+C detected)\n");
    }
}
