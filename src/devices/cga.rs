/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: cga                                                             ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: This module provides functions for doing output on the CGA text ║
   ║         screen, 80x25 characters at 0xb8000.                            ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/
use core::ptr;

use crate::consts::{CGA_BASE_ADDR, CGA_COLUMNS, CGA_ROWS};

#[allow(dead_code)] // avoid warnings for unused colors
#[repr(u8)] // store each enum variant as an u8
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Color {
    Black = 0,
    Blue = 1,
    Green = 2,
    Cyan = 3,
    Red = 4,
    Pink = 5,
    Brown = 6,
    LightGray = 7,
    DarkGray = 8,
    LightBlue = 9,
    LightGreen = 10,
    LightCyan = 11,
    LightRed = 12,
    LightPink = 13,
    Yellow = 14,
    White = 15,
}

pub const CGA_STD_ATTR: u8 = (Color::Black as u8) << 4 | (Color::LightGray as u8);

const SCREEN_BYTES: usize = (CGA_ROWS * CGA_COLUMNS * 2) as usize;

#[cfg(not(test))]
fn cell(x: u32, y: u32) -> *mut u8 {
    (CGA_BASE_ADDR + (y * CGA_COLUMNS + x) * 2) as usize as *mut u8
}

// unit tests run on the host, the screen is a plain buffer there
#[cfg(test)]
static mut HOST_SCREEN: [u8; SCREEN_BYTES] = [0; SCREEN_BYTES];

// taken by every test that draws on the host screen
#[cfg(test)]
pub static HOST_SCREEN_USERS: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
fn cell(x: u32, y: u32) -> *mut u8 {
    let offset = ((y * CGA_COLUMNS + x) * 2) as usize;
    unsafe { ptr::addr_of_mut!(HOST_SCREEN).cast::<u8>().add(offset) }
}

// Character currently shown at `x`,`y`
#[cfg(test)]
pub fn char_at(x: u32, y: u32) -> u8 {
    if x >= CGA_COLUMNS || y >= CGA_ROWS {
        return 0;
    }
    unsafe { ptr::read_volatile(cell(x, y)) }
}

/**
 Description: Display the `character` at the given position `x`,`y` with attribute `attrib`
*/
pub fn show(x: u32, y: u32, character: char, attrib: u8) {
    if x >= CGA_COLUMNS || y >= CGA_ROWS {
        return;
    }

    let pos = cell(x, y);
    unsafe {
        ptr::write_volatile(pos, character as u8);
        ptr::write_volatile(pos.add(1), attrib);
    }
}

/**
 Description: Print byte `b` at cursor position `x`,`y`, returns the new position
*/
pub fn print_byte(mut x: u32, mut y: u32, b: u8, attrib: u8) -> (u32, u32) {
    match b {
        b'\n' => {
            x = 0;
            y += 1;
        }
        0x08 => {
            // backspace only moves the cursor
            if x > 0 {
                x -= 1;
            }
        }
        _ => {
            show(x, y, b as char, attrib);
            x += 1;
            if x >= CGA_COLUMNS {
                x = 0;
                y += 1;
            }
        }
    }

    if y >= CGA_ROWS {
        scrollup(attrib);
        y = CGA_ROWS - 1;
    }
    (x, y)
}

/**
 Description: Scroll text lines by one to the top.
*/
pub fn scrollup(attrib: u8) {
    let count = ((CGA_ROWS - 1) * CGA_COLUMNS * 2) as usize;
    let src = cell(0, 1);
    let dst = cell(0, 0);

    for i in 0..count {
        unsafe {
            ptr::write_volatile(dst.add(i), ptr::read_volatile(src.add(i)));
        }
    }

    // untere Zeile mit Leerzeichen fuellen
    for x in 0..CGA_COLUMNS {
        show(x, CGA_ROWS - 1, ' ', attrib);
    }
}

/**
 Description: Fill the whole screen with blanks
*/
pub fn clear(attrib: u8) {
    for y in 0..CGA_ROWS {
        for x in 0..CGA_COLUMNS {
            show(x, y, ' ', attrib);
        }
    }
}

/**
 Description: Helper function returning an attribute byte for the given
              parameters `bg`, `fg`, and `blink`
*/
pub const fn attribute(bg: Color, fg: Color, blink: bool) -> u8 {
    let mut ret = (((bg as u8) & 0x7) << 4) | ((fg as u8) & 0xf);

    if blink {
        ret |= 0x80
    }
    ret
}
