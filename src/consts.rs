/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: consts                                                          ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: Fixed hardware addresses, selectors and vector numbers used     ║
   ║         during bring-up.                                                ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/
#![allow(dead_code)] // avoid warnings

// Flat segments installed by the boot code
pub const KERNEL_CODE_SELECTOR: u16 = 0x08;
pub const KERNEL_DATA_SELECTOR: u16 = 0x10;

// Number of vectors known to the processor
pub const MAX_VEC_NUM: usize = 256;

// Vector bases of the two 8259 controllers after remapping
pub const PIC_MASTER_OFFSET: u8 = 32;
pub const PIC_SLAVE_OFFSET: u8 = 40;
pub const PIC_LINES: u8 = 8;

// PIT
pub const PIT_BASE_FREQUENCY: u32 = 1193180; // Hz
pub const TIMER_FREQUENCY: u32 = 100; // Hz

// CGA text screen
pub const CGA_BASE_ADDR: u32 = 0xb8000;
pub const CGA_ROWS: u32 = 25;
pub const CGA_COLUMNS: u32 = 80;

// Serial log port (COM1)
pub const COM1_BASE: u16 = 0x3f8;
