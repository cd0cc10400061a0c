/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: pit                                                             ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: Programmable Interval Timer. Channel 0 fires IRQ0 with the      ║
   ║         configured frequency, the ISR counts the ticks.                 ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/
#![allow(dead_code)]

use core::fmt::Write;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::consts::PIT_BASE_FREQUENCY;
use crate::devices::cga_print;
use crate::kernel::cpu::{HardwarePorts, PortIo};
use crate::kernel::interrupts::context::InterruptContext;
use crate::kernel::interrupts::int_dispatcher;
use crate::kernel::interrupts::isr;

// Ports
const PORT_CTRL: u16 = 0x43;
const PORT_DATA0: u16 = 0x40;

// Counter 0, access mode lobyte/hibyte, Mode 3 (rate generator), 16-Bit binary format
const CMD_CHANNEL0_RATE: u8 = 0x36;

static PIT: PitISR = PitISR::new();

// read systime
pub fn get_tick_count() -> u32 {
    PIT.ticks()
}

// seconds since 'plugin'
pub fn get_uptime() -> u32 {
    PIT.uptime()
}

/**
 Description: Reload value for `frequency`, limited to what fits the 16 bit counter
*/
pub fn divisor(frequency: u32) -> u16 {
    let divisor = PIT_BASE_FREQUENCY / frequency.max(1);
    divisor.clamp(1, u16::MAX as u32) as u16
}

/**
 Description: Configure channel 0 to fire `frequency` interrupts per second
*/
pub fn interval<P: PortIo>(ports: &mut P, frequency: u32) -> u16 {
    let [lo, hi] = divisor(frequency).to_le_bytes();

    ports.write_port(PORT_CTRL, CMD_CHANNEL0_RATE);
    ports.write_port(PORT_DATA0, lo);
    ports.write_port(PORT_DATA0, hi);
    u16::from_le_bytes([lo, hi])
}

/**
 Description: Configure pit using `interval` and register the ISR in the
              interrupt dispatcher. Must be called before interrupts are enabled.

 Parameters: \
            `frequency` interrupts per second
*/
pub fn plugin(frequency: u32) {
    PIT.set_frequency(frequency);
    let divisor = interval(&mut HardwarePorts, frequency);
    int_dispatcher::register(int_dispatcher::INT_VEC_TIMER, &PIT);

    kprintln!("pit: divisor {} for {} Hz", divisor, frequency);
    println!("Timer initialized at {} Hz", frequency);
}

pub struct PitISR {
    ticks: AtomicU32,
    frequency: AtomicU32,
}

impl PitISR {
    pub const fn new() -> Self {
        PitISR {
            ticks: AtomicU32::new(0),
            frequency: AtomicU32::new(1),
        }
    }

    pub fn set_frequency(&self, frequency: u32) {
        self.frequency.store(frequency.max(1), Ordering::SeqCst);
    }

    pub fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::SeqCst)
    }

    pub fn uptime(&self) -> u32 {
        self.ticks() / self.frequency.load(Ordering::SeqCst)
    }

    /**
     Description: Count one tick.

     Return: \
        seconds since start if a full second has passed with this tick
    */
    pub fn tick(&self) -> Option<u32> {
        let ticks = self.ticks.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
        let frequency = self.frequency.load(Ordering::SeqCst);
        if ticks % frequency == 0 {
            Some(ticks / frequency)
        } else {
            None
        }
    }
}

impl isr::ISR for PitISR {
    /**
     Description: ISR of the pit.
    */
    fn trigger(&self, _ctx: &mut InterruptContext) {
        if let Some(seconds) = self.tick() {
            let _ = writeln!(cga_print::InterruptWriter, "Timer tick: {} seconds", seconds);
        }
    }
}
