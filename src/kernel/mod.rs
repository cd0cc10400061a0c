pub mod cpu;
pub mod interrupts;
