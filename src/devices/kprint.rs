/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: kprint                                                          ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: Implements the macros kprint! and kprintln! writing to the      ║
   ║         serial port COM1 (38400 baud, 8N1). Used for tracing the boot   ║
   ║         process, visible with 'qemu -serial stdio'. Not to be used      ║
   ║         inside an ISR.                                                  ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/
use core::fmt;
use core::fmt::Write;
use lazy_static::lazy_static;
use spin::Mutex;

use crate::consts::COM1_BASE;
use crate::kernel::cpu::{HardwarePorts, PortIo};

// Register offsets
const DATA: u16 = 0;
const INT_ENABLE: u16 = 1;
const FIFO_CTRL: u16 = 2;
const LINE_CTRL: u16 = 3;
const MODEM_CTRL: u16 = 4;
const LINE_STATUS: u16 = 5;

const LINE_DLAB: u8 = 0x80;
const LINE_8N1: u8 = 0x03;
const STATUS_THR_EMPTY: u8 = 0x20;

// 115200 / 3
const BAUD_DIVISOR: u16 = 3;

lazy_static! {
    pub static ref SERIAL: Mutex<SerialPort<HardwarePorts>> = {
        let mut port = SerialPort::new(COM1_BASE, HardwarePorts);
        port.init();
        Mutex::new(port)
    };
}

// A 16550 UART, polled
pub struct SerialPort<P: PortIo> {
    base: u16,
    ports: P,
}

impl<P: PortIo> SerialPort<P> {
    pub const fn new(base: u16, ports: P) -> Self {
        SerialPort { base, ports }
    }

    /**
     Description: Program baud rate and frame format, interrupts stay off
    */
    pub fn init(&mut self) {
        let [lo, hi] = BAUD_DIVISOR.to_le_bytes();
        self.write_reg(INT_ENABLE, 0x00);
        self.write_reg(LINE_CTRL, LINE_DLAB);
        self.write_reg(DATA, lo);
        self.write_reg(INT_ENABLE, hi);
        self.write_reg(LINE_CTRL, LINE_8N1);
        self.write_reg(FIFO_CTRL, 0xc7); // enable & clear, 14 byte threshold
        self.write_reg(MODEM_CTRL, 0x0b); // DTR, RTS, OUT2
    }

    /**
     Description: Send one byte, waits until the transmitter is free
    */
    pub fn send(&mut self, byte: u8) {
        while self.ports.read_port(self.base + LINE_STATUS) & STATUS_THR_EMPTY == 0 {
            core::hint::spin_loop();
        }
        self.write_reg(DATA, byte);
    }

    fn write_reg(&mut self, offset: u16, value: u8) {
        self.ports.write_port(self.base + offset, value);
    }
}

impl<P: PortIo> fmt::Write for SerialPort<P> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.send(b'\r');
            }
            self.send(byte);
        }
        Ok(())
    }
}

macro_rules! kprint {
    ($($arg:tt)*) => ({
        $crate::devices::kprint::print(format_args!($($arg)*));
    });
}

macro_rules! kprintln {
    () => (kprint!("\n"));
    ($fmt:expr) => (kprint!(concat!($fmt, "\n")));
    ($fmt:expr, $($arg:tt)*) => (kprint!(concat!($fmt, "\n"), $($arg)*));
}

// Helper function of kprint macros (must be public)
#[cfg(not(test))]
pub fn print(args: fmt::Arguments) {
    let _ = SERIAL.lock().write_fmt(args);
}

#[cfg(test)]
pub fn print(args: fmt::Arguments) {
    std::eprint!("{}", args);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::interrupts::pic::tests::RecordingPorts;

    #[test]
    fn init_programs_38400_8n1() {
        let mut port = SerialPort::new(0x3f8, RecordingPorts::default());

        port.init();

        assert_eq!(
            port.ports.writes,
            vec![
                (0x3f9, 0x00),
                (0x3fb, 0x80),
                (0x3f8, 0x03),
                (0x3f9, 0x00),
                (0x3fb, 0x03),
                (0x3fa, 0xc7),
                (0x3fc, 0x0b),
            ]
        );
    }

    #[test]
    fn newline_becomes_crlf() {
        let ports = RecordingPorts::with_value(0x3fd, STATUS_THR_EMPTY);
        let mut port = SerialPort::new(0x3f8, ports);

        write!(port, "ok\n").unwrap();

        let sent: Vec<u8> = port.ports.writes.iter().map(|w| w.1).collect();
        assert_eq!(sent, b"ok\r\n");
        assert_eq!(port.ports.reads.len(), 4);
    }
}
