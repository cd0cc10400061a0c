#[macro_use]
pub mod cga_print;

#[macro_use]
pub mod kprint;

pub mod cga;
pub mod keyboard;
pub mod pit;
