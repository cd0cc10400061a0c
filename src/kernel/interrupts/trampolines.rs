/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: trampolines                                                     ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: Entry code for every wired vector. Each trampoline pushes a     ║
   ║         dummy fault code (unless the cpu pushed one) and its vector     ║
   ║         number, then jumps to 'int_common', which saves the rest of the ║
   ║         'InterruptContext', calls 'int_disp' with a pointer to it,      ║
   ║         restores everything and returns with 'iretd'.                   ║
   ║                                                                         ║
   ║         The push order must match 'context.rs' exactly.                 ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/

use core::arch::global_asm;

use crate::consts::KERNEL_DATA_SELECTOR;

// exceptions 0-19 and IRQs 0-15
pub const TRAMPOLINE_COUNT: usize = 36;

global_asm!(
    ".global int_common",
    "int_common:",
    "    pushad",
    "    xor eax, eax",
    "    mov ax, ds",
    "    push eax",
    "    mov ax, {data_sel}",
    "    mov ds, ax",
    "    mov es, ax",
    "    mov fs, ax",
    "    mov gs, ax",
    "    cld",
    // argument: pointer to the context
    "    push esp",
    "    call int_disp",
    "    add esp, 4",
    "    pop eax",
    "    mov ds, ax",
    "    mov es, ax",
    "    mov fs, ax",
    "    mov gs, ax",
    "    popad",
    // vector and fault code
    "    add esp, 8",
    "    iretd",
    data_sel = const KERNEL_DATA_SELECTOR,
);

macro_rules! trampoline {
    ($name:ident, $vector:literal) => {
        global_asm!(concat!(
            ".global ", stringify!($name), "\n",
            stringify!($name), ":\n",
            "    push 0\n",
            "    push ", stringify!($vector), "\n",
            "    jmp int_common\n",
        ));
    };
    // the cpu already pushed a fault code
    ($name:ident, $vector:literal, error_code) => {
        global_asm!(concat!(
            ".global ", stringify!($name), "\n",
            stringify!($name), ":\n",
            "    push ", stringify!($vector), "\n",
            "    jmp int_common\n",
        ));
    };
}

macro_rules! trampolines {
    ($($name:ident => $vector:literal $(, $code:ident)?;)*) => {
        $(trampoline!($name, $vector $(, $code)?);)*

        extern "C" {
            $(fn $name();)*
        }

        /**
         Description: `(vector, address)` of every trampoline
        */
        pub fn entry_points() -> [(u8, u32); TRAMPOLINE_COUNT] {
            [$(($vector, $name as usize as u32)),*]
        }
    };
}

trampolines! {
    _isr0 => 0;
    _isr1 => 1;
    _isr2 => 2;
    _isr3 => 3;
    _isr4 => 4;
    _isr5 => 5;
    _isr6 => 6;
    _isr7 => 7;
    _isr8 => 8, error_code;
    _isr9 => 9;
    _isr10 => 10, error_code;
    _isr11 => 11, error_code;
    _isr12 => 12, error_code;
    _isr13 => 13, error_code;
    _isr14 => 14, error_code;
    _isr15 => 15;
    _isr16 => 16;
    _isr17 => 17, error_code;
    _isr18 => 18;
    _isr19 => 19;
    _irq0 => 32;
    _irq1 => 33;
    _irq2 => 34;
    _irq3 => 35;
    _irq4 => 36;
    _irq5 => 37;
    _irq6 => 38;
    _irq7 => 39;
    _irq8 => 40;
    _irq9 => 41;
    _irq10 => 42;
    _irq11 => 43;
    _irq12 => 44;
    _irq13 => 45;
    _irq14 => 46;
    _irq15 => 47;
}
