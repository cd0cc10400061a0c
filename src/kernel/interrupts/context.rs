/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: context                                                         ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: The register snapshot built by the trampolines on the stack of  ║
   ║         the interrupted code. A pointer to it is handed to 'int_disp'.  ║
   ║                                                                         ║
   ║         Stack layout, lowest address first:                             ║
   ║            ds                       pushed by 'int_common'              ║
   ║            edi .. eax               pushed by 'pushad'                  ║
   ║            vector, error_code       pushed by the trampoline (or cpu)   ║
   ║            eip, cs, eflags          pushed by the cpu                   ║
   ║            useresp, ss              pushed by the cpu on ring change    ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/

use core::mem::size_of;

/**
 Description:
    General purpose registers in the order `pushad` leaves them on the
    stack. `esp` is the value before `pushad` and is ignored by `popad`.
*/
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Registers {
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    pub esp: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
}

/**
 Description:
    State the processor saved when it entered the trampoline. `useresp`
    and `ss` are only valid if the interrupt came from a lower privilege
    level.
*/
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ReturnFrame {
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
    pub useresp: u32,
    pub ss: u32,
}

/**
 Description:
    Snapshot of the interrupted execution. Lives for exactly one interrupt,
    handlers only ever get a temporary `&mut` to it. Changing fields
    changes what is restored on `iretd`.
*/
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct InterruptContext {
    pub ds: u32,
    pub regs: Registers,
    pub vector: u32,
    pub error_code: u32,
    pub frame: ReturnFrame,
}

// The trampolines hardcode these
pub const CONTEXT_SIZE: usize = 16 * 4;
pub const VECTOR_OFFSET: usize = 9 * 4;
const _: () = assert!(size_of::<InterruptContext>() == CONTEXT_SIZE);
const _: () = assert!(size_of::<Registers>() == 8 * 4);
const _: () = assert!(size_of::<ReturnFrame>() == 5 * 4);

impl InterruptContext {
    /**
     Description: Context for `vector` with every register zeroed.
    */
    pub const fn for_vector(vector: u8) -> Self {
        InterruptContext {
            ds: 0,
            regs: Registers {
                edi: 0,
                esi: 0,
                ebp: 0,
                esp: 0,
                ebx: 0,
                edx: 0,
                ecx: 0,
                eax: 0,
            },
            vector: vector as u32,
            error_code: 0,
            frame: ReturnFrame {
                eip: 0,
                cs: 0,
                eflags: 0,
                useresp: 0,
                ss: 0,
            },
        }
    }

    // Vectors above 255 cannot be pushed by a trampoline
    pub fn vector(&self) -> u8 {
        self.vector as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::{align_of, size_of};

    fn offset_of_field(ctx: &InterruptContext, field: *const u32) -> usize {
        field as usize - ctx as *const _ as usize
    }

    #[test]
    fn layout_matches_trampoline_push_order() {
        let ctx = InterruptContext::default();

        assert_eq!(size_of::<InterruptContext>(), CONTEXT_SIZE);
        assert_eq!(align_of::<InterruptContext>(), 4);
        assert_eq!(offset_of_field(&ctx, &ctx.ds), 0);
        assert_eq!(offset_of_field(&ctx, &ctx.regs.edi), 4);
        assert_eq!(offset_of_field(&ctx, &ctx.regs.eax), 32);
        assert_eq!(offset_of_field(&ctx, &ctx.vector), VECTOR_OFFSET);
        assert_eq!(offset_of_field(&ctx, &ctx.error_code), 40);
        assert_eq!(offset_of_field(&ctx, &ctx.frame.eip), 44);
        assert_eq!(offset_of_field(&ctx, &ctx.frame.ss), 60);
    }

    #[test]
    fn for_vector_zeroes_everything_else() {
        let ctx = InterruptContext::for_vector(14);

        assert_eq!(ctx.vector(), 14);
        assert_eq!(ctx.error_code, 0);
        assert_eq!(ctx.regs, Registers::default());
        assert_eq!(ctx.frame, ReturnFrame::default());
    }
}
