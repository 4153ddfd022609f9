//! IF stage: fetches the instruction word at the current PC.

use std::cell::RefCell;
use std::rc::Rc;

use crate::common::SimError;
use crate::core::latches::IfId;
use crate::core::memory::Memory;
use crate::isa::opcodes::NOP_INST;
use crate::substrate::{Module, Port};

pub struct IfStage {
    pub pc: Port<u32>,
    pub out: Port<IfId>,
    pub misaligned: Port<bool>,

    memory: Rc<RefCell<Memory>>,
    error: RefCell<Option<SimError>>,
}

impl IfStage {
    pub fn new(memory: Rc<RefCell<Memory>>) -> Self {
        IfStage {
            pc: Port::new(0),
            out: Port::new(IfId::bubble()),
            misaligned: Port::new(false),
            memory,
            error: RefCell::new(None),
        }
    }

    /// Takes and clears any out-of-bounds-memory error raised while
    /// fetching this settle pass. Misalignment is *not* surfaced here —
    /// it becomes an architectural exception via [`Self::misaligned`].
    pub fn take_error(&self) -> Option<SimError> {
        self.error.borrow_mut().take()
    }
}

impl Module for IfStage {
    fn process(&mut self) -> bool {
        let pc = self.pc.read();
        let misaligned = pc % 4 != 0;
        let mut changed = self.misaligned.write(misaligned);

        if misaligned {
            changed |= self.out.write(IfId { inst: NOP_INST, pc: pc as i32 });
            return changed;
        }

        match self.memory.borrow().read_inst(pc) {
            Ok(inst) => {
                tracing::trace!(pc, inst, "IF fetched");
                changed |= self.out.write(IfId { inst, pc: pc as i32 });
            }
            Err(e) => *self.error.borrow_mut() = Some(e),
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetches_instruction_at_pc() {
        let mem = Rc::new(RefCell::new(Memory::new(64)));
        mem.borrow_mut().load_image(&[0x13, 0x00, 0x00, 0x00]).unwrap();
        let mut stage = IfStage::new(mem);
        stage.pc.write(0);
        stage.process();
        assert_eq!(stage.out.read().inst, NOP_INST);
        assert!(!stage.misaligned.read());
    }

    #[test]
    fn unaligned_pc_raises_misaligned_without_touching_memory() {
        let mem = Rc::new(RefCell::new(Memory::new(64)));
        let mut stage = IfStage::new(mem);
        stage.pc.write(2);
        stage.process();
        assert!(stage.misaligned.read());
        assert!(stage.take_error().is_none());
    }

    #[test]
    fn out_of_bounds_pc_surfaces_error() {
        let mem = Rc::new(RefCell::new(Memory::new(4)));
        let mut stage = IfStage::new(mem);
        stage.pc.write(100);
        stage.process();
        assert!(stage.take_error().is_some());
    }
}
