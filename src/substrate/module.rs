//! The `Module` trait: a unit of pure combinational logic.

/// A combinational unit: reads its input ports and the `current` face of
/// any registers it owns, computes, and writes its output ports (and the
/// `next` face of any registers it owns). Must be deterministic and free
/// of side effects other than those writes.
///
/// `process` returns whether any of its output ports changed value this
/// call, so the kernel's settle loop can tell when the module graph has
/// reached a fixed point.
pub trait Module {
    fn process(&mut self) -> bool;
}
