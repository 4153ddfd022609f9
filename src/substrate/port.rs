//! `Port<T>` and `Wire<T>`: typed signal endpoints with read/write and
//! drive-by-connection, as described by the datapath substrate's data
//! model. A connection is modeled as two ports sharing the same backing
//! cell, so writing through either endpoint is visible through the
//! other — there is exactly one authoritative driver for any given cell,
//! enforced by convention (only the owning module's `process` writes to
//! a port it drives).

use std::cell::Cell;
use std::rc::Rc;

/// A signal endpoint carrying a value of type `T`.
///
/// Reading always returns the most recently written value in the
/// current settling pass. Writing the same value is a no-op; writing a
/// different value marks the port dirty, which the kernel's settle loop
/// uses to detect whether another pass is needed.
#[derive(Clone)]
pub struct Port<T> {
    cell: Rc<Cell<T>>,
    dirty: Rc<Cell<bool>>,
}

impl<T: Copy + PartialEq> Port<T> {
    pub fn new(initial: T) -> Self {
        Port {
            cell: Rc::new(Cell::new(initial)),
            dirty: Rc::new(Cell::new(false)),
        }
    }

    /// Reads the current value.
    pub fn read(&self) -> T {
        self.cell.get()
    }

    /// Writes `value`. Returns `true` if the value actually changed
    /// (idempotent writes of the same value return `false`).
    pub fn write(&self, value: T) -> bool {
        if self.cell.get() != value {
            self.cell.set(value);
            self.dirty.set(true);
            true
        } else {
            false
        }
    }

    /// Connects `self` to `source`: from now on both endpoints share the
    /// same backing cell, so `source`'s driver is authoritative and
    /// reading through either port observes the same value. Mirrors the
    /// `<<` connection operator of the source model.
    pub fn connect(&mut self, source: &Port<T>) {
        self.cell = Rc::clone(&source.cell);
        self.dirty = Rc::clone(&source.dirty);
    }

    /// Clears this port's dirty flag and returns its previous state.
    /// Called once per settle pass by the module(s) that drive it so a
    /// fresh pass starts clean.
    pub fn take_dirty(&self) -> bool {
        self.dirty.replace(false)
    }
}

/// A port that additionally supports sensitivity callbacks: functions
/// invoked when the wire's value changes, used to cross module
/// boundaries without a direct port connection. The pipeline core uses
/// exactly one of these for the PC update glue: the gated "what should
/// the PC register latch next" signal is a `Wire<u32>`, and the PC
/// register's own `write_next` is registered against it as a callback,
/// so the module that decides the gate never needs a direct handle on
/// the register it drives.
pub struct Wire<T> {
    port: Port<T>,
    #[allow(clippy::type_complexity)]
    on_change: Rc<std::cell::RefCell<Vec<Box<dyn Fn(T)>>>>,
}

impl<T: Copy + PartialEq> Wire<T> {
    pub fn new(initial: T) -> Self {
        Wire {
            port: Port::new(initial),
            on_change: Rc::new(std::cell::RefCell::new(Vec::new())),
        }
    }

    pub fn read(&self) -> T {
        self.port.read()
    }

    pub fn write(&self, value: T) -> bool {
        let changed = self.port.write(value);
        if changed {
            for cb in self.on_change.borrow().iter() {
                cb(value);
            }
        }
        changed
    }

    pub fn connect(&mut self, source: &Port<T>) {
        self.port.connect(source);
    }

    pub fn take_dirty(&self) -> bool {
        self.port.take_dirty()
    }

    /// Registers a callback to run whenever this wire's value changes.
    pub fn on_change(&self, f: impl Fn(T) + 'static) {
        self.on_change.borrow_mut().push(Box::new(f));
    }
}

impl<T> Clone for Wire<T> {
    fn clone(&self) -> Self {
        Wire {
            port: self.port.clone(),
            on_change: Rc::clone(&self.on_change),
        }
    }
}
