//! Frame definitions: a CAN ID's payload layout as a set of top-level
//! signals, at most one of which may be a multiplexer.

use crate::signal::Signal;
use crate::types::{DecoderError, Result};

/// A CAN frame: its compound ID (see [`crate::types::RawCanRecord::canonical_id`]),
/// payload size, and top-level signals.
///
/// Equality and hashing are over `(id, size)` only — the signal tree
/// deliberately does not participate, matching `Signal`'s own
/// identity-over-children contract.
#[derive(Debug, Clone)]
pub struct Frame {
    pub id: u32,
    pub size: usize,
    pub signals: Vec<Signal>,
    /// Index into `signals` of the top-level multiplexer, if any.
    multiplexer: Option<usize>,
}

impl Frame {
    pub fn new(id: u32, size: usize) -> Self {
        Self {
            id,
            size,
            signals: Vec::new(),
            multiplexer: None,
        }
    }

    /// Append a signal to this frame's top-level list. If the signal is a
    /// multiplexer and one is already registered, fails with
    /// [`DecoderError::InvalidFrame`] and the signal is not added.
    pub fn add_signal(&mut self, signal: Signal) -> Result<()> {
        if signal.is_multiplexer() && self.multiplexer.is_some() {
            return Err(DecoderError::InvalidFrame(self.id));
        }

        let is_mux = signal.is_multiplexer();
        self.signals.push(signal);

        if is_mux {
            self.multiplexer = Some(self.signals.len() - 1);
        }

        Ok(())
    }

    /// The frame's top-level multiplexer signal, if it has one.
    pub fn multiplexer(&self) -> Option<&Signal> {
        self.multiplexer.map(|idx| &self.signals[idx])
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        (self.id, self.size) == (other.id, other.size)
    }
}

impl Eq for Frame {}

impl std::hash::Hash for Frame {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (self.id, self.size).hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(name: &str) -> Signal {
        Signal::new(name, 0, 8, true, false, false, 1.0, 0.0).unwrap()
    }

    #[test]
    fn rejects_second_top_level_multiplexer() {
        let mut mux1 = plain("Mux1");
        mux1.add_child(0, plain("Child1"));
        let mut mux2 = plain("Mux2");
        mux2.add_child(0, plain("Child2"));

        let mut frame = Frame::new(0x100, 8);
        frame.add_signal(mux1).unwrap();
        let err = frame.add_signal(mux2).unwrap_err();
        assert!(matches!(err, DecoderError::InvalidFrame(0x100)));
        assert_eq!(frame.signals.len(), 1);
    }

    #[test]
    fn accepts_single_multiplexer() {
        let mut mux = plain("Mux");
        mux.add_child(0, plain("Child"));

        let mut frame = Frame::new(0x100, 8);
        frame.add_signal(plain("Plain")).unwrap();
        frame.add_signal(mux).unwrap();

        assert!(frame.multiplexer().is_some());
        assert_eq!(frame.multiplexer().unwrap().name, "Mux");
    }

    #[test]
    fn equality_is_id_and_size_only() {
        let mut a = Frame::new(0x100, 8);
        a.add_signal(plain("A")).unwrap();

        let b = Frame::new(0x100, 8);

        assert_eq!(a, b);
        assert_ne!(a, Frame::new(0x100, 4));
        assert_ne!(a, Frame::new(0x200, 8));
    }
}
