//! Signal definitions and the multiplexer tree.

use std::collections::HashMap;

use crate::types::{DecoderError, Result};

/// A single signal: a bitfield within a frame's payload, plus the scaling
/// needed to turn its raw integer into a physical value.
///
/// Immutable after construction except for attaching children via
/// [`Signal::add_child`]. A signal is a multiplexer iff it has children.
#[derive(Debug, Clone)]
pub struct Signal {
    pub name: String,
    pub start_bit: u16,
    pub size: u16,
    pub is_little_endian: bool,
    pub is_signed: bool,
    pub is_float: bool,
    pub factor: f64,
    pub offset: f64,
    /// Selector value (as decoded from the parent multiplexer) -> group of
    /// child signals active for that selector. Multiple signals may share
    /// a selector; each child may itself be a multiplexer.
    children: HashMap<u64, Vec<Signal>>,
}

impl Signal {
    /// Construct a new, non-multiplexer signal.
    ///
    /// Returns [`DecoderError::UnsupportedSignal`] if `is_float` is set
    /// with a `size` other than 32 or 64 — floats are rejected at
    /// construction time rather than at decode time.
    pub fn new(
        name: impl Into<String>,
        start_bit: u16,
        size: u16,
        is_little_endian: bool,
        is_signed: bool,
        is_float: bool,
        factor: f64,
        offset: f64,
    ) -> Result<Self> {
        let name = name.into();

        debug_assert!((1..=64).contains(&size), "signal size must be 1..=64 bits");

        if is_float && size != 32 && size != 64 {
            return Err(DecoderError::UnsupportedSignal(name, size));
        }

        Ok(Self {
            name,
            start_bit,
            size,
            is_little_endian,
            is_signed,
            is_float,
            factor,
            offset,
            children: HashMap::new(),
        })
    }

    /// True iff this signal has at least one child group attached.
    pub fn is_multiplexer(&self) -> bool {
        !self.children.is_empty()
    }

    /// Attach a child signal under the given selector value. Appends to
    /// the group for that selector rather than replacing it, since
    /// multiple independent signals may share a selector.
    pub fn add_child(&mut self, selector: u64, child: Signal) {
        self.children.entry(selector).or_default().push(child);
    }

    /// The group of child signals active for a given selector value, if
    /// any were attached under it.
    pub fn children_for(&self, selector: u64) -> Option<&[Signal]> {
        self.children.get(&selector).map(Vec::as_slice)
    }

    /// Attribute tuple used for value equality and hashing. The children
    /// graph deliberately does not participate.
    fn identity(&self) -> (&str, u16, u16, bool, bool, bool, u64, u64) {
        (
            &self.name,
            self.start_bit,
            self.size,
            self.is_little_endian,
            self.is_signed,
            self.is_float,
            self.factor.to_bits(),
            self.offset.to_bits(),
        )
    }

    /// Pre-order walk over this signal and every descendant, in the order
    /// children were attached per selector (selectors themselves are
    /// unordered, matching the original implementation's dict-iteration
    /// semantics — callers should not depend on selector ordering).
    pub(crate) fn for_each_preorder<'a>(&'a self, f: &mut dyn FnMut(&'a Signal)) {
        f(self);
        for group in self.children.values() {
            for child in group {
                child.for_each_preorder(f);
            }
        }
    }
}

impl PartialEq for Signal {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Signal {}

impl std::hash::Hash for Signal {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}
