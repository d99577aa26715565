//! The signal database: a protocol tag plus a frame table, keyed by
//! compound CAN ID.

use std::collections::HashMap;

use crate::frame::Frame;

/// A populated, read-only-after-construction database of frame/signal
/// definitions, optionally tagged with a protocol (`"J1939"` selects the
/// J1939 decoder specialisation; anything else, including `None`, selects
/// the generic one).
#[derive(Debug, Clone, Default)]
pub struct SignalDB {
    protocol: Option<String>,
    frames: HashMap<u32, Frame>,
}

impl SignalDB {
    pub fn new(protocol: Option<String>) -> Self {
        log::info!("building signal database, protocol tag: {protocol:?}");
        Self {
            protocol,
            frames: HashMap::new(),
        }
    }

    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    /// Insert a frame, keyed by its `id`. A no-op if a frame with the same
    /// ID is already present.
    ///
    /// Returns `true` if the frame was added, `false` if a frame with
    /// that ID was already present (and the database is unchanged).
    pub fn add_frame(&mut self, frame: Frame) -> bool {
        if self.frames.contains_key(&frame.id) {
            log::debug!("frame 0x{:08X} already present, not added", frame.id);
            return false;
        }
        log::debug!("added frame 0x{:08X} ({} signal(s))", frame.id, frame.signals.len());
        self.frames.insert(frame.id, frame);
        true
    }

    /// Look up a frame by its compound CAN ID.
    pub fn frame(&self, id: u32) -> Option<&Frame> {
        self.frames.get(&id)
    }

    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.values()
    }

    /// All signal names across all frames, in pre-order of each frame's
    /// signal tree (frame iteration order itself is unspecified, since
    /// frames are stored in a hash map).
    pub fn signal_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for frame in self.frames.values() {
            for signal in &frame.signals {
                signal.for_each_preorder(&mut |s| names.push(s.name.clone()));
            }
        }
        names
    }
}
