//! Batch decode options (spec §4.6).

use std::collections::HashSet;

/// Options recognised by [`crate::batch::decode_batch`]. Builder-style
/// setters, mirroring the teacher's `DecoderConfig` idiom.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// J1939 only: apply the invalid-value ceiling (spec §4.4) and drop
    /// signals whose raw value falls outside it. Defaults to `true`.
    pub ignore_invalid_signals: bool,
    /// Column names to omit from the result.
    pub columns_to_drop: HashSet<String>,
    /// Reserved for a wide-format output variant; long-format output when
    /// `false` (the only variant currently implemented).
    pub common_time_base: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            ignore_invalid_signals: true,
            columns_to_drop: HashSet::new(),
            common_time_base: false,
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ignore_invalid_signals(mut self, enabled: bool) -> Self {
        self.ignore_invalid_signals = enabled;
        self
    }

    pub fn drop_column(mut self, name: impl Into<String>) -> Self {
        self.columns_to_drop.insert(name.into());
        self
    }

    pub fn with_columns_to_drop(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.columns_to_drop = names.into_iter().collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let opts = DecodeOptions::default();
        assert!(opts.ignore_invalid_signals);
        assert!(opts.columns_to_drop.is_empty());
        assert!(!opts.common_time_base);
    }

    #[test]
    fn builder_chains() {
        let opts = DecodeOptions::new()
            .with_ignore_invalid_signals(false)
            .drop_column("PGN")
            .drop_column("Source Address");

        assert!(!opts.ignore_invalid_signals);
        assert_eq!(opts.columns_to_drop.len(), 2);
        assert!(opts.columns_to_drop.contains("PGN"));
    }
}
