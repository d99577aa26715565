//! Protocol dispatch (spec §4.7): select the generic or J1939
//! specialisation from a database's protocol tag. Shared by the
//! streaming and batch decoders.

use crate::db::SignalDB;
use crate::types::{DecoderError, Result};

/// Which decoding specialisation applies to a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Generic,
    J1939,
}

/// Select the specialisation for `db`, per spec §4.7: the `"J1939"` tag
/// selects J1939; anything else (including no tag) selects generic.
///
/// The spec reserves a construction-time error for a protocol tag with no
/// matching decoder at all; with only two specialisations modelled here,
/// every tag resolves (generic is the catch-all), so this currently
/// never returns `Err` — it exists so a future third specialisation can
/// be added to this table without changing callers.
pub fn select_protocol(db: &SignalDB) -> Result<Protocol> {
    let protocol = match db.protocol() {
        Some("J1939") => Protocol::J1939,
        _ => Protocol::Generic,
    };
    log::info!("dispatch selected {protocol:?} (tag: {:?})", db.protocol());
    Ok(protocol)
}

#[allow(dead_code)]
pub(crate) fn unknown_protocol(tag: Option<&str>) -> DecoderError {
    DecoderError::UnknownProtocol(tag.map(str::to_string))
}
