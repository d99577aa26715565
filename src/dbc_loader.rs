//! DBC adapter (spec §6, "DBC loader interface"): builds a [`SignalDB`]
//! from a Vector DBC file, via the `can-dbc` crate.
//!
//! Grounded on the teacher's `signals/dbc.rs`: same crate, same
//! `DBC::from_slice` entry point, same UTF-8-with-Latin-1-fallback read
//! path (this version uses `encoding_rs` for the fallback rather than a
//! manual byte-to-char cast).

use std::collections::HashMap;
use std::path::Path;

use crate::db::SignalDB;
use crate::frame::Frame;
use crate::signal::Signal;
use crate::types::{DecoderError, Result};

/// Options recognised when loading a DBC file.
#[derive(Debug, Clone, Default)]
pub struct DbcLoadOptions {
    /// Name of a DBC signal attribute (`BA_ "..." SG_ ...`) whose value,
    /// when present on a signal, overrides that signal's name at load
    /// time. Applies per signal, not per message.
    pub use_custom_attribute: Option<String>,
}

/// Parse the DBC file at `path` into a [`SignalDB`]. The database is
/// untagged (`protocol() == None`); callers building a J1939 database
/// should tag it themselves after loading, since the DBC format itself
/// has no protocol marker.
pub fn load_dbc_file(path: &Path, options: &DbcLoadOptions) -> Result<SignalDB> {
    log::info!("loading DBC file {path:?}");

    let bytes = std::fs::read(path)
        .map_err(|e| DecoderError::DbcParseError(format!("failed to read {path:?}: {e}")))?;

    let content = match String::from_utf8(bytes.clone()) {
        Ok(s) => s,
        Err(_) => {
            log::warn!("DBC file {path:?} is not UTF-8, falling back to Latin-1");
            let (decoded, _, had_errors) = encoding_rs::WINDOWS_1252.decode(&bytes);
            if had_errors {
                return Err(DecoderError::DbcParseError(format!(
                    "failed to decode {path:?} as UTF-8 or Latin-1"
                )));
            }
            decoded.into_owned()
        }
    };

    let dbc = can_dbc::DBC::from_slice(content.as_bytes())
        .map_err(|e| DecoderError::DbcParseError(format!("failed to parse {path:?}: {e:?}")))?;

    let name_overrides = custom_attribute_overrides(&dbc, options);

    let mut db = SignalDB::new(None);
    for message in dbc.messages() {
        let frame = convert_message(message, &name_overrides)?;
        db.add_frame(frame);
    }

    log::info!("loaded {} frames from {path:?}", db.frames().count());
    Ok(db)
}

/// (message id, signal name) -> overriding name, from a `BA_` attribute
/// value matching `options.use_custom_attribute`.
fn custom_attribute_overrides(
    dbc: &can_dbc::DBC,
    options: &DbcLoadOptions,
) -> HashMap<(u32, String), String> {
    let mut overrides = HashMap::new();

    let Some(attribute_name) = options.use_custom_attribute.as_deref() else {
        return overrides;
    };

    for attr in dbc.attribute_values() {
        if attr.attribute_name != attribute_name {
            continue;
        }
        if let can_dbc::AttributeValuedForObjectType::SignalAttributeValue(id, signal_name, value) =
            &attr.attribute_value
        {
            overrides.insert((id.0, signal_name.clone()), attribute_value_to_string(value));
        }
    }

    overrides
}

fn attribute_value_to_string(value: &can_dbc::AttributeValue) -> String {
    match value {
        can_dbc::AttributeValue::AttributeValueU64(v) => v.to_string(),
        can_dbc::AttributeValue::AttributeValueI64(v) => v.to_string(),
        can_dbc::AttributeValue::AttributeValueF64(v) => v.to_string(),
        can_dbc::AttributeValue::AttributeValueCharString(v) => v.clone(),
        can_dbc::AttributeValue::AttributeValueHex(v) => v.to_string(),
    }
}

fn convert_message(
    message: &can_dbc::Message,
    name_overrides: &HashMap<(u32, String), String>,
) -> Result<Frame> {
    let id = message.message_id().0;
    let size = *message.message_size() as usize;

    let mut frame = Frame::new(id, size);
    let mut multiplexer: Option<Signal> = None;

    for dbc_signal in message.signals() {
        if matches!(
            dbc_signal.multiplexer_indicator(),
            can_dbc::MultiplexIndicator::Multiplexor
        ) {
            multiplexer = Some(convert_signal(id, dbc_signal, name_overrides)?);
            continue;
        }

        let signal = convert_signal(id, dbc_signal, name_overrides)?;

        match dbc_signal.multiplexer_indicator() {
            can_dbc::MultiplexIndicator::MultiplexedSignal(selector) => {
                let mux = multiplexer.as_mut().ok_or_else(|| {
                    DecoderError::DbcParseError(format!(
                        "frame 0x{id:08X}: multiplexed signal '{}' has no multiplexer",
                        dbc_signal.name()
                    ))
                })?;
                mux.add_child(*selector as u64, signal);
            }
            _ => frame.add_signal(signal)?,
        }
    }

    if let Some(mux) = multiplexer {
        frame.add_signal(mux)?;
    }

    Ok(frame)
}

fn convert_signal(
    message_id: u32,
    dbc_signal: &can_dbc::Signal,
    name_overrides: &HashMap<(u32, String), String>,
) -> Result<Signal> {
    let mut name = dbc_signal.name().to_string();
    if let Some(override_name) = name_overrides.get(&(message_id, name.clone())) {
        name = override_name.clone();
    }

    let is_little_endian = matches!(dbc_signal.byte_order(), can_dbc::ByteOrder::LittleEndian);
    let is_signed = matches!(dbc_signal.value_type(), can_dbc::ValueType::Signed);

    Signal::new(
        name,
        *dbc_signal.start_bit() as u16,
        *dbc_signal.signal_size() as u16,
        is_little_endian,
        is_signed,
        false,
        *dbc_signal.factor(),
        *dbc_signal.offset(),
    )
}
