/// Turns raw telemetry rows into labeled, display-ready samples
use log::warn;

use crate::models::{DecodedSample, Field, LabeledField, RawSample};
use crate::packet::{self, DeviceKind, NOT_APPLICABLE};

/// Decode one raw sample
///
/// Every sample decodes on its own against the static registry. A field
/// that cannot be decoded keeps its raw value as [`Field::Degraded`]; the
/// rest of the sample is still decoded.
pub fn decode(raw: &RawSample) -> DecodedSample {
    let info = packet::lookup(raw.packet_type);
    let kind = DeviceKind::from_code(raw.packet_type);

    let mut fields = raw.values.map(Field::from_raw);
    let mut magnet_state = None;
    let mut event_label = None;

    match kind {
        Some(DeviceKind::Mag) => {
            magnet_state = packet::magnet_state(raw.status_bits);
            fields[0] = magnet_state.map_or(Field::Absent, |m| Field::Label(m.label()));
        }
        Some(DeviceKind::AppTwelite) => {
            fields[0] = match packet::dio_pattern(raw.values[0]) {
                Ok(Some(pattern)) => Field::Label(pattern),
                Ok(None) => fields[0],
                Err(e) => {
                    warn!(
                        "DIO value of sample at {} left undecoded: {}",
                        raw.timestamp, e
                    );
                    Field::Degraded(raw.values[0])
                }
            };
        }
        Some(DeviceKind::Cue) => {
            event_label = packet::cue_event_label(raw.event_code);
        }
        _ => {}
    }

    // Columns the device never fills are only listed when they carry data
    let values = fields
        .into_iter()
        .enumerate()
        .filter(|(slot, value)| info.labels[*slot] != NOT_APPLICABLE || !value.is_absent())
        .map(|(slot, value)| LabeledField {
            slot,
            label: info.labels[slot],
            value,
        })
        .collect();

    DecodedSample {
        timestamp: raw.timestamp,
        logical_id: raw.logical_id,
        link_quality: raw.link_quality,
        packet_type: raw.packet_type,
        info,
        values,
        supply_voltage_mv: raw.supply_voltage_mv,
        magnet_state,
        event_code: raw.event_code,
        event_label,
    }
}

/// Decode a batch, one failed field never affects the other samples
pub fn decode_all<'a, I>(samples: I) -> Vec<DecodedSample>
where
    I: IntoIterator<Item = &'a RawSample>,
{
    samples.into_iter().map(decode).collect()
}
