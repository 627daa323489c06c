/// Decoders for the device specific encodings carried in raw sample fields
use std::fmt;
use thiserror::Error;

const MAGNET_VALID: u32 = 0x1000_0000;
const MAGNET_SHIFT: u32 = 24;
const MAGNET_MASK: u32 = 0x3;

/// Input levels of DI1..DI4 for every 4-bit pattern, a set bit reads as L
const DIO_PATTERNS: [&str; 16] = [
    "H/H/H/H", "L/H/H/H", "H/L/H/H", "L/L/H/H", "H/H/L/H", "L/H/L/H", "H/L/L/H", "L/L/L/H",
    "H/H/H/L", "L/H/H/L", "H/L/H/L", "L/L/H/L", "H/H/L/L", "L/H/L/L", "H/L/L/L", "L/L/L/L",
];

/// Why a field could not be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("field is missing")]
    Missing,
    #[error("field is not a finite number")]
    NotFinite,
}

/// Pole seen by a magnet sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagnetState {
    NoMagnet,
    North,
    South,
}

impl MagnetState {
    pub fn label(self) -> &'static str {
        match self {
            MagnetState::NoMagnet => "none",
            MagnetState::North => "N-pole",
            MagnetState::South => "S-pole",
        }
    }
}

impl fmt::Display for MagnetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Gesture and orientation events reported by CUE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueEvent {
    Face(u8),
    Shake,
    Move,
}

impl CueEvent {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1..=6 => Some(CueEvent::Face(code as u8)),
            8 => Some(CueEvent::Shake),
            16 => Some(CueEvent::Move),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CueEvent::Face(1) => "face 1",
            CueEvent::Face(2) => "face 2",
            CueEvent::Face(3) => "face 3",
            CueEvent::Face(4) => "face 4",
            CueEvent::Face(5) => "face 5",
            CueEvent::Face(_) => "face 6",
            CueEvent::Shake => "shake",
            CueEvent::Move => "move",
        }
    }
}

/// Magnet state from the status bitfield
///
/// Bit 28 flags a valid reading, bits 24-25 hold the pole. Pole code 3 is
/// undetermined and decodes to `None`, same as a missing reading.
pub fn magnet_state(status_bits: u32) -> Option<MagnetState> {
    if status_bits & MAGNET_VALID == 0 {
        return None;
    }
    match (status_bits >> MAGNET_SHIFT) & MAGNET_MASK {
        0 => Some(MagnetState::NoMagnet),
        1 => Some(MagnetState::North),
        2 => Some(MagnetState::South),
        _ => None,
    }
}

/// Digital input pattern of an App_TWELITE sample
///
/// The raw value is truncated toward zero first. `Ok(None)` means the value is
/// outside 0..=15 and should be shown as is.
pub fn dio_pattern(raw: Option<f64>) -> Result<Option<&'static str>, FieldError> {
    let value = raw.ok_or(FieldError::Missing)?;
    if !value.is_finite() {
        return Err(FieldError::NotFinite);
    }
    let bits = value.trunc();
    if (0.0..=15.0).contains(&bits) {
        Ok(Some(DIO_PATTERNS[bits as usize]))
    } else {
        Ok(None)
    }
}

/// Label of a CUE event code, `None` for codes outside the event table
pub fn cue_event_label(event_code: i32) -> Option<&'static str> {
    CueEvent::from_code(event_code).map(CueEvent::label)
}
