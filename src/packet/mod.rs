pub mod bitfield;
pub mod registry;

pub use bitfield::{cue_event_label, dio_pattern, magnet_state, CueEvent, FieldError, MagnetState};
pub use registry::{lookup, resolve_name, DeviceKind, PacketTypeInfo, FALLBACK, NOT_APPLICABLE};
