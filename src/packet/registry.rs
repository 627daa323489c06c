/// Static schema table for every packet type the gateway records
use std::fmt;

/// Device name and the labels of the four raw value columns of one packet type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketTypeInfo {
    pub device_name: &'static str,
    pub labels: [&'static str; 4],
}

/// Label used for value columns a device family never fills
pub const NOT_APPLICABLE: &str = "N/A";

/// Returned for packet types that have no registry entry
pub const FALLBACK: PacketTypeInfo = PacketTypeInfo {
    device_name: "UNKNOWN",
    labels: ["VAL", "VAL1", "VAL2", "VAL3"],
};

const MAG: PacketTypeInfo = PacketTypeInfo {
    device_name: "MAG",
    labels: ["MAG", NOT_APPLICABLE, NOT_APPLICABLE, NOT_APPLICABLE],
};

const PAL_AMB: PacketTypeInfo = PacketTypeInfo {
    device_name: "PAL AMB",
    labels: ["TEMP[C]", "HUMID[%]", "LUMI[lx]", NOT_APPLICABLE],
};

const PAL_MOT: PacketTypeInfo = PacketTypeInfo {
    device_name: "PAL MOT",
    labels: ["X[G]", "Y[G]", "Z[G]", NOT_APPLICABLE],
};

const CUE: PacketTypeInfo = PacketTypeInfo {
    device_name: "CUE",
    labels: ["X[G]", "Y[G]", "Z[G]", NOT_APPLICABLE],
};

const ARIA: PacketTypeInfo = PacketTypeInfo {
    device_name: "ARIA",
    labels: ["TEMP[C]", "HUMID[%]", NOT_APPLICABLE, NOT_APPLICABLE],
};

const APP_TWELITE: PacketTypeInfo = PacketTypeInfo {
    device_name: "App_TWELITE",
    labels: ["DI1/2/3/4", "AD1[V]", "AD2[V]", "AD3[V]"],
};

/// Sensor device families known to the registry, discriminant is the packet type code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DeviceKind {
    Mag = 1,
    PalAmb = 2,
    PalMot = 3,
    Cue = 5,
    Aria = 6,
    AppTwelite = 257,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 6] = [
        DeviceKind::Mag,
        DeviceKind::PalAmb,
        DeviceKind::PalMot,
        DeviceKind::Cue,
        DeviceKind::Aria,
        DeviceKind::AppTwelite,
    ];

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    /// Reverse lookup from the symbolic name (`"CUE"`, `"APPTWELITE"`, ...)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            DeviceKind::Mag => "MAG",
            DeviceKind::PalAmb => "PAL_AMB",
            DeviceKind::PalMot => "PAL_MOT",
            DeviceKind::Cue => "CUE",
            DeviceKind::Aria => "ARIA",
            DeviceKind::AppTwelite => "APPTWELITE",
        }
    }

    pub fn info(self) -> &'static PacketTypeInfo {
        match self {
            DeviceKind::Mag => &MAG,
            DeviceKind::PalAmb => &PAL_AMB,
            DeviceKind::PalMot => &PAL_MOT,
            DeviceKind::Cue => &CUE,
            DeviceKind::Aria => &ARIA,
            DeviceKind::AppTwelite => &APP_TWELITE,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.info().device_name)
    }
}

/// Resolve the schema of a packet type code, unknown codes get [`FALLBACK`]
pub fn lookup(packet_type: i32) -> &'static PacketTypeInfo {
    DeviceKind::from_code(packet_type)
        .map(DeviceKind::info)
        .unwrap_or(&FALLBACK)
}

/// Numeric code for a symbolic device name
pub fn resolve_name(name: &str) -> Option<i32> {
    DeviceKind::from_name(name).map(DeviceKind::code)
}
