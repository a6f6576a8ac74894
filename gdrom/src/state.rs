/// Drive condition, as reported by `check_drive`.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriveStatus {
    /// The status could not be read.
    ReadFail    = -1,
    Busy        = 0,
    Paused      = 1,
    Standby     = 2,
    Playing     = 3,
    Seeking     = 4,
    Scanning    = 5,
    /// Tray open.
    Open        = 6,
    NoDisc      = 7,
    /// A retry is needed.
    Retry       = 8,
    Error       = 9,
    /// The syscalls need a reset.
    Fatal       = 12,
}

impl DriveStatus {
    pub fn from_raw(raw: i32) -> Option<Self> {
        use DriveStatus::*;
        Some(match raw {
            -1 => ReadFail,
            0 => Busy,
            1 => Paused,
            2 => Standby,
            3 => Playing,
            4 => Seeking,
            5 => Scanning,
            6 => Open,
            7 => NoDisc,
            8 => Retry,
            9 => Error,
            12 => Fatal,
            _ => return None,
        })
    }
}

/// Disc formats the drive can identify.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscType {
    /// Red book audio, also reported with no disc.
    Cdda    = 0x00,
    CdRom   = 0x10,
    CdRomXa = 0x20,
    Cdi     = 0x30,
    GdRom   = 0x80,
    /// The syscalls need a reset.
    Fail    = 0xf0,
}

impl DiscType {
    pub fn from_raw(raw: i32) -> Option<Self> {
        use DiscType::*;
        Some(match raw {
            0x00 => Cdda,
            0x10 => CdRom,
            0x20 => CdRomXa,
            0x30 => Cdi,
            0x80 => GdRom,
            0xf0 => Fail,
            _ => return None,
        })
    }
}

/// A fresh reading of the drive. Never cached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DriveState {
    pub status:     DriveStatus,
    pub disc_type:  DiscType,
}

impl DriveState {
    /// Decode the two words returned by `check_drive`.
    pub fn from_words(words: [i32; 2]) -> Option<Self> {
        Some(Self {
            status:     DriveStatus::from_raw(words[0])?,
            disc_type:  DiscType::from_raw(words[1])?,
        })
    }
}
