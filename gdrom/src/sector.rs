//! How the drive presents each sector to read commands.
//!
//! Callers may leave any part of the format unspecified. Those parts are
//! resolved here, against the disc currently in the drive, before anything
//! reaches the firmware: it has no notion of defaults.

use crate::state::DiscType;

/// A whole raw sector, including sync and header.
pub const RAW_SECTOR_SIZE: u32 = 2352;
/// User data of a mode 1 or mode 2 form 1 sector.
pub const DATA_SECTOR_SIZE: u32 = 2048;

/// Which part of a sector reads return.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SectorPart {
    WholeSector = 0x1000,
    DataArea    = 0x2000,
}

/// How a track is interpreted when reading.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackType {
    Any         = 0x0000,
    Cdda        = 0x0200,
    Mode1       = 0x0400,
    Mode2       = 0x0600,
    Mode2Form1  = 0x0800,
    Mode2Form2  = 0x0a00,
    Mode2NonXa  = 0x0c00,
    Unknown     = 0x0e00,
}

impl SectorPart {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0x1000 => Some(SectorPart::WholeSector),
            0x2000 => Some(SectorPart::DataArea),
            _ => None,
        }
    }
}

impl TrackType {
    pub fn from_raw(raw: u32) -> Option<Self> {
        use TrackType::*;
        Some(match raw {
            0x0000 => Any,
            0x0200 => Cdda,
            0x0400 => Mode1,
            0x0600 => Mode2,
            0x0800 => Mode2Form1,
            0x0a00 => Mode2Form2,
            0x0c00 => Mode2NonXa,
            0x0e00 => Unknown,
            _ => return None,
        })
    }
}

/// A requested sector format. `None` leaves the choice to the driver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SectorFormat {
    pub part:       Option<SectorPart>,
    pub track_type: Option<TrackType>,
    /// Sector size in bytes.
    pub size:       Option<u32>,
}

impl SectorFormat {
    pub fn new(part: SectorPart, track_type: TrackType, size: u32) -> Self {
        Self {
            part:       Some(part),
            track_type: Some(track_type),
            size:       Some(size),
        }
    }

    /// Only the size is given; everything else follows from it.
    pub fn with_size(size: u32) -> Self {
        Self {
            size: Some(size),
            ..Self::default()
        }
    }

    /// Raw whole-sector reads do not care what kind of disc is in.
    /// Everything else with a default track type does.
    pub fn needs_disc_type(&self) -> bool {
        self.size != Some(RAW_SECTOR_SIZE) && self.track_type.is_none()
    }
}

/// A fully resolved format, as handed to the firmware.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SectorMode {
    pub part:       SectorPart,
    pub track_type: TrackType,
    pub size:       u32,
}

impl SectorMode {
    /// Fill in the defaults of `format`.
    ///
    /// `disc_type` is only called when the track type depends on the disc.
    /// If it cannot tell, the disc is treated as plain CD-ROM.
    pub fn resolve(format: SectorFormat, disc_type: impl FnOnce() -> Option<DiscType>) -> Self {
        if format.size == Some(RAW_SECTOR_SIZE) {
            return Self {
                part:       format.part.unwrap_or(SectorPart::WholeSector),
                track_type: format.track_type.unwrap_or(TrackType::Any),
                size:       RAW_SECTOR_SIZE,
            };
        }

        let track_type = format.track_type.unwrap_or_else(|| match disc_type() {
            Some(DiscType::CdRomXa) => TrackType::Mode2Form1,
            _ => TrackType::Mode1,
        });
        Self {
            part:       format.part.unwrap_or(SectorPart::DataArea),
            track_type,
            size:       format.size.unwrap_or(DATA_SECTOR_SIZE),
        }
    }

    /// Decode "set" parameter words of a `sector_mode` call.
    pub fn from_params(params: [u32; 4]) -> Option<Self> {
        if params[0] != 0 {
            return None;
        }
        Some(Self {
            part:       SectorPart::from_raw(params[1])?,
            track_type: TrackType::from_raw(params[2])?,
            size:       params[3],
        })
    }
}

impl Default for SectorMode {
    /// What the drive uses straight after initialisation.
    fn default() -> Self {
        Self {
            part:       SectorPart::DataArea,
            track_type: TrackType::Mode1,
            size:       DATA_SECTOR_SIZE,
        }
    }
}
