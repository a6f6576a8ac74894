//! The firmware side of the drive.
//!
//! The GD-ROM BIOS exposes an asynchronous command processor: commands are
//! queued with `send_command`, progress is made by calling `exec_server`
//! repeatedly, and each command is observed through `check_command` until it
//! reaches a terminal state. Everything in this crate talks to the drive
//! through the [`Syscalls`] trait.

use crate::sector::SectorMode;
use crate::toc::Toc;
use crate::utils::bcd::from_bcd;

/// Command codes understood by the firmware command processor.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandCode {
    CheckLicense    = 2,
    ReqSpiCmd       = 4,
    PioRead         = 16,
    DmaRead         = 17,
    GetToc          = 18,
    GetToc2         = 19,
    /// Play CDDA by track number.
    Play            = 20,
    /// Play CDDA by sector.
    Play2           = 21,
    Pause           = 22,
    /// Resume from pause.
    Release         = 23,
    Init            = 24,
    DmaAbort        = 25,
    OpenTray        = 26,
    Seek            = 27,
    DmaReadStream   = 28,
    Nop             = 29,
    ReqMode         = 30,
    SetMode         = 31,
    ScanCd          = 32,
    /// Stop the disc spinning.
    Stop            = 33,
    GetScd          = 34,
    GetSes          = 35,
    ReqStat         = 36,
    PioReadStream   = 37,
    DmaReadStreamEx = 38,
    PioReadStreamEx = 39,
    GetVers         = 40,
}

impl CommandCode {
    /// True for commands the firmware rejects when no usable disc is present.
    pub fn needs_disc(self) -> bool {
        use CommandCode::*;
        matches!(self,
            PioRead | DmaRead | GetToc | GetToc2 | Play | Play2 | Pause |
            Release | Seek | DmaReadStream | ScanCd | GetScd | GetSes |
            PioReadStream | DmaReadStreamEx | PioReadStreamEx
        )
    }
}

/// What `check_command` reports for a handle.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmdStatus {
    Failed      = -1,
    NotFound    = 0,
    Processing  = 1,
    Completed   = 2,
    Streaming   = 3,
    Busy        = 4,
}

impl CmdStatus {
    /// Decode a raw `check_command` return. Anything unknown counts as failed.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => CmdStatus::NotFound,
            1 => CmdStatus::Processing,
            2 => CmdStatus::Completed,
            3 => CmdStatus::Streaming,
            4 => CmdStatus::Busy,
            _ => CmdStatus::Failed,
        }
    }

    /// Processing and busy keep the poller going; everything else ends it.
    pub fn is_terminal(self) -> bool {
        !matches!(self, CmdStatus::Processing | CmdStatus::Busy)
    }
}

/// Bus state reported in the fourth word of the extended status.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AtaStatus {
    #[default]
    Internal    = 0,
    Irq         = 1,
    Drq0        = 2,
    Drq1        = 3,
    Busy        = 4,
}

/// Extra status filled in by `check_command`.
///
/// Only meaningful once a command has finished unsuccessfully.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtStatus {
    pub err1: i32,
    pub err2: i32,
    /// Bytes transferred so far.
    pub size: usize,
    pub ata: AtaStatus,
}

/// `err1` when there is no disc in the drive.
pub const ERR1_NO_DISC: i32 = 2;
/// `err1` when the disc was changed and the drive has not been reinitialised.
pub const ERR1_DISC_CHANGED: i32 = 6;
/// `err1` for a request the drive cannot satisfy (range, area, size).
pub const ERR1_ILLEGAL_REQUEST: i32 = 5;

/// A positive handle for one in-flight command.
///
/// Only the dispatcher creates these, and only from a successful submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CmdHandle(i32);

impl CmdHandle {
    pub(crate) fn from_raw(raw: i32) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

/// Disc areas the TOC can be read from.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Area {
    #[default]
    Low     = 0,
    High    = 1,
}

/// Params for [`CommandCode::PioRead`] and [`CommandCode::DmaRead`].
#[derive(Debug)]
pub struct ReadParams<'a> {
    /// First sector, as a FAD.
    pub start_sec:  u32,
    pub num_sec:    usize,
    pub buffer:     &'a mut [u8],
    pub is_test:    bool,
}

/// Params for [`CommandCode::Play`] and [`CommandCode::Play2`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayParams {
    pub start:  u32,
    pub end:    u32,
    /// 0-15, where 15 repeats forever.
    pub repeat: u32,
}

/// Subcode data selectable with [`CommandCode::GetScd`].
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubcodeType {
    QAll            = 0,
    QChannel        = 1,
    MediaCatalog    = 2,
    TrackIsrc       = 3,
    Reserved        = 4,
}

/// CDDA playback state, found in the second byte of a subcode report.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubcodeAudio {
    Invalid = 0x00,
    Playing = 0x11,
    Paused  = 0x12,
    Ended   = 0x13,
    Error   = 0x14,
    NoInfo  = 0x15,
}

impl SubcodeAudio {
    /// Read the audio status out of a subcode buffer.
    pub fn from_report(report: &[u8]) -> Option<Self> {
        match report.get(1)? {
            0x00 => Some(SubcodeAudio::Invalid),
            0x11 => Some(SubcodeAudio::Playing),
            0x12 => Some(SubcodeAudio::Paused),
            0x13 => Some(SubcodeAudio::Ended),
            0x14 => Some(SubcodeAudio::Error),
            0x15 => Some(SubcodeAudio::NoInfo),
            _ => None,
        }
    }
}

/// A decoded Q channel subcode report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QChannel {
    pub audio:      SubcodeAudio,
    pub control:    u8,
    pub adr:        u8,
    pub track:      u8,
    pub index:      u8,
    /// Frames into the track.
    pub relative:   u32,
    /// Frames from the start of the disc.
    pub absolute:   u32,
}

impl QChannel {
    /// Bytes in a Q channel report.
    pub const SIZE: usize = 14;

    pub fn from_report(report: &[u8]) -> Option<Self> {
        let report = report.get(..Self::SIZE)?;
        let frames = |msf: &[u8]| -> Option<u32> {
            let minute = from_bcd(msf[0])? as u32;
            let second = from_bcd(msf[1])? as u32;
            let frame = from_bcd(msf[2])? as u32;
            Some((minute * 60 + second) * 75 + frame)
        };
        Some(Self {
            audio:      SubcodeAudio::from_report(report)?,
            control:    report[4] >> 4,
            adr:        report[4] & 0xF,
            track:      from_bcd(report[5])?,
            index:      from_bcd(report[6])?,
            relative:   frames(&report[7..10])?,
            absolute:   frames(&report[11..14])?,
        })
    }
}

/// The parameter block handed to `send_command`. Its shape depends on the
/// command code.
#[derive(Debug)]
pub enum CommandParams<'a> {
    None,
    Read(ReadParams<'a>),
    Toc {
        area:   Area,
        buffer: &'a mut Toc,
    },
    Play(PlayParams),
    Subcode {
        which:  SubcodeType,
        buffer: &'a mut [u8],
    },
}

/// The asynchronous command processor in the BIOS.
///
/// Buffers in a [`CommandParams`] are borrowed by the caller for the whole
/// submit/poll cycle; implementations may only write to them from inside
/// `send_command`.
pub trait Syscalls {
    /// Bring the firmware's drive state up. Called once, before any command.
    fn init(&mut self);

    fn reset(&mut self);

    /// Queue a command. Returns a positive handle, 0 when the processor
    /// cannot accept a command right now, or a negative value on failure.
    fn send_command(&mut self, cmd: CommandCode, params: &mut CommandParams<'_>) -> i32;

    /// Do a slice of work on the queued command. Never blocks.
    fn exec_server(&mut self);

    /// Raw [`CmdStatus`] of a handle, and the extended status.
    fn check_command(&mut self, handle: CmdHandle) -> (i32, ExtStatus);

    /// Returns 0 if the command was aborted.
    fn abort_command(&mut self, handle: CmdHandle) -> i32;

    /// Raw return code and the `[status, disc type]` words of the drive.
    fn check_drive(&mut self) -> (i32, [i32; 2]);

    /// Set the sector mode used by read commands. Returns 0 on success.
    fn sector_mode(&mut self, params: [u32; 4]) -> i32;
}

/// Words for a "set" `sector_mode` call.
pub fn sector_mode_params(mode: &SectorMode) -> [u32; 4] {
    [0, mode.part as u32, mode.track_type as u32, mode.size]
}
