use std::fmt;
use std::path::Path;

use super::cue::{CueError, CueSheet, CueTrackType};
use crate::sector::{SectorMode, SectorPart, RAW_SECTOR_SIZE};
use crate::state::DiscType;
use crate::toc::{pointer_word, Control, Toc, TocEntry};
use crate::utils::bcd::frames_to_bcd_msf;

/// 2 seconds of lead-in before the first track. FAD 150 is 00:02:00.
pub const PREGAP_FRAMES: u32 = 150;
pub const FRAMES_PER_SECOND: u32 = 75;

/// Each raw sector starts with 12 sync bytes.
const SECTOR_SYNC_BYTES: usize = 12;
/// Sync, address and mode.
const MODE1_HEADER: usize = 16;
/// Sync, address, mode and the XA subheader.
const MODE2_HEADER: usize = 24;

/// A position on the disc in minutes, seconds and frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Msf {
    pub minute: u8,
    pub second: u8,
    pub frame:  u8, // 75 frames per second
}

impl Msf {
    pub fn from_frames(frames: u32) -> Self {
        Self {
            minute: (frames / (60 * FRAMES_PER_SECOND)) as u8,
            second: ((frames / FRAMES_PER_SECOND) % 60) as u8,
            frame:  (frames % FRAMES_PER_SECOND) as u8,
        }
    }

    pub fn frames(&self) -> u32 {
        (self.minute as u32 * 60 + self.second as u32) * FRAMES_PER_SECOND + self.frame as u32
    }
}

impl fmt::Display for Msf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.minute, self.second, self.frame)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Mode1,
    /// XA data.
    Mode2,
}

impl TrackKind {
    pub fn control(self) -> Control {
        match self {
            TrackKind::Audio => Control::empty(),
            TrackKind::Mode1 | TrackKind::Mode2 => Control::Data,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimTrack {
    pub number: u8,
    pub kind:   TrackKind,
    /// FAD of index 01.
    pub start:  u32,
    /// In sectors.
    pub length: u32,
}

impl SimTrack {
    /// FAD one past the last sector.
    pub fn end(&self) -> u32 {
        self.start + self.length
    }
}

/// The layout and contents of a simulated disc.
///
/// Sector contents are generated from their address, so a disc of any size
/// costs nothing to hold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimDisc {
    tracks:     Vec<SimTrack>,
    leadout:    u32,
}

// Constructors
impl SimDisc {
    /// Lay the tracks end to end, starting at FAD 150.
    pub fn from_layout(layout: &[(TrackKind, u32)]) -> Self {
        let mut start = PREGAP_FRAMES;
        let tracks = layout.iter().enumerate().map(|(i, &(kind, length))| {
            let track = SimTrack { number: (i + 1) as u8, kind, start, length };
            start += length;
            track
        }).collect();
        Self::from_tracks(tracks)
    }

    /// Tracks at explicit positions. They are kept in address order.
    pub fn from_tracks(mut tracks: Vec<SimTrack>) -> Self {
        tracks.sort_by_key(|t| t.start);
        let leadout = tracks.iter().map(SimTrack::end).max().unwrap_or(PREGAP_FRAMES);
        Self { tracks, leadout }
    }

    /// A self-booting CD-R: an audio session, then a data session in XA
    /// format starting at FAD 11702.
    pub fn dreamcast_cdr() -> Self {
        Self::from_tracks(vec![
            SimTrack { number: 1, kind: TrackKind::Audio, start: PREGAP_FRAMES, length: 16 * FRAMES_PER_SECOND },
            SimTrack { number: 2, kind: TrackKind::Mode2, start: 11702, length: 20_000 },
        ])
    }

    /// Build from a parsed CUE sheet. `file_len` gives the length in bytes of
    /// each named FILE.
    pub fn from_cue_sheet(
        sheet: &CueSheet,
        mut file_len: impl FnMut(&str) -> std::io::Result<u64>,
    ) -> Result<Self, CueError> {
        if sheet.tracks.is_empty() {
            return Err(CueError::NoTracks);
        }

        let mut tracks = Vec::new();
        // FAD of the start of the current file.
        let mut base = PREGAP_FRAMES;
        let mut rest = sheet.tracks.as_slice();
        while let Some(first) = rest.first() {
            let count = rest.iter().take_while(|t| t.file_name == first.file_name).count();
            let (group, next) = rest.split_at(count);
            rest = next;

            let frames = (file_len(&first.file_name)? / first.track_type.sector_size()) as u32;
            for (i, track) in group.iter().enumerate() {
                base += track.pregap.map(|p| p.frames()).unwrap_or(0);
                let start = base + track.start_index().ok_or(CueError::MissingIndex(track.num))?.frames();
                let end = match group.get(i + 1) {
                    Some(next) => base + next.first_index().ok_or(CueError::MissingIndex(next.num))?.frames(),
                    None => base + frames,
                };
                if end <= start {
                    return Err(CueError::BadLayout(track.num));
                }
                tracks.push(SimTrack {
                    number: track.num,
                    kind:   track.track_type.kind(),
                    start,
                    length: end - start,
                });
            }
            base += frames;
        }

        Ok(Self { tracks, leadout: base })
    }

    /// Open a CUE sheet, taking file sizes from the files beside it.
    pub fn from_cue_file(path: &Path) -> Result<Self, CueError> {
        let folder_path = path.parent().ok_or_else(|| CueError::NoParentDir(path.display().to_string()))?;
        let sheet = CueSheet::parse_from_str(&std::fs::read_to_string(path)?)?;
        Self::from_cue_sheet(&sheet, |name| {
            Ok(std::fs::metadata(folder_path.join(name))?.len())
        })
    }
}

impl SimDisc {
    pub fn tracks(&self) -> &[SimTrack] {
        &self.tracks
    }

    pub fn leadout(&self) -> u32 {
        self.leadout
    }

    /// What the drive identifies the disc as.
    pub fn disc_type(&self) -> DiscType {
        let has = |kind| self.tracks.iter().any(|t| t.kind == kind);
        if has(TrackKind::Mode2) {
            DiscType::CdRomXa
        } else if has(TrackKind::Mode1) {
            DiscType::CdRom
        } else {
            DiscType::Cdda
        }
    }

    pub fn track(&self, number: u8) -> Option<&SimTrack> {
        self.tracks.iter().find(|t| t.number == number)
    }

    /// The track holding sector `fad`.
    pub fn track_at(&self, fad: u32) -> Option<&SimTrack> {
        self.tracks.iter().find(|t| t.start <= fad && fad < t.end())
    }

    pub fn toc(&self) -> Toc {
        let mut toc = Toc::default();
        for track in &self.tracks {
            if let Some(slot) = toc.entry.get_mut((track.number as usize).wrapping_sub(1)) {
                *slot = TocEntry { track: track.number, fad: track.start, adr: 1, control: track.kind.control() }.to_raw();
            }
        }
        if let (Some(first), Some(last)) = (self.tracks.first(), self.tracks.last()) {
            toc.first = pointer_word(first.number, 1, first.kind.control());
            toc.last = pointer_word(last.number, 1, last.kind.control());
            toc.leadout_sector = TocEntry { track: 0, fad: self.leadout, adr: 1, control: last.kind.control() }.to_raw();
        }
        toc
    }

    /// Generated user data byte `offset` of sector `fad`.
    pub fn payload_byte(fad: u32, offset: usize) -> u8 {
        (fad.wrapping_mul(31).wrapping_add(offset as u32 * 7) ^ (offset as u32 >> 8)) as u8
    }

    /// Write sector `fad` as the drive would present it in `mode`.
    ///
    /// Whole raw sectors of data tracks carry sync, address and mode ahead
    /// of the user data. Audio sectors are all samples.
    pub fn fill_sector(&self, fad: u32, mode: &SectorMode, out: &mut [u8]) {
        let kind = self.track_at(fad).map(|t| t.kind).unwrap_or(TrackKind::Audio);
        let raw = mode.part == SectorPart::WholeSector && mode.size == RAW_SECTOR_SIZE;
        let header = match kind {
            TrackKind::Mode1 if raw => MODE1_HEADER,
            TrackKind::Mode2 if raw => MODE2_HEADER,
            _ => 0,
        };

        let (head, data) = out.split_at_mut(header.min(out.len()));
        if header > 0 {
            head.fill(0);
            head[1..SECTOR_SYNC_BYTES - 1].fill(0xFF);
            head[SECTOR_SYNC_BYTES..SECTOR_SYNC_BYTES + 3].copy_from_slice(&frames_to_bcd_msf(fad));
            head[SECTOR_SYNC_BYTES + 3] = if kind == TrackKind::Mode1 { 1 } else { 2 };
        }
        for (i, b) in data.iter_mut().enumerate() {
            *b = Self::payload_byte(fad, i);
        }
    }
}

impl CueTrackType {
    fn kind(self) -> TrackKind {
        match self {
            CueTrackType::Audio => TrackKind::Audio,
            CueTrackType::Mode1_2048 | CueTrackType::Mode1_2352 => TrackKind::Mode1,
            CueTrackType::Mode2_2336 | CueTrackType::Mode2_2352 => TrackKind::Mode2,
        }
    }
}
