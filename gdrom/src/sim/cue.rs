use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use super::disc::Msf;

static FILE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^FILE\s+"(.*?)"\s+(BINARY|MOTOROLA|WAVE)$"#).unwrap()
});
static TRACK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^TRACK\s+([0-9]{1,2})\s+([A-Z0-9/]+)$").unwrap()
});
static INDEX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^INDEX\s+([0-9]{1,2})\s+([0-9]{2}):([0-9]{2}):([0-9]{2})$").unwrap()
});
static PREGAP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^PREGAP\s+([0-9]{2}):([0-9]{2}):([0-9]{2})$").unwrap()
});

/// Commands that carry nothing the drive model needs.
const IGNORED: &[&str] = &[
    "REM", "TITLE", "PERFORMER", "SONGWRITER", "CATALOG", "CDTEXTFILE",
    "FLAGS", "ISRC", "POSTGAP",
];

#[derive(Debug, Error)]
pub enum CueError {
    #[error("could not read CUE sheet: {0}")]
    Io(#[from] std::io::Error),
    #[error("CUE sheet path has no parent directory: {0}")]
    NoParentDir(String),
    #[error("invalid FILE line: {0}")]
    InvalidFile(String),
    #[error("invalid TRACK line: {0}")]
    InvalidTrack(String),
    #[error("invalid INDEX line: {0}")]
    InvalidIndex(String),
    #[error("invalid PREGAP line: {0}")]
    InvalidPregap(String),
    #[error("unsupported track type: {0}")]
    UnsupportedTrackType(String),
    #[error("TRACK line before any FILE: {0}")]
    TrackWithoutFile(String),
    #[error("INDEX or PREGAP line outside a TRACK: {0}")]
    OutsideTrack(String),
    #[error("unrecognised line: {0}")]
    Unrecognised(String),
    #[error("track {0} has no INDEX 01")]
    MissingIndex(u8),
    #[error("track {0} does not fit in its file")]
    BadLayout(u8),
    #[error("CUE sheet has no tracks")]
    NoTracks,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CueTrackType {
    Audio,
    Mode1_2048,
    Mode1_2352,
    Mode2_2336,
    Mode2_2352,
}

impl CueTrackType {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "AUDIO" => CueTrackType::Audio,
            "MODE1/2048" => CueTrackType::Mode1_2048,
            "MODE1/2352" => CueTrackType::Mode1_2352,
            "MODE2/2336" => CueTrackType::Mode2_2336,
            "MODE2/2352" => CueTrackType::Mode2_2352,
            _ => return None,
        })
    }

    /// Bytes per sector in the image file.
    pub fn sector_size(self) -> u64 {
        match self {
            CueTrackType::Mode1_2048 => 2048,
            CueTrackType::Mode2_2336 => 2336,
            CueTrackType::Audio | CueTrackType::Mode1_2352 | CueTrackType::Mode2_2352 => 2352,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Index {
    pub num:    u8,
    /// Relative to the start of the file.
    pub start:  Msf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CueTrack {
    pub num:        u8,
    pub file_name:  String,
    pub track_type: CueTrackType,
    /// Silence that is not stored in the file.
    pub pregap:     Option<Msf>,
    pub indices:    Vec<Index>,
}

impl CueTrack {
    /// INDEX 01, where the track proper begins.
    pub fn start_index(&self) -> Option<Msf> {
        self.indices.iter().find(|i| i.num == 1).map(|i| i.start)
    }

    /// The earliest index, which is where the track's data begins in the file.
    pub fn first_index(&self) -> Option<Msf> {
        self.indices.iter().min_by_key(|i| i.num).map(|i| i.start)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CueSheet {
    pub tracks: Vec<CueTrack>,
}

impl CueSheet {
    pub fn parse_from_str(s: &str) -> Result<CueSheet, CueError> {
        let mut tracks: Vec<CueTrack> = Vec::new();
        let mut file_name: Option<String> = None;
        // Whether the last TRACK still belongs to the current FILE.
        let mut in_track = false;

        for line in s.lines().map(str::trim) {
            if line.is_empty() || IGNORED.iter().any(|c| line.split_whitespace().next() == Some(c)) {
                continue;
            }

            if line.starts_with("FILE") {
                let caps = FILE_REGEX.captures(line).ok_or_else(|| CueError::InvalidFile(line.to_string()))?;
                file_name = Some(caps[1].to_string());
                in_track = false;
            } else if line.starts_with("TRACK") {
                let caps = TRACK_REGEX.captures(line).ok_or_else(|| CueError::InvalidTrack(line.to_string()))?;
                let file_name = file_name.clone().ok_or_else(|| CueError::TrackWithoutFile(line.to_string()))?;
                let num = caps[1].parse().map_err(|_| CueError::InvalidTrack(line.to_string()))?;
                let track_type = CueTrackType::parse(&caps[2])
                    .ok_or_else(|| CueError::UnsupportedTrackType(caps[2].to_string()))?;
                tracks.push(CueTrack {
                    num,
                    file_name,
                    track_type,
                    pregap: None,
                    indices: Vec::new(),
                });
                in_track = true;
            } else if line.starts_with("INDEX") {
                let caps = INDEX_REGEX.captures(line).ok_or_else(|| CueError::InvalidIndex(line.to_string()))?;
                let track = tracks.last_mut().filter(|_| in_track)
                    .ok_or_else(|| CueError::OutsideTrack(line.to_string()))?;
                let msf = parse_msf(&caps[2], &caps[3], &caps[4])
                    .ok_or_else(|| CueError::InvalidIndex(line.to_string()))?;
                track.indices.push(Index {
                    num: caps[1].parse().map_err(|_| CueError::InvalidIndex(line.to_string()))?,
                    start: msf,
                });
            } else if line.starts_with("PREGAP") {
                let caps = PREGAP_REGEX.captures(line).ok_or_else(|| CueError::InvalidPregap(line.to_string()))?;
                let track = tracks.last_mut().filter(|_| in_track)
                    .ok_or_else(|| CueError::OutsideTrack(line.to_string()))?;
                track.pregap = Some(parse_msf(&caps[1], &caps[2], &caps[3])
                    .ok_or_else(|| CueError::InvalidPregap(line.to_string()))?);
            } else {
                return Err(CueError::Unrecognised(line.to_string()));
            }
        }

        if tracks.is_empty() {
            return Err(CueError::NoTracks);
        }
        Ok(CueSheet { tracks })
    }
}

/// Decimal mm:ss:ff.
fn parse_msf(minute: &str, second: &str, frame: &str) -> Option<Msf> {
    let msf = Msf {
        minute: minute.parse().ok()?,
        second: second.parse().ok()?,
        frame:  frame.parse().ok()?,
    };
    (msf.second < 60 && msf.frame < 75).then_some(msf)
}
