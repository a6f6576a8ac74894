//! The table of contents, as the GETTOC2 command leaves it.
//!
//! The buffer is a fixed firmware layout: 99 little-endian 32-bit track
//! entries followed by the first track, last track and lead-out words.
//! Every word packs a FAD in bits 0-23, the ADR in bits 24-27 and the control
//! nibble in bits 28-31. In the first/last words bits 16-23 hold the track.


use crate::utils::bits::*;

pub const TOC_ENTRIES: usize = 99;
/// Size of the TOC buffer in bytes.
pub const TOC_SIZE: usize = (TOC_ENTRIES + 3) * 4;

bitflags::bitflags! {
    /// Control nibble of a TOC entry.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Control: u8 {
        const PreEmphasis   = bit!(0);
        const CopyPermitted = bit!(1);
        const Data          = bit!(2);
        const FourChannel   = bit!(3);
    }
}

/// A decoded TOC word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TocEntry {
    pub track:      u8,
    pub fad:        u32,
    pub adr:        u8,
    pub control:    Control,
}

impl TocEntry {
    /// Decode the raw entry of `track`.
    pub const fn from_raw(track: u8, raw: u32) -> Self {
        Self {
            track,
            fad:        fad_of(raw),
            adr:        field(raw, 24, 4) as u8,
            control:    Control::from_bits_truncate(field(raw, 28, 4) as u8),
        }
    }

    pub const fn to_raw(&self) -> u32 {
        pack(self.fad, 0, 24) | pack(self.adr as u32, 24, 4) | pack(self.control.bits() as u32, 28, 4)
    }

    /// A data track has a control nibble of exactly 4.
    pub fn is_data(&self) -> bool {
        self.control == Control::Data
    }
}

const fn fad_of(raw: u32) -> u32 {
    field(raw, 0, 24)
}

const fn track_of(raw: u32) -> u32 {
    field(raw, 16, 8)
}

/// A pointer word (first/last track) referring to `track`.
pub const fn pointer_word(track: u8, adr: u8, control: Control) -> u32 {
    pack(track as u32, 16, 8) | pack(adr as u32, 24, 4) | pack(control.bits() as u32, 28, 4)
}

#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toc {
    pub entry:          [u32; TOC_ENTRIES],
    /// Point A0: first track.
    pub first:          u32,
    /// Point A1: last track.
    pub last:           u32,
    /// Point A2: lead-out.
    pub leadout_sector: u32,
}

impl Default for Toc {
    fn default() -> Self {
        Self {
            entry:          [0; TOC_ENTRIES],
            first:          0,
            last:           0,
            leadout_sector: 0,
        }
    }
}

impl Toc {
    /// Parse the firmware buffer. `None` if it is too short.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let data = data.get(..TOC_SIZE)?;
        let mut words = data.chunks_exact(4)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]));
        let mut toc = Toc::default();
        for (entry, word) in toc.entry.iter_mut().zip(&mut words) {
            *entry = word;
        }
        toc.first = words.next()?;
        toc.last = words.next()?;
        toc.leadout_sector = words.next()?;
        Some(toc)
    }

    pub fn to_bytes(&self) -> [u8; TOC_SIZE] {
        let mut data = [0; TOC_SIZE];
        let words = self.entry.iter().chain([&self.first, &self.last, &self.leadout_sector]);
        for (out, word) in data.chunks_exact_mut(4).zip(words) {
            out.copy_from_slice(&word.to_le_bytes());
        }
        data
    }

    pub fn first_track(&self) -> u8 {
        track_of(self.first) as u8
    }

    pub fn last_track(&self) -> u8 {
        track_of(self.last) as u8
    }

    pub fn leadout(&self) -> u32 {
        fad_of(self.leadout_sector)
    }

    /// First and last track, if they describe a usable range.
    pub fn track_range(&self) -> Option<(u8, u8)> {
        let first = track_of(self.first);
        let last = track_of(self.last);
        if first < 1 || last > TOC_ENTRIES as u32 || first > last {
            None
        } else {
            Some((first as u8, last as u8))
        }
    }

    /// Entry for track number `track` (1-99).
    pub fn track(&self, track: u8) -> Option<TocEntry> {
        let raw = *self.entry.get((track as usize).checked_sub(1)?)?;
        Some(TocEntry::from_raw(track, raw))
    }

    /// Entries from the first to the last track. Empty if the range is bad.
    pub fn tracks(&self) -> impl DoubleEndedIterator<Item = TocEntry> + '_ {
        let (first, last) = self.track_range().unwrap_or((1, 0));
        (first..=last).filter_map(|t| self.track(t))
    }

    /// FAD of the data track to read from.
    ///
    /// The last data track wins, so a multisession disc resolves to its final
    /// session. `None` for a malformed TOC or one without data tracks.
    pub fn locate_data_track(&self) -> Option<u32> {
        self.tracks()
            .rev()
            .find(TocEntry::is_data)
            .map(|e| e.fad)
    }
}
