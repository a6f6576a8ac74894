use super::*;

use crate::clock::VirtualClock;
use crate::command::{run, CMD_RETRY_MAX};
use crate::error::{CdError, CdResult};
use crate::sector::{SectorPart, RAW_SECTOR_SIZE};
use crate::syscalls::sector_mode_params;
use crate::toc::Toc;

fn controller(disc: Option<SimDisc>) -> SimController {
    let config = SimConfig { latency: 2 };
    match disc {
        Some(disc) => SimController::with_disc(config, disc),
        None => SimController::new(config),
    }
}

fn exec(sim: &mut SimController, cmd: CommandCode, params: &mut CommandParams<'_>) -> CdResult {
    run(sim, &VirtualClock::new(1), cmd, params, 0, CMD_RETRY_MAX)
}

fn init(sim: &mut SimController) -> CdResult {
    exec(sim, CommandCode::Init, &mut CommandParams::None)
}

fn read(sim: &mut SimController, start: u32, count: usize, buffer: &mut [u8]) -> CdResult {
    exec(sim, CommandCode::PioRead, &mut CommandParams::Read(ReadParams {
        start_sec: start,
        num_sec: count,
        buffer,
        is_test: false,
    }))
}

fn q_channel(sim: &mut SimController) -> SubcodeAudio {
    let mut report = [0; Q_CHANNEL_SIZE];
    exec(sim, CommandCode::GetScd, &mut CommandParams::Subcode {
        which: SubcodeType::QChannel,
        buffer: &mut report,
    }).expect("subcode");
    SubcodeAudio::from_report(&report).expect("audio status")
}

#[test]
fn init_reports_disc_changes_once() {
    let mut sim = controller(None);
    assert_eq!(init(&mut sim), Err(CdError::NoDisc));

    sim.tray().insert(SimDisc::dreamcast_cdr());
    assert_eq!(init(&mut sim), Err(CdError::DiscChanged));
    assert_eq!(init(&mut sim), Ok(()));
    assert_eq!(sim.stats().inits, 3);
}

#[test]
fn disc_commands_need_a_settled_disc() {
    let mut sim = controller(Some(SimDisc::dreamcast_cdr()));
    let mut buffer = [0; 2048];
    assert_eq!(read(&mut sim, 11702, 1, &mut buffer), Ok(()));

    sim.tray().eject();
    assert_eq!(read(&mut sim, 11702, 1, &mut buffer), Err(CdError::NoDisc));

    sim.tray().insert(SimDisc::dreamcast_cdr());
    assert_eq!(read(&mut sim, 11702, 1, &mut buffer), Err(CdError::DiscChanged));
    // Spinning down works without a usable disc.
    assert_eq!(exec(&mut sim, CommandCode::Stop, &mut CommandParams::None), Ok(()));
}

#[test]
fn toc_describes_the_disc() {
    let disc = SimDisc::dreamcast_cdr();
    assert_eq!(disc.disc_type(), DiscType::CdRomXa);

    let mut sim = controller(Some(disc.clone()));
    let mut toc = Toc::default();
    exec(&mut sim, CommandCode::GetToc2, &mut CommandParams::Toc {
        area: Area::Low,
        buffer: &mut toc,
    }).expect("low density area");

    assert_eq!(toc, disc.toc());
    assert_eq!(toc.track_range(), Some((1, 2)));
    assert_eq!(toc.locate_data_track(), Some(11702));
    assert_eq!(toc.leadout(), disc.leadout());

    let result = exec(&mut sim, CommandCode::GetToc2, &mut CommandParams::Toc {
        area: Area::High,
        buffer: &mut toc,
    });
    assert_eq!(result, Err(CdError::System));
}

#[test]
fn data_reads_follow_the_sector_mode() {
    let mut sim = controller(Some(SimDisc::dreamcast_cdr()));
    let mut data = vec![0; 2 * 2048];
    read(&mut sim, 11702, 2, &mut data).expect("cooked read");
    assert_eq!(data[0], SimDisc::payload_byte(11702, 0));
    assert_eq!(data[2048 + 100], SimDisc::payload_byte(11703, 100));

    let raw = SectorMode { part: SectorPart::WholeSector, track_type: TrackType::Any, size: RAW_SECTOR_SIZE };
    assert_eq!(sim.sector_mode(sector_mode_params(&raw)), 0);
    let mut sector = vec![0; 2352];
    read(&mut sim, 11702, 1, &mut sector).expect("raw read");

    assert_eq!(&sector[..12], &[0, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0]);
    // 11702 frames is 02:36:02.
    assert_eq!(&sector[12..16], &[0x02, 0x36, 0x02, 0x02]);
    assert_eq!(&sector[24..24 + 2048], &data[..2048]);
}

#[test]
fn bad_reads_are_refused() {
    let disc = SimDisc::dreamcast_cdr();
    let leadout = disc.leadout();
    let mut sim = controller(Some(disc));
    let mut buffer = vec![0; 4 * 2048];

    assert_eq!(read(&mut sim, leadout - 1, 2, &mut buffer), Err(CdError::System));
    assert_eq!(read(&mut sim, 11702, 5, &mut buffer), Err(CdError::System));
    assert_eq!(read(&mut sim, 11702, 0, &mut buffer), Err(CdError::System));
    // An audio track read as data.
    assert_eq!(read(&mut sim, 150, 1, &mut buffer), Err(CdError::System));
}

#[test]
fn sector_mode_rejects_impossible_sizes() {
    let mut sim = controller(None);
    let mut mode = SectorMode::default();
    mode.size = 4096;
    assert_eq!(sim.sector_mode(sector_mode_params(&mode)), -1);
    assert_eq!(sim.sector_mode([1, 0x2000, 0x400, 2048]), -1);
    assert_eq!(sim.stats().mode_sets, 0);

    mode.size = 2336;
    assert_eq!(sim.sector_mode(sector_mode_params(&mode)), 0);
    assert_eq!(sim.mode(), mode);
}

#[test]
fn refused_submits_are_retried() {
    let mut sim = controller(Some(SimDisc::dreamcast_cdr()));
    sim.refuse_submits(3);
    assert_eq!(exec(&mut sim, CommandCode::Nop, &mut CommandParams::None), Ok(()));
    assert_eq!(sim.stats().submits, 4);
    assert_eq!(sim.stats().refused, 3);

    sim.refuse_submits(CMD_RETRY_MAX);
    assert_eq!(exec(&mut sim, CommandCode::Nop, &mut CommandParams::None), Err(CdError::System));
}

#[test]
fn stalled_command_times_out_and_frees_the_processor() {
    let mut sim = controller(Some(SimDisc::dreamcast_cdr()));
    sim.set_stall(true);
    let clock = VirtualClock::new(10);
    let result = run(&mut sim, &clock, CommandCode::Seek, &mut CommandParams::None, 100, CMD_RETRY_MAX);
    assert_eq!(result, Err(CdError::Timeout));
    assert_eq!(sim.stats().aborts, 1);

    sim.set_stall(false);
    assert_eq!(exec(&mut sim, CommandCode::Nop, &mut CommandParams::None), Ok(()));
}

#[test]
fn drive_status_tracks_the_tray() {
    let mut sim = controller(None);
    assert_eq!(sim.check_drive(), (0, [DriveStatus::NoDisc as i32, DiscType::Cdda as i32]));

    sim.tray().insert(SimDisc::from_layout(&[(TrackKind::Mode1, 1000)]));
    sim.report_busy(2);
    assert_eq!(sim.check_drive().0, CmdStatus::Busy as i32);
    assert_eq!(sim.check_drive().0, CmdStatus::Busy as i32);
    assert_eq!(sim.check_drive(), (0, [DriveStatus::Standby as i32, DiscType::CdRom as i32]));
}

#[test]
fn cdda_playback_states() {
    let mut sim = SimController::with_disc(SimConfig { latency: 0 }, SimDisc::dreamcast_cdr());
    assert_eq!(q_channel(&mut sim), SubcodeAudio::NoInfo);

    let mut play = CommandParams::Play(PlayParams { start: 1, end: 1, repeat: 0 });
    assert_eq!(exec(&mut sim, CommandCode::Play, &mut play), Ok(()));
    assert_eq!(q_channel(&mut sim), SubcodeAudio::Playing);
    assert_eq!(sim.check_drive().1[0], DriveStatus::Playing as i32);

    exec(&mut sim, CommandCode::Pause, &mut CommandParams::None).unwrap();
    assert_eq!(q_channel(&mut sim), SubcodeAudio::Paused);
    exec(&mut sim, CommandCode::Release, &mut CommandParams::None).unwrap();
    assert_eq!(q_channel(&mut sim), SubcodeAudio::Playing);
    exec(&mut sim, CommandCode::Stop, &mut CommandParams::None).unwrap();
    assert_eq!(q_channel(&mut sim), SubcodeAudio::NoInfo);

    // Track 9 is not on the disc.
    let mut play = CommandParams::Play(PlayParams { start: 1, end: 9, repeat: 0 });
    assert_eq!(exec(&mut sim, CommandCode::Play, &mut play), Err(CdError::System));
}

#[test]
fn track_numbers_do_not_wrap() {
    let mut sim = SimController::with_disc(SimConfig { latency: 0 }, SimDisc::dreamcast_cdr());
    // 257 and 258 would be tracks 1 and 2 if cut down to a byte.
    let mut play = CommandParams::Play(PlayParams { start: 257, end: 258, repeat: 0 });
    assert_eq!(exec(&mut sim, CommandCode::Play, &mut play), Err(CdError::System));
    let mut play = CommandParams::Play(PlayParams { start: 1, end: 258, repeat: 0 });
    assert_eq!(exec(&mut sim, CommandCode::Play, &mut play), Err(CdError::System));
    assert_eq!(q_channel(&mut sim), SubcodeAudio::NoInfo);
}

#[test]
fn msf_of_a_frame_count() {
    let msf = Msf::from_frames(11702);
    assert_eq!(msf, Msf { minute: 2, second: 36, frame: 2 });
    assert_eq!(msf.frames(), 11702);
    assert_eq!(msf.to_string(), "02:36:02");
    assert_eq!(Msf::from_frames(PREGAP_FRAMES).to_string(), "00:02:00");
}

#[test]
fn sector_playback_ends_after_its_repeats() {
    let mut sim = SimController::with_disc(SimConfig { latency: 0 }, SimDisc::dreamcast_cdr());
    let mut play = CommandParams::Play(PlayParams { start: 150, end: 160, repeat: 1 });
    assert_eq!(exec(&mut sim, CommandCode::Play2, &mut play), Ok(()));

    // Once through, then once more.
    for _ in 0..15 {
        sim.exec_server();
    }
    assert_eq!(q_channel(&mut sim), SubcodeAudio::Playing);
    for _ in 0..10 {
        sim.exec_server();
    }
    assert_eq!(q_channel(&mut sim), SubcodeAudio::Ended);
}

#[test]
fn q_channel_reports_position() {
    let mut sim = SimController::with_disc(SimConfig { latency: 0 }, SimDisc::dreamcast_cdr());
    let mut play = CommandParams::Play(PlayParams { start: 225, end: 300, repeat: 0 });
    exec(&mut sim, CommandCode::Play2, &mut play).unwrap();

    let mut report = [0; Q_CHANNEL_SIZE];
    exec(&mut sim, CommandCode::GetScd, &mut CommandParams::Subcode {
        which: SubcodeType::QChannel,
        buffer: &mut report,
    }).unwrap();
    assert_eq!(report[3], Q_CHANNEL_SIZE as u8);

    let q = QChannel::from_report(&report).expect("well formed report");
    assert_eq!(q.audio, SubcodeAudio::Playing);
    assert_eq!((q.control, q.adr, q.track, q.index), (0, 1, 1, 1));
    assert!((226..300).contains(&q.absolute));
    assert_eq!(q.relative, q.absolute - 150);
}

mod cue_sheets {
    use super::*;

    const SPLIT: &str = r#"
REM GENRE Game
FILE "track01.bin" BINARY
  TRACK 01 AUDIO
    INDEX 01 00:00:00
FILE "track02.bin" BINARY
  TRACK 02 MODE2/2352
    PREGAP 00:02:00
    INDEX 01 00:00:00
"#;

    const SINGLE: &str = r#"
FILE "game.bin" BINARY
  TRACK 01 MODE1/2352
    FLAGS DCP
    INDEX 01 00:00:00
  TRACK 02 AUDIO
    INDEX 00 00:10:00
    INDEX 01 00:12:00
"#;

    fn sizes(name: &str) -> std::io::Result<u64> {
        match name {
            "track01.bin" => Ok(2352 * 300),
            "track02.bin" => Ok(2352 * 1000),
            "game.bin" => Ok(2352 * 2000),
            _ => Err(std::io::ErrorKind::NotFound.into()),
        }
    }

    #[test]
    fn parses_tracks_and_indices() {
        let sheet = CueSheet::parse_from_str(SINGLE).expect("valid sheet");
        assert_eq!(sheet.tracks.len(), 2);
        let audio = &sheet.tracks[1];
        assert_eq!(audio.num, 2);
        assert_eq!(audio.file_name, "game.bin");
        assert_eq!(audio.track_type, CueTrackType::Audio);
        assert_eq!(audio.first_index(), Some(Msf { minute: 0, second: 10, frame: 0 }));
        assert_eq!(audio.start_index(), Some(Msf { minute: 0, second: 12, frame: 0 }));
    }

    #[test]
    fn files_are_laid_out_in_order() {
        let sheet = CueSheet::parse_from_str(SPLIT).unwrap();
        let disc = SimDisc::from_cue_sheet(&sheet, sizes).expect("layout");
        assert_eq!(disc.tracks(), &[
            SimTrack { number: 1, kind: TrackKind::Audio, start: 150, length: 300 },
            SimTrack { number: 2, kind: TrackKind::Mode2, start: 600, length: 1000 },
        ]);
        assert_eq!(disc.leadout(), 1600);
        assert_eq!(disc.disc_type(), DiscType::CdRomXa);
        assert_eq!(disc.toc().locate_data_track(), Some(600));
    }

    #[test]
    fn tracks_sharing_a_file() {
        let sheet = CueSheet::parse_from_str(SINGLE).unwrap();
        let disc = SimDisc::from_cue_sheet(&sheet, sizes).unwrap();
        assert_eq!(disc.tracks(), &[
            SimTrack { number: 1, kind: TrackKind::Mode1, start: 150, length: 750 },
            SimTrack { number: 2, kind: TrackKind::Audio, start: 1050, length: 1100 },
        ]);
        // Index 00 of track 2 is in neither track.
        assert_eq!(disc.track_at(950), None);
        assert_eq!(disc.disc_type(), DiscType::CdRom);
    }

    #[test]
    fn malformed_sheets() {
        let err = CueSheet::parse_from_str("TRACK 01 AUDIO\n").unwrap_err();
        assert!(matches!(err, CueError::TrackWithoutFile(_)));

        let err = CueSheet::parse_from_str("FILE \"a.bin\" BINARY\n  TRACK 01 MODE2/2048\n").unwrap_err();
        assert!(matches!(err, CueError::UnsupportedTrackType(t) if t == "MODE2/2048"));

        let err = CueSheet::parse_from_str("FILE \"a.bin\" BINARY\n  INDEX 01 00:00:00\n").unwrap_err();
        assert!(matches!(err, CueError::OutsideTrack(_)));

        let err = CueSheet::parse_from_str("FILE \"a.bin\" BINARY\n  TRACK 01 AUDIO\n    INDEX 01 00:61:00\n").unwrap_err();
        assert!(matches!(err, CueError::InvalidIndex(_)));

        assert!(matches!(CueSheet::parse_from_str("REM nothing\n"), Err(CueError::NoTracks)));
    }

    #[test]
    fn layout_errors() {
        let sheet = CueSheet::parse_from_str("FILE \"track01.bin\" BINARY\n  TRACK 01 AUDIO\n    INDEX 00 00:00:00\n").unwrap();
        assert!(matches!(SimDisc::from_cue_sheet(&sheet, sizes), Err(CueError::MissingIndex(1))));

        let sheet = CueSheet::parse_from_str("FILE \"missing.bin\" BINARY\n  TRACK 01 AUDIO\n    INDEX 01 00:00:00\n").unwrap();
        assert!(matches!(SimDisc::from_cue_sheet(&sheet, sizes), Err(CueError::Io(_))));

        // INDEX 01 past the end of the file.
        let sheet = CueSheet::parse_from_str("FILE \"track01.bin\" BINARY\n  TRACK 01 AUDIO\n    INDEX 01 00:05:00\n").unwrap();
        assert!(matches!(SimDisc::from_cue_sheet(&sheet, sizes), Err(CueError::BadLayout(1))));
    }
}
