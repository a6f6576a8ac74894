use std::fmt::Display;
use std::io::BufRead;
use std::path::Path;

use gdrom::service::DriveClient;
use gdrom::sim::{Msf, SimDisc, Tray};
use gdrom::{Area, CddaMode, QChannel, ReadMode, SectorFormat, SubcodeType};

use crate::logger;

/// Bytes of each sector shown after a read.
const DUMP_LEN: usize = 16;
/// Largest single read buffer.
const MAX_READ_LEN: usize = 64 << 20;

pub fn run(client: &DriveClient, tray: &Tray, input: Box<dyn BufRead>, interactive: bool) {
    if interactive {
        println!("GD-ROM console.");
        println!("Enter 'h' for help.");
    }

    // Sector size of the last mode set, for sizing read buffers.
    let mut sector_size = 2048_usize;
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                println!("Input error: {}", e);
                break;
            }
        };
        let input = line.trim();
        if input.is_empty() || input.starts_with('#') {
            continue;
        }
        if !interactive {
            println!("> {}", input);
        }

        if input.starts_with("i") {
            timed("init", || client.init().map(|mode| {
                sector_size = mode.size as usize;
                format!("{:?} {:?}, {} bytes", mode.part, mode.track_type, mode.size)
            }));
        } else if input.starts_with("s") {
            timed("status", || client.status().map(|state| {
                format!("{:?}, {:?}", state.status, state.disc_type)
            }));
        } else if input.starts_with("t") {
            timed("toc", || client.read_toc(Area::Low).map(|toc| {
                let tracks = toc.tracks()
                    .map(|t| format!("  {:02} {:>6} {} {}",
                        t.track, t.fad, Msf::from_frames(t.fad), if t.is_data() { "data" } else { "audio" }))
                    .collect::<Vec<_>>()
                    .join("\n");
                let data = toc.locate_data_track()
                    .map_or("no data track".to_string(), |fad| format!("data track at {}", fad));
                format!("tracks {}-{}, lead-out {}, {}\n{}",
                    toc.first_track(), toc.last_track(), toc.leadout(), data, tracks)
            }));
        } else if input.starts_with("r:") {
            // Read sectors
            match parse_read(&input[2..]).and_then(|(fad, count)| Ok((fad, count, buffer_len(count, sector_size)?))) {
                Ok((fad, count, len)) => timed("read", || {
                    client.read_sectors(vec![0; len], fad, count, ReadMode::Pio)
                        .map(|buffer| dump(&buffer, sector_size, fad))
                }),
                Err(e) => println!("Invalid read: {}", e),
            }
        } else if input.starts_with("m:") {
            // Sector size
            match input[2..].trim().parse::<u32>() {
                Ok(size) => timed("mode", || client.reinit(SectorFormat::with_size(size)).map(|mode| {
                    sector_size = mode.size as usize;
                    format!("{:?} {:?}, {} bytes", mode.part, mode.track_type, mode.size)
                })),
                Err(e) => println!("Invalid size: {}", e),
            }
        } else if input.starts_with("m") {
            timed("reinit", || client.reinit(SectorFormat::default()).map(|mode| {
                sector_size = mode.size as usize;
                format!("{:?} {:?}, {} bytes", mode.part, mode.track_type, mode.size)
            }));
        } else if input.starts_with("p:") || input.starts_with("P:") {
            // Play tracks, or sectors with 'P'
            let mode = if input.starts_with('p') { CddaMode::Tracks } else { CddaMode::Sectors };
            match parse_play(&input[2..]) {
                Ok((start, end, repeat)) => timed("play", || client.cdda_play(start, end, repeat, mode).map(|_| "playing")),
                Err(e) => println!("Invalid play: {}", e),
            }
        } else if input.starts_with("z") {
            timed("pause", || client.cdda_pause().map(|_| "paused"));
        } else if input.starts_with("u") {
            timed("resume", || client.cdda_resume().map(|_| "resumed"));
        } else if input.starts_with("x") {
            timed("stop", || client.spin_down().map(|_| "stopped"));
        } else if input.starts_with("c") {
            timed("subcode", || client.subcode(SubcodeType::QChannel, QChannel::SIZE).map(|report| {
                match QChannel::from_report(&report) {
                    Some(q) => format!("{:?}, track {} index {}, {} into track, {} absolute",
                        q.audio, q.track, q.index, q.relative, q.absolute),
                    None => "malformed Q channel report".to_string(),
                }
            }));
        } else if input.starts_with("e") {
            tray.eject();
        } else if input.starts_with("l:") {
            // Load a CUE sheet
            let path = Path::new(input[2..].trim());
            match SimDisc::from_cue_file(path) {
                Ok(disc) => tray.insert(disc),
                Err(e) => println!("Could not load {}: {}", path.display(), e),
            }
        } else if input.starts_with("l") {
            tray.insert(SimDisc::dreamcast_cdr());
        } else if input.starts_with("v:") {
            match input[2..].trim().parse::<log::LevelFilter>() {
                Ok(level) => logger::set_level(level),
                Err(e) => println!("Invalid level: {}", e),
            }
        } else if input.starts_with("h") {
            help();
        } else if input.starts_with("q") {
            break;
        } else {
            println!("Unknown command '{}'. Enter 'h' for help.", input);
        }
    }
}

/// Run a drive request and report how long it took.
fn timed<T: Display, E: Display>(what: &str, request: impl FnOnce() -> Result<T, E>) {
    let start = chrono::Utc::now();
    let result = request();
    let elapsed = (chrono::Utc::now() - start).num_milliseconds();
    match result {
        Ok(out) => println!("{}: {} ({} ms)", what, out, elapsed),
        Err(e) => println!("{} failed: {} ({} ms)", what, e, elapsed),
    }
}

/// "fad" or "fad,count"
fn parse_read(args: &str) -> Result<(u32, usize), String> {
    let mut parts = args.trim().split(',');
    let fad = parts.next()
        .ok_or("missing sector")?
        .trim().parse::<u32>().map_err(|e| e.to_string())?;
    let count = match parts.next() {
        Some(count) => count.trim().parse::<usize>().map_err(|e| e.to_string())?,
        None => 1,
    };
    if count == 0 {
        return Err("count must be at least 1".to_string());
    }
    Ok((fad, count))
}

/// Bytes needed for `count` sectors.
fn buffer_len(count: usize, sector_size: usize) -> Result<usize, String> {
    count.checked_mul(sector_size)
        .filter(|&len| len <= MAX_READ_LEN)
        .ok_or_else(|| format!("{} sectors of {} bytes is too much to read at once", count, sector_size))
}

/// "start-end" or "start-end,repeat"
fn parse_play(args: &str) -> Result<(u32, u32, u32), String> {
    let (range, repeat) = match args.trim().split_once(',') {
        Some((range, repeat)) => (range, repeat.trim().parse::<u32>().map_err(|e| e.to_string())?),
        None => (args.trim(), 0),
    };
    let (start, end) = range.split_once('-').ok_or("expected start-end")?;
    let start = start.trim().parse::<u32>().map_err(|e| e.to_string())?;
    let end = end.trim().parse::<u32>().map_err(|e| e.to_string())?;
    Ok((start, end, repeat))
}

fn dump(buffer: &[u8], sector_size: usize, fad: u32) -> String {
    buffer.chunks(sector_size.max(1))
        .zip(fad..)
        .map(|(sector, fad)| {
            let bytes = sector.iter()
                .take(DUMP_LEN)
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<_>>()
                .join(" ");
            format!("\n  {:>6}: {}", fad, bytes)
        })
        .collect()
}

fn help() {
    println!("i: Init the drive (reset and reinit).");
    println!("s: Print drive status and disc type.");
    println!("t: Print the table of contents.");
    println!("r:x[,n]: Read n sectors (default 1) from FAD x.");
    println!("m:x: Reinit with a sector size of x bytes.");
    println!("m: Reinit with the default sector format.");
    println!("p:x-y[,r]: Play tracks x to y, repeating r times (15 loops forever).");
    println!("P:x-y[,r]: Play sectors x to y.");
    println!("z: Pause playback.");
    println!("u: Resume playback.");
    println!("x: Stop playback and spin down.");
    println!("c: Print the Q channel.");
    println!("e: Eject the disc.");
    println!("l:path: Insert the disc described by a CUE sheet.");
    println!("l: Insert the sample disc.");
    println!("v:level: Set log level (error, warn, info, debug, trace).");
    println!("h: Print this help.");
    println!("q: Quit.");
}
