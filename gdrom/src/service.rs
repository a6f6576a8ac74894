//! A drive owned by its own thread.
//!
//! Callers hold a [`DriveClient`] and talk to the drive over a channel. The
//! service runs requests one at a time in arrival order, and stops once every
//! client is gone.

use std::thread::JoinHandle;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use crate::{
    Area, CddaMode, Cdrom, CdError, CdResult, Clock, DriveState, ReadMode,
    SectorFormat, SectorMode, SubcodeType, Syscalls, Toc,
};

type Reply<T = ()> = Sender<CdResult<T>>;

enum Request {
    Init(Reply<SectorMode>),
    Status(Reply<DriveState>),
    Reinit(SectorFormat, Reply<SectorMode>),
    ReadToc(Area, Reply<Toc>),
    ReadSectors {
        buffer: Vec<u8>,
        sector: u32,
        count:  usize,
        mode:   ReadMode,
        reply:  Reply<Vec<u8>>,
    },
    Subcode {
        which:  SubcodeType,
        len:    usize,
        reply:  Reply<Vec<u8>>,
    },
    Play {
        start:  u32,
        end:    u32,
        repeat: u32,
        mode:   CddaMode,
        reply:  Reply,
    },
    Pause(Reply),
    Resume(Reply),
    SpinDown(Reply),
}

pub struct DriveService;

impl DriveService {
    /// Move `cdrom` onto a new thread.
    ///
    /// The thread hands the drive back when it finishes.
    pub fn spawn<S, C>(cdrom: Cdrom<S, C>) -> (DriveClient, JoinHandle<Cdrom<S, C>>)
        where S: Syscalls + Send + 'static, C: Clock + Send + 'static
    {
        let (requests, rx) = unbounded();
        let handle = std::thread::spawn(move || serve(cdrom, rx));
        (DriveClient { requests }, handle)
    }
}

fn serve<S: Syscalls, C: Clock>(cdrom: Cdrom<S, C>, requests: Receiver<Request>) -> Cdrom<S, C> {
    log::debug!("drive service started");
    // Replies are dropped if the client stopped waiting.
    while let Ok(request) = requests.recv() {
        match request {
            Request::Init(reply) => {
                let _ = reply.send(cdrom.init());
            },
            Request::Status(reply) => {
                let _ = reply.send(cdrom.get_status());
            },
            Request::Reinit(format, reply) => {
                let _ = reply.send(cdrom.reinit_ex(format));
            },
            Request::ReadToc(area, reply) => {
                let _ = reply.send(cdrom.read_toc(area));
            },
            Request::ReadSectors { mut buffer, sector, count, mode, reply } => {
                let result = cdrom.read_sectors_ex(&mut buffer, sector, count, mode);
                let _ = reply.send(result.map(|_| buffer));
            },
            Request::Subcode { which, len, reply } => {
                let mut buffer = vec![0; len];
                let result = cdrom.get_subcode(&mut buffer, which);
                let _ = reply.send(result.map(|_| buffer));
            },
            Request::Play { start, end, repeat, mode, reply } => {
                let _ = reply.send(cdrom.cdda_play(start, end, repeat, mode));
            },
            Request::Pause(reply) => {
                let _ = reply.send(cdrom.cdda_pause());
            },
            Request::Resume(reply) => {
                let _ = reply.send(cdrom.cdda_resume());
            },
            Request::SpinDown(reply) => {
                let _ = reply.send(cdrom.spin_down());
            },
        }
    }
    log::debug!("all drive clients gone, stopping");
    cdrom
}

/// A handle on a running [`DriveService`].
///
/// A service that has stopped answers everything with [`CdError::System`].
#[derive(Clone)]
pub struct DriveClient {
    requests: Sender<Request>,
}

impl DriveClient {
    fn call<T>(&self, request: impl FnOnce(Reply<T>) -> Request) -> CdResult<T> {
        let (reply, response) = bounded(1);
        if self.requests.send(request(reply)).is_err() {
            log::warn!("drive service is not running");
            return Err(CdError::System);
        }
        response.recv().unwrap_or(Err(CdError::System))
    }

    pub fn init(&self) -> CdResult<SectorMode> {
        self.call(Request::Init)
    }

    pub fn status(&self) -> CdResult<DriveState> {
        self.call(Request::Status)
    }

    pub fn reinit(&self, format: SectorFormat) -> CdResult<SectorMode> {
        self.call(|reply| Request::Reinit(format, reply))
    }

    pub fn read_toc(&self, area: Area) -> CdResult<Toc> {
        self.call(|reply| Request::ReadToc(area, reply))
    }

    /// Read into `buffer`, which is handed back filled.
    pub fn read_sectors(&self, buffer: Vec<u8>, sector: u32, count: usize, mode: ReadMode) -> CdResult<Vec<u8>> {
        self.call(|reply| Request::ReadSectors { buffer, sector, count, mode, reply })
    }

    /// Up to `len` bytes of subcode.
    pub fn subcode(&self, which: SubcodeType, len: usize) -> CdResult<Vec<u8>> {
        self.call(|reply| Request::Subcode { which, len, reply })
    }

    pub fn cdda_play(&self, start: u32, end: u32, repeat: u32, mode: CddaMode) -> CdResult {
        self.call(|reply| Request::Play { start, end, repeat, mode, reply })
    }

    pub fn cdda_pause(&self) -> CdResult {
        self.call(Request::Pause)
    }

    pub fn cdda_resume(&self) -> CdResult {
        self.call(Request::Resume)
    }

    pub fn spin_down(&self) -> CdResult {
        self.call(Request::SpinDown)
    }
}
