//! Purpose: Open set-management sessions whose output streams to a host-supplied sink.
//! Exports: `Sink`, `WriterSink`, `EmissionBridge`, `OutputMode`, `SessionLibrary`, `Session`,
//! `open_xml_session`.
//! Role: Session Output Adapter between the underlying library's print hook and the host.
//! Invariants: One sink call per emission, in emission order, with the fragment bytes unchanged.
//! Invariants: The output mode is configured before the session is handed out and has no setter.
//! Invariants: Emission always reports `EMIT_OK`; sink failures stay inside the sink.
//! Notes: The bridge only carries pre-rendered strings; it is not a general formatter.
//! Notes: Fragments are raw bytes; set names and comments need not be UTF-8.
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use bstr::ByteSlice;
use tracing::{debug, trace, warn};

use crate::core::error::{Error, ErrorKind};

/// Status returned to the underlying library for every emission.
pub const EMIT_OK: i32 = 0;

/// Receives complete output fragments from a session.
///
/// Implementations must not let failures escape: the library's print hook has no error path,
/// so anything the sink cannot handle is lost.
pub trait Sink: Send + Sync {
    fn write_fragment(&self, fragment: &[u8]);
}

impl<F> Sink for F
where
    F: Fn(&[u8]) + Send + Sync,
{
    fn write_fragment(&self, fragment: &[u8]) {
        self(fragment)
    }
}

/// Sink that writes each fragment to an `io::Write`, logging and dropping write errors.
pub struct WriterSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn flush(&self) -> io::Result<()> {
        self.lock().flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock(&self) -> MutexGuard<'_, W> {
        self.writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> Sink for WriterSink<W> {
    fn write_fragment(&self, fragment: &[u8]) {
        if let Err(err) = self.lock().write_all(fragment) {
            warn!(error = %err, len = fragment.len(), "dropping session output fragment");
        }
    }
}

/// Forwards library emissions to the session's sink.
#[derive(Clone)]
pub struct EmissionBridge {
    sink: Arc<dyn Sink>,
}

impl EmissionBridge {
    pub fn new(sink: Arc<dyn Sink>) -> Self {
        Self { sink }
    }

    /// Deliver one pre-rendered fragment. Always returns `EMIT_OK`.
    pub fn emit(&self, fragment: &[u8]) -> i32 {
        trace!(len = fragment.len(), fragment = %fragment.as_bstr(), "session emission");
        self.sink.write_fragment(fragment);
        EMIT_OK
    }
}

impl fmt::Debug for EmissionBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmissionBridge").finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OutputMode {
    Plain,
    Save,
    Xml,
}

impl OutputMode {
    pub fn as_raw(self) -> i32 {
        match self {
            OutputMode::Plain => 0,
            OutputMode::Save => 1,
            OutputMode::Xml => 2,
        }
    }
}

/// The set-management library a session is opened against.
///
/// The handle's teardown belongs to the implementation (typically its `Drop`); the adapter
/// never destroys a handle itself.
pub trait SessionLibrary {
    type Handle;

    /// Allocate a session whose print hook calls `bridge`. `None` when allocation fails.
    fn init_session(&self, bridge: EmissionBridge) -> Option<Self::Handle>;

    fn set_output_mode(&self, handle: &mut Self::Handle, mode: OutputMode) -> Result<(), Error>;
}

/// An open session in a fixed output mode. The handle owns the bridge feeding the sink.
#[derive(Debug)]
pub struct Session<H> {
    handle: H,
    mode: OutputMode,
}

impl<H> Session<H> {
    pub fn output_mode(&self) -> OutputMode {
        self.mode
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

}

/// Open a session on `library` that streams XML listings to `sink`.
pub fn open_xml_session<L: SessionLibrary>(
    library: &L,
    sink: Arc<dyn Sink>,
) -> Result<Session<L::Handle>, Error> {
    let bridge = EmissionBridge::new(sink);
    let Some(mut handle) = library.init_session(bridge) else {
        return Err(Error::new(ErrorKind::SessionInit)
            .with_message("failed to initialize ipset session"));
    };
    library.set_output_mode(&mut handle, OutputMode::Xml)?;
    debug!("opened xml session");
    Ok(Session {
        handle,
        mode: OutputMode::Xml,
    })
}
