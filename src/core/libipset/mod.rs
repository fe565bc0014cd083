//! Purpose: Bind the session adapter and argument resolver to the system libipset.
//! Exports: `LibIpset`, `RawSession`, `RawSetType`, `RawArg`, `load_types`.
//! Role: External collaborator binding for real hosts; compiled with the `libipset` feature.
//! Invariants: All FFI interaction is confined to this module + `sys`.
//! Invariants: One libipset session is open per process at a time; later opens wait for it.
//! Invariants: The print hook only reaches the sink of the open session.
//! Invariants: Sink panics are caught before they can unwind into C.
//! Notes: The argument-table layout is fixed at build time via `cfg(ipset_keyword_args)`.
use std::ffi::{CStr, CString};
use std::marker::PhantomData;
use std::os::raw::{c_char, c_int};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::ptr::NonNull;
use std::sync::{Arc, Mutex, MutexGuard, Once};

use tracing::{debug, warn};

use crate::core::args::{
    ArgRecord, ArgumentList, Command, DirectArgs, Keyword, KeywordArgs, SetTypeArgs,
};
use crate::core::command::{ElementRequest, bind_options, validate_set_name};
use crate::core::error::{Error, ErrorKind};
use crate::core::output::{
    EMIT_OK, EmissionBridge, OutputMode, Session, SessionLibrary, Sink, open_xml_session,
};

pub mod sys;

static LOAD_TYPES: Once = Once::new();
static SESSION_LOCK: Mutex<()> = Mutex::new(());
static ACTIVE_BRIDGE: Mutex<Option<EmissionBridge>> = Mutex::new(None);

/// Register libipset's built-in set types. Runs once per process.
pub fn load_types() {
    LOAD_TYPES.call_once(|| unsafe { sys::ipset_bridge_load_types() });
}

fn active_bridge() -> MutexGuard<'static, Option<EmissionBridge>> {
    ACTIVE_BRIDGE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Print hook target; called by the C shim with the single rendered string argument.
#[unsafe(no_mangle)]
pub extern "C" fn ipset_bridge_emit(fragment: *const c_char) -> c_int {
    if fragment.is_null() {
        return EMIT_OK;
    }
    let bytes = unsafe { CStr::from_ptr(fragment) }.to_bytes();
    let Some(bridge) = active_bridge().clone() else {
        warn!(len = bytes.len(), "dropping emission outside of an open session");
        return EMIT_OK;
    };
    if catch_unwind(AssertUnwindSafe(|| bridge.emit(bytes))).is_err() {
        warn!(len = bytes.len(), "session sink panicked; fragment dropped");
    }
    EMIT_OK
}

/// Holds the session lock while `bridge` is the print-hook target; clears the target on drop.
#[derive(Debug)]
struct ActiveBridge {
    _lock: MutexGuard<'static, ()>,
}

impl ActiveBridge {
    fn install(bridge: EmissionBridge) -> Self {
        let lock = SESSION_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *active_bridge() = Some(bridge);
        Self { _lock: lock }
    }
}

impl Drop for ActiveBridge {
    fn drop(&mut self) {
        active_bridge().take();
    }
}

fn command_id(command: Command) -> c_int {
    match command {
        Command::Add => sys::IPSET_BRIDGE_ADD,
        Command::Del => sys::IPSET_BRIDGE_DEL,
        Command::Test => sys::IPSET_BRIDGE_TEST,
    }
}

fn c_string(value: &str, what: &str) -> Result<CString, Error> {
    CString::new(value).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("{what} contains NUL"))
            .with_source(err)
    })
}

#[derive(Debug)]
pub struct LibIpset {
    _private: (),
}

impl Default for LibIpset {
    fn default() -> Self {
        Self::new()
    }
}

impl LibIpset {
    pub fn new() -> Self {
        load_types();
        Self { _private: () }
    }

    pub fn open_xml_session(&self, sink: Arc<dyn Sink>) -> Result<Session<RawSession>, Error> {
        open_xml_session(self, sink)
    }

    /// Stream the XML listing of one set (or all sets) to `sink`.
    pub fn list(&self, set_name: Option<&str>, sink: Arc<dyn Sink>) -> Result<(), Error> {
        let session = self.open_xml_session(sink)?;
        let raw = session.handle();
        if let Some(name) = set_name {
            validate_set_name(name)?;
            raw.parse_setname(name)?;
        }
        raw.run(sys::IPSET_BRIDGE_LIST, "list")?;
        debug!(set = set_name.unwrap_or("*"), "listed ipsets");
        Ok(())
    }

    pub fn add(&self, request: &ElementRequest, sink: Arc<dyn Sink>) -> Result<(), Error> {
        self.execute(Command::Add, request, sink)
    }

    pub fn del(&self, request: &ElementRequest, sink: Arc<dyn Sink>) -> Result<(), Error> {
        self.execute(Command::Del, request, sink)
    }

    pub fn test(&self, request: &ElementRequest, sink: Arc<dyn Sink>) -> Result<(), Error> {
        self.execute(Command::Test, request, sink)
    }

    pub fn execute(
        &self,
        command: Command,
        request: &ElementRequest,
        sink: Arc<dyn Sink>,
    ) -> Result<(), Error> {
        let session = self.open_xml_session(sink)?;
        let raw = session.handle();
        if request.exist {
            raw.enable_exist()?;
        }
        raw.parse_setname(&request.set_name)?;
        let set_type = raw.set_type(command)?;
        raw.parse_elem(&set_type, &request.element)?;
        for option in bind_options(&set_type, command, &request.options)? {
            raw.call_parser(option.arg, option.key, option.value)?;
        }
        raw.run(command_id(command), command.as_str())?;
        debug!(
            command = command.as_str(),
            set = %request.set_name,
            element = %request.element,
            "ipset command completed"
        );
        Ok(())
    }
}

impl SessionLibrary for LibIpset {
    type Handle = RawSession;

    fn init_session(&self, bridge: EmissionBridge) -> Option<RawSession> {
        let active = ActiveBridge::install(bridge);
        let Some(ptr) = NonNull::new(unsafe { sys::ipset_bridge_session_init() }) else {
            warn!("libipset could not allocate a session");
            return None;
        };
        debug!("opened libipset session");
        Some(RawSession {
            ptr,
            _active: active,
        })
    }

    fn set_output_mode(&self, handle: &mut RawSession, mode: OutputMode) -> Result<(), Error> {
        let ret = unsafe { sys::ipset_bridge_session_output(handle.as_ptr(), mode.as_raw()) };
        handle.check(ret, ErrorKind::Internal, "failed to set session output mode")
    }
}

/// An open libipset session. Dropping it finalizes the session and releases the session lock.
#[derive(Debug)]
pub struct RawSession {
    ptr: NonNull<sys::ipset_session>,
    _active: ActiveBridge,
}

impl RawSession {
    fn as_ptr(&self) -> *mut sys::ipset_session {
        self.ptr.as_ptr()
    }

    fn library_error(&self, kind: ErrorKind, message: &str, code: c_int) -> Error {
        let err = Error::new(kind).with_code(code);
        let report = unsafe { sys::ipset_bridge_session_error(self.as_ptr()) };
        if report.is_null() {
            return err.with_message(message);
        }
        let report = unsafe { CStr::from_ptr(report) }.to_string_lossy();
        match report.trim() {
            "" => err.with_message(message),
            report => err.with_message(format!("{message}: {report}")),
        }
    }

    fn check(&self, ret: c_int, kind: ErrorKind, message: &str) -> Result<(), Error> {
        if ret == 0 {
            return Ok(());
        }
        Err(self.library_error(kind, message, ret))
    }

    /// Ignore "element already added" / "element not in set" conditions.
    pub fn enable_exist(&self) -> Result<(), Error> {
        let ret = unsafe { sys::ipset_bridge_envopt_exist(self.as_ptr()) };
        self.check(ret, ErrorKind::Internal, "failed to set exist option")
    }

    pub fn parse_setname(&self, name: &str) -> Result<(), Error> {
        let c_name = c_string(name, "set name")?;
        let ret = unsafe { sys::ipset_bridge_parse_setname(self.as_ptr(), c_name.as_ptr()) };
        self.check(
            ret,
            ErrorKind::Usage,
            &format!("failed to parse setname '{name}'"),
        )
    }

    /// Type of the set named by `parse_setname`, as needed for `command`.
    pub fn set_type(&self, command: Command) -> Result<RawSetType<'_>, Error> {
        let ptr = unsafe { sys::ipset_bridge_type_get(self.as_ptr(), command_id(command)) };
        if let Some(ptr) = NonNull::new(ptr.cast_mut()) {
            return Ok(RawSetType {
                ptr,
                _session: PhantomData,
            });
        }
        let message = format!("failed to get type of cmd {}", command.as_str());
        if unsafe { libc::geteuid() } != 0 {
            return Err(Error::new(ErrorKind::Permission)
                .with_message(format!("{message} - not running as root"))
                .with_hint("Run as root or grant CAP_NET_ADMIN."));
        }
        Err(self.library_error(ErrorKind::Command, &message, -1))
    }

    pub fn parse_elem(&self, set_type: &RawSetType<'_>, element: &str) -> Result<(), Error> {
        let c_element = c_string(element, "element")?;
        let ret = unsafe {
            sys::ipset_bridge_parse_elem(self.as_ptr(), set_type.ptr.as_ptr(), c_element.as_ptr())
        };
        self.check(
            ret,
            ErrorKind::Usage,
            &format!("failed to parse element '{element}'"),
        )
    }

    pub fn call_parser(&self, arg: RawArg<'_>, key: &str, value: &str) -> Result<(), Error> {
        let c_value = c_string(value, "option value")?;
        let ret =
            unsafe { sys::ipset_bridge_call_parser(self.as_ptr(), arg.ptr.as_ptr(), c_value.as_ptr()) };
        self.check(
            ret,
            ErrorKind::Usage,
            &format!("failed to set {key}={value}"),
        )
    }

    fn run(&self, command: c_int, label: &str) -> Result<(), Error> {
        let ret = unsafe { sys::ipset_bridge_cmd(self.as_ptr(), command) };
        self.check(ret, ErrorKind::Command, &format!("ipset {label} failed"))
    }
}

impl Drop for RawSession {
    fn drop(&mut self) {
        unsafe { sys::ipset_bridge_session_fini(self.as_ptr()) };
        debug!("closed libipset session");
    }
}

/// Borrowed view of a libipset set type; valid while its session is open.
#[derive(Clone, Copy, Debug)]
pub struct RawSetType<'s> {
    ptr: NonNull<sys::ipset_type>,
    _session: PhantomData<&'s RawSession>,
}

/// Borrowed view of a libipset argument descriptor.
#[derive(Clone, Copy, Debug)]
pub struct RawArg<'s> {
    ptr: NonNull<sys::ipset_arg>,
    _table: PhantomData<&'s sys::ipset_arg>,
}

impl RawArg<'_> {
    fn from_ptr(ptr: *const sys::ipset_arg) -> Option<Self> {
        NonNull::new(ptr.cast_mut()).map(|ptr| Self {
            ptr,
            _table: PhantomData,
        })
    }

    fn name_ptr(&self) -> *const c_char {
        unsafe { sys::ipset_bridge_arg_name(self.ptr.as_ptr()) }
    }
}

impl ArgRecord for RawArg<'_> {
    fn primary_name(&self) -> Option<&str> {
        let name = self.name_ptr();
        if name.is_null() {
            return None;
        }
        unsafe { CStr::from_ptr(name) }.to_str().ok()
    }

    fn is_sentinel(&self) -> bool {
        self.name_ptr().is_null()
    }
}

#[cfg_attr(ipset_keyword_args, allow(dead_code))]
#[derive(Clone, Copy, Debug)]
pub struct RawDirectArgs<'s> {
    set_type: RawSetType<'s>,
    command: c_int,
}

impl<'s> DirectArgs for RawDirectArgs<'s> {
    type Arg = RawArg<'s>;

    fn entry(&self, index: usize) -> Option<RawArg<'s>> {
        let index = c_int::try_from(index).ok()?;
        RawArg::from_ptr(unsafe {
            sys::ipset_bridge_type_arg(self.set_type.ptr.as_ptr(), self.command, index)
        })
    }
}

#[cfg_attr(not(ipset_keyword_args), allow(dead_code))]
#[derive(Clone, Copy, Debug)]
pub struct RawKeywordArgs<'s> {
    set_type: RawSetType<'s>,
    command: c_int,
}

impl<'s> KeywordArgs for RawKeywordArgs<'s> {
    type Arg = RawArg<'s>;

    fn keyword(&self, index: usize) -> Option<Keyword> {
        let index = c_int::try_from(index).ok()?;
        if index >= unsafe { sys::ipset_bridge_optarg_max() } {
            return None;
        }
        let id = unsafe {
            sys::ipset_bridge_type_keyword(self.set_type.ptr.as_ptr(), self.command, index)
        };
        u16::try_from(id).ok().map(Keyword)
    }

    fn lookup(&self, keyword: Keyword) -> Option<RawArg<'s>> {
        RawArg::from_ptr(unsafe { sys::ipset_bridge_keyword_arg(c_int::from(keyword.0)) })
    }
}

impl<'s> SetTypeArgs for RawSetType<'s> {
    type Arg<'a>
        = RawArg<'a>
    where
        Self: 'a;
    type Direct<'a>
        = RawDirectArgs<'a>
    where
        Self: 'a;
    type Keywords<'a>
        = RawKeywordArgs<'a>
    where
        Self: 'a;

    fn argument_list(
        &self,
        command: Command,
    ) -> ArgumentList<RawDirectArgs<'_>, RawKeywordArgs<'_>> {
        let command = command_id(command);
        #[cfg(ipset_keyword_args)]
        let list = ArgumentList::KeywordTable(RawKeywordArgs {
            set_type: *self,
            command,
        });
        #[cfg(not(ipset_keyword_args))]
        let list = ArgumentList::DirectArray(RawDirectArgs {
            set_type: *self,
            command,
        });
        list
    }
}
