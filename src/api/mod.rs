//! Purpose: Define the public Rust API boundary for ipset-bridge.
//! Exports: Session output adapter, argument resolver, descriptor tables, and errors.
//! Role: Public, additive-only surface used by the CLI, hosts, and integration tests.
//! Invariants: Hosts reach core functionality through this module.
//! Invariants: The libipset binding is exported only with the `libipset` feature.

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::args::{
    ArgRecord, ArgumentList, Candidates, Command, DirectArgs, Keyword, KeywordArgs, SetTypeArgs,
    resolve_add_argument, resolve_argument,
};
pub use crate::core::command::{
    BoundOption, ElementRequest, MAX_SET_NAME_LEN, OptionPair, bind_options, parse_option_pairs,
    validate_set_name,
};
pub use crate::core::error::{Error, ErrorKind};
#[cfg(feature = "libipset")]
pub use crate::core::libipset::{LibIpset, RawArg, RawSession, RawSetType, load_types};
pub use crate::core::output::{
    EMIT_OK, EmissionBridge, OutputMode, Session, SessionLibrary, Sink, WriterSink,
    open_xml_session,
};
pub use crate::core::settype::{
    ArgDescriptor, ArgPresence, KEYWORD_SLOTS, KeywordTable, KeywordView, SetType,
};
