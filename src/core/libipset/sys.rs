// Raw FFI bindings to the libipset C shim.
#![allow(non_camel_case_types)]
use std::os::raw::{c_char, c_int};

#[repr(C)]
pub struct ipset_session {
    _private: [u8; 0],
}

#[repr(C)]
pub struct ipset_type {
    _private: [u8; 0],
}

#[repr(C)]
pub struct ipset_arg {
    _private: [u8; 0],
}

pub const IPSET_BRIDGE_LIST: c_int = 0;
pub const IPSET_BRIDGE_ADD: c_int = 1;
pub const IPSET_BRIDGE_DEL: c_int = 2;
pub const IPSET_BRIDGE_TEST: c_int = 3;

unsafe extern "C" {
    pub fn ipset_bridge_load_types();

    pub fn ipset_bridge_session_init() -> *mut ipset_session;

    pub fn ipset_bridge_session_fini(session: *mut ipset_session);

    pub fn ipset_bridge_session_output(session: *mut ipset_session, mode: c_int) -> c_int;

    pub fn ipset_bridge_session_error(session: *mut ipset_session) -> *const c_char;

    pub fn ipset_bridge_envopt_exist(session: *mut ipset_session) -> c_int;

    pub fn ipset_bridge_parse_setname(session: *mut ipset_session, name: *const c_char) -> c_int;

    pub fn ipset_bridge_type_get(session: *mut ipset_session, command: c_int) -> *const ipset_type;

    pub fn ipset_bridge_parse_elem(
        session: *mut ipset_session,
        set_type: *const ipset_type,
        elem: *const c_char,
    ) -> c_int;

    pub fn ipset_bridge_call_parser(
        session: *mut ipset_session,
        arg: *const ipset_arg,
        value: *const c_char,
    ) -> c_int;

    pub fn ipset_bridge_cmd(session: *mut ipset_session, command: c_int) -> c_int;

    pub fn ipset_bridge_optarg_max() -> c_int;

    pub fn ipset_bridge_type_keyword(
        set_type: *const ipset_type,
        command: c_int,
        index: c_int,
    ) -> c_int;

    pub fn ipset_bridge_keyword_arg(keyword: c_int) -> *const ipset_arg;

    pub fn ipset_bridge_type_arg(
        set_type: *const ipset_type,
        command: c_int,
        index: c_int,
    ) -> *const ipset_arg;

    pub fn ipset_bridge_arg_name(arg: *const ipset_arg) -> *const c_char;
}
