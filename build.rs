//! Purpose: Compile the libipset C shim (when the `libipset` feature is on) and detect the
//! argument-table layout of the installed libipset headers.
//! Role: Cargo build-script; configures `cc` inputs/includes, link flags, and rebuild triggers.
//! Invariants: Without the `libipset` feature nothing is compiled or linked.
//! Invariants: `cfg(ipset_keyword_args)` is set iff the headers define `IPSET_OPTARG_MAX`.
//! Invariants: The shim picks its print-callback signature from a second header probe.
//! Invariants: Uses only Cargo-provided env vars plus `IPSET_BRIDGE_INCLUDE_DIR`.
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    println!("cargo::rustc-check-cfg=cfg(ipset_keyword_args)");
    println!("cargo:rerun-if-changed=c/ipset_bridge.c");
    println!("cargo:rerun-if-changed=c/ipset_bridge.h");
    println!("cargo:rerun-if-env-changed=IPSET_BRIDGE_INCLUDE_DIR");

    if env::var_os("CARGO_FEATURE_LIBIPSET").is_none() {
        return;
    }

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR"));
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR"));
    let extra_include = env::var_os("IPSET_BRIDGE_INCLUDE_DIR").map(PathBuf::from);

    let include = extra_include.as_deref();
    let keyword_args = probe_headers(&out_dir, include, "ipset_keyword_probe", KEYWORD_PROBE);
    let print_outfn = probe_headers(&out_dir, include, "ipset_print_outfn_probe", PRINT_OUTFN_PROBE);

    if keyword_args {
        println!("cargo:rustc-cfg=ipset_keyword_args");
    }

    let mut build = cc::Build::new();
    build
        .include(manifest_dir.join("c"))
        .file(manifest_dir.join("c").join("ipset_bridge.c"));
    if let Some(dir) = include {
        build.include(dir);
    }
    if print_outfn {
        build.define("IPSET_BRIDGE_PRINT_OUTFN", None);
    }
    build.compile("ipset_bridge");

    println!("cargo:rustc-link-lib=ipset");
}

const HEADERS: &str = r#"
#include <stddef.h>
#include <libipset/data.h>
#include <libipset/parse.h>
#include <libipset/session.h>
#include <libipset/types.h>
"#;

// Keyword-id argument tables replaced the sentinel-terminated descriptor arrays.
const KEYWORD_PROBE: &str = r#"
#ifndef IPSET_OPTARG_MAX
#error "direct argument arrays"
#endif
int ipset_keyword_probe(void) { return IPSET_OPTARG_MAX; }
"#;

// Newer libipset passes the session and a user pointer to the print callback.
const PRINT_OUTFN_PROBE: &str = r#"
struct ipset_session *ipset_print_outfn_probe(void) { return ipset_session_init(NULL, NULL); }
"#;

fn probe_headers(out_dir: &Path, extra_include: Option<&Path>, name: &str, body: &str) -> bool {
    let probe_source = out_dir.join(format!("{name}.c"));
    fs::write(&probe_source, format!("{HEADERS}{body}"))
        .expect("failed to write libipset probe source");

    let mut probe = cc::Build::new();
    probe.warnings(false).cargo_metadata(false).file(&probe_source);
    if let Some(dir) = extra_include {
        probe.include(dir);
    }
    probe.try_compile(name).is_ok()
}
