//! Purpose: In-memory set type descriptors for hosts that build their own type tables.
//! Exports: `ArgPresence`, `ArgDescriptor`, `KeywordTable`, `SetType`, `KEYWORD_SLOTS`.
//! Role: Rust-native counterpart of the library's descriptor tables; feeds the resolver.
//! Invariants: A set type picks one argument layout at construction and keeps it.
//! Invariants: Direct lists always end with a sentinel entry (option id 0).
//! Invariants: Keyword lists hold at most `KEYWORD_SLOTS` ids; unused slots are `Keyword::NONE`.
use std::sync::Arc;

use crate::core::args::{
    ArgRecord, ArgumentList, Command, DirectArgs, Keyword, KeywordArgs, SetTypeArgs,
};
use crate::core::error::{Error, ErrorKind};

/// Size of the fixed keyword array per command.
pub const KEYWORD_SLOTS: usize = 24;

/// Whether an option takes a value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArgPresence {
    None,
    Optional,
    Mandatory,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArgDescriptor {
    opt: u16,
    names: Vec<String>,
    presence: ArgPresence,
}

impl ArgDescriptor {
    /// `names[0]` is the primary name; the rest are aliases the resolver ignores.
    pub fn new(opt: u16, names: &[&str], presence: ArgPresence) -> Self {
        Self {
            opt,
            names: names.iter().map(|name| name.to_string()).collect(),
            presence,
        }
    }

    pub fn sentinel() -> Self {
        Self {
            opt: 0,
            names: Vec::new(),
            presence: ArgPresence::None,
        }
    }

    pub fn opt(&self) -> u16 {
        self.opt
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn presence(&self) -> ArgPresence {
        self.presence
    }
}

impl ArgRecord for ArgDescriptor {
    fn primary_name(&self) -> Option<&str> {
        if self.is_sentinel() {
            return None;
        }
        self.names.first().map(String::as_str)
    }

    fn is_sentinel(&self) -> bool {
        self.opt == 0
    }
}

impl<'a> DirectArgs for &'a [ArgDescriptor] {
    type Arg = &'a ArgDescriptor;

    fn entry(&self, index: usize) -> Option<&'a ArgDescriptor> {
        self.get(index)
    }
}

/// Descriptors addressed by keyword id.
#[derive(Clone, Debug, Default)]
pub struct KeywordTable {
    entries: Vec<Option<ArgDescriptor>>,
}

impl KeywordTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, keyword: Keyword, arg: ArgDescriptor) -> Result<Self, Error> {
        if keyword.is_none() {
            return Err(Error::new(ErrorKind::Usage).with_message("keyword 0 is reserved"));
        }
        let slot = usize::from(keyword.0);
        if self.entries.len() <= slot {
            self.entries.resize(slot + 1, None);
        }
        self.entries[slot] = Some(arg);
        Ok(self)
    }

    pub fn get(&self, keyword: Keyword) -> Option<&ArgDescriptor> {
        if keyword.is_none() {
            return None;
        }
        self.entries.get(usize::from(keyword.0))?.as_ref()
    }
}

/// A command's keyword ids paired with the table that resolves them.
#[derive(Clone, Copy, Debug)]
pub struct KeywordView<'a> {
    ids: &'a [Keyword],
    table: &'a KeywordTable,
}

impl<'a> KeywordArgs for KeywordView<'a> {
    type Arg = &'a ArgDescriptor;

    fn keyword(&self, index: usize) -> Option<Keyword> {
        self.ids.get(index).copied()
    }

    fn lookup(&self, keyword: Keyword) -> Option<&'a ArgDescriptor> {
        self.table.get(keyword)
    }
}

#[derive(Clone, Debug)]
enum Layout {
    Direct([Vec<ArgDescriptor>; 3]),
    Keywords {
        table: Arc<KeywordTable>,
        ids: [[Keyword; KEYWORD_SLOTS]; 3],
    },
}

#[derive(Clone, Debug)]
pub struct SetType {
    name: String,
    revision: u8,
    layout: Layout,
}

impl SetType {
    /// Set type whose argument lists are sentinel-terminated descriptor arrays.
    pub fn direct(name: impl Into<String>, revision: u8) -> Self {
        let empty = || vec![ArgDescriptor::sentinel()];
        Self {
            name: name.into(),
            revision,
            layout: Layout::Direct([empty(), empty(), empty()]),
        }
    }

    /// Set type whose argument lists are keyword ids resolved through `table`.
    pub fn keyed(name: impl Into<String>, revision: u8, table: Arc<KeywordTable>) -> Self {
        Self {
            name: name.into(),
            revision,
            layout: Layout::Keywords {
                table,
                ids: [[Keyword::NONE; KEYWORD_SLOTS]; 3],
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn revision(&self) -> u8 {
        self.revision
    }

    pub fn uses_keywords(&self) -> bool {
        matches!(self.layout, Layout::Keywords { .. })
    }

    /// Replace `command`'s direct argument list. A sentinel is appended.
    pub fn with_args(mut self, command: Command, args: Vec<ArgDescriptor>) -> Result<Self, Error> {
        let Layout::Direct(lists) = &mut self.layout else {
            return Err(layout_mismatch(&self.name, "descriptor"));
        };
        let mut args = args;
        if args.iter().any(ArgRecord::is_sentinel) {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("argument list entries must have a non-zero option id"));
        }
        args.push(ArgDescriptor::sentinel());
        lists[command.index()] = args;
        Ok(self)
    }

    /// Replace `command`'s keyword list. Remaining slots are cleared to `Keyword::NONE`.
    pub fn with_keywords(mut self, command: Command, keywords: &[Keyword]) -> Result<Self, Error> {
        let Layout::Keywords { ids, .. } = &mut self.layout else {
            return Err(layout_mismatch(&self.name, "keyword"));
        };
        if keywords.len() > KEYWORD_SLOTS {
            return Err(Error::new(ErrorKind::Usage).with_message(format!(
                "at most {KEYWORD_SLOTS} keywords per command (got {})",
                keywords.len()
            )));
        }
        let slots = &mut ids[command.index()];
        *slots = [Keyword::NONE; KEYWORD_SLOTS];
        slots[..keywords.len()].copy_from_slice(keywords);
        Ok(self)
    }
}

fn layout_mismatch(name: &str, requested: &str) -> Error {
    Error::new(ErrorKind::Usage).with_message(format!(
        "set type {name} does not use {requested} argument lists"
    ))
}

impl SetTypeArgs for SetType {
    type Arg<'a> = &'a ArgDescriptor;
    type Direct<'a> = &'a [ArgDescriptor];
    type Keywords<'a> = KeywordView<'a>;

    fn argument_list(&self, command: Command) -> ArgumentList<&[ArgDescriptor], KeywordView<'_>> {
        match &self.layout {
            Layout::Direct(lists) => ArgumentList::DirectArray(lists[command.index()].as_slice()),
            Layout::Keywords { table, ids } => ArgumentList::KeywordTable(KeywordView {
                ids: &ids[command.index()],
                table,
            }),
        }
    }
}
