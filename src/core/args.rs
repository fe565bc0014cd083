//! Purpose: Resolve a textual option name to a set type's argument descriptor.
//! Exports: `Command`, `Keyword`, `ArgRecord`, `DirectArgs`, `KeywordArgs`, `ArgumentList`,
//! `SetTypeArgs`, `resolve_argument`, `resolve_add_argument`.
//! Role: Type Argument Resolver over either argument-table layout.
//! Invariants: Matching is exact and case-sensitive on the primary name; first match wins.
//! Invariants: One layout per list; a traversal never mixes direct entries with keyword ids.
//! Invariants: Keyword ids that do not resolve are skipped, never read as descriptors.
//! Invariants: A missing set type is an error; an unmatched name is `Ok(None)`.
use tracing::trace;

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Command {
    Add,
    Del,
    Test,
}

impl Command {
    pub const ALL: [Command; 3] = [Command::Add, Command::Del, Command::Test];

    pub fn as_str(self) -> &'static str {
        match self {
            Command::Add => "add",
            Command::Del => "del",
            Command::Test => "test",
        }
    }

    /// Position of the command in per-command tables.
    pub fn index(self) -> usize {
        match self {
            Command::Add => 0,
            Command::Del => 1,
            Command::Test => 2,
        }
    }
}

/// Numeric option id resolved through a keyword table. `Keyword::NONE` ends a keyword list.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Keyword(pub u16);

impl Keyword {
    pub const NONE: Keyword = Keyword(0);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

/// A single argument descriptor as seen by the resolver.
pub trait ArgRecord {
    fn primary_name(&self) -> Option<&str>;

    /// True for the "no more options" entry that ends a direct array.
    fn is_sentinel(&self) -> bool {
        self.primary_name().is_none()
    }
}

impl<T: ArgRecord + ?Sized> ArgRecord for &T {
    fn primary_name(&self) -> Option<&str> {
        (**self).primary_name()
    }

    fn is_sentinel(&self) -> bool {
        (**self).is_sentinel()
    }
}

/// Descriptors stored inline, terminated by a sentinel entry.
pub trait DirectArgs {
    type Arg: ArgRecord;

    /// Entry at `index`, or `None` past the end of the backing storage.
    fn entry(&self, index: usize) -> Option<Self::Arg>;
}

/// Fixed-size array of keyword ids, each resolved through a keyword table.
pub trait KeywordArgs {
    type Arg: ArgRecord;

    /// Keyword id at `index`, or `None` past the end of the fixed-size array.
    fn keyword(&self, index: usize) -> Option<Keyword>;

    fn lookup(&self, keyword: Keyword) -> Option<Self::Arg>;
}

/// The argument list of one command, in whichever layout the set type uses.
#[derive(Clone, Copy, Debug)]
pub enum ArgumentList<D, K> {
    DirectArray(D),
    KeywordTable(K),
}

impl<A, D, K> ArgumentList<D, K>
where
    A: ArgRecord,
    D: DirectArgs<Arg = A>,
    K: KeywordArgs<Arg = A>,
{
    /// Descriptors in declared order.
    pub fn candidates(&self) -> Candidates<'_, D, K> {
        Candidates {
            list: self,
            index: 0,
            done: false,
        }
    }

    pub fn find(&self, name: &str) -> Option<A> {
        self.candidates().find(|arg| arg.primary_name() == Some(name))
    }
}

pub struct Candidates<'l, D, K> {
    list: &'l ArgumentList<D, K>,
    index: usize,
    done: bool,
}

impl<A, D, K> Iterator for Candidates<'_, D, K>
where
    A: ArgRecord,
    D: DirectArgs<Arg = A>,
    K: KeywordArgs<Arg = A>,
{
    type Item = A;

    fn next(&mut self) -> Option<A> {
        if self.done {
            return None;
        }
        let next = match self.list {
            ArgumentList::DirectArray(direct) => next_direct(direct, &mut self.index),
            ArgumentList::KeywordTable(keywords) => next_keyword(keywords, &mut self.index),
        };
        if next.is_none() {
            self.done = true;
        }
        next
    }
}

fn next_direct<D: DirectArgs>(direct: &D, index: &mut usize) -> Option<D::Arg> {
    let arg = direct.entry(*index)?;
    if arg.is_sentinel() {
        return None;
    }
    *index += 1;
    Some(arg)
}

fn next_keyword<K: KeywordArgs>(keywords: &K, index: &mut usize) -> Option<K::Arg> {
    loop {
        let keyword = keywords.keyword(*index)?;
        if keyword.is_none() {
            return None;
        }
        *index += 1;
        match keywords.lookup(keyword) {
            Some(arg) => return Some(arg),
            None => trace!(keyword = keyword.0, "skipping unresolved keyword"),
        }
    }
}

/// Set types that expose per-command argument lists.
pub trait SetTypeArgs {
    type Arg<'a>: ArgRecord
    where
        Self: 'a;
    type Direct<'a>: DirectArgs<Arg = Self::Arg<'a>>
    where
        Self: 'a;
    type Keywords<'a>: KeywordArgs<Arg = Self::Arg<'a>>
    where
        Self: 'a;

    fn argument_list(
        &self,
        command: Command,
    ) -> ArgumentList<Self::Direct<'_>, Self::Keywords<'_>>;
}

/// Find the descriptor named `name` in `command`'s argument list of `set_type`.
pub fn resolve_argument<'t, T>(
    set_type: Option<&'t T>,
    command: Command,
    name: &str,
) -> Result<Option<T::Arg<'t>>, Error>
where
    T: SetTypeArgs + ?Sized,
{
    let Some(set_type) = set_type else {
        return Err(Error::new(ErrorKind::Usage).with_message("set type is null"));
    };
    if name.is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message("argument name is empty"));
    }
    Ok(set_type.argument_list(command).find(name))
}

/// Find the "add" argument descriptor named `name`.
pub fn resolve_add_argument<'t, T>(
    set_type: Option<&'t T>,
    name: &str,
) -> Result<Option<T::Arg<'t>>, Error>
where
    T: SetTypeArgs + ?Sized,
{
    resolve_argument(set_type, Command::Add, name)
}

#[cfg(test)]
mod tests {
    use super::{
        ArgRecord, ArgumentList, Command, DirectArgs, Keyword, KeywordArgs, SetTypeArgs,
        resolve_add_argument, resolve_argument,
    };
    use crate::core::error::ErrorKind;
    use std::cell::RefCell;

    #[derive(Debug, PartialEq)]
    struct Named(Option<&'static str>);

    impl ArgRecord for Named {
        fn primary_name(&self) -> Option<&str> {
            self.0
        }
    }

    struct Direct(Vec<Named>);

    impl<'a> DirectArgs for &'a Direct {
        type Arg = &'a Named;

        fn entry(&self, index: usize) -> Option<&'a Named> {
            self.0.get(index)
        }
    }

    struct Keyed {
        ids: Vec<Keyword>,
        table: Vec<(Keyword, Named)>,
        lookups: RefCell<Vec<Keyword>>,
    }

    impl<'a> KeywordArgs for &'a Keyed {
        type Arg = &'a Named;

        fn keyword(&self, index: usize) -> Option<Keyword> {
            self.ids.get(index).copied()
        }

        fn lookup(&self, keyword: Keyword) -> Option<&'a Named> {
            self.lookups.borrow_mut().push(keyword);
            self.table
                .iter()
                .find(|(id, _)| *id == keyword)
                .map(|(_, arg)| arg)
        }
    }

    enum Fixture {
        Direct(Direct),
        Keyed(Keyed),
    }

    impl SetTypeArgs for Fixture {
        type Arg<'a> = &'a Named;
        type Direct<'a> = &'a Direct;
        type Keywords<'a> = &'a Keyed;

        fn argument_list(&self, command: Command) -> ArgumentList<&Direct, &Keyed> {
            assert_eq!(command, Command::Add);
            match self {
                Fixture::Direct(direct) => ArgumentList::DirectArray(direct),
                Fixture::Keyed(keyed) => ArgumentList::KeywordTable(keyed),
            }
        }
    }

    fn direct(names: &[&'static str]) -> Fixture {
        let mut entries = names
            .iter()
            .map(|name| Named(Some(name)))
            .collect::<Vec<_>>();
        entries.push(Named(None));
        Fixture::Direct(Direct(entries))
    }

    fn keyed(ids: &[u16], table: &[(u16, &'static str)]) -> Fixture {
        Fixture::Keyed(Keyed {
            ids: ids.iter().copied().map(Keyword).collect(),
            table: table
                .iter()
                .map(|(id, name)| (Keyword(*id), Named(Some(name))))
                .collect(),
            lookups: RefCell::new(Vec::new()),
        })
    }

    #[test]
    fn direct_layout_finds_by_primary_name() {
        let fixture = direct(&["comment", "timeout", "nomatch"]);
        let found = resolve_add_argument(Some(&fixture), "timeout").expect("resolve");
        assert_eq!(found, Some(&Named(Some("timeout"))));
        let Fixture::Direct(inner) = &fixture else {
            unreachable!()
        };
        assert!(std::ptr::eq(found.expect("found"), &inner.0[1]));
    }

    #[test]
    fn direct_layout_stops_at_sentinel() {
        let fixture = Fixture::Direct(Direct(vec![
            Named(Some("comment")),
            Named(None),
            Named(Some("hidden")),
        ]));
        let found = resolve_add_argument(Some(&fixture), "hidden").expect("resolve");
        assert_eq!(found, None);
    }

    #[test]
    fn direct_layout_without_sentinel_ends_with_storage() {
        let fixture = Fixture::Direct(Direct(vec![Named(Some("comment"))]));
        assert_eq!(
            resolve_add_argument(Some(&fixture), "timeout").expect("resolve"),
            None
        );
    }

    #[test]
    fn keyword_layout_resolves_through_table() {
        let fixture = keyed(
            &[14, 10, 20, 0, 0],
            &[(10, "timeout"), (14, "comment"), (20, "nomatch")],
        );
        let found = resolve_add_argument(Some(&fixture), "nomatch").expect("resolve");
        assert_eq!(found, Some(&Named(Some("nomatch"))));
    }

    #[test]
    fn keyword_layout_stops_at_none_keyword() {
        let fixture = keyed(&[10, 0, 14], &[(10, "timeout"), (14, "comment")]);
        assert_eq!(
            resolve_add_argument(Some(&fixture), "comment").expect("resolve"),
            None
        );
        let Fixture::Keyed(inner) = &fixture else {
            unreachable!()
        };
        assert_eq!(*inner.lookups.borrow(), vec![Keyword(10)]);
    }

    #[test]
    fn keyword_layout_skips_unresolved_ids() {
        let fixture = keyed(&[99, 10], &[(10, "timeout")]);
        let found = resolve_add_argument(Some(&fixture), "timeout").expect("resolve");
        assert_eq!(found, Some(&Named(Some("timeout"))));
    }

    #[test]
    fn keyword_layout_ends_with_full_table() {
        let fixture = keyed(&[10, 14], &[(10, "timeout"), (14, "comment")]);
        let names = match &fixture {
            Fixture::Keyed(inner) => ArgumentList::<&Direct, &Keyed>::KeywordTable(inner)
                .candidates()
                .filter_map(|arg| arg.0)
                .collect::<Vec<_>>(),
            Fixture::Direct(_) => unreachable!(),
        };
        assert_eq!(names, vec!["timeout", "comment"]);
    }

    #[test]
    fn matching_is_exact_and_case_sensitive() {
        let fixture = direct(&["timeout"]);
        for name in ["Timeout", "time", "timeout ", "timeouts"] {
            let found = resolve_add_argument(Some(&fixture), name).expect("resolve");
            assert_eq!(found, None, "{name}");
        }
    }

    #[test]
    fn first_match_wins() {
        let fixture = Fixture::Direct(Direct(vec![
            Named(Some("comment")),
            Named(Some("comment")),
            Named(None),
        ]));
        let found = resolve_add_argument(Some(&fixture), "comment")
            .expect("resolve")
            .expect("found");
        let Fixture::Direct(inner) = &fixture else {
            unreachable!()
        };
        assert!(std::ptr::eq(found, &inner.0[0]));
    }

    #[test]
    fn missing_type_is_invalid_argument() {
        let err = resolve_add_argument::<Fixture>(None, "timeout").expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn empty_name_is_invalid_argument() {
        let fixture = direct(&["timeout"]);
        let err = resolve_argument(Some(&fixture), Command::Add, "").expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
