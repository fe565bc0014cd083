//! Purpose: Validate element-command inputs and bind `KEY VALUE` options to descriptors.
//! Exports: `OptionPair`, `BoundOption`, `ElementRequest`, `parse_option_pairs`, `bind_options`,
//! `validate_set_name`, `MAX_SET_NAME_LEN`.
//! Role: Host-side preparation for add/del/test; the library still parses and runs the command.
//! Invariants: Options come in pairs; an odd count is a usage error.
//! Invariants: Every key must resolve in the command's own argument list.
use crate::core::args::{Command, SetTypeArgs, resolve_argument};
use crate::core::error::{Error, ErrorKind};

/// Kernel set names are limited to 31 bytes plus the terminating NUL.
pub const MAX_SET_NAME_LEN: usize = 31;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OptionPair {
    pub key: String,
    pub value: String,
}

#[derive(Clone, Copy, Debug)]
pub struct BoundOption<'p, A> {
    pub arg: A,
    pub key: &'p str,
    pub value: &'p str,
}

/// Everything needed to run one add/del/test command against a named set.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ElementRequest {
    pub set_name: String,
    pub element: String,
    pub options: Vec<OptionPair>,
    /// Ignore "already added" / "not in set" conditions.
    pub exist: bool,
}

impl ElementRequest {
    pub fn new<S: AsRef<str>>(set_name: &str, element: &str, args: &[S]) -> Result<Self, Error> {
        validate_set_name(set_name)?;
        if element.is_empty() {
            return Err(Error::new(ErrorKind::Usage).with_message("element is empty"));
        }
        Ok(Self {
            set_name: set_name.to_string(),
            element: element.to_string(),
            options: parse_option_pairs(args)?,
            exist: true,
        })
    }

    pub fn with_exist(mut self, exist: bool) -> Self {
        self.exist = exist;
        self
    }
}

pub fn validate_set_name(name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message("set name is empty"));
    }
    if name.len() > MAX_SET_NAME_LEN {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("set name '{name}' is too long"))
            .with_hint(format!("Set names are at most {MAX_SET_NAME_LEN} bytes.")));
    }
    if name.contains('\0') {
        return Err(Error::new(ErrorKind::Usage).with_message("set name contains NUL"));
    }
    Ok(())
}

pub fn parse_option_pairs<S: AsRef<str>>(args: &[S]) -> Result<Vec<OptionPair>, Error> {
    if args.len() % 2 != 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("odd number of arguments given")
            .with_hint("Options are given as KEY VALUE pairs."));
    }
    Ok(args
        .chunks_exact(2)
        .map(|pair| OptionPair {
            key: pair[0].as_ref().to_string(),
            value: pair[1].as_ref().to_string(),
        })
        .collect())
}

/// Resolve every option key against `command`'s argument list, preserving order.
pub fn bind_options<'t, 'p, T>(
    set_type: &'t T,
    command: Command,
    pairs: &'p [OptionPair],
) -> Result<Vec<BoundOption<'p, T::Arg<'t>>>, Error>
where
    T: SetTypeArgs + ?Sized,
{
    pairs
        .iter()
        .map(|pair| match resolve_argument(Some(set_type), command, &pair.key)? {
            Some(arg) => Ok(BoundOption {
                arg,
                key: pair.key.as_str(),
                value: pair.value.as_str(),
            }),
            None => Err(Error::new(ErrorKind::NotFound)
                .with_message(format!("unknown argument: {}", pair.key))
                .with_hint(format!(
                    "The set type does not accept this option for {}.",
                    command.as_str()
                ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{ElementRequest, MAX_SET_NAME_LEN, OptionPair, bind_options, parse_option_pairs};
    use crate::core::args::{Command, Keyword};
    use crate::core::error::ErrorKind;
    use crate::core::settype::{ArgDescriptor, ArgPresence, KeywordTable, SetType};
    use std::sync::Arc;

    fn set_type() -> SetType {
        SetType::direct("hash:ip", 4)
            .with_args(
                Command::Add,
                vec![
                    ArgDescriptor::new(14, &["comment"], ArgPresence::Mandatory),
                    ArgDescriptor::new(10, &["timeout"], ArgPresence::Mandatory),
                ],
            )
            .expect("args")
    }

    #[test]
    fn pairs_are_split_in_order() {
        let pairs = parse_option_pairs(&["timeout", "60", "comment", "web"]).expect("pairs");
        assert_eq!(
            pairs,
            vec![
                OptionPair {
                    key: "timeout".to_string(),
                    value: "60".to_string()
                },
                OptionPair {
                    key: "comment".to_string(),
                    value: "web".to_string()
                },
            ]
        );
    }

    #[test]
    fn odd_pairs_are_usage_errors() {
        let err = parse_option_pairs(&["timeout"]).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(err.message(), Some("odd number of arguments given"));
    }

    #[test]
    fn options_bind_to_descriptors() {
        let set_type = set_type();
        let pairs = parse_option_pairs(&["timeout", "60", "comment", "web"]).expect("pairs");
        let bound = bind_options(&set_type, Command::Add, &pairs).expect("bind");
        let opts = bound
            .iter()
            .map(|option| (option.arg.opt(), option.value))
            .collect::<Vec<_>>();
        assert_eq!(opts, vec![(10, "60"), (14, "web")]);
    }

    #[test]
    fn unknown_option_is_not_found() {
        let set_type = set_type();
        let pairs = parse_option_pairs(&["bogus", "1"]).expect("pairs");
        let err = bind_options(&set_type, Command::Add, &pairs).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.message(), Some("unknown argument: bogus"));
    }

    #[test]
    fn options_bind_against_keyword_layout() {
        let table = KeywordTable::new()
            .with(
                Keyword(10),
                ArgDescriptor::new(10, &["timeout"], ArgPresence::Mandatory),
            )
            .expect("table");
        let set_type = SetType::keyed("hash:net", 6, Arc::new(table))
            .with_keywords(Command::Add, &[Keyword(10)])
            .expect("keywords");
        let pairs = parse_option_pairs(&["timeout", "5"]).expect("pairs");
        let bound = bind_options(&set_type, Command::Add, &pairs).expect("bind");
        assert_eq!(bound.len(), 1);
        assert_eq!(bound[0].key, "timeout");
    }

    #[test]
    fn request_validates_set_name_and_element() {
        let no_args: [&str; 0] = [];
        let long = "x".repeat(MAX_SET_NAME_LEN + 1);
        let err = ElementRequest::new(&long, "10.0.0.1", &no_args).expect_err("long name");
        assert_eq!(err.kind(), ErrorKind::Usage);
        let err = ElementRequest::new("", "10.0.0.1", &no_args).expect_err("empty name");
        assert_eq!(err.kind(), ErrorKind::Usage);
        let err = ElementRequest::new("blocklist", "", &no_args).expect_err("empty element");
        assert_eq!(err.kind(), ErrorKind::Usage);

        let request = ElementRequest::new("blocklist", "10.0.0.1", &["timeout", "30"])
            .expect("request")
            .with_exist(false);
        assert!(!request.exist);
        assert_eq!(request.options.len(), 1);
    }
}
