//! Clap adapter for cfgbind.
//!
//! Compiled only with the `clap` Cargo feature (on by default). The binder
//! itself never parses argv; this module turns an already-parsed
//! [`ArgMatches`] into bind input under the flag namespace.
//!
//! Only arguments the user actually typed count. Defaults declared on the
//! clap side are left out, so they cannot override values bound earlier from
//! files or the environment.
//!
//! Apps using clap's derive API can instead serialize their parser struct
//! (with `Option` fields) through [`bind_serialized`](crate::bind_serialized).

use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::bind::{bind, Bindable, FLAG_NAMESPACE};
use crate::error::BindError;
use crate::value::{ConfigValue, Table};

/// Collect the arguments set on the command line into a flat [`Table`].
///
/// One value becomes a string; several occurrences or values become a
/// sequence of strings.
pub fn explicit_flags(matches: &ArgMatches) -> Table {
    let mut table = Table::new();
    for id in matches.ids() {
        let name = id.as_str();
        if matches.value_source(name) != Some(ValueSource::CommandLine) {
            continue;
        }
        let Ok(Some(raw)) = matches.try_get_raw(name) else {
            continue;
        };
        let mut values: Vec<ConfigValue> = raw
            .map(|v| ConfigValue::String(v.to_string_lossy().into_owned()))
            .collect();
        let value = if values.len() == 1 {
            values.remove(0)
        } else {
            ConfigValue::Sequence(values)
        };
        table.insert(name.to_string(), value);
    }
    table
}

/// Bind the explicitly set arguments of `matches` under the flag namespace.
pub fn bind_matches(target: &mut dyn Bindable, matches: &ArgMatches) -> Result<(), BindError> {
    bind(target, FLAG_NAMESPACE, &explicit_flags(matches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::bind_serialized;
    use crate::fixtures::test::Service;
    use clap::{Arg, ArgAction, Command, Parser};
    use serde::Serialize;

    fn command() -> Command {
        Command::new("svc")
            .arg(Arg::new("name").long("name"))
            .arg(Arg::new("retries").long("retries").default_value("1"))
            .arg(
                Arg::new("tags")
                    .long("tags")
                    .num_args(1..)
                    .action(ArgAction::Append),
            )
            .arg(Arg::new("verbose").long("verbose").action(ArgAction::SetTrue))
    }

    fn matches(args: &[&str]) -> ArgMatches {
        command().try_get_matches_from(args).unwrap()
    }

    #[test]
    fn defaults_are_not_explicit() {
        let table = explicit_flags(&matches(&["svc", "--name", "x"]));
        assert_eq!(table.len(), 1);
        assert_eq!(table["name"].as_str(), Some("x"));
    }

    #[test]
    fn multiple_values_become_sequence() {
        let table = explicit_flags(&matches(&["svc", "--tags", "a", "b", "--tags", "c"]));
        assert_eq!(table["tags"], ConfigValue::from(vec!["a", "b", "c"]));
    }

    #[test]
    fn set_true_flag_is_explicit() {
        let table = explicit_flags(&matches(&["svc", "--verbose"]));
        assert_eq!(table["verbose"].as_str(), Some("true"));
    }

    #[test]
    fn unset_flag_does_not_override_bound_value() {
        let mut service = Service {
            retries: 7,
            ..Default::default()
        };
        bind_matches(&mut service, &matches(&["svc", "--tags", "x"])).unwrap();
        assert_eq!(service.retries, 7);
        assert_eq!(service.tags, vec!["x"]);
    }

    #[test]
    fn explicit_flag_overrides_bound_value() {
        let mut service = Service {
            retries: 7,
            ..Default::default()
        };
        bind_matches(&mut service, &matches(&["svc", "--retries", "2"])).unwrap();
        assert_eq!(service.retries, 2);
    }

    #[test]
    fn invalid_flag_value_reports_path() {
        let mut service = Service::default();
        let err = bind_matches(&mut service, &matches(&["svc", "--retries", "lots"])).unwrap_err();
        assert_eq!(err.path(), Some("retries"));
    }

    #[test]
    fn derive_parser_through_serialization() {
        #[derive(Parser, Serialize)]
        struct Cli {
            #[arg(long)]
            retries: Option<i32>,
            #[arg(long, value_delimiter = ',')]
            tags: Option<Vec<String>>,
        }
        let cli = Cli::try_parse_from(["svc", "--tags", "a,b"]).unwrap();
        let mut service = Service {
            retries: 3,
            ..Default::default()
        };
        bind_serialized(&mut service, FLAG_NAMESPACE, &cli).unwrap();
        assert_eq!(service.retries, 3);
        assert_eq!(service.tags, vec!["a", "b"]);
    }
}
