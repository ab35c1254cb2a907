use crate::value::{ConfigValue, Table};

/// Build a [`Table`] from environment variables matching `{PREFIX}__*`.
///
/// Double underscore `__` separates nesting levels.
/// Single `_` within a segment is literal (part of the key).
/// Segments are lowercased to match tag keys.
///
/// Values stay strings; the coercer converts them to each field's type.
///
/// Takes an iterator so tests can pass synthetic data instead of `std::env::vars()`.
pub fn env_to_table(prefix: &str, vars: impl IntoIterator<Item = (String, String)>) -> Table {
    let needle = format!("{prefix}__");
    let mut table = Table::new();

    for (key, value) in vars {
        let Some(rest) = key.strip_prefix(&needle) else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }

        let segments: Vec<&str> = rest.split("__").collect();
        insert_nested(&mut table, &segments, ConfigValue::String(value));
    }

    table
}

fn insert_nested(table: &mut Table, segments: &[&str], value: ConfigValue) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    let key = first.to_lowercase();

    if rest.is_empty() {
        table.insert(key, value);
        return;
    }

    let sub = table
        .entry(key)
        .or_insert_with(|| ConfigValue::Mapping(Table::new()));
    // A scalar already bound at this level shadows deeper keys.
    if let ConfigValue::Mapping(sub_table) = sub {
        insert_nested(sub_table, rest, value);
    }
}
