//! Tag-driven configuration binding. Declare a record, hand it a mapping,
//! and every tagged field is overwritten with a coerced value.
//!
//! cfgbind does not read files or parse argv. Decoders (TOML, JSON, the
//! environment, clap) produce a [`Table`] of loosely typed [`ConfigValue`]s;
//! the binder walks a record's field table and writes each field whose tag
//! matches a key, converting the raw value to the field's declared type on
//! the way.
//!
//! ```ignore
//! cfgbind::record! {
//!     #[derive(Debug, Default)]
//!     pub struct Service {
//!         pub name: String => { cfg: "name" },
//!         pub retries: i32 => { cfg: "retries", flag: "retries" },
//!         pub tags: Vec<String> => { cfg: "tags", flag: "tags" },
//!     }
//! }
//!
//! let mut service = Service::default();
//! let file: toml::Table = toml::from_str(r#"name = "svc1"
//! retries = "3"
//! tags = "a,b""#)?;
//! cfgbind::bind(&mut service, "cfg", &cfgbind::table_from_toml(file))?;
//! assert_eq!(service.tags, ["a", "b"]);
//! ```
//!
//! # Namespaces and tags
//!
//! Each field carries zero or more `namespace: "key"` pairs. A bind call
//! names one namespace, so the same record can be filled from a file under
//! `cfg` and from flags under `flag` with different key spellings. Fields
//! without a tag for the active namespace, or with an empty one, are left
//! alone. `=> flatten` embeds a record whose fields are looked up in the
//! enclosing mapping.
//!
//! # Layering
//!
//! Binding is a sparse overlay. Keys missing from the input leave their
//! fields untouched, so calling [`bind`] once per source, lowest priority
//! first, yields layered configuration:
//!
//! ```text
//! Defaults              Record::default()
//!        ↑ overridden by
//! Config file           bind(&mut rec, "cfg", &file)
//!        ↑ overridden by
//! Environment           bind(&mut rec, "cfg", &env_to_table("APP", vars))
//!        ↑ overridden by
//! Flags                 bind_flags / bind_matches
//! ```
//!
//! Records merge in place. Sequences and mappings are rebuilt from the input
//! and replace the previous contents wholesale.
//!
//! # Coercion
//!
//! Scalars go through a fixed matrix, documented in the
//! [`coerce`](mod@coerce) module. Booleans accept `t`/`FALSE`/`1`-style
//! literals, integers are range-checked, durations accept milliseconds or
//! `1h30m`-style strings, and string sequences accept comma-separated
//! strings.
//!
//! # Clap adapter
//!
//! Behind the `clap` feature (on by default), [`bind_matches`] binds only
//! the arguments the user actually typed, so clap-side defaults never mask
//! values from earlier layers.
//!
//! # Error handling
//!
//! All binding operations return [`BindError`]. The first error aborts the
//! call: the failing field is unchanged, fields bound before it keep their
//! new values. Errors carry the field name and the dotted input path.

pub mod coerce;
pub mod error;
pub mod types;

mod bind;
#[cfg(feature = "clap")]
mod cli;
mod env;
mod macros;
mod ser;
mod value;

#[cfg(test)]
mod fixtures;

pub use bind::{
    bind, bind_flags, bind_record, bind_serialized, Bindable, Binding, Context, Element, Field,
    Record, FLAG_NAMESPACE,
};
#[cfg(feature = "clap")]
pub use cli::{bind_matches, explicit_flags};
pub use coerce::coerce;
pub use env::env_to_table;
pub use error::{BindError, CoercionCause, CoercionError};
pub use ser::{to_table, to_value, SerializeError};
pub use types::{ScalarKind, ScalarValue, Shape};
pub use value::{table_from_toml, ConfigValue, Table};
