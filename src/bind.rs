//! The binder: walk a record's field table and merge a [`Table`] into it.
//!
//! Fields are visited in declaration order. For each field:
//!
//! 1. `flatten` fields recurse with the *same* mapping (no extra nesting).
//! 2. Fields without a non-empty tag for the active namespace are skipped.
//! 3. Fields whose key is absent from the mapping are left untouched.
//! 4. Otherwise the field binds the raw value according to its shape:
//!    records merge in place, mappings and sequences are rebuilt and replace
//!    the old contents wholesale, scalars go through the [`coerce`] matrix.
//!
//! The first error aborts the whole call. The failing field is never
//! written; fields bound before it keep their new values.
//!
//! Binding the same record concurrently from several threads is not
//! supported; `&mut` access makes the caller serialize it.

use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, trace};

use crate::coerce;
use crate::error::{BindError, CoercionError};
use crate::ser;
use crate::types::{ScalarKind, Shape};
use crate::value::{ConfigValue, Table};

/// Namespace used by [`bind_flags`].
pub const FLAG_NAMESPACE: &str = "flag";

/// How a field participates in binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Never bound.
    Untagged,
    /// Embedded record, matched against the enclosing mapping.
    Flatten,
    /// `(namespace, key)` pairs.
    Tags(&'static [(&'static str, &'static str)]),
}

impl Binding {
    /// The key this field answers to under `namespace`, if any.
    pub fn tag(&self, namespace: &str) -> Option<&'static str> {
        match self {
            Binding::Tags(tags) => tags
                .iter()
                .find(|(ns, _)| *ns == namespace)
                .map(|(_, key)| *key)
                .filter(|key| !key.is_empty()),
            Binding::Untagged | Binding::Flatten => None,
        }
    }
}

/// One entry of a record's field table: its name, binding and a mutable
/// handle on the field itself.
pub struct Field<'a> {
    name: &'static str,
    binding: Binding,
    target: &'a mut dyn Bindable,
}

impl<'a> Field<'a> {
    pub fn new(name: &'static str, binding: Binding, target: &'a mut dyn Bindable) -> Self {
        Self {
            name,
            binding,
            target,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn binding(&self) -> Binding {
        self.binding
    }

    pub fn shape(&self) -> Shape {
        self.target.shape()
    }
}

/// A struct-shaped value with a table of bindable fields.
///
/// Usually implemented through [`record!`](crate::record). A hand-written
/// impl returns one [`Field`] per field in declaration order and pairs it
/// with a [`Bindable`] impl that forwards to [`bind_record`].
pub trait Record {
    fn fields(&mut self) -> Vec<Field<'_>>;
}

/// A value that can be overwritten from a [`ConfigValue`].
pub trait Bindable {
    /// The declared structural kind.
    fn shape(&self) -> Shape;

    /// Bind `raw` into `self`. On error `self` is unchanged, except that a
    /// record keeps whatever fields were bound before the failure.
    fn bind_value(&mut self, raw: &ConfigValue, cx: &Context<'_>) -> Result<(), BindError>;

    fn as_record(&mut self) -> Option<&mut dyn Record> {
        None
    }
}

/// A type that can live inside a `Vec`, or be a mapping key or value.
///
/// Elements are built from `Default` and then bound. The sequence hooks let
/// `String` and the float types accept comma-separated strings.
pub trait Element: Bindable + Default {
    fn sequence_shape() -> Shape {
        Shape::Sequence
    }

    fn bind_sequence(raw: &ConfigValue, cx: &Context<'_>) -> Result<Vec<Self>, BindError> {
        let ConfigValue::Sequence(items) = raw else {
            return Err(cx.shape_mismatch(Shape::Sequence, raw));
        };
        items
            .iter()
            .enumerate()
            .map(|(index, item)| fresh(item, &cx.index(index)))
            .collect()
    }
}

/// Where in the input a bind is happening, for diagnostics.
#[derive(Debug, Clone)]
pub struct Context<'a> {
    namespace: &'a str,
    field: &'static str,
    path: String,
}

impl<'a> Context<'a> {
    pub fn root(namespace: &'a str) -> Self {
        Self {
            namespace,
            field: "<root>",
            path: String::new(),
        }
    }

    pub fn namespace(&self) -> &'a str {
        self.namespace
    }

    /// Logical name of the record field being bound.
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Dotted input path, e.g. `server.tags[2]`.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn enter(&self, field: &'static str, key: &str) -> Self {
        Self {
            namespace: self.namespace,
            field,
            path: dotted(&self.path, key),
        }
    }

    /// Descend into a mapping entry.
    pub fn key(&self, key: &str) -> Self {
        Self {
            namespace: self.namespace,
            field: self.field,
            path: dotted(&self.path, key),
        }
    }

    /// Descend into a sequence element.
    pub fn index(&self, index: usize) -> Self {
        Self {
            namespace: self.namespace,
            field: self.field,
            path: format!("{}[{index}]", self.path),
        }
    }

    pub fn shape_mismatch(&self, expected: Shape, found: &ConfigValue) -> BindError {
        BindError::ShapeMismatch {
            field: self.field,
            path: self.path.clone(),
            expected,
            found: found.type_name(),
        }
    }

    fn duplicate_key(&self, key: &str) -> BindError {
        BindError::DuplicateKey {
            field: self.field,
            path: self.path.clone(),
            key: key.to_string(),
        }
    }

    pub fn coercion(&self, source: CoercionError) -> BindError {
        BindError::Coercion {
            field: self.field,
            path: self.path.clone(),
            source,
        }
    }
}

fn dotted(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Bind `input` into the record behind `target`, honoring tags of `namespace`.
///
/// Fails with [`BindError::InvalidTarget`] if `target` is not a record, and
/// with [`BindError::AbsentRecord`] if it is an optional record set to `None`.
pub fn bind(target: &mut dyn Bindable, namespace: &str, input: &Table) -> Result<(), BindError> {
    let shape = target.shape();
    let Some(record) = target.as_record() else {
        if shape == Shape::Record {
            return Err(BindError::AbsentRecord);
        }
        return Err(BindError::InvalidTarget { found: shape });
    };
    debug!(namespace, keys = input.len(), "binding configuration");
    merge_record(record, input, &Context::root(namespace))
}

/// Bind explicitly set command-line flags under [`FLAG_NAMESPACE`].
///
/// Only pass flags the user actually set: an absent key leaves the field
/// alone, so values bound earlier from files or the environment survive.
pub fn bind_flags<I, K, V>(target: &mut dyn Bindable, flags: I) -> Result<(), BindError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let table: Table = flags
        .into_iter()
        .map(|(name, value)| (name.into(), ConfigValue::String(value.into())))
        .collect();
    bind(target, FLAG_NAMESPACE, &table)
}

/// Serialize `source` into a tree and bind it. `None` fields are skipped, so
/// a clap derive struct of `Option`s only contributes what was set.
pub fn bind_serialized<S: Serialize + ?Sized>(
    target: &mut dyn Bindable,
    namespace: &str,
    source: &S,
) -> Result<(), BindError> {
    let table = ser::to_table(source)?;
    bind(target, namespace, &table)
}

/// Merge a mapping value into `record`; the [`Bindable`] body of every record.
pub fn bind_record(
    record: &mut dyn Record,
    raw: &ConfigValue,
    cx: &Context<'_>,
) -> Result<(), BindError> {
    let ConfigValue::Mapping(table) = raw else {
        return Err(cx.shape_mismatch(Shape::Record, raw));
    };
    merge_record(record, table, cx)
}

fn merge_record(record: &mut dyn Record, input: &Table, cx: &Context<'_>) -> Result<(), BindError> {
    for Field {
        name,
        binding,
        target,
    } in record.fields()
    {
        if binding == Binding::Flatten {
            let shape = target.shape();
            match target.as_record() {
                Some(inner) => merge_record(inner, input, cx)?,
                None if shape == Shape::Record => {
                    trace!(field = name, "embedded record not present, skipped");
                }
                None => return Err(BindError::InvalidTarget { found: shape }),
            }
            continue;
        }

        let Some(key) = binding.tag(cx.namespace()) else {
            continue;
        };
        let Some(raw) = input.get(key) else {
            trace!(field = name, key, "no input for field");
            continue;
        };
        target.bind_value(raw, &cx.enter(name, key))?;
    }
    Ok(())
}

fn fresh<T: Bindable + Default>(raw: &ConfigValue, cx: &Context<'_>) -> Result<T, BindError> {
    let mut value = T::default();
    value.bind_value(raw, cx)?;
    Ok(value)
}

fn expect_mapping<'v>(raw: &'v ConfigValue, cx: &Context<'_>) -> Result<&'v Table, BindError> {
    raw.as_mapping()
        .ok_or_else(|| cx.shape_mismatch(Shape::Mapping, raw))
}

/// Keys are bound from their string form, values from the entry.
fn entry<K, V>(key: &str, value: &ConfigValue, cx: &Context<'_>) -> Result<(K, V), BindError>
where
    K: Bindable + Default,
    V: Bindable + Default,
{
    let cx = cx.key(key);
    let k = fresh(&ConfigValue::String(key.to_string()), &cx)?;
    let v = fresh(value, &cx)?;
    Ok((k, v))
}

/// Bind every entry of a mapping through `insert`, which hands back any value
/// it displaced. Two input keys that coerce to the same typed key (`"01"` and
/// `"1"` for an integer key) are rejected rather than silently merged.
fn bind_entries<K, V>(
    raw: &ConfigValue,
    cx: &Context<'_>,
    mut insert: impl FnMut(K, V) -> Option<V>,
) -> Result<(), BindError>
where
    K: Bindable + Default,
    V: Bindable + Default,
{
    for (key, value) in expect_mapping(raw, cx)? {
        let (k, v) = entry(key, value, cx)?;
        if insert(k, v).is_some() {
            return Err(cx.key(key).duplicate_key(key));
        }
    }
    Ok(())
}

// --- scalars ---

macro_rules! bind_integer {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl Bindable for $ty {
            fn shape(&self) -> Shape {
                Shape::Scalar(ScalarKind::$kind)
            }

            fn bind_value(&mut self, raw: &ConfigValue, cx: &Context<'_>) -> Result<(), BindError> {
                *self = coerce::integer(ScalarKind::$kind, raw).map_err(|e| cx.coercion(e))?;
                Ok(())
            }
        }

        impl Element for $ty {}
    )*};
}

bind_integer!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
);

impl Bindable for bool {
    fn shape(&self) -> Shape {
        Shape::Scalar(ScalarKind::Bool)
    }

    fn bind_value(&mut self, raw: &ConfigValue, cx: &Context<'_>) -> Result<(), BindError> {
        *self = coerce::boolean(raw).map_err(|e| cx.coercion(e))?;
        Ok(())
    }
}

impl Element for bool {}

impl Bindable for f32 {
    fn shape(&self) -> Shape {
        Shape::Scalar(ScalarKind::F32)
    }

    fn bind_value(&mut self, raw: &ConfigValue, cx: &Context<'_>) -> Result<(), BindError> {
        *self = coerce::float32(raw).map_err(|e| cx.coercion(e))?;
        Ok(())
    }
}

impl Element for f32 {
    fn sequence_shape() -> Shape {
        Shape::Scalar(ScalarKind::F32Seq)
    }

    fn bind_sequence(raw: &ConfigValue, cx: &Context<'_>) -> Result<Vec<Self>, BindError> {
        coerce::float32_seq(raw).map_err(|e| cx.coercion(e))
    }
}

impl Bindable for f64 {
    fn shape(&self) -> Shape {
        Shape::Scalar(ScalarKind::F64)
    }

    fn bind_value(&mut self, raw: &ConfigValue, cx: &Context<'_>) -> Result<(), BindError> {
        *self = coerce::float(ScalarKind::F64, raw).map_err(|e| cx.coercion(e))?;
        Ok(())
    }
}

impl Element for f64 {
    fn sequence_shape() -> Shape {
        Shape::Scalar(ScalarKind::F64Seq)
    }

    fn bind_sequence(raw: &ConfigValue, cx: &Context<'_>) -> Result<Vec<Self>, BindError> {
        coerce::float_seq(ScalarKind::F64Seq, raw).map_err(|e| cx.coercion(e))
    }
}

impl Bindable for String {
    fn shape(&self) -> Shape {
        Shape::Scalar(ScalarKind::String)
    }

    fn bind_value(&mut self, raw: &ConfigValue, cx: &Context<'_>) -> Result<(), BindError> {
        *self = coerce::string(raw).map_err(|e| cx.coercion(e))?;
        Ok(())
    }
}

impl Element for String {
    fn sequence_shape() -> Shape {
        Shape::Scalar(ScalarKind::StringSeq)
    }

    fn bind_sequence(raw: &ConfigValue, cx: &Context<'_>) -> Result<Vec<Self>, BindError> {
        coerce::string_seq(raw).map_err(|e| cx.coercion(e))
    }
}

impl Bindable for Duration {
    fn shape(&self) -> Shape {
        Shape::Scalar(ScalarKind::Duration)
    }

    fn bind_value(&mut self, raw: &ConfigValue, cx: &Context<'_>) -> Result<(), BindError> {
        *self = coerce::duration(raw).map_err(|e| cx.coercion(e))?;
        Ok(())
    }
}

impl Element for Duration {}

impl Bindable for ConfigValue {
    fn shape(&self) -> Shape {
        Shape::Scalar(ScalarKind::Opaque)
    }

    fn bind_value(&mut self, raw: &ConfigValue, _cx: &Context<'_>) -> Result<(), BindError> {
        *self = raw.clone();
        Ok(())
    }
}

impl Element for ConfigValue {}

// --- containers ---

impl<T: Element> Bindable for Vec<T> {
    fn shape(&self) -> Shape {
        T::sequence_shape()
    }

    fn bind_value(&mut self, raw: &ConfigValue, cx: &Context<'_>) -> Result<(), BindError> {
        *self = T::bind_sequence(raw, cx)?;
        Ok(())
    }
}

impl<T: Element> Element for Vec<T> {}

impl<K, V, S> Bindable for HashMap<K, V, S>
where
    K: Bindable + Default + Eq + Hash,
    V: Bindable + Default,
    S: BuildHasher + Default,
{
    fn shape(&self) -> Shape {
        Shape::Mapping
    }

    fn bind_value(&mut self, raw: &ConfigValue, cx: &Context<'_>) -> Result<(), BindError> {
        let mut map = HashMap::<K, V, S>::default();
        bind_entries(raw, cx, |k, v| map.insert(k, v))?;
        *self = map;
        Ok(())
    }
}

impl<K, V, S> Element for HashMap<K, V, S>
where
    K: Bindable + Default + Eq + Hash,
    V: Bindable + Default,
    S: BuildHasher + Default,
{
}

impl<K, V> Bindable for BTreeMap<K, V>
where
    K: Bindable + Default + Ord,
    V: Bindable + Default,
{
    fn shape(&self) -> Shape {
        Shape::Mapping
    }

    fn bind_value(&mut self, raw: &ConfigValue, cx: &Context<'_>) -> Result<(), BindError> {
        let mut map = BTreeMap::<K, V>::new();
        bind_entries(raw, cx, |k, v| map.insert(k, v))?;
        *self = map;
        Ok(())
    }
}

impl<K, V> Element for BTreeMap<K, V>
where
    K: Bindable + Default + Ord,
    V: Bindable + Default,
{
}

impl<T: Bindable + Default> Bindable for Option<T> {
    fn shape(&self) -> Shape {
        match self {
            Some(value) => value.shape(),
            None => T::default().shape(),
        }
    }

    /// Binds into the existing value, or into a fresh default that becomes `Some`.
    fn bind_value(&mut self, raw: &ConfigValue, cx: &Context<'_>) -> Result<(), BindError> {
        match self {
            Some(value) => value.bind_value(raw, cx),
            None => {
                *self = Some(fresh(raw, cx)?);
                Ok(())
            }
        }
    }

    fn as_record(&mut self) -> Option<&mut dyn Record> {
        self.as_mut().and_then(|value| value.as_record())
    }
}

impl<T: Bindable + Default> Element for Option<T> {}
