//! Custom serde Serializer that turns any `Serialize` value into a
//! [`ConfigValue`] tree, dropping `Option::None` without requiring
//! `#[serde(skip_serializing_if)]`.
//!
//! This is how a clap derive struct (or any serializable override source)
//! becomes bind input: unset `Option` fields vanish instead of turning into
//! keys that would clobber values bound from other sources.

use serde::ser::{self, Serialize};
use thiserror::Error;

use crate::value::{ConfigValue, Table};

/// Serialize `source` into a tree. `None` and unit values produce `Ok(None)`.
///
/// Structs and maps become mappings and sequences and tuples become sequences:
/// `Args { retries: Some(3), name: None }` → `{retries = 3}`. Unit enum
/// variants become their name; variants carrying data become a single-key
/// mapping named after the variant: `Mode::Port(8)` → `{Port = 8}`.
pub fn to_value<S: Serialize + ?Sized>(source: &S) -> Result<Option<ConfigValue>, SerializeError> {
    source.serialize(ValueSerializer)
}

/// Serialize `source`, which must be struct- or map-shaped, into a [`Table`].
pub fn to_table<S: Serialize + ?Sized>(source: &S) -> Result<Table, SerializeError> {
    match to_value(source)? {
        Some(ConfigValue::Mapping(table)) => Ok(table),
        None => Ok(Table::new()),
        Some(other) => Err(SerializeError(format!(
            "expected a struct or map, found {}",
            other.type_name()
        ))),
    }
}

#[derive(Debug, Error)]
#[error("serialize error: {0}")]
pub struct SerializeError(String);

impl ser::Error for SerializeError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        SerializeError(msg.to_string())
    }
}

struct ValueSerializer;

type Out = Result<Option<ConfigValue>, SerializeError>;

impl ser::Serializer for ValueSerializer {
    type Ok = Option<ConfigValue>;
    type Error = SerializeError;
    type SerializeSeq = SeqSerializer;
    type SerializeTuple = SeqSerializer;
    type SerializeTupleStruct = SeqSerializer;
    type SerializeTupleVariant = SeqSerializer;
    type SerializeMap = MapSerializer;
    type SerializeStruct = MapSerializer;
    type SerializeStructVariant = MapSerializer;

    fn serialize_bool(self, v: bool) -> Out {
        Ok(Some(v.into()))
    }

    fn serialize_i8(self, v: i8) -> Out {
        Ok(Some(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Out {
        Ok(Some(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Out {
        Ok(Some(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Out {
        Ok(Some(v.into()))
    }

    fn serialize_u8(self, v: u8) -> Out {
        Ok(Some(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Out {
        Ok(Some(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Out {
        Ok(Some(v.into()))
    }

    fn serialize_u64(self, v: u64) -> Out {
        Ok(Some(v.into()))
    }

    fn serialize_f32(self, v: f32) -> Out {
        Ok(Some(v.into()))
    }

    fn serialize_f64(self, v: f64) -> Out {
        Ok(Some(v.into()))
    }

    fn serialize_char(self, v: char) -> Out {
        Ok(Some(ConfigValue::String(v.to_string())))
    }

    fn serialize_str(self, v: &str) -> Out {
        Ok(Some(v.into()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Out {
        Ok(Some(ConfigValue::Sequence(
            v.iter().map(|b| ConfigValue::from(*b)).collect(),
        )))
    }

    fn serialize_none(self) -> Out {
        Ok(None)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Out {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Out {
        Ok(None)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Out {
        Ok(None)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Out {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Out {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Out {
        Ok(value
            .serialize(self)?
            .map(|value| tagged(Some(variant), value)))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqSerializer, SerializeError> {
        Ok(SeqSerializer {
            items: Vec::with_capacity(len.unwrap_or(0)),
            variant: None,
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqSerializer, SerializeError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqSerializer, SerializeError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SeqSerializer, SerializeError> {
        Ok(SeqSerializer {
            items: Vec::with_capacity(len),
            variant: Some(variant),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapSerializer, SerializeError> {
        Ok(MapSerializer::default())
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<MapSerializer, SerializeError> {
        Ok(MapSerializer::default())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<MapSerializer, SerializeError> {
        Ok(MapSerializer {
            variant: Some(variant),
            ..MapSerializer::default()
        })
    }
}

/// Wrap the payload of a data-carrying enum variant as `{variant = value}`.
fn tagged(variant: Option<&'static str>, value: ConfigValue) -> ConfigValue {
    match variant {
        Some(name) => ConfigValue::Mapping(Table::from([(name.to_string(), value)])),
        None => value,
    }
}

// --- sequences ---

struct SeqSerializer {
    items: Vec<ConfigValue>,
    variant: Option<&'static str>,
}

impl ser::SerializeSeq for SeqSerializer {
    type Ok = Option<ConfigValue>;
    type Error = SerializeError;

    fn serialize_element<T: Serialize + ?Sized>(
        &mut self,
        value: &T,
    ) -> Result<(), SerializeError> {
        self.items.extend(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Out {
        Ok(Some(tagged(self.variant, ConfigValue::Sequence(self.items))))
    }
}

impl ser::SerializeTuple for SeqSerializer {
    type Ok = Option<ConfigValue>;
    type Error = SerializeError;

    fn serialize_element<T: Serialize + ?Sized>(
        &mut self,
        value: &T,
    ) -> Result<(), SerializeError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Out {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SeqSerializer {
    type Ok = Option<ConfigValue>;
    type Error = SerializeError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), SerializeError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Out {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleVariant for SeqSerializer {
    type Ok = Option<ConfigValue>;
    type Error = SerializeError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), SerializeError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Out {
        ser::SerializeSeq::end(self)
    }
}

// --- maps and structs ---

#[derive(Default)]
struct MapSerializer {
    table: Table,
    current_key: Option<String>,
    variant: Option<&'static str>,
}

impl MapSerializer {
    fn insert<T: Serialize + ?Sized>(
        &mut self,
        key: String,
        value: &T,
    ) -> Result<(), SerializeError> {
        if let Some(value) = value.serialize(ValueSerializer)? {
            self.table.insert(key, value);
        }
        Ok(())
    }
}

impl ser::SerializeMap for MapSerializer {
    type Ok = Option<ConfigValue>;
    type Error = SerializeError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), SerializeError> {
        self.current_key = Some(key.serialize(KeySerializer)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), SerializeError> {
        let key = self
            .current_key
            .take()
            .ok_or_else(|| SerializeError("map value without a key".into()))?;
        self.insert(key, value)
    }

    fn end(self) -> Out {
        Ok(Some(tagged(self.variant, ConfigValue::Mapping(self.table))))
    }
}

impl ser::SerializeStruct for MapSerializer {
    type Ok = Option<ConfigValue>;
    type Error = SerializeError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), SerializeError> {
        self.insert(key.to_string(), value)
    }

    fn end(self) -> Out {
        ser::SerializeMap::end(self)
    }
}

impl ser::SerializeStructVariant for MapSerializer {
    type Ok = Option<ConfigValue>;
    type Error = SerializeError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), SerializeError> {
        ser::SerializeStruct::serialize_field(self, key, value)
    }

    fn end(self) -> Out {
        ser::SerializeMap::end(self)
    }
}

// --- Key serializer (map keys become strings) ---

struct KeySerializer;

fn key_error() -> SerializeError {
    SerializeError("map keys must be scalars".into())
}

type KeyOut = Result<String, SerializeError>;

impl ser::Serializer for KeySerializer {
    type Ok = String;
    type Error = SerializeError;
    type SerializeSeq = ser::Impossible<String, SerializeError>;
    type SerializeTuple = ser::Impossible<String, SerializeError>;
    type SerializeTupleStruct = ser::Impossible<String, SerializeError>;
    type SerializeTupleVariant = ser::Impossible<String, SerializeError>;
    type SerializeMap = ser::Impossible<String, SerializeError>;
    type SerializeStruct = ser::Impossible<String, SerializeError>;
    type SerializeStructVariant = ser::Impossible<String, SerializeError>;

    fn serialize_str(self, v: &str) -> KeyOut {
        Ok(v.to_string())
    }

    fn serialize_char(self, v: char) -> KeyOut {
        Ok(v.to_string())
    }

    fn serialize_bool(self, v: bool) -> KeyOut {
        Ok(v.to_string())
    }

    fn serialize_i8(self, v: i8) -> KeyOut {
        Ok(v.to_string())
    }

    fn serialize_i16(self, v: i16) -> KeyOut {
        Ok(v.to_string())
    }

    fn serialize_i32(self, v: i32) -> KeyOut {
        Ok(v.to_string())
    }

    fn serialize_i64(self, v: i64) -> KeyOut {
        Ok(v.to_string())
    }

    fn serialize_u8(self, v: u8) -> KeyOut {
        Ok(v.to_string())
    }

    fn serialize_u16(self, v: u16) -> KeyOut {
        Ok(v.to_string())
    }

    fn serialize_u32(self, v: u32) -> KeyOut {
        Ok(v.to_string())
    }

    fn serialize_u64(self, v: u64) -> KeyOut {
        Ok(v.to_string())
    }

    fn serialize_f32(self, _: f32) -> KeyOut {
        Err(key_error())
    }

    fn serialize_f64(self, _: f64) -> KeyOut {
        Err(key_error())
    }

    fn serialize_bytes(self, _: &[u8]) -> KeyOut {
        Err(key_error())
    }

    fn serialize_none(self) -> KeyOut {
        Err(key_error())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> KeyOut {
        value.serialize(self)
    }

    fn serialize_unit(self) -> KeyOut {
        Err(key_error())
    }

    fn serialize_unit_struct(self, _: &'static str) -> KeyOut {
        Err(key_error())
    }

    fn serialize_unit_variant(self, _: &'static str, _: u32, variant: &'static str) -> KeyOut {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        value: &T,
    ) -> KeyOut {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: &T,
    ) -> KeyOut {
        Err(key_error())
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Self::SerializeSeq, SerializeError> {
        Err(key_error())
    }

    fn serialize_tuple(self, _: usize) -> Result<Self::SerializeTuple, SerializeError> {
        Err(key_error())
    }

    fn serialize_tuple_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleStruct, SerializeError> {
        Err(key_error())
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleVariant, SerializeError> {
        Err(key_error())
    }

    fn serialize_map(self, _: Option<usize>) -> Result<Self::SerializeMap, SerializeError> {
        Err(key_error())
    }

    fn serialize_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStruct, SerializeError> {
        Err(key_error())
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStructVariant, SerializeError> {
        Err(key_error())
    }
}
