//! Locates struct fields that hold NaN or infinite floats
//!
//! `serde_json` writes non-finite floats as `null`, which the extractor would
//! read as "clear this field". This serializer walks the entity once, before
//! the JSON pass, and reports those fields by their serialized name.

use serde::Serialize;
use serde::ser;
use std::fmt;
use std::marker::PhantomData;

#[derive(Debug)]
pub struct ScanError(pub String);

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ScanError {}

impl ser::Error for ScanError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ScanError(format!("{}", msg))
    }
}

/// Top-level fields whose value is a non-finite float, with that value
pub fn non_finite_fields<T: Serialize + ?Sized>(
    value: &T,
) -> Result<Vec<(&'static str, f64)>, ScanError> {
    let mut found = Vec::new();
    value.serialize(StructScanner { found: &mut found })?;
    Ok(found)
}

/// Serializer for the entity itself; only struct fields are inspected
struct StructScanner<'a> {
    found: &'a mut Vec<(&'static str, f64)>,
}

impl<'a> ser::Serializer for StructScanner<'a> {
    type Ok = ();
    type Error = ScanError;

    type SerializeSeq = Skip<()>;
    type SerializeTuple = Skip<()>;
    type SerializeTupleStruct = Skip<()>;
    type SerializeTupleVariant = Skip<()>;
    type SerializeMap = Skip<()>;
    type SerializeStruct = FieldScanner<'a>;
    type SerializeStructVariant = Skip<()>;

    fn serialize_bool(self, _v: bool) -> Result<(), ScanError> {
        Ok(())
    }

    fn serialize_i8(self, _v: i8) -> Result<(), ScanError> {
        Ok(())
    }

    fn serialize_i16(self, _v: i16) -> Result<(), ScanError> {
        Ok(())
    }

    fn serialize_i32(self, _v: i32) -> Result<(), ScanError> {
        Ok(())
    }

    fn serialize_i64(self, _v: i64) -> Result<(), ScanError> {
        Ok(())
    }

    fn serialize_u8(self, _v: u8) -> Result<(), ScanError> {
        Ok(())
    }

    fn serialize_u16(self, _v: u16) -> Result<(), ScanError> {
        Ok(())
    }

    fn serialize_u32(self, _v: u32) -> Result<(), ScanError> {
        Ok(())
    }

    fn serialize_u64(self, _v: u64) -> Result<(), ScanError> {
        Ok(())
    }

    fn serialize_f32(self, _v: f32) -> Result<(), ScanError> {
        Ok(())
    }

    fn serialize_f64(self, _v: f64) -> Result<(), ScanError> {
        Ok(())
    }

    fn serialize_char(self, _v: char) -> Result<(), ScanError> {
        Ok(())
    }

    fn serialize_str(self, _v: &str) -> Result<(), ScanError> {
        Ok(())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<(), ScanError> {
        Ok(())
    }

    fn serialize_none(self) -> Result<(), ScanError> {
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<(), ScanError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), ScanError> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), ScanError> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<(), ScanError> {
        Ok(())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), ScanError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<(), ScanError> {
        Ok(())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, ScanError> {
        Ok(Skip::new())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, ScanError> {
        Ok(Skip::new())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, ScanError> {
        Ok(Skip::new())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, ScanError> {
        Ok(Skip::new())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, ScanError> {
        Ok(Skip::new())
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, ScanError> {
        Ok(FieldScanner { found: self.found })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, ScanError> {
        Ok(Skip::new())
    }
}

struct FieldScanner<'a> {
    found: &'a mut Vec<(&'static str, f64)>,
}

impl ser::SerializeStruct for FieldScanner<'_> {
    type Ok = ();
    type Error = ScanError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ScanError> {
        if let Some(v) = value.serialize(NonFiniteCheck)? {
            self.found.push((key, v));
        }
        Ok(())
    }

    fn end(self) -> Result<(), ScanError> {
        Ok(())
    }
}

/// Serializer for one field value: yields the float if it is not finite
struct NonFiniteCheck;

type Checked = Result<Option<f64>, ScanError>;

impl ser::Serializer for NonFiniteCheck {
    type Ok = Option<f64>;
    type Error = ScanError;

    type SerializeSeq = Skip<Option<f64>>;
    type SerializeTuple = Skip<Option<f64>>;
    type SerializeTupleStruct = Skip<Option<f64>>;
    type SerializeTupleVariant = Skip<Option<f64>>;
    type SerializeMap = Skip<Option<f64>>;
    type SerializeStruct = Skip<Option<f64>>;
    type SerializeStructVariant = Skip<Option<f64>>;

    fn serialize_bool(self, _v: bool) -> Checked {
        Ok(None)
    }

    fn serialize_i8(self, _v: i8) -> Checked {
        Ok(None)
    }

    fn serialize_i16(self, _v: i16) -> Checked {
        Ok(None)
    }

    fn serialize_i32(self, _v: i32) -> Checked {
        Ok(None)
    }

    fn serialize_i64(self, _v: i64) -> Checked {
        Ok(None)
    }

    fn serialize_u8(self, _v: u8) -> Checked {
        Ok(None)
    }

    fn serialize_u16(self, _v: u16) -> Checked {
        Ok(None)
    }

    fn serialize_u32(self, _v: u32) -> Checked {
        Ok(None)
    }

    fn serialize_u64(self, _v: u64) -> Checked {
        Ok(None)
    }

    fn serialize_f32(self, v: f32) -> Checked {
        self.serialize_f64(v as f64)
    }

    fn serialize_f64(self, v: f64) -> Checked {
        Ok((!v.is_finite()).then_some(v))
    }

    fn serialize_char(self, _v: char) -> Checked {
        Ok(None)
    }

    fn serialize_str(self, _v: &str) -> Checked {
        Ok(None)
    }

    fn serialize_bytes(self, _v: &[u8]) -> Checked {
        Ok(None)
    }

    fn serialize_none(self) -> Checked {
        Ok(None)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Checked {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Checked {
        Ok(None)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Checked {
        Ok(None)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Checked {
        Ok(None)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Checked {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Checked {
        Ok(None)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, ScanError> {
        Ok(Skip::new())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, ScanError> {
        Ok(Skip::new())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, ScanError> {
        Ok(Skip::new())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, ScanError> {
        Ok(Skip::new())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, ScanError> {
        Ok(Skip::new())
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, ScanError> {
        Ok(Skip::new())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, ScanError> {
        Ok(Skip::new())
    }
}

/// Compound serializer that ignores its contents
struct Skip<T>(PhantomData<T>);

impl<T> Skip<T> {
    fn new() -> Self {
        Skip(PhantomData)
    }
}

impl<T: Default> ser::SerializeSeq for Skip<T> {
    type Ok = T;
    type Error = ScanError;

    fn serialize_element<V: ?Sized + Serialize>(&mut self, _value: &V) -> Result<(), ScanError> {
        Ok(())
    }

    fn end(self) -> Result<T, ScanError> {
        Ok(T::default())
    }
}

impl<T: Default> ser::SerializeTuple for Skip<T> {
    type Ok = T;
    type Error = ScanError;

    fn serialize_element<V: ?Sized + Serialize>(&mut self, _value: &V) -> Result<(), ScanError> {
        Ok(())
    }

    fn end(self) -> Result<T, ScanError> {
        Ok(T::default())
    }
}

impl<T: Default> ser::SerializeTupleStruct for Skip<T> {
    type Ok = T;
    type Error = ScanError;

    fn serialize_field<V: ?Sized + Serialize>(&mut self, _value: &V) -> Result<(), ScanError> {
        Ok(())
    }

    fn end(self) -> Result<T, ScanError> {
        Ok(T::default())
    }
}

impl<T: Default> ser::SerializeTupleVariant for Skip<T> {
    type Ok = T;
    type Error = ScanError;

    fn serialize_field<V: ?Sized + Serialize>(&mut self, _value: &V) -> Result<(), ScanError> {
        Ok(())
    }

    fn end(self) -> Result<T, ScanError> {
        Ok(T::default())
    }
}

impl<T: Default> ser::SerializeMap for Skip<T> {
    type Ok = T;
    type Error = ScanError;

    fn serialize_key<K: ?Sized + Serialize>(&mut self, _key: &K) -> Result<(), ScanError> {
        Ok(())
    }

    fn serialize_value<V: ?Sized + Serialize>(&mut self, _value: &V) -> Result<(), ScanError> {
        Ok(())
    }

    fn end(self) -> Result<T, ScanError> {
        Ok(T::default())
    }
}

impl<T: Default> ser::SerializeStruct for Skip<T> {
    type Ok = T;
    type Error = ScanError;

    fn serialize_field<V: ?Sized + Serialize>(
        &mut self,
        _key: &'static str,
        _value: &V,
    ) -> Result<(), ScanError> {
        Ok(())
    }

    fn end(self) -> Result<T, ScanError> {
        Ok(T::default())
    }
}

impl<T: Default> ser::SerializeStructVariant for Skip<T> {
    type Ok = T;
    type Error = ScanError;

    fn serialize_field<V: ?Sized + Serialize>(
        &mut self,
        _key: &'static str,
        _value: &V,
    ) -> Result<(), ScanError> {
        Ok(())
    }

    fn end(self) -> Result<T, ScanError> {
        Ok(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::types::Tristate;

    #[derive(Serialize)]
    struct Reading {
        #[serde(rename = "Value__c")]
        value: Option<f64>,
        #[serde(rename = "Ratio__c")]
        ratio: f32,
        #[serde(rename = "Note__c")]
        note: Tristate<f64>,
        #[serde(rename = "Label__c")]
        label: String,
        #[serde(rename = "Samples__c")]
        samples: Vec<f64>,
    }

    #[test]
    fn test_finite_values_report_nothing() {
        let reading = Reading {
            value: Some(1.5),
            ratio: 0.25,
            note: Tristate::Null,
            label: "ok".to_string(),
            samples: vec![f64::NAN],
        };
        assert!(non_finite_fields(&reading).unwrap().is_empty());
    }

    #[test]
    fn test_non_finite_values_are_reported_by_serialized_name() {
        let reading = Reading {
            value: Some(f64::NAN),
            ratio: f32::INFINITY,
            note: Tristate::Value(f64::NEG_INFINITY),
            label: String::new(),
            samples: Vec::new(),
        };
        let found = non_finite_fields(&reading).unwrap();
        let names: Vec<&str> = found.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["Value__c", "Ratio__c", "Note__c"]);
        assert!(found[0].1.is_nan());
        assert_eq!(found[2].1, f64::NEG_INFINITY);
    }
}
