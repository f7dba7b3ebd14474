use core::convert::TryFrom;
use core::fmt;

use serde::de::{self, Deserialize, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};

use super::{Array, Object, Str, Value, DEFAULT_TABLE_SIZE};
use crate::allocator::{AllocError, Allocator, Global};

fn out_of_memory<E: de::Error>(_: AllocError) -> E {
    E::custom("memory allocation failed")
}

/// Deserializes a [`Value`] whose buffers come from the wrapped allocator
///
/// ```
/// use serde::de::DeserializeSeed;
/// use jsonslot::{value::ValueSeed, Budget, Global};
///
/// let budget = Budget::new(Global, 1 << 16);
/// let mut de = serde_json::Deserializer::from_str(r#"{"a": [1, 2]}"#);
/// let value = ValueSeed(&budget).deserialize(&mut de).unwrap();
/// assert!(budget.in_use() > 0);
/// # drop(value);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct ValueSeed<A>(pub A);

impl<'de, A: Allocator> DeserializeSeed<'de> for ValueSeed<A> {
    type Value = Value<A>;

    fn deserialize<D>(self, deserializer: D) -> Result<Value<A>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor(self.0))
    }
}

impl<'de> Deserialize<'de> for Value<Global> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        ValueSeed(Global).deserialize(deserializer)
    }
}

struct ValueVisitor<A>(A);

impl<'de, A: Allocator> Visitor<'de> for ValueVisitor<A> {
    type Value = Value<A>;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value<A>, E> {
        Ok(Value::Boolean(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value<A>, E> {
        Ok(Value::Integer(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value<A>, E> {
        Ok(match i64::try_from(v) {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::Decimal(v as f64),
        })
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value<A>, E> {
        Ok(Value::Decimal(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value<A>, E> {
        self.visit_bytes(v.as_bytes())
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Value<A>, E> {
        Value::try_string_in(v, self.0).map_err(out_of_memory)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value<A>, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value<A>, E> {
        Ok(Value::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Value<A>, D::Error>
    where
        D: Deserializer<'de>,
    {
        ValueSeed(self.0).deserialize(deserializer)
    }

    fn visit_seq<S>(self, mut seq: S) -> Result<Value<A>, S::Error>
    where
        S: SeqAccess<'de>,
    {
        let mut array = Array::new_in(self.0.clone());
        if let Some(len) = seq.size_hint() {
            array.try_reserve(len).map_err(out_of_memory)?;
        }
        while let Some(item) = seq.next_element_seed(ValueSeed(self.0.clone()))? {
            array.push_back(item).map_err(out_of_memory)?;
        }
        Ok(Value::Array(array))
    }

    fn visit_map<M>(self, mut map: M) -> Result<Value<A>, M::Error>
    where
        M: MapAccess<'de>,
    {
        let mut object =
            Object::try_with_table_size_in(DEFAULT_TABLE_SIZE, self.0.clone()).map_err(out_of_memory)?;
        while let Some(key) = map.next_key_seed(KeySeed(self.0.clone()))? {
            let value = map.next_value_seed(ValueSeed(self.0.clone()))?;
            object.insert_owned(key, value).map_err(out_of_memory)?;
        }
        Ok(Value::Object(object))
    }
}

struct KeySeed<A>(A);

impl<'de, A: Allocator> DeserializeSeed<'de> for KeySeed<A> {
    type Value = Str<A>;

    fn deserialize<D>(self, deserializer: D) -> Result<Str<A>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(KeyVisitor(self.0))
    }
}

struct KeyVisitor<A>(A);

impl<'de, A: Allocator> Visitor<'de> for KeyVisitor<A> {
    type Value = Str<A>;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("an object key")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Str<A>, E> {
        self.visit_bytes(v.as_bytes())
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Str<A>, E> {
        Str::try_from_bytes_in(v, self.0).map_err(out_of_memory)
    }
}

#[cfg(test)]
mod tests {
    use serde::de::DeserializeSeed;
    use serde_derive::Deserialize;

    use super::ValueSeed;
    use crate::{from_str, Budget, Global, Value};

    #[test]
    fn from_serde_json() {
        let value: Value = serde_json::from_str(r#"{"a": [1, -2, 0.5], "b": "x", "c": null}"#).unwrap();
        assert_eq!(
            value,
            from_str(r#"{"c": null, "b": "x", "a": [1, -2, 0.5]}"#).unwrap()
        );
    }

    #[test]
    fn large_unsigned_becomes_decimal() {
        let value: Value = serde_json::from_str("18446744073709551615").unwrap();
        assert_eq!(value, Value::Decimal(18446744073709551615u64 as f64));
    }

    #[test]
    fn field_of_derived_struct() {
        #[derive(Deserialize)]
        struct Message {
            kind: u8,
            payload: Value,
        }

        let msg: Message = serde_json::from_str(r#"{"kind": 2, "payload": [true]}"#).unwrap();
        assert_eq!(msg.kind, 2);
        assert_eq!(msg.payload.get_index(0), Some(&Value::Boolean(true)));
    }

    #[test]
    fn allocation_failure_is_an_error() {
        let budget = Budget::new(Global, 16);
        let mut de = serde_json::Deserializer::from_str(r#"{"key": "value"}"#);
        assert!(ValueSeed(&budget).deserialize(&mut de).is_err());
        assert_eq!(budget.in_use(), 0);
    }
}
