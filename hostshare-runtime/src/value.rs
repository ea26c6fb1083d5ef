//! Logical values.
//!
//! A [`Value`] mirrors the shape of a schema: scalars are numbers, vectors are ordered
//! components, matrices are ordered columns, structs are keyed records and arrays are
//! ordered sequences. A [`PartialValue`] describes a sparse update to a value.

use half::f16;
use hostshare_common::map::{FastHashMap, FieldName};
use hostshare_common::ScalarKind;
use num_traits::NumCast;
use std::fmt::{Display, Formatter};

/// A single number or boolean.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Scalar {
    Bool(bool),
    F16(f16),
    F32(f32),
    I32(i32),
    U32(u32),
    U16(u16),
}

impl Scalar {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Bool(_) => ScalarKind::Bool,
            Scalar::F16(_) => ScalarKind::F16,
            Scalar::F32(_) => ScalarKind::F32,
            Scalar::I32(_) => ScalarKind::I32,
            Scalar::U32(_) => ScalarKind::U32,
            Scalar::U16(_) => ScalarKind::U16,
        }
    }

    /// Convert the scalar to another numeric type.
    ///
    /// Returns `None` for booleans, and for numbers the target type cannot represent.
    pub fn cast<T: NumCast>(&self) -> Option<T> {
        match *self {
            Scalar::Bool(_) => None,
            Scalar::F16(v) => T::from(v),
            Scalar::F32(v) => T::from(v),
            Scalar::I32(v) => T::from(v),
            Scalar::U32(v) => T::from(v),
            Scalar::U16(v) => T::from(v),
        }
    }

    pub fn to_f32(&self) -> Option<f32> {
        self.cast()
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::F16(v) => write!(f, "{v}h"),
            Scalar::F32(v) => write!(f, "{v}f"),
            Scalar::I32(v) => write!(f, "{v}i"),
            Scalar::U32(v) => write!(f, "{v}u"),
            Scalar::U16(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Scalar::$variant(value)
                }
            }

            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Scalar(Scalar::$variant(value))
                }
            }

            impl<const N: usize> From<[$ty; N]> for Value {
                fn from(value: [$ty; N]) -> Self {
                    Value::Vector(value.into_iter().map(Scalar::$variant).collect())
                }
            }

            impl From<$ty> for PartialValue {
                fn from(value: $ty) -> Self {
                    PartialValue::Value(value.into())
                }
            }

            impl<const N: usize> From<[$ty; N]> for PartialValue {
                fn from(value: [$ty; N]) -> Self {
                    PartialValue::Value(value.into())
                }
            }
        )*
    };
}

scalar_from! {
    bool => Bool,
    f16 => F16,
    f32 => F32,
    i32 => I32,
    u32 => U32,
    u16 => U16,
}

/// A complete value for a schema.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Vector(Vec<Scalar>),
    /// Matrix columns, first column first.
    Matrix(Vec<Vec<f32>>),
    Struct(FastHashMap<FieldName, Value>),
    Array(Vec<Value>),
}

impl Value {
    /// A struct value from `(name, value)` pairs.
    pub fn structure<N: Into<FieldName>, V: Into<Value>>(
        fields: impl IntoIterator<Item = (N, V)>,
    ) -> Value {
        Value::Struct(
            fields
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }

    pub fn array<V: Into<Value>>(elements: impl IntoIterator<Item = V>) -> Value {
        Value::Array(elements.into_iter().map(Into::into).collect())
    }

    /// The value of a struct field, if this is a struct with that field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        match self {
            Value::Struct(fields) => fields.get(field),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Value::Scalar(scalar) => Some(*scalar),
            _ => None,
        }
    }

    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::Array(elements) => Some(elements),
            _ => None,
        }
    }

    /// A short description of the value's shape, for error messages.
    pub fn kind_name(&self) -> String {
        match self {
            Value::Scalar(scalar) => scalar.kind().to_string(),
            Value::Vector(components) => format!("a vector of {} components", components.len()),
            Value::Matrix(columns) => format!("a matrix of {} columns", columns.len()),
            Value::Struct(_) => "a struct".to_string(),
            Value::Array(elements) => format!("an array of {} elements", elements.len()),
        }
    }
}

impl<const C: usize, const R: usize> From<[[f32; R]; C]> for Value {
    fn from(columns: [[f32; R]; C]) -> Self {
        Value::Matrix(columns.into_iter().map(Vec::from).collect())
    }
}

impl From<Vec<Value>> for Value {
    fn from(elements: Vec<Value>) -> Self {
        Value::Array(elements)
    }
}

/// A sparse update to a value.
///
/// Omitted struct fields and array elements are left unchanged.
#[derive(Clone, Debug, PartialEq)]
pub enum PartialValue {
    /// Replace the whole value.
    Value(Value),
    /// Update only the fields present in the map.
    Struct(FastHashMap<FieldName, PartialValue>),
    /// Update only the listed elements, in any order.
    Array(Vec<IndexedValue>),
}

/// One element of a sparse array update.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedValue {
    pub index: usize,
    pub value: PartialValue,
}

impl PartialValue {
    pub fn structure<N: Into<FieldName>, V: Into<PartialValue>>(
        fields: impl IntoIterator<Item = (N, V)>,
    ) -> PartialValue {
        PartialValue::Struct(
            fields
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }

    /// A sparse array update from `(index, value)` pairs.
    pub fn indexed<V: Into<PartialValue>>(
        elements: impl IntoIterator<Item = (usize, V)>,
    ) -> PartialValue {
        PartialValue::Array(
            elements
                .into_iter()
                .map(|(index, value)| IndexedValue {
                    index,
                    value: value.into(),
                })
                .collect(),
        )
    }
}

impl From<Value> for PartialValue {
    fn from(value: Value) -> Self {
        PartialValue::Value(value)
    }
}

impl<const C: usize, const R: usize> From<[[f32; R]; C]> for PartialValue {
    fn from(columns: [[f32; R]; C]) -> Self {
        PartialValue::Value(columns.into())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    pub fn scalar_casts() {
        assert_eq!(Scalar::U32(3).cast::<f32>(), Some(3.0));
        assert_eq!(Scalar::F32(1.5).cast::<f64>(), Some(1.5));
        assert_eq!(Scalar::I32(-1).cast::<u32>(), None);
        assert_eq!(Scalar::Bool(true).cast::<u32>(), None);
        assert_eq!(Scalar::F16(f16::from_f32(0.5)).to_f32(), Some(0.5));
    }

    #[test]
    pub fn builders() {
        let value = Value::structure([
            ("a", Value::from(3u32)),
            ("b", Value::from([1.0f32, 2.0, 3.0])),
        ]);
        assert_eq!(value.get("a"), Some(&Value::Scalar(Scalar::U32(3))));
        assert_eq!(
            value.get("b"),
            Some(&Value::Vector(vec![
                Scalar::F32(1.0),
                Scalar::F32(2.0),
                Scalar::F32(3.0)
            ]))
        );
        assert_eq!(value.get("c"), None);

        let matrix = Value::from([[1.0f32, 0.0], [0.0, 1.0]]);
        assert_eq!(matrix, Value::Matrix(vec![vec![1.0, 0.0], vec![0.0, 1.0]]));

        let partial = PartialValue::indexed([(2, 5u32), (0, 1u32)]);
        let PartialValue::Array(entries) = partial else {
            panic!("expected array update")
        };
        assert_eq!(entries[0].index, 2);
        assert_eq!(entries[1].value, PartialValue::Value(Value::from(1u32)));
    }
}
