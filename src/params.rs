/*!
Parameter protocol.

Both sides publish a static list of [`ParamDescriptor`]s and answer
requests for values by filling caller-supplied [`ParamRequest`] slots.
A request for a name nobody knows is left unfilled; a request whose
declared type differs from the parameter's real type fails the whole call
before any slot is written.
*/

use std::fmt;

#[cfg(feature = "serde-support")]
use serde::Serialize;

use crate::dispatch::Terminated;
use crate::error::ParamError;

/// Semantic type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize))]
pub enum ParamType {
    /// Signed integer
    Integer,
    /// Unsigned integer
    UnsignedInteger,
    /// Owned UTF-8 string
    Utf8String,
    /// Borrowed UTF-8 string with static lifetime
    Utf8Ptr,
    /// Arbitrary bytes
    OctetString,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Integer => write!(f, "integer"),
            ParamType::UnsignedInteger => write!(f, "unsigned-integer"),
            ParamType::Utf8String => write!(f, "utf8-string"),
            ParamType::Utf8Ptr => write!(f, "utf8-ptr"),
            ParamType::OctetString => write!(f, "octet-string"),
        }
    }
}

/// A parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(Serialize))]
pub enum ParamValue {
    Integer(i64),
    UnsignedInteger(u64),
    Utf8String(String),
    Utf8Ptr(&'static str),
    OctetString(Vec<u8>),
}

impl ParamValue {
    /// The type tag of this value
    pub fn param_type(&self) -> ParamType {
        match self {
            ParamValue::Integer(_) => ParamType::Integer,
            ParamValue::UnsignedInteger(_) => ParamType::UnsignedInteger,
            ParamValue::Utf8String(_) => ParamType::Utf8String,
            ParamValue::Utf8Ptr(_) => ParamType::Utf8Ptr,
            ParamValue::OctetString(_) => ParamType::OctetString,
        }
    }

    /// The value as a string, for either UTF-8 representation
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Utf8String(s) => Some(s),
            ParamValue::Utf8Ptr(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a signed integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Integer(v) => Some(*v),
            ParamValue::UnsignedInteger(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }
}

/// Describes one queryable parameter.
///
/// Descriptor lists end with [`ParamDescriptor::END`], whose name is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(Serialize))]
pub struct ParamDescriptor {
    pub data_type: ParamType,
    pub name: Option<&'static str>,
}

impl ParamDescriptor {
    /// List terminator
    pub const END: ParamDescriptor = ParamDescriptor {
        data_type: ParamType::Integer,
        name: None,
    };

    pub const fn new(data_type: ParamType, name: &'static str) -> Self {
        Self {
            data_type,
            name: Some(name),
        }
    }
}

impl Terminated for ParamDescriptor {
    fn is_terminator(&self) -> bool {
        self.name.is_none()
    }
}

/// A named value supplied by the side that owns it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub key: &'static str,
    pub value: ParamValue,
}

impl Param {
    pub fn new(key: &'static str, value: ParamValue) -> Self {
        Self { key, value }
    }

    pub fn utf8_ptr(key: &'static str, value: &'static str) -> Self {
        Self::new(key, ParamValue::Utf8Ptr(value))
    }

    pub fn utf8_string(key: &'static str, value: impl Into<String>) -> Self {
        Self::new(key, ParamValue::Utf8String(value.into()))
    }
}

/// A slot asking for one parameter by name and expected type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamRequest<'k> {
    key: &'k str,
    data_type: ParamType,
    value: Option<ParamValue>,
}

impl<'k> ParamRequest<'k> {
    /// Create an empty request
    pub fn new(key: &'k str, data_type: ParamType) -> Self {
        Self {
            key,
            data_type,
            value: None,
        }
    }

    /// Request a static UTF-8 string
    pub fn utf8_ptr(key: &'k str) -> Self {
        Self::new(key, ParamType::Utf8Ptr)
    }

    /// Request an owned UTF-8 string
    pub fn utf8_string(key: &'k str) -> Self {
        Self::new(key, ParamType::Utf8String)
    }

    /// Request a signed integer
    pub fn integer(key: &'k str) -> Self {
        Self::new(key, ParamType::Integer)
    }

    pub fn key(&self) -> &'k str {
        self.key
    }

    pub fn data_type(&self) -> ParamType {
        self.data_type
    }

    /// The filled value, if any
    pub fn value(&self) -> Option<&ParamValue> {
        self.value.as_ref()
    }

    /// Take the filled value out of the slot
    pub fn take(&mut self) -> Option<ParamValue> {
        self.value.take()
    }

    /// Whether a value was written into this slot
    pub fn is_filled(&self) -> bool {
        self.value.is_some()
    }

    /// Check that `actual` can be written into this slot
    pub fn check_type(&self, actual: ParamType) -> Result<(), ParamError> {
        if self.data_type == actual {
            Ok(())
        } else {
            Err(ParamError::TypeMismatch {
                key: self.key.to_string(),
                expected: self.data_type,
                actual,
            })
        }
    }

    /// Write a value, rejecting a type mismatch
    pub fn set(&mut self, value: ParamValue) -> Result<(), ParamError> {
        self.check_type(value.param_type())?;
        self.value = Some(value);
        Ok(())
    }
}

/// Per-key outcome of a typed resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamResolution {
    /// The parameter exists and has the requested type
    Value(ParamValue),
    /// No parameter by that name
    Absent,
    /// The parameter exists with a different type
    TypeMismatch { expected: ParamType, actual: ParamType },
}

impl ParamResolution {
    pub fn value(&self) -> Option<&ParamValue> {
        match self {
            ParamResolution::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// First request slot with the given key
pub fn locate<'a, 'k>(params: &'a mut [ParamRequest<'k>], key: &str) -> Option<&'a mut ParamRequest<'k>> {
    params.iter_mut().find(|p| p.key == key)
}

/// Fill `params` from the `known` values.
///
/// All matched slots are type-checked first; on the first mismatch the call
/// fails and no slot is written. Slots with unknown names are left alone.
pub fn fill_params(params: &mut [ParamRequest<'_>], known: &[Param]) -> Result<(), ParamError> {
    for param in known {
        for slot in params.iter().filter(|p| p.key == param.key) {
            slot.check_type(param.value.param_type())?;
        }
    }

    for param in known {
        for slot in params.iter_mut().filter(|p| p.key == param.key) {
            slot.value = Some(param.value.clone());
        }
    }
    Ok(())
}

/// Resolve each `(key, type)` pair against `known` without any out-parameters
pub fn resolve(known: &[Param], keys: &[(&str, ParamType)]) -> Vec<ParamResolution> {
    keys.iter()
        .map(|(key, expected)| match known.iter().find(|p| p.key == *key) {
            None => ParamResolution::Absent,
            Some(param) if param.value.param_type() == *expected => {
                ParamResolution::Value(param.value.clone())
            }
            Some(param) => ParamResolution::TypeMismatch {
                expected: *expected,
                actual: param.value.param_type(),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::terminated;

    fn known() -> Vec<Param> {
        vec![
            Param::utf8_ptr("name", "Test Provider"),
            Param::utf8_ptr("version", "1.2.3"),
            Param::new("status", ParamValue::Integer(1)),
        ]
    }

    #[test]
    fn test_fill_matching_slots() {
        let mut params = [ParamRequest::utf8_ptr("name"), ParamRequest::integer("status")];
        fill_params(&mut params, &known()).unwrap();

        assert_eq!(params[0].value(), Some(&ParamValue::Utf8Ptr("Test Provider")));
        assert_eq!(params[1].value().and_then(ParamValue::as_i64), Some(1));
    }

    #[test]
    fn test_unknown_name_left_unfilled() {
        let mut params = [ParamRequest::utf8_ptr("colour"), ParamRequest::utf8_ptr("version")];
        fill_params(&mut params, &known()).unwrap();

        assert!(!params[0].is_filled());
        assert!(params[1].is_filled());
    }

    #[test]
    fn test_type_mismatch_fails_whole_call() {
        let mut params = [ParamRequest::utf8_ptr("name"), ParamRequest::utf8_string("version")];
        let err = fill_params(&mut params, &known()).unwrap_err();

        assert_eq!(
            err,
            ParamError::TypeMismatch {
                key: "version".into(),
                expected: ParamType::Utf8String,
                actual: ParamType::Utf8Ptr,
            }
        );
        assert!(!params[0].is_filled(), "no partial fill on failure");
        assert!(!params[1].is_filled());
    }

    #[test]
    fn test_resolve() {
        let resolved = resolve(
            &known(),
            &[
                ("name", ParamType::Utf8Ptr),
                ("missing", ParamType::Utf8Ptr),
                ("status", ParamType::Utf8String),
            ],
        );

        assert_eq!(resolved[0], ParamResolution::Value(ParamValue::Utf8Ptr("Test Provider")));
        assert_eq!(resolved[1], ParamResolution::Absent);
        assert_eq!(
            resolved[2],
            ParamResolution::TypeMismatch {
                expected: ParamType::Utf8String,
                actual: ParamType::Integer,
            }
        );
    }

    #[test]
    fn test_descriptor_list_termination() {
        let list = [
            ParamDescriptor::new(ParamType::Utf8Ptr, "a"),
            ParamDescriptor::new(ParamType::Utf8Ptr, "b"),
            ParamDescriptor::END,
            ParamDescriptor::new(ParamType::Utf8Ptr, "c"),
        ];
        let names: Vec<_> = terminated(&list).filter_map(|d| d.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_locate() {
        let mut params = [ParamRequest::utf8_ptr("a"), ParamRequest::utf8_ptr("b")];
        let slot = locate(&mut params, "b").unwrap();
        slot.set(ParamValue::Utf8Ptr("x")).unwrap();
        assert!(params[1].is_filled());
        assert!(locate(&mut params, "z").is_none());
    }
}
