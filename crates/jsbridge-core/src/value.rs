//! Boxed value representation for the foreign-call boundary.
//!
//! Every argument and return value that crosses between a synthesized proxy
//! and the scripting engine is carried as a [`Value`]. Primitives are boxed
//! into their dedicated variant with no precision loss; objects travel as
//! reference-counted [`ObjectRef`] handles compared by identity.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Kind tag for marshalled values and declared return types.
///
/// The one-letter codes double as the suffixes of the return-type-specific
/// dispatch entry points (`V Z B S I J F D C L`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Void,
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Char,
    Ref,
}

impl TypeTag {
    /// One-letter signature code for this kind.
    pub fn code(&self) -> char {
        match self {
            TypeTag::Void => 'V',
            TypeTag::Bool => 'Z',
            TypeTag::I8 => 'B',
            TypeTag::I16 => 'S',
            TypeTag::I32 => 'I',
            TypeTag::I64 => 'J',
            TypeTag::F32 => 'F',
            TypeTag::F64 => 'D',
            TypeTag::Char => 'C',
            TypeTag::Ref => 'L',
        }
    }

    /// Parse a one-letter signature code.
    pub fn from_code(c: char) -> Option<Self> {
        Some(match c {
            'V' => TypeTag::Void,
            'Z' => TypeTag::Bool,
            'B' => TypeTag::I8,
            'S' => TypeTag::I16,
            'I' => TypeTag::I32,
            'J' => TypeTag::I64,
            'F' => TypeTag::F32,
            'D' => TypeTag::F64,
            'C' => TypeTag::Char,
            'L' => TypeTag::Ref,
            _ => return None,
        })
    }

    /// Convert to a byte for the binary artifact format.
    pub fn to_u8(self) -> u8 {
        match self {
            TypeTag::Void => 0,
            TypeTag::Bool => 1,
            TypeTag::I8 => 2,
            TypeTag::I16 => 3,
            TypeTag::I32 => 4,
            TypeTag::I64 => 5,
            TypeTag::F32 => 6,
            TypeTag::F64 => 7,
            TypeTag::Char => 8,
            TypeTag::Ref => 9,
        }
    }

    /// Convert from a byte of the binary artifact format.
    pub fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            0 => TypeTag::Void,
            1 => TypeTag::Bool,
            2 => TypeTag::I8,
            3 => TypeTag::I16,
            4 => TypeTag::I32,
            5 => TypeTag::I64,
            6 => TypeTag::F32,
            7 => TypeTag::F64,
            8 => TypeTag::Char,
            9 => TypeTag::Ref,
            _ => return None,
        })
    }

    /// The zero value for this kind (false/0/0.0/'\0'/null).
    ///
    /// Used when a dispatch degrades to its default result.
    pub fn default_value(&self) -> Value {
        match self {
            TypeTag::Void => Value::Null,
            TypeTag::Bool => Value::Bool(false),
            TypeTag::I8 => Value::I8(0),
            TypeTag::I16 => Value::I16(0),
            TypeTag::I32 => Value::I32(0),
            TypeTag::I64 => Value::I64(0),
            TypeTag::F32 => Value::F32(0.0),
            TypeTag::F64 => Value::F64(0.0),
            TypeTag::Char => Value::Char('\0'),
            TypeTag::Ref => Value::Null,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Identity-compared handle to a host object crossing the boundary.
///
/// Wraps an `Arc<dyn Any>` so the bridge can carry any host object (most
/// importantly the proxy instance itself as the `self` argument) without
/// the core crate knowing its concrete type.
#[derive(Clone)]
pub struct ObjectRef(pub(crate) Arc<dyn Any + Send + Sync>);

impl ObjectRef {
    /// Box an owned host object.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        ObjectRef(Arc::new(value))
    }

    /// Wrap an already shared host object.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        ObjectRef(value)
    }

    /// Recover the concrete type, if it matches.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.0.clone().downcast::<T>().ok()
    }

    /// Identity comparison (same underlying allocation).
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({:p})", Arc::as_ptr(&self.0))
    }
}

/// A boxed value crossing the foreign-call boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Char(char),
    Ref(ObjectRef),
}

impl Value {
    /// The kind tag of this value. `Null` counts as a reference.
    pub fn tag(&self) -> TypeTag {
        match self {
            Value::Null => TypeTag::Ref,
            Value::Bool(_) => TypeTag::Bool,
            Value::I8(_) => TypeTag::I8,
            Value::I16(_) => TypeTag::I16,
            Value::I32(_) => TypeTag::I32,
            Value::I64(_) => TypeTag::I64,
            Value::F32(_) => TypeTag::F32,
            Value::F64(_) => TypeTag::F64,
            Value::Char(_) => TypeTag::Char,
            Value::Ref(_) => TypeTag::Ref,
        }
    }

    /// Whether this value can be returned/passed where `tag` is declared.
    pub fn matches_tag(&self, tag: TypeTag) -> bool {
        match tag {
            // A void slot accepts anything; the value is discarded.
            TypeTag::Void => true,
            TypeTag::Ref => matches!(self, Value::Null | Value::Ref(_)),
            other => self.tag() == other,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i8(&self) -> Option<i8> {
        match self {
            Value::I8(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<i16> {
        match self {
            Value::I16(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_char(&self) -> Option<char> {
        match self {
            Value::Char(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_ref_value(&self) -> Option<&ObjectRef> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::I8(v) => write!(f, "{}", v),
            Value::I16(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::Char(c) => write!(f, "{:?}", c),
            Value::Ref(r) => write!(f, "[object@{:p}]", Arc::as_ptr(&r.0)),
        }
    }
}
