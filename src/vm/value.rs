use std::fmt;

use super::heap::GcRef;

/// A script value.
///
/// Numbers are always doubles. Everything that is not null, a bool or a
/// number lives on the heap and is referenced through a [`GcRef`].
#[derive(Clone, Copy)]
pub enum Value {
    Null,
    Bool(bool),
    Num(f64),
    Obj(GcRef),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    pub fn is_num(&self) -> bool {
        matches!(self, Value::Num(_))
    }

    pub fn is_obj(&self) -> bool {
        matches!(self, Value::Obj(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_obj(&self) -> Option<GcRef> {
        match self {
            Value::Obj(r) => Some(*r),
            _ => None,
        }
    }

    /// Only `false` and `null` are falsey.
    pub fn is_falsey(&self) -> bool {
        matches!(self, Value::Null | Value::Bool(false))
    }

    pub fn is_truthy(&self) -> bool {
        !self.is_falsey()
    }

    /// Identity comparison. Numbers compare by value, objects by reference.
    ///
    /// Content equality for strings and ranges needs the heap; see
    /// [`super::Heap::values_equal`].
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Obj(a), Value::Obj(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Num(n)
    }
}

impl From<GcRef> for Value {
    fn from(r: GcRef) -> Self {
        Value::Obj(r)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Num(n) => write!(f, "Num({})", n),
            Value::Obj(r) => write!(f, "Obj({})", r.index()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_as_num() {
        assert_eq!(Value::Num(3.5).as_num(), Some(3.5));
        assert_eq!(Value::Null.as_num(), None);
    }

    #[test]
    fn test_only_null_and_false_are_falsey() {
        assert!(Value::Null.is_falsey());
        assert!(Value::Bool(false).is_falsey());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Num(0.0).is_truthy());
        assert!(Value::Obj(GcRef::new(0)).is_truthy());
    }

    #[test]
    fn test_identity() {
        assert_eq!(Value::Num(1.0), Value::Num(1.0));
        assert_ne!(Value::Num(1.0), Value::Bool(true));
        assert_eq!(Value::Obj(GcRef::new(3)), Value::Obj(GcRef::new(3)));
        assert_ne!(Value::Obj(GcRef::new(3)), Value::Obj(GcRef::new(4)));
        assert!(Value::Num(f64::NAN) != Value::Num(f64::NAN));
    }
}
