//! Truthiness and nullness used by the boolean derivations.

use serde_json::Value;

/// Values that can be read as a boolean condition.
pub trait Truthy {
    /// Whether the value counts as true in a condition.
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl<T> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.is_some()
    }
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for &'static str {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for Value {
    fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }
}

macro_rules! impl_truthy_int {
    ($($ty:ty),*) => {
        $(
            impl Truthy for $ty {
                fn is_truthy(&self) -> bool {
                    *self != 0
                }
            }
        )*
    };
}

impl_truthy_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl Truthy for f32 {
    fn is_truthy(&self) -> bool {
        *self != 0.0 && !self.is_nan()
    }
}

impl Truthy for f64 {
    fn is_truthy(&self) -> bool {
        *self != 0.0 && !self.is_nan()
    }
}

/// Values with a "nothing here" state.
pub trait Nullable {
    /// Whether the value is empty.
    fn is_null(&self) -> bool;

    /// Absent rather than explicitly empty. Types that cannot tell the two
    /// apart treat them the same.
    fn is_undefined(&self) -> bool {
        self.is_null()
    }
}

impl<T> Nullable for Option<T> {
    fn is_null(&self) -> bool {
        self.is_none()
    }
}

impl Nullable for Value {
    fn is_null(&self) -> bool {
        Value::is_null(self)
    }
}
