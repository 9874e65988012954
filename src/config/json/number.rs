//! The JSON number triple.
//!
//! A parsed number is one of `i64`, `u64`, or `f64`, preferring the first
//! that represents the literal exactly (see the decoder). Equality mixes
//! subkinds: integer/integer comparisons are exact across signedness,
//! anything involving a float compares within an absolute epsilon.

use crate::config::store::store_inline;

const FLOAT_EPSILON: f64 = 1e-5;

#[derive(Debug, Clone, Copy)]
pub enum Number {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

store_inline!(Number);

impl Number {
    pub fn is_signed(&self) -> bool {
        matches!(self, Number::Signed(_))
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(self, Number::Unsigned(_))
    }

    pub fn is_integer(&self) -> bool {
        !self.is_float()
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Number::Float(_))
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Signed(i) => i as f64,
            Number::Unsigned(u) => u as f64,
            Number::Float(f) => f,
        }
    }

    pub fn as_i64(&self) -> i64 {
        match *self {
            Number::Signed(i) => i,
            Number::Unsigned(u) => u as i64,
            Number::Float(f) => f as i64,
        }
    }

    pub fn as_u64(&self) -> u64 {
        match *self {
            Number::Signed(i) => i as u64,
            Number::Unsigned(u) => u,
            Number::Float(f) => f as u64,
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        use Number::*;
        match (*self, *other) {
            (Float(_), _) | (_, Float(_)) => (self.as_f64() - other.as_f64()).abs() < FLOAT_EPSILON,
            (a, b) => {
                // Integer subkinds compare exactly; widening sidesteps the
                // signed/unsigned mixing pitfalls.
                let wide = |n: Number| match n {
                    Signed(i) => i as i128,
                    Unsigned(u) => u as i128,
                    Float(_) => unreachable!(),
                };
                wide(a) == wide(b)
            }
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Signed(value)
    }
}

impl From<u64> for Number {
    fn from(value: u64) -> Self {
        Number::Unsigned(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::Signed(i) => write!(f, "{i}"),
            Number::Unsigned(u) => write!(f, "{u}"),
            Number::Float(x) => write!(f, "{x}"),
        }
    }
}
