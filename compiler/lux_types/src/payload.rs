//! Payload lane types and constant values.

use std::fmt;
use std::hash::{Hash, Hasher};

/// The lane data type of a value.
///
/// `shape` is deliberately absent: shapes are resources in a parallel
/// namespace and never a value-expression lane. `CameraProjection` is a
/// closed enum value, not a matrix.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum PayloadType {
    Float,
    Int,
    Bool,
    Vec2,
    Vec3,
    Color,
    CameraProjection,
}

impl PayloadType {
    /// Number of scalar lanes a value of this payload occupies.
    ///
    /// This is the only source of stride in the system; no payload carries a
    /// stored stride. The match is exhaustive on purpose: a new payload
    /// without a case here is a compile error.
    pub const fn stride(self) -> u32 {
        match self {
            PayloadType::Float => 1,
            PayloadType::Int => 1,
            PayloadType::Bool => 1,
            PayloadType::Vec2 => 2,
            PayloadType::Vec3 => 3,
            PayloadType::Color => 4,
            PayloadType::CameraProjection => 1,
        }
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadType::Float => write!(f, "float"),
            PayloadType::Int => write!(f, "int"),
            PayloadType::Bool => write!(f, "bool"),
            PayloadType::Vec2 => write!(f, "vec2"),
            PayloadType::Vec3 => write!(f, "vec3"),
            PayloadType::Color => write!(f, "color"),
            PayloadType::CameraProjection => write!(f, "cameraProjection"),
        }
    }
}

/// Closed set of camera projections.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum CameraProjection {
    Orthographic,
    Perspective,
}

/// A literal constant value.
///
/// Equality and hashing go through float bit patterns so structurally equal
/// constants hash-cons to one expression id; `NaN` constants with identical
/// bits compare equal here, which is exactly what interning needs.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Vec2([f64; 2]),
    Vec3([f64; 3]),
    Color([f64; 4]),
    CameraProjection(CameraProjection),
}

impl ConstValue {
    /// The payload this value inhabits.
    pub const fn payload(&self) -> PayloadType {
        match self {
            ConstValue::Float(_) => PayloadType::Float,
            ConstValue::Int(_) => PayloadType::Int,
            ConstValue::Bool(_) => PayloadType::Bool,
            ConstValue::Vec2(_) => PayloadType::Vec2,
            ConstValue::Vec3(_) => PayloadType::Vec3,
            ConstValue::Color(_) => PayloadType::Color,
            ConstValue::CameraProjection(_) => PayloadType::CameraProjection,
        }
    }

    /// Scalar lane `i` of this value, for the runtime's flat state array.
    ///
    /// Lanes beyond the payload stride read as `0.0`.
    pub fn lane(&self, i: usize) -> f64 {
        match self {
            ConstValue::Float(v) => {
                if i == 0 {
                    *v
                } else {
                    0.0
                }
            }
            #[allow(clippy::cast_precision_loss)]
            ConstValue::Int(v) => {
                if i == 0 {
                    *v as f64
                } else {
                    0.0
                }
            }
            ConstValue::Bool(v) => {
                if i == 0 && *v {
                    1.0
                } else {
                    0.0
                }
            }
            ConstValue::Vec2(v) => v.get(i).copied().unwrap_or(0.0),
            ConstValue::Vec3(v) => v.get(i).copied().unwrap_or(0.0),
            ConstValue::Color(v) => v.get(i).copied().unwrap_or(0.0),
            ConstValue::CameraProjection(p) => {
                if i == 0 {
                    match p {
                        CameraProjection::Orthographic => 0.0,
                        CameraProjection::Perspective => 1.0,
                    }
                } else {
                    0.0
                }
            }
        }
    }
}

/// Whether a constant value inhabits the given payload.
///
/// Called inside every const constructor; a mismatch is a
/// `ConstPayloadMismatch` at the call site.
pub fn const_value_matches_payload(payload: PayloadType, value: &ConstValue) -> bool {
    value.payload() == payload
}

impl PartialEq for ConstValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConstValue::Float(a), ConstValue::Float(b)) => a.to_bits() == b.to_bits(),
            (ConstValue::Int(a), ConstValue::Int(b)) => a == b,
            (ConstValue::Bool(a), ConstValue::Bool(b)) => a == b,
            (ConstValue::Vec2(a), ConstValue::Vec2(b)) => {
                a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (ConstValue::Vec3(a), ConstValue::Vec3(b)) => {
                a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (ConstValue::Color(a), ConstValue::Color(b)) => {
                a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (ConstValue::CameraProjection(a), ConstValue::CameraProjection(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ConstValue {}

impl Hash for ConstValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ConstValue::Float(v) => v.to_bits().hash(state),
            ConstValue::Int(v) => v.hash(state),
            ConstValue::Bool(v) => v.hash(state),
            ConstValue::Vec2(v) => {
                for x in v {
                    x.to_bits().hash(state);
                }
            }
            ConstValue::Vec3(v) => {
                for x in v {
                    x.to_bits().hash(state);
                }
            }
            ConstValue::Color(v) => {
                for x in v {
                    x.to_bits().hash(state);
                }
            }
            ConstValue::CameraProjection(p) => p.hash(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_per_payload() {
        assert_eq!(PayloadType::Float.stride(), 1);
        assert_eq!(PayloadType::Vec2.stride(), 2);
        assert_eq!(PayloadType::Vec3.stride(), 3);
        assert_eq!(PayloadType::Color.stride(), 4);
        assert_eq!(PayloadType::CameraProjection.stride(), 1);
    }

    #[test]
    fn const_value_payload_matching() {
        assert!(const_value_matches_payload(
            PayloadType::Float,
            &ConstValue::Float(1.5)
        ));
        assert!(const_value_matches_payload(
            PayloadType::Vec2,
            &ConstValue::Vec2([0.0, 1.0])
        ));
        assert!(!const_value_matches_payload(
            PayloadType::Float,
            &ConstValue::Int(1)
        ));
        assert!(!const_value_matches_payload(
            PayloadType::Vec3,
            &ConstValue::Vec2([0.0, 1.0])
        ));
    }

    #[test]
    fn float_equality_is_bitwise() {
        assert_eq!(ConstValue::Float(2.0), ConstValue::Float(2.0));
        assert_ne!(ConstValue::Float(2.0), ConstValue::Float(-2.0));
        assert_eq!(
            ConstValue::Float(f64::NAN),
            ConstValue::Float(f64::NAN)
        );
        assert_ne!(ConstValue::Float(0.0), ConstValue::Float(-0.0));
    }

    #[test]
    fn lanes_follow_stride() {
        let v = ConstValue::Vec3([1.0, 2.0, 3.0]);
        assert_eq!(v.lane(0), 1.0);
        assert_eq!(v.lane(2), 3.0);
        assert_eq!(v.lane(3), 0.0);
        assert_eq!(ConstValue::Bool(true).lane(0), 1.0);
    }
}
