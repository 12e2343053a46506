//! Structured semantic units.
//!
//! Units are structured, not flat strings: an angle knows whether it is in
//! radians, degrees, or normalized phase; a spatial value knows its frame and
//! dimension count. Unit equality is deep structural equality. Conversion
//! between compatible inner units is performed by adapter blocks — never by
//! implicit coercion — and [`Unit::conversion_factor`] is where adapters get
//! their factor from.

use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum AngleUnit {
    Radians,
    Degrees,
    /// One full turn normalized to `[0, 1)`.
    Phase01,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum TimeUnit {
    Ms,
    Seconds,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum SpaceFrame {
    Ndc,
    World,
    View,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum SpaceDims {
    Two,
    Three,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ColorSpace {
    Rgba01,
}

/// The structured unit of a payload value.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Unit {
    None,
    Scalar,
    /// A scalar normalized to `[0, 1]`.
    Norm01,
    Count,
    Angle(AngleUnit),
    Time(TimeUnit),
    Space { frame: SpaceFrame, dims: SpaceDims },
    Color(ColorSpace),
}

impl Unit {
    /// Multiplicative factor converting `from` into `to`.
    ///
    /// `Some(1.0)` for structurally equal units, `Some(k)` for
    /// compatible-but-distinct inner units (angle and time families), `None`
    /// for units no adapter can bridge numerically.
    pub fn conversion_factor(from: Unit, to: Unit) -> Option<f64> {
        if from == to {
            return Some(1.0);
        }
        match (from, to) {
            (Unit::Angle(a), Unit::Angle(b)) => {
                // Convert through radians.
                let to_radians = |u: AngleUnit| match u {
                    AngleUnit::Radians => 1.0,
                    AngleUnit::Degrees => std::f64::consts::PI / 180.0,
                    AngleUnit::Phase01 => std::f64::consts::TAU,
                };
                Some(to_radians(a) / to_radians(b))
            }
            (Unit::Time(a), Unit::Time(b)) => {
                let to_seconds = |u: TimeUnit| match u {
                    TimeUnit::Seconds => 1.0,
                    TimeUnit::Ms => 1e-3,
                };
                Some(to_seconds(a) / to_seconds(b))
            }
            _ => None,
        }
    }

    /// Whether an adapter can numerically bridge `from` to `to`.
    pub fn is_convertible(from: Unit, to: Unit) -> bool {
        from != to && Unit::conversion_factor(from, to).is_some()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::None => write!(f, "none"),
            Unit::Scalar => write!(f, "scalar"),
            Unit::Norm01 => write!(f, "norm01"),
            Unit::Count => write!(f, "count"),
            Unit::Angle(AngleUnit::Radians) => write!(f, "angle.radians"),
            Unit::Angle(AngleUnit::Degrees) => write!(f, "angle.degrees"),
            Unit::Angle(AngleUnit::Phase01) => write!(f, "angle.phase01"),
            Unit::Time(TimeUnit::Ms) => write!(f, "time.ms"),
            Unit::Time(TimeUnit::Seconds) => write!(f, "time.seconds"),
            Unit::Space { frame, dims } => {
                let frame = match frame {
                    SpaceFrame::Ndc => "ndc",
                    SpaceFrame::World => "world",
                    SpaceFrame::View => "view",
                };
                let dims = match dims {
                    SpaceDims::Two => 2,
                    SpaceDims::Three => 3,
                };
                write!(f, "space.{frame}{dims}")
            }
            Unit::Color(ColorSpace::Rgba01) => write!(f, "color.rgba01"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_units_convert_with_identity() {
        assert_eq!(
            Unit::conversion_factor(Unit::Scalar, Unit::Scalar),
            Some(1.0)
        );
        assert!(!Unit::is_convertible(Unit::Scalar, Unit::Scalar));
    }

    #[test]
    fn radians_to_degrees() {
        let k = Unit::conversion_factor(
            Unit::Angle(AngleUnit::Radians),
            Unit::Angle(AngleUnit::Degrees),
        );
        let k = k.unwrap_or(0.0);
        assert!((k - 180.0 / std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn phase_to_radians_is_tau() {
        let k = Unit::conversion_factor(
            Unit::Angle(AngleUnit::Phase01),
            Unit::Angle(AngleUnit::Radians),
        );
        assert_eq!(k, Some(std::f64::consts::TAU));
    }

    #[test]
    fn ms_to_seconds() {
        let k = Unit::conversion_factor(Unit::Time(TimeUnit::Ms), Unit::Time(TimeUnit::Seconds));
        assert_eq!(k, Some(1e-3));
    }

    #[test]
    fn unrelated_families_do_not_convert() {
        assert_eq!(
            Unit::conversion_factor(Unit::Angle(AngleUnit::Radians), Unit::Scalar),
            None
        );
        assert_eq!(
            Unit::conversion_factor(
                Unit::Time(TimeUnit::Seconds),
                Unit::Angle(AngleUnit::Radians)
            ),
            None
        );
    }

    #[test]
    fn structural_equality_is_deep() {
        let a = Unit::Space {
            frame: SpaceFrame::Ndc,
            dims: SpaceDims::Two,
        };
        let b = Unit::Space {
            frame: SpaceFrame::World,
            dims: SpaceDims::Two,
        };
        assert_ne!(a, b);
        assert_eq!(a, a);
    }
}
