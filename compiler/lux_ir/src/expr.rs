//! The unified value-expression union.

use std::hash::{Hash, Hasher};

use smallvec::SmallVec;

use lux_types::{CanonicalType, ConstValue, InstanceRef};

use crate::ids::{SlotId, ValueExprId};

/// Externally supplied scalar sources.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ExternalSource {
    /// The monotonically increasing frame counter.
    FrameIndex,
    /// A host-supplied signal channel.
    Channel(u32),
}

/// Per-instance context reads.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum IntrinsicKind {
    /// The instance's layout position.
    Position,
    /// The instance's lane index.
    Index,
    /// The instance count of the domain (a signal, not a field).
    Count,
}

/// How a state expression observes its slot.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum StatePhase {
    /// Continuous read of the slot's value from this or the previous frame.
    Read,
    /// Discrete read: fires only on frames where the slot's event flag is
    /// set.
    Pulse,
}

/// Clock base for time expressions.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum TimeBase {
    Seconds,
    Millis,
    Frames,
}

/// A constant multiplier with bitwise equality, so scale kernels hash-cons.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ScaleFactor(f64);

impl ScaleFactor {
    pub const fn new(factor: f64) -> Self {
        ScaleFactor(factor)
    }

    pub const fn get(self) -> f64 {
        self.0
    }
}

impl PartialEq for ScaleFactor {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for ScaleFactor {}

impl Hash for ScaleFactor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

/// Unary lane functions.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum MapFn {
    Sin,
    Cos,
    Abs,
    Neg,
    Sqrt,
    Fract,
    /// Multiply by a constant factor; unit-conversion adapters lower to
    /// this.
    Scale(ScaleFactor),
}

/// Binary lane functions.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ZipFn {
    Add,
    Sub,
    Mul,
    Div,
    Min,
    Max,
}

/// Lane-collapsing functions (`many` → `one`).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ReduceFn {
    Sum,
    Mean,
    Min,
    Max,
}

/// Scalar-assembling functions.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum CombineFn {
    Vec2,
    Vec3,
    Color,
}

/// Pure function over input lanes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum KernelOp {
    /// Lane-wise unary function.
    Map(MapFn),
    /// Lane-wise binary function over equal-cardinality inputs.
    Zip(ZipFn),
    /// Binary function zipping a field with a broadcast signal.
    ZipSignal(ZipFn),
    /// Collapse a field into a signal.
    Reduce(ReduceFn),
    /// Replicate a signal across an instance's lanes.
    Broadcast,
    /// Assemble scalars into a vector payload.
    Combine(CombineFn),
    /// Wrap into `[0, 1)`.
    Wrap,
    /// Sample-and-hold: latch an event's payload into a continuous signal.
    Hold,
    /// Lane-coupled finite difference along a field.
    PathDerivative,
}

/// The unified expression union. Each variant carries its canonical type.
///
/// Only `Intrinsic` names an instance — that is the domain context it reads
/// from. For every other variant, instance identity lives solely in
/// `ty.extent.cardinality`. The arena is in-memory only, so the union
/// carries no serialization support.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum ValueExpr {
    /// Literal; the type has cardinality `zero`.
    Const {
        value: ConstValue,
        ty: CanonicalType,
    },
    /// Frame index or an externally supplied signal.
    External {
        source: ExternalSource,
        ty: CanonicalType,
    },
    /// Per-instance position/index/count read from instance context.
    Intrinsic {
        kind: IntrinsicKind,
        instance: InstanceRef,
        ty: CanonicalType,
    },
    /// Pure function over input lanes.
    Kernel {
        op: KernelOp,
        inputs: SmallVec<[ValueExprId; 2]>,
        ty: CanonicalType,
    },
    /// Read of a runtime slot (signal, field, or event slot).
    State {
        slot: SlotId,
        phase: StatePhase,
        ty: CanonicalType,
    },
    /// Clock reading.
    Time {
        base: TimeBase,
        ty: CanonicalType,
    },
}

impl ValueExpr {
    /// The canonical type of this expression.
    pub fn ty(&self) -> &CanonicalType {
        match self {
            ValueExpr::Const { ty, .. }
            | ValueExpr::External { ty, .. }
            | ValueExpr::Intrinsic { ty, .. }
            | ValueExpr::Kernel { ty, .. }
            | ValueExpr::State { ty, .. }
            | ValueExpr::Time { ty, .. } => ty,
        }
    }

    /// Input expression ids, empty for leaves.
    pub fn inputs(&self) -> &[ValueExprId] {
        match self {
            ValueExpr::Kernel { inputs, .. } => inputs,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lux_types::{PayloadType, Unit};

    #[test]
    fn scale_factor_equality_is_bitwise() {
        assert_eq!(ScaleFactor::new(2.0), ScaleFactor::new(2.0));
        assert_ne!(ScaleFactor::new(2.0), ScaleFactor::new(2.0000001));
        assert_eq!(
            ScaleFactor::new(f64::NAN),
            ScaleFactor::new(f64::NAN)
        );
    }

    #[test]
    fn leaves_have_no_inputs() {
        let time = ValueExpr::Time {
            base: TimeBase::Seconds,
            ty: CanonicalType::signal(PayloadType::Float, Unit::Scalar),
        };
        assert!(time.inputs().is_empty());
    }
}
