//! Coordinate axis enumeration used by bounding boxes and the kd-tree.

/// A coordinate axis, or the sentinel meaning "leaf node" when used as
/// a kd-tree split axis.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Axis {
    #[default]
    X = 0,
    Y = 1,
    Z = 2,
}

impl From<usize> for Axis {
    fn from(i: usize) -> Self {
        match i {
            0 => Axis::X,
            1 => Axis::Y,
            2 => Axis::Z,
            _ => panic!("invalid axis index {}", i),
        }
    }
}

impl From<Axis> for usize {
    fn from(a: Axis) -> Self {
        a as usize
    }
}
