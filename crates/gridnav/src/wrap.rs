//! Linear wraparound arithmetic.

/// Result of a wrapping move.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WrappedValue {
    /// Position after the move.
    pub value: isize,
    /// The move went past `max` and wrapped to `min`.
    pub overflowed_max: bool,
    /// The move went below `min` and wrapped to `max`.
    pub overflowed_min: bool,
}

/// Move `current` by `direction` within `min..=max`, wrapping to the other end on
/// overflow.
pub fn linear_cycle_navigation_wrap(
    current: isize,
    max: isize,
    direction: isize,
    min: isize,
) -> WrappedValue {
    let next = current + direction;
    if next > max {
        WrappedValue {
            value: min,
            overflowed_max: true,
            overflowed_min: false,
        }
    } else if next < min {
        WrappedValue {
            value: max,
            overflowed_max: false,
            overflowed_min: true,
        }
    } else {
        WrappedValue {
            value: next,
            ..WrappedValue::default()
        }
    }
}
