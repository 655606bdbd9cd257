// moto_core/src/utils.rs

//! Small scalar helpers shared by the per-step controllers.

use num_traits::Float;

/// Exponential-smoothing blend: moves `current` towards `target` by `factor`.
pub fn blend<T: Float>(current: T, target: T, factor: T) -> T {
    current * (T::one() - factor) + target * factor
}

/// Frame-rate aware blend factor `min(max_factor, dt * rate)`.
///
/// The cap keeps the filter stable when a single frame is very long.
pub fn blend_factor<T: Float>(dt: T, rate: T, max_factor: T) -> T {
    (dt * rate).max(T::zero()).min(max_factor)
}

/// Moves `value` towards zero by at most `step`, never crossing zero.
pub fn approach_zero<T: Float>(value: T, step: T) -> T {
    if value > T::zero() {
        (value - step).max(T::zero())
    } else if value < T::zero() {
        (value + step).min(T::zero())
    } else {
        value
    }
}
