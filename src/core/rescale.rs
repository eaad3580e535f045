//! Pure timestamp arithmetic between rational time bases.
//!
//! Matches FFmpeg's `av_rescale_q_rnd` for the rounding modes this crate
//! uses, but is implemented as plain integer math so it is total over its
//! domain and testable without touching FFI.

use ffmpeg_next::Rational;

/// Rounding policy for [`rescale_q_rnd`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Round to nearest, ties away from zero.
    NearInf,
    /// Round to nearest, ties away from zero, and return the two `i64`
    /// extremes unchanged. The extremes encode "unknown/unbounded"
    /// timestamps and must never be scaled as if they were real values.
    NearInfPassMinMax,
}

/// Rescale `value` from time base `src` to time base `dst`.
pub fn rescale_q_rnd(value: i64, src: Rational, dst: Rational, rounding: Rounding) -> i64 {
    if rounding == Rounding::NearInfPassMinMax && (value == i64::MIN || value == i64::MAX) {
        return value;
    }

    let mut num = value as i128 * src.numerator() as i128 * dst.denominator() as i128;
    let mut den = src.denominator() as i128 * dst.numerator() as i128;
    if den < 0 {
        num = -num;
        den = -den;
    }
    debug_assert!(den != 0, "rescale between degenerate time bases");
    if den == 0 {
        return 0;
    }

    let half = den / 2;
    let rounded = if num >= 0 {
        (num + half) / den
    } else {
        (num - half) / den
    };
    rounded.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Rescale a duration. Durations have no sentinel, so the extremes are
/// ordinary values here.
pub fn rescale_q(value: i64, src: Rational, dst: Rational) -> i64 {
    rescale_q_rnd(value, src, dst, Rounding::NearInf)
}

/// Rescale an optional timestamp, propagating "unknown" unchanged.
pub fn rescale_ts(value: Option<i64>, src: Rational, dst: Rational) -> Option<i64> {
    value.map(|v| rescale_q_rnd(v, src, dst, Rounding::NearInfPassMinMax))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_ratio_90k_to_1k() {
        assert_eq!(
            rescale_q_rnd(
                90000,
                Rational::new(1, 90000),
                Rational::new(1, 1000),
                Rounding::NearInfPassMinMax
            ),
            1000
        );
    }

    #[test]
    fn test_exact_ratio_48k_to_1k() {
        assert_eq!(
            rescale_q_rnd(
                48000,
                Rational::new(1, 48000),
                Rational::new(1, 1000),
                Rounding::NearInfPassMinMax
            ),
            1000
        );
    }

    #[test]
    fn test_ties_round_away_from_zero() {
        // 1 unit of 1/2000 is 0.5 units of 1/1000.
        let up = rescale_q_rnd(
            1,
            Rational::new(1, 2000),
            Rational::new(1, 1000),
            Rounding::NearInf,
        );
        assert_eq!(up, 1);

        let down = rescale_q_rnd(
            -1,
            Rational::new(1, 2000),
            Rational::new(1, 1000),
            Rounding::NearInf,
        );
        assert_eq!(down, -1);
    }

    #[test]
    fn test_round_to_nearest() {
        // 1/90000 s in 1/1000 units is 0.0111; nearest is 0.
        assert_eq!(
            rescale_q_rnd(
                1,
                Rational::new(1, 90000),
                Rational::new(1, 1000),
                Rounding::NearInf
            ),
            0
        );
        // 135000/90000 s = 1.5 s = 1500 ms exactly.
        assert_eq!(
            rescale_q_rnd(
                135000,
                Rational::new(1, 90000),
                Rational::new(1, 1000),
                Rounding::NearInf
            ),
            1500
        );
    }

    #[test]
    fn test_extremes_pass_through() {
        let src = Rational::new(1, 90000);
        let dst = Rational::new(1, 1000);
        assert_eq!(
            rescale_q_rnd(i64::MIN, src, dst, Rounding::NearInfPassMinMax),
            i64::MIN
        );
        assert_eq!(
            rescale_q_rnd(i64::MAX, src, dst, Rounding::NearInfPassMinMax),
            i64::MAX
        );
    }

    #[test]
    fn test_plain_rounding_does_not_pass_extremes() {
        // Without the pass-through rule the extremes are ordinary values;
        // scaling down just clamps into range and stays finite.
        let scaled = rescale_q_rnd(
            i64::MAX,
            Rational::new(1, 90000),
            Rational::new(1, 1000),
            Rounding::NearInf,
        );
        assert_ne!(scaled, i64::MAX);
    }

    #[test]
    fn test_unset_propagates() {
        assert_eq!(
            rescale_ts(None, Rational::new(1, 90000), Rational::new(1, 1000)),
            None
        );
        assert_eq!(
            rescale_ts(
                Some(90000),
                Rational::new(1, 90000),
                Rational::new(1, 1000)
            ),
            Some(1000)
        );
    }

    #[test]
    fn test_duration_rescale() {
        assert_eq!(
            rescale_q(3600, Rational::new(1, 90000), Rational::new(1, 1000)),
            40
        );
    }

    #[test]
    fn test_identity_time_base() {
        let tb = Rational::new(1, 90000);
        assert_eq!(rescale_q_rnd(1234567, tb, tb, Rounding::NearInf), 1234567);
    }
}
