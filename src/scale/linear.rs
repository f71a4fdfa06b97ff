//! Linear numeric scale.

/// Maps `[d0, d1]` onto `[r0, r1]`.
///
/// Values outside the domain extrapolate unless clamping is enabled. A
/// degenerate domain (`d0 == d1`) maps every input to the middle of the
/// range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: [f64; 2],
    range: [f64; 2],
    clamp: bool,
}

impl LinearScale {
    pub fn new(domain: [f64; 2], range: [f64; 2]) -> Self {
        Self {
            domain,
            range,
            clamp: false,
        }
    }

    /// Builder-style clamp toggle.
    pub fn clamped(mut self, clamp: bool) -> Self {
        self.clamp = clamp;
        self
    }

    pub fn domain(&self) -> [f64; 2] {
        self.domain
    }

    pub fn range(&self) -> [f64; 2] {
        self.range
    }

    pub fn is_degenerate(&self) -> bool {
        self.domain[0] == self.domain[1]
    }

    /// Normalized position of `value` in the domain, or None when the
    /// domain is degenerate.
    pub fn normalize(&self, value: f64) -> Option<f64> {
        let [d0, d1] = self.domain;
        let span = d1 - d0;
        if span == 0.0 || !span.is_finite() {
            return None;
        }
        let t = (value - d0) / span;
        Some(if self.clamp { t.clamp(0.0, 1.0) } else { t })
    }

    pub fn map(&self, value: f64) -> f64 {
        let [r0, r1] = self.range;
        match self.normalize(value) {
            Some(t) => r0 + (r1 - r0) * t,
            None => (r0 + r1) / 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_endpoints() {
        let scale = LinearScale::new([10.0, 20.0], [5.0, 30.0]);
        assert_eq!(scale.map(10.0), 5.0);
        assert_eq!(scale.map(20.0), 30.0);
        assert_eq!(scale.map(15.0), 17.5);
    }

    #[test]
    fn test_extrapolates_unless_clamped() {
        let scale = LinearScale::new([0.0, 1.0], [0.0, 10.0]);
        assert_eq!(scale.map(2.0), 20.0);
        assert_eq!(scale.clamped(true).map(2.0), 10.0);
        assert_eq!(scale.clamped(true).map(-1.0), 0.0);
    }

    #[test]
    fn test_degenerate_domain_returns_midpoint() {
        let scale = LinearScale::new([3.0, 3.0], [5.0, 30.0]);
        assert!(scale.is_degenerate());
        assert_eq!(scale.map(3.0), 17.5);
        assert_eq!(scale.map(-100.0), 17.5);
    }

    #[test]
    fn test_monotonic() {
        let up = LinearScale::new([-4.0, 9.0], [5.0, 30.0]);
        let down = LinearScale::new([-4.0, 9.0], [30.0, 5.0]);
        let mut prev_up = f64::NEG_INFINITY;
        let mut prev_down = f64::INFINITY;
        for i in 0..=26 {
            let v = -4.0 + i as f64 * 0.5;
            assert!(up.map(v) >= prev_up);
            assert!(down.map(v) <= prev_down);
            prev_up = up.map(v);
            prev_down = down.map(v);
        }
    }
}
