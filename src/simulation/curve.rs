//! Cubic Bézier curves used for curved roads and intersection transitions

use serde::{Deserialize, Serialize};

use super::types::Vec2;

/// Number of chord segments used when estimating arc length
const LENGTH_SAMPLES: usize = 20;

/// A cubic Bézier curve with a cached arc-length estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicBezier {
    pub p0: Vec2,
    pub p1: Vec2,
    pub p2: Vec2,
    pub p3: Vec2,
    length: f32,
}

impl CubicBezier {
    pub fn new(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2) -> Self {
        let mut curve = Self {
            p0,
            p1,
            p2,
            p3,
            length: 0.0,
        };
        curve.length = curve.estimate_length();
        curve
    }

    /// Approximate arc length of the curve
    pub fn length(&self) -> f32 {
        self.length
    }

    /// Evaluate the curve at parameter `t`, clamped to `[0, 1]`
    pub fn point_at(&self, t: f32) -> Vec2 {
        let t = t.clamp(0.0, 1.0);
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let t2 = t * t;

        let a = mt2 * mt;
        let b = 3.0 * mt2 * t;
        let c = 3.0 * mt * t2;
        let d = t2 * t;

        Vec2::new(
            a * self.p0.x + b * self.p1.x + c * self.p2.x + d * self.p3.x,
            a * self.p0.y + b * self.p1.y + c * self.p2.y + d * self.p3.y,
        )
    }

    /// Unit tangent at parameter `t`
    pub fn tangent_at(&self, t: f32) -> Vec2 {
        let t = t.clamp(0.0, 1.0);
        let mt = 1.0 - t;

        let d = (self.p1 - self.p0) * (3.0 * mt * mt)
            + (self.p2 - self.p1) * (6.0 * mt * t)
            + (self.p3 - self.p2) * (3.0 * t * t);
        d.normalized()
    }

    fn estimate_length(&self) -> f32 {
        let mut length = 0.0;
        let mut prev = self.p0;
        for i in 1..=LENGTH_SAMPLES {
            let point = self.point_at(i as f32 / LENGTH_SAMPLES as f32);
            length += prev.distance(&point);
            prev = point;
        }
        length
    }
}
