// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Joe Pearson
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::Vec2;

/// A 1-D function defined by a set of quadratic Bézier curve segments whose
/// x projections are disjoint and strictly increasing. Outside the domain
/// the function is clamped flat. Used by the performance model's thrust and
/// fuel-flow curves.
#[derive(Clone, PartialEq, Debug)]
pub struct Bezier {
    pts: Vec<Vec2>,
}

/// Solves `a*x^2 + b*x + c = 0`, returning 0, 1 or 2 real solutions.
fn quadratic_solve(a: f64, b: f64, c: f64) -> Vec<f64> {
    if a == 0.0 {
        if b == 0.0 {
            return Vec::new();
        }
        return vec![-c / b];
    }
    let d = b * b - 4.0 * a * c;
    if d < 0.0 {
        Vec::new()
    } else if d == 0.0 {
        vec![-b / (2.0 * a)]
    } else {
        let sq = d.sqrt();
        vec![(-b - sq) / (2.0 * a), (-b + sq) / (2.0 * a)]
    }
}

impl Bezier {
    /// Builds the function from control points. Points must come in groups
    /// of quadratic segments sharing their edge points (3, 5, 7, ... points)
    /// with strictly increasing x.
    pub fn new(pts: Vec<Vec2>) -> Option<Self> {
        if pts.len() < 3 || pts.len() % 2 != 1 {
            return None;
        }
        if pts.windows(2).any(|w| w[0].x >= w[1].x) {
            return None;
        }
        Some(Bezier { pts })
    }

    pub fn points(&self) -> &[Vec2] {
        &self.pts
    }

    /// Evaluates the function at `x`.
    ///
    /// Per curve piece, `B(t) = (1-t)^2*P0 + 2(1-t)t*P1 + t^2*P2`. Since the
    /// pieces form a function of x, the per-piece `x(t)` quadratic
    /// `0 = (p2 - 2*p1 + p0)t^2 + 2(p1 - p0)t + p0 - x` is solved for the
    /// `t` in [0, 1], which then yields `y` from the curve equation.
    pub fn eval(&self, x: f64) -> f64 {
        let first = self.pts[0];
        let last = self.pts[self.pts.len() - 1];
        if x < first.x {
            return first.y;
        }
        if x > last.x {
            return last.y;
        }

        for piece in self.pts.windows(3).step_by(2) {
            let (p0, p1, p2) = (piece[0], piece[1], piece[2]);
            if !(p0.x <= x && x <= p2.x) {
                continue;
            }
            let ts = quadratic_solve(p2.x - 2.0 * p1.x + p0.x, 2.0 * (p1.x - p0.x), p0.x - x);
            let t = ts
                .into_iter()
                .find(|&t| (0.0..=1.0).contains(&t))
                .unwrap_or(0.0);
            return (1.0 - t) * (1.0 - t) * p0.y + 2.0 * (1.0 - t) * t * p1.y + t * t * p2.y;
        }
        last.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> Bezier {
        Bezier::new(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 1.0),
        ])
        .expect("valid curve")
    }

    #[test]
    fn rejects_non_monotone_x() {
        assert!(Bezier::new(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(1.0, 1.0),
        ])
        .is_none());
        assert!(Bezier::new(vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0)]).is_none());
    }

    #[test]
    fn clamps_outside_domain() {
        let c = curve();
        assert_eq!(c.eval(-5.0), 0.0);
        assert_eq!(c.eval(5.0), 1.0);
    }

    #[test]
    fn hits_endpoints() {
        let c = curve();
        assert!((c.eval(0.0) - 0.0).abs() < 1e-12);
        assert!((c.eval(2.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn monotone_in_between() {
        let c = curve();
        let mut last = -1.0;
        for i in 0..=20 {
            let y = c.eval(i as f64 * 0.1);
            assert!(y >= last);
            last = y;
        }
    }
}
