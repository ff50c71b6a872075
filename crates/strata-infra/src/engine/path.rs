// Copyright 2025 eraflo
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

//! Recorded vector paths.

use std::any::Any;
use strata_core::renderer::api::{FillRule, Mat2D};
use strata_core::renderer::traits::RenderPath;
use strata_core::{GpuError, GpuResult};

/// One path verb with its points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathVerb {
    /// Start a contour.
    Move(f32, f32),
    /// Line to a point.
    Line(f32, f32),
    /// Cubic to a point through two controls.
    Cubic([f32; 6]),
    /// Close the contour.
    Close,
}

impl PathVerb {
    fn transformed(self, m: &Mat2D) -> Self {
        match self {
            PathVerb::Move(x, y) => {
                let (x, y) = m.map_point(x, y);
                PathVerb::Move(x, y)
            }
            PathVerb::Line(x, y) => {
                let (x, y) = m.map_point(x, y);
                PathVerb::Line(x, y)
            }
            PathVerb::Cubic([ox, oy, ix, iy, x, y]) => {
                let (ox, oy) = m.map_point(ox, oy);
                let (ix, iy) = m.map_point(ix, iy);
                let (x, y) = m.map_point(x, y);
                PathVerb::Cubic([ox, oy, ix, iy, x, y])
            }
            PathVerb::Close => PathVerb::Close,
        }
    }
}

/// A path kept as its verb list.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingPath {
    fill_rule: FillRule,
    verbs: Vec<PathVerb>,
}

impl RecordingPath {
    /// Creates an empty path.
    pub fn new(fill_rule: FillRule) -> Self {
        Self {
            fill_rule,
            verbs: Vec::new(),
        }
    }

    /// The recorded verbs.
    pub fn verbs(&self) -> &[PathVerb] {
        &self.verbs
    }
}

impl RenderPath for RecordingPath {
    fn rewind(&mut self) {
        self.verbs.clear();
    }

    fn fill_rule(&self) -> FillRule {
        self.fill_rule
    }

    fn set_fill_rule(&mut self, rule: FillRule) {
        self.fill_rule = rule;
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.verbs.push(PathVerb::Move(x, y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.verbs.push(PathVerb::Line(x, y));
    }

    fn cubic_to(&mut self, ox: f32, oy: f32, ix: f32, iy: f32, x: f32, y: f32) {
        self.verbs.push(PathVerb::Cubic([ox, oy, ix, iy, x, y]));
    }

    fn close(&mut self) {
        self.verbs.push(PathVerb::Close);
    }

    fn add_path(&mut self, other: &dyn RenderPath, transform: &Mat2D) -> GpuResult<()> {
        let other = other
            .as_any()
            .downcast_ref::<RecordingPath>()
            .ok_or_else(|| GpuError::internal("path was not created by the recording engine"))?;
        self.verbs
            .extend(other.verbs.iter().map(|verb| verb.transformed(transform)));
        Ok(())
    }

    fn duplicate(&self) -> Box<dyn RenderPath> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_path_maps_points_through_the_transform() {
        let mut square = RecordingPath::new(FillRule::NonZero);
        square.move_to(0.0, 0.0);
        square.line_to(1.0, 0.0);
        square.close();

        let mut target = RecordingPath::new(FillRule::EvenOdd);
        target
            .add_path(&square, &Mat2D::translation(5.0, 2.0))
            .unwrap();
        assert_eq!(
            target.verbs(),
            &[
                PathVerb::Move(5.0, 2.0),
                PathVerb::Line(6.0, 2.0),
                PathVerb::Close
            ]
        );
        assert_eq!(target.fill_rule(), FillRule::EvenOdd);
    }

    #[test]
    fn rewind_keeps_the_fill_rule() {
        let mut path = RecordingPath::new(FillRule::Clockwise);
        path.cubic_to(0.0, 1.0, 2.0, 3.0, 4.0, 5.0);
        path.rewind();
        assert!(path.verbs().is_empty());
        assert_eq!(path.fill_rule(), FillRule::Clockwise);
    }
}
