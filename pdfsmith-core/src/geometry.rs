//! Basic geometric types for PDF

use crate::objects::Object;
use serde::{Deserialize, Serialize};

/// A point in 2D space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Origin point (0, 0)
    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

/// A rectangle defined by two points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    /// Lower-left corner
    pub lower_left: Point,
    /// Upper-right corner
    pub upper_right: Point,
}

impl Rectangle {
    /// Create a new rectangle from two points
    pub fn new(lower_left: Point, upper_right: Point) -> Self {
        Self {
            lower_left,
            upper_right,
        }
    }

    /// Create a rectangle from position and size
    pub fn from_position_and_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            lower_left: Point::new(x, y),
            upper_right: Point::new(x + width, y + height),
        }
    }

    /// A4 page box (595 x 842 points)
    pub fn a4() -> Self {
        Self::from_position_and_size(0.0, 0.0, 595.0, 842.0)
    }

    /// US Letter page box (612 x 792 points)
    pub fn letter() -> Self {
        Self::from_position_and_size(0.0, 0.0, 612.0, 792.0)
    }

    /// Get the width
    pub fn width(&self) -> f64 {
        self.upper_right.x - self.lower_left.x
    }

    /// Get the height
    pub fn height(&self) -> f64 {
        self.upper_right.y - self.lower_left.y
    }

    /// `[llx lly urx ury]` array as used by MediaBox and BBox.
    pub fn to_object(&self) -> Object {
        Object::Array(vec![
            Object::Real(self.lower_left.x),
            Object::Real(self.lower_left.y),
            Object::Real(self.upper_right.x),
            Object::Real(self.upper_right.y),
        ])
    }

    /// Read a rectangle array. Corners are normalized, since PDF allows
    /// any two opposite corners.
    pub fn from_object(object: &Object) -> Option<Self> {
        let values = object.as_array()?;
        if values.len() != 4 {
            return None;
        }
        let mut nums = [0.0; 4];
        for (slot, value) in nums.iter_mut().zip(values) {
            *slot = value.as_real()?;
        }
        Some(Self::new(
            Point::new(nums[0].min(nums[2]), nums[1].min(nums[3])),
            Point::new(nums[0].max(nums[2]), nums[1].max(nums[3])),
        ))
    }
}
