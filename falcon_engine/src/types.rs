use std::ops::Mul;

use glam::{Affine2, Vec2};
use serde::Serialize;

pub type DefinitionId = u16;
pub type Depth = u16;

/// Class name reported by movie clips whose definition was never exported
/// under a class of its own.
pub const MOVIE_CLIP_CLASS_NAME: &str = "MovieClip";

/// RGB multiply/add color transform. Alpha is tracked separately as a plain
/// multiplier on the instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorTransform {
    pub mul_r: f32,
    pub mul_g: f32,
    pub mul_b: f32,
    pub add_r: u8,
    pub add_g: u8,
    pub add_b: u8,
}

impl ColorTransform {
    pub const IDENTITY: ColorTransform = ColorTransform {
        mul_r: 1.0,
        mul_g: 1.0,
        mul_b: 1.0,
        add_r: 0,
        add_g: 0,
        add_b: 0,
    };

    pub fn new(mul: [f32; 3], add: [u8; 3]) -> Self {
        Self {
            mul_r: mul[0],
            mul_g: mul[1],
            mul_b: mul[2],
            add_r: add[0],
            add_g: add[1],
            add_b: add[2],
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Applies the transform to an RGB color; the alpha channel passes
    /// through untouched.
    pub fn transform_color(&self, rgba: [u8; 4]) -> [u8; 4] {
        fn channel(value: u8, mul: f32, add: u8) -> u8 {
            (value as f32 * mul + add as f32 + 0.5).clamp(0.0, 255.0) as u8
        }
        [
            channel(rgba[0], self.mul_r, self.add_r),
            channel(rgba[1], self.mul_g, self.add_g),
            channel(rgba[2], self.mul_b, self.add_b),
            rgba[3],
        ]
    }
}

impl Default for ColorTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for ColorTransform {
    type Output = ColorTransform;

    /// Concatenates `rhs` (the child transform) under `self` (the parent).
    fn mul(self, rhs: ColorTransform) -> ColorTransform {
        fn add(parent_add: u8, parent_mul: f32, child_add: u8) -> u8 {
            (parent_add as f32 + parent_mul * child_add as f32 + 0.5).clamp(0.0, 255.0) as u8
        }
        ColorTransform {
            mul_r: self.mul_r * rhs.mul_r,
            mul_g: self.mul_g * rhs.mul_g,
            mul_b: self.mul_b * rhs.mul_b,
            add_r: add(self.add_r, self.mul_r, rhs.add_r),
            add_g: add(self.add_g, self.mul_g, rhs.add_g),
            add_b: add(self.add_b, self.mul_b, rhs.add_b),
        }
    }
}

/// SWF blend modes, numbered as in PlaceObject3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BlendMode {
    #[default]
    Normal0 = 0,
    Normal1 = 1,
    Layer = 2,
    Multiply = 3,
    Screen = 4,
    Lighten = 5,
    Darken = 6,
    Difference = 7,
    Add = 8,
    Subtract = 9,
    Invert = 10,
    Alpha = 11,
    Erase = 12,
    Overlay = 13,
    Hardlight = 14,
}

impl BlendMode {
    /// The renderer only distinguishes additive blending from everything
    /// else.
    pub fn blending_factor(self) -> f32 {
        if self == BlendMode::Add {
            1.0
        } else {
            0.0
        }
    }
}

impl TryFrom<u8> for BlendMode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Normal0),
            1 => Ok(Self::Normal1),
            2 => Ok(Self::Layer),
            3 => Ok(Self::Multiply),
            4 => Ok(Self::Screen),
            5 => Ok(Self::Lighten),
            6 => Ok(Self::Darken),
            7 => Ok(Self::Difference),
            8 => Ok(Self::Add),
            9 => Ok(Self::Subtract),
            10 => Ok(Self::Invert),
            11 => Ok(Self::Alpha),
            12 => Ok(Self::Erase),
            13 => Ok(Self::Overlay),
            14 => Ok(Self::Hardlight),
            other => Err(other),
        }
    }
}

/// Axis-aligned rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rectangle {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rectangle {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_ltrb(values: [f32; 4]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn union(&self, other: &Rectangle) -> Rectangle {
        Rectangle {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Edges are inclusive.
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.left && point.x <= self.right && point.y >= self.top && point.y <= self.bottom
    }

    /// Bounds of the four transformed corners.
    pub fn transformed(&self, transform: &Affine2) -> Rectangle {
        let corners = [
            Vec2::new(self.left, self.top),
            Vec2::new(self.right, self.top),
            Vec2::new(self.left, self.bottom),
            Vec2::new(self.right, self.bottom),
        ];
        let first = transform.transform_point2(corners[0]);
        let mut out = Rectangle::new(first.x, first.y, first.x, first.y);
        for corner in &corners[1..] {
            let point = transform.transform_point2(*corner);
            out.left = out.left.min(point.x);
            out.top = out.top.min(point.y);
            out.right = out.right.max(point.x);
            out.bottom = out.bottom.max(point.y);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_mode_from_raw() {
        assert_eq!(BlendMode::try_from(8), Ok(BlendMode::Add));
        assert_eq!(BlendMode::try_from(0), Ok(BlendMode::Normal0));
        assert_eq!(BlendMode::try_from(15), Err(15));
        assert_eq!(BlendMode::Add.blending_factor(), 1.0);
        assert_eq!(BlendMode::Multiply.blending_factor(), 0.0);
    }

    #[test]
    fn color_transform_concatenation() {
        let parent = ColorTransform::new([0.5, 1.0, 1.0], [10, 0, 0]);
        let child = ColorTransform::new([1.0, 0.5, 1.0], [20, 0, 0]);
        let combined = parent * child;
        assert_eq!(combined.mul_r, 0.5);
        assert_eq!(combined.mul_g, 0.5);
        assert_eq!(combined.add_r, 20);
        assert!((ColorTransform::IDENTITY * ColorTransform::IDENTITY).is_identity());
        assert_eq!(parent.transform_color([100, 100, 100, 7]), [60, 100, 100, 7]);
    }

    #[test]
    fn rectangle_transform_covers_corners() {
        let rect = Rectangle::new(0.0, 0.0, 10.0, 20.0);
        let moved = rect.transformed(&Affine2::from_translation(Vec2::new(5.0, -5.0)));
        assert_eq!(moved, Rectangle::new(5.0, -5.0, 15.0, 15.0));

        let scaled = rect.transformed(&Affine2::from_scale(Vec2::new(-1.0, 2.0)));
        assert_eq!(scaled, Rectangle::new(-10.0, 0.0, 0.0, 40.0));
        assert_eq!(scaled.width(), 10.0);
        assert_eq!(scaled.height(), 40.0);

        let union = rect.union(&moved);
        assert_eq!(union, Rectangle::new(0.0, -5.0, 15.0, 20.0));
    }
}
