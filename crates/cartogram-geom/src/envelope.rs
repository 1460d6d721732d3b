use crate::{Coordinate, coord};

/// Axis-aligned bounding box.
///
/// The null envelope (`max_x < min_x`) is the identity for [`Envelope::expand_to_include`]; it
/// contains nothing and has zero extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::null()
    }
}

impl Envelope {
    pub const fn null() -> Self {
        Self {
            min_x: 0.0,
            max_x: -1.0,
            min_y: 0.0,
            max_y: -1.0,
        }
    }

    /// Builds an envelope from two x and two y bounds in any order.
    pub fn new(x1: f64, x2: f64, y1: f64, y2: f64) -> Self {
        Self {
            min_x: x1.min(x2),
            max_x: x1.max(x2),
            min_y: y1.min(y2),
            max_y: y1.max(y2),
        }
    }

    pub fn from_coordinates<'a>(coords: impl IntoIterator<Item = &'a Coordinate>) -> Self {
        let mut env = Self::null();
        for c in coords {
            env.expand_to_include(c.x, c.y);
        }
        env
    }

    pub fn is_null(&self) -> bool {
        self.max_x < self.min_x
    }

    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    pub fn min_y(&self) -> f64 {
        self.min_y
    }

    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    pub fn width(&self) -> f64 {
        if self.is_null() {
            0.0
        } else {
            self.max_x - self.min_x
        }
    }

    pub fn height(&self) -> f64 {
        if self.is_null() {
            0.0
        } else {
            self.max_y - self.min_y
        }
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Option<Coordinate> {
        (!self.is_null()).then(|| {
            coord(
                0.5 * (self.min_x + self.max_x),
                0.5 * (self.min_y + self.max_y),
            )
        })
    }

    pub fn expand_to_include(&mut self, x: f64, y: f64) {
        if self.is_null() {
            *self = Self {
                min_x: x,
                max_x: x,
                min_y: y,
                max_y: y,
            };
            return;
        }
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    pub fn expand_to_include_envelope(&mut self, other: &Envelope) {
        if other.is_null() {
            return;
        }
        if self.is_null() {
            *self = *other;
            return;
        }
        self.min_x = self.min_x.min(other.min_x);
        self.max_x = self.max_x.max(other.max_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_y = self.max_y.max(other.max_y);
    }

    /// Grows (or, with negative deltas, shrinks) the envelope on every side. An envelope that
    /// inverts becomes null.
    pub fn expand_by(&mut self, dx: f64, dy: f64) {
        if self.is_null() {
            return;
        }
        self.min_x -= dx;
        self.max_x += dx;
        self.min_y -= dy;
        self.max_y += dy;
        if self.min_x > self.max_x || self.min_y > self.max_y {
            *self = Self::null();
        }
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        !self.is_null() && x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn contains_envelope(&self, other: &Envelope) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    pub fn intersects(&self, other: &Envelope) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        !(other.min_x > self.max_x
            || other.max_x < self.min_x
            || other.min_y > self.max_y
            || other.max_y < self.min_y)
    }

    /// The envelope as a closed-by-convention ring, counter-clockwise from the top-right corner.
    pub fn to_ring(&self) -> Vec<Coordinate> {
        vec![
            coord(self.max_x, self.max_y),
            coord(self.min_x, self.max_y),
            coord(self.min_x, self.min_y),
            coord(self.max_x, self.min_y),
        ]
    }

    pub fn to_polygon(&self) -> crate::Polygon {
        crate::Polygon::new(self.to_ring())
    }
}
