use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
///
/// The extent does not carry its coordinate system: a layer extent is expressed in the layer's
/// source projection, a view extent in the map projection. Serialized with the `minX`/`minY`/
/// `maxX`/`maxY` field names used by the geodata backend.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extent {
    /// Minimum x coordinate.
    #[serde(alias = "min_x")]
    pub min_x: f64,
    /// Minimum y coordinate.
    #[serde(alias = "min_y")]
    pub min_y: f64,
    /// Maximum x coordinate.
    #[serde(alias = "max_x")]
    pub max_x: f64,
    /// Maximum y coordinate.
    #[serde(alias = "max_y")]
    pub max_y: f64,
}

impl Extent {
    /// Creates a new extent. Coordinates are normalized so that `min <= max`.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
        }
    }

    /// Creates an extent from `[minX, minY, maxX, maxY]` array, as used by bounds payloads.
    pub fn from_array(bounds: [f64; 4]) -> Self {
        Self::new(bounds[0], bounds[1], bounds[2], bounds[3])
    }

    /// Smallest extent containing all the given points. Returns `None` for an empty iterator.
    pub fn from_points(mut points: impl Iterator<Item = [f64; 2]>) -> Option<Self> {
        let first = points.next()?;
        let mut extent = Self::new(first[0], first[1], first[0], first[1]);
        for [x, y] in points {
            extent.min_x = extent.min_x.min(x);
            extent.min_y = extent.min_y.min(y);
            extent.max_x = extent.max_x.max(x);
            extent.max_y = extent.max_y.max(y);
        }

        Some(extent)
    }

    /// Smallest extent containing both `self` and `other`.
    pub fn merge(&self, other: Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Union of all extents of the iterator, or `None` if it is empty.
    pub fn union_all(iter: impl IntoIterator<Item = Extent>) -> Option<Self> {
        iter.into_iter().reduce(|acc, extent| acc.merge(extent))
    }

    /// Extent grown by `margin` on every side. Negative margin shrinks it.
    pub fn expand(&self, margin: f64) -> Self {
        Self::new(
            self.min_x - margin,
            self.min_y - margin,
            self.max_x + margin,
            self.max_y + margin,
        )
    }

    /// Width of the extent.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the extent.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Center point as `[x, y]`.
    pub fn center(&self) -> [f64; 2] {
        [
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        ]
    }

    /// Corner points in counter-clockwise order starting from the lower-left one.
    pub fn corners(&self) -> [[f64; 2]; 4] {
        [
            [self.min_x, self.min_y],
            [self.max_x, self.min_y],
            [self.max_x, self.max_y],
            [self.min_x, self.max_y],
        ]
    }

    /// Returns true if the point lies inside the extent or on its border.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.min_x <= x && x <= self.max_x && self.min_y <= y && y <= self.max_y
    }

    /// Returns true if all coordinates are finite and `min <= max`.
    pub fn is_valid(&self) -> bool {
        [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite())
            && self.min_x <= self.max_x
            && self.min_y <= self.max_y
    }

    /// Returns `[minX, minY, maxX, maxY]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}
