//! Device and datacenter locations.

use serde::{Deserialize, Serialize};

/// Position of a device or datacenter together with the access point serving it.
///
/// Two locations are equal iff their coordinates are equal, access point and place type are derived metadata.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Location {
    pub place_type: usize,
    pub access_point: usize,
    pub x: f64,
    pub y: f64,
}

impl Location {
    pub fn new(place_type: usize, access_point: usize, x: f64, y: f64) -> Self {
        Self {
            place_type,
            access_point,
            x,
            y,
        }
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_metadata() {
        let a = Location::new(0, 1, 2., 3.);
        let b = Location::new(2, 5, 2., 3.);
        let c = Location::new(0, 1, 2., 4.);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
