use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq)]
/// Geographic rectangle limiting the spatial extent of a request, in degrees.
pub struct BoundingBox {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn new(west: f64, east: f64, south: f64, north: f64) -> Result<Self, ValidationError> {
        let bbox = BoundingBox {
            west,
            east,
            south,
            north,
        };
        bbox.validate()?;

        Ok(bbox)
    }

    /// Longitudes may be given as -180 to 180 or 0 to 360.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(-180.0..=360.0).contains(&self.west) || !(-180.0..=360.0).contains(&self.east) {
            return Err(ValidationError::LongitudeRange);
        }

        if !(-90.0..=90.0).contains(&self.south) || !(-90.0..=90.0).contains(&self.north) {
            return Err(ValidationError::LatitudeRange);
        }

        if self.west >= self.east {
            return Err(ValidationError::InvertedLongitude {
                west: self.west,
                east: self.east,
            });
        }

        if self.south >= self.north {
            return Err(ValidationError::InvertedLatitude {
                south: self.south,
                north: self.north,
            });
        }

        Ok(())
    }
}

impl Default for BoundingBox {
    /// The LiveOcean model boundary off the Pacific Northwest.
    fn default() -> Self {
        BoundingBox {
            west: -131.0,
            east: -122.0,
            south: 39.0,
            north: 53.0,
        }
    }
}
