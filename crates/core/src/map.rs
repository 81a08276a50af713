//! Map artifacts built from resolved locations.

use thiserror::Error;

use crate::geo::{Coordinates, Location};

/// Zoom used when the model doesn't ask for one.
pub const DEFAULT_ZOOM: i32 = 10;

/// A labeled marker on the map.
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    /// Short label, the place name.
    pub label: String,
    /// Longer text shown when the marker is opened.
    pub description: String,
    /// Where the marker sits.
    pub coordinates: Coordinates,
}

/// A renderable map: a center, a zoom level and markers.
#[derive(Clone, Debug, PartialEq)]
pub struct MapArtifact {
    /// The point the map is centered on.
    pub center: Coordinates,
    /// Tile zoom level, passed through as requested.
    pub zoom: i32,
    /// Markers in the order the locations were given.
    pub markers: Vec<Marker>,
}

/// Failure to turn locations into a map.
#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    /// A location has coordinates no map can show.
    #[error("cannot place {name:?} at ({latitude}, {longitude})")]
    InvalidCoordinates {
        /// The offending place.
        name: String,
        /// Its latitude.
        latitude: f64,
        /// Its longitude.
        longitude: f64,
    },
    /// The renderer itself failed.
    #[error("map rendering failed: {0}")]
    Renderer(String),
}

/// Builds [`MapArtifact`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct MapBuilder;

impl MapBuilder {
    /// Builds a map centered on the first location, with one marker per
    /// location. An empty map is centered on (0, 0).
    ///
    /// `zoom` is not validated; keeping it within what the renderer
    /// supports (conventionally 1 to 18) is up to the caller.
    pub fn build(
        &self,
        locations: &[Location],
        zoom: i32,
    ) -> Result<MapArtifact, RenderError> {
        let mut markers = Vec::with_capacity(locations.len());
        for location in locations {
            let Coordinates {
                latitude,
                longitude,
            } = location.coordinates;
            let valid = latitude.is_finite()
                && longitude.is_finite()
                && (-90.0..=90.0).contains(&latitude)
                && (-180.0..=180.0).contains(&longitude);
            if !valid {
                return Err(RenderError::InvalidCoordinates {
                    name: location.name.clone(),
                    latitude,
                    longitude,
                });
            }
            markers.push(Marker {
                label: location.name.clone(),
                description: location.description.clone(),
                coordinates: location.coordinates,
            });
        }

        let center = markers
            .first()
            .map(|m| m.coordinates)
            .unwrap_or(Coordinates::new(0.0, 0.0));
        Ok(MapArtifact {
            center,
            zoom,
            markers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_on_first_location() {
        let locations = [
            Location::new("Tokyo", Coordinates::new(35.6828, 139.7595)),
            Location::new("Kyoto", Coordinates::new(35.0116, 135.7681)),
        ];
        let map = MapBuilder::default().build(&locations, 6).unwrap();

        assert_eq!(map.center, locations[0].coordinates);
        assert_eq!(map.zoom, 6);
        assert_eq!(map.markers.len(), 2);
        assert_eq!(map.markers[0].description, "Tokyo");
        assert_eq!(map.markers[1].label, "Kyoto");
        assert_eq!(map.markers[1].description, "Kyoto");
    }

    #[test]
    fn test_empty_map_centered_on_origin() {
        let map = MapBuilder::default().build(&[], 30).unwrap();
        assert_eq!(map.center, Coordinates::new(0.0, 0.0));
        assert_eq!(map.zoom, 30);
        assert!(map.markers.is_empty());
    }

    #[test]
    fn test_invalid_coordinates() {
        let locations =
            [Location::new("Nowhere", Coordinates::new(f64::NAN, 0.0))];
        let err = MapBuilder::default().build(&locations, 10).unwrap_err();
        assert!(matches!(err, RenderError::InvalidCoordinates { .. }));

        let locations =
            [Location::new("Beyond", Coordinates::new(10.0, 200.0))];
        assert!(MapBuilder::default().build(&locations, 10).is_err());
    }
}
