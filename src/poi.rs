use crate::common::geo;
use std::path::Path;
use strum_macros::Display;

#[derive(Debug, Display)]
pub enum PoiStoreError {
    #[strum(to_string = "cannot read POI store: {0}")]
    Io(String),
    #[strum(to_string = "cannot parse POI store: {0}")]
    Parse(String),
}

impl std::error::Error for PoiStoreError {}

/// A user-curated point of interest near which time compression is unsafe
/// or unwanted (sightseeing marks, custom strips, photo targets).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PointOfInterest {
    pub name: String,
    pub category: String,
    pub lat: f64,
    pub lon: f64,
}

/// Read-only point-of-interest list, loaded once per session and queried
/// every cycle for the nearest-neighbor distance.
#[derive(Debug, Default)]
pub struct PoiStore {
    points: Vec<PointOfInterest>,
}

impl PoiStore {
    pub fn from_points(points: Vec<PointOfInterest>) -> Self {
        Self { points }
    }

    /// Loads a JSON array of `{name, category, lat, lon}` records.
    ///
    /// # Errors
    /// [`PoiStoreError`] on unreadable or malformed files.
    pub fn load(path: &Path) -> Result<Self, PoiStoreError> {
        let raw = std::fs::read_to_string(path).map_err(|e| PoiStoreError::Io(e.to_string()))?;
        let points = serde_json::from_str(&raw).map_err(|e| PoiStoreError::Parse(e.to_string()))?;
        Ok(Self::from_points(points))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Distance in nm to the closest point, with the point itself.
    /// Records with degenerate coordinates are skipped. Linear scan: the
    /// list is small and haversine distance does not embed in the flat
    /// metrics a spatial index would want.
    pub fn nearest_nm(&self, position: (f64, f64)) -> Option<(f64, &PointOfInterest)> {
        self.points
            .iter()
            .filter_map(|p| {
                geo::great_circle_nm(position, (p.lat, p.lon)).ok().map(|d| (d, p))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }
}

#[cfg(test)]
mod tests {
    use super::{PoiStore, PointOfInterest};

    fn poi(name: &str, lat: f64, lon: f64) -> PointOfInterest {
        PointOfInterest {
            name: String::from(name),
            category: String::from("Sightseeing"),
            lat,
            lon,
        }
    }

    #[test]
    fn nearest_picks_the_closest_point() {
        let store = PoiStore::from_points(vec![
            poi("Neuschwanstein", 47.5576, 10.7498),
            poi("Zugspitze", 47.4212, 10.9863),
        ]);
        let (dist, nearest) = store.nearest_nm((47.43, 10.98)).unwrap();
        assert_eq!(nearest.name, "Zugspitze");
        assert!(dist < 1.0, "got {dist}");
    }

    #[test]
    fn empty_store_has_no_nearest() {
        assert!(PoiStore::default().nearest_nm((0.0, 0.0)).is_none());
    }

    #[test]
    fn degenerate_records_are_skipped() {
        let store = PoiStore::from_points(vec![poi("broken", f64::NAN, 0.0), poi("ok", 1.0, 1.0)]);
        let (_, nearest) = store.nearest_nm((0.0, 0.0)).unwrap();
        assert_eq!(nearest.name, "ok");
    }

    #[test]
    fn parses_json_records() {
        let raw = r#"[{"name":"Strip","category":"Airstrip","lat":61.1,"lon":-149.8}]"#;
        let points: Vec<PointOfInterest> = serde_json::from_str(raw).unwrap();
        let store = PoiStore::from_points(points);
        assert_eq!(store.len(), 1);
    }
}
