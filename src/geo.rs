//! Region Resolver
//!
//! Maps a coordinate to a coarse administrative region name using an ordered
//! table of axis-aligned bounding boxes. This is a low-fidelity stand-in for
//! reverse geocoding: several boxes overlap (neighbouring states share edges),
//! and the first matching rule always wins.
//!
//! Resolution is total. Points outside every box, and non-finite input,
//! resolve to the default region.

use serde::{Deserialize, Serialize};

/// Region returned when no box matches (first district in the price dataset)
pub const DEFAULT_REGION: &str = "Adilabad";

/// One bounding-box rule (bounds are inclusive)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionBox {
    pub name: String,
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl RegionBox {
    pub fn new(name: &str, lat: (f64, f64), lon: (f64, f64)) -> Self {
        Self {
            name: name.to_string(),
            lat_min: lat.0,
            lat_max: lat.1,
            lon_min: lon.0,
            lon_max: lon.1,
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.lat_min..=self.lat_max).contains(&lat) && (self.lon_min..=self.lon_max).contains(&lon)
    }
}

// (name, (lat_min, lat_max), (lon_min, lon_max)); order is the tie-break
const INDIA_REGIONS: &[(&str, (f64, f64), (f64, f64))] = &[
    ("Delhi", (28.4, 28.9), (76.8, 77.4)),
    ("Mumbai", (18.8, 19.3), (72.7, 73.2)),
    ("Bangalore", (12.8, 13.2), (77.4, 77.8)),
    ("Chennai", (12.8, 13.2), (80.1, 80.4)),
    ("Kolkata", (22.4, 22.8), (88.2, 88.6)),
    ("Hyderabad", (17.2, 17.6), (78.2, 78.8)),
    ("Punjab", (30.5, 31.5), (74.5, 76.5)),
    ("Gujarat", (22.0, 24.5), (68.0, 74.5)),
    ("Tamil Nadu", (8.0, 13.5), (76.0, 80.5)),
    ("Karnataka", (11.5, 18.5), (74.0, 78.5)),
    ("Maharashtra", (15.5, 22.0), (72.5, 80.5)),
    ("Andhra Pradesh", (12.0, 19.5), (76.5, 84.5)),
    ("Telangana", (15.5, 19.5), (77.0, 81.0)),
    ("West Bengal", (21.5, 27.0), (85.5, 89.5)),
    ("Uttar Pradesh", (24.0, 31.0), (77.0, 84.5)),
    ("Madhya Pradesh", (21.0, 26.5), (74.0, 82.5)),
    ("Rajasthan", (23.0, 30.5), (69.5, 78.5)),
    ("Haryana", (27.5, 30.5), (74.5, 77.5)),
    ("Kerala", (8.0, 12.5), (74.5, 77.5)),
    ("Odisha", (17.5, 22.5), (81.0, 87.5)),
    ("Assam", (24.0, 28.0), (89.5, 96.5)),
    ("Bihar", (24.0, 27.5), (83.0, 88.5)),
    ("Jharkhand", (21.5, 25.0), (83.0, 87.5)),
    ("Chhattisgarh", (17.5, 24.0), (80.0, 84.5)),
    ("Uttarakhand", (28.5, 31.5), (77.5, 81.5)),
    ("Himachal Pradesh", (30.5, 33.5), (75.5, 79.5)),
    ("Jammu and Kashmir", (32.0, 37.0), (73.5, 80.5)),
    ("Ladakh", (32.0, 37.0), (75.5, 80.5)),
    ("Goa", (14.5, 15.8), (73.5, 74.5)),
    ("Sikkim", (27.0, 28.5), (88.0, 89.0)),
    ("Arunachal Pradesh", (26.0, 29.5), (91.5, 97.5)),
    ("Nagaland", (25.0, 27.5), (93.0, 95.5)),
    ("Manipur", (23.5, 25.5), (93.0, 94.5)),
    ("Mizoram", (22.0, 24.5), (92.0, 93.5)),
    ("Tripura", (22.5, 24.5), (91.0, 92.5)),
    ("Meghalaya", (25.0, 26.5), (89.5, 92.5)),
    ("Andaman and Nicobar", (6.0, 14.0), (92.0, 94.0)),
    ("Lakshadweep", (8.0, 12.0), (71.0, 74.0)),
    ("Puducherry", (11.5, 12.5), (79.5, 80.0)),
    ("Dadra and Nagar Haveli", (20.0, 20.5), (72.5, 73.5)),
    ("Daman and Diu", (20.0, 20.5), (72.5, 73.5)),
    ("Chandigarh", (30.5, 31.0), (76.5, 77.0)),
];

/// Ordered first-match bounding-box resolver
#[derive(Debug, Clone)]
pub struct GeoResolver {
    rules: Vec<RegionBox>,
    default_region: String,
}

impl GeoResolver {
    pub fn new(rules: Vec<RegionBox>, default_region: impl Into<String>) -> Self {
        Self {
            rules,
            default_region: default_region.into(),
        }
    }

    /// Built-in table of Indian states and metro areas
    pub fn india() -> Self {
        let rules = INDIA_REGIONS
            .iter()
            .map(|&(name, lat, lon)| RegionBox::new(name, lat, lon))
            .collect();
        Self::new(rules, DEFAULT_REGION)
    }

    pub fn resolve(&self, lat: f64, lon: f64) -> &str {
        if !lat.is_finite() || !lon.is_finite() {
            return &self.default_region;
        }
        self.rules
            .iter()
            .find(|rule| rule.contains(lat, lon))
            .map(|rule| rule.name.as_str())
            .unwrap_or(self.default_region.as_str())
    }

    pub fn default_region(&self) -> &str {
        &self.default_region
    }

    pub fn rules(&self) -> &[RegionBox] {
        &self.rules
    }
}

impl Default for GeoResolver {
    fn default() -> Self {
        Self::india()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_inside_single_box() {
        let resolver = GeoResolver::new(
            vec![
                RegionBox::new("North", (10.0, 20.0), (0.0, 10.0)),
                RegionBox::new("South", (0.0, 9.0), (0.0, 10.0)),
            ],
            "Nowhere",
        );
        assert_eq!(resolver.resolve(15.0, 5.0), "North");
        assert_eq!(resolver.resolve(4.5, 5.0), "South");
        assert_eq!(resolver.resolve(9.5, 5.0), "Nowhere");
    }

    #[test]
    fn test_first_match_wins_on_overlap() {
        let resolver = GeoResolver::india();
        // Both union territories share the same box
        assert_eq!(resolver.resolve(20.2, 73.0), "Dadra and Nagar Haveli");
        // Delhi sits inside Uttar Pradesh and Haryana boxes too
        assert_eq!(resolver.resolve(28.6139, 77.2090), "Delhi");
    }

    #[test]
    fn test_metro_boxes() {
        let resolver = GeoResolver::india();
        assert_eq!(resolver.resolve(19.07, 72.87), "Mumbai");
        assert_eq!(resolver.resolve(12.97, 77.59), "Bangalore");
        assert_eq!(resolver.resolve(22.57, 88.36), "Kolkata");
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let resolver = GeoResolver::india();
        assert_eq!(resolver.resolve(28.4, 76.8), "Delhi");
    }

    #[test]
    fn test_outside_all_boxes_falls_back() {
        let resolver = GeoResolver::india();
        assert_eq!(resolver.resolve(51.5, -0.12), DEFAULT_REGION);
        assert_eq!(resolver.resolve(0.0, 0.0), DEFAULT_REGION);
    }

    #[test]
    fn test_non_finite_input_falls_back() {
        let resolver = GeoResolver::india();
        assert_eq!(resolver.resolve(f64::NAN, 77.0), DEFAULT_REGION);
        assert_eq!(resolver.resolve(28.6, f64::INFINITY), DEFAULT_REGION);
    }

    #[test]
    fn test_builtin_table_size() {
        assert_eq!(GeoResolver::india().rules().len(), 42);
    }
}
