use serde::{Deserialize, Serialize};

/// Search filters for the live listing search
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchFilters {
    pub state: Option<String>,
    pub district: Option<String>,
    pub area: Option<String>,
    /// Number of bedrooms
    pub bhk: Option<u32>,
    /// Maximum monthly rent
    pub rpm: Option<u64>,
    /// Accepted occupant types; only forwarded when exactly one is selected
    pub occupant_types: Vec<String>,
}

impl SearchFilters {
    /// Query parameters for `GET /search`, omitting unset filters
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        let text = [
            ("state", &self.state),
            ("district", &self.district),
            ("area", &self.area),
        ];
        for (name, value) in text {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                pairs.push((name, value.to_string()));
            }
        }
        if let Some(bhk) = self.bhk.filter(|b| *b > 0) {
            pairs.push(("bhk", bhk.to_string()));
        }
        if let Some(rpm) = self.rpm.filter(|r| *r > 0) {
            pairs.push(("rpm", rpm.to_string()));
        }
        if let [only] = self.occupant_types.as_slice() {
            pairs.push(("occupantType", only.clone()));
        }
        pairs
    }
}
