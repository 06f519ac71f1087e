//! Dashboard asset selection
//!
//! Two independent classifiers:
//! - **Emblem**: weather condition + temperature + day/night → emblem photo
//! - **Location photo**: location id or name → skyline photo
//!
//! Both are total: an input that matches nothing resolves to the default
//! code. Lookup tables are plain data handed to [`AssetSelector::new`], so
//! callers and tests can substitute their own.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Opaque asset identifier (a file name on the asset CDN)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetCode(String);

impl AssetCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Emblem codes, one per [`EmblemRule`] outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmblemCodes {
    pub heatwave: String,
    pub snow: String,
    pub rain: String,
    pub storm: String,
    pub cloudy: String,
    pub clear_day: String,
    pub clear_night: String,
    pub fallback: String,
}

impl Default for EmblemCodes {
    fn default() -> Self {
        Self {
            heatwave: "heatwave_city_01.jpg".to_string(),
            snow: "snow_city_01.jpg".to_string(),
            rain: "rain_city_01.jpg".to_string(),
            storm: "storm_city_01.jpg".to_string(),
            cloudy: "cloudy_city_01.jpg".to_string(),
            clear_day: "clear_day_city_01.jpg".to_string(),
            clear_night: "clear_night_city_01.jpg".to_string(),
            fallback: "default_city_01.jpg".to_string(),
        }
    }
}

/// Location photo lookup tables
///
/// Name keys are stored trimmed and lowercased.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoTables {
    by_id: HashMap<i64, String>,
    by_name: HashMap<String, String>,
    fallback: String,
}

impl PhotoTables {
    pub fn new(
        by_id: HashMap<i64, String>,
        by_name: HashMap<String, String>,
        fallback: impl Into<String>,
    ) -> Self {
        let by_name = by_name
            .into_iter()
            .map(|(name, code)| (normalize(&name), code))
            .collect();

        Self {
            by_id,
            by_name,
            fallback: fallback.into(),
        }
    }
}

impl Default for PhotoTables {
    fn default() -> Self {
        let cities: [(i64, &str); 4] = [
            (1, "barcelona"),
            (2, "madrid"),
            (3, "paris"),
            (4, "london"),
        ];

        let by_id = cities
            .iter()
            .map(|(id, name)| (*id, format!("{}_skyline_01.jpg", name)))
            .collect();
        let by_name = cities
            .iter()
            .map(|(_, name)| (name.to_string(), format!("{}_skyline_01.jpg", name)))
            .collect();

        Self::new(by_id, by_name, "default_city_01.jpg")
    }
}

/// Inputs to the emblem rules, condition already normalized
#[derive(Debug, Clone, Copy)]
pub struct EmblemInput<'a> {
    pub condition: &'a str,
    pub temp_c: f64,
    pub is_daytime: bool,
}

/// Emblem decision rules, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmblemRule {
    Heatwave,
    Snow,
    Rain,
    Storm,
    Cloudy,
    Clear,
    Fallback,
}

/// Ordered (rule, predicate) list; the first matching predicate wins.
///
/// Conditions overlap in practice ("snow" at 33 °C), so order is meaning.
pub const EMBLEM_RULES: [(EmblemRule, fn(&EmblemInput<'_>) -> bool); 7] = [
    (EmblemRule::Heatwave, is_heatwave),
    (EmblemRule::Snow, is_snow),
    (EmblemRule::Rain, is_rain),
    (EmblemRule::Storm, is_storm),
    (EmblemRule::Cloudy, is_cloudy),
    (EmblemRule::Clear, is_clear),
    (EmblemRule::Fallback, always),
];

const HEATWAVE_MIN_TEMP_C: f64 = 32.0;
const FREEZING_MAX_TEMP_C: f64 = 0.0;

fn is_heatwave(input: &EmblemInput<'_>) -> bool {
    input.temp_c >= HEATWAVE_MIN_TEMP_C
}

fn is_snow(input: &EmblemInput<'_>) -> bool {
    matches!(input.condition, "snow" | "sleet") || input.temp_c <= FREEZING_MAX_TEMP_C
}

fn is_rain(input: &EmblemInput<'_>) -> bool {
    matches!(input.condition, "rain" | "drizzle")
}

fn is_storm(input: &EmblemInput<'_>) -> bool {
    matches!(input.condition, "thunderstorm" | "storm")
}

fn is_cloudy(input: &EmblemInput<'_>) -> bool {
    matches!(
        input.condition,
        "clouds" | "overcast" | "broken clouds" | "scattered clouds"
    )
}

fn is_clear(input: &EmblemInput<'_>) -> bool {
    matches!(input.condition, "clear" | "")
}

fn always(_: &EmblemInput<'_>) -> bool {
    true
}

impl EmblemRule {
    /// Evaluate this rule's predicate alone, ignoring priority
    pub fn matches(self, input: &EmblemInput<'_>) -> bool {
        EMBLEM_RULES
            .iter()
            .find(|(rule, _)| *rule == self)
            .map(|(_, predicate)| predicate(input))
            .unwrap_or(false)
    }
}

/// Asset selector with injected lookup tables
#[derive(Debug, Clone, Default)]
pub struct AssetSelector {
    emblems: EmblemCodes,
    photos: PhotoTables,
}

impl AssetSelector {
    pub fn new(emblems: EmblemCodes, photos: PhotoTables) -> Self {
        Self { emblems, photos }
    }

    /// First emblem rule matching the condition and temperature
    pub fn classify(condition: &str, temp_c: f64, is_daytime: bool) -> EmblemRule {
        let condition = normalize(condition);
        let input = EmblemInput {
            condition: &condition,
            temp_c,
            is_daytime,
        };

        EMBLEM_RULES
            .iter()
            .find(|(_, predicate)| predicate(&input))
            .map(|(rule, _)| *rule)
            .unwrap_or(EmblemRule::Fallback)
    }

    /// Select the weather emblem for the dashboard
    ///
    /// The condition label is matched trimmed and case-insensitively.
    pub fn select_emblem(&self, condition: &str, temp_c: f64, is_daytime: bool) -> AssetCode {
        let codes = &self.emblems;
        let code = match Self::classify(condition, temp_c, is_daytime) {
            EmblemRule::Heatwave => &codes.heatwave,
            EmblemRule::Snow => &codes.snow,
            EmblemRule::Rain => &codes.rain,
            EmblemRule::Storm => &codes.storm,
            EmblemRule::Cloudy => &codes.cloudy,
            EmblemRule::Clear if is_daytime => &codes.clear_day,
            EmblemRule::Clear => &codes.clear_night,
            EmblemRule::Fallback => &codes.fallback,
        };
        AssetCode::new(code.as_str())
    }

    /// Select the location photo
    ///
    /// Exact id match first, then trimmed case-insensitive name match, then
    /// the default photo.
    pub fn select_location_photo(
        &self,
        location_id: Option<i64>,
        location_name: Option<&str>,
    ) -> AssetCode {
        let by_id = location_id.and_then(|id| self.photos.by_id.get(&id));
        let by_name = || {
            location_name
                .map(normalize)
                .filter(|name| !name.is_empty())
                .and_then(|name| self.photos.by_name.get(&name))
        };

        let code = by_id.or_else(by_name).unwrap_or(&self.photos.fallback);
        AssetCode::new(code.as_str())
    }

    /// Join a base URL and an asset code with exactly one `/`
    pub fn asset_url(base_url: &str, code: &AssetCode) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), code.as_str())
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emblem(condition: &str, temp_c: f64, is_daytime: bool) -> String {
        AssetSelector::default()
            .select_emblem(condition, temp_c, is_daytime)
            .to_string()
    }

    #[test]
    fn test_heatwave_wins_over_condition() {
        assert_eq!(emblem("snow", 33.0, true), "heatwave_city_01.jpg");
        assert_eq!(emblem("rain", 32.0, false), "heatwave_city_01.jpg");
    }

    #[test]
    fn test_freezing_temperature_selects_snow() {
        assert_eq!(emblem("clear", 0.0, true), "snow_city_01.jpg");
        assert_eq!(emblem("rain", -4.0, true), "snow_city_01.jpg");
        assert_eq!(emblem("Sleet", 3.0, true), "snow_city_01.jpg");
    }

    #[test]
    fn test_condition_rules() {
        assert_eq!(emblem("drizzle", 12.0, true), "rain_city_01.jpg");
        assert_eq!(emblem("thunderstorm", 20.0, true), "storm_city_01.jpg");
        assert_eq!(emblem("Broken Clouds", 20.0, true), "cloudy_city_01.jpg");
        assert_eq!(emblem("overcast", 20.0, false), "cloudy_city_01.jpg");
    }

    #[test]
    fn test_clear_day_and_night() {
        assert_eq!(emblem("clear", 15.0, true), "clear_day_city_01.jpg");
        assert_eq!(emblem("clear", 15.0, false), "clear_night_city_01.jpg");
        assert_eq!(emblem("", 15.0, false), "clear_night_city_01.jpg");
        assert_eq!(emblem("   ", 15.0, true), "clear_day_city_01.jpg");
    }

    #[test]
    fn test_condition_is_trimmed_and_case_insensitive() {
        assert_eq!(emblem("  RAIN ", 10.0, true), "rain_city_01.jpg");
        assert_eq!(emblem("Clear", 20.0, true), "clear_day_city_01.jpg");
    }

    #[test]
    fn test_unknown_condition_uses_fallback() {
        assert_eq!(emblem("fog", 10.0, true), "default_city_01.jpg");
        assert_eq!(emblem("Parcialmente nublado", 18.3, true), "default_city_01.jpg");
    }

    #[test]
    fn test_rules_evaluated_independently() {
        let input = EmblemInput {
            condition: "snow",
            temp_c: 33.0,
            is_daytime: true,
        };
        assert!(EmblemRule::Heatwave.matches(&input));
        assert!(EmblemRule::Snow.matches(&input));
        assert!(!EmblemRule::Rain.matches(&input));
        assert!(EmblemRule::Fallback.matches(&input));
        assert_eq!(AssetSelector::classify("snow", 33.0, true), EmblemRule::Heatwave);
    }

    #[test]
    fn test_rule_order() {
        let order: Vec<EmblemRule> = EMBLEM_RULES.iter().map(|(rule, _)| *rule).collect();
        assert_eq!(
            order,
            vec![
                EmblemRule::Heatwave,
                EmblemRule::Snow,
                EmblemRule::Rain,
                EmblemRule::Storm,
                EmblemRule::Cloudy,
                EmblemRule::Clear,
                EmblemRule::Fallback,
            ]
        );
    }

    #[test]
    fn test_location_photo_by_id() {
        let selector = AssetSelector::default();
        assert_eq!(
            selector.select_location_photo(Some(2), None).as_str(),
            "madrid_skyline_01.jpg"
        );
        // Id wins over a conflicting name
        assert_eq!(
            selector.select_location_photo(Some(4), Some("paris")).as_str(),
            "london_skyline_01.jpg"
        );
    }

    #[test]
    fn test_location_photo_by_name_case_insensitive() {
        let selector = AssetSelector::default();
        let upper = selector.select_location_photo(None, Some("MADRID"));
        let lower = selector.select_location_photo(None, Some("madrid"));
        assert_eq!(upper, lower);
        assert_eq!(upper.as_str(), "madrid_skyline_01.jpg");
        assert_eq!(
            selector.select_location_photo(Some(99), Some("  Paris ")).as_str(),
            "paris_skyline_01.jpg"
        );
    }

    #[test]
    fn test_location_photo_fallback() {
        let selector = AssetSelector::default();
        assert_eq!(selector.select_location_photo(None, None).as_str(), "default_city_01.jpg");
        assert_eq!(
            selector.select_location_photo(Some(42), Some("Bilbao")).as_str(),
            "default_city_01.jpg"
        );
    }

    #[test]
    fn test_injected_tables() {
        let photos = PhotoTables::new(
            HashMap::from([(7, "sevilla.jpg".to_string())]),
            HashMap::from([("Valencia".to_string(), "valencia.jpg".to_string())]),
            "nowhere.jpg",
        );
        let emblems = EmblemCodes {
            rain: "wet.png".to_string(),
            ..EmblemCodes::default()
        };
        let selector = AssetSelector::new(emblems, photos);

        assert_eq!(selector.select_location_photo(Some(7), None).as_str(), "sevilla.jpg");
        assert_eq!(selector.select_location_photo(None, Some("VALENCIA")).as_str(), "valencia.jpg");
        assert_eq!(selector.select_location_photo(Some(2), None).as_str(), "nowhere.jpg");
        assert_eq!(selector.select_emblem("rain", 10.0, true).as_str(), "wet.png");
    }

    #[test]
    fn test_asset_url_joins_with_single_slash() {
        let code = AssetCode::new("rain_city_01.jpg");
        assert_eq!(
            AssetSelector::asset_url("https://cdn.example.com/emblems/", &code),
            "https://cdn.example.com/emblems/rain_city_01.jpg"
        );
        assert_eq!(
            AssetSelector::asset_url("https://cdn.example.com/emblems", &code),
            "https://cdn.example.com/emblems/rain_city_01.jpg"
        );
    }
}
