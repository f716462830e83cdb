//! # Foods
//!
//! USDA FoodData Central entries as the backend simplifies them.
//!
//! ## Search
//! - At most 10 foods per query, Foundation and SR Legacy data types only
//! - Each result carries a preview of energy, protein, carbohydrate and fat
//!
//! ## Details
//! - Macronutrients keyed by `calories`, `protein`, `carbohydrates`, `fat`
//! - Micronutrients are vitamins and minerals, keyed by their USDA name
//! - Everything else lands in `otherNutrients`
//!
//! ## History
//! - Backend keeps the last 50 foods a user opened, returns the latest 20
//! - Opening the same food twice within a day is recorded once
use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{FdcId, fdc_id, lenient_f64, parse_timestamp};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct NutrientAmount {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: f64,
    #[serde(default)]
    pub unit: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FoodSummary {
    #[serde(deserialize_with = "fdc_id")]
    pub fdc_id: FdcId,
    pub description: String,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub brand_owner: Option<String>,
    #[serde(default)]
    pub nutrients: Vec<NutrientAmount>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    #[serde(default)]
    pub foods: Vec<FoodSummary>,
    #[serde(default)]
    pub total_hits: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct Macronutrients {
    pub calories: Option<NutrientAmount>,
    pub protein: Option<NutrientAmount>,
    pub carbohydrates: Option<NutrientAmount>,
    pub fat: Option<NutrientAmount>,
}

impl Macronutrients {
    pub fn calories(&self) -> f64 {
        amount(&self.calories)
    }

    pub fn protein(&self) -> f64 {
        amount(&self.protein)
    }

    pub fn carbohydrates(&self) -> f64 {
        amount(&self.carbohydrates)
    }

    pub fn fat(&self) -> f64 {
        amount(&self.fat)
    }

    /// Percentage of protein, carbohydrates and fat by weight. `None` when all are zero.
    pub fn split(&self) -> Option<MacroSplit> {
        let (protein, carbs, fat) = (self.protein(), self.carbohydrates(), self.fat());
        let total = protein + carbs + fat;

        if total <= 0.0 {
            return None;
        }

        Some(MacroSplit {
            protein: protein / total * 100.0,
            carbs: carbs / total * 100.0,
            fat: fat / total * 100.0,
        })
    }
}

fn amount(nutrient: &Option<NutrientAmount>) -> f64 {
    nutrient.as_ref().map(|n| n.amount).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacroSplit {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FoodDetails {
    #[serde(deserialize_with = "fdc_id")]
    pub fdc_id: FdcId,
    pub description: String,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub brand_owner: Option<String>,
    #[serde(default)]
    pub serving_size: Option<f64>,
    #[serde(default)]
    pub serving_size_unit: Option<String>,
    #[serde(default)]
    pub household_serving_full_text: Option<String>,
    #[serde(default)]
    pub macronutrients: Macronutrients,
    #[serde(default)]
    pub micronutrients: BTreeMap<String, NutrientAmount>,
    #[serde(default)]
    pub other_nutrients: BTreeMap<String, NutrientAmount>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(deserialize_with = "fdc_id")]
    pub fdc_id: FdcId,
    pub food_name: String,
    pub searched_at: String,
    #[serde(default)]
    pub nutrition_data: Option<FoodDetails>,
}

impl HistoryEntry {
    pub fn calories(&self) -> Option<f64> {
        self.nutrition_data
            .as_ref()
            .and_then(|details| details.macronutrients.calories.as_ref())
            .map(|calories| calories.amount)
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewHistoryEntry {
    pub fdc_id: FdcId,
    pub food_name: String,
    pub nutrition_data: FoodDetails,
}

impl From<&FoodDetails> for NewHistoryEntry {
    fn from(details: &FoodDetails) -> Self {
        Self {
            fdc_id: details.fdc_id,
            food_name: details.description.clone(),
            nutrition_data: details.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryStats {
    pub total: usize,
    pub unique_foods: usize,
    pub last_day: usize,
}

impl HistoryStats {
    pub fn from_entries(entries: &[HistoryEntry], now: DateTime<Utc>) -> Self {
        let unique_foods = entries
            .iter()
            .map(|entry| entry.fdc_id)
            .collect::<HashSet<_>>()
            .len();

        let day_ago = now - Duration::hours(24);
        let last_day = entries
            .iter()
            .filter_map(|entry| parse_timestamp(&entry.searched_at))
            .filter(|searched_at| *searched_at > day_ago)
            .count();

        Self {
            total: entries.len(),
            unique_foods,
            last_day,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn nutrient(name: &str, amount: f64, unit: &str) -> Option<NutrientAmount> {
        Some(NutrientAmount {
            name: name.to_string(),
            amount,
            unit: unit.to_string(),
        })
    }

    fn entry(id: FdcId, searched_at: &str) -> HistoryEntry {
        HistoryEntry {
            fdc_id: id,
            food_name: format!("food {id}"),
            searched_at: searched_at.to_string(),
            nutrition_data: None,
        }
    }

    #[test]
    fn test_search_payload() {
        let json = r#"{
            "success": true,
            "totalHits": 2,
            "foods": [
                {"fdcId": 1750340, "description": "Apples, fuji, with skin, raw", "dataType": "Foundation",
                 "brandOwner": null,
                 "nutrients": [{"name": "Energy", "amount": 63, "unit": "KCAL"},
                               {"name": "Protein", "amount": null, "unit": "G"}]},
                {"fdcId": 171688, "description": "Apples, raw, with skin", "dataType": "SR Legacy"}
            ]
        }"#;

        let results: SearchResults = serde_json::from_str(json).unwrap();

        assert_eq!(results.total_hits, 2);
        assert_eq!(results.foods[0].fdc_id, 1750340);
        assert_eq!(results.foods[0].nutrients[0].amount, 63.0);
        assert_eq!(results.foods[0].nutrients[1].amount, 0.0);
        assert!(results.foods[1].nutrients.is_empty());
    }

    #[test]
    fn test_macro_split() {
        let macros = Macronutrients {
            calories: nutrient("Energy", 165.0, "KCAL"),
            protein: nutrient("Protein", 31.0, "G"),
            carbohydrates: None,
            fat: nutrient("Total lipid (fat)", 3.6, "G"),
        };

        let split = macros.split().unwrap();
        assert!((split.protein + split.carbs + split.fat - 100.0).abs() < 1e-9);
        assert_eq!(split.carbs, 0.0);
        assert!(split.protein > 89.0);

        assert_eq!(Macronutrients::default().split(), None);
    }

    #[test]
    fn test_history_stats() {
        let now = Utc.with_ymd_and_hms(2025, 6, 3, 12, 0, 0).unwrap();
        let entries = vec![
            entry(1, "2025-06-03 11:00:00"),
            entry(1, "2025-06-02 13:00:00"),
            entry(2, "2025-06-01 09:00:00"),
            entry(3, "not a date"),
        ];

        let stats = HistoryStats::from_entries(&entries, now);

        assert_eq!(
            stats,
            HistoryStats {
                total: 4,
                unique_foods: 3,
                last_day: 2,
            }
        );
    }

    #[test]
    fn test_history_calories() {
        let json = r#"{"fdcId": "171705", "foodName": "Banana", "searchedAt": "2025-06-03 11:00:00",
            "nutritionData": {"fdcId": 171705, "description": "Banana",
                "macronutrients": {"calories": {"name": "Energy", "amount": 89, "unit": "KCAL"}}}}"#;

        let history: HistoryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(history.calories(), Some(89.0));
        assert_eq!(entry(4, "").calories(), None);
    }
}
