//! # Meals
//!
//! Logged meals and the daily dashboard.
//!
//! ## Logging
//! - Nutrient amounts from USDA are per 100g
//! - A serving of `g` grams scales every macro by `g / 100`
//! - Serving unit is always grams, meal type defaults to `other`
//!
//! ## Trends
//! - One bucket per calendar day, oldest first, today last
//! - Meals outside the window are dropped
use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{FdcId, fdc_id, foods::FoodDetails, lenient_f64, parse_date};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    #[default]
    #[serde(other)]
    Other,
}

impl MealType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "breakfast" => Some(Self::Breakfast),
            "lunch" => Some(Self::Lunch),
            "dinner" => Some(Self::Dinner),
            "snack" => Some(Self::Snack),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Snack => "snack",
            Self::Other => "other",
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Meal {
    pub id: u64,
    #[serde(deserialize_with = "fdc_id")]
    pub fdc_id: FdcId,
    pub food_name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub serving_size: f64,
    #[serde(default)]
    pub serving_unit: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub calories: f64,
    #[serde(default)]
    pub protein: Option<f64>,
    #[serde(default)]
    pub carbs: Option<f64>,
    #[serde(default)]
    pub fat: Option<f64>,
    #[serde(default)]
    pub meal_type: Option<MealType>,
    pub logged_date: String,
    #[serde(default)]
    pub logged_at: Option<String>,
}

impl Meal {
    pub fn logged_on(&self) -> Option<NaiveDate> {
        parse_date(&self.logged_date)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewMeal {
    pub fdc_id: FdcId,
    pub food_name: String,
    pub serving_size: f64,
    pub serving_unit: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub meal_type: MealType,
    pub logged_date: NaiveDate,
}

impl NewMeal {
    pub fn from_details(
        details: &FoodDetails,
        grams: f64,
        meal_type: MealType,
        logged_date: NaiveDate,
    ) -> Self {
        let scale = |per_100g: f64| per_100g * grams / 100.0;
        let macros = &details.macronutrients;

        Self {
            fdc_id: details.fdc_id,
            food_name: details.description.clone(),
            serving_size: grams,
            serving_unit: "g".to_string(),
            calories: scale(macros.calories()),
            protein: scale(macros.protein()),
            carbs: scale(macros.carbohydrates()),
            fat: scale(macros.fat()),
            meal_type,
            logged_date,
        }
    }
}

/// Only the fields present are sent, the backend updates just those columns.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct MealUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serving_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serving_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protein: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carbs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<MealType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logged_date: Option<NaiveDate>,
}

impl MealUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct MealQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct MacroTotals {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct DailyTotals {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub meal_count: u32,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct NutritionSummary {
    pub date: String,
    pub totals: DailyTotals,
    #[serde(default)]
    pub goals: Option<MacroTotals>,
    #[serde(default)]
    pub progress: Option<MacroTotals>,
}

impl NutritionSummary {
    pub fn has_goals(&self) -> bool {
        self.goals.is_some_and(|goals| goals.calories > 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub totals: MacroTotals,
}

pub fn daily_trend(meals: &[Meal], today: NaiveDate, days: u32) -> Vec<TrendPoint> {
    let mut by_date: HashMap<NaiveDate, MacroTotals> = HashMap::new();

    for meal in meals {
        let Some(date) = meal.logged_on() else {
            continue;
        };

        let totals = by_date.entry(date).or_default();
        totals.calories += meal.calories;
        totals.protein += meal.protein.unwrap_or_default();
        totals.carbs += meal.carbs.unwrap_or_default();
        totals.fat += meal.fat.unwrap_or_default();
    }

    (0..days as i64)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);

            TrendPoint {
                date,
                totals: by_date.get(&date).copied().unwrap_or_default(),
            }
        })
        .collect()
}
