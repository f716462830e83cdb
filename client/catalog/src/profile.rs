use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct VerifiedUser {
    pub id: u64,
    pub firebase_uid: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    WeightLoss,
    MuscleGain,
    Maintenance,
}

impl GoalType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().replace('-', "_").as_str() {
            "weight_loss" | "loss" => Some(Self::WeightLoss),
            "muscle_gain" | "gain" => Some(Self::MuscleGain),
            "maintenance" | "maintain" => Some(Self::Maintenance),
            _ => None,
        }
    }
}

impl Display for GoalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::WeightLoss => "weight_loss",
            Self::MuscleGain => "muscle_gain",
            Self::Maintenance => "maintenance",
        })
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().replace('-', "_").as_str() {
            "sedentary" => Some(Self::Sedentary),
            "light" => Some(Self::Light),
            "moderate" => Some(Self::Moderate),
            "active" => Some(Self::Active),
            "very_active" => Some(Self::VeryActive),
            _ => None,
        }
    }
}

impl Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sedentary => "sedentary",
            Self::Light => "light",
            Self::Moderate => "moderate",
            Self::Active => "active",
            Self::VeryActive => "very_active",
        })
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DietaryGoals {
    pub goal_type: Option<String>,
    #[serde(default)]
    pub target_calories: Option<f64>,
    #[serde(default)]
    pub target_protein: Option<f64>,
    #[serde(default)]
    pub target_carbs: Option<f64>,
    #[serde(default)]
    pub target_fat: Option<f64>,
    #[serde(default)]
    pub current_weight: Option<f64>,
    #[serde(default)]
    pub target_weight: Option<f64>,
    #[serde(default)]
    pub activity_level: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: u64,
    pub firebase_uid: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub activity_level: Option<String>,
    #[serde(default)]
    pub dietary_goal: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub dietary_goals: Option<DietaryGoals>,
}

/// The backend overwrites every column, so absent fields are sent as `null`.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct ProfileUpdate {
    pub age: Option<u32>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub activity_level: Option<String>,
    pub dietary_goal: Option<String>,
}

impl From<&UserProfile> for ProfileUpdate {
    fn from(profile: &UserProfile) -> Self {
        Self {
            age: profile.age,
            weight: profile.weight,
            height: profile.height,
            activity_level: profile.activity_level.clone(),
            dietary_goal: profile.dietary_goal.clone(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GoalsRequest {
    pub goal_type: GoalType,
    pub current_weight: f64,
    pub target_weight: f64,
    pub activity_level: ActivityLevel,
}
