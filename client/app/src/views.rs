//! Plain text renderings of everything the terminal shows.
use std::fmt::{self, Display, Write};

use catalog::{
    foods::{FoodDetails, FoodSummary, HistoryEntry, HistoryStats, NutrientAmount},
    meals::{Meal, NutritionSummary, TrendPoint},
    parse_timestamp,
    profile::UserProfile,
};
use chrono::{DateTime, Local, Utc};
use regex::Regex;

use crate::auth::IdentityUser;

pub const POPULAR_SEARCHES: [(&str, [&str; 4]); 4] = [
    ("Fruits", ["apple", "banana", "orange", "strawberry"]),
    ("Proteins", ["chicken breast", "salmon", "eggs", "tofu"]),
    ("Vegetables", ["spinach", "broccoli", "carrot", "sweet potato"]),
    ("Grains", ["quinoa", "rice", "oats", "bread"]),
];

const DESCRIPTION_WIDTH: usize = 65;
const CHART_LABEL_WIDTH: usize = 15;
const CHART_NUTRIENTS: usize = 8;
const BAR_WIDTH: usize = 20;
const IMPORTANT_NUTRIENTS: [&str; 5] = ["fiber", "sugar", "sodium", "cholesterol", "saturated"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Warning,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Info, message)
    }

    fn new(kind: ToastKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl Display for Toast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            ToastKind::Success => "ok",
            ToastKind::Warning => "warn",
            ToastKind::Error => "error",
            ToastKind::Info => "info",
        };

        write!(f, "[{tag}] {}", self.message)
    }
}

pub fn popular_searches() -> Vec<&'static str> {
    POPULAR_SEARCHES
        .iter()
        .flat_map(|(_, searches)| searches.iter().copied())
        .collect()
}

pub fn quick_search_menu() -> String {
    let mut out = String::from("Popular Searches\n");
    let mut number = 1;

    for (category, searches) in POPULAR_SEARCHES {
        let _ = write!(out, "  {category:<11}");
        for search in searches {
            let _ = write!(out, " {number:>2}) {search:<15}");
            number += 1;
        }
        out.push('\n');
    }

    out
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }

    let cut: String = text.chars().take(width).collect();
    format!("{cut}...")
}

/// Drops the leading qualifier, "Vitamin C, total ascorbic acid" becomes "total ascorbic acid".
pub fn short_label(name: &str) -> String {
    match Regex::new(r"^[^,]+,\s*") {
        Ok(re) => re.replace(name, "").into_owned(),
        Err(_) => name.to_string(),
    }
}

fn preview(food: &FoodSummary, keys: &[&str]) -> String {
    food.nutrients
        .iter()
        .find(|nutrient| {
            let name = nutrient.name.to_lowercase();
            keys.iter().any(|key| name.contains(key))
        })
        .map(|nutrient| format!("{:.0}", nutrient.amount))
        .unwrap_or_else(|| "N/A".to_string())
}

fn amount(nutrient: Option<&NutrientAmount>) -> String {
    match nutrient {
        Some(nutrient) => format!("{:.1} {}", nutrient.amount, nutrient.unit)
            .trim_end()
            .to_string(),
        None => "N/A".to_string(),
    }
}

pub fn food_card(index: usize, food: &FoodSummary) -> String {
    let mut out = format!(
        "{index:>3}. {}",
        truncate(&food.description, DESCRIPTION_WIDTH)
    );

    if let Some(data_type) = &food.data_type {
        let _ = write!(out, " [{data_type}]");
    }

    if let Some(brand) = &food.brand_owner {
        let _ = write!(out, " by {brand}");
    }

    let _ = write!(
        out,
        "\n     {} kcal | P {}g | C {}g | F {}g",
        preview(food, &["energy", "calorie"]),
        preview(food, &["protein"]),
        preview(food, &["carbohydrate"]),
        preview(food, &["fat", "lipid"]),
    );

    out
}

pub fn results_list(query: &str, foods: &[FoodSummary], total_hits: u64) -> String {
    if foods.is_empty() {
        return format!("No foods found for \"{query}\"");
    }

    let mut out = format!(
        "Results for \"{query}\" ({} shown, {total_hits} total)\n",
        foods.len()
    );

    for (i, food) in foods.iter().enumerate() {
        out.push_str(&food_card(i + 1, food));
        out.push('\n');
    }

    out.push_str("Use :detail <n> for nutrition facts or :log <n> <grams> to log a meal");
    out
}

fn bar(percent: f64) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

pub fn food_details(details: &FoodDetails) -> String {
    let macros = &details.macronutrients;
    let mut out = format!("{} (FDC {})\n", details.description, details.fdc_id);

    if let (Some(size), Some(unit)) = (details.serving_size, &details.serving_size_unit) {
        let _ = writeln!(out, "  Standard serving: {size} {unit}");
    }
    if let Some(household) = &details.household_serving_full_text {
        let _ = writeln!(out, "  Household serving: {household}");
    }
    out.push_str("  All values shown are per 100g unless otherwise specified\n\n");

    let _ = writeln!(
        out,
        "  Calories {}  Protein {}  Carbs {}  Fat {}",
        macros
            .calories
            .as_ref()
            .map(|calories| format!("{:.0}", calories.amount))
            .unwrap_or_else(|| "N/A".to_string()),
        amount(macros.protein.as_ref()),
        amount(macros.carbohydrates.as_ref()),
        amount(macros.fat.as_ref()),
    );

    if let Some(split) = macros.split() {
        out.push_str("\n  Macro split\n");
        for (label, percent) in [
            ("Protein", split.protein),
            ("Carbs", split.carbs),
            ("Fat", split.fat),
        ] {
            let _ = writeln!(out, "    {label:<8} {} {percent:>5.1}%", bar(percent));
        }
    }

    out.push_str("\n  Micronutrients\n");
    if details.micronutrients.is_empty() {
        out.push_str("    No micronutrient data available\n");
    }
    for nutrient in details.micronutrients.values().take(CHART_NUTRIENTS) {
        let label: String = short_label(&nutrient.name)
            .chars()
            .take(CHART_LABEL_WIDTH)
            .collect();
        let _ = writeln!(out, "    {label:<15} {:>12}", amount(Some(nutrient)));
    }

    let important: Vec<&NutrientAmount> = details
        .other_nutrients
        .values()
        .filter(|nutrient| {
            let name = nutrient.name.to_lowercase();
            IMPORTANT_NUTRIENTS.iter().any(|key| name.contains(key))
        })
        .take(CHART_NUTRIENTS)
        .collect();

    if !important.is_empty() {
        out.push_str("\n  Additional nutrients\n");
        for nutrient in important {
            let _ = writeln!(
                out,
                "    {:<30} {:>12}",
                short_label(&nutrient.name),
                amount(Some(nutrient))
            );
        }
    }

    out
}

pub fn relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - timestamp).num_minutes();

    match minutes {
        m if m < 1 => "Just now".to_string(),
        m if m < 60 => format!("{m}m ago"),
        m if m < 1440 => format!("{}h ago", m / 60),
        _ => timestamp
            .with_timezone(&Local)
            .format("%b %-d, %H:%M")
            .to_string(),
    }
}

pub fn history_table(history: &[HistoryEntry], now: DateTime<Utc>) -> String {
    if history.is_empty() {
        return "No Search History\nStart searching for foods to see your recent searches here."
            .to_string();
    }

    let mut out = format!("Recent Searches ({})\n", history.len());

    for entry in history {
        let when = parse_timestamp(&entry.searched_at)
            .map(|at| relative_time(at, now))
            .unwrap_or_else(|| entry.searched_at.clone());
        let calories = entry
            .calories()
            .map(|calories| format!("{calories:.0} kcal"))
            .unwrap_or_else(|| "N/A".to_string());

        let _ = write!(
            out,
            "  {:<40} {calories:>10}  {when}",
            truncate(&entry.food_name, 37)
        );

        if let Some(details) = &entry.nutrition_data {
            let macros = &details.macronutrients;
            let _ = write!(
                out,
                "  P: {:.0}g C: {:.0}g F: {:.0}g",
                macros.protein(),
                macros.carbohydrates(),
                macros.fat()
            );
        }

        let _ = writeln!(out, "  (FDC {})", entry.fdc_id);
    }

    out
}

pub fn history_stats(stats: &HistoryStats) -> String {
    format!(
        "Your Nutrition Journey\n  Total Searches   {:>6}  Food items explored\n  Unique Foods     {:>6}  Different food types\n  Recent Activity  {:>6}  Searches in last 24h\n  Database Access  {:>6}  USDA food entries available",
        stats.total, stats.unique_foods, stats.last_day, "500K+"
    )
}

fn optional(value: Option<f64>, suffix: &str) -> String {
    value
        .map(|value| format!("{value:.0}{suffix}"))
        .unwrap_or_else(|| "-".to_string())
}

pub fn meal_table(meals: &[Meal]) -> String {
    if meals.is_empty() {
        return "No meals logged for this period".to_string();
    }

    let mut out = format!(
        "{:>6}  {:<10}  {:<9}  {:<32} {:>9} {:>8}  {}\n",
        "id", "date", "meal", "food", "serving", "kcal", "P / C / F"
    );

    for meal in meals {
        let _ = writeln!(
            out,
            "{:>6}  {:<10}  {:<9}  {:<32} {:>9} {:>8.0}  {} / {} / {}",
            meal.id,
            meal.logged_date,
            meal.meal_type.unwrap_or_default().as_str(),
            truncate(&meal.food_name, 29),
            format!("{}{}", meal.serving_size, meal.serving_unit),
            meal.calories,
            optional(meal.protein, "g"),
            optional(meal.carbs, "g"),
            optional(meal.fat, "g"),
        );
    }

    let calories: f64 = meals.iter().map(|meal| meal.calories).sum();
    let _ = write!(out, "{} meals, {calories:.0} kcal", meals.len());

    out
}

pub fn progress(current: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 0.0;
    }

    (current / target * 100.0).min(100.0)
}

pub fn summary_panel(summary: &NutritionSummary) -> String {
    let totals = &summary.totals;
    let mut out = format!(
        "Today's Nutrition ({})\n  {} meals logged\n",
        summary.date, totals.meal_count
    );

    let rows = [
        ("Calories", totals.calories, summary.goals.map(|goals| goals.calories), ""),
        ("Protein", totals.protein, summary.goals.map(|goals| goals.protein), "g"),
        ("Carbs", totals.carbs, summary.goals.map(|goals| goals.carbs), "g"),
        ("Fat", totals.fat, summary.goals.map(|goals| goals.fat), "g"),
    ];

    for (label, current, target, unit) in rows {
        match target.filter(|_| summary.has_goals()) {
            Some(target) => {
                let percent = progress(current, target);
                let _ = writeln!(
                    out,
                    "  {label:<9} {current:>7.0}{unit} / {target:.0}{unit}  {} {percent:>3.0}%",
                    bar(percent)
                );
            }
            None => {
                let _ = writeln!(out, "  {label:<9} {current:>7.0}{unit}");
            }
        }
    }

    if !summary.has_goals() {
        out.push_str("  Set your goals with :goals to track progress\n");
    }

    out
}

pub fn trend_table(points: &[TrendPoint]) -> String {
    let mut out = format!(
        "{:<8} {:>8} {:>9} {:>8} {:>7}\n",
        "day", "kcal", "protein", "carbs", "fat"
    );

    for point in points {
        let totals = &point.totals;
        let _ = writeln!(
            out,
            "{:<8} {:>8.0} {:>8.0}g {:>7.0}g {:>6.0}g",
            point.date.format("%b %-d").to_string(),
            totals.calories,
            totals.protein,
            totals.carbs,
            totals.fat
        );
    }

    let logged = points
        .iter()
        .filter(|point| point.totals.calories > 0.0)
        .count();
    if logged > 0 {
        let average =
            points.iter().map(|point| point.totals.calories).sum::<f64>() / logged as f64;
        let _ = write!(out, "Average {average:.0} kcal over {logged} logged days");
    } else {
        out.push_str("No meals logged in this range");
    }

    out
}

pub fn profile_panel(user: Option<&IdentityUser>, profile: Option<&UserProfile>) -> String {
    let Some(user) = user else {
        return "Not signed in. Use :login or :signup".to_string();
    };

    let mut out = match &user.display_name {
        Some(name) => format!("{name} <{}>\n", user.email),
        None => format!("{}\n", user.email),
    };

    let Some(profile) = profile else {
        out.push_str("  Profile not loaded yet\n");
        return out;
    };

    let text = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    let _ = writeln!(
        out,
        "  Age {}  Weight {}  Height {}",
        profile
            .age
            .map(|age| age.to_string())
            .unwrap_or_else(|| "-".to_string()),
        optional(profile.weight, "kg"),
        optional(profile.height, "cm"),
    );
    let _ = writeln!(
        out,
        "  Activity {}  Goal {}",
        text(&profile.activity_level),
        text(&profile.dietary_goal)
    );

    if let Some(goals) = &profile.dietary_goals {
        let _ = writeln!(
            out,
            "  Daily targets: {} kcal | P {} | C {} | F {}",
            optional(goals.target_calories, ""),
            optional(goals.target_protein, "g"),
            optional(goals.target_carbs, "g"),
            optional(goals.target_fat, "g"),
        );
    }

    out
}

pub fn status_banner(api_url: &str, healthy: Result<&str, &str>) -> String {
    match healthy {
        Ok(message) => format!("NutriVault connected to {api_url}: {message}"),
        Err(reason) => format!("NutriVault could not reach {api_url}: {reason}"),
    }
}

pub fn help() -> &'static str {
    "Type to search (1s debounce, 3+ characters), an empty line clears\n\
     !<text>                       search now\n\
     :quick [n]                    popular searches\n\
     :detail <n>                   nutrition facts for result n\n\
     :log <n> <grams> [meal] [date] log result n (breakfast, lunch, dinner, snack, other)\n\
     :meals [days]                 logged meals\n\
     :edit <id> key=value...       update a meal (serving_size, calories, protein, carbs, fat, meal_type, logged_date)\n\
     :delete <id>...               delete meals\n\
     :summary [date]               daily dashboard\n\
     :trends [7|30]                daily totals\n\
     :export [days]                PDF report\n\
     :history | :stats             search history\n\
     :login | :signup | :logout | :reset\n\
     :profile [set key=value...]   view or update profile\n\
     :goals <type> <current> <target> <activity>\n\
     :health | :help | :quit"
}
