use std::{cmp::Ordering, io::Write};

use catalog::{
    foods::{HistoryStats, NewHistoryEntry},
    meals::{Meal, MealQuery, MealType, MealUpdate, NewMeal, daily_trend},
    profile::{ActivityLevel, GoalType, GoalsRequest, ProfileUpdate},
};
use chrono::{NaiveDate, Utc};
use tracing::warn;

use crate::{
    auth::AuthError,
    error::AppError,
    screen::Screen,
    search::SearchCoordinator,
    state::{FoodSearch, State},
    utils::{parse_amount, parse_day, parse_number, parse_pairs, report_path, today},
    views::{self, Toast},
};

pub type Coordinator<W> = SearchCoordinator<FoodSearch, Screen<W>>;

pub const DEFAULT_MEAL_DAYS: u32 = 30;
pub const DEFAULT_TREND_DAYS: u32 = 7;
pub const DEFAULT_EXPORT_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MealFilter {
    pub meal_type: Option<MealType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub text: Option<String>,
}

impl MealFilter {
    pub fn matches(&self, meal: &Meal) -> bool {
        if self
            .meal_type
            .is_some_and(|meal_type| meal.meal_type.unwrap_or_default() != meal_type)
        {
            return false;
        }

        let logged = meal.logged_on();
        if self.from.is_some_and(|from| logged.is_some_and(|day| day < from)) {
            return false;
        }
        if self.to.is_some_and(|to| logged.is_some_and(|day| day > to)) {
            return false;
        }

        match &self.text {
            Some(text) => meal.food_name.to_lowercase().contains(&text.to_lowercase()),
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfileChanges {
    pub age: Option<u32>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub activity_level: Option<ActivityLevel>,
    pub dietary_goal: Option<GoalType>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Input(String),
    Submit(Option<String>),
    Clear,
    Quick(Option<usize>),
    Detail(usize),
    Log {
        number: usize,
        grams: f64,
        meal_type: MealType,
        date: Option<NaiveDate>,
    },
    Meals {
        days: u32,
        filter: MealFilter,
    },
    Edit {
        id: u64,
        update: MealUpdate,
    },
    Delete(Vec<u64>),
    Summary(Option<NaiveDate>),
    Trends(u32),
    Export(u32),
    History,
    Stats,
    Login {
        email: String,
        password: String,
    },
    Signup {
        email: String,
        password: String,
        display_name: Option<String>,
    },
    Logout,
    Reset(String),
    Profile,
    ProfileSet(ProfileChanges),
    Goals(GoalsRequest),
    Health,
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

fn positive<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let value: T = parse_number(key, raw)?;
    match value.partial_cmp(&T::default()) {
        Some(Ordering::Greater) => Ok(value),
        _ => Err(AppError::usage(format!("{key} must be greater than zero"))),
    }
}

fn positive_amount(key: &str, raw: &str) -> Result<f64, AppError> {
    let value = parse_amount(key, raw)?;
    if value <= 0.0 {
        return Err(AppError::usage(format!("{key} must be greater than zero")));
    }

    Ok(value)
}

fn optional_days(args: &[&str], default: u32) -> Result<u32, AppError> {
    args.first()
        .map(|raw| positive("days", raw))
        .transpose()
        .map(|days| days.unwrap_or(default))
}

fn meal_type(raw: &str) -> Result<MealType, AppError> {
    MealType::parse(raw).ok_or_else(|| {
        AppError::usage(format!(
            "Unknown meal type {raw}, use breakfast, lunch, dinner, snack or other"
        ))
    })
}

fn activity(raw: &str) -> Result<ActivityLevel, AppError> {
    ActivityLevel::parse(raw).ok_or_else(|| {
        AppError::usage(format!(
            "Unknown activity level {raw}, use sedentary, light, moderate, active or very_active"
        ))
    })
}

fn goal(raw: &str) -> Result<GoalType, AppError> {
    GoalType::parse(raw).ok_or_else(|| {
        AppError::usage(format!(
            "Unknown goal {raw}, use weight_loss, muscle_gain or maintenance"
        ))
    })
}

fn meal_update(pairs: Vec<(String, String)>) -> Result<MealUpdate, AppError> {
    let mut update = MealUpdate::default();

    for (key, value) in pairs {
        match key.as_str() {
            "serving_size" | "grams" => update.serving_size = Some(positive_amount(&key, &value)?),
            "serving_unit" | "unit" => update.serving_unit = Some(value),
            "calories" => update.calories = Some(parse_amount(&key, &value)?),
            "protein" => update.protein = Some(parse_amount(&key, &value)?),
            "carbs" => update.carbs = Some(parse_amount(&key, &value)?),
            "fat" => update.fat = Some(parse_amount(&key, &value)?),
            "meal_type" | "type" => update.meal_type = Some(meal_type(&value)?),
            "logged_date" | "date" => update.logged_date = Some(parse_day(&value)?),
            _ => return Err(AppError::usage(format!("Cannot edit {key}"))),
        }
    }

    if update.is_empty() {
        return Err(AppError::usage("Nothing to update"));
    }

    Ok(update)
}

fn meal_filter(pairs: Vec<(String, String)>) -> Result<MealFilter, AppError> {
    let mut filter = MealFilter::default();

    for (key, value) in pairs {
        match key.as_str() {
            "type" | "meal_type" => filter.meal_type = Some(meal_type(&value)?),
            "from" => filter.from = Some(parse_day(&value)?),
            "to" => filter.to = Some(parse_day(&value)?),
            "q" | "food" => filter.text = Some(value),
            _ => return Err(AppError::usage(format!("Unknown meal filter {key}"))),
        }
    }

    Ok(filter)
}

fn profile_changes(pairs: Vec<(String, String)>) -> Result<ProfileChanges, AppError> {
    let mut changes = ProfileChanges::default();

    for (key, value) in pairs {
        match key.as_str() {
            "age" => changes.age = Some(positive(&key, &value)?),
            "weight" => changes.weight = Some(positive_amount(&key, &value)?),
            "height" => changes.height = Some(positive_amount(&key, &value)?),
            "activity" | "activity_level" => changes.activity_level = Some(activity(&value)?),
            "goal" | "dietary_goal" => changes.dietary_goal = Some(goal(&value)?),
            _ => return Err(AppError::usage(format!("Unknown profile field {key}"))),
        }
    }

    if changes == ProfileChanges::default() {
        return Err(AppError::usage(
            "Usage: :profile set age=30 weight=70 height=175 activity=moderate goal=maintenance",
        ));
    }

    Ok(changes)
}

pub fn parse(line: &str) -> Result<Command, AppError> {
    if line.trim().is_empty() {
        return Ok(Command::Clear);
    }

    if let Some(text) = line.strip_prefix('!') {
        return Ok(Command::Submit(
            Some(text.trim())
                .filter(|text| !text.is_empty())
                .map(str::to_string),
        ));
    }

    let Some(command) = line.trim().strip_prefix(':') else {
        return Ok(Command::Input(line.to_string()));
    };

    let mut words = command.split_whitespace();
    let name = words.next().unwrap_or_default().to_lowercase();
    let args: Vec<&str> = words.collect();

    let command = match (name.as_str(), args.as_slice()) {
        ("quick" | "q", []) => Command::Quick(None),
        ("quick" | "q", [n]) => Command::Quick(Some(positive("number", n)?)),
        ("detail" | "d", [n]) => Command::Detail(positive("number", n)?),
        ("log", [n, grams, rest @ ..]) if rest.len() <= 2 => Command::Log {
            number: positive("number", n)?,
            grams: positive_amount("grams", grams)?,
            meal_type: rest
                .first()
                .map(|raw| meal_type(raw))
                .transpose()?
                .unwrap_or_default(),
            date: rest.get(1).map(|raw| parse_day(raw)).transpose()?,
        },
        ("meals", []) => Command::Meals {
            days: DEFAULT_MEAL_DAYS,
            filter: MealFilter::default(),
        },
        ("meals", [first, rest @ ..]) => {
            let (days, pairs) = if first.contains('=') {
                (DEFAULT_MEAL_DAYS, args.as_slice())
            } else {
                (positive("days", first)?, rest)
            };

            Command::Meals {
                days,
                filter: meal_filter(parse_pairs(pairs)?)?,
            }
        }
        ("edit", [id, pairs @ ..]) if !pairs.is_empty() => Command::Edit {
            id: parse_number("meal id", id)?,
            update: meal_update(parse_pairs(pairs)?)?,
        },
        ("delete", ids) if !ids.is_empty() => Command::Delete(
            ids.iter()
                .map(|id| parse_number("meal id", id))
                .collect::<Result<Vec<u64>, AppError>>()?,
        ),
        ("summary", []) => Command::Summary(None),
        ("summary", [date]) => Command::Summary(Some(parse_day(date)?)),
        ("trends", []) => Command::Trends(DEFAULT_TREND_DAYS),
        ("trends", ["7"]) => Command::Trends(7),
        ("trends", ["30"]) => Command::Trends(30),
        ("export", days) if days.len() <= 1 => {
            Command::Export(optional_days(days, DEFAULT_EXPORT_DAYS)?)
        }
        ("history", []) => Command::History,
        ("stats", []) => Command::Stats,
        ("login", [email, password]) => Command::Login {
            email: email.to_string(),
            password: password.to_string(),
        },
        ("signup", [email, password, name @ ..]) => Command::Signup {
            email: email.to_string(),
            password: password.to_string(),
            display_name: Some(name.join(" ")).filter(|name| !name.is_empty()),
        },
        ("logout", []) => Command::Logout,
        ("reset", [email]) => Command::Reset(email.to_string()),
        ("profile", []) => Command::Profile,
        ("profile", ["set", pairs @ ..]) => {
            Command::ProfileSet(profile_changes(parse_pairs(pairs)?)?)
        }
        ("goals", [goal_type, current, target, level]) => Command::Goals(GoalsRequest {
            goal_type: goal(goal_type)?,
            current_weight: positive_amount("current weight", current)?,
            target_weight: positive_amount("target weight", target)?,
            activity_level: activity(level)?,
        }),
        ("health", []) => Command::Health,
        ("help" | "h" | "?", _) => Command::Help,
        ("quit" | "exit", []) => Command::Quit,
        _ => return Err(AppError::usage(usage(&name))),
    };

    Ok(command)
}

fn usage(name: &str) -> String {
    let hint = match name {
        "quick" | "q" => ":quick [n]",
        "detail" | "d" => ":detail <n>",
        "log" => ":log <n> <grams> [meal_type] [date]",
        "meals" => ":meals [days] [type=lunch] [from=YYYY-MM-DD] [to=YYYY-MM-DD] [q=text]",
        "edit" => ":edit <id> key=value...",
        "delete" => ":delete <id>...",
        "summary" => ":summary [date]",
        "trends" => ":trends [7|30]",
        "export" => ":export [days]",
        "login" => ":login <email> <password>",
        "signup" => ":signup <email> <password> [display name]",
        "reset" => ":reset <email>",
        "profile" => ":profile [set key=value...]",
        "goals" => ":goals <goal_type> <current_weight> <target_weight> <activity_level>",
        _ => return format!("Unknown command :{name}, try :help"),
    };

    format!("Usage: {hint}")
}

pub async fn handle<W: Write>(
    state: &State,
    coordinator: &mut Coordinator<W>,
    command: Command,
) -> Result<Flow, AppError> {
    match command {
        Command::Input(text) => coordinator.input(&text),
        Command::Submit(text) => {
            if let Some(text) = text {
                coordinator.input(&text);
            }
            coordinator.submit();
        }
        Command::Clear => coordinator.clear(),
        Command::Quick(None) => coordinator.consumer_mut().show(&views::quick_search_menu()),
        Command::Quick(Some(number)) => {
            let search = views::popular_searches()
                .get(number - 1)
                .copied()
                .ok_or_else(|| AppError::usage(format!("No popular search #{number}")))?;

            coordinator.input(search);
            coordinator.submit();
        }
        Command::Detail(number) => detail(state, coordinator.consumer_mut(), number).await?,
        Command::Log {
            number,
            grams,
            meal_type,
            date,
        } => {
            log_meal(
                state,
                coordinator.consumer_mut(),
                number,
                grams,
                meal_type,
                date,
            )
            .await?
        }
        Command::Meals { days, filter } => {
            let token = signed_in(state, "view your meals").await?;
            let meals: Vec<Meal> = state
                .api
                .meals(&token, &MealQuery {
                    date: None,
                    days: Some(days),
                })
                .await?
                .into_iter()
                .filter(|meal| filter.matches(meal))
                .collect();

            coordinator.consumer_mut().show(&views::meal_table(&meals));
        }
        Command::Edit { id, update } => {
            let token = signed_in(state, "edit meals").await?;
            state.api.update_meal(&token, id, &update).await?;

            coordinator
                .consumer_mut()
                .toast(Toast::success(format!("Meal #{id} updated successfully")));
        }
        Command::Delete(ids) => {
            let token = signed_in(state, "delete meals").await?;

            for id in ids {
                state.api.delete_meal(&token, id).await?;
                coordinator
                    .consumer_mut()
                    .toast(Toast::success(format!("Meal #{id} deleted")));
            }
        }
        Command::Summary(date) => {
            let token = signed_in(state, "view your dashboard").await?;
            let summary = state.api.nutrition_summary(&token, date).await?;

            coordinator
                .consumer_mut()
                .show(&views::summary_panel(&summary));
        }
        Command::Trends(days) => {
            let token = signed_in(state, "view your trends").await?;
            let meals = state
                .api
                .meals(&token, &MealQuery {
                    date: None,
                    days: Some(days),
                })
                .await?;

            let points = daily_trend(&meals, today(), days);
            coordinator.consumer_mut().show(&views::trend_table(&points));
        }
        Command::Export(days) => export(state, coordinator.consumer_mut(), days).await?,
        Command::History => {
            signed_in(state, "view your history").await?;
            let screen = coordinator.consumer_mut();

            load_history(state, screen).await;
            let table = views::history_table(screen.history(), Utc::now());
            screen.show(&table);
        }
        Command::Stats => {
            let screen = coordinator.consumer_mut();
            let stats = HistoryStats::from_entries(screen.history(), Utc::now());

            screen.show(&views::history_stats(&stats));
        }
        Command::Login { email, password } => {
            let user = state.auth.login(&email, &password).await?;
            let screen = coordinator.consumer_mut();

            screen.toast(Toast::success(format!(
                "Welcome back, {}",
                user.display_name.as_deref().unwrap_or(&user.email)
            )));
            load_history(state, screen).await;
        }
        Command::Signup {
            email,
            password,
            display_name,
        } => {
            let user = state
                .auth
                .signup(&email, &password, display_name.as_deref())
                .await?;

            coordinator
                .consumer_mut()
                .toast(Toast::success(format!("Account created for {}", user.email)));
        }
        Command::Logout => {
            state.auth.logout().await;
            let screen = coordinator.consumer_mut();

            screen.set_history(Vec::new());
            screen.toast(Toast::info("Signed out"));
        }
        Command::Reset(email) => {
            state.auth.reset_password(&email).await?;

            coordinator
                .consumer_mut()
                .toast(Toast::info(format!("Password reset email sent to {email}")));
        }
        Command::Profile => {
            if state.auth.is_signed_in().await {
                if let Err(e) = state.auth.refresh_user_profile().await {
                    warn!("Error refreshing user profile: {e}");
                }
            }

            let panel = views::profile_panel(
                state.auth.user().await.as_ref(),
                state.auth.profile().await.as_ref(),
            );
            coordinator.consumer_mut().show(&panel);
        }
        Command::ProfileSet(changes) => {
            update_profile(state, coordinator.consumer_mut(), changes).await?
        }
        Command::Goals(request) => {
            let token = signed_in(state, "set your goals").await?;
            let goals = state.api.set_dietary_goals(&token, &request).await?;

            if let Err(e) = state.auth.refresh_user_profile().await {
                warn!("Error refreshing user profile: {e}");
            }

            coordinator.consumer_mut().toast(Toast::success(format!(
                "Goals set: {:.0} kcal, {:.0}g protein, {:.0}g carbs, {:.0}g fat per day",
                goals.target_calories.unwrap_or_default(),
                goals.target_protein.unwrap_or_default(),
                goals.target_carbs.unwrap_or_default(),
                goals.target_fat.unwrap_or_default(),
            )));
        }
        Command::Health => {
            let banner = match state.api.health().await {
                Ok(health) => views::status_banner(state.api.base_url(), Ok(health.message.as_str())),
                Err(e) => views::status_banner(state.api.base_url(), Err(e.to_string().as_str())),
            };

            coordinator.consumer_mut().show(&banner);
        }
        Command::Help => coordinator.consumer_mut().show(views::help()),
        Command::Quit => return Ok(Flow::Quit),
    }

    Ok(Flow::Continue)
}

async fn signed_in(state: &State, action: &'static str) -> Result<String, AppError> {
    state.auth.require_token().await.map_err(|e| match e {
        AuthError::SignedOut => AppError::SignInRequired(action),
        e => e.into(),
    })
}

/// Refreshes the cached history, failures only logged.
pub async fn load_history<W: Write>(state: &State, screen: &mut Screen<W>) {
    let bearer = match state.auth.id_token().await {
        Ok(Some(token)) => token,
        Ok(None) => return,
        Err(e) => {
            warn!("Failed to load search history: {e}");
            return;
        }
    };

    match state.api.history(Some(&bearer)).await {
        Ok(history) => screen.set_history(history),
        Err(e) => warn!("Failed to load search history: {e}"),
    }
}

async fn detail<W: Write>(
    state: &State,
    screen: &mut Screen<W>,
    number: usize,
) -> Result<(), AppError> {
    let food = screen
        .result(number)
        .cloned()
        .ok_or_else(|| AppError::usage(format!("No result #{number}, search first")))?;
    let bearer = state.auth.id_token().await?;

    screen.start_spinner(format!("Loading {}...", food.description));
    let details = state
        .api
        .food_details(food.fdc_id, bearer.as_deref())
        .await;
    screen.stop_spinner();
    let details = details?;

    screen.show(&views::food_details(&details));
    screen.toast(Toast::success(format!(
        "Loaded nutrition data for {}",
        food.description
    )));

    if let Some(token) = bearer {
        match state
            .api
            .add_to_history(Some(&token), &NewHistoryEntry::from(&details))
            .await
        {
            Ok(()) => load_history(state, screen).await,
            Err(e) => warn!("Failed to record {} in history: {e}", food.fdc_id),
        }
    }

    Ok(())
}

async fn log_meal<W: Write>(
    state: &State,
    screen: &mut Screen<W>,
    number: usize,
    grams: f64,
    meal_type: MealType,
    date: Option<NaiveDate>,
) -> Result<(), AppError> {
    let token = signed_in(state, "log meals").await?;
    let food = screen
        .result(number)
        .cloned()
        .ok_or_else(|| AppError::usage(format!("No result #{number}, search first")))?;

    let details = state.api.food_details(food.fdc_id, Some(&token)).await?;
    let meal = NewMeal::from_details(&details, grams, meal_type, date.unwrap_or_else(today));
    let meal_id = state.api.log_meal(&token, &meal).await?;

    screen.toast(Toast::success(format!(
        "Logged {grams}g of {} as {} on {} ({:.0} kcal, meal #{meal_id})",
        meal.food_name,
        meal.meal_type.as_str(),
        meal.logged_date,
        meal.calories
    )));

    Ok(())
}

async fn export<W: Write>(
    state: &State,
    screen: &mut Screen<W>,
    days: u32,
) -> Result<(), AppError> {
    let token = signed_in(state, "export reports").await?;

    screen.start_spinner(format!("Generating PDF report for the last {days} days..."));
    let report = state.api.export_pdf(&token, days).await;
    screen.stop_spinner();
    let report = report?;

    let path = report_path(&state.config.export_dir, &report.filename);
    tokio::fs::write(&path, &report.bytes).await?;

    screen.toast(Toast::success(format!(
        "PDF report downloaded successfully! Saved to {}",
        path.display()
    )));

    Ok(())
}

async fn update_profile<W: Write>(
    state: &State,
    screen: &mut Screen<W>,
    changes: ProfileChanges,
) -> Result<(), AppError> {
    let token = signed_in(state, "update your profile").await?;

    let current = match state.auth.profile().await {
        Some(profile) => profile,
        None => state
            .auth
            .refresh_user_profile()
            .await?
            .ok_or(AppError::SignInRequired("update your profile"))?,
    };

    let mut update = ProfileUpdate::from(&current);
    update.age = changes.age.or(update.age);
    update.weight = changes.weight.or(update.weight);
    update.height = changes.height.or(update.height);
    if let Some(level) = changes.activity_level {
        update.activity_level = Some(level.to_string());
    }
    if let Some(goal) = changes.dietary_goal {
        update.dietary_goal = Some(goal.to_string());
    }

    state.api.update_user_profile(&token, &update).await?;

    let message = match update.weight {
        Some(weight) => {
            let goals = GoalsRequest {
                goal_type: update
                    .dietary_goal
                    .as_deref()
                    .and_then(GoalType::parse)
                    .unwrap_or(GoalType::Maintenance),
                current_weight: weight,
                target_weight: weight,
                activity_level: update
                    .activity_level
                    .as_deref()
                    .and_then(ActivityLevel::parse)
                    .unwrap_or(ActivityLevel::Moderate),
            };
            state.api.set_dietary_goals(&token, &goals).await?;

            "Profile and goals updated successfully!"
        }
        None => "Profile updated successfully!",
    };

    if let Err(e) = state.auth.refresh_user_profile().await {
        warn!("Error refreshing user profile: {e}");
    }
    screen.toast(Toast::success(message));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_search_field_lines() {
        assert_eq!(parse("").unwrap(), Command::Clear);
        assert_eq!(parse("   ").unwrap(), Command::Clear);
        assert_eq!(parse("app").unwrap(), Command::Input("app".to_string()));
        assert_eq!(
            parse(" apple ").unwrap(),
            Command::Input(" apple ".to_string())
        );
        assert_eq!(
            parse("!greek yogurt").unwrap(),
            Command::Submit(Some("greek yogurt".to_string()))
        );
        assert_eq!(parse("!").unwrap(), Command::Submit(None));
    }

    #[test]
    fn test_browse_commands() {
        assert_eq!(parse(":quick").unwrap(), Command::Quick(None));
        assert_eq!(parse(":quick 3").unwrap(), Command::Quick(Some(3)));
        assert_eq!(parse(":detail 2").unwrap(), Command::Detail(2));
        assert!(parse(":detail 0").is_err());
        assert_eq!(parse(":history").unwrap(), Command::History);
        assert_eq!(parse(":stats").unwrap(), Command::Stats);
        assert_eq!(parse(":health").unwrap(), Command::Health);
        assert_eq!(parse(":help").unwrap(), Command::Help);
        assert_eq!(parse(":quit").unwrap(), Command::Quit);
    }

    #[test]
    fn test_log_command() {
        assert_eq!(
            parse(":log 1 150").unwrap(),
            Command::Log {
                number: 1,
                grams: 150.0,
                meal_type: MealType::Other,
                date: None,
            }
        );
        assert_eq!(
            parse(":log 2 80.5 breakfast 2025-06-03").unwrap(),
            Command::Log {
                number: 2,
                grams: 80.5,
                meal_type: MealType::Breakfast,
                date: Some(day(2025, 6, 3)),
            }
        );
        assert!(parse(":log 1 -5").is_err());
        assert!(parse(":log 1 nan").is_err());
        assert!(parse(":log 1 inf lunch").is_err());
        assert!(parse(":log 1 100 brunch").is_err());
        assert!(parse(":log 1").is_err());
    }

    #[test]
    fn test_meal_commands() {
        assert_eq!(
            parse(":meals").unwrap(),
            Command::Meals {
                days: DEFAULT_MEAL_DAYS,
                filter: MealFilter::default(),
            }
        );

        let Command::Meals { days, filter } = parse(":meals 7 type=lunch q=rice").unwrap() else {
            panic!("expected meals");
        };
        assert_eq!(days, 7);
        assert_eq!(filter.meal_type, Some(MealType::Lunch));
        assert_eq!(filter.text.as_deref(), Some("rice"));

        let Command::Meals { days, filter } = parse(":meals from=2025-06-01").unwrap() else {
            panic!("expected meals");
        };
        assert_eq!(days, DEFAULT_MEAL_DAYS);
        assert_eq!(filter.from, Some(day(2025, 6, 1)));

        let Command::Edit { id, update } = parse(":edit 12 serving_size=200 meal_type=dinner").unwrap()
        else {
            panic!("expected edit");
        };
        assert_eq!(id, 12);
        assert_eq!(update.serving_size, Some(200.0));
        assert_eq!(update.meal_type, Some(MealType::Dinner));
        assert!(parse(":edit 12").is_err());
        assert!(parse(":edit 12 color=blue").is_err());
        assert!(parse(":edit 12 calories=inf").is_err());

        assert_eq!(parse(":delete 4 5").unwrap(), Command::Delete(vec![4, 5]));
        assert!(parse(":delete").is_err());
    }

    #[test]
    fn test_dashboard_commands() {
        assert_eq!(parse(":summary").unwrap(), Command::Summary(None));
        assert_eq!(
            parse(":summary 2025-06-03").unwrap(),
            Command::Summary(Some(day(2025, 6, 3)))
        );
        assert_eq!(parse(":trends").unwrap(), Command::Trends(7));
        assert_eq!(parse(":trends 30").unwrap(), Command::Trends(30));
        assert!(parse(":trends 14").is_err());
        assert_eq!(parse(":export").unwrap(), Command::Export(DEFAULT_EXPORT_DAYS));
        assert_eq!(parse(":export 30").unwrap(), Command::Export(30));
    }

    #[test]
    fn test_identity_commands() {
        assert_eq!(
            parse(":login a@b.c hunter22").unwrap(),
            Command::Login {
                email: "a@b.c".to_string(),
                password: "hunter22".to_string(),
            }
        );
        assert_eq!(
            parse(":signup a@b.c hunter22 Ada Lovelace").unwrap(),
            Command::Signup {
                email: "a@b.c".to_string(),
                password: "hunter22".to_string(),
                display_name: Some("Ada Lovelace".to_string()),
            }
        );
        assert_eq!(parse(":logout").unwrap(), Command::Logout);
        assert_eq!(
            parse(":reset a@b.c").unwrap(),
            Command::Reset("a@b.c".to_string())
        );
        assert!(parse(":login a@b.c").is_err());
    }

    #[test]
    fn test_profile_commands() {
        assert_eq!(parse(":profile").unwrap(), Command::Profile);
        assert_eq!(
            parse(":profile set weight=72.5 activity=very-active goal=loss").unwrap(),
            Command::ProfileSet(ProfileChanges {
                weight: Some(72.5),
                activity_level: Some(ActivityLevel::VeryActive),
                dietary_goal: Some(GoalType::WeightLoss),
                ..Default::default()
            })
        );
        assert!(parse(":profile set").is_err());
        assert!(parse(":profile set weight=nan").is_err());
        assert!(parse(":goals maintenance inf 70 active").is_err());
        assert!(parse(":goals maintenance 70 NaN active").is_err());
        assert_eq!(
            parse(":goals muscle_gain 70 75 active").unwrap(),
            Command::Goals(GoalsRequest {
                goal_type: GoalType::MuscleGain,
                current_weight: 70.0,
                target_weight: 75.0,
                activity_level: ActivityLevel::Active,
            })
        );
    }

    #[test]
    fn test_unknown_command() {
        let err = parse(":fly").unwrap_err();
        assert_eq!(err.to_string(), "Unknown command :fly, try :help");

        let err = parse(":goals gain").unwrap_err();
        assert!(err.to_string().starts_with("Usage: :goals"));
    }

    #[test]
    fn test_meal_filter() {
        let meal: Meal = serde_json::from_value(serde_json::json!({
            "id": 1, "fdc_id": 9, "food_name": "Brown rice", "serving_size": 150,
            "serving_unit": "g", "calories": 180, "meal_type": "lunch",
            "logged_date": "2025-06-03"
        }))
        .unwrap();

        let filter = MealFilter {
            meal_type: Some(MealType::Lunch),
            from: Some(day(2025, 6, 1)),
            to: Some(day(2025, 6, 3)),
            text: Some("RICE".to_string()),
        };
        assert!(filter.matches(&meal));

        let filter = MealFilter {
            to: Some(day(2025, 6, 2)),
            ..Default::default()
        };
        assert!(!filter.matches(&meal));
    }
}
