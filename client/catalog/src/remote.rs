use std::time::Duration;

use chrono::Local;
use regex::Regex;
use reqwest::{
    Client, Method, RequestBuilder,
    header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use tracing::{debug, error, warn};
use urlencoding::encode;

use crate::{
    ApiError, CancelToken,
    foods::{FoodDetails, HistoryEntry, NewHistoryEntry, SearchResults},
    meals::{Meal, MealQuery, MealUpdate, NewMeal, NutritionSummary},
    profile::{DietaryGoals, GoalsRequest, ProfileUpdate, UserProfile, VerifiedUser},
    read_envelope,
};

pub const DEFAULT_API_URL: &str = "http://localhost:5003";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Health {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfReport {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Deserialize)]
struct FoodEnvelope {
    food: FoodDetails,
}

#[derive(Deserialize)]
struct HistoryEnvelope {
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: VerifiedUser,
}

#[derive(Deserialize)]
struct ProfileEnvelope {
    profile: UserProfile,
}

#[derive(Deserialize)]
struct GoalsEnvelope {
    goals: DietaryGoals,
}

#[derive(Deserialize)]
struct MealsEnvelope {
    #[serde(default)]
    meals: Vec<Meal>,
}

#[derive(Deserialize)]
struct LoggedEnvelope {
    meal_id: u64,
}

#[derive(Deserialize)]
struct SummaryEnvelope {
    summary: NutritionSummary,
}

#[derive(Deserialize)]
struct Acknowledged {}

#[derive(Serialize)]
struct DateParam {
    date: chrono::NaiveDate,
}

pub struct NutritionApi {
    client: Client,
    base_url: String,
}

impl NutritionApi {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn search_foods(
        &self,
        query: &str,
        bearer: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<SearchResults, ApiError> {
        let path = format!("/api/search/{}", encode(query));
        let request = self.fetch(
            self.request(Method::GET, &path, bearer),
            "Failed to search foods",
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Search for {query:?} cancelled");
                Err(ApiError::Cancelled)
            }
            result = request => result,
        }
    }

    pub async fn food_details(
        &self,
        fdc_id: u64,
        bearer: Option<&str>,
    ) -> Result<FoodDetails, ApiError> {
        let path = format!("/api/food/{fdc_id}");
        let envelope: FoodEnvelope = self
            .fetch(
                self.request(Method::GET, &path, bearer),
                "Failed to get food details",
            )
            .await?;

        Ok(envelope.food)
    }

    pub async fn history(&self, bearer: Option<&str>) -> Result<Vec<HistoryEntry>, ApiError> {
        let envelope: HistoryEnvelope = self
            .fetch(
                self.request(Method::GET, "/api/history", bearer),
                "Failed to get history",
            )
            .await?;

        Ok(envelope.history)
    }

    pub async fn add_to_history(
        &self,
        bearer: Option<&str>,
        entry: &NewHistoryEntry,
    ) -> Result<(), ApiError> {
        let _: Acknowledged = self
            .fetch(
                self.request(Method::POST, "/api/history", bearer).json(entry),
                "Failed to add to history",
            )
            .await?;

        Ok(())
    }

    pub async fn health(&self) -> Result<Health, ApiError> {
        self.fetch(
            self.request(Method::GET, "/api/health", None),
            "Backend service is not available",
        )
        .await
        .map_err(|e| match e {
            ApiError::Rejected(_) => {
                ApiError::Rejected("Backend service is not available".to_string())
            }
            other => other,
        })
    }

    pub async fn verify_user(&self, id_token: &str) -> Result<VerifiedUser, ApiError> {
        let envelope: UserEnvelope = self
            .fetch(
                self.request(Method::POST, "/api/auth/verify", None)
                    .json(&json!({ "idToken": id_token })),
                "Failed to verify user",
            )
            .await?;

        Ok(envelope.user)
    }

    pub async fn user_profile(&self, id_token: &str) -> Result<UserProfile, ApiError> {
        let envelope: ProfileEnvelope = self
            .fetch(
                self.request(Method::GET, "/api/profile", Some(id_token)),
                "Failed to get user profile",
            )
            .await?;

        Ok(envelope.profile)
    }

    pub async fn update_user_profile(
        &self,
        id_token: &str,
        update: &ProfileUpdate,
    ) -> Result<(), ApiError> {
        let _: Acknowledged = self
            .fetch(
                self.request(Method::POST, "/api/profile/update", Some(id_token))
                    .json(update),
                "Failed to update user profile",
            )
            .await?;

        Ok(())
    }

    pub async fn set_dietary_goals(
        &self,
        id_token: &str,
        goals: &GoalsRequest,
    ) -> Result<DietaryGoals, ApiError> {
        let envelope: GoalsEnvelope = self
            .fetch(
                self.request(Method::POST, "/api/dietary-goals", Some(id_token))
                    .json(goals),
                "Failed to set dietary goals",
            )
            .await?;

        Ok(envelope.goals)
    }

    pub async fn log_meal(&self, id_token: &str, meal: &NewMeal) -> Result<u64, ApiError> {
        let envelope: LoggedEnvelope = self
            .fetch(
                self.request(Method::POST, "/api/meals", Some(id_token))
                    .json(meal),
                "Failed to log meal",
            )
            .await?;

        Ok(envelope.meal_id)
    }

    pub async fn meals(&self, id_token: &str, query: &MealQuery) -> Result<Vec<Meal>, ApiError> {
        let envelope: MealsEnvelope = self
            .fetch(
                self.request(Method::GET, "/api/meals", Some(id_token))
                    .query(query),
                "Failed to get meals",
            )
            .await?;

        Ok(envelope.meals)
    }

    pub async fn update_meal(
        &self,
        id_token: &str,
        meal_id: u64,
        update: &MealUpdate,
    ) -> Result<(), ApiError> {
        let path = format!("/api/meals/{meal_id}");
        let _: Acknowledged = self
            .fetch(
                self.request(Method::PUT, &path, Some(id_token)).json(update),
                "Failed to update meal",
            )
            .await?;

        Ok(())
    }

    pub async fn delete_meal(&self, id_token: &str, meal_id: u64) -> Result<(), ApiError> {
        let path = format!("/api/meals/{meal_id}");
        let _: Acknowledged = self
            .fetch(
                self.request(Method::DELETE, &path, Some(id_token)),
                "Failed to delete meal",
            )
            .await?;

        Ok(())
    }

    pub async fn nutrition_summary(
        &self,
        id_token: &str,
        date: Option<chrono::NaiveDate>,
    ) -> Result<NutritionSummary, ApiError> {
        let mut request = self.request(Method::GET, "/api/nutrition-summary", Some(id_token));
        if let Some(date) = date {
            request = request.query(&DateParam { date });
        }

        let envelope: SummaryEnvelope = self
            .fetch(request, "Failed to get nutrition summary")
            .await?;

        Ok(envelope.summary)
    }

    pub async fn export_pdf(&self, id_token: &str, days: u32) -> Result<PdfReport, ApiError> {
        let response = self
            .request(Method::GET, "/api/export/pdf", Some(id_token))
            .query(&[("days", days)])
            .send()
            .await?;

        let status = response.status();
        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(attachment_name);
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let err = read_envelope::<serde_json::Value>(
                status,
                &bytes,
                "Failed to export PDF report",
            )
            .err()
            .unwrap_or_else(|| ApiError::Rejected("Failed to export PDF report".to_string()));
            error!("API Error: {err}");

            return Err(err);
        }

        Ok(PdfReport {
            filename: filename.unwrap_or_else(default_report_name),
            bytes: bytes.to_vec(),
        })
    }

    fn request(&self, method: Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        debug!("Making {method} request to {path}");

        let builder = self
            .client
            .request(method, format!("{}{path}", self.base_url));

        match bearer {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        read_envelope(status, &bytes, fallback).map_err(|e| {
            match &e {
                ApiError::RateLimited { retry_after, .. } => {
                    warn!("Rate limited. Please wait {retry_after} seconds before trying again.")
                }
                _ => error!("API Error: {e}"),
            }
            e
        })
    }
}

pub fn attachment_name(disposition: &str) -> Option<String> {
    let re = Regex::new(r#"filename\*?=(?:UTF-8'')?"?([^";]+)"?"#).ok()?;

    re.captures(disposition)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}

pub fn default_report_name() -> String {
    format!(
        "nutrivault_report_{}.pdf",
        Local::now().date_naive().format("%Y-%m-%d")
    )
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        Json, Router,
        extract::{Path, Query},
        http::{HeaderMap, StatusCode, header},
        response::IntoResponse,
        routing::{get, post},
    };
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    use super::*;

    async fn serve(router: Router) -> NutritionApi {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        NutritionApi::new(&ApiConfig {
            base_url: format!("http://{address}/"),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn bearer(headers: &HeaderMap) -> Option<String> {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }

    #[tokio::test]
    async fn test_search_encodes_query() {
        let api = serve(Router::new().route(
            "/api/search/{query}",
            get(|Path(query): Path<String>| async move {
                Json(json!({
                    "success": true,
                    "totalHits": 1,
                    "foods": [{"fdcId": 5, "description": query, "nutrients": []}]
                }))
            }),
        ))
        .await;

        let results = api
            .search_foods("chicken breast", None, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(results.total_hits, 1);
        assert_eq!(results.foods[0].description, "chicken breast");
    }

    #[tokio::test]
    async fn test_search_rate_limited() {
        let api = serve(Router::new().route(
            "/api/search/{query}",
            get(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({"success": false, "error": "Too many requests. Please try again later."})),
                )
            }),
        ))
        .await;

        let err = api
            .search_foods("apple", None, &CancelToken::new())
            .await
            .unwrap_err();

        match err {
            ApiError::RateLimited {
                retry_after,
                message,
            } => {
                assert_eq!(retry_after, 60);
                assert_eq!(message, "Too many requests. Please try again later.");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_search() {
        let api = serve(Router::new().route(
            "/api/search/{query}",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Json(json!({"success": true, "foods": []}))
            }),
        ))
        .await;

        let cancel = CancelToken::new();
        cancel.cancel();

        let err = api.search_foods("apple", None, &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_details_not_found() {
        let api = serve(Router::new().route(
            "/api/food/{id}",
            get(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(json!({"success": false, "error": "Food item not found"})),
                )
            }),
        ))
        .await;

        let err = api.food_details(1, None).await.unwrap_err();
        assert_eq!(err.to_string(), "Food item not found");
    }

    #[tokio::test]
    async fn test_protected_calls_send_bearer() {
        let api = serve(
            Router::new()
                .route(
                    "/api/profile",
                    get(|headers: HeaderMap| async move {
                        match bearer(&headers).as_deref() {
                            Some("Bearer token-1") => Json(json!({
                                "success": true,
                                "profile": {"id": 1, "firebase_uid": "uid-1", "email": "a@b.c"}
                            }))
                            .into_response(),
                            _ => (
                                StatusCode::UNAUTHORIZED,
                                Json(json!({"error": "Invalid token"})),
                            )
                                .into_response(),
                        }
                    }),
                )
                .route(
                    "/api/meals",
                    get(|Query(params): Query<Value>| async move {
                        Json(json!({
                            "success": true,
                            "meals": [{"id": 1, "fdc_id": "9", "food_name": "Oats",
                                "serving_size": 40, "serving_unit": "g", "calories": 150,
                                "logged_date": params["days"].as_str().unwrap_or("none")}]
                        }))
                    })
                    .post(|Json(body): Json<Value>| async move {
                        Json(json!({"success": true, "meal_id": body["serving_size"].as_f64().unwrap_or(0.0) as u64}))
                    }),
                ),
        )
        .await;

        let profile = api.user_profile("token-1").await.unwrap();
        assert_eq!(profile.firebase_uid, "uid-1");

        let err = api.user_profile("stale").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid token");

        let meals = api
            .meals(
                "token-1",
                &MealQuery {
                    date: None,
                    days: Some(30),
                },
            )
            .await
            .unwrap();
        assert_eq!(meals[0].logged_date, "30");
        assert_eq!(meals[0].fdc_id, 9);
    }

    #[tokio::test]
    async fn test_log_meal_returns_id() {
        let api = serve(Router::new().route(
            "/api/meals",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["serving_unit"], "g");
                Json(json!({"success": true, "meal_id": 42, "message": "Meal logged successfully"}))
            }),
        ))
        .await;

        let meal = NewMeal {
            fdc_id: 1,
            food_name: "Rice".to_string(),
            serving_size: 100.0,
            serving_unit: "g".to_string(),
            calories: 130.0,
            protein: 2.7,
            carbs: 28.0,
            fat: 0.3,
            meal_type: crate::meals::MealType::Lunch,
            logged_date: chrono::NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
        };

        assert_eq!(api.log_meal("t", &meal).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_export_pdf() {
        let api = serve(Router::new().route(
            "/api/export/pdf",
            get(|Query(params): Query<Value>| async move {
                (
                    [
                        (header::CONTENT_TYPE, "application/pdf"),
                        (
                            header::CONTENT_DISPOSITION,
                            "attachment; filename=nutrition_report_20250603.pdf",
                        ),
                    ],
                    format!("Nutrition Report for the last {} days", params["days"].as_str().unwrap_or("?")),
                )
            }),
        ))
        .await;

        let report = api.export_pdf("t", 14).await.unwrap();

        assert_eq!(report.filename, "nutrition_report_20250603.pdf");
        assert_eq!(report.bytes, b"Nutrition Report for the last 14 days".to_vec());
    }

    #[tokio::test]
    async fn test_health_unavailable() {
        let api = serve(Router::new().route(
            "/api/health",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;

        let err = api.health().await.unwrap_err();
        assert_eq!(err.to_string(), "Backend service is not available");
    }

    #[test]
    fn test_attachment_name() {
        assert_eq!(
            attachment_name(r#"attachment; filename="report.pdf""#).as_deref(),
            Some("report.pdf")
        );
        assert_eq!(
            attachment_name("attachment; filename=nutrition_report_20250603.pdf").as_deref(),
            Some("nutrition_report_20250603.pdf")
        );
        assert_eq!(attachment_name("inline"), None);
        assert!(default_report_name().starts_with("nutrivault_report_"));
    }
}
