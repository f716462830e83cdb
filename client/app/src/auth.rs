//! # Auth Context
//!
//! Keeps the signed in identity and the backend profile that goes with it.
//!
//!
//!
//! ## Flow
//! 1. Identity provider signs the user in and hands back an ID token + refresh token
//! 2. Backend verifies the ID token (`/api/auth/verify`), creating the user row on first sight
//! 3. Backend profile is fetched and cached
//!
//! Steps 2 and 3 only log on failure, the sign in itself still stands.
//!
//!
//!
//! ## Tokens
//! ID tokens live for an hour. [`AuthContext::id_token`] swaps the refresh token
//! for a new one once the current token is within 5 minutes of expiring.
use std::{future::Future, sync::Arc, time::Duration};

use catalog::{ApiError, profile::UserProfile, remote::NutritionApi};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, de::DeserializeOwned, de::IgnoredAny};
use serde_json::json;
use thiserror::Error;
use tokio::{sync::RwLock, time::Instant};
use tracing::{debug, error, info, warn};

pub const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";
pub const REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

const DEFAULT_TOKEN_LIFETIME: u64 = 3600;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Provider(String),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed identity response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Sign in is not configured, set FIREBASE_API_KEY")]
    NotConfigured,

    #[error("Not signed in")]
    SignedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityUser {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: IdentityUser,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: Duration,
}

#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: Duration,
}

pub trait IdentityProvider: Send + Sync {
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Credentials, AuthError>> + Send;

    fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Credentials, AuthError>> + Send;

    fn update_display_name(
        &self,
        id_token: &str,
        display_name: &str,
    ) -> impl Future<Output = Result<(), AuthError>> + Send;

    fn send_password_reset(&self, email: &str) -> impl Future<Output = Result<(), AuthError>> + Send;

    fn refresh(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<RefreshedToken, AuthError>> + Send;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Deserialize)]
struct ProviderErrorDetail {
    message: String,
}

/// Firebase Authentication over its REST endpoints.
pub struct FirebaseIdentity {
    client: Client,
    api_key: Option<String>,
    identity_url: String,
    token_url: String,
}

impl FirebaseIdentity {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, AuthError> {
        Self::with_endpoints(api_key, IDENTITY_TOOLKIT_URL, SECURE_TOKEN_URL, timeout)
    }

    pub fn with_endpoints(
        api_key: Option<String>,
        identity_url: &str,
        token_url: &str,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            identity_url: identity_url.trim_end_matches('/').to_string(),
            token_url: token_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn account(&self, action: &str) -> Result<RequestBuilder, AuthError> {
        let key = self.api_key.as_deref().ok_or(AuthError::NotConfigured)?;
        debug!("Making identity request {action}");

        Ok(self
            .client
            .post(format!("{}/accounts:{action}", self.identity_url))
            .query(&[("key", key)]))
    }

    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AuthError> {
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let code = serde_json::from_slice::<ProviderErrorBody>(&bytes)
                .map(|body| body.error.message)
                .unwrap_or_else(|_| status.to_string());
            warn!("Identity provider rejected request: {code}");

            return Err(AuthError::Provider(friendly_message(&code)));
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn account_call(
        &self,
        action: &str,
        email: &str,
        password: &str,
    ) -> Result<Credentials, AuthError> {
        let response: AccountResponse = self
            .call(self.account(action)?.json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            })))
            .await?;

        Ok(Credentials {
            user: IdentityUser {
                uid: response.local_id,
                email: response.email,
                display_name: response.display_name.filter(|name| !name.is_empty()),
            },
            id_token: response.id_token,
            refresh_token: response.refresh_token,
            expires_in: lifetime(response.expires_in.as_deref()),
        })
    }
}

impl IdentityProvider for FirebaseIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Credentials, AuthError> {
        self.account_call("signInWithPassword", email, password)
            .await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Credentials, AuthError> {
        self.account_call("signUp", email, password).await
    }

    async fn update_display_name(&self, id_token: &str, display_name: &str) -> Result<(), AuthError> {
        let _: IgnoredAny = self
            .call(self.account("update")?.json(&json!({
                "idToken": id_token,
                "displayName": display_name,
                "returnSecureToken": false,
            })))
            .await?;

        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let _: IgnoredAny = self
            .call(self.account("sendOobCode")?.json(&json!({
                "requestType": "PASSWORD_RESET",
                "email": email,
            })))
            .await?;

        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, AuthError> {
        let key = self.api_key.as_deref().ok_or(AuthError::NotConfigured)?;
        debug!("Refreshing ID token");

        let response: TokenResponse = self
            .call(
                self.client
                    .post(format!("{}/token", self.token_url))
                    .query(&[("key", key)])
                    .form(&[
                        ("grant_type", "refresh_token"),
                        ("refresh_token", refresh_token),
                    ]),
            )
            .await?;

        Ok(RefreshedToken {
            id_token: response.id_token,
            refresh_token: response.refresh_token,
            expires_in: lifetime(response.expires_in.as_deref()),
        })
    }
}

fn lifetime(raw: Option<&str>) -> Duration {
    Duration::from_secs(
        raw.and_then(|secs| secs.parse().ok())
            .unwrap_or(DEFAULT_TOKEN_LIFETIME),
    )
}

/// Provider error codes come back as `CODE` or `CODE : detail`.
pub fn friendly_message(code: &str) -> String {
    let (head, detail) = match code.split_once(':') {
        Some((head, detail)) => (head.trim(), Some(detail.trim())),
        None => (code.trim(), None),
    };

    match head {
        "EMAIL_NOT_FOUND" => "No account found with this email".to_string(),
        "INVALID_PASSWORD" => "Incorrect password".to_string(),
        "INVALID_LOGIN_CREDENTIALS" => "Invalid email or password".to_string(),
        "EMAIL_EXISTS" => "An account with this email already exists".to_string(),
        "INVALID_EMAIL" => "Invalid email address".to_string(),
        "USER_DISABLED" => "This account has been disabled".to_string(),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "Too many attempts. Please try again later.".to_string(),
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "INVALID_ID_TOKEN" | "USER_NOT_FOUND" => {
            "Session expired. Please sign in again.".to_string()
        }
        "WEAK_PASSWORD" => detail
            .unwrap_or("Password should be at least 6 characters")
            .to_string(),
        _ => code.to_string(),
    }
}

struct Session {
    user: IdentityUser,
    id_token: String,
    refresh_token: String,
    expires_at: Instant,
}

impl Session {
    fn new(credentials: Credentials) -> Self {
        Self {
            user: credentials.user,
            id_token: credentials.id_token,
            refresh_token: credentials.refresh_token,
            expires_at: Instant::now() + credentials.expires_in,
        }
    }

    fn is_fresh(&self) -> bool {
        self.expires_at > Instant::now() + REFRESH_MARGIN
    }
}

pub struct AuthContext<P> {
    provider: P,
    api: Arc<NutritionApi>,
    session: RwLock<Option<Session>>,
    profile: RwLock<Option<UserProfile>>,
}

impl<P: IdentityProvider> AuthContext<P> {
    pub fn new(provider: P, api: Arc<NutritionApi>) -> Self {
        Self {
            provider,
            api,
            session: RwLock::new(None),
            profile: RwLock::new(None),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<IdentityUser, AuthError> {
        let credentials = self.provider.sign_in(email, password).await?;

        Ok(self.start_session(credentials).await)
    }

    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<IdentityUser, AuthError> {
        let mut credentials = self.provider.sign_up(email, password).await?;

        if let Some(name) = display_name.map(str::trim).filter(|name| !name.is_empty()) {
            self.provider
                .update_display_name(&credentials.id_token, name)
                .await?;
            credentials.user.display_name = Some(name.to_string());
        }

        Ok(self.start_session(credentials).await)
    }

    pub async fn logout(&self) {
        if let Some(session) = self.session.write().await.take() {
            info!("Signed out {}", session.user.email);
        }

        self.set_user_profile(None).await;
    }

    pub async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        self.provider.send_password_reset(email).await
    }

    /// Current ID token, `None` when signed out.
    pub async fn id_token(&self) -> Result<Option<String>, AuthError> {
        let refresh_token = match self.session.read().await.as_ref() {
            None => return Ok(None),
            Some(session) if session.is_fresh() => return Ok(Some(session.id_token.clone())),
            Some(session) => session.refresh_token.clone(),
        };

        let refreshed = self.provider.refresh(&refresh_token).await?;

        let mut session = self.session.write().await;
        if let Some(session) = session.as_mut() {
            session.id_token = refreshed.id_token;
            session.refresh_token = refreshed.refresh_token;
            session.expires_at = Instant::now() + refreshed.expires_in;
        }

        Ok(session.as_ref().map(|session| session.id_token.clone()))
    }

    /// Like [`Self::id_token`] but signed out is an error.
    pub async fn require_token(&self) -> Result<String, AuthError> {
        self.id_token().await?.ok_or(AuthError::SignedOut)
    }

    pub async fn user(&self) -> Option<IdentityUser> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|session| session.user.clone())
    }

    pub async fn is_signed_in(&self) -> bool {
        self.session.read().await.is_some()
    }

    pub async fn profile(&self) -> Option<UserProfile> {
        self.profile.read().await.clone()
    }

    pub async fn set_user_profile(&self, profile: Option<UserProfile>) {
        *self.profile.write().await = profile;
    }

    pub async fn refresh_user_profile(&self) -> Result<Option<UserProfile>, AuthError> {
        let Some(id_token) = self.id_token().await? else {
            return Ok(None);
        };

        let profile = self.api.user_profile(&id_token).await?;
        self.set_user_profile(Some(profile.clone())).await;

        Ok(Some(profile))
    }

    async fn start_session(&self, credentials: Credentials) -> IdentityUser {
        let user = credentials.user.clone();
        let id_token = credentials.id_token.clone();

        *self.session.write().await = Some(Session::new(credentials));
        self.set_user_profile(None).await;
        info!("Signed in as {}", user.email);

        self.on_signed_in(&id_token).await;

        user
    }

    async fn on_signed_in(&self, id_token: &str) {
        match self.api.verify_user(id_token).await {
            Ok(verified) => debug!("Backend verified user {}", verified.id),
            Err(e) => {
                error!("Error verifying user with backend: {e}");
                return;
            }
        }

        match self.api.user_profile(id_token).await {
            Ok(profile) => self.set_user_profile(Some(profile)).await,
            Err(e) => error!("Error loading user profile: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{
        Json, Router,
        http::{StatusCode, Uri},
        routing::{get, post},
    };
    use catalog::remote::ApiConfig;
    use serde_json::Value;
    use tokio::net::TcpListener;

    use super::*;

    struct FakeProvider {
        lifetime: Duration,
        refreshes: AtomicUsize,
    }

    impl FakeProvider {
        fn new(lifetime: Duration) -> Self {
            Self {
                lifetime,
                refreshes: AtomicUsize::new(0),
            }
        }

        fn credentials(&self, email: &str) -> Credentials {
            Credentials {
                user: IdentityUser {
                    uid: "uid-1".to_string(),
                    email: email.to_string(),
                    display_name: None,
                },
                id_token: "id-1".to_string(),
                refresh_token: "refresh-1".to_string(),
                expires_in: self.lifetime,
            }
        }
    }

    impl IdentityProvider for FakeProvider {
        async fn sign_in(&self, email: &str, password: &str) -> Result<Credentials, AuthError> {
            match password {
                "secret" => Ok(self.credentials(email)),
                _ => Err(AuthError::Provider(friendly_message("INVALID_PASSWORD"))),
            }
        }

        async fn sign_up(&self, email: &str, _password: &str) -> Result<Credentials, AuthError> {
            Ok(self.credentials(email))
        }

        async fn update_display_name(&self, _id_token: &str, _name: &str) -> Result<(), AuthError> {
            Ok(())
        }

        async fn send_password_reset(&self, _email: &str) -> Result<(), AuthError> {
            Ok(())
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<RefreshedToken, AuthError> {
            let count = self.refreshes.fetch_add(1, Ordering::SeqCst) + 2;

            Ok(RefreshedToken {
                id_token: format!("id-{count}"),
                refresh_token: format!("refresh-{count}"),
                expires_in: Duration::from_secs(3600),
            })
        }
    }

    async fn listen(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        format!("http://{address}")
    }

    async fn backend(verify_status: StatusCode) -> Arc<NutritionApi> {
        let router = Router::new()
            .route(
                "/api/auth/verify",
                post(move || async move {
                    (
                        verify_status,
                        Json(json!({
                            "success": verify_status.is_success(),
                            "user": {"id": 7, "firebase_uid": "uid-1", "email": "a@b.c"},
                            "error": "Invalid token"
                        })),
                    )
                }),
            )
            .route(
                "/api/profile",
                get(|| async {
                    Json(json!({
                        "success": true,
                        "profile": {"id": 7, "firebase_uid": "uid-1", "email": "a@b.c", "weight": 70}
                    }))
                }),
            );

        let base_url = listen(router).await;

        Arc::new(
            NutritionApi::new(&ApiConfig {
                base_url,
                timeout: Duration::from_secs(5),
            })
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_login_loads_profile() {
        let auth = AuthContext::new(
            FakeProvider::new(Duration::from_secs(3600)),
            backend(StatusCode::OK).await,
        );

        let user = auth.login("a@b.c", "secret").await.unwrap();

        assert_eq!(user.email, "a@b.c");
        assert!(auth.is_signed_in().await);
        assert_eq!(auth.profile().await.unwrap().weight, Some(70.0));
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let auth = AuthContext::new(
            FakeProvider::new(Duration::from_secs(3600)),
            backend(StatusCode::OK).await,
        );

        let err = auth.login("a@b.c", "nope").await.unwrap_err();

        assert_eq!(err.to_string(), "Incorrect password");
        assert!(!auth.is_signed_in().await);
    }

    #[tokio::test]
    async fn test_backend_rejection_keeps_sign_in() {
        let auth = AuthContext::new(
            FakeProvider::new(Duration::from_secs(3600)),
            backend(StatusCode::UNAUTHORIZED).await,
        );

        auth.login("a@b.c", "secret").await.unwrap();

        assert!(auth.is_signed_in().await);
        assert!(auth.profile().await.is_none());
    }

    #[tokio::test]
    async fn test_token_refreshed_near_expiry() {
        let auth = AuthContext::new(
            FakeProvider::new(Duration::from_secs(4 * 60)),
            backend(StatusCode::OK).await,
        );

        auth.login("a@b.c", "secret").await.unwrap();

        assert_eq!(auth.id_token().await.unwrap().as_deref(), Some("id-2"));
        assert_eq!(auth.id_token().await.unwrap().as_deref(), Some("id-2"));
        assert_eq!(auth.provider().refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fresh_token_reused() {
        let auth = AuthContext::new(
            FakeProvider::new(Duration::from_secs(3600)),
            backend(StatusCode::OK).await,
        );

        assert_eq!(auth.id_token().await.unwrap(), None);
        assert!(matches!(
            auth.require_token().await,
            Err(AuthError::SignedOut)
        ));

        auth.login("a@b.c", "secret").await.unwrap();

        assert_eq!(auth.require_token().await.unwrap(), "id-1");
        assert_eq!(auth.provider().refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_logout_clears_profile() {
        let auth = AuthContext::new(
            FakeProvider::new(Duration::from_secs(3600)),
            backend(StatusCode::OK).await,
        );

        auth.signup("a@b.c", "secret", Some("  Ada ")).await.unwrap();
        assert_eq!(
            auth.user().await.unwrap().display_name.as_deref(),
            Some("Ada")
        );
        assert!(auth.profile().await.is_some());

        auth.logout().await;

        assert!(auth.user().await.is_none());
        assert!(auth.profile().await.is_none());
        assert_eq!(auth.id_token().await.unwrap(), None);
        assert_eq!(auth.refresh_user_profile().await.unwrap(), None);
    }

    async fn fake_firebase(uri: Uri, body: String) -> (StatusCode, Json<Value>) {
        match uri.path() {
            "/v1/accounts:signInWithPassword" if body.contains("\"password\":\"secret\"") => (
                StatusCode::OK,
                Json(json!({
                    "localId": "uid-9",
                    "email": "a@b.c",
                    "displayName": "",
                    "idToken": "id-9",
                    "refreshToken": "refresh-9",
                    "expiresIn": "3600"
                })),
            ),
            "/v1/accounts:signInWithPassword" => (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": {"code": 400, "message": "INVALID_LOGIN_CREDENTIALS"}})),
            ),
            "/v1/token" if body.contains("grant_type=refresh_token") => (
                StatusCode::OK,
                Json(json!({
                    "id_token": "id-10",
                    "refresh_token": "refresh-10",
                    "expires_in": "3600",
                    "token_type": "Bearer"
                })),
            ),
            _ => (
                StatusCode::NOT_FOUND,
                Json(json!({"error": {"message": "NOT_FOUND"}})),
            ),
        }
    }

    #[tokio::test]
    async fn test_firebase_rest_calls() {
        let base = listen(Router::new().fallback(fake_firebase)).await;
        let identity = FirebaseIdentity::with_endpoints(
            Some("key".to_string()),
            &format!("{base}/v1"),
            &format!("{base}/v1/"),
            Duration::from_secs(5),
        )
        .unwrap();

        let credentials = identity.sign_in("a@b.c", "secret").await.unwrap();
        assert_eq!(credentials.user.uid, "uid-9");
        assert_eq!(credentials.user.display_name, None);
        assert_eq!(credentials.expires_in, Duration::from_secs(3600));

        let err = identity.sign_in("a@b.c", "wrong").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");

        let refreshed = identity.refresh("refresh-9").await.unwrap();
        assert_eq!(refreshed.id_token, "id-10");
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let identity = FirebaseIdentity::new(None, Duration::from_secs(5)).unwrap();

        assert!(!identity.is_configured());
        assert!(matches!(
            identity.sign_in("a@b.c", "secret").await,
            Err(AuthError::NotConfigured)
        ));
    }

    #[test]
    fn test_friendly_messages() {
        assert_eq!(
            friendly_message("EMAIL_NOT_FOUND"),
            "No account found with this email"
        );
        assert_eq!(
            friendly_message("WEAK_PASSWORD : Password should be at least 6 characters"),
            "Password should be at least 6 characters"
        );
        assert_eq!(friendly_message("SOMETHING_NEW"), "SOMETHING_NEW");
    }
}
