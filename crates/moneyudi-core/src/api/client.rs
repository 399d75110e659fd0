use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::{header, Client, Method, RequestBuilder};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

use crate::auth::SessionData;
use crate::ledger::LedgerSnapshot;
use crate::models::{
    Budget, Category, CategoryPatch, NewBudget, NewCategory, NewTransaction, Transaction,
    UserSettings,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Most recent transactions loaded per user
const TRANSACTION_FETCH_LIMIT: u32 = 500;

const TABLE_CATEGORIES: &str = "categories";
const TABLE_TRANSACTIONS: &str = "transactions";
const TABLE_BUDGETS: &str = "budgets";
const TABLE_SETTINGS: &str = "user_settings";

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    expires_in: i64,
    user: AuthUser,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl AuthResponse {
    fn into_session(self) -> SessionData {
        SessionData {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            user_id: self.user.id,
            email: self.user.email,
            expires_at: Utc::now() + ChronoDuration::seconds(self.expires_in),
        }
    }
}

#[derive(Serialize)]
struct SettingsInsert<'a> {
    user_id: &'a str,
    monthly_cutoff_day: u8,
}

/// Backend client. Clone is cheap: reqwest::Client shares its pool.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    anon_key: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            token: None,
        })
    }

    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert("apikey", header::HeaderValue::from_str(&self.anon_key)?);
        let bearer = self.token.as_deref().unwrap_or(&self.anon_key);
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", bearer))?,
        );
        Ok(headers)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn table_request(
        &self,
        method: Method,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<RequestBuilder> {
        let mut builder = self
            .client
            .request(method.clone(), self.table_url(table))
            .headers(self.auth_headers()?)
            .query(query);
        if method != Method::GET {
            builder = builder.header("Prefer", "return=representation");
        }
        Ok(builder)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder, what: &str) -> Result<T> {
        let response = builder
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to send request: {}", what))?;
        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response: {}", what))
    }

    /// Writes return the affected rows; exactly one is expected
    async fn send_single<T: DeserializeOwned>(builder: RequestBuilder, what: &str) -> Result<T> {
        let rows: Vec<T> = Self::send_json(builder, what).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ApiError::InvalidResponse(format!("{}: no row returned", what)).into())
    }

    fn owner(user_id: &str) -> (&'static str, String) {
        ("user_id", format!("eq.{}", user_id))
    }

    fn by_id(id: &str) -> (&'static str, String) {
        ("id", format!("eq.{}", id))
    }

    // ===== Reads =====

    pub async fn fetch_categories(&self, user_id: &str) -> Result<Vec<Category>> {
        let req = self.table_request(
            Method::GET,
            TABLE_CATEGORIES,
            &[
                ("select", "*".to_string()),
                Self::owner(user_id),
                ("order", "name.asc".to_string()),
            ],
        )?;
        Self::send_json(req, "categories").await
    }

    pub async fn fetch_transactions(&self, user_id: &str) -> Result<Vec<Transaction>> {
        let req = self.table_request(
            Method::GET,
            TABLE_TRANSACTIONS,
            &[
                ("select", "*".to_string()),
                Self::owner(user_id),
                ("order", "date.desc".to_string()),
                ("limit", TRANSACTION_FETCH_LIMIT.to_string()),
            ],
        )?;
        Self::send_json(req, "transactions").await
    }

    pub async fn fetch_budgets(&self, user_id: &str) -> Result<Vec<Budget>> {
        let req = self.table_request(
            Method::GET,
            TABLE_BUDGETS,
            &[("select", "*".to_string()), Self::owner(user_id)],
        )?;
        Self::send_json(req, "budgets").await
    }

    /// The user's settings row, or defaults when none exists yet
    pub async fn fetch_settings(&self, user_id: &str) -> Result<UserSettings> {
        let req = self.table_request(
            Method::GET,
            TABLE_SETTINGS,
            &[
                ("select", "*".to_string()),
                Self::owner(user_id),
                ("limit", "1".to_string()),
            ],
        )?;
        let rows: Vec<UserSettings> = Self::send_json(req, "user_settings").await?;
        Ok(rows
            .into_iter()
            .next()
            .unwrap_or_else(|| UserSettings::defaults_for(user_id)))
    }

    /// Load all four collections concurrently
    pub async fn fetch_snapshot(&self, user_id: &str) -> Result<LedgerSnapshot> {
        let (categories, transactions, budgets, settings) = futures::try_join!(
            self.fetch_categories(user_id),
            self.fetch_transactions(user_id),
            self.fetch_budgets(user_id),
            self.fetch_settings(user_id),
        )?;
        debug!(
            categories = categories.len(),
            transactions = transactions.len(),
            budgets = budgets.len(),
            "Ledger loaded"
        );
        Ok(LedgerSnapshot {
            categories,
            transactions,
            budgets,
            settings,
        })
    }

    // ===== Transactions =====

    pub async fn insert_transaction(&self, tx: &NewTransaction) -> Result<Transaction> {
        let req = self
            .table_request(Method::POST, TABLE_TRANSACTIONS, &[])?
            .json(tx);
        Self::send_single(req, "insert transaction").await
    }

    pub async fn delete_transaction(&self, user_id: &str, id: &str) -> Result<()> {
        let req = self.table_request(
            Method::DELETE,
            TABLE_TRANSACTIONS,
            &[Self::by_id(id), Self::owner(user_id)],
        )?;
        let _: Vec<Transaction> = Self::send_json(req, "delete transaction").await?;
        Ok(())
    }

    // ===== Categories =====

    pub async fn insert_category(&self, category: &NewCategory) -> Result<Category> {
        let req = self
            .table_request(Method::POST, TABLE_CATEGORIES, &[])?
            .json(category);
        Self::send_single(req, "insert category").await
    }

    pub async fn update_category(
        &self,
        user_id: &str,
        id: &str,
        patch: &CategoryPatch,
    ) -> Result<Category> {
        let req = self
            .table_request(
                Method::PATCH,
                TABLE_CATEGORIES,
                &[Self::by_id(id), Self::owner(user_id)],
            )?
            .json(patch);
        Self::send_single(req, "update category").await
    }

    pub async fn delete_category(&self, user_id: &str, id: &str) -> Result<()> {
        let req = self.table_request(
            Method::DELETE,
            TABLE_CATEGORIES,
            &[Self::by_id(id), Self::owner(user_id)],
        )?;
        let _: Vec<Category> = Self::send_json(req, "delete category").await?;
        Ok(())
    }

    // ===== Budgets =====

    pub async fn insert_budget(&self, budget: &NewBudget) -> Result<Budget> {
        let req = self
            .table_request(Method::POST, TABLE_BUDGETS, &[])?
            .json(budget);
        Self::send_single(req, "insert budget").await
    }

    pub async fn update_budget_amount(
        &self,
        user_id: &str,
        id: &str,
        amount: Decimal,
    ) -> Result<Budget> {
        let req = self
            .table_request(
                Method::PATCH,
                TABLE_BUDGETS,
                &[Self::by_id(id), Self::owner(user_id)],
            )?
            .json(&serde_json::json!({ "amount": amount }));
        Self::send_single(req, "update budget").await
    }

    // ===== Settings =====

    /// Insert the settings row on first save, update it afterwards
    pub async fn save_settings(&self, settings: &UserSettings) -> Result<UserSettings> {
        let cutoff = settings.cutoff_day();
        match settings.id.as_deref() {
            Some(id) => {
                let req = self
                    .table_request(
                        Method::PATCH,
                        TABLE_SETTINGS,
                        &[Self::by_id(id), Self::owner(&settings.user_id)],
                    )?
                    .json(&serde_json::json!({ "monthly_cutoff_day": cutoff }));
                Self::send_single(req, "update settings").await
            }
            None => {
                let req = self
                    .table_request(Method::POST, TABLE_SETTINGS, &[])?
                    .json(&SettingsInsert {
                        user_id: &settings.user_id,
                        monthly_cutoff_day: cutoff,
                    });
                Self::send_single(req, "insert settings").await
            }
        }
    }

    // ===== Auth =====

    /// Ask the backend to email a one-time code / magic link
    pub async fn send_otp(&self, email: &str, redirect_to: Option<&str>) -> Result<()> {
        let mut req = self
            .client
            .post(self.auth_url("otp"))
            .headers(self.auth_headers()?)
            .json(&serde_json::json!({ "email": email, "create_user": true }));
        if let Some(redirect) = redirect_to {
            req = req.query(&[("redirect_to", redirect)]);
        }
        let response = req
            .send()
            .await
            .map_err(ApiError::from)
            .context("Failed to send sign-in email request")?;
        Self::check_response(response).await?;
        info!("Sign-in email requested");
        Ok(())
    }

    /// Exchange the emailed code for a session
    pub async fn verify_otp(&self, email: &str, code: &str) -> Result<SessionData> {
        let req = self
            .client
            .post(self.auth_url("verify"))
            .headers(self.auth_headers()?)
            .json(&serde_json::json!({ "type": "email", "email": email, "token": code }));
        let auth: AuthResponse = Self::send_json(req, "verify code").await?;
        Ok(auth.into_session())
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> Result<SessionData> {
        let req = self
            .client
            .post(self.auth_url("token"))
            .headers(self.auth_headers()?)
            .query(&[("grant_type", "refresh_token")])
            .json(&serde_json::json!({ "refresh_token": refresh_token }));
        let auth: AuthResponse = Self::send_json(req, "refresh session").await?;
        debug!("Session refreshed");
        Ok(auth.into_session())
    }

    pub async fn logout(&self) -> Result<()> {
        let response = self
            .client
            .post(self.auth_url("logout"))
            .headers(self.auth_headers()?)
            .send()
            .await
            .map_err(ApiError::from)
            .context("Failed to send logout request")?;
        Self::check_response(response).await?;
        Ok(())
    }
}
