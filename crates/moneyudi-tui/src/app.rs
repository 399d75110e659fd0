//! Application state management for MoneYudi.
//!
//! This module contains the `App` struct that owns all UI state, the ledger,
//! the session and the background task channel. Remote calls run in spawned
//! tasks and report back as `BackgroundResult` values that are applied on
//! the event loop.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, Utc};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use moneyudi_core::api::{ApiClient, ApiError};
use moneyudi_core::auth::{CredentialStore, Session, SessionData};
use moneyudi_core::cache::{CacheManager, CachedData};
use moneyudi_core::config::Config;
use moneyudi_core::ledger::{
    self, BudgetWrite, Ledger, LedgerSnapshot, TransactionDraft, ValidationError,
    DATETIME_INPUT_FORMAT,
};
use moneyudi_core::models::category::{CATEGORY_ICONS, DEFAULT_ICON};
use moneyudi_core::models::{
    Budget, Category, CategoryPatch, CategoryScope, Transaction, TxKind, UserSettings, VocabCard,
};
use moneyudi_core::notify::{self, NotificationBus};
use moneyudi_core::period::{CutoffOverflow, DateRange, PeriodError, ReportMode};
use moneyudi_core::reports::{self, BudgetProgress, DaySummary, HistoryFilter, PeriodSummary};
use moneyudi_core::utils::parse_amount_input;
use moneyudi_core::vocab::{run_auto_refresh, HttpVocabSource, VocabPanel, VocabService};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel
const CHANNEL_BUFFER_SIZE: usize = 32;

pub const MAX_EMAIL_LENGTH: usize = 100;
pub const MAX_CODE_LENGTH: usize = 10;
const MAX_TEXT_LENGTH: usize = 60;
const MAX_AMOUNT_LENGTH: usize = 16;
const MAX_DATETIME_LENGTH: usize = 16;

/// Number of rows to move on page up/down
pub const PAGE_SCROLL_SIZE: usize = 10;

// ============================================================================
// UI State Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Today,
    Reports,
    Budgets,
    Settings,
}

impl Tab {
    pub fn title(&self) -> &'static str {
        match self {
            Tab::Today => "Today",
            Tab::Reports => "Reports",
            Tab::Budgets => "Budgets",
            Tab::Settings => "Settings",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Tab::Today => Tab::Reports,
            Tab::Reports => Tab::Budgets,
            Tab::Budgets => Tab::Settings,
            Tab::Settings => Tab::Today,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            Tab::Today => Tab::Settings,
            Tab::Reports => Tab::Today,
            Tab::Budgets => Tab::Reports,
            Tab::Settings => Tab::Budgets,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    LoggingIn,
    Editing,
    ShowingHelp,
    ConfirmingDelete,
    ConfirmingQuit,
    Quitting,
}

/// Email sign-in happens in two steps: request a code, then enter it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStep {
    Email,
    Code,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportsView {
    Summary,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxField {
    Amount,
    Kind,
    Category,
    Note,
    Date,
}

impl TxField {
    pub fn next(self) -> Self {
        match self {
            TxField::Amount => TxField::Kind,
            TxField::Kind => TxField::Category,
            TxField::Category => TxField::Note,
            TxField::Note => TxField::Date,
            TxField::Date => TxField::Amount,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            TxField::Amount => TxField::Date,
            TxField::Kind => TxField::Amount,
            TxField::Category => TxField::Kind,
            TxField::Note => TxField::Category,
            TxField::Date => TxField::Note,
        }
    }
}

/// Quick-add form on the Today screen
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionForm {
    pub amount: String,
    pub kind: TxKind,
    pub category_id: Option<String>,
    pub note: String,
    /// Local wall-clock time, `YYYY-MM-DD HH:MM`
    pub date: String,
    pub field: TxField,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryForm {
    pub name: String,
    pub icon: usize,
    pub scope: CategoryScope,
}

impl CategoryForm {
    pub fn icon(&self) -> &'static str {
        CATEGORY_ICONS.get(self.icon).copied().unwrap_or(DEFAULT_ICON)
    }
}

/// The single input currently open
#[derive(Debug, Clone, PartialEq)]
pub enum Editor {
    Transaction(TransactionForm),
    NewCategory(CategoryForm),
    RenameCategory { id: String, name: String },
    BudgetAmount { category_id: String, input: String },
    CutoffDay(String),
    HistoryQuery(String),
    HistoryFrom(String),
    HistoryTo(String),
}

impl Editor {
    pub fn title(&self) -> &'static str {
        match self {
            Editor::Transaction(_) => "Add transaction",
            Editor::NewCategory(_) => "New category",
            Editor::RenameCategory { .. } => "Rename category",
            Editor::BudgetAmount { .. } => "Monthly budget",
            Editor::CutoffDay(_) => "Billing cutoff day (1-31)",
            Editor::HistoryQuery(_) => "Search notes and categories",
            Editor::HistoryFrom(_) => "From date (YYYY-MM-DD, empty to clear)",
            Editor::HistoryTo(_) => "To date (YYYY-MM-DD, empty to clear)",
        }
    }

    /// The text field keystrokes go to, if any
    pub fn text_mut(&mut self) -> Option<(&mut String, usize)> {
        match self {
            Editor::Transaction(form) => match form.field {
                TxField::Amount => Some((&mut form.amount, MAX_AMOUNT_LENGTH)),
                TxField::Note => Some((&mut form.note, MAX_TEXT_LENGTH)),
                TxField::Date => Some((&mut form.date, MAX_DATETIME_LENGTH)),
                TxField::Kind | TxField::Category => None,
            },
            Editor::NewCategory(form) => Some((&mut form.name, MAX_TEXT_LENGTH)),
            Editor::RenameCategory { name, .. } => Some((name, MAX_TEXT_LENGTH)),
            Editor::BudgetAmount { input, .. } => Some((input, MAX_AMOUNT_LENGTH)),
            Editor::CutoffDay(input) => Some((input, 2)),
            Editor::HistoryQuery(input) => Some((input, MAX_TEXT_LENGTH)),
            Editor::HistoryFrom(input) | Editor::HistoryTo(input) => Some((input, 10)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingDelete {
    Transaction(String),
    Category(String),
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results sent from spawned tasks back to the event loop
#[derive(Debug)]
pub enum BackgroundResult {
    SnapshotLoaded(LedgerSnapshot),
    TransactionSaved(Transaction),
    TransactionDeleted(String),
    CategorySaved(Category),
    CategoryDeleted(String),
    BudgetSaved(Budget),
    SettingsSaved(UserSettings),
    OtpSent(String),
    SignedIn(SessionData),
    SessionRefreshed(SessionData),
    VocabLoaded(CachedData<VocabCard>),
    Failed {
        action: &'static str,
        message: String,
        auth_expired: bool,
    },
}

impl BackgroundResult {
    fn failed(action: &'static str, e: &anyhow::Error) -> Self {
        let (message, auth_expired) = describe_error(action, e);
        BackgroundResult::Failed {
            action,
            message,
            auth_expired,
        }
    }
}

/// Turn an error into a short message for a toast
fn describe_error(action: &str, e: &anyhow::Error) -> (String, bool) {
    match e.downcast_ref::<ApiError>() {
        Some(ApiError::Unauthorized) => ("Session expired. Please sign in again.".to_string(), true),
        Some(ApiError::RateLimited) => (
            "Server is busy. Please wait a moment and try again.".to_string(),
            false,
        ),
        Some(ApiError::NetworkError(_)) => {
            ("Network error. Check your connection.".to_string(), false)
        }
        _ => (format!("Failed to {}: {}", action, e), false),
    }
}

/// Printable, non-control characters up to `max` chars
pub fn can_add_char(current_len: usize, c: char, max: usize) -> bool {
    current_len < max && !c.is_control()
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    pub config: Config,
    pub session: Session,
    api: Option<ApiClient>,
    pub cache: CacheManager,
    vocab: Arc<VocabService<HttpVocabSource>>,

    pub ledger: Ledger,
    pub notifications: NotificationBus,
    pub vocab_panel: VocabPanel,
    pub synced_at: Option<DateTime<Utc>>,
    pub loading: bool,

    // UI State
    pub state: AppState,
    pub current_tab: Tab,
    pub editor: Option<Editor>,
    pub pending_delete: Option<PendingDelete>,

    // Login form state
    pub login_email: String,
    pub login_code: String,
    pub login_step: LoginStep,
    pub login_error: Option<String>,
    pub login_busy: bool,

    // Selection indices
    pub today_selection: usize,
    pub history_selection: usize,
    pub budget_selection: usize,
    pub category_selection: usize,

    // Reports state
    pub report_mode: ReportMode,
    pub report_date: NaiveDate,
    pub reports_view: ReportsView,
    pub history_filter: HistoryFilter,

    // Background task channels
    result_rx: mpsc::Receiver<BackgroundResult>,
    result_tx: mpsc::Sender<BackgroundResult>,
    vocab_rx: Option<mpsc::Receiver<CachedData<VocabCard>>>,
}

impl App {
    pub fn new() -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };
        let cache_dir = config
            .cache_dir()
            .unwrap_or_else(|_| PathBuf::from("./cache"));
        debug!(?cache_dir, "Cache directory configured");
        Self::with_config(config, cache_dir)
    }

    pub fn with_config(config: Config, cache_dir: PathBuf) -> Result<Self> {
        let mut session = Session::new(cache_dir.clone());
        if let Err(e) = session.load() {
            warn!(error = %e, "Ignoring unreadable session");
        }

        let api = match config.backend() {
            Some((url, key)) => {
                let mut api = ApiClient::new(url, key)?;
                if let Some(ref data) = session.data {
                    if !data.is_expired() {
                        api.set_token(data.access_token.clone());
                    }
                }
                Some(api)
            }
            None => {
                warn!("Backend URL or anon key missing");
                None
            }
        };

        let cache = CacheManager::new(cache_dir.clone())?;
        let vocab = Arc::new(VocabService::new(
            HttpVocabSource::new()?,
            CacheManager::new(cache_dir)?,
            &config.vocab_target_lang,
        ));
        let vocab_panel = VocabPanel::from_cache(vocab.cached());

        let ledger = Ledger::new(session.user_id().unwrap_or_default());
        let login_email = session
            .email()
            .map(str::to_string)
            .or_else(|| config.last_email.clone())
            .unwrap_or_default();

        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        Ok(Self {
            config,
            session,
            api,
            cache,
            vocab,

            ledger,
            notifications: NotificationBus::default(),
            vocab_panel,
            synced_at: None,
            loading: false,

            state: AppState::Normal,
            current_tab: Tab::Today,
            editor: None,
            pending_delete: None,

            login_email,
            login_code: String::new(),
            login_step: LoginStep::Email,
            login_error: None,
            login_busy: false,

            today_selection: 0,
            history_selection: 0,
            budget_selection: 0,
            category_selection: 0,

            report_mode: ReportMode::default(),
            report_date: Local::now().date_naive(),
            reports_view: ReportsView::Summary,
            history_filter: HistoryFilter::default(),

            result_rx: rx,
            result_tx: tx,
            vocab_rx: None,
        })
    }

    // =========================================================================
    // Startup
    // =========================================================================

    /// Show cached data, then sign in or refresh from the backend
    pub fn start(&mut self) {
        tokio::spawn(notify::log_notifications(self.notifications.subscribe()));
        self.load_from_cache();

        match self.session.data.clone() {
            Some(data) if !data.is_expired() && !data.needs_refresh() => self.refresh_ledger(),
            Some(data) if data.can_refresh() => self.refresh_session(data.refresh_token),
            _ => self.start_login(),
        }

        self.start_vocab();
    }

    pub fn load_from_cache(&mut self) {
        let Some(user_id) = self.session.user_id().map(str::to_string) else {
            return;
        };
        match self.cache.load_snapshot(&user_id) {
            Ok(Some(cached)) => {
                debug!(age = %cached.age_display(), "Showing cached ledger");
                self.synced_at = Some(cached.cached_at);
                self.ledger = Ledger::from_snapshot(&user_id, cached.data);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to load cached ledger"),
        }
    }

    /// Load the card (cached if fresh) and keep it fresh in the background
    fn start_vocab(&mut self) {
        let service = Arc::clone(&self.vocab);
        let tx = self.result_tx.clone();
        tokio::spawn(async move {
            let card = service.load(Utc::now()).await;
            send_result(&tx, BackgroundResult::VocabLoaded(card)).await;
        });

        let (vocab_tx, vocab_rx) = mpsc::channel(4);
        tokio::spawn(run_auto_refresh(Arc::clone(&self.vocab), vocab_tx));
        self.vocab_rx = Some(vocab_rx);
    }

    pub fn refresh_vocab(&mut self) {
        let service = Arc::clone(&self.vocab);
        let tx = self.result_tx.clone();
        tokio::spawn(async move {
            let card = service.refresh().await;
            send_result(&tx, BackgroundResult::VocabLoaded(card)).await;
        });
        self.notifications.info("Fetching a new word...");
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub fn is_authenticated(&self) -> bool {
        self.session.data.is_some()
    }

    pub fn start_login(&mut self) {
        self.state = AppState::LoggingIn;
        self.login_step = LoginStep::Email;
        self.login_code.clear();
        self.login_error = None;
        self.login_busy = false;
    }

    pub fn send_login_code(&mut self) {
        let email = match ledger::validate_email(&self.login_email) {
            Ok(email) => email,
            Err(e) => {
                self.login_error = Some(e.to_string());
                return;
            }
        };
        self.login_error = None;
        self.login_busy = true;
        self.spawn_remote("send sign-in email", move |api| async move {
            api.send_otp(&email, None).await?;
            Ok(BackgroundResult::OtpSent(email))
        });
    }

    pub fn verify_login_code(&mut self) {
        let code = match ledger::validate_code(&self.login_code) {
            Ok(code) => code,
            Err(e) => {
                self.login_error = Some(e.to_string());
                return;
            }
        };
        let email = self.login_email.trim().to_string();
        self.login_error = None;
        self.login_busy = true;
        self.spawn_remote("verify code", move |api| async move {
            let session = api.verify_otp(&email, &code).await?;
            Ok(BackgroundResult::SignedIn(session))
        });
    }

    fn refresh_session(&mut self, refresh_token: String) {
        let refresh_token = if refresh_token.is_empty() {
            self.session
                .email()
                .and_then(|email| CredentialStore::refresh_token(email).ok())
                .unwrap_or_default()
        } else {
            refresh_token
        };
        if refresh_token.is_empty() {
            self.start_login();
            return;
        }
        self.spawn_remote("refresh session", move |api| async move {
            let session = api.refresh_session(&refresh_token).await?;
            Ok(BackgroundResult::SessionRefreshed(session))
        });
    }

    fn apply_session(&mut self, data: SessionData) {
        if let Some(ref email) = data.email {
            if !data.refresh_token.is_empty() {
                if let Err(e) = CredentialStore::store_refresh_token(email, &data.refresh_token) {
                    warn!(error = %e, "Failed to store refresh token");
                }
            }
        }
        if let Some(api) = self.api.as_mut() {
            api.set_token(data.access_token.clone());
        }
        if self.ledger.user_id != data.user_id {
            self.ledger = Ledger::new(&data.user_id);
        }
        self.session.update(data);
        if let Err(e) = self.session.save() {
            warn!(error = %e, "Failed to save session");
        }
    }

    pub fn logout(&mut self) {
        if let Some(api) = self.api.clone() {
            tokio::spawn(async move {
                if let Err(e) = api.logout().await {
                    debug!(error = %e, "Logout request failed");
                }
            });
        }
        if let Some(email) = self.session.email().map(str::to_string) {
            if let Err(e) = CredentialStore::delete(&email) {
                debug!(error = %e, "No stored refresh token to delete");
            }
        }
        if let Err(e) = self.cache.clear_snapshot(&self.ledger.user_id) {
            warn!(error = %e, "Failed to clear cached ledger");
        }
        if let Err(e) = self.session.clear() {
            warn!(error = %e, "Failed to clear session");
        }
        if let Some(api) = self.api.as_mut() {
            api.clear_token();
        }
        self.ledger = Ledger::new("");
        self.synced_at = None;
        info!("Signed out");
        self.start_login();
    }

    // =========================================================================
    // Background work
    // =========================================================================

    /// Run `job` against the backend in a spawned task. Its result, or a
    /// `Failed` describing the error, comes back through the channel.
    fn spawn_remote<F, Fut>(&mut self, action: &'static str, job: F)
    where
        F: FnOnce(ApiClient) -> Fut + Send + 'static,
        Fut: Future<Output = Result<BackgroundResult>> + Send + 'static,
    {
        let Some(api) = self.api.clone() else {
            self.login_busy = false;
            self.notifications.error(ApiError::NotConfigured.to_string());
            return;
        };
        let tx = self.result_tx.clone();
        tokio::spawn(async move {
            let result = match job(api).await {
                Ok(result) => result,
                Err(e) => {
                    error!(action, error = %e, "Background task failed");
                    BackgroundResult::failed(action, &e)
                }
            };
            send_result(&tx, result).await;
        });
    }

    pub fn refresh_ledger(&mut self) {
        let Some(user_id) = self.session.user_id().map(str::to_string) else {
            self.start_login();
            return;
        };
        info!("Refreshing ledger");
        self.loading = true;
        self.spawn_remote("load data", move |api| async move {
            let snapshot = api.fetch_snapshot(&user_id).await?;
            Ok(BackgroundResult::SnapshotLoaded(snapshot))
        });
    }

    /// Drain finished background work and expire old toasts
    pub fn check_background_tasks(&mut self) {
        while let Ok(result) = self.result_rx.try_recv() {
            self.process_result(result);
        }

        let mut cards = Vec::new();
        if let Some(rx) = self.vocab_rx.as_mut() {
            while let Ok(card) = rx.try_recv() {
                cards.push(card);
            }
        }
        for card in cards {
            self.vocab_panel.apply(card);
        }

        self.notifications.expire(Instant::now());
    }

    pub fn process_result(&mut self, result: BackgroundResult) {
        match result {
            BackgroundResult::SnapshotLoaded(snapshot) => {
                self.loading = false;
                if let Err(e) = self.cache.save_snapshot(&self.ledger.user_id, &snapshot) {
                    warn!(error = %e, "Failed to cache ledger");
                }
                self.ledger.replace(snapshot);
                self.synced_at = Some(Utc::now());
                self.clamp_selections();
            }
            BackgroundResult::TransactionSaved(tx) => {
                self.ledger.apply_transaction(tx);
                self.persist_snapshot();
                self.notifications.success("Transaction saved");
            }
            BackgroundResult::TransactionDeleted(id) => {
                self.ledger.remove_transaction(&id);
                self.persist_snapshot();
                self.clamp_selections();
                self.notifications.success("Transaction deleted");
            }
            BackgroundResult::CategorySaved(category) => {
                self.ledger.apply_category(category);
                self.persist_snapshot();
                self.notifications.success("Category saved");
            }
            BackgroundResult::CategoryDeleted(id) => {
                self.ledger.remove_category(&id);
                self.persist_snapshot();
                self.clamp_selections();
                self.notifications.success("Category deleted");
            }
            BackgroundResult::BudgetSaved(budget) => {
                self.ledger.apply_budget(budget);
                self.persist_snapshot();
                self.notifications.success("Budget saved");
            }
            BackgroundResult::SettingsSaved(settings) => {
                self.ledger.apply_settings(settings);
                self.persist_snapshot();
                self.notifications.success("Settings saved");
            }
            BackgroundResult::OtpSent(email) => {
                self.login_busy = false;
                self.login_step = LoginStep::Code;
                self.config.last_email = Some(email.clone());
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                self.notifications.info(format!("Code sent to {}", email));
            }
            BackgroundResult::SignedIn(data) => {
                info!("Signed in");
                self.login_busy = false;
                self.login_code.clear();
                self.apply_session(data);
                self.state = AppState::Normal;
                self.load_from_cache();
                self.refresh_ledger();
                self.notifications.success("Signed in");
            }
            BackgroundResult::SessionRefreshed(data) => {
                self.apply_session(data);
                self.refresh_ledger();
            }
            BackgroundResult::VocabLoaded(card) => {
                self.vocab_panel.apply(card);
            }
            BackgroundResult::Failed {
                action,
                message,
                auth_expired,
            } => {
                debug!(action, "Showing failure");
                self.loading = false;
                if self.state == AppState::LoggingIn || self.login_busy {
                    self.login_busy = false;
                    self.login_error = Some(message);
                } else if auth_expired {
                    self.notifications.error(message);
                    self.start_login();
                } else {
                    self.notifications.error(message);
                }
            }
        }
    }

    fn persist_snapshot(&self) {
        if let Err(e) = self
            .cache
            .save_snapshot(&self.ledger.user_id, &self.ledger.snapshot())
        {
            warn!(error = %e, "Failed to cache ledger");
        }
    }

    fn clamp_selections(&mut self) {
        let today = self.today_summary().latest().len();
        let history = self.history().len();
        let budgets = self.budget_overview().len();
        let categories = self.ledger.categories.len();
        self.today_selection = self.today_selection.min(today.saturating_sub(1));
        self.history_selection = self.history_selection.min(history.saturating_sub(1));
        self.budget_selection = self.budget_selection.min(budgets.saturating_sub(1));
        self.category_selection = self.category_selection.min(categories.saturating_sub(1));
    }

    // =========================================================================
    // Derived views
    // =========================================================================

    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    pub fn today_summary(&self) -> DaySummary<'_> {
        reports::day_summary(&self.ledger.transactions, self.today(), &Local)
    }

    pub fn report_range(&self) -> Result<DateRange, PeriodError> {
        self.report_mode.range(
            self.report_date,
            self.ledger.cutoff_day(),
            self.config.cutoff_overflow,
        )
    }

    pub fn period_summary(&self) -> Option<PeriodSummary<'_>> {
        let range = self.report_range().ok()?;
        Some(reports::summarize_period(
            &self.ledger.transactions,
            &self.ledger.categories,
            &range,
            &Local,
        ))
    }

    pub fn history(&self) -> Vec<&Transaction> {
        self.history_filter
            .apply(&self.ledger.transactions, &self.ledger.categories, &Local)
    }

    /// The billing period containing today
    pub fn current_period(&self) -> Option<DateRange> {
        ReportMode::Custom
            .range(self.today(), self.ledger.cutoff_day(), self.config.cutoff_overflow)
            .ok()
    }

    pub fn budget_overview(&self) -> Vec<BudgetProgress<'_>> {
        match self.current_period() {
            Some(range) => reports::budget_overview(
                &self.ledger.categories,
                &self.ledger.budgets,
                &self.ledger.transactions,
                &range,
                &Local,
            ),
            None => Vec::new(),
        }
    }

    pub fn category_name(&self, id: Option<&str>) -> String {
        id.and_then(|id| self.ledger.category(id))
            .map(|c| c.display_name())
            .unwrap_or_else(|| format!("{} {}", reports::UNCATEGORIZED_ICON, reports::UNCATEGORIZED_NAME))
    }

    // =========================================================================
    // Editors
    // =========================================================================

    pub fn open_editor(&mut self, editor: Editor) {
        self.editor = Some(editor);
        self.state = AppState::Editing;
    }

    pub fn close_editor(&mut self) {
        self.editor = None;
        self.state = AppState::Normal;
    }

    pub fn open_transaction_form(&mut self) {
        let kind = TxKind::Expense;
        let form = TransactionForm {
            amount: String::new(),
            kind,
            category_id: self.ledger.default_category_for(kind, None),
            note: String::new(),
            date: Local::now().format(DATETIME_INPUT_FORMAT).to_string(),
            field: TxField::Amount,
        };
        self.open_editor(Editor::Transaction(form));
    }

    /// Left/right on the kind or category field
    pub fn cycle_form_choice(&mut self, forward: bool) {
        let Some(Editor::Transaction(form)) = self.editor.as_mut() else {
            return;
        };
        match form.field {
            TxField::Kind => {
                form.kind = form.kind.toggle();
                form.category_id = self
                    .ledger
                    .default_category_for(form.kind, form.category_id.as_deref());
            }
            TxField::Category => {
                let allowed = self.ledger.categories_for(form.kind);
                if allowed.is_empty() {
                    form.category_id = None;
                    return;
                }
                let pos = form
                    .category_id
                    .as_deref()
                    .and_then(|id| allowed.iter().position(|c| c.id == id));
                let len = allowed.len();
                let next = match (pos, forward) {
                    (None, _) => 0,
                    (Some(i), true) => (i + 1) % len,
                    (Some(i), false) => (i + len - 1) % len,
                };
                form.category_id = Some(allowed[next].id.clone());
            }
            TxField::Amount | TxField::Note | TxField::Date => {}
        }
    }

    /// Validate and send the open editor's contents. Validation failures
    /// keep the editor open and never reach the network.
    pub fn submit_editor(&mut self) {
        let Some(editor) = self.editor.clone() else {
            return;
        };
        match self.try_submit(editor) {
            Ok(()) => self.close_editor(),
            Err(e) => {
                self.notifications.error(e.to_string());
            }
        }
    }

    fn try_submit(&mut self, editor: Editor) -> Result<(), ValidationError> {
        let user_id = self.ledger.user_id.clone();
        match editor {
            Editor::Transaction(form) => {
                let draft = TransactionDraft {
                    amount: parse_amount_input(&form.amount),
                    kind: form.kind,
                    category_id: form.category_id,
                    note: form.note,
                    date: ledger::parse_datetime_input(&form.date, &Local)?,
                };
                let new_tx = draft.validate(&user_id)?;
                self.spawn_remote("save transaction", move |api| async move {
                    let tx = api.insert_transaction(&new_tx).await?;
                    Ok(BackgroundResult::TransactionSaved(tx))
                });
            }
            Editor::NewCategory(form) => {
                let new_category =
                    ledger::validate_new_category(&user_id, &form.name, form.icon(), form.scope)?;
                self.spawn_remote("save category", move |api| async move {
                    let category = api.insert_category(&new_category).await?;
                    Ok(BackgroundResult::CategorySaved(category))
                });
            }
            Editor::RenameCategory { id, name } => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(ValidationError::EmptyCategoryName);
                }
                self.update_category(
                    id,
                    CategoryPatch {
                        name: Some(name),
                        ..CategoryPatch::default()
                    },
                );
            }
            Editor::BudgetAmount { category_id, input } => {
                let amount = ledger::validate_budget_amount(parse_amount_input(&input))?;
                match self.ledger.plan_budget_write(&category_id, amount) {
                    BudgetWrite::Update { budget_id, amount } => {
                        self.spawn_remote("save budget", move |api| async move {
                            let budget = api.update_budget_amount(&user_id, &budget_id, amount).await?;
                            Ok(BackgroundResult::BudgetSaved(budget))
                        });
                    }
                    BudgetWrite::Insert(new_budget) => {
                        self.spawn_remote("save budget", move |api| async move {
                            let budget = api.insert_budget(&new_budget).await?;
                            Ok(BackgroundResult::BudgetSaved(budget))
                        });
                    }
                }
            }
            Editor::CutoffDay(input) => {
                let day = ledger::parse_cutoff_day(&input)?;
                let mut settings = self.ledger.settings.clone();
                settings.user_id = user_id;
                settings.monthly_cutoff_day = day;
                self.spawn_remote("save settings", move |api| async move {
                    let saved = api.save_settings(&settings).await?;
                    Ok(BackgroundResult::SettingsSaved(saved))
                });
            }
            Editor::HistoryQuery(query) => {
                self.history_filter.query = query.trim().to_string();
                self.history_selection = 0;
            }
            Editor::HistoryFrom(input) => {
                self.history_filter.from = parse_optional_date(&input)?;
                self.history_selection = 0;
            }
            Editor::HistoryTo(input) => {
                self.history_filter.to = parse_optional_date(&input)?;
                self.history_selection = 0;
            }
        }
        Ok(())
    }

    fn update_category(&mut self, id: String, patch: CategoryPatch) {
        let user_id = self.ledger.user_id.clone();
        self.spawn_remote("update category", move |api| async move {
            let category = api.update_category(&user_id, &id, &patch).await?;
            Ok(BackgroundResult::CategorySaved(category))
        });
    }

    pub fn selected_category(&self) -> Option<&Category> {
        self.ledger.categories.get(self.category_selection)
    }

    pub fn cycle_selected_category_icon(&mut self) {
        if let Some(category) = self.selected_category() {
            let id = category.id.clone();
            let icon = category.next_icon().to_string();
            self.update_category(
                id,
                CategoryPatch {
                    icon: Some(icon),
                    ..CategoryPatch::default()
                },
            );
        }
    }

    pub fn cycle_selected_category_scope(&mut self) {
        if let Some(category) = self.selected_category() {
            let id = category.id.clone();
            let scope = category.scope.next();
            self.update_category(
                id,
                CategoryPatch {
                    scope: Some(scope),
                    ..CategoryPatch::default()
                },
            );
        }
    }

    /// Switch how a cutoff past the end of a short month is handled
    pub fn toggle_cutoff_overflow(&mut self) {
        self.config.cutoff_overflow = match self.config.cutoff_overflow {
            CutoffOverflow::RollForward => CutoffOverflow::Clamp,
            CutoffOverflow::Clamp => CutoffOverflow::RollForward,
        };
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    /// Step the history category filter through all categories and "any"
    pub fn cycle_history_category(&mut self) {
        let ids: Vec<&str> = self.ledger.categories.iter().map(|c| c.id.as_str()).collect();
        let current = self.history_filter.category_id.as_deref();
        let next = match current.and_then(|id| ids.iter().position(|c| *c == id)) {
            None => ids.first().map(|s| s.to_string()),
            Some(i) => ids.get(i + 1).map(|s| s.to_string()),
        };
        self.history_filter.category_id = next;
        self.history_selection = 0;
    }

    // =========================================================================
    // Deletes
    // =========================================================================

    pub fn request_delete(&mut self, target: PendingDelete) {
        self.pending_delete = Some(target);
        self.state = AppState::ConfirmingDelete;
    }

    pub fn confirm_delete(&mut self) {
        self.state = AppState::Normal;
        let Some(target) = self.pending_delete.take() else {
            return;
        };
        let user_id = self.ledger.user_id.clone();
        match target {
            PendingDelete::Transaction(id) => {
                self.spawn_remote("delete transaction", move |api| async move {
                    api.delete_transaction(&user_id, &id).await?;
                    Ok(BackgroundResult::TransactionDeleted(id))
                });
            }
            PendingDelete::Category(id) => {
                self.spawn_remote("delete category", move |api| async move {
                    api.delete_category(&user_id, &id).await?;
                    Ok(BackgroundResult::CategoryDeleted(id))
                });
            }
        }
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
        self.state = AppState::Normal;
    }

    /// Human-readable description of what is about to be deleted
    pub fn pending_delete_label(&self) -> Option<String> {
        match self.pending_delete.as_ref()? {
            PendingDelete::Transaction(id) => self
                .ledger
                .transactions
                .iter()
                .find(|t| &t.id == id)
                .map(|t| {
                    format!(
                        "{} {}",
                        moneyudi_core::utils::format_idr(t.amount),
                        self.category_name(t.category_id.as_deref())
                    )
                }),
            PendingDelete::Category(id) => self.ledger.category(id).map(|c| c.display_name()),
        }
    }
}

fn parse_optional_date(input: &str) -> Result<Option<NaiveDate>, ValidationError> {
    if input.trim().is_empty() {
        Ok(None)
    } else {
        ledger::parse_date_input(input).map(Some)
    }
}

async fn send_result(tx: &mpsc::Sender<BackgroundResult>, result: BackgroundResult) {
    if let Err(e) = tx.send(result).await {
        error!(error = %e, "Failed to send background result - channel closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use moneyudi_core::notify::NotificationKind;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn app() -> (TempDir, App) {
        let dir = TempDir::new().unwrap();
        let app = App::with_config(Config::default(), dir.path().to_path_buf()).unwrap();
        (dir, app)
    }

    fn category(id: &str, name: &str, scope: CategoryScope) -> Category {
        Category {
            id: id.to_string(),
            user_id: "u1".to_string(),
            name: name.to_string(),
            icon: DEFAULT_ICON.to_string(),
            scope,
        }
    }

    fn signed_in(app: &mut App) {
        app.ledger = Ledger::new("u1");
        app.ledger.apply_category(category("food", "Makan", CategoryScope::Expense));
        app.ledger.apply_category(category("salary", "Gaji", CategoryScope::Income));
    }

    fn last_toast(app: &App) -> Option<(NotificationKind, String)> {
        app.notifications
            .active()
            .last()
            .map(|n| (n.kind, n.message.clone()))
    }

    #[test]
    fn test_tab_next_prev_wrap() {
        assert_eq!(Tab::Today.next(), Tab::Reports);
        assert_eq!(Tab::Settings.next(), Tab::Today);
        assert_eq!(Tab::Today.prev(), Tab::Settings);
        assert_eq!(Tab::Budgets.prev(), Tab::Reports);
    }

    #[test]
    fn test_can_add_char() {
        assert!(can_add_char(0, 'a', 5));
        assert!(!can_add_char(5, 'a', 5));
        assert!(!can_add_char(0, '\n', 5));
    }

    #[test]
    fn test_editor_text_target_follows_field() {
        let mut editor = Editor::Transaction(TransactionForm {
            amount: String::new(),
            kind: TxKind::Expense,
            category_id: None,
            note: String::new(),
            date: String::new(),
            field: TxField::Kind,
        });
        assert!(editor.text_mut().is_none());
        if let Editor::Transaction(form) = &mut editor {
            form.field = TxField::Note;
        }
        assert_eq!(editor.text_mut().map(|(_, max)| max), Some(MAX_TEXT_LENGTH));
        if let Editor::Transaction(form) = &mut editor {
            form.field = form.field.next();
        }
        assert_eq!(editor.text_mut().map(|(_, max)| max), Some(MAX_DATETIME_LENGTH));
    }

    #[test]
    fn test_form_kind_switch_moves_category() {
        let (_dir, mut app) = app();
        signed_in(&mut app);
        app.open_transaction_form();
        if let Some(Editor::Transaction(form)) = app.editor.as_mut() {
            assert_eq!(form.category_id.as_deref(), Some("food"));
            form.field = TxField::Kind;
        }
        app.cycle_form_choice(true);
        match app.editor.as_ref() {
            Some(Editor::Transaction(form)) => {
                assert_eq!(form.kind, TxKind::Income);
                assert_eq!(form.category_id.as_deref(), Some("salary"));
            }
            other => panic!("unexpected editor {:?}", other),
        }
    }

    #[test]
    fn test_invalid_amount_stays_local() {
        let (_dir, mut app) = app();
        signed_in(&mut app);
        app.open_transaction_form();
        app.submit_editor();

        assert_eq!(app.state, AppState::Editing);
        assert!(app.ledger.transactions.is_empty());
        assert_eq!(
            last_toast(&app),
            Some((
                NotificationKind::Error,
                "Amount must be greater than 0".to_string()
            ))
        );
    }

    #[test]
    fn test_form_date_defaults_to_now_and_rejects_garbage() {
        let (_dir, mut app) = app();
        signed_in(&mut app);
        app.open_transaction_form();
        if let Some(Editor::Transaction(form)) = app.editor.as_mut() {
            assert!(ledger::parse_datetime_input(&form.date, &Local).is_ok());
            form.amount = "25.000".to_string();
            form.date = "kemarin".to_string();
        }
        app.submit_editor();

        assert_eq!(app.state, AppState::Editing);
        assert_eq!(
            last_toast(&app),
            Some((
                NotificationKind::Error,
                "Invalid date 'kemarin', expected YYYY-MM-DD HH:MM".to_string()
            ))
        );
    }

    #[test]
    fn test_valid_submit_without_backend_reports_error() {
        let (_dir, mut app) = app();
        signed_in(&mut app);
        app.open_transaction_form();
        if let Some(Editor::Transaction(form)) = app.editor.as_mut() {
            form.amount = "25.000".to_string();
        }
        app.submit_editor();

        // Validation passed, so the form closes; no backend is configured
        assert_eq!(app.state, AppState::Normal);
        assert!(app.ledger.transactions.is_empty());
        assert!(matches!(last_toast(&app), Some((NotificationKind::Error, _))));
    }

    #[test]
    fn test_history_editors_update_filter() {
        let (_dir, mut app) = app();
        app.open_editor(Editor::HistoryFrom("2024-07-01".to_string()));
        app.submit_editor();
        assert_eq!(app.history_filter.from, NaiveDate::from_ymd_opt(2024, 7, 1));

        app.open_editor(Editor::HistoryTo("July".to_string()));
        app.submit_editor();
        assert_eq!(app.state, AppState::Editing);
        assert!(app.history_filter.to.is_none());

        app.open_editor(Editor::HistoryFrom(String::new()));
        app.submit_editor();
        assert!(app.history_filter.from.is_none());
    }

    #[test]
    fn test_cycle_history_category() {
        let (_dir, mut app) = app();
        signed_in(&mut app);
        // Categories are ordered by name: Gaji, Makan
        app.cycle_history_category();
        assert_eq!(app.history_filter.category_id.as_deref(), Some("salary"));
        app.cycle_history_category();
        assert_eq!(app.history_filter.category_id.as_deref(), Some("food"));
        app.cycle_history_category();
        assert!(app.history_filter.category_id.is_none());
    }

    #[test]
    fn test_saved_rows_reconcile_into_ledger() {
        let (_dir, mut app) = app();
        signed_in(&mut app);
        let tx = Transaction {
            id: "t1".to_string(),
            user_id: "u1".to_string(),
            date: Utc.with_ymd_and_hms(2024, 7, 10, 3, 0, 0).unwrap(),
            amount: Decimal::from(25_000),
            kind: TxKind::Expense,
            category_id: Some("food".to_string()),
            note: None,
        };
        app.process_result(BackgroundResult::TransactionSaved(tx.clone()));
        app.process_result(BackgroundResult::TransactionSaved(tx));
        assert_eq!(app.ledger.transactions.len(), 1);
        assert_eq!(
            last_toast(&app),
            Some((NotificationKind::Success, "Transaction saved".to_string()))
        );

        app.process_result(BackgroundResult::TransactionDeleted("t1".to_string()));
        assert!(app.ledger.transactions.is_empty());
    }

    #[test]
    fn test_failure_leaves_ledger_and_shows_toast() {
        let (_dir, mut app) = app();
        signed_in(&mut app);
        app.process_result(BackgroundResult::Failed {
            action: "save budget",
            message: "Failed to save budget: boom".to_string(),
            auth_expired: false,
        });
        assert_eq!(app.ledger.categories.len(), 2);
        assert_eq!(app.state, AppState::Normal);
        assert!(matches!(last_toast(&app), Some((NotificationKind::Error, _))));
    }

    #[test]
    fn test_expired_auth_opens_login() {
        let (_dir, mut app) = app();
        app.process_result(BackgroundResult::Failed {
            action: "load data",
            message: "Session expired. Please sign in again.".to_string(),
            auth_expired: true,
        });
        assert_eq!(app.state, AppState::LoggingIn);
    }

    #[test]
    fn test_login_errors_stay_in_overlay() {
        let (_dir, mut app) = app();
        app.start_login();
        app.login_email = "  ".to_string();
        app.send_login_code();
        assert_eq!(app.login_error.as_deref(), Some("Email cannot be empty"));

        app.process_result(BackgroundResult::Failed {
            action: "verify code",
            message: "Failed to verify code: invalid".to_string(),
            auth_expired: false,
        });
        assert_eq!(app.state, AppState::LoggingIn);
        assert!(app.login_error.as_deref().unwrap_or("").contains("invalid"));
    }

    #[test]
    fn test_describe_error() {
        let e: anyhow::Error = ApiError::Unauthorized.into();
        assert!(describe_error("load data", &e).1);
        let e: anyhow::Error = ApiError::RateLimited.into();
        assert!(describe_error("load data", &e).0.contains("busy"));
        let e = anyhow::anyhow!("boom");
        assert_eq!(describe_error("load data", &e).0, "Failed to load data: boom");
    }

    #[test]
    fn test_pending_delete_label() {
        let (_dir, mut app) = app();
        signed_in(&mut app);
        app.request_delete(PendingDelete::Category("food".to_string()));
        assert_eq!(app.state, AppState::ConfirmingDelete);
        assert_eq!(app.pending_delete_label().as_deref(), Some("🧾 Makan"));
        app.cancel_delete();
        assert!(app.pending_delete.is_none());
    }
}
