// In-memory collaborators for unit and HTTP tests

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use crate::auth::{
    error::AuthError,
    models::{NewUser, Role, User},
    repository::UserStore,
    service::AuthService,
    token::TokenService,
};
use crate::deadline::DeadlineExceeded;
use crate::loans::{
    error::LoanError,
    models::{Loan, LoanFilter, LoanStatus, SortOrder},
    repository::LoanStore,
    service::LoanService,
};
use crate::logs::{
    audit::AuditLogger,
    models::SystemLog,
    repository::{AuditSink, LogError},
};
use crate::notifications::{Notification, NotificationError, NotificationSender};
use crate::AppState;

pub const TEST_SECRET: &str = "test_secret_key_for_testing_purposes";
pub const TEST_BASE_URL: &str = "http://localhost:8080";

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl InMemoryUserStore {
    pub fn get(&self, username: &str) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned()
    }

    pub fn set_role(&self, username: &str, role: Role) {
        if let Some(user) = self.users.lock().unwrap().iter_mut().find(|u| u.username == username) {
            user.role = role;
        }
    }

    pub fn remove(&self, username: &str) {
        self.users.lock().unwrap().retain(|u| u.username != username);
    }

    pub fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert_user(&self, new_user: &NewUser) -> Result<User, AuthError> {
        let mut users = self.users.lock().unwrap();

        if users.iter().any(|u| u.email.eq_ignore_ascii_case(&new_user.email)) {
            return Err(AuthError::DuplicateEmail);
        }
        if users.iter().any(|u| u.username == new_user.username) {
            return Err(AuthError::DuplicateUsername);
        }

        let user = User {
            id: Uuid::new_v4(),
            first_name: new_user.first_name.clone(),
            last_name: new_user.last_name.clone(),
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            password_hash: new_user.password_hash.clone(),
            role: if users.is_empty() { Role::Admin } else { Role::User },
            is_active: false,
            created_at: Utc::now(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        Ok(self.get(username))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn activate(&self, username: &str) -> Result<bool, AuthError> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.username == username) {
            Some(user) => {
                user.is_active = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_password_hash(&self, username: &str, password_hash: &str) -> Result<bool, AuthError> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.username == username) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AuthError> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() < before)
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, AuthError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.role == role)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    /// Token at the end of the most recent link sent to `to`
    pub fn last_token_for(&self, to: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|n| n.to == to)
            .and_then(|n| n.link.rsplit('/').next().map(str::to_string))
    }
}

#[async_trait]
impl NotificationSender for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::Transport("mail relay unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryAuditSink {
    entries: Mutex<Vec<SystemLog>>,
}

impl InMemoryAuditSink {
    /// Entries in insertion order
    pub fn entries(&self) -> Vec<SystemLog> {
        self.entries.lock().unwrap().clone()
    }

    pub fn actions(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.action).collect()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(&self, entry: &SystemLog) -> Result<(), LogError> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<SystemLog>, LogError> {
        let mut logs = self.entries();
        logs.reverse();
        Ok(logs)
    }
}

pub struct FailingAuditSink;

#[async_trait]
impl AuditSink for FailingAuditSink {
    async fn record(&self, _entry: &SystemLog) -> Result<(), LogError> {
        Err(LogError::DatabaseError("audit table unavailable".to_string()))
    }

    async fn list(&self) -> Result<Vec<SystemLog>, LogError> {
        Err(LogError::DatabaseError("audit table unavailable".to_string()))
    }
}

pub struct SlowAuditSink;

#[async_trait]
impl AuditSink for SlowAuditSink {
    async fn record(&self, _entry: &SystemLog) -> Result<(), LogError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<SystemLog>, LogError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Err(LogError::Timeout(DeadlineExceeded {
            operation: "audit.list",
            elapsed_ms: 60_000,
        }))
    }
}

// ---------------------------------------------------------------------------
// Loans
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryLoanStore {
    loans: Mutex<Vec<Loan>>,
}

#[async_trait]
impl LoanStore for InMemoryLoanStore {
    async fn insert(&self, loan: &Loan) -> Result<Loan, LoanError> {
        self.loans.lock().unwrap().push(loan.clone());
        Ok(loan.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Loan>, LoanError> {
        Ok(self.loans.lock().unwrap().iter().find(|l| l.id == id).cloned())
    }

    async fn list(&self, filter: &LoanFilter) -> Result<Vec<Loan>, LoanError> {
        let mut loans: Vec<Loan> = self
            .loans
            .lock()
            .unwrap()
            .iter()
            .filter(|l| filter.status.map_or(true, |s| l.status == s))
            .cloned()
            .collect();
        loans.sort_by_key(|l| l.created_at);
        if filter.order == SortOrder::Desc {
            loans.reverse();
        }
        Ok(loans)
    }

    async fn update_status(&self, id: Uuid, status: LoanStatus) -> Result<Option<Loan>, LoanError> {
        let mut loans = self.loans.lock().unwrap();
        Ok(loans
            .iter_mut()
            .find(|l| l.id == id && (l.status == LoanStatus::Pending || l.status == status))
            .map(|loan| {
                loan.status = status;
                loan.updated_at = Utc::now();
                loan.clone()
            }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, LoanError> {
        let mut loans = self.loans.lock().unwrap();
        let before = loans.len();
        loans.retain(|l| l.id != id);
        Ok(loans.len() < before)
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Fully wired services over in-memory collaborators
pub struct TestHarness {
    pub users: Arc<InMemoryUserStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub audit_sink: Arc<InMemoryAuditSink>,
    pub tokens: Arc<TokenService>,
    pub auth: Arc<AuthService>,
    pub loan_service: Arc<LoanService>,
    pub audit: AuditLogger,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_audit_sink(Arc::new(InMemoryAuditSink::default()))
    }

    pub fn with_audit_sink(audit_sink: Arc<InMemoryAuditSink>) -> Self {
        let audit = AuditLogger::new(audit_sink.clone(), Duration::from_secs(1));
        Self::build(audit_sink, audit)
    }

    /// Harness whose audit writes always fail
    pub fn with_failing_audit() -> Self {
        let audit = AuditLogger::new(Arc::new(FailingAuditSink), Duration::from_secs(1));
        Self::build(Arc::new(InMemoryAuditSink::default()), audit)
    }

    fn build(audit_sink: Arc<InMemoryAuditSink>, audit: AuditLogger) -> Self {
        let users = Arc::new(InMemoryUserStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let loans = Arc::new(InMemoryLoanStore::default());
        let tokens = Arc::new(TokenService::new(TEST_SECRET));
        let timeout = Duration::from_secs(1);

        let auth = Arc::new(AuthService::new(
            users.clone(),
            notifier.clone(),
            audit.clone(),
            tokens.clone(),
            TEST_BASE_URL.to_string(),
            timeout,
        ));
        let loan_service = Arc::new(LoanService::new(loans.clone(), audit.clone(), timeout));

        Self {
            users,
            notifier,
            audit_sink,
            tokens,
            auth,
            loan_service,
            audit,
        }
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            auth_service: self.auth.clone(),
            token_service: self.tokens.clone(),
            loan_service: self.loan_service.clone(),
            audit: self.audit.clone(),
            cookie_secure: false,
        }
    }
}
