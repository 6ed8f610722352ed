#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use gigit::accounts::{AccountRegistry, RegisterRequest};
use gigit::api::AppState;
use gigit::catalog::seed::seed_skills;
use gigit::config::{AppConfig, EmailConfig, SessionConfig};
use gigit::database::models::{BusinessProfile, JobPost, JobType, LocationType, PaymentType, User, UserType, WorkerProfile};
use gigit::database::Database;
use gigit::email::{Mailer, OutgoingEmail, Postmaster};
use gigit::error::MarketplaceError;
use gigit::jobs::{JobBoard, JobInput};
use gigit::profiles::{BusinessProfiles, WorkerProfiles};
use gigit::storage::ObjectStore;

/// Lowest cost bcrypt accepts; keeps the suite fast.
pub const TEST_PASSWORD_COST: u32 = 4;
pub const TEST_PASSWORD: &str = "correct-horse-battery";
pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Setup an in-memory SQLite database with the skill catalog loaded
pub async fn setup_test_db() -> Database {
    let db = Database::new_in_memory().await.expect("Failed to create test database");
    seed_skills(db.pool()).await.expect("Failed to seed skills");
    db
}

pub fn registry(db: &Database) -> AccountRegistry {
    AccountRegistry::new(db.pool().clone(), TEST_PASSWORD_COST)
}

pub async fn create_worker(db: &Database, email: &str, first: &str, last: &str) -> (User, WorkerProfile) {
    let user = registry(db)
        .register(RegisterRequest {
            email: email.to_string(),
            password: TEST_PASSWORD.to_string(),
            user_type: UserType::Worker,
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            company_name: None,
        })
        .await
        .expect("Failed to register worker");

    let profile = WorkerProfiles::new(db.pool().clone())
        .require_by_user(&user.id)
        .await
        .expect("Worker profile should exist after registration");
    (user, profile)
}

pub async fn create_business(db: &Database, email: &str, company: &str) -> (User, BusinessProfile) {
    let user = registry(db)
        .register(RegisterRequest {
            email: email.to_string(),
            password: TEST_PASSWORD.to_string(),
            user_type: UserType::Business,
            first_name: None,
            last_name: None,
            company_name: Some(company.to_string()),
        })
        .await
        .expect("Failed to register business");

    let profile = BusinessProfiles::new(db.pool().clone())
        .require_by_user(&user.id)
        .await
        .expect("Business profile should exist after registration");
    (user, profile)
}

/// A publishable individual, hourly, on-site posting.
pub fn job_input(title: &str) -> JobInput {
    JobInput {
        title: title.to_string(),
        description: format!("{} needed for a short engagement", title),
        job_type: Some(JobType::Individual),
        payment_type: Some(PaymentType::Hourly),
        location_type: Some(LocationType::OnSite),
        budget_min: Some(25.0),
        budget_max: Some(40.0),
        job_location_city: Some("Austin".to_string()),
        job_location_state: Some("TX".to_string()),
        publish: true,
        ..JobInput::default()
    }
}

pub async fn post_job(db: &Database, business: &BusinessProfile, input: JobInput) -> JobPost {
    JobBoard::new(db.pool().clone())
        .create(&business.id, input)
        .await
        .expect("Failed to create job")
}

pub async fn skill_id(db: &Database, name: &str) -> String {
    sqlx::query_scalar("SELECT id FROM skills WHERE name = ?")
        .bind(name)
        .fetch_one(db.pool())
        .await
        .expect("Seeded skill should exist")
}

pub fn test_config() -> AppConfig {
    AppConfig {
        server_host: "127.0.0.1".to_string(),
        server_port: 3000,
        database_url: "sqlite::memory:".to_string(),
        database_max_connections: 1,
        app_url: "http://localhost:3000".to_string(),
        session: SessionConfig {
            secret: TEST_SECRET.to_string(),
            ttl_hours: 1,
            password_cost: TEST_PASSWORD_COST,
        },
        email: EmailConfig {
            api_key: None,
            api_base_url: "http://localhost".to_string(),
            from_address: "GigIt <noreply@gigit.test>".to_string(),
        },
        storage: None,
    }
}

/// Mailer that keeps every message in memory.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MarketplaceError> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

/// Object store that signs nothing and remembers deleted keys.
#[derive(Default)]
pub struct FakeStore {
    pub deleted: Mutex<Vec<String>>,
}

pub const FAKE_PUBLIC_URL: &str = "https://files.gigit.test";

#[async_trait]
impl ObjectStore for FakeStore {
    async fn presign_upload(&self, key: &str, content_type: &str) -> Result<String, MarketplaceError> {
        Ok(format!("https://bucket.test/{}?content-type={}&sig=fake", key, content_type))
    }

    async fn presign_download(&self, key: &str) -> Result<String, MarketplaceError> {
        Ok(format!("https://bucket.test/{}?sig=fake", key))
    }

    async fn delete(&self, key: &str) -> Result<(), MarketplaceError> {
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }

    fn public_base_url(&self) -> &str {
        FAKE_PUBLIC_URL
    }
}

pub struct TestApp {
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    pub store: Option<Arc<FakeStore>>,
}

pub async fn test_app(with_store: bool) -> TestApp {
    let db = setup_test_db().await;
    let config = test_config();
    let mailer = Arc::new(RecordingMailer::default());
    let postmaster = Postmaster::new(mailer.clone(), config.app_url.clone());
    let store = with_store.then(|| Arc::new(FakeStore::default()));
    let state = AppState::new(
        db,
        config,
        postmaster,
        store.clone().map(|s| s as Arc<dyn ObjectStore>),
    );

    TestApp { state, mailer, store }
}
