#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime};
use secrecy::SecretString;
use tokio::sync::RwLock;

use learner_server::{
    app_state::AppState,
    config::Config,
    errors::{AppError, AppResult},
    models::{
        domain::{
            question_paper::{GroupCount, PaperStats, PaperTotals},
            user::actions,
            ActivityEntry, QuestionPaper, TestResult, User,
        },
        dto::response::UserStats,
    },
    repositories::{
        question_paper_repository::DUPLICATE_PAPER, PaperFilter, QuestionPaperRepository,
        ResultRepository, UserChanges, UserFilter, UserRepository,
    },
    services::ResetMailer,
};

pub const ADMIN_CODE: &str = "integration-admin-code";

pub fn test_config(upload_dir: &Path) -> Config {
    Config {
        mongo_conn_string: "mongodb://localhost:27017".to_string(),
        mongo_db_name: "learner-integration".to_string(),
        web_server_host: "127.0.0.1".to_string(),
        web_server_port: 5000,
        jwt_secret: SecretString::from("integration_jwt_secret".to_string()),
        jwt_expiration_hours: 1,
        admin_code: SecretString::from(ADMIN_CODE.to_string()),
        frontend_url: "http://localhost:3000".to_string(),
        upload_dir: upload_dir.to_path_buf(),
        max_upload_bytes: 64 * 1024,
        bcrypt_cost: 4,
        app_env: "test".to_string(),
        smtp: None,
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<ObjectId, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn users_snapshot(&self) -> Vec<User> {
        self.users.read().await.values().cloned().collect()
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(AppError::AlreadyExists(
                "User with this email id already exists".to_string(),
            ));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[ObjectId]) -> AppResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_reset_token(&self, token_hash: &str, now: DateTime) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| {
                u.reset_password_token.as_deref() == Some(token_hash)
                    && u.reset_password_expires.is_some_and(|expires| expires > now)
            })
            .cloned())
    }

    async fn find_active(&self) -> AppResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(users.values().filter(|u| u.is_active).cloned().collect())
    }

    async fn search(&self, filter: UserFilter) -> AppResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .filter(|u| {
                filter
                    .name
                    .as_deref()
                    .map_or(true, |name| contains_ignore_case(&u.full_name, name))
                    && filter
                        .email
                        .as_deref()
                        .map_or(true, |email| contains_ignore_case(&u.email, email))
                    && filter.role.map_or(true, |role| u.role == role)
            })
            .cloned()
            .collect())
    }

    async fn update_fields(&self, id: &ObjectId, changes: UserChanges) -> AppResult<Option<User>> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(id) else {
            return Ok(None);
        };
        if let Some(full_name) = changes.full_name {
            user.full_name = full_name;
        }
        if let Some(p_number) = changes.p_number {
            user.p_number = Some(p_number);
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(is_active) = changes.is_active {
            user.is_active = is_active;
        }
        Ok(Some(user.clone()))
    }

    async fn record_login(&self, id: &ObjectId, at: DateTime) -> AppResult<()> {
        if let Some(user) = self.users.write().await.get_mut(id) {
            user.last_login = Some(at);
            user.activity_log.push(ActivityEntry {
                action: actions::LOGIN.to_string(),
                timestamp: at,
            });
        }
        Ok(())
    }

    async fn append_activity(&self, id: &ObjectId, entry: ActivityEntry) -> AppResult<bool> {
        match self.users.write().await.get_mut(id) {
            Some(user) => {
                user.activity_log.push(entry);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_password(&self, id: &ObjectId, password_hash: &str, entry: ActivityEntry) -> AppResult<bool> {
        match self.users.write().await.get_mut(id) {
            Some(user) => {
                user.password = password_hash.to_string();
                user.reset_password_token = None;
                user.reset_password_expires = None;
                user.activity_log.push(entry);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        now: DateTime,
        password_hash: &str,
        entry: ActivityEntry,
    ) -> AppResult<Option<User>> {
        let mut users = self.users.write().await;
        let holder = users.values_mut().find(|u| {
            u.reset_password_token.as_deref() == Some(token_hash)
                && u.reset_password_expires.is_some_and(|expires| expires > now)
        });
        Ok(holder.map(|user| {
            user.password = password_hash.to_string();
            user.reset_password_token = None;
            user.reset_password_expires = None;
            user.activity_log.push(entry);
            user.clone()
        }))
    }

    async fn set_reset_token(
        &self,
        id: &ObjectId,
        token_hash: &str,
        expires: DateTime,
        entry: ActivityEntry,
    ) -> AppResult<bool> {
        match self.users.write().await.get_mut(id) {
            Some(user) => {
                user.reset_password_token = Some(token_hash.to_string());
                user.reset_password_expires = Some(expires);
                user.activity_log.push(entry);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_profile_pic(&self, id: &ObjectId, path: Option<String>) -> AppResult<bool> {
        match self.users.write().await.get_mut(id) {
            Some(user) => {
                user.profile_pic = path;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &ObjectId) -> AppResult<bool> {
        Ok(self.users.write().await.remove(id).is_some())
    }

    async fn stats(&self, recent_since: DateTime) -> AppResult<UserStats> {
        let users = self.users.read().await;
        let count = |pred: &dyn Fn(&User) -> bool| users.values().filter(|u| pred(u)).count() as u64;

        Ok(UserStats {
            total: users.len() as u64,
            active: count(&|u| u.is_active),
            inactive: count(&|u| !u.is_active),
            admins: count(&|u| u.is_admin()),
            students: count(&|u| !u.is_admin()),
            recent_logins: count(&|u| u.last_login.is_some_and(|at| at >= recent_since)),
        })
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryQuestionPaperRepository {
    papers: Arc<RwLock<HashMap<ObjectId, QuestionPaper>>>,
}

impl InMemoryQuestionPaperRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn same_sitting(a: &QuestionPaper, b: &QuestionPaper) -> bool {
    a.class == b.class && a.subject == b.subject && a.schedule.date == b.schedule.date
}

fn duplicate_paper() -> AppError {
    AppError::AlreadyExists(DUPLICATE_PAPER.to_string())
}

#[async_trait]
impl QuestionPaperRepository for InMemoryQuestionPaperRepository {
    async fn create(&self, paper: QuestionPaper) -> AppResult<QuestionPaper> {
        let mut papers = self.papers.write().await;
        if papers.values().any(|p| same_sitting(p, &paper)) {
            return Err(duplicate_paper());
        }
        papers.insert(paper.id, paper.clone());
        Ok(paper)
    }

    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<QuestionPaper>> {
        Ok(self.papers.read().await.get(id).cloned())
    }

    async fn list(&self, filter: PaperFilter, offset: i64, limit: i64) -> AppResult<(Vec<QuestionPaper>, i64)> {
        let papers = self.papers.read().await;
        let mut items: Vec<_> = papers
            .values()
            .filter(|p| filter.class.as_deref().map_or(true, |c| p.class == c))
            .filter(|p| filter.subject.as_deref().map_or(true, |s| p.subject == s))
            .cloned()
            .collect();
        // ObjectIds grow monotonically, which breaks same-millisecond ties.
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = items.len() as i64;
        let start = offset.max(0) as usize;
        let end = (start + limit.max(0) as usize).min(items.len());

        let page = if start >= items.len() {
            vec![]
        } else {
            items[start..end].to_vec()
        };

        Ok((page, total))
    }

    async fn replace(&self, paper: &QuestionPaper) -> AppResult<bool> {
        let mut papers = self.papers.write().await;
        if !papers.contains_key(&paper.id) {
            return Ok(false);
        }
        if papers.values().any(|p| p.id != paper.id && same_sitting(p, paper)) {
            return Err(duplicate_paper());
        }
        papers.insert(paper.id, paper.clone());
        Ok(true)
    }

    async fn delete(&self, id: &ObjectId) -> AppResult<bool> {
        Ok(self.papers.write().await.remove(id).is_some())
    }

    async fn delete_many(&self, ids: &[ObjectId]) -> AppResult<u64> {
        let mut papers = self.papers.write().await;
        Ok(ids.iter().filter(|id| papers.remove(id).is_some()).count() as u64)
    }

    async fn stats(&self) -> AppResult<PaperStats> {
        let papers = self.papers.read().await;
        if papers.is_empty() {
            return Ok(PaperStats::default());
        }

        let total_papers = papers.len() as i64;
        let total_questions: i64 = papers.values().map(|p| p.questions.len() as i64).sum();

        let mut by_class: HashMap<String, i64> = HashMap::new();
        let mut by_subject: HashMap<String, i64> = HashMap::new();
        for paper in papers.values() {
            *by_class.entry(paper.class.clone()).or_default() += 1;
            *by_subject.entry(paper.subject.clone()).or_default() += 1;
        }

        let mut class_stats: Vec<GroupCount> = by_class
            .into_iter()
            .map(|(key, count)| GroupCount { key, count })
            .collect();
        class_stats.sort_by(|a, b| a.key.cmp(&b.key));

        let mut subject_stats: Vec<GroupCount> = by_subject
            .into_iter()
            .map(|(key, count)| GroupCount { key, count })
            .collect();
        subject_stats.sort_by(|a, b| b.count.cmp(&a.count).then(a.key.cmp(&b.key)));

        Ok(PaperStats {
            stats: PaperTotals {
                total_papers,
                total_questions,
                avg_questions_per_paper: total_questions as f64 / total_papers as f64,
            },
            class_stats,
            subject_stats,
        })
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryResultRepository {
    results: Arc<RwLock<Vec<TestResult>>>,
}

impl InMemoryResultRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn newest_first(&self, keep: impl Fn(&TestResult) -> bool) -> Vec<TestResult> {
        let results = self.results.read().await;
        let mut items: Vec<_> = results.iter().rev().filter(|r| keep(r)).cloned().collect();
        items.sort_by(|a, b| b.date.cmp(&a.date));
        items
    }
}

#[async_trait]
impl ResultRepository for InMemoryResultRepository {
    async fn create(&self, result: TestResult) -> AppResult<TestResult> {
        self.results.write().await.push(result.clone());
        Ok(result)
    }

    async fn find_by_user(&self, user_id: &ObjectId) -> AppResult<Vec<TestResult>> {
        Ok(self.newest_first(|r| r.user == *user_id).await)
    }

    async fn find_all(&self) -> AppResult<Vec<TestResult>> {
        Ok(self.newest_first(|_| true).await)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Keeps every reset link instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub fn last_link(&self) -> Option<String> {
        self.sent
            .lock()
            .ok()
            .and_then(|sent| sent.last().map(|(_, link)| link.clone()))
    }
}

#[async_trait]
impl ResetMailer for RecordingMailer {
    async fn send_reset_link(&self, email: &str, link: &str) -> AppResult<()> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((email.to_string(), link.to_string()));
        }
        Ok(())
    }
}

pub struct TestContext {
    pub state: AppState,
    pub users: Arc<InMemoryUserRepository>,
    pub mailer: Arc<RecordingMailer>,
}

pub fn test_context(upload_dir: &Path) -> TestContext {
    let users = Arc::new(InMemoryUserRepository::new());
    let mailer = Arc::new(RecordingMailer::default());

    let state = AppState::from_repositories(
        test_config(upload_dir),
        users.clone(),
        Arc::new(InMemoryQuestionPaperRepository::new()),
        Arc::new(InMemoryResultRepository::new()),
        mailer.clone(),
    );

    TestContext {
        state,
        users,
        mailer,
    }
}
