use chrono::{DateTime, Utc};
use mongodb::bson;
use serde::Serialize;

use crate::models::domain::{
    question_paper::{Question, Schedule},
    ActivityEntry, QuestionPaper, TestResult, User, UserRole,
};

fn to_chrono(dt: bson::DateTime) -> DateTime<Utc> {
    dt.to_chrono()
}

/// Envelope for successful responses: `{"status": true, "message"?, ...data}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: true,
            message: None,
            data,
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            status: true,
            message: Some(message.into()),
            data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub status: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntryDto {
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

impl From<ActivityEntry> for ActivityEntryDto {
    fn from(entry: ActivityEntry) -> Self {
        ActivityEntryDto {
            action: entry.action,
            timestamp: to_chrono(entry.timestamp),
        }
    }
}

/// Public view of a user. Password hash and reset token never leave the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    #[serde(rename = "_id")]
    pub id: String,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_number: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub activity_log: Vec<ActivityEntryDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        UserDto {
            id: user.id.to_hex(),
            full_name: user.full_name,
            email: user.email,
            p_number: user.p_number,
            role: user.role,
            is_active: user.is_active,
            activity_log: user.activity_log.into_iter().map(Into::into).collect(),
            profile_pic: user.profile_pic,
            last_login: user.last_login.map(to_chrono),
        }
    }
}

/// Minimal identity used when a document references a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub full_name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id.to_hex(),
            full_name: user.full_name.clone(),
            email: user.email.clone(),
        }
    }
}

/// A referenced user: populated when it still exists, otherwise the bare id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UserRef {
    Populated(UserSummary),
    Id(String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub role: UserRole,
}

#[derive(Debug, Serialize)]
pub struct UserBody {
    pub user: UserDto,
}

#[derive(Debug, Serialize)]
pub struct UsersBody {
    pub users: Vec<UserDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogBody {
    pub activity_log: Vec<ActivityEntryDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<ActivityOwner>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityOwner {
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePicBody {
    pub profile_pic: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
    pub admins: u64,
    pub students: u64,
    pub recent_logins: u64,
}

#[derive(Debug, Serialize)]
pub struct UserStatsBody {
    pub stats: UserStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleDto {
    pub frequency: crate::models::domain::Frequency,
    pub date: DateTime<Utc>,
}

impl From<Schedule> for ScheduleDto {
    fn from(schedule: Schedule) -> Self {
        ScheduleDto {
            frequency: schedule.frequency,
            date: to_chrono(schedule.date),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPaperDto {
    #[serde(rename = "_id")]
    pub id: String,
    pub class: String,
    pub subject: String,
    pub questions: Vec<Question>,
    pub schedule: ScheduleDto,
    pub created_by: UserRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuestionPaperDto {
    pub fn new(paper: QuestionPaper, created_by: UserRef) -> Self {
        QuestionPaperDto {
            id: paper.id.to_hex(),
            class: paper.class,
            subject: paper.subject,
            questions: paper.questions,
            schedule: paper.schedule.into(),
            created_by,
            created_at: to_chrono(paper.created_at),
            updated_at: to_chrono(paper.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperCreatedBody {
    pub paper_id: String,
}

#[derive(Debug, Serialize)]
pub struct PaperBody {
    pub paper: QuestionPaperDto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current: i64,
    /// Number of pages.
    pub total: i64,
    pub total_papers: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total_papers: i64) -> Self {
        Pagination {
            current: page,
            total: (total_papers + limit - 1) / limit,
            total_papers,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaperPage {
    pub papers: Vec<QuestionPaperDto>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteBody {
    pub deleted_count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultDto {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: UserRef,
    pub test_name: String,
    pub score: f64,
    pub total: f64,
    pub date: DateTime<Utc>,
}

impl TestResultDto {
    pub fn new(result: TestResult, user: UserRef) -> Self {
        TestResultDto {
            id: result.id.to_hex(),
            user,
            test_name: result.test_name,
            score: result.score,
            total: result.total,
            date: to_chrono(result.date),
        }
    }
}

impl From<TestResult> for TestResultDto {
    fn from(result: TestResult) -> Self {
        let user = UserRef::Id(result.user.to_hex());
        TestResultDto::new(result, user)
    }
}

#[derive(Debug, Serialize)]
pub struct ResultBody {
    pub result: TestResultDto,
}

#[derive(Debug, Serialize)]
pub struct ResultsBody {
    pub results: Vec<TestResultDto>,
}
