use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson;
use serde::{Deserialize, Deserializer};
use validator::Validate;

use crate::errors::{AppError, AppResult};
use crate::models::domain::question_paper::{
    Frequency, Question, Schedule, OPTIONS_PER_QUESTION,
};

const ALL_FIELDS_REQUIRED: &str = "All fields are required";

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 100, message = "Full name must be 1-100 characters"))]
    pub full_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,

    pub role: String,

    /// Only consulted when `role` is `admin`.
    pub admin_code: Option<String>,
}

impl SignupRequest {
    pub fn check_required(&self) -> AppResult<()> {
        if [&self.full_name, &self.email, &self.password, &self.role]
            .iter()
            .any(|field| is_blank(field))
        {
            return Err(AppError::ValidationError(ALL_FIELDS_REQUIRED.to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn check_required(&self) -> AppResult<()> {
        if is_blank(&self.email) || self.password.is_empty() {
            return Err(AppError::ValidationError(ALL_FIELDS_REQUIRED.to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminResetPasswordRequest {
    pub new_password: String,
}

/// Self-service profile edit. Role and password are deliberately absent.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Full name must be 1-100 characters"))]
    pub full_name: Option<String>,

    #[validate(length(min = 1, max = 20, message = "Phone number must be 1-20 characters"))]
    pub p_number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserSearchQuery {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuestionInput {
    pub question: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScheduleInput {
    pub frequency: Option<Frequency>,
    #[serde(deserialize_with = "deserialize_schedule_date")]
    pub date: Option<DateTime<Utc>>,
}

impl ScheduleInput {
    pub fn into_schedule(self) -> Schedule {
        Schedule {
            frequency: self.frequency.unwrap_or_default(),
            date: self
                .date
                .map(bson::DateTime::from_chrono)
                .unwrap_or_else(bson::DateTime::now),
        }
    }
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
fn deserialize_schedule_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|value| parse_schedule_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}

pub fn parse_schedule_date(value: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid schedule date '{}'", trimmed))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QuestionPaperRequest {
    pub class: Option<String>,
    pub subject: Option<String>,
    pub questions: Option<Vec<QuestionInput>>,
    pub schedule: Option<ScheduleInput>,
}

/// A question paper payload that passed every structural check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPaper {
    pub class: String,
    pub subject: String,
    pub questions: Vec<Question>,
    pub schedule: Option<Schedule>,
}

impl QuestionPaperRequest {
    pub fn validate_paper(self) -> AppResult<ValidatedPaper> {
        let class = self.class.as_deref().map(str::trim).unwrap_or_default();
        let subject = self.subject.as_deref().map(str::trim).unwrap_or_default();
        let inputs = self.questions.unwrap_or_default();

        if class.is_empty() || subject.is_empty() || inputs.is_empty() {
            return Err(AppError::ValidationError(
                "Class, subject, and questions array are required".to_string(),
            ));
        }

        let questions = inputs
            .into_iter()
            .enumerate()
            .map(|(index, input)| validate_question(index + 1, input))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(ValidatedPaper {
            class: class.to_string(),
            subject: subject.to_string(),
            questions,
            schedule: self.schedule.map(ScheduleInput::into_schedule),
        })
    }
}

fn validate_question(number: usize, input: QuestionInput) -> AppResult<Question> {
    let text = input.question.unwrap_or_default();
    let options = input.options.unwrap_or_default();

    if is_blank(&text) || options.len() != OPTIONS_PER_QUESTION {
        return Err(AppError::ValidationError(format!(
            "Question {}: Must have question text and exactly 4 options",
            number
        )));
    }

    let correct_answer = input
        .correct_answer
        .filter(|answer| (0..OPTIONS_PER_QUESTION as i64).contains(answer))
        .ok_or_else(|| {
            AppError::ValidationError(format!("Question {}: Correct answer must be 0-3", number))
        })?;

    Ok(Question {
        question: text,
        options,
        correct_answer: correct_answer as i32,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaperListQuery {
    pub class: Option<String>,
    pub subject: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl Default for PaperListQuery {
    fn default() -> Self {
        Self {
            class: None,
            subject: None,
            page: Some(1),
            limit: Some(10),
        }
    }
}

impl PaperListQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BulkDeleteRequest {
    pub paper_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmitResultRequest {
    pub test_name: Option<String>,
    pub score: Option<f64>,
    pub total: Option<f64>,
}
