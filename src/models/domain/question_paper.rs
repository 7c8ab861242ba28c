use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    #[default]
    Once,
}

/// When a paper is meant to be administered. For `once` the date is the
/// sitting itself, otherwise the next scheduled sitting.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Schedule {
    pub frequency: Frequency,
    pub date: DateTime,
}

impl Schedule {
    pub fn once_now() -> Self {
        Self {
            frequency: Frequency::Once,
            date: DateTime::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`, always within `0..OPTIONS_PER_QUESTION`.
    pub correct_answer: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPaper {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub class: String,
    pub subject: String,
    pub questions: Vec<Question>,
    pub schedule: Schedule,
    pub created_by: ObjectId,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl QuestionPaper {
    pub fn new(
        class: String,
        subject: String,
        questions: Vec<Question>,
        schedule: Schedule,
        created_by: ObjectId,
    ) -> Self {
        let now = DateTime::now();
        QuestionPaper {
            id: ObjectId::new(),
            class,
            subject,
            questions,
            schedule,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperTotals {
    pub total_papers: i64,
    pub total_questions: i64,
    pub avg_questions_per_paper: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupCount {
    #[serde(rename = "_id")]
    pub key: String,
    pub count: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperStats {
    pub stats: PaperTotals,
    /// Sorted by class ascending.
    pub class_stats: Vec<GroupCount>,
    /// Sorted by paper count descending.
    pub subject_stats: Vec<GroupCount>,
}
