use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, Document},
    options::{FindOptions, IndexOptions},
    Collection, IndexModel,
};

use crate::{
    db::{map_duplicate, Database},
    errors::AppResult,
    models::domain::question_paper::{GroupCount, PaperStats, PaperTotals, QuestionPaper},
};

pub const DUPLICATE_PAPER: &str = "A question paper already exists for this class, subject, and date";

/// Exact-match listing filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaperFilter {
    pub class: Option<String>,
    pub subject: Option<String>,
}

impl PaperFilter {
    fn to_document(&self) -> Document {
        let mut filter = Document::new();
        if let Some(class) = &self.class {
            filter.insert("class", class);
        }
        if let Some(subject) = &self.subject {
            filter.insert("subject", subject);
        }
        filter
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionPaperRepository: Send + Sync {
    async fn create(&self, paper: QuestionPaper) -> AppResult<QuestionPaper>;
    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<QuestionPaper>>;
    /// Newest first. Returns the page and the total number of matches.
    async fn list(&self, filter: PaperFilter, offset: i64, limit: i64) -> AppResult<(Vec<QuestionPaper>, i64)>;
    /// Replaces the stored paper with the same id. `false` when it is gone.
    async fn replace(&self, paper: &QuestionPaper) -> AppResult<bool>;
    async fn delete(&self, id: &ObjectId) -> AppResult<bool>;
    async fn delete_many(&self, ids: &[ObjectId]) -> AppResult<u64>;
    async fn stats(&self) -> AppResult<PaperStats>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoQuestionPaperRepository {
    collection: Collection<QuestionPaper>,
}

impl MongoQuestionPaperRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("questionpapers");
        Self { collection }
    }

    async fn aggregate_docs(&self, pipeline: Vec<Document>) -> AppResult<Vec<Document>> {
        let cursor = self.collection.aggregate(pipeline).await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        Ok(docs)
    }
}

/// Aggregation counters come back as int32, int64 or double depending on size.
fn number_as_i64(value: Option<&Bson>) -> i64 {
    match value {
        Some(Bson::Int32(v)) => i64::from(*v),
        Some(Bson::Int64(v)) => *v,
        Some(Bson::Double(v)) => *v as i64,
        _ => 0,
    }
}

fn number_as_f64(value: Option<&Bson>) -> f64 {
    match value {
        Some(Bson::Int32(v)) => f64::from(*v),
        Some(Bson::Int64(v)) => *v as f64,
        Some(Bson::Double(v)) => *v,
        _ => 0.0,
    }
}

fn totals_from(doc: Option<&Document>) -> PaperTotals {
    match doc {
        Some(doc) => PaperTotals {
            total_papers: number_as_i64(doc.get("totalPapers")),
            total_questions: number_as_i64(doc.get("totalQuestions")),
            avg_questions_per_paper: number_as_f64(doc.get("avgQuestionsPerPaper")),
        },
        None => PaperTotals::default(),
    }
}

fn group_counts(docs: &[Document]) -> Vec<GroupCount> {
    docs.iter()
        .map(|doc| GroupCount {
            key: doc.get_str("_id").unwrap_or_default().to_string(),
            count: number_as_i64(doc.get("count")),
        })
        .collect()
}

#[async_trait]
impl QuestionPaperRepository for MongoQuestionPaperRepository {
    async fn create(&self, paper: QuestionPaper) -> AppResult<QuestionPaper> {
        self.collection
            .insert_one(&paper)
            .await
            .map_err(|e| map_duplicate(e, DUPLICATE_PAPER))?;
        Ok(paper)
    }

    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<QuestionPaper>> {
        let paper = self.collection.find_one(doc! { "_id": id }).await?;
        Ok(paper)
    }

    async fn list(&self, filter: PaperFilter, offset: i64, limit: i64) -> AppResult<(Vec<QuestionPaper>, i64)> {
        let filter = filter.to_document();

        let total = self.collection.count_documents(filter.clone()).await? as i64;

        let find_options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .skip(Some(offset as u64))
            .limit(Some(limit))
            .build();

        let cursor = self.collection.find(filter).with_options(find_options).await?;
        let items: Vec<QuestionPaper> = cursor.try_collect().await?;

        Ok((items, total))
    }

    async fn replace(&self, paper: &QuestionPaper) -> AppResult<bool> {
        let result = self
            .collection
            .replace_one(doc! { "_id": paper.id }, paper)
            .await
            .map_err(|e| map_duplicate(e, DUPLICATE_PAPER))?;
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, id: &ObjectId) -> AppResult<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_many(&self, ids: &[ObjectId]) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = self
            .collection
            .delete_many(doc! { "_id": { "$in": ids } })
            .await?;
        Ok(result.deleted_count)
    }

    async fn stats(&self) -> AppResult<PaperStats> {
        let totals = self
            .aggregate_docs(vec![doc! {
                "$group": {
                    "_id": Bson::Null,
                    "totalPapers": { "$sum": 1 },
                    "totalQuestions": { "$sum": { "$size": "$questions" } },
                    "avgQuestionsPerPaper": { "$avg": { "$size": "$questions" } },
                }
            }])
            .await?;

        let by_class = self
            .aggregate_docs(vec![
                doc! { "$group": { "_id": "$class", "count": { "$sum": 1 } } },
                doc! { "$sort": { "_id": 1 } },
            ])
            .await?;

        let by_subject = self
            .aggregate_docs(vec![
                doc! { "$group": { "_id": "$subject", "count": { "$sum": 1 } } },
                doc! { "$sort": { "count": -1, "_id": 1 } },
            ])
            .await?;

        Ok(PaperStats {
            stats: totals_from(totals.first()),
            class_stats: group_counts(&by_class),
            subject_stats: group_counts(&by_subject),
        })
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for questionpapers collection");

        let unique_sitting = IndexModel::builder()
            .keys(doc! { "class": 1, "subject": 1, "schedule.date": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("class_subject_date_unique".to_string())
                    .build(),
            )
            .build();
        self.collection.create_index(unique_sitting).await?;

        let created_at = IndexModel::builder()
            .keys(doc! { "createdAt": -1 })
            .options(IndexOptions::builder().name("created_at".to_string()).build())
            .build();
        self.collection.create_index(created_at).await?;

        log::info!("Successfully created indexes for questionpapers collection");
        Ok(())
    }
}
