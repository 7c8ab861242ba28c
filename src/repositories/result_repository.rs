use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    options::{FindOptions, IndexOptions},
    Collection, IndexModel,
};

use crate::{db::Database, errors::AppResult, models::domain::TestResult};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultRepository: Send + Sync {
    async fn create(&self, result: TestResult) -> AppResult<TestResult>;
    /// A user's results, newest first.
    async fn find_by_user(&self, user_id: &ObjectId) -> AppResult<Vec<TestResult>>;
    /// Every result, newest first.
    async fn find_all(&self) -> AppResult<Vec<TestResult>>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoResultRepository {
    collection: Collection<TestResult>,
}

impl MongoResultRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("results");
        Self { collection }
    }

    async fn find_newest_first(&self, filter: Document) -> AppResult<Vec<TestResult>> {
        let options = FindOptions::builder().sort(doc! { "date": -1 }).build();
        let cursor = self.collection.find(filter).with_options(options).await?;
        let items: Vec<TestResult> = cursor.try_collect().await?;
        Ok(items)
    }
}

#[async_trait]
impl ResultRepository for MongoResultRepository {
    async fn create(&self, result: TestResult) -> AppResult<TestResult> {
        self.collection.insert_one(&result).await?;
        Ok(result)
    }

    async fn find_by_user(&self, user_id: &ObjectId) -> AppResult<Vec<TestResult>> {
        self.find_newest_first(doc! { "user": user_id }).await
    }

    async fn find_all(&self) -> AppResult<Vec<TestResult>> {
        self.find_newest_first(doc! {}).await
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        let by_user = IndexModel::builder()
            .keys(doc! { "user": 1, "date": -1 })
            .options(IndexOptions::builder().name("user_date".to_string()).build())
            .build();
        self.collection.create_index(by_user).await?;

        log::info!("Successfully created indexes for results collection");
        Ok(())
    }
}
