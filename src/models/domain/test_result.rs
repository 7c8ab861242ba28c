use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// A student's recorded score for one sitting of a named test.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user: ObjectId,
    pub test_name: String,
    pub score: f64,
    pub total: f64,
    pub date: DateTime,
}

impl TestResult {
    pub fn new(user: ObjectId, test_name: &str, score: f64, total: f64) -> Self {
        TestResult {
            id: ObjectId::new(),
            user,
            test_name: test_name.to_string(),
            score,
            total,
            date: DateTime::now(),
        }
    }
}
