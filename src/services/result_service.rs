use std::sync::Arc;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{TestResult, User},
        dto::{request::SubmitResultRequest, response::TestResultDto},
    },
    repositories::{ResultRepository, UserRepository},
    services::user_service::{load_user_refs, user_ref},
};

pub struct ResultService {
    repository: Arc<dyn ResultRepository>,
    users: Arc<dyn UserRepository>,
}

impl ResultService {
    pub fn new(repository: Arc<dyn ResultRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { repository, users }
    }

    pub async fn submit(&self, user: &User, request: SubmitResultRequest) -> AppResult<TestResult> {
        let test_name = request.test_name.as_deref().map(str::trim).unwrap_or_default();
        let (Some(score), Some(total)) = (request.score, request.total) else {
            return Err(AppError::ValidationError("All fields required".to_string()));
        };
        if test_name.is_empty() || !score.is_finite() || !total.is_finite() {
            return Err(AppError::ValidationError("All fields required".to_string()));
        }

        let result = self
            .repository
            .create(TestResult::new(user.id, test_name, score, total))
            .await?;
        log::info!("User {} submitted a result for '{}'", user.id_hex(), result.test_name);
        Ok(result)
    }

    pub async fn list_own(&self, user: &User) -> AppResult<Vec<TestResult>> {
        self.repository.find_by_user(&user.id).await
    }

    pub async fn list_all(&self) -> AppResult<Vec<TestResultDto>> {
        let results = self.repository.find_all().await?;
        let refs = load_user_refs(self.users.as_ref(), results.iter().map(|r| r.user)).await?;

        Ok(results
            .into_iter()
            .map(|result| {
                let owner = user_ref(&refs, &result.user);
                TestResultDto::new(result, owner)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::dto::response::UserRef,
        repositories::{result_repository::MockResultRepository, user_repository::MockUserRepository},
        test_utils::fixtures::test_student as student,
    };

    #[tokio::test]
    async fn test_submit_requires_every_field() {
        let mut results = MockResultRepository::new();
        results.expect_create().never();
        let service = ResultService::new(Arc::new(results), Arc::new(MockUserRepository::new()));

        let missing_total = SubmitResultRequest {
            test_name: Some("T1".to_string()),
            score: Some(4.0),
            total: None,
        };
        match service.submit(&student(), missing_total).await {
            Err(AppError::ValidationError(msg)) => assert_eq!(msg, "All fields required"),
            _ => panic!("Expected ValidationError"),
        }

        let blank_name = SubmitResultRequest {
            test_name: Some(" ".to_string()),
            score: Some(4.0),
            total: Some(5.0),
        };
        assert!(service.submit(&student(), blank_name).await.is_err());
    }

    #[tokio::test]
    async fn test_submit_accepts_zero_score() {
        let user = student();
        let user_id = user.id;
        let mut results = MockResultRepository::new();
        results
            .expect_create()
            .withf(move |r| r.user == user_id && r.score == 0.0 && r.total == 10.0)
            .returning(Ok);

        let result = ResultService::new(Arc::new(results), Arc::new(MockUserRepository::new()))
            .submit(
                &user,
                SubmitResultRequest {
                    test_name: Some("Weekly quiz".to_string()),
                    score: Some(0.0),
                    total: Some(10.0),
                },
            )
            .await
            .unwrap();
        assert_eq!(result.test_name, "Weekly quiz");
    }

    #[tokio::test]
    async fn test_list_all_populates_owner() {
        let user = student();
        let stored = TestResult::new(user.id, "T1", 8.0, 10.0);

        let mut results = MockResultRepository::new();
        results
            .expect_find_all()
            .returning(move || Ok(vec![stored.clone()]));
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_ids()
            .returning(move |_| Ok(vec![user.clone()]));

        let listed = ResultService::new(Arc::new(results), Arc::new(users))
            .list_all()
            .await
            .unwrap();

        match &listed[0].user {
            UserRef::Populated(summary) => assert_eq!(summary.full_name, "Test Student"),
            other => panic!("Expected populated user, got {:?}", other),
        }
    }
}
