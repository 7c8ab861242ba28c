use std::sync::Arc;

use crate::{
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{
        MongoQuestionPaperRepository, MongoResultRepository, MongoUserRepository,
        QuestionPaperRepository, ResultRepository, UserRepository,
    },
    services::{
        AuthService, LogResetMailer, ProfilePicStore, QuestionPaperService, ResetMailer,
        ResultService, SmtpResetMailer, UserService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub question_paper_service: Arc<QuestionPaperService>,
    pub result_service: Arc<ResultService>,
    pub profile_pic_store: Arc<ProfilePicStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let user_repository = Arc::new(MongoUserRepository::new(&db));
        user_repository.ensure_indexes().await?;

        let paper_repository = Arc::new(MongoQuestionPaperRepository::new(&db));
        paper_repository.ensure_indexes().await?;

        let result_repository = Arc::new(MongoResultRepository::new(&db));
        result_repository.ensure_indexes().await?;

        let mailer: Arc<dyn ResetMailer> = match &config.smtp {
            Some(settings) => Arc::new(SmtpResetMailer::new(settings)?),
            None => {
                log::warn!("SMTP not configured; password reset emails will not be delivered");
                Arc::new(LogResetMailer)
            }
        };

        Ok(Self::from_repositories(
            config,
            user_repository,
            paper_repository,
            result_repository,
            mailer,
        ))
    }

    /// Wires the services over arbitrary repository implementations.
    pub fn from_repositories(
        config: Config,
        users: Arc<dyn UserRepository>,
        papers: Arc<dyn QuestionPaperRepository>,
        results: Arc<dyn ResultRepository>,
        mailer: Arc<dyn ResetMailer>,
    ) -> Self {
        let auth_service = Arc::new(AuthService::new(users.clone(), mailer, &config));
        let user_service = Arc::new(UserService::new(users.clone()));
        let question_paper_service = Arc::new(QuestionPaperService::new(papers, users.clone()));
        let result_service = Arc::new(ResultService::new(results, users.clone()));
        let profile_pic_store = Arc::new(ProfilePicStore::new(users, &config));

        Self {
            auth_service,
            user_service,
            question_paper_service,
            result_service,
            profile_pic_store,
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{
        question_paper_repository::MockQuestionPaperRepository,
        result_repository::MockResultRepository, user_repository::MockUserRepository,
    };

    #[test]
    fn test_app_state_is_cloneable() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_from_repositories_keeps_config() {
        let state = AppState::from_repositories(
            Config::test_config(),
            Arc::new(MockUserRepository::new()),
            Arc::new(MockQuestionPaperRepository::new()),
            Arc::new(MockResultRepository::new()),
            Arc::new(LogResetMailer),
        );
        assert_eq!(state.config.mongo_db_name, Config::test_config().mongo_db_name);
    }
}
