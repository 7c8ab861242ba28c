pub mod question_paper_repository;
pub mod result_repository;
pub mod user_repository;

pub use question_paper_repository::{MongoQuestionPaperRepository, PaperFilter, QuestionPaperRepository};
pub use result_repository::{MongoResultRepository, ResultRepository};
pub use user_repository::{MongoUserRepository, UserChanges, UserFilter, UserRepository};
