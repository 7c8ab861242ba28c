pub mod question_paper;
pub mod test_result;
pub mod user;

pub use question_paper::{Frequency, Question, QuestionPaper, Schedule};
pub use test_result::TestResult;
pub use user::{ActivityEntry, User, UserRole};
