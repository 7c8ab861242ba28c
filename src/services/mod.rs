pub mod auth_service;
pub mod mailer;
pub mod profile_pic_store;
pub mod question_paper_service;
pub mod result_service;
pub mod user_service;

pub use auth_service::AuthService;
pub use mailer::{LogResetMailer, ResetMailer, SmtpResetMailer};
pub use profile_pic_store::{PicUpload, ProfilePicStore};
pub use question_paper_service::QuestionPaperService;
pub use result_service::ResultService;
pub use user_service::UserService;
