#[cfg(test)]
pub mod fixtures {
    use mongodb::bson::oid::ObjectId;

    use crate::models::domain::{Question, QuestionPaper, Schedule, User, UserRole};

    /// Creates a standard student account
    pub fn test_student() -> User {
        User::new("Test Student", "student@example.com", "$2b$04$hash", UserRole::Student)
    }

    /// Creates a standard admin account
    pub fn test_admin() -> User {
        User::new("Test Admin", "admin@example.com", "$2b$04$hash", UserRole::Admin)
    }

    /// Creates a one-question paper owned by `created_by`
    pub fn test_paper(class: &str, subject: &str, created_by: ObjectId) -> QuestionPaper {
        QuestionPaper::new(
            class.to_string(),
            subject.to_string(),
            vec![Question {
                question: "Which planet is largest?".to_string(),
                options: vec![
                    "Mars".to_string(),
                    "Jupiter".to_string(),
                    "Venus".to_string(),
                    "Earth".to_string(),
                ],
                correct_answer: 1,
            }],
            Schedule::once_now(),
            created_by,
        )
    }
}

#[cfg(test)]
pub mod test_helpers {
    use actix_web::http::StatusCode;

    /// Asserts that a status code represents an error (4xx or 5xx)
    pub fn assert_error_status(status: StatusCode) {
        assert!(
            status.is_client_error() || status.is_server_error(),
            "Expected error status, got: {}",
            status
        );
    }

    /// Asserts that a status code represents success (2xx)
    pub fn assert_success_status(status: StatusCode) {
        assert!(
            status.is_success(),
            "Expected success status, got: {}",
            status
        );
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;

    #[test]
    fn test_fixture_roles() {
        assert!(!test_student().is_admin());
        assert!(test_admin().is_admin());
    }

    #[test]
    fn test_fixture_paper_is_well_formed() {
        let admin = test_admin();
        let paper = test_paper("IX", "Science", admin.id);

        assert_eq!(paper.created_by, admin.id);
        assert_eq!(paper.questions[0].options.len(), 4);
    }
}
