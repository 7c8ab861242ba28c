pub mod claims;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod utils;

pub use claims::Claims;
pub use jwt::JwtService;
pub use middleware::{AuthenticatedUser, RequireRole};
pub use utils::{bearer_token, require_role, ADMIN_ONLY, ANY_ROLE, STUDENT_ONLY};
