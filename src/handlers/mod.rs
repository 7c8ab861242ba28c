pub mod auth_handler;
pub mod question_paper_handler;
pub mod result_handler;
pub mod user_handler;

use actix_web::{error, web};

use crate::errors::AppError;

/// Malformed bodies and query strings become 400s in the usual error shape.
fn extractor_configs() -> (web::JsonConfig, web::QueryConfig) {
    let json = web::JsonConfig::default().error_handler(|err, _req| {
        let message = match &err {
            error::JsonPayloadError::ContentType => "Expected a JSON body".to_string(),
            other => format!("Invalid JSON body: {}", other),
        };
        AppError::ValidationError(message).into()
    });
    let query = web::QueryConfig::default().error_handler(|err, _req| {
        AppError::ValidationError(format!("Invalid query string: {}", err)).into()
    });
    (json, query)
}

/// Registers every route. Literal paths come before their `{id}` siblings.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let (json, query) = extractor_configs();
    cfg.app_data(json).app_data(query);

    cfg.service(user_handler::health_check)
        .service(user_handler::health_check_live)
        .service(user_handler::health_check_ready)
        .service(auth_handler::signup)
        .service(auth_handler::login)
        .service(auth_handler::change_password)
        .service(auth_handler::forgot_password)
        .service(auth_handler::reset_password)
        .service(user_handler::list_users)
        .service(user_handler::search_users)
        .service(user_handler::delete_user)
        .service(user_handler::deactivate_user)
        .service(user_handler::activate_user)
        .service(user_handler::promote_user)
        .service(user_handler::admin_reset_password)
        .service(user_handler::user_activity_log)
        .service(user_handler::admin_upload_profile_pic)
        .service(user_handler::get_profile)
        .service(user_handler::update_profile)
        .service(user_handler::own_activity_log)
        .service(user_handler::upload_profile_pic)
        .service(user_handler::admin_stats)
        .service(question_paper_handler::create_paper)
        .service(question_paper_handler::list_papers)
        .service(question_paper_handler::paper_stats)
        .service(question_paper_handler::bulk_delete_papers)
        .service(question_paper_handler::get_paper)
        .service(question_paper_handler::update_paper)
        .service(question_paper_handler::delete_paper)
        .service(result_handler::submit_result)
        .service(result_handler::own_results)
        .service(result_handler::all_results);
}
