use actix_web::{get, post, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::{AuthenticatedUser, RequireRole},
    errors::AppError,
    models::dto::{
        request::SubmitResultRequest,
        response::{ApiResponse, ResultBody, ResultsBody, TestResultDto},
    },
};

#[post("/results", wrap = "RequireRole::student()")]
async fn submit_result(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
    request: web::Json<SubmitResultRequest>,
) -> Result<HttpResponse, AppError> {
    let result = state
        .result_service
        .submit(auth.user(), request.into_inner())
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        "Result saved",
        ResultBody {
            result: result.into(),
        },
    )))
}

#[get("/results/me", wrap = "RequireRole::any()")]
async fn own_results(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let results = state.result_service.list_own(auth.user()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(ResultsBody {
        results: results.into_iter().map(TestResultDto::from).collect(),
    })))
}

#[get("/results", wrap = "RequireRole::admin()")]
async fn all_results(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let results = state.result_service.list_all().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(ResultsBody { results })))
}
