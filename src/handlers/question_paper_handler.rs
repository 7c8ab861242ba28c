use actix_web::{delete, get, post, put, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::{AuthenticatedUser, RequireRole},
    errors::AppError,
    models::dto::{
        request::{BulkDeleteRequest, PaperListQuery, QuestionPaperRequest},
        response::{ApiResponse, BulkDeleteBody, MessageResponse, PaperBody, PaperCreatedBody},
    },
};

#[post("/question-paper", wrap = "RequireRole::admin()")]
async fn create_paper(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
    request: web::Json<QuestionPaperRequest>,
) -> Result<HttpResponse, AppError> {
    let paper = state
        .question_paper_service
        .create(auth.user(), request.into_inner())
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        "Question paper created successfully",
        PaperCreatedBody {
            paper_id: paper.id.to_hex(),
        },
    )))
}

#[get("/question-papers", wrap = "RequireRole::admin()")]
async fn list_papers(
    state: web::Data<AppState>,
    query: web::Query<PaperListQuery>,
) -> Result<HttpResponse, AppError> {
    let page = state.question_paper_service.list(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(page)))
}

#[get("/question-papers/stats", wrap = "RequireRole::admin()")]
async fn paper_stats(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let stats = state.question_paper_service.stats().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(stats)))
}

#[post("/question-papers/bulk-delete", wrap = "RequireRole::admin()")]
async fn bulk_delete_papers(
    state: web::Data<AppState>,
    request: web::Json<BulkDeleteRequest>,
) -> Result<HttpResponse, AppError> {
    let deleted_count = state
        .question_paper_service
        .bulk_delete(request.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        format!("{} question papers deleted successfully", deleted_count),
        BulkDeleteBody { deleted_count },
    )))
}

#[get("/question-paper/{id}", wrap = "RequireRole::admin()")]
async fn get_paper(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let paper = state.question_paper_service.get(&id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(PaperBody { paper })))
}

#[put("/question-paper/{id}", wrap = "RequireRole::admin()")]
async fn update_paper(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<QuestionPaperRequest>,
) -> Result<HttpResponse, AppError> {
    let paper = state
        .question_paper_service
        .update(&id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        "Question paper updated successfully",
        PaperBody { paper },
    )))
}

#[delete("/question-paper/{id}", wrap = "RequireRole::admin()")]
async fn delete_paper(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    state.question_paper_service.delete(&id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Question paper deleted successfully")))
}
