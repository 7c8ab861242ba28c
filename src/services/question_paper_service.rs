use std::sync::Arc;

use mongodb::bson::{oid::ObjectId, DateTime};

use crate::{
    db::parse_object_id,
    errors::{AppError, AppResult},
    models::{
        domain::{question_paper::PaperStats, QuestionPaper, Schedule, User},
        dto::{
            request::{BulkDeleteRequest, PaperListQuery, QuestionPaperRequest},
            response::{Pagination, PaperPage, QuestionPaperDto},
        },
    },
    repositories::{PaperFilter, QuestionPaperRepository, UserRepository},
    services::user_service::{load_user_refs, user_ref},
};

fn paper_not_found() -> AppError {
    AppError::NotFound("Question paper not found".to_string())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

pub struct QuestionPaperService {
    repository: Arc<dyn QuestionPaperRepository>,
    users: Arc<dyn UserRepository>,
}

impl QuestionPaperService {
    pub fn new(repository: Arc<dyn QuestionPaperRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { repository, users }
    }

    async fn populate(&self, papers: Vec<QuestionPaper>) -> AppResult<Vec<QuestionPaperDto>> {
        let refs = load_user_refs(self.users.as_ref(), papers.iter().map(|p| p.created_by)).await?;
        Ok(papers
            .into_iter()
            .map(|paper| {
                let creator = user_ref(&refs, &paper.created_by);
                QuestionPaperDto::new(paper, creator)
            })
            .collect())
    }

    async fn populate_one(&self, paper: QuestionPaper) -> AppResult<QuestionPaperDto> {
        let mut populated = self.populate(vec![paper]).await?;
        populated.pop().ok_or_else(paper_not_found)
    }

    pub async fn create(&self, admin: &User, request: QuestionPaperRequest) -> AppResult<QuestionPaper> {
        let validated = request.validate_paper()?;
        let paper = QuestionPaper::new(
            validated.class,
            validated.subject,
            validated.questions,
            validated.schedule.unwrap_or_else(Schedule::once_now),
            admin.id,
        );

        let paper = self.repository.create(paper).await?;
        log::info!(
            "Admin {} created question paper {} ({} / {}, {} questions)",
            admin.id_hex(),
            paper.id.to_hex(),
            paper.class,
            paper.subject,
            paper.questions.len()
        );
        Ok(paper)
    }

    pub async fn list(&self, query: PaperListQuery) -> AppResult<PaperPage> {
        let filter = PaperFilter {
            class: non_blank(query.class.as_deref()),
            subject: non_blank(query.subject.as_deref()),
        };
        let (page, limit) = (query.page(), query.limit());

        let (papers, total) = self.repository.list(filter, query.offset(), limit).await?;

        Ok(PaperPage {
            papers: self.populate(papers).await?,
            pagination: Pagination::new(page, limit, total),
        })
    }

    pub async fn get(&self, id: &str) -> AppResult<QuestionPaperDto> {
        let id = parse_object_id(id)?;
        let paper = self
            .repository
            .find_by_id(&id)
            .await?
            .ok_or_else(paper_not_found)?;
        self.populate_one(paper).await
    }

    /// Replaces the paper's content. The stored schedule is kept when the
    /// request carries none.
    pub async fn update(&self, id: &str, request: QuestionPaperRequest) -> AppResult<QuestionPaperDto> {
        let id = parse_object_id(id)?;
        let validated = request.validate_paper()?;

        let mut paper = self
            .repository
            .find_by_id(&id)
            .await?
            .ok_or_else(paper_not_found)?;

        paper.class = validated.class;
        paper.subject = validated.subject;
        paper.questions = validated.questions;
        if let Some(schedule) = validated.schedule {
            paper.schedule = schedule;
        }
        paper.updated_at = DateTime::now();

        if !self.repository.replace(&paper).await? {
            return Err(paper_not_found());
        }

        log::info!("Updated question paper {}", paper.id.to_hex());
        self.populate_one(paper).await
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let id = parse_object_id(id)?;
        if !self.repository.delete(&id).await? {
            return Err(paper_not_found());
        }
        log::info!("Deleted question paper {}", id.to_hex());
        Ok(())
    }

    pub async fn bulk_delete(&self, request: BulkDeleteRequest) -> AppResult<u64> {
        let ids = request.paper_ids.unwrap_or_default();
        if ids.is_empty() {
            return Err(AppError::ValidationError("Paper IDs array is required".to_string()));
        }

        let ids = ids
            .iter()
            .map(|id| parse_object_id(id))
            .collect::<AppResult<Vec<ObjectId>>>()?;

        let deleted = self.repository.delete_many(&ids).await?;
        log::info!("Bulk deleted {} of {} question papers", deleted, ids.len());
        Ok(deleted)
    }

    pub async fn stats(&self) -> AppResult<PaperStats> {
        self.repository.stats().await
    }
}
