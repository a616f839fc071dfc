//! Project Storage

use crate::error::ServiceError;
use crate::projects::models::*;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Project persistence collaborator
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn list(&self, query: &ProjectQuery) -> Result<Vec<Project>, ServiceError>;

    async fn find(&self, id: Uuid) -> Result<Option<Project>, ServiceError>;

    async fn create(&self, req: CreateProjectRequest) -> Result<Project, ServiceError>;

    /// `None` when no project has this id
    async fn update(
        &self,
        id: Uuid,
        req: UpdateProjectRequest,
    ) -> Result<Option<Project>, ServiceError>;

    /// Returns the deleted project, or `None` when no project has this id
    async fn delete(&self, id: Uuid) -> Result<Option<Project>, ServiceError>;
}

// ============================================
// PostgreSQL
// ============================================

/// `projects` table backed store
#[derive(Clone)]
pub struct PgProjectStore {
    db: PgPool,
}

impl PgProjectStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProjectStore for PgProjectStore {
    async fn list(&self, query: &ProjectQuery) -> Result<Vec<Project>, ServiceError> {
        // Column and direction come from closed enums, never from raw input
        let sql = format!(
            "SELECT * FROM projects
             WHERE ($1::project_category IS NULL OR category = $1)
               AND ($2::BOOLEAN IS NULL OR featured = $2)
             ORDER BY {} {}",
            query.sort.column(),
            query.order.keyword()
        );

        let projects = sqlx::query_as(&sql)
            .bind(query.category)
            .bind(query.featured)
            .fetch_all(&self.db)
            .await?;

        Ok(projects)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Project>, ServiceError> {
        let project = sqlx::query_as("SELECT * FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(project)
    }

    async fn create(&self, req: CreateProjectRequest) -> Result<Project, ServiceError> {
        let project = sqlx::query_as(
            r#"
            INSERT INTO projects (
                title, description, technologies, image_url, live_url,
                github_url, featured, importance, category
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.technologies)
        .bind(&req.image_url)
        .bind(&req.live_url)
        .bind(&req.github_url)
        .bind(req.featured)
        .bind(req.importance)
        .bind(req.category)
        .fetch_one(&self.db)
        .await?;

        Ok(project)
    }

    async fn update(
        &self,
        id: Uuid,
        req: UpdateProjectRequest,
    ) -> Result<Option<Project>, ServiceError> {
        let project = sqlx::query_as(
            r#"
            UPDATE projects SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                technologies = COALESCE($4, technologies),
                image_url = COALESCE($5, image_url),
                live_url = COALESCE($6, live_url),
                github_url = COALESCE($7, github_url),
                featured = COALESCE($8, featured),
                importance = COALESCE($9, importance),
                category = COALESCE($10, category),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.technologies)
        .bind(&req.image_url)
        .bind(&req.live_url)
        .bind(&req.github_url)
        .bind(req.featured)
        .bind(req.importance)
        .bind(req.category)
        .fetch_optional(&self.db)
        .await?;

        Ok(project)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Project>, ServiceError> {
        let project = sqlx::query_as("DELETE FROM projects WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(project)
    }
}

// ============================================
// In-memory
// ============================================

/// Process-local store for tests and local development
#[derive(Default)]
pub struct MemoryProjectStore {
    projects: RwLock<HashMap<Uuid, Project>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn compare(a: &Project, b: &Project, sort: ProjectSort) -> Ordering {
    match sort {
        ProjectSort::Importance => a.importance.cmp(&b.importance),
        ProjectSort::CreatedAt => a.created_at.cmp(&b.created_at),
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn list(&self, query: &ProjectQuery) -> Result<Vec<Project>, ServiceError> {
        let mut projects: Vec<Project> = self
            .projects
            .read()
            .await
            .values()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();

        projects.sort_by(|a, b| match query.order {
            SortOrder::Asc => compare(a, b, query.sort),
            SortOrder::Desc => compare(b, a, query.sort),
        });

        Ok(projects)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Project>, ServiceError> {
        Ok(self.projects.read().await.get(&id).cloned())
    }

    async fn create(&self, req: CreateProjectRequest) -> Result<Project, ServiceError> {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            title: req.title,
            description: req.description,
            technologies: req.technologies,
            image_url: req.image_url,
            live_url: req.live_url,
            github_url: req.github_url,
            featured: req.featured,
            importance: req.importance,
            category: req.category,
            created_at: now,
            updated_at: now,
        };

        self.projects
            .write()
            .await
            .insert(project.id, project.clone());
        Ok(project)
    }

    async fn update(
        &self,
        id: Uuid,
        req: UpdateProjectRequest,
    ) -> Result<Option<Project>, ServiceError> {
        let mut projects = self.projects.write().await;
        Ok(projects.get_mut(&id).map(|project| {
            project.apply(req);
            project.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Project>, ServiceError> {
        Ok(self.projects.write().await.remove(&id))
    }
}
