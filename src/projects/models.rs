//! Project Models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Project category enum matching database type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_category", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    #[default]
    Default,
    FullStack,
    FrontEnd,
    BackEnd,
    Mobile,
    Game,
}

/// Portfolio project entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub image_url: String,
    pub live_url: Option<String>,
    pub github_url: Option<String>,
    pub featured: bool,
    pub importance: i32,
    pub category: Category,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Apply a partial update in place
    pub fn apply(&mut self, update: UpdateProjectRequest) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(technologies) = update.technologies {
            self.technologies = technologies;
        }
        if let Some(image_url) = update.image_url {
            self.image_url = image_url;
        }
        if update.live_url.is_some() {
            self.live_url = update.live_url;
        }
        if update.github_url.is_some() {
            self.github_url = update.github_url;
        }
        if let Some(featured) = update.featured {
            self.featured = featured;
        }
        if let Some(importance) = update.importance {
            self.importance = importance;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        self.updated_at = Utc::now();
    }
}

/// Create project request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateProjectRequest {
    pub title: String,

    pub description: String,

    pub technologies: Vec<String>,

    #[validate(url(message = "imageUrl must be a URL address"))]
    pub image_url: String,

    #[validate(url(message = "liveUrl must be a URL address"))]
    pub live_url: Option<String>,

    #[validate(url(message = "githubUrl must be a URL address"))]
    pub github_url: Option<String>,

    pub featured: bool,

    pub importance: i32,

    #[serde(default)]
    pub category: Category,
}

/// Update project request; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProjectRequest {
    pub title: Option<String>,

    pub description: Option<String>,

    pub technologies: Option<Vec<String>>,

    #[validate(url(message = "imageUrl must be a URL address"))]
    pub image_url: Option<String>,

    #[validate(url(message = "liveUrl must be a URL address"))]
    pub live_url: Option<String>,

    #[validate(url(message = "githubUrl must be a URL address"))]
    pub github_url: Option<String>,

    pub featured: Option<bool>,

    pub importance: Option<i32>,

    pub category: Option<Category>,
}

/// Sort column for project listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum ProjectSort {
    #[default]
    #[serde(rename = "importance")]
    Importance,
    #[serde(rename = "createdAt")]
    CreatedAt,
}

impl ProjectSort {
    pub fn column(&self) -> &'static str {
        match self {
            ProjectSort::Importance => "importance",
            ProjectSort::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Project list query parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectQuery {
    pub category: Option<Category>,
    pub featured: Option<bool>,
    pub sort: ProjectSort,
    pub order: SortOrder,
}

impl ProjectQuery {
    /// Whether a project passes the category and featured filters
    pub fn matches(&self, project: &Project) -> bool {
        self.category.map_or(true, |c| project.category == c)
            && self.featured.map_or(true, |f| project.featured == f)
    }
}
