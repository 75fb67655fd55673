//! Project service
//!
//! CRUD for the per-user projects that scope keywords, competitors, and
//! tracking data. Every operation takes the authenticated user's id and
//! treats projects owned by someone else as missing.

use crate::db::repositories::ProjectRepository;
use crate::models::{CreateProjectInput, Project, UpdateProjectInput};
use anyhow::Context;
use std::sync::Arc;
use uuid::Uuid;

/// Error types for project operations
#[derive(Debug, thiserror::Error)]
pub enum ProjectServiceError {
    /// Project missing or owned by another user
    #[error("Project not found")]
    NotFound,

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Project service
pub struct ProjectService {
    project_repo: Arc<dyn ProjectRepository>,
}

impl ProjectService {
    pub fn new(project_repo: Arc<dyn ProjectRepository>) -> Self {
        Self { project_repo }
    }

    /// Create a project for a user
    pub async fn create(
        &self,
        user_id: Uuid,
        input: CreateProjectInput,
    ) -> Result<Project, ProjectServiceError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ProjectServiceError::ValidationError(
                "Project name cannot be empty".to_string(),
            ));
        }

        let domain = normalize_domain(&input.domain)?;

        let project = Project::new(user_id, name, domain, input.description);
        let created = self
            .project_repo
            .create(&project)
            .await
            .context("Failed to create project")?;

        Ok(created)
    }

    /// List the user's projects, newest first
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Project>, ProjectServiceError> {
        let projects = self
            .project_repo
            .list_by_user(user_id)
            .await
            .context("Failed to list projects")?;

        Ok(projects)
    }

    /// Get one of the user's projects
    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Project, ProjectServiceError> {
        self.project_repo
            .get_for_user(id, user_id)
            .await
            .context("Failed to get project")?
            .ok_or(ProjectServiceError::NotFound)
    }

    /// Update name, domain, or description of one of the user's projects
    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: UpdateProjectInput,
    ) -> Result<Project, ProjectServiceError> {
        let mut project = self.get(user_id, id).await?;

        if let Some(name) = input.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ProjectServiceError::ValidationError(
                    "Project name cannot be empty".to_string(),
                ));
            }
            project.name = name;
        }

        if let Some(domain) = input.domain {
            project.domain = normalize_domain(&domain)?;
        }

        if let Some(description) = input.description {
            project.description = if description.trim().is_empty() {
                None
            } else {
                Some(description)
            };
        }

        let updated = self
            .project_repo
            .update(&project)
            .await
            .context("Failed to update project")?;

        Ok(updated)
    }

    /// Delete one of the user's projects and all data under it
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), ProjectServiceError> {
        // Ownership check first so a foreign id reads as 404
        self.get(user_id, id).await?;

        self.project_repo
            .delete(id)
            .await
            .context("Failed to delete project")?;

        Ok(())
    }
}

/// Normalize a domain: trim, lowercase, strip scheme / www / trailing slash
pub fn normalize_domain(raw: &str) -> Result<String, ProjectServiceError> {
    let mut domain = raw.trim().to_lowercase();

    for prefix in ["https://", "http://"] {
        if let Some(stripped) = domain.strip_prefix(prefix) {
            domain = stripped.to_string();
            break;
        }
    }
    if let Some(stripped) = domain.strip_prefix("www.") {
        domain = stripped.to_string();
    }
    if let Some(slash) = domain.find('/') {
        domain.truncate(slash);
    }

    if domain.is_empty() || !domain.contains('.') {
        return Err(ProjectServiceError::ValidationError(format!(
            "Invalid domain: '{}'",
            raw.trim()
        )));
    }

    Ok(domain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxProjectRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (ProjectService, Uuid) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, is_active, created_at, updated_at)
             VALUES (?, 'proj@example.com', 'hash', 1, datetime('now'), datetime('now'))",
        )
        .bind(user_id.to_string())
        .execute(pool.as_sqlite().unwrap())
        .await
        .expect("Failed to insert user");

        (ProjectService::new(SqlxProjectRepository::boxed(pool)), user_id)
    }

    fn input(name: &str, domain: &str) -> CreateProjectInput {
        CreateProjectInput {
            name: name.to_string(),
            domain: domain.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (service, user_id) = setup().await;

        let project = service
            .create(user_id, input("My Site", "example.com"))
            .await
            .expect("Failed to create");

        let found = service.get(user_id, project.id).await.expect("Failed to get");
        assert_eq!(found.name, "My Site");
        assert_eq!(found.domain, "example.com");
    }

    #[tokio::test]
    async fn test_create_normalizes_domain() {
        let (service, user_id) = setup().await;

        let project = service
            .create(user_id, input("My Site", "https://WWW.Example.com/path"))
            .await
            .expect("Failed to create");

        assert_eq!(project.domain, "example.com");
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let (service, user_id) = setup().await;

        let result = service.create(user_id, input("  ", "example.com")).await;
        assert!(matches!(result, Err(ProjectServiceError::ValidationError(_))));

        let result = service.create(user_id, input("Site", "not-a-domain")).await;
        assert!(matches!(result, Err(ProjectServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_foreign_project_reads_as_not_found() {
        let (service, user_id) = setup().await;

        let project = service
            .create(user_id, input("My Site", "example.com"))
            .await
            .expect("Failed to create");

        let other_user = Uuid::new_v4();
        let result = service.get(other_user, project.id).await;
        assert!(matches!(result, Err(ProjectServiceError::NotFound)));

        let result = service.delete(other_user, project.id).await;
        assert!(matches!(result, Err(ProjectServiceError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_fields() {
        let (service, user_id) = setup().await;

        let project = service
            .create(user_id, input("Old Name", "example.com"))
            .await
            .expect("Failed to create");

        let updated = service
            .update(
                user_id,
                project.id,
                UpdateProjectInput {
                    name: Some("New Name".to_string()),
                    domain: Some("https://new.example.com".to_string()),
                    description: Some("About the site".to_string()),
                },
            )
            .await
            .expect("Failed to update");

        assert_eq!(updated.name, "New Name");
        assert_eq!(updated.domain, "new.example.com");
        assert_eq!(updated.description.as_deref(), Some("About the site"));
    }

    #[tokio::test]
    async fn test_delete_removes_project() {
        let (service, user_id) = setup().await;

        let project = service
            .create(user_id, input("My Site", "example.com"))
            .await
            .expect("Failed to create");

        service.delete(user_id, project.id).await.expect("Failed to delete");

        let result = service.get(user_id, project.id).await;
        assert!(matches!(result, Err(ProjectServiceError::NotFound)));
    }

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain("Example.COM").unwrap(), "example.com");
        assert_eq!(
            normalize_domain("https://www.example.com/blog/post").unwrap(),
            "example.com"
        );
        assert!(normalize_domain("").is_err());
        assert!(normalize_domain("localhost").is_err());
    }
}
