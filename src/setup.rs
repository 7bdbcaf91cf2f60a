//! First-run setup used by the operator tool

use crate::auth::{generate_password, hash_password};
use crate::config::AdminConfig;
use crate::db::{Database, StorageError, StorageResult};
use crate::models::{BackendUser, BackendUserInput, RoleInput};

/// Menus the editor role gets by default
pub const EDITOR_MENUS: &[&str] = &["articles", "columns"];

/// Outcome of [`create_admin`]
#[derive(Debug)]
pub enum AdminBootstrap {
    /// An account with the admin role already exists
    AlreadyPresent,
    /// New account with its one-time password
    Created { user: BackendUser, password: String },
}

/// Ensure an `admin` role exists and that at least one account holds it
pub fn create_admin(db: &Database, admin: &AdminConfig) -> StorageResult<AdminBootstrap> {
    let role = db.ensure_role(&RoleInput {
        name: "admin".to_string(),
        display_name: "Administrator".to_string(),
        description: "Full access".to_string(),
    })?;

    if db.count_backend_users_with_role(role.id)? > 0 {
        return Ok(AdminBootstrap::AlreadyPresent);
    }

    let password = generate_password();
    let user = db.create_backend_user(
        &BackendUserInput {
            username: admin.username.clone(),
            email: admin.email.clone(),
            role_id: role.id,
        },
        &hash_password(&password),
    )?;
    tracing::info!(backend_user_id = user.id, username = %user.username, "Created admin account");

    Ok(AdminBootstrap::Created { user, password })
}

/// What [`init_permissions`] granted
#[derive(Debug, Default)]
pub struct PermissionSummary {
    pub admin_menus: usize,
    /// `None` when there is no editor role
    pub editor_menus: Option<usize>,
    pub missing_menus: Vec<String>,
}

/// Grant every enabled menu to `admin` and the article menus to `editor`
pub fn init_permissions(db: &Database) -> StorageResult<PermissionSummary> {
    let mut summary = PermissionSummary {
        admin_menus: db.grant_all_menus("admin")?,
        ..PermissionSummary::default()
    };

    match db.grant_menus("editor", EDITOR_MENUS) {
        Ok(report) => {
            for name in &report.missing {
                tracing::warn!(menu = %name, "Menu not found, skipped");
            }
            summary.editor_menus = Some(report.granted);
            summary.missing_menus = report.missing;
        }
        Err(StorageError::NotFound(_)) => {
            tracing::warn!("Editor role not found, skipping its permissions");
        }
        Err(e) => return Err(e),
    }

    Ok(summary)
}
