//! API Routes
//!
//! Route handlers organized by resource.

pub mod articles;
pub mod auth;
pub mod backend_users;
pub mod columns;
pub mod health;
pub mod menus;
pub mod mp;
pub mod roles;
pub mod upload;
pub mod users;

/// Default page size of admin listings
pub const ADMIN_PAGE_SIZE: u32 = 20;
