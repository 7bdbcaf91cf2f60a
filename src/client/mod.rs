//! Client Library
//!
//! What the two front ends need from the server, without any rendering:
//! - [`MpClient`] and [`AdminClient`]: typed calls over `reqwest`
//! - [`Session`]: current user plus the persisted token
//! - [`guard`]: admin route table and pre-navigation check
//! - [`editor`]: image paste/drop insertion into a rich-text widget
//! - [`pages`]: mini-program page state (launch, register, browse)

pub mod admin;
pub mod date;
pub mod editor;
pub mod error;
pub mod feed;
pub mod guard;
mod http;
pub mod mp;
pub mod pages;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use admin::{AdminClient, AdminSession};
pub use date::format_date;
pub use editor::{EditorError, EditorWidget, ImageInserter, InsertStrategy, PastedFile, UploadHandler};
pub use error::{ClientError, ClientResult};
pub use feed::ArticleFeed;
pub use guard::{GuardDecision, RouteGuard};
pub use mp::MpClient;
pub use session::{FileTokenStore, MemoryTokenStore, Session, TokenStore, TOKEN_KEY};
