//! Mini-program pages
//!
//! Page state a renderer can bind to. Pages delegate data access to
//! [`MpClient`], report failures through a [`Toast`] and move between pages
//! through a [`Navigator`]. Nothing here is fatal; every failure ends in a
//! toast.

use std::sync::Arc;
use std::time::Duration;

use super::date::format_date;
use super::feed::ArticleFeed;
use super::mp::MpClient;
use super::session::{MemoryTokenStore, Session};
use crate::models::{Article, Column, User};

/// How long an error stays visible before the detail page goes back
pub const BACK_AFTER_ERROR: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MpPage {
    Home,
    Register,
    ArticleList { column_id: i64, column_name: String },
    ArticleDetail { id: i64 },
}

impl MpPage {
    /// Page URL as the mini-program runtime expects it
    pub fn url(&self) -> String {
        match self {
            MpPage::Home => "/pages/home/home".to_string(),
            MpPage::Register => "/pages/register/register".to_string(),
            MpPage::ArticleList {
                column_id,
                column_name,
            } => format!(
                "/pages/articles/list?columnId={}&columnName={}",
                column_id,
                urlencoding::encode(column_name)
            ),
            MpPage::ArticleDetail { id } => format!("/pages/articles/detail?id={id}"),
        }
    }
}

/// Page stack operations of the host runtime
pub trait Navigator: Send + Sync {
    fn current(&self) -> Option<MpPage>;
    /// Replace the current page
    fn redirect_to(&self, page: MpPage);
    /// Push a page
    fn navigate_to(&self, page: MpPage);
    fn navigate_back(&self);
}

/// Transient notification
pub trait Toast: Send + Sync {
    fn show(&self, message: &str);
}

/// App-wide state: the API client and the logged-in user
pub struct MpApp {
    client: MpClient,
    session: Session<User>,
    navigator: Arc<dyn Navigator>,
    toast: Arc<dyn Toast>,
}

impl MpApp {
    pub fn new(client: MpClient, navigator: Arc<dyn Navigator>, toast: Arc<dyn Toast>) -> Self {
        Self {
            client,
            // The mini-program keeps its user in memory only
            session: Session::new(Arc::new(MemoryTokenStore::new())),
            navigator,
            toast,
        }
    }

    pub fn client(&self) -> &MpClient {
        &self.client
    }

    pub fn user(&self) -> Option<User> {
        self.session.current_user()
    }

    /// Log in with the code from the platform. Users without a phone are sent
    /// to registration unless they are already there.
    pub async fn launch(&self, code: &str) {
        match self.client.login(code).await {
            Ok(user) => {
                let needs_phone = !user.has_phone();
                tracing::info!(user_id = user.id, needs_phone, "Mini-program session started");
                if let Err(e) = self.session.establish(user, None) {
                    tracing::warn!(error = %e, "Failed to store session");
                }
                if needs_phone && self.navigator.current() != Some(MpPage::Register) {
                    self.navigator.redirect_to(MpPage::Register);
                }
            }
            Err(e) => self.toast.show(&e.to_string()),
        }
    }
}

impl std::fmt::Debug for MpApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MpApp").field("client", &self.client).finish_non_exhaustive()
    }
}

/// Registration form
#[derive(Debug, Clone, Default)]
pub struct RegisterPage {
    pub phone: String,
    pub name: String,
}

impl RegisterPage {
    pub async fn submit(&self, app: &MpApp) {
        let Some(current) = app.user() else {
            app.toast.show("please log in first");
            return;
        };

        match app.client.register(&self.phone, &current.openid, &self.name).await {
            Ok(mut user) => {
                if user.openid.is_empty() {
                    user.openid = current.openid;
                }
                app.session.update_user(user);
                app.navigator.redirect_to(MpPage::Home);
            }
            Err(e) => app.toast.show(&e.to_string()),
        }
    }
}

/// Column list
#[derive(Debug, Clone, Default)]
pub struct HomePage {
    pub columns: Vec<Column>,
    pub loading: bool,
}

impl HomePage {
    pub async fn load(&mut self, app: &MpApp) {
        self.loading = true;
        match app.client.columns().await {
            Ok(columns) => self.columns = columns,
            Err(e) => {
                tracing::warn!(error = %e, "Loading columns failed");
                app.toast.show("failed to load columns");
            }
        }
        self.loading = false;
    }

    pub fn open_column(&self, app: &MpApp, column: &Column) {
        app.navigator.navigate_to(MpPage::ArticleList {
            column_id: column.id,
            column_name: column.name.clone(),
        });
    }
}

/// Published articles of one column
#[derive(Debug, Clone)]
pub struct ArticleListPage {
    pub column_name: String,
    pub feed: ArticleFeed,
}

impl ArticleListPage {
    pub fn new(column_id: i64, column_name: &str) -> Self {
        Self {
            column_name: column_name.to_string(),
            feed: ArticleFeed::new(column_id),
        }
    }

    /// Navigation bar title
    pub fn title(&self) -> &str {
        if self.column_name.is_empty() {
            "Articles"
        } else {
            &self.column_name
        }
    }

    pub async fn on_load(&mut self, app: &MpApp) {
        self.load_more(app).await;
    }

    pub async fn on_reach_bottom(&mut self, app: &MpApp) {
        self.load_more(app).await;
    }

    pub async fn on_pull_down_refresh(&mut self, app: &MpApp) {
        if let Err(e) = self.feed.refresh(&app.client).await {
            tracing::warn!(error = %e, "Refreshing articles failed");
            app.toast.show("failed to load");
        }
    }

    pub fn open_article(&self, app: &MpApp, id: i64) {
        app.navigator.navigate_to(MpPage::ArticleDetail { id });
    }

    async fn load_more(&mut self, app: &MpApp) {
        if let Err(e) = self.feed.load_more(&app.client).await {
            tracing::warn!(error = %e, "Loading articles failed");
            app.toast.show("failed to load");
        }
    }
}

/// Article detail
#[derive(Debug, Clone, Default)]
pub struct ArticleDetailPage {
    pub article: Option<Article>,
    /// `created_at` as `YYYY-MM-DD`
    pub created_date: String,
    pub loading: bool,
}

impl ArticleDetailPage {
    /// Load the article; on failure show a toast and go back shortly after
    pub async fn on_load(&mut self, app: &MpApp, id: Option<i64>) {
        let Some(id) = id else {
            app.toast.show("article id is missing");
            go_back_later(app);
            return;
        };

        self.loading = true;
        match app.client.article(id).await {
            Ok(article) => {
                self.created_date = format_date(&article.created_at.to_rfc3339());
                self.article = Some(article);
            }
            Err(e) => {
                tracing::warn!(article_id = id, error = %e, "Loading article failed");
                app.toast.show("failed to load");
                go_back_later(app);
            }
        }
        self.loading = false;
    }

    pub fn title(&self) -> &str {
        match &self.article {
            Some(article) if !article.title.is_empty() => &article.title,
            _ => "Article",
        }
    }

    /// URLs for the image previewer opened on `current`
    pub fn preview_urls(&self, current: &str) -> Vec<String> {
        match &self.article {
            Some(article) if !article.images.is_empty() => article.images.clone(),
            _ => vec![current.to_string()],
        }
    }
}

fn go_back_later(app: &MpApp) {
    let navigator = Arc::clone(&app.navigator);
    tokio::spawn(async move {
        tokio::time::sleep(BACK_AFTER_ERROR).await;
        navigator.navigate_back();
    });
}
