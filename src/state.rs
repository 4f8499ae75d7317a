use std::sync::Arc;

use crate::auth::model::User;
use crate::books::model::Book;
use crate::config::AppConfig;
use crate::mailer::{LogMailer, Mailer, SmtpMailer};
use crate::store::{Collection, JsonCollection};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn Collection<User>>,
    pub books: Arc<dyn Collection<Book>>,
    pub config: Arc<AppConfig>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let users = Arc::new(JsonCollection::open(config.data_dir.join("users.json")).await?)
            as Arc<dyn Collection<User>>;
        let books = Arc::new(JsonCollection::open(config.data_dir.join("books.json")).await?)
            as Arc<dyn Collection<Book>>;

        let mailer: Arc<dyn Mailer> = match &config.smtp {
            Some(smtp) => Arc::new(SmtpMailer::new(smtp)?),
            None => Arc::new(LogMailer),
        };

        Ok(Self::from_parts(users, books, config, mailer))
    }

    pub fn from_parts(
        users: Arc<dyn Collection<User>>,
        books: Arc<dyn Collection<Book>>,
        config: Arc<AppConfig>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            users,
            books,
            config,
            mailer,
        }
    }
}
