use anyhow::Context;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATABASE_URL: &str = "sqlite://lockchat.db";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
}

impl Config {
    /// Reads `PORT` and `DATABASE_URL`, falling back to defaults when unset.
    /// Call `dotenv::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> anyhow::Result<Self> {
        let port = match dotenv::var("PORT") {
            Ok(port) => port.parse().with_context(|| format!("PORT={port:?} is not a port number"))?,
            Err(_) => DEFAULT_PORT,
        };

        let database_url = dotenv::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_owned());

        Ok(Self { port, database_url })
    }
}
