use std::env;

use anyhow::Context;

use crate::Result;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_domain: String,
    pub server_port: u16,

    pub database_url: String,
}

/// Collects configuration from the environment, failing fast with a
/// descriptive message when the backend is unconfigured instead of
/// surfacing an opaque connection fault later.
pub fn build() -> Result<Config> {
    let database_url = env::var("DATABASE_URL")
        .context("DATABASE_URL is not set; the database backend is unconfigured")?;

    let server_domain = env::var("SERVER_DOMAIN").unwrap_or_else(|_| "localhost".to_string());

    let server_port = match env::var("SERVER_PORT") {
        Ok(port) => port
            .parse()
            .with_context(|| format!("SERVER_PORT is not a valid port number: {port}"))?,
        Err(_) => 8080,
    };

    return Ok(Config {
        server_domain,
        server_port,
        database_url,
    });
}
