//! Serve the built site.

use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::config::ConfigFile;

/// Run the serve command.
pub async fn run(
    config: &ConfigFile,
    addr: Option<String>,
    dir: Option<PathBuf>,
    open_browser: bool,
) -> Result<()> {
    let dir = dir.unwrap_or_else(|| config.site.output.clone());
    if !dir.exists() {
        anyhow::bail!(
            "Directory not found: {}. Run 'stencil build' first.",
            dir.display()
        );
    }

    let addr = normalize_addr(addr.as_deref().unwrap_or(&config.serve.addr));
    let listener = bind(&addr).await?;
    let local = listener.local_addr()?;

    tracing::info!("Serving {} at http://{}", dir.display(), local);

    let app = Router::new().fallback_service(ServeDir::new(&dir));

    if open_browser {
        let host = if local.ip().is_unspecified() {
            "localhost".to_string()
        } else {
            local.ip().to_string()
        };
        let _ = open::that(format!("http://{}:{}", host, local.port()));
    }

    axum::serve(listener, app).await?;

    Ok(())
}

/// Expand the `:PORT` shorthand to every interface.
pub fn normalize_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    }
}

/// Bind a listener. Host names are resolved.
pub async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))
}
