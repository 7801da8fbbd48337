use std::path::{Path, PathBuf};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_status::SetStatus;

/// Serve a built single-page frontend; unknown paths fall back to `index.html`
pub fn spa_service(dir: impl AsRef<Path>) -> ServeDir<SetStatus<ServeFile>> {
    let dist = PathBuf::from(dir.as_ref());
    let index = dist.join("index.html");
    ServeDir::new(dist).not_found_service(ServeFile::new(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum_test::TestServer;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_unknown_paths_fall_back_to_index() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>app</html>").unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();

        let app = Router::new().fallback_service(spa_service(dir.path()));
        let server = TestServer::new(app).unwrap();

        server.get("/app.js").await.assert_text("console.log(1)");
        let res = server.get("/galleries/2024").await;
        assert!(res.text().contains("app"));
    }
}
