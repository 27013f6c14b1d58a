//! Single-page-app static file serving.
//!
//! Files under the frontend directory are served as-is; any other path
//! gets the index file so client-side routes resolve on reload.

use std::path::Path;

use tower_http::services::{ServeDir, ServeFile};

use crate::config::StaticFilesConfig;

pub type SpaService = ServeDir<ServeFile>;

pub fn spa_service(config: &StaticFilesConfig) -> SpaService {
    let directory = Path::new(&config.directory);
    if !directory.is_dir() {
        tracing::warn!(
            directory = %directory.display(),
            "Frontend directory missing; only the API will be served"
        );
    }

    ServeDir::new(directory)
        .append_index_html_on_directories(true)
        .fallback(ServeFile::new(directory.join(&config.index)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use tower::ServiceExt;

    fn frontend() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>app</html>").unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/app.js"), "console.log(1)").unwrap();
        dir
    }

    fn app(directory: &Path) -> Router {
        let config = StaticFilesConfig {
            directory: directory.display().to_string(),
            ..StaticFilesConfig::default()
        };
        Router::new().fallback_service(spa_service(&config))
    }

    async fn get(app: Router, path: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    #[tokio::test]
    async fn serves_files_and_index() {
        let dir = frontend();
        assert_eq!(
            get(app(dir.path()), "/assets/app.js").await,
            (StatusCode::OK, "console.log(1)".to_string())
        );
        assert_eq!(
            get(app(dir.path()), "/").await,
            (StatusCode::OK, "<html>app</html>".to_string())
        );
    }

    #[tokio::test]
    async fn unknown_paths_get_index() {
        let dir = frontend();
        let (status, body) = get(app(dir.path()), "/conversations/abc").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<html>app</html>");
    }

    #[tokio::test]
    async fn missing_directory_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let (status, _) = get(app(&missing), "/anything").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
