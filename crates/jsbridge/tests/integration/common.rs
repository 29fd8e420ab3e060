use std::{collections::HashMap, path::Path, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, StatusCode, header::CONTENT_TYPE};
use jsbridge::{BoxError, Host, HttpRequest, HttpResponse, Session, SessionBuilder};
use parking_lot::Mutex;
use tracing::Level;

/// In-memory host: canned responses keyed by URL path, with every request
/// and console line recorded.
#[derive(Default)]
pub struct StaticHost {
    routes: Mutex<HashMap<String, (u16, &'static str, Bytes)>>,
    pub requests: Mutex<Vec<HttpRequest>>,
    pub console: Mutex<Vec<(Level, String)>>,
}

impl StaticHost {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, path: &str, status: u16, content_type: &'static str, body: impl Into<Bytes>) {
        self.routes
            .lock()
            .insert(path.to_owned(), (status, content_type, body.into()));
    }

    pub fn console_lines(&self) -> Vec<(Level, String)> {
        self.console.lock().clone()
    }
}

#[async_trait]
impl Host for StaticHost {
    async fn http_request(&self, req: HttpRequest) -> Result<HttpResponse, BoxError> {
        let route = self.routes.lock().get(req.url.path()).cloned();
        let (status, content_type, body) = route.unwrap_or((404, "text/plain", Bytes::new()));

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        let response = HttpResponse {
            status: StatusCode::from_u16(status)?,
            url: req.url.clone(),
            headers,
            body,
        };
        self.requests.lock().push(req);
        Ok(response)
    }

    fn console(&self, level: Level, message: &str) {
        self.console.lock().push((level, message.to_owned()));
    }
}

pub fn builder(host: &Arc<StaticHost>, root: &Path) -> SessionBuilder {
    Session::builder().root_dir(root).host(Arc::clone(host))
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("jsbridge=debug")
        .try_init();
}
