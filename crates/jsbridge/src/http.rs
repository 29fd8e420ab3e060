//! Blocking bridge from synchronous script calls to the async [`Host`].

use std::{collections::BTreeMap, future::Future, sync::Arc, sync::OnceLock};

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, header::CONTENT_TYPE};
use serde::Deserialize;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use url::Url;

use crate::{
    charset,
    error::{Error, Result},
    host::{Host, HttpRequest, HttpResponse},
    value::Value,
};

/// Runtime used to wait on host futures from a plain thread.
pub(crate) enum BlockingRuntime {
    /// Multi-thread runtime the session was built in.
    Shared(Handle),
    /// Private current-thread runtime, for sessions built outside any
    /// runtime or on a current-thread one.
    Owned(Option<Runtime>),
}

impl BlockingRuntime {
    pub fn capture() -> Result<Self> {
        // A current-thread runtime makes no progress while its only thread
        // waits on it, so it is never borrowed.
        if let Ok(handle) = Handle::try_current()
            && handle.runtime_flavor() == RuntimeFlavor::MultiThread
        {
            return Ok(Self::Shared(handle));
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self::Owned(Some(runtime)))
    }

    fn block_on<F>(&self, future: F) -> Result<F::Output>
    where
        F: Future + Send,
        F::Output: Send,
    {
        let current = Handle::try_current().ok().map(|h| h.runtime_flavor());
        match (self, current) {
            (Self::Owned(None), _) => Err(Error::Engine("blocking runtime already shut down".into())),
            (Self::Shared(handle), None) => Ok(handle.block_on(future)),
            (Self::Owned(Some(runtime)), None) => Ok(runtime.block_on(future)),
            // A multi-thread worker hands its scheduler off before blocking;
            // on blocking-pool threads this is a no-op.
            (Self::Shared(handle), Some(RuntimeFlavor::MultiThread)) => {
                Ok(tokio::task::block_in_place(|| handle.block_on(future)))
            }
            (Self::Shared(handle), Some(_)) => on_helper_thread(|| handle.block_on(future)),
            (Self::Owned(Some(runtime)), Some(_)) => on_helper_thread(|| runtime.block_on(future)),
        }
    }
}

/// Run `f` on a scoped thread that has no runtime context, so it may block
/// even when the calling thread is inside one.
fn on_helper_thread<T: Send>(f: impl FnOnce() -> T + Send) -> Result<T> {
    std::thread::scope(|scope| scope.spawn(f).join())
        .map_err(|_| Error::Engine("blocking helper thread panicked".into()))
}

impl Drop for BlockingRuntime {
    fn drop(&mut self) {
        // Dropping a runtime from inside another one panics.
        if let Self::Owned(runtime) = self
            && let Some(runtime) = runtime.take()
        {
            runtime.shutdown_background();
        }
    }
}

pub(crate) struct HttpAdapter {
    host: Arc<dyn Host>,
    runtime: BlockingRuntime,
}

impl HttpAdapter {
    pub fn new(host: Arc<dyn Host>, runtime: BlockingRuntime) -> Self {
        Self { host, runtime }
    }

    pub fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    /// Run one request to completion on the captured runtime.
    pub fn send_blocking(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.runtime
            .block_on(self.host.http_request(request))?
            .map_err(Error::Transport)
    }

    pub fn fetch(&self, descriptor: FetchDescriptor) -> Result<FetchResult> {
        tracing::debug!(method = %descriptor.method, url = %descriptor.url, "script fetch");
        let response = self.send_blocking(descriptor.into_request())?;
        FetchResult::from_response(response)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HeaderField {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

impl HeaderField {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
            Self::Flag(b) => b.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FetchOptions {
    method: Option<String>,
    headers: Option<BTreeMap<String, HeaderField>>,
    body: Option<serde_json::Value>,
}

/// A validated request built from `fetch(url, options)` arguments.
#[derive(Debug)]
pub(crate) struct FetchDescriptor {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl FetchDescriptor {
    pub fn parse(url: Option<&str>, options: Option<Value>) -> Result<Self> {
        let url = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::Argument("fetch requires a url".into()))?;
        let url = Url::parse(url).map_err(|e| Error::Argument(format!("invalid url {url:?}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Argument(format!(
                "unsupported url scheme {:?}",
                url.scheme()
            )));
        }

        let options = match options.map(Value::into_tree) {
            None | Some(serde_json::Value::Null) => FetchOptions::default(),
            Some(tree @ serde_json::Value::Object(_)) => serde_json::from_value(tree)
                .map_err(|e| Error::Argument(format!("invalid fetch options: {e}")))?,
            Some(_) => return Err(Error::Argument("fetch options must be an object".into())),
        };

        let method = match options.method.as_deref() {
            None => Method::GET,
            Some(m) => Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                .map_err(|_| Error::Argument(format!("invalid method {m:?}")))?,
        };

        let mut headers = HeaderMap::new();
        for (name, value) in options.headers.unwrap_or_default() {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::Argument(format!("invalid header name {name:?}")))?;
            let header_value = HeaderValue::try_from(value.into_string())
                .map_err(|_| Error::Argument(format!("invalid value for header {name:?}")))?;
            headers.append(header_name, header_value);
        }

        let body = match options.body {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(text)) => Some(Bytes::from(text)),
            Some(json) => {
                if !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                }
                Some(Bytes::from(serde_json::to_vec(&json).map_err(Error::Json)?))
            }
        };

        Ok(Self {
            method,
            url,
            headers,
            body,
        })
    }

    pub fn into_request(self) -> HttpRequest {
        let mut request = HttpRequest::new(self.method, self.url);
        request.headers = self.headers;
        request.body = self.body;
        request
    }
}

/// A successful (status below 400) response as seen by scripts.
#[derive(Debug)]
pub(crate) struct FetchResult {
    response: HttpResponse,
    text: OnceLock<String>,
}

impl FetchResult {
    pub fn from_response(response: HttpResponse) -> Result<Self> {
        let status = response.status;
        if status.as_u16() >= 400 {
            return Err(Error::HttpStatus {
                code: status.as_u16(),
                description: status.canonical_reason().unwrap_or("Unknown Status").to_string(),
            });
        }
        Ok(Self {
            response,
            text: OnceLock::new(),
        })
    }

    pub fn status(&self) -> u16 {
        self.response.status.as_u16()
    }

    pub fn status_text(&self) -> &'static str {
        self.response.status.canonical_reason().unwrap_or("")
    }

    pub fn url(&self) -> &Url {
        &self.response.url
    }

    /// `scheme://host[:port]` of the final URL.
    pub fn base_url(&self) -> String {
        self.response.url.origin().ascii_serialization()
    }

    /// Lower-cased header names; repeated headers are joined with `", "`.
    pub fn headers(&self) -> Vec<(String, String)> {
        let headers = &self.response.headers;
        headers
            .keys()
            .map(|name| {
                let joined = headers
                    .get_all(name)
                    .iter()
                    .map(|v| String::from_utf8_lossy(v.as_bytes()))
                    .collect::<Vec<_>>()
                    .join(", ");
                (name.as_str().to_owned(), joined)
            })
            .collect()
    }

    pub fn text(&self) -> &str {
        self.text.get_or_init(|| {
            charset::decode_text(&self.response.body, self.response.charset())
        })
    }

    pub fn html_source(&self) -> String {
        charset::decode_html(&self.response.body, self.response.charset())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.response.body
    }
}
