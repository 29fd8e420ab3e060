use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use http::header::HOST;
use opentelemetry_semantic_conventions::attribute as trace;
use tracing::{Instrument, Span};

use crate::{Error, Request, Response};

pub async fn http_impl(
    span: Span,
    client: &reqwest::Client,
    request: Request,
    max_body_bytes: usize,
) -> Result<Response, Error> {
    let Request {
        method,
        url,
        mut headers,
        body,
    } = request;
    // Drop caller-supplied `Host` and let the HTTP client set it.
    headers.remove(HOST);

    let mut builder = client.request(method, url).headers(headers);
    if let Some(body) = body {
        builder = builder.body(body);
    }

    let resp = match builder.send().instrument(span.clone()).await {
        Ok(r) => {
            let status = r.status();
            span.record(trace::HTTP_RESPONSE_STATUS_CODE, status.as_u16());
            if status.is_server_error() || status.is_client_error() {
                span.record(trace::OTEL_STATUS_CODE, "ERROR");
            }
            r
        }
        Err(e) => {
            span.record(trace::OTEL_STATUS_CODE, "ERROR");
            return Err(Error::Http(e));
        }
    };

    let status = resp.status();
    let url = resp.url().clone();
    let headers = resp.headers().clone();
    let body = match read_body(resp.bytes_stream(), max_body_bytes)
        .instrument(span.clone())
        .await
    {
        Ok(body) => body,
        Err(e) => {
            span.record(trace::OTEL_STATUS_CODE, "ERROR");
            return Err(e);
        }
    };
    span.record(trace::HTTP_RESPONSE_BODY_SIZE, body.len() as u64);
    if status.is_success() {
        span.record(trace::OTEL_STATUS_CODE, "OK");
    }

    Ok(Response {
        status,
        url,
        headers,
        body,
    })
}

async fn read_body<S, E>(stream: S, limit: usize) -> Result<Bytes, Error>
where
    S: Stream<Item = Result<Bytes, E>>,
    Error: From<E>,
{
    let mut stream = std::pin::pin!(stream);
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if buf.len().saturating_add(chunk.len()) > limit {
            return Err(Error::BodyTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}
