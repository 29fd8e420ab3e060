use opentelemetry_semantic_conventions::attribute as trace;
use tracing::{Span, field::Empty};

use crate::Request;

pub fn request_span(request: &Request) -> Span {
    tracing::info_span!(
        "http.request",
        otel.kind = "client",
        { trace::HTTP_REQUEST_METHOD } = request.method.as_str(),
        { trace::SERVER_ADDRESS } = request.url.host_str().unwrap_or_default(),
        { trace::SERVER_PORT } = request.url.port_or_known_default().unwrap_or_default(),
        { trace::URL_FULL } = request.url.as_str(),
        { trace::HTTP_RESPONSE_STATUS_CODE } = Empty,
        { trace::HTTP_RESPONSE_BODY_SIZE } = Empty,
        { trace::OTEL_STATUS_CODE } = Empty,
    )
}
