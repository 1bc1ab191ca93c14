use crate::ServeError;
use crate::event::PushRequest;
use crate::pipeline::Pipeline;
use http_body_util::BodyExt;
use http_body_util::combinators::BoxBody;
use hyper::body::{Body, Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use shared::http::{make_boxed_error_response, make_text_response};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

const PIPELINES_PREFIX: &str = "/pipelines/";

/// Push endpoint: `POST /pipelines/{name}`.
///
/// Any 2xx acknowledges the delivery. Every error is answered with a 500 so
/// the delivery system redelivers the message.
#[derive(Clone)]
pub struct PipelineService {
    pipelines: Arc<HashMap<String, Arc<Pipeline>>>,
}

impl PipelineService {
    pub fn new(pipelines: Vec<Pipeline>) -> Self {
        let pipelines = pipelines
            .into_iter()
            .map(|pipeline| (pipeline.name().to_string(), Arc::new(pipeline)))
            .collect();
        PipelineService {
            pipelines: Arc::new(pipelines),
        }
    }

    pub async fn dispatch<B>(&self, req: Request<B>) -> Response<BoxBody<Bytes, ServeError>>
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        let Some(pipeline) = req
            .uri()
            .path()
            .strip_prefix(PIPELINES_PREFIX)
            .and_then(|name| self.pipelines.get(name))
            .cloned()
        else {
            tracing::debug!(path = %req.uri().path(), "unknown pipeline");
            return make_boxed_error_response(StatusCode::NOT_FOUND);
        };

        if req.method() != Method::POST {
            return make_boxed_error_response(StatusCode::METHOD_NOT_ALLOWED);
        }

        let body = match req.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                tracing::warn!(pipeline = pipeline.name(), "failed to read push body: {err}");
                return make_boxed_error_response(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

        let result = match PushRequest::from_slice(&body) {
            Ok(push) => pipeline.process(&push.message).await,
            Err(err) => {
                tracing::error!(pipeline = pipeline.name(), error = %err, "rejected push request");
                Err(err.into())
            }
        };

        match result {
            Ok(outcome) => make_text_response(StatusCode::OK, format!("{outcome}\n")),
            Err(err) => make_text_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{err}\n")),
        }
    }
}

impl Service<Request<Incoming>> for PipelineService {
    type Response = Response<BoxBody<Bytes, ServeError>>;
    type Error = ServeError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.dispatch(req).await) })
    }
}
