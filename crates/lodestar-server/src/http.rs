//! Request routing and JSON responses, hyper http1.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{CONTENT_TYPE, LOCATION};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

use lodestar_index::IndexError;
use lodestar_paths::Planner;
use lodestar_schema::VocabularyFacts;

use crate::jobs::Job;

pub struct ServerState {
    pub planner: Arc<Planner>,
    pub jobs: mpsc::UnboundedSender<Job>,
}

pub async fn serve(listen: SocketAddr, state: Arc<ServerState>) -> Result<()> {
    let listener = TcpListener::bind(listen)
        .await
        .map_err(|e| anyhow!("failed to bind {listen}: {e}"))?;
    info!(addr = %listen, "listening");

    loop {
        let (stream, _peer) = listener
            .accept()
            .await
            .map_err(|e| anyhow!("accept failed: {e}"))?;
        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| handle_request(req, state.clone()));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                warn!(error = %e, "connection error");
            }
        });
    }
}

#[derive(Debug, Deserialize)]
struct SeedRequest {
    #[serde(rename = "type")]
    ty: String,
    uri: String,
}

async fn handle_request(
    req: Request<Incoming>,
    state: Arc<ServerState>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().trim_end_matches('/').to_string();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let resp = match (method, segments.as_slice()) {
        (Method::GET, ["healthz"]) => text_response(StatusCode::OK, "ok\n"),

        (Method::GET, ["vocabs"]) => json_response(StatusCode::OK, &state.planner.vocabularies()),
        (Method::POST, ["vocabs"]) => {
            let body = req.into_body().collect().await?.to_bytes();
            handle_add_vocabulary(&state, &body)
        }
        (Method::GET, ["vocabs", vid]) => match state.planner.vocabulary(vid) {
            Ok(facts) => json_response(StatusCode::OK, &facts),
            Err(e) => error_response(&e),
        },
        (Method::PUT, ["vocabs", vid]) => {
            let vid = vid.to_string();
            let body = req.into_body().collect().await?.to_bytes();
            handle_update_vocabulary(&state, &vid, &body)
        }
        (Method::DELETE, ["vocabs", vid]) => match state.planner.drop_vocabulary(vid) {
            Ok(()) => {
                enqueue(&state, Job::Purge(vid.to_string()));
                text_response(StatusCode::OK, "")
            }
            Err(e) => error_response(&e),
        },

        (Method::GET, ["types"]) => match state.planner.types() {
            Ok(types) => json_response(StatusCode::OK, &serde_json::json!({ "types": types })),
            Err(e) => error_response(&e),
        },
        (Method::GET, ["types", ty]) => match state.planner.get_type(ty) {
            Ok(entry) => json_response(StatusCode::OK, &entry),
            Err(e) => error_response(&e),
        },
        (Method::GET, ["properties"]) => match state.planner.properties() {
            Ok(props) => {
                json_response(StatusCode::OK, &serde_json::json!({ "properties": props }))
            }
            Err(e) => error_response(&e),
        },
        (Method::GET, ["properties", prop]) => match state.planner.get_property(prop) {
            Ok(entry) => json_response(StatusCode::OK, &entry),
            Err(e) => error_response(&e),
        },

        (Method::GET, ["seeds"]) => match state.planner.seeds() {
            Ok(seeds) => json_response(StatusCode::OK, &serde_json::json!({ "seeds": seeds })),
            Err(e) => error_response(&e),
        },
        (Method::GET, ["seeds", ty]) => match state.planner.type_seeds(ty) {
            Ok(uris) => json_response(StatusCode::OK, &serde_json::json!({ "seeds": uris })),
            Err(e) => error_response(&e),
        },
        (Method::POST, ["seeds"]) => {
            let body = req.into_body().collect().await?.to_bytes();
            handle_add_seed(&state, &body)
        }
        (Method::DELETE, ["seeds", "id", id]) => match state.planner.delete_seed(id) {
            Ok(()) => text_response(StatusCode::OK, ""),
            Err(e) => error_response(&e),
        },
        (Method::GET, ["seeds", "id", id]) => match state.planner.get_seed(id) {
            Ok(seed) => json_response(StatusCode::OK, &seed),
            Err(e) => error_response(&e),
        },

        (Method::GET, ["paths", elm]) => match state.planner.resolve(elm) {
            Ok(resolution) => json_response(StatusCode::OK, &resolution),
            Err(e) => error_response(&e),
        },

        _ => json_error(StatusCode::NOT_FOUND, "not found"),
    };

    Ok(resp)
}

fn handle_add_vocabulary(state: &ServerState, body: &[u8]) -> Response<Full<Bytes>> {
    let facts: VocabularyFacts = match serde_json::from_slice(body) {
        Ok(facts) => facts,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, &format!("invalid document: {e}")),
    };
    match state.planner.store_vocabulary(facts) {
        Ok(vid) => {
            enqueue(state, Job::Analyse(vid.clone()));
            Response::builder()
                .status(StatusCode::CREATED)
                .header(LOCATION, format!("/vocabs/{vid}"))
                .body(Full::new(Bytes::new()))
                .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
        }
        Err(e) => error_response(&e),
    }
}

fn handle_update_vocabulary(state: &ServerState, vid: &str, body: &[u8]) -> Response<Full<Bytes>> {
    let facts: VocabularyFacts = match serde_json::from_slice(body) {
        Ok(facts) => facts,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, &format!("invalid document: {e}")),
    };
    match state.planner.replace_vocabulary(vid, facts) {
        Ok(()) => {
            enqueue(state, Job::Analyse(vid.to_string()));
            text_response(StatusCode::OK, "")
        }
        Err(e) => error_response(&e),
    }
}

fn handle_add_seed(state: &ServerState, body: &[u8]) -> Response<Full<Bytes>> {
    let request: SeedRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, &format!("invalid seed: {e}")),
    };
    match state.planner.add_seed(&request.ty, &request.uri) {
        Ok(id) => json_response(StatusCode::CREATED, &serde_json::json!({ "id": id })),
        Err(e) => error_response(&e),
    }
}

fn enqueue(state: &ServerState, job: Job) {
    if state.jobs.send(job).is_err() {
        warn!("job worker is gone; analysis not scheduled");
    }
}

fn status_for(err: &IndexError) -> StatusCode {
    match err {
        IndexError::Validation(_) => StatusCode::BAD_REQUEST,
        IndexError::NotFound(_) => StatusCode::NOT_FOUND,
        IndexError::Conflict(_) => StatusCode::CONFLICT,
        IndexError::InvalidSeed(_) => StatusCode::NOT_FOUND,
        IndexError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &IndexError) -> Response<Full<Bytes>> {
    json_error(status_for(err), &err.to_string())
}

fn text_response(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from_static(b"internal error"))))
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{\"error\":\"serialize\"}".to_vec());
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from_static(b"{\"error\":\"internal\"}"))))
}

fn json_error(status: StatusCode, msg: &str) -> Response<Full<Bytes>> {
    let v = serde_json::json!({ "error": msg });
    json_response(status, &v)
}
