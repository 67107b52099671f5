use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use async_graphql::http::GraphiQLSource;
use http::{header, HeaderMap, Method, StatusCode};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response};

use crate::context::RequestContext;
use crate::crypto::Issuer;
use crate::database::Db;
use crate::models::UserId;
use crate::schema::LinkSchema;
use crate::{Error, Result};

pub const GRAPHQL_PATH : &str = "/graphql";

pub struct ServerInner {
    pub db :     Arc<Db>,
    pub issuer : Issuer,
    pub schema : LinkSchema,
}

pub type Server = Arc<ServerInner>;

pub async fn serve(server : Server, addr : &SocketAddr) -> Result<()> {
    let make_svc = make_service_fn(move |_conn| {
        let server = Arc::clone(&server);

        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                handle(Arc::clone(&server), req)
            }))
        }
    });

    let srv = hyper::Server::try_bind(addr)?.serve(make_svc);
    tracing::info!(%addr, "listening");

    Ok(srv.await?)
}

/// Routes one request and logs its outcome. Failures become plain-text
/// responses; GraphQL errors are part of a 200 response body.
pub async fn handle(
    server : Server,
    req : Request<Body>,
) -> std::result::Result<Response<Body>, Infallible> {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let res = match route(&server, req).await {
        Ok(res) => res,
        Err(err) => error_response(err),
    };

    tracing::info!(
        status = %res.status(),
        %method,
        %path,
        elapsed = ?start.elapsed(),
        "request"
    );

    Ok(res)
}

async fn route(server : &Server, req : Request<Body>) -> Result<Response<Body>> {
    match (req.method(), req.uri().path()) {
        (&Method::POST, GRAPHQL_PATH) => post_graphql(server, req).await,
        (&Method::GET, GRAPHQL_PATH) => get_graphiql(),
        _ => Err(Error::RouteNotFound),
    }
}

fn get_graphiql() -> Result<Response<Body>> {
    let html = GraphiQLSource::build().endpoint(GRAPHQL_PATH).finish();

    Ok(Response::builder()
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .body(html.into())?)
}

async fn post_graphql(
    server : &Server,
    req : Request<Body>,
) -> Result<Response<Body>> {
    let ctx = match authn(server, req.headers()).await {
        Some(user_id) => RequestContext::authenticated(&server.db, user_id),
        None => RequestContext::anonymous(&server.db),
    };

    let body = hyper::body::to_bytes(req.into_body()).await?;

    let gql_req : async_graphql::Request = serde_json::from_slice(&body)
        .map_err(|err| {
            tracing::debug!(%err, "unparseable graphql request");
            Error::BadRequest
        })?;

    let gql_res = server.schema.execute(gql_req.data(ctx)).await;

    Ok(Response::builder()
        .header(header::CONTENT_TYPE, "application/json")
        .body(serde_json::to_vec(&gql_res)?.into())?)
}

/// The caller named by an `Authorization: Bearer` token, if the token is
/// valid and was issued for the user's current token version. Anything else
/// is treated as an anonymous request.
async fn authn(server : &Server, headers : &HeaderMap) -> Option<UserId> {
    let value = headers.get(header::AUTHORIZATION)?;

    let token = match value.to_str().ok()?.strip_prefix("Bearer ") {
        Some(token) => token.trim(),
        None => {
            tracing::warn!("authorization header is not a bearer token");
            return None;
        },
    };

    let (user_id, version) = match server.issuer.verify(token) {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!(%err, "rejected token");
            return None;
        },
    };

    match server.db.get_user(user_id).await {
        Ok(user) if user.token_version == version => Some(user.id),
        Ok(_) => {
            tracing::warn!(user = user_id, "revoked token");
            None
        },
        Err(err) => {
            tracing::warn!(user = user_id, %err, "token for unknown user");
            None
        },
    }
}

fn error_response(err : Error) -> Response<Body> {
    let (status, body) = match err {
        Error::BadRequest => (StatusCode::BAD_REQUEST, "bad request"),
        Error::RouteNotFound => (StatusCode::NOT_FOUND, "route not found"),
        err => {
            tracing::error!(%err, "internal error");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        },
    };

    let mut res = Response::new(Body::from(body));
    *res.status_mut() = status;
    res
}
