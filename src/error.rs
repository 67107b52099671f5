use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("No Link found with id {0}")]
    LinkNotFound(i64),
    #[error("no user with id {0}")]
    UserIdNotFound(i64),
    #[error("no user named {0}")]
    UserNameNotFound(String),
    #[error("name already taken: {0}")]
    DuplicateName(String),
    #[error("invalid credentials")]
    FailedLogin,
    #[error("token duration too big")]
    TokenDurationTooBig,
    #[error("bad request")]
    BadRequest,
    #[error("route not found")]
    RouteNotFound,
    #[error("config: {0}")]
    Config(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Argon2(#[from] argon2::Error),

    #[error(transparent)]
    Time(#[from] std::time::SystemTimeError),

    #[error(transparent)]
    Hyper(#[from] hyper::Error),

    #[error(transparent)]
    Http(#[from] http::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    AddrParse(#[from] std::net::AddrParseError),
}
