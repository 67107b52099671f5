use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use rusqlite::{ffi, Connection};
use tokio::sync::Mutex;

use crate::models::{LinkId, LinkPatch, UserId};
use crate::{models, Error, Result};

const SCHEMA : &str = include_str!("schema.sql");

const USER_BY_ID : &str = "SELECT * FROM users WHERE users.id = ?";
const LINK_BY_ID : &str = "SELECT * FROM links WHERE links.id = ?";

const SQLITE_CONSTRAINT_FOREIGNKEY : i64 = 787;
const SQLITE_CONSTRAINT_UNIQUE : i64 = 2067;

fn error_code_match(
    err : &rusqlite::Error,
    code : ffi::ErrorCode,
    ext : i64,
) -> bool {
    matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == code
                && i64::from(e.extended_code) == ext)
}

macro_rules! db_method {
        ($name:ident (
            &$self:ident,
            $conn:ident
            $(, $pname:ident : $ptype:ty)*
        ) -> $ret:ty $body:block ) => {
            pub async fn $name (&$self, $( $pname : $ptype, )* ) -> $ret {
                let $conn = $self.conn.lock().await;
                tracing::debug!(method = stringify!($name), "db");
                tokio::task::block_in_place(|| $body)
            }
        }
    }

/// The data-access client. One SQLite connection, shared between requests
/// and serialized by an async mutex.
///
/// Every method parks the runtime worker with `block_in_place`, so callers
/// must run on the multi-threaded runtime.
pub struct Db {
    conn : Mutex<Connection>,
}

impl Db {
    pub fn new<P : AsRef<std::path::Path>>(p : P) -> Result<Self> {
        Self::init(Connection::open(p)?)
    }

    /// A private in-memory database, mostly for tests.
    pub fn memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn : Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn : Mutex::new(conn),
        })
    }

    db_method! {insert_user(
        &self,
        conn,
        name : &str,
        password : &str
    ) -> Result<models::User> {
        conn
            .prepare_cached("INSERT INTO users (name, password) VALUES (?, ?)")?
            .execute(rusqlite::params![name, password])
            .map_err(|err| {
                if error_code_match(
                    &err,
                    ffi::ErrorCode::ConstraintViolation,
                    SQLITE_CONSTRAINT_UNIQUE
                ) {
                    Error::DuplicateName(name.to_string())
                } else {
                    err.into()
                }
            })?;

        select_one(&conn, USER_BY_ID, conn.last_insert_rowid())
    }}

    db_method! {get_user(&self, conn, user_id : UserId) -> Result<models::User> {
        let mut stmt = conn.prepare_cached(USER_BY_ID)?;

        let mut rows = stmt.query(rusqlite::params![user_id])?;

        let row = rows.next()?
            .ok_or(Error::UserIdNotFound(user_id))?;

        row_parse(row)
    }}

    db_method! {revoke_tokens(
        &self,
        conn,
        user_id : UserId
    ) -> Result<models::User> {
        let changed = conn
            .prepare_cached(
                "UPDATE users SET token_version = token_version + 1 \
                 WHERE users.id = ?"
            )?
            .execute(rusqlite::params![user_id])?;

        if changed == 0 {
            return Err(Error::UserIdNotFound(user_id));
        }

        select_one(&conn, USER_BY_ID, user_id)
    }}

    db_method! {get_user_by_name(
        &self,
        conn,
        username : &str
    ) -> Result<models::User> {
        let mut stmt = conn
            .prepare_cached("SELECT * FROM users WHERE users.name = ?")?;

        let mut rows = stmt.query(rusqlite::params![username])?;

        let row = rows.next()?
            .ok_or_else(|| Error::UserNameNotFound(username.to_string()))?;

        row_parse(row)
    }}

    db_method! {insert_link(
        &self,
        conn,
        description : &str,
        url : &str,
        posted_by : Option<UserId>
    ) -> Result<models::Link> {
        conn
            .prepare_cached(
                "INSERT INTO links (description, url, posted_by) VALUES (?, ?, ?)"
            )?
            .execute(rusqlite::params![description, url, posted_by])
            .map_err(|err| match posted_by {
                Some(id) if error_code_match(
                    &err,
                    ffi::ErrorCode::ConstraintViolation,
                    SQLITE_CONSTRAINT_FOREIGNKEY
                ) => Error::UserIdNotFound(id),
                _ => err.into(),
            })?;

        select_one(&conn, LINK_BY_ID, conn.last_insert_rowid())
    }}

    db_method! {all_links(&self, conn) -> Result<Vec<models::Link>> {
        let mut stmt = conn.prepare_cached("SELECT * FROM links")?;

        let links = collect_rows(stmt.query([])?);
        links
    }}

    db_method! {get_link(
        &self,
        conn,
        link_id : LinkId
    ) -> Result<Option<models::Link>> {
        let mut stmt = conn.prepare_cached(LINK_BY_ID)?;

        let mut rows = stmt.query(rusqlite::params![link_id])?;

        rows.next()?.map(row_parse).transpose()
    }}

    db_method! {get_links(
        &self,
        conn,
        user_id : UserId
    ) -> Result<Vec<models::Link>> {
        let mut stmt = conn
            .prepare_cached("SELECT * FROM links WHERE links.posted_by = ?")?;

        let links = collect_rows(stmt.query(rusqlite::params![user_id])?);
        links
    }}

    db_method! {link_owner(
        &self,
        conn,
        link_id : LinkId
    ) -> Result<Option<models::User>> {
        let mut stmt = conn.prepare_cached(
            "SELECT users.* FROM links \
             INNER JOIN users ON users.id = links.posted_by \
             WHERE links.id = ?"
        )?;

        let mut rows = stmt.query(rusqlite::params![link_id])?;

        rows.next()?.map(row_parse).transpose()
    }}

    db_method! {update_link(
        &self,
        conn,
        link_id : LinkId,
        patch : LinkPatch
    ) -> Result<models::Link> {
        let changed = conn
            .prepare_cached(
                "UPDATE links SET \
                    description = COALESCE(?, description), \
                    url = COALESCE(?, url) \
                 WHERE links.id = ?"
            )?
            .execute(rusqlite::params![patch.description, patch.url, link_id])?;

        if changed == 0 {
            return Err(Error::LinkNotFound(link_id));
        }

        select_one(&conn, LINK_BY_ID, link_id)
    }}

    db_method! {delete_link(
        &self,
        conn,
        link_id : LinkId
    ) -> Result<models::Link> {
        let link : models::Link = select_one(&conn, LINK_BY_ID, link_id).map_err(|err| {
            match err {
                Error::Sqlite(rusqlite::Error::QueryReturnedNoRows) => {
                    Error::LinkNotFound(link_id)
                },
                err => err,
            }
        })?;

        conn
            .prepare_cached("DELETE FROM links WHERE links.id = ?")?
            .execute(rusqlite::params![link_id])?;

        Ok(link)
    }}
}

fn row_parse<T : FromRow>(row : &rusqlite::Row<'_>) -> Result<T> {
    T::from_row(row)
}

fn select_one<T : FromRow>(conn : &Connection, sql : &str, id : i64) -> Result<T> {
    let mut stmt = conn.prepare_cached(sql)?;
    let mut rows = stmt.query(rusqlite::params![id])?;

    let row = rows.next()?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;

    row_parse(row)
}

fn collect_rows<T : FromRow>(mut rows : rusqlite::Rows<'_>) -> Result<Vec<T>> {
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(row_parse(row)?);
    }

    Ok(out)
}

trait FromRow: Sized {
    fn from_row(row : &rusqlite::Row<'_>) -> Result<Self>;
}

// columns are looked up by name, so `SELECT *` and joins that select
// `users.*` work regardless of table column order
macro_rules! impl_from_row {
        ($table:ident, $ty:ty { $($field:ident),* }) => {
            impl FromRow for $ty {
                fn from_row(row : &rusqlite::Row<'_>) -> Result<$ty> {
                    Ok(Self{
                    $(
                        $field : row.get(stringify!($field))?,
                    )*
                    })
                }
            }
        }
    }

impl_from_row! {users, models::User {
    id, name, password, token_version, created
}}

impl_from_row! {links, models::Link {
    id, description, url, posted_by, created
}}

impl FromSql for models::Time {
    fn column_result(value : ValueRef) -> FromSqlResult<models::Time> {
        let s : String = String::column_result(value)?;

        models::Time::parse(&s)
            .map_err(|err| FromSqlError::Other(Box::new(err)))
    }
}
