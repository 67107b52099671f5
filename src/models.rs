use serde::Serialize;

pub type Time = crate::time_utils::Time;

pub type UserId = i64;
pub type LinkId = i64;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id :            UserId,
    pub name :          String,
    #[serde(skip)]
    pub password :      String,
    pub token_version : u32,
    pub created :       Time,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub id :          LinkId,
    pub description : String,
    pub url :         String,
    pub posted_by :   Option<UserId>,
    pub created :     Time,
}

/// Fields to change on an existing link. `None` leaves the column as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPatch {
    pub description : Option<String>,
    pub url :         Option<String>,
}
