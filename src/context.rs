use std::sync::Arc;

use crate::database::Db;
use crate::models::UserId;
use crate::{Error, Result};

/// Everything a resolver gets to see about the request it is serving.
#[derive(Clone)]
pub struct RequestContext {
    pub db :      Arc<Db>,
    pub user_id : Option<UserId>,
}

impl RequestContext {
    pub fn anonymous(db : &Arc<Db>) -> Self {
        Self {
            db :      Arc::clone(db),
            user_id : None,
        }
    }

    pub fn authenticated(db : &Arc<Db>, user_id : UserId) -> Self {
        Self {
            db :      Arc::clone(db),
            user_id : Some(user_id),
        }
    }
}

pub fn check_auth(ctx : &RequestContext) -> Result<UserId> {
    ctx.user_id.ok_or(Error::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_required() {
        let db = Arc::new(Db::memory().unwrap());

        assert!(matches!(
            check_auth(&RequestContext::anonymous(&db)),
            Err(Error::Unauthorized)
        ));
        assert_eq!(
            check_auth(&RequestContext::authenticated(&db, 7)).unwrap(),
            7
        );
    }
}
