#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use link_feed::context::RequestContext;
use link_feed::crypto::Issuer;
use link_feed::database::Db;
use link_feed::models::{User, UserId};
use link_feed::schema::{self, LinkSchema, OwnershipPolicy, Variant};

pub fn issuer() -> Issuer {
    Issuer {
        server_name : "links.test".to_string(),
        secret :      b"test-secret".to_vec(),
        ttl :         Duration::from_secs(60),
    }
}

pub struct Harness {
    pub db :     Arc<Db>,
    pub schema : LinkSchema,
}

impl Harness {
    pub fn new(variant : Variant) -> Self {
        Self::with_policy(variant, OwnershipPolicy::AnyAuthenticated)
    }

    pub fn with_policy(variant : Variant, policy : OwnershipPolicy) -> Self {
        Self {
            db :     Arc::new(Db::memory().unwrap()),
            schema : schema::build(variant, policy, issuer()),
        }
    }

    /// Inserts `n` users named `user1`..`userN`, with ids 1..=n.
    pub async fn users(&self, n : usize) -> Vec<User> {
        let mut users = Vec::new();
        for i in 1..=n {
            let name = format!("user{}", i);
            users.push(self.db.insert_user(&name, "unused").await.unwrap());
        }

        users
    }

    pub async fn run(
        &self,
        user_id : Option<UserId>,
        query : &str,
    ) -> async_graphql::Response {
        let ctx = match user_id {
            Some(id) => RequestContext::authenticated(&self.db, id),
            None => RequestContext::anonymous(&self.db),
        };

        self.schema
            .execute(async_graphql::Request::new(query).data(ctx))
            .await
    }

    /// Runs `query` and returns its data, failing on any error.
    pub async fn data(
        &self,
        user_id : Option<UserId>,
        query : &str,
    ) -> serde_json::Value {
        let res = self.run(user_id, query).await;
        assert!(res.errors.is_empty(), "{:?}", res.errors);

        res.data.into_json().unwrap()
    }

    /// Runs `query` and returns its error messages, failing if there are none.
    pub async fn errors(
        &self,
        user_id : Option<UserId>,
        query : &str,
    ) -> Vec<String> {
        let res = self.run(user_id, query).await;
        assert!(!res.errors.is_empty(), "expected errors for {}", query);

        res.errors.into_iter().map(|e| e.message).collect()
    }

    pub async fn feed_len(&self) -> usize {
        self.db.all_links().await.unwrap().len()
    }
}
