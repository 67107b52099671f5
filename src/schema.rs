//! GraphQL surface: the `Link` and `User` object types and the root
//! query/mutation resolvers.
//!
//! Each [`Variant`] gets its own set of types. The unauthenticated schema
//! has no `postedBy`, `User`, `signup` or `login` at all, so queries naming
//! them fail validation before any resolver runs.

use async_graphql::{
    Context, EmptySubscription, Object, Request, Response, Result, Schema,
    SimpleObject,
};

use crate::context::{check_auth, RequestContext};
use crate::crypto::{self, Issuer};
use crate::database::Db;
use crate::models::{Link, LinkId, LinkPatch, User, UserId};
use crate::Error;

pub type AuthenticatedSchema = Schema<Query, Mutation, EmptySubscription>;
pub type AnonymousSchema =
    Schema<AnonymousQuery, AnonymousMutation, EmptySubscription>;

#[derive(Clone)]
pub enum LinkSchema {
    Authenticated(AuthenticatedSchema),
    Unauthenticated(AnonymousSchema),
}

impl LinkSchema {
    pub async fn execute(&self, req : impl Into<Request>) -> Response {
        match self {
            LinkSchema::Authenticated(schema) => schema.execute(req).await,
            LinkSchema::Unauthenticated(schema) => schema.execute(req).await,
        }
    }

    pub fn sdl(&self) -> String {
        match self {
            LinkSchema::Authenticated(schema) => schema.sdl(),
            LinkSchema::Unauthenticated(schema) => schema.sdl(),
        }
    }

    pub fn variant(&self) -> Variant {
        match self {
            LinkSchema::Authenticated(_) => Variant::Authenticated,
            LinkSchema::Unauthenticated(_) => Variant::Unauthenticated,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Variant {
    /// Every operation needs a caller identity; links record their poster.
    #[default]
    Authenticated,
    /// Anonymous CRUD, no `postedBy`, no accounts.
    Unauthenticated,
}

/// Who may change or remove a link once it exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OwnershipPolicy {
    /// Any authenticated caller, whoever posted the link.
    #[default]
    AnyAuthenticated,
    /// Only the user the link was posted by.
    OwnerOnly,
}

impl OwnershipPolicy {
    pub async fn authorize(
        self,
        db : &Db,
        caller : UserId,
        link_id : LinkId,
    ) -> crate::Result<()> {
        match self {
            OwnershipPolicy::AnyAuthenticated => Ok(()),
            OwnershipPolicy::OwnerOnly => {
                let link = db
                    .get_link(link_id)
                    .await?
                    .ok_or(Error::LinkNotFound(link_id))?;

                if link.posted_by == Some(caller) {
                    Ok(())
                } else {
                    tracing::warn!(caller, link = link_id, "not the owner");
                    Err(Error::Forbidden)
                }
            },
        }
    }
}

pub fn build(
    variant : Variant,
    policy : OwnershipPolicy,
    issuer : Issuer,
) -> LinkSchema {
    match variant {
        Variant::Authenticated => LinkSchema::Authenticated(
            Schema::build(Query, Mutation, EmptySubscription)
                .data(policy)
                .data(issuer)
                .finish(),
        ),
        Variant::Unauthenticated => LinkSchema::Unauthenticated(
            Schema::build(AnonymousQuery, AnonymousMutation, EmptySubscription)
                .finish(),
        ),
    }
}

/// The request context plus the authenticated caller.
fn caller<'a>(ctx : &Context<'a>) -> Result<(&'a RequestContext, UserId)> {
    let req = ctx.data::<RequestContext>()?;
    let user_id = check_auth(req)?;

    Ok((req, user_id))
}

async fn authorize(
    ctx : &Context<'_>,
    req : &RequestContext,
    user_id : UserId,
    link_id : LinkId,
) -> Result<()> {
    let policy = ctx.data_opt::<OwnershipPolicy>().copied();
    policy
        .unwrap_or_default()
        .authorize(&req.db, user_id, link_id)
        .await?;

    Ok(())
}

/// Omitted, null and empty arguments all leave the field unchanged.
fn present_or_unchanged(arg : Option<String>) -> Option<String> {
    arg.filter(|s| !s.is_empty())
}

async fn post_link(
    req : &RequestContext,
    description : &str,
    url : &str,
    posted_by : Option<UserId>,
) -> crate::Result<Link> {
    let link = req.db.insert_link(description, url, posted_by).await?;
    tracing::info!(link = link.id, posted_by = ?posted_by, "posted link");

    Ok(link)
}

async fn update_link(
    req : &RequestContext,
    id : LinkId,
    description : Option<String>,
    url : Option<String>,
) -> crate::Result<Link> {
    let patch = LinkPatch {
        description : present_or_unchanged(description),
        url :         present_or_unchanged(url),
    };

    let link = req.db.update_link(id, patch).await?;
    tracing::info!(link = link.id, "updated link");

    Ok(link)
}

async fn delete_link(req : &RequestContext, id : LinkId) -> crate::Result<Link> {
    let link = req.db.delete_link(id).await?;
    tracing::info!(link = link.id, "deleted link");

    Ok(link)
}

#[Object]
impl Link {
    async fn id(&self) -> LinkId {
        self.id
    }

    async fn description(&self) -> &str {
        &self.description
    }

    async fn url(&self) -> &str {
        &self.url
    }

    async fn created_at(&self) -> String {
        self.created.to_string()
    }

    // Re-fetches the link and follows its owner on every access.
    async fn posted_by(&self, ctx : &Context<'_>) -> Result<Option<User>> {
        let req = ctx.data::<RequestContext>()?;

        Ok(req.db.link_owner(self.id).await?)
    }
}

#[Object]
impl User {
    async fn id(&self) -> UserId {
        self.id
    }

    async fn name(&self) -> &str {
        &self.name
    }

    async fn links(&self, ctx : &Context<'_>) -> Result<Vec<Link>> {
        let req = ctx.data::<RequestContext>()?;

        Ok(req.db.get_links(self.id).await?)
    }
}

#[derive(SimpleObject)]
pub struct AuthPayload {
    pub token : String,
    pub user :  User,
}

pub struct Query;

#[Object]
impl Query {
    async fn feed(&self, ctx : &Context<'_>) -> Result<Vec<Link>> {
        let (req, _) = caller(ctx)?;

        Ok(req.db.all_links().await?)
    }

    /// A single entry
    async fn entry(
        &self,
        ctx : &Context<'_>,
        #[graphql(desc = "LinkID")] link_id : LinkId,
    ) -> Result<Option<Link>> {
        let (req, _) = caller(ctx)?;

        Ok(req.db.get_link(link_id).await?)
    }
}

pub struct Mutation;

#[Object]
impl Mutation {
    async fn post(
        &self,
        ctx : &Context<'_>,
        description : String,
        url : String,
    ) -> Result<Link> {
        let (req, user_id) = caller(ctx)?;

        Ok(post_link(req, &description, &url, Some(user_id)).await?)
    }

    async fn update(
        &self,
        ctx : &Context<'_>,
        id : LinkId,
        description : Option<String>,
        url : Option<String>,
    ) -> Result<Link> {
        let (req, user_id) = caller(ctx)?;
        authorize(ctx, req, user_id, id).await?;

        Ok(update_link(req, id, description, url).await?)
    }

    async fn delete(&self, ctx : &Context<'_>, id : LinkId) -> Result<Link> {
        let (req, user_id) = caller(ctx)?;
        authorize(ctx, req, user_id, id).await?;

        Ok(delete_link(req, id).await?)
    }

    async fn signup(
        &self,
        ctx : &Context<'_>,
        name : String,
        password : String,
    ) -> Result<AuthPayload> {
        let req = ctx.data::<RequestContext>()?;
        let issuer = ctx.data::<Issuer>()?;

        let encoded = crypto::encode_password(password.as_bytes())?;
        let user = req.db.insert_user(&name, &encoded).await?;
        tracing::info!(user = user.id, "signed up");

        Ok(AuthPayload {
            token : issuer.issue(&user)?,
            user,
        })
    }

    async fn login(
        &self,
        ctx : &Context<'_>,
        name : String,
        password : String,
    ) -> Result<AuthPayload> {
        let req = ctx.data::<RequestContext>()?;
        let issuer = ctx.data::<Issuer>()?;

        let user = match req.db.get_user_by_name(&name).await {
            Ok(user) => user,
            Err(Error::UserNameNotFound(_)) => {
                return Err(Error::FailedLogin.into())
            },
            Err(err) => return Err(err.into()),
        };

        if !crypto::verify_password(&user.password, password.as_bytes())? {
            tracing::warn!(user = user.id, "bad password");
            return Err(Error::FailedLogin.into());
        }

        Ok(AuthPayload {
            token : issuer.issue(&user)?,
            user,
        })
    }
}

/// A link as the unauthenticated schema sees it: no owner.
pub struct AnonymousLink(pub Link);

impl From<Link> for AnonymousLink {
    fn from(link : Link) -> Self {
        AnonymousLink(link)
    }
}

fn anonymous(links : Vec<Link>) -> Vec<AnonymousLink> {
    links.into_iter().map(AnonymousLink).collect()
}

#[Object(name = "Link")]
impl AnonymousLink {
    async fn id(&self) -> LinkId {
        self.0.id
    }

    async fn description(&self) -> &str {
        &self.0.description
    }

    async fn url(&self) -> &str {
        &self.0.url
    }

    async fn created_at(&self) -> String {
        self.0.created.to_string()
    }
}

pub struct AnonymousQuery;

#[Object(name = "Query")]
impl AnonymousQuery {
    async fn feed(&self, ctx : &Context<'_>) -> Result<Vec<AnonymousLink>> {
        let req = ctx.data::<RequestContext>()?;

        Ok(anonymous(req.db.all_links().await?))
    }

    /// A single entry
    async fn entry(
        &self,
        ctx : &Context<'_>,
        #[graphql(desc = "LinkID")] link_id : LinkId,
    ) -> Result<Option<AnonymousLink>> {
        let req = ctx.data::<RequestContext>()?;

        Ok(req.db.get_link(link_id).await?.map(AnonymousLink))
    }
}

pub struct AnonymousMutation;

#[Object(name = "Mutation")]
impl AnonymousMutation {
    async fn post(
        &self,
        ctx : &Context<'_>,
        description : String,
        url : String,
    ) -> Result<AnonymousLink> {
        let req = ctx.data::<RequestContext>()?;

        Ok(post_link(req, &description, &url, None).await?.into())
    }

    async fn update(
        &self,
        ctx : &Context<'_>,
        id : LinkId,
        description : Option<String>,
        url : Option<String>,
    ) -> Result<AnonymousLink> {
        let req = ctx.data::<RequestContext>()?;

        Ok(update_link(req, id, description, url).await?.into())
    }

    async fn delete(
        &self,
        ctx : &Context<'_>,
        id : LinkId,
    ) -> Result<AnonymousLink> {
        let req = ctx.data::<RequestContext>()?;

        Ok(delete_link(req, id).await?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falsy_arguments_mean_unchanged() {
        assert_eq!(present_or_unchanged(None), None);
        assert_eq!(present_or_unchanged(Some(String::new())), None);
        assert_eq!(
            present_or_unchanged(Some("d2".to_string())),
            Some("d2".to_string())
        );
    }

    #[test]
    fn variants_build_distinct_type_sets() {
        let issuer = Issuer {
            server_name : "links.test".to_string(),
            secret :      b"s".to_vec(),
            ttl :         std::time::Duration::from_secs(60),
        };

        let full = build(Variant::Authenticated, OwnershipPolicy::default(), issuer.clone());
        assert_eq!(full.variant(), Variant::Authenticated);
        let sdl = full.sdl();
        for name in ["postedBy", "type User", "signup", "login"] {
            assert!(sdl.contains(name), "missing {}", name);
        }
        assert!(!sdl.contains("Re-fetches"));

        let bare = build(Variant::Unauthenticated, OwnershipPolicy::default(), issuer);
        assert_eq!(bare.variant(), Variant::Unauthenticated);
        let sdl = bare.sdl();
        assert!(sdl.contains("type Link"));
        for name in ["postedBy", "type User", "AuthPayload", "signup", "login"] {
            assert!(!sdl.contains(name), "unexpected {}", name);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn owner_only_policy_checks_posted_by() {
        let db = Db::memory().unwrap();
        let ada = db.insert_user("ada", "x").await.unwrap();
        let bob = db.insert_user("bob", "x").await.unwrap();
        let link = db.insert_link("d", "u", Some(ada.id)).await.unwrap();

        let owner_only = OwnershipPolicy::OwnerOnly;
        assert!(owner_only.authorize(&db, ada.id, link.id).await.is_ok());
        assert!(matches!(
            owner_only.authorize(&db, bob.id, link.id).await,
            Err(Error::Forbidden)
        ));
        assert!(matches!(
            owner_only.authorize(&db, ada.id, 99).await,
            Err(Error::LinkNotFound(99))
        ));

        let anyone = OwnershipPolicy::AnyAuthenticated;
        assert!(anyone.authorize(&db, bob.id, link.id).await.is_ok());
    }
}
