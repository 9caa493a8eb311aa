//! Typed channel router: one declaration shared by the authorization
//! endpoint and the client-side channel factory.
//!
//! A presence route declares the shape new members must satisfy and an
//! async authorization resolver; a fire route has neither (nothing to
//! authorize, no membership). The builder makes a resolver-less presence
//! route unrepresentable, and the router rejects duplicate route names
//! when it is assembled rather than at first request.

use crate::error::{AppError, AppResult};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use validator::Validate;

type ErasedResolver<C> = Arc<
    dyn Fn(C, serde_json::Value) -> BoxFuture<'static, AppResult<serde_json::Value>>
        + Send
        + Sync,
>;

/// Whether a route tracks an authorized membership or just broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Presence,
    Fire,
}

/// A fully declared route, ready to register on a [`RouterBuilder`].
pub struct Route<C> {
    def: RouteDef<C>,
}

pub struct RouteDef<C> {
    kind: RouteKind,
    resolve: Option<ErasedResolver<C>>,
}

impl<C: Send + Sync + 'static> Route<C> {
    /// Begin declaring a presence-tracked route whose members must
    /// satisfy the user schema `U`. The returned builder is unusable
    /// until [`PresenceRouteBuilder::auth`] attaches a resolver.
    pub fn presence<U>() -> PresenceRouteBuilder<C, U>
    where
        U: DeserializeOwned + Serialize + Validate + Send + 'static,
    {
        PresenceRouteBuilder {
            _ctx: PhantomData,
            _user: PhantomData,
        }
    }

    /// Declare a plain broadcast route: no membership, no authorization.
    pub fn fire() -> Route<C> {
        Route {
            def: RouteDef {
                kind: RouteKind::Fire,
                resolve: None,
            },
        }
    }
}

impl<C> RouteDef<C> {
    pub fn kind(&self) -> RouteKind {
        self.kind
    }

    pub fn is_presence(&self) -> bool {
        self.kind == RouteKind::Presence
    }

    /// Validate the raw payload against the declared user schema and run
    /// the authorization resolver. Schema failures surface as
    /// [`AppError::Validation`], denials as whatever the resolver returns.
    pub async fn authorize(&self, ctx: C, payload: serde_json::Value) -> AppResult<serde_json::Value> {
        let resolve = self
            .resolve
            .as_ref()
            .ok_or_else(|| AppError::Auth("route has no authorization resolver".to_string()))?;
        resolve(ctx, payload).await
    }
}

/// Intermediate builder: a presence route with a declared user schema
/// but no resolver yet.
pub struct PresenceRouteBuilder<C, U> {
    _ctx: PhantomData<fn(C)>,
    _user: PhantomData<fn(U)>,
}

impl<C, U> PresenceRouteBuilder<C, U>
where
    C: Send + Sync + 'static,
    U: DeserializeOwned + Serialize + Validate + Send + 'static,
{
    /// Attach the authorization resolver. It receives the per-request
    /// context and the schema-validated payload, and returns the user
    /// info to attach to the presence membership (or an error to deny).
    pub fn auth<F, Fut>(self, resolver: F) -> Route<C>
    where
        F: Fn(C, U) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<U>> + Send + 'static,
    {
        let erased: ErasedResolver<C> = Arc::new(
            move |ctx, raw| -> BoxFuture<'static, AppResult<serde_json::Value>> {
                let user = match serde_json::from_value::<U>(raw) {
                    Ok(user) => user,
                    Err(e) => {
                        let err = AppError::Validation(format!("user payload: {}", e));
                        return Box::pin(async move { Err(err) });
                    }
                };
                if let Err(e) = user.validate() {
                    let err = AppError::Validation(format!("user payload: {}", e));
                    return Box::pin(async move { Err(err) });
                }
                let fut = resolver(ctx, user);
                Box::pin(async move {
                    let info = fut.await?;
                    Ok(serde_json::to_value(info)?)
                })
            },
        );
        Route {
            def: RouteDef {
                kind: RouteKind::Presence,
                resolve: Some(erased),
            },
        }
    }
}

/// Immutable registry of routes, keyed by route name.
pub struct Router<C> {
    routes: HashMap<String, RouteDef<C>>,
}

impl<C> Router<C> {
    pub fn builder() -> RouterBuilder<C> {
        RouterBuilder {
            routes: HashMap::new(),
        }
    }

    pub fn get(&self, route: &str) -> Option<&RouteDef<C>> {
        self.routes.get(route)
    }

    /// Ctx-free view shared with the client side: route name to kind.
    pub fn contract(&self) -> RouterContract {
        RouterContract {
            routes: self
                .routes
                .iter()
                .map(|(name, def)| (name.clone(), def.kind))
                .collect(),
        }
    }
}

pub struct RouterBuilder<C> {
    routes: HashMap<String, RouteDef<C>>,
}

impl<C> RouterBuilder<C> {
    /// Register a route. Duplicate names are a construction-time error.
    pub fn route(mut self, name: &str, route: Route<C>) -> AppResult<Self> {
        if self.routes.contains_key(name) {
            return Err(AppError::Config(format!("duplicate route `{}`", name)));
        }
        self.routes.insert(name.to_string(), route.def);
        Ok(self)
    }

    pub fn build(self) -> Router<C> {
        Router {
            routes: self.routes,
        }
    }
}

/// The part of a router the client needs: which routes exist and whether
/// they track membership. Replaces dynamic property interception with an
/// explicit registry lookup.
#[derive(Debug, Clone, Default)]
pub struct RouterContract {
    routes: HashMap<String, RouteKind>,
}

impl RouterContract {
    pub fn kind(&self, route: &str) -> Option<RouteKind> {
        self.routes.get(route).copied()
    }

    pub fn route_names(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(|s| s.as_str())
    }
}
