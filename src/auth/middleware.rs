use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage, HttpResponse,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::session::{Identity, SESSION_COOKIE};
use crate::state::AppState;

/// Resolves the active identity for every request and keeps the session alive.
///
/// The resolved `Identity` is inserted into the request extensions. After the
/// handler runs, an authenticated response gets a freshly signed session
/// cookie unless the handler already set or removed it (login, logout).
pub struct SessionMiddleware;

impl<S, B> Transform<S, ServiceRequest> for SessionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = SessionMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionMiddlewareService { service }))
    }
}

pub struct SessionMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for SessionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let identity = state
            .as_ref()
            .and_then(|state| state.strategy.resolve_identity(req.request(), &state.sessions));

        if let Some(identity) = &identity {
            req.extensions_mut().insert(identity.clone());
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let mut res = fut.await?;

            if let (Some(state), Some(identity)) = (state, identity) {
                let handled = res
                    .response()
                    .cookies()
                    .any(|cookie| cookie.name() == SESSION_COOKIE);
                if state.strategy.uses_session() && !handled {
                    match state.sessions.cookie(&identity) {
                        Ok(cookie) => {
                            if let Err(e) = res.response_mut().add_cookie(&cookie) {
                                log::warn!("Failed to refresh session cookie: {}", e);
                            }
                        }
                        Err(e) => log::warn!("Failed to refresh session: {}", e),
                    }
                }
            }

            Ok(res)
        })
    }
}

/// Guard for routes that need an identity.
///
/// Requests without one never reach the handler; they get the active
/// strategy's rejection (login redirect or 401).
pub struct RequireIdentity;

impl<S, B> Transform<S, ServiceRequest> for RequireIdentity
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RequireIdentityService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireIdentityService { service }))
    }
}

pub struct RequireIdentityService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequireIdentityService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let authenticated = req.extensions().contains::<Identity>();
        if authenticated {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) });
        }

        log::warn!("Rejected unauthenticated request to {}", req.path());
        let rejection = match req.app_data::<web::Data<AppState>>() {
            Some(state) => state.strategy.reject(),
            None => HttpResponse::Unauthorized().finish(),
        };
        Box::pin(async move { Ok(req.into_response(rejection).map_into_right_body()) })
    }
}
