use apiweave::http::State;
use apiweave::prelude::*;
use serde_json::json;

use crate::models::{credentials, token_out, Credentials};
use crate::services::Account;
use crate::state::AppState;

async fn issue_token(
    State(state): State<AppState>,
    JsonBody(creds): JsonBody<Credentials>,
) -> Result<Reply, HttpError> {
    let Some(account) = state.users.verify(&creds.username, &creds.password) else {
        tracing::warn!(username = %creds.username, "Token request with bad credentials");
        return Err(HttpError::unauthorized("Invalid username or password."));
    };
    let token = state.issuer.issue(&account.username, account.roles)?;
    Ok(Reply::new(json!({"token": token, "token_type": "Bearer"})))
}

async fn protected(CurrentUser(claims): CurrentUser<Claims>) -> Reply {
    Reply::new(json!({
        "message": format!("Hello, {}!", claims.sub),
        "roles": claims.roles,
    }))
}

async fn basic(CurrentUser(account): CurrentUser<Account>) -> Reply {
    Reply::new(json!({"message": format!("Hello, {}!", account.username)}))
}

pub fn routes(token: &HttpTokenAuth<Claims>, basic_auth: &HttpBasicAuth<Account>) -> RouteGroup<AppState> {
    RouteGroup::new("auth")
        .tag("Auth")
        .route(
            Route::post("/tokens", issue_token)
                .input(credentials(), Location::Json)
                .output(token_out(), 200)
                .doc(Doc::new().summary("Issue a bearer token")),
        )
        .route(Route::get("/protected", protected).auth_required(token))
        .route(Route::get("/basic", basic).auth_required(basic_auth))
}
