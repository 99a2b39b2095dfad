use apiweave_core::http::{IntoResponse, Response, StatusCode};
use apiweave_core::prelude::*;
use apiweave_core::AuthScheme;
use apiweave_security::{Claims, CurrentUser, HttpBasicAuth, HttpTokenAuth, TokenIssuer};
use apiweave_test::TestApp;
use serde_json::json;

#[derive(Debug, Clone)]
struct User {
    name: String,
    roles: Vec<String>,
}

fn lookup(username: &str) -> Option<User> {
    match username {
        "admin" => Some(User {
            name: "admin".into(),
            roles: vec!["admin".into()],
        }),
        "john" => Some(User {
            name: "john".into(),
            roles: vec!["user".into()],
        }),
        _ => None,
    }
}

fn basic_auth() -> HttpBasicAuth<User> {
    HttpBasicAuth::new(|username: &str, password: &str| {
        (password == "secret").then(|| lookup(username)).flatten()
    })
    .roles(|user: &User| user.roles.clone())
}

fn token_auth() -> HttpTokenAuth<User> {
    HttpTokenAuth::new(|token: &str| match token {
        "admin-token" => lookup("admin"),
        "john-token" => lookup("john"),
        _ => None,
    })
    .roles(|user: &User| user.roles.clone())
}

async fn whoami(CurrentUser(user): CurrentUser<User>) -> Reply {
    Reply::new(json!({"message": format!("Hello, {}!", user.name)}))
}

async fn maybe(user: Option<CurrentUser<User>>) -> Reply {
    let name = user.map(|u| u.name.clone()).unwrap_or_else(|| "anonymous".into());
    Reply::new(json!({"name": name}))
}

fn app() -> TestApp {
    let basic = basic_auth();
    let token = token_auth();
    TestApp::from_app(
        ApiApp::new()
            .route(Route::get("/basic", whoami).auth_required(&basic))
            .route(Route::get("/token", whoami).auth_required(&token))
            .route(
                Route::get("/admin", whoami)
                    .auth_required_with(AuthRequirement::new(token.clone()).roles(["admin"])),
            )
            .route(
                Route::get("/maybe", maybe)
                    .auth_required_with(AuthRequirement::new(token).optional(true)),
            )
            .route(Route::get("/open", whoami)),
    )
}

// ── Basic ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn basic_credentials_resolve_current_user() {
    app()
        .get("/basic")
        .basic("john", "secret")
        .send()
        .await
        .assert_ok()
        .assert_json_path("message", "Hello, john!");
}

#[tokio::test]
async fn missing_basic_credentials_get_challenge() {
    app()
        .get("/basic")
        .send()
        .await
        .assert_unauthorized()
        .assert_header("www-authenticate", "Basic realm=\"Authentication Required\"")
        .assert_json_path("message", "Unauthorized");
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    app()
        .get("/basic")
        .basic("john", "nope")
        .send()
        .await
        .assert_unauthorized();
}

#[tokio::test]
async fn bearer_header_is_not_basic_credentials() {
    app()
        .get("/basic")
        .bearer("john-token")
        .send()
        .await
        .assert_unauthorized();
}

// ── Token ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn bearer_token_resolves_current_user() {
    app()
        .get("/token")
        .bearer("admin-token")
        .send()
        .await
        .assert_ok()
        .assert_json_path("message", "Hello, admin!");
}

#[tokio::test]
async fn unknown_token_gets_bearer_challenge() {
    app()
        .get("/token")
        .bearer("garbage")
        .send()
        .await
        .assert_unauthorized()
        .assert_header("www-authenticate", "Bearer realm=\"Authentication Required\"");
}

#[tokio::test]
async fn missing_role_is_forbidden_without_challenge() {
    let response = app().get("/admin").bearer("john-token").send().await;
    let response = response.assert_forbidden();
    assert!(response.header("www-authenticate").is_none());

    app()
        .get("/admin")
        .bearer("admin-token")
        .send()
        .await
        .assert_ok();
}

#[tokio::test]
async fn optional_auth_lets_anonymous_requests_through() {
    let app = app();
    app.get("/maybe")
        .send()
        .await
        .assert_ok()
        .assert_json_path("name", "anonymous");
    app.get("/maybe")
        .bearer("garbage")
        .send()
        .await
        .assert_ok()
        .assert_json_path("name", "anonymous");
    app.get("/maybe")
        .bearer("john-token")
        .send()
        .await
        .assert_ok()
        .assert_json_path("name", "john");
}

#[tokio::test]
async fn current_user_without_auth_route_is_unauthorized() {
    app().get("/open").send().await.assert_unauthorized();
}

#[tokio::test]
async fn custom_header_token() {
    let auth = HttpTokenAuth::new(|token: &str| (token == "k-123").then(|| lookup("john")).flatten())
        .header("X-API-Key");
    assert_eq!(auth.scheme_name(), "ApiKeyAuth");
    assert_eq!(
        auth.security_scheme(),
        json!({"type": "apiKey", "in": "header", "name": "X-API-Key"})
    );

    let app = TestApp::from_app(ApiApp::new().route(Route::get("/key", whoami).auth_required(&auth)));
    app.get("/key")
        .header("x-api-key", "k-123")
        .send()
        .await
        .assert_ok()
        .assert_json_path("message", "Hello, john!");
    app.get("/key")
        .bearer("k-123")
        .send()
        .await
        .assert_unauthorized();
}

#[tokio::test]
async fn error_processor_renders_auth_failures() {
    let auth = basic_auth().realm("pets").error_processor(|error: &HttpError| -> Response {
        (error.status, format!("denied: {}", error.message)).into_response()
    });
    let app = TestApp::from_app(ApiApp::new().route(Route::get("/basic", whoami).auth_required(&auth)));
    let response = app.get("/basic").send().await.assert_unauthorized();
    assert_eq!(response.text(), "denied: Unauthorized");
    assert_eq!(response.header("www-authenticate"), Some("Basic realm=\"pets\""));
}

#[tokio::test]
async fn auth_error_status_follows_settings() {
    let auth = basic_auth();
    let app = TestApp::from_app(
        ApiApp::new()
            .settings(ApiSettings::default().auth_error_status_code(403))
            .route(Route::get("/basic", whoami).auth_required(&auth)),
    );
    let response = app.get("/basic").send().await.assert_status(StatusCode::FORBIDDEN);
    assert!(response.header("www-authenticate").is_none());
}

// ── Issued tokens ───────────────────────────────────────────────────────────

async fn claims(CurrentUser(claims): CurrentUser<Claims>) -> Reply {
    Reply::new(json!({"sub": claims.sub, "roles": claims.roles}))
}

#[tokio::test]
async fn issued_tokens_authenticate_routes() {
    let issuer = TokenIssuer::new("petstore-secret");
    let auth = HttpTokenAuth::new(issuer.clone()).roles(|claims: &Claims| claims.roles.clone());
    let app = TestApp::from_app(
        ApiApp::new().route(
            Route::get("/claims", claims)
                .auth_required_with(AuthRequirement::new(auth).roles(["reader"])),
        ),
    );

    let token = issuer.issue("alice", ["reader"]).unwrap();
    app.get("/claims")
        .bearer(&token)
        .send()
        .await
        .assert_ok()
        .assert_json_path("sub", "alice")
        .assert_json_path("roles[0]", "reader");

    let other = TokenIssuer::new("another-secret").issue("mallory", ["reader"]).unwrap();
    app.get("/claims").bearer(&other).send().await.assert_unauthorized();

    let writer = issuer.issue("bob", ["writer"]).unwrap();
    app.get("/claims").bearer(&writer).send().await.assert_forbidden();
}

#[test]
fn security_schemes_describe_adapters() {
    let basic = basic_auth().description("Username and password");
    assert_eq!(basic.scheme_name(), "BasicAuth");
    assert_eq!(
        basic.security_scheme(),
        json!({"type": "http", "scheme": "basic", "description": "Username and password"})
    );
    let token = token_auth();
    assert_eq!(token.scheme_name(), "BearerAuth");
    assert_eq!(token.security_scheme(), json!({"type": "http", "scheme": "bearer"}));
}
