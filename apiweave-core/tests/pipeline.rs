use apiweave_core::prelude::*;
use apiweave_core::http::{HeaderMap, IntoResponse, Parts, Response};
use apiweave_core::validate::{FileSize, OneOf, Range, MB};
use apiweave_core::{AuthOutcome, ApiSettings};
use apiweave_test::{MultipartForm, TestApp};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct PetIn {
    name: String,
    category: String,
}

fn pet_in() -> Schema {
    Schema::new("PetIn")
        .field("name", fields::string().required())
        .field(
            "category",
            fields::string().required().validate(OneOf::new(["dog", "cat"])),
        )
}

fn pet_out() -> Schema {
    Schema::new("PetOut")
        .field("id", fields::integer())
        .field("name", fields::string())
        .field("category", fields::string())
}

async fn create_pet(JsonBody(pet): JsonBody<PetIn>) -> Reply {
    Reply::new(json!({
        "id": 1,
        "name": pet.name,
        "category": pet.category,
        "owner_password": "hunter2",
    }))
}

fn pets_app() -> ApiApp {
    ApiApp::new().route(
        Route::post("/pets", create_pet)
            .input(pet_in(), Location::Json)
            .output(pet_out(), 201),
    )
}

#[tokio::test]
async fn valid_body_reaches_the_handler_and_output_is_shaped() {
    let app = TestApp::from_app(pets_app());
    let resp = app
        .post("/pets")
        .json(&json!({"name": "Buddy", "category": "dog"}))
        .send()
        .await
        .assert_created();
    assert_eq!(resp.json::<Value>(), json!({"id": 1, "name": "Buddy", "category": "dog"}));
}

#[tokio::test]
async fn missing_field_is_reported_per_location() {
    let app = TestApp::from_app(pets_app());
    app.post("/pets")
        .json(&json!({"category": "dog"}))
        .send()
        .await
        .assert_unprocessable()
        .assert_json_path("message", "Validation error")
        .assert_json_path("detail.json.name[0]", "Missing data for required field.");
}

#[tokio::test]
async fn invalid_choice_is_rejected() {
    let app = TestApp::from_app(pets_app());
    app.post("/pets")
        .json(&json!({"name": "Buddy", "category": "bird"}))
        .send()
        .await
        .assert_unprocessable()
        .assert_json_path("detail.json.category[0]", "Must be one of: dog, cat.");
}

#[tokio::test]
async fn unknown_body_fields_are_rejected() {
    let app = TestApp::from_app(pets_app());
    app.post("/pets")
        .json(&json!({"name": "Buddy", "category": "dog", "age": 3}))
        .send()
        .await
        .assert_unprocessable()
        .assert_json_path("detail.json.age[0]", "Unknown field.");
}

#[tokio::test]
async fn configured_validation_status_is_used() {
    let settings = ApiSettings::default().validation_error_status_code(400);
    let app = TestApp::from_app(pets_app().settings(settings));
    app.post("/pets")
        .json(&json!({}))
        .send()
        .await
        .assert_bad_request();
}

#[tokio::test]
async fn invalid_json_is_a_bad_request() {
    let app = TestApp::from_app(pets_app());
    app.post("/pets")
        .header(apiweave_core::http::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .assert_bad_request()
        .assert_json_path("detail.json[0]", "Invalid JSON body.");
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let settings = ApiSettings {
        body_limit: 16,
        ..ApiSettings::default()
    };
    let app = TestApp::from_app(pets_app().settings(settings));
    app.post("/pets")
        .json(&json!({"name": "a very long pet name indeed", "category": "dog"}))
        .send()
        .await
        .assert_status(413u16)
        .assert_json_path("message", "Payload Too Large");
}

#[derive(Deserialize)]
struct Search {
    page: i64,
    tag: Vec<String>,
}

#[derive(Deserialize)]
struct PetId {
    id: i64,
}

async fn search(PathArgs(path): PathArgs<PetId>, QueryArgs(q): QueryArgs<Search>) -> Reply {
    Reply::new(json!({"id": path.id, "page": q.page, "tags": q.tag}))
}

fn search_app() -> ApiApp {
    ApiApp::new().route(
        Route::get("/owners/{id}/pets", search)
            .input(
                Schema::inline().field("id", fields::integer().validate(Range::new().min(1))),
                Location::Path,
            )
            .input(
                Schema::inline()
                    .field("page", fields::integer().load_default(1))
                    .field("tag", fields::list(fields::string()).load_default(json!([]))),
                Location::Query,
            ),
    )
}

#[tokio::test]
async fn path_and_query_are_coerced() {
    let app = TestApp::from_app(search_app());
    app.get("/owners/7/pets?page=2&tag=a&tag=b&other=x")
        .send()
        .await
        .assert_ok()
        .assert_json_path("id", 7)
        .assert_json_path("page", 2)
        .assert_json_path("tags", json!(["a", "b"]));
}

#[tokio::test]
async fn query_defaults_apply() {
    let app = TestApp::from_app(search_app());
    app.get("/owners/7/pets")
        .send()
        .await
        .assert_ok()
        .assert_json_path("page", 1)
        .assert_json_path("tags", json!([]));
}

#[tokio::test]
async fn errors_from_every_location_are_collected() {
    let app = TestApp::from_app(search_app());
    app.get("/owners/0/pets?page=abc")
        .send()
        .await
        .assert_unprocessable()
        .assert_json_path("detail.path.id[0]", "Must be greater than or equal to 1.")
        .assert_json_path("detail.query.page[0]", "Not a valid integer.");
}

async fn accepted() -> Reply {
    Reply::from((json!({"queued": true}), 202))
}

async fn created_by_tuple() -> (StatusCode, Reply) {
    (StatusCode::ACCEPTED, Reply::new(json!({"queued": true})))
}

async fn deleted() -> Reply {
    Reply::empty().status(204)
}

#[tokio::test]
async fn explicit_status_overrides_the_route_default() {
    let app = TestApp::from_app(
        ApiApp::new()
            .route(Route::post("/jobs", accepted).output(empty_schema(), 201))
            .route(Route::put("/jobs", created_by_tuple).output(empty_schema(), 201))
            .route(Route::delete("/jobs", deleted)),
    );
    app.post("/jobs").send().await.assert_status(202u16);
    app.put("/jobs").send().await.assert_status(202u16);
    let resp = app.delete("/jobs").send().await.assert_no_content();
    assert!(resp.body.is_empty());
}

async fn ok_by_tuple() -> (StatusCode, Reply) {
    (StatusCode::OK, Reply::new(json!({"queued": false})))
}

async fn queued() -> Reply {
    Reply::new(json!({"queued": true}))
}

async fn with_headers() -> Reply {
    let mut headers = HeaderMap::new();
    headers.insert("x-job-id", "42".parse().unwrap());
    Reply::from((json!({"queued": true}), headers))
}

#[tokio::test]
async fn an_explicit_200_beats_the_route_default() {
    let app = TestApp::from_app(
        ApiApp::new()
            .route(Route::get("/jobs", ok_by_tuple).output(empty_schema(), 201))
            .route(Route::post("/jobs", queued).output(empty_schema(), 201))
            .route(Route::put("/jobs", with_headers).output(empty_schema(), 202)),
    );
    app.get("/jobs")
        .send()
        .await
        .assert_ok()
        .assert_json_path("queued", false);
    app.post("/jobs").send().await.assert_created();
    app.put("/jobs")
        .send()
        .await
        .assert_status(202u16)
        .assert_header("x-job-id", "42")
        .assert_json_path("queued", true);
}

async fn wrapped() -> Reply {
    Reply::new(json!({
        "data": {"id": 1, "name": "Buddy", "category": "dog", "owner_password": "x"},
        "message": "Success!",
        "code": 200,
    }))
}

async fn unwrapped() -> Reply {
    Reply::new(json!({"id": 1}))
}

fn envelope_settings() -> ApiSettings {
    ApiSettings::default().base_response_schema(
        Schema::new("BaseResponse")
            .field("data", fields::raw())
            .field("message", fields::string())
            .field("code", fields::integer()),
    )
}

#[tokio::test]
async fn base_response_envelope_shapes_the_data_member() {
    let app = TestApp::from_app(
        ApiApp::new()
            .settings(envelope_settings())
            .route(Route::get("/pet", wrapped).output(pet_out(), 200)),
    );
    app.get("/pet")
        .send()
        .await
        .assert_ok()
        .assert_json_path("message", "Success!")
        .assert_json_path("code", 200)
        .assert_json_path("data", json!({"id": 1, "name": "Buddy", "category": "dog"}));
}

#[tokio::test]
async fn missing_data_key_is_a_server_error() {
    let app = TestApp::from_app(
        ApiApp::new()
            .settings(envelope_settings())
            .route(Route::get("/pet", unwrapped).output(pet_out(), 200)),
    );
    app.get("/pet").send().await.assert_status(500u16);
}

#[tokio::test]
async fn no_content_routes_skip_the_envelope() {
    let app = TestApp::from_app(
        ApiApp::new()
            .settings(envelope_settings())
            .route(Route::get("/pet", ok_by_tuple).output(empty_schema(), 204)),
    );
    app.get("/pet")
        .send()
        .await
        .assert_ok()
        .assert_json_path("queued", false);
}

async fn missing_person() -> Result<Reply, HttpError> {
    abort(404, Some("This man is missing."))
}

async fn panics() -> Reply {
    panic!("boom")
}

async fn plain() -> &'static str {
    "plain"
}

#[tokio::test]
async fn handler_errors_use_the_json_envelope() {
    let app = TestApp::from_app(ApiApp::new().route(Route::get("/person", missing_person)));
    let resp = app.get("/person").send().await.assert_not_found();
    assert_eq!(
        resp.json::<Value>(),
        json!({"message": "This man is missing.", "detail": {}})
    );
}

#[tokio::test]
async fn panics_become_json_500s() {
    let app = TestApp::from_app(ApiApp::new().route(Route::get("/boom", panics)));
    app.get("/boom")
        .send()
        .await
        .assert_status(500u16)
        .assert_json_path("message", "Internal Server Error");
}

#[tokio::test]
async fn framework_errors_are_rendered_as_json() {
    let app = TestApp::from_app(ApiApp::new().route(Route::get("/plain", plain)));
    app.get("/nowhere")
        .send()
        .await
        .assert_not_found()
        .assert_json_path("message", "Not Found")
        .assert_json_path("detail", json!({}));

    let resp = app
        .post("/plain")
        .send()
        .await
        .assert_status(405u16)
        .assert_json_path("message", "Method Not Allowed");
    assert!(resp.header("allow").is_some_and(|allow| allow.contains("GET")));
}

#[tokio::test]
async fn raw_responses_pass_through() {
    let app = TestApp::from_app(ApiApp::new().route(Route::get("/plain", plain)));
    let resp = app.get("/plain").send().await.assert_ok();
    assert_eq!(resp.text(), "plain");
}

#[tokio::test]
async fn error_processor_renders_every_error() {
    let app = TestApp::from_app(pets_app().error_processor(|error: &HttpError| {
        let body = json!({"status_code": error.status.as_u16(), "errors": error.detail});
        (error.status, Json(body)).into_response()
    }));
    app.post("/pets")
        .json(&json!({}))
        .send()
        .await
        .assert_unprocessable()
        .assert_json_path("status_code", 422)
        .assert_json_path_fn("errors.json.name", |v| v.is_array());
    app.get("/missing")
        .send()
        .await
        .assert_not_found()
        .assert_json_path("status_code", 404);
}

#[derive(Deserialize)]
struct Upload {
    image: UploadedFile,
    name: String,
}

async fn upload(FileBody(form): FileBody<Upload>) -> Reply {
    Reply::new(json!({"filename": form.image.filename, "size": form.image.len(), "name": form.name}))
}

fn upload_app() -> ApiApp {
    ApiApp::new().route(
        Route::post("/images", upload).input(
            Schema::inline()
                .field("image", fields::file().required().validate(FileSize::new().max(MB)))
                .field("name", fields::string().required()),
            Location::Files,
        ),
    )
}

#[tokio::test]
async fn multipart_files_are_validated_and_extracted() {
    let app = TestApp::from_app(upload_app());
    let form = MultipartForm::new()
        .text("name", "avatar")
        .file("image", "cat.png", "image/png", vec![1u8; 64]);
    app.post("/images")
        .multipart(form)
        .send()
        .await
        .assert_ok()
        .assert_json_path("filename", "cat.png")
        .assert_json_path("size", 64)
        .assert_json_path("name", "avatar");
}

#[tokio::test]
async fn missing_file_is_a_files_error() {
    let app = TestApp::from_app(upload_app());
    app.post("/images")
        .multipart(MultipartForm::new().text("name", "avatar"))
        .send()
        .await
        .assert_unprocessable()
        .assert_json_path("detail.files.image[0]", "Missing data for required field.");
}

#[derive(Deserialize)]
struct Login {
    username: String,
}

async fn login(FormBody(form): FormBody<Login>, HeaderArgs(headers): HeaderArgs<Value>) -> Reply {
    Reply::new(json!({"username": form.username, "request_id": headers["x_request_id"]}))
}

#[tokio::test]
async fn form_and_header_inputs() {
    let app = TestApp::from_app(
        ApiApp::new().route(
            Route::post("/login", login)
                .input(
                    Schema::inline().field("username", fields::string().required()),
                    Location::Form,
                )
                .input(
                    Schema::inline().field("x_request_id", fields::string().required()),
                    Location::Headers,
                ),
        ),
    );
    app.post("/login")
        .form(&[("username", "grey")])
        .header("x-request-id", "req-1")
        .send()
        .await
        .assert_ok()
        .assert_json_path("username", "grey")
        .assert_json_path("request_id", "req-1");

    app.post("/login")
        .form(&[("username", "grey")])
        .send()
        .await
        .assert_unprocessable()
        .assert_json_path("detail.headers.x_request_id[0]", "Missing data for required field.");
}

async fn raw_echo(JsonBody(body): JsonBody<Value>) -> Reply {
    Reply::new(body)
}

#[tokio::test]
async fn unvalidated_inputs_pass_through() {
    let app = TestApp::from_app(ApiApp::new().route(Route::post("/echo", raw_echo).input_with(
        InputSpec::new(Schema::inline().field("a", fields::integer()), Location::Json).validation(false),
    )));
    app.post("/echo")
        .json(&json!({"a": "not a number", "b": 1}))
        .send()
        .await
        .assert_ok()
        .assert_json_path("a", "not a number")
        .assert_json_path("b", 1);
}

/// Accepts `X-User: <name>`; the `admin` user holds the `admin` role.
#[derive(Clone)]
struct HeaderAuth;

impl AuthScheme for HeaderAuth {
    fn scheme_name(&self) -> &str {
        "HeaderAuth"
    }

    fn security_scheme(&self) -> Value {
        json!({"type": "apiKey", "in": "header", "name": "X-User"})
    }

    fn authenticate(&self, parts: &mut Parts) -> AuthOutcome {
        match parts.headers.get("x-user").and_then(|v| v.to_str().ok()) {
            None => AuthOutcome::Missing,
            Some("") => AuthOutcome::Rejected,
            Some("admin") => AuthOutcome::Authenticated {
                roles: vec!["admin".into()],
            },
            Some(_) => AuthOutcome::Authenticated { roles: vec![] },
        }
    }

    fn error_response(&self, error: HttpError) -> Response {
        error.header("www-authenticate", "X-User").into_response()
    }
}

async fn secret(headers: HeaderMap) -> Reply {
    Reply::new(json!({"authenticated": headers.contains_key("x-user")}))
}

fn auth_app() -> ApiApp {
    ApiApp::new()
        .route(Route::get("/me", secret).auth_required(&HeaderAuth))
        .route(
            Route::get("/admin", secret)
                .auth_required_with(AuthRequirement::new(HeaderAuth).roles(["admin"])),
        )
        .route(
            Route::get("/maybe", secret)
                .auth_required_with(AuthRequirement::new(HeaderAuth).optional(true)),
        )
}

#[tokio::test]
async fn auth_requirements_are_enforced() {
    let app = TestApp::from_app(auth_app());
    app.get("/me")
        .send()
        .await
        .assert_unauthorized()
        .assert_header("www-authenticate", "X-User")
        .assert_json_path("message", "Unauthorized");
    app.get("/me").header("x-user", "").send().await.assert_unauthorized();
    app.get("/me").header("x-user", "grey").send().await.assert_ok();

    app.get("/admin").header("x-user", "grey").send().await.assert_forbidden();
    app.get("/admin").header("x-user", "admin").send().await.assert_ok();

    app.get("/maybe")
        .send()
        .await
        .assert_ok()
        .assert_json_path("authenticated", false);
}

#[tokio::test]
async fn auth_error_status_is_configurable() {
    let settings = ApiSettings::default().auth_error_status_code(403);
    let app = TestApp::from_app(auth_app().settings(settings));
    app.get("/me").send().await.assert_forbidden();
}

#[tokio::test]
async fn groups_prefix_their_routes() {
    let app = TestApp::from_app(
        ApiApp::new().group(
            RouteGroup::new("pets")
                .prefix("/api/pets")
                .route(Route::get("/", plain))
                .route(Route::get("/:id", plain)),
        ),
    );
    app.get("/api/pets").send().await.assert_ok();
    app.get("/api/pets/3").send().await.assert_ok();
}

#[test]
fn duplicate_routes_fail_the_build() {
    let result = ApiApp::new()
        .route(Route::get("/a", plain))
        .route(Route::get("/a", plain))
        .build();
    assert!(matches!(result, Err(BuildError::DuplicateRoute { .. })));
}

#[test]
fn relative_paths_fail_the_build() {
    let result = ApiApp::new().route(Route::get("pets", plain)).build();
    assert!(matches!(result, Err(BuildError::InvalidPath { path }) if path == "pets"));
}

#[test]
fn parameter_name_clashes_fail_the_build() {
    let result = ApiApp::new()
        .route(Route::get("/pets/{id}", plain))
        .route(Route::delete("/pets/{pet_id}", plain))
        .build();
    assert!(matches!(
        result,
        Err(BuildError::ConflictingPaths { path, existing })
            if path == "/pets/{pet_id}" && existing == "/pets/{id}"
    ));

    let same_name = ApiApp::new()
        .route(Route::get("/pets/{id}", plain))
        .route(Route::delete("/pets/{id}", plain))
        .build();
    assert!(same_name.is_ok());
}
