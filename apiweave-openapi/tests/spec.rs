use apiweave_core::http::{IntoResponse, Parts, Response};
use apiweave_core::prelude::*;
use apiweave_core::{AuthOutcome, AuthRequirement, AuthScheme};
use apiweave_openapi::{OpenApiConfig, OpenApiPlugin, SpecFormat, Tag};
use apiweave_test::TestApp;
use serde_json::{json, Value};

// ── Helpers ─────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct KeyAuth;

impl AuthScheme for KeyAuth {
    fn scheme_name(&self) -> &str {
        "ApiKeyAuth"
    }

    fn security_scheme(&self) -> Value {
        json!({"type": "apiKey", "in": "header", "name": "X-API-Key"})
    }

    fn authenticate(&self, parts: &mut Parts) -> AuthOutcome {
        match parts.headers.get("x-api-key") {
            Some(_) => AuthOutcome::Authenticated { roles: vec![] },
            None => AuthOutcome::Missing,
        }
    }

    fn error_response(&self, error: HttpError) -> Response {
        error.into_response()
    }
}

fn pet_in() -> Schema {
    Schema::new("PetIn")
        .field("name", fields::string().required())
        .field(
            "category",
            fields::string()
                .required()
                .validate(validate::OneOf::new(["dog", "cat"])),
        )
}

fn pet_out() -> Schema {
    Schema::new("PetOut")
        .field("id", fields::integer().dump_only())
        .field("name", fields::string())
        .field("category", fields::string())
}

fn query() -> Schema {
    Schema::inline()
        .field("page", fields::integer().load_default(1))
        .field("per_page", fields::integer().load_default(20).validate(validate::Range::new().max(100)))
}

async fn handler() -> Reply {
    Reply::new(json!({}))
}

async fn spec_of(app: ApiApp) -> Value {
    TestApp::from_app(app.with(OpenApiPlugin::new(OpenApiConfig::new("Pets", "1.0.0"))))
        .get("/openapi.json")
        .send()
        .await
        .assert_ok()
        .json()
}

// ── Document ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_app_has_info_and_no_paths() {
    let spec = spec_of(ApiApp::new()).await;
    assert_eq!(spec["openapi"], "3.0.3");
    assert_eq!(spec["info"]["title"], "Pets");
    assert_eq!(spec["info"]["version"], "1.0.0");
    assert!(spec["paths"].as_object().unwrap().is_empty());
    assert!(spec.get("components").is_none());
}

#[tokio::test]
async fn shared_schema_is_one_component_referenced_twice() {
    let app = ApiApp::new()
        .route(Route::post("/pets", handler).input(pet_in(), Location::Json).output(pet_out(), 201))
        .route(Route::put("/pets/{id}", handler).input(pet_in(), Location::Json).output(pet_out(), 200));
    let spec = spec_of(app).await;

    let schemas = spec["components"]["schemas"].as_object().unwrap();
    assert!(schemas.contains_key("PetIn"));
    assert!(schemas.contains_key("PetOut"));

    let reference = json!({"$ref": "#/components/schemas/PetIn"});
    assert_eq!(
        spec["paths"]["/pets"]["post"]["requestBody"]["content"]["application/json"]["schema"],
        reference
    );
    assert_eq!(
        spec["paths"]["/pets/{id}"]["put"]["requestBody"]["content"]["application/json"]["schema"],
        reference
    );
    assert_eq!(
        spec["paths"]["/pets"]["post"]["responses"]["201"]["content"]["application/json"]["schema"]["$ref"],
        "#/components/schemas/PetOut"
    );
    assert_eq!(schemas["PetIn"]["properties"]["category"]["enum"], json!(["dog", "cat"]));
    assert_eq!(schemas["PetOut"]["properties"]["id"]["readOnly"], true);
}

#[tokio::test]
async fn conflicting_schema_names_fail_the_build() {
    let other = Schema::new("PetIn").field("nickname", fields::string());
    let app = ApiApp::new()
        .route(Route::post("/pets", handler).input(pet_in(), Location::Json))
        .route(Route::post("/dogs", handler).input(other, Location::Json))
        .with(OpenApiPlugin::new(OpenApiConfig::default()));
    let err = app.build().unwrap_err();
    assert!(matches!(err, BuildError::Plugin { plugin: "openapi", .. }));
    assert!(err.to_string().contains("PetIn"));
}

#[test]
fn a_route_on_the_spec_path_fails_the_build() {
    let err = ApiApp::new()
        .route(Route::get("/openapi.json", handler))
        .with(OpenApiPlugin::new(OpenApiConfig::default()))
        .build()
        .unwrap_err();
    assert!(matches!(err, BuildError::Plugin { plugin: "openapi", .. }));
    assert!(err.to_string().contains("GET /openapi.json"), "{err}");

    // Another method on the same path is fine.
    let ok = ApiApp::new()
        .route(Route::post("/openapi.json", handler))
        .with(OpenApiPlugin::new(OpenApiConfig::default()))
        .build();
    assert!(ok.is_ok());
}

#[test]
fn a_route_on_the_docs_path_fails_the_build() {
    let err = ApiApp::new()
        .route(Route::get("/docs", handler))
        .with(OpenApiPlugin::new(OpenApiConfig::default()))
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("GET /docs"), "{err}");

    let without_docs = ApiApp::new()
        .route(Route::get("/docs", handler))
        .with(OpenApiPlugin::new(
            OpenApiConfig::default().with_docs_enabled(false),
        ))
        .build();
    assert!(without_docs.is_ok());
}

#[test]
fn endpoint_paths_must_be_absolute() {
    for config in [
        OpenApiConfig::default().with_spec_path("openapi.json"),
        OpenApiConfig::default().with_docs_path("docs"),
    ] {
        let err = ApiApp::new()
            .with(OpenApiPlugin::new(config))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("must start with '/'"), "{err}");
    }

    let err = ApiApp::new()
        .with(OpenApiPlugin::new(
            OpenApiConfig::default().with_docs_path("/openapi.json"),
        ))
        .build()
        .unwrap_err();
    assert!(matches!(err, BuildError::Plugin { plugin: "openapi", .. }));
}

#[tokio::test]
async fn parameters_come_from_query_and_path() {
    let path = Schema::inline().field("id", fields::integer().required());
    let app = ApiApp::new()
        .route(Route::get("/pets", handler).input(query(), Location::Query))
        .route(Route::get("/pets/{id}", handler).input(path, Location::Path))
        .route(Route::get("/owners/{owner_id}/files/{*rest}", handler));
    let spec = spec_of(app).await;

    let params = spec["paths"]["/pets"]["get"]["parameters"].as_array().unwrap();
    assert_eq!(params.len(), 2);
    assert_eq!(params[0]["name"], "page");
    assert_eq!(params[0]["in"], "query");
    assert_eq!(params[0]["required"], false);
    assert_eq!(params[0]["schema"]["default"], 1);
    assert_eq!(params[1]["schema"]["maximum"], 100);

    let params = &spec["paths"]["/pets/{id}"]["get"]["parameters"];
    assert_eq!(params[0]["schema"]["type"], "integer");
    assert_eq!(params[0]["required"], true);

    let op = &spec["paths"]["/owners/{owner_id}/files/{rest}"]["get"];
    assert_eq!(op["parameters"][0]["name"], "owner_id");
    assert_eq!(op["parameters"][1]["name"], "rest");
    assert_eq!(op["parameters"][1]["schema"]["type"], "string");
}

#[tokio::test]
async fn automatic_responses() {
    let app = ApiApp::new()
        .route(Route::post("/pets", handler).input(pet_in(), Location::Json).output(pet_out(), 201))
        .route(Route::get("/pets/{id}", handler))
        .route(
            Route::delete("/pets/{id}", handler)
                .output(empty_schema(), 204)
                .auth_required_with(AuthRequirement::new(KeyAuth).roles(["admin"])),
        );
    let spec = spec_of(app).await;

    let post = &spec["paths"]["/pets"]["post"]["responses"];
    assert_eq!(post["422"]["description"], "Validation error");
    assert_eq!(
        post["422"]["content"]["application/json"]["schema"]["$ref"],
        "#/components/schemas/ValidationError"
    );
    assert!(post.get("404").is_none());

    let get = &spec["paths"]["/pets/{id}"]["get"]["responses"];
    assert_eq!(get["200"]["description"], "Successful response");
    assert_eq!(get["404"]["description"], "Not found");
    assert!(get.get("422").is_none());

    let delete = &spec["paths"]["/pets/{id}"]["delete"]["responses"];
    assert!(delete["204"].get("content").is_none());
    assert_eq!(delete["401"]["description"], "Authentication error");
    assert_eq!(
        delete["403"]["content"]["application/json"]["schema"]["$ref"],
        "#/components/schemas/HTTPError"
    );
    assert!(spec["components"]["schemas"]["HTTPError"].is_object());
    assert!(spec["components"]["schemas"]["ValidationError"].is_object());
}

#[tokio::test]
async fn validation_status_follows_settings() {
    let app = ApiApp::new()
        .settings(ApiSettings::default().validation_error_status_code(400))
        .route(Route::post("/pets", handler).input(pet_in(), Location::Json));
    let spec = spec_of(app).await;
    let responses = &spec["paths"]["/pets"]["post"]["responses"];
    assert!(responses["400"].is_object());
    assert!(responses.get("422").is_none());
}

#[tokio::test]
async fn doc_overrides_and_security() {
    let app = ApiApp::new()
        .route(
            Route::get("/pets/{id}", handler)
                .output(pet_out(), 200)
                .auth_required(&KeyAuth)
                .doc(
                    Doc::new()
                        .summary("Fetch one pet")
                        .description("Returns the pet with the given id.")
                        .tags(["Pets"])
                        .operation_id("fetchPet")
                        .response(200, "The pet")
                        .response(404, "No such pet")
                        .response(409, ResponseDoc::new().schema(pet_out()))
                        .deprecated()
                        .extension("rate-limit", 10),
                ),
        )
        .route(Route::get("/secret", handler).doc(Doc::new().hide()));
    let spec = spec_of(app).await;

    let op = &spec["paths"]["/pets/{id}"]["get"];
    assert_eq!(op["summary"], "Fetch one pet");
    assert_eq!(op["description"], "Returns the pet with the given id.");
    assert_eq!(op["tags"], json!(["Pets"]));
    assert_eq!(op["operationId"], "fetchPet");
    assert_eq!(op["deprecated"], true);
    assert_eq!(op["x-rate-limit"], 10);
    assert_eq!(op["responses"]["200"]["description"], "The pet");
    assert_eq!(
        op["responses"]["200"]["content"]["application/json"]["schema"]["$ref"],
        "#/components/schemas/PetOut"
    );
    assert_eq!(op["responses"]["404"]["description"], "No such pet");
    assert_eq!(op["responses"]["409"]["description"], "Conflict");
    assert_eq!(op["security"], json!([{"ApiKeyAuth": []}]));
    assert_eq!(
        spec["components"]["securitySchemes"]["ApiKeyAuth"]["name"],
        "X-API-Key"
    );
    assert!(spec["paths"].get("/secret").is_none());
}

#[tokio::test]
async fn auto_summary_and_group_tags() {
    async fn list_pets() -> Reply {
        Reply::new(json!([]))
    }

    let app = ApiApp::new().group(
        RouteGroup::new("pets")
            .prefix("/pets")
            .route(Route::get("/", list_pets)),
    );
    let spec = spec_of(app).await;
    let op = &spec["paths"]["/pets"]["get"];
    assert_eq!(op["summary"], "List Pets");
    assert_eq!(op["tags"], json!(["Pets"]));
    assert!(op.get("operationId").is_none());
    assert_eq!(spec["tags"], json!([{"name": "Pets"}]));
}

#[tokio::test]
async fn unknown_security_scheme_fails_the_build() {
    let app = ApiApp::new()
        .route(Route::get("/pets", handler).doc(Doc::new().security("OAuth2")))
        .with(OpenApiPlugin::new(OpenApiConfig::default()));
    let err = app.build().unwrap_err();
    assert!(err.to_string().contains("OAuth2"));

    let config = OpenApiConfig::default()
        .with_security_scheme("OAuth2", json!({"type": "oauth2", "flows": {}}));
    let app = ApiApp::new()
        .route(Route::get("/pets", handler).doc(Doc::new().security_scopes("OAuth2", ["read"])))
        .with(OpenApiPlugin::new(config));
    let spec: Value = TestApp::from_app(app).get("/openapi.json").send().await.json();
    assert_eq!(spec["paths"]["/pets"]["get"]["security"], json!([{"OAuth2": ["read"]}]));
}

#[tokio::test]
async fn base_response_envelope_is_documented() {
    let base = Schema::new("BaseResponse")
        .field("data", fields::raw())
        .field("message", fields::string())
        .field("code", fields::integer());
    let app = ApiApp::new()
        .settings(ApiSettings::default().base_response_schema(base))
        .route(Route::get("/pets/{id}", handler).output(pet_out(), 200));
    let spec = spec_of(app).await;

    let schema = &spec["paths"]["/pets/{id}"]["get"]["responses"]["200"]["content"]["application/json"]["schema"];
    assert_eq!(schema["properties"]["data"]["$ref"], "#/components/schemas/PetOut");
    assert_eq!(schema["properties"]["message"]["type"], "string");
}

#[tokio::test]
async fn openapi_31_uses_null_types() {
    let schema = Schema::new("Maybe").field("note", fields::string().allow_none());
    let config = OpenApiConfig::new("Pets", "1.0.0").with_openapi_version("3.1.0");
    let app = ApiApp::new()
        .route(Route::get("/maybe", handler).output(schema, 200))
        .with(OpenApiPlugin::new(config));
    let spec: Value = TestApp::from_app(app).get("/openapi.json").send().await.json();
    assert_eq!(spec["openapi"], "3.1.0");
    assert_eq!(
        spec["components"]["schemas"]["Maybe"]["properties"]["note"]["type"],
        json!(["string", "null"])
    );
}

#[tokio::test]
async fn config_tags_processor_and_servers() {
    let config = OpenApiConfig::new("Pets", "1.0.0")
        .with_description("Pet store")
        .with_servers(json!([{"url": "https://pets.example.com"}]))
        .with_tags([Tag::new("Pets").description("Everything about pets")])
        .spec_processor(|mut spec| {
            spec["info"]["x-logo"] = json!("logo.png");
            spec
        });
    let app = ApiApp::new()
        .route(Route::get("/pets", handler))
        .with(OpenApiPlugin::new(config));
    let spec: Value = TestApp::from_app(app).get("/openapi.json").send().await.json();
    assert_eq!(spec["info"]["description"], "Pet store");
    assert_eq!(spec["info"]["x-logo"], "logo.png");
    assert_eq!(spec["servers"][0]["url"], "https://pets.example.com");
    assert_eq!(spec["tags"][0]["description"], "Everything about pets");
}

// ── Endpoints ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn yaml_spec_and_docs_page() {
    let config = OpenApiConfig::new("Pets", "1.0.0")
        .with_spec_path("/openapi.yaml")
        .with_spec_format(SpecFormat::Yaml);
    let app = TestApp::from_app(
        ApiApp::new()
            .route(Route::get("/pets", handler))
            .with(OpenApiPlugin::new(config)),
    );

    let resp = app
        .get("/openapi.yaml")
        .send()
        .await
        .assert_ok()
        .assert_header("content-type", "text/vnd.yaml");
    assert!(resp.text().contains("title: Pets"));

    let resp = app.get("/docs").send().await.assert_ok();
    let page = resp.text();
    assert!(page.contains("swagger-ui"));
    assert!(page.contains("/openapi.yaml"));
}

#[tokio::test]
async fn docs_can_be_disabled() {
    let config = OpenApiConfig::default().with_docs_enabled(false);
    let app = TestApp::from_app(ApiApp::new().with(OpenApiPlugin::new(config)));
    app.get("/docs").send().await.assert_not_found();
    app.get("/openapi.json").send().await.assert_ok();
}

#[tokio::test]
async fn local_spec_file_is_written_at_build() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("openapi.json");
    let config = OpenApiConfig::new("Pets", "1.0.0").with_local_spec_path(&path);
    ApiApp::new()
        .route(Route::get("/pets", handler))
        .with(OpenApiPlugin::new(config))
        .build()
        .unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("{\n  \""));
    let spec: Value = serde_json::from_str(&content).unwrap();
    assert!(spec["paths"]["/pets"]["get"].is_object());
}

#[tokio::test]
async fn plugin_reads_its_config_section() {
    let config = ApiConfig::from_yaml_str(
        "apiweave:\n  openapi:\n    title: From YAML\n    spec_path: /spec.json\n    docs_ui: redoc\n",
    )
    .unwrap();
    let app = TestApp::from_app(
        ApiApp::new().with(OpenApiPlugin::from_config(&config).unwrap()),
    );
    app.get("/spec.json")
        .send()
        .await
        .assert_ok()
        .assert_json_path("info.title", "From YAML");
    assert!(app.get("/docs").send().await.text().contains("redoc"));
}
