use apiweave::prelude::*;
use apiweave_test::TestApp;
use serde_json::{json, Value};

async fn hello(CurrentUser(claims): CurrentUser<Claims>) -> Reply {
    Reply::new(json!({"hello": claims.sub}))
}

#[tokio::test]
async fn prelude_builds_a_documented_protected_app() {
    let issuer = TokenIssuer::new("facade-secret");
    let auth = HttpTokenAuth::new(issuer.clone());
    let app = TestApp::from_app(
        ApiApp::new()
            .route(
                Route::get("/hello", hello)
                    .auth_required(&auth)
                    .output(Schema::new("Hello").field("hello", fields::string()), 200),
            )
            .with(OpenApiPlugin::new(
                OpenApiConfig::new("Facade", "2.0.0").with_spec_format(SpecFormat::Json),
            )),
    );

    let token = issuer.issue("ada", Vec::<String>::new()).unwrap();
    app.get("/hello")
        .bearer(&token)
        .send()
        .await
        .assert_ok()
        .assert_json_path("hello", "ada");
    app.get("/hello").send().await.assert_unauthorized();

    let spec: Value = app.get("/openapi.json").send().await.assert_ok().json();
    assert_eq!(spec["info"]["title"], "Facade");
    assert_eq!(spec["paths"]["/hello"]["get"]["security"], json!([{"BearerAuth": []}]));
    assert_eq!(
        spec["paths"]["/hello"]["get"]["responses"]["200"]["content"]["application/json"]["schema"]["$ref"],
        "#/components/schemas/Hello"
    );
}
