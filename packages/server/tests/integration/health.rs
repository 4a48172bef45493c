use crate::common::{TestApp, routes};

#[tokio::test]
async fn health_reports_catalog_reachable() {
    let app = TestApp::spawn().await;

    let res = app.get(routes::HEALTH).await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["status"], "ok");
    assert_eq!(res.body["database"], true);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::spawn().await;

    let res = app.get("/api-docs/openapi.json").await;

    assert_eq!(res.status, 200);
    assert!(res.body["paths"]["/api/v1/uploads"]["post"].is_object());
    assert!(res.body["paths"]["/s/{code}"]["get"].is_object());
    assert!(res.body["components"]["securitySchemes"]["bearer"].is_object());
}
