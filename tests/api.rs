//! End-to-end tests: real HTTP listener in front of a stubbed ERP portal

use chrono::{Duration, Utc};
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{Value, json};

use erp_attendance::api::{AppState, build_router};
use erp_attendance::config::{Config, Overrides};
use erp_attendance::token::TokenIssuer;

const SECRET: &str = "integration-secret";
const USERNAME: &str = "21A91A0001";

const DASHBOARD: &str = r#"
<html><body>
  <span id="lblUserName">21A91A0001</span>
  <span id="lblStudentName">Jane Doe</span>
  <span id="lblAttendancePercentage">91%</span>
  <table id="tblSubjectAttendance">
    <tr><th>S.No</th><th>Subject</th><th>Faculty</th><th>Held</th><th>Attended</th><th>%</th></tr>
    <tr><td>1</td><td>Data Structures</td><td>Dr. A. Rao</td><td>40</td><td>38</td><td>95.00</td></tr>
    <tr><td colspan="3">Total</td><td>40</td><td>38</td></tr>
    <tr><td>2</td><td>Operating Systems</td><td>Mrs. K. Lakshmi</td><td>36</td><td>31</td><td>86.11</td></tr>
  </table>
</body></html>"#;

fn login_page(view_state: &str) -> String {
    format!(
        r#"<form method="post">
        <input type="hidden" name="__VIEWSTATE" value="{vs}" />
        <input type="hidden" name="__VIEWSTATEGENERATOR" value="C2EE9ABB" />
        <input type="hidden" name="__EVENTVALIDATION" value="ev-{vs}" />
        </form>"#,
        vs = view_state
    )
}

/// Portal stub: accepts password `secret`, rejects anything else
async fn stub_portal(dashboard_status: usize) -> (ServerGuard, Vec<Mock>) {
    let mut server = Server::new_async().await;
    let mut mocks = Vec::new();

    mocks.push(
        server
            .mock("GET", "/Login.aspx")
            .with_header("set-cookie", "ASP.NET_SessionId=e2e; path=/")
            .with_body(login_page("vs-1"))
            .create_async()
            .await,
    );
    mocks.push(
        server
            .mock("POST", "/Login.aspx")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("__VIEWSTATE".into(), "vs-1".into()),
                Matcher::UrlEncoded("btnNext".into(), "Next".into()),
            ]))
            .with_body(login_page("vs-2"))
            .create_async()
            .await,
    );
    mocks.push(
        server
            .mock("POST", "/Login.aspx")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("__VIEWSTATE".into(), "vs-2".into()),
                Matcher::UrlEncoded("btnSubmit".into(), "Submit".into()),
                Matcher::UrlEncoded("txtPassword".into(), "secret".into()),
            ]))
            .with_body("<div class=\"banner\">Welcome JANE DOE</div>")
            .create_async()
            .await,
    );
    mocks.push(
        server
            .mock("POST", "/Login.aspx")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("btnSubmit".into(), "Submit".into()),
                Matcher::UrlEncoded("txtPassword".into(), "wrong".into()),
            ]))
            .with_body(login_page("vs-3"))
            .create_async()
            .await,
    );
    mocks.push(
        server
            .mock("GET", "/StudentDashboard.aspx")
            .with_status(dashboard_status)
            .with_body(DASHBOARD)
            .create_async()
            .await,
    );

    (server, mocks)
}

/// Start the API on an ephemeral port, returning its base URL
async fn spawn_api(portal_url: String) -> String {
    let mut config = Config::default();
    config.apply(Overrides {
        portal_url: Some(portal_url),
        token_secret: Some(SECRET.to_string()),
        timeout_secs: Some(5),
        bind: None,
    });
    let state = AppState::from_config(&config).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });

    format!("http://{}", addr)
}

async fn login(api: &str, username: &str, password: &str) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("{}/api/login", api))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

async fn get_with_token(api: &str, path: &str, token: Option<&str>) -> (u16, Value) {
    let mut request = reqwest::Client::new().get(format!("{}{}", api, path));
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let response = request.send().await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn login_then_dashboard_end_to_end() {
    let (portal, _mocks) = stub_portal(200).await;
    let api = spawn_api(portal.url()).await;

    let (status, body) = login(&api, USERNAME, "secret").await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["success"], json!(true));
    let token = body["token"].as_str().expect("token string");
    assert_eq!(token.split('.').count(), 3);

    let (status, body) = get_with_token(&api, "/api/dashboard", Some(token)).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(
        body,
        json!({
            "success": true,
            "data": {
                "student_name": "Jane Doe",
                "attendance_percentage": "91%",
                "subjects": [
                    {
                        "subject": "Data Structures",
                        "faculty": "Dr. A. Rao",
                        "held": "40",
                        "attended": "38",
                        "percentage": "95.00"
                    },
                    {
                        "subject": "Operating Systems",
                        "faculty": "Mrs. K. Lakshmi",
                        "held": "36",
                        "attended": "31",
                        "percentage": "86.11"
                    }
                ]
            }
        })
    );
}

#[tokio::test]
async fn attendance_returns_subject_rows() {
    let (portal, _mocks) = stub_portal(200).await;
    let api = spawn_api(portal.url()).await;

    let (_, body) = login(&api, USERNAME, "secret").await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = get_with_token(&api, "/api/attendance", Some(&token)).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], json!(true));
    let rows = body["attendance"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["subject"], json!("Operating Systems"));
}

#[tokio::test]
async fn dashboard_without_token_is_401() {
    let (portal, _mocks) = stub_portal(200).await;
    let api = spawn_api(portal.url()).await;

    let (status, body) = get_with_token(&api, "/api/dashboard", None).await;
    assert_eq!(status, 401);
    assert_eq!(body, json!({"success": false, "error": "Token missing"}));
}

#[tokio::test]
async fn dashboard_with_forged_token_is_401() {
    let (portal, _mocks) = stub_portal(200).await;
    let api = spawn_api(portal.url()).await;

    let forged = TokenIssuer::new("some-other-secret")
        .unwrap()
        .issue(USERNAME)
        .unwrap()
        .token;
    let (status, body) = get_with_token(&api, "/api/dashboard", Some(&forged)).await;
    assert_eq!(status, 401);
    assert_eq!(body, json!({"success": false, "error": "Token invalid"}));
}

#[tokio::test]
async fn dashboard_with_expired_token_is_401() {
    let (portal, _mocks) = stub_portal(200).await;
    let api = spawn_api(portal.url()).await;

    let expired = TokenIssuer::new(SECRET)
        .unwrap()
        .issue_at(USERNAME, Utc::now() - Duration::hours(2))
        .unwrap()
        .token;
    let (status, body) = get_with_token(&api, "/api/attendance", Some(&expired)).await;
    assert_eq!(status, 401);
    assert_eq!(body, json!({"success": false, "error": "Token expired"}));
}

#[tokio::test]
async fn wrong_password_is_401() {
    let (portal, _mocks) = stub_portal(200).await;
    let api = spawn_api(portal.url()).await;

    let (status, body) = login(&api, USERNAME, "wrong").await;
    assert_eq!(status, 401);
    assert_eq!(body, json!({"success": false, "error": "Invalid credentials"}));
}

#[tokio::test]
async fn blank_or_missing_credentials_are_400() {
    let (portal, _mocks) = stub_portal(200).await;
    let api = spawn_api(portal.url()).await;
    let client = reqwest::Client::new();

    for body in [
        json!({"username": "", "password": "secret"}),
        json!({"username": USERNAME, "password": "   "}),
        json!({"username": USERNAME}),
        json!({}),
    ] {
        let response = client
            .post(format!("{}/api/login", api))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400, "{body}");
        let json: Value = response.json().await.unwrap();
        assert_eq!(json["success"], json!(false));
    }
}

#[tokio::test]
async fn unreachable_portal_on_login_is_502() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let api = spawn_api(dead).await;

    let (status, body) = login(&api, USERNAME, "secret").await;
    assert_eq!(status, 502);
    assert_eq!(body, json!({"success": false, "error": "ERP portal unreachable"}));
}

#[tokio::test]
async fn dashboard_upstream_error_is_500() {
    let (portal, _mocks) = stub_portal(503).await;
    let api = spawn_api(portal.url()).await;

    let (_, body) = login(&api, USERNAME, "secret").await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = get_with_token(&api, "/api/dashboard", Some(&token)).await;
    assert_eq!(status, 500);
    assert_eq!(body, json!({"success": false, "error": "Dashboard fetch failed"}));
}

#[tokio::test]
async fn valid_token_without_session_is_500() {
    let (portal, _mocks) = stub_portal(200).await;
    let api = spawn_api(portal.url()).await;

    // Signed correctly, but this process never logged the user in.
    let token = TokenIssuer::new(SECRET).unwrap().issue("ghost").unwrap().token;
    let (status, body) = get_with_token(&api, "/api/dashboard", Some(&token)).await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], json!("Dashboard fetch failed"));
}

#[tokio::test]
async fn logout_drops_portal_session() {
    let (portal, _mocks) = stub_portal(200).await;
    let api = spawn_api(portal.url()).await;
    let client = reqwest::Client::new();

    let (_, body) = login(&api, USERNAME, "secret").await;
    let token = body["token"].as_str().unwrap().to_string();

    let response = client
        .post(format!("{}/api/logout", api))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"success": true, "logged_out": true}));

    // Token still verifies, but there is no portal session behind it.
    let (status, _) = get_with_token(&api, "/api/dashboard", Some(&token)).await;
    assert_eq!(status, 500);
}

#[tokio::test]
async fn health_reports_session_count() {
    let (portal, _mocks) = stub_portal(200).await;
    let api = spawn_api(portal.url()).await;

    let (_, body) = get_with_token(&api, "/health", None).await;
    assert_eq!(body, json!({"success": true, "status": "ok", "sessions": 0}));

    login(&api, USERNAME, "secret").await;
    let (_, body) = get_with_token(&api, "/health", None).await;
    assert_eq!(body["sessions"], json!(1));
}

#[tokio::test]
async fn unknown_route_is_404() {
    let (portal, _mocks) = stub_portal(200).await;
    let api = spawn_api(portal.url()).await;

    let (status, body) = get_with_token(&api, "/api/nope", None).await;
    assert_eq!(status, 404);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("/api/nope"));
}
