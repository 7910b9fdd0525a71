use std::{
    fs,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::http::{HeaderValue, StatusCode, header};
use axum_test::{TestResponse, TestServer};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use cookie::Key;
use serde_json::{Value, json};
use shared::config::server::Config;
use tempfile::TempDir;
use toradmin_server::{
    app_state::AppState,
    auth::session::SessionManager,
    server::{create_app_router, metrics_handle},
    services::control::{ServiceAction, ServiceController, ServiceError, ServiceOutcome},
};

const USERNAME: &str = "admin";
const PASSWORD: &str = "hunter22";

#[derive(Default)]
struct StubController {
    calls: Mutex<Vec<(String, ServiceAction)>>,
    fail_with_exit: bool,
    time_out: bool,
}

#[async_trait]
impl ServiceController for StubController {
    async fn run(
        &self,
        service: &str,
        action: ServiceAction,
    ) -> Result<ServiceOutcome, ServiceError> {
        self.calls.lock().unwrap().push((service.to_string(), action));
        if self.time_out {
            return Err(ServiceError::Timeout { seconds: 30 });
        }
        if self.fail_with_exit {
            return Ok(ServiceOutcome {
                success: false,
                output: "Job for tor.service failed.\n".into(),
                error: Some("systemctl exited with exit status: 1".into()),
            });
        }
        Ok(ServiceOutcome {
            success: true,
            output: format!("{action} ok\n"),
            error: None,
        })
    }
}

struct Harness {
    dir: TempDir,
    server: TestServer,
    controller: Arc<StubController>,
}

impl Harness {
    fn torrc_path(&self) -> PathBuf {
        self.dir.path().join("torrc")
    }
}

fn harness_with(torrc: Option<&str>, controller: StubController, tweak: impl FnOnce(&mut Config)) -> Harness {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.torrc.path = dir.path().join("torrc");
    config.auth.credentials_path = dir.path().join("state/credentials.json");
    tweak(&mut config);
    if let Some(body) = torrc {
        fs::write(&config.torrc.path, body).unwrap();
    }

    let config = Arc::new(config);
    let sessions = SessionManager::new(Key::generate(), &config.session);
    let controller = Arc::new(controller);
    let state = AppState::new(config, sessions, controller.clone()).unwrap();
    let app = create_app_router(Arc::new(state), metrics_handle());

    Harness {
        dir,
        server: TestServer::new(app).unwrap(),
        controller,
    }
}

fn harness(torrc: Option<&str>) -> Harness {
    harness_with(torrc, StubController::default(), |_| {})
}

async fn complete_setup(server: &TestServer) -> String {
    let response = server
        .post("/api/setup")
        .json(&json!({ "username": USERNAME, "password": PASSWORD }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    body["api_token"].as_str().unwrap().to_string()
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

fn problem(response: &TestResponse) -> Value {
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/problem+json"
    );
    response.json()
}

#[tokio::test]
async fn setup_runs_exactly_once() {
    let h = harness(Some("SocksPort 9050\n"));

    let status: Value = h.server.get("/api/setup").await.json();
    assert_eq!(status, json!({ "is_setup": false }));

    let token = complete_setup(&h.server).await;
    assert_eq!(token.len(), 43);
    assert!(h.dir.path().join("state/credentials.json").exists());

    let status: Value = h.server.get("/api/setup").await.json();
    assert_eq!(status, json!({ "is_setup": true }));

    let again = h
        .server
        .post("/api/setup")
        .json(&json!({ "username": "other", "password": "another-pass" }))
        .await;
    assert_eq!(again.status_code(), StatusCode::CONFLICT);
    assert_eq!(problem(&again)["code"], "already_configured");
}

#[tokio::test]
async fn setup_rejects_short_credentials() {
    let h = harness(None);

    let short_user = h
        .server
        .post("/api/setup")
        .json(&json!({ "username": "ab", "password": PASSWORD }))
        .await;
    assert_eq!(short_user.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let short_password = h
        .server
        .post("/api/setup")
        .json(&json!({ "username": USERNAME, "password": "12345" }))
        .await;
    assert_eq!(short_password.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(problem(&short_password)["code"], "validation_failed");

    let status: Value = h.server.get("/api/setup").await.json();
    assert_eq!(status["is_setup"], false);
}

#[tokio::test]
async fn setup_adopts_configured_api_token() {
    let h = harness_with(None, StubController::default(), |config| {
        config.auth.api_token = Some("preset-token".into());
    });
    assert_eq!(complete_setup(&h.server).await, "preset-token");
}

#[tokio::test]
async fn protected_routes_require_authentication() {
    let h = harness(Some("SocksPort 9050\n"));
    complete_setup(&h.server).await;

    for path in ["/api/torrc", "/api/hidden", "/api/options", "/api/auth/me"] {
        let response = h.server.get(path).await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED, "{path}");
        assert_eq!(problem(&response)["code"], "unauthorized");
    }

    let wrong = h
        .server
        .get("/api/torrc")
        .add_header(header::AUTHORIZATION, bearer("not-the-token"))
        .await;
    assert_eq!(wrong.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_issues_a_session_cookie() {
    let h = harness(Some("SocksPort 9050\n"));
    complete_setup(&h.server).await;

    let rejected = h
        .server
        .post("/api/auth/login")
        .json(&json!({ "username": USERNAME, "password": "wrong-password" }))
        .await;
    assert_eq!(rejected.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(problem(&rejected)["code"], "invalid_credentials");

    let response = h
        .server
        .post("/api/auth/login")
        .json(&json!({ "username": USERNAME, "password": PASSWORD }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let cookies = response.cookies();
    let session = cookies.get("toradmin_session").unwrap();
    assert_eq!(session.http_only(), Some(true));

    let me = h
        .server
        .get("/api/auth/me")
        .add_header(
            header::COOKIE,
            HeaderValue::from_str(&format!("toradmin_session={}", session.value())).unwrap(),
        )
        .await;
    assert_eq!(me.status_code(), StatusCode::OK);
    assert_eq!(me.json::<Value>(), json!({ "username": USERNAME }));

    let logout = h.server.post("/api/auth/logout").await;
    assert_eq!(logout.status_code(), StatusCode::NO_CONTENT);
    let cleared = logout.cookies();
    assert_eq!(cleared.get("toradmin_session").unwrap().value(), "");
}

#[tokio::test]
async fn api_token_is_accepted_in_every_form() {
    let h = harness(Some("SocksPort 9050\n"));
    let token = complete_setup(&h.server).await;

    let basic = STANDARD.encode(format!("{token}:"));
    for value in [
        format!("Bearer {token}"),
        format!("Token {token}"),
        format!("Basic {basic}"),
    ] {
        let response = h
            .server
            .get("/api/auth/me")
            .add_header(header::AUTHORIZATION, HeaderValue::from_str(&value).unwrap())
            .await;
        assert_eq!(response.status_code(), StatusCode::OK, "{value}");
        assert_eq!(response.json::<Value>()["username"], USERNAME);
    }
}

#[tokio::test]
async fn disabled_auth_lets_requests_through() {
    let h = harness_with(Some("SocksPort 9050\n"), StubController::default(), |config| {
        config.auth.disabled = true;
    });
    let response = h.server.get("/api/torrc").await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn torrc_entries_are_listed_in_file_order() {
    let h = harness(Some(
        "## managed by toradmin\nSocksPort 9050\nLog notice stdout\nLog info file /var/log/tor\n",
    ));
    let token = complete_setup(&h.server).await;

    let response = h
        .server
        .get("/api/torrc")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>(),
        json!([
            { "key": "SocksPort", "value": "9050" },
            { "key": "Log", "value": "notice stdout" },
            { "key": "Log", "value": "info file /var/log/tor" },
        ])
    );
}

#[tokio::test]
async fn torrc_update_saves_in_request_order_with_backup() {
    let original = "# tor config\nSocksPort 9050\n";
    let h = harness(Some(original));
    let token = complete_setup(&h.server).await;

    let response = h
        .server
        .post("/api/torrc")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({
            "SocksPort": 9150,
            "HiddenServicePort": "80 127.0.0.1:8080",
            "Nickname": "relay01",
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>(),
        json!({ "saved": true, "updated": ["SocksPort", "HiddenServicePort", "Nickname"] })
    );
    assert_eq!(
        fs::read_to_string(h.torrc_path()).unwrap(),
        "# tor config\nSocksPort 9150\nHiddenServicePort 80 127.0.0.1:8080\nNickname relay01\n"
    );
    assert_eq!(
        fs::read_to_string(h.dir.path().join("torrc.bak")).unwrap(),
        original
    );
}

#[tokio::test]
async fn torrc_update_rejects_the_whole_request_on_one_bad_value() {
    let original = "SocksPort 9050\n";
    let h = harness(Some(original));
    let token = complete_setup(&h.server).await;

    let response = h
        .server
        .post("/api/torrc")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({
            "SocksPort": "9150",
            "HiddenServicePort": "80 localhost",
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = problem(&response);
    assert_eq!(body["code"], "validation_failed");
    assert_eq!(body["details"]["key"], "HiddenServicePort");
    assert_eq!(fs::read_to_string(h.torrc_path()).unwrap(), original);

    let not_scalar = h
        .server
        .post("/api/torrc")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "SocksPort": ["9150"] }))
        .await;
    assert_eq!(not_scalar.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(problem(&not_scalar)["details"]["key"], "SocksPort");
}

#[tokio::test]
async fn missing_torrc_is_not_found() {
    let h = harness(None);
    let token = complete_setup(&h.server).await;

    let response = h
        .server
        .get("/api/torrc")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(problem(&response)["code"], "not_found");
}

#[tokio::test]
async fn hidden_services_report_hostnames() {
    let hs_root = TempDir::new().unwrap();
    let service_dir = hs_root.path().join("web");
    fs::create_dir(&service_dir).unwrap();
    fs::write(service_dir.join("hostname"), "exampleonionaddress.onion\n").unwrap();

    let h = harness(Some(&format!(
        "HiddenServiceDir {}\nHiddenServicePort 80 127.0.0.1:8080\n",
        service_dir.display()
    )));
    let token = complete_setup(&h.server).await;

    let response = h
        .server
        .get("/api/hidden")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>(),
        json!({
            "configured": true,
            "services": [{
                "dir": service_dir.display().to_string(),
                "hostname": "exampleonionaddress.onion",
            }],
        })
    );
}

#[tokio::test]
async fn no_hidden_services_is_reported_as_unconfigured() {
    let h = harness(Some("SocksPort 9050\n"));
    let token = complete_setup(&h.server).await;

    let response = h
        .server
        .get("/api/hidden")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(
        response.json::<Value>(),
        json!({ "configured": false, "services": [] })
    );
}

#[tokio::test]
async fn options_catalog_is_grouped_by_category() {
    let h = harness(Some("SocksPort 9050\n"));
    let token = complete_setup(&h.server).await;

    let catalog: Value = h
        .server
        .get("/api/options")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .json();

    let hidden = catalog["Hidden Services"].as_array().unwrap();
    assert!(hidden.iter().any(|option| option["name"] == "HiddenServicePort"
        && option["validation"] == "port_mapping"
        && option["multiple"] == true));
    assert!(catalog["Network"].as_array().is_some());
}

#[tokio::test]
async fn bandwidth_is_converted_to_bytes_per_second() {
    let h = harness(None);
    let token = complete_setup(&h.server).await;

    let response = h
        .server
        .post("/api/bandwidth")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "amount": 5, "unit": "gb", "interval": "Monthly" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>(),
        json!({ "bps": 2071, "human": "2.02 KB/s" })
    );

    for body in [
        json!({ "amount": -5, "unit": "GB", "interval": "monthly" }),
        json!({ "amount": 5, "unit": "XB", "interval": "monthly" }),
        json!({ "amount": 5, "unit": "GB", "interval": "yearly" }),
    ] {
        let rejected = h
            .server
            .post("/api/bandwidth")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&body)
            .await;
        assert_eq!(rejected.status_code(), StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    }
}

#[tokio::test]
async fn service_actions_reach_the_controller() {
    let h = harness(None);
    let token = complete_setup(&h.server).await;

    let response = h
        .server
        .post("/api/service/Restart")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>(),
        json!({ "action": "restart", "success": true, "output": "restart ok\n" })
    );

    let legacy = h
        .server
        .get("/api/status")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(legacy.json::<Value>()["action"], "status");

    let unknown = h
        .server
        .post("/api/service/reload")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(unknown.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let calls = h.controller.calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        [
            ("tor".to_string(), ServiceAction::Restart),
            ("tor".to_string(), ServiceAction::Status),
        ]
    );
}

#[tokio::test]
async fn status_query_route_never_changes_service_state() {
    let h = harness(None);
    let token = complete_setup(&h.server).await;

    for action in ["restart", "stop", "start"] {
        let response = h
            .server
            .get(&format!("/api/status?action={action}"))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED, "{action}");
        assert_eq!(problem(&response)["code"], "method_not_allowed");
    }

    let explicit = h
        .server
        .get("/api/status?action=STATUS")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(explicit.status_code(), StatusCode::OK);

    let unknown = h
        .server
        .get("/api/status?action=reload")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(unknown.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    assert_eq!(
        *h.controller.calls.lock().unwrap(),
        [("tor".to_string(), ServiceAction::Status)]
    );
}

#[tokio::test]
async fn failed_command_is_still_a_successful_request() {
    let controller = StubController {
        fail_with_exit: true,
        ..StubController::default()
    };
    let h = harness_with(None, controller, |config| {
        config.service.name = "tor@default".into();
    });
    let token = complete_setup(&h.server).await;

    let response = h
        .server
        .post("/api/service/start")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "systemctl exited with exit status: 1");
    assert_eq!(h.controller.calls.lock().unwrap()[0].0, "tor@default");
}

#[tokio::test]
async fn timed_out_command_is_a_gateway_timeout() {
    let controller = StubController {
        time_out: true,
        ..StubController::default()
    };
    let h = harness_with(None, controller, |_| {});
    let token = complete_setup(&h.server).await;

    let response = h
        .server
        .post("/api/service/stop")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(problem(&response)["code"], "service_timeout");
}

#[tokio::test]
async fn health_endpoints_follow_torrc_readability() {
    let h = harness(None);
    assert_eq!(h.server.get("/healthz").await.json::<Value>(), json!({ "status": "ok" }));

    let degraded = h.server.get("/readyz").await;
    assert_eq!(degraded.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(degraded.json::<Value>()["status"], "degraded");

    fs::write(h.torrc_path(), "SocksPort 9050\n").unwrap();
    let ready = h.server.get("/readyz").await;
    assert_eq!(ready.status_code(), StatusCode::OK);
    assert_eq!(ready.json::<Value>()["status"], "ready");
}

#[tokio::test]
async fn responses_carry_security_headers_and_request_id() {
    let h = harness(None);

    let response = h
        .server
        .get("/healthz")
        .add_header(
            header::HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("trace-me-123"),
        )
        .await;
    let headers = response.headers();
    assert_eq!(headers.get("x-request-id").unwrap(), "trace-me-123");
    assert_eq!(headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
    assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
    assert!(headers.get(header::CONTENT_SECURITY_POLICY).is_some());

    let generated = h.server.get("/healthz").await;
    let id = generated.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert_eq!(id.len(), 36);
}

#[tokio::test]
async fn metrics_and_openapi_are_served() {
    let h = harness(None);
    h.server.get("/healthz").await;

    let metrics = h.server.get("/metrics").await;
    assert_eq!(metrics.status_code(), StatusCode::OK);
    assert!(metrics.text().contains("health_checks_total"));

    let doc: Value = h.server.get("/openapi.json").await.json();
    assert_eq!(doc["info"]["title"], "toradmin API");
    assert!(doc["paths"]["/api/torrc"]["post"].is_object());
}
