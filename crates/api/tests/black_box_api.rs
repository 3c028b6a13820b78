use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use rowgate_api::{AppBuilder, JwtUserContextProvider, build_app, datasource_router_from_lookup};
use rowgate_context::{ContextCarrier, RequestContext};
use rowgate_auth::{RoleClaim, UserClaims};
use rowgate_core::{DataScope, DeptId, GuardError, RoleContext, UserId};
use rowgate_infra::{
    GuardConfig, IsolationLevel, SqlxPoolFactory, StaticDataSourceProvider,
    TenantDataSourceDescriptor, TenantDataSourceRouter, TenantIsolationConfig,
};

const SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(app: axum::Router) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    async fn line() -> Self {
        let config = GuardConfig {
            tenant: TenantIsolationConfig::default().with_ignore_table("sys_dict"),
            ..GuardConfig::default()
        };
        Self::spawn(build_app(config, SECRET.to_string(), None).unwrap()).await
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.get(format!("{}{}", self.base_url, path))
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(format!("{}{}", self.base_url, path))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(roles: Vec<RoleContext>, data_scope: bool) -> String {
    let now = Utc::now();
    let claims = UserClaims {
        sub: UserId::new(7),
        dept_id: DeptId::new(3),
        roles: roles.into_iter().map(RoleClaim::from).collect(),
        data_scope,
        issued_at: now - ChronoDuration::minutes(1),
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

/// Signed token whose claims are taken verbatim, bypassing `UserClaims`.
fn mint_raw_jwt(claims: Value) -> String {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn own_rows() -> Vec<RoleContext> {
    vec![RoleContext::new(1, DataScope::OwnRows)]
}

fn orders_select() -> Value {
    json!({
        "kind": "select",
        "table": "orders",
        "alias": "t1",
        "filter": {"eq": {"left": {"column": {"name": "status"}}, "right": {"literal": "active"}}},
        "data_scope": {"table_alias": "t1", "user_id_column": "create_user"}
    })
}

async fn preview(server: &TestServer, tenant: Option<&str>, token: Option<&str>, body: Value) -> Value {
    let mut req = server.post("/statements/preview").json(&body);
    if let Some(tenant) = tenant {
        req = req.header("X-Tenant-Id", tenant);
    }
    if let Some(token) = token {
        req = req.bearer_auth(token);
    }
    let res = req.send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.json().await.unwrap()
}

#[tokio::test]
async fn health_needs_no_context() {
    let server = TestServer::line().await;
    let res = server.get("/health").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn context_reflects_header_and_token_inline_and_in_spawned_work() {
    let server = TestServer::line().await;
    let token = mint_jwt(own_rows(), true);

    let body: Value = server
        .get("/context")
        .header("X-Tenant-Id", "5")
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["tenant_id"], json!(5));
    assert_eq!(body["user"]["user_id"], json!(7));
    assert_eq!(body["user"]["roles"][0]["data_scope"], json!("SELF"));
    assert_eq!(body["data_scope_enabled"], json!(true));
    assert_eq!(body["isolation_level"], json!("LINE"));
    assert_eq!(body["datasource_stack"], json!([]));
    assert_eq!(body["propagated"]["tenant_id"], json!(5));
    assert_eq!(body["propagated"]["user_id"], json!(7));
}

#[tokio::test]
async fn absent_or_unparseable_tenant_header_means_no_tenant() {
    let server = TestServer::line().await;

    for header in [None, Some("not-a-number")] {
        let mut req = server.get("/context");
        if let Some(v) = header {
            req = req.header("X-Tenant-Id", v);
        }
        let body: Value = req.send().await.unwrap().json().await.unwrap();
        assert_eq!(body["tenant_id"], Value::Null);
        assert_eq!(body["user"], Value::Null);
    }
}

#[tokio::test]
async fn preview_applies_data_scope_then_tenant_line() {
    let server = TestServer::line().await;
    let token = mint_jwt(own_rows(), true);

    let body = preview(&server, Some("5"), Some(&token), orders_select()).await;
    assert_eq!(
        body["where_clause"],
        json!("status = 'active' AND (t1.create_user = 7) AND t1.tenant_id = 5")
    );
}

#[tokio::test]
async fn preview_honours_filter_flag_super_tenant_and_ignore_list() {
    let server = TestServer::line().await;

    let unfiltered = mint_jwt(own_rows(), false);
    let body = preview(&server, Some("5"), Some(&unfiltered), orders_select()).await;
    assert_eq!(
        body["where_clause"],
        json!("status = 'active' AND t1.tenant_id = 5")
    );

    let all = mint_jwt(vec![RoleContext::new(1, DataScope::All)], true);
    let body = preview(&server, Some("-1"), Some(&all), orders_select()).await;
    assert_eq!(body["where_clause"], json!("status = 'active'"));

    let dict = json!({"kind": "select", "table": "SYS_DICT"});
    let body = preview(&server, Some("5"), Some(&all), dict).await;
    assert_eq!(body["where_clause"], Value::Null);
}

#[tokio::test]
async fn anonymous_caller_sees_no_scoped_rows() {
    let server = TestServer::line().await;
    let body = preview(&server, Some("5"), None, orders_select()).await;
    assert_eq!(
        body["where_clause"],
        json!("status = 'active' AND (1 = 0) AND t1.tenant_id = 5")
    );
}

#[tokio::test]
async fn preview_injects_tenant_into_insert_params() {
    let server = TestServer::line().await;
    let token = mint_jwt(own_rows(), true);

    let insert = json!({"kind": "insert", "table": "orders", "params": {"name": "widget"}});
    let body = preview(&server, Some("5"), Some(&token), insert).await;
    assert_eq!(body["params"], json!({"name": "widget", "tenant_id": 5}));
    assert_eq!(body["where_clause"], Value::Null);

    let bypass = json!({"kind": "insert", "table": "orders", "params": {}, "ignore_tenant_line": true});
    let body = preview(&server, Some("5"), Some(&token), bypass).await;
    assert_eq!(body["params"], json!({}));
}

#[tokio::test]
async fn unknown_scope_code_in_token_fails_the_request() {
    let server = TestServer::line().await;
    let now = Utc::now();
    let token = mint_raw_jwt(json!({
        "sub": 7,
        "dept_id": 3,
        "roles": [{"role_id": 1, "data_scope": "9"}],
        "issued_at": now - ChronoDuration::minutes(1),
        "expires_at": now + ChronoDuration::minutes(10),
    }));

    let res = server
        .post("/statements/preview")
        .header("X-Tenant-Id", "5")
        .bearer_auth(&token)
        .json(&orders_select())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], json!("unsupported_data_scope"));
    assert_eq!(body["message"], json!("unsupported data scope: 9"));
}

#[tokio::test]
async fn super_tenant_header_needs_a_full_access_caller() {
    let server = TestServer::line().await;
    let own = mint_jwt(own_rows(), true);

    for token in [None, Some(own.as_str())] {
        let mut req = server
            .post("/statements/preview")
            .header("X-Tenant-Id", "-1")
            .json(&orders_select());
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await.unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], json!("super_tenant_forbidden"));
    }

    // The same caller is still served under its own tenant.
    let body = preview(&server, Some("5"), Some(&own), orders_select()).await;
    assert_eq!(
        body["where_clause"],
        json!("status = 'active' AND (t1.create_user = 7) AND t1.tenant_id = 5")
    );
}

fn datasource_router() -> Arc<TenantDataSourceRouter<SqlxPoolFactory>> {
    let provider = StaticDataSourceProvider::new();
    provider.insert(
        "5",
        TenantDataSourceDescriptor {
            pool_name: "tenant-5".into(),
            driver: "com.mysql.cj.jdbc.Driver".into(),
            url: "jdbc:mysql://127.0.0.1:1/tenant5".into(),
            username: "app".into(),
            password: "secret".into(),
            max_connections: Some(2),
        },
    );
    Arc::new(TenantDataSourceRouter::new(Arc::new(provider), SqlxPoolFactory::new()))
}

#[tokio::test]
async fn datasource_mode_routes_each_request_to_its_tenant() {
    let config = GuardConfig {
        tenant: TenantIsolationConfig::default().with_isolation_level(IsolationLevel::Datasource),
        ..GuardConfig::default()
    };
    let router = datasource_router();
    let server = TestServer::spawn(
        build_app(config, SECRET.to_string(), Some(router.clone())).unwrap(),
    )
    .await;

    for _ in 0..2 {
        let body: Value = server
            .get("/context")
            .header("X-Tenant-Id", "5")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["datasource_stack"], json!(["5"]));
        assert_eq!(body["propagated"]["datasource"], json!("5"));
    }
    assert_eq!(router.registered_keys(), vec!["5".to_string()]);

    // No tenant line in datasource mode.
    let token = mint_jwt(own_rows(), true);
    let body = preview(&server, Some("5"), Some(&token), orders_select()).await;
    assert_eq!(
        body["where_clause"],
        json!("status = 'active' AND (t1.create_user = 7)")
    );

    let res = server
        .get("/context")
        .header("X-Tenant-Id", "9")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], json!("datasource_not_found"));
    assert_eq!(
        body["message"],
        json!("datasource configuration not found for tenant 9")
    );
}

#[tokio::test]
async fn environment_wires_a_default_pool_for_requests_without_tenant() {
    let datasource_mode = GuardConfig {
        tenant: TenantIsolationConfig::default().with_isolation_level(IsolationLevel::Datasource),
        ..GuardConfig::default()
    };
    let default = json!({
        "pool_name": "default",
        "driver": "com.mysql.cj.jdbc.Driver",
        "url": "jdbc:mysql://127.0.0.1:1/app",
        "username": "app",
        "password": "secret"
    })
    .to_string();
    let tenants = json!({"5": {
        "pool_name": "tenant-5",
        "driver": "mysql",
        "url": "mysql://127.0.0.1:1/tenant5",
        "username": "app",
        "password": "secret"
    }})
    .to_string();

    let router = datasource_router_from_lookup(&datasource_mode, |key| match key {
        "ROWGATE_TENANT_DATASOURCES" => Some(tenants.clone()),
        "ROWGATE_DEFAULT_DATASOURCE" => Some(default.clone()),
        _ => None,
    })
    .unwrap()
    .expect("datasource mode builds a router");

    let pool = ContextCarrier::scope(RequestContext::default(), async { router.current_pool() }).await;
    assert!(pool.is_some());

    let bare = datasource_router_from_lookup(&datasource_mode, |_| None).unwrap().unwrap();
    let pool = ContextCarrier::scope(RequestContext::default(), async { bare.current_pool() }).await;
    assert!(pool.is_none());

    let err = datasource_router_from_lookup(&datasource_mode, |key| {
        (key == "ROWGATE_DEFAULT_DATASOURCE").then(|| "{".to_string())
    })
    .unwrap_err();
    assert!(matches!(err, GuardError::InvalidConfig(_)));

    assert!(
        datasource_router_from_lookup(&GuardConfig::default(), |_| Some(default.clone()))
            .unwrap()
            .is_none()
    );
}

#[test]
fn builder_rejects_missing_collaborators() {
    let err = AppBuilder::new(GuardConfig::default()).build().unwrap_err();
    assert_eq!(err, GuardError::missing_collaborator("UserContextProvider"));

    let config = GuardConfig {
        tenant: TenantIsolationConfig::default().with_isolation_level(IsolationLevel::Datasource),
        ..GuardConfig::default()
    };
    let err = AppBuilder::new(config)
        .with_user_provider(Arc::new(JwtUserContextProvider::new(SECRET.as_bytes())))
        .build()
        .unwrap_err();
    assert_eq!(err, GuardError::missing_collaborator("TenantDataSourceProvider"));
}
