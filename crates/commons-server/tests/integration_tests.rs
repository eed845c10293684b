//! Integration tests for the Commons server.
//!
//! Each test boots the full router against its own in-memory SQLite database
//! and drives it over HTTP.
//!
//! Run with: cargo test -p commons-server --test integration_tests

use commons_protocol::{
    BulkInviteReport, CommunityData, ErrorBody, InvitationData, JoinOutcome, JoinResponse,
    MemberData, Role,
};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Test server wrapper
struct TestServer {
    addr: std::net::SocketAddr,
    #[allow(dead_code)]
    db_pool: sqlx::SqlitePool,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    async fn start() -> anyhow::Result<Self> {
        let config = commons_server::state::Config {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "test-secret-key-for-testing-only".to_string(),
            bind_address: "127.0.0.1:0".to_string(),
        };

        let (router, db_pool) = commons_server::create_app(config).await?;

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .ok();
        });

        // Give server time to start
        tokio::time::sleep(Duration::from_millis(100)).await;

        Ok(Self {
            addr,
            db_pool,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    fn http_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn start_test_server() -> TestServer {
    TestServer::start().await.expect("Failed to start test server")
}

/// Create a test user and return their auth token and id
async fn create_test_user(
    client: &Client,
    http_url: &str,
    username: &str,
) -> anyhow::Result<(String, uuid::Uuid)> {
    let password = "testpassword123";

    let register_response = client
        .post(format!("{}/api/auth/register", http_url))
        .json(&json!({
            "username": username,
            "email": format!("{}@test.com", username),
            "password": password,
            "display_name": username
        }))
        .send()
        .await?;
    anyhow::ensure!(
        register_response.status().is_success(),
        "Registration failed: {}",
        register_response.text().await.unwrap_or_default()
    );

    let login_response = client
        .post(format!("{}/api/auth/login", http_url))
        .json(&json!({
            "username": username,
            "password": password
        }))
        .send()
        .await?;

    let login_data: serde_json::Value = login_response.json().await?;

    let token = login_data["token"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("No token in response"))?
        .to_string();

    let user_id = login_data["user_id"]
        .as_str()
        .and_then(|s| uuid::Uuid::parse_str(s).ok())
        .ok_or_else(|| anyhow::anyhow!("No user_id in response"))?;

    Ok((token, user_id))
}

/// Create a community and return its data
async fn create_community(
    client: &Client,
    http_url: &str,
    token: &str,
    name: &str,
    visibility: &str,
) -> anyhow::Result<CommunityData> {
    let response = client
        .post(format!("{}/api/communities", http_url))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "name": name, "visibility": visibility }))
        .send()
        .await?;
    anyhow::ensure!(
        response.status().is_success(),
        "Community creation failed: {}",
        response.text().await.unwrap_or_default()
    );

    Ok(response.json().await?)
}

async fn get_members(
    client: &Client,
    http_url: &str,
    token: &str,
    community_id: uuid::Uuid,
) -> anyhow::Result<Vec<MemberData>> {
    let response = client
        .get(format!("{}/api/communities/{}/members", http_url, community_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await?;

    Ok(response.json().await?)
}

async fn error_code(response: reqwest::Response) -> String {
    let body: ErrorBody = response.json().await.expect("Expected JSON error body");
    assert!(!body.success);
    body.error.code
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_user_registration_and_login() {
    let server = start_test_server().await;
    let client = Client::new();

    let register_response = client
        .post(format!("{}/api/auth/register", server.http_url()))
        .json(&json!({
            "username": "alice",
            "email": "alice@test.com",
            "password": "testpassword123",
            "display_name": "alice"
        }))
        .send()
        .await
        .expect("Register request failed");

    assert!(
        register_response.status().is_success(),
        "Registration failed: {}",
        register_response.text().await.unwrap_or_default()
    );

    let login_response = client
        .post(format!("{}/api/auth/login", server.http_url()))
        .json(&json!({
            "username": "alice",
            "password": "testpassword123"
        }))
        .send()
        .await
        .expect("Login request failed");

    assert!(login_response.status().is_success());

    let login_data: serde_json::Value = login_response.json().await.unwrap();
    assert!(login_data["token"].is_string());
    assert!(login_data["user_id"].is_string());
}

#[tokio::test]
async fn test_unauthenticated_requests_are_rejected() {
    let server = start_test_server().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/api/communities", server.http_url()))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(response.status(), 401);
    assert_eq!(error_code(response).await, "not_authenticated");
}

#[tokio::test]
async fn test_community_names_conflict_case_insensitively() {
    let server = start_test_server().await;
    let client = Client::new();

    let (alice_token, _) = create_test_user(&client, &server.http_url(), "alice")
        .await
        .unwrap();
    let (bob_token, _) = create_test_user(&client, &server.http_url(), "bob")
        .await
        .unwrap();

    create_community(&client, &server.http_url(), &alice_token, "Rustaceans", "PUBLIC")
        .await
        .unwrap();

    let response = client
        .post(format!("{}/api/communities", server.http_url()))
        .header("Authorization", format!("Bearer {}", bob_token))
        .json(&json!({ "name": "rustaceans", "visibility": "PUBLIC" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 409);
    assert_eq!(error_code(response).await, "name_taken");
}

#[tokio::test]
async fn test_private_community_lifecycle() {
    let server = start_test_server().await;
    let client = Client::new();

    let (alice_token, alice_id) = create_test_user(&client, &server.http_url(), "alice")
        .await
        .unwrap();
    let (bob_token, bob_id) = create_test_user(&client, &server.http_url(), "bob")
        .await
        .unwrap();

    // Alice creates a private community and is its sole admin.
    let community = create_community(&client, &server.http_url(), &alice_token, "test", "PRIVATE")
        .await
        .unwrap();

    let members = get_members(&client, &server.http_url(), &alice_token, community.id)
        .await
        .unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_id, alice_id);
    assert_eq!(members[0].role, Role::Admin);

    // Bob's join turns into a pending request, not a membership.
    let join_response = client
        .post(format!("{}/api/communities/{}/join", server.http_url(), community.id))
        .header("Authorization", format!("Bearer {}", bob_token))
        .send()
        .await
        .unwrap();
    assert!(join_response.status().is_success());
    let join: JoinResponse = join_response.json().await.unwrap();
    assert_eq!(join.status, JoinOutcome::Requested);

    let members = get_members(&client, &server.http_url(), &alice_token, community.id)
        .await
        .unwrap();
    assert_eq!(members.len(), 1);

    // Alice sees and accepts the request.
    let requests: Vec<serde_json::Value> = client
        .get(format!("{}/api/communities/{}/requests", server.http_url(), community.id))
        .header("Authorization", format!("Bearer {}", alice_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(requests.len(), 1);
    let request_id = requests[0]["id"].as_str().unwrap();

    let response = client
        .post(format!(
            "{}/api/communities/{}/requests/{}",
            server.http_url(),
            community.id,
            request_id
        ))
        .header("Authorization", format!("Bearer {}", alice_token))
        .json(&json!({ "action": "accept" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    // Bob is now an ordinary member.
    let members = get_members(&client, &server.http_url(), &alice_token, community.id)
        .await
        .unwrap();
    assert_eq!(members.len(), 2);
    let bob_member = members.iter().find(|m| m.user_id == bob_id).unwrap();
    assert_eq!(bob_member.role, Role::User);

    // Bob leaves; Alice remains the sole admin.
    let response = client
        .delete(format!("{}/api/communities/{}/leave", server.http_url(), community.id))
        .header("Authorization", format!("Bearer {}", bob_token))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let members = get_members(&client, &server.http_url(), &alice_token, community.id)
        .await
        .unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].role, Role::Admin);
}

#[tokio::test]
async fn test_role_hierarchy_enforcement() {
    let server = start_test_server().await;
    let client = Client::new();

    let (alice_token, alice_id) = create_test_user(&client, &server.http_url(), "alice")
        .await
        .unwrap();
    let (bob_token, bob_id) = create_test_user(&client, &server.http_url(), "bob")
        .await
        .unwrap();
    let (carol_token, carol_id) = create_test_user(&client, &server.http_url(), "carol")
        .await
        .unwrap();

    let community = create_community(&client, &server.http_url(), &alice_token, "open-space", "PUBLIC")
        .await
        .unwrap();

    for token in [&bob_token, &carol_token] {
        let response = client
            .post(format!("{}/api/communities/{}/join", server.http_url(), community.id))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
    }

    let members = get_members(&client, &server.http_url(), &alice_token, community.id)
        .await
        .unwrap();
    let member_id = |user_id: uuid::Uuid| {
        members
            .iter()
            .find(|m| m.user_id == user_id)
            .map(|m| m.membership_id)
            .unwrap()
    };

    // A member cannot promote anyone.
    let response = client
        .patch(format!(
            "{}/api/communities/{}/members/{}",
            server.http_url(),
            community.id,
            member_id(carol_id)
        ))
        .header("Authorization", format!("Bearer {}", bob_token))
        .json(&json!({ "role": "MODERATOR" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // The admin promotes Bob to moderator.
    let response = client
        .patch(format!(
            "{}/api/communities/{}/members/{}",
            server.http_url(),
            community.id,
            member_id(bob_id)
        ))
        .header("Authorization", format!("Bearer {}", alice_token))
        .json(&json!({ "role": "MODERATOR" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    // Moderator Bob cannot remove the admin.
    let response = client
        .delete(format!(
            "{}/api/communities/{}/members/{}",
            server.http_url(),
            community.id,
            member_id(alice_id)
        ))
        .header("Authorization", format!("Bearer {}", bob_token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
    assert_eq!(error_code(response).await, "insufficient_role");

    // But he can remove ordinary member Carol.
    let response = client
        .delete(format!(
            "{}/api/communities/{}/members/{}",
            server.http_url(),
            community.id,
            member_id(carol_id)
        ))
        .header("Authorization", format!("Bearer {}", bob_token))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    // The sole admin cannot leave.
    let response = client
        .delete(format!("{}/api/communities/{}/leave", server.http_url(), community.id))
        .header("Authorization", format!("Bearer {}", alice_token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
    assert_eq!(error_code(response).await, "last_admin_cannot_leave");
}

#[tokio::test]
async fn test_invitation_flow() {
    let server = start_test_server().await;
    let client = Client::new();

    let (alice_token, _) = create_test_user(&client, &server.http_url(), "alice")
        .await
        .unwrap();
    let (bob_token, bob_id) = create_test_user(&client, &server.http_url(), "bob")
        .await
        .unwrap();

    let community = create_community(&client, &server.http_url(), &alice_token, "inner-circle", "PRIVATE")
        .await
        .unwrap();

    let response = client
        .post(format!(
            "{}/api/communities/{}/invitations",
            server.http_url(),
            community.id
        ))
        .header("Authorization", format!("Bearer {}", alice_token))
        .json(&json!({ "username": "bob" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    // Bob sees the invitation in his inbox and accepts it.
    let invitations: Vec<InvitationData> = client
        .get(format!("{}/api/invitations", server.http_url()))
        .header("Authorization", format!("Bearer {}", bob_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(invitations.len(), 1);
    assert_eq!(invitations[0].community_name, "inner-circle");
    assert_eq!(invitations[0].inviter_username, "alice");

    let response = client
        .post(format!("{}/api/invitations/{}", server.http_url(), invitations[0].id))
        .header("Authorization", format!("Bearer {}", bob_token))
        .json(&json!({ "action": "accept" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let members = get_members(&client, &server.http_url(), &bob_token, community.id)
        .await
        .unwrap();
    assert_eq!(members.len(), 2);
    let bob_member = members.iter().find(|m| m.user_id == bob_id).unwrap();
    assert_eq!(bob_member.role, Role::User);
}

#[tokio::test]
async fn test_bulk_invite_classification() {
    let server = start_test_server().await;
    let client = Client::new();

    let (admin_token, _) = create_test_user(&client, &server.http_url(), "admin")
        .await
        .unwrap();
    let (alice_token, _) = create_test_user(&client, &server.http_url(), "alice")
        .await
        .unwrap();
    create_test_user(&client, &server.http_url(), "bob").await.unwrap();
    create_test_user(&client, &server.http_url(), "dave").await.unwrap();

    let community = create_community(&client, &server.http_url(), &admin_token, "open-space", "PUBLIC")
        .await
        .unwrap();

    // alice joins; bob gets a single invitation first.
    let response = client
        .post(format!("{}/api/communities/{}/join", server.http_url(), community.id))
        .header("Authorization", format!("Bearer {}", alice_token))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let response = client
        .post(format!(
            "{}/api/communities/{}/invitations",
            server.http_url(),
            community.id
        ))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&json!({ "username": "bob" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let response = client
        .post(format!(
            "{}/api/communities/{}/invitations/bulk",
            server.http_url(),
            community.id
        ))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&json!({ "usernames": ["alice", "bob", "carol", "dave"] }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let report: BulkInviteReport = response.json().await.unwrap();
    assert_eq!(report.invited, 1);
    assert_eq!(report.already_members, vec!["alice".to_string()]);
    assert_eq!(report.already_invited, vec!["bob".to_string()]);
    assert_eq!(report.not_found, vec!["carol".to_string()]);
}

#[tokio::test]
async fn test_bulk_invite_cap() {
    let server = start_test_server().await;
    let client = Client::new();

    let (admin_token, _) = create_test_user(&client, &server.http_url(), "admin")
        .await
        .unwrap();
    let community = create_community(&client, &server.http_url(), &admin_token, "open-space", "PUBLIC")
        .await
        .unwrap();

    let usernames: Vec<String> = (0..51).map(|i| format!("user{}", i)).collect();
    let response = client
        .post(format!(
            "{}/api/communities/{}/invitations/bulk",
            server.http_url(),
            community.id
        ))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&json!({ "usernames": usernames }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert_eq!(error_code(response).await, "too_many_targets");
}
