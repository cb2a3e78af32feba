#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use hosted_login::{
	config::LoginConfig,
	error::Error,
	flows::{LoginFlow, LoginState, ReqwestLoginFlow},
	url::Url,
};

fn flow(server: &MockServer) -> ReqwestLoginFlow {
	let base = server.base_url();
	let config = LoginConfig::from_lookup(|key| match key {
		"CLIENT_ID" => Some("client-it".into()),
		"REDIRECT_URI" => Some("http://localhost:8501".into()),
		"IDP_BASE_URL" => Some(base.clone()),
		"TOKEN_TIMEOUT_SECS" => Some("5".into()),
		_ => None,
	})
	.expect("Login configuration should resolve against the mock server.");

	LoginFlow::new(config).expect("Reqwest login flow should build.")
}

#[tokio::test]
async fn redirect_with_code_authenticates() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token").body_includes("code=abc123");
			then.status(200).body(r#"{"access_token":"A","id_token":"B","expires_in":60}"#);
		})
		.await;
	let flow = flow(&server);
	let redirect = Url::parse("http://localhost:8501/?code=abc123&state=ignored")
		.expect("Redirect URL fixture should parse.");
	let state = flow.handle_redirect_url(&redirect).await;

	mock.assert_async().await;

	assert_eq!(state.headline(), "Successfully authenticated!");

	let tokens = state.tokens().expect("Authenticated state should carry tokens.");

	assert_eq!(tokens.access_token.expose(), "A");
	assert_eq!(tokens.id_token.expose(), "B");
}

#[tokio::test]
async fn redirect_without_code_points_at_login_page() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.any_request();
			then.status(500);
		})
		.await;
	let flow = flow(&server);

	match flow.handle_redirect([("state", "only")]).await {
		LoginState::Unauthenticated { login_url } => {
			assert_eq!(login_url.path(), "/login");
			assert!(login_url.as_str().starts_with(&server.base_url()));
		},
		other => panic!("Unexpected state: {other:?}."),
	}

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn rejected_code_fails_without_leaking_details() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(400).body(r#"{"error":"invalid_grant","error_description":"used"}"#);
		})
		.await;

	let state = flow(&server).handle_redirect([("code", "spent")]).await;

	assert_eq!(state.headline(), "Failed to authenticate.");
	assert!(!state.headline().contains("invalid_grant"));
	assert!(matches!(
		state.into_result(),
		Some(Err(Error::TokenExchangeFailed { status: 400, .. }))
	));
}
