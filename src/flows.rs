//! Login flow orchestration: detect the redirect code, exchange it, and present the outcome.
//!
//! The flow is a small state machine:
//!
//! ```text
//! Unauthenticated --code in query--> CodePresent --tokens--> Authenticated
//!                                                 \--error--> AuthFailed
//! ```
//!
//! [`LoginFlow::detect`] performs the first transition, [`LoginFlow::complete`] the second, and
//! [`LoginFlow::handle_redirect`] both.

// self
use crate::{
	_prelude::*,
	auth::{AuthorizationCode, TokenSet, get_authorization_code},
	config::LoginConfig,
	exchange::{TokenExchangeClient, TransportErrorMapper},
	http::TokenHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};
#[cfg(feature = "reqwest")]
use crate::{error::ConfigError, exchange::ReqwestTransportErrorMapper, http::ReqwestHttpClient};

#[cfg(feature = "reqwest")]
/// Login flow specialized for the crate's default reqwest transport stack.
pub type ReqwestLoginFlow = LoginFlow<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Where a browser session stands in the authorization-code flow.
#[derive(Debug)]
pub enum LoginState {
	/// No code in the request; the user must follow `login_url`.
	Unauthenticated {
		/// Hosted login page for this client.
		login_url: Url,
	},
	/// The provider redirected back with a code that has not been exchanged yet.
	CodePresent(AuthorizationCode),
	/// The exchange succeeded.
	Authenticated(TokenSet),
	/// The exchange failed. The code is spent; the user must log in again.
	AuthFailed(Error),
}
impl LoginState {
	/// User-facing status line. Never includes provider error details.
	pub fn headline(&self) -> &'static str {
		match self {
			LoginState::Unauthenticated { .. } => "Please log in to continue.",
			LoginState::CodePresent(_) => "Completing sign-in...",
			LoginState::Authenticated(_) => "Successfully authenticated!",
			LoginState::AuthFailed(_) => "Failed to authenticate.",
		}
	}

	/// Returns `true` for states that no further transition leaves.
	pub fn is_terminal(&self) -> bool {
		matches!(self, LoginState::Authenticated(_) | LoginState::AuthFailed(_))
	}

	/// Tokens of an authenticated session.
	pub fn tokens(&self) -> Option<&TokenSet> {
		match self {
			LoginState::Authenticated(tokens) => Some(tokens),
			_ => None,
		}
	}

	/// Consumes the state and returns the exchange outcome, if one happened.
	pub fn into_result(self) -> Option<Result<TokenSet>> {
		match self {
			LoginState::Authenticated(tokens) => Some(Ok(tokens)),
			LoginState::AuthFailed(err) => Some(Err(err)),
			_ => None,
		}
	}
}

/// Composes redirect handling, the token exchange, and hosted login/logout URLs for one app
/// client.
pub struct LoginFlow<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Configuration the flow was built from.
	pub config: LoginConfig,
	/// Exchange client used by [`LoginFlow::complete`].
	pub client: TokenExchangeClient<C, M>,
}
impl<C, M> LoginFlow<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a flow around a caller-provided exchange client.
	pub fn with_client(config: LoginConfig, client: TokenExchangeClient<C, M>) -> Self {
		Self { config, client }
	}

	/// Hosted login page URL that starts the authorization-code flow.
	pub fn login_url(&self) -> Url {
		let mut url = self.config.endpoints.login.clone();

		{
			let mut query = url.query_pairs_mut();

			query
				.append_pair("response_type", "code")
				.append_pair("client_id", &self.config.client_id)
				.append_pair("redirect_uri", &self.config.redirect_uri);

			if !self.config.scopes.is_empty() {
				query.append_pair("scope", &self.config.scopes.normalized());
			}
		}

		url
	}

	/// Hosted logout URL that ends the provider session and returns to `logout_uri`.
	pub fn logout_url(&self) -> Url {
		let mut url = self.config.endpoints.logout.clone();

		url.query_pairs_mut()
			.append_pair("client_id", &self.config.client_id)
			.append_pair("logout_uri", &self.config.logout_uri);

		url
	}

	/// Classifies the current request's query parameters.
	pub fn detect<I, K, V>(&self, query_parameters: I) -> LoginState
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		match get_authorization_code(query_parameters) {
			Some(code) => LoginState::CodePresent(code),
			None => LoginState::Unauthenticated { login_url: self.login_url() },
		}
	}

	/// Runs the exchange for [`LoginState::CodePresent`]; every other state is returned as is.
	pub async fn complete(&self, state: LoginState) -> LoginState {
		let LoginState::CodePresent(code) = state else {
			return state;
		};

		match self.client.exchange_code_for_tokens(&code, &self.config.exchange_config()).await {
			Ok(tokens) => LoginState::Authenticated(tokens),
			Err(err) => LoginState::AuthFailed(err),
		}
	}

	/// Detects and completes in one call.
	pub async fn handle_redirect<I, K, V>(&self, query_parameters: I) -> LoginState
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		const KIND: FlowKind = FlowKind::Redirect;

		let state = self.detect(query_parameters);

		if !matches!(state, LoginState::CodePresent(_)) {
			return state;
		}

		let span = FlowSpan::new(KIND, "handle_redirect");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let state = span.instrument(self.complete(state)).await;

		match &state {
			LoginState::Authenticated(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			_ => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		state
	}

	/// Same as [`LoginFlow::handle_redirect`] for a full redirect URL.
	pub async fn handle_redirect_url(&self, redirect_url: &Url) -> LoginState {
		self.handle_redirect(redirect_url.query_pairs()).await
	}
}
#[cfg(feature = "reqwest")]
impl LoginFlow<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a flow backed by a reqwest client honoring `config.timeout`.
	pub fn new(config: LoginConfig) -> Result<Self, ConfigError> {
		let client = TokenExchangeClient::new(config.timeout)?;

		Ok(Self::with_client(config, client))
	}
}
impl<C, M> Debug for LoginFlow<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginFlow").field("config", &self.config).finish_non_exhaustive()
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::provider::ProviderEndpoints;

	fn flow() -> ReqwestLoginFlow {
		let endpoints = ProviderEndpoints::hosted("my-app", "eu-central-1")
			.expect("Hosted endpoints fixture should derive.");

		LoginFlow::new(LoginConfig::new("client-123", "http://localhost:8501", endpoints))
			.expect("Reqwest login flow should build.")
	}

	#[test]
	fn login_url_carries_client_redirect_and_scopes() {
		let url = flow().login_url();

		assert_eq!(
			url.as_str(),
			"https://my-app.auth.eu-central-1.amazoncognito.com/login?response_type=code\
			 &client_id=client-123&redirect_uri=http%3A%2F%2Flocalhost%3A8501\
			 &scope=email+openid+profile"
		);
	}

	#[test]
	fn logout_url_carries_client_and_landing_page() {
		let url = flow().logout_url();
		let pairs = url.query_pairs().into_owned().collect::<Vec<_>>();

		assert_eq!(url.path(), "/logout");
		assert_eq!(
			pairs,
			vec![
				("client_id".to_owned(), "client-123".to_owned()),
				("logout_uri".to_owned(), "http://localhost:8501/logout".to_owned()),
			]
		);
	}

	#[test]
	fn detect_routes_on_code_presence() {
		let flow = flow();
		let empty: [(&str, &str); 0] = [];

		match flow.detect(empty) {
			LoginState::Unauthenticated { login_url } => assert_eq!(login_url, flow.login_url()),
			other => panic!("Unexpected state: {other:?}."),
		}
		assert!(matches!(flow.detect([("code", "X")]), LoginState::CodePresent(_)));
		assert!(matches!(flow.detect([("code", "")]), LoginState::Unauthenticated { .. }));
	}

	#[tokio::test]
	async fn complete_passes_non_code_states_through() {
		let flow = flow();
		let tokens = TokenSet::builder()
			.access_token("A")
			.id_token("B")
			.build()
			.expect("Token set fixture should build.");
		let state = flow.complete(LoginState::Authenticated(tokens)).await;

		assert_eq!(state.headline(), "Successfully authenticated!");
		assert!(state.is_terminal());
		assert_eq!(state.tokens().map(|set| set.access_token.expose()), Some("A"));
	}

	#[test]
	fn headlines_never_leak_error_details() {
		let state = LoginState::AuthFailed(Error::TokenExchangeFailed {
			status: 400,
			body: "invalid_grant: code reused".into(),
			kind: crate::provider::ProviderErrorKind::InvalidGrant,
		});

		assert_eq!(state.headline(), "Failed to authenticate.");
		assert!(state.is_terminal());
		assert!(matches!(state.into_result(), Some(Err(Error::TokenExchangeFailed { .. }))));
	}
}
