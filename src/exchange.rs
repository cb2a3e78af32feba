//! Token exchange client: trade an authorization code for a [`TokenSet`].
//!
//! The client issues exactly one `POST` to the token endpoint per call and never retries. The
//! form carries `grant_type=authorization_code`, `code`, `redirect_uri`, and `client_id`; any
//! HTTP status other than `200` becomes [`Error::TokenExchangeFailed`], and a `200` that cannot be
//! turned into a token set becomes a [`MalformedResponseError`].

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{AuthorizationCode, TokenSet, TokenSetBuilderError},
	config::ExchangeConfig,
	error::{ConfigError, MalformedResponseError, TransportError},
	http::TokenHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{ClientAuthMethod, ProviderErrorContext, ProviderStrategy},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, provider::DefaultProviderStrategy};

/// `grant_type` value sent with every exchange.
pub const GRANT_TYPE_AUTHORIZATION_CODE: &str = "authorization_code";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

#[cfg(feature = "reqwest")]
/// Exchange client specialized for the crate's default reqwest transport stack.
pub type ReqwestExchangeClient =
	TokenExchangeClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a crate error.
	fn map_transport_error(&self, error: HttpClientError<E>) -> Error;
}

/// Transport-agnostic mapper: every transport-specific failure is treated as a network error.
///
/// Suitable for custom [`TokenHttpClient`] implementations that do not distinguish timeouts.
#[derive(Clone, Debug, Default)]
pub struct DefaultTransportErrorMapper;
impl<E> TransportErrorMapper<E> for DefaultTransportErrorMapper
where
	E: 'static + Send + Sync + StdError,
{
	fn map_transport_error(&self, err: HttpClientError<E>) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => TransportError::network(*inner).into(),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => TransportError::Other { message }.into(),
			_ => TransportError::Other { message: "unrecognized transport failure".into() }.into(),
		}
	}
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(&self, err: HttpClientError<ReqwestError>) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(*inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => TransportError::Other { message }.into(),
			_ => TransportError::Other { message: "unrecognized transport failure".into() }.into(),
		}
	}
}

/// The outbound parameter set of one exchange.
///
/// All four values are non-empty once constructed through [`ExchangeRequest::new`].
#[derive(Clone, PartialEq, Eq)]
pub struct ExchangeRequest {
	/// Always [`GRANT_TYPE_AUTHORIZATION_CODE`].
	pub grant_type: &'static str,
	/// Authorization code from the redirect.
	pub code: String,
	/// Redirect URI, byte-for-byte as configured.
	pub redirect_uri: String,
	/// App client identifier.
	pub client_id: String,
}
impl ExchangeRequest {
	/// Builds the request from a code and a configuration that already passed validation.
	pub fn new(code: &AuthorizationCode, config: &ExchangeConfig) -> Result<Self, ConfigError> {
		if code.expose().is_empty() {
			return Err(ConfigError::EmptyAuthorizationCode);
		}

		Ok(Self {
			grant_type: GRANT_TYPE_AUTHORIZATION_CODE,
			code: code.expose().to_owned(),
			redirect_uri: config.redirect_uri.clone(),
			client_id: config.client_id.clone(),
		})
	}

	/// Writes the four required fields into `form`, replacing any existing values.
	pub fn write_into(&self, form: &mut BTreeMap<String, String>) {
		form.insert("grant_type".into(), self.grant_type.into());
		form.insert("code".into(), self.code.clone());
		form.insert("redirect_uri".into(), self.redirect_uri.clone());
		form.insert("client_id".into(), self.client_id.clone());
	}
}
impl Debug for ExchangeRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ExchangeRequest")
			.field("grant_type", &self.grant_type)
			.field("code", &"<redacted>")
			.field("redirect_uri", &self.redirect_uri)
			.field("client_id", &self.client_id)
			.finish()
	}
}

/// Performs authorization-code exchanges through a pluggable transport.
///
/// The client holds no per-request state; one instance can serve any number of concurrent
/// callers.
pub struct TokenExchangeClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Strategy responsible for request decoration and rejection classification.
	pub strategy: Arc<dyn ProviderStrategy>,
}
impl<C, M> TokenExchangeClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
		strategy: Arc<dyn ProviderStrategy>,
	) -> Self {
		Self { http_client: http_client.into(), transport_mapper: mapper.into(), strategy }
	}

	/// Exchanges `code` for tokens at `config.token_endpoint`.
	///
	/// Configuration problems are reported before the transport is touched. The call is not
	/// idempotent: a repeated code is sent again and the provider's rejection is surfaced as
	/// [`Error::TokenExchangeFailed`].
	pub async fn exchange_code_for_tokens(
		&self,
		code: &AuthorizationCode,
		config: &ExchangeConfig,
	) -> Result<TokenSet> {
		const KIND: FlowKind = FlowKind::Exchange;

		let span = FlowSpan::new(KIND, "exchange_code_for_tokens");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let endpoint = config.validate()?;
				let request = ExchangeRequest::new(code, config)?;
				let http_request = self.build_http_request(&endpoint, &request, config)?;
				let handle = self.http_client.handle();
				let response = handle
					.call(http_request)
					.await
					.map_err(|err| self.transport_mapper.map_transport_error(err))?;

				self.map_response(response)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	fn build_http_request(
		&self,
		endpoint: &Url,
		request: &ExchangeRequest,
		config: &ExchangeConfig,
	) -> Result<HttpRequest, ConfigError> {
		let mut form = BTreeMap::new();

		<dyn ProviderStrategy>::augment_token_request(self.strategy.as_ref(), &mut form);
		request.write_into(&mut form);

		let secret = config.client_secret.as_deref().unwrap_or_default();
		let mut builder = Request::builder()
			.method(Method::POST)
			.uri(endpoint.as_str())
			.header(CONTENT_TYPE, FORM_CONTENT_TYPE)
			.header(ACCEPT, JSON_CONTENT_TYPE);

		match config.client_auth {
			ClientAuthMethod::None => (),
			ClientAuthMethod::ClientSecretBasic => {
				builder =
					builder.header(AUTHORIZATION, basic_authorization(&config.client_id, secret));
			},
			ClientAuthMethod::ClientSecretPost => {
				form.insert("client_secret".into(), secret.to_owned());
			},
		}

		let body =
			form_urlencoded::Serializer::new(String::new()).extend_pairs(form.iter()).finish();

		Ok(builder.body(body.into_bytes())?)
	}

	fn map_response(&self, response: HttpResponse) -> Result<TokenSet> {
		let status = response.status().as_u16();

		if status != 200 {
			let body = String::from_utf8_lossy(response.body()).into_owned();
			let ctx = ProviderErrorContext::from_response(status, &body);
			let kind = self.strategy.classify_token_error(&ctx);

			return Err(Error::TokenExchangeFailed { status, body, kind });
		}

		Ok(parse_token_response(response.body(), OffsetDateTime::now_utc())?)
	}
}
#[cfg(feature = "reqwest")]
impl TokenExchangeClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a reqwest-backed client with the default strategy and the given timeout.
	pub fn new(timeout: StdDuration) -> Result<Self, ConfigError> {
		Ok(Self::with_http_client(
			ReqwestHttpClient::new(timeout)?,
			Arc::new(ReqwestTransportErrorMapper),
			Arc::new(DefaultProviderStrategy),
		))
	}
}
impl<C, M> Clone for TokenExchangeClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			transport_mapper: self.transport_mapper.clone(),
			strategy: self.strategy.clone(),
		}
	}
}
impl<C, M> Debug for TokenExchangeClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenExchangeClient").finish_non_exhaustive()
	}
}

/// Wire shape of a successful token response. Every field is optional here so that absence is
/// reported as [`MalformedResponseError::MissingField`] rather than a parse failure.
#[derive(Deserialize)]
struct RawTokenResponse {
	access_token: Option<String>,
	id_token: Option<String>,
	refresh_token: Option<String>,
	token_type: Option<String>,
	expires_in: Option<i64>,
}

/// Parses a `200` token response body received at `received_at`.
pub fn parse_token_response(
	body: &[u8],
	received_at: OffsetDateTime,
) -> Result<TokenSet, MalformedResponseError> {
	let de = &mut serde_json::Deserializer::from_slice(body);
	let raw: RawTokenResponse = serde_path_to_error::deserialize(de)
		.map_err(|source| MalformedResponseError::Parse { source })?;
	let mut builder = TokenSet::builder().issued_at(received_at);

	if let Some(access_token) = raw.access_token.filter(|value| !value.is_empty()) {
		builder = builder.access_token(access_token);
	}
	if let Some(id_token) = raw.id_token.filter(|value| !value.is_empty()) {
		builder = builder.id_token(id_token);
	}
	if let Some(refresh_token) = raw.refresh_token.filter(|value| !value.is_empty()) {
		builder = builder.refresh_token(refresh_token);
	}
	if let Some(token_type) = raw.token_type {
		builder = builder.token_type(token_type);
	}
	if let Some(expires_in) = raw.expires_in {
		if expires_in <= 0 {
			return Err(MalformedResponseError::NonPositiveExpiresIn);
		}

		builder = builder.expires_in(Duration::seconds(expires_in));
	}

	builder.build().map_err(|err| match err {
		TokenSetBuilderError::MissingAccessToken =>
			MalformedResponseError::MissingField { field: "access_token" },
		TokenSetBuilderError::MissingIdToken =>
			MalformedResponseError::MissingField { field: "id_token" },
		TokenSetBuilderError::ExpiryOutOfRange => MalformedResponseError::ExpiresInOutOfRange,
	})
}

fn basic_authorization(client_id: &str, secret: &str) -> String {
	let encode =
		|value: &str| form_urlencoded::byte_serialize(value.as_bytes()).collect::<String>();
	let credentials = format!("{}:{}", encode(client_id), encode(secret));

	format!("Basic {}", STANDARD.encode(credentials))
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}

	TransportError::from(err).into()
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{
		_preludet::{SpyExchangeClient, SpyHttpClient, spy_exchange_client, test_exchange_config},
		provider::ProviderErrorKind,
	};

	const TOKEN_ENDPOINT: &str = "https://idp.test/oauth2/token";

	struct OverridingStrategy;
	impl ProviderStrategy for OverridingStrategy {
		fn classify_token_error(&self, _ctx: &ProviderErrorContext) -> ProviderErrorKind {
			ProviderErrorKind::Transient
		}

		fn augment_token_request(&self, form: &mut BTreeMap<String, String>) {
			form.insert("client_id".into(), "hijacked".into());
			form.insert("audience".into(), "api".into());
		}
	}

	fn code(value: &str) -> AuthorizationCode {
		AuthorizationCode::new(value).expect("Code fixture should be non-empty.")
	}

	#[tokio::test]
	async fn exchange_posts_the_four_form_fields() {
		let spy =
			SpyHttpClient::default().respond_with(200, r#"{"access_token":"A","id_token":"B"}"#);
		let client = spy_exchange_client(spy.clone());
		let set = client
			.exchange_code_for_tokens(&code("X"), &test_exchange_config(TOKEN_ENDPOINT))
			.await
			.expect("Exchange against the spy should succeed.");
		let form = spy.last_form().expect("Spy should have captured the request.");

		assert_eq!(set.access_token.expose(), "A");
		assert_eq!(spy.calls(), 1);
		assert_eq!(
			form,
			BTreeMap::from([
				("client_id".to_owned(), "client-it".to_owned()),
				("code".to_owned(), "X".to_owned()),
				("grant_type".to_owned(), "authorization_code".to_owned()),
				("redirect_uri".to_owned(), "http://localhost:8501".to_owned()),
			])
		);
		assert_eq!(
			spy.last_header("content-type").as_deref(),
			Some("application/x-www-form-urlencoded")
		);
		assert_eq!(spy.last_header("accept").as_deref(), Some("application/json"));
		assert!(spy.last_header("authorization").is_none());
	}

	#[tokio::test]
	async fn invalid_config_never_reaches_the_transport() {
		let spy = SpyHttpClient::default();
		let client = spy_exchange_client(spy.clone());
		let mut config = test_exchange_config(TOKEN_ENDPOINT);

		config.client_id.clear();

		let err = client
			.exchange_code_for_tokens(&code("X"), &config)
			.await
			.expect_err("Empty client id must be rejected.");

		assert!(matches!(err, Error::Config(ConfigError::MissingSetting { setting: "client_id" })));
		assert!(err.is_local());

		let err = client
			.exchange_code_for_tokens(&code("X"), &test_exchange_config("http://idp.test/token"))
			.await
			.expect_err("Plain HTTP endpoints must be rejected.");

		assert!(matches!(err, Error::Config(ConfigError::InsecureEndpoint { .. })));
		assert_eq!(spy.calls(), 0);
	}

	#[tokio::test]
	async fn confidential_clients_authenticate() {
		let spy = SpyHttpClient::default()
			.respond_with(200, r#"{"access_token":"A","id_token":"B"}"#)
			.respond_with(200, r#"{"access_token":"A","id_token":"B"}"#);
		let client = spy_exchange_client(spy.clone());
		let basic = test_exchange_config(TOKEN_ENDPOINT)
			.with_client_secret("secret", ClientAuthMethod::ClientSecretBasic);

		client.exchange_code_for_tokens(&code("X"), &basic).await.expect("Basic auth should work.");

		assert_eq!(
			spy.last_header("authorization"),
			Some(basic_authorization("client-it", "secret"))
		);
		assert!(!spy.last_form().expect("Form should be captured.").contains_key("client_secret"));

		let post = test_exchange_config(TOKEN_ENDPOINT)
			.with_client_secret("secret", ClientAuthMethod::ClientSecretPost);

		client.exchange_code_for_tokens(&code("Y"), &post).await.expect("Post auth should work.");

		let form = spy.last_form().expect("Form should be captured.");

		assert_eq!(form.get("client_secret").map(String::as_str), Some("secret"));
		assert!(spy.last_header("authorization").is_none());
	}

	#[tokio::test]
	async fn strategies_extend_but_never_override_required_fields() {
		let spy = SpyHttpClient::default().respond_with(400, r#"{"error":"invalid_grant"}"#);
		let client: SpyExchangeClient = TokenExchangeClient::with_http_client(
			spy.clone(),
			Arc::new(DefaultTransportErrorMapper),
			Arc::new(OverridingStrategy),
		);
		let err = client
			.exchange_code_for_tokens(&code("X"), &test_exchange_config(TOKEN_ENDPOINT))
			.await
			.expect_err("Rejected exchange should fail.");
		let form = spy.last_form().expect("Form should be captured.");

		assert_eq!(form.get("client_id").map(String::as_str), Some("client-it"));
		assert_eq!(form.get("audience").map(String::as_str), Some("api"));
		assert!(matches!(
			err,
			Error::TokenExchangeFailed { status: 400, kind: ProviderErrorKind::Transient, .. }
		));
	}

	#[tokio::test]
	async fn rejections_keep_the_raw_body_and_classification() {
		let body = r#"{"error":"invalid_grant","error_description":"Authorization code reused"}"#;
		let spy = SpyHttpClient::default().respond_with(400, body);
		let err = spy_exchange_client(spy)
			.exchange_code_for_tokens(&code("X"), &test_exchange_config(TOKEN_ENDPOINT))
			.await
			.expect_err("Rejected exchange should fail.");

		match err {
			Error::TokenExchangeFailed { status, body: raw, kind } => {
				assert_eq!(status, 400);
				assert_eq!(raw, body);
				assert_eq!(kind, ProviderErrorKind::InvalidGrant);
			},
			other => panic!("Unexpected error: {other:?}."),
		}
	}

	#[tokio::test]
	async fn transport_failures_map_to_network_errors() {
		let err = spy_exchange_client(SpyHttpClient::default())
			.exchange_code_for_tokens(&code("X"), &test_exchange_config(TOKEN_ENDPOINT))
			.await
			.expect_err("Spy without responses should fail.");

		assert!(matches!(err, Error::Transport(TransportError::Network { .. })));
	}

	#[test]
	fn minimal_response_yields_both_tokens() {
		let received = macros::datetime!(2025-01-01 00:00 UTC);
		let set = parse_token_response(br#"{"access_token":"A","id_token":"B"}"#, received)
			.expect("Minimal token response should parse.");

		assert_eq!(set.access_token.expose(), "A");
		assert_eq!(set.id_token.expose(), "B");
		assert!(set.refresh_token.is_none());
		assert!(set.expires_at.is_none());
		assert_eq!(set.issued_at, received);
	}

	#[test]
	fn full_response_computes_expiry() {
		let received = macros::datetime!(2025-01-01 00:00 UTC);
		let set = parse_token_response(
			br#"{
				"access_token": "A",
				"id_token": "B",
				"refresh_token": "R",
				"token_type": "Bearer",
				"expires_in": 3600
			}"#,
			received,
		)
		.expect("Full token response should parse.");

		assert_eq!(set.refresh_token.as_ref().map(|token| token.expose()), Some("R"));
		assert_eq!(set.token_type.as_deref(), Some("Bearer"));
		assert_eq!(set.expires_at, Some(macros::datetime!(2025-01-01 01:00 UTC)));
	}

	#[test]
	fn missing_or_empty_tokens_are_malformed() {
		let now = OffsetDateTime::now_utc();

		assert!(matches!(
			parse_token_response(br#"{"id_token":"B"}"#, now),
			Err(MalformedResponseError::MissingField { field: "access_token" })
		));
		assert!(matches!(
			parse_token_response(br#"{"access_token":"A","id_token":""}"#, now),
			Err(MalformedResponseError::MissingField { field: "id_token" })
		));
		assert!(matches!(
			parse_token_response(br#"{"access_token":"A","id_token":"B","expires_in":0}"#, now),
			Err(MalformedResponseError::NonPositiveExpiresIn)
		));
	}

	#[test]
	fn overflowing_expires_in_is_malformed() {
		assert!(matches!(
			parse_token_response(
				br#"{"access_token":"A","id_token":"B","expires_in":9223372036854775807}"#,
				OffsetDateTime::now_utc(),
			),
			Err(MalformedResponseError::ExpiresInOutOfRange)
		));
	}

	#[test]
	fn parse_errors_carry_the_field_path() {
		let err = parse_token_response(
			br#"{"access_token":"A","id_token":"B","expires_in":"soon"}"#,
			OffsetDateTime::now_utc(),
		)
		.expect_err("String expiry must be rejected.");

		match err {
			MalformedResponseError::Parse { source } =>
				assert_eq!(source.path().to_string(), "expires_in"),
			other => panic!("Unexpected error: {other:?}."),
		}

		assert!(matches!(
			parse_token_response(b"<html>oops</html>", OffsetDateTime::now_utc()),
			Err(MalformedResponseError::Parse { .. })
		));
	}

	#[test]
	fn request_debug_redacts_the_code() {
		let code = AuthorizationCode::new("super-secret-code").expect("Code fixture is non-empty.");
		let config =
			ExchangeConfig::new("client", "http://localhost:8501", "https://idp.test/token");
		let request = ExchangeRequest::new(&code, &config).expect("Request should build.");
		let mut form = BTreeMap::new();

		request.write_into(&mut form);

		assert_eq!(form.get("grant_type").map(String::as_str), Some("authorization_code"));
		assert_eq!(form.get("redirect_uri").map(String::as_str), Some("http://localhost:8501"));
		assert!(!format!("{request:?}").contains("super-secret-code"));
	}

	#[test]
	fn basic_authorization_encodes_credentials() {
		assert_eq!(basic_authorization("client", "secret"), "Basic Y2xpZW50OnNlY3JldA==");
		assert_eq!(
			basic_authorization("a:b", "c d"),
			format!("Basic {}", STANDARD.encode("a%3Ab:c+d"))
		);
	}
}
