//! Demonstrates plugging a custom HTTP transport and error mapper into the token exchange.
//!
//! 1. Implement [`TokenHttpClient`] whose handle answers with canned responses or failures.
//! 2. Provide a [`TransportErrorMapper`] that turns the transport's own error type into the crate's
//!    [`Error`] taxonomy.
//! 3. Wrap both in `Arc` and pass them to [`TokenExchangeClient::with_http_client`].

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
	sync::Arc,
};
// crates.io
use color_eyre::{Result, eyre::eyre};
// self
use hosted_login::{
	auth::AuthorizationCode,
	config::ExchangeConfig,
	error::{Error, TransportError},
	exchange::{TokenExchangeClient, TransportErrorMapper},
	http::TokenHttpClient,
	oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse},
	provider::{DefaultProviderStrategy, ProviderStrategy},
};

const MOCK_TOKEN_RESPONSE: &[u8] =
	br#"{"access_token":"mock-access","id_token":"mock-id","expires_in":900}"#;

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let strategy: Arc<dyn ProviderStrategy> = Arc::new(DefaultProviderStrategy);
	let mapper = Arc::new(MockTransportErrorMapper);
	let config = ExchangeConfig::new(
		"demo-client",
		"http://localhost:8501",
		"https://my-app.auth.eu-central-1.amazoncognito.com/oauth2/token",
	);
	let code = AuthorizationCode::new("demo-code").ok_or_else(|| eyre!("Demo code is empty."))?;

	for behavior in [
		MockBehavior::Success,
		MockBehavior::TransportError(MockTransportError::DnsFailure {
			host: "my-app.auth.eu-central-1.amazoncognito.com",
		}),
		MockBehavior::TransportError(MockTransportError::BackendTimeout),
		MockBehavior::Other("upstream connection closed"),
	] {
		let client: TokenExchangeClient<MockHttpClient, MockTransportErrorMapper> =
			TokenExchangeClient::with_http_client(
				MockHttpClient { behavior },
				Arc::clone(&mapper),
				Arc::clone(&strategy),
			);

		match client.exchange_code_for_tokens(&code, &config).await {
			Ok(tokens) => println!(
				"Access token issued by the mock transport: {}.",
				tokens.access_token.expose()
			),
			Err(e) => println!("Transport outcome mapped by the exchange client: {e}."),
		}
	}

	Ok(())
}

#[derive(Clone, Debug)]
enum MockTransportError {
	DnsFailure { host: &'static str },
	BackendTimeout,
}
impl Display for MockTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::DnsFailure { host } => write!(f, "DNS lookup failed for {host}"),
			Self::BackendTimeout => write!(f, "Token endpoint timed out"),
		}
	}
}
impl StdError for MockTransportError {}

#[derive(Clone)]
enum MockBehavior {
	Success,
	TransportError(MockTransportError),
	Other(&'static str),
}

#[derive(Clone)]
struct MockHttpClient {
	behavior: MockBehavior,
}
impl TokenHttpClient for MockHttpClient {
	type Handle = MockHttpHandle;
	type TransportError = MockTransportError;

	fn handle(&self) -> Self::Handle {
		MockHttpHandle { behavior: self.behavior.clone() }
	}
}

struct MockHttpHandle {
	behavior: MockBehavior,
}
impl<'a> AsyncHttpClient<'a> for MockHttpHandle {
	type Error = HttpClientError<MockTransportError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'a + Send + Sync>>;

	fn call(&'a self, _request: HttpRequest) -> Self::Future {
		let behavior = self.behavior.clone();

		Box::pin(async move {
			match behavior {
				MockBehavior::Success => Ok(HttpResponse::new(MOCK_TOKEN_RESPONSE.to_vec())),
				// `HttpClientError::Reqwest` carries any boxed transport error.
				MockBehavior::TransportError(error) =>
					Err(HttpClientError::Reqwest(Box::new(error))),
				MockBehavior::Other(message) => Err(HttpClientError::Other(message.to_owned())),
			}
		})
	}
}

struct MockTransportErrorMapper;
impl TransportErrorMapper<MockTransportError> for MockTransportErrorMapper {
	fn map_transport_error(&self, error: HttpClientError<MockTransportError>) -> Error {
		match error {
			HttpClientError::Reqwest(inner) => match *inner {
				MockTransportError::BackendTimeout => TransportError::timeout(*inner).into(),
				other => TransportError::network(other).into(),
			},
			HttpClientError::Other(message) => TransportError::Other { message }.into(),
			other => TransportError::Other { message: other.to_string() }.into(),
		}
	}
}
