//! Authorization-code login against a hosted OAuth 2.0/OIDC identity provider: detect the
//! redirect code, exchange it for tokens with a typed error taxonomy, and provision the
//! provider's resources idempotently.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod exchange;
pub mod flows;
pub mod http;
pub mod obs;
pub mod provider;
pub mod provision;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// std
	use std::{collections::VecDeque, future};
	// crates.io
	use oauth2::{
		AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
		http::{HeaderName, StatusCode},
	};
	use url::form_urlencoded;
	// self
	use crate::{
		config::ExchangeConfig,
		exchange::{DefaultTransportErrorMapper, TokenExchangeClient},
		http::TokenHttpClient,
		provider::{DefaultProviderStrategy, ProviderStrategy},
	};

	/// Exchange client alias backed by [`SpyHttpClient`].
	pub type SpyExchangeClient = TokenExchangeClient<SpyHttpClient, DefaultTransportErrorMapper>;

	/// Error produced by [`SpyHttpClient`] when it runs out of canned responses.
	#[derive(Debug, ThisError)]
	#[error("Spy transport has no canned response left.")]
	pub struct SpyError;

	/// In-process transport that records every request and replays canned responses.
	#[derive(Clone, Debug, Default)]
	pub struct SpyHttpClient {
		requests: Arc<Mutex<Vec<HttpRequest>>>,
		responses: Arc<Mutex<VecDeque<(u16, String)>>>,
	}
	impl SpyHttpClient {
		/// Queues a response for the next unanswered request.
		pub fn respond_with(self, status: u16, body: impl Into<String>) -> Self {
			self.responses.lock().push_back((status, body.into()));

			self
		}

		/// Number of requests the transport has seen.
		pub fn calls(&self) -> usize {
			self.requests.lock().len()
		}

		/// Decoded form body of the most recent request.
		pub fn last_form(&self) -> Option<BTreeMap<String, String>> {
			self.requests.lock().last().map(|request| {
				form_urlencoded::parse(request.body()).into_owned().collect::<BTreeMap<_, _>>()
			})
		}

		/// Header value of the most recent request.
		pub fn last_header(&self, name: &str) -> Option<String> {
			let name = HeaderName::from_bytes(name.as_bytes()).ok()?;

			self.requests
				.lock()
				.last()
				.and_then(|request| request.headers().get(&name))
				.and_then(|value| value.to_str().ok())
				.map(str::to_owned)
		}

		fn answer(&self, request: HttpRequest) -> Result<HttpResponse, HttpClientError<SpyError>> {
			self.requests.lock().push(request);

			let (status, body) = self
				.responses
				.lock()
				.pop_front()
				.ok_or(HttpClientError::Reqwest(Box::new(SpyError)))?;
			let mut response = HttpResponse::new(body.into_bytes());

			*response.status_mut() =
				StatusCode::from_u16(status).expect("Canned status should be a valid HTTP status.");

			Ok(response)
		}
	}
	impl TokenHttpClient for SpyHttpClient {
		type Handle = SpyHttpClient;
		type TransportError = SpyError;

		fn handle(&self) -> Self::Handle {
			self.clone()
		}
	}
	impl<'c> AsyncHttpClient<'c> for SpyHttpClient {
		type Error = HttpClientError<SpyError>;
		type Future =
			Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

		fn call(&'c self, request: HttpRequest) -> Self::Future {
			Box::pin(future::ready(self.answer(request)))
		}
	}

	/// Builds an exchange client around `spy` with the default strategy.
	pub fn spy_exchange_client(spy: SpyHttpClient) -> SpyExchangeClient {
		let strategy: Arc<dyn ProviderStrategy> = Arc::new(DefaultProviderStrategy);

		TokenExchangeClient::with_http_client(spy, Arc::new(DefaultTransportErrorMapper), strategy)
	}

	/// Public-client exchange configuration pointing at `token_endpoint`.
	pub fn test_exchange_config(token_endpoint: impl Into<String>) -> ExchangeConfig {
		ExchangeConfig::new("client-it", "http://localhost:8501", token_endpoint)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use oauth2;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tokio as _};
#[cfg(feature = "cli")]
use {
	clap as _, color_eyre as _, dotenvy as _, tokio as _, tracing_subscriber as _,
};
