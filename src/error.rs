//! Crate-level error types shared by the exchange client, login flow, and provisioning.

// self
use crate::{_prelude::*, provider::ProviderErrorKind, provision::ProvisionError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem, raised before any network call.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Token endpoint answered with a 200 that violates the token response contract.
	#[error(transparent)]
	MalformedResponse(#[from] MalformedResponseError),
	/// Provisioning-layer failure.
	#[error(transparent)]
	Provision(#[from] ProvisionError),

	/// Identity provider rejected the exchange; the authorization code is spent.
	#[error("Token endpoint rejected the exchange with HTTP {status} ({kind}).")]
	TokenExchangeFailed {
		/// HTTP status code returned by the token endpoint.
		status: u16,
		/// Raw response body. Never shown to end users.
		body: String,
		/// Strategy classification of the rejection.
		kind: ProviderErrorKind,
	},
}
impl Error {
	/// Returns `true` when the failure happened before anything was sent to the provider.
	pub fn is_local(&self) -> bool {
		matches!(self, Self::Config(_))
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required setting is missing or empty.
	#[error("Required setting `{setting}` is missing or empty.")]
	MissingSetting {
		/// Setting name (environment variable or field).
		setting: &'static str,
	},
	/// A setting could not be parsed.
	#[error("Setting `{setting}` is invalid: {reason}.")]
	InvalidSetting {
		/// Setting name (environment variable or field).
		setting: &'static str,
		/// Human-readable reason.
		reason: String,
	},
	/// A URL setting cannot be parsed.
	#[error("Setting `{setting}` is not a valid URL.")]
	InvalidUrl {
		/// Setting name (environment variable or field).
		setting: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// The authorization code handed to the exchange was empty.
	#[error("Authorization code cannot be empty.")]
	EmptyAuthorizationCode,
	/// A secret-based client authentication method was selected without a secret.
	#[error("Client authentication method `{method}` requires a client secret.")]
	MissingClientSecret {
		/// Selected method label.
		method: &'static str,
	},
	/// Requested scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Identifier validation failed.
	#[error(transparent)]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, timeout).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The token endpoint did not answer within the configured timeout.
	#[error("Token endpoint did not respond in time.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
	/// Transport failed without a structured error.
	#[error("HTTP client error occurred while calling the token endpoint: {message}.")]
	Other {
		/// Transport-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}

/// A 200 response from the token endpoint that cannot become a token set.
#[derive(Debug, ThisError)]
pub enum MalformedResponseError {
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A required token field was absent or empty.
	#[error("Token endpoint response is missing `{field}`.")]
	MissingField {
		/// JSON field name.
		field: &'static str,
	},
	/// Token endpoint returned a non-positive `expires_in`.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Token endpoint returned an `expires_in` that overflows the expiry instant.
	#[error("The expires_in value is out of range.")]
	ExpiresInOutOfRange,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn rejection_display_never_includes_the_body() {
		let err = Error::TokenExchangeFailed {
			status: 400,
			body: "{\"error\":\"invalid_grant\",\"error_description\":\"secret detail\"}".into(),
			kind: ProviderErrorKind::InvalidGrant,
		};
		let rendered = err.to_string();

		assert!(rendered.contains("400"));
		assert!(!rendered.contains("secret detail"));
	}

	#[test]
	fn only_config_errors_are_local() {
		assert!(Error::from(ConfigError::MissingSetting { setting: "client_id" }).is_local());
		assert!(!Error::from(MalformedResponseError::NonPositiveExpiresIn).is_local());
	}
}
