//! Login configuration built once at startup and passed by reference.
//!
//! [`LoginConfig`] covers everything the browser-facing flow needs (client identity, hosted
//! endpoints, scopes, transport timeout). [`ExchangeConfig`] is the narrower slice consumed by the
//! token exchange and is validated right before each exchange.

// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	error::ConfigError,
	provider::{ClientAuthMethod, ProviderEndpoints, validate_endpoint},
};

/// Environment variable holding the app client identifier.
pub const ENV_CLIENT_ID: &str = "CLIENT_ID";
/// Environment variable holding the registered redirect URI.
pub const ENV_REDIRECT_URI: &str = "REDIRECT_URI";
/// Environment variable holding the hosted domain prefix.
pub const ENV_DOMAIN_PREFIX: &str = "DOMAIN_PREFIX";
/// Environment variable holding the provider region.
pub const ENV_AWS_REGION: &str = "AWS_REGION";
/// Environment variable holding the post-logout landing URI.
pub const ENV_LOGOUT_URI: &str = "LOGOUT_URI";
/// Environment variable holding the optional client secret.
pub const ENV_CLIENT_SECRET: &str = "CLIENT_SECRET";
/// Environment variable selecting the client authentication method.
pub const ENV_CLIENT_AUTH_METHOD: &str = "CLIENT_AUTH_METHOD";
/// Environment variable overriding the requested scopes.
pub const ENV_OAUTH_SCOPES: &str = "OAUTH_SCOPES";
/// Environment variable overriding the hosted domain base URL.
pub const ENV_IDP_BASE_URL: &str = "IDP_BASE_URL";
/// Environment variable overriding the token request timeout in seconds.
pub const ENV_TOKEN_TIMEOUT_SECS: &str = "TOKEN_TIMEOUT_SECS";

/// Landing page the hosted logout endpoint redirects to when none is configured.
pub const DEFAULT_LOGOUT_URI: &str = "http://localhost:8501/logout";
/// Token request timeout applied when none is configured.
pub const DEFAULT_TOKEN_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Inputs of a single code exchange.
///
/// Values are kept verbatim. In particular `redirect_uri` is sent byte-for-byte, since the
/// provider compares it to the registered value.
#[derive(Clone, PartialEq, Eq)]
pub struct ExchangeConfig {
	/// App client identifier.
	pub client_id: String,
	/// Redirect URI registered on the app client.
	pub redirect_uri: String,
	/// Absolute token endpoint URL.
	pub token_endpoint: String,
	/// Client secret for confidential app clients.
	pub client_secret: Option<String>,
	/// How the client authenticates at the token endpoint.
	pub client_auth: ClientAuthMethod,
}
impl ExchangeConfig {
	/// Creates a public-client configuration.
	pub fn new(
		client_id: impl Into<String>,
		redirect_uri: impl Into<String>,
		token_endpoint: impl Into<String>,
	) -> Self {
		Self {
			client_id: client_id.into(),
			redirect_uri: redirect_uri.into(),
			token_endpoint: token_endpoint.into(),
			client_secret: None,
			client_auth: ClientAuthMethod::None,
		}
	}

	/// Switches to a confidential client using `method`.
	pub fn with_client_secret(
		mut self,
		secret: impl Into<String>,
		method: ClientAuthMethod,
	) -> Self {
		self.client_secret = Some(secret.into());
		self.client_auth = method;

		self
	}

	/// Checks every field and returns the parsed token endpoint.
	pub fn validate(&self) -> Result<Url, ConfigError> {
		require("client_id", &self.client_id)?;
		require("redirect_uri", &self.redirect_uri)?;
		require("token_endpoint", &self.token_endpoint)?;

		let endpoint = Url::parse(&self.token_endpoint)
			.map_err(|source| ConfigError::InvalidUrl { setting: "token_endpoint", source })?;

		validate_endpoint("token", &endpoint)?;

		if self.client_auth.requires_secret()
			&& self.client_secret.as_deref().is_none_or(str::is_empty)
		{
			return Err(ConfigError::MissingClientSecret { method: self.client_auth.as_str() });
		}

		Ok(endpoint)
	}
}
impl Debug for ExchangeConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ExchangeConfig")
			.field("client_id", &self.client_id)
			.field("redirect_uri", &self.redirect_uri)
			.field("token_endpoint", &self.token_endpoint)
			.field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
			.field("client_auth", &self.client_auth)
			.finish()
	}
}

/// Complete configuration of the login flow.
#[derive(Clone)]
pub struct LoginConfig {
	/// App client identifier.
	pub client_id: String,
	/// Redirect URI registered on the app client.
	pub redirect_uri: String,
	/// Where the hosted logout endpoint sends the browser afterwards.
	pub logout_uri: String,
	/// Hosted login, token, and logout endpoints.
	pub endpoints: ProviderEndpoints,
	/// Scopes requested on the hosted login page.
	pub scopes: ScopeSet,
	/// Client secret for confidential app clients.
	pub client_secret: Option<String>,
	/// How the client authenticates at the token endpoint.
	pub client_auth: ClientAuthMethod,
	/// Upper bound for the token request.
	pub timeout: StdDuration,
}
impl LoginConfig {
	/// Creates a configuration with default scopes, logout URI, and timeout.
	pub fn new(
		client_id: impl Into<String>,
		redirect_uri: impl Into<String>,
		endpoints: ProviderEndpoints,
	) -> Self {
		Self {
			client_id: client_id.into(),
			redirect_uri: redirect_uri.into(),
			logout_uri: DEFAULT_LOGOUT_URI.into(),
			endpoints,
			scopes: ScopeSet::openid_defaults(),
			client_secret: None,
			client_auth: ClientAuthMethod::None,
			timeout: DEFAULT_TOKEN_TIMEOUT,
		}
	}

	/// Reads the configuration from process environment variables.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Reads the configuration through an arbitrary key lookup.
	///
	/// Empty values are treated as unset. `IDP_BASE_URL`, when present, replaces the hosted
	/// domain derived from `DOMAIN_PREFIX` and `AWS_REGION`.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let get = |key: &str| lookup(key).filter(|value| !value.is_empty());
		let client_id =
			get(ENV_CLIENT_ID).ok_or(ConfigError::MissingSetting { setting: ENV_CLIENT_ID })?;
		let redirect_uri =
			get(ENV_REDIRECT_URI).ok_or(ConfigError::MissingSetting { setting: ENV_REDIRECT_URI })?;

		parse_url(ENV_REDIRECT_URI, &redirect_uri)?;

		let endpoints = match get(ENV_IDP_BASE_URL) {
			Some(base) => ProviderEndpoints::from_base(parse_url(ENV_IDP_BASE_URL, &base)?)?,
			None => {
				let prefix = get(ENV_DOMAIN_PREFIX)
					.ok_or(ConfigError::MissingSetting { setting: ENV_DOMAIN_PREFIX })?;
				let region = get(ENV_AWS_REGION)
					.ok_or(ConfigError::MissingSetting { setting: ENV_AWS_REGION })?;

				ProviderEndpoints::hosted(&prefix, &region)?
			},
		};
		let mut config = Self::new(client_id, redirect_uri, endpoints);

		if let Some(logout_uri) = get(ENV_LOGOUT_URI) {
			parse_url(ENV_LOGOUT_URI, &logout_uri)?;

			config.logout_uri = logout_uri;
		}
		if let Some(scopes) = get(ENV_OAUTH_SCOPES) {
			config.scopes = ScopeSet::from_str(&scopes)?;
		}
		if let Some(method) = get(ENV_CLIENT_AUTH_METHOD) {
			config.client_auth = ClientAuthMethod::from_str(&method)?;
		}

		config.client_secret = get(ENV_CLIENT_SECRET);

		if config.client_secret.is_some() && get(ENV_CLIENT_AUTH_METHOD).is_none() {
			config.client_auth = ClientAuthMethod::ClientSecretBasic;
		}
		if let Some(raw) = get(ENV_TOKEN_TIMEOUT_SECS) {
			config.timeout = parse_timeout(&raw)?;
		}

		Ok(config)
	}

	/// Overrides the requested scopes.
	pub fn with_scopes(mut self, scopes: ScopeSet) -> Self {
		self.scopes = scopes;

		self
	}

	/// Overrides the post-logout landing URI.
	pub fn with_logout_uri(mut self, logout_uri: impl Into<String>) -> Self {
		self.logout_uri = logout_uri.into();

		self
	}

	/// Overrides the token request timeout.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Switches to a confidential client using `method`.
	pub fn with_client_secret(
		mut self,
		secret: impl Into<String>,
		method: ClientAuthMethod,
	) -> Self {
		self.client_secret = Some(secret.into());
		self.client_auth = method;

		self
	}

	/// Projects the settings consumed by the token exchange.
	pub fn exchange_config(&self) -> ExchangeConfig {
		ExchangeConfig {
			client_id: self.client_id.clone(),
			redirect_uri: self.redirect_uri.clone(),
			token_endpoint: self.endpoints.token.to_string(),
			client_secret: self.client_secret.clone(),
			client_auth: self.client_auth,
		}
	}
}
impl Debug for LoginConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginConfig")
			.field("client_id", &self.client_id)
			.field("redirect_uri", &self.redirect_uri)
			.field("logout_uri", &self.logout_uri)
			.field("endpoints", &self.endpoints)
			.field("scopes", &self.scopes)
			.field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
			.field("client_auth", &self.client_auth)
			.field("timeout", &self.timeout)
			.finish()
	}
}

fn require(setting: &'static str, value: &str) -> Result<(), ConfigError> {
	if value.is_empty() { Err(ConfigError::MissingSetting { setting }) } else { Ok(()) }
}

fn parse_url(setting: &'static str, raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { setting, source })
}

fn parse_timeout(raw: &str) -> Result<StdDuration, ConfigError> {
	match raw.parse::<u64>() {
		Ok(secs) if secs > 0 => Ok(StdDuration::from_secs(secs)),
		_ => Err(ConfigError::InvalidSetting {
			setting: ENV_TOKEN_TIMEOUT_SECS,
			reason: format!("expected a positive number of seconds, got `{raw}`"),
		}),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map = pairs
			.iter()
			.map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
			.collect::<HashMap<_, _>>();

		move |key| map.get(key).cloned()
	}

	const BASE: [(&str, &str); 4] = [
		(ENV_CLIENT_ID, "client-123"),
		(ENV_REDIRECT_URI, "http://localhost:8501"),
		(ENV_DOMAIN_PREFIX, "my-app"),
		(ENV_AWS_REGION, "eu-central-1"),
	];

	#[test]
	fn from_lookup_applies_defaults() {
		let config = LoginConfig::from_lookup(lookup_from(&BASE))
			.expect("Minimal environment should produce a configuration.");

		assert_eq!(config.client_id, "client-123");
		assert_eq!(config.logout_uri, DEFAULT_LOGOUT_URI);
		assert_eq!(config.scopes, ScopeSet::openid_defaults());
		assert_eq!(config.client_auth, ClientAuthMethod::None);
		assert_eq!(config.timeout, DEFAULT_TOKEN_TIMEOUT);
		assert_eq!(
			config.endpoints.token.as_str(),
			"https://my-app.auth.eu-central-1.amazoncognito.com/oauth2/token"
		);
	}

	#[test]
	fn from_lookup_reports_missing_and_empty_settings() {
		let err = LoginConfig::from_lookup(lookup_from(&BASE[1..]))
			.expect_err("Missing client id must be rejected.");

		assert!(matches!(err, ConfigError::MissingSetting { setting: ENV_CLIENT_ID }));

		let mut pairs = BASE.to_vec();

		pairs[3] = (ENV_AWS_REGION, "");

		let err = LoginConfig::from_lookup(lookup_from(&pairs))
			.expect_err("Empty region must be rejected.");

		assert!(matches!(err, ConfigError::MissingSetting { setting: ENV_AWS_REGION }));
	}

	#[test]
	fn from_lookup_honors_overrides() {
		let mut pairs = vec![
			(ENV_CLIENT_ID, "client-123"),
			(ENV_REDIRECT_URI, "http://localhost:8501"),
			(ENV_IDP_BASE_URL, "http://127.0.0.1:9000"),
			(ENV_OAUTH_SCOPES, "openid email"),
			(ENV_CLIENT_SECRET, "shh"),
			(ENV_TOKEN_TIMEOUT_SECS, "3"),
		];
		let config = LoginConfig::from_lookup(lookup_from(&pairs))
			.expect("Override environment should produce a configuration.");

		assert_eq!(config.endpoints.token.as_str(), "http://127.0.0.1:9000/oauth2/token");
		assert_eq!(config.scopes.normalized(), "email openid");
		assert_eq!(config.client_auth, ClientAuthMethod::ClientSecretBasic);
		assert_eq!(config.timeout, StdDuration::from_secs(3));

		pairs.push((ENV_CLIENT_AUTH_METHOD, "client_secret_post"));

		let config = LoginConfig::from_lookup(lookup_from(&pairs))
			.expect("Explicit auth method should be honored.");

		assert_eq!(config.client_auth, ClientAuthMethod::ClientSecretPost);
		assert!(!format!("{config:?}").contains("shh"));
	}

	#[test]
	fn from_lookup_rejects_bad_values() {
		let mut pairs = BASE.to_vec();

		pairs.push((ENV_TOKEN_TIMEOUT_SECS, "0"));

		assert!(matches!(
			LoginConfig::from_lookup(lookup_from(&pairs)),
			Err(ConfigError::InvalidSetting { setting: ENV_TOKEN_TIMEOUT_SECS, .. })
		));

		let mut pairs = BASE.to_vec();

		pairs[1] = (ENV_REDIRECT_URI, "not a url");

		assert!(matches!(
			LoginConfig::from_lookup(lookup_from(&pairs)),
			Err(ConfigError::InvalidUrl { setting: ENV_REDIRECT_URI, .. })
		));

		let mut pairs = BASE.to_vec();

		pairs.push((ENV_LOGOUT_URI, "/logout"));

		assert!(matches!(
			LoginConfig::from_lookup(lookup_from(&pairs)),
			Err(ConfigError::InvalidUrl { setting: ENV_LOGOUT_URI, .. })
		));
	}

	#[test]
	fn exchange_config_validation_runs_in_order() {
		let valid =
			ExchangeConfig::new("client", "http://localhost:8501", "https://idp.test/token");

		assert_eq!(
			valid.validate().expect("Valid config should pass.").as_str(),
			"https://idp.test/token"
		);
		assert!(matches!(
			ExchangeConfig::new("", "http://localhost:8501", "https://idp.test/token").validate(),
			Err(ConfigError::MissingSetting { setting: "client_id" })
		));
		assert!(matches!(
			ExchangeConfig::new("client", "http://localhost:8501", "http://idp.test/token")
				.validate(),
			Err(ConfigError::InsecureEndpoint { endpoint: "token", .. })
		));
		assert!(matches!(
			ExchangeConfig::new("client", "http://localhost:8501", "::").validate(),
			Err(ConfigError::InvalidUrl { setting: "token_endpoint", .. })
		));

		let mut secretless = valid.clone();

		secretless.client_auth = ClientAuthMethod::ClientSecretPost;

		assert!(matches!(
			secretless.validate(),
			Err(ConfigError::MissingClientSecret { method: "client_secret_post" })
		));
	}
}
