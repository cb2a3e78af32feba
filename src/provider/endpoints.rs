//! Hosted-domain endpoint derivation and validation.

// std
use std::net::IpAddr;
// crates.io
use url::Host;
// self
use crate::{_prelude::*, error::ConfigError};

/// Host suffix of the managed identity provider's hosted domains.
pub const HOSTED_DOMAIN_SUFFIX: &str = "amazoncognito.com";

/// Client authentication mode used at the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// Public client: only `client_id` is sent.
	None,
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
}
impl ClientAuthMethod {
	/// Returns the RFC 8414 identifier for the method.
	pub const fn as_str(self) -> &'static str {
		match self {
			ClientAuthMethod::None => "none",
			ClientAuthMethod::ClientSecretBasic => "client_secret_basic",
			ClientAuthMethod::ClientSecretPost => "client_secret_post",
		}
	}

	/// Returns `true` when the method sends a client secret.
	pub const fn requires_secret(self) -> bool {
		!matches!(self, ClientAuthMethod::None)
	}
}
impl Display for ClientAuthMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for ClientAuthMethod {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"none" => Ok(Self::None),
			"client_secret_basic" => Ok(Self::ClientSecretBasic),
			"client_secret_post" => Ok(Self::ClientSecretPost),
			other => Err(ConfigError::InvalidSetting {
				setting: "CLIENT_AUTH_METHOD",
				reason: format!("unknown method `{other}`"),
			}),
		}
	}
}

/// Endpoint set exposed by a hosted login domain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Hosted domain root, always ending in `/`.
	pub base: Url,
	/// Hosted login page that starts the authorization-code flow.
	pub login: Url,
	/// Token endpoint used for the code exchange.
	pub token: Url,
	/// Hosted logout endpoint.
	pub logout: Url,
}
impl ProviderEndpoints {
	/// Derives endpoints for `https://{domain_prefix}.auth.{region}.amazoncognito.com`.
	pub fn hosted(domain_prefix: &str, region: &str) -> Result<Self, ConfigError> {
		Self::from_base(hosted_domain_url(domain_prefix, region)?)
	}

	/// Derives endpoints below an explicit base URL (custom domains, local mocks).
	pub fn from_base(mut base: Url) -> Result<Self, ConfigError> {
		validate_endpoint("base", &base)?;

		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());

			base.set_path(&path);
		}

		base.set_query(None);
		base.set_fragment(None);

		let join = |path: &str| {
			base.join(path)
				.map_err(|source| ConfigError::InvalidUrl { setting: "IDP_BASE_URL", source })
		};
		let login = join("login")?;
		let token = join("oauth2/token")?;
		let logout = join("logout")?;

		Ok(Self { base, login, token, logout })
	}
}

/// Builds the hosted domain root for a domain prefix and region.
pub fn hosted_domain_url(domain_prefix: &str, region: &str) -> Result<Url, ConfigError> {
	validate_host_label("DOMAIN_PREFIX", domain_prefix)?;
	validate_host_label("AWS_REGION", region)?;

	Url::parse(&format!("https://{domain_prefix}.auth.{region}.{HOSTED_DOMAIN_SUFFIX}/"))
		.map_err(|source| ConfigError::InvalidUrl { setting: "DOMAIN_PREFIX", source })
}

/// Rejects non-HTTPS endpoints unless they target a loopback host.
pub fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ConfigError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(ConfigError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
		Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
		None => false,
	}
}

fn validate_host_label(setting: &'static str, value: &str) -> Result<(), ConfigError> {
	if value.is_empty() {
		return Err(ConfigError::MissingSetting { setting });
	}
	if value.starts_with('-')
		|| value.ends_with('-')
		|| !value.chars().all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
	{
		return Err(ConfigError::InvalidSetting {
			setting,
			reason: "expected lowercase letters, digits, and inner hyphens".into(),
		});
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn hosted_endpoints_follow_the_domain_layout() {
		let endpoints = ProviderEndpoints::hosted("my-app", "eu-central-1")
			.expect("Hosted endpoints should derive from a valid prefix and region.");

		assert_eq!(endpoints.base.as_str(), "https://my-app.auth.eu-central-1.amazoncognito.com/");
		assert_eq!(
			endpoints.token.as_str(),
			"https://my-app.auth.eu-central-1.amazoncognito.com/oauth2/token"
		);
		assert_eq!(
			endpoints.login.as_str(),
			"https://my-app.auth.eu-central-1.amazoncognito.com/login"
		);
		assert_eq!(
			endpoints.logout.as_str(),
			"https://my-app.auth.eu-central-1.amazoncognito.com/logout"
		);
	}

	#[test]
	fn hosted_endpoints_reject_bad_labels() {
		assert!(matches!(
			ProviderEndpoints::hosted("", "eu-central-1"),
			Err(ConfigError::MissingSetting { setting: "DOMAIN_PREFIX" })
		));
		assert!(matches!(
			ProviderEndpoints::hosted("my-app", "eu central"),
			Err(ConfigError::InvalidSetting { setting: "AWS_REGION", .. })
		));
		assert!(ProviderEndpoints::hosted("-leading", "eu-central-1").is_err());
		assert!(ProviderEndpoints::hosted("Upper", "eu-central-1").is_err());
	}

	#[test]
	fn base_urls_allow_https_and_loopback_only() {
		let local = Url::parse("http://127.0.0.1:8080/idp").expect("Loopback URL should parse.");
		let endpoints =
			ProviderEndpoints::from_base(local).expect("Loopback base URL should be accepted.");

		assert_eq!(endpoints.token.as_str(), "http://127.0.0.1:8080/idp/oauth2/token");

		let insecure = Url::parse("http://idp.example.com/").expect("Remote URL should parse.");
		let err = ProviderEndpoints::from_base(insecure)
			.expect_err("Remote plain-HTTP endpoints must be rejected.");

		assert!(matches!(err, ConfigError::InsecureEndpoint { endpoint: "base", .. }));
		assert!(
			validate_endpoint("token", &Url::parse("http://localhost:9/t").expect("URL parses."))
				.is_ok()
		);
	}

	#[test]
	fn client_auth_methods_parse_from_labels() {
		for method in [
			ClientAuthMethod::None,
			ClientAuthMethod::ClientSecretBasic,
			ClientAuthMethod::ClientSecretPost,
		] {
			assert_eq!(ClientAuthMethod::from_str(method.as_str()).ok(), Some(method));
		}

		assert!(ClientAuthMethod::from_str("private_key_jwt").is_err());
		assert!(!ClientAuthMethod::None.requires_secret());
		assert!(ClientAuthMethod::ClientSecretPost.requires_secret());
	}
}
