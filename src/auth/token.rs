//! Tokens returned by a successful authorization-code exchange.

// self
use crate::_prelude::*;

/// One token value issued by the identity provider.
///
/// Formatting never reveals the value: `Display` renders only its byte length, which is what the
/// CLI prints unless tokens are explicitly requested.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the raw token, for handing to a resource server.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Length of the token in bytes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` for an empty token. Sets built by the exchange client never hold one.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenSecret(<redacted>)")
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "<{} bytes>", self.0.len())
	}
}

/// Errors produced by [`TokenSetBuilder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenSetBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no ID token value was provided.
	#[error("ID token is required.")]
	MissingIdToken,
	/// Issued when the lifetime overflows the representable expiry instant.
	#[error("Expiry instant is out of range.")]
	ExpiryOutOfRange,
}

/// Tokens issued by the identity provider for one completed login.
///
/// The set is owned by whoever receives it; nothing here caches or refreshes it.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenSet {
	/// Bearer credential for resource access.
	pub access_token: TokenSecret,
	/// Signed assertion of the user's identity. Not validated by this crate.
	pub id_token: TokenSecret,
	/// Refresh token, when the provider issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Token type reported by the provider (usually `Bearer`).
	pub token_type: Option<String>,
	/// Instant the token response was received.
	pub issued_at: OffsetDateTime,
	/// Expiry instant derived from `expires_in`, when the provider reported one.
	pub expires_at: Option<OffsetDateTime>,
}
impl TokenSet {
	/// Returns a builder for assembling a token set.
	pub fn builder() -> TokenSetBuilder {
		TokenSetBuilder::default()
	}

	/// Returns `true` if the access token is past its reported expiry at `instant`.
	///
	/// Sets without an expiry never report as expired.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| instant >= expires_at)
	}
}
impl Debug for TokenSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenSet")
			.field("access_token", &"<redacted>")
			.field("id_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("token_type", &self.token_type)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`TokenSet`].
#[derive(Clone, Debug, Default)]
pub struct TokenSetBuilder {
	access_token: Option<TokenSecret>,
	id_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	token_type: Option<String>,
	issued_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl TokenSetBuilder {
	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the ID token value.
	pub fn id_token(mut self, token: impl Into<String>) -> Self {
		self.id_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Records the token type.
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = Some(token_type.into());

		self
	}

	/// Sets the issued-at instant (defaults to now).
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets the lifetime relative to the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces a [`TokenSet`].
	pub fn build(self) -> Result<TokenSet, TokenSetBuilderError> {
		let access_token = self.access_token.ok_or(TokenSetBuilderError::MissingAccessToken)?;
		let id_token = self.id_token.ok_or(TokenSetBuilderError::MissingIdToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match self.expires_in {
			Some(delta) =>
				Some(issued_at.checked_add(delta).ok_or(TokenSetBuilderError::ExpiryOutOfRange)?),
			None => None,
		};

		Ok(TokenSet {
			access_token,
			id_token,
			refresh_token: self.refresh_token,
			token_type: self.token_type,
			issued_at,
			expires_at,
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn builder_requires_both_tokens() {
		assert_eq!(
			TokenSet::builder().id_token("id").build().expect_err("Access token is required."),
			TokenSetBuilderError::MissingAccessToken
		);
		assert_eq!(
			TokenSet::builder().access_token("access").build().expect_err("ID token is required."),
			TokenSetBuilderError::MissingIdToken
		);
	}

	#[test]
	fn builder_handles_relative_expiry() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let set = TokenSet::builder()
			.access_token("access")
			.id_token("id")
			.issued_at(issued)
			.expires_in(Duration::hours(1))
			.build()
			.expect("Token set builder should support relative expiry calculations.");

		assert_eq!(set.expires_at, Some(macros::datetime!(2025-01-01 01:00 UTC)));
		assert!(!set.is_expired_at(macros::datetime!(2025-01-01 00:59 UTC)));
		assert!(set.is_expired_at(macros::datetime!(2025-01-01 01:00 UTC)));
	}

	#[test]
	fn builder_rejects_overflowing_expiry() {
		assert_eq!(
			TokenSet::builder()
				.access_token("access")
				.id_token("id")
				.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
				.expires_in(Duration::seconds(i64::MAX))
				.build()
				.expect_err("Overflowing expiry must be rejected."),
			TokenSetBuilderError::ExpiryOutOfRange
		);
	}

	#[test]
	fn sets_without_expiry_never_expire() {
		let set = TokenSet::builder()
			.access_token("access")
			.id_token("id")
			.build()
			.expect("Token set builder should succeed without expiry.");

		assert!(set.expires_at.is_none());
		assert!(!set.is_expired_at(OffsetDateTime::now_utc() + Duration::days(365)));
	}

	#[test]
	fn debug_output_redacts_every_token() {
		let set = TokenSet::builder()
			.access_token("access-secret")
			.id_token("id-secret")
			.refresh_token("refresh-secret")
			.token_type("Bearer")
			.build()
			.expect("Token set fixture should build.");
		let rendered = format!("{set:?}");

		assert!(!rendered.contains("access-secret"));
		assert!(!rendered.contains("id-secret"));
		assert!(!rendered.contains("refresh-secret"));
		assert!(rendered.contains("Bearer"));
	}

	#[test]
	fn secrets_display_only_their_length() {
		let set = TokenSet::builder()
			.access_token("access-secret")
			.id_token("id")
			.build()
			.expect("Token set fixture should build.");

		assert_eq!(set.access_token.to_string(), "<13 bytes>");
		assert_eq!(format!("{:?}", set.id_token), "TokenSecret(<redacted>)");
		assert_eq!(set.access_token.len(), 13);
		assert_eq!(set.access_token.expose(), "access-secret");
	}
}
