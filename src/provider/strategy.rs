//! Provider strategy hooks that customize the code exchange.
//!
//! Implementations decorate the outgoing token request form and classify rejected exchanges
//! without tying the exchange client to any particular HTTP stack.

// self
use crate::_prelude::*;

/// Strategy hook that allows providers to decorate requests and classify rejections.
///
/// Hooks only see crate-owned data so implementations never depend on reqwest types.
/// `augment_token_request` defaults to a no-op.
pub trait ProviderStrategy: Send + Sync {
	/// Maps a rejected token response into a [`ProviderErrorKind`].
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind;

	/// Adds provider-specific form parameters before dispatching.
	///
	/// Runs before the exchange client writes `grant_type`, `client_id`, `code`, and
	/// `redirect_uri`, so those four fields cannot be overridden here.
	fn augment_token_request(&self, _form: &mut BTreeMap<String, String>) {}
}

/// Canonical provider error categories used by strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
	/// Provider rejected the authorization grant (bad code/refresh token).
	InvalidGrant,
	/// Client authentication failed.
	InvalidClient,
	/// Requested scopes exceed what the token covers.
	InsufficientScope,
	/// Failure is temporary on the provider side.
	Transient,
}
impl ProviderErrorKind {
	/// Returns a stable label for logs and metrics.
	pub const fn as_str(self) -> &'static str {
		match self {
			ProviderErrorKind::InvalidGrant => "invalid_grant",
			ProviderErrorKind::InvalidClient => "invalid_client",
			ProviderErrorKind::InsufficientScope => "insufficient_scope",
			ProviderErrorKind::Transient => "transient",
		}
	}
}
impl Display for ProviderErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Context passed to provider strategies when classifying token errors.
///
/// Holds only primitive data (status code, OAuth fields, body preview). The exchange client
/// populates it before invoking [`ProviderStrategy::classify_token_error`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// HTTP status code returned by the provider, when available.
	pub http_status: Option<u16>,
	/// Provider-supplied OAuth `error` field.
	pub oauth_error: Option<String>,
	/// Provider-supplied OAuth `error_description` field.
	pub error_description: Option<String>,
	/// Preview of the response body for non-JSON payloads.
	pub body_preview: Option<String>,
}
impl ProviderErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates an empty context.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a context from a rejected token response.
	///
	/// OAuth `error`/`error_description` fields are lifted out of JSON bodies; anything else is
	/// kept as a truncated preview.
	pub fn from_response(status: u16, body: &str) -> Self {
		#[derive(Deserialize)]
		struct OAuthErrorBody {
			error: Option<String>,
			error_description: Option<String>,
		}

		let mut ctx = Self::new().with_http_status(status);

		match serde_json::from_str::<OAuthErrorBody>(body) {
			Ok(parsed) => {
				ctx.oauth_error = parsed.error;
				ctx.error_description = parsed.error_description;
			},
			Err(_) if !body.trim().is_empty() => ctx = ctx.with_body_preview(body),
			Err(_) => (),
		}

		ctx
	}

	/// Adds an HTTP status code (e.g., 400, 401, 500).
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds a body preview for providers that return non-JSON payloads.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		self.body_preview = Some(truncate_preview(body.into()));

		self
	}
}

/// Default strategy that applies RFC-guided heuristics.
///
/// It prioritizes structured OAuth fields (`error`, `error_description`), then
/// falls back to body text hints, and finally the HTTP status code. Transport failures never
/// reach a strategy; they are mapped by the exchange client's transport mapper.
#[derive(Debug, Default)]
pub struct DefaultProviderStrategy;
impl Display for DefaultProviderStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-provider-strategy")
	}
}
impl ProviderStrategy for DefaultProviderStrategy {
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		if let Some(kind) =
			classify_oauth_error(ctx.oauth_error.as_deref(), ctx.error_description.as_deref())
		{
			return kind;
		}
		if let Some(kind) = classify_body(ctx.body_preview.as_deref()) {
			return kind;
		}

		classify_status(ctx.http_status)
	}
}

fn truncate_preview(body: String) -> String {
	if body.chars().count() <= ProviderErrorContext::BODY_PREVIEW_LIMIT {
		return body;
	}

	let mut buf = String::new();

	for (idx, ch) in body.chars().enumerate() {
		if idx >= ProviderErrorContext::BODY_PREVIEW_LIMIT {
			buf.push('…');

			break;
		}
		buf.push(ch);
	}

	buf
}

fn classify_oauth_error(
	oauth_error: Option<&str>,
	error_description: Option<&str>,
) -> Option<ProviderErrorKind> {
	oauth_error
		.and_then(match_exact_value)
		.or_else(|| error_description.and_then(match_exact_value))
		.or_else(|| classify_body(error_description))
}

fn match_exact_value(value: &str) -> Option<ProviderErrorKind> {
	if value.eq_ignore_ascii_case("invalid_grant") || value.eq_ignore_ascii_case("access_denied") {
		Some(ProviderErrorKind::InvalidGrant)
	} else if value.eq_ignore_ascii_case("invalid_client")
		|| value.eq_ignore_ascii_case("unauthorized_client")
		|| value.eq_ignore_ascii_case("unsupported_grant_type")
	{
		Some(ProviderErrorKind::InvalidClient)
	} else if value.eq_ignore_ascii_case("invalid_scope")
		|| value.eq_ignore_ascii_case("insufficient_scope")
	{
		Some(ProviderErrorKind::InsufficientScope)
	} else if value.eq_ignore_ascii_case("temporarily_unavailable")
		|| value.eq_ignore_ascii_case("server_error")
	{
		Some(ProviderErrorKind::Transient)
	} else {
		None
	}
}

fn classify_body(body: Option<&str>) -> Option<ProviderErrorKind> {
	let body = body?;
	let lowered = body.to_ascii_lowercase();

	match lowered.as_str() {
		text if text.contains("invalid_grant") => Some(ProviderErrorKind::InvalidGrant),
		text if text.contains("invalid_client") => Some(ProviderErrorKind::InvalidClient),
		text if text.contains("insufficient_scope") || text.contains("invalid_scope") =>
			Some(ProviderErrorKind::InsufficientScope),
		text if text.contains("temporarily_unavailable") || text.contains("retry") =>
			Some(ProviderErrorKind::Transient),
		_ => None,
	}
}

fn classify_status(status: Option<u16>) -> ProviderErrorKind {
	match status {
		Some(400 | 404 | 410) => ProviderErrorKind::InvalidGrant,
		Some(401) => ProviderErrorKind::InvalidClient,
		Some(403) => ProviderErrorKind::InsufficientScope,
		Some(429) => ProviderErrorKind::Transient,
		Some(code) if code >= 500 => ProviderErrorKind::Transient,
		_ => ProviderErrorKind::Transient,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn oauth_fields_take_priority_over_status() {
		let ctx = ProviderErrorContext::from_response(
			401,
			"{\"error\":\"invalid_grant\",\"error_description\":\"code already used\"}",
		);

		assert_eq!(ctx.oauth_error.as_deref(), Some("invalid_grant"));
		assert_eq!(ctx.error_description.as_deref(), Some("code already used"));
		assert_eq!(
			DefaultProviderStrategy.classify_token_error(&ctx),
			ProviderErrorKind::InvalidGrant
		);
	}

	#[test]
	fn non_json_bodies_fall_back_to_preview_then_status() {
		let ctx = ProviderErrorContext::from_response(503, "upstream busy, retry later");

		assert!(ctx.oauth_error.is_none());
		assert_eq!(ctx.body_preview.as_deref(), Some("upstream busy, retry later"));
		assert_eq!(
			DefaultProviderStrategy.classify_token_error(&ctx),
			ProviderErrorKind::Transient
		);

		let empty = ProviderErrorContext::from_response(401, "");

		assert!(empty.body_preview.is_none());
		assert_eq!(
			DefaultProviderStrategy.classify_token_error(&empty),
			ProviderErrorKind::InvalidClient
		);
	}

	#[test]
	fn previews_are_truncated() {
		let ctx = ProviderErrorContext::new().with_body_preview("x".repeat(1_000));
		let preview = ctx.body_preview.expect("Preview should be recorded.");

		assert_eq!(preview.chars().count(), ProviderErrorContext::BODY_PREVIEW_LIMIT + 1);
		assert!(preview.ends_with('…'));
	}

	#[test]
	fn rejections_without_hints_classify_by_status() {
		for (status, kind) in [
			(400, ProviderErrorKind::InvalidGrant),
			(401, ProviderErrorKind::InvalidClient),
			(403, ProviderErrorKind::InsufficientScope),
			(429, ProviderErrorKind::Transient),
			(502, ProviderErrorKind::Transient),
		] {
			let ctx = ProviderErrorContext::from_response(status, "{}");

			assert_eq!(ctx, ProviderErrorContext::new().with_http_status(status));
			assert_eq!(DefaultProviderStrategy.classify_token_error(&ctx), kind);
		}

		assert_eq!(ProviderErrorKind::InvalidClient.to_string(), "invalid_client");
	}
}
