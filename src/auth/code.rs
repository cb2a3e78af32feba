//! Authorization redirect handling: pull the single-use code out of the query string.

// self
use crate::_prelude::*;

/// Query parameter carrying the authorization code on the redirect back from the provider.
pub const CODE_PARAM: &str = "code";

/// Opaque, single-use code issued by the identity provider via redirect.
///
/// The value is never parsed, trimmed, or persisted. Reuse is rejected by the provider, not here.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationCode(String);
impl AuthorizationCode {
	/// Wraps a raw code value. Returns `None` for an empty string.
	pub fn new(value: impl Into<String>) -> Option<Self> {
		let value = value.into();

		if value.is_empty() { None } else { Some(Self(value)) }
	}

	/// Extracts the code from a full redirect URL.
	pub fn from_redirect_url(url: &Url) -> Option<Self> {
		get_authorization_code(url.query_pairs())
	}

	/// Returns the raw code. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for AuthorizationCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("AuthorizationCode").field(&"<redacted>").finish()
	}
}
impl Display for AuthorizationCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Looks up the `code` query parameter.
///
/// Accepts any sequence of key/value pairs (`&HashMap`, `&BTreeMap`, `Url::query_pairs`, ...).
/// The first `code` pair wins; an empty value counts as absent.
pub fn get_authorization_code<I, K, V>(query_parameters: I) -> Option<AuthorizationCode>
where
	I: IntoIterator<Item = (K, V)>,
	K: AsRef<str>,
	V: AsRef<str>,
{
	query_parameters
		.into_iter()
		.find(|(key, _)| key.as_ref() == CODE_PARAM)
		.and_then(|(_, value)| AuthorizationCode::new(value.as_ref()))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn missing_code_yields_none() {
		let empty: HashMap<String, String> = HashMap::new();

		assert!(get_authorization_code(&empty).is_none());

		let other = HashMap::from([("state".to_owned(), "abc".to_owned())]);

		assert!(get_authorization_code(&other).is_none());
	}

	#[test]
	fn present_code_is_returned_unchanged() {
		for raw in ["X", "  padded  ", "a+b/c=", "ünïcode"] {
			let params = HashMap::from([("code", raw)]);
			let code = get_authorization_code(&params).expect("Non-empty code should be detected.");

			assert_eq!(code.expose(), raw);
		}
	}

	#[test]
	fn empty_code_counts_as_absent() {
		let params = BTreeMap::from([("code", "")]);

		assert!(get_authorization_code(&params).is_none());
	}

	#[test]
	fn first_code_pair_wins() {
		let params = vec![("code", "first"), ("code", "second")];
		let code = get_authorization_code(params).expect("First code should be detected.");

		assert_eq!(code.expose(), "first");
	}

	#[test]
	fn redirect_url_is_decoded() {
		let url = Url::parse("http://localhost:8501/?code=abc%2Bdef&state=xyz")
			.expect("Redirect URL fixture should parse successfully.");
		let code =
			AuthorizationCode::from_redirect_url(&url).expect("Redirect URL should carry a code.");

		assert_eq!(code.expose(), "abc+def");

		let bare = Url::parse("http://localhost:8501/").expect("Bare URL should parse.");

		assert!(AuthorizationCode::from_redirect_url(&bare).is_none());
	}

	#[test]
	fn code_formatters_redact() {
		let code = AuthorizationCode::new("top-secret").expect("Code fixture should be valid.");

		assert_eq!(format!("{code:?}"), "AuthorizationCode(\"<redacted>\")");
		assert_eq!(format!("{code}"), "<redacted>");
	}
}
