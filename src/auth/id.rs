//! Identifiers the identity directory assigns to provisioned resources.
//!
//! A user pool id carries the region it lives in (`eu-central-1_AbC123`); an app client id is an
//! opaque token of word characters. Both are only ever minted by the directory, so parsing them
//! strictly catches a mis-mapped response field early.

// self
use crate::_prelude::*;

const USER_POOL_ID_MAX_LEN: usize = 55;
const APP_CLIENT_ID_MAX_LEN: usize = 128;

/// Error returned when a directory-assigned identifier is malformed.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier.
		kind: &'static str,
	},
	/// The identifier exceeded the directory's length limit.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier.
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
	/// The identifier contains a character the directory never emits.
	#[error("{kind} identifier contains {character:?}.")]
	InvalidCharacter {
		/// Kind of identifier.
		kind: &'static str,
		/// First offending character.
		character: char,
	},
	/// The user pool identifier is not shaped `<region>_<suffix>`.
	#[error("User pool identifier `{value}` is not shaped `<region>_<suffix>`.")]
	MalformedUserPool {
		/// Rejected value.
		value: String,
	},
}

/// Identifier of a user pool, shaped `<region>_<suffix>`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserPoolId {
	value: String,
	region_len: usize,
}
impl UserPoolId {
	const KIND: &'static str = "User pool";

	/// Parses a directory-assigned user pool identifier.
	pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
		let value = value.into();

		check_length(Self::KIND, &value, USER_POOL_ID_MAX_LEN)?;

		let Some((region, suffix)) = value.split_once('_') else {
			return Err(IdentifierError::MalformedUserPool { value });
		};

		if !is_region(region) || suffix.is_empty() {
			return Err(IdentifierError::MalformedUserPool { value });
		}
		if let Some(character) = suffix.chars().find(|c| !c.is_ascii_alphanumeric()) {
			return Err(IdentifierError::InvalidCharacter { kind: Self::KIND, character });
		}

		let region_len = region.len();

		Ok(Self { value, region_len })
	}

	/// Region the pool was created in.
	pub fn region(&self) -> &str {
		&self.value[..self.region_len]
	}

	/// Region-local part of the identifier.
	pub fn suffix(&self) -> &str {
		&self.value[self.region_len + 1..]
	}

	/// Full identifier as sent to the directory.
	pub fn as_str(&self) -> &str {
		&self.value
	}
}
impl AsRef<str> for UserPoolId {
	fn as_ref(&self) -> &str {
		self.as_str()
	}
}
impl From<UserPoolId> for String {
	fn from(id: UserPoolId) -> Self {
		id.value
	}
}
impl TryFrom<String> for UserPoolId {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl FromStr for UserPoolId {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl Debug for UserPoolId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "UserPoolId({})", self.value)
	}
}
impl Display for UserPoolId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.value)
	}
}

/// Identifier of an app client within a user pool.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AppClientId(String);
impl AppClientId {
	const KIND: &'static str = "App client";

	/// Parses a directory-assigned app client identifier.
	pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
		let value = value.into();

		check_length(Self::KIND, &value, APP_CLIENT_ID_MAX_LEN)?;

		if let Some(character) =
			value.chars().find(|&c| !(c.is_ascii_alphanumeric() || c == '_' || c == '+'))
		{
			return Err(IdentifierError::InvalidCharacter { kind: Self::KIND, character });
		}

		Ok(Self(value))
	}

	/// Identifier as sent to the directory and used as the OAuth `client_id`.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for AppClientId {
	fn as_ref(&self) -> &str {
		self.as_str()
	}
}
impl From<AppClientId> for String {
	fn from(id: AppClientId) -> Self {
		id.0
	}
}
impl TryFrom<String> for AppClientId {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl FromStr for AppClientId {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl Debug for AppClientId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "AppClientId({})", self.0)
	}
}
impl Display for AppClientId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

fn check_length(kind: &'static str, value: &str, max: usize) -> Result<(), IdentifierError> {
	if value.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if value.chars().count() > max {
		return Err(IdentifierError::TooLong { kind, max });
	}

	Ok(())
}

// `us-east-1`, `eu-central-1`, `ap-southeast-2`.
fn is_region(region: &str) -> bool {
	let mut parts = region.split('-');
	let Some(area) = parts.next() else { return false };
	let rest = parts.collect::<Vec<_>>();
	let Some((number, names)) = rest.split_last() else { return false };

	!area.is_empty()
		&& area.chars().all(|c| c.is_ascii_lowercase())
		&& !names.is_empty()
		&& names.iter().all(|name| !name.is_empty() && name.chars().all(|c| c.is_ascii_lowercase()))
		&& !number.is_empty()
		&& number.chars().all(|c| c.is_ascii_digit())
}
