//! OAuth 2.0 grant types and their wire labels.

// self
use crate::_prelude::*;

/// OAuth 2.0 grant types the agent can submit to the authorization endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// Refresh Token grant.
	RefreshToken,
	/// Resource Owner Password Credentials grant.
	Password,
	/// Client Credentials grant.
	ClientCredentials,
	/// Authorization Code grant (the code is obtained out of band).
	AuthorizationCode,
}
impl GrantType {
	/// Returns the RFC 6749 identifier for the grant type.
	pub const fn as_str(self) -> &'static str {
		match self {
			GrantType::RefreshToken => "refresh_token",
			GrantType::Password => "password",
			GrantType::ClientCredentials => "client_credentials",
			GrantType::AuthorizationCode => "authorization_code",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for GrantType {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"refresh_token" => Ok(Self::RefreshToken),
			"password" => Ok(Self::Password),
			"client_credentials" => Ok(Self::ClientCredentials),
			"authorization_code" => Ok(Self::AuthorizationCode),
			_ => Err(Error::invalid_grant_type()),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn labels_round_trip() {
		for grant in [
			GrantType::RefreshToken,
			GrantType::Password,
			GrantType::ClientCredentials,
			GrantType::AuthorizationCode,
		] {
			assert_eq!(grant.as_str().parse::<GrantType>().ok(), Some(grant));
		}

		assert!("implicit".parse::<GrantType>().is_err());
		assert_eq!(
			serde_json::to_string(&GrantType::ClientCredentials).ok().as_deref(),
			Some("\"client_credentials\"")
		);
	}
}
