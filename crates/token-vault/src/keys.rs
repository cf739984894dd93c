//! Storage key constants.

/// Keys under which the session tokens are persisted.
pub struct StorageKeys;

impl StorageKeys {
    /// Access token
    pub const ACCESS_TOKEN: &'static str = "accessToken";

    /// Refresh token
    pub const REFRESH_TOKEN: &'static str = "refreshToken";

    /// Every key owned by the token store; cleared together on logout.
    pub const ALL: [&'static str; 2] = [Self::ACCESS_TOKEN, Self::REFRESH_TOKEN];
}
