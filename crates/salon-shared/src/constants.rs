/// Application name
pub const APP_NAME: &str = "Salon";

/// Application namespace used when no `SALON_NAMESPACE` is injected
pub const DEFAULT_NAMESPACE: &str = "salon-default";

/// Display-label prefix for anonymous identities
pub const GUEST_LABEL_PREFIX: &str = "guest-";

/// Number of identity-id characters kept in a derived anonymous label
pub const SHORT_ID_LEN: usize = 8;
