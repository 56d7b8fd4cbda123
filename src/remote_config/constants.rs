pub const REMOTE_CONFIG_API_URL: &str = "https://firebaseremoteconfig.googleapis.com";
pub const DEFAULT_NAMESPACE: &str = "firebase";
pub(crate) const SDK_VERSION: &str = concat!("firely-rs/", env!("CARGO_PKG_VERSION"));
pub(crate) const DEFAULT_LANGUAGE_CODE: &str = "en-US";
