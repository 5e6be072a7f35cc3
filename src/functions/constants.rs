use std::time::Duration;

pub const DEFAULT_REGION: &str = "us-central1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(70_000);

pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const INSTANCE_ID_HEADER: &str = "Firebase-Instance-ID-Token";
pub const APP_CHECK_HEADER: &str = "X-Firebase-AppCheck";
