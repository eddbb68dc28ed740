pub mod network {
    pub const TIMEOUT_API_REQUEST_MS: u64 = 30_000;
    pub const TIMEOUT_CONNECTION_MS: u64 = 5_000;
    pub const MAX_REDIRECTS: usize = 10;
    pub const USER_AGENT: &str = concat!("api-tester/", env!("CARGO_PKG_VERSION"));
}

pub mod registry {
    pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
}

pub mod storage {
    pub const SAVED_REQUESTS_KEY: &str = "api_tester_saved_requests";
    pub const FILE_MODE: u32 = 0o600;
}

pub mod headers {
    pub const ACCEPT: &str = "Accept";
    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const AUTHORIZATION: &str = "Authorization";
    pub const DEFAULT_ACCEPT: &str = "application/json";
}

pub mod protocols {
    pub const ALLOWED_HTTP: &[&str] = &["http:", "https:"];
}
