pub const DEFAULT_BASE_URL: &str = "https://opensupplyhub.org";
pub const DEFAULT_USER_AGENT: &str = "oshub/0.1 (facility-registry-client)";

#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: String,
    /// Total seconds a single submission may spend honouring rate-limit waits.
    pub timeout_budget_secs: u64,
    pub connect_timeout_secs: u64,
    pub health_check_timeout_secs: u64,
    pub user_agent: String,
    /// Probe the token with a counted API call when connecting.
    pub check_token: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: String::new(),
            timeout_budget_secs: 20,
            connect_timeout_secs: 10,
            health_check_timeout_secs: 5,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            check_token: false,
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field(
                "token",
                &if self.token.is_empty() {
                    "[empty]"
                } else {
                    "[redacted]"
                },
            )
            .field("timeout_budget_secs", &self.timeout_budget_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("health_check_timeout_secs", &self.health_check_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("check_token", &self.check_token)
            .finish()
    }
}
