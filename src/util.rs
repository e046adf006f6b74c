const INSTANCE_WATCH_TOKEN: &str = "INSTANCE_WATCH_TOKEN";

/// Provider token from the environment (or `.env`).
pub fn get_token() -> Option<String> {
    let token_from_env = std::env::var(INSTANCE_WATCH_TOKEN);
    token_from_env.ok().filter(|token| !token.is_empty())
}
