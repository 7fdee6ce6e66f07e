//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Parley Configuration
# Only override what you want to change -- missing fields use defaults.

# Address new clients are built against. Does not have to be listed below.
current_endpoint = "http://127.0.0.1:8080"

# Fixed instruction sent before every conversation.
system_message = "You are a helpful assistant."

[endpoints]
"Local TGI" = "http://127.0.0.1:8080"

[parameters]
temperature = 0.7          # 0.0-2.0
top_p = 0.95               # 0.0-1.0
max_tokens = 1024          # 64-4096

[autosave]
# save_interval_secs = 30  # 1-3600, minimum gap between saves while streaming
# retry_cooldown_secs = 5  # 1-600, wait before retrying a failed save

[retry]
# max_attempts = 3         # 1-10
# backoff_secs = 1         # 0-60, fixed pause between attempts
# idle_timeout_secs = 60   # 5-600, give up on an attempt after this much silence
"##
    .to_string()
}
