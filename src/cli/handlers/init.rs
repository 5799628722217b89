use crate::cli::commands::InitArgs;
use crate::io::config_io;

const CONFIG_TEMPLATE: &str = r##"# promptlist configuration
#
# Lists live next to this file as ai_todo_lists.json, and the expanded-list
# view state as todoListViewModes.json.

[generation]
# Environment variable holding the API key. When it is unset or empty,
# `pl gen` uses built-in templates instead of calling the endpoint.
api_key_env = "OPENAI_API_KEY"

# Any OpenAI-compatible chat completions URL
endpoint = "https://api.openai.com/v1/chat/completions"
model = "gpt-4.1-nano"
max_tokens = 1000
temperature = 0.7

# Give up on the endpoint after this many seconds and fall back
timeout_secs = 30

[storage]
# How long a write waits for another pl process to finish, in milliseconds
lock_timeout_ms = 5000
"##;

pub fn cmd_init(data_dir: Option<&str>, args: InitArgs) -> Result<(), Box<dyn std::error::Error>> {
    let dir = config_io::resolve_data_dir(data_dir)?;
    let path = config_io::write_config_text(&dir, CONFIG_TEMPLATE, args.force)?;
    println!("wrote {}", path.display());
    Ok(())
}
