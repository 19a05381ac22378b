//! User-facing notice strings.

use relay_llm::LlmError;

pub const ADMIN_ONLY: &str = "Only the admin can use this command";
pub const PRIVATE_ONLY: &str = "This command only works in a private chat";
pub const NOT_WHITELISTED: &str = "This chat is not in the whitelist";
pub const USAGE_HINT: &str =
    "Reply to one of my messages to continue, or start a new conversation with $";
pub const CHAIN_BROKEN: &str =
    "[!] Error: can't reconstruct this conversation, please start a new one";
pub const ALREADY_WHITELISTED: &str = "Already in the whitelist";
pub const NOT_IN_WHITELIST: &str = "Not in the whitelist";
pub const WHITELIST_ADDED: &str = "Whitelist added";
pub const WHITELIST_REMOVED: &str = "Whitelist removed";

/// Appended to the reply when the model hit its output length limit.
pub const TRUNCATED: &str = " [output truncated]";

pub fn completion_failed(error: &LlmError) -> String {
    format!("[!] Completion error: {error}")
}
