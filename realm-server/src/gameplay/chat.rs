//! Chat support: GM command stubbing (`spec.md` §9 Open Question —
//! slash-prefixed admin commands are out of scope, rejected cleanly
//! rather than treated as ordinary speech).

use realm_shared::error::{HandlerError, PreconditionFailed};

/// Rejects `/`-prefixed text as an unsupported GM command. Ordinary
/// chat (including a lone `/` with nothing after it) passes through.
pub fn reject_if_gm_command(text: &str) -> Result<(), HandlerError> {
    if text.starts_with('/') && text.len() > 1 {
        return Err(PreconditionFailed::NotAvailable.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_slash_prefixed_commands() {
        assert!(reject_if_gm_command("/kick someone").is_err());
    }

    #[test]
    fn allows_plain_chat() {
        assert!(reject_if_gm_command("hello there").is_ok());
        assert!(reject_if_gm_command("/").is_ok());
    }
}
