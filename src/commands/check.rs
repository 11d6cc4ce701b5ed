//! Check command implementation.

use anyhow::Result;

use crate::validation::{classify, is_public, Token};

/// Describe how a token is classified and whether it is accepted.
pub fn describe(token: &str) -> String {
    let classified = classify(token);
    if classified.is_invalid() {
        return format!("{}: invalid", token);
    }
    let kind = match classified {
        Token::Network(_) => "network",
        _ => "address",
    };
    let verdict = if is_public(&classified) {
        "accepted"
    } else {
        "rejected (private/reserved range)"
    };
    format!("{}: {}, {}", token, kind, verdict)
}

/// Run the check command
pub fn run(token: &str) -> Result<()> {
    println!("{}", describe(token));
    Ok(())
}
