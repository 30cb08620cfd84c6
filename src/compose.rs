use std::fmt::Write;

use crate::domain::email::MessageRef;
use crate::error::Result;
use crate::mail::MailSearch;

/// Build the SMS body. Previews are fetched one by one, in result order; the
/// first failed fetch aborts.
pub fn compose_summary(
    mail: &dyn MailSearch,
    user: &str,
    query: &str,
    messages: &[MessageRef],
    include_previews: bool,
) -> Result<String> {
    if messages.is_empty() {
        return Ok(String::new());
    }

    let mut sb = format!(
        "Hi! You have {} emails matching your search of \"{}\".",
        messages.len(),
        query
    );

    if include_previews {
        sb.push_str(" Here's what they look like.\n");
        for (i, m) in messages.iter().enumerate() {
            log::info!("({}) Fetching message {}", i + 1, m.id);
            let detail = mail.fetch_detail(user, &m.id)?;
            let _ = writeln!(sb, "({}) - {}", i + 1, detail.snippet);
        }
    }

    Ok(sb)
}
