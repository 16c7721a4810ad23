//! Input hygiene for guest-supplied values: HTML escaping for text that is
//! rendered into the invitation page and a scheme check for audio links.

use url::Url;

/// Escapes text the way a browser serializes a text node: `&`, `<`, `>` and
/// the no-break space are replaced; quotes are left alone.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            other => out.push(other),
        }
    }
    out
}

/// Accepts only absolute `http` or `https` URLs.
pub fn is_valid_audio_url(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(err) => {
            tracing::debug!(error = %err, "audio url rejected");
            false
        }
    }
}
