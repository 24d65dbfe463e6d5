use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use serde::Serialize;
use url::Url;

pub const EMBED_HOST: &str = "onedrive.live.com";
pub const EMBED_BASE_URL: &str = "https://onedrive.live.com/embed";
const EMBED_PATH_MARKER: &str = "/embed";
const RESOURCE_PARAM: &str = "resid";
const AUTHKEY_PARAMS: [&str; 2] = ["authkey", "authKey"];
const EMBED_MODE: &str = "em=2";

/// Everything except the RFC 3986 unreserved characters.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

static IFRAME_SRC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<iframe[^>]+src=["']([^"']+)["']"#).expect("valid iframe src regex")
});

/// Result of canonicalizing a share link.
///
/// `confidence` is false whenever the input was passed through untouched, which
/// covers short links, unknown hosts and anything that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Normalized {
    pub embed: String,
    pub confidence: bool,
}

impl Normalized {
    fn confident(embed: impl Into<String>) -> Self {
        Self {
            embed: embed.into(),
            confidence: true,
        }
    }

    fn passthrough(embed: impl Into<String>) -> Self {
        Self {
            embed: embed.into(),
            confidence: false,
        }
    }
}

/// Returns the `src` of the first `<iframe>` when `raw` looks like markup.
pub fn extract_iframe_src(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if !trimmed.starts_with('<') {
        return None;
    }
    IFRAME_SRC_RE
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn normalize(raw: &str) -> Normalized {
    if raw.trim().is_empty() {
        return Normalized::passthrough("");
    }

    let working = extract_iframe_src(raw).unwrap_or(raw);
    let parsed = match Url::parse(working) {
        Ok(url) => url,
        Err(err) => {
            tracing::trace!(%err, "link does not parse as a url, passing through");
            return Normalized::passthrough(raw);
        }
    };

    let on_embed_host = parsed
        .host_str()
        .is_some_and(|host| host.contains(EMBED_HOST));
    if !on_embed_host {
        tracing::trace!(link = working, "unrecognized host, needs manual resolution");
        return Normalized::passthrough(working);
    }

    if let Some(resid) = first_non_empty(&parsed, &[RESOURCE_PARAM]) {
        let authkey = first_non_empty(&parsed, &AUTHKEY_PARAMS);
        let embed = canonical_embed_url(&resid, authkey.as_deref());
        tracing::trace!(link = working, %embed, "reassembled embed link");
        return Normalized::confident(embed);
    }

    if parsed.path().contains(EMBED_PATH_MARKER) {
        return Normalized::confident(working);
    }

    tracing::trace!(link = working, "no resource id on embed host");
    Normalized::passthrough(working)
}

pub fn canonical_embed_url(resid: &str, authkey: Option<&str>) -> String {
    let mut embed = format!(
        "{EMBED_BASE_URL}?{RESOURCE_PARAM}={}",
        utf8_percent_encode(resid, COMPONENT)
    );
    if let Some(key) = authkey.filter(|key| !key.is_empty()) {
        embed.push_str("&authkey=");
        embed.push_str(&utf8_percent_encode(key, COMPONENT).to_string());
    }
    embed.push('&');
    embed.push_str(EMBED_MODE);
    embed
}

fn first_non_empty(url: &Url, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_unresolved() {
        assert_eq!(normalize(""), Normalized::passthrough(""));
        assert_eq!(normalize("   \n"), Normalized::passthrough(""));
    }

    #[test]
    fn reassembles_resid_and_authkey() {
        let out = normalize("https://onedrive.live.com/embed?resid=ABC!123&authkey=XYZ");
        assert_eq!(
            out.embed,
            "https://onedrive.live.com/embed?resid=ABC%21123&authkey=XYZ&em=2"
        );
        assert!(out.confidence);
    }

    #[test]
    fn embed_path_without_resid_is_kept() {
        let raw = "https://onedrive.live.com/embed?cid=1234&em=2";
        let out = normalize(raw);
        assert_eq!(out.embed, raw);
        assert!(out.confidence);
    }

    #[test]
    fn share_page_with_mixed_case_authkey() {
        let out = normalize("https://onedrive.live.com/redir?resid=A1B2!9&authKey=k%2Bey");
        assert_eq!(
            out.embed,
            "https://onedrive.live.com/embed?resid=A1B2%219&authkey=k%2Bey&em=2"
        );
        assert!(out.confidence);
    }

    #[test]
    fn missing_authkey_omits_segment() {
        let out = normalize("https://onedrive.live.com/?resid=XYZ!42");
        assert_eq!(out.embed, "https://onedrive.live.com/embed?resid=XYZ%2142&em=2");
        assert!(!out.embed.contains("authkey"));
        assert!(out.confidence);
    }

    #[test]
    fn empty_lowercase_authkey_falls_back_to_camel_case() {
        let out = normalize("https://onedrive.live.com/?resid=R1&authkey=&authKey=K2");
        assert_eq!(out.embed, "https://onedrive.live.com/embed?resid=R1&authkey=K2&em=2");
    }

    #[test]
    fn iframe_markup_uses_src() {
        let markup = r#"<iframe src="https://onedrive.live.com/embed?cid=C1&em=2" width="98" height="120" frameborder="0"></iframe>"#;
        let out = normalize(markup);
        assert_eq!(out.embed, "https://onedrive.live.com/embed?cid=C1&em=2");
        assert!(out.confidence);
    }

    #[test]
    fn iframe_markup_with_single_quotes() {
        let markup = "<IFRAME width='1' SRC='https://onedrive.live.com/?resid=Q!1'></IFRAME>";
        assert_eq!(
            normalize(markup).embed,
            "https://onedrive.live.com/embed?resid=Q%211&em=2"
        );
    }

    #[test]
    fn markup_without_iframe_passes_through_verbatim() {
        let markup = "<div>not a player</div>";
        assert_eq!(normalize(markup), Normalized::passthrough(markup));
    }

    #[test]
    fn short_links_are_flagged() {
        let raw = "https://1drv.ms/v/s!AbCdEf";
        assert_eq!(normalize(raw), Normalized::passthrough(raw));
    }

    #[test]
    fn unknown_host_with_resid_is_flagged() {
        let raw = "https://example.com/embed?resid=1";
        assert_eq!(normalize(raw), Normalized::passthrough(raw));
    }

    #[test]
    fn unparseable_input_is_returned_verbatim() {
        let raw = "not a url at all";
        assert_eq!(normalize(raw), Normalized::passthrough(raw));
    }

    #[test]
    fn extract_ignores_plain_urls() {
        assert_eq!(extract_iframe_src("https://onedrive.live.com/embed"), None);
    }
}
