//! Finding video references in free text.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;
use vidgist_core::{Reference, VideoIdentity};

static VIDEO_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://(?:www\.|m\.)?bilibili\.com/video/(BV[a-zA-Z0-9]{10}|av\d+)\S*")
        .unwrap()
});

static SHORT_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://b23\.tv/([a-zA-Z0-9]+)").unwrap());

static BV_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)BV[a-zA-Z0-9]{10}").unwrap());

static AV_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)av(\d+)").unwrap());

/// The `p` query parameter of a video URL, defaulting to 1.
pub fn page_from_url(url: &str) -> u32 {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "p")
                .and_then(|(_, v)| v.parse::<u32>().ok())
        })
        .filter(|p| *p >= 1)
        .unwrap_or(1)
}

/// Find the first video reference in `text`.
///
/// Full video links win over short links, which win over bare ids.
pub fn parse_reference(text: &str) -> Option<Reference> {
    if let Some(caps) = VIDEO_URL.captures(text) {
        let page = page_from_url(caps.get(0)?.as_str());
        return VideoIdentity::new(caps.get(1)?.as_str(), page).map(Reference::Identity);
    }

    if let Some(caps) = SHORT_URL.captures(text) {
        return Some(Reference::Short(caps.get(1)?.as_str().to_string()));
    }

    identity_in(text, 1).map(Reference::Identity)
}

/// A bare BV or av id anywhere in `text`.
pub(crate) fn identity_in(text: &str, page: u32) -> Option<VideoIdentity> {
    if let Some(m) = BV_ID.find(text) {
        // canonical ids start with an upper-case "BV"
        let id = format!("BV{}", &m.as_str()[2..]);
        return VideoIdentity::new(id, page);
    }

    let caps = AV_ID.captures(text)?;
    VideoIdentity::new(format!("av{}", caps.get(1)?.as_str()), page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidgist_core::VideoKind;

    fn identity(text: &str) -> VideoIdentity {
        match parse_reference(text) {
            Some(Reference::Identity(id)) => id,
            other => panic!("expected identity, got {:?}", other),
        }
    }

    #[test]
    fn test_full_link_with_page() {
        let id = identity("看看这个 https://www.bilibili.com/video/BV1xx411c7mD?p=3&t=10 不错");
        assert_eq!(id.id, "BV1xx411c7mD");
        assert_eq!(id.page, 3);
        assert_eq!(id.fingerprint(), "BV1xx411c7mD_p3");
    }

    #[test]
    fn test_mobile_av_link() {
        let id = identity("https://m.bilibili.com/video/av170001");
        assert_eq!(id.kind, VideoKind::Av);
        assert_eq!(id.id, "av170001");
        assert_eq!(id.page, 1);
    }

    #[test]
    fn test_short_link() {
        assert_eq!(
            parse_reference("快看 https://b23.tv/ocaOWef"),
            Some(Reference::Short("ocaOWef".to_string()))
        );
    }

    #[test]
    fn test_bare_ids() {
        assert_eq!(identity("bv1xx411c7mD is good").id, "BV1xx411c7mD");
        assert_eq!(identity("try AV12345").id, "av12345");
    }

    #[test]
    fn test_no_reference() {
        assert_eq!(parse_reference("just chatting about videos"), None);
    }

    #[test]
    fn test_page_from_url() {
        assert_eq!(page_from_url("https://www.bilibili.com/video/BV1xx411c7mD?p=2"), 2);
        assert_eq!(page_from_url("https://www.bilibili.com/video/BV1xx411c7mD?p=0"), 1);
        assert_eq!(page_from_url("https://www.bilibili.com/video/BV1xx411c7mD"), 1);
        assert_eq!(page_from_url("not a url"), 1);
    }
}
