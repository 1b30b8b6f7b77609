//! Bilibili web API client.

use crate::error::{BiliError, BiliResult};
use crate::identity::{identity_in, page_from_url, parse_reference};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{COOKIE, LOCATION, REFERER};
use reqwest::{redirect, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use vidgist_core::{Classify, Metadata, Reference, VideoIdentity, VideoSource};

const API_BASE: &str = "https://api.bilibili.com";
const SHORT_LINK_BASE: &str = "https://b23.tv";
const REFERER_URL: &str = "https://www.bilibili.com/";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const API_TIMEOUT: Duration = Duration::from_secs(30);

/// Response envelope shared by every JSON endpoint.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ViewData {
    aid: Option<u64>,
    bvid: String,
    title: String,
    desc: String,
    duration: Option<u64>,
    owner: Owner,
    pages: Vec<PageInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Owner {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageInfo {
    cid: Option<u64>,
    part: String,
    duration: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlayerData {
    subtitle: SubtitleInfo,
    need_login_subtitle: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SubtitleInfo {
    subtitles: Vec<SubtitleTrack>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SubtitleTrack {
    lan_doc: String,
    subtitle_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SubtitleBody {
    body: Vec<SubtitleLine>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SubtitleLine {
    content: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlayUrlData {
    durl: Vec<Durl>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Durl {
    url: String,
}

/// Client for the Bilibili web API.
#[derive(Clone)]
pub struct BiliClient {
    client: Client,
    /// Does not follow redirects, for reading short-link targets.
    redirect_client: Client,
    api_base: String,
    short_link_base: String,
    sessdata: Option<String>,
    download_timeout: Duration,
}

impl BiliClient {
    /// Create a client. `sessdata` is the logged-in session cookie, needed for subtitles.
    pub fn new(sessdata: Option<String>, download_timeout: Duration) -> BiliResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(API_TIMEOUT)
            .build()?;

        let redirect_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(API_TIMEOUT)
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            redirect_client,
            api_base: API_BASE.to_string(),
            short_link_base: SHORT_LINK_BASE.to_string(),
            sessdata: sessdata.filter(|s| !s.trim().is_empty()),
            download_timeout,
        })
    }

    /// Point API calls at another host.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Point short-link resolution at another host.
    pub fn with_short_link_base(mut self, base: impl Into<String>) -> Self {
        self.short_link_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn has_session(&self) -> bool {
        self.sessdata.is_some()
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let request = self.client.get(url).header(REFERER, REFERER_URL);
        match &self.sessdata {
            Some(sessdata) => request.header(COOKIE, format!("SESSDATA={}", sessdata)),
            None => request,
        }
    }

    /// Call a JSON endpoint and unwrap its envelope.
    async fn api<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> BiliResult<T> {
        let url = format!("{}/{}", self.api_base, path);
        let response = self
            .get(&url)
            .query(query)
            .timeout(API_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BiliError::Status(status.as_u16()));
        }

        let envelope: ApiResponse<T> = response.json().await?;
        if envelope.code != 0 {
            return Err(BiliError::Api {
                code: envelope.code,
                message: envelope.message,
            });
        }
        envelope
            .data
            .ok_or_else(|| BiliError::Parse(format!("{} returned no data", path)))
    }

    /// Follow a `b23.tv` short link to the identity it points at.
    pub async fn resolve_short_link(&self, code: &str) -> BiliResult<Option<VideoIdentity>> {
        let url = format!("{}/{}", self.short_link_base, code);
        let response = self.redirect_client.get(&url).send().await?;

        if !response.status().is_redirection() {
            warn!("Short link {} did not redirect (status {})", code, response.status());
            return Ok(None);
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        let identity = identity_in(location, page_from_url(location));
        if identity.is_none() {
            warn!("No video id in short link target: {}", location);
        }
        Ok(identity)
    }

    /// Find and resolve the first video reference in `text`.
    pub async fn resolve(&self, text: &str) -> Option<VideoIdentity> {
        match parse_reference(text)? {
            Reference::Identity(identity) => Some(identity),
            Reference::Short(code) => match self.resolve_short_link(&code).await {
                Ok(identity) => identity,
                Err(e) => {
                    warn!("Failed to resolve short link {}: {}", code, e);
                    None
                }
            },
        }
    }

    /// Metadata for the page of `identity`, clamping the page into range.
    pub async fn metadata(&self, identity: &VideoIdentity) -> BiliResult<Metadata> {
        let query = match identity.aid() {
            Some(aid) => [("aid", aid.to_string())],
            None => [("bvid", identity.id.clone())],
        };
        debug!("Fetching metadata for {}", identity);

        let view: ViewData = self.api("x/web-interface/view", &query).await?;
        if view.pages.is_empty() {
            return Err(BiliError::Parse(format!("{} has no pages", identity.id)));
        }

        let total_pages = view.pages.len();
        let index = (identity.page as usize).clamp(1, total_pages) - 1;
        let selected = &view.pages[index];
        let total_duration = view.pages.iter().filter_map(|p| p.duration).sum();

        Ok(Metadata {
            aid: view.aid,
            cid: selected.cid,
            bvid: view.bvid,
            title: view.title,
            description: view.desc,
            author: view.owner.name,
            duration: selected.duration.or(view.duration),
            total_duration: Some(total_duration),
            page: index as u32 + 1,
            page_title: selected.part.clone(),
            total_pages: total_pages as u32,
        })
    }

    /// Subtitle text of a page, preferring a Chinese track.
    ///
    /// API-level refusals are not errors here; only retryable transport
    /// failures are returned as `Err`.
    pub async fn subtitle(&self, aid: u64, cid: u64) -> BiliResult<Option<String>> {
        let query = [("aid", aid.to_string()), ("cid", cid.to_string())];
        let player: PlayerData = match self.api("x/player/wbi/v2", &query).await {
            Ok(player) => player,
            Err(e) if e.kind().is_retryable() => return Err(e),
            Err(e) => {
                warn!("Subtitle lookup failed for aid={} cid={}: {}", aid, cid, e);
                return Ok(None);
            }
        };

        let tracks = player.subtitle.subtitles;
        if tracks.is_empty() {
            if player.need_login_subtitle {
                warn!("Subtitles require login; configure video.sessdata");
            } else {
                debug!("No subtitles for aid={} cid={}", aid, cid);
            }
            return Ok(None);
        }

        let track = tracks
            .iter()
            .find(|t| t.lan_doc.contains("中文"))
            .unwrap_or(&tracks[0]);
        if track.subtitle_url.is_empty() {
            return Ok(None);
        }

        let url = absolute_url(&track.subtitle_url);
        debug!("Downloading {} subtitle from {}", track.lan_doc, url);

        let response = self.get(&url).timeout(API_TIMEOUT).send().await?;
        if !response.status().is_success() {
            warn!("Subtitle download failed with status {}", response.status());
            return Ok(None);
        }

        let body: SubtitleBody = response.json().await?;
        let text = body
            .body
            .iter()
            .map(|line| line.content.trim())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Some(text).filter(|t| !t.is_empty()))
    }

    /// Direct media URL for a page.
    pub async fn download_url(&self, metadata: &Metadata) -> BiliResult<Option<String>> {
        let (Some(aid), Some(cid)) = (metadata.aid, metadata.cid) else {
            warn!("Missing aid or cid for {}, cannot request a play URL", metadata.bvid);
            return Ok(None);
        };

        let query = [
            ("avid", aid.to_string()),
            ("cid", cid.to_string()),
            ("qn", "64".to_string()),
            ("fnval", "0".to_string()),
            ("fourk", "1".to_string()),
        ];
        let play: PlayUrlData = self.api("x/player/playurl", &query).await?;

        Ok(play
            .durl
            .into_iter()
            .map(|d| d.url)
            .find(|u| !u.is_empty()))
    }

    /// Stream `url` into `dest`, giving up past `max_bytes`.
    ///
    /// Bytes land in a `.part` file that is renamed to `dest` once complete
    /// and removed on any failure.
    pub async fn download_to(&self, url: &str, max_bytes: u64, dest: &Path) -> BiliResult<PathBuf> {
        let part = part_path(dest);

        match self.stream_to(url, max_bytes, &part).await {
            Ok(bytes) => {
                tokio::fs::rename(&part, dest).await?;
                info!(
                    "Downloaded {:.2} MB to {:?}",
                    bytes as f64 / 1024.0 / 1024.0,
                    dest
                );
                Ok(dest.to_path_buf())
            }
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(&part).await {
                    if remove_err.kind() != std::io::ErrorKind::NotFound {
                        warn!("Could not remove partial download {:?}: {}", part, remove_err);
                    }
                }
                Err(e)
            }
        }
    }

    async fn stream_to(&self, url: &str, max_bytes: u64, part: &Path) -> BiliResult<u64> {
        let limit_mb = max_bytes / 1024 / 1024;

        let response = self
            .client
            .get(url)
            .header(REFERER, REFERER_URL)
            .timeout(self.download_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BiliError::Status(status.as_u16()));
        }
        if response.content_length().is_some_and(|len| len > max_bytes) {
            return Err(BiliError::TooLarge { limit_mb });
        }

        let mut file = tokio::fs::File::create(part).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += chunk.len() as u64;
            if written > max_bytes {
                return Err(BiliError::TooLarge { limit_mb });
            }
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}

/// Subtitle URLs come back protocol-relative or bare.
fn absolute_url(url: &str) -> String {
    if url.starts_with("//") {
        format!("https:{}", url)
    } else if url.starts_with("http") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

#[async_trait]
impl VideoSource for BiliClient {
    async fn resolve(&self, text: &str) -> Option<VideoIdentity> {
        BiliClient::resolve(self, text).await
    }

    async fn fetch_metadata(&self, identity: &VideoIdentity) -> vidgist_core::Result<Metadata> {
        Ok(self.metadata(identity).await?)
    }

    async fn fetch_subtitle(&self, aid: u64, cid: u64) -> vidgist_core::Result<Option<String>> {
        Ok(self.subtitle(aid, cid).await?)
    }

    async fn fetch_download_url(&self, metadata: &Metadata) -> vidgist_core::Result<Option<String>> {
        Ok(self.download_url(metadata).await?)
    }

    async fn download(
        &self,
        url: &str,
        max_bytes: u64,
        dest: &Path,
    ) -> vidgist_core::Result<PathBuf> {
        Ok(self.download_to(url, max_bytes, dest).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vidgist_core::ErrorKind;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, sessdata: Option<&str>) -> BiliClient {
        BiliClient::new(sessdata.map(String::from), Duration::from_secs(5))
            .unwrap()
            .with_api_base(server.uri())
            .with_short_link_base(server.uri())
    }

    fn view_body() -> serde_json::Value {
        json!({
            "code": 0,
            "message": "0",
            "data": {
                "aid": 170001,
                "bvid": "BV1xx411c7mD",
                "title": "Rust in 100 seconds",
                "desc": "A quick tour",
                "duration": 900,
                "owner": {"name": "ferris"},
                "pages": [
                    {"cid": 11, "part": "Intro", "duration": 300},
                    {"cid": 22, "part": "Ownership", "duration": 600}
                ]
            }
        })
    }

    #[tokio::test]
    async fn test_metadata_selects_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/x/web-interface/view"))
            .and(query_param("bvid", "BV1xx411c7mD"))
            .and(header("referer", REFERER_URL))
            .respond_with(ResponseTemplate::new(200).set_body_json(view_body()))
            .mount(&server)
            .await;

        let client = client(&server, None);
        let identity = VideoIdentity::new("BV1xx411c7mD", 2).unwrap();
        let metadata = client.metadata(&identity).await.unwrap();

        assert_eq!(metadata.cid, Some(22));
        assert_eq!(metadata.page, 2);
        assert_eq!(metadata.page_title, "Ownership");
        assert_eq!(metadata.duration, Some(600));
        assert_eq!(metadata.total_duration, Some(900));
        assert_eq!(metadata.total_pages, 2);
        assert_eq!(metadata.author, "ferris");

        // out-of-range pages clamp to the last one
        let identity = VideoIdentity::new("BV1xx411c7mD", 9).unwrap();
        assert_eq!(client.metadata(&identity).await.unwrap().page, 2);
    }

    #[tokio::test]
    async fn test_metadata_by_aid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/x/web-interface/view"))
            .and(query_param("aid", "170001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(view_body()))
            .mount(&server)
            .await;

        let identity = VideoIdentity::new("av170001", 1).unwrap();
        let metadata = client(&server, None).metadata(&identity).await.unwrap();
        assert_eq!(metadata.cid, Some(11));
    }

    #[tokio::test]
    async fn test_missing_video_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/x/web-interface/view"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": -404, "message": "啥都木有", "data": null
            })))
            .mount(&server)
            .await;

        let identity = VideoIdentity::new("BV1xx411c7mD", 1).unwrap();
        let err = client(&server, None)
            .fetch_metadata(&identity)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let identity = VideoIdentity::new("BV1xx411c7mD", 1).unwrap();
        let err = client(&server, None).metadata(&identity).await.unwrap_err();
        assert!(err.kind().is_retryable());
    }

    #[tokio::test]
    async fn test_malformed_body_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/x/web-interface/view"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>blocked</html>"))
            .mount(&server)
            .await;

        let identity = VideoIdentity::new("BV1xx411c7mD", 1).unwrap();
        let err = client(&server, None).metadata(&identity).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert!(!err.kind().is_retryable());
    }

    #[tokio::test]
    async fn test_subtitle_prefers_chinese_track() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/x/player/wbi/v2"))
            .and(header("cookie", "SESSDATA=secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "data": {"subtitle": {"subtitles": [
                    {"lan_doc": "English", "subtitle_url": format!("{}/sub/en.json", server.uri())},
                    {"lan_doc": "中文（自动生成）", "subtitle_url": format!("{}/sub/zh.json", server.uri())}
                ]}}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sub/zh.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "body": [{"content": "大家好"}, {"content": "  "}, {"content": "今天讲所有权"}]
            })))
            .mount(&server)
            .await;

        let text = client(&server, Some("secret")).subtitle(170001, 11).await.unwrap();
        assert_eq!(text.as_deref(), Some("大家好 今天讲所有权"));
    }

    #[tokio::test]
    async fn test_subtitle_refusal_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/x/player/wbi/v2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": -403, "message": "访问权限不足"
            })))
            .mount(&server)
            .await;

        assert_eq!(client(&server, None).subtitle(1, 2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_download_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/x/player/playurl"))
            .and(query_param("avid", "170001"))
            .and(query_param("qn", "64"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "data": {"durl": [{"url": "https://upos.example/video.mp4"}]}
            })))
            .mount(&server)
            .await;

        let metadata = Metadata {
            aid: Some(170001),
            cid: Some(11),
            ..Metadata::default()
        };
        let url = client(&server, None).download_url(&metadata).await.unwrap();
        assert_eq!(url.as_deref(), Some("https://upos.example/video.mp4"));

        let no_ids = Metadata::default();
        assert_eq!(client(&server, None).download_url(&no_ids).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/video.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 2048]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("bili_video_test.mp4");
        let url = format!("{}/video.mp4", server.uri());

        let path = client(&server, None)
            .download_to(&url, 1024 * 1024, &dest)
            .await
            .unwrap();
        assert_eq!(path, dest);
        assert_eq!(std::fs::metadata(&dest).unwrap().len(), 2048);
        assert!(!part_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_download_over_limit_leaves_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 4096]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("bili_video_big.mp4");
        let url = format!("{}/big.mp4", server.uri());

        let err = client(&server, None)
            .download(&url, 1024, &dest)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooLarge);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_resolve_short_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/abc123"))
            .respond_with(ResponseTemplate::new(302).insert_header(
                "Location",
                "https://www.bilibili.com/video/BV1xx411c7mD?p=2&share_source=copy",
            ))
            .mount(&server)
            .await;

        let identity = client(&server, None)
            .resolve("看这个 https://b23.tv/abc123")
            .await
            .unwrap();
        assert_eq!(identity.id, "BV1xx411c7mD");
        assert_eq!(identity.page, 2);
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(
            absolute_url("//i0.hdslb.com/sub.json"),
            "https://i0.hdslb.com/sub.json"
        );
        assert_eq!(absolute_url("i0.hdslb.com/sub.json"), "https://i0.hdslb.com/sub.json");
        assert_eq!(absolute_url("http://x/y"), "http://x/y");
    }
}
