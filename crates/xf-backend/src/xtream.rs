//! Xtream-Codes HTTP client.
//!
//! Every operation walks the candidate endpoints from
//! [`generate_endpoints`] and stops at the first one that returns a usable
//! body. Unusable bodies are handed to a [`DebugSink`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use bytes::{Bytes, BytesMut};
use encoding_rs::{Encoding, UTF_8};
use futures::{Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use xf_protocol::{Attempt, AttemptOutcome, PlaylistEvent};

use crate::debug::DebugSink;
use crate::endpoints::generate_endpoints;

pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114 Safari/537.36";
pub const DEFAULT_PLAYLIST_TYPE: &str = "m3u_plus";

/// Tag recorded as `last_client` on saved accounts.
pub const CLIENT_TAG: &str = "reqwest";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid URL {url}: {reason}")]
    Url { url: String, reason: String },
}

/// All candidates failed during a `player_api` probe.
#[derive(Debug, Error)]
#[error("no valid player_api response ({} endpoints tried)", .attempts.len())]
pub struct ProbeFailure {
    pub attempts: Vec<Attempt>,
}

/// A JSON answer from `player_api.php`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiSuccess {
    pub endpoint: String,
    pub client: String,
    pub data: Value,
}

/// Progress notifications during a probe.
#[derive(Debug, Clone, Copy)]
pub enum ProbeEvent<'a> {
    Trying(&'a str),
    Failed(&'a Attempt),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub user_agent: String,
    pub playlist_type: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            playlist_type: DEFAULT_PLAYLIST_TYPE.to_string(),
        }
    }
}

/// Xtream panel client.
pub struct XtreamClient {
    http: Client,
    options: ClientOptions,
}

impl XtreamClient {
    pub fn new(options: ClientOptions) -> Result<Self, BackendError> {
        // The timeout bounds connecting and each read, not the whole
        // download, so large playlists on slow links still complete.
        let http = Client::builder()
            .connect_timeout(options.timeout)
            .read_timeout(options.timeout)
            .user_agent(options.user_agent.clone())
            .pool_max_idle_per_host(2)
            .build()?;
        Ok(Self { http, options })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Find an endpoint answering `player_api.php` with JSON.
    pub async fn fetch_player_api(
        &self,
        server: &str,
        username: &str,
        password: &str,
        sink: &dyn DebugSink,
        mut observe: impl FnMut(ProbeEvent<'_>),
    ) -> Result<ApiSuccess, ProbeFailure> {
        let mut attempts = Vec::new();

        for base in generate_endpoints(server) {
            let attempt = match player_api_url(&base, username, password) {
                Err(e) => Attempt {
                    url: base.clone(),
                    outcome: AttemptOutcome::Transport(e.to_string()),
                    debug_file: None,
                },
                Ok(url) => {
                    let url_str = url.to_string();
                    observe(ProbeEvent::Trying(&url_str));
                    debug!(base = %base, "probing player_api");

                    match self.probe_once(url, &url_str, sink).await {
                        Ok(data) => {
                            info!(base = %base, "player_api answered");
                            return Ok(ApiSuccess {
                                endpoint: url_str,
                                client: CLIENT_TAG.to_string(),
                                data,
                            });
                        }
                        Err(attempt) => attempt,
                    }
                }
            };

            warn!(base = %base, outcome = ?attempt.outcome, "player_api candidate failed");
            observe(ProbeEvent::Failed(&attempt));
            attempts.push(attempt);
        }

        Err(ProbeFailure { attempts })
    }

    async fn probe_once(
        &self,
        url: Url,
        url_str: &str,
        sink: &dyn DebugSink,
    ) -> Result<Value, Attempt> {
        let failed = |outcome: AttemptOutcome, debug_file: Option<PathBuf>| Attempt {
            url: url_str.to_string(),
            outcome,
            debug_file,
        };

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| failed(AttemptOutcome::Transport(e.without_url().to_string()), None))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| failed(AttemptOutcome::Transport(e.without_url().to_string()), None))?;

        if status != 200 {
            let file = sink.save("player_api_non200", url_str, &body);
            return Err(failed(AttemptOutcome::Status(status), file));
        }

        serde_json::from_str::<Value>(&body).map_err(|e| {
            let file = sink.save("player_api_badjson", url_str, &body);
            failed(AttemptOutcome::BadBody(e.to_string()), file)
        })
    }

    /// Download the account's M3U playlist, reporting progress as a stream.
    ///
    /// The stream always ends with `Completed` or `Exhausted`.
    pub fn fetch_playlist(
        &self,
        server: &str,
        username: &str,
        password: &str,
        sink: Arc<dyn DebugSink>,
    ) -> impl Stream<Item = PlaylistEvent> + Send + 'static {
        let http = self.http.clone();
        let playlist_type = self.options.playlist_type.clone();
        let endpoints = generate_endpoints(server);
        let username = username.to_string();
        let password = password.to_string();

        stream! {
            for base in endpoints {
                let url = match playlist_url(&base, &username, &password, &playlist_type) {
                    Ok(url) => url,
                    Err(e) => {
                        yield PlaylistEvent::Failed(Attempt {
                            url: base.clone(),
                            outcome: AttemptOutcome::Transport(e.to_string()),
                            debug_file: None,
                        });
                        continue;
                    }
                };
                let url_str = url.to_string();
                yield PlaylistEvent::Trying { url: url_str.clone() };
                debug!(base = %base, "requesting playlist");

                let response = match http.get(url).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        let e = e.without_url();
                        warn!(base = %base, error = %e, "playlist request failed");
                        yield PlaylistEvent::Failed(Attempt {
                            url: url_str,
                            outcome: AttemptOutcome::Transport(e.to_string()),
                            debug_file: None,
                        });
                        continue;
                    }
                };

                let status = response.status().as_u16();
                if status != 200 {
                    let body = response.text().await.unwrap_or_default();
                    let debug_file = sink.save("playlist_non200", &url_str, &body);
                    warn!(base = %base, status, "playlist candidate returned non-200");
                    yield PlaylistEvent::Failed(Attempt {
                        url: url_str,
                        outcome: AttemptOutcome::Status(status),
                        debug_file,
                    });
                    continue;
                }

                let total = response.content_length();
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                yield PlaylistEvent::Started { url: url_str.clone(), total };

                let mut body = BytesMut::new();
                let mut stream_error = None;
                let mut chunks = response.bytes_stream();
                while let Some(chunk) = chunks.next().await {
                    match chunk {
                        Ok(bytes) => {
                            let bytes: Bytes = bytes;
                            if bytes.is_empty() {
                                continue;
                            }
                            body.extend_from_slice(&bytes);
                            yield PlaylistEvent::Progress {
                                downloaded: body.len() as u64,
                                total,
                            };
                        }
                        Err(e) => {
                            stream_error = Some(e.without_url().to_string());
                            break;
                        }
                    }
                }

                let text = decode_body(&body, content_type.as_deref());

                if let Some(err) = stream_error {
                    let dump = if text.is_empty() { err.as_str() } else { text.as_str() };
                    let debug_file = sink.save("playlist_error", &url_str, dump);
                    warn!(base = %base, error = %err, "playlist download interrupted");
                    yield PlaylistEvent::Failed(Attempt {
                        url: url_str,
                        outcome: AttemptOutcome::Transport(err),
                        debug_file,
                    });
                    continue;
                }

                if !is_m3u(&text) {
                    let debug_file = sink.save("playlist_nonm3u", &url_str, &text);
                    warn!(base = %base, "playlist response is not M3U");
                    yield PlaylistEvent::Failed(Attempt {
                        url: url_str,
                        outcome: AttemptOutcome::BadBody("response is not an M3U playlist".to_string()),
                        debug_file,
                    });
                    continue;
                }

                info!(base = %base, bytes = body.len(), "playlist downloaded");
                yield PlaylistEvent::Completed {
                    endpoint: url_str,
                    client: CLIENT_TAG.to_string(),
                    text,
                };
                return;
            }

            yield PlaylistEvent::Exhausted;
        }
    }
}

/// `{base}/player_api.php?username=..&password=..`
pub fn player_api_url(base: &str, username: &str, password: &str) -> Result<Url, BackendError> {
    build_url(
        base,
        "player_api.php",
        &[("username", username), ("password", password)],
    )
}

/// `{base}/get.php?username=..&password=..&type=..`
pub fn playlist_url(
    base: &str,
    username: &str,
    password: &str,
    playlist_type: &str,
) -> Result<Url, BackendError> {
    build_url(
        base,
        "get.php",
        &[
            ("username", username),
            ("password", password),
            ("type", playlist_type),
        ],
    )
}

fn build_url(base: &str, path: &str, query: &[(&str, &str)]) -> Result<Url, BackendError> {
    let raw = format!("{base}/{path}");
    let mut url = Url::parse(&raw).map_err(|e| BackendError::Url {
        url: raw.clone(),
        reason: e.to_string(),
    })?;
    url.query_pairs_mut().extend_pairs(query.iter().copied());
    Ok(url)
}

/// True when the text carries an `#EXTM3U` marker anywhere, any case.
pub fn is_m3u(text: &str) -> bool {
    text.as_bytes()
        .windows(7)
        .any(|w| w.eq_ignore_ascii_case(b"#EXTM3U"))
}

/// Decode a body using the charset from `Content-Type`. Missing or unknown
/// charsets decode as UTF-8; malformed sequences become U+FFFD.
fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(|ct| {
            ct.split(';').find_map(|part| {
                let (key, value) = part.trim().split_once('=')?;
                if key.trim().eq_ignore_ascii_case("charset") {
                    Some(value.trim().trim_matches('"').to_string())
                } else {
                    None
                }
            })
        })
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);

    let (text, _, _) = encoding.decode(body);
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_api_url_encodes_credentials() {
        let url = player_api_url("http://h:8080", "al ice", "p&ss").unwrap();
        assert_eq!(
            url.as_str(),
            "http://h:8080/player_api.php?username=al+ice&password=p%26ss"
        );
    }

    #[test]
    fn playlist_url_has_type() {
        let url = playlist_url("https://h", "u", "p", "m3u_plus").unwrap();
        assert_eq!(
            url.as_str(),
            "https://h/get.php?username=u&password=p&type=m3u_plus"
        );
    }

    #[test]
    fn invalid_base_is_an_error() {
        let err = player_api_url("http://bad host", "u", "p").unwrap_err();
        assert!(matches!(err, BackendError::Url { .. }));
    }

    #[test]
    fn m3u_marker_is_case_insensitive() {
        assert!(is_m3u("#EXTM3U\n"));
        assert!(is_m3u("\u{feff}#extm3u url-tvg=\"x\"\n"));
        assert!(!is_m3u("<html>blocked</html>"));
        assert!(!is_m3u(""));
    }

    #[test]
    fn decode_latin1_charset() {
        let body = [b'c', 0xE9];
        assert_eq!(decode_body(&body, Some("text/plain; charset=ISO-8859-1")), "cé");
    }

    #[test]
    fn decode_defaults_to_lossy_utf8() {
        assert_eq!(decode_body("é".as_bytes(), None), "é");
        assert_eq!(decode_body(&[0xFF], Some("audio/x-mpegurl")), "\u{fffd}");
        assert_eq!(decode_body(&[0xFF], Some("text/plain; charset=bogus")), "\u{fffd}");
    }

    #[test]
    fn decode_windows_1252_specials() {
        let body = [0x80, b' ', 0x93, b'x', 0x94];
        assert_eq!(
            decode_body(&body, Some("audio/x-mpegurl; charset=windows-1252")),
            "\u{20ac} \u{201c}x\u{201d}"
        );
    }

    #[test]
    fn decode_windows_1251_cyrillic() {
        // "Первый" in windows-1251
        let body = [0xCF, 0xE5, 0xF0, 0xE2, 0xFB, 0xE9];
        assert_eq!(
            decode_body(&body, Some("text/plain; charset=\"windows-1251\"")),
            "Первый"
        );
    }

    #[test]
    fn default_options() {
        let opts = ClientOptions::default();
        assert_eq!(opts.timeout, Duration::from_secs(20));
        assert_eq!(opts.playlist_type, "m3u_plus");
        assert!(opts.user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn new_client_does_not_fail() {
        assert!(XtreamClient::new(ClientOptions::default()).is_ok());
    }
}
