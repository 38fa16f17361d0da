// Live source backed by the public game API over blocking HTTP.

use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{
    decode_catalog, decode_entry, decode_fixtures, decode_history, decode_my_team, decode_picks,
    DataSource, EntrySummary, SourceError,
};
use crate::catalog::Catalog;
use crate::config::{CredentialsConfig, SourceConfig};
use crate::fixtures::Fixture;
use crate::scorer::AppearanceRecord;
use crate::squad::SquadPicks;

pub struct HttpSource {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl HttpSource {
    pub fn new(source: &SourceConfig, credentials: &CredentialsConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(source.timeout_secs))
            .user_agent(source.user_agent.clone())
            .build()
            .map_err(|e| SourceError::Http {
                url: source.base_url.clone(),
                source: e,
            })?;
        Ok(Self {
            client,
            base_url: source.base_url.trim_end_matches('/').to_string(),
            access_token: credentials
                .access_token
                .clone()
                .filter(|t| !t.trim().is_empty()),
        })
    }

    /// Endpoints are addressed with a trailing slash.
    fn url(&self, path: &str) -> String {
        format!("{}/{}/", self.base_url, path.trim_matches('/'))
    }

    fn get_json(&self, path: &str, bearer: Option<&str>) -> Result<Value, SourceError> {
        let url = self.url(path);
        debug!(%url, "GET");
        let mut request = self.client.get(&url);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        let response = request.send().map_err(|e| SourceError::Http {
            url: url.clone(),
            source: e,
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }
        let body = response.text().map_err(|e| SourceError::Http {
            url: url.clone(),
            source: e,
        })?;
        serde_json::from_str(&body).map_err(|e| SourceError::json(url, e))
    }
}

impl DataSource for HttpSource {
    fn catalog(&self) -> Result<Catalog, SourceError> {
        decode_catalog(self.get_json("bootstrap-static", None)?)
    }

    fn fixtures(&self) -> Result<Vec<Fixture>, SourceError> {
        decode_fixtures(self.get_json("fixtures", None)?)
    }

    fn player_history(&self, player_id: u32) -> Result<Vec<AppearanceRecord>, SourceError> {
        let value = self.get_json(&format!("element-summary/{player_id}"), None)?;
        decode_history(player_id, value)
    }

    fn entry(&self, team_id: u32) -> Result<EntrySummary, SourceError> {
        decode_entry(self.get_json(&format!("entry/{team_id}"), None)?)
    }

    fn entry_picks(&self, team_id: u32, gameweek: u32) -> Result<SquadPicks, SourceError> {
        let value = self.get_json(&format!("entry/{team_id}/event/{gameweek}/picks"), None)?;
        decode_picks(value)
    }

    fn my_team(&self, team_id: u32) -> Result<SquadPicks, SourceError> {
        let Some(token) = self.access_token.as_deref() else {
            return Err(SourceError::Unsupported(
                "my-team (no access_token in credentials.toml)".into(),
            ));
        };
        decode_my_team(self.get_json(&format!("my-team/{team_id}"), Some(token))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve one canned HTTP response on a loopback port and return its base URL.
    fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        });
        format!("http://{addr}")
    }

    fn source(base_url: &str, token: Option<&str>) -> HttpSource {
        let cfg = SourceConfig {
            base_url: base_url.into(),
            ..SourceConfig::default()
        };
        let creds = CredentialsConfig {
            access_token: token.map(String::from),
        };
        HttpSource::new(&cfg, &creds).unwrap()
    }

    #[test]
    fn urls_get_single_slashes_and_trailing_slash() {
        let s = source("https://example.test/api/", None);
        assert_eq!(
            s.url("bootstrap-static"),
            "https://example.test/api/bootstrap-static/"
        );
        assert_eq!(
            s.url("/entry/7/event/3/picks/"),
            "https://example.test/api/entry/7/event/3/picks/"
        );
    }

    #[test]
    fn my_team_without_token_is_unsupported() {
        let s = source("http://127.0.0.1:9", Some("   "));
        assert!(matches!(s.my_team(1), Err(SourceError::Unsupported(_))));
    }

    #[test]
    fn fixtures_are_fetched_and_decoded() {
        let base = serve_once(
            "200 OK",
            r#"[{"id": 1, "event": 2, "team_h": 1, "team_a": 2, "team_h_difficulty": 3, "team_a_difficulty": 4}]"#,
        );
        let fixtures = source(&base, None).fixtures().unwrap();
        assert_eq!(fixtures.len(), 1);
        assert_eq!(fixtures[0].away_difficulty, 4);
    }

    #[test]
    fn unreadable_body_is_a_json_error() {
        let base = serve_once("200 OK", "not json");
        let err = source(&base, None).fixtures().unwrap_err();
        match err {
            SourceError::Json { what, .. } => assert!(what.ends_with("/fixtures/")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_success_status_is_reported_with_its_code() {
        let base = serve_once("404 Not Found", "{}");
        let err = source(&base, None).entry_picks(7, 3).unwrap_err();
        match err {
            SourceError::Status { url, status } => {
                assert_eq!(status, 404);
                assert!(url.ends_with("/entry/7/event/3/picks/"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
