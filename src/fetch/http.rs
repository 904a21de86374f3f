use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Request, Response, Url};
use tracing::debug;

use super::{RecordFilter, RecordSource};
use crate::analyzers::types::GradeRecord;
use crate::parser::{RecordFormat, parse_records};

/// Executes prepared requests. Wrappers such as [`super::auth::ApiKey`] layer on top.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

/// GETs `url` and returns the body, treating non-success statuses as errors.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}

/// Queries a grades endpoint that answers with a JSON array of records.
///
/// The filter is sent as `learner_id` / `class_id` query parameters and
/// re-applied to the response, so an endpoint that ignores them still
/// yields the right records.
pub struct HttpRecordSource<C> {
    client: C,
    url: Url,
}

impl<C: HttpClient> HttpRecordSource<C> {
    pub fn new(client: C, url: Url) -> Self {
        Self { client, url }
    }

    fn request_url(&self, filter: &RecordFilter) -> Url {
        let mut url = self.url.clone();
        if filter.learner_id.is_some() || filter.class_id.is_some() {
            let mut query = url.query_pairs_mut();
            if let Some(id) = filter.learner_id {
                query.append_pair("learner_id", &id.to_string());
            }
            if let Some(id) = filter.class_id {
                query.append_pair("class_id", &id.to_string());
            }
        }
        url
    }
}

#[async_trait]
impl<C: HttpClient> RecordSource for HttpRecordSource<C> {
    #[tracing::instrument(skip(self), fields(url = %self.url))]
    async fn fetch_records(&self, filter: &RecordFilter) -> Result<Vec<GradeRecord>> {
        let url = self.request_url(filter);
        let bytes = fetch_bytes(&self.client, url.as_str())
            .await
            .with_context(|| format!("grades request to {url} failed"))?;
        debug!(bytes = bytes.len(), "Grades response received");

        let records = parse_records(&bytes, RecordFormat::Json)?;
        Ok(filter.apply(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves one canned HTTP response and hands back the raw request it received.
    async fn serve_once(status: &'static str, body: &'static str) -> (Url, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });

        (format!("http://{addr}/grades").parse().unwrap(), handle)
    }

    #[test]
    fn test_request_url_carries_filter() {
        let url: Url = "https://grades.example.com/api/grades".parse().unwrap();
        let source = HttpRecordSource::new(BasicClient::new().unwrap(), url.clone());
        let filter = RecordFilter {
            learner_id: Some(4),
            class_id: Some(12),
        };
        assert_eq!(
            source.request_url(&filter).as_str(),
            "https://grades.example.com/api/grades?learner_id=4&class_id=12"
        );
        assert_eq!(source.request_url(&RecordFilter::all()), url);
    }

    #[tokio::test]
    async fn test_sends_filter_and_refilters_response() {
        let body = r#"[{"learner_id":4,"class_id":1,"scores":[]},{"learner_id":5,"class_id":1,"scores":[]}]"#;
        let (url, server) = serve_once("200 OK", body).await;
        let source = HttpRecordSource::new(BasicClient::new().unwrap(), url);

        let records = source.fetch_records(&RecordFilter::learner(4)).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].learner_id, 4);

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /grades?learner_id=4 HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_error_status_fails_fetch() {
        let (url, _server) = serve_once("503 Service Unavailable", "unavailable").await;
        let source = HttpRecordSource::new(BasicClient::new().unwrap(), url);
        assert!(source.fetch_records(&RecordFilter::all()).await.is_err());
    }
}
