//! Remote graph store output.
//!
//! Uploads go to the store's SPARQL Graph Store Protocol endpoint
//! (`<scheme>://host:port/<dataset>/data`, as served by Apache Jena Fuseki).
//! A single `PUT` replaces the target graph, so a failed upload leaves the
//! previous content in place.

use std::time::Duration;

use async_trait::async_trait;
use rdfweaver_core::{Graph, RdfFormat};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};
use url::Url;

use crate::error::OutputError;
use crate::RdfOutput;

/// Where a [`RemoteSink`] uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub host: String,
    pub port: u16,
    pub dataset: String,
    /// Named graph to replace. `None` targets the default graph.
    pub graph: Option<String>,
    pub tls: bool,
    pub timeout: Duration,
}

impl RemoteTarget {
    pub fn new(host: impl Into<String>, port: u16, dataset: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            dataset: dataset.into(),
            graph: None,
            tls: false,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_graph(mut self, graph: impl Into<String>) -> Self {
        self.graph = Some(graph.into());
        self
    }

    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Graph store endpoint including the `graph`/`default` selector.
    pub fn endpoint(&self) -> Result<Url, OutputError> {
        let dataset = self.dataset.trim_matches('/');
        if dataset.is_empty() {
            return Err(OutputError::InvalidTarget("dataset name must be set".into()));
        }
        if self.port == 0 {
            return Err(OutputError::InvalidTarget("port must be set".into()));
        }

        let scheme = if self.tls { "https" } else { "http" };
        let mut url = Url::parse(&format!("{}://localhost", scheme))
            .map_err(|e| OutputError::InvalidTarget(e.to_string()))?;
        url.set_host(Some(&self.host))
            .map_err(|e| OutputError::InvalidTarget(format!("invalid host '{}': {}", self.host, e)))?;
        url.set_port(Some(self.port))
            .map_err(|_| OutputError::InvalidTarget(format!("invalid port {}", self.port)))?;
        url.path_segments_mut()
            .map_err(|_| OutputError::InvalidTarget("endpoint cannot have a path".into()))?
            .clear()
            .push(dataset)
            .push("data");

        match self.graph.as_deref().filter(|g| !g.trim().is_empty()) {
            Some(graph) => {
                url.query_pairs_mut().append_pair("graph", graph);
            }
            None => url.set_query(Some("default")),
        }
        Ok(url)
    }
}

/// Replaces a graph on a remote store with the saved graph.
#[derive(Debug, Clone)]
pub struct RemoteSink {
    endpoint: Url,
    client: reqwest::Client,
}

impl RemoteSink {
    pub fn new(target: RemoteTarget) -> Result<Self, OutputError> {
        let client = reqwest::Client::builder().timeout(target.timeout).build()?;
        Self::with_client(target, client)
    }

    /// Use a preconfigured HTTP client (proxies, certificates).
    pub fn with_client(target: RemoteTarget, client: reqwest::Client) -> Result<Self, OutputError> {
        Ok(Self {
            endpoint: target.endpoint()?,
            client,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl RdfOutput for RemoteSink {
    async fn save(&self, graph: &Graph) -> Result<(), OutputError> {
        let format = RdfFormat::NTriples;
        let body = format.to_bytes(graph)?;
        debug!("PUT {} ({} bytes)", self.endpoint, body.len());

        let response = self
            .client
            .put(self.endpoint.clone())
            .header(CONTENT_TYPE, format.media_type())
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OutputError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        info!("Uploaded {} triples to {}", graph.len(), self.endpoint);
        Ok(())
    }

    fn destination(&self) -> String {
        self.endpoint.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdfweaver_core::{named_node, Literal, Triple};
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accept one request, answer with `response`, and return the raw request.
    async fn one_shot_server(response: &'static str) -> (SocketAddr, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
                if request_complete(&request) {
                    break;
                }
            }
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (addr, handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..header_end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        request.len() >= header_end + 4 + length
    }

    fn sink_for(addr: SocketAddr, target: RemoteTarget) -> RemoteSink {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let target = RemoteTarget {
            host: addr.ip().to_string(),
            port: addr.port(),
            ..target
        };
        RemoteSink::with_client(target, client).unwrap()
    }

    fn graph() -> Graph {
        let mut graph = Graph::new();
        graph.insert(&Triple::new(
            named_node("http://example.com/Customer/1").unwrap(),
            named_node("http://example.com/Customer#name").unwrap(),
            Literal::new_simple_literal("Ann"),
        ));
        graph
    }

    #[test]
    fn test_endpoint_default_graph() {
        let url = RemoteTarget::new("localhost", 3030, "ds").endpoint().unwrap();
        assert_eq!(url.as_str(), "http://localhost:3030/ds/data?default");
    }

    #[test]
    fn test_endpoint_named_graph() {
        let url = RemoteTarget::new("store.example.com", 8443, "sales")
            .with_graph("http://example.com/graphs/customers")
            .with_tls(true)
            .endpoint()
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://store.example.com:8443/sales/data?graph=http%3A%2F%2Fexample.com%2Fgraphs%2Fcustomers"
        );
    }

    #[test]
    fn test_endpoint_requires_dataset() {
        assert!(matches!(
            RemoteTarget::new("localhost", 3030, "/").endpoint(),
            Err(OutputError::InvalidTarget(_))
        ));
    }

    #[tokio::test]
    async fn test_save_puts_ntriples() {
        let (addr, server) =
            one_shot_server("HTTP/1.1 204 No Content\r\nconnection: close\r\n\r\n").await;
        let sink = sink_for(addr, RemoteTarget::new("localhost", 1, "ds"));

        sink.save(&graph()).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("PUT /ds/data?default HTTP/1.1\r\n"));
        assert!(request
            .to_ascii_lowercase()
            .contains("content-type: application/n-triples"));
        assert!(request.ends_with(
            "<http://example.com/Customer/1> <http://example.com/Customer#name> \"Ann\" .\n"
        ));
    }

    #[tokio::test]
    async fn test_save_to_named_graph() {
        let (addr, server) =
            one_shot_server("HTTP/1.1 201 Created\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await;
        let sink = sink_for(
            addr,
            RemoteTarget::new("localhost", 1, "ds").with_graph("urn:customers"),
        );

        sink.save(&graph()).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("PUT /ds/data?graph=urn%3Acustomers HTTP/1.1\r\n"));
    }

    #[tokio::test]
    async fn test_error_status_surfaces() {
        let (addr, server) = one_shot_server(
            "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 4\r\nconnection: close\r\n\r\nboom",
        )
        .await;
        let sink = sink_for(addr, RemoteTarget::new("localhost", 1, "ds"));

        let err = sink.save(&graph()).await.unwrap_err();
        match err {
            OutputError::Remote { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected remote error, got {other:?}"),
        }
        server.await.unwrap();
    }
}
