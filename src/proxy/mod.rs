use async_trait::async_trait;
use log::info;
use pingora::http::RequestHeader;
use pingora::prelude::*;
use pingora::proxy::{ProxyHttp, Session};
use std::net::ToSocketAddrs;
use std::sync::Arc;

use crate::backend::BackendSpec;
use crate::director::{Selection, WeightedDirector};
use crate::pipeline::Pipeline;
use crate::proxy::ctx::Ctx;
use crate::proxy::headers::HeaderPolicy;

pub mod ctx;
pub mod fallback;
pub mod headers;

/// Reverse proxy that forwards each request to a weighted random backend.
pub struct WeightedProxy {
    pipeline: Pipeline,
    header_policy: HeaderPolicy,
}

impl WeightedProxy {
    pub fn new(director: Arc<WeightedDirector>) -> Self {
        Self {
            pipeline: Pipeline::new(director),
            header_policy: HeaderPolicy::new(),
        }
    }

    pub fn with_header_policy(mut self, header_policy: HeaderPolicy) -> Self {
        self.header_policy = header_policy;
        self
    }

    pub fn director(&self) -> &WeightedDirector {
        self.pipeline.director()
    }

    pub fn header_policy(&self) -> &HeaderPolicy {
        &self.header_policy
    }

    fn selected(&self, ctx: &Ctx) -> Option<&BackendSpec> {
        ctx.backend.and_then(|index| self.director().backend(index))
    }
}

/// Resolves the backend address and builds the peer Pingora connects to.
pub fn backend_peer(backend: &BackendSpec) -> Result<HttpPeer> {
    let address = backend.peer_address();
    let addr = address
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| {
            Error::explain(
                ErrorType::ConnectNoRoute,
                format!("cannot resolve backend {} at {}", backend.name(), address),
            )
        })?;

    Ok(HttpPeer::new(addr, backend.is_tls(), backend.sni()))
}

#[async_trait]
impl ProxyHttp for WeightedProxy {
    type CTX = Ctx;

    fn new_ctx(&self) -> Self::CTX {
        Ctx::default()
    }

    async fn request_filter(&self, session: &mut Session, ctx: &mut Self::CTX) -> Result<bool> {
        let client = session.client_addr().map(|addr| addr.to_string());

        match self
            .pipeline
            .on_request(session.req_header(), client.as_deref(), ctx)
        {
            Selection::Backend(_) => Ok(false),
            Selection::Unroutable => {
                fallback::respond_unroutable(session).await?;
                Ok(true)
            }
        }
    }

    async fn upstream_peer(
        &self,
        _session: &mut Session,
        ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        let backend = self
            .selected(ctx)
            .ok_or_else(|| Error::explain(ErrorType::InternalError, "no backend selected"))?;

        let peer = backend_peer(backend)?;
        Ok(Box::new(peer))
    }

    async fn upstream_request_filter(
        &self,
        _session: &mut Session,
        upstream_request: &mut RequestHeader,
        ctx: &mut Self::CTX,
    ) -> Result<()> {
        self.pipeline.on_upstream_request(upstream_request, ctx)?;

        if let Some(backend) = self.selected(ctx) {
            self.header_policy
                .apply_upstream_request_headers(upstream_request, backend)?;
        }

        Ok(())
    }

    async fn logging(&self, session: &mut Session, _error: Option<&Error>, ctx: &mut Self::CTX) {
        let response_code = session
            .response_written()
            .map(|resp| resp.status.as_u16())
            .unwrap_or(0);

        let backend = self.selected(ctx).map(|b| b.name()).unwrap_or("-");
        let elapsed_ms = ctx
            .start
            .map(|start| start.elapsed().as_millis())
            .unwrap_or(0);

        info!(
            "{} {} status: {} backend: {} took: {}ms",
            session.req_header().method,
            session.req_header().uri,
            response_code,
            backend,
            elapsed_ms
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::director::SequenceEntropy;

    fn proxy(specs: &[(&str, &str, &str)]) -> WeightedProxy {
        let backends = specs
            .iter()
            .map(|(name, url, weight)| BackendSpec::parse(name, url, weight).unwrap())
            .collect();
        let director =
            WeightedDirector::with_entropy(backends, Arc::new(SequenceEntropy::constant(0.9)));
        WeightedProxy::new(Arc::new(director))
    }

    #[test]
    fn test_proxy_creation() {
        let proxy = proxy(&[("blue", "http://127.0.0.1:8001", "1")]);
        assert_eq!(proxy.director().backends().len(), 1);
        assert_eq!(proxy.header_policy().name_header(), Some("Color"));
    }

    #[test]
    fn test_selected_backend_from_ctx() {
        let proxy = proxy(&[
            ("blue", "http://127.0.0.1:8001", "1"),
            ("green", "http://127.0.0.1:8002", "1"),
        ]);
        let mut ctx = proxy.new_ctx();
        assert!(proxy.selected(&ctx).is_none());

        ctx.backend = Some(1);
        assert_eq!(proxy.selected(&ctx).unwrap().name(), "green");
    }

    #[test]
    fn test_backend_peer_for_ip_backend() {
        let backend = BackendSpec::parse("blue", "http://127.0.0.1:8001/app", "").unwrap();
        let peer = backend_peer(&backend).unwrap();
        assert_eq!(peer._address.to_string(), "127.0.0.1:8001");
        assert_eq!(peer.sni, "127.0.0.1");
    }

    #[test]
    fn test_pipeline_request_flow() {
        let proxy = proxy(&[
            ("blue", "http://127.0.0.1:8001/b", "1"),
            ("green", "http://127.0.0.1:8002/g", "1"),
        ]);
        let request = RequestHeader::build("GET", b"/hello?x=1", None).unwrap();
        let mut ctx = proxy.new_ctx();

        // u = 0.9 of total 2 lands on the second backend
        let selection = proxy.pipeline.on_request(&request, Some("10.1.1.1:5555"), &mut ctx);
        assert_eq!(selection, Selection::Backend(1));
        assert_eq!(ctx.backend, Some(1));
        assert!(ctx.start.is_some());

        let mut upstream = request.clone();
        proxy.pipeline.on_upstream_request(&mut upstream, &ctx).unwrap();
        assert_eq!(upstream.uri.to_string(), "http://127.0.0.1:8002/g?x=1");
    }

    #[test]
    fn test_unroutable_pipeline_leaves_ctx_empty() {
        let proxy = proxy(&[]);
        let request = RequestHeader::build("GET", b"/", None).unwrap();
        let mut ctx = proxy.new_ctx();

        assert_eq!(
            proxy.pipeline.on_request(&request, None, &mut ctx),
            Selection::Unroutable
        );
        assert!(ctx.backend.is_none());

        let mut upstream = request.clone();
        assert!(proxy.pipeline.on_upstream_request(&mut upstream, &ctx).is_err());
    }
}
