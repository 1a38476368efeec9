use crate::director::{Selection, WeightedDirector};
use crate::proxy::ctx::Ctx;
use log::info;
use pingora::http::RequestHeader;
use pingora::prelude::*;
use std::sync::Arc;
use std::time::Instant;

pub mod views;

use views::RequestView;

/// Per-request routing steps, independent of the Pingora session.
pub struct Pipeline {
    director: Arc<WeightedDirector>,
}

impl Pipeline {
    pub fn new(director: Arc<WeightedDirector>) -> Self {
        Self { director }
    }

    pub fn director(&self) -> &WeightedDirector {
        &self.director
    }

    /// Logs the inbound request and picks its backend.
    pub fn on_request(
        &self,
        request_header: &RequestHeader,
        client: Option<&str>,
        ctx: &mut Ctx,
    ) -> Selection {
        let request_view = RequestView::new(request_header);
        info!(
            "{} {} {} host: {}",
            request_view.method(),
            request_view.request_uri(),
            client.unwrap_or("-"),
            request_view.host().unwrap_or("-")
        );

        ctx.start = Some(Instant::now());
        let selection = self.director.select();
        ctx.backend = match selection {
            Selection::Backend(index) => Some(index),
            Selection::Unroutable => None,
        };
        selection
    }

    /// Rewrites the upstream request for the backend chosen in [`Pipeline::on_request`].
    pub fn on_upstream_request(&self, upstream_request: &mut RequestHeader, ctx: &Ctx) -> Result<()> {
        let backend = ctx
            .backend
            .and_then(|index| self.director.backend(index))
            .ok_or_else(|| Error::explain(ErrorType::InternalError, "no backend selected"))?;

        self.director.rewrite(backend, upstream_request)
    }
}
