//! Demo backend: answers every request with the backend name the proxy tagged it
//! with, plus this host's name.

use async_trait::async_trait;
use bytes::Bytes;
use clap::Parser;
use log::info;
use pingora::http::ResponseHeader;
use pingora::prelude::*;
use pingora::proxy::{ProxyHttp, Session};
use sillyproxy::RequestView;
use sillyproxy::config::listen_address;
use sillyproxy::proxy::headers::DEFAULT_NAME_HEADER;

#[derive(Parser, Debug)]
#[command(name = "color-echo", about = "Echoes the backend name header back to the client")]
struct Cli {
    /// Listen address; a bare `:port` listens on all interfaces
    #[arg(default_value = ":8080")]
    addr: String,

    /// Header to echo
    #[arg(long, default_value = DEFAULT_NAME_HEADER)]
    name_header: String,

    /// Render an HTML fragment instead of plain text (also enabled by a non-empty V2)
    #[arg(long)]
    v2: bool,
}

struct ColorEcho {
    hostname: String,
    name_header: String,
    html: bool,
}

impl ColorEcho {
    fn render(&self, color: &str) -> String {
        if self.html {
            format!(
                "\n<h1>{} ({})</h1>\n",
                escape_html(&self.hostname),
                escape_html(color)
            )
        } else {
            format!("{} {}\n", color, self.hostname)
        }
    }

    fn content_type(&self) -> &'static str {
        if self.html {
            "text/html; charset=utf-8"
        } else {
            "text/plain; charset=utf-8"
        }
    }
}

#[async_trait]
impl ProxyHttp for ColorEcho {
    type CTX = ();

    fn new_ctx(&self) -> Self::CTX {}

    async fn request_filter(&self, session: &mut Session, _ctx: &mut Self::CTX) -> Result<bool> {
        let (color, line) = {
            let request_view = RequestView::new(session.req_header());
            let color = request_view
                .header(&self.name_header)
                .filter(|c| !c.is_empty())
                .unwrap_or("unknown")
                .to_string();
            let line = format!("{} {}", request_view.method(), request_view.request_uri());
            (color, line)
        };

        let client = session
            .client_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "-".to_string());
        info!("{} {} {}", line, client, color);

        let body = self.render(&color);
        let mut header = ResponseHeader::build(200, Some(2))?;
        header.insert_header("Content-Type", self.content_type())?;
        header.insert_header("Content-Length", body.len().to_string())?;

        session
            .write_response_header(Box::new(header), false)
            .await?;
        session
            .write_response_body(Some(Bytes::from(body)), true)
            .await?;
        Ok(true)
    }

    async fn upstream_peer(
        &self,
        _session: &mut Session,
        _ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        Error::e_explain(ErrorType::InternalError, "color-echo never proxies")
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let html = cli.v2 || std::env::var_os("V2").is_some_and(|v| !v.is_empty());
    let app = ColorEcho {
        hostname: hostname(),
        name_header: cli.name_header,
        html,
    };

    let mut server = Server::new(None)?;
    server.bootstrap();

    let mut service = http_proxy_service(&server.configuration, app);
    let addr = listen_address(&cli.addr);
    service.add_tcp(&addr);
    server.add_service(service);

    info!("listen {}", addr);
    server.run_forever();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(html: bool) -> ColorEcho {
        ColorEcho {
            hostname: "web-1".to_string(),
            name_header: DEFAULT_NAME_HEADER.to_string(),
            html,
        }
    }

    #[test]
    fn test_plain_render() {
        assert_eq!(app(false).render("blue"), "blue web-1\n");
        assert_eq!(app(false).content_type(), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_html_render_escapes() {
        assert_eq!(
            app(true).render("<green>"),
            "\n<h1>web-1 (&lt;green&gt;)</h1>\n"
        );
    }
}
