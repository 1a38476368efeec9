use clap::Parser;
use log::info;
use pingora::prelude::*;
use sillyproxy::config::{self, Cli, ProcessEnv};
use sillyproxy::proxy::headers::HeaderPolicy;
use sillyproxy::{WeightedDirector, WeightedProxy};
use std::sync::Arc;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let backends = config::load_backends(&ProcessEnv, cli.backend_names().as_slice());
    let director = Arc::new(WeightedDirector::new(backends));

    let header_policy = HeaderPolicy::new()
        .with_name_header(cli.name_header())?
        .with_close_connection(!cli.keep_upstream_connections);

    let mut server = Server::new(None)?;
    server.bootstrap();

    let mut proxy = http_proxy_service(
        &server.configuration,
        WeightedProxy::new(director).with_header_policy(header_policy),
    );

    let addr = cli.listen_address();
    proxy.add_tcp(&addr);
    server.add_service(proxy);

    info!("listen {}", addr);
    server.run_forever();
}
