use bytes::Bytes;
use pingora::http::ResponseHeader;
use pingora::prelude::*;
use pingora::proxy::Session;

pub const UNROUTABLE_STATUS: u16 = 502;
pub const UNROUTABLE_BODY: &str = "no backends available\n";

/// Response header for requests that cannot be routed to any backend.
pub fn unroutable_response() -> Result<ResponseHeader> {
    let mut header = ResponseHeader::build(UNROUTABLE_STATUS, Some(2))?;
    header.insert_header("Content-Type", "text/plain; charset=utf-8")?;
    header.insert_header("Content-Length", UNROUTABLE_BODY.len().to_string())?;
    Ok(header)
}

/// Answers the request locally with 502 Bad Gateway.
pub async fn respond_unroutable(session: &mut Session) -> Result<()> {
    let header = unroutable_response()?;
    session
        .write_response_header(Box::new(header), false)
        .await?;
    session
        .write_response_body(Some(Bytes::from_static(UNROUTABLE_BODY.as_bytes())), true)
        .await
}
