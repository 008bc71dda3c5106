use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use crate::trace::SessionTrace;

use super::dispatch::parse_request;
use super::worker::IntrospectionService;

pub async fn bind(addr: SocketAddr) -> io::Result<TcpListener> {
    TcpListener::bind(addr).await
}

pub async fn serve(
    listener: TcpListener,
    service: IntrospectionService,
    trace: SessionTrace,
) -> io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        trace.log_kernel(&format!("connection opened: {peer}"));

        let service = service.clone();
        let trace = trace.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, &service, &trace).await {
                trace.log_kernel(&format!("connection {peer} failed: {err}"));
            }
            trace.log_kernel(&format!("connection closed: {peer}"));
        });
    }
}

pub async fn handle_connection<S>(
    stream: S,
    service: &IntrospectionService,
    trace: &SessionTrace,
) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        trace.log_request(&line);

        let response = match parse_request(&line) {
            Ok(request) => service.call(request).await,
            Err(invalid) => invalid,
        };

        let mut encoded = response.to_string();
        trace.log_response(&encoded);
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}
