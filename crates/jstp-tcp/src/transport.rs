use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use jstp_transport::{Transport, TransportError, TransportEvent, TransportResult};
use parking_lot::Mutex;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

use crate::codec::RecordCodec;

/// A single TCP connection's [`Transport`] implementation: one
/// `TcpTransport` per accepted or dialed socket, paired one-to-one with a
/// `jstp_protocol::Connection`.
pub struct TcpTransport {
    remote_address: String,
    outgoing: mpsc::Sender<String>,
    events: Mutex<Option<mpsc::Receiver<TransportEvent>>>,
    send_task: JoinHandle<()>,
    receive_task: JoinHandle<()>,
}

impl fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpTransport")
            .field("remote_address", &self.remote_address)
            .finish()
    }
}

impl TcpTransport {
    /// Wraps an already-connected socket, spawning its send and receive
    /// pump tasks.
    pub fn from_stream(stream: TcpStream) -> Arc<dyn Transport> {
        let remote_address = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let framed = Framed::new(stream, RecordCodec::default());
        let (mut sink, mut stream) = framed.split();

        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<String>(128);
        let send_task = tokio::spawn(async move {
            while let Some(data) = outgoing_rx.recv().await {
                if let Err(err) = sink.send(data).await {
                    tracing::debug!(%err, "tcp send failed");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let (events_tx, events_rx) = mpsc::channel(128);
        let receive_task = tokio::spawn(async move {
            loop {
                match stream.next().await {
                    Some(Ok(value)) => {
                        if events_tx.send(TransportEvent::Packet(value)).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(err)) => {
                        let _ = events_tx.send(TransportEvent::Error(err)).await;
                        break;
                    }
                    None => {
                        let _ = events_tx.send(TransportEvent::Closed).await;
                        break;
                    }
                }
            }
        });

        Arc::new(Self {
            remote_address,
            outgoing: outgoing_tx,
            events: Mutex::new(Some(events_rx)),
            send_task,
            receive_task,
        })
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.send_task.abort();
        self.receive_task.abort();
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&self, data: String) -> TransportResult<()> {
        self.outgoing
            .send(data)
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn end(&self, data: Option<String>) -> TransportResult<()> {
        if let Some(data) = data {
            let _ = self.outgoing.send(data).await;
        }
        Ok(())
    }

    fn remote_address(&self) -> &str {
        &self.remote_address
    }

    fn take_events(&self) -> Option<mpsc::Receiver<TransportEvent>> {
        self.events.lock().take()
    }
}

/// Dials `addr` and returns a ready-to-use client transport.
pub async fn connect(addr: impl ToSocketAddrs) -> TransportResult<Arc<dyn Transport>> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|err| TransportError::ConnectionFailed(err.to_string()))?;
    Ok(TcpTransport::from_stream(stream))
}

/// A bound TCP listener that hands out [`Transport`]s instead of raw
/// sockets, so `jstp-server` never has to know it's TCP underneath.
pub struct TcpListener {
    inner: tokio::net::TcpListener,
}

impl TcpListener {
    /// Binds a new listener.
    pub async fn bind(addr: impl ToSocketAddrs) -> std::io::Result<Self> {
        Ok(Self {
            inner: tokio::net::TcpListener::bind(addr).await?,
        })
    }

    /// The socket address this listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Accepts the next inbound connection.
    pub async fn accept(&self) -> std::io::Result<(Arc<dyn Transport>, SocketAddr)> {
        let (stream, addr) = self.inner.accept().await?;
        Ok((TcpTransport::from_stream(stream), addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jstp_record::{Record, Value};

    #[tokio::test]
    async fn client_and_server_exchange_a_framed_packet() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let accept = tokio::spawn(async move { listener.accept().await.unwrap().0 });
        let client = connect(addr).await.unwrap();
        let server = accept.await.unwrap();

        let mut record = Record::new();
        record.insert("ping", Value::Array(vec![Value::Int(1)]));
        client.send(jstp_record::stringify(&Value::Object(record))).await.unwrap();

        let mut server_events = server.take_events().unwrap();
        let event = server_events.recv().await.unwrap();
        assert!(matches!(event, TransportEvent::Packet(_)));
    }
}
