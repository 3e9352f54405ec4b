//! Loopback - fragment a large payload over TCP and join it back.
//!
//! This example demonstrates:
//! - Wrapping a `TcpStream` in a `TcpConnection`
//! - Splitting a payload into MTU-sized PAYLOAD fragments
//! - Reassembling fragments with a `Joiner`
//! - Tracking resume positions with a shared `Counter`
//!
//! ```text
//! cargo run --example loopback
//! ```

use std::sync::Arc;

use rsocket_wire::config::ConnectionConfig;
use rsocket_wire::fragmentation::{Joiner, Splitter};
use rsocket_wire::protocol::{flags, BufferPool, Frame};
use rsocket_wire::transport::{Counter, TcpConnection};
use tokio::net::{TcpListener, TcpStream};

const MTU: usize = 1024;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    // Receiver: join fragments and report what arrived
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await?;
        let counter = Arc::new(Counter::new());
        let mut conn = TcpConnection::new(stream, ConnectionConfig::default()).with_counter(counter.clone());

        let mut joiner: Option<Joiner> = None;
        while let Some(frame) = conn.read().await? {
            let done = match joiner.as_mut() {
                Some(j) => j.push(frame)?,
                None => {
                    let j = Joiner::new(frame);
                    let done = j.is_complete();
                    joiner = Some(j);
                    done
                }
            };
            if done {
                break;
            }
        }

        if let Some(j) = joiner {
            println!(
                "received {} fragments on stream {}: {} data bytes, {} metadata bytes",
                j.fragment_count(),
                j.stream_id(),
                j.data()?.len(),
                j.metadata()?.map_or(0, |m| m.len()),
            );
        }
        println!("server read position: {}", counter.read_bytes());
        Ok::<_, Box<dyn std::error::Error + Send + Sync>>(())
    });

    // Sender: fragment one large payload
    let stream = TcpStream::connect(addr).await?;
    let counter = Arc::new(Counter::new());
    let mut conn = TcpConnection::new(stream, ConnectionConfig::default()).with_counter(counter.clone());

    let pool = BufferPool::global();
    let data = vec![b'd'; 64 * 1024];
    let metadata = b"content-type: application/octet-stream".repeat(100);

    let splitter = Splitter::new(MTU)?;
    let fragments = splitter.fragment_payload(pool, 1, &data, &metadata, flags::NEXT | flags::COMPLETE);
    println!("sending {} fragments (mtu {})", fragments.len(), MTU);
    for fragment in fragments {
        conn.write(&Frame::from(fragment)).await?;
    }
    conn.close().await?;
    println!("client write position: {}", counter.write_bytes());

    server.await?.map_err(|e| e as Box<dyn std::error::Error>)?;
    Ok(())
}
