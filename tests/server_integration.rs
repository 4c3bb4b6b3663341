// ABOUTME: End-to-end coverage of the accept loop, worker state machine, and wire codec
// ABOUTME: talking to a real TCP socket, with a scriptable detector standing in for the real one

use bytes::Bytes;
use facedetect::server::{listener, Admission, ServerConfig, ServerContext, Statistics};
use facedetect::vision::{FixedFaceDetector, ImageCodec, JpegCodec, Rect};
use facedetect::wire::{self, Request, ResponseOp, MAGIC};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

async fn spawn_server(connection_limit: u32, detector: FixedFaceDetector) -> (std::net::SocketAddr, Arc<Statistics>) {
    let config = ServerConfig { connection_limit, max_image_bytes: 0, port: None };
    let listener = listener::bind(None).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let stats = Arc::new(Statistics::new());
    let context = Arc::new(ServerContext {
        config,
        codec: Arc::new(JpegCodec),
        detector: Arc::new(Mutex::new(Box::new(detector))),
        stats: stats.clone(),
        bad_prefix_file: b"canned response\n".to_vec(),
    });
    let admission = Arc::new(Admission::new(connection_limit));
    tokio::spawn(listener::run_acceptor(listener, context, admission));
    (addr, stats)
}

fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
    let codec = JpegCodec;
    codec.encode(&image::DynamicImage::new_rgb8(width, height)).unwrap()
}

async fn read_response(stream: &mut TcpStream) -> (u8, Vec<u8>) {
    let mut header = [0u8; 9];
    stream.read_exact(&mut header).await.unwrap();
    assert_eq!(&header[0..4], &MAGIC);
    let op = header[4];
    let len = u32::from_le_bytes([header[5], header[6], header[7], header[8]]) as usize;
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await.unwrap();
    (op, payload)
}

#[tokio::test]
async fn happy_detect_produces_image_response_and_bumps_counter() {
    let detector = FixedFaceDetector::with_faces(vec![Rect { x: 4, y: 4, width: 16, height: 16 }]);
    let (addr, stats) = spawn_server(0, detector).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    let request = Request::detect(Bytes::from(sample_jpeg(32, 32)));
    wire::write_request(&mut client, &request).await.unwrap();

    let (op, payload) = read_response(&mut client).await;
    assert_eq!(op, ResponseOp::Image as u8);
    assert!(!payload.is_empty());

    // give the worker a moment to record the counter after writing the response
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(stats.snapshot().detect_requests, 1);
}

#[tokio::test]
async fn zero_byte_image_is_rejected_with_exact_payload() {
    let (addr, _stats) = spawn_server(0, FixedFaceDetector::none()).await;
    let mut client = TcpStream::connect(addr).await.unwrap();

    let mut buf = Vec::new();
    buf.extend_from_slice(&MAGIC);
    buf.push(0);
    buf.extend_from_slice(&0u32.to_le_bytes());
    client.write_all(&buf).await.unwrap();

    let (op, payload) = read_response(&mut client).await;
    assert_eq!(op, ResponseOp::Error as u8);
    assert_eq!(payload, b"image is 0 bytes");
}

#[tokio::test]
async fn bad_prefix_streams_canned_file_and_closes() {
    let (addr, stats) = spawn_server(0, FixedFaceDetector::none()).await;
    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(&[0, 0, 0, 0]).await.unwrap();

    let mut received = Vec::new();
    client.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, b"canned response\n");
    assert_eq!(stats.snapshot().malformed_requests, 1);
}

#[tokio::test]
async fn no_faces_detected_reports_exact_payload() {
    let (addr, _stats) = spawn_server(0, FixedFaceDetector::none()).await;
    let mut client = TcpStream::connect(addr).await.unwrap();
    let request = Request::detect(Bytes::from(sample_jpeg(10, 10)));
    wire::write_request(&mut client, &request).await.unwrap();

    let (op, payload) = read_response(&mut client).await;
    assert_eq!(op, ResponseOp::Error as u8);
    assert_eq!(payload, b"no faces detected in image");
}

#[tokio::test]
async fn three_requests_on_one_connection_then_bad_prefix_closes_it() {
    let detector = FixedFaceDetector::with_faces(vec![Rect { x: 0, y: 0, width: 8, height: 8 }]);
    let (addr, _stats) = spawn_server(0, detector).await;
    let mut client = TcpStream::connect(addr).await.unwrap();

    for _ in 0..3 {
        let request = Request::detect(Bytes::from(sample_jpeg(16, 16)));
        wire::write_request(&mut client, &request).await.unwrap();
        let (op, _payload) = read_response(&mut client).await;
        assert_eq!(op, ResponseOp::Image as u8);
    }

    client.write_all(&[9, 9, 9, 9]).await.unwrap();
    let mut received = Vec::new();
    client.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, b"canned response\n");
}

#[tokio::test]
async fn admission_backpressure_blocks_a_third_connection() {
    // A TCP `connect` can succeed into the kernel's backlog queue even
    // while the acceptor is blocked on the admission semaphore (it hasn't
    // called `accept` yet), so the observable backpressure is that the
    // third connection never gets a response until a slot frees up.
    let (addr, stats) = spawn_server(2, FixedFaceDetector::none()).await;

    let first = TcpStream::connect(addr).await.unwrap();
    let second = TcpStream::connect(addr).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(stats.snapshot().current_clients, 2);

    let third = tokio::spawn(async move {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = Request::detect(Bytes::from(sample_jpeg(8, 8)));
        wire::write_request(&mut stream, &request).await.unwrap();
        read_response(&mut stream).await
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(!third.is_finished());
    assert_eq!(stats.snapshot().current_clients, 2);

    drop(first);
    let (op, _payload) = third.await.unwrap();
    assert_eq!(op, ResponseOp::Error as u8);
    drop(second);
}
