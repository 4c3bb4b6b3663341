// ABOUTME: The per-connection state machine: read a request, dispatch to detect/replace,
// ABOUTME: write a response, and loop until the peer closes or a protocol error ends the session

use super::admission::Slot;
use super::context::ServerContext;
use crate::vision::{detect_and_annotate, replace_faces, FaceDetector, PipelineError};
use crate::wire::{self, ProtocolError, ReadOutcome, Request, RequestOp, Response};
use tokio::net::TcpStream;

/// Drives one accepted connection to completion. Never panics out past
/// this function — a worker crash must not take down the acceptor, so any
/// unexpected failure here is converted into closing this connection.
#[tracing::instrument(skip_all, fields(peer = %peer_addr))]
pub async fn run_connection(
    mut stream: TcpStream,
    peer_addr: std::net::SocketAddr,
    ctx: std::sync::Arc<ServerContext>,
    _slot: Slot,
) {
    tracing::info!("accepted connection");

    loop {
        match wire::read_request(&mut stream, ctx.config.max_image_bytes).await {
            Ok(ReadOutcome::Closed) => {
                tracing::debug!("peer closed cleanly");
                break;
            }
            Ok(ReadOutcome::BadPrefix) => {
                tracing::warn!("bad prefix, sending canned response");
                ctx.stats.malformed_request();
                let _ = wire::write_raw(&mut stream, &ctx.bad_prefix_file).await;
                break;
            }
            Ok(ReadOutcome::Request(request)) => {
                if !dispatch(&mut stream, &ctx, request).await {
                    break;
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "protocol error reading request");
                send_error_if_any(&mut stream, &err).await;
                break;
            }
        }
    }

    ctx.stats.client_completed();
    tracing::info!("connection finished");
}

/// Handles one request to completion. Returns `true` if the loop should
/// keep reading more requests on this connection.
async fn dispatch(stream: &mut TcpStream, ctx: &ServerContext, request: Request) -> bool {
    let op = request.op;
    match process(ctx, request).await {
        Ok(response) => {
            if wire::write_response(stream, &response).await.is_err() {
                return false;
            }
            match op {
                RequestOp::Detect => ctx.stats.detect_request(),
                RequestOp::Replace => ctx.stats.replace_request(),
            }
            true
        }
        Err(err) => {
            tracing::warn!(error = %err, "request failed");
            send_error_if_any(stream, &err).await;
            false
        }
    }
}

async fn send_error_if_any(stream: &mut TcpStream, err: &ProtocolError) {
    if let Some(payload) = err.payload() {
        let _ = wire::write_response(stream, &Response::Error(payload.to_string())).await;
    }
}

async fn process(ctx: &ServerContext, request: Request) -> Result<Response, ProtocolError> {
    match request.op {
        RequestOp::Detect => {
            let codec = ctx.codec.clone();
            let detector = ctx.detector.clone();
            let primary = request.primary;
            let mut guard = detector.lock_owned().await;
            let output = tokio::task::spawn_blocking(move || {
                let detector: &mut dyn FaceDetector = &mut **guard;
                detect_and_annotate(codec.as_ref(), detector, &primary)
            })
            .await
            .map_err(|_| ProtocolError::Io(std::io::Error::other("detect worker panicked")))?;
            Ok(Response::Image(output.map_err(pipeline_error)?.into()))
        }
        RequestOp::Replace => {
            let codec = ctx.codec.clone();
            let detector = ctx.detector.clone();
            let primary = request.primary;
            let secondary = request
                .secondary
                .expect("replace requests always carry a secondary image");
            let mut guard = detector.lock_owned().await;
            let output = tokio::task::spawn_blocking(move || {
                let detector: &mut dyn FaceDetector = &mut **guard;
                let decoded = codec.decode(&primary)?;
                let gray = imageproc::contrast::equalize_histogram(&decoded.to_luma8());
                let faces = detector.detect_faces(&gray);
                if faces.is_empty() {
                    return Err(PipelineError::NoFaces);
                }
                replace_faces(codec.as_ref(), &faces, &primary, &secondary)
            })
            .await
            .map_err(|_| ProtocolError::Io(std::io::Error::other("replace worker panicked")))?;
            Ok(Response::Image(output.map_err(pipeline_error)?.into()))
        }
    }
}

fn pipeline_error(err: PipelineError) -> ProtocolError {
    match err {
        PipelineError::NoFaces => ProtocolError::NoFacesDetected,
        PipelineError::Codec(_) => ProtocolError::InvalidImage,
    }
}
