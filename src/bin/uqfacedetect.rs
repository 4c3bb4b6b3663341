// ABOUTME: The face detection/replacement server binary — CLI parsing, startup checks, and the
// ABOUTME: acceptor/reporter/worker tasks that run for the lifetime of the process

use facedetect::server::{config::USAGE, listener, run_reporter, Admission, ServerConfig, ServerContext, Statistics};
use facedetect::vision::JpegCodec;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::Mutex;

const COMMAND_LINE_ERROR: u8 = 19;
const CLASSIFIER_ERROR: u8 = 14;
const PORT_ERROR: u8 = 10;

const DEFAULT_FACE_CASCADE: &str = "/usr/local/share/opencv4/haarcascades/haarcascade_frontalface_alt.xml";
const DEFAULT_EYE_CASCADE: &str = "/usr/local/share/opencv4/haarcascades/haarcascade_eye.xml";
const DEFAULT_BAD_PREFIX_MESSAGE: &[u8] = b"the server did not recognise this client's protocol\n";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match ServerConfig::parse(&args) {
        Ok(config) => config,
        Err(()) => {
            eprintln!("{USAGE}");
            return ExitCode::from(COMMAND_LINE_ERROR);
        }
    };

    let detector = match load_detector() {
        Ok(detector) => detector,
        Err(()) => return ExitCode::from(CLASSIFIER_ERROR),
    };

    let runtime = tokio::runtime::Runtime::new().expect("failed to start tokio runtime");
    runtime.block_on(run(config, detector))
}

#[cfg(feature = "opencv-detector")]
fn load_detector() -> Result<Box<dyn facedetect::vision::FaceDetector>, ()> {
    let face_path = std::env::var("FACEDETECT_FACE_CASCADE")
        .unwrap_or_else(|_| DEFAULT_FACE_CASCADE.to_string());
    let eye_path = std::env::var("FACEDETECT_EYE_CASCADE")
        .unwrap_or_else(|_| DEFAULT_EYE_CASCADE.to_string());
    match facedetect::vision::CascadeFaceDetector::load(&face_path, &eye_path) {
        Ok(detector) => Ok(Box::new(detector)),
        Err(err) => {
            eprintln!("uqfacedetect: unable to load classifier resource: {err}");
            Err(())
        }
    }
}

#[cfg(not(feature = "opencv-detector"))]
fn load_detector() -> Result<Box<dyn facedetect::vision::FaceDetector>, ()> {
    eprintln!("uqfacedetect: built without the opencv-detector feature; no classifier available");
    Err(())
}

fn load_bad_prefix_file() -> Vec<u8> {
    match std::env::var("FACEDETECT_BAD_PREFIX_FILE") {
        Ok(path) => std::fs::read(&path).unwrap_or_else(|err| {
            tracing::warn!(%path, error = %err, "falling back to built-in bad-prefix response");
            DEFAULT_BAD_PREFIX_MESSAGE.to_vec()
        }),
        Err(_) => DEFAULT_BAD_PREFIX_MESSAGE.to_vec(),
    }
}

async fn run(
    config: ServerConfig,
    detector: Box<dyn facedetect::vision::FaceDetector>,
) -> ExitCode {
    let listener = match listener::bind(config.port.as_deref()).await {
        Ok(listener) => listener,
        Err(_) => {
            let requested = config.port.clone().unwrap_or_else(|| "0".to_string());
            eprintln!("uqfacedetect: unable to listen on given port \"{requested}\"");
            return ExitCode::from(PORT_ERROR);
        }
    };

    let bound_port = listener
        .local_addr()
        .map(|addr| addr.port())
        .unwrap_or(0);
    eprintln!("{bound_port}");
    let _ = std::io::Write::flush(&mut std::io::stderr());

    let stats = Arc::new(Statistics::new());
    let connection_limit = config.connection_limit;
    let context = Arc::new(ServerContext {
        config,
        codec: Arc::new(JpegCodec),
        detector: Arc::new(Mutex::new(detector)),
        stats: stats.clone(),
        bad_prefix_file: load_bad_prefix_file(),
    });
    let admission = Arc::new(Admission::new(connection_limit));

    tokio::spawn(async move {
        if let Err(err) = run_reporter(stats).await {
            tracing::error!(error = %err, "statistics reporter exited");
        }
    });

    listener::run_acceptor(listener, context, admission).await;
}
