// ABOUTME: The client driver — packages one or two local files into a request and writes back
// ABOUTME: whatever the server returns, following the exact exit-code contract in the wire spec

use bytes::Bytes;
use facedetect::wire::{self, Request, ResponseOp, MAGIC};
use std::io::{Read, Write};
use std::process::ExitCode;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

const COMMAND_LINE_ERROR: u8 = 16;
const INPUT_FILE_ERROR: u8 = 13;
const OUTPUT_FILE_ERROR: u8 = 5;
const PORT_ERROR: u8 = 19;
const COMMUNICATION_ERROR: u8 = 9;
const ERROR_MESSAGE: u8 = 11;

const USAGE: &str =
    "Usage: ./uqfaceclient portnum [--replacefile filename] [--outputfilename filename] [--detectfile filename]";

struct ClientArgs {
    port: String,
    replace_file: Option<String>,
    output_filename: Option<String>,
    detect_file: Option<String>,
}

fn parse_args(args: &[String]) -> Result<ClientArgs, ()> {
    let port = args.first().filter(|s| !s.is_empty()).ok_or(())?.clone();

    let mut replace_file = None;
    let mut output_filename = None;
    let mut detect_file = None;

    let mut i = 1;
    while i < args.len() {
        let flag = &args[i];
        let value = args.get(i + 1).filter(|v| !v.is_empty()).ok_or(())?;
        match flag.as_str() {
            "--replacefile" if replace_file.is_none() => replace_file = Some(value.clone()),
            "--outputfilename" if output_filename.is_none() => output_filename = Some(value.clone()),
            "--detectfile" if detect_file.is_none() => detect_file = Some(value.clone()),
            _ => return Err(()),
        }
        i += 2;
    }

    Ok(ClientArgs { port, replace_file, output_filename, detect_file })
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let parsed = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(()) => {
            eprintln!("{USAGE}");
            return ExitCode::from(COMMAND_LINE_ERROR);
        }
    };

    let primary = match read_input(parsed.detect_file.as_deref()) {
        Ok(bytes) => bytes,
        Err(path) => {
            eprintln!("uqfaceclient: unable to open the input file \"{path}\" for reading");
            return ExitCode::from(INPUT_FILE_ERROR);
        }
    };

    let secondary = if let Some(path) = &parsed.replace_file {
        match std::fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(_) => {
                eprintln!("uqfaceclient: unable to open the input file \"{path}\" for reading");
                return ExitCode::from(INPUT_FILE_ERROR);
            }
        }
    } else {
        None
    };

    if let Some(path) = &parsed.output_filename {
        let preflight = std::fs::OpenOptions::new().write(true).create(true).truncate(true).open(path);
        if preflight.is_err() {
            eprintln!("uqfaceclient: unable to open the output file \"{path}\" for writing");
            return ExitCode::from(OUTPUT_FILE_ERROR);
        }
    }

    let runtime = tokio::runtime::Runtime::new().expect("failed to start tokio runtime");
    runtime.block_on(run(parsed, primary, secondary))
}

/// Reads the primary image from `--detectfile`, or from standard input
/// until EOF when that flag is absent.
fn read_input(detect_file: Option<&str>) -> Result<Vec<u8>, String> {
    match detect_file {
        Some(path) => std::fs::read(path).map_err(|_| path.to_string()),
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|_| "<stdin>".to_string())?;
            Ok(buf)
        }
    }
}

async fn run(args: ClientArgs, primary: Vec<u8>, secondary: Option<Vec<u8>>) -> ExitCode {
    let mut stream = match TcpStream::connect(("localhost", &*args.port)).await {
        Ok(stream) => stream,
        Err(_) => {
            eprintln!("uqfaceclient: cannot connect to the server on port \"{}\"", args.port);
            return ExitCode::from(PORT_ERROR);
        }
    };

    let request = match secondary {
        Some(secondary) => Request::replace(Bytes::from(primary), Bytes::from(secondary)),
        None => Request::detect(Bytes::from(primary)),
    };

    if wire::write_request(&mut stream, &request).await.is_err() {
        eprintln!("uqfaceclient: unexpected communication error");
        return ExitCode::from(COMMUNICATION_ERROR);
    }

    match receive_response(&mut stream).await {
        Ok(payload) => match write_output(args.output_filename.as_deref(), &payload) {
            Ok(()) => ExitCode::SUCCESS,
            Err(path) => {
                eprintln!("uqfaceclient: unable to open the output file \"{path}\" for writing");
                ExitCode::from(OUTPUT_FILE_ERROR)
            }
        },
        Err(ResponseOutcome::Communication) => {
            eprintln!("uqfaceclient: unexpected communication error");
            ExitCode::from(COMMUNICATION_ERROR)
        }
        Err(ResponseOutcome::ServerError(message)) => {
            eprintln!("uqfaceclient: received the following error message: \"{message}\"");
            ExitCode::from(ERROR_MESSAGE)
        }
    }
}

enum ResponseOutcome {
    Communication,
    ServerError(String),
}

/// Reads prefix, op byte, length, and payload with no tolerance for a
/// short read or mismatched prefix — any of that is a communication
/// error on the client side (unlike the server, the client has no
/// canned-response path for a bad prefix).
async fn receive_response(stream: &mut TcpStream) -> Result<Vec<u8>, ResponseOutcome> {
    let mut prefix = [0u8; 4];
    stream.read_exact(&mut prefix).await.map_err(|_| ResponseOutcome::Communication)?;
    if prefix != MAGIC {
        return Err(ResponseOutcome::Communication);
    }

    let mut op_byte = [0u8; 1];
    stream.read_exact(&mut op_byte).await.map_err(|_| ResponseOutcome::Communication)?;

    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await.map_err(|_| ResponseOutcome::Communication)?;
    let len = u32::from_le_bytes(len_buf) as usize;

    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await.map_err(|_| ResponseOutcome::Communication)?;

    match ResponseOp::try_from(op_byte[0]) {
        Ok(ResponseOp::Image) => Ok(payload),
        Ok(ResponseOp::Error) => {
            let message = String::from_utf8(payload).map_err(|_| ResponseOutcome::Communication)?;
            Err(ResponseOutcome::ServerError(message))
        }
        Err(_) => Err(ResponseOutcome::Communication),
    }
}

fn write_output(output_filename: Option<&str>, payload: &[u8]) -> Result<(), String> {
    match output_filename {
        Some(path) => {
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)
                .map_err(|_| path.to_string())?;
            file.write_all(payload).map_err(|_| path.to_string())
        }
        None => {
            let mut stdout = std::io::stdout();
            stdout.write_all(payload).map_err(|_| "<stdout>".to_string())?;
            stdout.flush().map_err(|_| "<stdout>".to_string())
        }
    }
}
