//! Read the diagnostic tap and print one JSON line per message.
//!
//! ```text
//! tapcat [PATH]
//! ```
//!
//! `PATH` defaults to the configured tap path (`DHT_SERIALIZATION_TAP_PATH`
//! or `/tmp/cjdroute_pipe`). Any regular file containing back-to-back
//! bencoded messages works too.

use std::path::PathBuf;
use std::process::ExitCode;

use dht_serialization::config::StageConfig;
use dht_serialization::core::codec::BencodeFrameCodec;
use dht_serialization::core::value::Value;
use dht_serialization::utils::logging::init_logging;
use futures::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::codec::FramedRead;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config = StageConfig::from_env();
    init_logging(&config.logging);

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.tap.path.clone());

    // Opening a FIFO for reading waits until a writer shows up.
    let file = match File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            error!(path = %path.display(), error = %e, "Cannot open tap");
            return ExitCode::FAILURE;
        }
    };
    info!(path = %path.display(), "Reading tap");

    let mut frames = FramedRead::new(file, BencodeFrameCodec::from_config(&config.codec));
    let mut stdout = BufWriter::new(tokio::io::stdout());
    let mut count = 0u64;

    while let Some(frame) = frames.next().await {
        let message = match frame {
            Ok(message) => message,
            Err(e) => {
                // Boundaries are lost after a bad frame
                error!(error = %e, messages = count, "Tap stream is not decodable");
                let _ = stdout.flush().await;
                return ExitCode::FAILURE;
            }
        };

        let line = match serde_json::to_string(&Value::Dict(message)) {
            Ok(line) => line,
            Err(e) => {
                error!(error = %e, "Cannot render message");
                continue;
            }
        };
        count += 1;
        if stdout.write_all(line.as_bytes()).await.is_err()
            || stdout.write_all(b"\n").await.is_err()
            || stdout.flush().await.is_err()
        {
            // stdout closed, e.g. piped into head
            break;
        }
    }

    info!(messages = count, "Tap closed");
    ExitCode::SUCCESS
}
