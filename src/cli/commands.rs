// CLI command implementations
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use deckfeed::file::{is_ogg_file, OggVorbisFile};
use deckfeed::ogg::PageWriter;
use deckfeed::server::events;
use deckfeed::server::handshake::OK_RESPONSE;
use deckfeed::vorbis::{IdentificationHeader, VorbisComment, VORBIS_PACKET_SETUP, VORBIS_SIGNATURE};
use deckfeed::{ServerConfig, SessionManager};

use crate::cli::config::{Commands, Config};
use crate::cli::output::OutputFormatter;

/// Dispatch the parsed command line
pub async fn run(config: Config) -> Result<()> {
    let formatter = OutputFormatter::new(config.format, config.quiet);

    match config.command {
        Commands::Listen {
            host,
            port,
            read_buffer,
            handshake_timeout,
        } => {
            let server_config = ServerConfig {
                read_buffer_size: read_buffer.max(1),
                handshake_timeout: Duration::from_secs(handshake_timeout),
                ..ServerConfig::default()
            };
            command_listen(&host, port, server_config, &formatter).await
        }
        Commands::Inspect { files } => command_inspect(files, &formatter),
        Commands::Send {
            host,
            port,
            mount,
            title,
            artist,
            album,
        } => command_send(&host, port, &mount, title, artist, album, &formatter).await,
    }
}

/// Run the source server until Ctrl-C
async fn command_listen(
    host: &str,
    port: u16,
    server_config: ServerConfig,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (tx, mut rx) = events::channel();
    let manager = SessionManager::with_config(tx, server_config);

    let addr = manager.start(host, port).await?;
    formatter.print_info(&format!("Waiting for a source on {} (Ctrl-C to stop)", addr));

    let mut stdout = io::stdout();
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("listen for Ctrl-C")?;
                break;
            }
            event = rx.recv() => match event {
                Some(event) => formatter.output_event(&event, &mut stdout)?,
                None => break,
            },
        }
    }

    manager.stop().await?;
    while let Ok(event) = rx.try_recv() {
        formatter.output_event(&event, &mut stdout)?;
    }
    formatter.print_success("Server stopped");
    Ok(())
}

/// Print the tracks of recorded streams
fn command_inspect(files: Vec<PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let mut stdout = io::stdout();
    let mut failures = 0;

    for path in files {
        let name = path.display().to_string();
        if !path.exists() {
            formatter.print_error(&format!("File not found: {}", name));
            failures += 1;
            continue;
        }
        if !is_ogg_file(&path) {
            formatter.print_error(&format!("{}: not an Ogg stream", name));
            failures += 1;
            continue;
        }

        match OggVorbisFile::new(&path).read_tracks() {
            Ok(tracks) => {
                if formatter.is_pretty() {
                    println!("{}: {} track(s)", name, tracks.len());
                }
                for track in &tracks {
                    formatter.output_track(&name, track, &mut stdout)?;
                }
            }
            Err(e) => {
                formatter.print_error(&format!("{}: {}", name, e));
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} file(s) could not be read", failures);
    }
    Ok(())
}

/// Play the part of the DJ software for one track
async fn command_send(
    host: &str,
    port: u16,
    mount: &str,
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let mut stream = TcpStream::connect((host, port))
        .await
        .with_context(|| format!("connect to {}:{}", host, port))?;

    let request = format!(
        "SOURCE {} HTTP/1.0\r\ncontent-type: application/ogg\r\nice-name: deckfeed test source\r\nuser-agent: deckfeed/{}\r\n\r\n",
        mount,
        env!("CARGO_PKG_VERSION")
    );
    stream.write_all(request.as_bytes()).await.context("send SOURCE request")?;

    let mut reply = vec![0u8; OK_RESPONSE.len()];
    stream
        .read_exact(&mut reply)
        .await
        .context("server closed the connection without answering")?;
    if reply != OK_RESPONSE {
        bail!("unexpected reply {:?}", String::from_utf8_lossy(&reply));
    }
    debug!("handshake accepted");

    let mut comments = Vec::new();
    for (field, value) in [("title", title), ("artist", artist), ("album", album)] {
        if let Some(value) = value {
            comments.push((field.to_string(), value));
        }
    }
    let comment = VorbisComment {
        vendor_string: format!("deckfeed {}", env!("CARGO_PKG_VERSION")),
        comments,
    };

    let mut setup = vec![VORBIS_PACKET_SETUP];
    setup.extend_from_slice(VORBIS_SIGNATURE);

    let mut writer = PageWriter::new(std::process::id());
    let mut pages = writer.write_packets(&[IdentificationHeader::default().to_packet()], 255);
    pages.extend(writer.write_packets(&[comment.to_packet(), setup], 255));
    pages.extend(writer.write_eos());

    stream.write_all(&pages).await.context("send Ogg pages")?;
    stream.shutdown().await.context("close connection")?;

    formatter.print_success(&format!("Sent {} tag(s) to {}:{}{}", comment.comments.len(), host, port, mount));
    Ok(())
}
