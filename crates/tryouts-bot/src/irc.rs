use std::io;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use tryouts_core::commands::Outbound;
use tryouts_core::events::{ChatEvent, ChatEventKind};

use crate::config::IrcConfig;

const RECONNECT_MIN: Duration = Duration::from_secs(5);
const RECONNECT_MAX: Duration = Duration::from_secs(30);

/// Spawn the Bancho IRC transport: a line-based TCP client that turns
/// PRIVMSG/KICK lines into `ChatEvent`s and writes rate-limited sends
/// back out. Reconnects with exponential backoff until the outbound
/// side shuts down.
pub fn spawn_transport(
    config: IrcConfig,
    events: mpsc::Sender<ChatEvent>,
    wire: mpsc::Receiver<Outbound>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        run(config, events, wire).await;
    })
}

async fn run(config: IrcConfig, events: mpsc::Sender<ChatEvent>, mut wire: mpsc::Receiver<Outbound>) {
    let mut backoff = RECONNECT_MIN;
    loop {
        match session(&config, &events, &mut wire, &mut backoff).await {
            Ok(()) => {
                tracing::info!("Transport stopped");
                return;
            },
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    delay_secs = backoff.as_secs(),
                    "Connection lost, reconnecting"
                );
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(RECONNECT_MAX);
            },
        }
    }
}

/// One connection's lifetime. `Ok(())` means a clean shutdown was
/// requested (a channel closed); errors trigger a reconnect.
async fn session(
    config: &IrcConfig,
    events: &mpsc::Sender<ChatEvent>,
    wire: &mut mpsc::Receiver<Outbound>,
    backoff: &mut Duration,
) -> io::Result<()> {
    let addr = format!("{}:{}", config.server, config.port);
    tracing::info!(addr = %addr, "Connecting to Bancho");
    let stream = TcpStream::connect(&addr).await?;
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    if let Some(password) = &config.password {
        writer
            .write_all(format!("PASS {password}\r\n").as_bytes())
            .await?;
    }
    writer
        .write_all(format!("NICK {}\r\n", config.nickname).as_bytes())
        .await?;
    writer
        .write_all(format!("USER {0} 0 * :{0}\r\n", config.nickname).as_bytes())
        .await?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "server closed the connection",
                    ));
                };
                match parse_line(line.trim_end(), &config.nickname) {
                    ServerLine::Ping(payload) => {
                        writer
                            .write_all(format!("PONG :{payload}\r\n").as_bytes())
                            .await?;
                    },
                    ServerLine::Welcome => {
                        tracing::info!("Logged in to Bancho");
                        *backoff = RECONNECT_MIN;
                    },
                    ServerLine::Chat(event) => {
                        if events.send(event).await.is_err() {
                            return Ok(());
                        }
                    },
                    ServerLine::Other => {},
                }
            }
            msg = wire.recv() => {
                let Some(Outbound { target, text }) = msg else {
                    return Ok(());
                };
                writer
                    .write_all(format!("PRIVMSG {target} :{text}\r\n").as_bytes())
                    .await?;
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ServerLine {
    Chat(ChatEvent),
    Ping(String),
    Welcome,
    Other,
}

fn parse_line(line: &str, our_nick: &str) -> ServerLine {
    if let Some(payload) = line.strip_prefix("PING") {
        let payload = payload.trim_start().trim_start_matches(':');
        return ServerLine::Ping(payload.to_string());
    }
    let Some(rest) = line.strip_prefix(':') else {
        return ServerLine::Other;
    };
    let Some((prefix, rest)) = rest.split_once(' ') else {
        return ServerLine::Other;
    };
    let sender = prefix.split('!').next().unwrap_or(prefix);
    let (command, params) = rest.split_once(' ').unwrap_or((rest, ""));

    match command {
        "001" => ServerLine::Welcome,
        "PRIVMSG" => {
            let Some((target, text)) = params.split_once(" :") else {
                return ServerLine::Other;
            };
            let kind = if target.starts_with('#') {
                ChatEventKind::Channel
            } else {
                ChatEventKind::Private
            };
            ServerLine::Chat(ChatEvent::new(sender, target, text, kind))
        },
        "KICK" => {
            let mut parts = params.splitn(3, ' ');
            let (Some(channel), Some(victim)) = (parts.next(), parts.next()) else {
                return ServerLine::Other;
            };
            if victim != our_nick {
                return ServerLine::Other;
            }
            ServerLine::Chat(ChatEvent::new(sender, channel, "", ChatEventKind::Kicked))
        },
        _ => ServerLine::Other,
    }
}
