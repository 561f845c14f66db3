// Websocket transport for the relay. A single thread owns the socket: it executes
// `TransportCommand`s, forwards incoming frames and reopens the connection after it drops.

use std::io;
use std::net::TcpStream;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use log::{info, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};
use url::Url;

use freechess_club::event::{ClientMessage, ProtocolError};
use freechess_club::network::encode_message;
use freechess_club::session::TransportCommand;


// How long a read may block before pending commands are looked at again.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

type RelaySocket = WebSocket<MaybeTlsStream<TcpStream>>;

#[derive(Debug)]
pub enum CommunicationError {
    Socket(tungstenite::Error),
    Protocol(ProtocolError),
    Url(url::ParseError),
    // Connection closed by the peer.
    Closed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetworkEvent {
    Opened,
    Frame(String),
    Closed { reason: String },
}

pub fn write_message<S>(socket: &mut WebSocket<S>, message: &ClientMessage) -> Result<(), CommunicationError>
where
    S: io::Read + io::Write,
{
    let serialized = encode_message(message).map_err(CommunicationError::Protocol)?;
    socket.send(Message::text(serialized)).map_err(CommunicationError::Socket)
}

// Returns the next text frame, or `None` if nothing arrived before the read timeout.
pub fn read_frame<S>(socket: &mut WebSocket<S>) -> Result<Option<String>, CommunicationError>
where
    S: io::Read + io::Write,
{
    match socket.read() {
        Ok(Message::Text(text)) => Ok(Some(text.as_str().to_owned())),
        Ok(Message::Close(_)) => Err(CommunicationError::Closed),
        Ok(_) => Ok(None),
        Err(tungstenite::Error::Io(err))
            if matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
        {
            Ok(None)
        }
        Err(err) => Err(CommunicationError::Socket(err)),
    }
}

fn open_socket(url: &str) -> Result<RelaySocket, CommunicationError> {
    let url = Url::parse(url).map_err(CommunicationError::Url)?;
    let (socket, _) = tungstenite::connect(url.as_str()).map_err(CommunicationError::Socket)?;
    let timeout_result = match socket.get_ref() {
        MaybeTlsStream::Plain(stream) => stream.set_read_timeout(Some(POLL_INTERVAL)),
        MaybeTlsStream::NativeTls(stream) => stream.get_ref().set_read_timeout(Some(POLL_INTERVAL)),
        _ => Ok(()),
    };
    timeout_result.map_err(|err| CommunicationError::Socket(tungstenite::Error::Io(err)))?;
    Ok(socket)
}

// Runs until the command channel is closed.
pub fn run_transport(
    commands: mpsc::Receiver<TransportCommand>, events: mpsc::Sender<NetworkEvent>,
    reconnect_delay: Duration,
) {
    let mut url: Option<String> = None;
    let mut socket: Option<RelaySocket> = None;
    loop {
        let Some(active_socket) = socket.as_mut() else {
            // Wait for an explicit open, or reconnect to the last address.
            let command = match &url {
                None => match commands.recv() {
                    Ok(command) => Some(command),
                    Err(_) => return,
                },
                Some(_) => match commands.try_recv() {
                    Ok(command) => Some(command),
                    Err(mpsc::TryRecvError::Empty) => None,
                    Err(mpsc::TryRecvError::Disconnected) => return,
                },
            };
            match command {
                Some(TransportCommand::Open { url: new_url }) => url = Some(new_url),
                Some(TransportCommand::Close) => {
                    url = None;
                    continue;
                }
                Some(TransportCommand::Send(message)) => {
                    warn!("Dropping {:?}: no connection", message.text());
                    continue;
                }
                None => {}
            }
            let Some(target) = &url else {
                continue;
            };
            info!("Connecting to {target}");
            match open_socket(target) {
                Ok(new_socket) => {
                    socket = Some(new_socket);
                    if events.send(NetworkEvent::Opened).is_err() {
                        return;
                    }
                }
                Err(err) => {
                    warn!(
                        "Cannot connect: {err:?}; retrying in {}",
                        humantime::format_duration(reconnect_delay)
                    );
                    if events.send(NetworkEvent::Closed { reason: format!("{err:?}") }).is_err() {
                        return;
                    }
                    thread::sleep(reconnect_delay);
                }
            }
            continue;
        };

        let mut close_reason = None;
        let mut reopen_now = false;
        loop {
            match commands.try_recv() {
                Ok(TransportCommand::Send(message)) => {
                    if let Err(err) = write_message(active_socket, &message) {
                        close_reason = Some(format!("{err:?}"));
                        break;
                    }
                }
                Ok(TransportCommand::Open { url: new_url }) => {
                    url = Some(new_url);
                    reopen_now = true;
                    close_reason = Some("reconnecting".to_owned());
                    break;
                }
                Ok(TransportCommand::Close) => {
                    url = None;
                    let _ = active_socket.close(None);
                    let _ = active_socket.flush();
                    close_reason = Some("closed by user".to_owned());
                    break;
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => return,
            }
        }
        if close_reason.is_none() {
            match read_frame(active_socket) {
                Ok(Some(frame)) => {
                    if events.send(NetworkEvent::Frame(frame)).is_err() {
                        return;
                    }
                }
                Ok(None) => {}
                Err(err) => close_reason = Some(format!("{err:?}")),
            }
        }
        if let Some(reason) = close_reason {
            info!("Connection closed: {reason}");
            socket = None;
            if events.send(NetworkEvent::Closed { reason }).is_err() {
                return;
            }
            if url.is_some() && !reopen_now {
                thread::sleep(reconnect_delay);
            }
        }
    }
}
