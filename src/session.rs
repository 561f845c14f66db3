use std::sync::mpsc;

use log::{info, warn};

use crate::event::ClientMessage;
use crate::network::{Credentials, RelayAddress, login_text};


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

// Instructions for the transport that owns the actual socket. The transport is expected to
// reconnect on its own after an unexpected close and report `on_open` / `on_close` back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportCommand {
    Open { url: String },
    Send(ClientMessage),
    Close,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionError {
    NotConnected,
    ChannelClosed,
}

// Connection state as seen by the application. `Connected` is only reached once the relay
// acknowledges the login, which is also when the handle becomes known.
#[derive(Debug)]
pub struct Session {
    relay: RelayAddress,
    status: ConnectionStatus,
    handle: String,
    credentials: Option<Credentials>,
    transport_tx: mpsc::Sender<TransportCommand>,
}

impl Session {
    pub fn new(relay: RelayAddress, transport_tx: mpsc::Sender<TransportCommand>) -> Self {
        Session {
            relay,
            status: ConnectionStatus::Disconnected,
            handle: String::new(),
            credentials: None,
            transport_tx,
        }
    }

    pub fn status(&self) -> ConnectionStatus { self.status }
    pub fn is_connected(&self) -> bool { self.status == ConnectionStatus::Connected }
    pub fn handle(&self) -> &str { &self.handle }
    pub fn relay(&self) -> &RelayAddress { &self.relay }

    pub fn connect(&mut self, credentials: Option<Credentials>) -> Result<(), SessionError> {
        let url = self.relay.url(credentials.is_some());
        self.credentials = credentials;
        self.status = ConnectionStatus::Connecting;
        self.transport(TransportCommand::Open { url })
    }

    // Socket (re)opened. Logs in right away if credentials were given; guests are assigned a
    // handle by the server without asking.
    pub fn on_open(&mut self) -> Result<(), SessionError> {
        self.status = ConnectionStatus::Connecting;
        match &self.credentials {
            Some(credentials) => {
                let login = ClientMessage::login(login_text(credentials));
                self.transport(TransportCommand::Send(login))
            }
            None => Ok(()),
        }
    }

    // Returns false if the session was already connected: the first handle stays.
    pub fn acknowledge_login(&mut self, handle: &str) -> bool {
        if self.is_connected() {
            return false;
        }
        info!("Logged in as {handle}");
        self.handle = handle.to_owned();
        self.status = ConnectionStatus::Connected;
        true
    }

    pub fn send(&mut self, message: ClientMessage) -> Result<(), SessionError> {
        if !self.is_connected() {
            warn!("Cannot send {:?}: session not connected", message.text());
            return Err(SessionError::NotConnected);
        }
        self.transport(TransportCommand::Send(message))
    }

    // Also stops a pending login: the transport must not reopen and retry the same credentials.
    pub fn disconnect(&mut self) {
        if self.status != ConnectionStatus::Disconnected {
            self.status = ConnectionStatus::Disconnecting;
            self.credentials = None;
            if self.transport(TransportCommand::Close).is_err() {
                warn!("Transport is gone while disconnecting");
            }
            self.on_close();
        }
    }

    pub fn on_close(&mut self) {
        self.status = ConnectionStatus::Disconnected;
        self.handle.clear();
    }

    fn transport(&self, command: TransportCommand) -> Result<(), SessionError> {
        self.transport_tx.send(command).map_err(|_| SessionError::ChannelClosed)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn new_session() -> (Session, mpsc::Receiver<TransportCommand>) {
        let (tx, rx) = mpsc::channel();
        let relay = RelayAddress { host: "relay".to_owned(), secure: false };
        (Session::new(relay, tx), rx)
    }

    #[test]
    fn send_requires_login() {
        let (mut session, rx) = new_session();
        session.connect(None).unwrap();
        assert_eq!(rx.try_recv().unwrap(), TransportCommand::Open { url: "ws://relay/ws".to_owned() });
        assert_eq!(session.send(ClientMessage::command("=ch")), Err(SessionError::NotConnected));
        assert!(rx.try_recv().is_err());

        assert!(session.acknowledge_login("GuestABCD"));
        session.send(ClientMessage::command("=ch")).unwrap();
        assert_eq!(rx.try_recv().unwrap(), TransportCommand::Send(ClientMessage::command("=ch")));
    }

    #[test]
    fn login_sent_on_open() {
        let (mut session, rx) = new_session();
        let credentials = Credentials { user: "alice".to_owned(), password: String::new() };
        session.connect(Some(credentials)).unwrap();
        session.on_open().unwrap();
        assert_eq!(
            rx.try_iter().collect::<Vec<_>>(),
            vec![
                TransportCommand::Open { url: "ws://relay/ws?login=1".to_owned() },
                TransportCommand::Send(ClientMessage::login("[alice]")),
            ]
        );
    }

    #[test]
    fn second_login_ack_keeps_handle() {
        let (mut session, _rx) = new_session();
        assert!(session.acknowledge_login("alice"));
        assert!(!session.acknowledge_login("mallory"));
        assert_eq!(session.handle(), "alice");
    }

    #[test]
    fn close_resets_state() {
        let (mut session, _rx) = new_session();
        session.acknowledge_login("alice");
        session.on_close();
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert_eq!(session.handle(), "");
        assert!(!session.is_connected());
    }

    #[test]
    fn disconnect_closes_transport() {
        let (mut session, rx) = new_session();
        session.acknowledge_login("alice");
        session.disconnect();
        assert_eq!(rx.try_recv().unwrap(), TransportCommand::Close);
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn disconnect_during_login() {
        let (mut session, rx) = new_session();
        let credentials = Credentials { user: "alice".to_owned(), password: "bad".to_owned() };
        session.connect(Some(credentials)).unwrap();
        session.on_open().unwrap();
        rx.try_iter().for_each(drop);

        session.disconnect();
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![TransportCommand::Close]);
        assert_eq!(session.status(), ConnectionStatus::Disconnected);

        // A late reopen must not retry the rejected login.
        session.on_open().unwrap();
        assert!(rx.try_recv().is_err());

        session.on_close();
        session.disconnect();
        assert!(rx.try_recv().is_err());
    }
}
