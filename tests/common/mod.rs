// Rust-upgrade (https://github.com/rust-lang/rust/issues/46379):
//   remove `#[allow(dead_code)]` before public functions.

use std::sync::mpsc;

use freechess_club::client::{ClientOptions, ClientState, NotableEvent};
use freechess_club::event::{COMMAND_LOGIN, Control, GameMove, ServerMessage};
use freechess_club::network::RelayAddress;
use freechess_club::session::TransportCommand;
use instant::Instant;


pub const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR";
pub const AFTER_E4_E5: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR";

// A client wired to a channel instead of a socket. Everything the client would put on the wire
// can be inspected with `sent_texts`.
pub struct TestClient {
    pub state: ClientState,
    transport_rx: mpsc::Receiver<TransportCommand>,
}

impl TestClient {
    #[allow(dead_code)]
    pub fn new() -> Self { Self::with_options(ClientOptions::default()) }

    #[allow(dead_code)]
    pub fn with_options(options: ClientOptions) -> Self {
        let (transport_tx, transport_rx) = mpsc::channel();
        let state = ClientState::new(options, RelayAddress::default(), transport_tx);
        TestClient { state, transport_rx }
    }

    // Opens the connection and acknowledges the login, then forgets about everything sent so far.
    #[allow(dead_code)]
    pub fn login(&mut self, handle: &str) {
        self.state.connect(None).unwrap();
        self.state.on_transport_open();
        self.feed(ServerMessage::Control(Control {
            command: COMMAND_LOGIN,
            text: handle.to_owned(),
        }));
        self.drain();
    }

    #[allow(dead_code)]
    pub fn feed(&mut self, message: ServerMessage) {
        self.state.process_server_message(message, Instant::now());
    }

    #[allow(dead_code)]
    pub fn feed_move(&mut self, game_move: GameMove) {
        self.feed(ServerMessage::GameMove(game_move));
    }

    #[allow(dead_code)]
    pub fn feed_frame(&mut self, frame: &str) { self.state.process_frame(frame, Instant::now()); }

    // Transport commands issued since the last call.
    #[allow(dead_code)]
    pub fn drain(&mut self) -> Vec<TransportCommand> { self.transport_rx.try_iter().collect() }

    // Texts of the messages sent since the last call.
    #[allow(dead_code)]
    pub fn sent_texts(&mut self) -> Vec<String> {
        self.drain()
            .into_iter()
            .filter_map(|command| match command {
                TransportCommand::Send(message) => Some(message.text().to_owned()),
                _ => None,
            })
            .collect()
    }

    #[allow(dead_code)]
    pub fn notable_events(&mut self) -> Vec<NotableEvent> {
        std::iter::from_fn(|| self.state.next_notable_event()).collect()
    }
}
