// Client application state and the message router.
//
// The front-end owns one `ClientState`. It feeds it relay frames, user actions and timer ticks,
// then reads the view state back and drains `NotableEvent`s for sounds and redraws.

use std::collections::VecDeque;
use std::sync::mpsc;

use chess::Square;
use instant::Instant;
use log::{debug, info, warn};

use crate::chat::{CONSOLE_TAB, ChatPanel, MessageDisplay};
use crate::event::{
    COMMAND_DISCONNECT, COMMAND_LOGIN, ClientMessage, Control, ServerMessage, decode_frame,
};
use crate::force::Force;
use crate::game::{DropResult, GameController, GameEffect, PlayerStatus, Sound};
use crate::network::{Credentials, RelayAddress};
use crate::notification::{MatchContext, Notification, candidates};
use crate::session::{ConnectionStatus, Session, SessionError, TransportCommand};


pub const NOT_PLAYING_MESSAGE: &str = "You are not playing a game";

#[derive(Clone, Debug)]
pub struct ClientOptions {
    // Ask the server for the list of channels right after login.
    pub request_channel_list: bool,
    pub sound_enabled: bool,
    pub autoscroll: bool,
    pub low_time_threshold_secs: i64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            request_channel_list: true,
            sound_enabled: true,
            autoscroll: true,
            low_time_threshold_secs: 20,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotableEvent {
    GameStarted,
    GameOver(PlayerStatus),
    Sound(Sound),
    ChatMessage { key: String, display: MessageDisplay },
    ConnectionStatusChanged(ConnectionStatus),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameRequestKind {
    Match,
    Takeback,
    Abort,
    Draw,
}

// An offer waiting for the user to accept or decline it. Only the latest one is kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameRequest {
    pub kind: GameRequestKind,
    pub title: String,
    pub text: String,
}

#[derive(Debug)]
pub struct ClientState {
    options: ClientOptions,
    session: Session,
    chat: ChatPanel,
    game: GameController,
    // Half-moves to undo once the pending takeback is granted. Zero if nothing is pending.
    pending_takeback: u32,
    game_request: Option<GameRequest>,
    status_message: String,
    sound_enabled: bool,
    notable_events: VecDeque<NotableEvent>,
}

impl ClientState {
    pub fn new(
        options: ClientOptions, relay: RelayAddress, transport_tx: mpsc::Sender<TransportCommand>,
    ) -> Self {
        ClientState {
            session: Session::new(relay, transport_tx),
            chat: ChatPanel::new(options.autoscroll),
            game: GameController::new(),
            pending_takeback: 0,
            game_request: None,
            status_message: String::new(),
            sound_enabled: options.sound_enabled,
            notable_events: VecDeque::new(),
            options,
        }
    }

    pub fn options(&self) -> &ClientOptions { &self.options }
    pub fn session(&self) -> &Session { &self.session }
    pub fn chat(&self) -> &ChatPanel { &self.chat }
    pub fn game(&self) -> &GameController { &self.game }
    pub fn pending_takeback(&self) -> u32 { self.pending_takeback }
    pub fn game_request(&self) -> Option<&GameRequest> { self.game_request.as_ref() }
    pub fn status_message(&self) -> &str { &self.status_message }
    pub fn sound_enabled(&self) -> bool { self.sound_enabled }

    pub fn is_low_time(&self, force: Force) -> bool {
        self.game.is_active()
            && self.game.clocks().is_low_time(force, self.options.low_time_threshold_secs)
    }

    pub fn next_notable_event(&mut self) -> Option<NotableEvent> { self.notable_events.pop_front() }

    // Connection lifecycle.

    pub fn connect(&mut self, credentials: Option<Credentials>) -> Result<(), SessionError> {
        let ret = self.session.connect(credentials);
        self.connection_status_changed();
        ret
    }
    pub fn on_transport_open(&mut self) {
        if let Err(err) = self.session.on_open() {
            warn!("Cannot log in: {err:?}");
        }
    }
    pub fn on_transport_close(&mut self) {
        self.session.on_close();
        self.connection_status_changed();
    }
    pub fn disconnect(&mut self) {
        self.session.disconnect();
        self.connection_status_changed();
    }

    // Inbound.

    pub fn process_frame(&mut self, frame: &str, now: Instant) {
        match decode_frame(frame) {
            Ok(messages) => {
                for message in messages {
                    self.process_server_message(message, now);
                }
            }
            Err(err) => warn!("Cannot decode frame {frame:?}: {err:?}"),
        }
    }

    pub fn process_server_message(&mut self, message: ServerMessage, now: Instant) {
        debug!("Routing {:?}", message.message_type());
        match message {
            ServerMessage::Control(control) => self.process_control(control),
            ServerMessage::ChannelTell(tell) => {
                let display = self.chat.new_message(&tell.channel, Some(&tell.handle), &tell.text);
                self.chat_message(&tell.channel, display);
            }
            ServerMessage::PrivateTell(tell) => {
                let display = self.chat.new_message(&tell.handle, Some(&tell.handle), &tell.text);
                self.chat_message(&tell.handle, display);
            }
            ServerMessage::GameMove(game_move) => {
                if self.game.apply_game_move(&game_move, now) {
                    self.notable_events.push_back(NotableEvent::GameStarted);
                }
                self.apply_game_effects();
            }
            ServerMessage::GameStart(start) => {
                let opponent = if start.playerone == self.session.handle() {
                    start.playertwo
                } else {
                    start.playerone
                };
                self.chat.create_or_get_tab(&opponent);
            }
            ServerMessage::GameEnd(end) => {
                self.game.apply_game_end(&end);
                self.apply_game_effects();
                self.notable_events.push_back(NotableEvent::GameOver(self.game.player().status));
            }
            ServerMessage::Unknown(free_text) => self.process_free_text(&free_text.text),
        }
    }

    // Advances clocks.
    pub fn refresh(&mut self, now: Instant) { self.game.tick(now); }

    fn process_control(&mut self, control: Control) {
        match control.command {
            COMMAND_LOGIN => {
                if self.session.acknowledge_login(&control.text) {
                    self.chat.set_handle(&control.text);
                    self.connection_status_changed();
                    if self.options.request_channel_list {
                        if let Err(err) = self.send_command("=ch") {
                            warn!("Cannot request channel list: {err:?}");
                        }
                    }
                }
            }
            COMMAND_DISCONNECT => {
                info!("Disconnected by server: {}", control.text);
                self.session.disconnect();
                self.status_message = control.text;
                self.connection_status_changed();
            }
            command => debug!("Ignoring control command {command}"),
        }
    }

    fn process_free_text(&mut self, text: &str) {
        let ctx = MatchContext { takeback_pending: self.pending_takeback > 0 };
        for notification in candidates(text, &ctx) {
            if self.handle_notification(notification) {
                return;
            }
        }
        debug!("Unmatched server text: {text:?}");
        let display = self.chat.new_message(CONSOLE_TAB, None, text);
        self.chat_message(CONSOLE_TAB, display);
    }

    // Returns whether the notification has been consumed. Offers that do not come from the current
    // opponent are dropped.
    fn handle_notification(&mut self, notification: Notification) -> bool {
        let opponent = self.game.opponent().name.clone();
        match notification {
            Notification::TakebackReply { requester, accepted } => {
                if requester != opponent {
                    return false;
                }
                if accepted {
                    self.game.take_back(self.pending_takeback);
                }
                self.pending_takeback = 0;
            }
            Notification::TakebackOffer { from, half_moves } => {
                if from != opponent {
                    debug!("Ignoring an offer from {from}");
                    return true;
                }
                self.pending_takeback = half_moves;
                self.show_request(
                    GameRequestKind::Takeback,
                    from,
                    format!("would like to take back {half_moves} half move(s)."),
                );
            }
            Notification::GameCreated { first, second } => {
                let handle = self.session.handle();
                if first.name == handle {
                    self.game.set_ratings(first.numeric(), second.numeric());
                } else if second.name == handle {
                    self.game.set_ratings(second.numeric(), first.numeric());
                }
            }
            Notification::Challenge { first, second, terms } => {
                let challenger = if first.name == self.session.handle() { second } else { first };
                let title = format!("{}({})", challenger.name, challenger.rating);
                self.show_request(GameRequestKind::Match, title, terms);
            }
            Notification::AbortOffer { from } => {
                if from != opponent {
                    debug!("Ignoring an offer from {from}");
                    return true;
                }
                self.show_request(GameRequestKind::Abort, from, "would like to abort the game.");
            }
            Notification::DrawOffer { from } => {
                if from != opponent {
                    debug!("Ignoring an offer from {from}");
                    return true;
                }
                self.show_request(GameRequestKind::Draw, from, "offers you a draw.");
            }
            Notification::ChannelList { channels } => self.chat.add_channels(&channels),
            Notification::Noise => {}
        }
        true
    }

    // User actions.

    pub fn send_command(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        self.session.send(ClientMessage::command(text))
    }

    pub fn accept(&mut self) -> Result<(), SessionError> {
        self.game_request = None;
        self.send_command("accept")
    }
    pub fn decline(&mut self) -> Result<(), SessionError> {
        self.game_request = None;
        self.send_command("decline")
    }
    pub fn close_request(&mut self) { self.game_request = None; }

    pub fn abort(&mut self) -> Result<(), SessionError> {
        self.game_request = None;
        self.in_game_command("abort")
    }
    pub fn resign(&mut self) -> Result<(), SessionError> { self.in_game_command("resign") }
    pub fn offer_draw(&mut self) -> Result<(), SessionError> { self.in_game_command("draw") }

    // Asks to take back our last move: one half-move if the opponent is on move, otherwise two
    // (their reply and our move).
    pub fn request_takeback(&mut self) -> Result<(), SessionError> {
        let Some(game) = self.game.game() else {
            self.status_message = NOT_PLAYING_MESSAGE.to_owned();
            return Ok(());
        };
        let half_moves = if game.engine().turn() == game.color() { 2 } else { 1 };
        self.send_command(format!("take {half_moves}"))?;
        self.pending_takeback = half_moves;
        Ok(())
    }

    pub fn new_game(&mut self) -> Result<(), SessionError> {
        if self.game.is_active() {
            return Ok(());
        }
        self.send_command("getgame")
    }

    // Seeks a game with the given time control, or challenges a specific opponent.
    pub fn seek_game(
        &mut self, opponent: Option<&str>, minutes: u32, increment_secs: u32,
    ) -> Result<(), SessionError> {
        if self.game.is_active() {
            return Ok(());
        }
        let command = match opponent {
            Some(opponent) if !opponent.is_empty() => format!("match {opponent}"),
            _ => "seek".to_owned(),
        };
        self.send_command(format!("{command} {minutes} {increment_secs}"))
    }

    // Text typed into the chat input. In a conversation tab it becomes a tell to that tab unless
    // prefixed with "@", which sends the rest as a raw command.
    pub fn submit_input(&mut self, input: &str) -> Result<(), SessionError> {
        if input.trim().is_empty() {
            return Ok(());
        }
        if !self.session.is_connected() {
            return Err(SessionError::NotConnected);
        }
        let focused = self.chat.focused().to_owned();
        let text = match input.strip_prefix('@') {
            Some(raw) => raw.to_owned(),
            None if focused != CONSOLE_TAB => format!("t {focused} {input}"),
            None => input.to_owned(),
        };
        let words: Vec<&str> = text.split(' ').collect();
        let is_number = |s: &str| !s.is_empty() && s.chars().all(|ch| ch.is_ascii_digit());
        if words.len() > 2 && (words[0] == "t" || words[0].starts_with("te")) && !is_number(words[1]) {
            let handle = self.session.handle().to_owned();
            self.chat.new_message(words[1], Some(&handle), &words[2..].join(" "));
        } else if words.len() > 1 && words[0].starts_with("ta") && is_number(words[1]) {
            self.pending_takeback = words[1].parse().unwrap_or(0);
        }
        self.send_command(text)
    }

    pub fn toggle_sound(&mut self) -> bool {
        self.sound_enabled = !self.sound_enabled;
        self.sound_enabled
    }
    pub fn toggle_autoscroll(&mut self) -> bool { self.chat.toggle_autoscroll() }
    pub fn scroll_chat(&mut self, lines: isize) { self.chat.scroll(lines); }
    pub fn focus_tab(&mut self, key: &str) { self.chat.focus(key); }
    pub fn close_tab(&mut self, key: &str) -> bool { self.chat.close_tab(key) }

    pub fn drag_start(&mut self, from: Square) -> Option<Vec<Square>> { self.game.on_drag_start(from) }

    pub fn drop_piece(&mut self, from: Square, to: Square) -> DropResult {
        let would_send = self.game.game().is_some_and(|game| game.is_my_turn());
        if would_send && !self.session.is_connected() {
            warn!("Cannot play {from}-{to}: session not connected");
            return DropResult::Snapback;
        }
        let result = self.game.on_drop(from, to);
        self.apply_game_effects();
        result
    }

    pub fn history_beginning(&mut self) { self.navigate(|h| { h.beginning(); }); }
    pub fn history_backward(&mut self) { self.navigate(|h| { h.backward(); }); }
    pub fn history_forward(&mut self) { self.navigate(|h| { h.forward(); }); }
    pub fn history_end(&mut self) { self.navigate(|h| { h.end(); }); }
    pub fn history_display(&mut self, index: usize) { self.navigate(|h| { h.display(Some(index)); }); }

    fn navigate(&mut self, f: impl FnOnce(&mut crate::history::HistoryNavigator)) {
        if let Some(history) = self.game.history_mut() {
            f(history);
        }
    }

    fn in_game_command(&mut self, command: &str) -> Result<(), SessionError> {
        if !self.game.is_active() {
            self.status_message = NOT_PLAYING_MESSAGE.to_owned();
            return Ok(());
        }
        self.send_command(command)
    }

    fn show_request(&mut self, kind: GameRequestKind, title: impl Into<String>, text: impl Into<String>) {
        self.game_request = Some(GameRequest { kind, title: title.into(), text: text.into() });
    }

    fn apply_game_effects(&mut self) {
        for effect in self.game.take_effects() {
            match effect {
                GameEffect::Send(message) => {
                    if let Err(err) = self.session.send(message) {
                        warn!("Move not sent: {err:?}");
                    }
                }
                GameEffect::Sound(sound) => {
                    if self.sound_enabled {
                        self.notable_events.push_back(NotableEvent::Sound(sound));
                    }
                }
                GameEffect::Status(text) => self.status_message = text,
            }
        }
    }

    fn chat_message(&mut self, key: &str, display: MessageDisplay) {
        self.notable_events
            .push_back(NotableEvent::ChatMessage { key: key.to_lowercase(), display });
    }

    fn connection_status_changed(&mut self) {
        self.notable_events
            .push_back(NotableEvent::ConnectionStatusChanged(self.session.status()));
    }
}
