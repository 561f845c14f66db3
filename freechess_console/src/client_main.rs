// Improvement potential. Mouse support for dragging pieces.

use std::fmt;
use std::io;
use std::str::FromStr;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use chess::Square;
use crossterm::style::{self, Stylize};
use crossterm::{cursor, event as term_event, execute, terminal};
use instant::Instant;
use log::{debug, info, warn};
use scopeguard::defer;

use freechess_club::client::{ClientOptions, ClientState, NotableEvent};
use freechess_club::force::Force;
use freechess_club::game::{DropResult, PlayerBlock};
use freechess_club::network::{Credentials, RelayAddress};
use freechess_club::once_cell_regex;
use freechess_club::session::{ConnectionStatus, SessionError};

use crate::network::{self, NetworkEvent};
use crate::tui;


const CHAT_LINES: usize = 12;
const HISTORY_ROWS: usize = 8;

pub struct ClientConfig {
    pub relay: RelayAddress,
    pub credentials: Option<Credentials>,
    pub reconnect_delay: Duration,
    pub options: ClientOptions,
}

enum IncomingEvent {
    Network(NetworkEvent),
    Terminal(term_event::Event),
    Tick,
}

fn writeln_raw(stdout: &mut io::Stdout, v: impl fmt::Display) -> io::Result<()> {
    let s = v.to_string();
    // Note. Not using `lines()` because it removes trailing new line.
    for line in s.split('\n') {
        execute!(
            stdout,
            style::Print(line),
            terminal::Clear(terminal::ClearType::UntilNewLine),
            cursor::MoveToNextLine(1),
            cursor::Hide
        )?;
    }
    Ok(())
}

fn connection_label(status: ConnectionStatus, handle: &str) -> String {
    match status {
        ConnectionStatus::Disconnected => "Disconnected".red().to_string(),
        ConnectionStatus::Connecting => "Connecting...".yellow().to_string(),
        ConnectionStatus::Connected => format!("Connected as {}", handle.bold()),
        ConnectionStatus::Disconnecting => "Disconnecting...".yellow().to_string(),
    }
}

fn render(
    stdout: &mut io::Stdout, app_start_time: Instant, client_state: &ClientState,
    keyboard_input: &str, command_error: &Option<String>,
) -> io::Result<()> {
    let now = Instant::now();
    execute!(stdout, cursor::MoveTo(0, 0))?;
    let session = client_state.session();
    writeln_raw(stdout, connection_label(session.status(), session.handle()))?;

    let game = client_state.game();
    let my_force = game.orientation();
    let opponent_force = my_force.opponent();
    let active_force = game.game().map(|g| g.engine().turn());
    let player_line = |force: Force, block: &PlayerBlock| {
        tui::render_player(
            block,
            game.clocks().remaining(force),
            client_state.is_low_time(force),
            active_force == Some(force),
        )
    };
    writeln_raw(stdout, player_line(opponent_force, game.opponent()))?;
    if let Some(balance) = game.material_balance() {
        writeln_raw(stdout, tui::render_material(&balance, my_force, false))?;
    }
    writeln_raw(
        stdout,
        tui::render_board(&game.displayed_position(), game.orientation(), game.highlights()),
    )?;
    if let Some(balance) = game.material_balance() {
        writeln_raw(stdout, tui::render_material(&balance, opponent_force, true))?;
    }
    writeln_raw(stdout, player_line(my_force, game.player()))?;
    if let Some(history) = game.history() {
        writeln_raw(stdout, tui::render_history(&history.move_rows(), HISTORY_ROWS))?;
        if !history.is_at_end() {
            writeln_raw(
                stdout,
                format!("Browsing move {} of {}", history.cursor(), history.len() - 1).dark_grey(),
            )?;
        }
    }
    writeln_raw(stdout, "")?;
    writeln_raw(stdout, tui::render_chat(client_state.chat(), CHAT_LINES))?;
    if let Some(request) = client_state.game_request() {
        writeln_raw(stdout, tui::render_request(request))?;
    }
    if !client_state.status_message().is_empty() {
        writeln_raw(stdout, client_state.status_message().magenta())?;
    }

    // Simulate cursor: real cursor blinking is broken with Show/Hide.
    let show_cursor = now.duration_since(app_start_time).as_millis() % 1000 >= 500;
    let cursor = if show_cursor { '▂' } else { ' ' };
    let input_with_cursor = format!("{keyboard_input}{cursor}");
    let my_turn = game.game().is_some_and(|g| g.is_my_turn());
    let input_style = if my_turn { style::Color::White } else { style::Color::DarkGrey };
    writeln_raw(stdout, format!("> {}", input_with_cursor.with(input_style)))?;
    if let Some(err) = command_error {
        writeln_raw(stdout, err.clone().with(style::Color::Red))?;
    }
    execute!(stdout, terminal::Clear(terminal::ClearType::FromCursorDown))?;
    Ok(())
}

fn session_result(result: Result<(), SessionError>) -> Option<String> {
    result.err().map(|err| match err {
        SessionError::NotConnected => "Not connected".to_owned(),
        SessionError::ChannelClosed => "Connection thread is gone".to_owned(),
    })
}

fn parse_minutes_and_increment(args: &[&str]) -> Result<(u32, u32), String> {
    let [minutes, increment] = args else {
        return Err("Expected <minutes> <increment>".to_owned());
    };
    let parse = |s: &str| s.parse::<u32>().map_err(|_| format!("Not a number: '{s}'"));
    Ok((parse(*minutes)?, parse(*increment)?))
}

fn make_move(client_state: &mut ClientState, input: &str) -> Option<Option<String>> {
    let caps = once_cell_regex!(r"^([a-h][1-8])-?([a-h][1-8])$").captures(input)?;
    let (Ok(from), Ok(to)) = (Square::from_str(&caps[1]), Square::from_str(&caps[2])) else {
        return Some(Some(format!("Bad squares: '{input}'")));
    };
    if client_state.drag_start(from).is_none() {
        return Some(Some(format!("Cannot move from {from}")));
    }
    Some(match client_state.drop_piece(from, to) {
        DropResult::Accepted | DropResult::Premoved => None,
        DropResult::Snapback => Some(format!("Illegal move: {from}-{to}")),
    })
}

// Returns `Err` to quit.
fn execute_command(client_state: &mut ClientState, cmd: &str) -> Result<Option<String>, ()> {
    let words: Vec<&str> = cmd.split_whitespace().collect();
    let Some((&name, args)) = words.split_first() else {
        return Ok(Some("Empty command".to_owned()));
    };
    let error = match name {
        "quit" => {
            client_state.disconnect();
            return Err(());
        }
        "resign" => session_result(client_state.resign()),
        "draw" => session_result(client_state.offer_draw()),
        "abort" => session_result(client_state.abort()),
        "takeback" => session_result(client_state.request_takeback()),
        "accept" => session_result(client_state.accept()),
        "decline" => session_result(client_state.decline()),
        "close" => {
            client_state.close_request();
            None
        }
        "tab" => match args {
            [key] => {
                client_state.focus_tab(key);
                None
            }
            _ => Some("Usage: /tab <channel or handle>".to_owned()),
        },
        "closetab" => {
            let focused = client_state.chat().focused().to_owned();
            (!client_state.close_tab(&focused)).then(|| "Cannot close this tab".to_owned())
        }
        "sound" => {
            let on = client_state.toggle_sound();
            info!("Sound {}", if on { "on" } else { "off" });
            None
        }
        "autoscroll" => {
            client_state.toggle_autoscroll();
            None
        }
        "begin" => {
            client_state.history_beginning();
            None
        }
        "back" => {
            client_state.history_backward();
            None
        }
        "fwd" => {
            client_state.history_forward();
            None
        }
        "end" => {
            client_state.history_end();
            None
        }
        "getgame" => session_result(client_state.new_game()),
        "seek" => match parse_minutes_and_increment(args) {
            Ok((minutes, increment)) => {
                session_result(client_state.seek_game(None, minutes, increment))
            }
            Err(err) => Some(err),
        },
        "match" => match args.split_first() {
            Some((opponent, rest)) => match parse_minutes_and_increment(rest) {
                Ok((minutes, increment)) => {
                    session_result(client_state.seek_game(Some(*opponent), minutes, increment))
                }
                Err(err) => Some(err),
            },
            None => Some("Usage: /match <opponent> <minutes> <increment>".to_owned()),
        },
        _ => Some(format!("Unknown command: '{cmd}'")),
    };
    Ok(error)
}

pub fn run(config: ClientConfig) -> io::Result<()> {
    let (transport_tx, transport_rx) = mpsc::channel();
    let (net_tx, net_rx) = mpsc::channel();
    let reconnect_delay = config.reconnect_delay;
    thread::spawn(move || network::run_transport(transport_rx, net_tx, reconnect_delay));

    let mut stdout = io::stdout();
    terminal::enable_raw_mode()?;
    execute!(stdout, terminal::EnterAlternateScreen, cursor::Hide)?;
    defer! {
        let _ = execute!(io::stdout(), terminal::LeaveAlternateScreen, cursor::Show);
        let _ = terminal::disable_raw_mode();
    };
    let app_start_time = Instant::now();

    let (tx, rx) = mpsc::channel();
    let tx_net = tx.clone();
    let tx_local = tx.clone();
    let tx_tick = tx;
    thread::spawn(move || {
        for ev in net_rx {
            if tx_net.send(IncomingEvent::Network(ev)).is_err() {
                return;
            }
        }
    });
    thread::spawn(move || {
        while let Ok(ev) = term_event::read() {
            if tx_local.send(IncomingEvent::Terminal(ev)).is_err() {
                return;
            }
        }
    });
    thread::spawn(move || {
        loop {
            thread::sleep(Duration::from_millis(100));
            if tx_tick.send(IncomingEvent::Tick).is_err() {
                return;
            }
        }
    });

    let mut client_state = ClientState::new(config.options, config.relay, transport_tx);
    let mut keyboard_input = String::new();
    let mut command_error = None;
    if let Err(err) = client_state.connect(config.credentials) {
        command_error = session_result(Err(err));
    }
    for event in rx {
        let now = Instant::now();
        match event {
            IncomingEvent::Network(NetworkEvent::Opened) => client_state.on_transport_open(),
            IncomingEvent::Network(NetworkEvent::Frame(frame)) => {
                client_state.process_frame(&frame, now);
            }
            IncomingEvent::Network(NetworkEvent::Closed { reason }) => {
                warn!("Connection lost: {reason}");
                client_state.on_transport_close();
            }
            IncomingEvent::Terminal(term_event::Event::Key(event))
                if event.kind == term_event::KeyEventKind::Press =>
            {
                match event.code {
                    term_event::KeyCode::Char(ch) => keyboard_input.push(ch),
                    term_event::KeyCode::Backspace => {
                        keyboard_input.pop();
                    }
                    term_event::KeyCode::Esc => keyboard_input.clear(),
                    term_event::KeyCode::PageUp => client_state.scroll_chat(CHAT_LINES as isize / 2),
                    term_event::KeyCode::PageDown => {
                        client_state.scroll_chat(-(CHAT_LINES as isize / 2));
                    }
                    term_event::KeyCode::Enter => {
                        let input = std::mem::take(&mut keyboard_input);
                        let input = input.trim();
                        command_error = if let Some(cmd) = input.strip_prefix('/') {
                            match execute_command(&mut client_state, cmd) {
                                Ok(err) => err,
                                Err(()) => return Ok(()),
                            }
                        } else if let Some(result) = make_move(&mut client_state, input) {
                            result
                        } else {
                            session_result(client_state.submit_input(input))
                        };
                    }
                    _ => {}
                }
            }
            IncomingEvent::Terminal(_) => {}
            IncomingEvent::Tick => {
                // Any event triggers repaint, so no additional action is required.
            }
        }
        client_state.refresh(now);
        while let Some(event) = client_state.next_notable_event() {
            match event {
                NotableEvent::GameStarted => {
                    execute!(stdout, terminal::Clear(terminal::ClearType::All))?;
                }
                NotableEvent::Sound(_) => {
                    // Improvement potential. Distinct sounds for captures and checks.
                    execute!(stdout, style::Print('\u{7}'))?;
                }
                NotableEvent::GameOver(status) => info!("Game over: {status:?}"),
                NotableEvent::ChatMessage { key, display } => {
                    debug!("Chat message in {key}: {display:?}");
                }
                NotableEvent::ConnectionStatusChanged(status) => {
                    info!("Connection status: {status:?}");
                }
            }
        }
        render(&mut stdout, app_start_time, &client_state, &keyboard_input, &command_error)?;
    }
    Ok(())
}
