// Game/move controller: reconciles the local rules engine with position updates from the relay,
// handles local moves and premoves, and keeps everything the board view needs (clocks, capture
// tallies, highlights, history, player blocks).

use enum_map::EnumMap;
use instant::Instant;
use log::{debug, info, warn};
use strum::IntoEnumIterator;

use chess::Square;

use crate::clock::GameClocks;
use crate::engine::{synthesize_fen, MoveRecord, RulesEngine};
use crate::event::{ClientMessage, GameEnd, GameMove};
use crate::force::Force;
use crate::highlight::Highlights;
use crate::history::HistoryNavigator;
use crate::piece::PieceKind;


// Reasons starting from this one are not decisive (abort, draw, adjourn, ...).
pub const FIRST_NON_DECISIVE_REASON: i64 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Premove {
    pub from: Square,
    pub to: Square,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropResult {
    Accepted,
    // The piece returns to its square.
    Snapback,
    Premoved,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sound {
    Move,
    Capture,
    Check,
    Win,
    Lose,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerStatus {
    Neutral,
    Won,
    Lost,
    Drawn,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerBlock {
    pub name: String,
    // Empty when unknown or unrated.
    pub rating: String,
    pub status: PlayerStatus,
}

// Side effects requested by the controller. Executed by the owner, which knows about the session
// and the sound settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEffect {
    Send(ClientMessage),
    Sound(Sound),
    Status(String),
}

// Net material difference: each piece kind appears on at most one side.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MaterialBalance {
    pub mine: EnumMap<PieceKind, u32>,
    pub opponent: EnumMap<PieceKind, u32>,
}

#[derive(Clone, Debug)]
pub struct ActiveGame {
    engine: RulesEngine,
    color: Force,
    observing: bool,
    premove: Option<Premove>,
    // Pieces captured by each force.
    captures: EnumMap<Force, EnumMap<PieceKind, u32>>,
}

impl ActiveGame {
    pub fn engine(&self) -> &RulesEngine { &self.engine }
    pub fn color(&self) -> Force { self.color }
    pub fn is_observing(&self) -> bool { self.observing }
    pub fn premove(&self) -> Option<Premove> { self.premove }
    pub fn captured_by(&self, force: Force) -> &EnumMap<PieceKind, u32> { &self.captures[force] }
    pub fn is_my_turn(&self) -> bool { !self.observing && self.engine.turn() == self.color }
}

impl Default for PlayerBlock {
    fn default() -> Self {
        PlayerBlock { name: String::new(), rating: String::new(), status: PlayerStatus::Neutral }
    }
}

#[derive(Debug)]
pub struct GameController {
    // `None` exactly when no game is in progress.
    game: Option<ActiveGame>,
    // Survives the end of the game so that it can still be browsed; replaced by the next game.
    history: Option<HistoryNavigator>,
    clocks: GameClocks,
    orientation: Force,
    // Board part of the last authoritative position.
    board_position: String,
    player: PlayerBlock,
    opponent: PlayerBlock,
    highlights: Highlights,
    effects: Vec<GameEffect>,
}

impl Default for GameController {
    fn default() -> Self { Self::new() }
}

impl GameController {
    pub fn new() -> Self {
        GameController {
            game: None,
            history: None,
            clocks: GameClocks::new(),
            orientation: Force::White,
            board_position: crate::util::board_part(crate::engine::INITIAL_FEN).to_owned(),
            player: PlayerBlock::default(),
            opponent: PlayerBlock::default(),
            highlights: Highlights::new(),
            effects: Vec::new(),
        }
    }

    pub fn game(&self) -> Option<&ActiveGame> { self.game.as_ref() }
    pub fn is_active(&self) -> bool { self.game.is_some() }
    pub fn history(&self) -> Option<&HistoryNavigator> { self.history.as_ref() }
    pub fn history_mut(&mut self) -> Option<&mut HistoryNavigator> { self.history.as_mut() }
    pub fn clocks(&self) -> &GameClocks { &self.clocks }
    pub fn orientation(&self) -> Force { self.orientation }
    pub fn board_position(&self) -> &str { &self.board_position }
    pub fn player(&self) -> &PlayerBlock { &self.player }
    pub fn opponent(&self) -> &PlayerBlock { &self.opponent }
    pub fn highlights(&self) -> &Highlights { &self.highlights }

    pub fn take_effects(&mut self) -> Vec<GameEffect> { std::mem::take(&mut self.effects) }

    // Position to draw: the browsed history entry, or the live board.
    pub fn displayed_position(&self) -> String {
        match &self.history {
            Some(history) if !history.is_at_end() => {
                crate::util::board_part(&history.current().fen).to_owned()
            }
            _ => self.board_position.clone(),
        }
    }

    pub fn tick(&mut self, now: Instant) {
        if let Some(game) = &self.game {
            self.clocks.tick(now, game.engine.turn());
        }
    }

    // Returns true if the message started a new game.
    pub fn apply_game_move(&mut self, msg: &GameMove, now: Instant) -> bool {
        let started = self.game.is_none();
        if started && !self.start_game(msg, now) {
            return false;
        }
        self.clocks.set_remaining(msg.wtime, msg.btime, now);

        let observing = self.game.as_ref().is_some_and(|game| game.observing);
        // Role -1 echoes the local player's own move, which has been applied already. When
        // observation starts, the move is already part of the loaded position.
        if msg.role >= 0 && msg.has_move() && !(started && observing) {
            let applied = self.game.as_mut().map(|game| game.engine.try_move_san(&msg.move_text));
            match applied {
                Some(Ok(record)) => self.record_move(&record),
                Some(Err(err)) => debug!("Cannot apply {:?}: {err:?}", msg.move_text),
                None => {}
            }
        }
        if !msg.fen.is_empty() {
            self.resync_if_needed(msg);
            self.board_position = msg.fen.clone();
        }

        let premove = match &mut self.game {
            Some(game) if game.is_my_turn() => game.premove.take(),
            _ => None,
        };
        if let Some(premove) = premove {
            self.highlights.clear_premove();
            self.move_piece(premove.from, premove.to);
        }
        started
    }

    // Local move. Sends it to the server if the rules engine accepts it.
    pub fn move_piece(&mut self, from: Square, to: Square) -> DropResult {
        let Some(game) = &mut self.game else {
            return DropResult::Snapback;
        };
        if game.observing {
            return DropResult::Snapback;
        }
        match game.engine.try_move_squares(from, to) {
            Ok(record) => {
                self.effects.push(GameEffect::Send(ClientMessage::command(format!("{from}-{to}"))));
                self.record_move(&record);
                self.board_position = self.game.as_ref().map_or_else(String::new, |g| g.engine.board_fen());
                DropResult::Accepted
            }
            Err(_) => {
                self.highlights.clear_candidates();
                DropResult::Snapback
            }
        }
    }

    // Called when the user picks up a piece. Returns the squares the piece can go to, or `None`
    // if the piece may not be dragged at all.
    pub fn on_drag_start(&mut self, from: Square) -> Option<Vec<Square>> {
        let game = self.game.as_mut()?;
        if game.engine.is_game_over() || game.observing {
            return None;
        }
        match game.engine.piece_at(from) {
            Some((_, force)) if force == game.color => {}
            _ => return None,
        }
        if game.premove.take().is_some() {
            self.highlights.clear_premove();
        }
        let targets = game.engine.legal_targets(from);
        self.highlights.highlight_candidates(from, &targets);
        Some(targets)
    }

    // Called when the user drops a piece. Outside of the local player's turn the move is kept as
    // a premove, replacing any earlier one.
    pub fn on_drop(&mut self, from: Square, to: Square) -> DropResult {
        self.highlights.clear_candidates();
        let Some(game) = &mut self.game else {
            return DropResult::Snapback;
        };
        if game.observing || game.engine.is_game_over() {
            return DropResult::Snapback;
        }
        if game.color != game.engine.turn() && from != to {
            game.premove = Some(Premove { from, to });
            self.highlights.highlight_premove(from, to);
            DropResult::Premoved
        } else {
            self.move_piece(from, to)
        }
    }

    pub fn apply_game_end(&mut self, msg: &GameEnd) {
        let decisive = msg.reason < FIRST_NON_DECISIVE_REASON;
        let (player_status, opponent_status) = if decisive && self.player.name == msg.winner {
            self.effects.push(GameEffect::Sound(Sound::Win));
            (PlayerStatus::Won, PlayerStatus::Lost)
        } else if decisive && self.player.name == msg.loser {
            self.effects.push(GameEffect::Sound(Sound::Lose));
            (PlayerStatus::Lost, PlayerStatus::Won)
        } else {
            (PlayerStatus::Drawn, PlayerStatus::Drawn)
        };
        info!("Game {} over: {}", msg.id, msg.message);
        self.player.status = player_status;
        self.opponent.status = opponent_status;
        self.effects.push(GameEffect::Status(msg.message.clone()));
        self.clocks.stop();
        self.game = None;
    }

    // Undoes half-moves after the opponent granted a takeback.
    pub fn take_back(&mut self, half_moves: u32) {
        if let Some(game) = &mut self.game {
            game.premove = None;
            self.highlights.clear_premove();
            for _ in 0..half_moves {
                game.engine.undo();
            }
            self.board_position = game.engine.board_fen();
        }
        if let Some(history) = &mut self.history {
            for _ in 0..half_moves {
                history.undo();
            }
        }
    }

    // Ratings as announced when the game was created. Non-numeric ratings ("----") are dropped.
    pub fn set_ratings(&mut self, player: Option<u32>, opponent: Option<u32>) {
        let text = |rating: Option<u32>| rating.map_or_else(String::new, |r| r.to_string());
        self.player.rating = text(player);
        self.opponent.rating = text(opponent);
    }

    pub fn material_balance(&self) -> Option<MaterialBalance> {
        let game = self.game.as_ref()?;
        let mine = &game.captures[game.color];
        let theirs = &game.captures[game.color.opponent()];
        let mut balance = MaterialBalance::default();
        for kind in PieceKind::iter() {
            if mine[kind] > theirs[kind] {
                balance.mine[kind] = mine[kind] - theirs[kind];
            } else {
                balance.opponent[kind] = theirs[kind] - mine[kind];
            }
        }
        Some(balance)
    }

    fn start_game(&mut self, msg: &GameMove, now: Instant) -> bool {
        // Roles other than the two playing ones (observation, examination, isolated positions)
        // cannot be moved by the local player.
        let observing = msg.role != 1 && msg.role != -1;
        let color = if msg.role == -1 { Force::Black } else { Force::White };
        let mut engine = RulesEngine::new();
        if observing {
            let fen = synthesize_fen(&msg.fen, Force::from_relay_turn(&msg.turn));
            if let Err(err) = engine.load(&fen) {
                warn!("Cannot observe game {}: {err:?}", msg.game);
                return false;
            }
        }
        info!("Game {} started: {} vs {}", msg.game, msg.wname, msg.bname);
        let (player, opponent) = match color {
            Force::White => (&msg.wname, &msg.bname),
            Force::Black => (&msg.bname, &msg.wname),
        };
        self.player.name = player.clone();
        self.player.status = PlayerStatus::Neutral;
        self.opponent.name = opponent.clone();
        self.opponent.status = PlayerStatus::Neutral;
        self.orientation = color;
        self.clocks.start(msg.wtime, msg.btime, now);
        self.history = Some(HistoryNavigator::new(engine.fen()));
        self.highlights.clear();
        self.effects.push(GameEffect::Status(String::new()));
        self.game = Some(ActiveGame {
            engine,
            color,
            observing,
            premove: None,
            captures: EnumMap::default(),
        });
        true
    }

    fn record_move(&mut self, record: &MoveRecord) {
        let Some(game) = &mut self.game else {
            return;
        };
        self.highlights.highlight_move(record.from, record.to);
        if let Some(kind) = record.captured {
            game.captures[record.force][kind] += 1;
        }
        let check = record.gives_check();
        if check {
            self.highlights.highlight_check(game.engine.king_square(record.force.opponent()));
        }
        if let Some(history) = &mut self.history {
            history.add(Some(record.san.clone()), game.engine.fen());
        }
        let sound = if check {
            Sound::Check
        } else if record.captured.is_some() {
            Sound::Capture
        } else {
            Sound::Move
        };
        self.effects.push(GameEffect::Sound(sound));
    }

    // The server position is authoritative. If the local engine disagrees, reload it.
    fn resync_if_needed(&mut self, msg: &GameMove) {
        let Some(game) = &mut self.game else {
            return;
        };
        if game.engine.board_fen() == msg.fen {
            return;
        }
        warn!("Position desync in game {}: local {}, server {}", msg.game, game.engine.board_fen(), msg.fen);
        let fen = synthesize_fen(&msg.fen, Force::from_relay_turn(&msg.turn));
        if let Err(err) = game.engine.load(&fen) {
            warn!("Cannot resync game {}: {err:?}", msg.game);
            return;
        }
        game.premove = None;
        self.highlights.clear_premove();
        if let Some(history) = &mut self.history {
            history.add(None, game.engine.fen());
        }
    }
}


#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::highlight::SquareHighlight;
    use crate::test_util::*;

    #[test]
    fn observation_loads_full_position() {
        let mut controller = GameController::new();
        let board = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR";
        let msg = GameMove { role: 0, turn: "B".to_owned(), move_text: "e4".to_owned(), ..game_move(board) };
        assert!(controller.apply_game_move(&msg, Instant::now()));
        let game = controller.game().unwrap();
        assert!(game.is_observing());
        assert_eq!(game.engine().turn(), Force::Black);
        assert_eq!(game.engine().board_fen(), board);
        assert_eq!(controller.orientation(), Force::White);
        assert_eq!(controller.history().unwrap().len(), 1);
    }

    #[test]
    fn examined_positions_are_observed() {
        for role in [2, -2, -3] {
            let mut controller = GameController::new();
            let msg = GameMove { role, turn: "W".to_owned(), ..game_move(INITIAL_BOARD) };
            assert!(controller.apply_game_move(&msg, Instant::now()));
            assert!(controller.game().unwrap().is_observing(), "role {role}");
            assert_eq!(controller.orientation(), Force::White, "role {role}");
        }
    }

    #[test]
    fn no_premoves_while_observing() {
        let mut controller = GameController::new();
        let msg = GameMove { role: 0, turn: "B".to_owned(), ..game_move(INITIAL_BOARD) };
        controller.apply_game_move(&msg, Instant::now());
        assert_eq!(controller.on_drop(Square::E2, Square::E4), DropResult::Snapback);
        assert_eq!(controller.game().unwrap().premove(), None);
        assert_eq!(controller.highlights().square(Square::E4), SquareHighlight::None);
    }

    #[test]
    fn observed_moves_are_applied() {
        let mut controller = GameController::new();
        let msg = GameMove { role: 0, turn: "W".to_owned(), ..game_move(INITIAL_BOARD) };
        controller.apply_game_move(&msg, Instant::now());
        let msg = GameMove {
            role: 0,
            turn: "B".to_owned(),
            move_text: "Nf3".to_owned(),
            ..game_move("rnbqkbnr/pppppppp/8/8/8/5N2/PPPPPPPP/RNBQKB1R")
        };
        controller.apply_game_move(&msg, Instant::now());
        assert_eq!(controller.history().unwrap().len(), 2);
        assert_eq!(controller.take_effects().last(), Some(&GameEffect::Sound(Sound::Move)));
    }

    #[test]
    fn local_move_is_sent() {
        let mut controller = GameController::new();
        controller.apply_game_move(&GameMove { role: 1, ..game_move(INITIAL_BOARD) }, Instant::now());
        controller.take_effects();
        assert_eq!(controller.on_drop(Square::E2, Square::E4), DropResult::Accepted);
        assert_eq!(controller.take_effects(), vec![
            GameEffect::Send(ClientMessage::command("e2-e4")),
            GameEffect::Sound(Sound::Move),
        ]);
        assert_eq!(controller.on_drop(Square::E4, Square::E6), DropResult::Premoved);
    }

    #[test]
    fn illegal_local_move_snaps_back() {
        let mut controller = GameController::new();
        assert_eq!(controller.move_piece(Square::E2, Square::E4), DropResult::Snapback);
        controller.apply_game_move(&GameMove { role: 1, ..game_move(INITIAL_BOARD) }, Instant::now());
        assert_eq!(controller.move_piece(Square::E2, Square::E5), DropResult::Snapback);
        assert_eq!(controller.history().unwrap().len(), 1);
        assert!(controller.take_effects().iter().all(|e| !matches!(e, GameEffect::Send(_))));
    }

    #[test]
    fn drag_start_rules() {
        let mut controller = GameController::new();
        assert_eq!(controller.on_drag_start(Square::E2), None);
        controller.apply_game_move(&GameMove { role: -1, ..game_move(INITIAL_BOARD) }, Instant::now());
        assert_eq!(controller.on_drag_start(Square::E2), None);
        // Not our turn yet: the piece can be picked up for a premove, but has no legal targets.
        assert_eq!(controller.on_drag_start(Square::E7), Some(vec![]));
        controller.on_drop(Square::E7, Square::E5);
        assert!(controller.game().unwrap().premove().is_some());
        controller.on_drag_start(Square::D7);
        assert!(controller.game().unwrap().premove().is_none());
    }

    #[test]
    fn capture_tally_and_balance() {
        let mut controller = GameController::new();
        let now = Instant::now();
        controller.apply_game_move(&GameMove { role: 1, ..game_move(INITIAL_BOARD) }, now);
        controller.move_piece(Square::E2, Square::E4);
        let reply = GameMove {
            role: 1,
            move_text: "d5".to_owned(),
            ..game_move("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR")
        };
        controller.apply_game_move(&reply, now);
        controller.take_effects();
        assert_eq!(controller.move_piece(Square::E4, Square::D5), DropResult::Accepted);
        assert_eq!(controller.take_effects().last(), Some(&GameEffect::Sound(Sound::Capture)));
        let game = controller.game().unwrap();
        assert_eq!(game.captured_by(Force::White)[PieceKind::Pawn], 1);
        assert_eq!(game.captured_by(Force::Black)[PieceKind::Pawn], 0);
        let balance = controller.material_balance().unwrap();
        assert_eq!(balance.mine[PieceKind::Pawn], 1);
        assert_eq!(balance.opponent[PieceKind::Pawn], 0);
    }

    #[test]
    fn game_end_results() {
        for (winner, loser, reason, expected) in [
            ("alice", "bob", 2, PlayerStatus::Won),
            ("bob", "alice", 3, PlayerStatus::Lost),
            ("alice", "bob", 4, PlayerStatus::Drawn),
        ] {
            let mut controller = GameController::new();
            let msg = GameMove { role: 1, ..game_move(INITIAL_BOARD) };
            controller.apply_game_move(&msg, Instant::now());
            controller.apply_game_end(&game_end(winner, loser, reason));
            assert!(!controller.is_active());
            assert!(!controller.clocks().is_running());
            assert_eq!(controller.player().status, expected);
        }
    }

    #[test]
    fn takeback_undoes_moves() {
        let mut controller = GameController::new();
        controller.apply_game_move(&GameMove { role: 1, ..game_move(INITIAL_BOARD) }, Instant::now());
        controller.move_piece(Square::E2, Square::E4);
        controller.take_back(1);
        assert_eq!(controller.history().unwrap().len(), 1);
        assert_eq!(controller.board_position(), INITIAL_BOARD);
        assert_eq!(controller.game().unwrap().engine().turn(), Force::White);
    }

    #[test]
    fn ratings() {
        let mut controller = GameController::new();
        controller.set_ratings(Some(1500), None);
        assert_eq!(controller.player().rating, "1500");
        assert_eq!(controller.opponent().rating, "");
    }
}
