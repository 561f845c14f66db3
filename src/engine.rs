// Narrow rules-engine capability on top of the `chess` crate: load a position, apply moves given
// either in algebraic notation (as the relay reports them) or as a pair of squares (as the user
// drags them), query legal targets and undo.

use std::str::FromStr;

use chess::{BoardStatus, ChessMove, MoveGen, Piece, Rank, Square};

use crate::force::Force;
use crate::piece::PieceKind;
use crate::util::expand_fen_rank;


pub const INITIAL_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineError {
    InvalidPosition(String),
    IllegalMove(String),
}

// A move that has been applied, described the way the UI needs it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveRecord {
    pub from: Square,
    pub to: Square,
    pub force: Force,
    pub captured: Option<PieceKind>,
    pub san: String,
}

impl MoveRecord {
    pub fn gives_check(&self) -> bool { crate::highlight::gives_check(&self.san) }
}

#[derive(Clone, Debug)]
pub struct RulesEngine {
    board: chess::Board,
    undo_stack: Vec<chess::Board>,
}

impl Default for RulesEngine {
    fn default() -> Self { Self::new() }
}

impl RulesEngine {
    pub fn new() -> Self { RulesEngine { board: chess::Board::default(), undo_stack: Vec::new() } }

    pub fn from_fen(fen: &str) -> Result<Self, EngineError> {
        let mut engine = Self::new();
        engine.load(fen)?;
        Ok(engine)
    }

    // Replaces the position and forgets the undo history.
    pub fn load(&mut self, fen: &str) -> Result<(), EngineError> {
        self.board = chess::Board::from_str(fen)
            .map_err(|err| EngineError::InvalidPosition(format!("{fen}: {err}")))?;
        self.undo_stack.clear();
        Ok(())
    }

    pub fn fen(&self) -> String { self.board.to_string() }
    pub fn board_fen(&self) -> String {
        let fen = self.fen();
        crate::util::board_part(&fen).to_owned()
    }
    pub fn turn(&self) -> Force { self.board.side_to_move().into() }
    pub fn is_game_over(&self) -> bool { self.board.status() != BoardStatus::Ongoing }
    pub fn king_square(&self, force: Force) -> Square { self.board.king_square(force.into()) }

    pub fn piece_at(&self, square: Square) -> Option<(PieceKind, Force)> {
        let piece = self.board.piece_on(square)?;
        let color = self.board.color_on(square)?;
        Some((piece.into(), color.into()))
    }

    pub fn legal_targets(&self, from: Square) -> Vec<Square> {
        let mut targets: Vec<_> = MoveGen::new_legal(&self.board)
            .filter(|mv| mv.get_source() == from)
            .map(|mv| mv.get_dest())
            .collect();
        // Promotions produce one move per piece.
        targets.dedup();
        targets
    }

    // Applies a move in algebraic notation. Accepts check marks and annotations, castling written
    // with zeros, promotion with or without "=", and coordinate notation ("e2e4", "e7-e8q").
    pub fn try_move_san(&mut self, notation: &str) -> Result<MoveRecord, EngineError> {
        let wanted = normalize_san(notation);
        let found = MoveGen::new_legal(&self.board)
            .find(|&mv| strip_decorations(&san_without_suffix(&self.board, mv)) == wanted)
            .or_else(|| parse_coordinate_move(&wanted).filter(|&mv| self.board.legal(mv)));
        match found {
            Some(mv) => Ok(self.apply(mv)),
            None => Err(EngineError::IllegalMove(notation.to_owned())),
        }
    }

    // Applies a move given by its squares. Pawns reaching the last rank always become queens.
    pub fn try_move_squares(&mut self, from: Square, to: Square) -> Result<MoveRecord, EngineError> {
        let promotion = (self.board.piece_on(from) == Some(Piece::Pawn)
            && matches!(to.get_rank(), Rank::First | Rank::Eighth))
        .then_some(Piece::Queen);
        let mv = ChessMove::new(from, to, promotion);
        if !self.board.legal(mv) {
            return Err(EngineError::IllegalMove(format!("{from}-{to}")));
        }
        Ok(self.apply(mv))
    }

    pub fn undo(&mut self) -> bool {
        match self.undo_stack.pop() {
            Some(board) => {
                self.board = board;
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, mv: ChessMove) -> MoveRecord {
        let (from, to) = (mv.get_source(), mv.get_dest());
        let moving = self.board.piece_on(from);
        let captured = match self.board.piece_on(to) {
            Some(piece) => Some(piece.into()),
            // En passant: a pawn changing file onto an empty square.
            None if moving == Some(Piece::Pawn) && from.get_file() != to.get_file() => {
                Some(PieceKind::Pawn)
            }
            None => None,
        };
        let record = MoveRecord {
            from,
            to,
            force: self.turn(),
            captured,
            san: san(&self.board, mv),
        };
        self.undo_stack.push(self.board);
        self.board = self.board.make_move_new(mv);
        record
    }
}

// Full position for a bare board. The relay does not send castling rights, so they are inferred
// from king and rook placement. En passant and move counters are unknown.
pub fn synthesize_fen(board: &str, turn: Force) -> String {
    let ranks: Vec<_> = board.split('/').collect();
    let at = |rank_index: usize, file_index: usize| -> Option<char> {
        ranks.get(rank_index).and_then(|rank| expand_fen_rank(rank)).and_then(|cells| cells[file_index])
    };
    let mut castling = String::new();
    if at(7, 4) == Some('K') {
        if at(7, 7) == Some('R') {
            castling.push('K');
        }
        if at(7, 0) == Some('R') {
            castling.push('Q');
        }
    }
    if at(0, 4) == Some('k') {
        if at(0, 7) == Some('r') {
            castling.push('k');
        }
        if at(0, 0) == Some('r') {
            castling.push('q');
        }
    }
    if castling.is_empty() {
        castling.push('-');
    }
    format!("{board} {} {castling} - 0 1", turn.to_fen_char())
}

pub fn san(board: &chess::Board, mv: ChessMove) -> String {
    let mut ret = san_without_suffix(board, mv);
    let next = board.make_move_new(mv);
    if next.status() == BoardStatus::Checkmate {
        ret.push('#');
    } else if next.checkers().popcnt() > 0 {
        ret.push('+');
    }
    ret
}

fn san_without_suffix(board: &chess::Board, mv: ChessMove) -> String {
    let (from, to) = (mv.get_source(), mv.get_dest());
    let Some(piece) = board.piece_on(from) else {
        return mv.to_string();
    };
    let file_char = |sq: Square| (b'a' + sq.get_file().to_index() as u8) as char;
    let rank_char = |sq: Square| (b'1' + sq.get_rank().to_index() as u8) as char;

    if piece == Piece::King && from.get_file().to_index().abs_diff(to.get_file().to_index()) == 2 {
        return if to.get_file().to_index() > from.get_file().to_index() {
            "O-O".to_owned()
        } else {
            "O-O-O".to_owned()
        };
    }

    let mut ret = PieceKind::from(piece).to_algebraic_for_move().to_owned();
    if piece != Piece::Pawn && piece != Piece::King {
        let rivals: Vec<Square> = MoveGen::new_legal(board)
            .filter(|other| {
                other.get_dest() == to
                    && other.get_source() != from
                    && board.piece_on(other.get_source()) == Some(piece)
            })
            .map(|other| other.get_source())
            .collect();
        if !rivals.is_empty() {
            let same_file = rivals.iter().any(|sq| sq.get_file() == from.get_file());
            let same_rank = rivals.iter().any(|sq| sq.get_rank() == from.get_rank());
            if !same_file {
                ret.push(file_char(from));
            } else if !same_rank {
                ret.push(rank_char(from));
            } else {
                ret.push(file_char(from));
                ret.push(rank_char(from));
            }
        }
    }
    let is_capture = board.piece_on(to).is_some()
        || (piece == Piece::Pawn && from.get_file() != to.get_file());
    if is_capture {
        if piece == Piece::Pawn {
            ret.push(file_char(from));
        }
        ret.push('x');
    }
    ret.push(file_char(to));
    ret.push(rank_char(to));
    if let Some(promotion) = mv.get_promotion() {
        ret.push('=');
        ret.push_str(PieceKind::from(promotion).to_algebraic_for_move());
    }
    ret
}

fn normalize_san(notation: &str) -> String {
    let trimmed = notation.trim().trim_end_matches(['+', '#', '!', '?']);
    let castling = trimmed.replace('0', "O").replace('o', "O");
    let trimmed = if castling == "O-O" || castling == "O-O-O" { castling.as_str() } else { trimmed };
    strip_decorations(trimmed)
}

fn strip_decorations(san: &str) -> String { san.replace('=', "") }

fn parse_coordinate_move(notation: &str) -> Option<ChessMove> {
    let notation = notation.replace('-', "").to_lowercase();
    let from = Square::from_str(notation.get(0..2)?).ok()?;
    let to = Square::from_str(notation.get(2..4)?).ok()?;
    let promotion = match notation.get(4..) {
        None | Some("") => None,
        Some("q") => Some(Piece::Queen),
        Some("r") => Some(Piece::Rook),
        Some("b") => Some(Piece::Bishop),
        Some("n") => Some(Piece::Knight),
        Some(_) => return None,
    };
    Some(ChessMove::new(from, to, promotion))
}


#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn play(engine: &mut RulesEngine, moves: &[&str]) {
        for mv in moves {
            engine.try_move_san(mv).unwrap();
        }
    }

    #[test]
    fn applies_algebraic_moves() {
        let mut engine = RulesEngine::new();
        let record = engine.try_move_san("e4").unwrap();
        assert_eq!(record.from, Square::E2);
        assert_eq!(record.to, Square::E4);
        assert_eq!(record.force, Force::White);
        assert_eq!(record.captured, None);
        assert_eq!(engine.turn(), Force::Black);
        assert_eq!(engine.board_fen(), "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR");
    }

    #[test]
    fn rejects_illegal_moves() {
        let mut engine = RulesEngine::new();
        assert_eq!(engine.try_move_san("e5"), Err(EngineError::IllegalMove("e5".to_owned())));
        assert_eq!(
            engine.try_move_squares(Square::E2, Square::E5),
            Err(EngineError::IllegalMove("e2-e5".to_owned()))
        );
        assert_eq!(engine.fen(), RulesEngine::new().fen());
    }

    #[test]
    fn captures_and_checks() {
        let mut engine = RulesEngine::new();
        play(&mut engine, &["e4", "d5"]);
        let record = engine.try_move_san("exd5").unwrap();
        assert_eq!(record.captured, Some(PieceKind::Pawn));
        play(&mut engine, &["Qxd5", "Nc3"]);
        let record = engine.try_move_san("Qe5+").unwrap();
        assert_eq!(record.san, "Qe5+");
        assert!(record.gives_check());
    }

    #[test]
    fn en_passant_counts_as_capture() {
        let mut engine = RulesEngine::new();
        play(&mut engine, &["e4", "a6", "e5", "d5"]);
        let record = engine.try_move_squares(Square::E5, Square::D6).unwrap();
        assert_eq!(record.captured, Some(PieceKind::Pawn));
        assert_eq!(record.san, "exd6");
    }

    #[test]
    fn castling_notations() {
        let mut engine = RulesEngine::new();
        play(&mut engine, &["e4", "e5", "Nf3", "Nc6", "Bc4", "Bc5"]);
        let record = engine.try_move_san("0-0").unwrap();
        assert_eq!(record.san, "O-O");
        assert_eq!(engine.piece_at(Square::G1), Some((PieceKind::King, Force::White)));
    }

    #[test]
    fn disambiguation() {
        let mut engine = RulesEngine::from_fen("4k3/8/8/8/8/8/4K3/R6R w - - 0 1").unwrap();
        let record = engine.try_move_san("Rad1").unwrap();
        assert_eq!(record.from, Square::A1);
        assert_eq!(record.san, "Rad1");
    }

    #[test]
    fn promotion_to_queen_by_default() {
        let mut engine = RulesEngine::from_fen("8/4P3/8/8/8/8/k7/4K3 w - - 0 1").unwrap();
        let record = engine.try_move_squares(Square::E7, Square::E8).unwrap();
        assert_eq!(record.san, "e8=Q");
        assert_eq!(engine.piece_at(Square::E8), Some((PieceKind::Queen, Force::White)));
        assert!(engine.undo());
        engine.try_move_san("e8Q").unwrap();
        assert_eq!(engine.piece_at(Square::E8), Some((PieceKind::Queen, Force::White)));
    }

    #[test]
    fn legal_targets_of_knight() {
        let engine = RulesEngine::new();
        let mut targets = engine.legal_targets(Square::G1);
        targets.sort();
        assert_eq!(targets, vec![Square::F3, Square::H3]);
        assert!(engine.legal_targets(Square::E7).is_empty());
    }

    #[test]
    fn undo_restores_position() {
        let mut engine = RulesEngine::new();
        play(&mut engine, &["e4", "e5"]);
        assert!(engine.undo());
        assert!(engine.undo());
        assert!(!engine.undo());
        assert_eq!(engine.fen(), RulesEngine::new().fen());
    }

    #[test]
    fn synthesized_fen_infers_castling() {
        let initial = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";
        assert_eq!(synthesize_fen(initial, Force::White), INITIAL_FEN);
        let moved = "r3k3/8/8/8/8/8/8/4K2R";
        assert_eq!(synthesize_fen(moved, Force::Black), "r3k3/8/8/8/8/8/8/4K2R b Kq - 0 1");
        assert_eq!(
            synthesize_fen("8/8/8/8/8/8/8/k6K", Force::White),
            "8/8/8/8/8/8/8/k6K w - - 0 1"
        );
        assert!(RulesEngine::from_fen(&synthesize_fen(moved, Force::Black)).is_ok());
    }
}
