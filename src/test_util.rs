// Sample relay messages shared by unit tests and the integration tests in "tests".

use crate::event::{FreeText, GameEnd, GameMove, ServerMessage};


pub const INITIAL_BOARD: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";

// Position update in a 5 minute game between "alice" (white) and "bob" (black). Callers override
// role, turn and move with struct update syntax.
pub fn game_move(board: &str) -> GameMove {
    GameMove {
        fen: board.to_owned(),
        turn: "W".to_owned(),
        game: 117,
        wname: "alice".to_owned(),
        bname: "bob".to_owned(),
        role: 1,
        time: 5,
        inc: 0,
        wtime: 300,
        btime: 300,
        ..GameMove::default()
    }
}

pub fn game_end(winner: &str, loser: &str, reason: i64) -> GameEnd {
    GameEnd {
        id: 117,
        winner: winner.to_owned(),
        loser: loser.to_owned(),
        reason,
        message: format!("{winner} vs. {loser}: game over"),
    }
}

pub fn server_text(text: &str) -> ServerMessage {
    ServerMessage::Unknown(FreeText { text: text.to_owned() })
}
