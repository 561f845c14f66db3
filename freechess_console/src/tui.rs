// Improvement potential. Use `crossterm` instead of `console` for styling, so that only one
//   terminal library is involved.

use chess::{File, Rank, Square};
use console::Style;
use itertools::Itertools;

use freechess_club::chat::{ChatPanel, TextSpan};
use freechess_club::client::{GameRequest, GameRequestKind};
use freechess_club::clock::format_hhmmss;
use freechess_club::force::Force;
use freechess_club::game::{MaterialBalance, PlayerBlock, PlayerStatus};
use freechess_club::highlight::{Highlights, SquareHighlight};
use freechess_club::history::MoveRow;
use freechess_club::piece::{PieceKind, piece_to_pictogram};
use freechess_club::util::expand_fen_rank;


fn chat_line_text(body: &[TextSpan]) -> String {
    body.iter()
        .map(|span| match span {
            TextSpan::Text(text) => text.clone(),
            TextSpan::Link(url) => Style::new().underlined().apply_to(url).to_string(),
            TextSpan::Image(url) => format!("{} [image]", Style::new().underlined().apply_to(url)),
        })
        .join("")
}

fn square_style(square: Square, highlight: SquareHighlight) -> Style {
    let light = (square.get_rank().to_index() + square.get_file().to_index()) % 2 == 1;
    let background = match highlight {
        SquareHighlight::None => {
            if light {
                230
            } else {
                222
            }
        }
        SquareHighlight::LastMove => {
            if light {
                194
            } else {
                108
            }
        }
        SquareHighlight::Premove => 217,
        SquareHighlight::Check => 203,
    };
    Style::new().color256(233).on_color256(background)
}

fn format_square(ch: char) -> String { format!(" {ch} ") }

// Draws a board from the board part of a FEN string. Rank 8 is on top unless viewed from black.
pub fn render_board(position: &str, orientation: Force, highlights: &Highlights) -> String {
    let ranks: Vec<Vec<Option<char>>> =
        position.split('/').filter_map(expand_fen_rank).collect();
    let cell = |rank: usize, file: usize| -> Option<char> {
        // FEN lists rank 8 first.
        ranks.get(7 - rank).and_then(|cells| cells[file])
    };
    let display_ranks: Vec<usize> = match orientation {
        Force::White => (0..8).rev().collect(),
        Force::Black => (0..8).collect(),
    };
    let display_files: Vec<usize> = match orientation {
        Force::White => (0..8).collect(),
        Force::Black => (0..8).rev().collect(),
    };
    let file_header = format!(
        "   {}   \n",
        display_files.iter().map(|&f| format_square((b'a' + f as u8) as char)).join("")
    );
    let mut ret = file_header.clone();
    for &rank in &display_ranks {
        ret.push_str(&format_square((b'1' + rank as u8) as char));
        for &file in &display_files {
            let square = Square::make_square(Rank::from_index(rank), File::from_index(file));
            let pictogram = match cell(rank, file).and_then(PieceKind::from_fen_char) {
                Some((kind, force)) => piece_to_pictogram(kind, force),
                None => ' ',
            };
            let style = square_style(square, highlights.square(square));
            ret.push_str(&style.apply_to(format_square(pictogram)).to_string());
        }
        ret.push_str(&format_square((b'1' + rank as u8) as char));
        ret.push('\n');
    }
    ret.push_str(&file_header);
    ret
}

pub fn render_player(
    block: &PlayerBlock, remaining_secs: i64, low_time: bool, active: bool,
) -> String {
    let mut clock = Style::new();
    if low_time {
        clock = clock.red();
    }
    if active {
        clock = clock.reverse();
    }
    let name_style = match block.status {
        PlayerStatus::Neutral => Style::new().bold(),
        PlayerStatus::Won => Style::new().bold().green(),
        PlayerStatus::Lost => Style::new().bold().red(),
        PlayerStatus::Drawn => Style::new().bold().yellow(),
    };
    let rating = if block.rating.is_empty() { String::new() } else { format!(" ({})", block.rating) };
    format!(
        "{} {}{}",
        clock.apply_to(format_hhmmss(remaining_secs)),
        name_style.apply_to(&block.name),
        rating
    )
}

// Pieces this side is up, e.g. "♟♟ ♞".
pub fn render_material(balance: &MaterialBalance, captured_force: Force, mine: bool) -> String {
    let counts = if mine { &balance.mine } else { &balance.opponent };
    counts
        .iter()
        .filter(|&(_, &n)| n > 0)
        .map(|(kind, &n)| {
            String::from(piece_to_pictogram(kind, captured_force)).repeat(n as usize)
        })
        .join(" ")
}

pub fn render_history(rows: &[MoveRow], max_rows: usize) -> String {
    rows.iter()
        .skip(rows.len().saturating_sub(max_rows))
        .map(|row| {
            format!(
                "{:>3}. {:<8} {}",
                row.number,
                row.white.as_deref().unwrap_or("..."),
                row.black.as_deref().unwrap_or("")
            )
        })
        .join("\n")
}

pub fn render_chat(chat: &ChatPanel, max_lines: usize) -> String {
    let headers = chat
        .tabs()
        .iter()
        .map(|tab| {
            let title = if tab.unread { format!("{}*", tab.title) } else { tab.title.clone() };
            if tab.key == chat.focused() {
                Style::new().reverse().apply_to(format!(" {title} ")).to_string()
            } else {
                format!(" {title} ")
            }
        })
        .join("|");
    let mut ret = format!("{headers}\n");
    if let Some(tab) = chat.focused_tab() {
        for line in tab.visible_lines(max_lines) {
            let text = chat_line_text(&line.body);
            match &line.sender {
                Some(sender) => {
                    let style = if line.mine { Style::new().bold().cyan() } else { Style::new().bold() };
                    ret.push_str(&format!("{}: {}\n", style.apply_to(sender), text));
                }
                None => {
                    ret.push_str(&text);
                    ret.push('\n');
                }
            }
        }
        if tab.scroll_back > 0 {
            let marker = format!("-- {} newer line(s) below, PageDown to read --", tab.scroll_back);
            ret.push_str(&Style::new().dim().apply_to(marker).to_string());
            ret.push('\n');
        }
    }
    ret
}

pub fn render_request(request: &GameRequest) -> String {
    let kind = match request.kind {
        GameRequestKind::Match => "Match",
        GameRequestKind::Takeback => "Takeback",
        GameRequestKind::Abort => "Abort",
        GameRequestKind::Draw => "Draw",
    };
    format!(
        "{} {} {}  (/accept, /decline, /close)",
        Style::new().magenta().apply_to(format!("{kind} Request:")),
        Style::new().bold().apply_to(&request.title),
        request.text
    )
}
