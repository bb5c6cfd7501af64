use chess::{Board, BoardStatus, ChessMove, Color, MoveGen, Piece, Square};
use std::str::FromStr;

use crate::{
    models::{
        chess_move::MoveInput,
        game::{Side, STARTING_FEN},
    },
    services::errors::chess_service_errors::ChessServiceError,
};

#[cfg(test)]
use mockall::automock;

/// How a position ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Checkmate,
    Stalemate,
    Draw,
}

/// The chess rules the session server consults. Implementations are pure
/// functions of the position string.
#[cfg_attr(test, automock)]
pub trait RulesProvider: Send + Sync {
    fn initial_position(&self) -> String;

    /// Validates `chess_move` against `fen` and returns the resulting position.
    fn apply_move(&self, fen: &str, chess_move: &MoveInput) -> Result<String, ChessServiceError>;

    /// `None` while the game is still going.
    fn outcome(&self, fen: &str) -> Result<Option<Outcome>, ChessServiceError>;

    fn legal_moves(&self, fen: &str) -> Result<Vec<MoveInput>, ChessServiceError>;

    fn side_to_move(&self, fen: &str) -> Result<Side, ChessServiceError>;
}

/// Halfmove clock value at which the fifty-move rule ends the game.
const FIFTY_MOVE_HALFMOVES: u32 = 100;

#[derive(Clone, Default)]
pub struct ChessService;

impl ChessService {
    pub fn new() -> Self {
        ChessService
    }
}

/// Placement, side to move, castling and en passant: the part of a FEN that
/// identifies a position for repetition purposes.
pub fn position_key(fen: &str) -> String {
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

fn parse_board(fen: &str) -> Result<Board, ChessServiceError> {
    Board::from_str(fen)
        .map_err(|e| ChessServiceError::InvalidPosition(format!("Invalid FEN: {}", e)))
}

/// Halfmove clock and fullmove number, defaulting like most FEN readers do.
fn move_counters(fen: &str) -> (u32, u32) {
    let mut fields = fen.split_whitespace().skip(4);
    let halfmove = fields.next().and_then(|f| f.parse().ok()).unwrap_or(0);
    let fullmove = fields.next().and_then(|f| f.parse().ok()).unwrap_or(1);
    (halfmove, fullmove)
}

fn parse_square(square: &str, label: &str) -> Result<Square, ChessServiceError> {
    Square::from_str(&square.to_ascii_lowercase()).map_err(|_| {
        ChessServiceError::ValidationError(format!("Invalid {} square: {}", label, square))
    })
}

fn parse_promotion(promotion: Option<&str>) -> Result<Option<Piece>, ChessServiceError> {
    match promotion.map(str::to_ascii_lowercase).as_deref() {
        None | Some("") => Ok(None),
        Some("q") => Ok(Some(Piece::Queen)),
        Some("r") => Ok(Some(Piece::Rook)),
        Some("b") => Ok(Some(Piece::Bishop)),
        Some("n") => Ok(Some(Piece::Knight)),
        Some(other) => Err(ChessServiceError::ValidationError(format!(
            "Invalid promotion piece: {}",
            other
        ))),
    }
}

fn promotion_letter(piece: Piece) -> String {
    match piece {
        Piece::Queen => "q",
        Piece::Rook => "r",
        Piece::Bishop => "b",
        Piece::Knight => "n",
        Piece::Pawn => "p",
        Piece::King => "k",
    }
    .to_string()
}

fn insufficient_material(board: &Board) -> bool {
    let pieces = board.combined().popcnt();
    let minors = board.pieces(Piece::Knight).popcnt() + board.pieces(Piece::Bishop).popcnt();
    pieces == 2 || (pieces == 3 && minors == 1)
}

impl RulesProvider for ChessService {
    fn initial_position(&self) -> String {
        STARTING_FEN.to_string()
    }

    fn apply_move(&self, fen: &str, chess_move: &MoveInput) -> Result<String, ChessServiceError> {
        let board = parse_board(fen)?;

        let from_sq = parse_square(&chess_move.from, "from")?;
        let to_sq = parse_square(&chess_move.to, "to")?;
        let promotion = parse_promotion(chess_move.promotion.as_deref())?;
        let candidate = ChessMove::new(from_sq, to_sq, promotion);

        if !MoveGen::new_legal(&board).any(|legal| legal == candidate) {
            return Err(ChessServiceError::IllegalMove(format!(
                "{} is not legal in this position",
                chess_move
            )));
        }

        let (halfmove, fullmove) = move_counters(fen);
        let resets_clock =
            board.piece_on(from_sq) == Some(Piece::Pawn) || board.piece_on(to_sq).is_some();
        let halfmove = if resets_clock { 0 } else { halfmove + 1 };
        let fullmove = if board.side_to_move() == Color::Black {
            fullmove + 1
        } else {
            fullmove
        };

        let new_board = board.make_move_new(candidate);
        Ok(format!(
            "{} {} {}",
            position_key(&new_board.to_string()),
            halfmove,
            fullmove
        ))
    }

    fn outcome(&self, fen: &str) -> Result<Option<Outcome>, ChessServiceError> {
        let board = parse_board(fen)?;
        Ok(match board.status() {
            BoardStatus::Checkmate => Some(Outcome::Checkmate),
            BoardStatus::Stalemate => Some(Outcome::Stalemate),
            BoardStatus::Ongoing => {
                let (halfmove, _) = move_counters(fen);
                if halfmove >= FIFTY_MOVE_HALFMOVES || insufficient_material(&board) {
                    Some(Outcome::Draw)
                } else {
                    None
                }
            }
        })
    }

    /// Legal moves for the current position, for oracles and UI hints.
    fn legal_moves(&self, fen: &str) -> Result<Vec<MoveInput>, ChessServiceError> {
        let board = parse_board(fen)?;

        Ok(MoveGen::new_legal(&board)
            .map(|m| MoveInput {
                from: m.get_source().to_string(),
                to: m.get_dest().to_string(),
                promotion: m.get_promotion().map(promotion_letter),
            })
            .collect())
    }

    fn side_to_move(&self, fen: &str) -> Result<Side, ChessServiceError> {
        let board = parse_board(fen)?;
        Ok(match board.side_to_move() {
            Color::White => Side::White,
            Color::Black => Side::Black,
        })
    }
}
