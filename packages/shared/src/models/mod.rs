pub mod chess_move;
pub mod game;
pub mod join;
pub mod protocol;
pub mod tournament;
pub mod user;
