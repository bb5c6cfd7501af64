pub mod chess;
pub mod games;
pub mod health;
pub mod tournaments;
