pub use self::{
    board::*, check::*, chess_piece::*, coord::*, home_zone::*, ids::*, movegen::*, potion::*,
    tetromino::*,
};

pub(crate) mod board;
pub(crate) mod check;
pub(crate) mod chess_piece;
pub(crate) mod coord;
pub(crate) mod home_zone;
pub(crate) mod ids;
pub(crate) mod movegen;
pub(crate) mod potion;
pub(crate) mod tetromino;
