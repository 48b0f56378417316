//! Wire codec: typed messages and stream framing.

pub mod frame;
pub mod message;

pub use frame::{MAX_FRAME_SIZE, WallCodec};
pub use message::{
    ANIMATION_NONE, Function, Grid, Message, Pixel, STATUS_FAILURE, STATUS_MENU, STATUS_SUCCESS,
    TetrisAction, TextColor, TextMessage, decode_function, decode_game_state, decode_message,
    decode_status, encode_break, encode_connect, encode_disconnect, encode_draw,
    encode_tetris_action, encode_text,
};
