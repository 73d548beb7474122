mod game_board;
pub use game_board::*;

mod game_session;
pub use game_session::*;

mod game_theme;
pub use game_theme::*;

mod question_state;
pub use question_state::*;

mod user;
pub use user::*;
