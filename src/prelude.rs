pub use crate::{
    config::Config,
    result::{AppError, Result},
    AppState,
};
