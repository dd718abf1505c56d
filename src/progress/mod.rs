//! Progress display: the bar widget and the server-polling reporter

mod bar;
mod poll;

pub use bar::ProgressBar;
pub use poll::{
    attach_token, PollEnd, PollHandle, PollRegistry, PollTick, ProgressPoller, ProgressToken,
    TransferStatus, PROGRESS_PARAM,
};
