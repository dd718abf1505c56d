//! Client for a digital repository's document upload panel
//!
//! Talks to the repository's screen endpoints to create documents, upload
//! their files in `Content-Range` chunks, follow server-side upload progress
//! and keep a panel's ordered list of documents in step with the server.
//! Everything the user should see is reported through an [`EventSink`].

pub mod config;
pub mod documents;
pub mod error;
pub mod events;
pub mod http;
pub mod phrase;
pub mod progress;
pub mod upload;

pub use config::ClientConfig;
pub use documents::{DocumentPanel, PanelRegistry};
pub use error::{ClientError, Result};
pub use events::{ChannelSink, EventSink, LogSink, UiEvent};
pub use http::{FormParams, ScreenClient};
pub use phrase::PhraseClient;
pub use progress::{ProgressBar, ProgressPoller, ProgressToken};
pub use upload::{UploadController, UploadTask};
