//! d20 Core Library
//!
//! EVSE side of an ISO 15118-20 DC charging session.
//! Decoded V2G requests and charge controller events go in; responses and
//! feedback to the charge controller come out. EXI and TCP/TLS stay outside.

pub mod codec;
pub mod config;
pub mod context;
pub mod control;
pub mod driver;
pub mod error;
pub mod feedback;
pub mod message;
pub mod session;
pub mod state;
pub mod timeouts;

pub use codec::{JsonCodec, MessageCodec};
pub use config::{DcTransferLimits, DriverConfig, EvseSetupConfig, SessionConfig};
pub use context::{Context, PauseContext};
pub use control::ControlEvent;
pub use driver::{session_channel, SessionDriver, SessionHandle, SessionOutcome};
pub use error::{CodecError, ConfigError, DriverError};
pub use feedback::{ChannelFeedback, Feedback, FeedbackEvent, NoFeedback, Signal};
pub use message::{Request, Response, ResponseCode, SessionId};
pub use state::{Event, State, Transition};
