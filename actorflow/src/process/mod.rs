//! Process-oriented scheduling: one thread per actor, blocking mailboxes,
//! real-time activation requests.

pub mod actor;
pub mod director;
pub mod error;
pub mod model;
pub mod monitor;
pub mod receiver;
pub mod time;

pub use actor::{
    Actor, Firing, FiringContext, Port, PortDirection, PortTypeVars, Schedulable,
    TypeConstrained, TypeRule,
};
pub use director::{Director, DirectorState, RunSummary, StopHandle, StopReason};
pub use error::{ActorError, ActorFailure, DirectorError, ModelError, ReceiverError, Terminated};
pub use model::{ActorId, Connection, Model};
pub use monitor::{ActivityMonitor, ActivitySnapshot};
pub use receiver::{CapacityPolicy, Mailbox, Receivable};
pub use time::{ActivationSchedule, RealTimeClock};
