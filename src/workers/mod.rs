pub mod dedup;
pub mod notification_worker;

pub use dedup::DedupWindow;
pub use notification_worker::{LifecycleState, NotificationWorker, PushEvent, WorkerEvent};
