pub mod notification;
pub mod subscription;
pub mod worker;

pub use notification::{NotificationData, NotificationOptions, NotificationPayload, ShownNotification};
pub use subscription::{ApplicationServerKey, PushSubscription, PushSubscriptionKeys, SubscribeOptions};
pub use worker::{Permission, SwStatus, WorkerRegistration, WorkerState};
