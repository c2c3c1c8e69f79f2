pub mod application;
pub mod job;
pub mod notification;
pub mod user;

pub use application::{Application, ApplicationStatus};
pub use job::{Job, JobSummary, JobType};
pub use notification::{Notification, NotificationKind};
pub use user::{NotificationPreferences, UserProfile, UserType};
