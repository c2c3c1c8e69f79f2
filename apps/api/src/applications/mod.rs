// Applications: submission (application + owner notification in one batch),
// applicant edits and withdrawal, owner status changes, and read views.

pub mod handlers;
pub mod queries;
pub mod status;
pub mod submission;
pub mod validation;
