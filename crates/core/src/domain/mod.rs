pub mod deliverable;
pub mod request;
pub mod run;
