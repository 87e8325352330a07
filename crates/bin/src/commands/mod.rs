pub mod reconcile;
pub mod request;
pub mod route;
