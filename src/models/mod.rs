pub mod appointment;
pub mod enums;
pub mod filters;
pub mod health_metric;
pub mod hospital;
pub mod user;

pub use appointment::*;
pub use enums::*;
pub use filters::*;
pub use health_metric::*;
pub use hospital::*;
pub use user::*;
