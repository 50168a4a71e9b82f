mod reservation;
mod service;

pub use self::reservation::*;
pub use self::service::*;
