mod decision;
mod license_key;

pub use decision::*;
pub use license_key::*;
