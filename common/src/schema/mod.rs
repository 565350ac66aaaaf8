mod charge;
mod package;
mod router;
mod status;
mod transaction;
mod users;
mod voucher;

pub use charge::*;
pub use package::*;
pub use router::*;
pub use status::*;
pub use transaction::*;
pub use users::*;
pub use voucher::*;
