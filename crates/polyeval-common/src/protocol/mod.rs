pub mod error;
pub mod fields;
pub mod result;


pub use error::{PolyevalError, Result};
pub use fields::{decode_fields, encode_fields, RequestFields};
pub use result::EvalResult;
