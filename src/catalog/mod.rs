pub mod param_type;
pub use param_type::*;

pub mod field_reference;
pub use field_reference::*;

pub mod table_info;
pub use table_info::*;

pub mod return_type;
pub use return_type::*;

pub mod parameter_catalog;
pub use parameter_catalog::*;

pub mod manga;
pub use manga::*;
