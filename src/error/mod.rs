mod core_error;

pub use core_error::{ConfigError, CoreError, ResolverError, StoreError};
