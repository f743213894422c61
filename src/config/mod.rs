mod duration;
mod identifier;
mod quota;
mod rate_limit;
mod rules;
mod settings;

pub use duration::{parse_duration, parse_rate_limit_period};
pub use identifier::{IdentifierKind, IdentifierRule};
pub use quota::{BucketKind, QuotaConfig, RawQuotaConfig, TimeZoneChoice};
pub use rate_limit::{RateLimitConfig, RawRateLimitConfig};
pub use rules::{RawIdentifierRule, RuleSet, RuleSetBuilder};
pub use settings::{Settings, StoreConfig};
