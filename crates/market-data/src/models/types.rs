use std::borrow::Cow;

/// Provider identifier ("exmo", "kraken") - static for built-ins, owned for configured adapters
pub type ProviderId = Cow<'static, str>;
