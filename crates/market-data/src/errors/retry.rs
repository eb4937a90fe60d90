/// Classification for retry policy.
///
/// The price coordinator consults it when a provider fails to price a leg:
/// `Never` fails the leg at once, any other class moves on to the next pricing
/// provider on the network. Fan-out aggregation queries every covering
/// provider anyway and only reports failures.
///
/// | Class | Try Next Provider? | Retry This Provider Later? |
/// |-------|-------------------|----------------------------|
/// | `Never` | No | No |
/// | `FailoverWithPenalty` | Yes | Yes |
/// | `NextProvider` | Yes | No |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - bad input or the request has already exhausted every option.
    Never,

    /// Transient failure such as a timeout, reset connection or HTTP 429.
    ///
    /// The caller should move on to the next provider; the same request can be
    /// reissued later without any cleanup.
    FailoverWithPenalty,

    /// This provider cannot serve the request (empty or malformed payload),
    /// but another provider might.
    NextProvider,
}
