use std::time::Duration;

use crate::cursor::ScanArgs;

/// Runtime knobs of a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// How long the async client waits on a completion handle. `None` waits
    /// indefinitely.
    pub timeout: Option<Duration>,
    /// `COUNT` hint sent with scans that were given no `ScanArgs`.
    pub scan_count: Option<u64>,
}

impl ClientOptions {
    /// Scan arguments to send: the caller's if any, otherwise the default
    /// count hint.
    pub(crate) fn scan_args(
        &self,
        args: Option<&ScanArgs>,
    ) -> Option<ScanArgs> {
        match (args, self.scan_count) {
            (Some(args), _) => Some(args.clone()),
            (None, Some(count)) => Some(ScanArgs::new().limit(count)),
            (None, None) => None,
        }
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            scan_count: None,
        }
    }
}
