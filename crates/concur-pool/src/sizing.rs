//! Pool sizing and the pool-sizes provider chain.

use concur_core::{Error, Result};

/// `core = max = 4`, the hard-wired fallback described in spec §6.
pub const DEFAULT_POOL_SIZE: u32 = 4;

/// A validated `(core, max)` pair: `1 <= core <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSizes {
    core: u32,
    max: u32,
}

impl PoolSizes {
    /// `core == max == size` (spec's "fixed" variant).
    pub fn fixed(size: u32) -> Result<Self> {
        Self::custom(size, size)
    }

    /// An independent core/max pair (spec's "custom" variant).
    pub fn custom(core: u32, max: u32) -> Result<Self> {
        if core < 1 {
            return Err(Error::invalid_argument(format!(
                "pool core size must be >= 1, got {core}"
            )));
        }
        if max < core {
            return Err(Error::invalid_argument(format!(
                "pool max size ({max}) must be >= core size ({core})"
            )));
        }
        Ok(Self { core, max })
    }

    /// `core == max == floor(cpuCount * factor)`, floored at 1 (spec's
    /// "cpu-derived" variant).
    #[must_use]
    pub fn of_cpus(factor: f64) -> Self {
        let cpus = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1);
        let sized = ((cpus as f64) * factor).floor() as u32;
        let sized = sized.max(1);
        Self {
            core: sized,
            max: sized,
        }
    }

    /// `core == max == 4` (spec's "default" variant).
    #[must_use]
    pub const fn default_sizes() -> Self {
        Self {
            core: DEFAULT_POOL_SIZE,
            max: DEFAULT_POOL_SIZE,
        }
    }

    /// The minimum number of workers the pool keeps alive.
    #[must_use]
    pub const fn core(self) -> u32 {
        self.core
    }

    /// The maximum number of workers the pool may grow to.
    #[must_use]
    pub const fn max(self) -> u32 {
        self.max
    }
}

impl Default for PoolSizes {
    fn default() -> Self {
        Self::default_sizes()
    }
}

/// Opaque license context threaded through to pool-sizes providers.
///
/// The default provider ignores it entirely; hosts that gate larger pool
/// sizes behind a license tier can carry whatever they need in `token`.
#[derive(Debug, Clone, Default)]
pub struct LicenseState {
    token: Option<String>,
}

impl LicenseState {
    /// An unlicensed state — equivalent to "no license present".
    #[must_use]
    pub fn none() -> Self {
        Self { token: None }
    }

    /// A licensed state carrying an opaque token.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// The opaque license token, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

/// A candidate source of [`PoolSizes`].
///
/// Several providers can be registered; the one with the highest
/// [`priority`](PoolSizesProvider::priority) whose
/// [`pool_sizes`](PoolSizesProvider::pool_sizes) returns `Some` wins. A
/// [`DefaultPoolSizesProvider`] at the minimum priority should always be
/// registered last as a guaranteed fallback.
pub trait PoolSizesProvider: Send + Sync {
    /// Higher wins. Ties are broken arbitrarily (last one checked wins).
    fn priority(&self) -> i32;

    /// Returns this provider's pool sizes, or `None` if it declines to
    /// provide one for the given license state.
    fn pool_sizes(&self, license: &LicenseState) -> Option<PoolSizes>;
}

/// The always-present fallback provider: [`PoolSizes::default_sizes`],
/// regardless of license state, at the minimum possible priority.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPoolSizesProvider;

impl PoolSizesProvider for DefaultPoolSizesProvider {
    fn priority(&self) -> i32 {
        i32::MIN
    }

    fn pool_sizes(&self, _license: &LicenseState) -> Option<PoolSizes> {
        Some(PoolSizes::default_sizes())
    }
}

/// Resolves the effective [`PoolSizes`] from a provider chain: the
/// highest-priority provider that returns `Some` wins, falling back to
/// [`PoolSizes::default_sizes`] if every provider declines (which should
/// not happen if a [`DefaultPoolSizesProvider`] is present).
#[must_use]
pub fn resolve_pool_sizes(
    providers: &[&dyn PoolSizesProvider],
    license: &LicenseState,
) -> PoolSizes {
    providers
        .iter()
        .filter_map(|provider| {
            provider
                .pool_sizes(license)
                .map(|sizes| (provider.priority(), sizes))
        })
        .max_by_key(|(priority, _)| *priority)
        .map(|(_, sizes)| sizes)
        .unwrap_or_else(PoolSizes::default_sizes)
}
