use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::QuotaConfig;
use crate::storage::{keys, KeyValueStore, StoreError};

use super::oracle::{EntitlementOracle, OracleError, ProductId, PurchaseOutcome};

/// Persisted quota state after the daily window has been rolled forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitlementState {
    pub daily_scans_used: u32,
    pub last_reset_date: NaiveDate,
    pub scan_credits: u32,
    pub has_premium_access: bool,
}

/// Reason a scan attempt is allowed, in precedence order: premium access
/// first, then purchased credits, then the free daily quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPermit {
    Premium,
    Credit,
    FreeQuota,
}

/// Derived remaining-allowance view for display. Read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScansRemaining {
    Unlimited,
    Credits(u32),
    /// Free-tier remainder; resets at the next calendar day.
    FreeToday(u32),
}

impl fmt::Display for ScansRemaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScansRemaining::Unlimited => write!(f, "Unlimited"),
            ScansRemaining::Credits(count) => write!(f, "{count} credits"),
            ScansRemaining::FreeToday(count) => write!(f, "{count} free today"),
        }
    }
}

/// Error raised while recording a completed scan.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A scan was reported as completed while no allowance permits one. The
    /// pipeline cannot reach this; it indicates a caller recording usage
    /// without checking the gate first.
    #[error("scan recorded without an active permit")]
    NotPermitted,
}

/// Error raised by the purchase and restore flows.
#[derive(Debug, thiserror::Error)]
pub enum PurchaseError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error("purchase completed for unknown product '{0}'")]
    UnknownProduct(String),
}

/// Decides whether the user may perform a scan and records the effect of a
/// performed one.
///
/// All quota state lives in the host key-value store under scoped keys; the
/// gate owns every mutation of it. Each operation is a read-modify-write of
/// the latest persisted values inside one mutex-guarded critical section, so
/// a UI refresh racing a scan completion cannot lose an update.
pub struct EntitlementGate<S, O, C> {
    store: Arc<S>,
    oracle: Arc<O>,
    clock: Arc<C>,
    config: QuotaConfig,
    write_lock: Mutex<()>,
}

impl<S, O, C> EntitlementGate<S, O, C>
where
    S: KeyValueStore,
    O: EntitlementOracle,
    C: Clock,
{
    pub fn new(store: Arc<S>, oracle: Arc<O>, clock: Arc<C>, config: QuotaConfig) -> Self {
        Self {
            store,
            oracle,
            clock,
            config,
            write_lock: Mutex::new(()),
        }
    }

    /// Roll the free-scan counter into the current calendar day. Idempotent
    /// within a day: only the first call after a date change mutates state.
    /// Every quota decision applies the roll internally, so explicit calls
    /// are only needed to eagerly refresh after loading persisted state.
    pub fn refresh_daily_window(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().expect("gate mutex poisoned");
        self.load_rolled()?;
        Ok(())
    }

    /// Whether a scan attempt may proceed right now. A `false` return is a
    /// normal outcome the caller checks before running inference, not an
    /// error.
    pub fn can_scan(&self) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().expect("gate mutex poisoned");
        let state = self.load_rolled()?;
        Ok(self.permit_for(&state).is_some())
    }

    /// Current rolled state, for display and diagnostics.
    pub fn state(&self) -> Result<EntitlementState, StoreError> {
        let _guard = self.write_lock.lock().expect("gate mutex poisoned");
        self.load_rolled()
    }

    /// Record one successfully completed scan, consuming whichever allowance
    /// permits it: premium consumes nothing, a credit is decremented, the
    /// free path increments the daily counter.
    ///
    /// The permitting reason is derived once, from the latest persisted state
    /// inside the critical section, using the same precedence as `can_scan`.
    /// The check and the recording therefore cannot diverge.
    pub fn record_scan(&self) -> Result<ScanPermit, GateError> {
        let _guard = self.write_lock.lock().expect("gate mutex poisoned");
        let mut state = self.load_rolled()?;
        let permit = self.permit_for(&state).ok_or(GateError::NotPermitted)?;

        match permit {
            ScanPermit::Premium => {}
            ScanPermit::Credit => {
                state.scan_credits -= 1;
                self.store
                    .set(keys::SCAN_CREDITS, &state.scan_credits.to_string())?;
            }
            ScanPermit::FreeQuota => {
                state.daily_scans_used += 1;
                self.store
                    .set(keys::DAILY_SCANS_USED, &state.daily_scans_used.to_string())?;
            }
        }

        info!(
            ?permit,
            used = state.daily_scans_used,
            credits = state.scan_credits,
            "scan recorded"
        );
        Ok(permit)
    }

    /// Remaining-allowance view: unlimited for premium, then the credit
    /// balance, then what is left of today's free quota.
    pub fn scans_remaining(&self) -> Result<ScansRemaining, StoreError> {
        let _guard = self.write_lock.lock().expect("gate mutex poisoned");
        let state = self.load_rolled()?;

        if state.has_premium_access {
            Ok(ScansRemaining::Unlimited)
        } else if state.scan_credits > 0 {
            Ok(ScansRemaining::Credits(state.scan_credits))
        } else {
            let left = self
                .config
                .free_daily_limit
                .saturating_sub(state.daily_scans_used);
            Ok(ScansRemaining::FreeToday(left))
        }
    }

    /// Refresh the cached premium flag from the oracle, returning the
    /// effective value. When the oracle is unreachable the last cached value
    /// stands: a transient network error must not revoke a paying user's
    /// access.
    pub fn refresh_premium(&self) -> Result<bool, StoreError> {
        match self.oracle.entitlement_status() {
            Ok(status) => {
                let _guard = self.write_lock.lock().expect("gate mutex poisoned");
                self.write_premium(status.premium_active)?;
                Ok(status.premium_active)
            }
            Err(err) => {
                warn!(%err, "entitlement oracle unreachable, keeping cached premium flag");
                let _guard = self.write_lock.lock().expect("gate mutex poisoned");
                Ok(self.read_flag(keys::PREMIUM_CACHED)?)
            }
        }
    }

    /// Run a purchase through the oracle and apply a completed grant: the
    /// configured premium product sets the premium flag, a credit pack adds
    /// its credits. Cancelled and failed outcomes change no state.
    pub fn purchase(&self, product: &ProductId) -> Result<PurchaseOutcome, PurchaseError> {
        let outcome = self.oracle.purchase(product)?;
        if outcome == PurchaseOutcome::Completed {
            self.apply_grant(product)?;
        }
        Ok(outcome)
    }

    /// Replay past purchases; a completed restore re-establishes premium.
    pub fn restore(&self) -> Result<PurchaseOutcome, PurchaseError> {
        let outcome = self.oracle.restore()?;
        if outcome == PurchaseOutcome::Completed {
            let _guard = self.write_lock.lock().expect("gate mutex poisoned");
            self.write_premium(true)?;
        }
        Ok(outcome)
    }

    fn apply_grant(&self, product: &ProductId) -> Result<(), PurchaseError> {
        let _guard = self.write_lock.lock().expect("gate mutex poisoned");

        if product == &self.config.premium_product {
            self.write_premium(true)?;
            info!("premium access granted");
            return Ok(());
        }

        match self.config.credits_for(product) {
            Some(granted) => {
                let total = self.read_counter(keys::SCAN_CREDITS)? + granted;
                self.store.set(keys::SCAN_CREDITS, &total.to_string())?;
                info!(granted, total, "scan credits granted");
                Ok(())
            }
            None => Err(PurchaseError::UnknownProduct(product.0.clone())),
        }
    }

    fn permit_for(&self, state: &EntitlementState) -> Option<ScanPermit> {
        if state.has_premium_access {
            Some(ScanPermit::Premium)
        } else if state.scan_credits > 0 {
            Some(ScanPermit::Credit)
        } else if state.daily_scans_used < self.config.free_daily_limit {
            Some(ScanPermit::FreeQuota)
        } else {
            None
        }
    }

    /// Load the persisted state, rolling the daily window when the stored
    /// reset date is not today. Callers must hold the write lock.
    fn load_rolled(&self) -> Result<EntitlementState, StoreError> {
        let today = self.clock.today();

        let last_reset_date = match self.read_date(keys::LAST_RESET_DATE)? {
            Some(date) => date,
            None => {
                self.store.set(keys::LAST_RESET_DATE, &today.to_string())?;
                today
            }
        };

        let mut state = EntitlementState {
            daily_scans_used: self.read_counter(keys::DAILY_SCANS_USED)?,
            last_reset_date,
            scan_credits: self.read_counter(keys::SCAN_CREDITS)?,
            has_premium_access: self.read_flag(keys::PREMIUM_CACHED)?,
        };

        if state.last_reset_date != today {
            state.daily_scans_used = 0;
            state.last_reset_date = today;
            self.store.set(keys::DAILY_SCANS_USED, "0")?;
            self.store.set(keys::LAST_RESET_DATE, &today.to_string())?;
            info!(%today, "daily scan window reset");
        }

        Ok(state)
    }

    fn write_premium(&self, active: bool) -> Result<(), StoreError> {
        self.store
            .set(keys::PREMIUM_CACHED, if active { "true" } else { "false" })
    }

    // Unreadable stored values are recovered locally to their defaults; the
    // gate must keep answering even when a key is corrupt.

    fn read_counter(&self, key: &str) -> Result<u32, StoreError> {
        match self.store.get(key)? {
            None => Ok(0),
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(value) => Ok(value),
                Err(_) => {
                    warn!(key, raw = %raw, "stored counter unreadable, resetting to 0");
                    self.store.set(key, "0")?;
                    Ok(0)
                }
            },
        }
    }

    fn read_date(&self, key: &str) -> Result<Option<NaiveDate>, StoreError> {
        match self.store.get(key)? {
            None => Ok(None),
            Some(raw) => match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
                Ok(date) => Ok(Some(date)),
                Err(_) => {
                    warn!(key, raw = %raw, "stored date unreadable, discarding");
                    self.store.remove(key)?;
                    Ok(None)
                }
            },
        }
    }

    fn read_flag(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self
            .store
            .get(key)?
            .map(|raw| raw.trim() == "true")
            .unwrap_or(false))
    }
}
