//! Filing-burn formula, success-burn, and per-user daily accounting
//! (spec.md §4.3). Deposit escrow/refund/forfeiture for anti-Sybil
//! resistance lives alongside it since both read and write the same
//! `UserDaily`/`Deposit` state region (spec.md §5).

use chrono::Utc;

use medi_config::{BurnConfig, SybilConfig};
use medi_core::{Author, BurnRecord, BurnRecordId, BurnType, Deposit, DepositId, DepositStatus, UserDaily};

/// Compute the filing burn owed for submission ordinal `n` (1-based) on a
/// day where the author has already made `n-1` submissions.
///
/// spec.md §4.3: `n <= freeDailySubmissions` is free; otherwise
/// `amount = baseFilingBurn * escalationBase^((n-freeDailySubmissions)*escalationExponent) * (loadScalingEnabled ? loadMultiplier : 1)`.
pub fn filing_burn(config: &BurnConfig, n: u32, load_multiplier: f64, load_scaling_enabled: bool) -> f64 {
    if n <= config.free_daily_submissions {
        return 0.0;
    }
    let escalation_steps = (n - config.free_daily_submissions) as f64 * config.escalation_exponent;
    let base = config.base_filing_burn * config.escalation_base.powf(escalation_steps);
    if load_scaling_enabled {
        base * load_multiplier
    } else {
        base
    }
}

/// Success burn on settlement closure: `settlementValue *
/// successBurnPercentage`, skipped (returns 0) below the dust floor.
pub fn success_burn(config: &BurnConfig, settlement_value: f64) -> f64 {
    let amount = settlement_value * config.success_burn_percentage;
    if amount < medi_core::MIN_SUCCESS_BURN {
        0.0
    } else {
        amount
    }
}

/// Today's date in UTC, `YYYY-MM-DD`, matching `UserDaily.date`'s key.
pub fn today_utc() -> String {
    Utc::now().date_naive().to_string()
}

/// In-memory burn ledger: per-author daily counters, burn history, and
/// active deposits. Persistence is the caller's responsibility (via
/// `medi_core::store::EntityTree`); this type holds only the accounting
/// logic.
#[derive(Default)]
pub struct BurnLedger {
    daily: std::collections::HashMap<Author, UserDaily>,
    history: Vec<BurnRecord>,
    deposits: std::collections::HashMap<DepositId, Deposit>,
}

impl BurnLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(daily: Vec<UserDaily>, history: Vec<BurnRecord>, deposits: Vec<Deposit>) -> Self {
        Self {
            daily: daily.into_iter().map(|d| (d.author.clone(), d)).collect(),
            history,
            deposits: deposits.into_iter().map(|d| (d.deposit_id.clone(), d)).collect(),
        }
    }

    pub fn history(&self) -> &[BurnRecord] {
        &self.history
    }

    pub fn deposits(&self) -> impl Iterator<Item = &Deposit> {
        self.deposits.values()
    }

    pub fn daily(&self) -> impl Iterator<Item = &UserDaily> {
        self.daily.values()
    }

    /// Record a submission by `author` for `today`, returning the updated
    /// `UserDaily` and the burn amount owed.
    ///
    /// Invariant (spec.md §3.6): a `UserDaily` record exists for
    /// `(author, today)` iff at least one submission was recorded today —
    /// enforced here by resetting the counter whenever the stored date
    /// doesn't match `today`.
    pub fn record_submission(
        &mut self,
        burn_config: &BurnConfig,
        load_multiplier: f64,
        load_scaling_enabled: bool,
        author: &Author,
        today: &str,
        now_ms: i64,
    ) -> (UserDaily, f64) {
        let entry = self.daily.entry(author.clone()).or_insert_with(|| UserDaily {
            author: author.clone(),
            date: today.to_string(),
            submission_count: 0,
            total_burned: 0.0,
            last_submission_at: now_ms,
        });

        if entry.date != today {
            entry.date = today.to_string();
            entry.submission_count = 0;
            entry.total_burned = 0.0;
        }

        entry.submission_count += 1;
        entry.last_submission_at = now_ms;

        let amount = filing_burn(burn_config, entry.submission_count, load_multiplier, load_scaling_enabled);
        entry.total_burned += amount;

        (entry.clone(), amount)
    }

    pub fn push_record(&mut self, record: BurnRecord) {
        self.history.push(record);
        if self.history.len() > medi_core::MAX_BURN_HISTORY {
            let excess = self.history.len() - medi_core::MAX_BURN_HISTORY;
            self.history.drain(0..excess);
        }
    }

    /// Whether `author`'s submission ordinal for `today` has exceeded the
    /// Sybil-resistance free limit and therefore needs a deposit escrowed.
    pub fn needs_deposit(&self, sybil_config: &SybilConfig, author: &Author, today: &str) -> bool {
        match self.daily.get(author) {
            Some(entry) if entry.date == today => entry.submission_count > sybil_config.daily_free_limit,
            _ => false,
        }
    }

    pub fn open_deposit(&mut self, deposit: Deposit) {
        self.deposits.insert(deposit.deposit_id.clone(), deposit);
    }

    /// Deposits whose `refundDeadline` has passed and are still `Active` —
    /// eligible for automatic refund (spec.md §5 "deposit refund sweep").
    pub fn expired_active_deposits(&self, now_ms: i64) -> Vec<Deposit> {
        self.deposits
            .values()
            .filter(|d| d.status == DepositStatus::Active && d.refund_deadline <= now_ms)
            .cloned()
            .collect()
    }

    pub fn mark_refunded(&mut self, deposit_id: &DepositId) {
        if let Some(d) = self.deposits.get_mut(deposit_id) {
            d.status = DepositStatus::Refunded;
        }
    }

    /// Forfeit a still-active deposit ahead of its refund deadline, as
    /// triggered by a validated spam-proof (spec.md §4.3). No-op if the
    /// deposit is already settled.
    pub fn forfeit(&mut self, deposit_id: &DepositId) -> bool {
        match self.deposits.get_mut(deposit_id) {
            Some(d) if d.status == DepositStatus::Active => {
                d.status = DepositStatus::Forfeited;
                true
            }
            _ => false,
        }
    }
}

pub fn new_burn_record(
    id: BurnRecordId,
    kind: BurnType,
    author: Author,
    amount: f64,
    multiplier: f64,
    timestamp: i64,
) -> BurnRecord {
    BurnRecord {
        id,
        kind,
        author,
        amount,
        intent_hash: None,
        settlement_id: None,
        multiplier,
        timestamp,
        tx_hash: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn burn_config() -> BurnConfig {
        BurnConfig {
            free_daily_submissions: 1,
            base_filing_burn: 10.0,
            escalation_base: 2.0,
            escalation_exponent: 1.0,
            success_burn_percentage: 0.0005,
        }
    }

    #[test]
    fn s1_free_filing_then_escalation() {
        let config = burn_config();
        assert_eq!(filing_burn(&config, 1, 1.0, true), 0.0);
        assert_eq!(filing_burn(&config, 2, 1.0, true), 20.0);
        assert_eq!(filing_burn(&config, 3, 1.0, true), 40.0);
    }

    #[test]
    fn success_burn_below_dust_floor_is_skipped() {
        let config = burn_config();
        assert_eq!(success_burn(&config, 0.1), 0.0);
    }

    #[test]
    fn user_daily_resets_across_calendar_days() {
        let config = burn_config();
        let mut ledger = BurnLedger::new();
        let alice = Author::from("alice");

        let (daily, amount) = ledger.record_submission(&config, 1.0, true, &alice, "2026-01-01", 0);
        assert_eq!(daily.submission_count, 1);
        assert_eq!(amount, 0.0);

        let (daily, amount) = ledger.record_submission(&config, 1.0, true, &alice, "2026-01-01", 1);
        assert_eq!(daily.submission_count, 2);
        assert_eq!(amount, 20.0);

        let (daily, amount) = ledger.record_submission(&config, 1.0, true, &alice, "2026-01-02", 2);
        assert_eq!(daily.submission_count, 1, "new day resets the counter");
        assert_eq!(amount, 0.0);
    }
}
