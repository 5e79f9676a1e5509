pub mod ledger;
pub mod load;

pub use ledger::{filing_burn, new_burn_record, success_burn, today_utc, BurnLedger};
pub use load::LoadMonitor;
