//! Startup re-hydration and periodic flush of every shared-state region
//! (spec.md §5, §6) through `medi_core::store::EntityTree`.
//!
//! Each region is a singleton blob under its own sled tree rather than one
//! file per entity — the literal `{entity}/{id}.json` layout spec.md §6
//! describes is chronx's own file-per-account convention generalised; this
//! workspace already resolved that Open Question in favour of
//! `chronx-state::db::StateDb`'s sled-tree pattern (see DESIGN.md), and
//! `medi-node` just re-hydrates/flushes through the same trees every other
//! component uses.

use medi_core::store::EntityTree;
use medi_core::{
    BurnRecord, Deposit, Dispute, FrozenItem, Intent, MediatorError, Peer, ProposedSettlement, UserDaily, WorkClaim,
};

const SINGLETON_KEY: &[u8] = b"singleton";

fn load_singleton<T: serde::de::DeserializeOwned + Default>(tree: &EntityTree) -> T {
    tree.get(SINGLETON_KEY).ok().flatten().unwrap_or_default()
}

fn save_singleton<T: serde::Serialize>(tree: &EntityTree, value: &T) -> Result<(), MediatorError> {
    tree.put(SINGLETON_KEY, value)
}

pub struct PersistenceTrees {
    pub intents: EntityTree,
    pub claims: EntityTree,
    pub peers: EntityTree,
    pub validators: EntityTree,
    pub burn_daily: EntityTree,
    pub burn_history: EntityTree,
    pub deposits: EntityTree,
    pub frozen_items: EntityTree,
    pub settlements: EntityTree,
    pub disputes: EntityTree,
}

impl PersistenceTrees {
    pub fn open(db: &sled::Db) -> Result<Self, MediatorError> {
        Ok(Self {
            intents: EntityTree::open(db, "intents")?,
            claims: EntityTree::open(db, "work_claims")?,
            peers: EntityTree::open(db, "peers")?,
            validators: EntityTree::open(db, "validators")?,
            burn_daily: EntityTree::open(db, "burns/daily")?,
            burn_history: EntityTree::open(db, "burns/history")?,
            deposits: EntityTree::open(db, "burns/deposits")?,
            frozen_items: EntityTree::open(db, "evidence")?,
            settlements: EntityTree::open(db, "settlements")?,
            disputes: EntityTree::open(db, "disputes")?,
        })
    }

    pub fn load_intents(&self) -> Vec<Intent> {
        load_singleton(&self.intents)
    }

    pub fn save_intents(&self, intents: &[Intent]) -> Result<(), MediatorError> {
        save_singleton(&self.intents, &intents)
    }

    pub fn load_claims(&self) -> Vec<WorkClaim> {
        load_singleton(&self.claims)
    }

    pub fn save_claims(&self, claims: &[WorkClaim]) -> Result<(), MediatorError> {
        save_singleton(&self.claims, &claims)
    }

    pub fn load_peers(&self) -> Vec<Peer> {
        load_singleton(&self.peers)
    }

    pub fn save_peers(&self, peers: &[Peer]) -> Result<(), MediatorError> {
        save_singleton(&self.peers, &peers)
    }

    pub fn load_validators(&self) -> Vec<(String, f64)> {
        load_singleton(&self.validators)
    }

    pub fn save_validators(&self, validators: &[(String, f64)]) -> Result<(), MediatorError> {
        save_singleton(&self.validators, &validators)
    }

    pub fn load_burn_daily(&self) -> Vec<UserDaily> {
        load_singleton(&self.burn_daily)
    }

    pub fn save_burn_daily(&self, daily: &[UserDaily]) -> Result<(), MediatorError> {
        save_singleton(&self.burn_daily, &daily)
    }

    pub fn load_burn_history(&self) -> Vec<BurnRecord> {
        load_singleton(&self.burn_history)
    }

    pub fn save_burn_history(&self, history: &[BurnRecord]) -> Result<(), MediatorError> {
        save_singleton(&self.burn_history, &history)
    }

    pub fn load_deposits(&self) -> Vec<Deposit> {
        load_singleton(&self.deposits)
    }

    pub fn save_deposits(&self, deposits: &[Deposit]) -> Result<(), MediatorError> {
        save_singleton(&self.deposits, &deposits)
    }

    pub fn load_frozen_items(&self) -> Vec<FrozenItem> {
        load_singleton(&self.frozen_items)
    }

    pub fn save_frozen_items(&self, items: &[FrozenItem]) -> Result<(), MediatorError> {
        save_singleton(&self.frozen_items, &items)
    }

    pub fn load_settlements(&self) -> Vec<ProposedSettlement> {
        load_singleton(&self.settlements)
    }

    pub fn save_settlements(&self, settlements: &[ProposedSettlement]) -> Result<(), MediatorError> {
        save_singleton(&self.settlements, &settlements)
    }

    pub fn load_disputes(&self) -> Vec<Dispute> {
        load_singleton(&self.disputes)
    }

    pub fn save_disputes(&self, disputes: &[Dispute]) -> Result<(), MediatorError> {
        save_singleton(&self.disputes, &disputes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medi_core::{Author, IntentHash};

    fn temp_db() -> sled::Db {
        let dir = std::env::temp_dir().join(format!("medi-node-persistence-test-{}-{}", std::process::id(), uuid::Uuid::new_v4()));
        sled::open(dir).unwrap()
    }

    #[test]
    fn round_trips_intents_through_the_singleton_tree() {
        let db = temp_db();
        let trees = PersistenceTrees::open(&db).unwrap();
        assert!(trees.load_intents().is_empty());

        let intent = Intent {
            hash: IntentHash::from_bytes([9; 32]),
            author: Author::from("alice"),
            prose: "share the house".into(),
            desires: vec![],
            constraints: vec![],
            created_at: 0,
            priority: 0,
        };
        trees.save_intents(&[intent.clone()]).unwrap();
        let reloaded = trees.load_intents();
        assert_eq!(reloaded, vec![intent]);
    }
}
